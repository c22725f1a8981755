//! Query-string, urlencoded-body and multipart decoding.

use std::collections::HashMap;
use std::convert::Infallible;

use bytes::Bytes;

use crate::error::Error;

/// An ordered multi-map of decoded form values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Values {
    pairs: Vec<(String, String)>,
}

impl Values {
    /// Decodes a raw query string (without the `?`).
    pub fn parse_query(raw: &str) -> Result<Self, Error> {
        Self::decode(raw.as_bytes()).map_err(Error::Query)
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn parse_form(raw: &[u8]) -> Result<Self, Error> {
        Self::decode(raw).map_err(Error::Form)
    }

    /// A `%` not followed by two hex digits is rejected.
    fn decode(raw: &[u8]) -> Result<Self, String> {
        check_escapes(raw)?;
        let pairs = url::form_urlencoded::parse(raw)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self { pairs })
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in order of appearance.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn push(&mut self, name: String, value: String) {
        self.pairs.push((name, value));
    }
}

fn check_escapes(raw: &[u8]) -> Result<(), String> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let valid = raw.len() > i + 2
                && raw[i + 1].is_ascii_hexdigit()
                && raw[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = raw.len().min(i + 3);
                return Err(format!(
                    "invalid escape `{}` at byte {i}",
                    String::from_utf8_lossy(&raw[i..end])
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// One uploaded file from a multipart body.
#[derive(Clone, Debug)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A decoded `multipart/form-data` body: plain fields and files.
#[derive(Clone, Debug, Default)]
pub struct MultipartForm {
    pub values: Values,
    pub files: HashMap<String, Vec<FilePart>>,
}

impl MultipartForm {
    /// Decodes an already-buffered body. The whole body may not exceed
    /// `max_memory` bytes.
    pub fn parse(body: Bytes, content_type: &str, max_memory: u64) -> Result<Self, Error> {
        let boundary = multer::parse_boundary(content_type)?;
        let constraints = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(max_memory));
        let stream = futures::stream::iter([Ok::<_, Infallible>(body)]);
        let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

        // The stream is in memory, so this never parks the thread.
        futures::executor::block_on(async move {
            let mut form = MultipartForm::default();
            while let Some(field) = multipart.next_field().await? {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                match field.file_name().map(str::to_owned) {
                    Some(file_name) => {
                        let content_type = field.content_type().map(ToString::to_string);
                        let data = field.bytes().await?;
                        form.files.entry(name).or_default().push(FilePart {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                    None => {
                        let value = field.text().await?;
                        form.values.push(name, value);
                    }
                }
            }
            Ok::<_, Error>(form)
        })
    }
}

pub(crate) fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

pub(crate) fn is_urlencoded(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("application/x-www-form-urlencoded")
}
