//! Per-request state.
//!
//! A [`Context`] is created for one request, handed by `&mut` down the
//! dispatch chain, and turned into the response when the chain returns. It
//! is never shared between requests or threads, so its lazily parsed fields
//! need no synchronisation.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, Decoder, Encoder};
use crate::env::Env;
use crate::error::{Error, ErrorKind};
use crate::form::{self, FilePart, MultipartForm, Values};
use crate::params::Params;
use crate::response::{ContentType, Response};

pub struct Context {
    parts: Parts,
    body: Bytes,
    params: Arc<Params>,
    env: Arc<Env>,
    codec: Option<Arc<dyn Codec>>,
    response: Response,

    query: Option<Values>,
    form: Option<Values>,
    multipart: Option<MultipartForm>,
    encoder: Option<Box<dyn Encoder>>,
    decoder: Option<Box<dyn Decoder>>,
}

impl Context {
    pub fn new(request: http::Request<Bytes>, env: Arc<Env>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            params: Arc::default(),
            env,
            codec: None,
            response: Response::new(),
            query: None,
            form: None,
            multipart: None,
            encoder: None,
            decoder: None,
        }
    }

    // ── Request ───────────────────────────────────────────────────────────────

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request header lookup. Values that are not visible ASCII are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Typed per-request values, for filters passing data inward.
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    // ── Path parameters ───────────────────────────────────────────────────────

    /// The params of the link currently running: a filter sees captures up
    /// to the node it was registered on, the handler sees all of them.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` is `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn params_arc(&self) -> Arc<Params> {
        Arc::clone(&self.params)
    }

    pub(crate) fn replace_params(&mut self, params: Arc<Params>) -> Arc<Params> {
        std::mem::replace(&mut self.params, params)
    }

    // ── Query and form values ─────────────────────────────────────────────────

    fn query(&mut self) -> &Values {
        if self.query.is_none() {
            let raw = self.parts.uri.query().unwrap_or("");
            let values = Values::parse_query(raw).unwrap_or_else(|err| {
                self.log(ErrorKind::Query, &err);
                Values::default()
            });
            self.query = Some(values);
        }
        self.query.get_or_insert_with(Values::default)
    }

    pub fn query_value(&mut self, name: &str) -> Option<&str> {
        self.query().get(name)
    }

    pub fn query_values(&mut self, name: &str) -> Vec<&str> {
        self.query().get_all(name)
    }

    fn form(&mut self) -> &Values {
        if self.form.is_none() {
            let content_type = self.header(header::CONTENT_TYPE.as_str()).unwrap_or("");
            let values = if form::is_urlencoded(content_type) {
                Values::parse_form(&self.body).unwrap_or_else(|err| {
                    self.log(ErrorKind::Form, &err);
                    Values::default()
                })
            } else if form::is_multipart(content_type) {
                self.multipart().values.clone()
            } else {
                Values::default()
            };
            self.form = Some(values);
        }
        self.form.get_or_insert_with(Values::default)
    }

    /// A value from an urlencoded or multipart body.
    pub fn body_value(&mut self, name: &str) -> Option<&str> {
        self.form().get(name)
    }

    pub fn body_values(&mut self, name: &str) -> Vec<&str> {
        self.form().get_all(name)
    }

    fn multipart(&mut self) -> &MultipartForm {
        if self.multipart.is_none() {
            let content_type = self.header(header::CONTENT_TYPE.as_str()).unwrap_or("");
            let form = if form::is_multipart(content_type) {
                MultipartForm::parse(self.body.clone(), content_type, self.env.max_memory())
                    .unwrap_or_else(|err| {
                        self.log(ErrorKind::Multipart, &err);
                        MultipartForm::default()
                    })
            } else {
                MultipartForm::default()
            };
            self.multipart = Some(form);
        }
        self.multipart.get_or_insert_with(MultipartForm::default)
    }

    /// The first file uploaded under `name`.
    pub fn file(&mut self, name: &str) -> Option<&FilePart> {
        self.files(name).first()
    }

    pub fn files(&mut self, name: &str) -> &[FilePart] {
        self.multipart()
            .files
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    // ── Response ──────────────────────────────────────────────────────────────

    /// Commits the response status. Only the first status sticks, and
    /// writing body bytes commits `200 OK`.
    pub fn status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers_mut().insert(name, value);
    }

    pub fn write(&mut self, data: &[u8]) {
        self.response.write(data);
    }

    /// Writes `text/plain` unless a content type is already set.
    pub fn text(&mut self, body: impl AsRef<str>) {
        self.bytes(ContentType::Text, body.as_ref().as_bytes());
    }

    pub fn bytes(&mut self, content_type: ContentType, body: &[u8]) {
        self.response.default_content_type(content_type.as_str());
        self.response.write(body);
    }

    /// Answers with `status` through the configured
    /// [`ErrorHandler`](crate::ErrorHandler).
    pub fn error(&mut self, status: StatusCode, err: Option<&Error>) {
        let errors = Arc::clone(self.env.error_handler());
        errors.handle(self, status, err);
    }

    pub(crate) fn log(&self, kind: ErrorKind, err: &Error) {
        self.env.error_handler().log(self, kind, err);
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    // ── Codec ─────────────────────────────────────────────────────────────────

    /// The codec for this request: one set with [`set_codec`](Self::set_codec),
    /// else the environment's.
    pub fn codec(&self) -> Option<Arc<dyn Codec>> {
        self.codec.clone().or_else(|| self.env.codec().cloned())
    }

    /// Overrides the codec for the rest of this request. Has no effect on an
    /// encoder or decoder already in use.
    pub fn set_codec(&mut self, codec: Arc<dyn Codec>) {
        self.codec = Some(codec);
    }

    /// Reads the next value from the request body.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        if self.decoder.is_none() {
            let codec = self.codec().ok_or(Error::EmptyCodec)?;
            self.decoder = Some(codec.new_decoder(self.body.clone()));
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(Error::EmptyCodec);
        };
        let value = decoder.decode().map_err(Error::Codec)?;
        serde_json::from_value(value).map_err(|err| Error::Codec(err.into()))
    }

    /// Appends `value` to the response body. Failures are logged, since the
    /// status is already committed by the time encoding can fail.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) {
        if let Err(err) = self.try_encode(value) {
            self.log(ErrorKind::Encode, &err);
        }
    }

    fn try_encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        if self.encoder.is_none() {
            let codec = self.codec().ok_or(Error::EmptyCodec)?;
            self.response.default_content_type(codec.content_type());
            self.encoder = Some(codec.new_encoder());
        }
        let value = serde_json::to_value(value).map_err(|err| Error::Codec(err.into()))?;
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(Error::EmptyCodec);
        };
        encoder
            .encode(&value, self.response.body_mut())
            .map_err(Error::Codec)
    }
}
