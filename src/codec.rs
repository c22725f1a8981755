//! Body codecs.
//!
//! A [`Codec`] turns request bodies into values and values into response
//! bytes. Codecs exchange [`serde_json::Value`] so they stay object-safe and
//! can be swapped at runtime; [`Context::encode`](crate::Context::encode) and
//! [`Context::decode`](crate::Context::decode) convert to and from your own
//! serde types at the edges.
//!
//! Encoders and decoders are streams: a context builds each once and reuses
//! it, so successive `decode` calls read successive values from one body.

use bytes::Bytes;
use serde_json::Value;

use crate::error::BoxError;
use crate::response::ContentType;

pub trait Codec: Send + Sync + 'static {
    /// The `content-type` written with encoded responses.
    fn content_type(&self) -> &str;

    fn marshal(&self, value: &Value) -> Result<Vec<u8>, BoxError>;

    fn unmarshal(&self, data: &[u8]) -> Result<Value, BoxError>;

    fn new_encoder(&self) -> Box<dyn Encoder>;

    /// A decoder over a buffered request body.
    fn new_decoder(&self, body: Bytes) -> Box<dyn Decoder>;
}

pub trait Encoder: Send {
    /// Appends one encoded value to `out`.
    fn encode(&mut self, value: &Value, out: &mut Vec<u8>) -> Result<(), BoxError>;
}

pub trait Decoder: Send {
    /// Reads the next value from the body.
    fn decode(&mut self) -> Result<Value, BoxError>;
}

/// JSON via `serde_json`. Encoded values are newline-terminated; the decoder
/// accepts whitespace-separated values.
#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl Codec for Json {
    fn content_type(&self) -> &str {
        ContentType::Json.as_str()
    }

    fn marshal(&self, value: &Value) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(data)?)
    }

    fn new_encoder(&self) -> Box<dyn Encoder> {
        Box::new(JsonEncoder)
    }

    fn new_decoder(&self, body: Bytes) -> Box<dyn Decoder> {
        Box::new(JsonDecoder { body, offset: 0 })
    }
}

struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&mut self, value: &Value, out: &mut Vec<u8>) -> Result<(), BoxError> {
        serde_json::to_writer(&mut *out, value)?;
        out.push(b'\n');
        Ok(())
    }
}

struct JsonDecoder {
    body: Bytes,
    offset: usize,
}

impl Decoder for JsonDecoder {
    fn decode(&mut self) -> Result<Value, BoxError> {
        let mut stream =
            serde_json::Deserializer::from_slice(&self.body[self.offset..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                self.offset += stream.byte_offset();
                Ok(value)
            }
            Some(Err(err)) => Err(err.into()),
            None => Err("request body has no more values".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decoder_streams_successive_values() {
        let mut decoder = Json.new_decoder(Bytes::from_static(b"{\"n\":1}\n {\"n\":2}"));
        assert_eq!(decoder.decode().unwrap(), json!({"n": 1}));
        assert_eq!(decoder.decode().unwrap(), json!({"n": 2}));
        assert!(decoder.decode().is_err());
    }

    #[test]
    fn encoder_appends_lines() {
        let mut encoder = Json.new_encoder();
        let mut out = Vec::new();
        encoder.encode(&json!([1, 2]), &mut out).unwrap();
        encoder.encode(&json!("x"), &mut out).unwrap();
        assert_eq!(out, b"[1,2]\n\"x\"\n");
    }

    #[test]
    fn marshal_round_trips_through_unmarshal() {
        let bytes = Json.marshal(&json!({"ok": true})).unwrap();
        assert_eq!(Json.unmarshal(&bytes).unwrap(), json!({"ok": true}));
    }
}
