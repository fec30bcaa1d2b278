//! Job body encoding.
//!
//! The broker treats bodies as opaque strings. Callers pick the format by
//! handing the client a [`BodyCodec`]: [`Json`] for serde types, or
//! [`FnCodec`] to wrap a pair of functions.
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A body that failed to encode or decode.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(Box<dyn std::error::Error + Send + Sync>);

impl CodecError {
    pub fn new(
        error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self(error.into())
    }
}

/// Converts job bodies of type `B` to and from the bytes stored by the
/// broker.
pub trait BodyCodec<B> {
    fn encode(&self, body: &B) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, raw: &[u8]) -> Result<B, CodecError>;
}

/// Stores bodies as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl<B: Serialize + DeserializeOwned> BodyCodec<B> for Json {
    fn encode(&self, body: &B) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(body).map_err(CodecError::new)
    }

    fn decode(&self, raw: &[u8]) -> Result<B, CodecError> {
        serde_json::from_slice(raw).map_err(CodecError::new)
    }
}

/// A codec built from an encode function and a decode function.
#[derive(Clone, Copy, Debug)]
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<B, E, D> BodyCodec<B> for FnCodec<E, D>
where
    E: Fn(&B) -> Result<Vec<u8>, CodecError>,
    D: Fn(&[u8]) -> Result<B, CodecError>,
{
    fn encode(&self, body: &B) -> Result<Vec<u8>, CodecError> {
        (self.encode)(body)
    }

    fn decode(&self, raw: &[u8]) -> Result<B, CodecError> {
        (self.decode)(raw)
    }
}
