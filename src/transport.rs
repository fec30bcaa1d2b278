//! The seam between the command mapping and whatever carries bytes to the
//! broker.
use async_trait::async_trait;
use thiserror::Error;

use crate::parser::ParsingError;
use crate::types::reply::Reply;

/// Failures below the command mapping: the network, RESP framing, or a broker
/// error string nothing upstream recognised.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    /// An earlier request was abandoned before its reply arrived, so the
    /// stream is out of step with the requests sent on it. The connection
    /// can't be used again.
    #[error("connection poisoned by an abandoned request")]
    Poisoned,

    #[error("malformed reply: {0}")]
    Protocol(#[from] ParsingError),

    /// The broker answered with an error reply. The reason is kept verbatim,
    /// code token included.
    #[error("server error: {0}")]
    Server(String),
}

/// Performs one request/response round trip with the broker.
///
/// Implementations own connecting and authenticating. Whether they reconnect
/// is up to them: [`crate::RespConnection`] never does, so retrying after an
/// I/O error or a closed connection means opening a new one.
///
/// A broker error may be returned either as `Ok(Reply::Error(..))` or as
/// `Err(TransportError::Server(..))`; callers treat the two the same.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        command: &str,
        args: &[String],
    ) -> Result<Reply, TransportError>;
}
