//! Typed client mapping for the Disque distributed job queue.
//!
//! Disque speaks the Redis wire protocol but has its own command vocabulary
//! and positional reply layouts. This crate builds those commands, decodes the
//! replies into typed records, and maps the broker's error strings onto
//! [`DisqueError`]. The network round trip sits behind the [`Transport`]
//! trait; [`RespConnection`] is a small TCP implementation of it.

pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod decode;
pub mod error;
pub mod line_reader;
pub mod parser;
pub mod transport;
pub mod types;
mod util;

pub use client::DisqueClient;
pub use codec::{BodyCodec, FnCodec, Json};
pub use command::{AckMode, AddJobOptions, FetchOptions, PauseScope};
pub use config::{ClientConfig, UrlError};
pub use connection::RespConnection;
pub use error::{DecodeError, DisqueError};
pub use transport::{Transport, TransportError};
pub use types::job::{Job, JobInfo, QueueInfo};
pub use types::reply::Reply;
pub use types::states::{JobState, QueuePauseState};
