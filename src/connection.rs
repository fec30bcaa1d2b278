//! A single RESP connection to a broker node.
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

use crate::config::ClientConfig;
use crate::line_reader::LineReader;
use crate::parser::ReplyHeader;
use crate::transport::{Transport, TransportError};
use crate::types::reply::Reply;
use crate::types::serialisable::encode_request;
use crate::util::bytes_to_human_str;

/// Upper bound on how many array slots are reserved up front, whatever
/// length the broker announces.
const MAX_PREALLOC: usize = 1024;

/// Implements [`Transport`] over one TCP connection.
///
/// Requests are serialised: concurrent callers wait their turn for the
/// socket. A blocking `GETJOB` therefore holds up every other caller until
/// it returns.
pub struct RespConnection {
    inner: Mutex<Inner>,
    peer: SocketAddr,
}

struct Inner {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Set while a request awaits its reply. If the future driving a request
    /// is dropped midway, the reply is never drained and the stream can't be
    /// trusted, so it stays set and the connection refuses further use.
    in_flight: bool,
}

impl RespConnection {
    /// Connects to the broker and authenticates if a password is configured.
    #[instrument(
        name = "connect",
        err,
        skip_all,
        fields(host = %config.hostname, port = config.port)
    )]
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<Self, TransportError> {
        let stream =
            TcpStream::connect((config.hostname.as_str(), config.port)).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let (r, writer) = stream.into_split();
        let conn = Self {
            inner: Mutex::new(Inner {
                reader: r.into(),
                writer,
                in_flight: false,
            }),
            peer,
        };

        if let Some(password) = &config.password {
            if let Reply::Error(reason) =
                conn.send("AUTH", &[password.clone()]).await?
            {
                return Err(TransportError::Server(reason));
            }
            debug!("authenticated");
        }

        debug!(%peer, "connected");

        Ok(conn)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Shuts down the write half, telling the broker no more requests follow.
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().await;
        inner.writer.shutdown().await?;
        debug!(peer = %self.peer, "closed connection");
        Ok(())
    }
}

#[async_trait]
impl Transport for RespConnection {
    async fn send(
        &self,
        command: &str,
        args: &[String],
    ) -> Result<Reply, TransportError> {
        let request = encode_request(command, args);

        let mut inner = self.inner.lock().await;
        if inner.in_flight {
            return Err(TransportError::Poisoned);
        }

        inner.in_flight = true;
        inner.writer.write_all(&request).await?;
        inner.writer.flush().await?;

        let reply = read_reply(&mut inner.reader).await?;
        inner.in_flight = false;

        Ok(reply)
    }
}

/// Reads one complete reply, nested arrays included.
///
/// Arrays are assembled with an explicit stack rather than by recursion, so
/// deeply nested replies can't exhaust the task's stack.
pub(crate) async fn read_reply<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
) -> Result<Reply, TransportError> {
    // Each entry: (announced length, elements so far).
    let mut stack: Vec<(usize, Vec<Reply>)> = vec![];

    loop {
        let line = reader
            .read_line()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;

        trace!(line = bytes_to_human_str(&line), "reading reply");

        let mut reply = match ReplyHeader::try_from(&line[..])? {
            ReplyHeader::Status(text) => Reply::Bulk(text),
            ReplyHeader::Error(reason) => Reply::Error(reason),
            ReplyHeader::Integer(n) => Reply::Integer(n),
            ReplyHeader::Bulk(None) | ReplyHeader::Array(None) => Reply::Nil,
            ReplyHeader::Bulk(Some(len)) => Reply::Bulk(
                reader
                    .read_bulk(len)
                    .await?
                    .ok_or(TransportError::ConnectionClosed)?,
            ),
            ReplyHeader::Array(Some(0)) => Reply::Array(vec![]),
            ReplyHeader::Array(Some(n)) => {
                stack.push((n, Vec::with_capacity(n.min(MAX_PREALLOC))));
                continue;
            },
        };

        // Fold the finished reply into its parent, closing any arrays it
        // completes.
        loop {
            let Some((want, items)) = stack.last_mut() else {
                return Ok(reply);
            };

            items.push(reply);
            if items.len() < *want {
                break;
            }

            reply = Reply::Array(std::mem::take(items));
            stack.pop();
        }
    }
}
