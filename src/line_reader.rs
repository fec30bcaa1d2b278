use std::io;

use bytes::{Bytes, BytesMut};
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads RESP framing from a stream: CRLF-terminated header lines, and
/// length-prefixed bulk payloads which may themselves contain CRLF.
pub struct LineReader<T: AsyncRead + Unpin> {
    /// Stores data that's been read in but not yet consumed.
    buf: BytesMut,
    /// Index in buf from which a valid CRLF pair may appear (and before which
    /// a CRLF sequence hasn't been seen).
    maybe_crlf_from: usize,
    /// Data source
    reader: T,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    /// Reads a line from the internal buffer and/or reader, without its CRLF.
    /// On an end-of-stream condition, returns a None result, discarding any
    /// partly-read line in the internal buffer.
    ///
    /// This function is cancel-safe: its only async operation is a `read_buf`
    /// against the internal `reader`, and so it has the same guarantees:
    /// either a complete read occurs and is processed, or this is cancelled.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            // Scan from one byte before the newest data in case a \r arrived
            // at the end of the previous read and its \n at the start of
            // this one.
            if let Some(eol) = self
                .buf
                .iter()
                .skip(self.maybe_crlf_from)
                .tuple_windows::<(_, _)>()
                .position(|x| x == (&b'\r', &b'\n'))
            {
                let line =
                    self.buf.split_to(self.maybe_crlf_from + eol + 2).freeze();

                // Restart scanning from the start of the unread section.
                self.maybe_crlf_from = 0;

                return Ok(Some(line.slice(0..line.len() - 2)));
            }

            let n_bytes_read = self.fill().await?;

            // Set maybe_crlf_from to the byte before the first byte just
            // read (and 0 if buf is empty).
            self.maybe_crlf_from =
                self.buf.len().saturating_sub(n_bytes_read + 1);

            if n_bytes_read == 0 {
                return Ok(None);
            }
        }
    }

    /// Reads exactly `len` payload bytes followed by a CRLF, returning the
    /// payload. Returns None if the stream ends first.
    ///
    /// Not cancel-safe once any of the payload has been buffered: a cancelled
    /// call leaves the stream positioned mid-payload.
    pub async fn read_bulk(&mut self, len: usize) -> io::Result<Option<Bytes>> {
        let want = len + 2;

        while self.buf.len() < want {
            if self.fill().await? == 0 {
                return Ok(None);
            }
        }

        let chunk = self.buf.split_to(want).freeze();
        self.maybe_crlf_from = 0;

        if &chunk[len..] != b"\r\n" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "bulk payload not terminated by CRLF",
            ));
        }

        Ok(Some(chunk.slice(0..len)))
    }

    /// Reads more data into the buffer, returning how many bytes arrived.
    /// Zero means the stream has ended.
    async fn fill(&mut self) -> io::Result<usize> {
        self.reader.read_buf(&mut self.buf).await
    }
}

impl<T: AsyncRead + Unpin> From<T> for LineReader<T> {
    fn from(value: T) -> Self {
        Self {
            buf: BytesMut::new(),
            maybe_crlf_from: 0,
            reader: value,
        }
    }
}
