//! Response body reading: content-length, chunked, and close-delimited framing.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// How the response body is delimited, decided from the response headers per RFC 7230 §3.3.3
/// (HEAD/1xx/204/304 => no body, chunked Transfer-Encoding wins over Content-Length, otherwise
/// read to EOF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body at all (HEAD response, 1xx/204/304, or a CONNECT 2xx).
    Empty,
    /// Exactly `n` bytes follow.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// No framing header present; read until the connection closes.
    CloseDelimited,
}

/// Reads a full response body from `reader` according to `framing`, enforcing `max_body_bytes`
/// as a decompression/memory-exhaustion guard.
pub async fn read_body<R>(reader: &mut R, framing: BodyFraming, max_body_bytes: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    match framing {
        BodyFraming::Empty => Ok(Bytes::new()),
        BodyFraming::Length(len) => read_fixed_length(reader, len, max_body_bytes).await,
        BodyFraming::Chunked => read_chunked(reader, max_body_bytes).await,
        BodyFraming::CloseDelimited => read_to_close(reader, max_body_bytes).await,
    }
}

async fn read_fixed_length<R>(reader: &mut R, len: u64, max_body_bytes: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    if len as usize > max_body_bytes {
        return Err(Error::protocol(format!(
            "response body of {len} bytes exceeds the {max_body_bytes} byte cap"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(Error::network)?;
    Ok(Bytes::from(buf))
}

async fn read_to_close<R>(reader: &mut R, max_body_bytes: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await.map_err(Error::network)?;
        if n == 0 {
            break;
        }
        if buf.len() + n > max_body_bytes {
            return Err(Error::protocol(format!(
                "close-delimited response body exceeded the {max_body_bytes} byte cap"
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf.freeze())
}

async fn read_chunked<R>(reader: &mut R, max_body_bytes: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut out = BytesMut::new();
    loop {
        let size = read_chunk_size_line(reader).await?;
        if size == 0 {
            // trailing headers (if any) end with a bare CRLF; we don't expose trailers.
            consume_trailers(reader).await?;
            break;
        }
        if out.len() + size > max_body_bytes {
            return Err(Error::protocol(format!(
                "chunked response body exceeded the {max_body_bytes} byte cap"
            )));
        }
        let mut chunk = vec![0u8; size];
        reader.read_exact(&mut chunk).await.map_err(Error::network)?;
        out.extend_from_slice(&chunk);
        // each chunk data segment is followed by a bare CRLF
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await.map_err(Error::network)?;
        if crlf != *b"\r\n" {
            return Err(Error::protocol("malformed chunk terminator"));
        }
    }
    Ok(out.freeze())
}

async fn read_chunk_size_line<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let line = read_line(reader).await?;
    let size_str = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size_str, 16)
        .map_err(|_| Error::protocol(format!("invalid chunk size {size_str:?}")))
}

async fn consume_trailers<R>(reader: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
    }
    Ok(())
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await.map_err(Error::network)?;
        if n == 0 {
            return Err(Error::network(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-chunk",
            )));
        }
        if byte[0] == b'\n' {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8(line).map_err(|_| Error::protocol("non-UTF-8 chunk framing line"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// A fixed byte buffer implementing `AsyncRead`, for feeding canned responses to the
    /// framing readers above without pulling in a real socket or a mock-io crate.
    struct Cursor {
        data: Vec<u8>,
        pos: usize,
    }

    impl Cursor {
        fn new(data: Vec<u8>) -> Self {
            Self { data, pos: 0 }
        }
    }

    impl AsyncRead for Cursor {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let remaining = &self.data[self.pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn reads_fixed_length_body() {
        let mut reader = Cursor::new(b"hello".to_vec());
        let body = read_body(&mut reader, BodyFraming::Length(5), 1024).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn rejects_length_over_cap() {
        let mut reader = Cursor::new(b"hello".to_vec());
        let err = read_body(&mut reader, BodyFraming::Length(5), 2).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn reads_chunked_body() {
        let raw = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let mut reader = Cursor::new(raw.to_vec());
        let body = read_body(&mut reader, BodyFraming::Chunked, 1024).await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn reads_close_delimited_body() {
        let mut reader = Cursor::new(b"all of it".to_vec());
        let body = read_body(&mut reader, BodyFraming::CloseDelimited, 1024).await.unwrap();
        assert_eq!(&body[..], b"all of it");
    }

    #[tokio::test]
    async fn empty_framing_never_reads() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let body = read_body(&mut reader, BodyFraming::Empty, 1024).await.unwrap();
        assert!(body.is_empty());
    }
}
