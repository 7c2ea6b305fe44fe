//! Reads and writes LSP messages framed by `Content-Length` headers over a
//! duplex byte stream.
//!
//! Takes a generic `impl AsyncBufRead + Unpin` / `impl AsyncWrite + Unpin`
//! rather than owning the stream, so the same framer works over stdio, a
//! socket, or an in-memory pipe in tests.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Header lines longer than this are rejected without buffering further.
const MAX_HEADER_LINE: usize = 64 * 1024;

/// Failure modes for reading or writing a frame.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("invalid Content-Length header: {0}")]
    InvalidContentLength(String),
    #[error("unsupported Content-Type charset: {0}")]
    UnsupportedCharset(String),
    #[error("header line exceeded {MAX_HEADER_LINE} bytes")]
    HeaderTooLarge,
    #[error("unexpected end of stream while reading message body")]
    UnexpectedEof,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads one framed message body from `input`, returning the raw payload
/// bytes. Buffers internally until a full message is available; never
/// blocks holding a partial header since each header line is read in full
/// before being interpreted.
pub async fn read_frame(
    input: &mut (impl AsyncBufRead + Unpin),
) -> Result<Vec<u8>, TransportError> {
    let mut content_length: Option<usize> = None;

    loop {
        let line = read_header_line(input).await?;
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            let len: usize = value
                .parse()
                .map_err(|_| TransportError::InvalidContentLength(value.to_string()))?;
            content_length = Some(len);
        } else if name.eq_ignore_ascii_case("content-type") {
            check_charset(value)?;
        }
    }

    let len = content_length.ok_or(TransportError::MissingContentLength)?;
    let mut body = vec![0u8; len];
    read_exact_or_eof(input, &mut body).await?;
    Ok(body)
}

async fn read_exact_or_eof(
    input: &mut (impl AsyncBufRead + Unpin),
    buf: &mut [u8],
) -> Result<(), TransportError> {
    use tokio::io::AsyncReadExt;
    match input.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(TransportError::UnexpectedEof)
        }
        Err(e) => Err(e.into()),
    }
}

/// Reads one `\r\n`-terminated header line, bounding the read so a
/// malicious or broken peer cannot force unbounded buffering.
async fn read_header_line(
    input: &mut (impl AsyncBufRead + Unpin),
) -> Result<String, TransportError> {
    let mut line = Vec::new();
    let mut taken = input.take(MAX_HEADER_LINE as u64 + 1);
    let n = taken.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Err(TransportError::UnexpectedEof);
    }
    if line.len() as u64 > MAX_HEADER_LINE as u64 {
        tracing::warn!(limit = MAX_HEADER_LINE, "header line too large, dropping connection");
        return Err(TransportError::HeaderTooLarge);
    }
    while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|e| TransportError::InvalidContentLength(e.to_string()))
}

fn check_charset(value: &str) -> Result<(), TransportError> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(charset) = part.strip_prefix("charset=") {
            let charset = charset.trim().trim_matches('"');
            if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
                return Err(TransportError::UnsupportedCharset(charset.to_string()));
            }
        }
    }
    Ok(())
}

/// Writes `payload` framed with a `Content-Length` header.
pub async fn write_frame(
    output: &mut (impl AsyncWrite + Unpin),
    payload: &[u8],
) -> Result<(), TransportError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    output.write_all(header.as_bytes()).await?;
    output.write_all(payload).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trip_single_message() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let mut buf = Vec::new();
        write_frame(&mut buf, payload).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let got = read_frame(&mut cursor).await.unwrap();
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn missing_content_length_is_rejected() {
        let mut cursor = Cursor::new(b"Content-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n".to_vec());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingContentLength));
    }

    #[tokio::test]
    async fn charset_other_than_utf8_is_rejected() {
        let mut cursor = Cursor::new(
            b"Content-Length: 2\r\nContent-Type: application/vscode-jsonrpc; charset=utf-16\r\n\r\n{}".to_vec(),
        );
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedCharset(_)));
    }

    #[tokio::test]
    async fn eof_mid_body_is_rejected() {
        let mut cursor = Cursor::new(b"Content-Length: 100\r\n\r\n{}".to_vec());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::UnexpectedEof));
    }

    #[tokio::test]
    async fn negative_length_is_rejected() {
        let mut cursor = Cursor::new(b"Content-Length: -5\r\n\r\n".to_vec());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidContentLength(_)));
    }

    #[tokio::test]
    async fn overlong_header_line_is_rejected() {
        let mut huge = "X-Pad: ".to_string();
        huge.push_str(&"a".repeat(MAX_HEADER_LINE + 10));
        huge.push_str("\r\n\r\n");
        let mut cursor = Cursor::new(huge.into_bytes());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, TransportError::HeaderTooLarge));
    }

    proptest::proptest! {
        #[test]
        fn framing_round_trip_arbitrary_payload(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let mut buf = Vec::new();
                write_frame(&mut buf, &payload).await.unwrap();
                let mut cursor = Cursor::new(buf);
                let got = read_frame(&mut cursor).await.unwrap();
                prop_assert_eq!(got, payload);
                Ok(())
            })?;
        }
    }
}
