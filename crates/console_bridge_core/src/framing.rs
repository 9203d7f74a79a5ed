//! `Content-Length` framing used by the V8 debugger protocol.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::Result;

/// Largest body accepted from the debugger. Anything above is treated as a
/// corrupt header.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub fn encode_frame(payload: &Value) -> Result<Vec<u8>> {
    let body = serde_json::to_string(payload)?;
    Ok(format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes())
}

/// Reads one frame and decodes its JSON body. Frames with an empty body, such
/// as the handshake the debugger sends right after connecting, yield `None`.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    match read_frame_body(reader).await? {
        Some(body) => decode_body(&body).map(Some),
        None => Ok(None),
    }
}

/// Reads one frame without decoding it. An error here leaves the stream at an
/// unknown position; a body that fails to decode afterwards does not.
pub async fn read_frame_body<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "debugger connection closed while reading headers",
            ));
        }

        let trimmed = line.trim_end_matches(&['\r', '\n'][..]);
        if trimmed.is_empty() {
            break;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                let parsed = value.trim().parse::<usize>().map_err(|e| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("invalid Content-Length value: {e}"),
                    )
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing required Content-Length header",
        )
    })?;

    if length == 0 {
        return Ok(None);
    }
    if length > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Content-Length {length} exceeds the {MAX_FRAME_LEN} byte limit"),
        ));
    }

    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub fn decode_body(body: &[u8]) -> std::io::Result<Value> {
    serde_json::from_slice::<Value>(body).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid debugger JSON payload: {e}"),
        )
    })
}
