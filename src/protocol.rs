// src/protocol.rs
// Native messaging codec: a 4-byte host-native-endian length followed by
// exactly that many bytes of JSON, in both directions. stdout carries
// nothing but these frames.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Upper bound on an inbound frame. The length prefix is attacker-supplied
/// as far as this process is concerned, so it is not trusted blindly.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Decoded browser request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Executable name or absolute path. `None` selects a fallback editor.
    pub editor: Option<String>,
    /// Extra arguments inserted before the scratch-file path.
    pub args: Vec<String>,
    /// Initial scratch file content.
    pub text: String,
    /// Scratch file extension, without the dot.
    pub ext: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    editor: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    text: Option<String>,
    ext: Option<String>,
}

#[derive(Serialize)]
struct Response<'a> {
    text: &'a str,
}

/// Reads and decodes one framed request.
pub async fn read_request<R>(input: &mut R) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    input.read_exact(&mut len_buf).await.map_err(|e| map_eof(e, "length prefix"))?;

    let len = u32::from_ne_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::OversizedFrame(len));
    }

    let mut body = vec![0u8; len as usize];
    input.read_exact(&mut body).await.map_err(|e| map_eof(e, "request body"))?;

    let raw: RawRequest = serde_json::from_slice(&body)?;
    let text = raw.text.ok_or(ProtocolError::MissingText)?;

    Ok(Request {
        editor: raw.editor.filter(|e| !e.is_empty()),
        args: raw.args,
        text,
        ext: raw.ext.filter(|e| !e.is_empty()),
    })
}

/// Encodes and writes one `{"text": ...}` response frame.
pub async fn write_response<W>(output: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(&Response { text })?;
    let len = u32::try_from(body.len())
        .map_err(|_| std::io::Error::other("response body exceeds frame size"))?;

    output.write_all(&len.to_ne_bytes()).await?;
    output.write_all(&body).await?;
    output.flush().await?;

    Ok(())
}

fn map_eof(err: std::io::Error, what: &'static str) -> ProtocolError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::Truncated(what)
    } else {
        ProtocolError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(json: &str) -> Vec<u8> {
        let mut buf = (json.len() as u32).to_ne_bytes().to_vec();
        buf.extend_from_slice(json.as_bytes());
        buf
    }

    #[tokio::test]
    async fn decodes_full_request() {
        let mut input = Cursor::new(frame(
            r#"{"editor":"gvim","args":["-n"],"text":"hello","ext":"md"}"#,
        ));
        let request = read_request(&mut input).await.expect("decode");
        assert_eq!(request.editor.as_deref(), Some("gvim"));
        assert_eq!(request.args, vec!["-n".to_string()]);
        assert_eq!(request.text, "hello");
        assert_eq!(request.ext.as_deref(), Some("md"));
    }

    #[tokio::test]
    async fn optional_fields_default() {
        let mut input = Cursor::new(frame(r#"{"text":"hi"}"#));
        let request = read_request(&mut input).await.expect("decode");
        assert_eq!(request.editor, None);
        assert!(request.args.is_empty());
        assert_eq!(request.ext, None);
    }

    #[tokio::test]
    async fn empty_editor_and_ext_are_treated_as_absent() {
        let mut input = Cursor::new(frame(r#"{"editor":"","text":"hi","ext":""}"#));
        let request = read_request(&mut input).await.expect("decode");
        assert_eq!(request.editor, None);
        assert_eq!(request.ext, None);
    }

    #[tokio::test]
    async fn missing_text_is_its_own_error() {
        let mut input = Cursor::new(frame(r#"{"editor":"vi"}"#));
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MissingText));
    }

    #[tokio::test]
    async fn truncated_body_is_rejected() {
        let mut buf = 100u32.to_ne_bytes().to_vec();
        buf.extend_from_slice(b"{\"text\":\"short\"}");
        let mut input = Cursor::new(buf);
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated("request body")));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_allocation() {
        let mut input = Cursor::new((MAX_FRAME_LEN + 1).to_ne_bytes().to_vec());
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedFrame(_)));
    }

    #[tokio::test]
    async fn response_frame_length_matches_body() {
        let mut out = Vec::new();
        write_response(&mut out, "edited").await.expect("write");

        let len = u32::from_ne_bytes(out[..4].try_into().unwrap()) as usize;
        assert_eq!(len, out.len() - 4);

        let value: serde_json::Value = serde_json::from_slice(&out[4..]).expect("valid JSON");
        assert_eq!(value["text"], "edited");
    }
}
