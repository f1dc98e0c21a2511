use serde_json::Value;
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

use super::MAX_MESSAGE_SIZE;
use crate::{
    error::Result,
    protocol::{JsonRpcError, JsonRpcResponse, INVALID_REQUEST},
    server::McpServer,
};

/// Outcome of reading one newline-terminated message.
enum Line {
    Message(Vec<u8>),
    TooLong,
    Eof,
}

/// Reads up to the next newline, keeping at most [`MAX_MESSAGE_SIZE`] bytes.
/// The remainder of an oversized line is drained so the next read starts on
/// a fresh message.
async fn read_line<R>(reader: &mut R) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_MESSAGE_SIZE as u64 + 1)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(Line::Eof);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
    } else if line.len() > MAX_MESSAGE_SIZE {
        discard_line(reader).await?;
        return Ok(Line::TooLong);
    }
    Ok(Line::Message(line))
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Newline-delimited JSON-RPC over any reader/writer pair. Returns when the
/// reader reaches end of input.
pub async fn serve_io<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let raw = match read_line(&mut reader).await? {
            Line::Eof => break,
            Line::TooLong => {
                warn!("dropped a message over {} bytes", MAX_MESSAGE_SIZE);
                let error = JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Message exceeds {MAX_MESSAGE_SIZE} bytes"),
                );
                write_response(&mut writer, &JsonRpcResponse::failure(Value::Null, error)).await?;
                continue;
            }
            Line::Message(raw) => raw,
        };

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!("<- {} bytes", line.len());
        if let Some(response) = server.handle_message(line).await {
            write_response(&mut writer, &response).await?;
        }
    }

    Ok(())
}

/// Serves on the process's stdin and stdout.
pub async fn serve_stdio(server: McpServer) -> Result<()> {
    info!("serving MCP on stdio");
    serve_io(&server, BufReader::new(io::stdin()), io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}
