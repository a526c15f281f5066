//! LSP transport layer (JSON-RPC over stdio)

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{LspError, Result};

/// Write half of the JSON-RPC connection
pub struct Transport {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl Transport {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Send a request
    pub async fn send_request(&self, id: i64, method: &str, params: Value) -> Result<()> {
        self.send(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        })).await
    }

    /// Send a notification
    pub async fn send_notification(&self, method: &str, params: Value) -> Result<()> {
        self.send(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        })).await
    }

    /// Reply to a request initiated by the server
    pub async fn send_response(&self, id: Value, result: Value) -> Result<()> {
        self.send(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        })).await
    }

    async fn send(&self, message: &Value) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, message).await
    }
}

/// Frame a message with its `Content-Length` header
pub fn format_message(message: &Value) -> Result<String> {
    let content = serde_json::to_string(message)?;
    Ok(format!("Content-Length: {}\r\n\r\n{}", content.len(), content))
}

/// Write one framed message
pub async fn write_message<W>(writer: &mut W, message: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let msg = format_message(message)?;
    writer.write_all(msg.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message. Returns `None` once the stream is closed.
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Value>> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let header = line.trim();
        if header.is_empty() {
            break;
        }

        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("Content-Length") {
                let value = value.trim();
                let len = value
                    .parse()
                    .map_err(|_| LspError::Protocol(format!("bad Content-Length: {}", value)))?;
                content_length = Some(len);
            }
        }
    }

    let content_length = content_length
        .ok_or_else(|| LspError::Protocol("missing Content-Length header".to_string()))?;

    let mut content = vec![0u8; content_length];
    reader.read_exact(&mut content).await?;

    Ok(Some(serde_json::from_slice(&content)?))
}

/// Message types
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

/// Request sent by the server
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Value,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: i64,
    pub result: Option<Value>,
    pub error: Option<ResponseError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

impl Message {
    pub fn parse(value: Value) -> Result<Self> {
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);
        let params = value.get("params").cloned().unwrap_or(Value::Null);

        match (value.get("id"), method) {
            (Some(id), Some(method)) => Ok(Message::Request(Request {
                id: id.clone(),
                method,
                params,
            })),
            (Some(id), None) => {
                let id = id.as_i64()
                    .ok_or_else(|| LspError::Protocol(format!("unexpected response id: {}", id)))?;
                Ok(Message::Response(Response {
                    id,
                    result: value.get("result").cloned(),
                    error: value.get("error").map(|e| ResponseError {
                        code: e["code"].as_i64().unwrap_or(0),
                        message: e["message"].as_str().unwrap_or("").to_string(),
                        data: e.get("data").cloned(),
                    }),
                }))
            }
            (None, Some(method)) => Ok(Message::Notification(Notification { method, params })),
            (None, None) => Err(LspError::Protocol("neither id nor method present".to_string())),
        }
    }
}
