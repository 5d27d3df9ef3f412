//! WebSocket transport backed by tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::ports::stream::{StreamConnector, StreamError, StreamSession};

/// Opens WebSocket sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn StreamSession>, StreamError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

        info!(url, status = %response.status(), "WebSocket connected");
        Ok(Box::new(WebSocketSession { stream }))
    }
}

struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamSession for WebSocketSession {
    async fn send_text(&mut self, text: String) -> Result<(), StreamError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| StreamError::SendFailed(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                // Control frames are answered by tungstenite itself
                Ok(_) => continue,
                Err(e) => return Some(Err(StreamError::ReceiveFailed(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| StreamError::SendFailed(e.to_string()))
    }
}
