//! WebSocket transport over tokio-tungstenite

use crate::transport::{Connector, Transport, WireMessage};
use crate::{FeedError, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

/// Opens WebSocket connections with `connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait::async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport> {
        debug!("Opening WebSocket to {}", url);
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| FeedError::connection_failed_with_source(format!("cannot open {url}"), Box::new(e)))?;
        trace!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsTransport { stream, open: true })
    }
}

/// An open WebSocket connection.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    open: bool,
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<WireMessage>> {
        if !self.open {
            return None;
        }

        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    self.open = false;
                    return None;
                }
                Some(Err(e)) => {
                    self.open = false;
                    return Some(Err(e.into()));
                }
            };

            match message {
                Message::Binary(bytes) => return Some(Ok(WireMessage::Binary(bytes))),
                Message::Text(text) => return Some(Ok(WireMessage::Text(text.as_str().to_owned()))),
                Message::Close(frame) => {
                    debug!(?frame, "Server closed the WebSocket");
                    self.open = false;
                    return None;
                }
                // Pings are answered by tungstenite on the next read or write
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        if !self.open {
            return Err(FeedError::Closed);
        }
        self.stream.send(Message::Text(text.into())).await.map_err(|e| {
            self.open = false;
            FeedError::from(e)
        })
    }

    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.stream.close(None).await {
            trace!("Error while closing WebSocket: {}", e);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
