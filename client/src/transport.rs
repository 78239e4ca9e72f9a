//! WebSocket transport
//!
//! Owns the socket. A reader task turns incoming frames into
//! [`TransportEvent`]s and a writer task drains outgoing text frames, so the
//! run loop only ever talks to two channels.

use crate::config::Endpoint;
use crate::error::ClientError;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed. Always the first event.
    Opened,
    /// One text frame, undecoded.
    Message(String),
    /// The channel is gone. Emitted once, and nothing follows it.
    Closed { reason: Option<String> },
}

pub struct Transport {
    outgoing: Option<mpsc::Sender<String>>,
    events: mpsc::Receiver<TransportEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Transport {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ClientError> {
        let url = endpoint.url();
        info!("Connecting to {}...", url);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        info!("WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

        // Queued before the reader exists, so nothing can overtake it.
        events_tx
            .send(TransportEvent::Opened)
            .await
            .map_err(|_| ClientError::ConnectionLost("event channel closed".into()))?;

        let reader = tokio::spawn(async move {
            let mut reason = None;

            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Dropping non-UTF-8 binary frame: {}", e);
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        info!("Server closed connection");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        reason = Some(e.to_string());
                        break;
                    }
                };

                if events_tx.send(TransportEvent::Message(text)).await.is_err() {
                    debug!("Event receiver dropped, stopping reader");
                    return;
                }
            }

            let _ = events_tx.send(TransportEvent::Closed { reason }).await;
            debug!("Reader task ended");
        });

        let writer = tokio::spawn(async move {
            while let Some(text) = outgoing_rx.recv().await {
                debug!("Sending: {}", text);
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!("Failed to send message: {}", e);
                    return;
                }
            }

            let _ = write.send(Message::Close(None)).await;
            debug!("Writer task ended");
        });

        Ok(Self {
            outgoing: Some(outgoing_tx),
            events: events_rx,
            reader,
            writer,
        })
    }

    /// Queues one text frame. Frames go out in the order they were queued.
    pub async fn send(&self, text: String) -> Result<(), ClientError> {
        let outgoing = self
            .outgoing
            .as_ref()
            .ok_or_else(|| ClientError::ConnectionLost("transport closed".into()))?;

        outgoing
            .send(text)
            .await
            .map_err(|_| ClientError::ConnectionLost("writer stopped".into()))
    }

    /// Next event from the reader. `None` only after `Closed` was delivered
    /// or the reader was torn down.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Stops accepting frames; the writer flushes what is queued and sends a
    /// close frame.
    pub fn close(&mut self) {
        self.outgoing = None;
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.reader.abort();
        if self.outgoing.is_some() {
            self.writer.abort();
        }
    }
}
