//! A [PushTransport] that connects to the push hub over a WebSocket.

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    net::TcpStream,
    time::{Instant, Interval, interval_at},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::{
    Error,
    live::{
        hub::{FrameBuffer, HubMessage, handshake_request, parse_message, ping_message},
        reconciler::{InboundMessage, PushConnection, PushTransport},
    },
};

/// How often to send a ping so that idle connections stay open.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// How long the hub has to answer the handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the hub at a `ws://` or `wss://` URL.
///
/// The hub must accept WebSocket connections directly, without a prior
/// negotiation request.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// Create a transport for the hub at `url`, e.g. "wss://example.com/transactionHub".
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
        }
    }
}

/// An open hub connection.
pub struct WebSocketConnection {
    stream: Stream,
    buffer: FrameBuffer,
    pending: VecDeque<String>,
    keep_alive: Interval,
}

fn transport_error(context: &str, error: impl std::fmt::Display) -> Error {
    Error::Transport(format!("{context}: {error}"))
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn connect(&self) -> Result<Self::Connection, Error> {
        tracing::debug!("Connecting to the push hub at {}", self.url);

        let (mut stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|error| transport_error("could not open the WebSocket", error))?;

        stream
            .send(Message::Text(handshake_request()))
            .await
            .map_err(|error| transport_error("could not send the handshake", error))?;

        let mut buffer = FrameBuffer::default();
        let mut pending = VecDeque::new();

        let response = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let mut frames = buffer.push(&text).into_iter();

                        if let Some(first) = frames.next() {
                            pending.extend(frames);
                            return Ok(first);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(Error::Transport(
                            "the connection closed during the handshake".to_owned(),
                        ));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        return Err(transport_error("could not read the handshake", error));
                    }
                }
            }
        })
        .await
        .map_err(|_| Error::Transport("timed out waiting for the handshake".to_owned()))??;

        match parse_message(&response)? {
            HubMessage::HandshakeResponse { error: None } => {}
            HubMessage::HandshakeResponse { error: Some(reason) } => {
                return Err(Error::PushChannelClosed {
                    reason,
                    allow_reconnect: false,
                });
            }
            other => {
                return Err(Error::InvalidResponse(format!(
                    "expected a handshake response, got {other:?}"
                )));
            }
        }

        Ok(WebSocketConnection {
            stream,
            buffer,
            pending,
            keep_alive: interval_at(Instant::now() + KEEP_ALIVE_INTERVAL, KEEP_ALIVE_INTERVAL),
        })
    }
}

impl WebSocketConnection {
    /// Decode the next buffered message the reconciler needs to see.
    fn next_pending(&mut self) -> Option<Result<InboundMessage, Error>> {
        while let Some(frame) = self.pending.pop_front() {
            match parse_message(&frame) {
                Ok(HubMessage::Invocation {
                    target,
                    mut arguments,
                }) => {
                    let payload = if arguments.is_empty() {
                        Value::Null
                    } else {
                        arguments.swap_remove(0)
                    };

                    return Some(Ok(InboundMessage { target, payload }));
                }
                Ok(HubMessage::Close {
                    error,
                    allow_reconnect,
                }) => {
                    return Some(Err(Error::PushChannelClosed {
                        reason: error.unwrap_or_default(),
                        allow_reconnect,
                    }));
                }
                Ok(HubMessage::Ping | HubMessage::HandshakeResponse { .. }) => {}
                Ok(HubMessage::Other(message_type)) => {
                    tracing::debug!("Ignoring hub message of type {message_type}");
                }
                Err(error) => tracing::warn!("Skipping hub message: {error}"),
            }
        }

        None
    }
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, Error>> {
        loop {
            if let Some(message) = self.next_pending() {
                return Some(message);
            }

            tokio::select! {
                _ = self.keep_alive.tick() => {
                    if let Err(error) = self.stream.send(Message::Text(ping_message())).await {
                        return Some(Err(transport_error("could not send a ping", error)));
                    }
                }
                message = self.stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        let frames = self.buffer.push(&text);
                        self.pending.extend(frames);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Some(Err(Error::PushChannelClosed {
                            reason: frame.map(|frame| frame.reason.to_string()).unwrap_or_default(),
                            allow_reconnect: true,
                        }));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        return Some(Err(transport_error("could not read from the hub", error)));
                    }
                    None => return None,
                },
            }
        }
    }
}
