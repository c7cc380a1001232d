//! STOMP-over-WebSocket transport.
//!
//! Heart-beats are negotiated on `CONNECT`. While a connection waits for the
//! next message it sends its own beats on schedule and treats a broker that
//! stays silent past the agreed window as a dropped connection, so a
//! half-open socket ends in a reconnect instead of a hang.

use crate::channel::stomp::{Command, Frame, HeartBeat, DEFAULT_HEART_BEAT};
use crate::channel::{EventConnection, EventTransport, TransportError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Outbound = SplitSink<Socket, Message>;
type Inbound = SplitStream<Socket>;

/// Connects to a STOMP broker endpoint such as `ws://host:8080/ws/websocket`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    host: String,
    heart_beat: Duration,
}

impl WebSocketTransport {
    /// Offers [`DEFAULT_HEART_BEAT`] in both directions.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = host_of(&url).to_string();
        Self { url, host, heart_beat: DEFAULT_HEART_BEAT }
    }

    /// Offers `interval` instead; zero turns heart-beating off.
    pub fn with_heart_beat(mut self, interval: Duration) -> Self {
        self.heart_beat = interval;
        self
    }
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    authority.rsplit_once(':').map_or(authority, |(host, _)| host)
}

#[async_trait]
impl EventTransport for WebSocketTransport {
    async fn connect(&self, token: &str) -> Result<Box<dyn EventConnection>, TransportError> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let (mut outbound, mut inbound) = socket.split();
        send(&mut outbound, Frame::connect(&self.host, token, self.heart_beat)).await?;

        let frame = loop {
            match read_frame(&mut inbound).await {
                Some(Ok(Some(frame))) => break frame,
                Some(Ok(None)) => continue,
                Some(Err(e)) => return Err(e),
                None => return Err(TransportError::Handshake("closed during handshake".into())),
            }
        };

        match frame.command {
            Command::Connected => {
                let agreed = HeartBeat::negotiate(self.heart_beat, &frame)?;
                debug!(
                    url = %self.url,
                    version = frame.header("version"),
                    send_every = ?agreed.send_every,
                    expect_within = ?agreed.expect_within,
                    "STOMP session opened"
                );
                Ok(Box::new(WebSocketConnection::new(outbound, inbound, agreed)))
            }
            Command::Error => Err(TransportError::Handshake(error_text(&frame))),
            other => Err(TransportError::Protocol(format!("expected CONNECTED, got {other}"))),
        }
    }
}

pub struct WebSocketConnection {
    outbound: Outbound,
    inbound: Inbound,
    subscription: Option<String>,
    next_id: u32,
    pulse: Option<Interval>,
    silence: Option<Duration>,
    last_heard: Instant,
}

enum Wake {
    Read(Option<Result<Option<Frame>, TransportError>>),
    Beat,
    Silent,
}

impl WebSocketConnection {
    fn new(outbound: Outbound, inbound: Inbound, agreed: HeartBeat) -> Self {
        let pulse = agreed.send_every.map(|every| {
            let mut pulse = time::interval_at(Instant::now() + every, every);
            pulse.set_missed_tick_behavior(MissedTickBehavior::Delay);
            pulse
        });
        Self {
            outbound,
            inbound,
            subscription: None,
            next_id: 0,
            pulse,
            silence: agreed.expect_within,
            last_heard: Instant::now(),
        }
    }
}

#[async_trait]
impl EventConnection for WebSocketConnection {
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;
        send(&mut self.outbound, Frame::subscribe(&id, topic)).await?;
        self.subscription = Some(id);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let deadline = self.silence.map(|window| self.last_heard + window);
            let wake = tokio::select! {
                read = read_frame(&mut self.inbound) => Wake::Read(read),
                _ = tick(self.pulse.as_mut()) => Wake::Beat,
                _ = expire(deadline) => Wake::Silent,
            };

            let frame = match wake {
                Wake::Read(None) => return None,
                Wake::Read(Some(Err(e))) => return Some(Err(e)),
                Wake::Read(Some(Ok(frame))) => {
                    self.last_heard = Instant::now();
                    match frame {
                        Some(frame) => frame,
                        None => continue,
                    }
                }
                Wake::Beat => {
                    if let Err(e) = send_text(&mut self.outbound, "\n".to_string()).await {
                        return Some(Err(e));
                    }
                    continue;
                }
                Wake::Silent => {
                    return Some(Err(TransportError::Dropped(format!(
                        "no heart-beat from broker within {:?}",
                        self.silence.unwrap_or_default()
                    ))))
                }
            };

            match frame.command {
                Command::Message => {
                    let ours = match (frame.header("subscription"), &self.subscription) {
                        (Some(got), Some(id)) => got == id,
                        _ => true,
                    };
                    if ours {
                        return Some(Ok(frame.body));
                    }
                    debug!(subscription = frame.header("subscription"), "Ignoring foreign MESSAGE");
                }
                Command::Error => return Some(Err(TransportError::Protocol(error_text(&frame)))),
                _ => debug!(command = %frame.command, "Ignoring STOMP frame"),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(id) = self.subscription.take() {
            let _ = send(&mut self.outbound, Frame::unsubscribe(&id)).await;
        }
        let _ = send(&mut self.outbound, Frame::disconnect()).await;
        let _ = self.outbound.close().await;
    }
}

async fn tick(pulse: Option<&mut Interval>) {
    match pulse {
        Some(pulse) => {
            pulse.tick().await;
        }
        None => future::pending().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn send(outbound: &mut Outbound, frame: Frame) -> Result<(), TransportError> {
    send_text(outbound, frame.encode()).await
}

async fn send_text(outbound: &mut Outbound, text: String) -> Result<(), TransportError> {
    outbound
        .send(Message::Text(text))
        .await
        .map_err(|e| TransportError::Dropped(e.to_string()))
}

/// Reads one WebSocket message.
///
/// `Ok(None)` is traffic that carries no frame: a heart-beat or a control
/// message. It still proves the broker is alive.
async fn read_frame(inbound: &mut Inbound) -> Option<Result<Option<Frame>, TransportError>> {
    let text = match inbound.next().await? {
        Ok(Message::Text(text)) => text,
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Some(Err(TransportError::Protocol("non UTF-8 frame".into()))),
        },
        Ok(Message::Close(_)) => return None,
        Ok(_) => return Some(Ok(None)),
        Err(e) => return Some(Err(TransportError::Dropped(e.to_string()))),
    };
    Some(Frame::decode(&text))
}

fn error_text(frame: &Frame) -> String {
    match (frame.header("message"), frame.body.trim()) {
        (Some(message), _) => message.to_string(),
        (None, "") => "broker sent ERROR".to_string(),
        (None, body) => body.to_string(),
    }
}
