//! Discord implementation of the chat gateway
//!
//! Nicknames go through the REST API. Presence ("Listening to ...") can only
//! be set over the gateway websocket, so every session keeps one socket open:
//!
//! ```text
//! connect(token)
//!     ↓
//! HELLO → IDENTIFY → READY      (bounded by GATEWAY_CONNECT_TIMEOUT_SECS)
//!     ↓
//! background task: heartbeat + latest presence + reconnect on loss
//! ```
//!
//! Presence is "latest wins": `set_status` only replaces the pending value,
//! so a session never blocks while its socket is down.

use crate::{
    constants::{
        DISCORD_API_URL, DISCORD_GATEWAY_URL, GATEWAY_CONNECT_TIMEOUT_SECS,
        GATEWAY_RECONNECT_DELAY_SECS, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::GatewayError,
    gateway::{ChatSession, Gateway},
};
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_PRESENCE_UPDATE: u8 = 3;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// Close codes after which reconnecting with the same token cannot succeed
const FATAL_CLOSE_CODES: &[u16] = &[4004, 4010, 4011, 4012, 4013, 4014];

/// Activity type shown as "Listening to"
const ACTIVITY_LISTENING: u8 = 2;

/// Incoming gateway frame
#[derive(Debug, Deserialize)]
struct GatewayEvent {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// IDENTIFY payload for a bot token
pub fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": 0,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "coin-ticker-bot",
                "device": "coin-ticker-bot"
            }
        }
    })
}

/// PRESENCE_UPDATE payload setting a single "Listening to" activity
pub fn presence_payload(text: &str) -> Value {
    json!({
        "op": OP_PRESENCE_UPDATE,
        "d": {
            "since": null,
            "activities": [{ "name": text, "type": ACTIVITY_LISTENING }],
            "status": "online",
            "afk": false
        }
    })
}

/// HEARTBEAT payload carrying the last seen sequence number
pub fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": seq })
}

/// True if the gateway closed the session for good (bad token, bad intents)
fn is_fatal(err: &GatewayError) -> bool {
    matches!(err, GatewayError::HandshakeRejected { code, .. } if FATAL_CLOSE_CODES.contains(code))
}

/// Tracks whether the last heartbeat was acknowledged
#[derive(Debug, Default)]
struct HeartbeatTracker {
    awaiting_ack: bool,
}

impl HeartbeatTracker {
    /// Marks a heartbeat as sent; fails if the previous one was never acknowledged
    fn beat(&mut self) -> Result<(), GatewayError> {
        if self.awaiting_ack {
            return Err(GatewayError::ConnectionFailed(
                "heartbeat not acknowledged".to_string(),
            ));
        }
        self.awaiting_ack = true;
        Ok(())
    }

    fn ack(&mut self) {
        self.awaiting_ack = false;
    }
}

/// An identified gateway connection
struct Connection {
    sink: futures::stream::SplitSink<WsStream, Message>,
    stream: futures::stream::SplitStream<WsStream>,
    heartbeat: Duration,
    seq: Option<u64>,
}

async fn send_json<S>(sink: &mut S, payload: &Value) -> Result<(), GatewayError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    sink.send(Message::Text(payload.to_string().into())).await?;
    Ok(())
}

/// Reads frames until the next JSON event, surfacing close frames as errors
async fn next_event<S>(stream: &mut S) -> Result<GatewayEvent, GatewayError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).map_err(|e| {
                    GatewayError::ConnectionFailed(format!("malformed gateway frame: {}", e))
                });
            }
            Some(Ok(Message::Close(Some(frame)))) => {
                return Err(GatewayError::HandshakeRejected {
                    code: u16::from(frame.code),
                    reason: frame.reason.as_str().to_string(),
                });
            }
            Some(Ok(Message::Close(None))) | None => {
                return Err(GatewayError::ConnectionFailed(
                    "connection closed by gateway".to_string(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Opens the websocket and runs HELLO → IDENTIFY → READY
async fn handshake(url: &str, token: &str) -> Result<Connection, GatewayError> {
    let attempt = async {
        let (socket, _) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let hello = next_event(&mut stream).await?;
        if hello.op != OP_HELLO {
            return Err(GatewayError::ConnectionFailed(format!(
                "expected HELLO, got op {}",
                hello.op
            )));
        }
        let heartbeat_ms = hello
            .d
            .get("heartbeat_interval")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                GatewayError::ConnectionFailed("HELLO without heartbeat_interval".to_string())
            })?;

        send_json(&mut sink, &identify_payload(token)).await?;

        let mut seq = None;
        loop {
            let event = next_event(&mut stream).await?;
            if event.s.is_some() {
                seq = event.s;
            }
            match event.op {
                OP_DISPATCH if event.t.as_deref() == Some("READY") => break,
                OP_INVALID_SESSION => {
                    return Err(GatewayError::HandshakeRejected {
                        code: 0,
                        reason: "invalid session".to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok::<_, GatewayError>(Connection {
            sink,
            stream,
            heartbeat: Duration::from_millis(heartbeat_ms),
            seq,
        })
    };

    timeout(Duration::from_secs(GATEWAY_CONNECT_TIMEOUT_SECS), attempt)
        .await
        .map_err(|_| GatewayError::Timeout)?
}

/// Serves one connection until it breaks (`Err`) or the session is dropped (`Ok`)
async fn pump(
    conn: &mut Connection,
    presence: &mut watch::Receiver<Option<Value>>,
) -> Result<(), GatewayError> {
    let mut heartbeat = interval_at(Instant::now() + conn.heartbeat, conn.heartbeat);
    let mut acks = HeartbeatTracker::default();

    loop {
        tokio::select! {
            changed = presence.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let payload = presence.borrow_and_update().clone();
                if let Some(payload) = payload {
                    send_json(&mut conn.sink, &payload).await?;
                }
            }
            _ = heartbeat.tick() => {
                acks.beat()?;
                send_json(&mut conn.sink, &heartbeat_payload(conn.seq)).await?;
            }
            event = next_event(&mut conn.stream) => {
                let event = event?;
                if event.s.is_some() {
                    conn.seq = event.s;
                }
                match event.op {
                    OP_HEARTBEAT => send_json(&mut conn.sink, &heartbeat_payload(conn.seq)).await?,
                    OP_HEARTBEAT_ACK => acks.ack(),
                    OP_RECONNECT => {
                        return Err(GatewayError::ConnectionFailed(
                            "gateway requested reconnect".to_string(),
                        ));
                    }
                    OP_INVALID_SESSION => {
                        return Err(GatewayError::ConnectionFailed("session invalidated".to_string()));
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Background owner of a session's socket
async fn drive(
    url: String,
    token: String,
    mut conn: Connection,
    mut presence: watch::Receiver<Option<Value>>,
) {
    loop {
        match pump(&mut conn, &mut presence).await {
            Ok(()) => {
                tracing::debug!("Session dropped, closing gateway connection");
                let _ = conn.sink.close().await;
                return;
            }
            Err(e) if is_fatal(&e) => {
                tracing::error!(error = %e, "Gateway closed the session for good, not reconnecting");
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Gateway connection lost, reconnecting"),
        }

        conn = loop {
            sleep(Duration::from_secs(GATEWAY_RECONNECT_DELAY_SECS)).await;
            if presence.has_changed().is_err() {
                tracing::debug!("Session dropped while reconnecting");
                return;
            }

            let mut fresh = match handshake(&url, &token).await {
                Ok(fresh) => fresh,
                Err(e) if is_fatal(&e) => {
                    tracing::error!(error = %e, "Gateway rejected reconnect, giving up");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Gateway reconnect failed");
                    continue;
                }
            };

            let latest = presence.borrow_and_update().clone();
            if let Some(payload) = latest {
                if let Err(e) = send_json(&mut fresh.sink, &payload).await {
                    tracing::warn!(error = %e, "Failed to restore presence after reconnect");
                    continue;
                }
            }

            tracing::info!("Gateway connection re-established");
            break fresh;
        };
    }
}

/// Discord session for one bot token
pub struct DiscordSession {
    http: Client,
    api_base: String,
    token: String,
    presence: watch::Sender<Option<Value>>,
}

#[async_trait]
impl ChatSession for DiscordSession {
    async fn set_nickname(&self, guild_id: &str, nickname: &str) -> Result<(), GatewayError> {
        let url = format!("{}/guilds/{}/members/@me", self.api_base, guild_id);

        let response = self
            .http
            .patch(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "nick": nickname }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            return Err(GatewayError::RequestRejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn set_status(&self, text: &str) -> Result<(), GatewayError> {
        // Fails only once the background task has given up on the session
        self.presence
            .send(Some(presence_payload(text)))
            .map_err(|_| GatewayError::SessionClosed)
    }
}

/// Discord gateway
pub struct DiscordGateway {
    http: Client,
    api_base: String,
    gateway_url: String,
}

impl DiscordGateway {
    /// Creates a gateway against Discord's public endpoints
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_endpoints(DISCORD_API_URL, DISCORD_GATEWAY_URL)
    }

    /// Creates a gateway against custom REST and websocket endpoints
    pub fn with_endpoints(
        api_base: impl Into<String>,
        gateway_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into(),
        })
    }
}

#[async_trait]
impl Gateway for DiscordGateway {
    async fn connect(&self, token: &str) -> Result<Arc<dyn ChatSession>, GatewayError> {
        tracing::debug!("Opening websocket connection to Discord");
        let conn = handshake(&self.gateway_url, token).await?;

        let (presence_tx, presence_rx) = watch::channel(None);

        tokio::spawn(drive(
            self.gateway_url.clone(),
            token.to_string(),
            conn,
            presence_rx,
        ));

        Ok(Arc::new(DiscordSession {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: token.to_string(),
            presence: presence_tx,
        }))
    }
}
