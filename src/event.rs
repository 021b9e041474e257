//! Metadata carried by broker lifecycle callbacks.
//!
//! The broker adapter fills these in from its own session state; the core
//! only reads and serializes them.

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use serde::Serialize;

/// Quality of Service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> u8 {
        qos as u8
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// A connected client, as reported by the broker adapter.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientInfo {
    /// Client identifier.
    #[serde(rename = "ID")]
    pub id: String,
    /// Remote address.
    pub remote: Option<SocketAddr>,
    /// Listener the client connected through.
    pub listener: String,
    /// Username from CONNECT, if any.
    pub username: Option<String>,
}

impl ClientInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_remote(mut self, remote: SocketAddr) -> Self {
        self.remote = Some(remote);
        self
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote {
            Some(remote) => write!(f, "{} ({})", self.id, remote),
            None => f.write_str(&self.id),
        }
    }
}

/// Will message declared in CONNECT.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WillInfo {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
}

/// CONNECT packet metadata.
///
/// The password is never serialized.
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectPacket {
    pub protocol_name: String,
    pub protocol_version: u8,
    pub clean_start: bool,
    pub keep_alive: u16,
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<Bytes>,
    pub will: Option<WillInfo>,
}

impl Default for ConnectPacket {
    fn default() -> Self {
        Self {
            protocol_name: "MQTT".to_string(),
            protocol_version: 4,
            clean_start: true,
            keep_alive: 60,
            username: None,
            password: None,
            will: None,
        }
    }
}

impl fmt::Debug for ConnectPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectPacket")
            .field("protocol_name", &self.protocol_name)
            .field("protocol_version", &self.protocol_version)
            .field("clean_start", &self.clean_start)
            .field("keep_alive", &self.keep_alive)
            .field("username", &self.username)
            .field("will", &self.will)
            .finish_non_exhaustive()
    }
}

/// An inbound PUBLISH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    pub packet_id: Option<u16>,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: None,
        }
    }

    /// Payload as text. Invalid UTF-8 sequences are replaced.
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// One broker lifecycle callback, as a value.
///
/// Adapters that deliver events over a channel rather than by calling
/// [`BrokerHooks`](crate::hooks::BrokerHooks) directly send these and use
/// [`dispatch`](crate::hooks::dispatch).
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Error {
        client: ClientInfo,
        error: String,
    },
    Connect {
        client: ClientInfo,
        packet: ConnectPacket,
    },
    Disconnect {
        client: ClientInfo,
        reason: Option<String>,
    },
    Subscribe {
        client: ClientInfo,
        filter: String,
        qos: QoS,
    },
    Unsubscribe {
        client: ClientInfo,
        filter: String,
    },
    Message {
        client: ClientInfo,
        publish: Publish,
    },
}
