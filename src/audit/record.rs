//! Audit records and their console/CSV renderings.

use std::borrow::Cow;
use std::fmt::Write;

use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;

use crate::config::DEFAULT_TIME_FORMAT;
use crate::event::{ClientInfo, ConnectPacket, Publish, QoS};

/// Kind of lifecycle event a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connect,
    Disconnect,
    Subscribed,
    Unsubscribed,
    Message,
    Error,
}

/// Which file sink a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Connection state changes (status file).
    Status,
    /// Message content (data file).
    Data,
    /// Console only.
    Console,
}

impl EventKind {
    /// One-character console tag.
    pub fn code(self) -> char {
        match self {
            EventKind::Connect => 'L',
            EventKind::Disconnect => 'D',
            EventKind::Subscribed => 'S',
            EventKind::Unsubscribed => 'U',
            EventKind::Message => 'M',
            EventKind::Error => 'E',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Connect => "Connect",
            EventKind::Disconnect => "Disconnect",
            EventKind::Subscribed => "Subscribed",
            EventKind::Unsubscribed => "Unsubscribed",
            EventKind::Message => "Message",
            EventKind::Error => "Error",
        }
    }

    pub fn category(self) -> Category {
        match self {
            EventKind::Connect
            | EventKind::Disconnect
            | EventKind::Subscribed
            | EventKind::Unsubscribed => Category::Status,
            EventKind::Message => Category::Data,
            EventKind::Error => Category::Console,
        }
    }
}

/// One loggable lifecycle or message event.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    /// Client in display form (`id` or `id (addr)`).
    pub client: String,
    pub kind: EventKind,
    /// Topic name, subscription filter, or empty.
    pub subject: String,
    pub detail: String,
}

impl AuditRecord {
    pub fn new(
        kind: EventKind,
        client: &ClientInfo,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            client: client.to_string(),
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }

    /// Connect record; the detail combines client and packet metadata as JSON.
    pub fn connect(client: &ClientInfo, packet: &ConnectPacket) -> Self {
        let detail = format!(
            "{{\"Client\":{},\"Packet\":{}}}",
            json_or_empty(client),
            json_or_empty(packet)
        );
        Self::new(EventKind::Connect, client, "", detail)
    }

    /// Disconnect record; multi-line reasons are folded onto one line.
    pub fn disconnect(client: &ClientInfo, reason: Option<&str>) -> Self {
        let detail = reason.map(single_line).unwrap_or_default();
        Self::new(EventKind::Disconnect, client, "", detail)
    }

    pub fn subscribed(client: &ClientInfo, filter: &str, qos: QoS) -> Self {
        Self::new(EventKind::Subscribed, client, filter, qos.to_string())
    }

    pub fn unsubscribed(client: &ClientInfo, filter: &str) -> Self {
        Self::new(EventKind::Unsubscribed, client, filter, "")
    }

    pub fn message(client: &ClientInfo, publish: &Publish) -> Self {
        Self::new(
            EventKind::Message,
            client,
            publish.topic.as_str(),
            publish.payload_str(),
        )
    }

    pub fn error(client: &ClientInfo, error: &str) -> Self {
        Self::new(EventKind::Error, client, "", error)
    }

    /// Human-readable console message, without time or tag.
    pub fn console_message(&self) -> String {
        match self.kind {
            EventKind::Connect | EventKind::Disconnect => {
                format!("Client {} {}: {}", self.client, self.kind.label(), self.detail)
            }
            EventKind::Subscribed => format!(
                "Client {} Subscribed {}, (QOS:{})",
                self.client, self.subject, self.detail
            ),
            EventKind::Unsubscribed => {
                format!("Client {} Unsubscribed {}", self.client, self.subject)
            }
            EventKind::Message => format!(
                "Message: {}, Topic: {}, Payload: {}",
                self.client, self.subject, self.detail
            ),
            EventKind::Error => format!("Client {}: {}", self.client, self.detail),
        }
    }

    /// Subject and detail columns for the file sinks.
    ///
    /// Status rows put the event label in the subject column.
    pub fn file_fields(&self) -> (Cow<'_, str>, Cow<'_, str>) {
        match self.kind {
            EventKind::Message => (
                Cow::Borrowed(self.subject.as_str()),
                Cow::Borrowed(self.detail.as_str()),
            ),
            EventKind::Subscribed => (
                Cow::Borrowed(self.kind.label()),
                Cow::Owned(format!("{} (QOS{})", self.subject, self.detail)),
            ),
            EventKind::Unsubscribed => {
                (Cow::Borrowed(self.kind.label()), Cow::Borrowed(self.subject.as_str()))
            }
            EventKind::Connect | EventKind::Disconnect | EventKind::Error => {
                (Cow::Borrowed(self.kind.label()), Cow::Borrowed(self.detail.as_str()))
            }
        }
    }

    /// Render the CSV row, including the trailing newline.
    pub fn to_csv(&self, time_format: Option<&str>) -> String {
        let (subject, detail) = self.file_fields();
        let mut line = String::with_capacity(
            self.client.len() + subject.len() + detail.len() + 32,
        );
        if let Some(format) = time_format {
            push_field(&mut line, &format_time(&self.timestamp, format));
            line.push(',');
        }
        push_field(&mut line, &self.client);
        line.push(',');
        push_field(&mut line, &subject);
        line.push(',');
        push_field(&mut line, &detail);
        line.push('\n');
        line
    }
}

/// Serialize metadata, degrading to an empty string on failure.
pub fn json_or_empty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        debug!("Failed to serialize event metadata: {}", e);
        String::new()
    })
}

/// Format a timestamp, falling back to the default format if `format` is unusable.
pub fn format_time(timestamp: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", timestamp.format(DEFAULT_TIME_FORMAT));
    }
    out
}

/// Collapse line breaks to spaces.
pub fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

// Quote a field; embedded quotes become apostrophes so each record stays one row.
fn push_field(line: &mut String, value: &str) {
    line.push('"');
    for c in value.chars() {
        match c {
            '"' => line.push('\''),
            '\r' | '\n' => line.push(' '),
            c => line.push(c),
        }
    }
    line.push('"');
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;

    use super::*;

    fn client() -> ClientInfo {
        ClientInfo::new("sensor1")
    }

    #[test]
    fn test_message_csv_row() {
        let publish = Publish::new("plant/a", Bytes::from_static(b"alert: fire"));
        let record = AuditRecord::message(&client(), &publish);
        assert_eq!(record.to_csv(None), "\"sensor1\",\"plant/a\",\"alert: fire\"\n");
    }

    #[test]
    fn test_quotes_are_neutralized() {
        let publish = Publish::new("t", Bytes::from_static(b"say \"hi\", then \"bye\""));
        let line = AuditRecord::message(&client(), &publish).to_csv(None);
        assert_eq!(line, "\"sensor1\",\"t\",\"say 'hi', then 'bye'\"\n");
        // Only the six field delimiters remain.
        assert_eq!(line.matches('"').count(), 6);
    }

    #[test]
    fn test_newlines_stay_in_one_row() {
        let publish = Publish::new("t", Bytes::from_static(b"line1\nline2\r\nline3"));
        let line = AuditRecord::message(&client(), &publish).to_csv(None);
        assert_eq!(line.lines().count(), 1);
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_timestamp_column() {
        let publish = Publish::new("t", Bytes::from_static(b"p"));
        let mut record = AuditRecord::message(&client(), &publish);
        record.timestamp = chrono::TimeZone::with_ymd_and_hms(&Local, 2024, 3, 9, 7, 5, 1)
            .single()
            .unwrap();
        let line = record.to_csv(Some(DEFAULT_TIME_FORMAT));
        assert_eq!(line, "\"2024-03-09 07:05:01\",\"sensor1\",\"t\",\"p\"\n");
    }

    #[test]
    fn test_connect_detail_combines_client_and_packet() {
        let record = AuditRecord::connect(&client(), &ConnectPacket::default());
        assert!(record.detail.starts_with("{\"Client\":{\"ID\":\"sensor1\""));
        assert!(record.detail.contains("\"Packet\":{\"ProtocolName\":\"MQTT\""));

        let line = record.to_csv(None);
        assert!(line.starts_with("\"sensor1\",\"Connect\",\"{'Client':{'ID':'sensor1'"));
        assert_eq!(line.matches('"').count(), 6);
    }

    #[test]
    fn test_disconnect_reason_single_line() {
        let record = AuditRecord::disconnect(&client(), Some("read tcp:\nconnection reset\r\nby peer"));
        assert_eq!(record.detail, "read tcp: connection reset by peer");
        assert_eq!(
            AuditRecord::disconnect(&client(), None).to_csv(None),
            "\"sensor1\",\"Disconnect\",\"\"\n"
        );
    }

    #[test]
    fn test_subscribe_rows() {
        let record = AuditRecord::subscribed(&client(), "plant/#", QoS::AtLeastOnce);
        assert_eq!(
            record.to_csv(None),
            "\"sensor1\",\"Subscribed\",\"plant/# (QOS1)\"\n"
        );
        assert_eq!(
            record.console_message(),
            "Client sensor1 Subscribed plant/#, (QOS:1)"
        );

        let record = AuditRecord::unsubscribed(&client(), "plant/#");
        assert_eq!(record.to_csv(None), "\"sensor1\",\"Unsubscribed\",\"plant/#\"\n");
    }

    #[test]
    fn test_categories() {
        assert_eq!(EventKind::Connect.category(), Category::Status);
        assert_eq!(EventKind::Unsubscribed.category(), Category::Status);
        assert_eq!(EventKind::Message.category(), Category::Data);
        assert_eq!(EventKind::Error.category(), Category::Console);
    }

    #[test]
    fn test_serialization_failure_degrades_to_empty() {
        // JSON object keys must be strings.
        let mut bad = HashMap::new();
        bad.insert((1u8, 2u8), 3u8);
        assert_eq!(json_or_empty(&bad), "");
    }

    #[test]
    fn test_bad_time_format_falls_back() {
        let ts = Local::now();
        let rendered = format_time(&ts, "%Q");
        assert_eq!(rendered, ts.format(DEFAULT_TIME_FORMAT).to_string());
    }
}
