//! Broker lifecycle hooks.
//!
//! A broker adapter calls a [`BrokerHooks`] implementation from whichever
//! thread is serving the client session, so implementations must be
//! `Send + Sync` and must not assume any ordering across clients.

use std::sync::Arc;

use log::debug;

use crate::audit::{AuditLogger, AuditRecord};
use crate::event::{ClientInfo, ConnectPacket, LifecycleEvent, Publish, QoS};
use crate::filter::MessageFilter;

/// Handler for broker lifecycle callbacks.
///
/// All methods have default implementations, so a handler only overrides the
/// events it cares about. The default `on_message` forwards the message
/// unchanged.
pub trait BrokerHooks: Send + Sync + 'static {
    /// A client session hit a protocol or transport error.
    #[allow(unused_variables)]
    fn on_error(&self, client: &ClientInfo, error: &str) {}

    /// A client completed CONNECT.
    #[allow(unused_variables)]
    fn on_connect(&self, client: &ClientInfo, packet: &ConnectPacket) {}

    /// A client session ended, with the transport error if there was one.
    #[allow(unused_variables)]
    fn on_disconnect(&self, client: &ClientInfo, reason: Option<&str>) {}

    /// A subscription was granted.
    #[allow(unused_variables)]
    fn on_subscribe(&self, client: &ClientInfo, filter: &str, qos: QoS) {}

    /// A subscription was removed.
    #[allow(unused_variables)]
    fn on_unsubscribe(&self, client: &ClientInfo, filter: &str) {}

    /// A PUBLISH arrived.
    ///
    /// Returning `None` tells the adapter not to forward the message.
    #[allow(unused_variables)]
    fn on_message(&self, client: &ClientInfo, publish: Publish) -> Option<Publish> {
        Some(publish)
    }
}

/// Deliver a [`LifecycleEvent`] to `hooks`.
///
/// Returns the message to forward for [`LifecycleEvent::Message`], and `None`
/// for every other event.
pub fn dispatch(hooks: &dyn BrokerHooks, event: LifecycleEvent) -> Option<Publish> {
    match event {
        LifecycleEvent::Error { client, error } => {
            hooks.on_error(&client, &error);
            None
        }
        LifecycleEvent::Connect { client, packet } => {
            hooks.on_connect(&client, &packet);
            None
        }
        LifecycleEvent::Disconnect { client, reason } => {
            hooks.on_disconnect(&client, reason.as_deref());
            None
        }
        LifecycleEvent::Subscribe {
            client,
            filter,
            qos,
        } => {
            hooks.on_subscribe(&client, &filter, qos);
            None
        }
        LifecycleEvent::Unsubscribe { client, filter } => {
            hooks.on_unsubscribe(&client, &filter);
            None
        }
        LifecycleEvent::Message { client, publish } => hooks.on_message(&client, publish),
    }
}

/// Hooks that gate messages through the allow-lists and audit everything.
///
/// Lifecycle events are always logged. Messages are logged and forwarded only
/// when the filter admits them.
#[derive(Debug, Clone)]
pub struct AuditHooks {
    filter: Arc<MessageFilter>,
    logger: Arc<AuditLogger>,
}

impl AuditHooks {
    pub fn new(filter: Arc<MessageFilter>, logger: Arc<AuditLogger>) -> Self {
        Self { filter, logger }
    }

    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    pub fn logger(&self) -> &AuditLogger {
        &self.logger
    }
}

impl BrokerHooks for AuditHooks {
    fn on_error(&self, client: &ClientInfo, error: &str) {
        self.logger.record(&AuditRecord::error(client, error));
    }

    fn on_connect(&self, client: &ClientInfo, packet: &ConnectPacket) {
        self.logger.record(&AuditRecord::connect(client, packet));
    }

    fn on_disconnect(&self, client: &ClientInfo, reason: Option<&str>) {
        self.logger.record(&AuditRecord::disconnect(client, reason));
    }

    fn on_subscribe(&self, client: &ClientInfo, filter: &str, qos: QoS) {
        self.logger.record(&AuditRecord::subscribed(client, filter, qos));
    }

    fn on_unsubscribe(&self, client: &ClientInfo, filter: &str) {
        self.logger.record(&AuditRecord::unsubscribed(client, filter));
    }

    fn on_message(&self, client: &ClientInfo, publish: Publish) -> Option<Publish> {
        if !self
            .filter
            .admits(&client.id, &publish.topic, &publish.payload_str())
        {
            debug!("Dropped message from {} on {}", client.id, publish.topic);
            return None;
        }
        self.logger.record(&AuditRecord::message(client, &publish));
        Some(publish)
    }
}
