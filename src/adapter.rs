//! The broker adapter seam.
//!
//! The MQTT engine itself lives outside this crate. An embedding host wraps
//! it in a [`BrokerAdapter`], and the probe drives it through this trait:
//! register the listener, install the hooks, serve, and close.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use rustls::ServerConfig;

use crate::auth::Authenticator;
use crate::hooks::BrokerHooks;
use crate::identity::TlsMode;

/// Everything the adapter needs to open one listener.
#[derive(Clone)]
pub struct ListenerConfig {
    /// Listener identifier, reported back in `ClientInfo::listener`.
    pub id: String,
    pub bind: SocketAddr,
    pub mode: TlsMode,
    /// Present for `ServerAuth` and `MutualTls`.
    pub tls: Option<Arc<ServerConfig>>,
    pub auth: Arc<dyn Authenticator>,
}

impl fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("id", &self.id)
            .field("bind", &self.bind)
            .field("mode", &self.mode)
            .field("auth", &self.auth.describe())
            .finish_non_exhaustive()
    }
}

/// An embedded MQTT broker.
///
/// Implementations call the installed hooks from their session threads. After
/// `close` returns, no hook may be invoked again.
pub trait BrokerAdapter {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Register a listener. Called before `serve`.
    fn add_listener(&mut self, listener: ListenerConfig) -> Result<(), Self::Error>;

    /// Install the lifecycle hooks. Called before `serve`.
    fn set_hooks(&mut self, hooks: Arc<dyn BrokerHooks>);

    /// Start accepting clients. Returns once the listeners are up.
    fn serve(&mut self) -> Result<(), Self::Error>;

    /// Stop the broker and wait until no further hooks can fire.
    fn close(&mut self) -> Result<(), Self::Error>;
}
