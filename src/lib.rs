//! mqlite-probe - Audit and filtering core for an embedded MQTT test broker.
//!
//! This crate loads the listener's TLS identity, gates inbound messages
//! through client/topic/payload allow-lists, and writes an audit trail of
//! every session to the console and to CSV files. The MQTT engine itself is
//! supplied by the host through [`BrokerAdapter`].
//!
//! # Example
//!
//! ```ignore
//! use mqlite_probe::{logging, Config, Probe};
//!
//! let config = Config::load("mqlite-probe.toml")?;
//! logging::init(&config.log);
//!
//! let probe = Probe::from_config(config)?;
//! probe.start(&mut broker)?;
//! // ...
//! probe.shutdown(&mut broker)?;
//! ```
//!
//! Adapters that deliver events over a channel can feed [`LifecycleEvent`]s
//! to [`hooks::dispatch`] instead of calling the hooks directly.

pub mod adapter;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod hooks;
pub mod identity;
pub mod logging;
mod probe;

pub use adapter::{BrokerAdapter, ListenerConfig};
pub use audit::{AuditLogger, AuditRecord, EventKind};
pub use auth::{AllowAll, Authenticator, UserFile};
pub use config::Config;
pub use error::{Result, StartupError, TlsError};
pub use event::{ClientInfo, ConnectPacket, LifecycleEvent, Publish, QoS};
pub use filter::{AllowList, Dimension, MessageFilter};
pub use hooks::{AuditHooks, BrokerHooks};
pub use identity::{load_identity, ServerIdentity, TlsMode};
pub use probe::Probe;
