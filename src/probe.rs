//! Startup and shutdown orchestration.
//!
//! [`Probe::from_config`] builds every long-lived component in a fixed
//! order: audit sinks, allow-lists, TLS identity, authentication, listener.
//! Any failure aborts startup before a listener exists. The fatal error is
//! printed to the console (`X`) and returned.

use std::sync::Arc;

use log::{error, info};

use crate::adapter::{BrokerAdapter, ListenerConfig};
use crate::audit::{AuditLogger, ConsoleSink, Notice};
use crate::auth;
use crate::config::Config;
use crate::error::{Result, StartupError};
use crate::filter::{Dimension, MessageFilter};
use crate::hooks::AuditHooks;
use crate::identity::{ServerIdentity, TlsMode};

const LISTENER_ID: &str = "t1";

/// The assembled test-broker core.
#[derive(Debug)]
pub struct Probe {
    config: Config,
    filter: Arc<MessageFilter>,
    logger: Arc<AuditLogger>,
    identity: Option<ServerIdentity>,
    listener: ListenerConfig,
}

impl Probe {
    /// Open the configured sinks and build the core.
    pub fn from_config(config: Config) -> Result<Self> {
        let colors = !config.log.monochrome;
        Self::open(config, move || ConsoleSink::stdout(colors))
    }

    /// `console` is called again for a bare console if a file sink fails to
    /// open, so the failure still gets its `X` line.
    fn open(config: Config, console: impl Fn() -> ConsoleSink) -> Result<Self> {
        let logger = match AuditLogger::open_with(console(), &config.audit) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                error!("{}", e);
                AuditLogger::new(console(), None, None, &config.audit)
                    .notice(Notice::Fatal, &e.to_string());
                return Err(e);
            }
        };
        Self::with_logger(config, logger)
    }

    /// Build the core around an already-open logger.
    pub fn with_logger(config: Config, logger: Arc<AuditLogger>) -> Result<Self> {
        match Self::assemble(config, &logger) {
            Ok(probe) => Ok(probe),
            Err(e) => {
                error!("Startup failed: {}", e);
                logger.notice(Notice::Fatal, &e.to_string());
                Err(e)
            }
        }
    }

    fn assemble(config: Config, logger: &Arc<AuditLogger>) -> Result<Self> {
        report_sinks(&config, logger);

        let filter = MessageFilter::from_config(&config.filter);
        for list in filter.enabled() {
            let label = match list.dimension() {
                Dimension::ClientId => "Client filter",
                Dimension::Topic => "Topic filter",
                Dimension::PayloadKeyword => "Payload filter",
            };
            logger.notice(Notice::Config, &format!("{}: {}", label, list.entries().join(", ")));
        }

        let identity = ServerIdentity::from_config(&config.tls)?;
        let tls = match &identity {
            Some(identity) => {
                for file in identity.files() {
                    logger.notice(
                        Notice::Config,
                        &format!("Loaded {} {} ({} bytes)", file.what, file.path.display(), file.len),
                    );
                }
                if !config.tls.key_password.is_empty() {
                    logger.notice(
                        Notice::Config,
                        &format!("Key password length: {}", config.tls.key_password.len()),
                    );
                }
                Some(identity.server_config()?)
            }
            None => None,
        };
        let mode = identity.as_ref().map_or(TlsMode::NoTls, ServerIdentity::mode);

        let auth = auth::from_config(&config.auth)?;
        logger.notice(Notice::Config, &format!("Authentication: {}", auth.describe()));

        let listener = ListenerConfig {
            id: LISTENER_ID.to_string(),
            bind: config.server.bind,
            mode,
            tls,
            auth,
        };

        Ok(Self {
            config,
            filter: Arc::new(filter),
            logger: Arc::clone(logger),
            identity,
            listener,
        })
    }

    /// Hooks gating messages through the filter into the logger.
    pub fn hooks(&self) -> AuditHooks {
        AuditHooks::new(Arc::clone(&self.filter), Arc::clone(&self.logger))
    }

    /// Register the listener and hooks with `adapter` and start serving.
    pub fn start<A: BrokerAdapter>(&self, adapter: &mut A) -> Result<()> {
        match self
            .register(adapter)
            .map_err(|e| StartupError::Adapter(Box::new(e)))
        {
            Ok(()) => {
                info!("Listening on {} ({})", self.listener.bind, self.listener.mode);
                self.logger.notice(
                    Notice::Info,
                    &format!("Listening on {} ({})", self.listener.bind, self.listener.mode),
                );
                Ok(())
            }
            Err(e) => {
                error!("Startup failed: {}", e);
                self.logger.notice(Notice::Fatal, &e.to_string());
                Err(e)
            }
        }
    }

    fn register<A: BrokerAdapter>(&self, adapter: &mut A) -> std::result::Result<(), A::Error> {
        adapter.add_listener(self.listener.clone())?;
        adapter.set_hooks(Arc::new(self.hooks()));
        adapter.serve()
    }

    /// Close the adapter, then the sinks.
    ///
    /// If the adapter fails to close, the sinks stay open: callbacks may
    /// still be in flight.
    pub fn shutdown<A: BrokerAdapter>(&self, adapter: &mut A) -> Result<()> {
        adapter
            .close()
            .map_err(|e| StartupError::Adapter(Box::new(e)))?;
        self.logger.notice(Notice::Info, "Broker closed");
        self.logger.close();
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &Arc<MessageFilter> {
        &self.filter
    }

    pub fn logger(&self) -> &Arc<AuditLogger> {
        &self.logger
    }

    pub fn identity(&self) -> Option<&ServerIdentity> {
        self.identity.as_ref()
    }

    pub fn listener(&self) -> &ListenerConfig {
        &self.listener
    }

    pub fn mode(&self) -> TlsMode {
        self.listener.mode
    }
}

fn report_sinks(config: &Config, logger: &AuditLogger) {
    let sinks = [
        ("Data log", &config.audit.data_log),
        ("Status log", &config.audit.status_log),
        ("Console log", &config.audit.console_log),
    ];
    for (label, path) in sinks {
        if let Some(path) = path {
            logger.notice(Notice::Config, &format!("{}: {}", label, path.display()));
        }
    }
    if config.audit.timestamps {
        logger.notice(
            Notice::Config,
            &format!("Timestamps: {}", config.audit.time_format),
        );
    }
}
