//! TLS/SSL configuration.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::TlsError;
use crate::identity::TlsMode;

/// TLS identity inputs. Which paths are present decides the listener mode.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM bundle of CAs trusted to sign client certificates.
    #[serde(deserialize_with = "super::optional_path")]
    pub ca: Option<PathBuf>,
    /// PEM-encoded server certificate chain.
    #[serde(deserialize_with = "super::optional_path")]
    pub cert: Option<PathBuf>,
    /// Server private key. PEM when `key_password` is empty, raw PKCS#1 DER otherwise.
    #[serde(deserialize_with = "super::optional_path")]
    pub key: Option<PathBuf>,
    /// Selects the raw key format when non-empty.
    pub key_password: String,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca", &self.ca)
            .field("cert", &self.cert)
            .field("key", &self.key)
            .field("key_password", &format_args!("({})", self.key_password.len()))
            .finish()
    }
}

impl TlsConfig {
    /// Derive the listener mode from the inputs that were supplied.
    pub fn requested_mode(&self) -> Result<TlsMode, TlsError> {
        match (&self.cert, &self.key, &self.ca) {
            (None, None, None) => Ok(TlsMode::NoTls),
            (Some(_), None, _) => Err(TlsError::Incomplete {
                missing: "tls.key",
                present: "tls.cert",
            }),
            (None, Some(_), _) => Err(TlsError::Incomplete {
                missing: "tls.cert",
                present: "tls.key",
            }),
            (None, None, Some(ca)) => Err(TlsError::CaWithoutIdentity(ca.clone())),
            (Some(_), Some(_), None) => Ok(TlsMode::ServerAuth),
            (Some(_), Some(_), Some(_)) => Ok(TlsMode::MutualTls),
        }
    }

    /// Validate the TLS configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.requested_mode().map(|_| ()).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(ca: bool, cert: bool, key: bool) -> TlsConfig {
        TlsConfig {
            ca: ca.then(|| PathBuf::from("/etc/mqlite/ca.pem")),
            cert: cert.then(|| PathBuf::from("/etc/mqlite/server.pem")),
            key: key.then(|| PathBuf::from("/etc/mqlite/server.key")),
            key_password: String::new(),
        }
    }

    #[test]
    fn test_no_inputs_is_plaintext() {
        assert_eq!(paths(false, false, false).requested_mode().unwrap(), TlsMode::NoTls);
    }

    #[test]
    fn test_cert_and_key_is_server_auth() {
        assert_eq!(
            paths(false, true, true).requested_mode().unwrap(),
            TlsMode::ServerAuth
        );
    }

    #[test]
    fn test_ca_cert_and_key_is_mutual() {
        assert_eq!(
            paths(true, true, true).requested_mode().unwrap(),
            TlsMode::MutualTls
        );
    }

    #[test]
    fn test_ca_alone_fails() {
        assert!(matches!(
            paths(true, false, false).requested_mode(),
            Err(TlsError::CaWithoutIdentity(_))
        ));
    }

    #[test]
    fn test_partial_identity_fails() {
        assert!(paths(false, true, false).validate().is_err());
        assert!(paths(false, false, true).validate().is_err());
        assert!(paths(true, true, false).validate().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = TlsConfig {
            key_password: "hunter2".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("(7)"));
    }
}
