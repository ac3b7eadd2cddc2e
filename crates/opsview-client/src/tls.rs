//! TLS verification setting
//!
//! The `verify_ssl` option is either a path to a PEM CA bundle or a boolean
//! flag. A value naming an existing file always wins over the boolean reading.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::{Certificate, ClientBuilder};

use crate::error::{ClientError, Result};

/// How server certificates are verified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerify {
    /// Verify against the system roots
    #[default]
    Enabled,
    /// Accept any certificate
    Disabled,
    /// Verify against the system roots plus a PEM bundle
    CaBundle(PathBuf),
}

impl TlsVerify {
    /// Parse a `verify_ssl` value
    ///
    /// # Errors
    /// Returns [`ClientError::Tls`] if the value is neither an existing file
    /// nor a recognised boolean.
    pub fn parse(value: &str) -> Result<Self> {
        let path = Path::new(value);
        if path.is_file() {
            return Ok(Self::CaBundle(path.to_path_buf()));
        }

        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "t" | "on" | "1" => Ok(Self::Enabled),
            "no" | "n" | "false" | "f" | "off" | "0" => Ok(Self::Disabled),
            _ => Err(ClientError::Tls(format!(
                "verify_ssl must be a boolean or an existing CA bundle path, got {value:?}"
            ))),
        }
    }

    /// Apply the setting to a `reqwest` client builder
    ///
    /// # Errors
    /// Returns an error if the CA bundle cannot be read or parsed.
    pub fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder> {
        match self {
            Self::Enabled => Ok(builder),
            Self::Disabled => {
                tracing::warn!("TLS certificate verification is disabled");
                Ok(builder.danger_accept_invalid_certs(true))
            }
            Self::CaBundle(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    ClientError::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    ClientError::Tls(format!("invalid CA bundle {}: {e}", path.display()))
                })?;
                Ok(builder.add_root_certificate(cert))
            }
        }
    }
}

impl fmt::Display for TlsVerify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
            Self::CaBundle(path) => write!(f, "ca bundle {}", path.display()),
        }
    }
}
