use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `esolar-api` crate.
///
/// Covers every failure mode of the portal protocol: authentication,
/// transport (connection, timeout, TLS) and protocol-level failures
/// (unexpected status, malformed JSON). `esolar-core` maps these into the
/// fetch-cycle taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The portal re-rendered the login page or refused the credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login endpoint answered with a status that is neither the
    /// success redirect nor a known rejection.
    #[error("Authentication failed for unknown reasons (HTTP {status})")]
    UnknownAuthentication { status: u16 },

    /// A data call was bounced back to the login page.
    #[error("Session expired -- {endpoint} answered HTTP {status}")]
    SessionExpired { endpoint: &'static str, status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Portal ──────────────────────────────────────────────────────
    /// A monitor endpoint answered with something other than HTTP 200.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error in {endpoint}: {message}")]
    Deserialization {
        endpoint: &'static str,
        message: String,
        body: String,
    },
}

impl Error {
    /// Classify a failed `send()`.
    ///
    /// Certificate and handshake failures become [`Error::Tls`] so they are
    /// never mistaken for bad credentials; timeouts carry the configured limit.
    pub fn from_send(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                timeout_secs: timeout.as_secs(),
            };
        }
        if let Some(tls) = find_rustls_error(&err) {
            return Self::Tls(match tls {
                rustls::Error::InvalidCertificate(_) => format!("certificate error: {tls}"),
                other => other.to_string(),
            });
        }
        if chain_mentions_certificate(&err) {
            return Self::Tls(format!("certificate error: {err}"));
        }
        Self::Transport(err)
    }

    /// Returns `true` for failures that mean the credentials or session are
    /// no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::UnknownAuthentication { .. }
                | Self::SessionExpired { .. }
        )
    }

    /// Returns `true` if a data call was bounced back to the login page.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. } | Self::Tls(_))
    }

    /// Returns `true` if this is a certificate verification failure.
    pub fn is_certificate_error(&self) -> bool {
        matches!(self, Self::Tls(msg) if msg.starts_with("certificate error"))
    }

    /// The HTTP status that caused this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnknownAuthentication { status }
            | Self::SessionExpired { status, .. }
            | Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Walk an error's source chain looking for the underlying rustls failure.
///
/// `std::io::Error` hides its payload from `source()`, so custom io errors
/// are unwrapped explicitly.
pub(crate) fn find_rustls_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a rustls::Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if let Some(tls) = io.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
                return Some(tls);
            }
        }
        current = e.source();
    }
    None
}

fn chain_mentions_certificate(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains("certificate") {
            return true;
        }
        current = e.source();
    }
    false
}
