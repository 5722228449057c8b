//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use esolar_config::ConfigError;
use esolar_core::{CoreError, FetchStep};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const API: i32 = 9;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the portal during {step}")]
    #[diagnostic(
        code(esolar::connection_failed),
        help("Check your network connection and the portal host.\n{reason}")
    )]
    ConnectionFailed { step: FetchStep, reason: String },

    #[error("TLS error during {step}: {reason}")]
    #[diagnostic(
        code(esolar::tls_error),
        help(
            "Some reseller portals serve incomplete certificate chains.\n\
             Use --insecure (-k) to accept it, or set ca_cert in your profile."
        )
    )]
    Tls { step: FetchStep, reason: String },

    #[error("Timed out during {step} after {seconds}s")]
    #[diagnostic(
        code(esolar::timeout),
        help("Increase timeout with --timeout, or cycle_timeout in your profile.")
    )]
    Timeout { step: FetchStep, seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(esolar::auth_failed),
        help(
            "Check the username and password for profile '{profile}'.\n\
             Run: esolar config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(esolar::no_credentials),
        help(
            "Configure credentials with: esolar config init\n\
             Or set the ESOLAR_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Portal data ──────────────────────────────────────────────────
    #[error("{what} not found: {detail}")]
    #[diagnostic(
        code(esolar::not_found),
        help("Check plant_index and variant in your profile.")
    )]
    NotFound { what: String, detail: String },

    #[error("Portal error: {message}")]
    #[diagnostic(
        code(esolar::api_error),
        help("The portal may be under maintenance. Retry later, with -vv for details.")
    )]
    Api { message: String },

    #[error("Background polling failed: {reason}")]
    #[diagnostic(code(esolar::poll_task), help("Re-run with -vv for details."))]
    PollTask { reason: String },

    #[error("Interrupted")]
    #[diagnostic(code(esolar::interrupted))]
    Interrupted,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(esolar::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(esolar::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: esolar config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No configuration found")]
    #[diagnostic(
        code(esolar::no_config),
        help(
            "Create one with: esolar config init\n\
             Or pass --username and set ESOLAR_PASSWORD.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(esolar::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(esolar::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Api { .. } => exit_code::API,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Translate a core error, naming `profile` in auth help text.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            CoreError::UnknownAuthentication { status } => Self::AuthFailed {
                profile: profile.into(),
                message: format!("portal answered the login form with HTTP {status}"),
            },
            CoreError::SessionExpired { step, status } => Self::AuthFailed {
                profile: profile.into(),
                message: format!("session expired during {step} (HTTP {status})"),
            },
            CoreError::ConnectionFailed { step, reason } => Self::ConnectionFailed { step, reason },
            CoreError::Tls { step, reason } => Self::Tls { step, reason },
            CoreError::Timeout { step, timeout_secs } => Self::Timeout {
                step,
                seconds: timeout_secs,
            },
            e @ (CoreError::Status { .. } | CoreError::MalformedResponse { .. }) => Self::Api {
                message: e.to_string(),
            },
            CoreError::PlantNotFound { index, available } => Self::NotFound {
                what: "Plant".into(),
                detail: format!("index {index}, the account lists {available}"),
            },
            CoreError::DeviceNotFound { reason } => Self::NotFound {
                what: "Device".into(),
                detail: reason,
            },
            CoreError::ModuleNotFound { plant_uid } => Self::NotFound {
                what: "Meter module".into(),
                detail: format!("plant {plant_uid} has no SEC module; try variant = \"base\""),
            },
            CoreError::Cancelled => Self::Interrupted,
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_failure_class() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "invalid credentials".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::PlantNotFound {
                    index: 1,
                    available: 1,
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ConnectionFailed {
                    step: FetchStep::Login,
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Timeout {
                    step: FetchStep::PlantChart,
                    timeout_secs: 10,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::Status {
                    step: FetchStep::DeviceList,
                    status: 500,
                },
                exit_code::API,
            ),
        ];

        for (err, code) in cases {
            let desc = err.to_string();
            assert_eq!(CliError::from_core(err, "default").exit_code(), code, "{desc}");
        }
    }

    #[test]
    fn missing_password_is_an_auth_failure() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "roof".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
