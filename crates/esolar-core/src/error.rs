// ── Core error types ──
//
// User-facing errors from esolar-core. Consumers see which step of the
// fetch cycle failed and which class of failure it was; raw reqwest errors
// and response bodies stay in esolar-api.

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use esolar_api::Endpoint;

/// A step of the fetch cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FetchStep {
    Login,
    PlantList,
    PlantDetail,
    DeviceList,
    PlantChart,
    StorePower,
    MeterModules,
    MeterDevices,
    MeterDetail,
    MeterEnergyPreview,
    MeterChart,
}

impl FetchStep {
    /// The portal call this step makes. `None` for the login form.
    pub fn endpoint(self) -> Option<Endpoint> {
        Some(match self {
            Self::Login => return None,
            Self::PlantList => Endpoint::UserPlantList,
            Self::PlantDetail => Endpoint::PlantDetailInfo,
            Self::DeviceList | Self::MeterDevices => Endpoint::DevicePageList,
            Self::PlantChart => Endpoint::PlantDetailChart,
            Self::StorePower => Endpoint::StoreDevicePower,
            Self::MeterModules => Endpoint::MeterModuleList,
            Self::MeterDetail => Endpoint::MeterDetailInfo,
            Self::MeterEnergyPreview => Endpoint::MeterEnergyPreview,
            Self::MeterChart => Endpoint::MeterChartData,
        })
    }
}

/// Coarse failure class, used by callers to pick a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials rejected or session lost. Prompt the user.
    Auth,
    /// No HTTP response: connection, TLS or timeout. Retry later.
    Transport,
    /// The portal answered but not with usable data. Retry later.
    Api,
    /// The caller aborted the cycle.
    Cancelled,
    /// Local configuration is unusable.
    Config,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Authentication failed for unknown reasons (HTTP {status})")]
    UnknownAuthentication { status: u16 },

    #[error("Session expired during {step} (HTTP {status})")]
    SessionExpired { step: FetchStep, status: u16 },

    // ── Transport ────────────────────────────────────────────────────
    #[error("Cannot reach the portal during {step}: {reason}")]
    ConnectionFailed { step: FetchStep, reason: String },

    #[error("TLS error during {step}: {reason}")]
    Tls { step: FetchStep, reason: String },

    #[error("Timed out during {step} after {timeout_secs}s")]
    Timeout { step: FetchStep, timeout_secs: u64 },

    // ── Portal data ──────────────────────────────────────────────────
    #[error("{step} failed: portal returned HTTP {status}")]
    Status { step: FetchStep, status: u16 },

    #[error("{step} returned a malformed response: {message}")]
    MalformedResponse { step: FetchStep, message: String },

    #[error("Plant not found: index {index} but the account lists {available} plant(s)")]
    PlantNotFound { index: usize, available: usize },

    #[error("Device not found: {reason}")]
    DeviceNotFound { reason: String },

    #[error("Meter module not found for plant {plant_uid}")]
    ModuleNotFound { plant_uid: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Fetch cycle cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Translate a transport-layer error raised while running `step`.
    pub fn from_api(step: FetchStep, err: esolar_api::Error) -> Self {
        use esolar_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::UnknownAuthentication { status } => Self::UnknownAuthentication { status },
            Api::SessionExpired { status, .. } => Self::SessionExpired { step, status },
            Api::Transport(e) => Self::ConnectionFailed {
                step,
                reason: e.to_string(),
            },
            Api::Timeout { timeout_secs } => Self::Timeout { step, timeout_secs },
            Api::Tls(reason) => Self::Tls { step, reason },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("invalid portal URL: {e}"),
            },
            Api::Status { status, .. } => Self::Status { step, status },
            Api::Deserialization { message, .. } => Self::MalformedResponse { step, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed { .. }
            | Self::UnknownAuthentication { .. }
            | Self::SessionExpired { .. } => ErrorKind::Auth,
            Self::ConnectionFailed { .. } | Self::Tls { .. } | Self::Timeout { .. } => {
                ErrorKind::Transport
            }
            Self::Status { .. }
            | Self::MalformedResponse { .. }
            | Self::PlantNotFound { .. }
            | Self::DeviceNotFound { .. }
            | Self::ModuleNotFound { .. } => ErrorKind::Api,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// The cycle step that failed, when the error came from one.
    pub fn step(&self) -> Option<FetchStep> {
        match self {
            Self::SessionExpired { step, .. }
            | Self::ConnectionFailed { step, .. }
            | Self::Tls { step, .. }
            | Self::Timeout { step, .. }
            | Self::Status { step, .. }
            | Self::MalformedResponse { step, .. } => Some(*step),
            Self::AuthenticationFailed { .. } | Self::UnknownAuthentication { .. } => {
                Some(FetchStep::Login)
            }
            Self::PlantNotFound { .. } => Some(FetchStep::PlantList),
            Self::DeviceNotFound { .. } => Some(FetchStep::DeviceList),
            Self::ModuleNotFound { .. } => Some(FetchStep::MeterModules),
            Self::Cancelled | Self::Config { .. } => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// The portal refused the login form itself. Unlike an expired
    /// session, logging in again cannot help until the credentials change.
    pub fn is_login_rejected(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::UnknownAuthentication { .. }
        )
    }

    /// Transport and API failures; the next cycle may well succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Api)
    }
}

/// Login and session calls outside a cycle are attributed to the login step.
impl From<esolar_api::Error> for CoreError {
    fn from(err: esolar_api::Error) -> Self {
        Self::from_api(FetchStep::Login, err)
    }
}

/// A field whose value was present but could not be coerced.
///
/// Non-fatal: the field is absent from the snapshot and every other field
/// is still extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{key}: {reason}")]
pub struct ExtractionError {
    pub key: String,
    pub reason: String,
}
