// esolar-api: Async Rust client for the SAJ eSolar web portal

pub mod error;
pub mod portal;
pub mod provider;
pub mod transport;

pub use error::Error;
pub use portal::{ChartWindow, Credentials, DeviceScope, Endpoint, PortalClient};
pub use provider::{Provider, Scheme};
pub use transport::{TlsMode, TransportConfig};
