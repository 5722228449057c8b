// eSolar portal protocol
//
// Session login plus the monitor endpoints, all sharing one cookie jar
// through `PortalClient`.

pub mod auth;
pub mod client;
pub mod devices;
pub mod endpoint;
pub mod meter;
pub mod plants;
pub mod window;

pub use client::{Credentials, PortalClient};
pub use devices::DeviceScope;
pub use endpoint::Endpoint;
pub use window::ChartWindow;
