//! Fetch-cycle engine between `esolar-api` and consumers (CLI, exporters).
//!
//! - **[`Portal`]**: facade owning one authenticated session. Runs
//!   single-flight fetch cycles, throttles them, serves stale readings on
//!   transient failures and can poll in the background.
//!
//! - **[`Sequencer`]**: the dependent chain of portal calls (plant list,
//!   detail, devices, chart, then storage or meter extras) folded into one
//!   [`AggregateDocument`].
//!
//! - **Field extraction** ([`field`]): paths, coercions and the built-in
//!   catalog turning the document into a [`Snapshot`] of typed values.

pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod portal;
pub mod sequencer;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{LoginPolicy, ModuleVariant, PortalConfig};
pub use document::AggregateDocument;
pub use error::{CoreError, ErrorKind, ExtractionError, FetchStep};
pub use field::{FieldSchema, FieldSpec, FieldValue, Unit};
pub use portal::{Fetched, Portal, Reading, ReadingSource};
pub use sequencer::{CycleIds, FetchState, Sequencer};
pub use snapshot::Snapshot;

// Consumers build a config without depending on esolar-api directly.
pub use esolar_api::{Credentials, Provider, Scheme, TlsMode, TransportConfig};
