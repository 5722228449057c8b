// ── Field extraction ──
//
// Turns the aggregate document into a flat map of typed, unit-tagged
// measurements. Paths locate values, coercions type them, the catalog
// knows where every built-in field lives.

pub mod catalog;
pub mod coerce;
pub mod extract;
pub mod path;
pub mod schema;
pub mod value;

pub use coerce::{Coercion, DirectionTable};
pub use extract::{Extraction, extract};
pub use path::{FieldPath, PathParseError, Segment};
pub use schema::{FieldModule, FieldSchema, FieldSpec, Unit};
pub use value::FieldValue;
