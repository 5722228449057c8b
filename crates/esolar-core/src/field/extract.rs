use tracing::{debug, trace};

use super::schema::FieldSpec;
use crate::document::AggregateDocument;
use crate::error::ExtractionError;
use crate::snapshot::Snapshot;

/// Outcome of [`extract`]: the snapshot plus per-field coercion failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub snapshot: Snapshot,
    pub errors: Vec<ExtractionError>,
}

/// Read every field of `fields` out of `document`.
///
/// Never fails. The snapshot has exactly one entry per distinct key: the
/// coerced value, or absent when the path is missing or coercion fails.
/// Coercion failures are also reported in [`Extraction::errors`].
pub fn extract<'a>(
    document: &AggregateDocument,
    fields: impl IntoIterator<Item = &'a FieldSpec>,
) -> Extraction {
    let mut out = Extraction::default();

    for spec in fields {
        let value = match document.lookup(&spec.path) {
            None => {
                trace!(field = %spec.key, path = %spec.path, "absent");
                None
            }
            Some(raw) => match spec.coercion.apply(&spec.key, raw) {
                Ok(value) => Some(value),
                Err(reason) => {
                    debug!(field = %spec.key, %reason, "coercion failed");
                    out.errors.push(ExtractionError {
                        key: spec.key.clone(),
                        reason,
                    });
                    None
                }
            },
        };
        out.snapshot.insert(spec.key.clone(), value);
    }

    out
}
