//! Error type shared by the structure operators.

use crate::lattice::InvalidCellError;
use crate::model::error::SchemaError;
use thiserror::Error;

/// Failures raised by [`compose`](super::compose), the geometry operators,
/// [`graft`](super::graft) and selection.
///
/// Partial outcomes (unmatched join rows, unplaced graft sites) are not
/// errors; they are reported alongside the result.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needs a valid periodic lattice. A cell with `pbc`
    /// off surfaces as [`InvalidCellError::NotPeriodic`].
    #[error("invalid cell: {0}")]
    InvalidCell(#[from] InvalidCellError),

    /// A join key matched more than one row. `keys` is sorted and
    /// pipe-joined per key.
    #[error("ambiguous join key(s): {}", keys.join(", "))]
    AmbiguousJoinKey {
        /// Offending keys, sorted.
        keys: Vec<String>,
    },

    /// Fewer primary rows matched than the coverage policy demands.
    #[error("join coverage {matched}/{total} is below the required fraction {required}")]
    InsufficientCoverage {
        matched: usize,
        total: usize,
        required: f64,
    },

    #[error("invalid argument '{name}': {details}")]
    InvalidArgument { name: &'static str, details: String },

    /// The rebuilt structure violated a model invariant.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            details: details.into(),
        }
    }
}
