//! Term-set derivation: the distinct bonded-interaction types implied by a
//! structure's connectivity and atom types.
//!
//! The export is what a force-field layer reads to decide which parameters
//! it must supply; [`check_coverage`] is the consumer-side check of that
//! contract.

mod error;
mod termset;

pub use error::{Error, MissingTypesError};
pub use termset::{
    SCHEMA, TermCounts, TermSet, TermSetOptions, check_coverage, derive_termset,
};
