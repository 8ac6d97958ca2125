//! Structure operators.
//!
//! Every operator takes its inputs by reference and returns a freshly built
//! [`Structure`](crate::Structure); ids in the result are always dense.
//!
//! | Operator | Module |
//! |----------|--------|
//! | [`compose`] | join of coordinate and topology views |
//! | [`wrap_to_cell`], [`translate`], [`rotate`] | coordinate transforms |
//! | [`replicate_supercell`] | supercell tiling |
//! | [`perceive_periodic_bonds`], [`validate_supercell`] | periodic connectivity |
//! | [`select_by_element`] | sub-structure extraction |
//! | [`graft`] | guest placement |

mod compose;
mod error;
mod graft;
mod periodic;
mod replicate;
mod select;
mod spatial;
mod transform;

pub use compose::{
    ComposeOptions, ComposeReport, Composed, CoveragePolicy, JoinField, KeyValue, compose,
};
pub use error::Error;
pub use graft::{AnchorSite, GraftAxis, GraftParams, GraftReport, Grafted, PlacedSite, graft};
pub use periodic::{SupercellReport, perceive_periodic_bonds, validate_supercell};
pub use replicate::{ReplicateOptions, replicate_supercell};
pub use select::select_by_element;
pub use transform::{WRAP_TOL, rotate, rotation_from_axis_angle, translate, wrap_to_cell};
