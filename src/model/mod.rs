//! Core data structures for atomistic structures.
//!
//! - [`atom`] – One atom row: identity triple, typing, charge, coordinates and
//!   format carry-through fields.
//! - [`cell`] – Unit cell parameters and their lattice.
//! - [`structure`] – The [`Structure`] container with its bond table and the
//!   dense-identifier invariants enforced on construction.
//! - [`provenance`] – Source notes and verbatim text regions kept for
//!   lossless re-export.
//! - [`error`] – [`SchemaError`] raised when construction invariants fail.
//!
//! [`Structure`]: structure::Structure
//! [`SchemaError`]: error::SchemaError

pub mod atom;
pub mod cell;
pub mod error;
pub mod provenance;
pub mod structure;
