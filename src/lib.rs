//! A deterministic in-memory model of atomistic structures for staging
//! molecular-simulation inputs and normalizing their outputs.
//!
//! Structures arrive partially described: a CAR file carries coordinates
//! and the cell but no bonds, an MDF file carries typing and connectivity
//! but no coordinates. `usm` reads both into one [`Structure`] type, joins
//! them on atom identity, and runs geometry and topology operators whose
//! output is identical run to run.
//!
//! # Features
//!
//! - **Strict model** — dense atom and bond ids, normalized bond endpoints
//!   and finite-or-NaN coordinates, checked every time a structure is built
//! - **Lossless formats** — CAR, MDF and PDB adapters that keep headers and
//!   footers verbatim for byte-identical re-export
//! - **General lattices** — fractional/Cartesian conversion for triclinic
//!   cells with explicit rejection of degenerate parameters
//! - **Operators** — compose, wrap, supercell replication with periodic
//!   bond images, selection and guest grafting
//! - **Term sets** — canonical bond/angle/dihedral/improper type
//!   enumeration with a stable JSON export
//!
//! # Quick Start
//!
//! ```
//! use usm::{ComposeOptions, ReplicateOptions, TermSetOptions};
//! use usm::{compose, derive_termset, io, replicate_supercell};
//!
//! let car = "\
//! !BIOSYM archive 3
//! PBC=ON
//! water
//! !DATE
//! PBC   10.0000   10.0000   10.0000   90.0000   90.0000   90.0000 (P1)
//! O1       1.000000000    1.000000000    1.000000000 XXXX 1      o*      O  -0.820
//! H1       1.960000000    1.000000000    1.000000000 XXXX 1      h*      H   0.410
//! H2       0.760000000    1.930000000    1.000000000 XXXX 1      h*      H   0.410
//! end
//! end
//! ";
//! let mdf = "\
//! !BIOSYM molecular_data 4
//!
//! @molecule WATER
//!
//! XXXX_1:O1 O o* ? 0 0 -0.82 0 0 8 1.0 0.0 H1 H2
//! XXXX_1:H1 H h* ? 0 0 0.41 0 0 8 1.0 0.0 O1
//! XXXX_1:H2 H h* ? 0 0 0.41 0 0 8 1.0 0.0 O1
//!
//! !
//! #end
//! ";
//!
//! // Coordinates from CAR, bonds and typing from MDF
//! let coords = io::car::parse(car)?;
//! let topology = io::mdf::parse(mdf)?;
//! let merged = compose(&coords, &topology, &ComposeOptions::default())?;
//! assert_eq!(merged.report.matched_count, 3);
//! assert_eq!(merged.structure.bond_count(), 2);
//!
//! // Tile into a 2×2×2 supercell
//! let supercell = replicate_supercell(&merged.structure, 2, 2, 2, &ReplicateOptions::default())?;
//! assert_eq!(supercell.atom_count(), 24);
//! assert_eq!(supercell.bond_count(), 16);
//! assert_eq!(supercell.cell().lengths(), [20.0, 20.0, 20.0]);
//!
//! // One bond type (h*, o*) and one angle type (h*, o*, h*)
//! let terms = derive_termset(&supercell, &TermSetOptions::default())?;
//! assert_eq!(terms.bond_types.len(), 1);
//! assert_eq!(terms.angle_types.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`lattice`] — lattice matrices and coordinate conversion
//! - [`io`] — CAR, MDF and PDB adapters plus a JSON dump
//! - [`ops`] — compose, geometry operators, selection and graft
//! - [`topology`] — term-set derivation and coverage checks
//!
//! # Data Types
//!
//! - [`Structure`] — atoms, optional bonds, cell, provenance and preserved text
//! - [`Atom`] / [`AtomExtras`] — one atom and its format carry-through fields
//! - [`Bond`] — normalized pair with order, source and periodic image
//! - [`Cell`] — periodic cell parameters
//! - [`Provenance`] / [`PreservedText`] / [`Region`] — origin notes and verbatim regions
//! - [`AtomicView`] — read access shared by anything structure-like

mod model;

pub mod io;
pub mod lattice;
pub mod ops;
pub mod topology;

pub use lattice::{InvalidCellError, Lattice};

pub use model::atom::{Atom, AtomExtras};
pub use model::cell::Cell;
pub use model::error::SchemaError;
pub use model::provenance::{PreservedText, Provenance, Region};
pub use model::structure::{AtomicView, Bond, BondSource, Molecule, Structure, StructureParts};

pub use io::Format;

pub use ops::{
    AnchorSite, ComposeOptions, ComposeReport, Composed, CoveragePolicy, GraftAxis, GraftParams,
    GraftReport, Grafted, JoinField, PlacedSite, ReplicateOptions, SupercellReport, compose, graft,
    perceive_periodic_bonds, replicate_supercell, rotate, rotation_from_axis_angle,
    select_by_element, translate, validate_supercell, wrap_to_cell,
};

pub use topology::{
    MissingTypesError, TermCounts, TermSet, TermSetOptions, check_coverage, derive_termset,
};

pub use io::Error as IoError;
pub use ops::Error as OpsError;
pub use topology::Error as TopologyError;
