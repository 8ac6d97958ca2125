//! Protein Data Bank fixed-column records.
//!
//! Only the records that map onto the structure model are interpreted:
//! `CRYST1` (cell), `ATOM`/`HETATM` (atoms, first model only) and `CONECT`
//! (bonds). A file without any `CONECT` record yields unknown topology.
//! Lines before the first body record are kept as the PDB header region.

mod reader;
mod writer;

pub use reader::read;
pub use writer::{ConectPolicy, WriteOptions, write};

use crate::io::error::Error;
use crate::model::structure::Structure;

pub fn parse(text: &str) -> Result<Structure, Error> {
    read(text.as_bytes())
}

pub fn serialize(
    structure: &Structure,
    preserve_raw: bool,
    options: &WriteOptions,
) -> Result<String, Error> {
    let mut buf = Vec::new();
    write(&mut buf, structure, preserve_raw, options)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
