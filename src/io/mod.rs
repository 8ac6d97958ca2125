//! Format adapters between text and [`Structure`].
//!
//! | Format | Carries | Module |
//! |--------|---------|--------|
//! | CAR (`!BIOSYM archive 3`) | coordinates, cell, atom types, charges | [`car`] |
//! | MDF (`!BIOSYM molecular_data 4`) | connectivity, typing, MDF columns | [`mdf`] |
//! | PDB | coordinates, cell, CONECT connectivity | [`pdb`] |
//! | JSON | full structure dump (write only) | [`json`] |
//!
//! Every text adapter exposes `parse(&str)` / `serialize(&Structure, preserve_raw)`
//! plus streaming `read` / `write` wrappers. Regions of the input that carry
//! no structured meaning (headers, footers) are kept verbatim in the
//! structure's [`PreservedText`](crate::PreservedText) and are written back
//! byte-for-byte when `preserve_raw` is set.

use std::fmt;
use std::io::{BufRead, Write};

use serde::Serialize;

use crate::model::structure::Structure;

pub mod error;
pub mod util;

pub mod car;
pub mod json;
pub mod mdf;
pub mod pdb;

pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    Car,
    Mdf,
    Pdb,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Car => write!(f, "CAR"),
            Format::Mdf => write!(f, "MDF"),
            Format::Pdb => write!(f, "PDB"),
            Format::Json => write!(f, "JSON"),
        }
    }
}

/// Reads a structure in `format` from `reader`.
pub fn read<R: BufRead>(reader: R, format: Format) -> Result<Structure, Error> {
    match format {
        Format::Car => car::read(reader),
        Format::Mdf => mdf::read(reader),
        Format::Pdb => pdb::read(reader),
        Format::Json => Err(Error::UnsupportedReadFormat(format)),
    }
}

/// Writes `structure` in `format` to `writer`.
pub fn write<W: Write>(
    writer: W,
    structure: &Structure,
    format: Format,
    preserve_raw: bool,
) -> Result<(), Error> {
    match format {
        Format::Car => car::write(writer, structure, preserve_raw),
        Format::Mdf => mdf::write(writer, structure, preserve_raw),
        Format::Pdb => pdb::write(writer, structure, preserve_raw, &pdb::WriteOptions::default()),
        Format::Json => json::write(writer, structure),
    }
}

/// Parses `text` as `format`.
pub fn parse(text: &str, format: Format) -> Result<Structure, Error> {
    read(text.as_bytes(), format)
}

/// Serializes `structure` as `format` into a string.
pub fn serialize(structure: &Structure, format: Format, preserve_raw: bool) -> Result<String, Error> {
    let mut buf = Vec::new();
    write(&mut buf, structure, format, preserve_raw)?;
    String::from_utf8(buf).map_err(|e| {
        Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
