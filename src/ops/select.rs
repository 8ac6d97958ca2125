//! Sub-structure extraction.

use super::error::Error;
use crate::model::structure::{Bond, Structure, StructureParts};

/// Keeps the atoms whose element matches one of `elements` (ASCII
/// case-insensitive) and the bonds between them.
///
/// Atoms without an element are dropped. Surviving rows keep their
/// relative order and are renumbered.
pub fn select_by_element<S: AsRef<str>>(
    structure: &Structure,
    elements: &[S],
) -> Result<Structure, Error> {
    if elements.is_empty() {
        return Err(Error::invalid_argument("elements", "at least one element is required"));
    }

    let wanted = |element: Option<&str>| {
        element.is_some_and(|e| elements.iter().any(|w| w.as_ref().eq_ignore_ascii_case(e)))
    };

    let mut remap = vec![None; structure.atom_count()];
    let mut atoms = Vec::new();
    for atom in structure.atoms() {
        if wanted(atom.element.as_deref()) {
            remap[atom.aid] = Some(atoms.len());
            let mut kept = atom.clone();
            kept.extras.connections_raw = None;
            atoms.push(kept);
        }
    }

    let bonds = structure.bond_table().map(|table| {
        table
            .iter()
            .filter_map(|bond| {
                let (a1, a2) = (remap[bond.a1]?, remap[bond.a2]?);
                Some(Bond::periodic(a1, a2, bond.order, bond.image).with_source(bond.source))
            })
            .collect::<Vec<_>>()
    });

    log::debug!(
        "select: kept {} of {} atoms",
        atoms.len(),
        structure.atom_count()
    );

    Ok(Structure::from_parts(StructureParts {
        atoms,
        bonds,
        cell: structure.cell().clone(),
        provenance: structure.provenance().clone(),
        preserved: structure.preserved().clone(),
    })?)
}
