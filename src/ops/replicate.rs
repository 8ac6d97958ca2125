//! Supercell tiling with periodic bond materialization.

use std::collections::HashSet;

use super::error::Error;
use crate::model::structure::{Bond, Structure, StructureParts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicateOptions {
    /// Suffix atom names with `_i_j_k` and record the tile in
    /// `extras.image`.
    pub tag_images: bool,
}

/// Tiles `structure` `na × nb × nc` times along its lattice vectors.
///
/// Output order is tile-major (`i` outermost, then `j`, then `k`) with the
/// base atom order innermost, so replica `(i, j, k)` of atom `aid` gets
/// `((i·nb + j)·nc + k)·N + aid`. Each image position is computed directly
/// from the base fractional coordinate.
///
/// A base bond with image shift `d` connects tile `t` to tile `t + d`; that
/// tile is reduced modulo the supercell dimensions and the quotient stays
/// on the new bond as its image. Bonds are deduplicated by
/// `(a1, a2, image)`, first occurrence kept.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a zero count, [`Error::InvalidCell`] when
/// the cell is non-periodic or degenerate.
pub fn replicate_supercell(
    structure: &Structure,
    na: u32,
    nb: u32,
    nc: u32,
    options: &ReplicateOptions,
) -> Result<Structure, Error> {
    for (name, n) in [("na", na), ("nb", nb), ("nc", nc)] {
        if n == 0 {
            return Err(Error::invalid_argument(name, "replication count must be positive"));
        }
    }
    let lattice = structure.cell().lattice()?;

    let dims = [na, nb, nc];
    let n_tiles = (na as usize) * (nb as usize) * (nc as usize);
    let base = structure.atoms();
    let fracs = lattice.cartesian_to_frac_many(&structure.positions());

    let tiles: Vec<[u32; 3]> = (0..na)
        .flat_map(|i| (0..nb).flat_map(move |j| (0..nc).map(move |k| [i, j, k])))
        .collect();
    let new_aid = |aid: usize, tile: [u32; 3]| -> usize {
        let t = ((tile[0] as usize) * (nb as usize) + tile[1] as usize) * (nc as usize)
            + tile[2] as usize;
        t * base.len() + aid
    };

    let mut atoms = Vec::with_capacity(base.len() * n_tiles);
    for &tile in &tiles {
        for (atom, frac) in base.iter().zip(&fracs) {
            let mut copy = atom.clone();
            if atom.has_position() {
                let shifted = [
                    frac[0] + f64::from(tile[0]),
                    frac[1] + f64::from(tile[1]),
                    frac[2] + f64::from(tile[2]),
                ];
                copy.position = lattice.frac_to_cartesian(shifted);
            }
            copy.extras.connections_raw = None;
            if options.tag_images {
                let [i, j, k] = tile;
                copy.name = copy.name.map(|n| format!("{n}_{i}_{j}_{k}"));
                copy.extras.image = Some(tile);
            }
            atoms.push(copy);
        }
    }

    let bonds = structure.bond_table().map(|table| {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(table.len() * n_tiles);
        for &tile in &tiles {
            for bond in table {
                let mut target = [0u32; 3];
                let mut leftover = [0i32; 3];
                for axis in 0..3 {
                    let n = dims[axis] as i64;
                    let reached = i64::from(tile[axis]) + i64::from(bond.image[axis]);
                    target[axis] = reached.rem_euclid(n) as u32;
                    leftover[axis] = reached.div_euclid(n) as i32;
                }
                let new = Bond::periodic(
                    new_aid(bond.a1, tile),
                    new_aid(bond.a2, target),
                    bond.order,
                    leftover,
                )
                .with_source(bond.source);
                if seen.insert(new.key()) {
                    out.push(new);
                }
            }
        }
        out
    });

    log::debug!(
        "replicate {na}x{nb}x{nc}: {} atoms, {} bonds",
        atoms.len(),
        bonds.as_ref().map_or(0, Vec::len)
    );

    Ok(Structure::from_parts(StructureParts {
        atoms,
        bonds,
        cell: structure.cell().scaled(na, nb, nc),
        provenance: structure.provenance().clone(),
        preserved: structure.preserved().clone(),
    })?)
}
