//! Periodic bond images and supercell connectivity checks.

use std::collections::VecDeque;

use serde::Serialize;

use super::error::Error;
use crate::model::structure::{Bond, Structure, neighbor_lists};

/// Assigns every bond the minimum-image shift of its second endpoint,
/// `image = -round(f2 - f1)` per fractional component.
///
/// Bonds touching an atom without coordinates keep their current image. A
/// structure without a bond table is returned unchanged.
///
/// # Errors
///
/// [`Error::InvalidCell`] when the cell does not form a valid lattice.
pub fn perceive_periodic_bonds(structure: &Structure) -> Result<Structure, Error> {
    let lattice = structure.cell().lattice()?;
    let fracs = lattice.cartesian_to_frac_many(&structure.positions());
    let atoms = structure.atoms();

    let mut parts = structure.clone().into_parts();
    let Some(bonds) = parts.bonds.as_mut() else {
        return Ok(structure.clone());
    };

    let mut crossing = 0usize;
    for bond in bonds.iter_mut() {
        if !(atoms[bond.a1].has_position() && atoms[bond.a2].has_position()) {
            continue;
        }
        let (f1, f2) = (fracs[bond.a1], fracs[bond.a2]);
        bond.image = [0, 1, 2].map(|k| -(f2[k] - f1[k]).round() as i32);
        if bond.is_periodic() {
            crossing += 1;
        }
    }
    log::debug!("perceived {crossing} boundary-crossing bond(s)");

    Ok(Structure::from_parts(parts)?)
}

/// Connectivity summary of a (super)cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupercellReport {
    pub n_atoms: usize,
    pub n_bonds: usize,
    /// Bonds with a non-zero image shift.
    pub n_periodic_bonds: usize,
    /// Connected components of the bond graph, isolated atoms included.
    pub n_connected_components: usize,
}

pub fn validate_supercell(structure: &Structure) -> SupercellReport {
    let bonds = structure.bonds();
    SupercellReport {
        n_atoms: structure.atom_count(),
        n_bonds: bonds.len(),
        n_periodic_bonds: bonds.iter().filter(|b| b.is_periodic()).count(),
        n_connected_components: count_components(structure.atom_count(), bonds),
    }
}

fn count_components(n_atoms: usize, bonds: &[Bond]) -> usize {
    let adjacency = neighbor_lists(n_atoms, bonds);
    let mut visited = vec![false; n_atoms];
    let mut components = 0;
    let mut queue = VecDeque::new();

    for start in 0..n_atoms {
        if visited[start] {
            continue;
        }
        components += 1;
        visited[start] = true;
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, cell::Cell};
    use crate::ops::replicate::{ReplicateOptions, replicate_supercell};

    fn cubic() -> Cell {
        Cell::periodic(10.0, 10.0, 10.0, 90.0, 90.0, 90.0)
    }

    fn chain_atoms() -> Vec<Atom> {
        vec![
            Atom::new("M", 1, "A").with_position([1.0, 5.0, 5.0]),
            Atom::new("M", 1, "B").with_position([9.0, 5.0, 5.0]),
            Atom::new("M", 1, "C").with_position([5.0, 5.0, 5.0]),
        ]
    }

    #[test]
    fn perceives_minimum_image_shift() {
        let bonds = vec![Bond::new(0, 1, 1.0), Bond::new(1, 2, 1.0)];
        let s = Structure::new(chain_atoms(), Some(bonds), cubic()).unwrap();
        let p = perceive_periodic_bonds(&s).unwrap();
        let keys: Vec<_> = p.bonds().iter().map(|b| b.key()).collect();
        assert_eq!(keys, vec![(0, 1, [-1, 0, 0]), (1, 2, [0, 0, 0])]);
    }

    #[test]
    fn perceive_requires_valid_cell() {
        let s = Structure::new(chain_atoms(), Some(vec![Bond::new(0, 1, 1.0)]), Cell::none()).unwrap();
        assert!(matches!(perceive_periodic_bonds(&s), Err(Error::InvalidCell(_))));
    }

    #[test]
    fn supercell_of_periodic_chain_is_one_component() {
        let atoms = chain_atoms().into_iter().take(2).collect();
        let bonds = vec![Bond::new(0, 1, 1.0), Bond::periodic(0, 1, 1.0, [-1, 0, 0])];
        let s = Structure::new(atoms, Some(bonds), cubic()).unwrap();
        let super_cell = replicate_supercell(&s, 3, 1, 1, &ReplicateOptions::default()).unwrap();

        let report = validate_supercell(&super_cell);
        assert_eq!(
            report,
            SupercellReport {
                n_atoms: 6,
                n_bonds: 6,
                n_periodic_bonds: 1,
                n_connected_components: 1,
            }
        );
    }

    #[test]
    fn dangling_images_split_components() {
        let atoms = chain_atoms().into_iter().take(2).collect();
        let s = Structure::new(atoms, Some(vec![Bond::new(0, 1, 1.0)]), cubic()).unwrap();
        let s = perceive_periodic_bonds(&s).unwrap();
        let super_cell = replicate_supercell(&s, 3, 1, 1, &ReplicateOptions::default()).unwrap();
        let report = validate_supercell(&super_cell);
        assert_eq!(report.n_bonds, 3);
        assert_eq!(report.n_periodic_bonds, 1);
        assert_eq!(report.n_connected_components, 3);
    }

    #[test]
    fn isolated_atoms_are_components() {
        let s = Structure::new(chain_atoms(), None, cubic()).unwrap();
        let report = validate_supercell(&s);
        assert_eq!(report.n_connected_components, 3);
        assert_eq!(report.n_bonds, 0);
    }
}
