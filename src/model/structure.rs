use std::collections::HashMap;

use serde::Serialize;

use super::atom::Atom;
use super::cell::Cell;
use super::error::SchemaError;
use super::provenance::{PreservedText, Provenance};

/// How a bond entered the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BondSource {
    /// Read from an explicit connectivity record.
    #[default]
    Explicit,
    /// Derived from geometry.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bond {
    pub bid: usize,
    pub a1: usize,
    pub a2: usize,
    pub order: f64,
    pub source: BondSource,
    /// Periodic image of `a2` relative to `a1`, in lattice vector units.
    pub image: [i32; 3],
}

impl Bond {
    pub fn new(a1: usize, a2: usize, order: f64) -> Self {
        Self::periodic(a1, a2, order, [0, 0, 0])
    }

    /// A bond whose `a2` endpoint sits in image `image` of the cell.
    pub fn periodic(a1: usize, a2: usize, order: f64, image: [i32; 3]) -> Self {
        Self {
            bid: 0,
            a1,
            a2,
            order,
            source: BondSource::Explicit,
            image,
        }
        .normalized()
    }

    pub fn with_source(mut self, source: BondSource) -> Self {
        self.source = source;
        self
    }

    /// Orders endpoints so `a1 <= a2`. The image shift is negated on swap so
    /// it keeps describing the same physical bond.
    pub fn normalized(self) -> Self {
        if self.a1 <= self.a2 {
            self
        } else {
            Self {
                a1: self.a2,
                a2: self.a1,
                image: self.image.map(|v| -v),
                ..self
            }
        }
    }

    /// Canonical identity used for deduplication.
    #[inline]
    pub fn key(&self) -> (usize, usize, [i32; 3]) {
        (self.a1, self.a2, self.image)
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.image != [0, 0, 0]
    }

    /// The endpoint opposite `aid`, if `aid` is an endpoint.
    pub fn partner(&self, aid: usize) -> Option<usize> {
        if aid == self.a1 {
            Some(self.a2)
        } else if aid == self.a2 {
            Some(self.a1)
        } else {
            None
        }
    }

    /// Image of the partner as seen from `aid`.
    pub fn image_from(&self, aid: usize) -> [i32; 3] {
        if aid == self.a1 {
            self.image
        } else {
            self.image.map(|v| -v)
        }
    }
}

/// Minimal read access shared by anything that looks like a structure.
pub trait AtomicView {
    fn atoms(&self) -> &[Atom];
    fn bonds(&self) -> &[Bond];
    fn cell(&self) -> &Cell;
}

/// Atoms grouped by `(mol_label, mol_index)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Molecule {
    pub mol_label: Option<String>,
    pub mol_index: Option<i64>,
    pub mol_block_name: Option<String>,
    pub aids: Vec<usize>,
}

/// Owned pieces of a [`Structure`], for operators that rebuild one.
#[derive(Debug, Clone, Default)]
pub struct StructureParts {
    pub atoms: Vec<Atom>,
    pub bonds: Option<Vec<Bond>>,
    pub cell: Cell,
    pub provenance: Provenance,
    pub preserved: PreservedText,
}

/// The canonical atoms + bonds + cell container.
///
/// Every instance satisfies:
///
/// - `atoms[i].aid == i`
/// - when bonds are present, `bonds[k].bid == k` and `a1 < a2 < atoms.len()`
/// - coordinates are finite or NaN, optional numeric fields finite when set
///
/// Fields are private so the only way in is [`Structure::new`] or
/// [`Structure::from_parts`], both of which renumber and validate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Structure {
    atoms: Vec<Atom>,
    bonds: Option<Vec<Bond>>,
    cell: Cell,
    provenance: Provenance,
    preserved: PreservedText,
}

impl Structure {
    /// Builds a structure with empty provenance and preserved text.
    ///
    /// # Arguments
    ///
    /// * `atoms` - Atom rows in output order; `aid`s are reassigned
    /// * `bonds` - `None` for no topology, `Some(vec![])` for a known-empty one
    /// * `cell` - Periodic cell, or [`Cell::none`]
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] as [`from_parts`](Self::from_parts) does.
    pub fn new(atoms: Vec<Atom>, bonds: Option<Vec<Bond>>, cell: Cell) -> Result<Self, SchemaError> {
        Self::from_parts(StructureParts {
            atoms,
            bonds,
            cell,
            ..StructureParts::default()
        })
    }

    /// Rebuilds a structure, reassigning dense `aid`s in row order and
    /// normalizing every bond before assigning dense `bid`s.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for infinite coordinates, non-finite numeric
    /// fields, bonds with out-of-range or equal endpoints, and non-finite
    /// bond orders.
    pub fn from_parts(parts: StructureParts) -> Result<Self, SchemaError> {
        let StructureParts {
            mut atoms,
            bonds,
            cell,
            provenance,
            preserved,
        } = parts;

        for (aid, atom) in atoms.iter_mut().enumerate() {
            atom.aid = aid;
            validate_atom(atom)?;
        }

        let n_atoms = atoms.len();
        let bonds = match bonds {
            Some(list) => {
                let mut out = Vec::with_capacity(list.len());
                for (bid, bond) in list.into_iter().enumerate() {
                    let mut bond = bond.normalized();
                    bond.bid = bid;
                    validate_bond(&bond, n_atoms)?;
                    out.push(bond);
                }
                Some(out)
            }
            None => None,
        };

        Ok(Self {
            atoms,
            bonds,
            cell,
            provenance,
            preserved,
        })
    }

    /// Releases the fields for editing; pass them back through
    /// [`from_parts`](Self::from_parts).
    pub fn into_parts(self) -> StructureParts {
        StructureParts {
            atoms: self.atoms,
            bonds: self.bonds,
            cell: self.cell,
            provenance: self.provenance,
            preserved: self.preserved,
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_preserved(mut self, preserved: PreservedText) -> Self {
        self.preserved = preserved;
        self
    }

    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.cell = cell;
        self
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Bonds, or an empty slice when the structure carries no bond table.
    #[inline]
    pub fn bonds(&self) -> &[Bond] {
        self.bonds.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn bond_table(&self) -> Option<&[Bond]> {
        self.bonds.as_deref()
    }

    #[inline]
    pub fn has_bonds(&self) -> bool {
        self.bonds.is_some()
    }

    #[inline]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    #[inline]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    #[inline]
    pub fn preserved(&self) -> &PreservedText {
        &self.preserved
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds().len()
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.cell.pbc
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Molecules in order of first appearance.
    pub fn molecules(&self) -> Vec<Molecule> {
        let mut index: HashMap<(Option<&str>, Option<i64>), usize> = HashMap::new();
        let mut out: Vec<Molecule> = Vec::new();
        for atom in &self.atoms {
            let key = (atom.mol_label.as_deref(), atom.mol_index);
            let slot = *index.entry(key).or_insert_with(|| {
                out.push(Molecule {
                    mol_label: atom.mol_label.clone(),
                    mol_index: atom.mol_index,
                    mol_block_name: atom.mol_block_name.clone(),
                    aids: Vec::new(),
                });
                out.len() - 1
            });
            out[slot].aids.push(atom.aid);
        }
        out
    }

    /// Sorted, deduplicated neighbour lists built from the bond table.
    pub fn neighbors(&self) -> Vec<Vec<usize>> {
        neighbor_lists(self.atoms.len(), self.bonds())
    }
}

impl AtomicView for Structure {
    fn atoms(&self) -> &[Atom] {
        Structure::atoms(self)
    }

    fn bonds(&self) -> &[Bond] {
        Structure::bonds(self)
    }

    fn cell(&self) -> &Cell {
        Structure::cell(self)
    }
}

pub(crate) fn neighbor_lists(n_atoms: usize, bonds: &[Bond]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); n_atoms];
    for bond in bonds {
        adjacency[bond.a1].push(bond.a2);
        adjacency[bond.a2].push(bond.a1);
    }
    for list in &mut adjacency {
        list.sort_unstable();
        list.dedup();
    }
    adjacency
}

fn validate_atom(atom: &Atom) -> Result<(), SchemaError> {
    for (axis, value) in ['x', 'y', 'z'].into_iter().zip(atom.position) {
        if value.is_infinite() {
            return Err(SchemaError::InfiniteCoordinate {
                aid: atom.aid,
                axis,
            });
        }
    }
    for (field, value) in [
        ("charge", atom.charge),
        ("mass", atom.mass),
        ("sigma", atom.sigma),
        ("epsilon", atom.epsilon),
        ("occupancy", atom.extras.occupancy),
        ("xray_temp_factor", atom.extras.xray_temp_factor),
    ] {
        if let Some(value) = value.filter(|v| !v.is_finite()) {
            return Err(SchemaError::NonFiniteField {
                aid: atom.aid,
                field,
                value,
            });
        }
    }
    Ok(())
}

fn validate_bond(bond: &Bond, n_atoms: usize) -> Result<(), SchemaError> {
    for aid in [bond.a1, bond.a2] {
        if aid >= n_atoms {
            return Err(SchemaError::BondEndpointOutOfRange {
                bid: bond.bid,
                aid,
                n_atoms,
            });
        }
    }
    if bond.a1 == bond.a2 {
        return Err(SchemaError::SelfBond {
            bid: bond.bid,
            aid: bond.a1,
        });
    }
    if !bond.order.is_finite() {
        return Err(SchemaError::NonFiniteBondOrder {
            bid: bond.bid,
            order: bond.order,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(n: usize) -> Vec<Atom> {
        (0..n)
            .map(|i| Atom::new("XXXX", 1, format!("A{i}")).with_position([i as f64, 0.0, 0.0]))
            .collect()
    }

    #[test]
    fn bond_new_normalizes_endpoints() {
        let bond = Bond::new(5, 2, 1.0);
        assert_eq!((bond.a1, bond.a2), (2, 5));
    }

    #[test]
    fn bond_swap_negates_image() {
        let bond = Bond::periodic(3, 1, 1.0, [1, 0, -1]);
        assert_eq!((bond.a1, bond.a2), (1, 3));
        assert_eq!(bond.image, [-1, 0, 1]);
        assert_eq!(bond.image_from(3), [1, 0, -1]);
        assert_eq!(bond.partner(3), Some(1));
        assert_eq!(bond.partner(7), None);
    }

    #[test]
    fn construction_assigns_dense_ids() {
        let mut raw = atoms(4);
        for atom in &mut raw {
            atom.aid = 99;
        }
        let bonds = vec![Bond::new(3, 2, 1.0), Bond::new(0, 1, 1.5)];
        let s = Structure::new(raw, Some(bonds), Cell::none()).unwrap();

        let aids: Vec<_> = s.atoms().iter().map(|a| a.aid).collect();
        assert_eq!(aids, [0, 1, 2, 3]);
        let bids: Vec<_> = s.bonds().iter().map(|b| b.bid).collect();
        assert_eq!(bids, [0, 1]);
        assert!(s.bonds().iter().all(|b| b.a1 < b.a2));
        assert_eq!(s.bonds()[0].key(), (2, 3, [0, 0, 0]));
    }

    #[test]
    fn empty_structure_is_valid() {
        let s = Structure::new(Vec::new(), None, Cell::none()).unwrap();
        assert_eq!(s.atom_count(), 0);
        assert!(!s.has_bonds());
        assert!(s.bonds().is_empty());
    }

    #[test]
    fn nan_coordinates_are_allowed() {
        let s = Structure::new(vec![Atom::new("XXXX", 1, "H1")], None, Cell::none()).unwrap();
        assert!(!s.atoms()[0].has_position());
    }

    #[test]
    fn infinite_coordinate_is_rejected() {
        let raw = vec![Atom::new("XXXX", 1, "H1").with_position([0.0, f64::INFINITY, 0.0])];
        let err = Structure::new(raw, None, Cell::none()).unwrap_err();
        assert_eq!(err, SchemaError::InfiniteCoordinate { aid: 0, axis: 'y' });
    }

    #[test]
    fn non_finite_charge_is_rejected() {
        let raw = vec![Atom::new("XXXX", 1, "H1").with_charge(f64::NEG_INFINITY)];
        let err = Structure::new(raw, None, Cell::none()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::NonFiniteField {
                field: "charge",
                ..
            }
        ));
    }

    #[test]
    fn dangling_bond_is_rejected() {
        let err = Structure::new(atoms(2), Some(vec![Bond::new(0, 2, 1.0)]), Cell::none())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::BondEndpointOutOfRange {
                bid: 0,
                aid: 2,
                n_atoms: 2
            }
        );
    }

    #[test]
    fn self_bond_is_rejected() {
        let err =
            Structure::new(atoms(2), Some(vec![Bond::new(1, 1, 1.0)]), Cell::none()).unwrap_err();
        assert_eq!(err, SchemaError::SelfBond { bid: 0, aid: 1 });
    }

    #[test]
    fn molecules_follow_first_appearance() {
        let raw = vec![
            Atom::new("XXXX", 2, "O1"),
            Atom::new("XXXX", 1, "C1"),
            Atom::new("XXXX", 2, "H1"),
        ];
        let s = Structure::new(raw, None, Cell::none()).unwrap();
        let mols = s.molecules();
        assert_eq!(mols.len(), 2);
        assert_eq!(mols[0].mol_index, Some(2));
        assert_eq!(mols[0].aids, [0, 2]);
        assert_eq!(mols[1].aids, [1]);
    }

    #[test]
    fn neighbors_are_sorted_and_unique() {
        let bonds = vec![
            Bond::new(0, 2, 1.0),
            Bond::new(0, 1, 1.0),
            Bond::periodic(0, 1, 1.0, [1, 0, 0]),
        ];
        let s = Structure::new(atoms(3), Some(bonds), Cell::none()).unwrap();
        assert_eq!(s.neighbors(), vec![vec![1, 2], vec![0], vec![0]]);
    }
}
