use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::error::{Error, MissingTypesError};
use crate::model::structure::{AtomicView, neighbor_lists};

/// Identifier written into every exported term set.
pub const SCHEMA: &str = "usm.termset.v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermSetOptions {
    /// Record how many instances produced each type.
    pub counts: bool,
}

/// Instance counts per canonical key, one map per term kind. Keys are the
/// type tuple joined with `|`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermCounts {
    pub angles: BTreeMap<String, usize>,
    pub bonds: BTreeMap<String, usize>,
    pub dihedrals: BTreeMap<String, usize>,
    pub impropers: BTreeMap<String, usize>,
}

/// Distinct bonded-term types of a structure.
///
/// Fields are declared in alphabetical order so the JSON export has sorted
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermSet {
    pub angle_types: Vec<[String; 3]>,
    pub atom_types: Vec<String>,
    pub bond_types: Vec<[String; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<TermCounts>,
    pub dihedral_types: Vec<[String; 4]>,
    pub improper_types: Vec<[String; 4]>,
    pub schema: String,
}

impl TermSet {
    /// Pretty JSON, two-space indent, trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// Enumerates the canonical bond, angle, dihedral and improper types.
///
/// Canonical forms:
///
/// - bond `(min(t1, t2), max(t1, t2))`
/// - angle `(ti, tj, tk)` with the end types ordered
/// - dihedral, the smaller of `(ti, tj, tk, tl)` and its reverse
/// - improper `(p1, tj, p2, p3)` for center `j` and sorted peripherals
///
/// Adjacency comes from the bond list with each neighbor list sorted and
/// deduplicated, and every collection is ordered, so the result does not
/// depend on atom or bond row order.
///
/// # Errors
///
/// [`Error::UntypedAtom`] for the lowest-id bonded atom without a type.
pub fn derive_termset<V: AtomicView + ?Sized>(
    view: &V,
    options: &TermSetOptions,
) -> Result<TermSet, Error> {
    let atoms = view.atoms();
    let bonds = view.bonds();
    let adjacency = neighbor_lists(atoms.len(), bonds);

    if let Some(atom) = atoms
        .iter()
        .enumerate()
        .find(|(aid, a)| !adjacency[*aid].is_empty() && a.atom_type.is_none())
        .map(|(_, a)| a)
    {
        return Err(Error::UntypedAtom {
            aid: atom.aid,
            name: atom.name.clone(),
        });
    }

    let types: Vec<&str> = atoms
        .iter()
        .map(|a| a.atom_type.as_deref().unwrap_or_default())
        .collect();

    let atom_types: BTreeSet<&str> = atoms.iter().filter_map(|a| a.atom_type.as_deref()).collect();

    let mut bond_counts: BTreeMap<[&str; 2], usize> = BTreeMap::new();
    for bond in bonds {
        let (t1, t2) = (types[bond.a1], types[bond.a2]);
        *bond_counts.entry([t1.min(t2), t1.max(t2)]).or_default() += 1;
    }

    let mut angle_counts: BTreeMap<[&str; 3], usize> = BTreeMap::new();
    let mut improper_counts: BTreeMap<[&str; 4], usize> = BTreeMap::new();
    for (j, neighbors) in adjacency.iter().enumerate() {
        let tj = types[j];
        for (a, &i) in neighbors.iter().enumerate() {
            for &k in &neighbors[a + 1..] {
                let (ti, tk) = (types[i], types[k]);
                let key = if ti <= tk { [ti, tj, tk] } else { [tk, tj, ti] };
                *angle_counts.entry(key).or_default() += 1;
            }
        }

        for (a, &i) in neighbors.iter().enumerate() {
            for (b, &k) in neighbors.iter().enumerate().skip(a + 1) {
                for &l in &neighbors[b + 1..] {
                    let mut p = [types[i], types[k], types[l]];
                    p.sort_unstable();
                    *improper_counts.entry([p[0], tj, p[1], p[2]]).or_default() += 1;
                }
            }
        }
    }

    let mut dihedral_counts: BTreeMap<[&str; 4], usize> = BTreeMap::new();
    for (j, nj) in adjacency.iter().enumerate() {
        for &k in nj.iter().filter(|&&k| k > j) {
            for &i in nj.iter().filter(|&&i| i != k) {
                for &l in adjacency[k].iter().filter(|&&l| l != j) {
                    let forward = [types[i], types[j], types[k], types[l]];
                    let reverse = [types[l], types[k], types[j], types[i]];
                    *dihedral_counts.entry(forward.min(reverse)).or_default() += 1;
                }
            }
        }
    }

    log::debug!(
        "term set: {} atom, {} bond, {} angle, {} dihedral, {} improper types",
        atom_types.len(),
        bond_counts.len(),
        angle_counts.len(),
        dihedral_counts.len(),
        improper_counts.len()
    );

    let counts = options.counts.then(|| TermCounts {
        angles: joined(&angle_counts),
        bonds: joined(&bond_counts),
        dihedrals: joined(&dihedral_counts),
        impropers: joined(&improper_counts),
    });

    Ok(TermSet {
        angle_types: owned(&angle_counts),
        atom_types: atom_types.into_iter().map(str::to_string).collect(),
        bond_types: owned(&bond_counts),
        counts,
        dihedral_types: owned(&dihedral_counts),
        improper_types: owned(&improper_counts),
        schema: SCHEMA.to_string(),
    })
}

/// Fails with the atom types of `termset` that are absent from `known`.
pub fn check_coverage<S: AsRef<str>>(
    termset: &TermSet,
    known: &[S],
) -> Result<(), MissingTypesError> {
    let known: BTreeSet<&str> = known.iter().map(|s| s.as_ref()).collect();
    let missing: Vec<String> = termset
        .atom_types
        .iter()
        .filter(|t| !known.contains(t.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingTypesError { missing })
    }
}

fn owned<const N: usize>(counts: &BTreeMap<[&str; N], usize>) -> Vec<[String; N]> {
    counts.keys().map(|key| key.map(str::to_string)).collect()
}

fn joined<const N: usize>(counts: &BTreeMap<[&str; N], usize>) -> BTreeMap<String, usize> {
    counts
        .iter()
        .map(|(key, &n)| (key.join("|"), n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        atom::Atom,
        cell::Cell,
        structure::{Bond, Structure},
    };

    fn typed(types: &[&str], bonds: &[(usize, usize)]) -> Structure {
        let atoms = types
            .iter()
            .enumerate()
            .map(|(i, t)| Atom::new("M", 1, format!("A{i}")).with_atom_type(*t))
            .collect();
        let bonds = bonds.iter().map(|&(a, b)| Bond::new(a, b, 1.0)).collect();
        Structure::new(atoms, Some(bonds), Cell::none()).unwrap()
    }

    fn strings<const N: usize>(key: [&str; N]) -> [String; N] {
        key.map(str::to_string)
    }

    #[test]
    fn linear_chain_terms() {
        let s = typed(&["A", "B", "C", "D"], &[(0, 1), (1, 2), (2, 3)]);
        let ts = derive_termset(&s, &TermSetOptions::default()).unwrap();

        assert_eq!(ts.atom_types, ["A", "B", "C", "D"]);
        assert_eq!(
            ts.bond_types,
            [strings(["A", "B"]), strings(["B", "C"]), strings(["C", "D"])]
        );
        assert_eq!(ts.angle_types, [strings(["A", "B", "C"]), strings(["B", "C", "D"])]);
        assert_eq!(ts.dihedral_types, [strings(["A", "B", "C", "D"])]);
        assert!(ts.improper_types.is_empty());
        assert_eq!(ts.counts, None);
    }

    #[test]
    fn reversed_chain_gives_same_canonical_keys() {
        let s = typed(&["D", "C", "B", "A"], &[(2, 3), (1, 2), (0, 1)]);
        let ts = derive_termset(&s, &TermSetOptions::default()).unwrap();
        assert_eq!(ts.angle_types, [strings(["A", "B", "C"]), strings(["B", "C", "D"])]);
        assert_eq!(ts.dihedral_types, [strings(["A", "B", "C", "D"])]);
    }

    #[test]
    fn improper_places_center_second() {
        let s = typed(&["c2", "o", "n", "h"], &[(0, 1), (0, 2), (0, 3)]);
        let ts = derive_termset(&s, &TermSetOptions::default()).unwrap();
        assert_eq!(ts.improper_types, [strings(["h", "c2", "n", "o"])]);
        assert_eq!(
            ts.angle_types,
            [
                strings(["h", "c2", "n"]),
                strings(["h", "c2", "o"]),
                strings(["n", "c2", "o"]),
            ]
        );
    }

    #[test]
    fn counts_track_instances() {
        // ethane: c3-c3 with three h on each carbon
        let types = ["c3", "c3", "h", "h", "h", "h", "h", "h"];
        let bonds = [(0, 1), (0, 2), (0, 3), (0, 4), (1, 5), (1, 6), (1, 7)];
        let ts = derive_termset(&typed(&types, &bonds), &TermSetOptions { counts: true }).unwrap();
        let counts = ts.counts.unwrap();
        assert_eq!(counts.bonds["c3|c3"], 1);
        assert_eq!(counts.bonds["c3|h"], 6);
        assert_eq!(counts.angles["c3|c3|h"], 6);
        assert_eq!(counts.angles["h|c3|h"], 6);
        assert_eq!(counts.dihedrals["h|c3|c3|h"], 9);
        assert_eq!(counts.impropers["c3|c3|h|h"], 6);
        assert_eq!(counts.impropers["h|c3|h|h"], 2);
    }

    #[test]
    fn permutation_of_rows_does_not_change_export() {
        let types = ["c3", "c3", "oh", "ho", "h", "h"];
        let bonds = [(0, 1), (1, 2), (2, 3), (0, 4), (0, 5)];
        let base = derive_termset(&typed(&types, &bonds), &TermSetOptions { counts: true })
            .unwrap()
            .to_json()
            .unwrap();

        // relabel atoms by reversing their order and shuffle bond rows
        let n = types.len();
        let reversed: Vec<&str> = types.iter().rev().copied().collect();
        let mut moved: Vec<(usize, usize)> =
            bonds.iter().map(|&(a, b)| (n - 1 - b, n - 1 - a)).collect();
        moved.rotate_left(2);
        moved.swap(0, 3);
        let permuted = derive_termset(&typed(&reversed, &moved), &TermSetOptions { counts: true })
            .unwrap()
            .to_json()
            .unwrap();

        assert_eq!(base, permuted);
    }

    #[test]
    fn json_export_is_byte_stable() {
        let s = typed(&["h", "c"], &[(0, 1)]);
        let json = derive_termset(&s, &TermSetOptions::default())
            .unwrap()
            .to_json()
            .unwrap();
        let expected = r#"{
  "angle_types": [],
  "atom_types": [
    "c",
    "h"
  ],
  "bond_types": [
    [
      "c",
      "h"
    ]
  ],
  "dihedral_types": [],
  "improper_types": [],
  "schema": "usm.termset.v1"
}
"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn untyped_bonded_atom_is_an_error() {
        let mut parts = typed(&["c", "h"], &[(0, 1)]).into_parts();
        parts.atoms[1].atom_type = None;
        parts.atoms.push(Atom::new("M", 1, "LONE"));
        let s = Structure::from_parts(parts).unwrap();
        assert_eq!(
            derive_termset(&s, &TermSetOptions::default()),
            Err(Error::UntypedAtom {
                aid: 1,
                name: Some("A1".into())
            })
        );
    }

    #[test]
    fn works_through_any_atomic_view() {
        struct Raw {
            atoms: Vec<Atom>,
            bonds: Vec<Bond>,
            cell: Cell,
        }
        impl AtomicView for Raw {
            fn atoms(&self) -> &[Atom] {
                &self.atoms
            }
            fn bonds(&self) -> &[Bond] {
                &self.bonds
            }
            fn cell(&self) -> &Cell {
                &self.cell
            }
        }
        let s = typed(&["x", "y"], &[(0, 1)]);
        let raw = Raw {
            atoms: s.atoms().to_vec(),
            bonds: s.bonds().to_vec(),
            cell: Cell::none(),
        };
        let ts = derive_termset(&raw, &TermSetOptions::default()).unwrap();
        assert_eq!(ts.bond_types, [strings(["x", "y"])]);
    }

    #[test]
    fn coverage_check_lists_missing_types() {
        let s = typed(&["c3", "h", "oh"], &[(0, 1), (0, 2)]);
        let ts = derive_termset(&s, &TermSetOptions::default()).unwrap();
        assert!(check_coverage(&ts, &["c3", "h", "oh"]).is_ok());
        let err = check_coverage(&ts, &["c3"]).unwrap_err();
        assert_eq!(err.missing, ["h", "oh"]);
        assert_eq!(err.to_string(), "no parameters for atom type(s): h, oh");
    }
}
