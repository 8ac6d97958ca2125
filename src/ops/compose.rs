//! Join of a coordinate-bearing structure with a topology-bearing one.
//!
//! The primary side fixes row order and row count. Each primary row looks
//! up its partner on the secondary side by a configurable key and copies in
//! every field it is missing. Bonds come from the secondary when it has a
//! bond table, remapped into the merged id space.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::model::{
    atom::Atom,
    structure::{Bond, Structure, StructureParts},
};

/// Atom field usable as (part of) a join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinField {
    MolLabel,
    MolIndex,
    Name,
    Element,
    AtomType,
    MolBlockName,
}

impl JoinField {
    /// The identity triple `(mol_label, mol_index, name)`.
    pub const IDENTITY: [JoinField; 3] = [JoinField::MolLabel, JoinField::MolIndex, JoinField::Name];

    fn value(self, atom: &Atom) -> Option<String> {
        match self {
            JoinField::MolLabel => atom.mol_label.clone(),
            JoinField::MolIndex => atom.mol_index.map(|i| i.to_string()),
            JoinField::Name => atom.name.clone(),
            JoinField::Element => atom.element.clone(),
            JoinField::AtomType => atom.atom_type.clone(),
            JoinField::MolBlockName => atom.mol_block_name.clone(),
        }
    }
}

impl fmt::Display for JoinField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinField::MolLabel => "mol_label",
            JoinField::MolIndex => "mol_index",
            JoinField::Name => "name",
            JoinField::Element => "element",
            JoinField::AtomType => "atom_type",
            JoinField::MolBlockName => "mol_block_name",
        };
        f.write_str(name)
    }
}

/// Key of one atom under a field list. A key with any missing part never
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyValue(Vec<String>);

impl KeyValue {
    fn of(atom: &Atom, fields: &[JoinField]) -> Option<Self> {
        fields
            .iter()
            .map(|f| f.value(atom))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

/// What to do when not every row finds a partner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CoveragePolicy {
    /// Log a warning for unmatched rows and continue.
    #[default]
    Warn,
    /// Fail unless at least this fraction of primary rows matched.
    Require(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    pub key: Vec<JoinField>,
    pub coverage: CoveragePolicy,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            key: JoinField::IDENTITY.to_vec(),
            coverage: CoveragePolicy::Warn,
        }
    }
}

/// Join metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComposeReport {
    pub matched_count: usize,
    pub left_only_count: usize,
    pub right_only_count: usize,
    /// Secondary bonds with an endpoint that has no primary counterpart.
    pub dropped_bonds: usize,
}

impl ComposeReport {
    /// Fraction of primary rows that matched; `1.0` for an empty primary.
    pub fn coverage(&self) -> f64 {
        let total = self.matched_count + self.left_only_count;
        if total == 0 {
            1.0
        } else {
            self.matched_count as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Composed {
    pub structure: Structure,
    pub report: ComposeReport,
}

/// Merges `secondary` into `primary`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for an empty key field list.
/// - [`Error::AmbiguousJoinKey`] when a key occurs twice on the secondary
///   side, or twice on the primary side while matching a secondary row.
/// - [`Error::InsufficientCoverage`] under [`CoveragePolicy::Require`].
pub fn compose(
    primary: &Structure,
    secondary: &Structure,
    options: &ComposeOptions,
) -> Result<Composed, Error> {
    if options.key.is_empty() {
        return Err(Error::invalid_argument("key", "join key needs at least one field"));
    }
    if let CoveragePolicy::Require(fraction) = options.coverage {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::invalid_argument(
                "coverage",
                format!("required fraction {fraction} is outside [0, 1]"),
            ));
        }
    }

    let mut ambiguous = BTreeSet::new();

    let mut lookup: HashMap<KeyValue, usize> = HashMap::with_capacity(secondary.atom_count());
    for atom in secondary.atoms() {
        if let Some(key) = KeyValue::of(atom, &options.key) {
            if lookup.insert(key.clone(), atom.aid).is_some() {
                ambiguous.insert(key.to_string());
            }
        }
    }

    let primary_keys: Vec<Option<KeyValue>> = primary
        .atoms()
        .iter()
        .map(|a| KeyValue::of(a, &options.key))
        .collect();
    let mut primary_seen: HashMap<&KeyValue, usize> = HashMap::new();
    for key in primary_keys.iter().flatten() {
        if lookup.contains_key(key) {
            *primary_seen.entry(key).or_default() += 1;
        }
    }
    ambiguous.extend(
        primary_seen
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(key, _)| key.to_string()),
    );

    if !ambiguous.is_empty() {
        return Err(Error::AmbiguousJoinKey {
            keys: ambiguous.into_iter().collect(),
        });
    }

    let mut report = ComposeReport::default();
    let mut secondary_to_merged: Vec<Option<usize>> = vec![None; secondary.atom_count()];
    let mut atoms = Vec::with_capacity(primary.atom_count());

    for (atom, key) in primary.atoms().iter().zip(&primary_keys) {
        let mut merged = atom.clone();
        match key.as_ref().and_then(|k| lookup.get(k)) {
            Some(&sec) => {
                merged.fill_missing_from(&secondary.atoms()[sec]);
                secondary_to_merged[sec] = Some(atoms.len());
                report.matched_count += 1;
            }
            None => report.left_only_count += 1,
        }
        atoms.push(merged);
    }
    report.right_only_count = secondary_to_merged.iter().filter(|m| m.is_none()).count();

    let bonds = match secondary.bond_table() {
        Some(table) => {
            let mut bonds = Vec::with_capacity(table.len());
            for bond in table {
                match (secondary_to_merged[bond.a1], secondary_to_merged[bond.a2]) {
                    (Some(a1), Some(a2)) => bonds.push(
                        Bond::periodic(a1, a2, bond.order, bond.image).with_source(bond.source),
                    ),
                    _ => report.dropped_bonds += 1,
                }
            }
            Some(bonds)
        }
        None => primary.bond_table().map(<[Bond]>::to_vec),
    };

    let cell = if primary.cell().pbc || !secondary.cell().pbc {
        primary.cell().clone()
    } else {
        secondary.cell().clone()
    };

    let mut provenance = primary.provenance().clone();
    provenance.absorb(secondary.provenance());
    let mut preserved = primary.preserved().clone();
    preserved.absorb(secondary.preserved());

    check_coverage(&report, options.coverage)?;

    log::debug!(
        "compose: matched {}, left-only {}, right-only {}, dropped bonds {}",
        report.matched_count,
        report.left_only_count,
        report.right_only_count,
        report.dropped_bonds
    );

    let structure = Structure::from_parts(StructureParts {
        atoms,
        bonds,
        cell,
        provenance,
        preserved,
    })?;

    Ok(Composed { structure, report })
}

fn check_coverage(report: &ComposeReport, policy: CoveragePolicy) -> Result<(), Error> {
    match policy {
        CoveragePolicy::Warn => {
            if report.left_only_count > 0 || report.right_only_count > 0 {
                log::warn!(
                    "compose: partial coverage ({} matched, {} primary-only, {} secondary-only)",
                    report.matched_count,
                    report.left_only_count,
                    report.right_only_count
                );
            }
            Ok(())
        }
        CoveragePolicy::Require(required) => {
            if report.coverage() < required {
                Err(Error::InsufficientCoverage {
                    matched: report.matched_count,
                    total: report.matched_count + report.left_only_count,
                    required,
                })
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cell::Cell;

    fn coords() -> Structure {
        let atoms = vec![
            Atom::new("XXXX", 1, "O1").with_position([0.0, 0.0, 0.0]),
            Atom::new("XXXX", 1, "H1").with_position([0.96, 0.0, 0.0]),
            Atom::new("XXXX", 1, "H2").with_position([-0.24, 0.93, 0.0]),
        ];
        Structure::new(atoms, None, Cell::periodic(10.0, 10.0, 10.0, 90.0, 90.0, 90.0)).unwrap()
    }

    fn topology() -> Structure {
        let atoms = vec![
            Atom::new("XXXX", 1, "H2").with_element("H").with_atom_type("h*").with_charge(0.41),
            Atom::new("XXXX", 1, "O1").with_element("O").with_atom_type("o*").with_charge(-0.82),
            Atom::new("XXXX", 1, "H1").with_element("H").with_atom_type("h*").with_charge(0.41),
        ];
        let bonds = vec![Bond::new(1, 2, 1.0), Bond::new(0, 1, 1.0)];
        Structure::new(atoms, Some(bonds), Cell::none()).unwrap()
    }

    #[test]
    fn coordinates_plus_topology_merge_fully() {
        let out = compose(&coords(), &topology(), &ComposeOptions::default()).unwrap();
        assert_eq!(
            out.report,
            ComposeReport {
                matched_count: 3,
                left_only_count: 0,
                right_only_count: 0,
                dropped_bonds: 0,
            }
        );

        let s = &out.structure;
        assert_eq!(s.atom_count(), 3);
        assert!(s.atoms().iter().all(Atom::has_position));
        assert_eq!(s.atoms()[0].atom_type.as_deref(), Some("o*"));
        assert_eq!(s.atoms()[2].charge, Some(0.41));
        assert!(s.cell().pbc);

        let keys: Vec<_> = s.bonds().iter().map(|b| (b.bid, b.a1, b.a2)).collect();
        assert_eq!(keys, vec![(0, 0, 1), (1, 0, 2)]);
    }

    #[test]
    fn duplicate_secondary_key_is_ambiguous() {
        let mut parts = topology().into_parts();
        parts.atoms.push(Atom::new("XXXX", 1, "O1"));
        let secondary = Structure::from_parts(parts).unwrap();
        let err = compose(&coords(), &secondary, &ComposeOptions::default()).unwrap_err();
        match err {
            Error::AmbiguousJoinKey { keys } => assert_eq!(keys, ["XXXX|1|O1"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_primary_key_with_match_is_ambiguous() {
        let mut parts = coords().into_parts();
        parts.atoms.push(Atom::new("XXXX", 1, "H1").with_position([1.0, 1.0, 1.0]));
        parts.atoms.push(Atom::new("LONE", 9, "X").with_position([2.0, 2.0, 2.0]));
        parts.atoms.push(Atom::new("LONE", 9, "X").with_position([3.0, 3.0, 3.0]));
        let primary = Structure::from_parts(parts).unwrap();
        let err = compose(&primary, &topology(), &ComposeOptions::default()).unwrap_err();
        match err {
            Error::AmbiguousJoinKey { keys } => assert_eq!(keys, ["XXXX|1|H1"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmatched_rows_are_counted_and_bonds_dropped() {
        let mut parts = coords().into_parts();
        parts.atoms.remove(2);
        parts.atoms.push(Atom::new("ION", 2, "Na1").with_position([5.0, 5.0, 5.0]));
        let primary = Structure::from_parts(parts).unwrap();

        let out = compose(&primary, &topology(), &ComposeOptions::default()).unwrap();
        assert_eq!(out.report.matched_count, 2);
        assert_eq!(out.report.left_only_count, 1);
        assert_eq!(out.report.right_only_count, 1);
        assert_eq!(out.report.dropped_bonds, 1);
        assert_eq!(out.structure.bond_count(), 1);
        assert_eq!(out.structure.atoms()[2].element, None);
    }

    #[test]
    fn require_policy_rejects_low_coverage() {
        let mut parts = coords().into_parts();
        parts.atoms.push(Atom::new("ION", 2, "Na1").with_position([5.0, 5.0, 5.0]));
        let primary = Structure::from_parts(parts).unwrap();
        let options = ComposeOptions {
            coverage: CoveragePolicy::Require(1.0),
            ..ComposeOptions::default()
        };
        let err = compose(&primary, &topology(), &options).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientCoverage { matched: 3, total: 4, .. }
        ));

        let lenient = ComposeOptions {
            coverage: CoveragePolicy::Require(0.75),
            ..ComposeOptions::default()
        };
        assert!(compose(&primary, &topology(), &lenient).is_ok());
    }

    #[test]
    fn secondary_without_bonds_keeps_primary_bonds() {
        let mut parts = coords().into_parts();
        parts.bonds = Some(vec![Bond::new(0, 1, 1.0)]);
        let primary = Structure::from_parts(parts).unwrap();
        let mut sec = topology().into_parts();
        sec.bonds = None;
        let secondary = Structure::from_parts(sec).unwrap();

        let out = compose(&primary, &secondary, &ComposeOptions::default()).unwrap();
        assert_eq!(out.structure.bond_count(), 1);
    }

    #[test]
    fn custom_key_fields() {
        let options = ComposeOptions {
            key: vec![JoinField::Name],
            ..ComposeOptions::default()
        };
        let mut sec = topology().into_parts();
        for atom in &mut sec.atoms {
            atom.mol_label = Some("OTHER".into());
        }
        let secondary = Structure::from_parts(sec).unwrap();
        let out = compose(&coords(), &secondary, &options).unwrap();
        assert_eq!(out.report.matched_count, 3);
        assert_eq!(out.structure.atoms()[0].mol_label.as_deref(), Some("XXXX"));
    }

    #[test]
    fn repeated_composition_is_identical() {
        let a = compose(&coords(), &topology(), &ComposeOptions::default()).unwrap();
        let b = compose(&coords(), &topology(), &ComposeOptions::default()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.structure).unwrap(),
            serde_json::to_string(&b.structure).unwrap()
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        let options = ComposeOptions {
            key: Vec::new(),
            ..ComposeOptions::default()
        };
        assert!(matches!(
            compose(&coords(), &topology(), &options),
            Err(Error::InvalidArgument { name: "key", .. })
        ));
    }
}
