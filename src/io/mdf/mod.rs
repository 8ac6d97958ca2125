//! BIOSYM molecular_data 4 (`.mdf`) topology.
//!
//! MDF carries typing, charges and connectivity keyed by
//! `LABEL_INDEX:NAME`, but no coordinates; parsed atoms have NaN positions.
//! Connections may name atoms in other residues and periodic images (see
//! [`connection`]); both listing directions collapse into one bond.

mod connection;
mod reader;
mod writer;

pub use connection::Connection;
pub use reader::read;
pub use writer::write;

use crate::io::error::Error;
use crate::model::structure::Structure;

pub fn parse(text: &str) -> Result<Structure, Error> {
    read(text.as_bytes())
}

pub fn serialize(structure: &Structure, preserve_raw: bool) -> Result<String, Error> {
    let mut buf = Vec::new();
    write(&mut buf, structure, preserve_raw)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        atom::Atom,
        cell::Cell,
        structure::{Bond, Structure},
    };

    fn water_dimer() -> Structure {
        let mut atoms = vec![
            Atom::new("XXXX", 1, "O1").with_element("O").with_atom_type("o*").with_charge(-0.82),
            Atom::new("XXXX", 1, "H1").with_element("H").with_atom_type("h*").with_charge(0.41),
            Atom::new("XXXX", 1, "H2").with_element("H").with_atom_type("h*").with_charge(0.41),
            Atom::new("XXXX", 2, "O1").with_element("O").with_atom_type("o*").with_charge(-0.82),
        ];
        for atom in &mut atoms {
            atom.mol_block_name = Some("WATER".into());
        }
        atoms[2].extras.formal_charge = Some("1/2+".into());
        let bonds = vec![
            Bond::new(0, 1, 1.0),
            Bond::new(0, 2, 1.0),
            Bond::periodic(2, 3, 1.5, [0, -1, 0]),
        ];
        Structure::new(atoms, Some(bonds), Cell::none()).unwrap()
    }

    #[test]
    fn canonical_write_synthesizes_connections() {
        let text = serialize(&water_dimer(), false).unwrap();
        let h2 = text.lines().find(|l| l.starts_with("XXXX_1:H2")).unwrap();
        assert!(h2.ends_with(" O1 XXXX_2:O1%0-10/1.5"), "{h2}");
        let o2 = text.lines().find(|l| l.starts_with("XXXX_2:O1")).unwrap();
        assert!(o2.ends_with(" XXXX_1:H2%010/1.5"), "{o2}");
        assert!(text.ends_with("\n!\n#end\n"));
    }

    #[test]
    fn canonical_round_trip_is_byte_identical_with_preserve_raw() {
        let canonical = serialize(&water_dimer(), false).unwrap();
        let parsed = parse(&canonical).unwrap();
        assert_eq!(serialize(&parsed, true).unwrap(), canonical);
        assert_eq!(serialize(&parsed, false).unwrap(), canonical);
    }

    #[test]
    fn round_trip_keeps_bonds_and_formal_charge() {
        let parsed = parse(&serialize(&water_dimer(), false).unwrap()).unwrap();
        let keys: Vec<_> = parsed.bonds().iter().map(|b| (b.key(), b.order)).collect();
        assert_eq!(
            keys,
            vec![
                ((0, 1, [0, 0, 0]), 1.0),
                ((0, 2, [0, 0, 0]), 1.0),
                ((2, 3, [0, -1, 0]), 1.5),
            ]
        );
        for token in ["0", "1/2+"] {
            assert!(
                parsed
                    .atoms()
                    .iter()
                    .any(|a| a.extras.formal_charge.as_deref() == Some(token))
            );
        }
    }

    #[test]
    fn formal_charge_tokens_survive_verbatim() {
        let mut atoms = Vec::new();
        for (i, token) in ["0", "1+", "2-", "1/2+"].iter().enumerate() {
            let mut atom = Atom::new("ION", i as i64 + 1, "X1").with_element("Na");
            atom.extras.formal_charge = Some(token.to_string());
            atoms.push(atom);
        }
        let s = Structure::new(atoms, Some(Vec::new()), Cell::none()).unwrap();
        let back = parse(&serialize(&s, false).unwrap()).unwrap();
        let tokens: Vec<_> = back
            .atoms()
            .iter()
            .map(|a| a.extras.formal_charge.clone().unwrap())
            .collect();
        assert_eq!(tokens, ["0", "1+", "2-", "1/2+"]);
    }

    #[test]
    fn periodic_cell_gets_symmetry_footer() {
        let s = water_dimer().with_cell(Cell::periodic(10.0, 10.0, 10.0, 90.0, 90.0, 90.0));
        let text = serialize(&s, false).unwrap();
        assert!(text.contains("#symmetry\n@periodicity 3 xyz\n@group (P1)\n\n#end\n"));
        let back = parse(&text).unwrap();
        assert_eq!(back.provenance().notes["group"], "(P1)");
    }

    #[test]
    fn raw_connections_win_under_preserve_raw() {
        let mut s = water_dimer().into_parts();
        s.atoms[1].extras.connections_raw = Some("O1#1".into());
        let s = Structure::from_parts(s).unwrap();
        let text = serialize(&s, true).unwrap();
        let h1 = text.lines().find(|l| l.starts_with("XXXX_1:H1")).unwrap();
        assert!(h1.ends_with(" O1#1"));
        let text = serialize(&s, false).unwrap();
        let h1 = text.lines().find(|l| l.starts_with("XXXX_1:H1")).unwrap();
        assert!(h1.ends_with(" O1"));
    }
}
