//! BIOSYM archive 3 (`.car`) coordinates.
//!
//! CAR carries coordinates, the cell, force-field types, elements and
//! charges, but no connectivity. Molecule blocks are separated by `end`
//! lines; the block ordinal is kept in [`AtomExtras::car_block`] so a
//! re-export reproduces the block layout.
//!
//! [`AtomExtras::car_block`]: crate::AtomExtras::car_block

mod reader;
mod writer;

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
    use crate::model::{atom::Atom, cell::Cell};

    const SAMPLE: &str = "\
!BIOSYM archive 3
PBC=ON
Materials Studio Generated CAR File
!DATE Tue Jan 02 10:00:00 2024
PBC   10.0000   12.0000    8.0000   90.0000  100.0000   90.0000 (P1)
O1       1.000000000    2.000000000    3.000000000 XXXX 1      o*      O  -0.820
H1       1.500000000    2.500000000    3.000000000 XXXX 1      h*      H   0.410
end
Na1      5.000000000    5.000000000    5.000000000 ION  2      Na+     Na  1.000
end
end
";

    #[test]
    fn canonical_output_is_a_fixpoint() {
        let s = parse(SAMPLE).unwrap();
        let once = serialize(&s, false).unwrap();
        let twice = serialize(&parse(&once).unwrap(), false).unwrap();
        assert_eq!(once, twice);
        assert!(once.starts_with("!BIOSYM archive 3\nPBC=ON\n"));
        assert!(once.ends_with("end\nend\n"));
    }

    #[test]
    fn preserve_raw_reproduces_header_and_footer() {
        let s = parse(SAMPLE).unwrap();
        let out = serialize(&s, true).unwrap();
        let expected_head: String = SAMPLE.lines().take(5).map(|l| format!("{l}\n")).collect();
        assert!(out.starts_with(&expected_head));
        assert!(out.ends_with("end\nend\n"));
        assert_eq!(out.lines().filter(|l| *l == "end").count(), 3);
    }

    #[test]
    fn round_trip_keeps_coordinates_and_typing() {
        let s = parse(SAMPLE).unwrap();
        let back = parse(&serialize(&s, false).unwrap()).unwrap();
        assert_eq!(back.atom_count(), s.atom_count());
        for (a, b) in s.atoms().iter().zip(back.atoms()) {
            assert_eq!(a.identity(), b.identity());
            assert_eq!(a.atom_type, b.atom_type);
            assert_eq!(a.element, b.element);
            assert_eq!(a.extras.car_block, b.extras.car_block);
            for k in 0..3 {
                assert!((a.position[k] - b.position[k]).abs() < 1e-9);
            }
        }
        assert_eq!(back.cell().lengths(), [10.0, 12.0, 8.0]);
    }

    #[test]
    fn stale_preserved_header_is_regenerated() {
        let s = parse(SAMPLE).unwrap();
        let bigger = s.with_cell(Cell::periodic(20.0, 12.0, 8.0, 90.0, 100.0, 90.0));
        let out = serialize(&bigger, true).unwrap();
        let back = parse(&out).unwrap();
        assert_eq!(back.cell().a, 20.0);
        assert!(out.contains("Materials Studio Generated CAR File"));
    }

    #[test]
    fn writes_structure_without_provenance() {
        let atoms = vec![
            Atom::new("XXXX", 1, "C1")
                .with_position([0.0, 0.0, 0.0])
                .with_element("C"),
        ];
        let s = Structure::new(atoms, None, Cell::none()).unwrap();
        let out = serialize(&s, true).unwrap();
        assert!(out.starts_with("!BIOSYM archive 3\nPBC=OFF\nusm generated CAR file\n!DATE\n"));
        let back = parse(&out).unwrap();
        assert_eq!(back.atoms()[0].element.as_deref(), Some("C"));
        assert_eq!(back.atoms()[0].atom_type, None);
    }
}
