//! Pretty-printed JSON dump of a whole [`Structure`].
//!
//! Write only. Field order follows the model's declaration order, so the
//! output is byte-stable for equal structures.

use crate::io::error::Error;
use crate::model::structure::Structure;
use std::io::Write;

pub fn write<W: Write>(mut writer: W, structure: &Structure) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut writer, structure)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, cell::Cell, structure::Bond};

    #[test]
    fn dump_contains_atoms_bonds_and_cell() {
        let atoms = vec![
            Atom::new("M", 1, "C1").with_position([0.0, 0.0, 0.0]),
            Atom::new("M", 1, "O1").with_position([1.2, 0.0, 0.0]),
        ];
        let s = Structure::new(atoms, Some(vec![Bond::new(0, 1, 2.0)]), Cell::none()).unwrap();
        let mut buf = Vec::new();
        write(&mut buf, &s).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["atoms"][1]["name"], "O1");
        assert_eq!(value["bonds"][0]["order"], 2.0);
        assert_eq!(value["cell"]["pbc"], false);
    }
}
