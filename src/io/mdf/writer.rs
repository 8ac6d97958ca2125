use crate::io::{error::Error, util};
use crate::model::{atom::Atom, provenance::Region, structure::Structure};
use std::io::Write;

use super::connection::Connection;

const COLUMNS: [&str; 12] = [
    "element",
    "atom_type",
    "charge_group",
    "isotope",
    "formal_charge",
    "charge",
    "switching_atom",
    "oop_flag",
    "chirality_flag",
    "occupancy",
    "xray_temp_factor",
    "connections",
];

const DEFAULT_BLOCK: &str = "USM";
const DEFAULT_CHIRALITY: i32 = 8;

pub fn write<W: Write>(mut writer: W, structure: &Structure, preserve_raw: bool) -> Result<(), Error> {
    let preserved = structure.preserved();

    match preserve_raw.then(|| preserved.get(Region::MdfHeader)).flatten() {
        Some(lines) => {
            for line in lines {
                writeln!(writer, "{line}")?;
            }
        }
        None => write_canonical_header(&mut writer, structure)?,
    }

    let connections = synthesize_connections(structure);

    let mut current_block: Option<&str> = None;
    for atom in structure.atoms() {
        let block = block_name(atom);
        if current_block != Some(block) {
            if current_block.is_some() {
                writeln!(writer)?;
            }
            writeln!(writer, "@molecule {block}")?;
            writeln!(writer)?;
            current_block = Some(block);
        }

        let conns = match (&atom.extras.connections_raw, preserve_raw) {
            (Some(raw), true) => raw.clone(),
            _ => connections[atom.aid].join(" "),
        };
        write_atom(&mut writer, atom, &conns)?;
    }

    match preserve_raw.then(|| preserved.get(Region::MdfFooter)).flatten() {
        Some(lines) => {
            for line in lines {
                writeln!(writer, "{line}")?;
            }
        }
        None => {
            writeln!(writer)?;
            writeln!(writer, "!")?;
            let cell = structure.cell();
            if cell.pbc {
                writeln!(writer, "#symmetry")?;
                writeln!(writer, "@periodicity 3 xyz")?;
                writeln!(
                    writer,
                    "@group ({})",
                    cell.spacegroup.as_deref().unwrap_or("P1")
                )?;
                writeln!(writer)?;
            }
            writeln!(writer, "#end")?;
        }
    }

    Ok(())
}

fn write_canonical_header<W: Write>(writer: &mut W, structure: &Structure) -> Result<(), Error> {
    writeln!(writer, "!BIOSYM molecular_data 4")?;
    writeln!(writer)?;
    match structure
        .provenance()
        .notes
        .get("date")
        .filter(|d| !d.is_empty())
    {
        Some(date) => writeln!(writer, "!Date: {date}")?,
        None => writeln!(writer, "!Date:")?,
    }
    writeln!(writer)?;
    writeln!(writer, "#topology")?;
    writeln!(writer)?;
    for (i, column) in COLUMNS.iter().enumerate() {
        writeln!(writer, "@column {} {}", i + 1, column)?;
    }
    writeln!(writer)?;
    Ok(())
}

fn write_atom<W: Write>(writer: &mut W, atom: &Atom, connections: &str) -> Result<(), Error> {
    let (label, index, name) = identity(atom);
    let extras = &atom.extras;
    let mut line = format!(
        "{:<20} {:<2} {:<7} {:<5} {:<2} {:<4} {:>10.4} {} {} {} {:>6.4} {:>7.4}",
        format!("{label}_{index}:{name}"),
        atom.element.as_deref().unwrap_or(util::UNKNOWN),
        atom.atom_type.as_deref().unwrap_or(util::UNKNOWN),
        extras.charge_group.as_deref().unwrap_or(util::UNKNOWN),
        extras.isotope.as_deref().unwrap_or("0"),
        extras.formal_charge.as_deref().unwrap_or("0"),
        atom.charge.unwrap_or(0.0),
        extras.switching_atom.unwrap_or(0),
        extras.oop_flag.unwrap_or(0),
        extras.chirality_flag.unwrap_or(DEFAULT_CHIRALITY),
        extras.occupancy.unwrap_or(1.0),
        extras.xray_temp_factor.unwrap_or(0.0),
    );
    if !connections.is_empty() {
        line.push(' ');
        line.push_str(connections);
    }
    writeln!(writer, "{line}")?;
    Ok(())
}

fn block_name(atom: &Atom) -> &str {
    atom.mol_block_name.as_deref().unwrap_or(DEFAULT_BLOCK)
}

fn identity(atom: &Atom) -> (&str, i64, String) {
    (
        atom.mol_label.as_deref().unwrap_or("XXXX"),
        atom.mol_index.unwrap_or(1),
        atom.name
            .clone()
            .unwrap_or_else(|| format!("A{}", atom.aid + 1)),
    )
}

/// Connection tokens per atom from the bond table, ordered by partner id
/// then image.
fn synthesize_connections(structure: &Structure) -> Vec<Vec<String>> {
    let atoms = structure.atoms();
    let mut per_atom: Vec<Vec<(usize, [i32; 3], f64)>> = vec![Vec::new(); atoms.len()];
    for bond in structure.bonds() {
        per_atom[bond.a1].push((bond.a2, bond.image_from(bond.a1), bond.order));
        per_atom[bond.a2].push((bond.a1, bond.image_from(bond.a2), bond.order));
    }

    per_atom
        .into_iter()
        .enumerate()
        .map(|(aid, mut partners)| {
            partners.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
            let (owner_label, owner_index, _) = identity(&atoms[aid]);
            partners
                .into_iter()
                .map(|(partner, image, order)| {
                    let (label, index, name) = identity(&atoms[partner]);
                    let same_residue = label == owner_label && index == owner_index;
                    Connection {
                        mol_label: (!same_residue).then(|| label.to_string()),
                        mol_index: (!same_residue).then_some(index),
                        name,
                        image,
                        order,
                    }
                    .render()
                })
                .collect()
        })
        .collect()
}
