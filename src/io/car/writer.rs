use crate::io::{error::Error, util};
use crate::model::{cell::Cell, provenance::Region, structure::Structure};
use std::io::Write;

const DEFAULT_TITLE: &str = "usm generated CAR file";

pub fn write<W: Write>(mut writer: W, structure: &Structure, preserve_raw: bool) -> Result<(), Error> {
    let preserved = structure.preserved();

    let header = preserve_raw
        .then(|| preserved.get(Region::CarHeader))
        .flatten()
        .filter(|lines| header_matches_cell(lines, structure.cell()));
    match header {
        Some(lines) => {
            for line in lines {
                writeln!(writer, "{line}")?;
            }
        }
        None => write_canonical_header(&mut writer, structure)?,
    }

    let mut current_block = None;
    for atom in structure.atoms() {
        let block = atom.extras.car_block.unwrap_or(0);
        if current_block.is_some_and(|b| b != block) {
            writeln!(writer, "end")?;
        }
        current_block = Some(block);

        let name = atom
            .name
            .clone()
            .unwrap_or_else(|| format!("A{}", atom.aid + 1));
        let [x, y, z] = atom.position;
        writeln!(
            writer,
            "{:<5} {:>14.9} {:>14.9} {:>14.9} {:<4} {:<6} {:<7} {:<2} {:>6.3}",
            name,
            x,
            y,
            z,
            atom.mol_label.as_deref().unwrap_or("XXXX"),
            atom.mol_index.unwrap_or(1),
            atom.atom_type.as_deref().unwrap_or(util::UNKNOWN),
            atom.element.as_deref().unwrap_or(util::UNKNOWN),
            atom.charge.unwrap_or(0.0),
        )?;
    }

    match preserve_raw.then(|| preserved.get(Region::CarFooter)).flatten() {
        Some(lines) => {
            for line in lines {
                writeln!(writer, "{line}")?;
            }
        }
        None => {
            writeln!(writer, "end")?;
            writeln!(writer, "end")?;
        }
    }

    Ok(())
}

fn write_canonical_header<W: Write>(writer: &mut W, structure: &Structure) -> Result<(), Error> {
    let cell = structure.cell();
    let notes = &structure.provenance().notes;

    writeln!(writer, "!BIOSYM archive 3")?;
    writeln!(writer, "{}", if cell.pbc { "PBC=ON" } else { "PBC=OFF" })?;
    writeln!(
        writer,
        "{}",
        notes.get("title").map(String::as_str).unwrap_or(DEFAULT_TITLE)
    )?;
    match notes.get("date") {
        Some(date) => writeln!(writer, "!DATE {date}")?,
        None => writeln!(writer, "!DATE")?,
    }
    if cell.pbc {
        writeln!(writer, "{}", pbc_line(cell))?;
    }
    Ok(())
}

fn pbc_line(cell: &Cell) -> String {
    format!(
        "PBC{:>10.4}{:>10.4}{:>10.4}{:>10.4}{:>10.4}{:>10.4} ({})",
        cell.a,
        cell.b,
        cell.c,
        cell.alpha,
        cell.beta,
        cell.gamma,
        cell.spacegroup.as_deref().unwrap_or("P1")
    )
}

/// A preserved header is only reused while it still describes the cell.
fn header_matches_cell(lines: &[String], cell: &Cell) -> bool {
    let flag_on = lines
        .iter()
        .any(|l| l.trim().eq_ignore_ascii_case("PBC=ON"));
    if flag_on != cell.pbc {
        return false;
    }
    if !cell.pbc {
        return true;
    }

    let Some(pbc) = lines
        .iter()
        .find(|l| l.trim_start().starts_with("PBC") && !l.contains('='))
    else {
        return false;
    };
    let values: Vec<f64> = pbc
        .split_whitespace()
        .skip(1)
        .take(6)
        .filter_map(|t| t.parse().ok())
        .collect();
    let current = [cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma];
    values.len() == 6
        && values
            .iter()
            .zip(current)
            .all(|(v, c)| (v - c).abs() <= 1e-4 * c.abs().max(1.0))
}
