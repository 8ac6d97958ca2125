use crate::io::{error::Error, util};
use crate::model::{atom::Atom, provenance::Region, structure::Structure};
use std::io::Write;

/// Neighbours per CONECT record.
const CONECT_WIDTH: usize = 4;
const DEFAULT_REMARK: &str = "REMARK   1 usm generated PDB file";

/// Which direction of each bond gets a CONECT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConectPolicy {
    /// No CONECT records.
    None,
    /// Each bond once, listed from its lower serial.
    Dedup,
    /// Each bond listed from both ends.
    #[default]
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub conect: ConectPolicy,
    /// Wraps the atom records in `MODEL n` / `ENDMDL`.
    pub model: Option<u32>,
}

pub fn write<W: Write>(
    mut writer: W,
    structure: &Structure,
    preserve_raw: bool,
    options: &WriteOptions,
) -> Result<(), Error> {
    match preserve_raw
        .then(|| structure.preserved().get(Region::PdbHeader))
        .flatten()
    {
        Some(lines) => {
            for line in lines {
                writeln!(writer, "{line}")?;
            }
        }
        None => writeln!(writer, "{DEFAULT_REMARK}")?,
    }

    let cell = structure.cell();
    if cell.is_valid() {
        writeln!(
            writer,
            "CRYST1{:>9.3}{:>9.3}{:>9.3}{:>7.2}{:>7.2}{:>7.2} {:<11}{:>4}",
            cell.a,
            cell.b,
            cell.c,
            cell.alpha,
            cell.beta,
            cell.gamma,
            util::fit(cell.spacegroup.as_deref().unwrap_or("P 1"), 11),
            1
        )?;
    }

    if let Some(model) = options.model {
        writeln!(writer, "MODEL     {model:>4}")?;
    }
    for atom in structure.atoms() {
        write_atom(&mut writer, atom)?;
    }
    if options.model.is_some() {
        writeln!(writer, "ENDMDL")?;
    }

    write_conect(&mut writer, structure, options.conect)?;

    writeln!(writer, "END")?;
    Ok(())
}

fn write_atom<W: Write>(writer: &mut W, atom: &Atom) -> Result<(), Error> {
    let record = atom.extras.record.as_deref().unwrap_or("ATOM");
    let [x, y, z] = atom.position;
    writeln!(
        writer,
        "{:<6}{:>5} {:>4} {:<4} {:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        util::fit(record, 6),
        atom.aid + 1,
        util::fit(atom.name.as_deref().unwrap_or(""), 4),
        util::fit(atom.mol_label.as_deref().unwrap_or(""), 4),
        atom.mol_index.map(|i| i.to_string()).unwrap_or_default(),
        x,
        y,
        z,
        atom.extras.occupancy.unwrap_or(1.0),
        atom.extras.xray_temp_factor.unwrap_or(0.0),
        util::fit(atom.element.as_deref().unwrap_or(""), 2),
    )?;
    Ok(())
}

fn write_conect<W: Write>(
    writer: &mut W,
    structure: &Structure,
    policy: ConectPolicy,
) -> Result<(), Error> {
    if policy == ConectPolicy::None {
        return Ok(());
    }

    let mut partners: Vec<Vec<usize>> = vec![Vec::new(); structure.atom_count()];
    let mut skipped = 0usize;
    for bond in structure.bonds() {
        if bond.is_periodic() {
            skipped += 1;
            continue;
        }
        partners[bond.a1].push(bond.a2);
        if policy == ConectPolicy::Full {
            partners[bond.a2].push(bond.a1);
        }
    }
    if skipped > 0 {
        log::debug!("PDB: {skipped} periodic bond(s) have no CONECT form and were left out");
    }

    for (aid, mut list) in partners.into_iter().enumerate() {
        list.sort_unstable();
        for chunk in list.chunks(CONECT_WIDTH) {
            let mut line = format!("CONECT{:>5}", aid + 1);
            for partner in chunk {
                line.push_str(&format!("{:>5}", partner + 1));
            }
            writeln!(writer, "{line}")?;
        }
    }
    Ok(())
}
