use crate::io::{Format, error::Error, util};
use crate::model::{
    atom::Atom,
    cell::Cell,
    provenance::{PreservedText, Provenance, Region},
    structure::{Bond, Structure, StructureParts},
};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::connection::Connection;

const MAGIC: &str = "!BIOSYM molecular_data";
const FIELD_COUNT: usize = 12;

pub fn read<R: BufRead>(reader: R) -> Result<Structure, Error> {
    let lines = util::collect_lines(reader)?;

    let Some((ln, first)) = lines.first() else {
        return Err(Error::parse(Format::Mdf, 1, "empty MDF input"));
    };
    if !first.trim_start().starts_with(MAGIC) {
        return Err(Error::parse(
            Format::Mdf,
            *ln,
            format!("expected '{MAGIC} 4' header"),
        ));
    }

    let body_start = lines
        .iter()
        .position(|(_, l)| l.trim_start().starts_with("@molecule"))
        .unwrap_or(lines.len());

    let mut atoms = Vec::new();
    let mut connections: Vec<(usize, Vec<&str>)> = Vec::new();
    let mut block_name: Option<String> = None;
    let mut last_atom_line = body_start;

    for (idx, (ln, raw)) in lines.iter().enumerate().skip(body_start) {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') {
            continue;
        }
        if trimmed.starts_with('#') {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix("@molecule") {
            block_name = Some(rest.trim().to_string()).filter(|n| !n.is_empty());
            last_atom_line = idx + 1;
            continue;
        }
        if trimmed.starts_with('@') {
            continue;
        }

        let (mut atom, conns) = parse_atom(trimmed, *ln)?;
        atom.mol_block_name.clone_from(&block_name);
        connections.push((*ln, conns));
        atoms.push(atom);
        last_atom_line = idx + 1;
    }

    let bonds = resolve_bonds(&atoms, &connections)?;

    let header: Vec<String> = lines[..body_start].iter().map(|(_, l)| l.clone()).collect();
    let footer: Vec<String> = lines[last_atom_line..]
        .iter()
        .map(|(_, l)| l.clone())
        .collect();

    let mut provenance = Provenance::from_format(Format::Mdf);
    if let Some(date) = header
        .iter()
        .find_map(|l| l.trim_start().strip_prefix("!Date:"))
    {
        provenance = provenance.with_note("date", date.trim());
    }
    for line in &footer {
        let t = line.trim();
        if let Some(p) = t.strip_prefix("@periodicity") {
            provenance = provenance.with_note("periodicity", p.trim());
        } else if let Some(g) = t.strip_prefix("@group") {
            provenance = provenance.with_note("group", g.trim());
        }
    }

    log::debug!(
        "MDF: {} atoms, {} bonds, {} header and {} footer lines",
        atoms.len(),
        bonds.len(),
        header.len(),
        footer.len()
    );

    let mut preserved = PreservedText::new();
    preserved.insert(Region::MdfHeader, header);
    preserved.insert(Region::MdfFooter, footer);

    Structure::from_parts(StructureParts {
        atoms,
        bonds: Some(bonds),
        cell: Cell::none(),
        provenance,
        preserved,
    })
    .map_err(|e| Error::schema(Format::Mdf, e))
}

/// Splits `LABEL_INDEX:NAME` into its identity triple.
pub(super) fn parse_identity(token: &str) -> Option<(String, i64, String)> {
    let (residue, name) = token.split_once(':')?;
    let (label, index) = residue.rsplit_once('_')?;
    let index = index.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((label.to_string(), index, name.to_string()))
}

fn parse_atom(line: &str, ln: usize) -> Result<(Atom, Vec<&str>), Error> {
    let parts: Vec<_> = line.split_whitespace().collect();
    if parts.len() < FIELD_COUNT {
        return Err(Error::parse(
            Format::Mdf,
            ln,
            format!(
                "atom line has {} fields, expected at least {FIELD_COUNT}",
                parts.len()
            ),
        ));
    }

    let (label, index, name) = parse_identity(parts[0]).ok_or_else(|| {
        Error::parse(
            Format::Mdf,
            ln,
            format!("invalid atom identifier '{}', expected LABEL_INDEX:NAME", parts[0]),
        )
    })?;

    let mut atom = Atom::new(label, index, name);
    atom.element = util::known(parts[1]);
    atom.atom_type = util::known(parts[2]);
    atom.charge = Some(util::parse_token(parts[6], Format::Mdf, ln, "charge")?);

    let extras = &mut atom.extras;
    extras.charge_group = Some(parts[3].to_string());
    extras.isotope = Some(parts[4].to_string());
    extras.formal_charge = Some(parts[5].to_string());
    extras.switching_atom = Some(util::parse_token(parts[7], Format::Mdf, ln, "switching atom flag")?);
    extras.oop_flag = Some(util::parse_token(parts[8], Format::Mdf, ln, "out-of-plane flag")?);
    extras.chirality_flag = Some(util::parse_token(parts[9], Format::Mdf, ln, "chirality flag")?);
    extras.occupancy = Some(util::parse_token(parts[10], Format::Mdf, ln, "occupancy")?);
    extras.xray_temp_factor = Some(util::parse_token(
        parts[11],
        Format::Mdf,
        ln,
        "x-ray temperature factor",
    )?);

    let conns = parts[FIELD_COUNT..].to_vec();
    if !conns.is_empty() {
        extras.connections_raw = Some(conns.join(" "));
    }

    Ok((atom, conns))
}

type IdentityKey<'a> = (&'a str, i64, &'a str);

fn resolve_bonds(atoms: &[Atom], connections: &[(usize, Vec<&str>)]) -> Result<Vec<Bond>, Error> {
    let mut index: HashMap<IdentityKey<'_>, usize> = HashMap::with_capacity(atoms.len());
    for (aid, atom) in atoms.iter().enumerate() {
        if let (Some(label), Some(idx), Some(name)) = atom.identity() {
            if let Some(&first) = index.get(&(label, idx, name)) {
                let ln = connections[aid].0;
                log::warn!(
                    "MDF line {ln}: duplicate atom {label}_{idx}:{name}; connections resolve to the first (atom {first})"
                );
            } else {
                index.insert((label, idx, name), aid);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut bonds = Vec::new();
    for (aid, (ln, tokens)) in connections.iter().enumerate() {
        let owner = &atoms[aid];
        for token in tokens {
            let conn = Connection::parse(token)
                .ok_or_else(|| Error::parse(Format::Mdf, *ln, format!("invalid connection '{token}'")))?;

            let label = conn.mol_label.as_deref().or(owner.mol_label.as_deref());
            let mol_index = conn.mol_index.or(owner.mol_index);
            let target = match (label, mol_index) {
                (Some(label), Some(idx)) => index.get(&(label, idx, conn.name.as_str())).copied(),
                _ => None,
            };
            let Some(target) = target else {
                log::warn!("MDF line {ln}: connection '{token}' does not name a known atom; skipped");
                continue;
            };
            if target == aid {
                log::warn!("MDF line {ln}: atom lists itself as connection '{token}'; skipped");
                continue;
            }

            let bond = Bond::periodic(aid, target, conn.order, conn.image);
            if seen.insert(bond.key()) {
                bonds.push(bond);
            }
        }
    }
    Ok(bonds)
}
