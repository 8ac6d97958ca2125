use crate::io::{Format, error::Error, util};
use crate::model::{
    atom::Atom,
    cell::Cell,
    provenance::{PreservedText, Provenance, Region},
    structure::{Bond, Structure, StructureParts},
};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

const BODY_RECORDS: [&str; 4] = ["CRYST1", "MODEL", "ATOM", "HETATM"];

pub fn read<R: BufRead>(reader: R) -> Result<Structure, Error> {
    let lines = util::collect_lines(reader)?;

    let body_start = lines
        .iter()
        .position(|(_, l)| BODY_RECORDS.iter().any(|r| record_name(l) == *r))
        .unwrap_or(lines.len());

    let mut provenance = Provenance::from_format(Format::Pdb);
    let title: Vec<&str> = lines[..body_start]
        .iter()
        .filter(|(_, l)| record_name(l) == "TITLE")
        .map(|(_, l)| util::columns(l, 10, 80))
        .filter(|t| !t.is_empty())
        .collect();
    if !title.is_empty() {
        provenance = provenance.with_note("title", title.join(" "));
    }

    let mut cell = Cell::none();
    let mut atoms = Vec::new();
    let mut serials: HashMap<i64, usize> = HashMap::new();
    let mut conect: Vec<(usize, i64, Vec<i64>)> = Vec::new();
    let mut first_model_done = false;
    let mut skipped_models = 0usize;

    for (ln, line) in &lines[body_start..] {
        match record_name(line) {
            "CRYST1" => cell = parse_cryst1(line, *ln)?,
            "MODEL" if first_model_done => skipped_models += 1,
            "ENDMDL" => first_model_done = true,
            "ATOM" | "HETATM" if !first_model_done => {
                let (serial, atom) = parse_atom(line, *ln)?;
                if serials.insert(serial, atoms.len()).is_some() {
                    log::warn!("PDB line {ln}: duplicate serial {serial}; later atom wins for CONECT");
                }
                atoms.push(atom);
            }
            "CONECT" => conect.push(parse_conect(line, *ln)?),
            _ => {}
        }
    }

    if skipped_models > 0 {
        log::warn!("PDB: read the first model only, {skipped_models} further model(s) ignored");
    }

    let bonds = (!conect.is_empty()).then(|| resolve_conect(&serials, &conect));

    log::debug!(
        "PDB: {} atoms, {} bonds, {} header lines",
        atoms.len(),
        bonds.as_ref().map_or(0, Vec::len),
        body_start
    );

    let mut preserved = PreservedText::new();
    preserved.insert(
        Region::PdbHeader,
        lines[..body_start].iter().map(|(_, l)| l.clone()).collect(),
    );

    Structure::from_parts(StructureParts {
        atoms,
        bonds,
        cell,
        provenance,
        preserved,
    })
    .map_err(|e| Error::schema(Format::Pdb, e))
}

fn record_name(line: &str) -> &str {
    util::columns(line, 0, 6)
}

fn parse_cryst1(line: &str, ln: usize) -> Result<Cell, Error> {
    let fields = [
        (6, 15, "a"),
        (15, 24, "b"),
        (24, 33, "c"),
        (33, 40, "alpha"),
        (40, 47, "beta"),
        (47, 54, "gamma"),
    ];
    let mut values = [0.0f64; 6];
    for (slot, (start, end, name)) in values.iter_mut().zip(fields) {
        *slot = util::parse_token(util::columns(line, start, end), Format::Pdb, ln, name)?;
    }
    let [a, b, c, alpha, beta, gamma] = values;
    let cell = Cell::periodic(a, b, c, alpha, beta, gamma);
    let sg = util::columns(line, 55, 66);
    Ok(if sg.is_empty() {
        cell
    } else {
        cell.with_spacegroup(sg)
    })
}

fn parse_atom(line: &str, ln: usize) -> Result<(i64, Atom), Error> {
    let serial = util::parse_token(util::columns(line, 6, 11), Format::Pdb, ln, "atom serial")?;
    let x = util::parse_token(util::columns(line, 30, 38), Format::Pdb, ln, "x coordinate")?;
    let y = util::parse_token(util::columns(line, 38, 46), Format::Pdb, ln, "y coordinate")?;
    let z = util::parse_token(util::columns(line, 46, 54), Format::Pdb, ln, "z coordinate")?;

    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    let optional_f64 = |start, end, what| -> Result<Option<f64>, Error> {
        let token = util::columns(line, start, end);
        if token.is_empty() {
            Ok(None)
        } else {
            util::parse_token(token, Format::Pdb, ln, what).map(Some)
        }
    };

    let res_seq = util::columns(line, 22, 26);
    let mol_index = if res_seq.is_empty() {
        None
    } else {
        Some(util::parse_token(res_seq, Format::Pdb, ln, "residue number")?)
    };

    let mut atom = Atom::default().with_position([x, y, z]);
    atom.name = non_empty(util::columns(line, 12, 16));
    atom.mol_label = non_empty(util::columns(line, 17, 21));
    atom.mol_index = mol_index;
    atom.element = non_empty(util::columns(line, 76, 78));
    atom.extras.record = Some(record_name(line).to_string());
    atom.extras.occupancy = optional_f64(54, 60, "occupancy")?;
    atom.extras.xray_temp_factor = optional_f64(60, 66, "temperature factor")?;
    Ok((serial, atom))
}

fn parse_conect(line: &str, ln: usize) -> Result<(usize, i64, Vec<i64>), Error> {
    let source = util::parse_token(util::columns(line, 6, 11), Format::Pdb, ln, "CONECT serial")?;
    let mut partners = Vec::new();
    let mut start = 11;
    while start < line.len() {
        let token = util::columns(line, start, start + 5);
        if !token.is_empty() {
            partners.push(util::parse_token(token, Format::Pdb, ln, "CONECT partner")?);
        }
        start += 5;
    }
    Ok((ln, source, partners))
}

fn resolve_conect(serials: &HashMap<i64, usize>, conect: &[(usize, i64, Vec<i64>)]) -> Vec<Bond> {
    let mut seen = HashSet::new();
    let mut bonds = Vec::new();
    for (ln, source, partners) in conect {
        let Some(&a1) = serials.get(source) else {
            log::warn!("PDB line {ln}: CONECT names unknown serial {source}; skipped");
            continue;
        };
        for partner in partners {
            let Some(&a2) = serials.get(partner) else {
                log::warn!("PDB line {ln}: CONECT names unknown serial {partner}; skipped");
                continue;
            };
            if a1 == a2 {
                continue;
            }
            let bond = Bond::new(a1, a2, 1.0);
            if seen.insert(bond.key()) {
                bonds.push(bond);
            }
        }
    }
    bonds
}
