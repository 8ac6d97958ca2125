use crate::io::{Format, error::Error, util};
use crate::model::{
    atom::Atom,
    cell::Cell,
    provenance::{PreservedText, Provenance, Region},
    structure::{Structure, StructureParts},
};
use std::io::BufRead;

const MAGIC: &str = "!BIOSYM archive";

pub fn read<R: BufRead>(reader: R) -> Result<Structure, Error> {
    let lines = util::collect_lines(reader)?;

    let header = parse_header(&lines)?;
    let body = &lines[header.len..];

    let last_atom = body
        .iter()
        .rposition(|(_, l)| is_atom_line(l))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut atoms = Vec::new();
    let mut block = 0u32;
    for (ln, raw) in &body[..last_atom] {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("end") {
            block += 1;
            continue;
        }
        let mut atom = parse_atom(raw, *ln)?;
        atom.extras.car_block = Some(block);
        atoms.push(atom);
    }

    let footer: Vec<String> = body[last_atom..].iter().map(|(_, l)| l.clone()).collect();
    log::debug!(
        "CAR: {} atoms in {} block(s), {} header and {} footer lines",
        atoms.len(),
        block + 1,
        header.len,
        footer.len()
    );

    let mut preserved = PreservedText::new();
    preserved.insert(
        Region::CarHeader,
        lines[..header.len].iter().map(|(_, l)| l.clone()).collect(),
    );
    preserved.insert(Region::CarFooter, footer);

    let mut provenance = Provenance::from_format(Format::Car).with_note("title", header.title);
    if let Some(date) = header.date {
        provenance = provenance.with_note("date", date);
    }

    Structure::from_parts(StructureParts {
        atoms,
        bonds: None,
        cell: header.cell,
        provenance,
        preserved,
    })
    .map_err(|e| Error::schema(Format::Car, e))
}

struct Header {
    len: usize,
    title: String,
    date: Option<String>,
    cell: Cell,
}

fn parse_header(lines: &[(usize, String)]) -> Result<Header, Error> {
    let mut cursor = 0;
    let (ln, magic) = line_at(lines, &mut cursor, "archive header")?;
    if !magic.trim_start().starts_with(MAGIC) {
        return Err(Error::parse(
            Format::Car,
            *ln,
            format!("expected '{MAGIC} 3' header"),
        ));
    }

    let (ln, flag) = line_at(lines, &mut cursor, "PBC flag")?;
    let pbc = match flag.trim().to_ascii_uppercase().as_str() {
        "PBC=ON" => true,
        "PBC=OFF" => false,
        other => {
            return Err(Error::parse(
                Format::Car,
                *ln,
                format!("expected PBC=ON or PBC=OFF, found '{other}'"),
            ));
        }
    };

    let (_, title) = line_at(lines, &mut cursor, "title line")?;
    let title = title.trim().to_string();

    let mut date = None;
    if let Some((_, line)) = lines.get(cursor) {
        if let Some(rest) = line.trim_start().strip_prefix("!DATE") {
            date = Some(rest.trim().to_string()).filter(|d| !d.is_empty());
            cursor += 1;
        }
    }

    let cell = if pbc {
        let (ln, line) = line_at(lines, &mut cursor, "PBC cell line")?;
        parse_cell(line, *ln)?
    } else {
        Cell::none()
    };

    Ok(Header {
        len: cursor,
        title,
        date,
        cell,
    })
}

fn line_at<'a>(
    lines: &'a [(usize, String)],
    cursor: &mut usize,
    what: &str,
) -> Result<&'a (usize, String), Error> {
    let line = lines
        .get(*cursor)
        .ok_or_else(|| Error::parse(Format::Car, *cursor + 1, format!("missing {what}")))?;
    *cursor += 1;
    Ok(line)
}

fn parse_cell(line: &str, ln: usize) -> Result<Cell, Error> {
    let parts: Vec<_> = line.split_whitespace().collect();
    if parts.first() != Some(&"PBC") || parts.len() < 7 {
        return Err(Error::parse(
            Format::Car,
            ln,
            "PBC line must hold a, b, c, alpha, beta and gamma",
        ));
    }

    let mut values = [0.0f64; 6];
    for (slot, (token, name)) in values.iter_mut().zip(
        parts[1..7]
            .iter()
            .zip(["a", "b", "c", "alpha", "beta", "gamma"]),
    ) {
        *slot = util::parse_token(token, Format::Car, ln, name)?;
    }

    let [a, b, c, alpha, beta, gamma] = values;
    let mut cell = Cell::periodic(a, b, c, alpha, beta, gamma);
    if let Some(sg) = parts.get(7) {
        let sg = sg.trim_start_matches('(').trim_end_matches(')');
        if !sg.is_empty() {
            cell = cell.with_spacegroup(sg);
        }
    }
    Ok(cell)
}

fn is_atom_line(line: &str) -> bool {
    let parts: Vec<_> = line.split_whitespace().collect();
    parts.len() >= 8 && parts[1..4].iter().all(|t| t.parse::<f64>().is_ok())
}

fn parse_atom(line: &str, ln: usize) -> Result<Atom, Error> {
    let parts: Vec<_> = line.split_whitespace().collect();
    if parts.len() < 8 {
        return Err(Error::parse(
            Format::Car,
            ln,
            "atom line needs name, x, y, z, label, index, type and element",
        ));
    }

    let x = util::parse_token(parts[1], Format::Car, ln, "x coordinate")?;
    let y = util::parse_token(parts[2], Format::Car, ln, "y coordinate")?;
    let z = util::parse_token(parts[3], Format::Car, ln, "z coordinate")?;
    let mol_index: i64 = util::parse_token(parts[5], Format::Car, ln, "molecule index")?;
    let charge = parts
        .get(8)
        .map(|t| util::parse_token::<f64>(t, Format::Car, ln, "charge"))
        .transpose()?;

    let mut atom = Atom::new(parts[4], mol_index, parts[0]).with_position([x, y, z]);
    atom.atom_type = util::known(parts[6]);
    atom.element = util::known(parts[7]);
    atom.charge = charge;
    Ok(atom)
}
