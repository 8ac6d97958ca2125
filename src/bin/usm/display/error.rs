use std::io::{self, Write};

use anyhow::Error;

use usm::io::Format;
use usm::{InvalidCellError, IoError, MissingTypesError, OpsError, SchemaError, TopologyError};

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    let hints = HintCollector::collect(err);
    if !hints.is_empty() {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

#[derive(Default)]
struct HintCollector {
    hints: Vec<String>,
    typed: bool,
}

impl HintCollector {
    fn collect(err: &Error) -> Vec<String> {
        let mut collector = Self::default();

        if let Some(e) = err.downcast_ref::<IoError>() {
            collector.typed = true;
            collector.io_hints(e);
        }
        if let Some(e) = err.downcast_ref::<OpsError>() {
            collector.typed = true;
            collector.ops_hints(e);
        }
        if let Some(e) = err.downcast_ref::<TopologyError>() {
            collector.typed = true;
            collector.topology_hints(e);
        }
        if let Some(e) = err.downcast_ref::<MissingTypesError>() {
            collector.typed = true;
            collector.missing_types_hints(e);
        }
        if err.downcast_ref::<toml::de::Error>().is_some() {
            collector.typed = true;
            collector.add("The pipeline file is not valid TOML or names an unknown key");
            collector.add(
                "Sections: [inputs] [compose] [transform] [replicate] [termset] [outputs]",
            );
        }

        if !collector.typed {
            collector.fallback_hints(err);
        }
        collector.hints
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn io_hints(&mut self, err: &IoError) {
        match err {
            IoError::Io { source } => self.std_io_hints(source),

            IoError::Parse { format, line, .. } => {
                self.add(format!("Inspect the {format} input around line {line}"));
                self.add("Use --infmt if the extension does not match the content");
                self.format_hints(*format);
            }

            IoError::UnsupportedReadFormat(format) => {
                self.add(format!("{format} is an output-only format"));
                self.add("Readable formats: car, mdf, pdb");
            }

            IoError::Schema { source, .. } => self.schema_hints(source),

            IoError::Json(_) => {
                self.add("Structure fields could not be encoded as JSON");
            }
        }
    }

    fn format_hints(&mut self, format: Format) {
        match format {
            Format::Car => {
                self.add("CAR: expect '!BIOSYM archive 3', then PBC=ON or PBC=OFF");
                self.add("CAR: atom lines are 'name x y z label index type element charge'");
            }
            Format::Mdf => {
                self.add("MDF: atom lines start with LABEL_INDEX:NAME and hold 12 columns");
                self.add("MDF: connections look like [LABEL_INDEX:]NAME[%ijk][/order]");
            }
            Format::Pdb => {
                self.add("PDB: check the fixed columns of ATOM/HETATM and CRYST1 records");
            }
            Format::Json => {}
        }
    }

    fn std_io_hints(&mut self, source: &io::Error) {
        match source.kind() {
            io::ErrorKind::NotFound => {
                self.add("Check the path spelling and ensure the file exists");
            }
            io::ErrorKind::PermissionDenied => {
                self.add("Check file permissions with `ls -la`");
            }
            io::ErrorKind::InvalidData => {
                self.add("The file is not valid UTF-8 text");
            }
            io::ErrorKind::BrokenPipe => {
                self.add("Output consumer closed the pipe (e.g. `head`)");
            }
            _ => {
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn schema_hints(&mut self, err: &SchemaError) {
        match err {
            SchemaError::InfiniteCoordinate { aid, .. } | SchemaError::NonFiniteField { aid, .. } => {
                self.add(format!("Atom {aid} carries an infinite or NaN numeric field"));
            }
            SchemaError::BondEndpointOutOfRange { bid, .. } | SchemaError::SelfBond { bid, .. } => {
                self.add(format!("Bond {bid} references an invalid atom"));
                self.add("Check the connection list of the topology input");
            }
            SchemaError::NonFiniteBondOrder { bid, .. } => {
                self.add(format!("Bond {bid} has a non-finite order"));
            }
        }
    }

    fn ops_hints(&mut self, err: &OpsError) {
        match err {
            OpsError::InvalidCell(cell) => self.cell_hints(cell),

            OpsError::AmbiguousJoinKey { .. } => {
                self.add("Atom identities are not unique under the join key");
                self.add("Add fields with --key (e.g. mol-label,mol-index,name,element)");
                self.add("Or renumber duplicate atoms in the inputs");
            }

            OpsError::InsufficientCoverage { matched, total, .. } => {
                self.add(format!("Only {matched} of {total} coordinate atoms found a topology row"));
                self.add("Check that both files describe the same system");
                self.add("Lower --require-coverage, or drop it to only warn");
            }

            OpsError::InvalidArgument { name, .. } => {
                self.add(format!("Check the value given for '{name}'"));
            }

            OpsError::Schema(source) => self.schema_hints(source),
        }
    }

    fn cell_hints(&mut self, err: &InvalidCellError) {
        match err {
            InvalidCellError::NotPeriodic => {
                self.add("This operation needs a periodic cell");
                self.add("Use a CAR file with PBC=ON or a PDB file with CRYST1");
            }
            _ => {
                self.add("Cell lengths must be positive and angles must form a valid cell");
            }
        }
    }

    fn topology_hints(&mut self, err: &TopologyError) {
        match err {
            TopologyError::UntypedAtom { .. } => {
                self.add("Every bonded atom needs an atom type");
                self.add("Supply typing with --topology <file.mdf>");
            }
        }
    }

    fn missing_types_hints(&mut self, err: &MissingTypesError) {
        self.add(format!("{} atom type(s) lack parameters", err.missing.len()));
        self.add("Add them to --known-types or to the parameter source");
    }

    fn fallback_hints(&mut self, err: &Error) {
        let text = err
            .chain()
            .map(|e| e.to_string().to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        if text.contains("stdin") || text.contains("terminal") {
            self.add("Provide input via -i/--input or pipe data to stdin");
        } else if text.contains("infer format") {
            self.add("Known extensions: .car .mdf .pdb (input), plus .json (output)");
        } else if text.contains("no such file") || text.contains("not found") {
            self.add("Check that the file path is correct");
        }
    }
}
