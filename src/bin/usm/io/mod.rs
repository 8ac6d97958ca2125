mod infer;
mod spec;

pub use infer::{input as infer_input_format, output as infer_output_format};
pub use spec::OutputSpec;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use usm::Structure;
use usm::io::Format;
use usm::io::pdb::WriteOptions;

pub fn stderr_is_tty() -> bool {
    io::stderr().is_terminal()
}

pub fn stdin_is_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn stdout_is_tty() -> bool {
    io::stdout().is_terminal()
}

pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) => {
            let file = File::open(p)
                .with_context(|| format!("Failed to open input file: {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Failed to create output file: {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Reads one structure, inferring the format from `path` unless given.
pub fn read_structure(path: Option<&Path>, format: Option<Format>) -> Result<Structure> {
    let format = match (format, path) {
        (Some(f), _) => f,
        (None, Some(p)) => infer_input_format(p).with_context(|| {
            format!(
                "Cannot infer format from '{}'. Use --infmt to specify.",
                p.display()
            )
        })?,
        (None, None) => bail!("Reading from stdin requires --infmt"),
    };

    let input = open_input(path)?;
    let structure = usm::io::read(input, format).with_context(|| match path {
        Some(p) => format!("Failed to read {} structure: {}", format, p.display()),
        None => format!("Failed to read {} structure from stdin", format),
    })?;

    log::info!(
        "read {} atoms, {} bonds from {}",
        structure.atom_count(),
        structure.bond_count(),
        path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string())
    );
    Ok(structure)
}

pub fn write_structure(
    structure: &Structure,
    spec: &OutputSpec,
    preserve_raw: bool,
    pdb: &WriteOptions,
) -> Result<()> {
    let mut writer = create_output(spec.path.as_deref())?;
    let result = match spec.format {
        Format::Pdb => usm::io::pdb::write(&mut writer, structure, preserve_raw, pdb),
        format => usm::io::write(&mut writer, structure, format, preserve_raw),
    };
    result.with_context(|| format!("Failed to write {} output: {}", spec.format, spec.label()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output: {}", spec.label()))
}
