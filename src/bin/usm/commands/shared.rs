use std::path::Path;

use anyhow::{Context, Result, bail};

use usm::io::Format;
use usm::{ComposeOptions, ComposeReport, Structure, compose};

use crate::cli::{InputOptions, OutputOptions};
use crate::config::build_pdb_options;
use crate::display::Progress;
use crate::io::{
    OutputSpec, infer_output_format, read_structure, stdin_is_tty, stdout_is_tty, write_structure,
};

/// Reads the primary input and, when `--topology` is given, composes the
/// topology onto it with the identity key.
pub fn load_input(
    opts: &InputOptions,
    progress: &mut Progress,
) -> Result<(Structure, Vec<String>)> {
    if opts.input.is_none() && stdin_is_tty() {
        bail!(
            "No input file specified and stdin is a terminal.\n\nUsage: usm <COMMAND> -i <INPUT> or pipe data via stdin."
        );
    }

    let structure = read_structure(opts.input.as_deref(), opts.input_format.map(Into::into))?;
    let mut details = vec![describe_read(opts.input.as_deref(), &structure)];

    let Some(topology_path) = opts.topology.as_deref() else {
        return Ok((structure, details));
    };

    let topology = read_structure(Some(topology_path), None)?;
    details.push(describe_read(Some(topology_path), &topology));
    let composed = compose(&structure, &topology, &ComposeOptions::default())
        .context("Failed to compose topology onto input")?;
    report_coverage(progress, &composed.report);
    details.push(format!(
        "Compose on identity ({} matched)",
        composed.report.matched_count
    ));
    Ok((composed.structure, details))
}

pub fn describe_read(path: Option<&Path>, structure: &Structure) -> String {
    let name = path
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());
    format!(
        "Read {} ({} atoms, {} bonds)",
        name,
        structure.atom_count(),
        structure.bond_count()
    )
}

pub fn report_coverage(progress: &mut Progress, report: &ComposeReport) {
    if report.left_only_count > 0 || report.right_only_count > 0 {
        progress.warn(&format!(
            "join matched {} atoms; {} coordinate-only, {} topology-only",
            report.matched_count, report.left_only_count, report.right_only_count
        ));
    }
}

pub fn resolve_outputs(opts: &OutputOptions) -> Result<Vec<OutputSpec>> {
    if opts.output.is_empty() {
        if stdout_is_tty() {
            bail!(
                "No output file specified and stdout is a terminal.\n\nUsage: usm <COMMAND> ... -o <OUTPUT> or pipe output."
            );
        }
        let format = opts.output_format.map(Into::into).unwrap_or(Format::Car);
        return Ok(vec![OutputSpec { path: None, format }]);
    }

    let mut specs = Vec::with_capacity(opts.output.len());
    for (i, path) in opts.output.iter().enumerate() {
        let format = match (i, opts.output_format) {
            (0, Some(fmt)) => fmt.into(),
            _ => infer_output_format(path).with_context(|| {
                format!(
                    "Cannot infer format from '{}'. Use --outfmt or an explicit extension.",
                    path.display()
                )
            })?,
        };
        specs.push(OutputSpec {
            path: Some(path.clone()),
            format,
        });
    }
    Ok(specs)
}

/// Writes `structure` to every spec and returns one detail line per file.
pub fn write_outputs(
    structure: &Structure,
    specs: &[OutputSpec],
    opts: &OutputOptions,
) -> Result<Vec<String>> {
    let pdb = build_pdb_options(&opts.pdb);
    specs
        .iter()
        .map(|spec| {
            write_structure(structure, spec, opts.preserve_raw, &pdb)?;
            Ok(format!("Write {} → {}", spec.format, spec.label()))
        })
        .collect()
}
