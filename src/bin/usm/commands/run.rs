use anyhow::{Context, Result};

use usm::io::Format;
use usm::io::pdb::WriteOptions;
use usm::{
    ComposeOptions, Structure, TermSetOptions, check_coverage, compose, derive_termset,
    perceive_periodic_bonds, replicate_supercell, validate_supercell, wrap_to_cell,
};

use crate::cli::RunArgs;
use crate::config::{PipelineConfig, build_replicate_options, coverage_policy};
use crate::display::{
    Context as DisplayContext, Progress, print_compose_report, print_structure_info,
    print_supercell_report, print_termset_summary,
};
use crate::io::{OutputSpec, read_structure, write_structure};

use super::shared::{describe_read, report_coverage};
use super::termset::{summarize, write_termset};

pub fn run_pipeline(args: RunArgs, ctx: DisplayContext) -> Result<()> {
    let config = PipelineConfig::load(&args.config)?;
    log::info!("loaded pipeline {}", args.config.display());

    let mut progress = Progress::new(ctx.interactive, config.step_count());

    progress.step("Reading inputs");
    let mut structure = read_structure(Some(&config.inputs.coords), None)?;
    let mut details = vec![describe_read(Some(&config.inputs.coords), &structure)];
    if let Some(path) = &config.inputs.topology {
        let topology = read_structure(Some(path), None)?;
        details.push(describe_read(Some(path), &topology));

        let options = ComposeOptions {
            key: config.compose.key.clone(),
            coverage: coverage_policy(config.compose.coverage),
        };
        let composed = compose(&structure, &topology, &options).context("Composition failed")?;
        report_coverage(&mut progress, &composed.report);
        if ctx.interactive {
            print_compose_report(&composed.report);
        }
        structure = composed.structure;
    }
    progress.complete_step("Reading inputs", &details);

    if config.transform.wrap {
        progress.step("Wrapping into cell");
        structure = wrap_to_cell(&structure).context("Wrapping failed")?;
        progress.complete_step("Wrapping into cell", &[]);
    }

    if let Some(replicate) = &config.replicate {
        let [na, nb, nc] = replicate.dims;
        progress.step("Replicating supercell");
        if replicate.perceive_images {
            structure = perceive_periodic_bonds(&structure)
                .context("Failed to perceive periodic bond images")?;
        }
        structure = replicate_supercell(
            &structure,
            na,
            nb,
            nc,
            &build_replicate_options(replicate.tag_images),
        )
        .with_context(|| format!("Failed to replicate {na}×{nb}×{nc} supercell"))?;
        let report = validate_supercell(&structure);
        progress.complete_step(
            "Replicating supercell",
            &[format!("Tile {na}×{nb}×{nc} ({} atoms)", structure.atom_count())],
        );
        if ctx.interactive {
            print_supercell_report(&report);
        }
    }

    if ctx.interactive {
        print_structure_info(&structure);
    }

    if config.outputs.termset.is_some() || !config.termset.known_types.is_empty() {
        progress.step("Deriving term set");
        let terms = derive_termset(
            &structure,
            &TermSetOptions {
                counts: config.termset.counts,
            },
        )
        .context("Term-set derivation failed")?;
        if !config.termset.known_types.is_empty() {
            check_coverage(&terms, &config.termset.known_types)
                .context("Parameter coverage check failed")?;
        }
        if let Some(path) = &config.outputs.termset {
            write_termset(&terms, Some(path))?;
        }
        progress.complete_step("Deriving term set", &summarize(&terms));
        if ctx.interactive {
            print_termset_summary(&terms);
        }
    }

    progress.step("Writing outputs");
    let written = write_structures(&structure, &config)?;
    progress.complete_step("Writing outputs", &written);

    progress.finish();
    Ok(())
}

fn write_structures(structure: &Structure, config: &PipelineConfig) -> Result<Vec<String>> {
    let outputs = &config.outputs;
    let specs = [
        (Format::Car, &outputs.car),
        (Format::Mdf, &outputs.mdf),
        (Format::Pdb, &outputs.pdb),
        (Format::Json, &outputs.json),
    ]
    .into_iter()
    .filter_map(|(format, path)| {
        path.clone().map(|p| OutputSpec {
            path: Some(p),
            format,
        })
    });

    let pdb = WriteOptions::default();
    let mut written = Vec::new();
    for spec in specs {
        write_structure(structure, &spec, config.preserve_raw, &pdb)?;
        written.push(format!("Write {} → {}", spec.format, spec.label()));
    }
    Ok(written)
}
