use anyhow::{Context, Result};

use usm::compose;

use crate::cli::ComposeArgs;
use crate::config::build_compose_options;
use crate::display::{
    Context as DisplayContext, Progress, print_compose_report, print_structure_info,
};
use crate::io::read_structure;

use super::shared::{describe_read, report_coverage, resolve_outputs, write_outputs};

const TOTAL_STEPS: u8 = 3;

pub fn run_compose(args: ComposeArgs, ctx: DisplayContext) -> Result<()> {
    let outputs = resolve_outputs(&args.output)?;
    let options = build_compose_options(&args.join);

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading inputs");
    let coords = read_structure(Some(&args.coords), None)?;
    let topology = read_structure(Some(&args.topology), None)?;
    progress.complete_step(
        "Reading inputs",
        &[
            describe_read(Some(&args.coords), &coords),
            describe_read(Some(&args.topology), &topology),
        ],
    );

    progress.step("Composing");
    let composed = compose(&coords, &topology, &options).context("Composition failed")?;
    report_coverage(&mut progress, &composed.report);
    let key = options
        .key
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    progress.complete_step("Composing", &[format!("Join on ({key})")]);

    if ctx.interactive {
        print_compose_report(&composed.report);
        print_structure_info(&composed.structure);
    }

    progress.step("Writing output");
    let written = write_outputs(&composed.structure, &outputs, &args.output)?;
    progress.complete_step("Writing output", &written);

    progress.finish();
    Ok(())
}
