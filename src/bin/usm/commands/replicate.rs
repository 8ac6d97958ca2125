use anyhow::{Context, Result};

use usm::{perceive_periodic_bonds, replicate_supercell, validate_supercell};

use crate::cli::ReplicateArgs;
use crate::config::{build_replicate_dims, build_replicate_options};
use crate::display::{
    Context as DisplayContext, Progress, print_structure_info, print_supercell_report,
};

use super::shared::{load_input, resolve_outputs, write_outputs};

const TOTAL_STEPS: u8 = 3;

pub fn run_replicate(args: ReplicateArgs, ctx: DisplayContext) -> Result<()> {
    let [na, nb, nc] = build_replicate_dims(&args.dims)?;
    let options = build_replicate_options(args.tag_images);
    let outputs = resolve_outputs(&args.output)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading structure");
    let (mut structure, mut details) = load_input(&args.input, &mut progress)?;
    if args.perceive_images {
        structure = perceive_periodic_bonds(&structure)
            .context("Failed to perceive periodic bond images")?;
        details.push("Assign minimum-image bond shifts".to_string());
    }
    progress.complete_step("Reading structure", &details);

    progress.step("Replicating supercell");
    let supercell = replicate_supercell(&structure, na, nb, nc, &options)
        .with_context(|| format!("Failed to replicate {na}×{nb}×{nc} supercell"))?;
    let report = validate_supercell(&supercell);
    progress.complete_step(
        "Replicating supercell",
        &[
            format!("Tile {na}×{nb}×{nc} ({} atoms)", supercell.atom_count()),
            format!("{} periodic bond(s)", report.n_periodic_bonds),
        ],
    );

    if ctx.interactive {
        print_structure_info(&supercell);
        print_supercell_report(&report);
    }

    progress.step("Writing output");
    let written = write_outputs(&supercell, &outputs, &args.output)?;
    progress.complete_step("Writing output", &written);

    progress.finish();
    Ok(())
}
