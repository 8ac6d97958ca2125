use anyhow::{Context, Result};

use usm::wrap_to_cell;

use crate::cli::WrapArgs;
use crate::display::{Context as DisplayContext, Progress, print_structure_info};

use super::shared::{load_input, resolve_outputs, write_outputs};

const TOTAL_STEPS: u8 = 3;

pub fn run_wrap(args: WrapArgs, ctx: DisplayContext) -> Result<()> {
    let outputs = resolve_outputs(&args.output)?;
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading structure");
    let (structure, details) = load_input(&args.input, &mut progress)?;
    progress.complete_step("Reading structure", &details);

    progress.step("Wrapping into cell");
    if !structure.cell().is_valid() {
        progress.warn("structure has no valid periodic cell; coordinates unchanged");
    }
    let wrapped = wrap_to_cell(&structure).context("Wrapping failed")?;
    let moved = structure
        .atoms()
        .iter()
        .zip(wrapped.atoms())
        .filter(|(a, b)| {
            a.position
                .iter()
                .zip(b.position)
                .any(|(x, y)| x.to_bits() != y.to_bits())
        })
        .count();
    progress.complete_step("Wrapping into cell", &[format!("{moved} atom(s) moved")]);

    if ctx.interactive {
        print_structure_info(&wrapped);
    }

    progress.step("Writing output");
    let written = write_outputs(&wrapped, &outputs, &args.output)?;
    progress.complete_step("Writing output", &written);

    progress.finish();
    Ok(())
}
