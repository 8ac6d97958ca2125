use anyhow::{Context, Result};

use usm::{AnchorSite, graft};

use crate::cli::GraftArgs;
use crate::config::build_graft_params;
use crate::display::{
    Context as DisplayContext, Progress, print_graft_report, print_structure_info,
};
use crate::io::read_structure;

use super::shared::{describe_read, load_input, resolve_outputs, write_outputs};

const TOTAL_STEPS: u8 = 3;

pub fn run_graft(args: GraftArgs, ctx: DisplayContext) -> Result<()> {
    let outputs = resolve_outputs(&args.output)?;
    let params = build_graft_params(&args);

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading host and guest");
    let (host, mut details) = load_input(&args.input, &mut progress)?;
    let guest = read_structure(Some(&args.guest), None)?;
    details.push(describe_read(Some(&args.guest), &guest));
    progress.complete_step("Reading host and guest", &details);

    progress.step("Placing guest copies");
    let sites = args
        .sites
        .iter()
        .map(|s| {
            AnchorSite::replacing(&host, s.base, s.leaving)
                .with_context(|| format!("Invalid anchor site {}:{}", s.base, s.leaving))
        })
        .collect::<Result<Vec<_>>>()?;
    let grafted = graft(&host, &guest, &sites, &params).context("Grafting failed")?;
    for &site in &grafted.report.unplaced {
        let spec = &args.sites[site];
        progress.warn(&format!(
            "site {}:{} left unplaced, no torsion clears {:.2} Å",
            spec.base, spec.leaving, params.min_distance
        ));
    }
    let placed: Vec<String> = grafted
        .report
        .placed
        .iter()
        .map(|p| {
            let spec = &args.sites[p.site];
            format!(
                "Site {}:{} at torsion {:.1}°",
                spec.base, spec.leaving, p.torsion_deg
            )
        })
        .collect();
    progress.complete_step("Placing guest copies", &placed);

    if ctx.interactive {
        print_graft_report(&grafted.report);
        print_structure_info(&grafted.structure);
    }

    progress.step("Writing output");
    let written = write_outputs(&grafted.structure, &outputs, &args.output)?;
    progress.complete_step("Writing output", &written);

    progress.finish();
    Ok(())
}
