use std::io::Write;

use anyhow::{Context, Result};

use usm::{TermSet, TermSetOptions, check_coverage, derive_termset};

use crate::cli::TermsetArgs;
use crate::display::{
    Context as DisplayContext, Progress, print_termset_summary, print_type_distribution,
};
use crate::io::create_output;

use super::shared::load_input;

const TOTAL_STEPS: u8 = 3;

pub fn run_termset(args: TermsetArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading structure");
    let (structure, details) = load_input(&args.input, &mut progress)?;
    progress.complete_step("Reading structure", &details);

    if ctx.interactive {
        print_type_distribution(&structure);
    }

    progress.step("Deriving term set");
    let terms = derive_termset(
        &structure,
        &TermSetOptions {
            counts: args.counts,
        },
    )
    .context("Term-set derivation failed")?;
    if !args.known_types.is_empty() {
        check_coverage(&terms, &args.known_types).context("Parameter coverage check failed")?;
    }
    progress.complete_step("Deriving term set", &summarize(&terms));

    if ctx.interactive {
        print_termset_summary(&terms);
    }

    progress.step("Writing output");
    let target = args
        .output
        .as_ref()
        .map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
    write_termset(&terms, args.output.as_deref())?;
    progress.complete_step("Writing output", &[format!("Write JSON → {target}")]);

    progress.finish();
    Ok(())
}

pub fn summarize(terms: &TermSet) -> Vec<String> {
    vec![
        format!("{} atom type(s)", terms.atom_types.len()),
        format!(
            "{} bond, {} angle, {} dihedral, {} improper type(s)",
            terms.bond_types.len(),
            terms.angle_types.len(),
            terms.dihedral_types.len(),
            terms.improper_types.len()
        ),
    ]
}

pub fn write_termset(terms: &TermSet, path: Option<&std::path::Path>) -> Result<()> {
    let json = terms.to_json().context("Failed to encode term set")?;
    let mut writer = create_output(path)?;
    writer
        .write_all(json.as_bytes())
        .and_then(|()| writer.flush())
        .context("Failed to write term set")
}
