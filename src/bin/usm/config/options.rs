use anyhow::{Result, bail};

use usm::io::pdb::WriteOptions;
use usm::{ComposeOptions, CoveragePolicy, GraftAxis, GraftParams, ReplicateOptions};

use crate::cli::{GraftArgs, JoinOptions, PdbOptions};

pub fn build_compose_options(opts: &JoinOptions) -> ComposeOptions {
    ComposeOptions {
        key: opts.key.iter().map(|&k| k.into()).collect(),
        coverage: coverage_policy(opts.require_coverage),
    }
}

pub fn coverage_policy(require: Option<f64>) -> CoveragePolicy {
    require.map_or(CoveragePolicy::Warn, CoveragePolicy::Require)
}

pub fn build_pdb_options(opts: &PdbOptions) -> WriteOptions {
    WriteOptions {
        conect: opts.conect.into(),
        model: opts.model,
    }
}

pub fn build_graft_params(args: &GraftArgs) -> GraftParams {
    let mut params = GraftParams::new(GraftAxis {
        attach: args.attach,
        toward: args.toward,
    });
    params.min_distance = args.min_distance;
    params.torsion_step_deg = args.torsion_step;
    params.screen_attachment = args.screen_attachment;
    params
}

pub fn build_replicate_dims(dims: &[u32]) -> Result<[u32; 3]> {
    match dims {
        &[na, nb, nc] => Ok([na, nb, nc]),
        _ => bail!(
            "--dims takes exactly three counts (NA,NB,NC), got {}",
            dims.len()
        ),
    }
}

pub fn build_replicate_options(tag_images: bool) -> ReplicateOptions {
    ReplicateOptions { tag_images }
}
