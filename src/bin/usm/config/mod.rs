mod options;
mod pipeline;

pub use options::{
    build_compose_options, build_graft_params, build_pdb_options, build_replicate_dims,
    build_replicate_options, coverage_policy,
};
pub use pipeline::PipelineConfig;
