use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use usm::JoinField;

/// A `usm run` pipeline: read, compose, transform, replicate, derive terms,
/// write. Relative paths resolve against the directory holding the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub preserve_raw: bool,
    pub inputs: InputsSection,
    #[serde(default)]
    pub compose: ComposeSection,
    #[serde(default)]
    pub transform: TransformSection,
    pub replicate: Option<ReplicateSection>,
    #[serde(default)]
    pub termset: TermsetSection,
    #[serde(default)]
    pub outputs: OutputsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputsSection {
    pub coords: PathBuf,
    pub topology: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeSection {
    #[serde(default = "identity_key")]
    pub key: Vec<JoinField>,
    /// Minimum matched fraction; unmatched rows only warn when absent.
    pub coverage: Option<f64>,
}

impl Default for ComposeSection {
    fn default() -> Self {
        Self {
            key: identity_key(),
            coverage: None,
        }
    }
}

fn identity_key() -> Vec<JoinField> {
    JoinField::IDENTITY.to_vec()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformSection {
    #[serde(default)]
    pub wrap: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicateSection {
    pub dims: [u32; 3],
    #[serde(default)]
    pub tag_images: bool,
    #[serde(default)]
    pub perceive_images: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermsetSection {
    #[serde(default)]
    pub counts: bool,
    #[serde(default)]
    pub known_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputsSection {
    pub car: Option<PathBuf>,
    pub mdf: Option<PathBuf>,
    pub pdb: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub termset: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base)
            .with_context(|| format!("Invalid pipeline config: {}", path.display()))
    }

    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.coords);
        let outputs = &mut self.outputs;
        for path in [
            self.inputs.topology.as_mut(),
            outputs.car.as_mut(),
            outputs.mdf.as_mut(),
            outputs.pdb.as_mut(),
            outputs.json.as_mut(),
            outputs.termset.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.compose.key.is_empty() {
            bail!("[compose] key must name at least one field");
        }
        if let Some(dims) = self.replicate.as_ref().map(|r| r.dims) {
            if dims.contains(&0) {
                bail!("[replicate] dims must all be positive, got {:?}", dims);
            }
        }
        if !self.has_outputs() {
            log::warn!("pipeline config names no outputs; results are discarded");
        }
        Ok(())
    }

    pub fn has_outputs(&self) -> bool {
        let o = &self.outputs;
        o.car.is_some() || o.mdf.is_some() || o.pdb.is_some() || o.json.is_some() || o.termset.is_some()
    }

    /// Number of progress steps this pipeline reports.
    pub fn step_count(&self) -> u8 {
        let mut steps = 2;
        if self.transform.wrap {
            steps += 1;
        }
        if self.replicate.is_some() {
            steps += 1;
        }
        if self.outputs.termset.is_some() || !self.termset.known_types.is_empty() {
            steps += 1;
        }
        steps
    }
}
