use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "usm",
    about = "Deterministic atomistic structure and topology staging",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge a coordinate file with a topology file on atom identity
    #[command(visible_alias = "c")]
    Compose(ComposeArgs),

    /// Wrap atoms into the primary cell
    #[command(visible_alias = "w")]
    Wrap(WrapArgs),

    /// Tile a periodic structure into an na×nb×nc supercell
    #[command(visible_alias = "r")]
    Replicate(ReplicateArgs),

    /// Derive the canonical bonded term set as JSON
    #[command(visible_alias = "t")]
    Termset(TermsetArgs),

    /// Attach copies of a guest fragment at host anchor sites
    #[command(visible_alias = "g")]
    Graft(GraftArgs),

    /// Execute a TOML pipeline description
    Run(RunArgs),
}

/// Structure input shared by all single-structure commands.
#[derive(Args)]
pub struct InputOptions {
    /// Input file (stdin if omitted, requires --infmt)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input format (inferred from extension if not specified)
    #[arg(long = "infmt", value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    /// Topology file composed onto the input before processing (MDF)
    #[arg(long, value_name = "FILE")]
    pub topology: Option<PathBuf>,
}

/// Structure outputs shared by all commands that emit a structure.
#[derive(Args)]
pub struct OutputOptions {
    /// Output file(s), repeatable for multi-format output
    #[arg(short, long, value_name = "FILE", action = ArgAction::Append)]
    pub output: Vec<PathBuf>,

    /// Output format for first/only output
    #[arg(long = "outfmt", value_name = "FORMAT")]
    pub output_format: Option<OutputFormat>,

    /// Write preserved headers, footers and raw connections back verbatim
    #[arg(long)]
    pub preserve_raw: bool,

    #[command(flatten)]
    pub pdb: PdbOptions,
}

#[derive(Args)]
#[command(next_help_heading = "PDB Output Options")]
pub struct PdbOptions {
    /// CONECT emission policy
    #[arg(long = "pdb-conect", value_name = "POLICY", default_value = "full")]
    pub conect: ConectMode,

    /// Wrap atoms in MODEL/ENDMDL with this serial
    #[arg(long = "pdb-model", value_name = "N")]
    pub model: Option<u32>,
}

#[derive(Args)]
#[command(next_help_heading = "Composition")]
pub struct JoinOptions {
    /// Join key fields (comma-separated)
    #[arg(
        long,
        value_name = "FIELDS",
        value_delimiter = ',',
        default_value = "mol-label,mol-index,name"
    )]
    pub key: Vec<KeyField>,

    /// Fail unless at least this fraction of coordinate atoms match
    #[arg(long = "require-coverage", value_name = "FRACTION")]
    pub require_coverage: Option<f64>,
}

#[derive(Args)]
pub struct ComposeArgs {
    /// Coordinate-bearing structure (CAR or PDB)
    #[arg(long, value_name = "FILE")]
    pub coords: PathBuf,

    /// Topology-bearing structure (MDF)
    #[arg(long, value_name = "FILE")]
    pub topology: PathBuf,

    #[command(flatten)]
    pub join: JoinOptions,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct WrapArgs {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct ReplicateArgs {
    #[command(flatten)]
    pub input: InputOptions,

    /// Supercell dimensions NA,NB,NC
    #[arg(long, value_name = "NA,NB,NC", value_delimiter = ',', required = true)]
    pub dims: Vec<u32>,

    /// Suffix atom names with their tile index and record the tile
    #[arg(long)]
    pub tag_images: bool,

    /// Derive periodic bonds by minimum image before tiling
    #[arg(long)]
    pub perceive_images: bool,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct TermsetArgs {
    #[command(flatten)]
    pub input: InputOptions,

    /// JSON output file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Include per-type instance counts
    #[arg(long)]
    pub counts: bool,

    /// Atom types the target parameter set covers (comma-separated)
    #[arg(long = "known-types", value_name = "TYPES", value_delimiter = ',')]
    pub known_types: Vec<String>,
}

#[derive(Args)]
pub struct GraftArgs {
    #[command(flatten)]
    pub input: InputOptions,

    /// Guest fragment file (CAR, MDF or PDB)
    #[arg(long, value_name = "FILE")]
    pub guest: PathBuf,

    /// Anchor site as BASE:LEAVING host atom ids, repeatable
    #[arg(long = "site", value_name = "BASE:LEAVING", action = ArgAction::Append, required = true)]
    pub sites: Vec<SiteSpec>,

    /// Guest atom bonded to the host
    #[arg(long, value_name = "AID")]
    pub attach: usize,

    /// Guest atom defining the outward axis from the attach atom
    #[arg(long, value_name = "AID")]
    pub toward: usize,

    /// Minimum guest-to-obstacle distance (Å)
    #[arg(long = "min-distance", value_name = "Å", default_value = "2.0")]
    pub min_distance: f64,

    /// Torsion scan increment (degrees)
    #[arg(long = "torsion-step", value_name = "DEG", default_value = "10.0")]
    pub torsion_step: f64,

    /// Also screen the attach atom against the linked host atom
    #[arg(long)]
    pub screen_attachment: bool,

    #[command(flatten)]
    pub output: OutputOptions,
}

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline description (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Materials Studio archive (coordinates)
    Car,
    /// Materials Studio molecular data (topology)
    Mdf,
    /// Protein Data Bank
    Pdb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Car,
    Mdf,
    Pdb,
    /// Full structure dump
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum ConectMode {
    /// No CONECT records
    None,
    /// Each bond once, from its lower serial
    Dedup,
    /// Each bond from both endpoints
    #[default]
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyField {
    MolLabel,
    MolIndex,
    Name,
    Element,
    AtomType,
    MolBlockName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiteSpec {
    pub base: usize,
    pub leaving: usize,
}

impl std::str::FromStr for SiteSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, leaving) = s
            .split_once(':')
            .ok_or_else(|| format!("expected BASE:LEAVING, found '{}'", s))?;
        let base = base
            .trim()
            .parse()
            .map_err(|_| format!("invalid base atom id: '{}'", base))?;
        let leaving = leaving
            .trim()
            .parse()
            .map_err(|_| format!("invalid leaving atom id: '{}'", leaving))?;
        if base == leaving {
            return Err("base and leaving atoms must differ".into());
        }
        Ok(Self { base, leaving })
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
