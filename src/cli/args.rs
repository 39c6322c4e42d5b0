//! CLI arguments for the dtspack binary.

use crate::OutputFormat;
use crate::entry::CollisionStrategy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "dtspack",
    version,
    about = "Bundle TypeScript declarations into one .d.ts per entry and format"
)]
pub struct CliArgs {
    /// Entry files. Globs are expanded against the project root.
    pub entries: Vec<String>,

    /// Path to the build config file (default: dtspack.json in the project
    /// root, when present).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Project root directory.
    #[arg(short = 'p', long = "project", default_value = ".")]
    pub project: PathBuf,

    /// Output formats.
    #[arg(short = 'f', long = "format", value_enum, value_delimiter = ',', ignore_case = true)]
    pub format: Vec<OutputFormat>,

    /// Output directory for the bundled declarations.
    #[arg(short = 'd', long = "out-dir", alias = "outDir")]
    pub out_dir: Option<PathBuf>,

    /// Path to tsconfig.json (default: tsconfig.json in the project root,
    /// when present).
    #[arg(long)]
    pub tsconfig: Option<PathBuf>,

    /// Treat Error-severity declaration diagnostics as build failures.
    #[arg(long = "strict-dts", alias = "strictDts")]
    pub strict_dts: bool,

    /// Suffix strategy for colliding entry names.
    #[arg(long = "collision-suffix", value_enum, ignore_case = true)]
    pub collision_suffix: Option<CollisionStrategy>,

    /// Disable colored diagnostic output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}
