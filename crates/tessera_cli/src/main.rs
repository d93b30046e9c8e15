//! Tessera CLI: generates tiled FPGA integer multipliers.
//!
//! `tessera generate` builds a multiplier from flags or a `tessera.toml`
//! and writes structural Verilog, `tessera truncation` prints the error
//! budget of a truncated product, and `tessera catalog` lists the tiles
//! available for a configuration.

#![warn(missing_docs)]

mod catalog;
mod generate;
mod pipeline;
mod truncation;

use std::io::IsTerminal;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tessera_config::{CompressionMode, FinalAdderKind, IlpSolverKind, TilingMethod};

/// Tessera: tiled multipliers and bit-heap compression for FPGAs.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera multiplier generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show notes as well as warnings.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Output format for diagnostics.
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Path to a `tessera.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a multiplier.
    Generate(GenerateArgs),
    /// Print the truncation parameters for a product width.
    Truncation {
        /// Full product width, `wX + wY`.
        w_full: u32,
        /// Output width (0 for full precision).
        w_out: u32,
    },
    /// List the tiles available for a configuration.
    Catalog(OperatorArgs),
}

/// Operator and generator settings. Each flag overrides the configuration
/// file.
#[derive(Args, Debug, Default)]
pub struct OperatorArgs {
    /// Width of the X operand.
    #[arg(long)]
    pub wx: Option<u32>,

    /// Width of the Y operand.
    #[arg(long)]
    pub wy: Option<u32>,

    /// Output width; 0 keeps the full product.
    #[arg(long)]
    pub w_out: Option<u32>,

    /// Treat the operands as two's complement.
    #[arg(long)]
    pub signed: bool,

    /// FPGA family (`artix7`, `cyclone_v`, `cyclone_iv`).
    #[arg(long)]
    pub family: Option<String>,

    /// Device part number.
    #[arg(long)]
    pub device: Option<String>,

    /// Target clock frequency, e.g. `250MHz`; enables pipelining.
    #[arg(long)]
    pub frequency: Option<String>,

    /// Tiling method.
    #[arg(long)]
    pub method: Option<TilingMethod>,

    /// Maximum number of DSP blocks.
    #[arg(long)]
    pub max_dsp: Option<u32>,

    /// Beam width for `beam-search`.
    #[arg(long)]
    pub beam_width: Option<usize>,

    /// Use LUT tiles only.
    #[arg(long)]
    pub no_dsp: bool,

    /// Cover every partial product even when truncating.
    #[arg(long)]
    pub no_opti_trunc: bool,

    /// Drop low heap columns within the truncation budget.
    #[arg(long)]
    pub prune_lsb: bool,

    /// Disable the ILP solver.
    #[arg(long)]
    pub no_ilp: bool,

    /// ILP time limit in milliseconds.
    #[arg(long)]
    pub ilp_timeout_ms: Option<u64>,

    /// ILP solver (`microlp` or `branch-and-bound`).
    #[arg(long)]
    pub ilp_solver: Option<IlpSolverKind>,

    /// Compression strategy (`heuristic` or `ilp`).
    #[arg(long)]
    pub compression: Option<CompressionMode>,

    /// Final adder (`binary` or `ternary`).
    #[arg(long)]
    pub final_adder: Option<FinalAdderKind>,
}

/// Arguments for `tessera generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Operator settings.
    #[command(flatten)]
    pub operator: OperatorArgs,

    /// Verilog output file; stdout if omitted.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write the emitter call sequence as JSON.
    #[arg(long)]
    pub emit_json: Option<String>,

    /// Write `multiplier_tiling.svg` and `.tex` into this directory.
    #[arg(long)]
    pub export_tiling: Option<String>,

    /// Number of test vectors to write.
    #[arg(long)]
    pub test_vectors: Option<usize>,

    /// Seed for the random test vectors.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Test vector file.
    #[arg(long, default_value = "test_vectors.txt")]
    pub vectors_file: String,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to show notes.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Diagnostic and report format.
    pub format: ReportFormat,
    /// Optional path to a configuration file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        format: cli.format,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Generate(ref args) => generate::run(args, &global),
        Command::Truncation { w_full, w_out } => truncation::run(w_full, w_out, &global),
        Command::Catalog(ref args) => catalog::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            pipeline::render_diagnostics(&[pipeline::fatal(e)], &global);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generate_from_flags() {
        let cli = Cli::parse_from([
            "tessera", "generate", "--wx", "16", "--wy", "12", "--w-out", "14", "--signed",
            "--method", "optimal-ilp", "--final-adder", "ternary", "-o", "mult.v",
        ]);
        match cli.command {
            Command::Generate(ref args) => {
                assert_eq!(args.operator.wx, Some(16));
                assert_eq!(args.operator.wy, Some(12));
                assert_eq!(args.operator.w_out, Some(14));
                assert!(args.operator.signed);
                assert_eq!(args.operator.method, Some(TilingMethod::OptimalIlp));
                assert_eq!(args.operator.final_adder, Some(FinalAdderKind::Ternary));
                assert_eq!(args.output.as_deref(), Some("mult.v"));
                assert!(args.test_vectors.is_none());
                assert_eq!(args.seed, 1);
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn parse_generate_outputs() {
        let cli = Cli::parse_from([
            "tessera", "generate", "--emit-json", "calls.json", "--export-tiling", "out",
            "--test-vectors", "100", "--seed", "9", "--vectors-file", "v.txt",
        ]);
        match cli.command {
            Command::Generate(ref args) => {
                assert_eq!(args.emit_json.as_deref(), Some("calls.json"));
                assert_eq!(args.export_tiling.as_deref(), Some("out"));
                assert_eq!(args.test_vectors, Some(100));
                assert_eq!(args.seed, 9);
                assert_eq!(args.vectors_file, "v.txt");
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn parse_truncation() {
        let cli = Cli::parse_from(["tessera", "truncation", "16", "8"]);
        match cli.command {
            Command::Truncation { w_full, w_out } => assert_eq!((w_full, w_out), (16, 8)),
            _ => panic!("expected Truncation command"),
        }
    }

    #[test]
    fn parse_catalog() {
        let cli = Cli::parse_from(["tessera", "catalog", "--wx", "24", "--wy", "24", "--no-dsp"]);
        match cli.command {
            Command::Catalog(ref args) => {
                assert_eq!(args.wx, Some(24));
                assert!(args.no_dsp);
            }
            _ => panic!("expected Catalog command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "tessera", "--quiet", "--color", "never", "--format", "json", "--config",
            "tessera.toml", "catalog",
        ]);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.format, ReportFormat::Json);
        assert_eq!(cli.config.as_deref(), Some("tessera.toml"));
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Cli::try_parse_from(["tessera", "generate", "--method", "annealing"]).is_err());
    }
}
