//! Shared plumbing: assembling a configuration from a file and flags, and
//! rendering diagnostics.

use std::path::Path;

use tessera_config::{load_config, GeneratorConfig};
use tessera_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticRenderer, JsonRenderer, Severity, TerminalRenderer,
};

use crate::{GlobalArgs, OperatorArgs, ReportFormat};

/// Builds the generator configuration: the `--config` file if given, else
/// the operand widths from the flags, with every explicit flag applied on
/// top.
pub fn build_config(
    op: &OperatorArgs,
    global: &GlobalArgs,
) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = match &global.config {
        Some(path) => load_config(Path::new(path))?,
        None => {
            let (Some(wx), Some(wy)) = (op.wx, op.wy) else {
                return Err("operand widths are required: pass --wx and --wy, or --config".into());
            };
            GeneratorConfig::for_widths(wx, wy, 0, false)
        }
    };
    apply_overrides(&mut config, op);
    Ok(config)
}

/// Applies the flags that were given explicitly.
pub fn apply_overrides(config: &mut GeneratorConfig, op: &OperatorArgs) {
    let m = &mut config.multiplier;
    if let Some(wx) = op.wx {
        m.wx = wx;
    }
    if let Some(wy) = op.wy {
        m.wy = wy;
    }
    if let Some(w_out) = op.w_out {
        m.w_out = w_out;
    }
    if op.signed {
        m.signed = true;
    }

    let t = &mut config.target;
    if let Some(family) = &op.family {
        t.family = family.clone();
    }
    if let Some(device) = &op.device {
        t.device = device.clone();
    }
    if let Some(frequency) = &op.frequency {
        t.frequency = Some(frequency.clone());
    }

    let tiling = &mut config.tiling;
    if let Some(method) = op.method {
        tiling.method = method;
    }
    if let Some(max_dsp) = op.max_dsp {
        tiling.max_dsp = Some(max_dsp);
    }
    if let Some(width) = op.beam_width {
        tiling.beam_width = width;
    }
    if op.no_dsp {
        tiling.use_dsp = false;
    }
    if op.no_opti_trunc {
        tiling.opti_trunc = false;
    }
    if op.prune_lsb {
        tiling.prune_bitheap_lsb = true;
    }

    if op.no_ilp {
        config.ilp.enabled = false;
    }
    if let Some(ms) = op.ilp_timeout_ms {
        config.ilp.timeout_ms = ms;
    }
    if let Some(solver) = op.ilp_solver {
        config.ilp.solver = solver;
    }
    if let Some(mode) = op.compression {
        config.compression.strategy = mode;
    }
    if let Some(adder) = op.final_adder {
        config.compression.final_adder = adder;
    }
}

/// Lowest severity shown: errors when quiet, everything when verbose.
fn threshold(global: &GlobalArgs) -> Severity {
    if global.quiet {
        Severity::Error
    } else if global.verbose {
        Severity::Help
    } else {
        Severity::Warning
    }
}

/// Renders diagnostics to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let min = threshold(global);
    let renderer: Box<dyn DiagnosticRenderer> = match global.format {
        ReportFormat::Text => Box::new(TerminalRenderer::new(global.color)),
        ReportFormat::Json => Box::new(JsonRenderer),
    };
    for diag in diagnostics.iter().filter(|d| d.severity >= min) {
        let text = renderer.render(diag);
        eprintln!("{}", text.trim_end());
    }
}

/// A fatal error as a diagnostic.
pub fn fatal(message: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(DiagnosticCode::FATAL, message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;
    use tessera_config::{CompressionMode, IlpSolverKind, TilingMethod};

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            format: ReportFormat::Text,
            config,
        }
    }

    fn op_args(args: &[&str]) -> OperatorArgs {
        let mut argv = vec!["tessera", "generate"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            crate::Command::Generate(g) => g.operator,
            _ => unreachable!(),
        }
    }

    #[test]
    fn widths_are_required_without_a_file() {
        let err = build_config(&op_args(&[]), &global(None)).unwrap_err();
        assert!(err.to_string().contains("--wx"));
    }

    #[test]
    fn flags_build_a_config() {
        let op = op_args(&[
            "--wx", "12", "--wy", "9", "--w-out", "10", "--signed", "--method", "beam-search",
            "--no-dsp", "--compression", "ilp", "--ilp-solver", "branch-and-bound",
        ]);
        let c = build_config(&op, &global(None)).unwrap();
        assert_eq!((c.multiplier.wx, c.multiplier.wy, c.multiplier.w_out), (12, 9, 10));
        assert!(c.multiplier.signed);
        assert_eq!(c.tiling.method, TilingMethod::BeamSearch);
        assert!(!c.tiling.use_dsp);
        assert_eq!(c.compression.strategy, CompressionMode::Ilp);
        assert_eq!(c.ilp.solver, IlpSolverKind::BranchAndBound);
    }

    #[test]
    fn flags_override_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tessera.toml");
        fs::write(
            &path,
            "[multiplier]\nwx = 16\nwy = 16\nw_out = 16\n\n[tiling]\nmethod = \"greedy\"\n",
        )
        .unwrap();
        let op = op_args(&["--w-out", "20", "--method", "xgreedy"]);
        let c = build_config(&op, &global(Some(path.display().to_string()))).unwrap();
        assert_eq!(c.multiplier.wx, 16);
        assert_eq!(c.multiplier.w_out, 20);
        assert_eq!(c.tiling.method, TilingMethod::XGreedy);
    }

    #[test]
    fn quiet_shows_only_errors() {
        let mut g = global(None);
        assert_eq!(threshold(&g), Severity::Warning);
        g.quiet = true;
        assert_eq!(threshold(&g), Severity::Error);
        g.quiet = false;
        g.verbose = true;
        assert_eq!(threshold(&g), Severity::Help);
    }

    #[test]
    fn fatal_uses_the_fatal_code() {
        let d = fatal("boom");
        assert_eq!(d.code, DiagnosticCode::FATAL);
        assert!(d.severity.is_error());
    }
}
