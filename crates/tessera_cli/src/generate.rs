//! `tessera generate`: configuration to Verilog.
//!
//! 1. Assemble the configuration from `--config` and the flags
//! 2. Run the generation pipeline
//! 3. Write the Verilog, then the optional JSON call log, tiling exports
//!    and test vectors
//! 4. Render diagnostics and the resource report

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tessera_diagnostics::DiagnosticSink;
use tessera_multiplier::{generate_from_config, MultiplierDesign};

use crate::pipeline::{build_config, fatal, render_diagnostics};
use crate::{GenerateArgs, GlobalArgs, ReportFormat};

/// Runs `tessera generate`. Returns 0 on success, 1 if generation failed.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = build_config(&args.operator, global)?;
    let sink = DiagnosticSink::new();

    let design = match generate_from_config(&config, &sink) {
        Ok(design) => design,
        Err(e) => {
            sink.emit(fatal(e));
            render_diagnostics(&sink.take_all(), global);
            return Ok(1);
        }
    };
    render_diagnostics(&sink.take_all(), global);

    let verilog = design.to_verilog()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &verilog)?;
            if !global.quiet {
                eprintln!("     Wrote {path}");
            }
        }
        None => print!("{verilog}"),
    }

    if let Some(path) = &args.emit_json {
        let recording = design.record()?;
        fs::write(path, serde_json::to_string_pretty(&recording)?)?;
        if !global.quiet {
            eprintln!("     Wrote {path}");
        }
    }

    if let Some(dir) = &args.export_tiling {
        fs::create_dir_all(dir)?;
        let files = tessera_tiling::export::write_exports(
            Path::new(dir),
            "multiplier_tiling",
            design.solution(),
            design.collection(),
            design.grid(),
        )?;
        if !global.quiet {
            for file in files {
                eprintln!("     Wrote {}", file.display());
            }
        }
    }

    if let Some(n) = args.test_vectors {
        fs::write(&args.vectors_file, vector_file(&design, n, args.seed)?)?;
        if !global.quiet {
            eprintln!("     Wrote {n} test vector(s) to {}", args.vectors_file);
        }
    }

    if !global.quiet {
        let report = design.report();
        match global.format {
            ReportFormat::Text => eprintln!("{report}"),
            ReportFormat::Json => eprintln!("{}", serde_json::to_string(&report)?),
        }
    }
    Ok(0)
}

/// Test vectors, one `X Y R` (or `X Y R0 R1`) line each, after a header
/// naming the operator.
fn vector_file(
    design: &MultiplierDesign,
    n: usize,
    seed: u64,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut out = String::new();
    writeln!(out, "# {} seed {seed}", design.operator_name())?;
    for v in design.generate_test_vectors(n, seed)? {
        writeln!(out, "{v}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_config::{resolve_params, GeneratorConfig};
    use tessera_multiplier::generate;

    #[test]
    fn vector_file_has_a_header_and_n_lines() {
        let params = resolve_params(&GeneratorConfig::for_widths(4, 4, 0, false)).unwrap();
        let d = generate(&params, &DiagnosticSink::new()).unwrap();
        let text = vector_file(&d, 10, 3).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "# IntMultiplier_4x4_8_u seed 3");
        assert_eq!(lines[1], "0 0 0");
        assert_eq!(lines[2], "15 15 225");
    }
}
