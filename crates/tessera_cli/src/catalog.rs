//! `tessera catalog`: the tiles a configuration may place.

use tessera_arch::load_target_for;
use tessera_config::resolve_params;
use tessera_diagnostics::DiagnosticSink;
use tessera_tiling::{Signedness, TileCollection, TilingProblem};

use crate::pipeline::{build_config, render_diagnostics};
use crate::{GlobalArgs, OperatorArgs, ReportFormat};

/// Lists the tile collection for the configured widths and target.
pub fn run(args: &OperatorArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let params = resolve_params(&build_config(args, global)?)?;
    let target = load_target_for(&params)?;
    let sink = DiagnosticSink::new();
    let problem = TilingProblem::new(&params, target.as_ref(), &sink)?;
    render_diagnostics(&sink.take_all(), global);

    match global.format {
        ReportFormat::Text => print!("{}", table(&problem.collection)),
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(problem.collection.params())?)
        }
    }
    if !global.quiet {
        let families: Vec<String> = problem
            .collection
            .family_counts()
            .into_iter()
            .filter(|&(_, n)| n > 0)
            .map(|(shape, n)| format!("{n} {}", shape.name()))
            .collect();
        eprintln!(
            "   {} tile(s) for {} on {}/{}: {}",
            problem.collection.len(),
            params.operator_name(),
            target.family_name(),
            target.device_name(),
            families.join(", ")
        );
    }
    Ok(0)
}

fn table(collection: &TileCollection) -> String {
    let mut out = format!(
        "{:<24} {:<12} {:>7} {:>5} {:>4} {:>6}  {}\n",
        "name", "family", "size", "cells", "dsp", "luts", "ports"
    );
    for p in collection.params() {
        let ports = match p.signedness {
            Signedness::Any => "any".to_string(),
            Signedness::Fixed { x, y } => {
                let s = |b: bool| if b { 's' } else { 'u' };
                format!("{}{}", s(x), s(y))
            }
        };
        out.push_str(&format!(
            "{:<24} {:<12} {:>7} {:>5} {:>4} {:>6.1}  {}\n",
            p.name,
            p.shape.name(),
            format!("{}x{}", p.width, p.height),
            p.cells().count(),
            p.dsp_units,
            p.extra_luts,
            ports
        ));
    }
    out
}
