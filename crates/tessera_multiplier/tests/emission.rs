//! Structural checks on the emitted netlists.

use std::collections::HashSet;
use tessera_config::{resolve_params, GeneratorConfig};
use tessera_diagnostics::DiagnosticSink;
use tessera_emit::EmitterCall;
use tessera_multiplier::{generate, MultiplierDesign};

fn design(wx: u32, wy: u32, w_out: u32, signed: bool, frequency: Option<&str>) -> MultiplierDesign {
    let mut config = GeneratorConfig::for_widths(wx, wy, w_out, signed);
    config.target.frequency = frequency.map(str::to_string);
    generate(&resolve_params(&config).unwrap(), &DiagnosticSink::new()).unwrap()
}

#[test]
fn every_module_is_closed_and_named_once() {
    for d in [
        design(8, 8, 0, false, None),
        design(6, 5, 0, true, None),
        design(12, 12, 10, false, Some("300MHz")),
    ] {
        let text = d.to_verilog().unwrap();
        let modules: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("module "))
            .map(|l| l.split([' ', '(']).next().unwrap_or_default())
            .collect();
        let unique: HashSet<_> = modules.iter().collect();
        assert_eq!(unique.len(), modules.len(), "duplicate module in {}", d.operator_name());
        assert_eq!(modules.len(), text.matches("endmodule").count());
        assert!(modules.last().unwrap().starts_with(&d.operator_name()));
    }
}

#[test]
fn every_signal_is_declared_once() {
    let rec = design(10, 7, 0, true, Some("400MHz")).record().unwrap();
    let mut seen = HashSet::new();
    for call in rec.calls() {
        if let EmitterCall::Declare { name, .. } = call {
            assert!(seen.insert(name.clone()), "{name} declared twice");
        }
    }
    assert!(seen.contains("sum"));
}

#[test]
fn emission_is_deterministic() {
    let a = design(9, 9, 9, false, None).to_verilog().unwrap();
    let b = design(9, 9, 9, false, None).to_verilog().unwrap();
    assert_eq!(a, b);
}

#[test]
fn recording_serializes_to_json() {
    let rec = design(4, 4, 0, false, None).record().unwrap();
    let json = serde_json::to_value(&rec).unwrap();
    let calls = json["calls"].as_array().unwrap();
    assert_eq!(calls[0]["call"], "begin_entity");
    assert_eq!(calls.last().unwrap()["call"], "end_entity");
}
