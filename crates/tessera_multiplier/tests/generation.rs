//! End-to-end generation: every tiling method, compression mode and
//! truncation setting must yield a structure whose bit-accurate evaluation
//! agrees with the reference product.

use tessera_bitheap::compute_truncation_params;
use tessera_config::{
    resolve_params, CompressionMode, FinalAdderKind, GeneratorConfig, MultiplierParams,
    TilingMethod,
};
use tessera_diagnostics::{DiagnosticCode, DiagnosticSink};
use tessera_multiplier::{generate, MultiplierDesign};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn params(
    wx: u32,
    wy: u32,
    w_out: u32,
    signed: bool,
    edit: impl FnOnce(&mut GeneratorConfig),
) -> MultiplierParams {
    let mut config = GeneratorConfig::for_widths(wx, wy, w_out, signed);
    config.ilp.timeout_ms = 2_000;
    edit(&mut config);
    resolve_params(&config).unwrap()
}

fn build(params: &MultiplierParams) -> MultiplierDesign {
    generate(params, &DiagnosticSink::new()).unwrap()
}

/// Checks every operand pair against the reference result.
fn check_exhaustive(d: &MultiplierDesign) {
    let p = d.params();
    for x in 0..(1u64 << p.wx) {
        for y in 0..(1u64 << p.wy) {
            let r = d.evaluate(x, y).unwrap();
            let expected = d.emulate(x, y).unwrap();
            assert!(
                expected.accepts(r),
                "{}: {x} * {y} gave {r}, expected {expected}",
                d.operator_name()
            );
        }
    }
}

/// Checks every operand pair against the exact quotient `X*Y / 2^w`: the
/// result may differ from it by less than one unit in the last place.
fn check_within_one_ulp(d: &MultiplierDesign) {
    let p = d.params();
    let w = d.grid().truncation().truncated_bits;
    let decode = |v: u64, width: u32| -> i128 {
        let v = i128::from(v);
        if p.signed && (v >> (width - 1)) & 1 == 1 {
            v - (1i128 << width)
        } else {
            v
        }
    };
    for x in 0..(1u64 << p.wx) {
        for y in 0..(1u64 << p.wy) {
            let product = decode(x, p.wx) * decode(y, p.wy);
            let r = decode(d.evaluate(x, y).unwrap() as u64, p.w_out);
            assert!(
                (r * (1i128 << w) - product).abs() < 1i128 << w,
                "{}: {x} * {y} gave {r}",
                d.operator_name()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Full precision
// ---------------------------------------------------------------------------

#[test]
fn full_8x8_unsigned_is_exact() {
    let d = build(&params(8, 8, 0, false, |_| {}));
    for x in 0..256u64 {
        for y in 0..256u64 {
            assert_eq!(d.evaluate(x, y).unwrap(), u128::from(x * y), "{x} * {y}");
        }
    }
}

#[test]
fn full_4x4_uses_luts_and_covers_everything() {
    let d = build(&params(4, 4, 0, false, |c| c.tiling.use_dsp = false));
    let coverage = d.solution().coverage(d.collection(), d.grid()).unwrap();
    assert!(coverage.iter().all(|&c| c == 1));
    assert_eq!(d.solution().dsp_count(d.collection()), 0);
    assert_eq!(d.omitted_weight(), 0);
    check_exhaustive(&d);
}

#[test]
fn full_signed_multipliers_are_exact() {
    for (wx, wy) in [(4, 4), (5, 3), (6, 6)] {
        check_exhaustive(&build(&params(wx, wy, 0, true, |_| {})));
    }
}

#[test]
fn rectangular_operands() {
    check_exhaustive(&build(&params(7, 3, 0, false, |_| {})));
    check_exhaustive(&build(&params(2, 9, 0, false, |_| {})));
}

#[test]
fn one_bit_operands() {
    check_exhaustive(&build(&params(1, 1, 0, false, |_| {})));
    check_exhaustive(&build(&params(1, 5, 0, false, |_| {})));
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

#[test]
fn truncated_8x8_is_faithful() {
    let d = build(&params(8, 8, 8, false, |_| {}));
    assert_eq!(d.grid().truncation().truncated_bits, 8);
    for x in 0..256i64 {
        for y in 0..256i64 {
            let r = d.evaluate(x as u64, y as u64).unwrap() as i64;
            assert!((r * 256 - x * y).abs() < 256, "{x} * {y} gave {r}");
        }
    }
}

#[test]
fn truncated_signed_is_faithful() {
    check_exhaustive(&build(&params(6, 6, 6, true, |_| {})));
    check_exhaustive(&build(&params(7, 5, 4, true, |_| {})));
}

#[test]
fn narrow_outputs_stay_within_one_ulp() {
    for w_out in 1..=4 {
        check_within_one_ulp(&build(&params(8, 8, w_out, false, |_| {})));
        check_within_one_ulp(&build(&params(6, 6, w_out, true, |_| {})));
    }
}

#[test]
fn largest_products_saturate() {
    for w_out in 1..=3 {
        let d = build(&params(8, 8, w_out, false, |_| {}));
        assert_eq!(d.evaluate(255, 255).unwrap(), (1 << w_out) - 1, "w_out = {w_out}");
    }
}

#[test]
fn truncation_params_for_full_width_are_all_zero() {
    for w in [1, 8, 33] {
        let t = compute_truncation_params(w, w);
        assert!(t.is_exact());
        assert_eq!(t, compute_truncation_params(w, 0));
    }
}

#[test]
fn lsb_pruning_keeps_faithful_rounding() {
    let sink = DiagnosticSink::new();
    let p = params(8, 8, 6, false, |c| {
        c.tiling.opti_trunc = false;
        c.tiling.prune_bitheap_lsb = true;
    });
    let d = generate(&p, &sink).unwrap();
    assert!(d.heap().lsb() > 0);
    assert!(d.omitted_weight() <= d.grid().truncation().budget());
    assert!(sink.has_code(DiagnosticCode::LSB_PRUNED));
    check_exhaustive(&d);
}

// ---------------------------------------------------------------------------
// Tiling methods
// ---------------------------------------------------------------------------

#[test]
fn heuristic_methods_are_correct() {
    for method in [
        TilingMethod::BasicRaster,
        TilingMethod::Greedy,
        TilingMethod::XGreedy,
        TilingMethod::BeamSearch,
    ] {
        for (w_out, signed) in [(0, false), (6, false), (0, true)] {
            let d = build(&params(6, 6, w_out, signed, |c| c.tiling.method = method));
            assert_eq!(d.tiling_method(), method.name());
            check_exhaustive(&d);
        }
    }
}

#[test]
fn optimal_ilp_is_correct_and_no_worse_than_greedy() {
    let greedy = build(&params(4, 4, 0, false, |c| c.tiling.use_dsp = false));
    let ilp = build(&params(4, 4, 0, false, |c| {
        c.tiling.use_dsp = false;
        c.tiling.method = TilingMethod::OptimalIlp;
    }));
    assert!(ilp.tiling_cost() <= greedy.tiling_cost() + 1e-9);
    check_exhaustive(&ilp);
}

#[test]
fn joint_ilp_is_correct() {
    let d = build(&params(3, 3, 0, false, |c| {
        c.tiling.use_dsp = false;
        c.tiling.method = TilingMethod::JointIlp;
    }));
    assert_eq!(d.tiling_method(), "joint-ilp");
    check_exhaustive(&d);
}

#[test]
fn dsp_tiles_on_wide_operands() {
    let d = build(&params(20, 20, 0, false, |c| c.tiling.use_dsp = true));
    assert!(d.solution().dsp_count(d.collection()) > 0);
    for v in d.generate_test_vectors(300, 11).unwrap() {
        assert!(v.expected.accepts(d.evaluate(v.x, v.y).unwrap()), "{v}");
    }
}

#[test]
fn wide_signed_truncated_vectors() {
    let d = build(&params(24, 17, 20, true, |_| {}));
    for v in d.generate_test_vectors(300, 3).unwrap() {
        assert!(v.expected.accepts(d.evaluate(v.x, v.y).unwrap()), "{v}");
    }
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

#[test]
fn ilp_compression_is_correct() {
    let d = build(&params(4, 4, 0, false, |c| {
        c.compression.strategy = CompressionMode::Ilp;
    }));
    assert!(d.compression().strategy.contains("ilp"));
    check_exhaustive(&d);
}

#[test]
fn ternary_final_adder_is_correct() {
    let d = build(&params(6, 6, 0, false, |c| {
        c.compression.final_adder = FinalAdderKind::Ternary;
    }));
    assert!(d.heap().final_adder().unwrap().arity <= 3);
    check_exhaustive(&d);
}

#[test]
fn pipelined_designs_compute_the_same_results() {
    let comb = build(&params(16, 16, 0, false, |_| {}));
    let piped = build(&params(16, 16, 0, false, |c| {
        c.target.frequency = Some("500MHz".into());
    }));
    assert!(piped.latency() >= comb.latency());
    for v in piped.generate_test_vectors(200, 5).unwrap() {
        assert_eq!(
            piped.evaluate(v.x, v.y).unwrap(),
            comb.evaluate(v.x, v.y).unwrap()
        );
    }
}

#[test]
fn other_families_are_supported() {
    for family in ["cyclone_v", "cyclone_iv"] {
        let d = build(&params(5, 5, 0, true, |c| c.target.family = family.into()));
        assert!(d.target().starts_with(family));
        check_exhaustive(&d);
    }
}
