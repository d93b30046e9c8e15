//! Every tiling method on a range of grids: exact coverage, budget
//! soundness and the ILP never losing to the heuristics.

use tessera_arch::{load_target_for, Target};
use tessera_bitheap::check_truncation_error;
use tessera_config::{resolve_params, GeneratorConfig, MultiplierParams, TilingMethod};
use tessera_diagnostics::{DiagnosticCode, DiagnosticSink};
use tessera_tiling::{create_strategy, Solution, TilingProblem};

fn setup(
    wx: u32,
    wy: u32,
    w_out: u32,
    signed: bool,
    method: TilingMethod,
    edit: impl FnOnce(&mut GeneratorConfig),
) -> (MultiplierParams, Box<dyn Target>) {
    let mut config = GeneratorConfig::for_widths(wx, wy, w_out, signed);
    config.tiling.method = method;
    config.ilp.timeout_ms = 300;
    edit(&mut config);
    let params = resolve_params(&config).unwrap();
    let target = load_target_for(&params).unwrap();
    (params, target)
}

fn solve(problem: &TilingProblem<'_>) -> (Solution, f64) {
    let mut strategy = create_strategy(problem).unwrap();
    strategy.solve().unwrap();
    (strategy.solution().unwrap().clone(), strategy.cost().unwrap())
}

fn omitted_within_budget(problem: &TilingProblem<'_>, solution: &Solution) -> u128 {
    let coverage = solution.coverage(&problem.collection, &problem.grid).unwrap();
    let grid = &problem.grid;
    check_truncation_error(
        grid.wx(),
        grid.wy(),
        grid.w_out(),
        grid.truncation(),
        |x, y| coverage[grid.index(x, y)] > 0,
        0,
    )
    .unwrap()
}

#[test]
fn constructive_methods_cover_exactly() {
    let methods = [
        TilingMethod::BasicRaster,
        TilingMethod::Greedy,
        TilingMethod::XGreedy,
        TilingMethod::BeamSearch,
    ];
    let shapes = [
        (4, 4, 0, false),
        (8, 8, 0, false),
        (8, 8, 8, false),
        (13, 7, 0, true),
        (16, 16, 16, true),
        (30, 20, 0, false),
        (32, 32, 32, false),
    ];
    for method in methods {
        for &(wx, wy, w_out, signed) in &shapes {
            let (params, target) = setup(wx, wy, w_out, signed, method, |c| {
                c.tiling.two_xk = true;
                c.tiling.irregular = true;
            });
            let sink = DiagnosticSink::new();
            let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
            let (solution, cost) = solve(&problem);
            solution
                .check_coverage(&problem.collection, &problem.grid)
                .unwrap_or_else(|e| panic!("{method} {wx}x{wy}->{w_out}: {e}"));
            assert!(cost > 0.0);
            omitted_within_budget(&problem, &solution);
        }
    }
}

#[test]
fn composite_dsp_tiles_are_placed_legally() {
    let (params, target) = setup(48, 48, 0, false, TilingMethod::Greedy, |c| {
        c.tiling.super_tiles = true;
        c.tiling.karatsuba = true;
        c.tiling.dsp_occupation_threshold = 0.5;
    });
    let sink = DiagnosticSink::new();
    let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
    let (solution, _) = solve(&problem);
    solution
        .check_coverage(&problem.collection, &problem.grid)
        .unwrap();
    assert!(solution.dsp_count(&problem.collection) >= 2);
    for (p, proj) in solution
        .placements()
        .iter()
        .zip(solution.projections(&problem.collection, &problem.grid).unwrap())
    {
        let tile = problem.collection.get(p.param).unwrap();
        if tile.dsp_units > 0 {
            assert!(proj.occupation(tile) >= 0.5, "{}", tile.name);
        }
    }
    assert!(!sink.has_code(DiagnosticCode::DSP_UNDERUTILIZED));
}

#[test]
fn optimal_ilp_never_loses_to_heuristics() {
    let cases = [(3, 3, 0, false), (5, 4, 0, false), (6, 6, 6, false), (8, 8, 0, true)];
    for &(wx, wy, w_out, dsp) in &cases {
        let mut best_heuristic = f64::INFINITY;
        for method in [
            TilingMethod::BasicRaster,
            TilingMethod::Greedy,
            TilingMethod::XGreedy,
            TilingMethod::BeamSearch,
        ] {
            let (params, target) = setup(wx, wy, w_out, false, method, |c| c.tiling.use_dsp = dsp);
            let sink = DiagnosticSink::new();
            let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
            best_heuristic = best_heuristic.min(solve(&problem).1);
        }
        let (params, target) = setup(wx, wy, w_out, false, TilingMethod::OptimalIlp, |c| {
            c.tiling.use_dsp = dsp;
        });
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let (solution, cost) = solve(&problem);
        solution
            .check_coverage(&problem.collection, &problem.grid)
            .unwrap();
        assert!(
            cost <= best_heuristic + 1e-9,
            "{wx}x{wy}->{w_out}: ilp {cost} > heuristic {best_heuristic}"
        );
    }
}

#[test]
fn opti_trunc_off_covers_every_cell() {
    for method in [TilingMethod::Greedy, TilingMethod::OptimalIlp] {
        let (params, target) = setup(8, 8, 8, false, method, |c| {
            c.tiling.opti_trunc = false;
            c.tiling.use_dsp = false;
        });
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let (solution, _) = solve(&problem);
        assert_eq!(omitted_within_budget(&problem, &solution), 0);
    }
}

#[test]
fn joint_ilp_on_a_small_grid() {
    let (params, target) = setup(3, 3, 0, false, TilingMethod::JointIlp, |c| {
        c.tiling.use_dsp = false;
        c.ilp.timeout_ms = 1_000;
    });
    let sink = DiagnosticSink::new();
    let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
    let mut strategy = create_strategy(&problem).unwrap();
    strategy.solve().unwrap();
    let plans = strategy.compression_plans().unwrap();
    assert!(plans.len() <= 4);
    strategy
        .solution()
        .unwrap()
        .check_coverage(&problem.collection, &problem.grid)
        .unwrap();
}
