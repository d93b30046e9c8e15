//! Tiling strategies.
//!
//! Every strategy works on a borrowed [`TilingProblem`] and moves through
//! [`SolveState`] once: constructed, solving, then solved or infeasible.
//! Constructive strategies scan the grid for the next uncovered required
//! cell and place the cheapest legal tile there; the ILP strategies model
//! the whole covering (and optionally the compression) as one program.

mod beam;
mod cover;
mod greedy;
mod joint_ilp;
mod optimal_ilp;

pub use beam::BeamSearchTiling;
pub use cover::DSP_PREFERENCE;
pub use greedy::ScanTiling;
pub use joint_ilp::JointIlpTiling;
pub use optimal_ilp::OptimalIlpTiling;

use crate::problem::{TilingProblem, DSP_UNDERUSE_WARNING};
use crate::solution::Solution;
use cover::Cover;
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_bitheap::StagePlan;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::TilingMethod;
use tessera_diagnostics::{Diagnostic, DiagnosticCode};
use tessera_ilp::IlpBackend;

/// Lifecycle of a strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveState {
    /// Not run yet.
    #[default]
    Constructed,
    /// [`TilingStrategy::solve`] is running.
    Solving,
    /// A solution is available.
    Solved,
    /// The strategy gave up.
    Infeasible,
}

/// A tiling algorithm.
pub trait TilingStrategy: fmt::Debug {
    /// Method name used in reports.
    fn name(&self) -> &str;

    /// Computes the tiling.
    ///
    /// # Errors
    ///
    /// Fails with [`TesseraError::TilingInfeasible`] when an ILP strategy
    /// runs out of relaxations, or with an internal error if the result
    /// does not cover the required region exactly once.
    fn solve(&mut self) -> TesseraResult<()>;

    /// Current lifecycle state.
    fn state(&self) -> SolveState;

    /// The solution, once solved.
    fn solution(&self) -> Option<&Solution>;

    /// Total LUT-equivalent cost of the solution, once solved.
    fn cost(&self) -> Option<f64>;

    /// Per-stage compression plans chosen together with the tiling.
    fn compression_plans(&self) -> Option<&[StagePlan]> {
        None
    }
}

/// Instantiates the strategy the target's run options select.
///
/// # Errors
///
/// The ILP methods need an enabled ILP back end; without one this is a
/// configuration error.
pub fn create_strategy<'p>(
    problem: &'p TilingProblem<'_>,
) -> TesseraResult<Box<dyn TilingStrategy + 'p>> {
    let method = problem.target.tiling_method();
    Ok(match method {
        TilingMethod::BasicRaster => Box::new(ScanTiling::raster(problem)),
        TilingMethod::Greedy => Box::new(ScanTiling::greedy(problem)),
        TilingMethod::XGreedy => Box::new(ScanTiling::xgreedy(problem)),
        TilingMethod::BeamSearch => Box::new(BeamSearchTiling::new(problem)),
        TilingMethod::OptimalIlp => {
            Box::new(OptimalIlpTiling::new(problem, ilp_solver(problem, method)?))
        }
        TilingMethod::JointIlp => {
            Box::new(JointIlpTiling::new(problem, ilp_solver(problem, method)?))
        }
    })
}

fn ilp_solver(
    problem: &TilingProblem<'_>,
    method: TilingMethod,
) -> TesseraResult<Box<dyn IlpBackend>> {
    problem
        .target
        .ilp_solver()
        .filter(|_| problem.ilp.enabled)
        .ok_or_else(|| {
            TesseraError::config(format!(
                "tiling method {} needs an ILP solver, but none is enabled",
                method.name()
            ))
        })
}

/// Runs every constructive strategy and returns the cheapest cover.
pub(crate) fn best_heuristic_cover(problem: &TilingProblem<'_>) -> TesseraResult<Cover> {
    let mut best = greedy::run(problem, cover::Scan::RASTER)?;
    for next in [
        greedy::run(problem, cover::Scan::GREEDY)?,
        greedy::run(problem, cover::Scan::XGREEDY)?,
        beam::run(problem)?,
    ] {
        if next.cost() < best.cost() {
            best = next;
        }
    }
    Ok(best)
}

/// Turns a finished cover into a checked solution and reports it.
pub(crate) fn finish(
    problem: &TilingProblem<'_>,
    method: &str,
    cover: &Cover,
) -> TesseraResult<(Solution, f64)> {
    let solution = cover.to_solution();
    solution.check_coverage(&problem.collection, &problem.grid)?;
    let cost = solution.cost(&problem.collection, &problem.grid, problem.target)?;

    for (placement, proj) in solution
        .placements()
        .iter()
        .zip(solution.projections(&problem.collection, &problem.grid)?)
    {
        let Some(param) = problem.collection.get(placement.param) else {
            continue;
        };
        if param.dsp_units == 0 {
            continue;
        }
        let occupation = proj.occupation(param);
        if occupation < DSP_UNDERUSE_WARNING {
            problem.emit(
                Diagnostic::warning(
                    DiagnosticCode::DSP_UNDERUTILIZED,
                    format!(
                        "{} at ({}, {}) uses {:.0}% of its multiplier",
                        param.name,
                        placement.anchor_x,
                        placement.anchor_y,
                        occupation * 100.0
                    ),
                )
                .with_help("raise tiling.dsp_occupation_threshold to reject such placements"),
            );
        }
    }

    let covered = covered_cells(&solution, problem)?;
    problem.emit(
        Diagnostic::note(
            DiagnosticCode::TILING_SUMMARY,
            format!(
                "{method} tiling: {} tiles, {} DSP blocks, cost {cost:.1}",
                solution.len(),
                solution.dsp_count(&problem.collection)
            ),
        )
        .with_note(format!(
            "{covered} of {} cells covered, {} required",
            problem.grid.cell_count(),
            problem.grid.required_count()
        )),
    );
    Ok((solution, cost))
}

fn covered_cells(solution: &Solution, problem: &TilingProblem<'_>) -> TesseraResult<usize> {
    Ok(solution
        .coverage(&problem.collection, &problem.grid)?
        .iter()
        .filter(|&&n| n > 0)
        .count())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tessera_arch::{load_target_for, Target};
    use tessera_config::{resolve_params, GeneratorConfig, MultiplierParams};
    use tessera_diagnostics::DiagnosticSink;

    pub(crate) fn problem_for(
        wx: u32,
        wy: u32,
        w_out: u32,
        signed: bool,
        dsp: bool,
    ) -> (MultiplierParams, Box<dyn Target>) {
        let mut config = GeneratorConfig::for_widths(wx, wy, w_out, signed);
        config.tiling.use_dsp = dsp;
        let params = resolve_params(&config).unwrap();
        let target = load_target_for(&params).unwrap();
        (params, target)
    }

    fn with_method(method: TilingMethod, ilp: bool) -> (MultiplierParams, Box<dyn Target>) {
        let mut config = GeneratorConfig::for_widths(4, 4, 0, false);
        config.tiling.method = method;
        config.tiling.use_dsp = false;
        config.ilp.enabled = ilp;
        config.ilp.timeout_ms = 500;
        let params = resolve_params(&config).unwrap();
        let target = load_target_for(&params).unwrap();
        (params, target)
    }

    #[test]
    fn factory_follows_the_method() {
        for method in TilingMethod::ALL {
            let (params, target) = with_method(method, true);
            let sink = DiagnosticSink::new();
            let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
            let strategy = create_strategy(&problem).unwrap();
            assert_eq!(strategy.name(), method.name());
            assert_eq!(strategy.state(), SolveState::Constructed);
            assert!(strategy.solution().is_none());
        }
    }

    #[test]
    fn ilp_methods_need_a_solver() {
        for method in [TilingMethod::OptimalIlp, TilingMethod::JointIlp] {
            let (params, target) = with_method(method, false);
            let sink = DiagnosticSink::new();
            let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
            let err = create_strategy(&problem).unwrap_err();
            assert!(matches!(err, TesseraError::Configuration { .. }));
        }
    }

    #[test]
    fn summary_note_is_emitted() {
        let (params, target) = with_method(TilingMethod::Greedy, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut strategy = create_strategy(&problem).unwrap();
        strategy.solve().unwrap();
        assert_eq!(strategy.state(), SolveState::Solved);
        let notes = sink.diagnostics();
        assert!(notes
            .iter()
            .any(|d| d.code == DiagnosticCode::TILING_SUMMARY && d.message.starts_with("greedy")));
    }

    #[test]
    fn underused_dsp_is_reported() {
        let (params, target) = problem_for(6, 6, 0, false, true);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut cover = Cover::new(&problem);
        let dsp = problem
            .collection
            .params()
            .iter()
            .position(|p| p.dsp_units == 1)
            .unwrap();
        let cand = problem.evaluate(dsp, -18, -11).unwrap();
        cover.apply(&problem, &cand);
        let (solution, _) = finish(&problem, "test", &cover).unwrap();
        assert_eq!(solution.dsp_count(&problem.collection), 1);
        assert!(sink.has_code(DiagnosticCode::DSP_UNDERUTILIZED));
    }
}
