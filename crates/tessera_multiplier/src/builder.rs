//! The generation pipeline: tile, project, verify, compress.

use crate::design::MultiplierDesign;
use crate::projection::{project_solution, prune_lsb};
use tessera_arch::{load_target_for, Target};
use tessera_bitheap::{
    check_truncation_error, compression_strategy, CompressionContext, CompressionStrategy,
    CompressorCatalog, PipelineSchedule, PlannedCompression, StagePlan,
};
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::{resolve_params, GeneratorConfig, MultiplierParams};
use tessera_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use tessera_tiling::{create_strategy, TilingProblem};

/// Builds one multiplier for a target.
pub struct MultiplierBuilder<'a> {
    params: MultiplierParams,
    target: Box<dyn Target>,
    sink: &'a DiagnosticSink,
}

impl<'a> MultiplierBuilder<'a> {
    /// A builder for the target named in `params`.
    ///
    /// # Errors
    ///
    /// Fails if the target family is unknown.
    pub fn new(params: &MultiplierParams, sink: &'a DiagnosticSink) -> TesseraResult<Self> {
        Ok(Self::with_target(params, load_target_for(params)?, sink))
    }

    /// A builder for an explicit target model.
    pub fn with_target(
        params: &MultiplierParams,
        target: Box<dyn Target>,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            params: params.clone(),
            target,
            sink,
        }
    }

    fn note(&self, code: DiagnosticCode, message: String) -> Diagnostic {
        Diagnostic::note(code, message).with_context(self.params.operator_name())
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// Propagates configuration, tiling and compression failures, and
    /// returns [`TesseraError::TruncationBudgetExceeded`] if the partial
    /// products left out would break faithful rounding.
    pub fn build(self) -> TesseraResult<MultiplierDesign> {
        let params = &self.params;
        let target = self.target.as_ref();
        let sink = self.sink;
        let operator = params.operator_name();

        let problem = TilingProblem::new(params, target, sink)?;
        let truncation = *problem.grid.truncation();
        if !truncation.is_exact() {
            sink.emit(
                self.note(
                    DiagnosticCode::TRUNCATION_PARAMS,
                    format!(
                        "truncating {} bit(s): {} guard bit(s), {} kept in column {}",
                        truncation.truncated_bits,
                        truncation.guard_bits,
                        truncation.keep_bits,
                        truncation.boundary_column()
                    ),
                )
                .with_note(format!(
                    "error budget {} plus centering constant {}",
                    truncation.error_budget, truncation.center_constant
                )),
            );
        }

        let (solution, tiling_cost, tiling_method, plans) = {
            let mut strategy = create_strategy(&problem)?;
            strategy.solve()?;
            let solution = strategy
                .solution()
                .cloned()
                .ok_or_else(|| TesseraError::internal("tiling solved without a solution"))?;
            let cost = strategy.cost().unwrap_or_default();
            let plans: Option<Vec<StagePlan>> =
                strategy.compression_plans().map(<[StagePlan]>::to_vec);
            (solution, cost, strategy.name().to_string(), plans)
        };
        let TilingProblem { grid, collection, .. } = problem;

        let schedule = PipelineSchedule::for_target(target);
        let (mut heap, tiles) = project_solution(&grid, &collection, &solution, target, &schedule)?;

        let coverage = solution.coverage(&collection, &grid)?;
        let covered = |x: u32, y: u32| coverage[grid.index(x, y)] > 0;
        let uncovered: u128 = grid
            .cells()
            .filter(|&(x, y)| !covered(x, y))
            .map(|(x, y)| 1u128 << (x + y))
            .sum();
        let pruned = if params.tiling.prune_bitheap_lsb {
            prune_lsb(&mut heap, &grid, uncovered, sink, &operator)?
        } else {
            0
        };
        let omitted_weight = check_truncation_error(
            grid.wx(),
            grid.wy(),
            grid.w_out(),
            grid.truncation(),
            covered,
            pruned,
        )?;

        let ctx = CompressionContext::new(
            target,
            CompressorCatalog::standard(target),
            params.compression.final_adder.arity(),
            sink,
            operator,
        );
        let mut compressor: Box<dyn CompressionStrategy> = match plans {
            Some(plans) => Box::new(PlannedCompression::new(plans)),
            None => compression_strategy(params, target)?,
        };
        let compression = heap.start_compression(compressor.as_mut(), &ctx)?;

        Ok(MultiplierDesign {
            params: params.clone(),
            target: format!("{}/{}", target.family_name(), target.device_name()),
            grid,
            collection,
            solution,
            tiling_method,
            tiling_cost,
            tiles,
            heap,
            catalog: ctx.catalog.clone(),
            compression,
            omitted_weight,
        })
    }
}

/// Generates a multiplier for resolved parameters.
///
/// # Errors
///
/// See [`MultiplierBuilder::build`].
pub fn generate(
    params: &MultiplierParams,
    sink: &DiagnosticSink,
) -> TesseraResult<MultiplierDesign> {
    MultiplierBuilder::new(params, sink)?.build()
}

/// Validates a configuration and generates the multiplier it describes.
///
/// # Errors
///
/// Configuration errors as well as everything [`generate`] reports.
pub fn generate_from_config(
    config: &GeneratorConfig,
    sink: &DiagnosticSink,
) -> TesseraResult<MultiplierDesign> {
    let params = resolve_params(config)?;
    generate(&params, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tessera_arch::{Delay, DspShape, TargetOptions};
    use tessera_config::{CompressionMode, TilingMethod};
    use tessera_ilp::{BranchAndBound, IlpBackend, IlpModel, IlpSolution, Sense, VarKind};

    /// Drops the error-budget row and leaves every optional cell uncovered.
    #[derive(Debug)]
    struct IgnoresBudget;

    impl IlpBackend for IgnoresBudget {
        fn name(&self) -> &str {
            "ignores-budget"
        }

        fn solve(&self, model: &IlpModel, timeout: Duration, _: Option<&[i64]>) -> IlpSolution {
            let mut relaxed = IlpModel::new();
            for v in model.variables() {
                match v.kind {
                    VarKind::Binary => relaxed.add_binary(v.name.clone(), v.cost),
                    VarKind::Integer { upper } => {
                        relaxed.add_integer(v.name.clone(), upper, v.cost)
                    }
                };
            }
            for row in model.constraints() {
                if row.name == "error_budget" {
                    continue;
                }
                let optional = row.sense == Sense::Le && row.name.starts_with("cover_");
                let rhs = if optional { 0 } else { row.rhs };
                relaxed.add_constraint(row.name.clone(), row.terms.iter().copied(), row.sense, rhs);
            }
            BranchAndBound::new().solve(&relaxed, timeout, None)
        }
    }

    /// A real device whose ILP back end is [`IgnoresBudget`].
    #[derive(Debug)]
    struct BudgetBlind(Box<dyn Target>);

    impl Target for BudgetBlind {
        fn family_name(&self) -> &str {
            self.0.family_name()
        }
        fn device_name(&self) -> &str {
            self.0.device_name()
        }
        fn total_luts(&self) -> u32 {
            self.0.total_luts()
        }
        fn total_ffs(&self) -> u32 {
            self.0.total_ffs()
        }
        fn total_dsp(&self) -> u32 {
            self.0.total_dsp()
        }
        fn lut_input_count(&self) -> u32 {
            self.0.lut_input_count()
        }
        fn dsp_shape(&self) -> DspShape {
            self.0.dsp_shape()
        }
        fn dsp_lut_equivalent(&self) -> f64 {
            self.0.dsp_lut_equivalent()
        }
        fn lut_delay(&self) -> Delay {
            self.0.lut_delay()
        }
        fn dsp_delay(&self) -> Delay {
            self.0.dsp_delay()
        }
        fn carry_delay_per_bit(&self) -> Delay {
            self.0.carry_delay_per_bit()
        }
        fn options(&self) -> &TargetOptions {
            self.0.options()
        }
        fn ilp_solver(&self) -> Option<Box<dyn IlpBackend>> {
            Some(Box::new(IgnoresBudget))
        }
    }

    fn params(edit: impl FnOnce(&mut GeneratorConfig)) -> MultiplierParams {
        let mut config = GeneratorConfig::for_widths(6, 6, 0, false);
        edit(&mut config);
        resolve_params(&config).unwrap()
    }

    #[test]
    fn default_pipeline_produces_a_compressed_heap() {
        let sink = DiagnosticSink::new();
        let d = generate(&params(|_| {}), &sink).unwrap();
        assert!(d.heap().final_adder().is_some());
        assert!(!d.solution().is_empty());
        assert_eq!(d.tiling_method(), "greedy");
        assert!(sink.has_code(DiagnosticCode::TILING_SUMMARY));
    }

    #[test]
    fn truncation_is_reported() {
        let sink = DiagnosticSink::new();
        generate(&params(|c| c.multiplier.w_out = 6), &sink).unwrap();
        let notes: Vec<_> = sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.code == DiagnosticCode::TRUNCATION_PARAMS)
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].context.as_deref(), Some("IntMultiplier_6x6_6_u"));
    }

    #[test]
    fn ilp_methods_without_solver_fail_to_configure() {
        let sink = DiagnosticSink::new();
        let p = params(|c| {
            c.tiling.method = TilingMethod::OptimalIlp;
            c.ilp.enabled = false;
        });
        let err = generate(&p, &sink).unwrap_err();
        assert!(matches!(err, TesseraError::Configuration { .. }));

        let p = params(|c| {
            c.compression.strategy = CompressionMode::Ilp;
            c.ilp.enabled = false;
        });
        assert!(matches!(
            generate(&p, &sink).unwrap_err(),
            TesseraError::Configuration { .. }
        ));
    }

    #[test]
    fn over_budget_tilings_are_rejected() {
        let sink = DiagnosticSink::new();
        let p = params(|c| {
            c.multiplier.w_out = 6;
            c.tiling.method = TilingMethod::OptimalIlp;
            c.tiling.use_dsp = false;
        });
        let target = BudgetBlind(load_target_for(&p).unwrap());
        let err = MultiplierBuilder::with_target(&p, Box::new(target), &sink)
            .build()
            .unwrap_err();
        assert!(
            matches!(err, TesseraError::TruncationBudgetExceeded { wx: 6, w_out: 6, .. }),
            "{err}"
        );
        assert!(format!("{err}").contains("6x6 -> 6 bits"));

        // The same run with the budget row in place is faithful.
        assert!(generate(&p, &sink).is_ok());
    }

    #[test]
    fn generate_from_config_validates_first() {
        let sink = DiagnosticSink::new();
        let config = GeneratorConfig::for_widths(0, 4, 0, false);
        assert!(matches!(
            generate_from_config(&config, &sink).unwrap_err(),
            TesseraError::Configuration { .. }
        ));
    }
}
