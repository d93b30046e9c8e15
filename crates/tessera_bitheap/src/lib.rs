//! Bit heaps and their compression.
//!
//! A [`BitHeap`] collects the weighted bits produced by the tiles of a
//! multiplier, plus constants. Compression reduces every column to the
//! arity of the final adder in stages of compressors chosen by a
//! [`CompressionStrategy`]; the heap can then be evaluated bit-accurately
//! or handed to an emitter. Truncated multipliers get their error budget
//! from [`compute_truncation_params`].

#![warn(missing_docs)]

pub mod compression;
pub mod compressor;
pub mod final_adder;
pub mod heap;
pub mod schedule;
pub mod truncation;

pub use compression::{
    CompressionContext, CompressionStrategy, CompressionSummary, HeuristicCompression,
    IlpCompression, PlannedCompression, PlannedCompressor, StagePlan,
};
pub use compressor::{CompressorCatalog, CompressorInstance, CompressorShape};
pub use final_adder::FinalAdder;
pub use heap::{BitHeap, BitSource, HeapBit};
pub use schedule::{BitTiming, PipelineSchedule};
pub use truncation::{check_truncation_error, compute_truncation_params, TruncationParams};

use tessera_arch::Target;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::{CompressionMode, MultiplierParams};

/// Creates the compression strategy the parameters ask for.
///
/// # Errors
///
/// ILP compression without an enabled solver is a configuration error.
pub fn compression_strategy(
    params: &MultiplierParams,
    target: &dyn Target,
) -> TesseraResult<Box<dyn CompressionStrategy>> {
    match params.compression.mode {
        CompressionMode::Heuristic => Ok(Box::new(HeuristicCompression)),
        CompressionMode::Ilp => {
            let solver = target
                .ilp_solver()
                .filter(|_| params.ilp.enabled)
                .ok_or_else(|| {
                    TesseraError::config("ILP compression selected but no ILP solver is enabled")
                })?;
            Ok(Box::new(
                IlpCompression::new(solver, params.ilp.timeout, params.ilp.max_relaxations)
                    .for_operator(params.wx, params.wy, params.w_out),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_arch::load_target_for;
    use tessera_config::{resolve_params, GeneratorConfig};

    fn params(mode: CompressionMode, ilp: bool) -> MultiplierParams {
        let mut config = GeneratorConfig::for_widths(8, 8, 0, false);
        config.compression.strategy = mode;
        config.ilp.enabled = ilp;
        resolve_params(&config).unwrap()
    }

    #[test]
    fn heuristic_by_default() {
        let p = params(CompressionMode::Heuristic, true);
        let target = load_target_for(&p).unwrap();
        let s = compression_strategy(&p, target.as_ref()).unwrap();
        assert_eq!(s.name(), "heuristic");
    }

    #[test]
    fn ilp_needs_a_solver() {
        let p = params(CompressionMode::Ilp, true);
        let target = load_target_for(&p).unwrap();
        assert_eq!(compression_strategy(&p, target.as_ref()).unwrap().name(), "ilp");

        let p = params(CompressionMode::Ilp, false);
        let target = load_target_for(&p).unwrap();
        let err = compression_strategy(&p, target.as_ref()).unwrap_err();
        assert!(matches!(err, TesseraError::Configuration { .. }));
    }
}
