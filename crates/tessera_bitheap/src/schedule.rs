//! Pipeline-cycle bookkeeping for heap bits.
//!
//! Every bit carries the cycle it becomes available in and the
//! combinational delay accumulated since the last register. Placing a
//! component after a bit starts a new cycle when the component would push
//! the path past the clock period.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tessera_arch::Target;

/// When a signal becomes available.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BitTiming {
    /// Pipeline cycle index.
    pub cycle: u32,
    /// Combinational delay since the start of `cycle`, in nanoseconds.
    pub delay_ns: f64,
}

impl BitTiming {
    /// Timing of a registered input at cycle 0.
    pub const START: Self = Self {
        cycle: 0,
        delay_ns: 0.0,
    };

    /// Orders timings by cycle, then by delay.
    pub fn cmp_time(&self, other: &Self) -> Ordering {
        self.cycle
            .cmp(&other.cycle)
            .then(self.delay_ns.total_cmp(&other.delay_ns))
    }

    /// The later of two timings.
    pub fn latest(self, other: Self) -> Self {
        if self.cmp_time(&other) == Ordering::Less {
            other
        } else {
            self
        }
    }
}

/// Converts component delays into cycle/delay pairs for a clock period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineSchedule {
    period_ns: Option<f64>,
}

impl PipelineSchedule {
    /// A schedule for the given clock period; `None` is combinational.
    pub fn new(period_ns: Option<f64>) -> Self {
        Self {
            period_ns: period_ns.filter(|p| *p > 0.0),
        }
    }

    /// A combinational schedule: every signal stays in cycle 0.
    pub fn combinational() -> Self {
        Self { period_ns: None }
    }

    /// The schedule for a target's configured clock.
    pub fn for_target(target: &dyn Target) -> Self {
        Self::new(target.clock_period_ns())
    }

    /// The clock period, if pipelined.
    pub fn period_ns(&self) -> Option<f64> {
        self.period_ns
    }

    /// Timing of the output of a component with combinational `delay_ns`
    /// whose latest input arrives at `start`.
    ///
    /// If the component does not fit in the rest of the current cycle, a
    /// register is placed before it; a component slower than one period
    /// gets internal pipeline registers.
    pub fn after(&self, start: BitTiming, delay_ns: f64) -> BitTiming {
        let Some(period) = self.period_ns else {
            return BitTiming {
                cycle: start.cycle,
                delay_ns: start.delay_ns + delay_ns,
            };
        };
        if start.delay_ns + delay_ns <= period {
            return BitTiming {
                cycle: start.cycle,
                delay_ns: start.delay_ns + delay_ns,
            };
        }
        let mut cycle = start.cycle;
        if start.delay_ns > 0.0 {
            cycle += 1;
        }
        let internal = if delay_ns > period {
            (delay_ns / period).ceil() as u32 - 1
        } else {
            0
        };
        BitTiming {
            cycle: cycle + internal,
            delay_ns: delay_ns - f64::from(internal) * period,
        }
    }

    /// Latest timing among `inputs`, or [`BitTiming::START`] if empty.
    pub fn latest_of(inputs: impl IntoIterator<Item = BitTiming>) -> BitTiming {
        inputs.into_iter().fold(BitTiming::START, BitTiming::latest)
    }
}
