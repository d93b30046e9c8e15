//! Code emission for generated operators.
//!
//! The multiplier generator does not build text itself: it drives a
//! [`CodeEmitter`] through declare, instance and port-map calls, advancing
//! the pipeline with [`CodeEmitter::next_cycle`]. [`VerilogEmitter`] renders
//! the calls as structural Verilog; [`RecordingEmitter`] keeps the call
//! sequence for inspection and JSON export.
//!
//! Signals remember the cycle they were declared in. Reading a signal in a
//! later cycle through [`CodeEmitter::signal`] yields a delayed copy
//! (`name_d1`, `name_d2`, ...), and the emitter inserts the registers.

#![warn(missing_docs)]

pub mod recording;
pub mod verilog;

pub use recording::{EmitterCall, RecordingEmitter};
pub use verilog::VerilogEmitter;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_common::{TesseraError, TesseraResult};

/// Direction of an entity or component port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Driven from outside.
    Input,
    /// Driven by the entity.
    Output,
}

/// A port of an entity or component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Direction.
    pub direction: PortDirection,
}

impl Port {
    /// An input port.
    pub fn input(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            direction: PortDirection::Input,
        }
    }

    /// An output port.
    pub fn output(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            direction: PortDirection::Output,
        }
    }
}

/// A leaf component instantiated by the entity, described by its ports and
/// a combinational body over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Component name.
    pub name: String,
    /// Ports, in declaration order.
    pub ports: Vec<Port>,
    /// Body statements in the target language, referring to port names.
    pub body: Vec<String>,
}

/// Receives the structure of a generated operator.
///
/// Calls arrive in this order: [`begin_entity`](Self::begin_entity), ports,
/// then declarations, components, instances and assignments interleaved
/// with [`next_cycle`](Self::next_cycle), and finally
/// [`end_entity`](Self::end_entity).
pub trait CodeEmitter {
    /// Starts the entity.
    fn begin_entity(&mut self, name: &str) -> TesseraResult<()>;

    /// Declares an entity port. Input ports are available in cycle 0.
    fn port(&mut self, port: Port) -> TesseraResult<()>;

    /// Declares an internal signal of `width` bits in the current cycle.
    fn declare(&mut self, name: &str, width: u32) -> TesseraResult<()>;

    /// Registers a component definition; repeated definitions of the same
    /// name are ignored.
    fn define_component(&mut self, component: &ComponentDef) -> TesseraResult<()>;

    /// Instantiates `component` as `name`.
    fn instance(&mut self, component: &str, name: &str) -> TesseraResult<()>;

    /// Connects input `port` of instance `instance` to `signal`, delayed to
    /// the current cycle.
    fn in_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()>;

    /// Connects output `port` of instance `instance` to `signal`.
    fn out_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()>;

    /// Reference to `signal` as seen in the current cycle.
    fn signal(&mut self, signal: &str) -> TesseraResult<String>;

    /// Drives `signal` with a raw expression built from
    /// [`signal`](Self::signal) references.
    fn assign(&mut self, signal: &str, expression: &str) -> TesseraResult<()>;

    /// Drives `signal` with the constant `value`.
    fn assign_constant(&mut self, signal: &str, width: u32, value: u128) -> TesseraResult<()>;

    /// Advances to the next pipeline cycle.
    fn next_cycle(&mut self) -> TesseraResult<()>;

    /// Current pipeline cycle.
    fn current_cycle(&self) -> u32;

    /// Finishes the entity.
    fn end_entity(&mut self) -> TesseraResult<()>;
}

/// Cycle bookkeeping shared by the emitters: when each signal was declared
/// and how deep its delay line has to be.
#[derive(Debug, Clone, Default)]
pub(crate) struct CycleTracker {
    current: u32,
    signals: HashMap<String, Declared>,
    order: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Declared {
    width: u32,
    cycle: u32,
    depth: u32,
}

impl CycleTracker {
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn advance(&mut self) {
        self.current += 1;
    }

    pub fn declare(&mut self, name: &str, width: u32) -> TesseraResult<()> {
        if width == 0 {
            return Err(TesseraError::internal(format!("signal `{name}` declared with width 0")));
        }
        if self.signals.contains_key(name) {
            return Err(TesseraError::internal(format!("signal `{name}` declared twice")));
        }
        self.signals.insert(
            name.to_string(),
            Declared {
                width,
                cycle: self.current,
                depth: 0,
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn width(&self, name: &str) -> Option<u32> {
        self.signals.get(name).map(|d| d.width)
    }

    /// Name under which `name` is read in the current cycle.
    pub fn reference(&mut self, name: &str) -> TesseraResult<String> {
        let current = self.current;
        let declared = self
            .signals
            .get_mut(name)
            .ok_or_else(|| {
                TesseraError::internal(format!("signal `{name}` used before declaration"))
            })?;
        let delay = current.saturating_sub(declared.cycle);
        if delay == 0 {
            return Ok(name.to_string());
        }
        declared.depth = declared.depth.max(delay);
        Ok(delayed_name(name, delay))
    }

    /// Signals that need registers, with their width and delay depth, in
    /// declaration order.
    pub fn delay_lines(&self) -> Vec<(&str, u32, u32)> {
        self.order
            .iter()
            .filter_map(|n| {
                let d = self.signals.get(n)?;
                (d.depth > 0).then_some((n.as_str(), d.width, d.depth))
            })
            .collect()
    }
}

/// Name of `name` delayed by `cycles` registers.
pub fn delayed_name(name: &str, cycles: u32) -> String {
    if cycles == 0 {
        name.to_string()
    } else {
        format!("{name}_d{cycles}")
    }
}
