//! An emitter that records its call sequence.

use crate::{CodeEmitter, ComponentDef, CycleTracker, Port};
use serde::{Deserialize, Serialize};
use tessera_common::{TesseraError, TesseraResult};

/// One emitter call, as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum EmitterCall {
    /// Entity start.
    BeginEntity {
        /// Entity name.
        name: String,
    },
    /// Entity port.
    Port {
        /// The port.
        port: Port,
    },
    /// Signal declaration.
    Declare {
        /// Signal name.
        name: String,
        /// Width in bits.
        width: u32,
        /// Cycle of declaration.
        cycle: u32,
    },
    /// Component definition.
    DefineComponent {
        /// The definition.
        component: ComponentDef,
    },
    /// Component instantiation.
    Instance {
        /// Component name.
        component: String,
        /// Instance name.
        name: String,
    },
    /// Input connection.
    InPortMap {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
        /// Connected signal reference.
        signal: String,
    },
    /// Output connection.
    OutPortMap {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
        /// Connected signal.
        signal: String,
    },
    /// Expression assignment.
    Assign {
        /// Driven signal.
        signal: String,
        /// Expression text.
        expression: String,
    },
    /// Constant assignment.
    AssignConstant {
        /// Driven signal.
        signal: String,
        /// Width in bits.
        width: u32,
        /// Constant value.
        value: u128,
    },
    /// Pipeline advance.
    NextCycle {
        /// Cycle entered.
        cycle: u32,
    },
    /// Entity end.
    EndEntity,
}

/// Captures every call; serializes to JSON as a list of tagged objects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingEmitter {
    calls: Vec<EmitterCall>,
    #[serde(skip)]
    tracker: CycleTracker,
    #[serde(skip)]
    components: Vec<String>,
}

impl RecordingEmitter {
    /// An empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded calls in order.
    pub fn calls(&self) -> &[EmitterCall] {
        &self.calls
    }

    /// Consumes the recorder and returns the calls.
    pub fn into_calls(self) -> Vec<EmitterCall> {
        self.calls
    }

    /// Number of component instances.
    pub fn instance_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, EmitterCall::Instance { .. }))
            .count()
    }
}

impl CodeEmitter for RecordingEmitter {
    fn begin_entity(&mut self, name: &str) -> TesseraResult<()> {
        if !self.calls.is_empty() {
            return Err(TesseraError::internal("entity started twice"));
        }
        self.calls.push(EmitterCall::BeginEntity {
            name: name.to_string(),
        });
        Ok(())
    }

    fn port(&mut self, port: Port) -> TesseraResult<()> {
        self.tracker.declare(&port.name, port.width)?;
        self.calls.push(EmitterCall::Port { port });
        Ok(())
    }

    fn declare(&mut self, name: &str, width: u32) -> TesseraResult<()> {
        self.tracker.declare(name, width)?;
        self.calls.push(EmitterCall::Declare {
            name: name.to_string(),
            width,
            cycle: self.tracker.current(),
        });
        Ok(())
    }

    fn define_component(&mut self, component: &ComponentDef) -> TesseraResult<()> {
        if self.components.contains(&component.name) {
            return Ok(());
        }
        self.components.push(component.name.clone());
        self.calls.push(EmitterCall::DefineComponent {
            component: component.clone(),
        });
        Ok(())
    }

    fn instance(&mut self, component: &str, name: &str) -> TesseraResult<()> {
        if !self.components.iter().any(|c| c == component) {
            return Err(TesseraError::internal(format!(
                "instance `{name}` of undefined component `{component}`"
            )));
        }
        self.calls.push(EmitterCall::Instance {
            component: component.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn in_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()> {
        let signal = self.tracker.reference(signal)?;
        self.calls.push(EmitterCall::InPortMap {
            instance: instance.to_string(),
            port: port.to_string(),
            signal,
        });
        Ok(())
    }

    fn out_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()> {
        self.tracker.width(signal).ok_or_else(|| {
            TesseraError::internal(format!(
                "output `{port}` of `{instance}` drives undeclared `{signal}`"
            ))
        })?;
        self.calls.push(EmitterCall::OutPortMap {
            instance: instance.to_string(),
            port: port.to_string(),
            signal: signal.to_string(),
        });
        Ok(())
    }

    fn signal(&mut self, signal: &str) -> TesseraResult<String> {
        self.tracker.reference(signal)
    }

    fn assign(&mut self, signal: &str, expression: &str) -> TesseraResult<()> {
        self.calls.push(EmitterCall::Assign {
            signal: signal.to_string(),
            expression: expression.to_string(),
        });
        Ok(())
    }

    fn assign_constant(&mut self, signal: &str, width: u32, value: u128) -> TesseraResult<()> {
        self.calls.push(EmitterCall::AssignConstant {
            signal: signal.to_string(),
            width,
            value,
        });
        Ok(())
    }

    fn next_cycle(&mut self) -> TesseraResult<()> {
        self.tracker.advance();
        self.calls.push(EmitterCall::NextCycle {
            cycle: self.tracker.current(),
        });
        Ok(())
    }

    fn current_cycle(&self) -> u32 {
        self.tracker.current()
    }

    fn end_entity(&mut self) -> TesseraResult<()> {
        self.calls.push(EmitterCall::EndEntity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_adder() -> ComponentDef {
        ComponentDef {
            name: "ha".into(),
            ports: vec![Port::input("X0", 2), Port::output("R", 2)],
            body: vec!["assign R = X0[0] + X0[1];".into()],
        }
    }

    #[test]
    fn records_calls_in_order() {
        let mut e = RecordingEmitter::new();
        e.begin_entity("top").unwrap();
        e.port(Port::input("X", 2)).unwrap();
        e.declare("s", 2).unwrap();
        e.define_component(&half_adder()).unwrap();
        e.define_component(&half_adder()).unwrap();
        e.instance("ha", "ha0").unwrap();
        e.in_port_map("ha0", "X0", "X").unwrap();
        e.out_port_map("ha0", "R", "s").unwrap();
        e.end_entity().unwrap();
        assert_eq!(e.calls().len(), 8);
        assert_eq!(e.instance_count(), 1);
        assert!(matches!(e.calls()[7], EmitterCall::EndEntity));
    }

    #[test]
    fn port_maps_see_delayed_signals() {
        let mut e = RecordingEmitter::new();
        e.begin_entity("top").unwrap();
        e.port(Port::input("X", 2)).unwrap();
        e.declare("s", 2).unwrap();
        e.define_component(&half_adder()).unwrap();
        e.next_cycle().unwrap();
        e.instance("ha", "ha0").unwrap();
        e.in_port_map("ha0", "X0", "X").unwrap();
        match &e.calls()[5] {
            EmitterCall::InPortMap { signal, .. } => assert_eq!(signal, "X_d1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn undefined_component_is_rejected() {
        let mut e = RecordingEmitter::new();
        e.begin_entity("top").unwrap();
        assert!(e.instance("missing", "m0").is_err());
        assert!(e.out_port_map("m0", "R", "nowhere").is_err());
    }

    #[test]
    fn serializes_as_tagged_calls() {
        let mut e = RecordingEmitter::new();
        e.begin_entity("top").unwrap();
        e.assign_constant("k", 4, 9).unwrap();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["calls"][0]["call"], "begin_entity");
        assert_eq!(json["calls"][1]["call"], "assign_constant");
        assert_eq!(json["calls"][1]["value"], 9);
    }
}
