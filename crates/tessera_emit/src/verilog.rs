//! Structural Verilog-2005 output.
//!
//! Component definitions become leaf modules placed ahead of the entity.
//! The entity module is named after the requested entity name plus a short
//! content hash of its body, so structurally identical operators share a
//! name and different ones never collide.

use crate::{delayed_name, CodeEmitter, ComponentDef, CycleTracker, Port, PortDirection};
use std::fmt::Write as _;
use tessera_common::{ContentHash, TesseraError, TesseraResult};

#[derive(Debug, Clone)]
enum BodyItem {
    Line(String),
    Instance(usize),
}

#[derive(Debug, Clone)]
struct InstanceText {
    component: String,
    name: String,
    connections: Vec<(String, String)>,
}

/// Renders emitter calls as Verilog text.
#[derive(Debug, Clone, Default)]
pub struct VerilogEmitter {
    entity: Option<String>,
    ports: Vec<Port>,
    wires: Vec<(String, u32)>,
    components: Vec<ComponentDef>,
    instances: Vec<InstanceText>,
    body: Vec<BodyItem>,
    tracker: CycleTracker,
    output: Option<(String, String)>,
}

fn range(width: u32) -> String {
    if width <= 1 {
        String::new()
    } else {
        format!("[{}:0] ", width - 1)
    }
}

fn direction(d: PortDirection) -> &'static str {
    match d {
        PortDirection::Input => "input ",
        PortDirection::Output => "output",
    }
}

fn render_ports(out: &mut String, ports: &[Port]) {
    let lines: Vec<String> = ports
        .iter()
        .map(|p| format!("  {} wire {}{}", direction(p.direction), range(p.width), p.name))
        .collect();
    let _ = writeln!(out, "{}", lines.join(",\n"));
}

impl VerilogEmitter {
    /// A fresh emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Module name of the finished entity.
    pub fn module_name(&self) -> Option<&str> {
        self.output.as_ref().map(|(name, _)| name.as_str())
    }

    /// The rendered text, once [`end_entity`](CodeEmitter::end_entity) has
    /// run.
    pub fn text(&self) -> Option<&str> {
        self.output.as_ref().map(|(_, text)| text.as_str())
    }

    /// Consumes the emitter and returns the rendered text.
    ///
    /// # Errors
    ///
    /// Fails if the entity was never finished.
    pub fn into_text(self) -> TesseraResult<String> {
        self.output
            .map(|(_, text)| text)
            .ok_or_else(|| {
                TesseraError::internal("Verilog requested before the entity was finished")
            })
    }

    fn instance_mut(&mut self, name: &str) -> TesseraResult<&mut InstanceText> {
        self.instances
            .iter_mut()
            .rev()
            .find(|i| i.name == name)
            .ok_or_else(|| TesseraError::internal(format!("port map on unknown instance `{name}`")))
    }

    fn render_component(out: &mut String, c: &ComponentDef) {
        let _ = writeln!(out, "module {} (", c.name);
        render_ports(out, &c.ports);
        out.push_str(");\n");
        for line in &c.body {
            let _ = writeln!(out, "  {line}");
        }
        out.push_str("endmodule\n\n");
    }

    fn render_body(&self) -> String {
        let mut body = String::new();
        for (name, width) in &self.wires {
            let _ = writeln!(body, "  wire {}{name};", range(*width));
        }
        let lines = self.tracker.delay_lines();
        if !lines.is_empty() {
            for &(name, width, depth) in &lines {
                let regs: Vec<String> = (1..=depth).map(|d| delayed_name(name, d)).collect();
                let _ = writeln!(body, "  reg {}{};", range(width), regs.join(", "));
            }
            body.push_str("  always @(posedge clk) begin\n");
            for &(name, _, depth) in &lines {
                for d in 1..=depth {
                    let _ = writeln!(
                        body,
                        "    {} <= {};",
                        delayed_name(name, d),
                        delayed_name(name, d - 1)
                    );
                }
            }
            body.push_str("  end\n");
        }
        body.push('\n');
        for item in &self.body {
            match item {
                BodyItem::Line(line) => {
                    let _ = writeln!(body, "  {line}");
                }
                BodyItem::Instance(i) => {
                    let inst = &self.instances[*i];
                    let conns: Vec<String> = inst
                        .connections
                        .iter()
                        .map(|(port, signal)| format!("    .{port}({signal})"))
                        .collect();
                    let _ = writeln!(
                        body,
                        "  {} {} (\n{}\n  );",
                        inst.component,
                        inst.name,
                        conns.join(",\n")
                    );
                }
            }
        }
        body
    }
}

impl CodeEmitter for VerilogEmitter {
    fn begin_entity(&mut self, name: &str) -> TesseraResult<()> {
        if self.entity.is_some() {
            return Err(TesseraError::internal("entity started twice"));
        }
        self.entity = Some(name.to_string());
        Ok(())
    }

    fn port(&mut self, port: Port) -> TesseraResult<()> {
        self.tracker.declare(&port.name, port.width)?;
        self.ports.push(port);
        Ok(())
    }

    fn declare(&mut self, name: &str, width: u32) -> TesseraResult<()> {
        self.tracker.declare(name, width)?;
        self.wires.push((name.to_string(), width));
        Ok(())
    }

    fn define_component(&mut self, component: &ComponentDef) -> TesseraResult<()> {
        if !self.components.iter().any(|c| c.name == component.name) {
            self.components.push(component.clone());
        }
        Ok(())
    }

    fn instance(&mut self, component: &str, name: &str) -> TesseraResult<()> {
        if !self.components.iter().any(|c| c.name == component) {
            return Err(TesseraError::internal(format!(
                "instance `{name}` of undefined component `{component}`"
            )));
        }
        self.body.push(BodyItem::Instance(self.instances.len()));
        self.instances.push(InstanceText {
            component: component.to_string(),
            name: name.to_string(),
            connections: Vec::new(),
        });
        Ok(())
    }

    fn in_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()> {
        let signal = self.tracker.reference(signal)?;
        self.instance_mut(instance)?
            .connections
            .push((port.to_string(), signal));
        Ok(())
    }

    fn out_port_map(&mut self, instance: &str, port: &str, signal: &str) -> TesseraResult<()> {
        self.tracker.width(signal).ok_or_else(|| {
            TesseraError::internal(format!(
                "output `{port}` of `{instance}` drives undeclared `{signal}`"
            ))
        })?;
        self.instance_mut(instance)?
            .connections
            .push((port.to_string(), signal.to_string()));
        Ok(())
    }

    fn signal(&mut self, signal: &str) -> TesseraResult<String> {
        self.tracker.reference(signal)
    }

    fn assign(&mut self, signal: &str, expression: &str) -> TesseraResult<()> {
        self.body
            .push(BodyItem::Line(format!("assign {signal} = {expression};")));
        Ok(())
    }

    fn assign_constant(&mut self, signal: &str, width: u32, value: u128) -> TesseraResult<()> {
        self.body
            .push(BodyItem::Line(format!("assign {signal} = {width}'h{value:x};")));
        Ok(())
    }

    fn next_cycle(&mut self) -> TesseraResult<()> {
        self.tracker.advance();
        let cycle = self.tracker.current();
        self.body.push(BodyItem::Line(format!("// cycle {cycle}")));
        Ok(())
    }

    fn current_cycle(&self) -> u32 {
        self.tracker.current()
    }

    fn end_entity(&mut self) -> TesseraResult<()> {
        let entity = self
            .entity
            .clone()
            .ok_or_else(|| TesseraError::internal("entity finished before it was started"))?;
        let body = self.render_body();
        let module = format!("{entity}_{}", ContentHash::from_bytes(body.as_bytes()).short());

        let mut ports = Vec::with_capacity(self.ports.len() + 1);
        if !self.tracker.delay_lines().is_empty() {
            ports.push(Port::input("clk", 1));
        }
        ports.extend(self.ports.iter().cloned());

        let mut out = String::new();
        let _ = writeln!(out, "// Generated by tessera: {entity}");
        out.push_str("`timescale 1ns / 1ps\n\n");
        for c in &self.components {
            Self::render_component(&mut out, c);
        }
        let _ = writeln!(out, "module {module} (");
        render_ports(&mut out, &ports);
        out.push_str(");\n");
        out.push_str(&body);
        out.push_str("endmodule\n");
        self.output = Some((module, out));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder() -> ComponentDef {
        ComponentDef {
            name: "add2".into(),
            ports: vec![Port::input("A", 2), Port::input("B", 2), Port::output("S", 3)],
            body: vec!["assign S = A + B;".into()],
        }
    }

    fn build(pipelined: bool) -> VerilogEmitter {
        let mut e = VerilogEmitter::new();
        e.begin_entity("IntMultiplier_2x2_4_u").unwrap();
        e.port(Port::input("X", 2)).unwrap();
        e.port(Port::input("Y", 2)).unwrap();
        e.port(Port::output("R", 3)).unwrap();
        e.define_component(&adder()).unwrap();
        if pipelined {
            e.next_cycle().unwrap();
        }
        e.declare("s", 3).unwrap();
        e.instance("add2", "a0").unwrap();
        e.in_port_map("a0", "A", "X").unwrap();
        e.in_port_map("a0", "B", "Y").unwrap();
        e.out_port_map("a0", "S", "s").unwrap();
        let s = e.signal("s").unwrap();
        e.assign("R", &s).unwrap();
        e.end_entity().unwrap();
        e
    }

    #[test]
    fn renders_components_and_entity() {
        let e = build(false);
        let text = e.text().unwrap();
        assert!(text.contains("module add2 ("));
        assert!(text.contains("add2 a0 (\n    .A(X),\n    .B(Y),\n    .S(s)\n  );"));
        assert!(text.contains("assign R = s;"));
        assert!(!text.contains("clk"));
        assert!(e.module_name().unwrap().starts_with("IntMultiplier_2x2_4_u_"));
    }

    #[test]
    fn delayed_reads_get_registers_and_a_clock() {
        let text = build(true).into_text().unwrap();
        assert!(text.contains("input  wire clk"));
        assert!(text.contains(".A(X_d1)"));
        assert!(text.contains("reg [1:0] X_d1;"));
        assert!(text.contains("X_d1 <= X;"));
    }

    #[test]
    fn module_name_is_stable_and_structure_dependent() {
        let a = build(false);
        let b = build(false);
        let c = build(true);
        assert_eq!(a.module_name(), b.module_name());
        assert_ne!(a.module_name(), c.module_name());
    }

    #[test]
    fn constants_render_as_hex() {
        let mut e = VerilogEmitter::new();
        e.begin_entity("k").unwrap();
        e.port(Port::output("R", 8)).unwrap();
        e.assign_constant("R", 8, 0xa5).unwrap();
        e.end_entity().unwrap();
        assert!(e.text().unwrap().contains("assign R = 8'ha5;"));
    }

    #[test]
    fn text_before_end_is_an_error() {
        let mut e = VerilogEmitter::new();
        e.begin_entity("k").unwrap();
        assert!(e.text().is_none());
        assert!(e.into_text().is_err());
    }
}
