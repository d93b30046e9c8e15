//! Feeding a design to a code emitter.
//!
//! Components are emitted in pipeline order. Each tile, compressor and the
//! final adder is emitted in the cycle its output becomes available, so the
//! emitter delays every input that was produced earlier. Heap bits become
//! one-bit signals named after the bit.

use crate::design::MultiplierDesign;
use crate::projection::ProjectedTile;
use tessera_bitheap::{BitHeap, BitSource, CompressorInstance, CompressorShape};
use tessera_common::{TesseraError, TesseraResult};
use tessera_emit::{CodeEmitter, ComponentDef, Port, RecordingEmitter, VerilogEmitter};
use tessera_tiling::TileProjection;

/// `name[hi:lo]`, collapsing to a bit select or the bare name.
fn select(name: &str, width: u32, hi: u32, lo: u32) -> String {
    if width <= 1 {
        name.to_string()
    } else if hi == lo {
        format!("{name}[{hi}]")
    } else {
        format!("{name}[{hi}:{lo}]")
    }
}

/// Bits `[lo, lo + w_out)` of `sum`, saturated when the carry bit above
/// them leaves the output range.
fn saturated(sum: &str, span: u32, lo: u32, w_out: u32, signed: bool) -> String {
    let top = lo + w_out;
    let carry = select(sum, span, top, top);
    let bits = select(sum, span, top - 1, lo);
    if !signed {
        return format!("{carry} ? {{{w_out}{{1'b1}}}} : {bits}");
    }
    if w_out == 1 {
        return carry;
    }
    let msb = select(sum, span, top - 1, top - 1);
    format!("({carry} ^ {msb}) ? {{{carry}, {{{}{{~{carry}}}}}}} : {bits}", w_out - 1)
}

/// Verilog concatenation of one-bit references, MSB first.
fn concat(bits: &[String]) -> String {
    match bits {
        [single] => single.clone(),
        _ => format!("{{{}}}", bits.iter().rev().cloned().collect::<Vec<_>>().join(", ")),
    }
}

/// Highest X and Y bits read when the tile covers a full rectangle.
fn rectangle(p: &TileProjection) -> Option<(u32, u32)> {
    let x_hi = p.cells.iter().map(|c| c.0).max()?;
    let y_hi = p.cells.iter().map(|c| c.1).max()?;
    let full = x_hi + 1 - p.x_lo == p.in_x
        && y_hi + 1 - p.y_lo == p.in_y
        && p.cells.len() as u32 == p.in_x * p.in_y;
    full.then_some((x_hi, y_hi))
}

fn tile_component(tile: &ProjectedTile) -> ComponentDef {
    let p = &tile.projection;
    let sign = |s: bool| if s { 's' } else { 'u' };
    let kind = if tile.is_dsp() { "Dsp" } else { "Lut" };
    let extend = |port: &str, width: u32, signed: bool| {
        if signed {
            format!("{{{}, {port}}}", select(port, width, width - 1, width - 1))
        } else {
            format!("{{1'b0, {port}}}")
        }
    };
    let attribute = if tile.is_dsp() { "(* use_dsp = \"yes\" *) " } else { "" };
    ComponentDef {
        name: format!(
            "{kind}Tile_{}x{}_{}{}",
            p.in_x,
            p.in_y,
            sign(p.signed_x),
            sign(p.signed_y)
        ),
        ports: vec![
            Port::input("X", p.in_x),
            Port::input("Y", p.in_y),
            Port::output("R", p.out_bits),
        ],
        body: vec![
            format!("wire signed [{}:0] xs = {};", p.in_x, extend("X", p.in_x, p.signed_x)),
            format!("wire signed [{}:0] ys = {};", p.in_y, extend("Y", p.in_y, p.signed_y)),
            format!("{attribute}wire signed [{}:0] p = xs * ys;", p.in_x + p.in_y + 1),
            format!("assign R = p + {}'d{};", p.out_bits, p.offset),
        ],
    }
}

fn compressor_component(shape: &CompressorShape) -> ComponentDef {
    let digits: String = shape.inputs.iter().rev().map(u32::to_string).collect();
    let mut ports = Vec::new();
    let mut terms = Vec::new();
    for (j, &n) in shape.inputs.iter().enumerate() {
        if n == 0 {
            continue;
        }
        let port = format!("X{j}");
        for b in 0..n {
            let bit = select(&port, n, b, b);
            terms.push(if j == 0 { bit } else { format!("({bit} << {j})") });
        }
        ports.push(Port::input(port, n));
    }
    ports.push(Port::output("R", shape.outputs));
    ComponentDef {
        name: format!("Compressor_{digits}_{}", shape.outputs),
        ports,
        body: vec![format!("assign R = {};", terms.join(" + "))],
    }
}

struct Emission<'d, 'e> {
    design: &'d MultiplierDesign,
    out: &'e mut dyn CodeEmitter,
}

impl Emission<'_, '_> {
    fn heap(&self) -> &BitHeap {
        self.design.heap()
    }

    fn advance_to(&mut self, cycle: u32) -> TesseraResult<()> {
        while self.out.current_cycle() < cycle {
            self.out.next_cycle()?;
        }
        Ok(())
    }

    fn tile(&mut self, index: usize, tile: &ProjectedTile) -> TesseraResult<()> {
        let p = &tile.projection;
        let (wx, wy) = (self.design.params().wx, self.design.params().wy);
        let result = format!("t{index}_r");
        self.out.declare(&result, p.out_bits)?;

        if let Some((x_hi, y_hi)) = rectangle(p) {
            let component = tile_component(tile);
            self.out.define_component(&component)?;
            let (xs, ys) = (format!("t{index}_x"), format!("t{index}_y"));
            self.out.declare(&xs, p.in_x)?;
            self.out.declare(&ys, p.in_y)?;
            let x = self.out.signal("X")?;
            let y = self.out.signal("Y")?;
            self.out.assign(&xs, &select(&x, wx, x_hi, p.x_lo))?;
            self.out.assign(&ys, &select(&y, wy, y_hi, p.y_lo))?;
            let instance = format!("tile{index}");
            self.out.instance(&component.name, &instance)?;
            self.out.in_port_map(&instance, "X", &xs)?;
            self.out.in_port_map(&instance, "Y", &ys)?;
            self.out.out_port_map(&instance, "R", &result)?;
        } else {
            let x = self.out.signal("X")?;
            let y = self.out.signal("Y")?;
            let grid = self.design.grid();
            let mut expression = format!("{}'d{}", p.out_bits, p.offset);
            for &(cx, cy) in &p.cells {
                let term = format!("({} & {})", select(&x, wx, cx, cx), select(&y, wy, cy, cy));
                let shift = cx + cy - p.base;
                let op = if grid.is_negative(cx, cy) { '-' } else { '+' };
                if shift == 0 {
                    expression.push_str(&format!(" {op} {term}"));
                } else {
                    expression.push_str(&format!(" {op} ({term} << {shift})"));
                }
            }
            self.out.assign(&result, &expression)?;
        }

        let lsb = self.heap().lsb();
        for (i, id) in tile.bits.iter().enumerate() {
            let Some(id) = id else { continue };
            let bit = self.heap().bit(*id);
            if bit.weight < lsb {
                continue;
            }
            let name = bit.name.clone();
            self.out.declare(&name, 1)?;
            self.out.assign(&name, &select(&result, p.out_bits, i as u32, i as u32))?;
        }
        Ok(())
    }

    fn compressor(&mut self, inst: &CompressorInstance) -> TesseraResult<()> {
        let shape = self.design.catalog().shape(inst.shape).ok_or_else(|| {
            TesseraError::internal(format!(
                "compressor {} has unknown shape {}",
                inst.id.as_raw(),
                inst.shape
            ))
        })?;
        let component = compressor_component(shape);
        self.out.define_component(&component)?;
        let n = inst.id.as_raw();
        let instance = format!("cmp{n}");

        let mut inputs = Vec::new();
        for (j, &width) in shape.inputs.iter().enumerate() {
            if width == 0 {
                continue;
            }
            let taken = inst.inputs.get(j).map(Vec::as_slice).unwrap_or(&[]);
            let mut refs = Vec::with_capacity(width as usize);
            for &id in taken {
                let name = self.heap().bit(id).name.clone();
                refs.push(self.out.signal(&name)?);
            }
            refs.resize(width as usize, "1'b0".to_string());
            let wire = format!("c{n}_x{j}");
            self.out.declare(&wire, width)?;
            self.out.assign(&wire, &concat(&refs))?;
            inputs.push((format!("X{j}"), wire));
        }
        let result = format!("c{n}_r");
        self.out.declare(&result, shape.outputs)?;
        self.out.instance(&component.name, &instance)?;
        for (port, wire) in &inputs {
            self.out.in_port_map(&instance, port, wire)?;
        }
        self.out.out_port_map(&instance, "R", &result)?;
        for (i, &id) in inst.outputs.iter().enumerate() {
            let name = self.heap().bit(id).name.clone();
            self.out.declare(&name, 1)?;
            self.out.assign(&name, &select(&result, shape.outputs, i as u32, i as u32))?;
        }
        Ok(())
    }

    fn final_adder(&mut self) -> TesseraResult<()> {
        let heap = self.design.heap();
        let adder = heap
            .final_adder()
            .ok_or_else(|| TesseraError::internal("design emitted before compression"))?;
        let span = adder.width.saturating_sub(adder.lsb);
        let mut rows = Vec::with_capacity(adder.rows.len());
        for (r, row) in adder.rows.iter().enumerate() {
            let mut refs = Vec::with_capacity(span as usize);
            for bit in &row[adder.lsb as usize..] {
                refs.push(match bit {
                    Some(id) => self.out.signal(&heap.bit(*id).name)?,
                    None => "1'b0".to_string(),
                });
            }
            let name = format!("row{r}");
            self.out.declare(&name, span)?;
            self.out.assign(&name, &concat(&refs))?;
            rows.push(name);
        }
        self.out.declare("sum", span)?;
        self.out.assign("sum", &rows.join(" + "))?;

        let params = self.design.params();
        let w_out = params.w_out;
        let lo = self.design.grid().truncation().truncated_bits - adder.lsb;
        let sum = self.out.signal("sum")?;
        let result = if adder.width > self.design.grid().w_full() {
            saturated(&sum, span, lo, w_out, params.signed)
        } else {
            select(&sum, span, lo + w_out - 1, lo)
        };
        self.out.assign("R", &result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Tile(usize),
    Compressor(usize),
    FinalAdder,
}

/// Drives `emitter` through the whole design.
///
/// # Errors
///
/// Fails if the design is not compressed or the emitter rejects a call.
pub fn emit_design(design: &MultiplierDesign, emitter: &mut dyn CodeEmitter) -> TesseraResult<()> {
    let heap = design.heap();
    let adder = heap
        .final_adder()
        .ok_or_else(|| TesseraError::internal("design emitted before compression"))?;
    let params = design.params();
    let mut e = Emission { design, out: emitter };

    e.out.begin_entity(&design.operator_name())?;
    e.out.port(Port::input("X", params.wx))?;
    e.out.port(Port::input("Y", params.wy))?;
    e.out.port(Port::output("R", params.w_out))?;

    for bit in heap.bits().iter().filter(|b| b.source == BitSource::Constant) {
        e.out.declare(&bit.name, 1)?;
        e.out.assign_constant(&bit.name, 1, 1)?;
    }

    let mut steps: Vec<(u32, Step)> = design
        .tiles()
        .iter()
        .enumerate()
        .map(|(i, t)| (t.timing.cycle, Step::Tile(i)))
        .chain(
            heap.compressors()
                .iter()
                .enumerate()
                .map(|(i, c)| (c.timing.cycle, Step::Compressor(i))),
        )
        .collect();
    steps.sort();
    steps.push((adder.timing.cycle, Step::FinalAdder));

    for (cycle, step) in steps {
        e.advance_to(cycle)?;
        match step {
            Step::Tile(i) => e.tile(i, &design.tiles()[i])?,
            Step::Compressor(i) => e.compressor(&heap.compressors()[i])?,
            Step::FinalAdder => e.final_adder()?,
        }
    }
    e.out.end_entity()
}

impl MultiplierDesign {
    /// Renders the design as structural Verilog.
    ///
    /// # Errors
    ///
    /// See [`emit_design`].
    pub fn to_verilog(&self) -> TesseraResult<String> {
        let mut emitter = VerilogEmitter::new();
        emit_design(self, &mut emitter)?;
        emitter.into_text()
    }

    /// Records the emitter calls for the design.
    ///
    /// # Errors
    ///
    /// See [`emit_design`].
    pub fn record(&self) -> TesseraResult<RecordingEmitter> {
        let mut emitter = RecordingEmitter::new();
        emit_design(self, &mut emitter)?;
        Ok(emitter)
    }
}
