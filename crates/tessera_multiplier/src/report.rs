//! Resource summary of a generated multiplier.

use crate::design::MultiplierDesign;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tessera_arch::ResourceUsage;

/// Tiles of one family used by the solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCount {
    /// Tile family name.
    pub family: String,
    /// Placements of that family.
    pub count: usize,
}

/// What a generated multiplier costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    /// Operator name.
    pub operator: String,
    /// `family/device` of the target.
    pub target: String,
    /// Tiling method used.
    pub tiling_method: String,
    /// Placements per tile family.
    pub tiles: Vec<FamilyCount>,
    /// Hard multiplier blocks.
    pub dsp_blocks: u32,
    /// LUT-equivalent tiling cost.
    pub tiling_cost: f64,
    /// Compression strategy used.
    pub compression: String,
    /// Compression stages.
    pub stages: u32,
    /// Compressor instances.
    pub compressors: usize,
    /// Compressor and final adder area, in LUTs.
    pub compression_area: f64,
    /// Columns summed by the final adder.
    pub final_adder_width: u32,
    /// Rows summed by the final adder.
    pub final_adder_arity: u32,
    /// Pipeline depth in cycles.
    pub latency: u32,
    /// Bits truncated below the output.
    pub truncated_bits: u32,
    /// Weight of the partial products left out.
    pub omitted_weight: u128,
    /// Estimated device resources.
    pub resources: ResourceUsage,
}

impl ResourceReport {
    /// Summarizes a design.
    pub fn of(design: &MultiplierDesign) -> Self {
        let mut families: BTreeMap<&str, usize> = BTreeMap::new();
        for p in design.solution().placements() {
            if let Some(param) = design.collection().get(p.param) {
                *families.entry(param.shape.name()).or_default() += 1;
            }
        }
        let tiles = families
            .into_iter()
            .map(|(family, count)| FamilyCount {
                family: family.to_string(),
                count,
            })
            .collect();

        let dsp_blocks = design.tiles().iter().map(|t| t.dsp_units).sum();
        let lut_cost: f64 = design.tiles().iter().map(|t| t.lut_cost).sum();
        let summary = design.compression();
        let adder = design.heap().final_adder();

        Self {
            operator: design.operator_name(),
            target: design.target().to_string(),
            tiling_method: design.tiling_method().to_string(),
            tiles,
            dsp_blocks,
            tiling_cost: design.tiling_cost(),
            compression: summary.strategy.clone(),
            stages: summary.stages,
            compressors: summary.compressors,
            compression_area: summary.area,
            final_adder_width: adder.map_or(0, |a| a.width.saturating_sub(a.lsb)),
            final_adder_arity: adder.map_or(0, |a| a.arity),
            latency: design.latency(),
            truncated_bits: design.grid().truncation().truncated_bits,
            omitted_weight: design.omitted_weight(),
            resources: ResourceUsage {
                luts: (lut_cost + summary.area).ceil() as u32,
                ffs: register_bits(design),
                dsp: dsp_blocks,
            },
        }
    }

    /// Number of tile placements.
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().map(|f| f.count).sum()
    }
}

/// Register bits the pipeline needs: operand delays up to the slowest
/// tile, and every heap bit delayed to its consumer's cycle.
fn register_bits(design: &MultiplierDesign) -> u32 {
    let heap = design.heap();
    let params = design.params();
    let operand_depth = design
        .tiles()
        .iter()
        .map(|t| t.timing.cycle)
        .max()
        .unwrap_or(0);
    let mut depth = vec![0u32; heap.bits().len()];
    let mut need = |id: tessera_common::BitId, cycle: u32| {
        let lag = cycle.saturating_sub(heap.bit(id).timing.cycle);
        depth[id.index()] = depth[id.index()].max(lag);
    };
    for inst in heap.compressors() {
        for &id in inst.inputs.iter().flatten() {
            need(id, inst.timing.cycle);
        }
    }
    if let Some(adder) = heap.final_adder() {
        for &id in adder.rows.iter().flatten().flatten() {
            need(id, adder.timing.cycle);
        }
    }
    (params.wx + params.wy) * operand_depth + depth.iter().sum::<u32>()
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} on {}", self.operator, self.target)?;
        writeln!(
            f,
            "  tiling       {} ({} tiles, cost {:.1})",
            self.tiling_method,
            self.tile_count(),
            self.tiling_cost
        )?;
        for family in &self.tiles {
            writeln!(f, "    {:<14} {}", family.family, family.count)?;
        }
        writeln!(
            f,
            "  compression  {} ({} stage(s), {} compressor(s), area {:.1})",
            self.compression, self.stages, self.compressors, self.compression_area
        )?;
        writeln!(
            f,
            "  final adder  {} bits, {} rows",
            self.final_adder_width, self.final_adder_arity
        )?;
        if self.truncated_bits > 0 {
            writeln!(
                f,
                "  truncation   {} bits, omitted weight {}",
                self.truncated_bits, self.omitted_weight
            )?;
        }
        writeln!(f, "  latency      {} cycle(s)", self.latency)?;
        write!(
            f,
            "  resources    {} LUTs, {} FFs, {} DSPs",
            self.resources.luts, self.resources.ffs, self.resources.dsp
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::generate;
    use tessera_config::{resolve_params, GeneratorConfig};
    use tessera_diagnostics::DiagnosticSink;

    #[test]
    fn report_counts_tiles_and_dsps() {
        let mut config = GeneratorConfig::for_widths(24, 24, 0, false);
        config.tiling.use_dsp = true;
        let params = resolve_params(&config).unwrap();
        let d = generate(&params, &DiagnosticSink::new()).unwrap();
        let r = d.report();
        assert_eq!(r.tile_count(), d.solution().len());
        assert_eq!(r.dsp_blocks, d.solution().dsp_count(d.collection()));
        assert_eq!(r.resources.dsp, r.dsp_blocks);
        assert!(r.resources.luts > 0);
        assert_eq!(r.final_adder_width, 48);
    }

    #[test]
    fn combinational_designs_have_no_registers() {
        let params = resolve_params(&GeneratorConfig::for_widths(8, 8, 0, false)).unwrap();
        let d = generate(&params, &DiagnosticSink::new()).unwrap();
        let r = d.report();
        assert_eq!(r.latency, 0);
        assert_eq!(r.resources.ffs, 0);
        let text = r.to_string();
        assert!(text.starts_with("IntMultiplier_8x8_16_u on "));
        assert!(text.contains("latency      0 cycle(s)"));
        assert!(!text.contains("truncation"));
    }

    #[test]
    fn report_serializes() {
        let params = resolve_params(&GeneratorConfig::for_widths(4, 4, 4, false)).unwrap();
        let d = generate(&params, &DiagnosticSink::new()).unwrap();
        let json = serde_json::to_value(d.report()).unwrap();
        assert_eq!(json["truncated_bits"], 4);
        assert_eq!(json["operator"], "IntMultiplier_4x4_4_u");
    }
}
