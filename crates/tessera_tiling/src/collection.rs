//! The set of tiles usable for one multiplication.
//!
//! Built per call from the operand widths, the enabled tile families and
//! the target's hard multiplier shape. There is no process-wide catalog.

use crate::shape::{Parametrization, Signedness, TileShape};
use serde::{Deserialize, Serialize};
use tessera_arch::Target;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::TileFamilies;

/// Concrete tiles for a `wx x wy` grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileCollection {
    params: Vec<Parametrization>,
}

impl TileCollection {
    /// Enumerates every parametrization the enabled families allow.
    ///
    /// LUT tiles must fit inside the grid; hard multiplier tiles keep their
    /// native size and may overhang it when placed. The 1x1 tile is always
    /// present at index 0.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::NoTilesAvailable`] when neither LUT nor DSP
    /// tiles are enabled.
    pub fn build(
        wx: u32,
        wy: u32,
        signed: bool,
        families: &TileFamilies,
        target: &dyn Target,
    ) -> TesseraResult<Self> {
        if !families.any_enabled() {
            return Err(TesseraError::NoTilesAvailable { wx, wy });
        }
        let mut params = vec![Parametrization::rect(TileShape::LutSquare, 1, 1)];

        if families.use_lut {
            for k in [2, 3] {
                if k <= wx && k <= wy {
                    params.push(Parametrization::rect(TileShape::LutSquare, k, k));
                }
            }
            for k in 2..=wx {
                params.push(Parametrization::rect(TileShape::LutRow, k, 1));
            }
            for k in 2..=wy {
                let mut p = Parametrization::rect(TileShape::LutRow, 1, k);
                p.flipped = true;
                params.push(p);
            }
            if families.two_xk {
                if wx >= 2 {
                    for k in 3..=wy {
                        params.push(Parametrization::rect(TileShape::LutTwoByK, 2, k));
                    }
                }
                if wy >= 2 {
                    for k in 3..=wx {
                        let mut p = Parametrization::rect(TileShape::LutTwoByK, k, 2);
                        p.flipped = true;
                        params.push(p);
                    }
                }
            }
            if families.irregular {
                params.extend(irregular_tiles(wx, wy));
            }
        }

        if families.use_dsp {
            params.extend(dsp_tiles(signed, target));
            if families.super_tiles {
                params.extend(super_tiles(target));
            }
            if families.karatsuba && !signed {
                params.extend(karatsuba_tile(wx, wy, target));
            }
        }
        Ok(Self { params })
    }

    /// All parametrizations.
    pub fn params(&self) -> &[Parametrization] {
        &self.params
    }

    /// The parametrization at `index`.
    pub fn get(&self, index: usize) -> Option<&Parametrization> {
        self.params.get(index)
    }

    /// Number of parametrizations.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Always `false`: the 1x1 tile is always present.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Index of the 1x1 tile.
    pub fn unit(&self) -> usize {
        0
    }

    /// Number of parametrizations per family, in [`TileShape::ALL`] order.
    pub fn family_counts(&self) -> Vec<(TileShape, usize)> {
        TileShape::ALL
            .iter()
            .map(|&s| (s, self.params.iter().filter(|p| p.shape == s).count()))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

/// L-trominoes in their four orientations and the two 3x3 staircases.
fn irregular_tiles(wx: u32, wy: u32) -> Vec<Parametrization> {
    let mut out = Vec::new();
    if wx >= 2 && wy >= 2 {
        for (hole_x, hole_y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            out.push(Parametrization::masked(
                TileShape::LutIrregular,
                format!("lut-irregular_l{hole_x}{hole_y}"),
                2,
                2,
                move |x, y| (x, y) != (hole_x, hole_y),
            ));
        }
    }
    if wx >= 3 && wy >= 3 {
        out.push(Parametrization::masked(
            TileShape::LutIrregular,
            "lut-irregular_stair_lo",
            3,
            3,
            |x, y| x + y <= 2,
        ));
        out.push(Parametrization::masked(
            TileShape::LutIrregular,
            "lut-irregular_stair_hi",
            3,
            3,
            |x, y| x + y >= 2,
        ));
    }
    out
}

fn signedness_suffix(x: bool, y: bool) -> &'static str {
    match (x, y) {
        (false, false) => "uu",
        (true, false) => "su",
        (false, true) => "us",
        (true, true) => "ss",
    }
}

/// One hard multiplier per port signedness, in both orientations.
fn dsp_tiles(signed: bool, target: &dyn Target) -> Vec<Parametrization> {
    let combos: &[(bool, bool)] = if signed {
        &[(false, false), (true, false), (false, true), (true, true)]
    } else {
        &[(false, false)]
    };
    let mut out: Vec<Parametrization> = Vec::new();
    for &(sx, sy) in combos {
        let (w, h) = target.dsp_widths(sx, sy);
        let (fa, fb) = target.dsp_widths(sy, sx);
        for (width, height, flipped) in [(w, h, false), (fb, fa, true)] {
            if width == 0 || height == 0 {
                continue;
            }
            let duplicate = out.iter().any(|p| {
                p.width == width
                    && p.height == height
                    && p.signedness == (Signedness::Fixed { x: sx, y: sy })
            });
            if duplicate {
                continue;
            }
            let mut p = Parametrization::rect(TileShape::Dsp, width, height);
            p.name = format!("dsp_{width}x{height}_{}", signedness_suffix(sx, sy));
            p.dsp_units = 1;
            p.signedness = Signedness::Fixed { x: sx, y: sy };
            p.flipped = flipped;
            out.push(p);
        }
    }
    out
}

/// Pairs of unsigned hard multipliers whose second product enters the
/// first one's accumulator through the cascade shifted by the short port
/// width, so the offset between the blocks must sum to that shift.
fn super_tiles(target: &dyn Target) -> Vec<Parametrization> {
    let (w, h) = target.dsp_widths(false, false);
    let shift = w.min(h);
    let mut out = Vec::new();
    for (bw, bh) in [(w, h), (h, w)] {
        let mut offsets: Vec<(i64, i64)> = Vec::new();
        if bh == shift {
            offsets.push((0, i64::from(bh)));
        }
        if bw == shift {
            offsets.push((i64::from(bw), 0));
        }
        offsets.push((i64::from(bw), i64::from(shift) - i64::from(bw)));
        offsets.push((i64::from(shift) - i64::from(bh), i64::from(bh)));
        offsets.sort_unstable();
        offsets.dedup();
        for (dx, dy) in offsets {
            let ox = (-dx).max(0);
            let oy = (-dy).max(0);
            let (ax, ay) = (ox, oy);
            let (bx, by) = (ox + dx, oy + dy);
            let width = (ax + i64::from(bw)).max(bx + i64::from(bw)) as u32;
            let height = (ay + i64::from(bh)).max(by + i64::from(bh)) as u32;
            let inside = move |x: u32, y: u32, px: i64, py: i64| {
                let (x, y) = (i64::from(x), i64::from(y));
                x >= px && x < px + i64::from(bw) && y >= py && y < py + i64::from(bh)
            };
            let mut p = Parametrization::masked(
                TileShape::SuperTile,
                format!("super-tile_{bw}x{bh}_{dx}_{dy}"),
                width,
                height,
                move |x, y| inside(x, y, ax, ay) || inside(x, y, bx, by),
            );
            p.dsp_units = 2;
            p.signedness = Signedness::Fixed { x: false, y: false };
            p.flipped = bw != w;
            if !out.iter().any(|q: &Parametrization| q.mask == p.mask && q.width == p.width) {
                out.push(p);
            }
        }
    }
    out
}

/// A `2k x 2k` square from three blocks computing `a0*b0`, `a1*b1` and
/// `(a0+a1)*(b0+b1)`; the sums need one extra port bit.
fn karatsuba_tile(wx: u32, wy: u32, target: &dyn Target) -> Option<Parametrization> {
    let (w, h) = target.dsp_widths(false, false);
    let k = w.min(h).checked_sub(1)?;
    if k == 0 || 2 * k > wx || 2 * k > wy {
        return None;
    }
    let mut p = Parametrization::rect(TileShape::Karatsuba, 2 * k, 2 * k);
    p.dsp_units = 3;
    // Two k-bit pre-adders and two 2k-bit post-subtractors.
    p.extra_luts = f64::from(6 * k + 4);
    p.signedness = Signedness::Fixed { x: false, y: false };
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_arch::{load_target, TargetOptions};

    fn families(f: impl FnOnce(&mut TileFamilies)) -> TileFamilies {
        let mut fam = TileFamilies::lut_only();
        f(&mut fam);
        fam
    }

    #[test]
    fn no_family_is_an_error() {
        let t = load_target("artix7", "", TargetOptions::default()).unwrap();
        let fam = families(|f| f.use_lut = false);
        let err = TileCollection::build(8, 8, false, &fam, t.as_ref()).unwrap_err();
        assert_eq!(err, TesseraError::NoTilesAvailable { wx: 8, wy: 8 });
    }

    #[test]
    fn lut_tiles_fit_the_grid() {
        let t = load_target("artix7", "", TargetOptions::default()).unwrap();
        let c = TileCollection::build(4, 2, false, &TileFamilies::lut_only(), t.as_ref()).unwrap();
        assert!(c.get(c.unit()).unwrap().is_unit());
        assert!(c.params().iter().all(|p| p.width <= 4 && p.height <= 2));
        assert!(c.params().iter().any(|p| p.width == 2 && p.height == 2));
        assert!(!c.params().iter().any(|p| p.width == 3 && p.height == 3));
    }

    #[test]
    fn dsp_only_still_has_unit_tile() {
        let t = load_target("artix7", "", TargetOptions::default()).unwrap();
        let fam = families(|f| {
            f.use_lut = false;
            f.use_dsp = true;
        });
        let c = TileCollection::build(16, 16, false, &fam, t.as_ref()).unwrap();
        assert!(c.get(0).unwrap().is_unit());
        let dsps: Vec<_> = c.params().iter().filter(|p| p.shape == TileShape::Dsp).collect();
        assert_eq!(dsps.len(), 2);
        assert_eq!((dsps[0].width, dsps[0].height), (24, 17));
        assert_eq!((dsps[1].width, dsps[1].height), (17, 24));
    }

    #[test]
    fn signed_dsp_variants() {
        let t = load_target("artix7", "", TargetOptions::default()).unwrap();
        let fam = families(|f| f.use_dsp = true);
        let c = TileCollection::build(30, 30, true, &fam, t.as_ref()).unwrap();
        let ss = c
            .params()
            .iter()
            .find(|p| p.signedness == Signedness::Fixed { x: true, y: true } && !p.flipped)
            .unwrap();
        assert_eq!((ss.width, ss.height), (25, 18));
    }

    #[test]
    fn square_dsp_is_not_duplicated() {
        let t = load_target("cyclone_v", "", TargetOptions::default()).unwrap();
        let fam = families(|f| f.use_dsp = true);
        let c = TileCollection::build(30, 30, false, &fam, t.as_ref()).unwrap();
        assert_eq!(
            c.params().iter().filter(|p| p.shape == TileShape::Dsp).count(),
            1
        );
    }

    #[test]
    fn optional_families() {
        let t = load_target("artix7", "", TargetOptions::default()).unwrap();
        let fam = families(|f| {
            f.use_dsp = true;
            f.two_xk = true;
            f.irregular = true;
            f.super_tiles = true;
            f.karatsuba = true;
        });
        let c = TileCollection::build(40, 40, false, &fam, t.as_ref()).unwrap();
        let counts: std::collections::HashMap<_, _> = c.family_counts().into_iter().collect();
        assert_eq!(counts[&TileShape::LutIrregular], 6);
        assert!(counts[&TileShape::LutTwoByK] > 0);
        assert!(counts[&TileShape::SuperTile] >= 2);
        let kara = c
            .params()
            .iter()
            .find(|p| p.shape == TileShape::Karatsuba)
            .unwrap();
        assert_eq!((kara.width, kara.dsp_units), (32, 3));
        for p in c.params().iter().filter(|p| p.shape == TileShape::SuperTile) {
            assert_eq!(p.area(), 2 * 24 * 17, "{}", p.name);
        }
    }
}
