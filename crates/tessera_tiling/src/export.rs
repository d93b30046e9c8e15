//! Tiling drawings.
//!
//! The grid is drawn the way multiplier tilings are usually shown: X grows
//! to the left, Y grows downward, so the least significant cell sits in the
//! top right corner. Optional cells left uncovered are hatched.

use crate::collection::TileCollection;
use crate::grid::ProductGrid;
use crate::shape::TileShape;
use crate::solution::Solution;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tessera_common::{TesseraError, TesseraResult};

const CELL: u32 = 16;
const MARGIN: u32 = 8;

fn fill(shape: TileShape) -> &'static str {
    match shape {
        TileShape::LutSquare => "#9ecae1",
        TileShape::LutRow => "#c6dbef",
        TileShape::LutTwoByK => "#6baed6",
        TileShape::LutIrregular => "#a1d99b",
        TileShape::Dsp => "#fdae6b",
        TileShape::SuperTile => "#fd8d3c",
        TileShape::Karatsuba => "#e6550d",
    }
}

/// Renders the solution as a standalone SVG document.
///
/// # Errors
///
/// Fails if a placement does not project onto the grid.
pub fn to_svg(
    solution: &Solution,
    collection: &TileCollection,
    grid: &ProductGrid,
) -> TesseraResult<String> {
    let (wx, wy) = (grid.wx(), grid.wy());
    let width = wx * CELL + 2 * MARGIN;
    let height = wy * CELL + 2 * MARGIN;
    let px = |x: u32| MARGIN + (wx - 1 - x) * CELL;
    let py = |y: u32| MARGIN + y * CELL;

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(
        out,
        r##"<defs><pattern id="hatch" width="4" height="4" patternUnits="userSpaceOnUse"><path d="M0,4 L4,0" stroke="#999" stroke-width="1"/></pattern></defs>"##
    );

    let coverage = solution.coverage(collection, grid)?;
    for (x, y) in grid.cells() {
        let style = if coverage[grid.index(x, y)] > 0 {
            continue;
        } else if grid.is_required(x, y) {
            r##"fill="#ff0000""##
        } else {
            r#"fill="url(#hatch)""#
        };
        let _ = writeln!(
            out,
            r##"<rect x="{}" y="{}" width="{CELL}" height="{CELL}" {style} stroke="#ccc"/>"##,
            px(x),
            py(y)
        );
    }

    for (placement, proj) in solution
        .placements()
        .iter()
        .zip(solution.projections(collection, grid)?)
    {
        let Some(param) = collection.get(placement.param) else {
            continue;
        };
        let _ = writeln!(out, r#"<g class="tile" id="tile_{}">"#, placement.id.as_raw());
        let _ = writeln!(
            out,
            "<title>{} @ ({}, {})</title>",
            param.name, placement.anchor_x, placement.anchor_y
        );
        for &(x, y) in &proj.cells {
            let _ = writeln!(
                out,
                r##"<rect x="{}" y="{}" width="{CELL}" height="{CELL}" fill="{}" stroke="#333" stroke-width="0.5"/>"##,
                px(x),
                py(y),
                fill(param.shape)
            );
        }
        if let Some(&(x, y)) = proj.cells.last() {
            let _ = writeln!(
                out,
                r#"<text x="{}" y="{}" font-size="8" font-family="monospace">{}</text>"#,
                px(x) + 2,
                py(y) + CELL - 4,
                placement.id.as_raw()
            );
        }
        out.push_str("</g>\n");
    }
    out.push_str("</svg>\n");
    Ok(out)
}

/// Renders the solution as a TikZ picture.
///
/// # Errors
///
/// Fails if a placement does not project onto the grid.
pub fn to_tex(
    solution: &Solution,
    collection: &TileCollection,
    grid: &ProductGrid,
) -> TesseraResult<String> {
    let (wx, wy) = (grid.wx(), grid.wy());
    let mut out = String::new();
    out.push_str("\\documentclass{standalone}\n\\usepackage{tikz}\n");
    out.push_str("\\usetikzlibrary{patterns}\n\\begin{document}\n");
    out.push_str("\\begin{tikzpicture}[x=3mm,y=-3mm]\n");
    let _ = writeln!(out, "\\draw[step=1,gray!30] (0,0) grid ({wx},{wy});");

    let coverage = solution.coverage(collection, grid)?;
    for (x, y) in grid.cells().filter(|&(x, y)| coverage[grid.index(x, y)] == 0) {
        let style = if grid.is_required(x, y) { "red" } else { "pattern=north east lines" };
        let _ = writeln!(out, "\\fill[{style}] ({},{}) rectangle +(1,1);", wx - 1 - x, y);
    }
    for (placement, proj) in solution
        .placements()
        .iter()
        .zip(solution.projections(collection, grid)?)
    {
        let Some(param) = collection.get(placement.param) else {
            continue;
        };
        let color = if param.shape.uses_dsp() { "orange!60" } else { "blue!30" };
        let _ = writeln!(
            out,
            "% {} at ({}, {})",
            param.name, placement.anchor_x, placement.anchor_y
        );
        for &(x, y) in &proj.cells {
            let _ = writeln!(
                out,
                "\\filldraw[fill={color},draw=black,very thin] ({},{}) rectangle +(1,1);",
                wx - 1 - x,
                y
            );
        }
    }
    out.push_str("\\end{tikzpicture}\n\\end{document}\n");
    Ok(out)
}

/// Writes `<stem>.svg` and `<stem>.tex` into `dir` and returns their
/// paths.
///
/// # Errors
///
/// Fails if a placement does not project onto the grid or a file cannot
/// be written.
pub fn write_exports(
    dir: &Path,
    stem: &str,
    solution: &Solution,
    collection: &TileCollection,
    grid: &ProductGrid,
) -> TesseraResult<Vec<PathBuf>> {
    let files = [
        (dir.join(format!("{stem}.svg")), to_svg(solution, collection, grid)?),
        (dir.join(format!("{stem}.tex")), to_tex(solution, collection, grid)?),
    ];
    let mut written = Vec::new();
    for (path, text) in files {
        std::fs::write(&path, text)
            .map_err(|e| TesseraError::config(format!("cannot write {}: {e}", path.display())))?;
        written.push(path);
    }
    Ok(written)
}
