//! Uniform bucket grid over 2D plot positions.
//!
//! Points are bucketed into square cells in CSR layout (`cell_offsets` into
//! `point_indices`), with indices ascending inside every cell. Queries
//! expand ring by ring around the cursor cell and stop once the
//! conservative lower bound of the next ring exceeds the best distance, so
//! results match a linear scan exactly, including the lowest-index
//! tie-break.

use crate::constants::{GRID_MAX_CELLS_PER_AXIS, GRID_POINTS_PER_CELL};
use crate::filter::VisibilityMask;
use crate::points::PointSet;
use glam::Vec2;

#[derive(Clone, Debug)]
pub struct GridIndex {
    origin: Vec2,
    cell: f32,
    cols: usize,
    rows: usize,
    /// Start of each cell in `point_indices`, plus the final length.
    cell_offsets: Vec<u32>,
    point_indices: Vec<u32>,
    positions: Vec<Vec2>,
}

impl GridIndex {
    /// Bucket the positions of `points`; `None` when there is nothing to index.
    pub fn build(points: &PointSet) -> Option<Self> {
        let (lo, hi) = points.bounds()?;
        let positions = points.positions();
        if !lo.is_finite() || !hi.is_finite() {
            log::warn!("[select] non-finite positions; grid index disabled");
            return None;
        }
        let extent = hi - lo;
        let cell = cell_size(extent, positions.len());
        let cols = (extent.x / cell) as usize + 1;
        let rows = (extent.y / cell) as usize + 1;

        let cell_of = |p: Vec2| -> usize {
            let c = ((p - lo) / cell).floor();
            let cx = (c.x.max(0.0) as usize).min(cols - 1);
            let cy = (c.y.max(0.0) as usize).min(rows - 1);
            cy * cols + cx
        };

        let mut counts = vec![0u32; cols * rows + 1];
        for p in positions {
            counts[cell_of(*p) + 1] += 1;
        }
        for i in 1..counts.len() {
            counts[i] += counts[i - 1];
        }
        let cell_offsets = counts.clone();
        let mut cursor = counts;
        let mut point_indices = vec![0u32; positions.len()];
        for (i, p) in positions.iter().enumerate() {
            let c = cell_of(*p);
            point_indices[cursor[c] as usize] = i as u32;
            cursor[c] += 1;
        }

        log::debug!(
            "[select] grid {}x{} cell={:.4} points={}",
            cols,
            rows,
            cell,
            positions.len()
        );
        Some(Self {
            origin: lo,
            cell,
            cols,
            rows,
            cell_offsets,
            point_indices,
            positions: positions.to_vec(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Nearest visible point as `(index, distance²)`, ignoring any threshold
    /// beyond `limit_sq` (points farther than that are never reported).
    pub fn nearest(
        &self,
        cursor: Vec2,
        mask: Option<&VisibilityMask>,
        limit_sq: f32,
    ) -> Option<(usize, f32)> {
        let c = ((cursor - self.origin) / self.cell).floor();
        let reach = (GRID_MAX_CELLS_PER_AXIS * 2) as f32;
        if !(c.x.abs() <= reach + self.cols as f32 && c.y.abs() <= reach + self.rows as f32) {
            // Far outside the indexed area; a scan is as cheap as the rings.
            return nearest_linear(cursor, &self.positions, mask)
                .filter(|(_, d2)| *d2 <= limit_sq);
        }
        let (kx, ky) = (c.x as i64, c.y as i64);
        let (cols, rows) = (self.cols as i64, self.rows as i64);

        let gap_x = (-kx).max(kx - (cols - 1)).max(0);
        let gap_y = (-ky).max(ky - (rows - 1)).max(0);
        let first_ring = gap_x.max(gap_y);
        let last_ring = kx.max(cols - 1 - kx).max(ky).max(rows - 1 - ky);

        let mut best: Option<(usize, f32)> = None;
        for r in first_ring..=last_ring {
            if r >= 2 {
                let lb = ((r - 1) as f32 - 1e-3) * self.cell;
                let lb_sq = lb * lb;
                if lb_sq > limit_sq {
                    break;
                }
                if let Some((_, bd)) = best {
                    if lb_sq > bd {
                        break;
                    }
                }
            }
            self.visit_ring(kx, ky, r, |i| {
                if mask.is_some_and(|m| !m.allows(i)) {
                    return;
                }
                let d2 = self.positions[i].distance_squared(cursor);
                match best {
                    Some((bi, bd)) if d2 > bd || (d2 == bd && i > bi) => {}
                    _ => best = Some((i, d2)),
                }
            });
        }
        best.filter(|(_, d2)| *d2 <= limit_sq)
    }

    fn visit_ring(&self, kx: i64, ky: i64, r: i64, mut f: impl FnMut(usize)) {
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        let mut visit_cell = |x: i64, y: i64| {
            let c = (y * cols + x) as usize;
            let (start, end) = (self.cell_offsets[c] as usize, self.cell_offsets[c + 1] as usize);
            for &i in &self.point_indices[start..end] {
                f(i as usize);
            }
        };
        if r == 0 {
            if (0..cols).contains(&kx) && (0..rows).contains(&ky) {
                visit_cell(kx, ky);
            }
            return;
        }
        let x0 = (kx - r).max(0);
        let x1 = (kx + r).min(cols - 1);
        for y in [ky - r, ky + r] {
            if (0..rows).contains(&y) {
                for x in x0..=x1 {
                    visit_cell(x, y);
                }
            }
        }
        let y0 = (ky - r + 1).max(0);
        let y1 = (ky + r - 1).min(rows - 1);
        for x in [kx - r, kx + r] {
            if (0..cols).contains(&x) {
                for y in y0..=y1 {
                    visit_cell(x, y);
                }
            }
        }
    }
}

/// Nearest visible point by exhaustive scan, ties to the lowest index.
pub fn nearest_linear(
    cursor: Vec2,
    positions: &[Vec2],
    mask: Option<&VisibilityMask>,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, p) in positions.iter().enumerate() {
        if mask.is_some_and(|m| !m.allows(i)) {
            continue;
        }
        let d2 = p.distance_squared(cursor);
        match best {
            Some((_, bd)) if d2 >= bd => {}
            _ => best = Some((i, d2)),
        }
    }
    best
}

fn cell_size(extent: Vec2, n: usize) -> f32 {
    let target_cells = (n as f32 / GRID_POINTS_PER_CELL).max(1.0);
    let span = extent.max(Vec2::splat(f32::EPSILON));
    let mut cell = (span.x * span.y / target_cells).sqrt();
    let max_cells = (GRID_MAX_CELLS_PER_AXIS - 1) as f32;
    cell = cell.max(extent.x / max_cells).max(extent.y / max_cells);
    if cell.is_finite() && cell > 0.0 {
        cell
    } else {
        1.0
    }
}
