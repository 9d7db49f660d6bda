use crate::filter::VisibilityMask;
use crate::grid::{nearest_linear, GridIndex};
use crate::points::PointSet;
use glam::Vec2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Scan every point each query.
    #[default]
    Linear,
    /// Bucket grid rebuilt whenever a dataset loads.
    Grid,
}

/// Finds the closest visible point to the cursor, gated by a squared-distance threshold.
#[derive(Clone, Debug)]
pub struct NearestSelector {
    strategy: SearchStrategy,
    max_distance_sq: f32,
    grid: Option<GridIndex>,
}

impl Default for NearestSelector {
    fn default() -> Self {
        Self::new(SearchStrategy::Linear)
    }
}

impl NearestSelector {
    pub fn new(strategy: SearchStrategy) -> Self {
        Self {
            strategy,
            max_distance_sq: f32::INFINITY,
            grid: None,
        }
    }

    pub fn with_max_distance_sq(mut self, max_distance_sq: f32) -> Self {
        self.set_max_distance_sq(max_distance_sq);
        self
    }

    pub fn set_max_distance_sq(&mut self, max_distance_sq: f32) {
        self.max_distance_sq = if max_distance_sq.is_nan() {
            f32::INFINITY
        } else {
            max_distance_sq
        };
    }

    pub fn max_distance_sq(&self) -> f32 {
        self.max_distance_sq
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Refresh any spatial index for a newly loaded point set.
    pub fn rebuild(&mut self, points: &PointSet) {
        self.grid = match self.strategy {
            SearchStrategy::Linear => None,
            SearchStrategy::Grid => GridIndex::build(points),
        };
    }

    /// Closest visible point within the threshold.
    ///
    /// `mask = None` means no filter is active and nothing is skipped.
    /// Ties go to the lowest index. An empty result is a normal outcome.
    pub fn query(
        &self,
        cursor: Vec2,
        points: &PointSet,
        mask: Option<&VisibilityMask>,
    ) -> Option<usize> {
        self.nearest(cursor, points, mask).map(|(i, _)| i)
    }

    /// Like [`NearestSelector::query`] but also returns the squared distance.
    pub fn nearest(
        &self,
        cursor: Vec2,
        points: &PointSet,
        mask: Option<&VisibilityMask>,
    ) -> Option<(usize, f32)> {
        if cursor.is_nan() {
            return None;
        }
        match &self.grid {
            Some(grid) if grid.len() == points.len() => {
                grid.nearest(cursor, mask, self.max_distance_sq)
            }
            _ => nearest_linear(cursor, points.positions(), mask)
                .filter(|(_, d2)| *d2 <= self.max_distance_sq),
        }
    }
}

/// Current and previous frame's selection, used to detect change edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub current: Option<usize>,
    pub previous: Option<usize>,
}

impl SelectionState {
    /// Shift `current` into `previous` and store `next`.
    /// Returns true on a selection-change edge, including to or from `None`.
    pub fn update(&mut self, next: Option<usize>) -> bool {
        self.previous = self.current;
        self.current = next;
        self.changed()
    }

    #[inline]
    pub fn changed(&self) -> bool {
        self.current != self.previous
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
