use crate::points::PointSet;
use glam::Vec4;

/// Per-point visibility produced by applying a filter query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityMask {
    bits: Vec<bool>,
}

impl VisibilityMask {
    /// Every point visible.
    pub fn all(n: usize) -> Self {
        Self {
            bits: vec![true; n],
        }
    }

    #[inline]
    pub fn is_visible(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    /// Whether a selector may consider point `i`. An empty mask is the
    /// "no filter" state and skips nothing.
    #[inline]
    pub fn allows(&self, i: usize) -> bool {
        self.bits.is_empty() || self.is_visible(i)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn any_visible(&self) -> bool {
        self.bits.iter().any(|b| *b)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

/// Build a mask from scratch: `i` is visible iff its label contains the
/// lower-cased query. The empty query keeps everything visible.
pub fn visibility_mask(query: &str, points: &PointSet) -> VisibilityMask {
    let needle = query.to_lowercase();
    let bits = points
        .labels()
        .iter()
        .map(|label| label.contains(needle.as_str()))
        .collect();
    VisibilityMask { bits }
}

/// Holds the active query plus the mask and display colors derived from it.
///
/// The point set itself is never touched; the derived state is replaced
/// wholesale on each [`FilterEngine::apply`].
#[derive(Clone, Debug, Default)]
pub struct FilterEngine {
    query: String,
    mask: VisibilityMask,
    display_colors: Vec<Vec4>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute visibility for `query` and return how many points remain visible.
    pub fn apply(&mut self, query: &str, points: &PointSet) -> usize {
        let mask = visibility_mask(query, points);
        let display_colors = points
            .colors()
            .iter()
            .zip(mask.as_slice())
            .map(|(c, visible)| if *visible { *c } else { c.truncate().extend(0.0) })
            .collect();
        let visible = mask.visible_count();

        self.query = query.to_lowercase();
        self.mask = mask;
        self.display_colors = display_colors;
        log::debug!(
            "[filter] query={:?} visible={}/{}",
            self.query,
            visible,
            points.len()
        );
        visible
    }

    /// Re-run the active query against a freshly loaded point set.
    pub fn reapply(&mut self, points: &PointSet) -> usize {
        let query = std::mem::take(&mut self.query);
        self.apply(&query, points)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// True when a non-empty query is in effect.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn mask(&self) -> &VisibilityMask {
        &self.mask
    }

    /// The mask the selector should honour; `None` means no filter is active.
    pub fn selection_mask(&self) -> Option<&VisibilityMask> {
        self.is_active().then_some(&self.mask)
    }

    pub fn display_colors(&self) -> &[Vec4] {
        &self.display_colors
    }

    /// Baseline alpha when visible, zero otherwise. Render-only.
    pub fn display_alpha(&self, i: usize) -> f32 {
        self.display_colors.get(i).map_or(0.0, |c| c.w)
    }
}
