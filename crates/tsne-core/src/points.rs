//! Immutable per-load point storage.
//!
//! A [`PointSet`] owns four parallel arrays indexed by point: 2D plot
//! position, RGBA color derived from the 3D embedding, lower-cased
//! searchable label and opaque media path. The arrays never change length
//! after [`PointSet::load`]; filtering hides points without touching them.

use crate::error::DataError;
use glam::{Vec2, Vec4};

#[derive(Clone, Debug, Default)]
pub struct PointSet {
    positions: Vec<Vec2>,
    colors: Vec<Vec4>,
    labels: Vec<String>,
    media_paths: Vec<String>,
}

impl PointSet {
    /// The N = 0 set a session starts with before any dataset loads.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and take ownership of the parallel arrays.
    ///
    /// Fails with [`DataError::Mismatch`] when the lengths disagree. Labels
    /// are lower-cased here so substring filtering is case-insensitive no
    /// matter what the caller supplied.
    pub fn load(
        positions: Vec<Vec2>,
        colors: Vec<Vec4>,
        labels: Vec<String>,
        media_paths: Vec<String>,
    ) -> Result<Self, DataError> {
        let n = positions.len();
        if colors.len() != n || labels.len() != n || media_paths.len() != n {
            return Err(DataError::Mismatch {
                positions: n,
                colors: colors.len(),
                labels: labels.len(),
                media: media_paths.len(),
            });
        }
        let labels = labels.into_iter().map(|l| l.to_lowercase()).collect();
        Ok(Self {
            positions,
            colors,
            labels,
            media_paths,
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

    #[inline]
    pub fn position(&self, i: usize) -> Option<Vec2> {
        self.positions.get(i).copied()
    }

    #[inline]
    pub fn color(&self, i: usize) -> Option<Vec4> {
        self.colors.get(i).copied()
    }

    #[inline]
    pub fn label(&self, i: usize) -> Option<&str> {
        self.labels.get(i).map(String::as_str)
    }

    #[inline]
    pub fn media_path(&self, i: usize) -> Option<&str> {
        self.media_paths.get(i).map(String::as_str)
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.colors
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn media_paths(&self) -> &[String] {
        &self.media_paths
    }

    /// Axis-aligned bounds of all positions, `None` for an empty set.
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }
}
