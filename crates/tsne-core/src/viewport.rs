use glam::Vec2;

/// Window-to-plot mapping: the plot is a square with side equal to the
/// window height, centred horizontally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotViewport {
    pub width: f32,
    pub height: f32,
}

impl PlotViewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn side(&self) -> f32 {
        self.height.max(1.0)
    }

    #[inline]
    pub fn offset_x(&self) -> f32 {
        (self.width - self.side()) / 2.0
    }

    /// Window pixels to plot-local coordinates.
    #[inline]
    pub fn to_plot(&self, px: Vec2) -> Vec2 {
        (px - Vec2::new(self.offset_x(), 0.0)) / self.side()
    }

    #[inline]
    pub fn to_pixels(&self, plot: Vec2) -> Vec2 {
        plot * self.side() + Vec2::new(self.offset_x(), 0.0)
    }

    /// A pixel radius as a squared plot-space distance threshold.
    #[inline]
    pub fn select_threshold_sq(&self, radius_px: f32) -> f32 {
        let r = radius_px / self.side();
        r * r
    }
}
