//! Per-frame orchestration of filter, selector and scheduler.
//!
//! A [`Session`] owns all interaction state explicitly; front ends feed it
//! cursor positions and query notifications and read back what to render.

use crate::constants::{DEFAULT_SPLIT_STRING, DEFAULT_VIEWPORT_PX, SELECT_RADIUS_PX};
use crate::error::DataError;
use crate::filter::{FilterEngine, VisibilityMask};
use crate::points::PointSet;
use crate::selector::{NearestSelector, SearchStrategy, SelectionState};
use crate::sound::{AudioBackend, SchedulerParams, SoundScheduler, Trigger};
use crate::viewport::PlotViewport;
use glam::{Vec2, Vec4};
use instant::Instant;

#[derive(Clone, Debug)]
pub struct SessionParams {
    pub scheduler: SchedulerParams,
    pub strategy: SearchStrategy,
    /// Squared plot-space distance beyond which nothing is selected.
    pub max_select_distance_sq: f32,
    /// Separator used to break labels into display lines.
    pub split_string: String,
}

impl Default for SessionParams {
    fn default() -> Self {
        let viewport = PlotViewport::new(DEFAULT_VIEWPORT_PX[0], DEFAULT_VIEWPORT_PX[1]);
        Self {
            scheduler: SchedulerParams::default(),
            strategy: SearchStrategy::default(),
            max_select_distance_sq: viewport.select_threshold_sq(SELECT_RADIUS_PX),
            split_string: DEFAULT_SPLIT_STRING.to_owned(),
        }
    }
}

/// Single-slot pending value for the query text. Latest notification wins;
/// the frame consumes it once.
#[derive(Clone, Debug, Default)]
pub struct QueryInbox {
    pending: Option<String>,
}

impl QueryInbox {
    pub fn notify(&mut self, value: impl Into<String>) {
        self.pending = Some(value.into());
    }

    pub fn take(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// What one frame produced, for the renderer and for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOutput {
    pub selected: Option<usize>,
    pub edge: bool,
    pub trigger: Trigger,
    pub visible: usize,
    pub reclaimed: usize,
}

pub struct Session<B: AudioBackend> {
    points: PointSet,
    filter: FilterEngine,
    selector: NearestSelector,
    selection: SelectionState,
    scheduler: SoundScheduler<B>,
    inbox: QueryInbox,
    split_string: String,
    visible: usize,
}

impl<B: AudioBackend> Session<B> {
    pub fn new(backend: B, params: SessionParams) -> Self {
        let selector = NearestSelector::new(params.strategy)
            .with_max_distance_sq(params.max_select_distance_sq);
        Self {
            points: PointSet::empty(),
            filter: FilterEngine::new(),
            selector,
            selection: SelectionState::default(),
            scheduler: SoundScheduler::new(backend, params.scheduler),
            inbox: QueryInbox::default(),
            split_string: params.split_string,
            visible: 0,
        }
    }

    /// Replace the active dataset. The current query is re-applied, the
    /// spatial index rebuilt and outstanding playback stopped.
    pub fn load(&mut self, points: PointSet) -> usize {
        self.points = points;
        self.visible = self.filter.reapply(&self.points);
        self.selector.rebuild(&self.points);
        self.selection.reset();
        self.scheduler.clear();
        log::info!(
            "[dataset] loaded {} points ({} visible)",
            self.points.len(),
            self.visible
        );
        self.visible
    }

    /// Validate parallel arrays and load them. On mismatch the previous
    /// dataset stays active.
    pub fn load_arrays(
        &mut self,
        positions: Vec<Vec2>,
        colors: Vec<Vec4>,
        labels: Vec<String>,
        media_paths: Vec<String>,
    ) -> Result<usize, DataError> {
        let points = PointSet::load(positions, colors, labels, media_paths)?;
        Ok(self.load(points))
    }

    /// Queue a new query value; applied at the start of the next frame.
    pub fn notify_query(&mut self, value: impl Into<String>) {
        self.inbox.notify(value);
    }

    pub fn frame(&mut self, cursor: Vec2, now: Instant) -> FrameOutput {
        if let Some(query) = self.inbox.take() {
            self.visible = self.filter.apply(&query, &self.points);
        }

        let selected = self
            .selector
            .query(cursor, &self.points, self.filter.selection_mask());
        let edge = self.selection.update(selected);

        let trigger = if edge {
            let points = &self.points;
            self.scheduler
                .on_selection_change(selected, |i| points.media_path(i), now)
        } else {
            Trigger::Idle
        };
        let reclaimed = self.scheduler.tick(now);

        FrameOutput {
            selected,
            edge,
            trigger,
            visible: self.visible,
            reclaimed,
        }
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn filter(&self) -> &FilterEngine {
        &self.filter
    }

    pub fn mask(&self) -> &VisibilityMask {
        self.filter.mask()
    }

    pub fn display_colors(&self) -> &[Vec4] {
        self.filter.display_colors()
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn selector_mut(&mut self) -> &mut NearestSelector {
        &mut self.selector
    }

    pub fn scheduler(&self) -> &SoundScheduler<B> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SoundScheduler<B> {
        &mut self.scheduler
    }

    pub fn recent_media(&self) -> Option<&str> {
        self.scheduler.recent_media()
    }

    /// Label of point `i` broken on the split string, one entry per display line.
    pub fn label_lines(&self, i: usize) -> Vec<&str> {
        match self.points.label(i) {
            Some(label) if self.split_string.is_empty() => vec![label],
            Some(label) => label.split(self.split_string.as_str()).collect(),
            None => Vec::new(),
        }
    }
}
