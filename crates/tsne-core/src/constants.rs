use std::time::Duration;

// Shared selection/playback tuning constants used by the core and the native frontend.

// Playback pool
pub const MAX_SOUNDS: usize = 32; // hard cap on simultaneously playing clips
pub const PLAYBACK_GRACE_MS: u64 = 1000; // a clip counts as finished after this long

// Interaction
pub const SELECT_RADIUS_PX: f32 = 100.0; // highlight only within this many pixels of the cursor
pub const DEFAULT_VIEWPORT_PX: [f32; 2] = [1024.0, 1024.0];

// Label handling
pub const DEFAULT_SPLIT_STRING: &str = "/";
pub const DEFAULT_PATH_OFFSET: usize = 0;

// Spatial index
pub const GRID_POINTS_PER_CELL: f32 = 4.0; // target bucket occupancy when sizing the grid
pub const GRID_MAX_CELLS_PER_AXIS: usize = 1024;

#[inline]
pub fn playback_grace() -> Duration {
    Duration::from_millis(PLAYBACK_GRACE_MS)
}
