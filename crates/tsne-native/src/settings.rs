use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tsne_core::{
    DEFAULT_PATH_OFFSET, DEFAULT_SPLIT_STRING, MAX_SOUNDS, PLAYBACK_GRACE_MS, SELECT_RADIUS_PX,
};

/// Contents of `settings.yml`. Missing keys fall back to [`Settings::default`];
/// unknown keys are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Dataset root holding `filenames.txt`, optional `searchable.txt` and `tsne/`.
    pub source: PathBuf,
    /// Leading path components dropped when deriving labels from file paths.
    pub path_offset: usize,
    pub split_string: String,
    pub max_sounds: usize,
    pub grace_ms: u64,
    #[serde(rename = "selectRadius")]
    pub select_radius_px: f32,
    pub spatial_index: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            path_offset: DEFAULT_PATH_OFFSET,
            split_string: DEFAULT_SPLIT_STRING.to_owned(),
            max_sounds: MAX_SOUNDS,
            grace_ms: PLAYBACK_GRACE_MS,
            select_radius_px: SELECT_RADIUS_PX,
            spatial_index: false,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid settings: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        // an empty or comment-only document is null
        let settings: Option<Self> = serde_yaml::from_str(text)?;
        let settings = settings.unwrap_or_default();
        log::debug!("[settings] {:?}", settings);
        Ok(settings)
    }
}
