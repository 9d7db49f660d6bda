//! On-disk dataset layout.
//!
//! A source directory holds `filenames.txt` (one media path per line),
//! an optional `searchable.txt` (one label per line, aligned with the
//! filenames) and a `tsne/` directory of `.tsv`/`.tsne` files that pair up
//! as (2D positions, 3D colors) when sorted by name.

use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use glam::{Vec2, Vec4};
use std::path::{Path, PathBuf};
use tsne_core::{DataError, PointSet};

const FILENAMES: &str = "filenames.txt";
const SEARCHABLE: &str = "searchable.txt";
const TSNE_DIR: &str = "tsne";
const TSNE_EXTENSIONS: [&str; 2] = ["tsv", "tsne"];

/// Media paths in dataset order. Blank lines are skipped.
pub fn parse_media_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One lower-cased label per line. Interior blank lines are kept since
/// they still stand for a point; trailing ones are dropped.
pub fn parse_searchable(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = text
        .lines()
        .map(|l| l.trim_end_matches('\r').to_lowercase())
        .collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    labels
}

/// Label each path by its components after the first `path_offset`.
pub fn derive_labels(paths: &[String], split: &str, path_offset: usize) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            if split.is_empty() {
                return p.to_lowercase();
            }
            let parts: Vec<&str> = p.split(split).collect();
            let start = path_offset.min(parts.len());
            parts[start..].join(split).to_lowercase()
        })
        .collect()
}

fn parse_floats<const N: usize>(text: &str) -> Result<Vec<[f32; N]>, DataError> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut values = [0.0f32; N];
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());
        for slot in values.iter_mut() {
            let token = tokens.next().ok_or_else(|| DataError::Parse {
                line: n + 1,
                reason: format!("expected {} values in {:?}", N, line),
            })?;
            *slot = token.parse().map_err(|e| DataError::Parse {
                line: n + 1,
                reason: format!("{token:?}: {e}"),
            })?;
        }
        out.push(values);
    }
    Ok(out)
}

/// 2D plot positions, one `x y` pair per non-blank line.
pub fn parse_positions(text: &str) -> Result<Vec<Vec2>, DataError> {
    Ok(parse_floats::<2>(text)?.into_iter().map(Vec2::from).collect())
}

/// 3D embedding coordinates as opaque RGB colors.
pub fn parse_colors(text: &str) -> Result<Vec<Vec4>, DataError> {
    Ok(parse_floats::<3>(text)?
        .into_iter()
        .map(|[r, g, b]| Vec4::new(r, g, b, 1.0))
        .collect())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetFiles {
    pub name: String,
    pub positions: PathBuf,
    pub colors: PathBuf,
}

/// Sorted t-SNE files, consumed two at a time.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    files: Vec<PathBuf>,
}

impl Catalog {
    pub fn scan(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list t-SNE directory: {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if path.is_file() && TSNE_EXTENSIONS.contains(&ext) {
                files.push(path);
            }
        }
        Ok(Self::from_files(files))
    }

    pub fn from_files(mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The pair for dataset `offset`, wrapping around the catalog.
    pub fn pair(&self, offset: usize) -> Option<DatasetFiles> {
        if self.is_empty() {
            return None;
        }
        let i = offset.wrapping_mul(2) % self.files.len();
        let positions = self.files.get(i)?.clone();
        let colors = self.files.get(i + 1)?.clone();
        let stem = positions
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Some(DatasetFiles {
            name: stem.replace(".2d", ""),
            positions,
            colors,
        })
    }
}

/// Media list, labels and t-SNE catalog for one source directory.
#[derive(Clone, Debug)]
pub struct Library {
    media: Vec<String>,
    labels: Vec<String>,
    catalog: Catalog,
}

impl Library {
    pub fn open(settings: &Settings) -> Result<Self> {
        let source = &settings.source;
        let filenames = source.join(FILENAMES);
        let text = std::fs::read_to_string(&filenames)
            .with_context(|| format!("Failed to read media list: {}", filenames.display()))?;
        let media = parse_media_list(&text);

        let searchable = source.join(SEARCHABLE);
        let labels = if searchable.exists() {
            let text = std::fs::read_to_string(&searchable)
                .with_context(|| format!("Failed to read labels: {}", searchable.display()))?;
            parse_searchable(&text)
        } else {
            derive_labels(&media, &settings.split_string, settings.path_offset)
        };

        let catalog = Catalog::scan(&source.join(TSNE_DIR))?;
        if catalog.len() < 2 {
            bail!(
                "need at least one 2D/3D file pair under {}, found {} files",
                source.join(TSNE_DIR).display(),
                catalog.len()
            );
        }
        log::info!(
            "[dataset] {} media files, {} labels, {} t-SNE files",
            media.len(),
            labels.len(),
            catalog.len()
        );
        Ok(Self {
            media,
            labels,
            catalog,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read and validate dataset `offset`. Nothing is swapped in on error.
    pub fn load(&self, offset: usize) -> Result<(String, PointSet)> {
        let files = self
            .catalog
            .pair(offset)
            .with_context(|| format!("no 2D/3D pair for dataset {offset}"))?;
        log::info!(
            "[dataset] {} of {}: {} + {}",
            offset.wrapping_mul(2) % self.catalog.len(),
            self.catalog.len(),
            files.positions.display(),
            files.colors.display()
        );
        let positions = read_with(&files.positions, parse_positions)?;
        let colors = read_with(&files.colors, parse_colors)?;
        let points = PointSet::load(positions, colors, self.labels.clone(), self.media.clone())
            .with_context(|| format!("dataset {} is misaligned", files.name))?;
        Ok((files.name, points))
    }
}

fn read_with<T>(path: &Path, parse: fn(&str) -> Result<T, DataError>) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
