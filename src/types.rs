use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Lidar sweep rate of the dataset, in frames per second
pub const FRAME_RATE_HZ: f64 = 20.0;

/// Bounded capacity of the scene channel between sources and the collector
pub const SCENE_CHANNEL_SIZE: usize = 32;

pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

/// Largest speed grid, in one-metre cells, a map boundary may describe
pub const MAX_GRID_CELLS: usize = 100_000_000;

/// Semantic class of a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vehicle,
    Bicycle,
    Pedestrian,
    TrafficCone,
    Barrier,
    CzoneSign,
    GenericObject,
}

impl Category {
    /// Every category in dataset order
    pub const ALL: [Category; 7] = [
        Category::Vehicle,
        Category::Bicycle,
        Category::Pedestrian,
        Category::TrafficCone,
        Category::Barrier,
        Category::CzoneSign,
        Category::GenericObject,
    ];

    /// Categories whose objects move, in reporting order
    pub const DYNAMIC: [Category; 4] = [
        Category::Vehicle,
        Category::Bicycle,
        Category::Pedestrian,
        Category::GenericObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vehicle => "vehicle",
            Category::Bicycle => "bicycle",
            Category::Pedestrian => "pedestrian",
            Category::TrafficCone => "traffic_cone",
            Category::Barrier => "barrier",
            Category::CzoneSign => "czone_sign",
            Category::GenericObject => "generic_object",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AnalysisError::UnknownCategory(s.to_string()))
    }
}

/// One per-frame observation of a tracked object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub track_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64, // carried through, never aggregated
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl ObjectRecord {
    /// Euclidean norm of the velocity vector
    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }
}

/// Maps track ids to their resolved category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackIndex {
    tracks: HashMap<String, Category>,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track_id: impl Into<String>, category: Category) {
        self.tracks.insert(track_id.into(), category);
    }

    /// Look up a track's category. A miss breaks referential integrity and is fatal.
    pub fn resolve(&self, track_id: &str) -> Result<Category, AnalysisError> {
        self.tracks
            .get(track_id)
            .copied()
            .ok_or_else(|| AnalysisError::UnknownTrack(track_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.tracks.values().copied()
    }

    pub fn extend(&mut self, other: TrackIndex) {
        self.tracks.extend(other.tracks);
    }
}

impl FromIterator<(String, Category)> for TrackIndex {
    fn from_iter<I: IntoIterator<Item = (String, Category)>>(iter: I) -> Self {
        Self { tracks: iter.into_iter().collect() }
    }
}

/// Contents of a single scenario database, tagged with the group it belongs to
#[derive(Debug, Clone, Default)]
pub struct SceneLog {
    pub group: String,
    pub tracks: TrackIndex,
    pub records: Vec<ObjectRecord>,
}

/// A named dataset partition (one location folder) aggregated on its own
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub name: String,
    pub tracks: TrackIndex,
    pub records: Vec<ObjectRecord>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Merge one scene into the group. Track tokens are unique across scenes.
    pub fn absorb(&mut self, scene: SceneLog) {
        self.tracks.extend(scene.tracks);
        self.records.extend(scene.records);
    }
}

/// Map extent in metres, used to size the speed grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBoundary {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl MapBoundary {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    /// Grid (width, height) in whole metres; both must be at least one cell
    pub fn dimensions(&self) -> Result<(usize, usize), AnalysisError> {
        let width = (self.x_max - self.x_min).floor();
        let height = (self.y_max - self.y_min).floor();
        if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
            return Err(AnalysisError::InvalidBoundary { width, height });
        }
        if width > MAX_GRID_CELLS as f64 || height > MAX_GRID_CELLS as f64 {
            return Err(AnalysisError::GridTooLarge { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        match w.checked_mul(h) {
            Some(cells) if cells <= MAX_GRID_CELLS => Ok((w, h)),
            _ => Err(AnalysisError::GridTooLarge { width, height }),
        }
    }
}

/// Track count per requested category for one group
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCounts {
    pub group: String,
    pub categories: Vec<Category>,
    pub counts: Vec<u64>,
}

impl CategoryCounts {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn get(&self, category: Category) -> Option<u64> {
        self.categories
            .iter()
            .position(|c| *c == category)
            .map(|i| self.counts[i])
    }

    /// Row-normalised counts. A zero row sum leaves every entry NaN.
    pub fn proportions(&self) -> Vec<f64> {
        let total = self.total() as f64;
        self.counts.iter().map(|&c| c as f64 / total).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSpeed {
    pub group: String,
    pub track_id: String,
    pub category: Category,
    pub mean_speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub category: Category,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub group: String,
    pub category: Category,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    ClassProportion,
    MeanSpeed,
    SpeedGrid,
    Trajectories,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::ClassProportion => write!(f, "class-proportion"),
            Report::MeanSpeed => write!(f, "mean-speed"),
            Report::SpeedGrid => write!(f, "speed-grid"),
            Report::Trajectories => write!(f, "trajectories"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Terminal preview settings, handed to the display layer explicitly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewConfig {
    pub rows: usize,
    pub precision: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { rows: 10, precision: 3 }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub sources: Vec<String>,
    pub report: Report,
    pub proportion: Option<f64>,
    pub seed: Option<u64>,
    pub map_boundary: Option<MapBoundary>,
    pub target_category: Category,
    pub categories: Vec<Category>,
    pub histogram_bins: usize,
    pub out_format: OutputFormat,
    pub output_dir: PathBuf,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticModel {
    pub tracks: usize,
    pub frames: usize,
    pub extent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Folder(String),
    Synthetic(SyntheticModel),
}

impl DataSource {
    /// Group name the source's scenes are filed under
    pub fn label(&self) -> String {
        match self {
            DataSource::Folder(name) => name.clone(),
            DataSource::Synthetic(m) => format!("synthetic-{}x{}", m.tracks, m.frames),
        }
    }
}
