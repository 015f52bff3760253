pub mod aggregation;
pub mod display;
pub mod error;
pub mod output;
pub mod report;
pub mod sampling;
pub mod sources;
pub mod types;

// Re-exports for library users
pub use aggregation::{
    build_speed_grid, count_by_category, mean_speed_per_track, speed_histogram,
    trajectory_points, MeanSpeedGrid, SpeedGrid,
};
pub use display::display_table;
pub use error::AnalysisError;
pub use output::OutputWriter;
pub use report::{run_report, ReportTable};
pub use sources::{create_source, RecordSource};
pub use types::{
    Category, CategoryCounts, Config, DataSource, Group, MapBoundary, ObjectRecord, Report,
    SceneLog, SyntheticModel, TrackIndex, TrackSpeed, DEFAULT_HISTOGRAM_BINS,
    SCENE_CHANNEL_SIZE,
};
