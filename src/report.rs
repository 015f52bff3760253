use crate::aggregation::{
    build_speed_grid, class_proportions, mean_speed_distribution, speed_histogram,
    trajectory_points, MeanSpeedGrid,
};
use crate::error::AnalysisError;
use crate::types::{
    Category, CategoryCounts, Config, Group, HistogramBin, Report, TrackSpeed, TrajectoryPoint,
};
use rayon::prelude::*;
use tracing::info;

/// One output table produced by a report
#[derive(Debug, Clone)]
pub enum ReportTable {
    Proportions(Vec<CategoryCounts>),
    TrackSpeeds(Vec<TrackSpeed>),
    Histogram(Vec<HistogramBin>),
    SpeedGrid {
        group: String,
        category: Category,
        grid: MeanSpeedGrid,
    },
    Trajectories {
        group: String,
        points: Vec<TrajectoryPoint>,
    },
}

impl ReportTable {
    pub fn name(&self) -> &'static str {
        match self {
            ReportTable::Proportions(_) => "proportions",
            ReportTable::TrackSpeeds(_) => "track-speeds",
            ReportTable::Histogram(_) => "histogram",
            ReportTable::SpeedGrid { .. } => "grid",
            ReportTable::Trajectories { .. } => "points",
        }
    }

    /// Group the table is restricted to, if any
    pub fn group(&self) -> Option<&str> {
        match self {
            ReportTable::SpeedGrid { group, .. } | ReportTable::Trajectories { group, .. } => {
                Some(group.as_str())
            }
            _ => None,
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            ReportTable::Proportions(rows) => rows.len(),
            ReportTable::TrackSpeeds(rows) => rows.len(),
            ReportTable::Histogram(rows) => rows.len(),
            ReportTable::SpeedGrid { grid, .. } => grid.values().len(),
            ReportTable::Trajectories { points, .. } => points.len(),
        }
    }
}

/// Run the configured report over already loaded groups.
pub fn run_report(config: &Config, groups: &[Group]) -> Result<Vec<ReportTable>, AnalysisError> {
    info!("Running {} report over {} groups", config.report, groups.len());

    let tables = match config.report {
        Report::ClassProportion => {
            vec![ReportTable::Proportions(class_proportions(groups, &config.categories))]
        }
        Report::MeanSpeed => {
            let speeds = mean_speed_distribution(groups)?;
            let histogram = speed_histogram(&speeds, config.histogram_bins)?;
            vec![ReportTable::TrackSpeeds(speeds), ReportTable::Histogram(histogram)]
        }
        Report::SpeedGrid => {
            let boundary = config.map_boundary.ok_or(AnalysisError::MissingBoundary)?;
            let target = config.target_category;
            groups
                .par_iter()
                .map(|g| {
                    build_speed_grid(&boundary, g, target).map(|grid| ReportTable::SpeedGrid {
                        group: g.name.clone(),
                        category: target,
                        grid,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        Report::Trajectories => groups
            .par_iter()
            .map(|g| {
                trajectory_points(g).map(|points| ReportTable::Trajectories {
                    group: g.name.clone(),
                    points,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(tables)
}
