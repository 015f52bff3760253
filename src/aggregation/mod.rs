pub mod grid;

pub use grid::{MeanSpeedGrid, SpeedGrid};

use crate::error::AnalysisError;
use crate::types::{
    Category, CategoryCounts, Group, HistogramBin, MapBoundary, TrackSpeed, TrajectoryPoint,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Count the group's tracks per requested category, in the requested order.
pub fn count_by_category(group: &Group, categories: &[Category]) -> CategoryCounts {
    let mut counts = vec![0u64; categories.len()];
    for category in group.tracks.categories() {
        if let Some(i) = categories.iter().position(|c| *c == category) {
            counts[i] += 1;
        }
    }

    CategoryCounts {
        group: group.name.clone(),
        categories: categories.to_vec(),
        counts,
    }
}

/// Mean of per-frame speed for every track that has at least one frame.
///
/// Tracks are emitted sorted by id. A record whose track is missing from the
/// index aborts the whole pass.
pub fn mean_speed_per_track(group: &Group) -> Result<Vec<TrackSpeed>, AnalysisError> {
    let mut frames: BTreeMap<&str, (f64, u32)> = BTreeMap::new();
    for record in &group.records {
        let entry = frames.entry(record.track_id.as_str()).or_insert((0.0, 0));
        entry.0 += record.speed();
        entry.1 += 1;
    }

    frames
        .into_iter()
        .map(|(track_id, (sum, count))| {
            Ok(TrackSpeed {
                group: group.name.clone(),
                track_id: track_id.to_string(),
                category: group.tracks.resolve(track_id)?,
                mean_speed: sum / count as f64,
            })
        })
        .collect()
}

/// Bin the speeds of one category into one-metre cells over the map extent.
pub fn build_speed_grid(
    boundary: &MapBoundary,
    group: &Group,
    target: Category,
) -> Result<MeanSpeedGrid, AnalysisError> {
    let mut grid = SpeedGrid::new(boundary)?;
    let mut kept = 0usize;
    let mut dropped = 0usize;

    for record in &group.records {
        if group.tracks.resolve(&record.track_id)? != target {
            continue;
        }
        if grid.accumulate(record.x, record.y, record.speed()) {
            kept += 1;
        } else {
            dropped += 1;
        }
    }

    debug!(
        "Speed grid for {} ({}): {} samples kept, {} outside the map",
        group.name, target, kept, dropped
    );

    Ok(grid.finalize())
}

/// Every observed position tagged with its track's category.
pub fn trajectory_points(group: &Group) -> Result<Vec<TrajectoryPoint>, AnalysisError> {
    group
        .records
        .iter()
        .map(|r| {
            Ok(TrajectoryPoint {
                category: group.tracks.resolve(&r.track_id)?,
                x: r.x,
                y: r.y,
            })
        })
        .collect()
}

/// Percent histograms of mean speed, one set of bins per group.
///
/// Bin edges are shared by all categories of a group and span the group's
/// speed range. Percentages are relative to the group's track count, so the
/// bars of all categories in a group add up to 100.
pub fn speed_histogram(
    speeds: &[TrackSpeed],
    bins: usize,
) -> Result<Vec<HistogramBin>, AnalysisError> {
    if bins == 0 {
        return Err(AnalysisError::InvalidBinCount);
    }

    // Groups in first-seen order
    let mut groups: Vec<&str> = Vec::new();
    for s in speeds {
        if !groups.contains(&s.group.as_str()) {
            groups.push(&s.group);
        }
    }

    let mut out = Vec::new();
    for group in groups {
        let members: Vec<&TrackSpeed> = speeds.iter().filter(|s| s.group == group).collect();
        let lo = members.iter().map(|s| s.mean_speed).fold(f64::INFINITY, f64::min);
        let mut hi = members.iter().map(|s| s.mean_speed).fold(f64::NEG_INFINITY, f64::max);
        if hi <= lo {
            hi = lo + 1.0;
        }
        let width = (hi - lo) / bins as f64;
        let total = members.len() as f64;

        let mut per_category: BTreeMap<Category, Vec<u64>> = BTreeMap::new();
        for s in &members {
            let idx = (((s.mean_speed - lo) / width).floor() as usize).min(bins - 1);
            per_category.entry(s.category).or_insert_with(|| vec![0; bins])[idx] += 1;
        }

        for (category, counts) in per_category {
            for (i, count) in counts.into_iter().enumerate() {
                out.push(HistogramBin {
                    group: group.to_string(),
                    category,
                    lower: lo + width * i as f64,
                    upper: lo + width * (i + 1) as f64,
                    count,
                    percent: 100.0 * count as f64 / total,
                });
            }
        }
    }

    Ok(out)
}

/// Category counts for several groups, computed in parallel, one row per group.
pub fn class_proportions(groups: &[Group], categories: &[Category]) -> Vec<CategoryCounts> {
    groups
        .par_iter()
        .map(|g| count_by_category(g, categories))
        .collect()
}

/// Per-track mean speeds across groups, rows kept in group order.
pub fn mean_speed_distribution(groups: &[Group]) -> Result<Vec<TrackSpeed>, AnalysisError> {
    let per_group = groups
        .par_iter()
        .map(mean_speed_per_track)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(per_group.into_iter().flatten().collect())
}
