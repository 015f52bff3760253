use crate::aggregation::MeanSpeedGrid;
use crate::report::ReportTable;
use crate::types::{
    Category, CategoryCounts, HistogramBin, PreviewConfig, TrackSpeed, TrajectoryPoint,
};
use std::collections::BTreeMap;

const RULE_WIDTH: usize = 100;

/// Print a preview of a report table
pub fn display_table(table: &ReportTable, preview: &PreviewConfig) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    match table.group() {
        Some(group) => println!("  {} ({})", table.name().to_uppercase(), group),
        None => println!("  {}", table.name().to_uppercase()),
    }
    println!("{}", "=".repeat(RULE_WIDTH));

    match table {
        ReportTable::Proportions(rows) => display_proportions(rows, preview),
        ReportTable::TrackSpeeds(rows) => display_track_speeds(rows, preview),
        ReportTable::Histogram(rows) => display_histogram(rows, preview),
        ReportTable::SpeedGrid { category, grid, .. } => display_grid(*category, grid, preview),
        ReportTable::Trajectories { points, .. } => display_points(points, preview),
    }

    println!("{}", "=".repeat(RULE_WIDTH));
}

fn display_proportions(rows: &[CategoryCounts], preview: &PreviewConfig) {
    let Some(first) = rows.first() else {
        println!("No groups to display");
        return;
    };
    let p = preview.precision;

    print!("{:<24}", "Group");
    for category in &first.categories {
        print!(" {:>16}", category.as_str());
    }
    println!(" {:>10}", "Tracks");
    println!("{}", "-".repeat(RULE_WIDTH));

    for row in rows {
        print!("{:<24}", row.group);
        for (count, proportion) in row.counts.iter().zip(row.proportions()) {
            print!(" {:>16}", count_cell(*count, proportion, p));
        }
        println!(" {:>10}", row.total());
    }
}

fn display_track_speeds(rows: &[TrackSpeed], preview: &PreviewConfig) {
    if rows.is_empty() {
        println!("No tracks to display");
        return;
    }
    let p = preview.precision;

    println!(
        "{:<24} {:<16} {:>8} {:>12} {:>12} {:>12}",
        "Group", "Category", "Tracks", "Mean", "Min", "Max"
    );
    println!("{}", "-".repeat(RULE_WIDTH));

    for summary in speed_summary(rows) {
        println!(
            "{:<24} {:<16} {:>8} {:>12.p$} {:>12.p$} {:>12.p$}",
            summary.group,
            summary.category.as_str(),
            summary.tracks,
            summary.mean,
            summary.min,
            summary.max,
            p = p
        );
    }

    println!("\n=== FIRST {} TRACKS ===", preview.rows);
    for row in rows.iter().take(preview.rows) {
        println!(
            "{:<24} {:<40} {:<16} {:>12.p$}",
            row.group,
            row.track_id,
            row.category.as_str(),
            row.mean_speed,
            p = p
        );
    }
    println!("Total tracks: {}", rows.len());
}

fn display_histogram(rows: &[HistogramBin], preview: &PreviewConfig) {
    let p = preview.precision;
    println!(
        "{:<24} {:<16} {:>24} {:>8} {:>10}",
        "Group", "Category", "Bin", "Count", "Percent"
    );
    println!("{}", "-".repeat(RULE_WIDTH));
    for row in rows.iter().filter(|r| r.count > 0).take(preview.rows) {
        println!(
            "{:<24} {:<16} {:>24} {:>8} {:>10.2}",
            row.group,
            row.category.as_str(),
            format!("[{:.p$}, {:.p$})", row.lower, row.upper, p = p),
            row.count,
            row.percent
        );
    }
    println!("Non-empty bins: {}", rows.iter().filter(|r| r.count > 0).count());
}

fn display_grid(category: Category, grid: &MeanSpeedGrid, preview: &PreviewConfig) {
    let p = preview.precision;
    let populated = grid.populated_cells();

    println!("Category: {}", category);
    println!("Grid: {} x {} cells (1 m)", grid.width(), grid.height());
    println!(
        "Populated cells: {} ({:.2}%)",
        populated,
        coverage_percent(grid)
    );
    println!("Samples: {}", grid.counts().iter().map(|&c| c as u64).sum::<u64>());
    match grid.speed_range() {
        Some((lo, hi)) => println!("Mean speed range: {:.p$} .. {:.p$} m/s", lo, hi, p = p),
        None => println!("Mean speed range: undefined (no samples)"),
    }
}

fn display_points(points: &[TrajectoryPoint], preview: &PreviewConfig) {
    let p = preview.precision;
    let mut per_category: BTreeMap<Category, usize> = BTreeMap::new();
    for point in points {
        *per_category.entry(point.category).or_default() += 1;
    }
    for (category, count) in &per_category {
        println!("{:<16} {:>12}", category.as_str(), count);
    }

    println!("\n=== FIRST {} POINTS ===", preview.rows);
    for point in points.iter().take(preview.rows) {
        println!(
            "{:<16} {:>14.p$} {:>14.p$}",
            point.category.as_str(),
            point.x,
            point.y,
            p = p
        );
    }
    println!("Total points: {}", points.len());
}

/// "count (proportion)"; a group with no tracks shows NaN proportions
fn count_cell(count: u64, proportion: f64, precision: usize) -> String {
    format!("{} ({:.p$})", count, proportion, p = precision)
}

#[derive(Debug, PartialEq)]
struct SpeedSummary<'a> {
    group: &'a str,
    category: Category,
    tracks: usize,
    mean: f64,
    min: f64,
    max: f64,
}

/// Track mean-speed statistics per (group, category), ordered by group then category
fn speed_summary(rows: &[TrackSpeed]) -> Vec<SpeedSummary<'_>> {
    // (count, sum, min, max)
    let mut stats: BTreeMap<(&str, Category), (usize, f64, f64, f64)> = BTreeMap::new();
    for row in rows {
        let e = stats
            .entry((row.group.as_str(), row.category))
            .or_insert((0, 0.0, f64::INFINITY, f64::NEG_INFINITY));
        e.0 += 1;
        e.1 += row.mean_speed;
        e.2 = e.2.min(row.mean_speed);
        e.3 = e.3.max(row.mean_speed);
    }

    stats
        .into_iter()
        .map(|((group, category), (tracks, sum, min, max))| SpeedSummary {
            group,
            category,
            tracks,
            mean: sum / tracks as f64,
            min,
            max,
        })
        .collect()
}

fn coverage_percent(grid: &MeanSpeedGrid) -> f64 {
    let cells = grid.width() * grid.height();
    100.0 * grid.populated_cells() as f64 / cells as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::SpeedGrid;
    use crate::types::MapBoundary;

    fn speed(group: &str, track_id: &str, category: Category, mean_speed: f64) -> TrackSpeed {
        TrackSpeed {
            group: group.to_string(),
            track_id: track_id.to_string(),
            category,
            mean_speed,
        }
    }

    #[test]
    fn test_count_cell() {
        assert_eq!(count_cell(3, 0.75, 3), "3 (0.750)");
        assert_eq!(count_cell(0, f64::NAN, 2), "0 (NaN)");
    }

    #[test]
    fn test_speed_summary_groups_tracks() {
        let rows = vec![
            speed("pittsburgh", "c", Category::Pedestrian, 1.5),
            speed("boston", "a", Category::Vehicle, 4.0),
            speed("boston", "b", Category::Vehicle, 8.0),
        ];
        let summary = speed_summary(&rows);

        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary[0],
            SpeedSummary {
                group: "boston",
                category: Category::Vehicle,
                tracks: 2,
                mean: 6.0,
                min: 4.0,
                max: 8.0,
            }
        );
        assert_eq!(summary[1].group, "pittsburgh");
        assert_eq!(summary[1].tracks, 1);
        assert!(speed_summary(&[]).is_empty());
    }

    #[test]
    fn test_grid_coverage() {
        let mut grid = SpeedGrid::new(&MapBoundary::new(0.0, 4.0, 0.0, 5.0)).unwrap();
        assert!(grid.accumulate(0.5, 0.5, 2.0));
        assert!(grid.accumulate(3.5, 4.5, 2.0));
        assert!(grid.accumulate(3.2, 4.1, 6.0));
        assert_eq!(coverage_percent(&grid.finalize()), 10.0);
    }

    #[test]
    fn test_display_every_table() {
        let preview = PreviewConfig { rows: 2, precision: 1 };
        let grid = SpeedGrid::new(&MapBoundary::new(0.0, 2.0, 0.0, 2.0)).unwrap().finalize();
        let tables = vec![
            ReportTable::Proportions(vec![]),
            ReportTable::TrackSpeeds(vec![speed("boston", "a", Category::Bicycle, 3.0)]),
            ReportTable::Histogram(vec![]),
            ReportTable::SpeedGrid { group: "boston".into(), category: Category::Vehicle, grid },
            ReportTable::Trajectories { group: "boston".into(), points: vec![] },
        ];
        for table in &tables {
            display_table(table, &preview);
        }
    }
}
