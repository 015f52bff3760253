use trajectory_analysis::aggregation::{build_speed_grid, count_by_category, mean_speed_per_track};
use trajectory_analysis::sources::synthetic::SyntheticSource;
use trajectory_analysis::types::{Category, Group, MapBoundary, SyntheticModel};

use anyhow::{bail, Result};

fn check(ok: bool, what: String) -> bool {
    if ok {
        println!("✓ {}", what);
    } else {
        println!("✗ {}", what);
    }
    ok
}

fn main() -> Result<()> {
    let mut failures = 0usize;

    let models = vec![
        ("small", SyntheticModel { tracks: 20, frames: 40, extent: 50.0 }),
        ("dense", SyntheticModel { tracks: 500, frames: 20, extent: 100.0 }),
        ("long", SyntheticModel { tracks: 30, frames: 2000, extent: 300.0 }),
        ("empty", SyntheticModel { tracks: 0, frames: 10, extent: 10.0 }),
    ];

    for (seed, (name, model)) in models.into_iter().enumerate() {
        println!("\n=== Testing {} ===", name);

        let source = SyntheticSource::new(name.to_string(), model);
        let scene = source.generate_scene(Some(seed as u64))?;
        let mut group = Group::new(name);
        group.absorb(scene);

        let counts = count_by_category(&group, &Category::ALL);
        println!("Tracks: {}, records: {}", group.tracks.len(), group.records.len());

        let speeds = mean_speed_per_track(&group)?;
        let boundary = MapBoundary::new(0.0, model.extent, 0.0, model.extent);
        let grid = build_speed_grid(&boundary, &group, Category::Vehicle)?;
        let samples: u64 = grid.counts().iter().map(|&c| c as u64).sum();
        let vehicle_records = group
            .records
            .iter()
            .filter(|r| group.tracks.resolve(&r.track_id).ok() == Some(Category::Vehicle))
            .count();

        let checks = [
            check(
                counts.total() as usize == group.tracks.len(),
                format!("Category counts add up (total {})", counts.total()),
            ),
            check(
                speeds.iter().all(|s| s.mean_speed.is_finite()),
                format!("Mean speeds finite ({} tracks)", speeds.len()),
            ),
            check(
                model.frames == 0 || speeds.len() == group.tracks.len(),
                "Every track with frames reported".to_string(),
            ),
            check(
                samples as usize <= vehicle_records,
                format!(
                    "Grid kept {} of {} vehicle samples ({} populated cells)",
                    samples,
                    vehicle_records,
                    grid.populated_cells()
                ),
            ),
        ];
        failures += checks.iter().filter(|ok| !**ok).count();

        match grid.speed_range() {
            Some((lo, hi)) => println!("  Vehicle mean speed range: {:.3} .. {:.3} m/s", lo, hi),
            None => println!("  No vehicle samples on the map"),
        }
    }

    if failures > 0 {
        bail!("{} synthetic checks failed", failures);
    }
    println!("\nAll synthetic checks passed");
    Ok(())
}
