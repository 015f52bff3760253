use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::mpsc;
use trajectory_analysis::aggregation::{count_by_category, mean_speed_per_track};
use trajectory_analysis::report::{run_report, ReportTable};
use trajectory_analysis::sources::create_source;
use trajectory_analysis::types::{
    Category, Config, DataSource, Group, MapBoundary, OutputFormat, PreviewConfig, Report,
    SceneLog, SyntheticModel,
};
use trajectory_analysis::OutputWriter;

/// Base test config builder
fn test_config(data_path: &Path, report: Report) -> Config {
    Config {
        data_path: data_path.to_path_buf(),
        sources: vec![],
        report,
        proportion: None,
        seed: Some(11),
        map_boundary: None,
        target_category: Category::Vehicle,
        categories: Category::DYNAMIC.to_vec(),
        histogram_bins: 5,
        out_format: OutputFormat::Parquet,
        output_dir: data_path.join("output"),
        preview: PreviewConfig::default(),
    }
}

/// One scenario database with `vehicles` vehicle tracks and one pedestrian track
fn write_scene_db(path: &Path, prefix: &str, vehicles: usize) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE category (token BLOB PRIMARY KEY, name TEXT);
         CREATE TABLE track (token BLOB PRIMARY KEY, category_token BLOB);
         CREATE TABLE lidar_box (token BLOB, track_token BLOB,
             x REAL, y REAL, z REAL, vx REAL, vy REAL, vz REAL);",
    )
    .unwrap();

    conn.execute("INSERT INTO category VALUES (?1, 'vehicle')", params![b"veh".to_vec()])
        .unwrap();
    conn.execute("INSERT INTO category VALUES (?1, 'pedestrian')", params![b"ped".to_vec()])
        .unwrap();

    let mut box_id = 0;
    let mut add_track = |track: String, category: &[u8], speed: f64| {
        conn.execute(
            "INSERT INTO track VALUES (?1, ?2)",
            params![track.as_bytes().to_vec(), category.to_vec()],
        )
        .unwrap();
        for frame in 0..3 {
            box_id += 1;
            conn.execute(
                "INSERT INTO lidar_box VALUES (?1, ?2, ?3, 2.5, 0.0, ?4, 0.0, 0.0)",
                params![
                    format!("box-{prefix}-{box_id}").into_bytes(),
                    track.as_bytes().to_vec(),
                    1.5 + frame as f64,
                    speed
                ],
            )
            .unwrap();
        }
    };

    for i in 0..vehicles {
        add_track(format!("{prefix}-v{i}"), b"veh", 10.0);
    }
    add_track(format!("{prefix}-p"), b"ped", 1.5);
}

async fn collect_scenes(config: &Config, source: DataSource) -> Group {
    let mut group = Group::new(source.label());
    let src = create_source(&source).await.unwrap();

    let (tx, mut rx) = mpsc::channel::<SceneLog>(8);
    let config_for_spawn = config.clone();
    let task = tokio::spawn(async move { src.fetch_scenes(&config_for_spawn, tx).await });

    while let Some(scene) = rx.recv().await {
        assert_eq!(scene.group, group.name);
        group.absorb(scene);
    }
    task.await.unwrap().unwrap();
    group
}

#[tokio::test]
async fn test_folder_source_merges_scenes() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("us-pa-pittsburgh");
    std::fs::create_dir(&folder).unwrap();
    write_scene_db(&folder.join("a.db"), "a", 2);
    write_scene_db(&folder.join("b.db"), "b", 3);
    std::fs::write(folder.join("README.txt"), "not a database").unwrap();

    let config = test_config(dir.path(), Report::ClassProportion);
    let group = collect_scenes(&config, DataSource::Folder("us-pa-pittsburgh".into())).await;

    // Counts accumulate across files
    let counts = count_by_category(&group, &Category::DYNAMIC);
    assert_eq!(counts.get(Category::Vehicle), Some(5));
    assert_eq!(counts.get(Category::Pedestrian), Some(2));
    assert_eq!(counts.total(), 7);

    let speeds = mean_speed_per_track(&group).unwrap();
    assert_eq!(speeds.len(), 7);
    assert!(speeds
        .iter()
        .all(|s| s.mean_speed == if s.category == Category::Vehicle { 10.0 } else { 1.5 }));
}

#[tokio::test]
async fn test_folder_source_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("sg-one-north");
    std::fs::create_dir(&folder).unwrap();
    for i in 0..4 {
        write_scene_db(&folder.join(format!("{i}.db")), &format!("s{i}"), 1);
    }

    let mut config = test_config(dir.path(), Report::ClassProportion);
    config.proportion = Some(0.5);
    let group = collect_scenes(&config, DataSource::Folder("sg-one-north".into())).await;

    // Two of four databases, two tracks each
    assert_eq!(group.tracks.len(), 4);
}

#[tokio::test]
async fn test_missing_folder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), Report::ClassProportion);

    let src = create_source(&DataSource::Folder("nowhere".into())).await.unwrap();
    let (tx, _rx) = mpsc::channel::<SceneLog>(1);
    assert!(src.fetch_scenes(&config, tx).await.is_err());
}

#[tokio::test]
async fn test_speed_grid_report_from_databases() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("boston");
    std::fs::create_dir(&folder).unwrap();
    write_scene_db(&folder.join("scene.db"), "x", 1);

    let mut config = test_config(dir.path(), Report::SpeedGrid);
    config.map_boundary = Some(MapBoundary::new(0.0, 4.0, 0.0, 4.0));
    let group = collect_scenes(&config, DataSource::Folder("boston".into())).await;

    let tables = run_report(&config, &[group]).unwrap();
    assert_eq!(tables.len(), 1);
    let ReportTable::SpeedGrid { grid, category, .. } = &tables[0] else {
        panic!("expected a grid table");
    };
    assert_eq!(*category, Category::Vehicle);
    // Frames at x = 1.5, 2.5, 3.5 on row y = 2
    assert_eq!(grid.value(1, 2), Some(10.0));
    assert_eq!(grid.value(3, 2), Some(10.0));
    assert_eq!(grid.value(0, 2), None);
    assert_eq!(grid.populated_cells(), 3);

    let path = OutputWriter::new().write_table(&config, &tables[0]).unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_synthetic_mean_speed_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), Report::MeanSpeed);
    config.out_format = OutputFormat::Csv;

    let model = SyntheticModel { tracks: 40, frames: 25, extent: 200.0 };
    let group = collect_scenes(&config, DataSource::Synthetic(model)).await;
    assert_eq!(group.tracks.len(), 40);
    assert_eq!(group.records.len(), 1000);

    let tables = run_report(&config, &[group]).unwrap();
    match &tables[..] {
        [ReportTable::TrackSpeeds(speeds), ReportTable::Histogram(bins)] => {
            assert_eq!(speeds.len(), 40);
            assert!(speeds.iter().all(|s| s.mean_speed.is_finite() && s.mean_speed >= 0.0));
            let percent: f64 = bins.iter().map(|b| b.percent).sum();
            assert!((percent - 100.0).abs() < 1e-6);
        }
        _ => panic!("unexpected tables"),
    }

    let writer = OutputWriter::new();
    for table in &tables {
        let path = writer.write_table(&config, table).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
    }
}

#[tokio::test]
async fn test_reports_are_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), Report::ClassProportion);

    let model = SyntheticModel { tracks: 25, frames: 5, extent: 50.0 };
    let a = collect_scenes(&config, DataSource::Synthetic(model)).await;
    let b = collect_scenes(&config, DataSource::Synthetic(model)).await;

    assert_eq!(
        count_by_category(&a, &Category::ALL),
        count_by_category(&b, &Category::ALL)
    );
    assert_eq!(mean_speed_per_track(&a), mean_speed_per_track(&b));
}
