mod cli;

use cli::{parse_data_sources, Args};
use trajectory_analysis::display::display_table;
use trajectory_analysis::output::OutputWriter;
use trajectory_analysis::report::run_report;
use trajectory_analysis::sources::create_source;
use trajectory_analysis::types::{DataSource, Group, SceneLog, SCENE_CHANNEL_SIZE};

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Groups are aggregated in parallel on the Rayon pool
    let num_threads = std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(4);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("rayon-worker-{}", i))
        .build_global()?;

    info!("Initialized Rayon thread pool with {} threads", num_threads);

    let args = Args::parse();
    let config = args.into_config()?;

    info!("Starting trajectory analysis with config: {:?}", config);
    info!("Output directory: {}", config.output_dir.display());

    let data_sources: Vec<DataSource> = parse_data_sources(&config.sources)?;

    // One group per source, kept in command-line order
    let mut groups: Vec<Group> = data_sources.iter().map(|s| Group::new(s.label())).collect();
    let group_index: HashMap<String, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name.clone(), i))
        .collect();

    let mut record_sources = Vec::new();
    for data_source in data_sources.iter() {
        record_sources.push(create_source(data_source).await?);
    }

    let (scene_tx, mut scene_rx) = mpsc::channel::<SceneLog>(SCENE_CHANNEL_SIZE);

    // Start reading all sources concurrently
    let config_arc = Arc::new(config.clone());
    let fetch_tasks: Vec<_> = record_sources
        .into_iter()
        .map(|source| {
            let tx = scene_tx.clone();
            let config = config_arc.clone();
            tokio::spawn(async move { source.fetch_scenes(&config, tx).await })
        })
        .collect();

    // Drop the original sender so the receiver can detect when all sources are done
    drop(scene_tx);

    let mut scene_count = 0usize;
    while let Some(scene) = scene_rx.recv().await {
        match group_index.get(&scene.group) {
            Some(&i) => {
                groups[i].absorb(scene);
                scene_count += 1;
            }
            None => warn!("Dropping scene for unrequested group {}", scene.group),
        }
    }

    // A failed source means missing or inconsistent data; abort the run
    for task in fetch_tasks {
        if let Err(e) = task.await? {
            error!("Error reading scenes: {:#}", e);
            return Err(e);
        }
    }

    info!("Loaded {} scenes into {} groups", scene_count, groups.len());
    for group in &groups {
        info!(
            "{}: {} tracks, {} records",
            group.name,
            group.tracks.len(),
            group.records.len()
        );
        if group.records.is_empty() && group.tracks.is_empty() {
            warn!("Group {} is empty", group.name);
        }
    }

    let tables = run_report(&config, &groups)?;

    let output_writer = OutputWriter::new();
    for table in &tables {
        let output_path = output_writer.write_table(&config, table)?;
        display_table(table, &config.preview);
        if let Some(filename) = output_path.file_name() {
            info!("Generated: {}", filename.to_string_lossy());
        }
    }

    info!("Trajectory analysis completed successfully!");
    info!("Total tables: {}", tables.len());

    Ok(())
}
