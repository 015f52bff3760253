use anyhow::{anyhow, Result};
use clap::Parser;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use trajectory_analysis::types::{
    Category, Config, DataSource, MapBoundary, OutputFormat, PreviewConfig, Report,
    SyntheticModel, DEFAULT_HISTOGRAM_BINS,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding one sub-folder of scenario databases per location
    #[arg(long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Location folders, or synthetic(tracks,frames,extent)
    #[arg(long, default_value = "synthetic(200,100,500)", value_delimiter = '|')]
    pub sources: Vec<String>,

    #[arg(long, default_value = "class-proportion")]
    pub report: String,

    /// Fraction of each folder's databases to sample
    #[arg(long)]
    pub proportion: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// x_min|x_max|y_min|y_max, required by the speed-grid report
    #[arg(long)]
    pub map_boundary: Option<String>,

    /// Category binned by the speed-grid report
    #[arg(long, default_value = "vehicle")]
    pub category: String,

    #[arg(long, default_value = "vehicle|bicycle|pedestrian|generic_object", value_delimiter = '|')]
    pub categories: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub histogram_bins: usize,

    #[arg(long, default_value = "parquet")]
    pub out_format: String,

    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "10")]
    pub preview_rows: usize,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let report = match self.report.as_str() {
            "class-proportion" => Report::ClassProportion,
            "mean-speed" => Report::MeanSpeed,
            "speed-grid" => Report::SpeedGrid,
            "trajectories" => Report::Trajectories,
            other => return Err(anyhow!("Invalid report: {}", other)),
        };

        let out_format = match self.out_format.as_str() {
            "parquet" => OutputFormat::Parquet,
            "csv" => OutputFormat::Csv,
            other => return Err(anyhow!("Invalid output format: {}", other)),
        };

        let map_boundary = self
            .map_boundary
            .as_deref()
            .map(parse_map_boundary)
            .transpose()?;

        // Every source becomes a group keyed by its label
        parse_data_sources(&self.sources)?;

        let categories = self
            .categories
            .iter()
            .map(|c| c.parse::<Category>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            data_path: self.data_path,
            sources: self.sources,
            report,
            proportion: self.proportion,
            seed: self.seed,
            map_boundary,
            target_category: self.category.parse()?,
            categories,
            histogram_bins: self.histogram_bins,
            out_format,
            output_dir: self.output_dir,
            preview: PreviewConfig {
                rows: self.preview_rows,
                ..PreviewConfig::default()
            },
        })
    }
}

pub fn parse_map_boundary(s: &str) -> Result<MapBoundary> {
    let values = s
        .split('|')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x_min, x_max, y_min, y_max] => {
            let boundary = MapBoundary::new(*x_min, *x_max, *y_min, *y_max);
            // Fail on a degenerate extent before any database is opened
            boundary.dimensions()?;
            Ok(boundary)
        }
        _ => Err(anyhow!("Map boundary needs four values x_min|x_max|y_min|y_max, got {}", s)),
    }
}

pub fn parse_data_source(source: &str) -> Result<DataSource> {
    let synthetic_re = Regex::new(r"^synthetic\(\s*(\d+)\s*,\s*(\d+)\s*,\s*([^)]+?)\s*\)$")?;

    if let Some(caps) = synthetic_re.captures(source) {
        Ok(DataSource::Synthetic(SyntheticModel {
            tracks: caps[1].parse()?,
            frames: caps[2].parse()?,
            extent: caps[3].parse()?,
        }))
    } else {
        // Anything else is a location folder under the data path
        Ok(DataSource::Folder(source.to_string()))
    }
}

/// Parse all source tokens, rejecting two that would feed the same group
pub fn parse_data_sources(sources: &[String]) -> Result<Vec<DataSource>> {
    let mut labels = HashSet::new();
    sources
        .iter()
        .map(|s| {
            let source = parse_data_source(s)?;
            if !labels.insert(source.label()) {
                return Err(anyhow!("Duplicate source {} (group {})", s, source.label()));
            }
            Ok(source)
        })
        .collect()
}
