use crate::error::AnalysisError;
use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of scenario databases
pub const SCENE_EXTENSION: &str = "db";

/// All scenario databases directly under `dir`, sorted by file name
pub fn list_scene_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_scene_file(path))
        .collect();
    files.sort();
    Ok(files)
}

pub fn is_scene_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SCENE_EXTENSION)
}

/// Shuffle and keep the first `floor(len * proportion)` files.
///
/// Without a proportion the list is returned as is.
pub fn sample_scene_files<R: Rng + ?Sized>(
    mut files: Vec<PathBuf>,
    proportion: Option<f64>,
    rng: &mut R,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let Some(p) = proportion else {
        return Ok(files);
    };
    if !(p > 0.0 && p <= 1.0) {
        return Err(AnalysisError::InvalidProportion(p));
    }

    files.shuffle(rng);
    let keep = (files.len() as f64 * p) as usize;
    files.truncate(keep);
    Ok(files)
}
