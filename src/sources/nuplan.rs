use crate::error::AnalysisError;
use crate::sampling::{list_scene_files, sample_scene_files};
use crate::sources::RecordSource;
use crate::types::{Category, Config, ObjectRecord, SceneLog, TrackIndex};
use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Reads every scenario database of one location folder under `data_path`
pub struct NuplanFolderSource {
    folder: String,
}

impl NuplanFolderSource {
    pub fn new(folder: String) -> Self {
        Self { folder }
    }
}

/// Tokens are stored as BLOBs in the released databases; TEXT is accepted as well.
fn read_token(row: &Row, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) => Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
        ValueRef::Text(text) => Ok(String::from_utf8_lossy(text).into_owned()),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "token".to_string(),
            other.data_type(),
        )),
    }
}

/// Load the category, track and lidar_box tables of one database and join
/// tracks to their categories.
pub fn read_scene(path: &Path, group: &str) -> Result<SceneLog> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut categories: HashMap<String, Category> = HashMap::new();
    let mut stmt = conn.prepare("SELECT token, name FROM category")?;
    let rows = stmt.query_map([], |row| Ok((read_token(row, 0)?, row.get::<_, String>(1)?)))?;
    for row in rows {
        let (token, name) = row?;
        categories.insert(token, name.parse::<Category>()?);
    }

    let mut tracks = TrackIndex::new();
    let mut stmt = conn.prepare("SELECT token, category_token FROM track")?;
    let rows = stmt.query_map([], |row| Ok((read_token(row, 0)?, read_token(row, 1)?)))?;
    for row in rows {
        let (token, category_token) = row?;
        let category = categories
            .get(&category_token)
            .copied()
            .ok_or(AnalysisError::UnknownCategoryToken(category_token))?;
        tracks.insert(token, category);
    }

    let mut stmt = conn.prepare("SELECT track_token, x, y, z, vx, vy, vz FROM lidar_box")?;
    let records = stmt
        .query_map([], |row| {
            Ok(ObjectRecord {
                track_id: read_token(row, 0)?,
                x: row.get(1)?,
                y: row.get(2)?,
                z: row.get(3)?,
                vx: row.get(4)?,
                vy: row.get(5)?,
                vz: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(
        "Read {}: {} tracks, {} lidar boxes",
        path.display(),
        tracks.len(),
        records.len()
    );

    Ok(SceneLog {
        group: group.to_string(),
        tracks,
        records,
    })
}

#[async_trait]
impl RecordSource for NuplanFolderSource {
    async fn fetch_scenes(&self, config: &Config, tx: mpsc::Sender<SceneLog>) -> Result<()> {
        let folder_path = config.data_path.join(&self.folder);
        let files = list_scene_files(&folder_path)
            .with_context(|| format!("listing {}", folder_path.display()))?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let available = files.len();
        let files = sample_scene_files(files, config.proportion, &mut rng)?;

        if files.is_empty() {
            warn!("No scenario databases selected in {}", folder_path.display());
            return Ok(());
        }
        info!(
            "Reading {} of {} scenario databases from {}",
            files.len(),
            available,
            folder_path.display()
        );

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb.set_message(self.folder.clone());

        for path in files {
            let group = self.folder.clone();
            let scene = tokio::task::spawn_blocking(move || read_scene(&path, &group)).await??;
            tx.send(scene).await?;
            pb.inc(1);
        }

        pb.finish_with_message(format!("{} done", self.folder));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    /// Minimal nuPlan-shaped database: two categories, three tracks, four boxes
    fn write_fixture(path: &Path, blob_tokens: bool) {
        let conn = Connection::open(path).unwrap();
        let kind = if blob_tokens { "BLOB" } else { "TEXT" };
        conn.execute_batch(&format!(
            "CREATE TABLE category (token {kind} PRIMARY KEY, name TEXT);
             CREATE TABLE track (token {kind} PRIMARY KEY, category_token {kind});
             CREATE TABLE lidar_box (token {kind}, track_token {kind},
                 x REAL, y REAL, z REAL, vx REAL, vy REAL, vz REAL);"
        ))
        .unwrap();

        let tok = |s: &str| -> rusqlite::types::Value {
            if blob_tokens {
                rusqlite::types::Value::Blob(s.as_bytes().to_vec())
            } else {
                rusqlite::types::Value::Text(s.to_string())
            }
        };

        for (token, name) in [("c1", "vehicle"), ("c2", "pedestrian")] {
            conn.execute("INSERT INTO category VALUES (?1, ?2)", params![tok(token), name])
                .unwrap();
        }
        for (token, category) in [("t1", "c1"), ("t2", "c1"), ("t3", "c2")] {
            conn.execute("INSERT INTO track VALUES (?1, ?2)", params![tok(token), tok(category)])
                .unwrap();
        }
        let boxes = [
            ("b1", "t1", 1.0, 2.0, 3.0, 4.0),
            ("b2", "t1", 1.5, 2.0, 0.0, 2.0),
            ("b3", "t2", 5.0, 5.0, 1.0, 0.0),
            ("b4", "t3", 7.0, 1.0, 0.0, 1.0),
        ];
        for (token, track, x, y, vx, vy) in boxes {
            conn.execute(
                "INSERT INTO lidar_box VALUES (?1, ?2, ?3, ?4, 0.0, ?5, ?6, 0.0)",
                params![tok(token), tok(track), x, y, vx, vy],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_read_scene_text_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.db");
        write_fixture(&path, false);

        let scene = read_scene(&path, "boston").unwrap();
        assert_eq!(scene.group, "boston");
        assert_eq!(scene.tracks.len(), 3);
        assert_eq!(scene.tracks.resolve("t3"), Ok(Category::Pedestrian));
        assert_eq!(scene.records.len(), 4);
        assert_eq!(scene.records[0].speed(), 5.0);
    }

    #[test]
    fn test_read_scene_blob_tokens_are_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.db");
        write_fixture(&path, true);

        let scene = read_scene(&path, "boston").unwrap();
        // "t1" as bytes 0x74 0x31
        assert_eq!(scene.tracks.resolve("7431"), Ok(Category::Vehicle));
        assert!(scene.records.iter().all(|r| scene.tracks.resolve(&r.track_id).is_ok()));
    }

    #[test]
    fn test_unknown_category_token_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.db");
        write_fixture(&path, false);
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("INSERT INTO track VALUES ('t9', 'missing')", []).unwrap();
        }

        let err = read_scene(&path, "boston").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalysisError>(),
            Some(&AnalysisError::UnknownCategoryToken("missing".into()))
        );
    }

    #[test]
    fn test_unknown_category_name_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.db");
        write_fixture(&path, false);
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("INSERT INTO category VALUES ('c3', 'hovercraft')", []).unwrap();
        }

        let err = read_scene(&path, "boston").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::UnknownCategory(_))
        ));
    }
}
