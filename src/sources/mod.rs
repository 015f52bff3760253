pub mod nuplan;
pub mod synthetic;

use crate::types::{Config, DataSource, SceneLog};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Streams scenario contents, one `SceneLog` per database or generated scene
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_scenes(&self, config: &Config, tx: mpsc::Sender<SceneLog>) -> Result<()>;
}

pub async fn create_source(source: &DataSource) -> Result<Box<dyn RecordSource>> {
    match source {
        DataSource::Folder(name) => Ok(Box::new(nuplan::NuplanFolderSource::new(name.clone()))),
        DataSource::Synthetic(model) => Ok(Box::new(synthetic::SyntheticSource::new(
            source.label(),
            *model,
        ))),
    }
}
