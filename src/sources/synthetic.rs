use crate::sources::RecordSource;
use crate::types::{
    Category, Config, ObjectRecord, SceneLog, SyntheticModel, TrackIndex, FRAME_RATE_HZ,
};
use anyhow::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;
use tokio::sync::mpsc;
use tracing::info;

/// Generates a random scene: straight-line tracks with noisy speed
pub struct SyntheticSource {
    label: String,
    model: SyntheticModel,
}

impl SyntheticSource {
    pub fn new(label: String, model: SyntheticModel) -> Self {
        Self { label, model }
    }

    /// Typical cruising speed in m/s
    fn nominal_speed(category: Category) -> f64 {
        match category {
            Category::Vehicle => 8.0,
            Category::Bicycle => 4.0,
            Category::Pedestrian => 1.3,
            Category::GenericObject => 0.8,
            Category::TrafficCone | Category::Barrier | Category::CzoneSign => 0.0,
        }
    }

    pub fn generate_scene(&self, seed: Option<u64>) -> Result<SceneLog> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let noise = Normal::new(0.0, 0.3)?;
        let dt = 1.0 / FRAME_RATE_HZ;

        let mut tracks = TrackIndex::new();
        let mut records = Vec::with_capacity(self.model.tracks * self.model.frames);

        for i in 0..self.model.tracks {
            let track_id = format!("{}-{:06}", self.label, i);
            let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
            let nominal = Self::nominal_speed(category);
            let heading = rng.gen::<f64>() * TAU;
            let mut x = rng.gen::<f64>() * self.model.extent;
            let mut y = rng.gen::<f64>() * self.model.extent;

            for _ in 0..self.model.frames {
                let speed = if nominal > 0.0 {
                    (nominal + noise.sample(&mut rng)).max(0.0)
                } else {
                    0.0
                };
                let (vx, vy) = (speed * heading.cos(), speed * heading.sin());
                records.push(ObjectRecord {
                    track_id: track_id.clone(),
                    x,
                    y,
                    z: 0.0,
                    vx,
                    vy,
                    vz: 0.0,
                });
                x += vx * dt;
                y += vy * dt;
            }

            tracks.insert(track_id, category);
        }

        Ok(SceneLog {
            group: self.label.clone(),
            tracks,
            records,
        })
    }
}

#[async_trait]
impl RecordSource for SyntheticSource {
    async fn fetch_scenes(&self, config: &Config, tx: mpsc::Sender<SceneLog>) -> Result<()> {
        info!("Generating synthetic scene {} using {:?}", self.label, self.model);

        let scene = self.generate_scene(config.seed)?;
        let total_records = scene.records.len();
        tx.send(scene).await?;

        info!("Generated {} synthetic records", total_records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(tracks: usize, frames: usize) -> SyntheticSource {
        SyntheticSource::new(
            "synthetic".to_string(),
            SyntheticModel { tracks, frames, extent: 100.0 },
        )
    }

    #[test]
    fn test_scene_shape() {
        let scene = source(12, 5).generate_scene(Some(3)).unwrap();
        assert_eq!(scene.tracks.len(), 12);
        assert_eq!(scene.records.len(), 60);
        assert_eq!(scene.group, "synthetic");
        for record in &scene.records {
            assert!(scene.tracks.resolve(&record.track_id).is_ok());
            assert!(record.speed().is_finite());
        }
    }

    #[test]
    fn test_seeded_scenes_match() {
        let a = source(4, 10).generate_scene(Some(42)).unwrap();
        let b = source(4, 10).generate_scene(Some(42)).unwrap();
        assert_eq!(a.records, b.records);
        assert_eq!(a.tracks, b.tracks);
    }

    #[test]
    fn test_static_categories_do_not_move() {
        let scene = source(50, 3).generate_scene(Some(9)).unwrap();
        for record in &scene.records {
            let category = scene.tracks.resolve(&record.track_id).unwrap();
            if SyntheticSource::nominal_speed(category) == 0.0 {
                assert_eq!(record.speed(), 0.0);
            }
        }
    }
}
