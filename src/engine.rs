//! Ties the parameter store, the debouncer and the scene together.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::bloom::{BuildSettings, BuildStats, build_bloom};
use crate::config::{BloomParams, Configuration, DriftSettings};
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::events::{ChangeEffect, ParamChange, ParamEvent, RebuildReason};
use crate::params::{ListenerId, ParamStore};
use crate::processing::orientation::{SourceImage, normalize};
use crate::scene::Scene;

struct Stage {
    scene: Scene,
    debounce: Debouncer,
    image: Option<Arc<RgbaImage>>,
    settings: BuildSettings,
    drift: DriftSettings,
    rng: StdRng,
    last_stats: Option<BuildStats>,
}

impl Stage {
    fn rebuild(&mut self, params: &BloomParams, reason: RebuildReason) -> Result<BuildStats> {
        let image = self.image.clone().ok_or(Error::NoImage)?;
        let started = Instant::now();
        let mesh = build_bloom(&image, params, &self.settings, &mut self.rng)?;
        let stats = mesh.stats;
        let generation = self.scene.replace_bloom(mesh, image, params, &self.drift);
        info!(
            ?reason,
            generation,
            cols = stats.cols,
            rows = stats.rows,
            surface = stats.surface_cells,
            particles = stats.emitted_particles,
            elapsed = %humantime::format_duration(started.elapsed()),
            "bloom rebuilt"
        );
        self.last_stats = Some(stats);
        Ok(stats)
    }
}

/// Single-threaded owner of the bloom scene.
///
/// Uniform edits reach the scene materials synchronously through a store
/// listener; grid-affecting edits restart the debounce window and are
/// rebuilt by [`BloomEngine::tick`].
pub struct BloomEngine {
    params: ParamStore,
    stage: Rc<RefCell<Stage>>,
}

impl BloomEngine {
    pub fn new(cfg: &Configuration) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let stage = Rc::new(RefCell::new(Stage {
            scene: Scene::new(&cfg.scene),
            debounce: Debouncer::new(cfg.tuning.rebuild_debounce),
            image: None,
            settings: BuildSettings {
                tuning: cfg.tuning.clone(),
                boundary: cfg.boundary.clone(),
            },
            drift: cfg.drift.clone(),
            rng,
            last_stats: None,
        }));

        let mut params = ParamStore::new(cfg.params.clone());
        let materials = Rc::clone(&stage);
        params.subscribe(move |event: &ParamEvent, values: &BloomParams| {
            if event.change.effect() == ChangeEffect::Uniform {
                let updated = materials.borrow_mut().scene.apply_uniforms(values);
                debug!(change = ?event.change, updated, "pushed material uniforms");
            }
        });
        let rebuilds = Rc::clone(&stage);
        params.subscribe(move |event: &ParamEvent, _: &BloomParams| {
            if event.change.effect() == ChangeEffect::Rebuild {
                rebuilds.borrow_mut().debounce.trigger(event.at);
                debug!(change = ?event.change, "rebuild scheduled");
            }
        });

        Self { params, stage }
    }

    pub fn params(&self) -> &BloomParams {
        self.params.values()
    }

    /// Registers an external observer of parameter edits.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ParamEvent, &BloomParams) + 'static,
    {
        self.params.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.params.unsubscribe(id)
    }

    pub fn set(&mut self, change: ParamChange) -> bool {
        self.set_at(change, Instant::now())
    }

    pub fn set_at(&mut self, change: ParamChange, at: Instant) -> bool {
        self.params.set_at(change, at)
    }

    /// Normalizes `source` and rebuilds immediately, dropping any pending
    /// debounced rebuild.
    pub fn load_image(&mut self, source: &SourceImage) -> Result<BuildStats> {
        let upright = normalize(source).into_owned();
        let (width, height) = upright.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }
        let mut stage = self.stage.borrow_mut();
        stage.image = Some(Arc::new(upright));
        stage.debounce.cancel();
        stage.rebuild(self.params.values(), RebuildReason::ImageLoaded)
    }

    /// Rebuilds now from the last loaded image.
    pub fn rebuild(&mut self) -> Result<BuildStats> {
        let mut stage = self.stage.borrow_mut();
        stage.debounce.cancel();
        stage.rebuild(self.params.values(), RebuildReason::Requested)
    }

    /// Runs a debounced rebuild once its quiet window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Result<Option<BuildStats>> {
        let mut stage = self.stage.borrow_mut();
        if !stage.debounce.poll(now) {
            return Ok(None);
        }
        if stage.image.is_none() {
            debug!("debounced rebuild skipped; no image loaded");
            return Ok(None);
        }
        stage
            .rebuild(self.params.values(), RebuildReason::ParamsChanged)
            .map(Some)
    }

    pub fn rebuild_pending(&self) -> bool {
        self.stage.borrow().debounce.is_pending()
    }

    pub fn last_stats(&self) -> Option<BuildStats> {
        self.stage.borrow().last_stats
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        Ref::map(self.stage.borrow(), |stage| &stage.scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::LayerId;
    use image::Rgba;
    use std::time::Duration;

    fn engine() -> BloomEngine {
        let cfg = Configuration {
            seed: Some(17),
            params: BloomParams {
                grid_size: 16,
                ..BloomParams::default()
            },
            ..Configuration::default()
        };
        BloomEngine::new(&cfg)
    }

    fn photo() -> SourceImage {
        SourceImage::upright(RgbaImage::from_pixel(32, 16, Rgba([120, 80, 40, 255])))
    }

    #[test]
    fn loading_an_image_builds_both_layers() {
        let mut engine = engine();
        let stats = engine.load_image(&photo()).unwrap();
        assert_eq!((stats.cols, stats.rows), (16, 8));
        let scene = engine.scene();
        assert!(scene.node(LayerId::Surface).is_some());
        assert!(scene.node(LayerId::Particles).is_some());
        assert_eq!(scene.generation(), 1);
    }

    #[test]
    fn uniform_edit_does_not_rebuild() {
        let mut engine = engine();
        engine.load_image(&photo()).unwrap();
        assert!(engine.set(ParamChange::WaveAmplitude(0.75)));
        assert!(!engine.rebuild_pending());
        let scene = engine.scene();
        assert_eq!(scene.generation(), 1);
        assert_eq!(scene.surface_material().unwrap().amplitude, 0.75);
    }

    #[test]
    fn grid_edits_coalesce_into_one_rebuild() {
        let mut engine = engine();
        engine.load_image(&photo()).unwrap();
        let t0 = Instant::now();
        engine.set_at(ParamChange::GridSize(20), t0);
        engine.set_at(ParamChange::GridSize(24), t0 + Duration::from_millis(100));
        assert!(engine.tick(t0 + Duration::from_millis(250)).unwrap().is_none());
        let stats = engine
            .tick(t0 + Duration::from_millis(300))
            .unwrap()
            .expect("rebuild after quiet window");
        assert_eq!(stats.cols, 24);
        assert!(engine.tick(t0 + Duration::from_secs(5)).unwrap().is_none());
        assert_eq!(engine.scene().generation(), 2);
    }

    #[test]
    fn debounced_rebuild_without_image_is_skipped() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.set_at(ParamChange::ParticleDensity(3.0), t0);
        assert!(engine.tick(t0 + Duration::from_secs(1)).unwrap().is_none());
        assert!(matches!(engine.rebuild(), Err(Error::NoImage)));
    }

    #[test]
    fn runaway_live_edits_keep_rebuilds_bounded() {
        let mut engine = engine();
        engine.load_image(&photo()).unwrap();
        let before = engine.params().clone();
        let t0 = Instant::now();

        assert!(!engine.set_at(ParamChange::ParticleDensity(f32::INFINITY), t0));
        assert!(!engine.set_at(ParamChange::ParticleDensity(f32::NAN), t0));
        assert_eq!(engine.params(), &before);
        assert!(!engine.rebuild_pending());

        assert!(engine.set_at(ParamChange::GridSize(u32::MAX), t0));
        assert_eq!(engine.params().grid_size, BloomParams::MAX_GRID_SIZE);
        assert!(engine.set_at(ParamChange::GridSize(16), t0));
        assert!(engine.set_at(ParamChange::ParticleDensity(1e12), t0));
        engine.params().validate().unwrap();

        let stats = engine
            .tick(t0 + Duration::from_secs(1))
            .unwrap()
            .expect("rebuild after quiet window");
        let cap = BloomParams::MAX_PARTICLE_DENSITY as usize;
        assert!(stats.drawn_particles <= stats.scatter_cells * cap);
    }
}
