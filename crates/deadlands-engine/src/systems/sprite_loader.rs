//! Sprite image loading.
//!
//! Loading is asynchronous on the host side. The system only ever sees
//! resolved results: each frame it requests sources it has not seen yet and
//! polls the loader for finished ones, filling a shared [`ImageCache`].
//! Rendering skips sprites whose image is not ready.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use deadlands_ecs::world::World;

use super::System;

// ---------------------------------------------------------------------------
// Loader boundary
// ---------------------------------------------------------------------------

/// Pixel size of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub width: f64,
    pub height: f64,
}

/// Result of one finished load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub source: String,
    pub outcome: Result<ImageInfo, String>,
}

/// Host-side image loader.
pub trait ImageLoader {
    /// Begin loading `source`. Called at most once per source.
    fn request(&mut self, source: &str);

    /// Loads finished since the last poll.
    fn poll(&mut self) -> Vec<LoadResult>;
}

/// Loader that resolves every request on the next poll. Sources listed with
/// [`StaticImageLoader::with_size`] get that size; others resolve to
/// `default_size`, unless `fail_unknown` is set.
#[derive(Debug, Clone)]
pub struct StaticImageLoader {
    sizes: HashMap<String, ImageInfo>,
    default_size: ImageInfo,
    fail_unknown: bool,
    queued: VecDeque<String>,
}

impl StaticImageLoader {
    pub fn new(default_size: ImageInfo) -> Self {
        Self {
            sizes: HashMap::new(),
            default_size,
            fail_unknown: false,
            queued: VecDeque::new(),
        }
    }

    pub fn with_size(mut self, source: &str, info: ImageInfo) -> Self {
        self.sizes.insert(source.to_owned(), info);
        self
    }

    pub fn failing_unknown(mut self) -> Self {
        self.fail_unknown = true;
        self
    }
}

impl Default for StaticImageLoader {
    fn default() -> Self {
        Self::new(ImageInfo {
            width: 256.0,
            height: 256.0,
        })
    }
}

impl ImageLoader for StaticImageLoader {
    fn request(&mut self, source: &str) {
        self.queued.push_back(source.to_owned());
    }

    fn poll(&mut self) -> Vec<LoadResult> {
        self.queued
            .drain(..)
            .map(|source| {
                let outcome = match self.sizes.get(&source) {
                    Some(info) => Ok(*info),
                    None if self.fail_unknown => Err(format!("no image registered for {source}")),
                    None => Ok(self.default_size),
                };
                LoadResult { source, outcome }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ImageCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    Pending,
    Ready(ImageInfo),
    Failed(String),
}

/// Shared source -> image state table.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    entries: Rc<RefCell<HashMap<String, ImageState>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The image for `source`, if it finished loading.
    pub fn ready(&self, source: &str) -> Option<ImageInfo> {
        match self.entries.borrow().get(source) {
            Some(ImageState::Ready(info)) => Some(*info),
            _ => None,
        }
    }

    pub fn state(&self, source: &str) -> Option<ImageState> {
        self.entries.borrow().get(source).cloned()
    }

    pub fn ready_count(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|s| matches!(s, ImageState::Ready(_)))
            .count()
    }

    fn contains(&self, source: &str) -> bool {
        self.entries.borrow().contains_key(source)
    }

    fn set(&self, source: String, state: ImageState) {
        self.entries.borrow_mut().insert(source, state);
    }
}

// ---------------------------------------------------------------------------
// SpriteLoaderSystem
// ---------------------------------------------------------------------------

pub struct SpriteLoaderSystem {
    loader: Box<dyn ImageLoader>,
    cache: ImageCache,
}

impl SpriteLoaderSystem {
    pub const NAME: &'static str = "sprite_loader";

    pub fn new(loader: Box<dyn ImageLoader>, cache: ImageCache) -> Self {
        Self { loader, cache }
    }

    fn request_new_sources(&mut self, world: &World) {
        let sources: Vec<String> = world
            .stores()
            .sprite
            .iter()
            .map(|(_, sprite)| sprite.source.clone())
            .collect();
        for source in sources {
            if !self.cache.contains(&source) {
                tracing::debug!(source = %source, "requesting image");
                self.loader.request(&source);
                self.cache.set(source, ImageState::Pending);
            }
        }
    }

    fn collect_results(&mut self) {
        for result in self.loader.poll() {
            match result.outcome {
                Ok(info) => self.cache.set(result.source, ImageState::Ready(info)),
                Err(reason) => {
                    tracing::warn!(source = %result.source, %reason, "image failed to load");
                    self.cache.set(result.source, ImageState::Failed(reason));
                }
            }
        }
    }
}

impl System for SpriteLoaderSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, world: &mut World) {
        self.request_new_sources(world);
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        self.request_new_sources(world);
        self.collect_results();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
