//! Built-in model zoo
//!
//! A handful of fixed-shape models with synthetic weights drawn from a
//! seeded generator, so every machine builds the same bits. Useful for
//! smoke tests, parity checks and benchmarks where no trained model is at
//! hand.
//!
//! | Model | D_IN | CONV1_OUT | CLASSES | Multiplies |
//! |-------|------|-----------|---------|------------|
//! | `tiny` | 4 | 1 | 2 | 20 |
//! | `gesture-small` | 16 | 4 | 4 | 448 |
//! | `gesture` | 64 | 16 | 7 | 10 240 |
//!
//! ## Usage
//!
//! ```no_run
//! use cnn1d_models::zoo::{ModelZoo, ZooModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut zoo = ModelZoo::new("models/cnn1d")?;
//! let path = zoo.materialize(ZooModel::Gesture)?;
//! let model = zoo.load(ZooModel::Gesture)?;
//! # Ok(())
//! # }
//! ```

use crate::{Model, ModelError, Result};
use cnn1d_driver::{ConvLayer, DenseLayer, Tables};
use cnn1d_ip::{Dims, KERNEL_WIDTH};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Models available in the zoo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZooModel {
    /// Hand-set 4-sample, 1-filter, 2-class model with known logits
    Tiny,
    /// 16-sample, 4-filter, 4-class gesture classifier
    GestureSmall,
    /// 64-sample, 16-filter, 7-class gesture classifier
    Gesture,
}

impl ZooModel {
    /// Every zoo model
    pub const fn all() -> &'static [Self] {
        &[Self::Tiny, Self::GestureSmall, Self::Gesture]
    }

    /// Short name used on the command line
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::GestureSmall => "gesture-small",
            Self::Gesture => "gesture",
        }
    }

    /// Get model filename
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny.c1dn",
            Self::GestureSmall => "gesture_small.c1dn",
            Self::Gesture => "gesture.c1dn",
        }
    }

    /// Human-readable description
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Tiny => "Hand-set smoke test, logits [0.2, 0.2] for input [1, 2, 3, 4]",
            Self::GestureSmall => "Accelerometer gesture classifier (small, synthetic weights)",
            Self::Gesture => "Accelerometer gesture classifier (synthetic weights)",
        }
    }

    /// Model dimensions
    pub const fn dims(&self) -> Dims {
        match self {
            Self::Tiny => Dims::new(4, 1, 2),
            Self::GestureSmall => Dims::new(16, 4, 4),
            Self::Gesture => Dims::new(64, 16, 7),
        }
    }

    /// Seed for the weight generator
    pub const fn seed(&self) -> u64 {
        match self {
            Self::Tiny => 0,
            Self::GestureSmall => 0x5EED_0016,
            Self::Gesture => 0x5EED_0064,
        }
    }

    /// Build the model in memory.
    ///
    /// # Errors
    ///
    /// Returns error only if generated tables disagree with the dimensions.
    pub fn build(&self) -> Result<Model> {
        let tables = match self {
            Self::Tiny => tiny_tables()?,
            _ => synthetic_tables(self.dims(), self.seed())?,
        };
        debug!("Built zoo model {} ({})", self.name(), tables.dims());
        Ok(Model::new(tables))
    }
}

impl fmt::Display for ZooModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ZooModel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.name() == s || m.filename() == s)
            .ok_or_else(|| ModelError::unknown_model(s))
    }
}

fn tiny_tables() -> Result<Tables> {
    Ok(Tables::new(
        ZooModel::Tiny.dims(),
        ConvLayer {
            weights: vec![[0.5, -1.0, 0.5]],
            bias: vec![0.1],
        },
        DenseLayer {
            weights: vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, -1.0, 0.0],
            bias: vec![0.0, 0.0],
        },
    )?)
}

/// Uniform weights scaled by fan-in, small biases.
fn synthetic_tables(dims: Dims, seed: u64) -> Result<Tables> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let conv_scale = 1.0 / (KERNEL_WIDTH as f32).sqrt();
    let dense_scale = 1.0 / (dims.dense_rows().max(1) as f32).sqrt();

    let mut uniform = |n: usize, scale: f32| -> Vec<f32> {
        (0..n).map(|_| rng.random_range(-scale..=scale)).collect()
    };

    let conv_w = uniform(dims.conv_weight_len(), conv_scale);
    let conv_b = uniform(dims.conv_out, 0.1);
    let dense_w = uniform(dims.dense_weight_len(), dense_scale);
    let dense_b = uniform(dims.classes, 0.1);

    let conv = ConvLayer::from_flat(&conv_w, conv_b)?;
    Ok(Tables::new(
        dims,
        conv,
        DenseLayer {
            weights: dense_w,
            bias: dense_b,
        },
    )?)
}

/// Deterministic stream of input vectors for tests and benchmarks.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    rng: Xoshiro256PlusPlus,
    d_in: usize,
}

impl SampleGenerator {
    /// Vectors of length `dims.d_in` drawn from `seed`.
    pub fn new(dims: &Dims, seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            d_in: dims.d_in,
        }
    }

    /// Next vector: a noisy sinusoid, like one axis of an accelerometer.
    pub fn next_vector(&mut self) -> Vec<f32> {
        let freq: f32 = self.rng.random_range(0.05..0.5);
        let phase: f32 = self.rng.random_range(0.0..std::f32::consts::TAU);
        let amp: f32 = self.rng.random_range(0.5..2.0);
        (0..self.d_in)
            .map(|t| {
                let noise: f32 = self.rng.random_range(-0.1..0.1);
                amp * (freq * t as f32 + phase).sin() + noise
            })
            .collect()
    }

    /// Collect `n` vectors.
    pub fn take_vectors(&mut self, n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|_| self.next_vector()).collect()
    }
}

/// Local cache of zoo model blobs
#[derive(Debug)]
pub struct ModelZoo {
    /// Local cache directory
    cache_dir: PathBuf,
    /// Blobs found in the cache
    cached: HashMap<ZooModel, PathBuf>,
}

impl ModelZoo {
    /// Create model zoo with specified cache directory
    ///
    /// # Errors
    ///
    /// Returns error if cache directory cannot be created.
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;

        info!("Model zoo cache: {}", cache_dir.display());

        let mut zoo = Self {
            cache_dir,
            cached: HashMap::new(),
        };
        zoo.scan();
        Ok(zoo)
    }

    /// Scan cache directory for existing, well-formed blobs
    fn scan(&mut self) {
        for model in ZooModel::all() {
            let path = self.cache_dir.join(model.filename());
            if !path.exists() {
                continue;
            }
            match Model::from_file(&path) {
                Ok(m) if m.dims() == model.dims() => {
                    debug!("Found {}", model.filename());
                    self.cached.insert(*model, path);
                }
                Ok(m) => warn!(
                    "{} has dims {}, expected {}",
                    model.filename(),
                    m.dims(),
                    model.dims()
                ),
                Err(e) => warn!("Invalid model {}: {e}", model.filename()),
            }
        }
        info!(
            "Found {} cached models in {}",
            self.cached.len(),
            self.cache_dir.display()
        );
    }

    /// Write the blob for `model` into the cache, returning its path.
    ///
    /// # Errors
    ///
    /// Returns error if the blob cannot be built or written.
    pub fn materialize(&mut self, model: ZooModel) -> Result<PathBuf> {
        let path = self.cache_dir.join(model.filename());
        model.build()?.write_file(&path)?;
        self.cached.insert(model, path.clone());
        Ok(path)
    }

    /// Write every zoo model into the cache.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn materialize_all(&mut self) -> Result<Vec<PathBuf>> {
        ZooModel::all()
            .iter()
            .map(|&m| self.materialize(m))
            .collect()
    }

    /// Load from the cache, or build in memory if not cached.
    ///
    /// # Errors
    ///
    /// Returns error if a cached blob cannot be read.
    pub fn load(&self, model: ZooModel) -> Result<Model> {
        match self.cached.get(&model) {
            Some(path) => Model::from_file(path),
            None => model.build(),
        }
    }

    /// Check if model is cached
    pub fn has_model(&self, model: ZooModel) -> bool {
        self.cached.contains_key(&model)
    }

    /// Get cached path of a model
    ///
    /// # Errors
    ///
    /// Returns error if the model has not been materialised.
    pub fn model_path(&self, model: ZooModel) -> Result<PathBuf> {
        self.cached
            .get(&model)
            .cloned()
            .ok_or_else(|| ModelError::FileNotFound {
                path: self.cache_dir.join(model.filename()),
            })
    }

    /// Models present in the cache
    pub fn available_models(&self) -> Vec<ZooModel> {
        ZooModel::all()
            .iter()
            .copied()
            .filter(|m| self.has_model(*m))
            .collect()
    }

    /// Cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_parse_back() {
        for m in ZooModel::all() {
            assert_eq!(m.name().parse::<ZooModel>().unwrap(), *m);
            assert_eq!(m.filename().parse::<ZooModel>().unwrap(), *m);
        }
        assert!(matches!(
            "resnet".parse::<ZooModel>(),
            Err(ModelError::UnknownModel { .. })
        ));
    }

    #[test]
    fn tiny_gives_known_logits() {
        let model = ZooModel::Tiny.build().unwrap();
        let logits = model.kernel().infer(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        for v in logits.as_slice() {
            assert!((v - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn synthetic_weights_are_reproducible() {
        let a = ZooModel::Gesture.build().unwrap();
        let b = ZooModel::Gesture.build().unwrap();
        assert_eq!(a.tables(), b.tables());
        assert_eq!(a.dims(), ZooModel::Gesture.dims());
    }

    #[test]
    fn table_multiplies_match_dims() {
        assert_eq!(ZooModel::Tiny.dims().multiplies_per_call(), 20);
        assert_eq!(ZooModel::GestureSmall.dims().multiplies_per_call(), 448);
        assert_eq!(ZooModel::Gesture.dims().multiplies_per_call(), 10_240);
    }

    #[test]
    fn samples_are_seeded() {
        let dims = ZooModel::GestureSmall.dims();
        let a = SampleGenerator::new(&dims, 9).take_vectors(3);
        let b = SampleGenerator::new(&dims, 9).take_vectors(3);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.len() == 16));
    }

    #[test]
    fn zoo_creation_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let zoo = ModelZoo::new(temp_dir.path()).unwrap();
        assert!(zoo.available_models().is_empty());
        assert!(zoo.model_path(ZooModel::Tiny).is_err());
    }

    #[test]
    fn materialize_then_rescan() {
        let temp_dir = TempDir::new().unwrap();
        let mut zoo = ModelZoo::new(temp_dir.path()).unwrap();
        let path = zoo.materialize(ZooModel::GestureSmall).unwrap();
        assert!(path.exists());

        let zoo = ModelZoo::new(temp_dir.path()).unwrap();
        assert_eq!(zoo.available_models(), vec![ZooModel::GestureSmall]);
        let loaded = zoo.load(ZooModel::GestureSmall).unwrap();
        assert_eq!(loaded.tables(), ZooModel::GestureSmall.build().unwrap().tables());
    }

    #[test]
    fn corrupt_cache_entry_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tiny.c1dn"), b"garbage").unwrap();
        let zoo = ModelZoo::new(temp_dir.path()).unwrap();
        assert!(!zoo.has_model(ZooModel::Tiny));
    }
}
