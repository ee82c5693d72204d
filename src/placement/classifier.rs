// src/placement/classifier.rs

//! Score → level classification.
//!
//! The trained pipeline is a standard scaler followed by a multinomial
//! logistic model on the single score feature, exported as JSON. It is read
//! once per process on first use. If the file is missing, corrupt, or the
//! model yields a non-finite result, the fixed thresholds are used instead
//! and the caller gets the same shape back.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{
        Mutex, OnceLock, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use serde::Deserialize;

use crate::models::placement::Level;

pub const ADVANCED_THRESHOLD: f64 = 70.0;
pub const INTERMEDIATE_THRESHOLD: f64 = 40.0;

#[derive(Debug)]
pub enum PipelineError {
    Io(String),
    Format(String),
    Inference(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io(msg) => write!(f, "cannot read level pipeline: {}", msg),
            PipelineError::Format(msg) => write!(f, "malformed level pipeline: {}", msg),
            PipelineError::Inference(msg) => write!(f, "level pipeline inference failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub level: Level,
    /// Always carries every level, summing to 1.
    pub probabilities: BTreeMap<Level, f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Scaler {
    mean: f64,
    scale: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelPipeline {
    scaler: Scaler,
    classes: Vec<Level>,
    coefficients: Vec<f64>,
    intercepts: Vec<f64>,
}

impl LevelPipeline {
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        let pipeline: LevelPipeline =
            serde_json::from_str(raw).map_err(|e| PipelineError::Format(e.to_string()))?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.classes.is_empty() {
            return Err(PipelineError::Format("no classes".to_string()));
        }
        if self.coefficients.len() != self.classes.len()
            || self.intercepts.len() != self.classes.len()
        {
            return Err(PipelineError::Format(format!(
                "{} classes but {} coefficients and {} intercepts",
                self.classes.len(),
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        if !self.scaler.scale.is_finite() || self.scaler.scale == 0.0 {
            return Err(PipelineError::Format("scaler scale must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn predict(&self, score: f64) -> Result<Classification, PipelineError> {
        if !score.is_finite() {
            return Err(PipelineError::Inference(format!("non-finite score {}", score)));
        }

        let z = (score - self.scaler.mean) / self.scaler.scale;
        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coef, intercept)| coef * z + intercept)
            .collect();

        // Softmax, shifted by the max logit.
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(PipelineError::Inference("degenerate class scores".to_string()));
        }

        let mut probabilities: BTreeMap<Level, f64> =
            Level::ALL.iter().map(|level| (*level, 0.0)).collect();
        for (class, exp) in self.classes.iter().zip(&exps) {
            *probabilities.entry(*class).or_insert(0.0) += exp / total;
        }

        let level = self
            .classes
            .iter()
            .zip(&exps)
            .fold(None::<(Level, f64)>, |best, (class, exp)| match best {
                Some((_, best_exp)) if best_exp >= *exp => best,
                _ => Some((*class, *exp)),
            })
            .map(|(class, _)| class)
            .ok_or_else(|| PipelineError::Inference("no classes".to_string()))?;

        Ok(Classification {
            level,
            probabilities,
        })
    }
}

/// Fixed-threshold classification with a one-hot probability vector.
pub fn classify_by_thresholds(score: f64) -> Classification {
    let level = if score >= ADVANCED_THRESHOLD {
        Level::Advanced
    } else if score >= INTERMEDIATE_THRESHOLD {
        Level::Intermediate
    } else {
        Level::Beginner
    };

    let probabilities = Level::ALL
        .iter()
        .map(|l| (*l, if *l == level { 1.0 } else { 0.0 }))
        .collect();

    Classification {
        level,
        probabilities,
    }
}

#[derive(Debug)]
enum Source {
    File(PathBuf),
    Disabled,
}

/// Lazily loaded, process-wide level classifier.
#[derive(Debug)]
pub struct LevelClassifier {
    source: Source,
    loaded: AtomicBool,
    load_lock: Mutex<()>,
    pipeline: OnceLock<Option<LevelPipeline>>,
    load_attempts: AtomicUsize,
}

impl LevelClassifier {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_source(Source::File(path.into()))
    }

    /// A classifier that always uses the thresholds.
    pub fn disabled() -> Self {
        Self::with_source(Source::Disabled)
    }

    pub fn with_pipeline(pipeline: LevelPipeline) -> Self {
        let classifier = Self::with_source(Source::Disabled);
        let _ = classifier.pipeline.set(Some(pipeline));
        classifier.loaded.store(true, Ordering::Release);
        classifier
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            loaded: AtomicBool::new(false),
            load_lock: Mutex::new(()),
            pipeline: OnceLock::new(),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// How many times the pipeline source was actually read.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Acquire)
    }

    fn pipeline(&self) -> Option<&LevelPipeline> {
        if !self.loaded.load(Ordering::Acquire) {
            let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.loaded.load(Ordering::Acquire) {
                self.load_attempts.fetch_add(1, Ordering::AcqRel);
                let pipeline = match &self.source {
                    Source::File(path) => match load_pipeline(path) {
                        Ok(pipeline) => {
                            tracing::info!("Level pipeline loaded from {}", path.display());
                            Some(pipeline)
                        }
                        Err(e) => {
                            tracing::warn!("{}; using score thresholds", e);
                            None
                        }
                    },
                    Source::Disabled => None,
                };
                let _ = self.pipeline.set(pipeline);
                self.loaded.store(true, Ordering::Release);
            }
        }

        self.pipeline.get().and_then(Option::as_ref)
    }

    /// Never fails. Scores are expected on a 0-100 scale.
    pub fn classify(&self, score: f64) -> Classification {
        let Some(pipeline) = self.pipeline() else {
            return classify_by_thresholds(score);
        };

        match pipeline.predict(score) {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!("{}; using score thresholds", e);
                classify_by_thresholds(score)
            }
        }
    }
}

fn load_pipeline(path: &Path) -> Result<LevelPipeline, PipelineError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| PipelineError::Io(format!("{}: {}", path.display(), e)))?;
    LevelPipeline::from_json(&raw)
}
