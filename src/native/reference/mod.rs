//! Pure-Rust engine with the native contract.
//!
//! Each instance is an online linear model over features keyed by name,
//! trained by SGD on squared or logistic loss. Handles are real heap
//! addresses (`Box::into_raw`), so the bridge exercises the same ownership
//! rules it follows against the native shim.
//!
//! Native behaviours the bridge relies on are reproduced: `-f` writes the
//! model when the instance is destroyed, `-i` loads one, and a `--link`
//! given both on the command line and inside the loaded model fails with
//! the duplicate-link message.

pub mod args;
pub mod example;
pub mod model;

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::path::PathBuf;

use self::args::{Link, Loss, Options};
use self::example::{CONSTANT, Example};
use self::model::ModelFile;
use super::{NativeEngine, RawHandle};
use crate::error::NativeResult;

/// Learning rate used when neither the command line nor the model sets one.
pub const DEFAULT_LEARNING_RATE: f32 = 0.5;

/// Engine that runs learners in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

/// State behind one handle.
#[derive(Debug)]
struct Instance {
    quiet: bool,
    test_only: bool,
    final_regressor: Option<PathBuf>,
    /// Link as specified by the user or the loaded model; `None` is identity.
    link: Option<Link>,
    loss: Loss,
    learning_rate: f32,
    examples_seen: u64,
    weights: BTreeMap<String, f32>,
}

impl Instance {
    fn from_options(opts: Options) -> NativeResult<Self> {
        let loaded = match opts.initial_regressor.as_deref() {
            Some(path) => {
                let model = model::load(path)?;
                if !opts.quiet {
                    tracing::info!(
                        path = %path.display(),
                        weights = model.weights.len(),
                        examples = model.examples_seen,
                        "loaded initial regressor"
                    );
                }
                Some(model)
            }
            None => None,
        };

        let mut link = opts.link;
        let (loss, learning_rate, examples_seen, weights) = match loaded {
            Some(model) => {
                if let Some(stored) = model.link {
                    if link.is_some() {
                        return Err(args::duplicate("--link"));
                    }
                    link = Some(stored);
                }
                (
                    opts.loss.unwrap_or(model.loss),
                    opts.learning_rate.unwrap_or(model.learning_rate),
                    model.examples_seen,
                    model.weights,
                )
            }
            None => (
                opts.loss.unwrap_or_default(),
                opts.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE),
                0,
                BTreeMap::new(),
            ),
        };

        Ok(Self {
            quiet: opts.quiet,
            test_only: opts.test_only,
            final_regressor: opts.final_regressor,
            link,
            loss,
            learning_rate,
            examples_seen,
            weights,
        })
    }

    fn weight(&self, key: &str) -> f32 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    fn raw_score(&self, ex: &Example) -> f32 {
        let dot: f32 = ex
            .features
            .iter()
            .map(|(key, value)| self.weight(key) * value)
            .sum();
        ex.initial + self.weight(CONSTANT) + dot
    }

    /// Predict, then update when learning is enabled and the example is labeled.
    fn step(&mut self, ex: &Example, learn: bool) -> f32 {
        let raw = self.raw_score(ex);
        let prediction = self.link.unwrap_or(Link::Identity).apply(raw);

        if let (true, false, Some(label)) = (learn, self.test_only, ex.label) {
            let scale = self.learning_rate * ex.importance * self.loss.gradient(raw, label);
            *self.weights.entry(CONSTANT.to_string()).or_insert(0.0) -= scale;
            for (key, value) in &ex.features {
                *self.weights.entry(key.clone()).or_insert(0.0) -= scale * value;
            }
            self.examples_seen += 1;
        }

        prediction
    }

    fn finish(self) {
        let Some(path) = self.final_regressor else {
            return;
        };
        let model = ModelFile {
            link: self.link,
            loss: self.loss,
            learning_rate: self.learning_rate,
            examples_seen: self.examples_seen,
            weights: self.weights,
        };
        match model::save(&path, &model) {
            Ok(()) if !self.quiet => {
                tracing::info!(path = %path.display(), "saved final regressor");
            }
            Ok(()) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "final regressor not saved"),
        }
    }
}

impl NativeEngine for ReferenceEngine {
    fn initialize(&self, args: &str) -> NativeResult<RawHandle> {
        let instance = Instance::from_options(args::parse(args)?)?;
        let ptr = Box::into_raw(Box::new(instance)) as *mut c_void;
        Ok(RawHandle::from_ptr(ptr).expect("Box::into_raw never returns null"))
    }

    unsafe fn run(&self, handle: &RawHandle, sample: &str, learn: bool) -> NativeResult<f32> {
        let ex = example::parse(sample)?;
        // Safety: the handle came from `initialize` above and is live; callers
        // never run two calls on one handle at once, so this borrow is unique.
        let instance = unsafe { &mut *(handle.as_ptr() as *mut Instance) };
        Ok(instance.step(&ex, learn))
    }

    unsafe fn destroy(&self, handle: RawHandle) {
        // Safety: the handle came from `Box::into_raw` in `initialize` and is
        // consumed here, so the box is rebuilt exactly once.
        let instance = unsafe { Box::from_raw(handle.into_ptr() as *mut Instance) };
        instance.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::DOUBLE_LINK_ERROR_MSG;

    fn run(engine: &ReferenceEngine, handle: &RawHandle, sample: &str, learn: bool) -> f32 {
        unsafe { engine.run(handle, sample, learn) }.unwrap()
    }

    #[test]
    fn fresh_instance_predicts_zero() {
        let engine = ReferenceEngine;
        let handle = engine.initialize("--quiet").unwrap();
        assert_eq!(run(&engine, &handle, "-1 | ", false), 0.0);
        unsafe { engine.destroy(handle) };
    }

    #[test]
    fn learn_returns_pre_update_prediction() {
        let engine = ReferenceEngine;
        let handle = engine.initialize("--quiet").unwrap();
        let first = run(&engine, &handle, "1 | a b", true);
        let second = run(&engine, &handle, "1 | a b", true);
        assert_eq!(first, 0.0);
        assert!(second > 0.0);
        unsafe { engine.destroy(handle) };
    }

    #[test]
    fn test_only_disables_updates() {
        let engine = ReferenceEngine;
        let handle = engine.initialize("--quiet -t").unwrap();
        run(&engine, &handle, "1 | a", true);
        assert_eq!(run(&engine, &handle, "| a", false), 0.0);
        unsafe { engine.destroy(handle) };
    }

    #[test]
    fn squared_loss_step_matches_hand_computation() {
        let engine = ReferenceEngine;
        let handle = engine.initialize("--quiet -l 0.5").unwrap();
        run(&engine, &handle, "2 | x:0.5", true);
        // scale = 0.5 * (0 - 2) = -1 → constant 1.0, x 0.5 → 1.0 + 0.25
        let p = run(&engine, &handle, "| x:0.5", false);
        assert!((p - 1.25).abs() < 1e-6);
        unsafe { engine.destroy(handle) };
    }

    #[test]
    fn link_stored_in_model_conflicts_with_command_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logistic.model");
        let engine = ReferenceEngine;

        let handle = engine
            .initialize(&format!(
                "--quiet --loss_function logistic --link logistic -f {}",
                path.display()
            ))
            .unwrap();
        run(&engine, &handle, "1 | ", true);
        unsafe { engine.destroy(handle) };

        let err = engine
            .initialize(&format!("--quiet --link logistic -i {}", path.display()))
            .unwrap_err();
        assert_eq!(err.message(), DOUBLE_LINK_ERROR_MSG);

        let handle = engine
            .initialize(&format!("--quiet -i {}", path.display()))
            .unwrap();
        let p = run(&engine, &handle, "| ", false);
        assert!(p > 0.5 && p < 1.0);
        unsafe { engine.destroy(handle) };
    }

    #[test]
    fn unparseable_sample_is_a_native_error() {
        let engine = ReferenceEngine;
        let handle = engine.initialize("--quiet").unwrap();
        let err = unsafe { engine.run(&handle, "1 | x:y", true) }.unwrap_err();
        assert!(err.message().contains("feature value"));
        unsafe { engine.destroy(handle) };
    }
}
