//! Owned native learner: lifecycle, predict/learn dispatch, link repair.
//!
//! A [`Learner`] owns exactly one native handle from construction until
//! [`Learner::close`] (or drop). Construction retries once with a repaired
//! configuration when the engine reports the duplicate-link conflict; every
//! other native failure is returned as is.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LearnerConfig;
use crate::error::{InitError, InitResult, LearnerError, LearnerResult};
use crate::native::{NativeEngine, RawHandle};
use crate::repair;

/// Whether a learner still owns its native instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Open,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Open => write!(f, "open"),
            LifecycleState::Closed => write!(f, "closed"),
        }
    }
}

/// One native learner instance.
///
/// Not `Clone`: the handle has a single owner. Calls take `&mut self`, so two
/// calls can never run against the handle at the same time. The native
/// instance is released by [`Learner::close`] or, failing that, on drop.
pub struct Learner<E: NativeEngine> {
    engine: E,
    handle: Option<RawHandle>,
    open: AtomicBool,
}

impl<E: NativeEngine> Learner<E> {
    /// Create a native instance from a configuration string.
    ///
    /// If the engine rejects the arguments with the duplicate `--link`
    /// message, the first link directive is stripped and initialize is tried
    /// once more. The outcome of that retry is final.
    pub fn open(engine: E, args: &str) -> InitResult<Self> {
        if let Some(offset) = args.find('\0') {
            return Err(InitError::InvalidArgs { offset });
        }

        let handle = match engine.initialize(args) {
            Ok(handle) => handle,
            Err(err) if repair::is_link_conflict(err.message()) => {
                let repaired = repair::strip_link_directive(args);
                tracing::warn!("link function already encoded in model, retrying without --link");
                tracing::debug!(args = %repaired, "repaired configuration");
                engine
                    .initialize(&repaired)
                    .map_err(|source| InitError::Rejected { source })?
            }
            Err(source) => return Err(InitError::Rejected { source }),
        };

        tracing::info!(handle = ?handle.as_ptr(), "opened native learner");
        Ok(Self {
            engine,
            handle: Some(handle),
            open: AtomicBool::new(true),
        })
    }

    /// Create a native instance from a typed configuration.
    pub fn from_config(engine: E, config: &LearnerConfig) -> InitResult<Self> {
        Self::open(engine, &config.to_args())
    }

    /// Predict a sample without updating the model.
    pub fn predict(&mut self, sample: &str) -> LearnerResult<f32> {
        self.run(sample, false)
    }

    /// Learn from a sample, returning the prediction made for it.
    ///
    /// The native engine decides whether that prediction is taken before or
    /// during the update; engines shipped here return the pre-update value.
    pub fn learn(&mut self, sample: &str) -> LearnerResult<f32> {
        self.run(sample, true)
    }

    fn run(&mut self, sample: &str, learn: bool) -> LearnerResult<f32> {
        if !self.open.load(Ordering::Acquire) {
            return Err(LearnerError::AlreadyClosed);
        }
        let handle = self.handle.as_ref().ok_or(LearnerError::AlreadyClosed)?;
        if let Some(offset) = sample.find('\0') {
            return Err(LearnerError::InvalidSample { offset });
        }

        tracing::debug!(learn, "dispatching sample");
        // Safety: the handle came from `initialize` on this engine and the open
        // flag is still set, so it has not been destroyed. `&mut self` rules
        // out a concurrent call on the same handle.
        unsafe { self.engine.run(handle, sample, learn) }
            .map_err(|source| LearnerError::Native { source })
    }

    /// Release the native instance. Calling it again does nothing.
    pub fn close(&mut self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.handle.take() {
            tracing::info!(handle = ?handle.as_ptr(), "closing native learner");
            // Safety: the swap above succeeded exactly once for this learner,
            // and the handle is moved out so it cannot be reached again.
            unsafe { self.engine.destroy(handle) };
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        if self.open.load(Ordering::Acquire) {
            LifecycleState::Open
        } else {
            LifecycleState::Closed
        }
    }

    /// Whether the native instance is still held.
    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// The engine this learner dispatches to.
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(feature = "dylib")]
impl Learner<crate::native::dylib::DylibEngine> {
    /// Open a learner on the process-wide native library.
    ///
    /// The library is loaded on first use from
    /// [`crate::native::dylib::LIBRARY_ENV`].
    pub fn native(args: &str) -> crate::error::BridgeResult<Self> {
        let engine = crate::native::dylib::load(None)?;
        Ok(Self::open(engine, args)?)
    }
}

impl<E: NativeEngine> Drop for Learner<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: NativeEngine> fmt::Debug for Learner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Learner")
            .field("state", &self.state())
            .field("handle", &self.handle.as_ref().map(RawHandle::as_ptr))
            .finish()
    }
}
