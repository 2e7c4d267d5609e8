// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # vw-bridge
//!
//! Safe ownership of a native online learner behind two calls: `predict`
//! and `learn`.
//!
//! ## Architecture
//!
//! - **Learner** (`learner`): owns one native handle, dispatches samples,
//!   releases the handle exactly once on close or drop
//! - **Repair** (`repair`): strips a redundant `--link` directive when the
//!   native engine refuses to load a model that already encodes one
//! - **Native boundary** (`native`): the [`NativeEngine`] trait, the
//!   `libloading` shim binding, and an in-process reference engine
//! - **Config** (`config`): typed configuration rendered to the native
//!   argument string, persisted as TOML
//!
//! ## Library usage
//!
//! ```no_run
//! use vw_bridge::{Learner, ReferenceEngine};
//!
//! let mut learner = Learner::open(ReferenceEngine, "--quiet").unwrap();
//! let before = learner.learn("1 |f height:0.23 weight:0.25").unwrap();
//! let after = learner.predict("|f height:0.23 weight:0.25").unwrap();
//! assert_ne!(before, after);
//! learner.close();
//! ```

pub mod config;
pub mod error;
pub mod learner;
pub mod native;
pub mod repair;

pub use config::LearnerConfig;
pub use error::{BridgeError, InitError, LearnerError, NativeError};
pub use learner::{Learner, LifecycleState};
pub use native::reference::ReferenceEngine;
pub use native::{NativeEngine, RawHandle};
