//! The native engine boundary.
//!
//! A native learner is reached through three primitives, modelled by the
//! [`NativeEngine`] trait: `initialize` hands out an opaque [`RawHandle`],
//! `run` pushes one sample through it in predict or learn mode, and
//! `destroy` releases it. Two implementations ship with the crate:
//!
//! - [`reference::ReferenceEngine`] — pure-Rust engine with the same
//!   contract, used by tests, benches and the CLI when no shim is given
//! - [`dylib::DylibEngine`] — the native shim loaded through `libloading`
//!   (feature `dylib`)

#[cfg(feature = "dylib")]
pub mod dylib;
pub mod reference;

use std::ffi::c_void;
use std::ptr::NonNull;

use crate::error::NativeResult;

/// Opaque address of one native learner instance.
///
/// Deliberately neither `Clone` nor `Copy`: a handle has exactly one owner,
/// and [`NativeEngine::destroy`] consumes it.
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct RawHandle(NonNull<c_void>);

// Safety: native instances have no thread affinity, so the single owner may
// move between threads. `RawHandle` is not `Sync`.
unsafe impl Send for RawHandle {}

impl RawHandle {
    /// Wrap a pointer returned by a native initialize call.
    ///
    /// Returns `None` for null, which native code uses to signal failure.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawHandle)
    }

    /// The raw address, for passing back across the boundary.
    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Release ownership as a raw pointer.
    pub fn into_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// The three primitives a native learner exposes.
///
/// Implementations are not required to be reentrant. Callers must never
/// issue two calls against the same handle concurrently; [`crate::Learner`]
/// enforces this with `&mut self`.
pub trait NativeEngine {
    /// Create a new native instance from a configuration string.
    ///
    /// The error carries the engine's message verbatim.
    fn initialize(&self, args: &str) -> NativeResult<RawHandle>;

    /// Run one sample through the instance, updating it when `learn` is set.
    ///
    /// Returns the engine's prediction for the sample.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`NativeEngine::initialize`] on this engine
    /// and must not have been passed to [`NativeEngine::destroy`].
    unsafe fn run(&self, handle: &RawHandle, sample: &str, learn: bool) -> NativeResult<f32>;

    /// Release a native instance.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`NativeEngine::initialize`] on this engine.
    unsafe fn destroy(&self, handle: RawHandle);
}

impl<E: NativeEngine + ?Sized> NativeEngine for &E {
    fn initialize(&self, args: &str) -> NativeResult<RawHandle> {
        (**self).initialize(args)
    }

    unsafe fn run(&self, handle: &RawHandle, sample: &str, learn: bool) -> NativeResult<f32> {
        // Safety: forwarded contract.
        unsafe { (**self).run(handle, sample, learn) }
    }

    unsafe fn destroy(&self, handle: RawHandle) {
        // Safety: forwarded contract.
        unsafe { (**self).destroy(handle) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_a_handle() {
        assert!(RawHandle::from_ptr(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn handle_round_trips_its_address() {
        let boxed = Box::into_raw(Box::new(7u32)) as *mut c_void;
        let handle = RawHandle::from_ptr(boxed).unwrap();
        assert_eq!(handle.as_ptr(), boxed);
        let ptr = handle.into_ptr();
        // Safety: allocated above and released exactly once here.
        drop(unsafe { Box::from_raw(ptr as *mut u32) });
    }
}
