//! Native shim loaded at runtime through `libloading`.
//!
//! The shim wraps the native learner behind a small C ABI:
//!
//! ```c
//! void* vw_bridge_initialize(const char* args, char** error_out);
//! float vw_bridge_run(void* handle, const char* example, bool learn, char** error_out);
//! void  vw_bridge_destroy(void* handle);
//! void  vw_bridge_free_string(char* message);
//! ```
//!
//! Failures are reported by writing a heap string into `error_out`, which the
//! caller releases with `vw_bridge_free_string`. `initialize` returns null on
//! failure.
//!
//! The library is loaded at most once per process and kept for its lifetime,
//! so [`DylibEngine`] is a cheap `Copy` view of a `'static` library.

use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use libloading::Library;

use super::{NativeEngine, RawHandle};
use crate::error::{LoadError, LoadResult, NativeError, NativeResult};

/// Environment variable naming the shim when no path is passed explicitly.
pub const LIBRARY_ENV: &str = "VW_BRIDGE_LIBRARY";

type InitializeFn = unsafe extern "C" fn(*const c_char, *mut *mut c_char) -> *mut c_void;
type RunFn = unsafe extern "C" fn(*mut c_void, *const c_char, bool, *mut *mut c_char) -> f32;
type DestroyFn = unsafe extern "C" fn(*mut c_void);
type FreeStringFn = unsafe extern "C" fn(*mut c_char);

static LOADER: Loader = Loader::new(LIBRARY_ENV, BridgeLibrary::open);

/// Entry points of the vw_bridge ABI.
#[derive(Clone, Copy)]
struct Symbols {
    initialize: InitializeFn,
    run: RunFn,
    destroy: DestroyFn,
    free_string: FreeStringFn,
}

/// A loaded shim and its resolved entry points.
struct BridgeLibrary {
    path: PathBuf,
    symbols: Symbols,
    // Keeps the function pointers above valid. `None` when the entry points
    // are linked into this binary.
    _library: Option<Library>,
}

impl BridgeLibrary {
    fn open(path: &Path) -> LoadResult<Self> {
        let display = path.display().to_string();

        // Safety: loading runs the shim's initializers; the shim is trusted
        // the same way any linked native dependency is.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;

        // Safety: each symbol is read with the signature of the vw_bridge ABI.
        let initialize = unsafe { symbol::<InitializeFn>(&library, &display, "vw_bridge_initialize")? };
        let run = unsafe { symbol::<RunFn>(&library, &display, "vw_bridge_run")? };
        let destroy = unsafe { symbol::<DestroyFn>(&library, &display, "vw_bridge_destroy")? };
        let free_string =
            unsafe { symbol::<FreeStringFn>(&library, &display, "vw_bridge_free_string")? };

        Ok(Self {
            path: path.to_path_buf(),
            symbols: Symbols {
                initialize,
                run,
                destroy,
                free_string,
            },
            _library: Some(library),
        })
    }

    /// Take ownership of a native error string, if one was written.
    ///
    /// # Safety
    ///
    /// `message` must be null or a NUL-terminated string allocated by the shim.
    unsafe fn take_error(&self, message: *mut c_char) -> Option<NativeError> {
        if message.is_null() {
            return None;
        }
        // Safety: non-null, NUL-terminated by contract.
        let text = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
        // Safety: allocated by the shim, released exactly once here.
        unsafe { (self.symbols.free_string)(message) };
        Some(NativeError::new(text))
    }
}

/// Copy a function pointer out of the library.
///
/// # Safety
///
/// `T` must match the exported symbol's real signature.
unsafe fn symbol<T: Copy>(library: &Library, path: &str, name: &'static str) -> LoadResult<T> {
    let mut raw = Vec::with_capacity(name.len() + 1);
    raw.extend_from_slice(name.as_bytes());
    raw.push(0);
    // Safety: forwarded to the caller.
    unsafe { library.get::<T>(&raw) }
        .map(|sym| *sym)
        .map_err(|e| LoadError::MissingSymbol {
            path: path.to_string(),
            symbol: name,
            message: e.to_string(),
        })
}

/// Load the shim once for this process and return an engine over it.
///
/// With `path = None` an already-loaded library is reused, otherwise the
/// path comes from [`LIBRARY_ENV`]. Asking for a different path after the
/// first load is an error.
pub fn load(path: Option<&Path>) -> LoadResult<DylibEngine> {
    LOADER.load(path)
}

/// Process-wide slot holding at most one loaded library.
struct Loader {
    env: &'static str,
    open: fn(&Path) -> LoadResult<BridgeLibrary>,
    library: OnceLock<BridgeLibrary>,
    lock: Mutex<()>,
}

impl Loader {
    const fn new(env: &'static str, open: fn(&Path) -> LoadResult<BridgeLibrary>) -> Self {
        Self {
            env,
            open,
            library: OnceLock::new(),
            lock: Mutex::new(()),
        }
    }

    fn load(&'static self, path: Option<&Path>) -> LoadResult<DylibEngine> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(library) = self.library.get() {
            return match path {
                Some(requested) if requested != library.path.as_path() => {
                    Err(LoadError::AlreadyLoaded {
                        loaded: library.path.display().to_string(),
                        requested: requested.display().to_string(),
                    })
                }
                _ => Ok(DylibEngine { library }),
            };
        }

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var_os(self.env)
                .map(PathBuf::from)
                .ok_or(LoadError::NoPath { var: self.env })?,
        };

        let library = (self.open)(&path)?;
        tracing::info!(path = %path.display(), "loaded native learner library");
        Ok(DylibEngine {
            library: self.library.get_or_init(|| library),
        })
    }
}

/// Engine backed by the process-wide native shim.
#[derive(Clone, Copy)]
pub struct DylibEngine {
    library: &'static BridgeLibrary,
}

impl DylibEngine {
    /// Path the shim was loaded from.
    pub fn path(&self) -> &Path {
        &self.library.path
    }
}

impl fmt::Debug for DylibEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DylibEngine")
            .field("path", &self.library.path)
            .finish()
    }
}

fn c_string(text: &str) -> NativeResult<CString> {
    CString::new(text).map_err(|e| {
        NativeError::new(format!("interior NUL byte at offset {}", e.nul_position()))
    })
}

impl NativeEngine for DylibEngine {
    fn initialize(&self, args: &str) -> NativeResult<RawHandle> {
        let args = c_string(args)?;
        let mut error = std::ptr::null_mut();

        // Safety: `args` outlives the call and `error` is a valid out-pointer.
        let ptr = unsafe { (self.library.symbols.initialize)(args.as_ptr(), &mut error) };
        // Safety: `error` is null or shim-allocated.
        let error = unsafe { self.library.take_error(error) };

        match (RawHandle::from_ptr(ptr), error) {
            (Some(handle), None) => Ok(handle),
            (Some(handle), Some(err)) => {
                // A handle next to an error is treated as a failed initialize.
                // Safety: fresh handle from this library, never exposed.
                unsafe { (self.library.symbols.destroy)(handle.into_ptr()) };
                Err(err)
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(NativeError::new("native initialize returned no instance")),
        }
    }

    unsafe fn run(&self, handle: &RawHandle, sample: &str, learn: bool) -> NativeResult<f32> {
        let sample = c_string(sample)?;
        let mut error = std::ptr::null_mut();

        // Safety: the caller guarantees `handle` is live; `sample` outlives the call.
        let value = unsafe { (self.library.symbols.run)(handle.as_ptr(), sample.as_ptr(), learn, &mut error) };
        // Safety: `error` is null or shim-allocated.
        match unsafe { self.library.take_error(error) } {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    unsafe fn destroy(&self, handle: RawHandle) {
        // Safety: the caller guarantees `handle` came from this library and is live.
        unsafe { (self.library.symbols.destroy)(handle.into_ptr()) }
    }
}
