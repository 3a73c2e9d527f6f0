//! Shared-library behavior modules.
//!
//! A module is any library exporting some of these C symbols:
//!
//! ```c
//! void init(char const** argv, unsigned int argc);
//! void handle(struct input_event const* e, int role);
//! void destroy(void);
//! void user1(void);
//! void user2(void);
//! ```
//!
//! Each symbol is resolved on its own; a missing one is logged and turns
//! the corresponding call into a no-op.

use super::{Plugin, PluginError};
use crate::device::event::RawInputEvent;
use crate::device::{InputEvent, Role};
use libloading::Library;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint};
use std::path::{Path, PathBuf};

type InitFn = unsafe extern "C" fn(*const *const c_char, c_uint);
type HandleFn = unsafe extern "C" fn(*const RawInputEvent, c_int);
type VoidFn = unsafe extern "C" fn();

/// A module loaded from a shared library.
pub struct DynamicPlugin {
    name: String,
    path: PathBuf,
    init: Option<InitFn>,
    handle: Option<HandleFn>,
    destroy: Option<VoidFn>,
    user1: Option<VoidFn>,
    user2: Option<VoidFn>,
    destroyed: bool,
    // Declared last: the entry points above are only valid while it is open.
    lib: Option<Library>,
}

impl DynamicPlugin {
    /// Opens the library at `path` (made absolute first) and binds its entry points.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let unavailable = |reason: String| PluginError::Unavailable {
            path: path.to_path_buf(),
            reason,
        };

        let abs = std::fs::canonicalize(path).map_err(|e| unavailable(e.to_string()))?;
        // SAFETY: running the library's initializers is inherent to loading a module.
        let lib = unsafe { Library::new(&abs) }.map_err(|e| unavailable(e.to_string()))?;

        let name = abs
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| abs.display().to_string());

        // SAFETY: the signatures are fixed by the module ABI.
        let plugin = unsafe {
            Self {
                init: resolve::<InitFn>(&lib, b"init\0"),
                handle: resolve::<HandleFn>(&lib, b"handle\0"),
                destroy: resolve::<VoidFn>(&lib, b"destroy\0"),
                user1: resolve::<VoidFn>(&lib, b"user1\0"),
                user2: resolve::<VoidFn>(&lib, b"user2\0"),
                name,
                path: abs,
                destroyed: false,
                lib: Some(lib),
            }
        };

        tracing::debug!(
            path = %plugin.path.display(),
            entry_points = ?plugin.entry_points(),
            "Module library opened"
        );
        Ok(plugin)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the entry points that resolved.
    pub fn entry_points(&self) -> Vec<&'static str> {
        [
            ("init", self.init.is_some()),
            ("handle", self.handle.is_some()),
            ("destroy", self.destroy.is_some()),
            ("user1", self.user1.is_some()),
            ("user2", self.user2.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

/// Looks up `symbol`, returning `None` (with a warning) if it is absent.
///
/// # Safety
/// `T` must be the actual type of the exported symbol.
unsafe fn resolve<T: Copy>(lib: &Library, symbol: &[u8]) -> Option<T> {
    match lib.get::<T>(symbol) {
        Ok(sym) => Some(*sym),
        Err(e) => {
            let name = String::from_utf8_lossy(&symbol[..symbol.len() - 1]);
            tracing::warn!(symbol = %name, error = %e, "Module entry point not found");
            None
        }
    }
}

impl Plugin for DynamicPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.lib.is_some()
    }

    fn init(&mut self, args: &[String]) {
        let Some(init) = self.init else {
            return;
        };

        let owned: Vec<CString> = args
            .iter()
            .filter_map(|arg| match CString::new(arg.as_str()) {
                Ok(c) => Some(c),
                Err(_) => {
                    tracing::warn!(arg = %arg, "Dropping module argument containing NUL");
                    None
                }
            })
            .collect();
        let argv: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();

        // SAFETY: argv points into `owned`, which outlives the call.
        unsafe { init(argv.as_ptr(), argv.len() as c_uint) };
    }

    fn handle(&mut self, event: &InputEvent, role: Role) {
        if let Some(handle) = self.handle {
            let raw = RawInputEvent::from(*event);
            // SAFETY: `raw` lives for the duration of the call.
            unsafe { handle(&raw, role as c_int) };
        }
    }

    fn user1(&mut self) {
        if let Some(user1) = self.user1 {
            // SAFETY: resolved from the open library.
            unsafe { user1() };
        }
    }

    fn user2(&mut self) {
        if let Some(user2) = self.user2 {
            // SAFETY: resolved from the open library.
            unsafe { user2() };
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(destroy) = self.destroy {
            // SAFETY: resolved from the open library.
            unsafe { destroy() };
        }
    }

    fn unload(mut self: Box<Self>) {
        if !self.destroyed {
            tracing::warn!(module = %self.name, "Unloading module that was never destroyed");
        }
        if let Some(lib) = self.lib.take() {
            match lib.close() {
                Ok(()) => tracing::debug!(module = %self.name, "Module library closed"),
                Err(e) => tracing::error!(module = %self.name, error = %e, "Failed to close module library"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::codes;
    use std::io::Write;

    /// A system library that exports none of the module entry points.
    fn library_without_entry_points() -> Option<PathBuf> {
        [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    #[test]
    fn test_nonexistent_path_is_unavailable() {
        let err = DynamicPlugin::load("/nonexistent/module.so").err().unwrap();
        assert!(matches!(err, PluginError::Unavailable { .. }));
    }

    #[test]
    fn test_non_library_file_is_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an ELF object").unwrap();

        let err = DynamicPlugin::load(file.path()).err().unwrap();
        assert!(matches!(err, PluginError::Unavailable { .. }));
    }

    #[test]
    fn test_library_without_entry_points_is_ready_and_inert() {
        let Some(path) = library_without_entry_points() else {
            return;
        };

        let mut plugin = DynamicPlugin::load(&path).unwrap();
        assert!(plugin.is_ready());
        assert!(plugin.entry_points().is_empty());

        plugin.init(&["config=x".to_string()]);
        plugin.handle(&InputEvent::new(codes::EV_KEY, codes::KEY_A, 1), 1);
        plugin.user1();
        plugin.user2();
        plugin.destroy();
        Box::new(plugin).unload();
    }
}
