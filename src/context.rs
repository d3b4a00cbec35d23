//! The session object every wrapper hangs off.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::abilities::{AbilitiesList, PortInfo, PortInfoList};
use crate::backend::{self, Backend, ContextHandle, Native};
use crate::config::Config;
use crate::error::Result;
use crate::library::Gphoto2Library;
use crate::list::{select_usb_paths, CameraList};
use crate::retry::{DeviceReleaser, UnmountCommand};
use crate::sys;

/// The backend plus the native `GPContext` made from it.
///
/// Registries hold this rather than a [`Context`], so the context's caches
/// do not keep the context alive.
pub(crate) struct Session {
    backend: Rc<dyn Backend>,
    handle: ContextHandle,
}

impl Session {
    pub(crate) fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    pub(crate) fn handle(&self) -> ContextHandle {
        self.handle
    }

    pub(crate) fn check<T>(&self, result: Native<T>) -> Result<T> {
        backend::check(self.backend(), result)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.backend.context_unref(self.handle);
    }
}

struct ContextInner {
    session: Rc<Session>,
    config: Config,
    releaser: Box<dyn DeviceReleaser>,
    abilities: OnceCell<AbilitiesList>,
    ports: OnceCell<PortInfoList>,
}

/// A libgphoto2 session.
///
/// Cloning is cheap and shares the native context, the configuration and the
/// ability/port registries, which are loaded on first use and kept for the
/// life of the session.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    /// Load libgphoto2 with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Load libgphoto2 with [`Config::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::with_config(Config::from_env())
    }

    /// Load libgphoto2 with an explicit configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let library = match &config.library_path {
            Some(path) => Gphoto2Library::from_path(path)?,
            None => Gphoto2Library::load()?,
        };
        Self::with_backend(Rc::new(library), config)
    }

    /// Build a session over any backend, with the unmount command from
    /// `config` as the lock releaser.
    pub fn with_backend(backend: Rc<dyn Backend>, config: Config) -> Result<Self> {
        let releaser = Box::new(UnmountCommand::from_config(&config));
        Self::with_releaser(backend, config, releaser)
    }

    /// Build a session with a custom lock releaser.
    pub fn with_releaser(
        backend: Rc<dyn Backend>,
        config: Config,
        releaser: Box<dyn DeviceReleaser>,
    ) -> Result<Self> {
        let handle = match backend.context_new() {
            Some(handle) => handle,
            None => return backend::check(&*backend, Err(sys::GP_ERROR_NO_MEMORY)),
        };
        let session = Rc::new(Session { backend, handle });
        Ok(Context {
            inner: Rc::new(ContextInner {
                session,
                config,
                releaser,
                abilities: OnceCell::new(),
                ports: OnceCell::new(),
            }),
        })
    }

    /// Settings this session was created with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn session(&self) -> &Rc<Session> {
        &self.inner.session
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.inner.session.backend()
    }

    pub(crate) fn handle(&self) -> ContextHandle {
        self.inner.session.handle()
    }

    pub(crate) fn releaser(&self) -> &dyn DeviceReleaser {
        &*self.inner.releaser
    }

    /// Turn a native status into a `Result`.
    pub(crate) fn check<T>(&self, result: Native<T>) -> Result<T> {
        self.inner.session.check(result)
    }

    /// `gp_library_version` output, one newline-terminated line per entry.
    pub fn library_version(&self, verbose: bool) -> String {
        self.backend()
            .library_version(verbose)
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }

    /// Every camera model libgphoto2 has a driver for.
    pub fn abilities_list(&self) -> Result<AbilitiesList> {
        if let Some(list) = self.inner.abilities.get() {
            return Ok(list.clone());
        }
        let list = AbilitiesList::load(self.session())?;
        let _ = self.inner.abilities.set(list.clone());
        Ok(list)
    }

    /// Every port the installed I/O drivers can reach.
    pub fn port_info_list(&self) -> Result<PortInfoList> {
        if let Some(list) = self.inner.ports.get() {
            return Ok(list.clone());
        }
        let list = PortInfoList::load(self.session())?;
        let _ = self.inner.ports.set(list.clone());
        Ok(list)
    }

    /// Port entry for a path such as `usb:001,004`.
    pub fn port_info(&self, path: &str) -> Result<PortInfo> {
        let ports = self.port_info_list()?;
        let index = ports.lookup_path(path)?;
        ports.info(index)
    }

    /// Connected cameras as (model, port path) pairs.
    ///
    /// Uses `gp_camera_autodetect` when the library has it; older libraries
    /// detect through the ability list, keeping USB entries only. Those
    /// versions sometimes report a bare `usb:` next to the real
    /// `usb:BBB,DDD` path for a single camera, see [`select_usb_paths`].
    pub fn autodetect(&self) -> Result<CameraList> {
        let list = CameraList::new(self)?;
        if let Some(result) = self.backend().camera_autodetect(list.handle(), self.handle()) {
            self.check(result)?;
            return Ok(list);
        }

        tracing::debug!("gp_camera_autodetect unavailable, detecting through the ability list");
        let abilities = self.abilities_list()?;
        let ports = self.port_info_list()?;
        let detected = CameraList::new(self)?;
        abilities.detect(&ports, &detected)?;
        for (model, path) in select_usb_paths(&detected.entries()?) {
            list.append(&model, Some(&path))?;
        }
        Ok(list)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    #[test]
    fn test_context_released_with_last_clone() {
        let mock = Rc::new(MockBackend::new());
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        let other = ctx.clone();
        drop(ctx);
        assert_eq!(mock.live_objects(), 1);
        drop(other);
        assert_eq!(mock.live_objects(), 0);
    }

    #[test]
    fn test_library_version_lines() {
        let mock = Rc::new(MockBackend::new().with_version(&["2.5.27", "gcc"]));
        let ctx = Context::with_backend(mock, Config::default()).unwrap();
        assert_eq!(ctx.library_version(false), "2.5.27\n");
        assert_eq!(ctx.library_version(true), "2.5.27\ngcc\n");
    }

    #[test]
    fn test_registries_loaded_once() {
        let mock = Rc::new(MockBackend::new());
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        ctx.abilities_list().unwrap();
        ctx.abilities_list().unwrap();
        ctx.port_info_list().unwrap();
        ctx.port_info_list().unwrap();
        assert_eq!(mock.calls("abilities_list_load"), 1);
        assert_eq!(mock.calls("port_info_list_load"), 1);
    }

    #[test]
    fn test_context_creation_failure() {
        let mock = Rc::new(MockBackend::new().without_context());
        let err = Context::with_backend(mock, Config::default()).unwrap_err();
        assert_eq!(err.code(), Some(sys::GP_ERROR_NO_MEMORY));
    }
}
