//! Camera handle: init with lock recovery, capture, download, configuration.

use std::fmt;
use std::path::Path;

use crate::abilities::{CameraAbilities, PortInfo};
use crate::backend::{CameraHandle, CameraTextKind, Native};
use crate::config_tree::{self, ConfigEntry, ConfigTree};
use crate::context::Context;
use crate::error::{GphotoError, Result};
use crate::ffi::to_c_string;
use crate::file::CameraFile;
use crate::list::CameraList;
use crate::retry::{capture_with_retry, init_with_retry};
use crate::sys;
use crate::types::{CameraFilePath, CaptureType, FileType};
use crate::widget::Widget;

/// A camera connected through libgphoto2.
///
/// Dropping the camera exits and frees the native handle unless
/// [`leave_locked`](Self::leave_locked) was called.
pub struct Camera {
    ctx: Context,
    handle: Option<CameraHandle>,
    initialized: bool,
    leave_locked: bool,
}

impl Camera {
    /// Allocate a camera without connecting to it.
    pub fn new(ctx: &Context) -> Result<Self> {
        let handle = ctx.check(ctx.backend().camera_new())?;
        Ok(Camera {
            ctx: ctx.clone(),
            handle: Some(handle),
            initialized: false,
            leave_locked: false,
        })
    }

    /// Allocate and initialize the first camera libgphoto2 finds.
    pub fn open(ctx: &Context) -> Result<Self> {
        let mut camera = Self::new(ctx)?;
        camera.init()?;
        Ok(camera)
    }

    /// Allocate a camera bound to a known model and port, as returned by
    /// [`Context::autodetect`], then initialize it.
    pub fn open_at(ctx: &Context, model: &str, port: &str) -> Result<Self> {
        let mut camera = Self::new(ctx)?;
        let abilities = ctx.abilities_list()?.abilities_for_model(model)?;
        camera.set_abilities(&abilities)?;
        camera.set_port_info(&ctx.port_info(port)?)?;
        camera.init()?;
        Ok(camera)
    }

    /// Whether init has succeeded and the camera was not closed since.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The handle, or the status the library gives for a missing camera.
    fn native(&self) -> Native<CameraHandle> {
        self.handle.ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn handle(&self) -> Result<CameraHandle> {
        self.ctx.check(self.native())
    }

    /// Connect to the device.
    ///
    /// A lock error means another process (usually the desktop automounter)
    /// has claimed the camera: the configured releaser runs and init is
    /// attempted again, up to [`Config::retries`](crate::Config) more times.
    /// Other errors are returned at once. Calling this on an initialized
    /// camera does nothing.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            tracing::warn!("camera is already initialized");
            return Ok(());
        }
        if self.handle.is_none() {
            self.handle = Some(self.ctx.check(self.ctx.backend().camera_new())?);
        }
        let handle = self.handle()?;
        let ctx = &self.ctx;
        let result = init_with_retry(ctx.config().retries, ctx.releaser(), || {
            ctx.backend().camera_init(handle, ctx.handle())
        });
        ctx.check(result)?;
        self.initialized = true;
        tracing::info!("camera initialized");
        Ok(())
    }

    /// Disconnect and free the native camera. A later [`init`](Self::init)
    /// starts over with a fresh handle.
    pub fn close(&mut self) -> Result<()> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        let was_initialized = std::mem::replace(&mut self.initialized, false);
        let backend = self.ctx.backend();
        let exited = if was_initialized {
            backend.camera_exit(handle, self.ctx.handle())
        } else {
            Ok(())
        };
        let freed = backend.camera_free(handle);
        self.ctx.check(exited)?;
        self.ctx.check(freed)
    }

    /// [`close`](Self::close) then [`init`](Self::init).
    pub fn reinit(&mut self) -> Result<()> {
        self.close()?;
        self.init()
    }

    /// Keep the device claimed after this value is dropped.
    pub fn leave_locked(&mut self) {
        self.leave_locked = true;
    }

    fn text(&self, kind: CameraTextKind) -> Result<String> {
        let handle = self.handle()?;
        self.ctx
            .check(self.ctx.backend().camera_get_text(handle, kind, self.ctx.handle()))
    }

    /// Summary text from the driver.
    pub fn summary(&self) -> Result<String> {
        self.text(CameraTextKind::Summary)
    }

    /// Driver manual.
    pub fn manual(&self) -> Result<String> {
        self.text(CameraTextKind::Manual)
    }

    /// About text of the driver.
    pub fn about(&self) -> Result<String> {
        self.text(CameraTextKind::About)
    }

    /// Abilities of the driver in use.
    pub fn abilities(&self) -> Result<CameraAbilities> {
        let handle = self.handle()?;
        let raw = self.ctx.check(self.ctx.backend().camera_get_abilities(handle))?;
        Ok(CameraAbilities::from_raw(raw))
    }

    /// Choose the driver. Only meaningful before [`init`](Self::init).
    pub fn set_abilities(&self, abilities: &CameraAbilities) -> Result<()> {
        let handle = self.handle()?;
        self.ctx.check(
            self.ctx
                .backend()
                .camera_set_abilities(handle, abilities.as_raw()),
        )
    }

    /// Reading the port back is not supported.
    pub fn port_info(&self) -> Result<PortInfo> {
        Err(GphotoError::NotImplemented {
            operation: "Camera::port_info",
        })
    }

    /// Choose the port. Only meaningful before [`init`](Self::init).
    pub fn set_port_info(&self, info: &PortInfo) -> Result<()> {
        let handle = self.handle()?;
        self.ctx
            .check(self.ctx.backend().camera_set_port_info(handle, info.record()))
    }

    /// The configuration tree, as a root widget.
    pub fn config(&self) -> Result<Widget> {
        let handle = self.handle()?;
        let root = self
            .ctx
            .check(self.ctx.backend().camera_get_config(handle, self.ctx.handle()))?;
        Ok(Widget::from_root(&self.ctx, root))
    }

    /// Write back a configuration tree obtained from [`config`](Self::config).
    pub fn set_config(&self, window: &Widget) -> Result<()> {
        let handle = self.handle()?;
        self.ctx.check(self.ctx.backend().camera_set_config(
            handle,
            window.handle(),
            self.ctx.handle(),
        ))
    }

    /// Leaf paths of the configuration, e.g. `main.imgsettings.iso`.
    pub fn list_config(&self) -> Result<Vec<String>> {
        config_tree::list_paths(&self.config()?)
    }

    /// Leaf settings of the configuration, decoded.
    pub fn config_entries(&self) -> Result<Vec<ConfigEntry>> {
        config_tree::walk(&self.config()?)
    }

    /// Configuration as an ordered tree of sections and settings.
    pub fn config_tree(&self) -> Result<ConfigTree> {
        ConfigTree::build(&self.config()?)
    }

    /// Take a picture.
    ///
    /// With a destination the image is downloaded there and `None` returned;
    /// otherwise the image stays on the device and its location is returned.
    pub fn capture_image(&self, destination: Option<&Path>) -> Result<Option<CameraFilePath>> {
        let handle = self.handle()?;
        let ctx = &self.ctx;
        let path = ctx.check(capture_with_retry("capture_image", ctx.config(), || {
            ctx.backend()
                .camera_capture(handle, CaptureType::Image, ctx.handle())
        }))?;
        tracing::debug!("captured {}", path);

        match destination {
            Some(destination) => {
                self.download_file(&path.folder, &path.name, destination)?;
                Ok(None)
            }
            None => Ok(Some(path)),
        }
    }

    /// Grab a preview frame, also saving it when a destination is given.
    pub fn capture_preview(&self, destination: Option<&Path>) -> Result<CameraFile> {
        let handle = self.handle()?;
        let file = CameraFile::new(&self.ctx)?;
        let ctx = &self.ctx;
        ctx.check(capture_with_retry("capture_preview", ctx.config(), || {
            ctx.backend()
                .camera_capture_preview(handle, file.handle(), ctx.handle())
        }))?;
        if let Some(destination) = destination {
            file.save(destination)?;
        }
        Ok(file)
    }

    /// Fetch a file from the device without saving it.
    pub fn file(&self, folder: &str, name: &str, file_type: FileType) -> Result<CameraFile> {
        let handle = self.handle()?;
        CameraFile::from_camera(&self.ctx, handle, folder, name, file_type)
    }

    /// Copy a device file to `destination`.
    pub fn download_file<P: AsRef<Path>>(
        &self,
        folder: &str,
        name: &str,
        destination: P,
    ) -> Result<()> {
        self.file(folder, name, FileType::Normal)?
            .save(destination)
    }

    /// Release the shutter without waiting for the image.
    pub fn trigger_capture(&self) -> Result<()> {
        let handle = self.handle()?;
        self.ctx
            .check(self.ctx.backend().camera_trigger_capture(handle, self.ctx.handle()))
    }

    /// Event polling is not supported.
    pub fn wait_for_event(&self, _timeout_ms: i32) -> Result<()> {
        Err(GphotoError::NotImplemented {
            operation: "Camera::wait_for_event",
        })
    }

    /// Subfolders of `folder` on the device.
    pub fn list_folders(&self, folder: &str) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let c_folder = to_c_string(folder)?;
        let list = CameraList::new(&self.ctx)?;
        self.ctx.check(self.ctx.backend().camera_folder_list_folders(
            handle,
            &c_folder,
            list.handle(),
            self.ctx.handle(),
        ))?;
        list.names()
    }

    /// Files in `folder` on the device.
    pub fn list_files(&self, folder: &str) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let c_folder = to_c_string(folder)?;
        let list = CameraList::new(&self.ctx)?;
        self.ctx.check(self.ctx.backend().camera_folder_list_files(
            handle,
            &c_folder,
            list.handle(),
            self.ctx.handle(),
        ))?;
        list.names()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if self.leave_locked {
            tracing::debug!("leaving camera locked");
            return;
        }
        if let Err(err) = self.close() {
            tracing::warn!("closing camera failed: {}", err);
        }
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("handle", &self.handle)
            .field("initialized", &self.initialized)
            .field("leave_locked", &self.leave_locked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockWidget};
    use crate::Config;
    use std::rc::Rc;

    fn context(mock: MockBackend) -> (Rc<MockBackend>, Context) {
        let mock = Rc::new(mock);
        let config = Config::default().with_unmount_command(None).with_unmount_settle(Default::default());
        let ctx = Context::with_backend(mock.clone(), config).unwrap();
        (mock, ctx)
    }

    #[test]
    fn test_double_init_is_ignored() {
        let (mock, ctx) = context(MockBackend::new());
        let mut camera = Camera::open(&ctx).unwrap();
        camera.init().unwrap();
        assert_eq!(mock.calls("camera_init"), 1);
        assert!(camera.is_initialized());
    }

    #[test]
    fn test_close_and_reinit() {
        let (mock, ctx) = context(MockBackend::new());
        let mut camera = Camera::open(&ctx).unwrap();
        camera.close().unwrap();
        assert!(!camera.is_initialized());
        assert_eq!(mock.calls("camera_exit"), 1);
        assert_eq!(mock.calls("camera_free"), 1);

        camera.init().unwrap();
        assert_eq!(mock.calls("camera_new"), 2);
        camera.reinit().unwrap();
        assert_eq!(mock.calls("camera_init"), 3);

        drop(camera);
        drop(ctx);
        assert_eq!(mock.live_objects(), 0);
    }

    #[test]
    fn test_closed_camera_rejects_operations() {
        let (_mock, ctx) = context(MockBackend::new());
        let mut camera = Camera::open(&ctx).unwrap();
        camera.close().unwrap();
        let err = camera.summary().unwrap_err();
        assert_eq!(err.code(), Some(sys::GP_ERROR_BAD_PARAMETERS));
    }

    #[test]
    fn test_uninitialized_camera_is_forwarded() {
        let (mock, ctx) = context(MockBackend::new());
        let camera = Camera::new(&ctx).unwrap();
        assert!(camera.capture_image(None).is_err());
        assert_eq!(mock.calls("camera_capture"), 1);
    }

    #[test]
    fn test_leave_locked_skips_release() {
        let (mock, ctx) = context(MockBackend::new());
        let mut camera = Camera::open(&ctx).unwrap();
        camera.leave_locked();
        drop(camera);
        assert_eq!(mock.calls("camera_exit"), 0);
        assert_eq!(mock.calls("camera_free"), 0);
    }

    #[test]
    fn test_texts() {
        let (_mock, ctx) = context(MockBackend::new().with_summary("Model: Mock\nSerial: 1"));
        let camera = Camera::open(&ctx).unwrap();
        assert_eq!(camera.summary().unwrap(), "Model: Mock\nSerial: 1");
        assert!(!camera.manual().unwrap().is_empty());
        assert!(!camera.about().unwrap().is_empty());
    }

    #[test]
    fn test_not_implemented() {
        let (_mock, ctx) = context(MockBackend::new());
        let camera = Camera::open(&ctx).unwrap();
        assert!(matches!(
            camera.port_info(),
            Err(GphotoError::NotImplemented { .. })
        ));
        assert!(matches!(
            camera.wait_for_event(1000),
            Err(GphotoError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_open_at_model_and_port() {
        let (mock, ctx) = context(
            MockBackend::new()
                .with_model("Canon EOS 5D", sys::GP_PORT_USB)
                .with_port(sys::GP_PORT_USB, "Universal Serial Bus", "usb:001,004"),
        );
        let camera = Camera::open_at(&ctx, "Canon EOS 5D", "usb:001,004").unwrap();
        assert_eq!(camera.abilities().unwrap().model(), "Canon EOS 5D");
        assert_eq!(mock.camera_port().as_deref(), Some("usb:001,004"));

        assert!(Camera::open_at(&ctx, "Canon EOS 5D", "usb:009,009").is_err());
        drop(camera);
        drop(ctx);
        assert_eq!(mock.live_objects(), 0);
    }

    #[test]
    fn test_config_round_trip() {
        let template = MockWidget::window("main", "Camera and Driver Configuration").child(
            MockWidget::section("imgsettings", "Image Settings")
                .child(MockWidget::radio("iso", "ISO Speed", "100", &["100", "200", "400"])),
        );
        let (_mock, ctx) = context(MockBackend::new().with_config(template));
        let camera = Camera::open(&ctx).unwrap();

        let config = camera.config().unwrap();
        config.child_by_name("iso").unwrap().set_value("400").unwrap();
        camera.set_config(&config).unwrap();

        let entries = camera.config_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "main.imgsettings.iso");
        assert_eq!(entries[0].value.as_text(), Some("400"));
    }

    #[test]
    fn test_list_folders_and_files() {
        let (_mock, ctx) = context(
            MockBackend::new()
                .with_device_file("/store_00010001/DCIM/100CANON", "IMG_0001.JPG", b"one")
                .with_device_file("/store_00010001/DCIM/100CANON", "IMG_0002.JPG", b"two"),
        );
        let camera = Camera::open(&ctx).unwrap();
        assert_eq!(camera.list_folders("/").unwrap(), vec!["store_00010001"]);
        assert_eq!(
            camera.list_folders("/store_00010001/DCIM").unwrap(),
            vec!["100CANON"]
        );
        assert_eq!(
            camera.list_files("/store_00010001/DCIM/100CANON").unwrap(),
            vec!["IMG_0001.JPG", "IMG_0002.JPG"]
        );
        assert!(camera.list_files("/nowhere").is_err());
    }
}
