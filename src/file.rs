//! Reference-counted native file buffers.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::{CameraHandle, FileHandle};
use crate::context::Context;
use crate::error::{GphotoError, Result};
use crate::ffi::to_c_string;
use crate::types::FileType;

/// One reference on a native `CameraFile`: a downloaded image, a preview
/// frame, or a file read from local disk.
pub struct CameraFile {
    ctx: Context,
    handle: FileHandle,
}

impl CameraFile {
    /// Empty file.
    pub fn new(ctx: &Context) -> Result<Self> {
        let handle = ctx.check(ctx.backend().file_new())?;
        Ok(CameraFile {
            ctx: ctx.clone(),
            handle,
        })
    }

    /// Download `folder`/`name` from the device.
    ///
    /// The native file is released if the download fails.
    pub(crate) fn from_camera(
        ctx: &Context,
        camera: CameraHandle,
        folder: &str,
        name: &str,
        file_type: FileType,
    ) -> Result<Self> {
        let c_folder = to_c_string(folder)?;
        let c_name = to_c_string(name)?;
        let file = Self::new(ctx)?;
        ctx.check(ctx.backend().camera_file_get(
            camera,
            &c_folder,
            &c_name,
            file_type,
            file.handle,
            ctx.handle(),
        ))?;
        tracing::debug!("downloaded {}/{}", folder, name);
        Ok(file)
    }

    /// Read a local file into a new native file.
    pub fn load<P: AsRef<Path>>(ctx: &Context, path: P) -> Result<Self> {
        let path = path.as_ref();
        let c_path = to_c_string(&path.to_string_lossy())?;
        let file = Self::new(ctx)?;
        ctx.check(ctx.backend().file_open(file.handle, &c_path))?;
        Ok(file)
    }

    pub(crate) fn handle(&self) -> FileHandle {
        self.handle
    }

    /// The file contents.
    pub fn data(&self) -> Result<Vec<u8>> {
        self.ctx.check(self.ctx.backend().file_get_data(self.handle))
    }

    /// MIME type, e.g. `image/jpeg`.
    pub fn mime_type(&self) -> Result<String> {
        self.ctx.check(self.ctx.backend().file_get_mime_type(self.handle))
    }

    /// File name.
    pub fn name(&self) -> Result<String> {
        self.ctx.check(self.ctx.backend().file_get_name(self.handle))
    }

    /// Rename the file.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let name = to_c_string(name)?;
        self.ctx
            .check(self.ctx.backend().file_set_name(self.handle, &name))
    }

    /// Write the contents to `path`, byte for byte.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = self.data()?;
        std::fs::write(path, &data).map_err(|err| GphotoError::io(path, err))?;
        tracing::debug!("wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Save under the file's own name inside `dir`, returning the full path.
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let name = self.name()?;
        if name.is_empty() {
            return Err(GphotoError::InvalidArgument(
                "file has no name to save under".to_string(),
            ));
        }
        let path = dir.as_ref().join(name);
        self.save(&path)?;
        Ok(path)
    }

    /// Drop the contents, keeping the handle.
    pub fn clean(&self) -> Result<()> {
        self.ctx.check(self.ctx.backend().file_clean(self.handle))
    }

    /// Replace the contents with a copy of `source`.
    pub fn copy_from(&self, source: &CameraFile) -> Result<()> {
        self.ctx
            .check(self.ctx.backend().file_copy(self.handle, source.handle))
    }

    /// A second owner of the same native file.
    pub fn try_clone(&self) -> Result<Self> {
        self.ctx.check(self.ctx.backend().file_ref(self.handle))?;
        Ok(CameraFile {
            ctx: self.ctx.clone(),
            handle: self.handle,
        })
    }
}

impl Drop for CameraFile {
    fn drop(&mut self) {
        if let Err(code) = self.ctx.backend().file_unref(self.handle) {
            tracing::warn!("gp_file_unref failed: {}", code);
        }
    }
}

impl fmt::Debug for CameraFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFile")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::Config;
    use std::rc::Rc;

    fn context() -> (Rc<MockBackend>, Context) {
        let mock = Rc::new(MockBackend::new());
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        (mock, ctx)
    }

    #[test]
    fn test_load_and_save() {
        let (_mock, ctx) = context();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.jpg");
        std::fs::write(&source, b"\xff\xd8jpeg\xff\xd9").unwrap();

        let file = CameraFile::load(&ctx, &source).unwrap();
        assert_eq!(file.data().unwrap(), b"\xff\xd8jpeg\xff\xd9");
        assert_eq!(file.name().unwrap(), "in.jpg");

        let target = dir.path().join("out.jpg");
        file.save(&target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"\xff\xd8jpeg\xff\xd9");
    }

    #[test]
    fn test_load_missing_file() {
        let (mock, ctx) = context();
        let dir = tempfile::tempdir().unwrap();
        assert!(CameraFile::load(&ctx, dir.path().join("missing.jpg")).is_err());
        drop(ctx);
        assert_eq!(mock.live_objects(), 0);
    }

    #[test]
    fn test_save_to_dir_uses_name() {
        let (_mock, ctx) = context();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.raw");
        std::fs::write(&source, b"raw").unwrap();

        let file = CameraFile::load(&ctx, &source).unwrap();
        file.set_name("IMG_0001.CR2").unwrap();
        let out = tempfile::tempdir().unwrap();
        let saved = file.save_to_dir(out.path()).unwrap();
        assert_eq!(saved, out.path().join("IMG_0001.CR2"));
        assert_eq!(std::fs::read(saved).unwrap(), b"raw");
    }

    #[test]
    fn test_save_to_unwritable_path() {
        let (_mock, ctx) = context();
        let file = CameraFile::new(&ctx).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = file.save(dir.path().join("no/such/dir/x.jpg")).unwrap_err();
        assert!(matches!(err, GphotoError::Io { .. }));
    }

    #[test]
    fn test_copy_clean_and_clone() {
        let (mock, ctx) = context();
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        std::fs::write(&source_path, b"abc").unwrap();

        let source = CameraFile::load(&ctx, &source_path).unwrap();
        let copy = CameraFile::new(&ctx).unwrap();
        copy.copy_from(&source).unwrap();
        assert_eq!(copy.data().unwrap(), b"abc");

        let shared = copy.try_clone().unwrap();
        copy.clean().unwrap();
        assert!(shared.data().unwrap().is_empty());

        drop((source, copy, shared, ctx));
        assert_eq!(mock.live_objects(), 0);
    }
}
