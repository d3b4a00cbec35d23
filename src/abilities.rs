//! Driver and port registries: what libgphoto2 can talk to, and through which
//! ports.

use std::fmt;
use std::os::raw::c_int;
use std::rc::Rc;

use crate::backend::{AbilitiesListHandle, PortInfoListHandle, PortInfoRecord};
use crate::context::Session;
use crate::error::Result;
use crate::ffi::{fixed_str, to_c_string, write_fixed_str};
use crate::list::CameraList;
use crate::sys;
use crate::types::{CameraOperations, DriverStatus, FileOperations, FolderOperations, PortType};

/// What one camera driver supports.
#[derive(Clone)]
pub struct CameraAbilities {
    raw: Box<sys::CameraAbilities>,
}

impl CameraAbilities {
    /// Empty record, to be filled in before handing it to a camera.
    pub fn new(model: &str) -> Self {
        let mut raw = Box::new(sys::CameraAbilities::zeroed());
        write_fixed_str(&mut raw.model, model);
        CameraAbilities { raw }
    }

    pub(crate) fn from_raw(raw: sys::CameraAbilities) -> Self {
        CameraAbilities { raw: Box::new(raw) }
    }

    pub(crate) fn as_raw(&self) -> &sys::CameraAbilities {
        &self.raw
    }

    /// Model name, e.g. `Canon EOS 5D Mark II`.
    pub fn model(&self) -> String {
        fixed_str(&self.raw.model)
    }

    /// Driver maturity.
    pub fn status(&self) -> DriverStatus {
        DriverStatus::from(self.raw.status)
    }

    /// Bitmask of [`PortType`] values the driver can use.
    pub fn port(&self) -> c_int {
        self.raw.port
    }

    /// Whether `port_type` is among the driver's ports.
    pub fn supports_port(&self, port_type: PortType) -> bool {
        self.raw.port & c_int::from(port_type) != 0
    }

    /// Serial speeds, zero-terminated in the native record.
    pub fn speeds(&self) -> Vec<c_int> {
        self.raw
            .speed
            .iter()
            .copied()
            .take_while(|&speed| speed != 0)
            .collect()
    }

    /// Camera operations the driver supports.
    pub fn operations(&self) -> CameraOperations {
        CameraOperations::from_bits_truncate(self.raw.operations)
    }

    /// File operations the driver supports.
    pub fn file_operations(&self) -> FileOperations {
        FileOperations::from_bits_truncate(self.raw.file_operations)
    }

    /// Folder operations the driver supports.
    pub fn folder_operations(&self) -> FolderOperations {
        FolderOperations::from_bits_truncate(self.raw.folder_operations)
    }

    /// USB vendor id.
    pub fn usb_vendor(&self) -> c_int {
        self.raw.usb_vendor
    }

    /// USB product id.
    pub fn usb_product(&self) -> c_int {
        self.raw.usb_product
    }

    /// USB device class.
    pub fn usb_class(&self) -> c_int {
        self.raw.usb_class
    }

    /// USB device subclass.
    pub fn usb_subclass(&self) -> c_int {
        self.raw.usb_subclass
    }

    /// USB protocol.
    pub fn usb_protocol(&self) -> c_int {
        self.raw.usb_protocol
    }

    /// Driver library file
    pub fn library(&self) -> String {
        fixed_str(&self.raw.library)
    }

    /// Driver id
    pub fn id(&self) -> String {
        fixed_str(&self.raw.id)
    }

    /// Raw `GphotoDeviceType` (still camera or audio player).
    pub fn device_type(&self) -> c_int {
        self.raw.device_type
    }
}

impl fmt::Display for CameraAbilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = &self.raw;
        writeln!(f, "Model : {}", self.model())?;
        writeln!(f, "Status : {}", raw.status)?;
        writeln!(f, "Port : {}", raw.port)?;
        writeln!(f, "Operations : {}", raw.operations)?;
        writeln!(f, "File Operations : {}", raw.file_operations)?;
        writeln!(f, "Folder Operations : {}", raw.folder_operations)?;
        writeln!(
            f,
            "USB (vendor/product) : 0x{:x}/0x{:x}",
            raw.usb_vendor, raw.usb_product
        )?;
        writeln!(
            f,
            "USB class : 0x{:x}/0x{:x}/0x{:x}",
            raw.usb_class, raw.usb_subclass, raw.usb_protocol
        )?;
        writeln!(f, "Library : {}", self.library())?;
        writeln!(f, "Id : {}", self.id())
    }
}

impl fmt::Debug for CameraAbilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraAbilities")
            .field("model", &self.model())
            .field("status", &self.status())
            .field("port", &self.raw.port)
            .field("operations", &self.operations())
            .field("usb_vendor", &self.raw.usb_vendor)
            .field("usb_product", &self.raw.usb_product)
            .field("library", &self.library())
            .finish()
    }
}

struct AbilitiesListInner {
    session: Rc<Session>,
    handle: AbilitiesListHandle,
}

impl Drop for AbilitiesListInner {
    fn drop(&mut self) {
        if let Err(code) = self.session.backend().abilities_list_free(self.handle) {
            tracing::warn!("gp_abilities_list_free failed: {}", code);
        }
    }
}

/// The driver database, loaded once per [`Context`](crate::Context).
#[derive(Clone)]
pub struct AbilitiesList {
    inner: Rc<AbilitiesListInner>,
}

impl AbilitiesList {
    pub(crate) fn load(session: &Rc<Session>) -> Result<Self> {
        let backend = session.backend();
        let handle = session.check(backend.abilities_list_new())?;
        let list = AbilitiesList {
            inner: Rc::new(AbilitiesListInner {
                session: session.clone(),
                handle,
            }),
        };
        session.check(backend.abilities_list_load(handle, session.handle()))?;
        tracing::debug!("abilities list loaded");
        Ok(list)
    }

    fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Number of drivers.
    pub fn count(&self) -> Result<usize> {
        let session = self.session();
        session.check(session.backend().abilities_list_count(self.inner.handle))
    }

    /// Probe `ports` for supported cameras, writing (model, path) pairs into
    /// `out`.
    pub fn detect(&self, ports: &PortInfoList, out: &CameraList) -> Result<()> {
        let session = self.session();
        session.check(session.backend().abilities_list_detect(
            self.inner.handle,
            ports.handle(),
            out.handle(),
            session.handle(),
        ))
    }

    /// Index of `model` in the list.
    pub fn lookup_model(&self, model: &str) -> Result<usize> {
        let model = to_c_string(model)?;
        let session = self.session();
        session.check(
            session
                .backend()
                .abilities_list_lookup_model(self.inner.handle, &model),
        )
    }

    /// Abilities of the driver at `index`.
    pub fn abilities(&self, index: usize) -> Result<CameraAbilities> {
        let session = self.session();
        let raw = session.check(
            session
                .backend()
                .abilities_list_get_abilities(self.inner.handle, index),
        )?;
        Ok(CameraAbilities::from_raw(raw))
    }

    /// Shorthand for [`lookup_model`](Self::lookup_model) then
    /// [`abilities`](Self::abilities).
    pub fn abilities_for_model(&self, model: &str) -> Result<CameraAbilities> {
        self.abilities(self.lookup_model(model)?)
    }
}

struct PortInfoListInner {
    session: Rc<Session>,
    handle: PortInfoListHandle,
}

impl Drop for PortInfoListInner {
    fn drop(&mut self) {
        if let Err(code) = self.session.backend().port_info_list_free(self.handle) {
            tracing::warn!("gp_port_info_list_free failed: {}", code);
        }
    }
}

/// The ports the installed I/O drivers can reach, loaded once per
/// [`Context`](crate::Context).
#[derive(Clone)]
pub struct PortInfoList {
    inner: Rc<PortInfoListInner>,
}

impl PortInfoList {
    pub(crate) fn load(session: &Rc<Session>) -> Result<Self> {
        let backend = session.backend();
        let handle = session.check(backend.port_info_list_new())?;
        let list = PortInfoList {
            inner: Rc::new(PortInfoListInner {
                session: session.clone(),
                handle,
            }),
        };
        session.check(backend.port_info_list_load(handle))?;
        tracing::debug!("port info list loaded");
        Ok(list)
    }

    pub(crate) fn handle(&self) -> PortInfoListHandle {
        self.inner.handle
    }

    /// Number of ports.
    pub fn count(&self) -> Result<usize> {
        let session = &self.inner.session;
        session.check(session.backend().port_info_list_count(self.inner.handle))
    }

    /// Index of the port at `path`.
    pub fn lookup_path(&self, path: &str) -> Result<usize> {
        let path = to_c_string(path)?;
        let session = &self.inner.session;
        session.check(
            session
                .backend()
                .port_info_list_lookup_path(self.inner.handle, &path),
        )
    }

    /// Port at `index`.
    pub fn info(&self, index: usize) -> Result<PortInfo> {
        let session = &self.inner.session;
        let record = session.check(
            session
                .backend()
                .port_info_list_get_info(self.inner.handle, index),
        )?;
        Ok(PortInfo {
            record,
            _list: self.inner.clone(),
        })
    }

    /// All ports, in list order.
    pub fn ports(&self) -> Result<Vec<PortInfo>> {
        (0..self.count()?).map(|index| self.info(index)).collect()
    }
}

/// One port entry. Keeps its list alive, since on current libraries the
/// native record is owned by the list.
#[derive(Clone)]
pub struct PortInfo {
    record: PortInfoRecord,
    _list: Rc<PortInfoListInner>,
}

impl PortInfo {
    /// Transport of the port.
    pub fn port_type(&self) -> PortType {
        PortType::from(self.record.port_type)
    }

    /// Port name, e.g. `Universal Serial Bus`.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Path such as `usb:001,004` or `ptpip:192.168.1.1`
    pub fn path(&self) -> &str {
        &self.record.path
    }

    pub(crate) fn record(&self) -> &PortInfoRecord {
        &self.record
    }
}

impl fmt::Debug for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortInfo")
            .field("port_type", &self.port_type())
            .field("name", &self.record.name)
            .field("path", &self.record.path)
            .finish()
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.record.path, self.record.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PortInfoLayout;
    use crate::mock::MockBackend;
    use crate::{Config, Context};

    fn context(mock: MockBackend) -> (Rc<MockBackend>, Context) {
        let mock = Rc::new(mock);
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        (mock, ctx)
    }

    #[test]
    fn test_abilities_display() {
        let mut abilities = CameraAbilities::new("Canon EOS 5D");
        abilities.raw.usb_vendor = 0x4a9;
        abilities.raw.usb_product = 0x3101;
        abilities.raw.operations = sys::GP_OPERATION_CAPTURE_IMAGE | sys::GP_OPERATION_CONFIG;
        let text = abilities.to_string();
        assert!(text.starts_with("Model : Canon EOS 5D\n"));
        assert!(text.contains("USB (vendor/product) : 0x4a9/0x3101\n"));
        assert!(text.contains("Operations : 17\n"));
        assert!(abilities.operations().contains(CameraOperations::CONFIG));
    }

    #[test]
    fn test_speeds_stop_at_zero() {
        let mut abilities = CameraAbilities::new("serial");
        abilities.raw.speed[0] = 9600;
        abilities.raw.speed[1] = 115200;
        assert_eq!(abilities.speeds(), vec![9600, 115200]);
    }

    #[test]
    fn test_lookup_model() {
        let (_mock, ctx) = context(
            MockBackend::new()
                .with_model("Canon EOS 5D", sys::GP_PORT_USB)
                .with_model("Nikon D90", sys::GP_PORT_USB),
        );
        let list = ctx.abilities_list().unwrap();
        assert_eq!(list.count().unwrap(), 2);
        assert_eq!(list.lookup_model("Nikon D90").unwrap(), 1);
        let abilities = list.abilities_for_model("Nikon D90").unwrap();
        assert_eq!(abilities.model(), "Nikon D90");
        assert!(abilities.supports_port(PortType::Usb));

        let err = list.lookup_model("Polaroid").unwrap_err();
        assert_eq!(err.code(), Some(sys::GP_ERROR_MODEL_NOT_FOUND));
    }

    #[test]
    fn test_port_lookup_both_layouts() {
        for layout in [PortInfoLayout::Struct, PortInfoLayout::Pointer] {
            let (mock, ctx) = context(
                MockBackend::new()
                    .with_layout(layout)
                    .with_port(sys::GP_PORT_USB, "Universal Serial Bus", "usb:001,004")
                    .with_port(sys::GP_PORT_DISK, "Media 'sdcard'", "disk:/media/sdcard"),
            );
            let port = ctx.port_info("disk:/media/sdcard").unwrap();
            assert_eq!(port.port_type(), PortType::Disk);
            assert_eq!(port.name(), "Media 'sdcard'");
            assert_eq!(port.path(), "disk:/media/sdcard");

            let ports = ctx.port_info_list().unwrap().ports().unwrap();
            assert_eq!(ports.len(), 2);
            assert_eq!(ports[0].to_string(), "usb:001,004 (Universal Serial Bus)");

            drop(ports);
            drop(port);
            drop(ctx);
            assert_eq!(mock.live_objects(), 0);
        }
    }

    #[test]
    fn test_port_info_outlives_context() {
        let (mock, ctx) = context(MockBackend::new().with_port(
            sys::GP_PORT_USB,
            "Universal Serial Bus",
            "usb:",
        ));
        let port = ctx.port_info("usb:").unwrap();
        drop(ctx);
        assert_eq!(port.path(), "usb:");
        assert!(mock.live_objects() > 0);
        drop(port);
        assert_eq!(mock.live_objects(), 0);
    }
}
