use std::fmt;
use std::os::raw::c_int;

use crate::error::GphotoError;
use crate::sys;

/// Configuration widget type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetType {
    /// Top-level configuration window
    Window,
    /// Section (think tab)
    Section,
    /// Free text
    Text,
    /// Slider with float bounds
    Range,
    /// Check box
    Toggle,
    /// Radio buttons
    Radio,
    /// Drop-down menu, same values as radio
    Menu,
    /// Push button
    Button,
    /// Date as a unix timestamp
    Date,
}

impl WidgetType {
    /// Native `CameraWidgetType` value
    pub fn to_c_enum(self) -> c_int {
        self.into()
    }

    /// Decode a native `CameraWidgetType`
    pub fn from_c_enum(value: c_int) -> Result<Self, GphotoError> {
        Self::try_from(value)
    }

    /// Display name used in widget descriptions and dumps
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetType::Window => "Window",
            WidgetType::Section => "Section",
            WidgetType::Text => "Text",
            WidgetType::Range => "Range",
            WidgetType::Toggle => "Toggle",
            WidgetType::Radio => "Radio",
            WidgetType::Menu => "Menu",
            WidgetType::Button => "Button",
            WidgetType::Date => "Date",
        }
    }

    /// Text, radio and menu widgets carry a string value.
    pub fn has_string_value(self) -> bool {
        matches!(self, WidgetType::Text | WidgetType::Radio | WidgetType::Menu)
    }

    /// Toggle and date widgets carry an integer value.
    pub fn has_int_value(self) -> bool {
        matches!(self, WidgetType::Toggle | WidgetType::Date)
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<c_int> for WidgetType {
    type Error = GphotoError;

    fn try_from(value: c_int) -> Result<Self, Self::Error> {
        match value {
            sys::GP_WIDGET_WINDOW => Ok(WidgetType::Window),
            sys::GP_WIDGET_SECTION => Ok(WidgetType::Section),
            sys::GP_WIDGET_TEXT => Ok(WidgetType::Text),
            sys::GP_WIDGET_RANGE => Ok(WidgetType::Range),
            sys::GP_WIDGET_TOGGLE => Ok(WidgetType::Toggle),
            sys::GP_WIDGET_RADIO => Ok(WidgetType::Radio),
            sys::GP_WIDGET_MENU => Ok(WidgetType::Menu),
            sys::GP_WIDGET_BUTTON => Ok(WidgetType::Button),
            sys::GP_WIDGET_DATE => Ok(WidgetType::Date),
            other => Err(GphotoError::UnknownWidgetType(other)),
        }
    }
}

impl From<WidgetType> for c_int {
    fn from(value: WidgetType) -> Self {
        match value {
            WidgetType::Window => sys::GP_WIDGET_WINDOW,
            WidgetType::Section => sys::GP_WIDGET_SECTION,
            WidgetType::Text => sys::GP_WIDGET_TEXT,
            WidgetType::Range => sys::GP_WIDGET_RANGE,
            WidgetType::Toggle => sys::GP_WIDGET_TOGGLE,
            WidgetType::Radio => sys::GP_WIDGET_RADIO,
            WidgetType::Menu => sys::GP_WIDGET_MENU,
            WidgetType::Button => sys::GP_WIDGET_BUTTON,
            WidgetType::Date => sys::GP_WIDGET_DATE,
        }
    }
}

/// Connection transport of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    /// No port
    None,
    /// Serial line
    Serial,
    /// USB (PTP and vendor protocols)
    Usb,
    /// Mounted filesystem
    Disk,
    /// PTP over IP
    PtpIp,
    /// USB mass storage accessed directly
    UsbDiskDirect,
    /// USB mass storage through SCSI commands
    UsbScsi,
    /// Value this binding does not know about
    Other(c_int),
}

impl From<c_int> for PortType {
    fn from(value: c_int) -> Self {
        match value {
            sys::GP_PORT_NONE => PortType::None,
            sys::GP_PORT_SERIAL => PortType::Serial,
            sys::GP_PORT_USB => PortType::Usb,
            sys::GP_PORT_DISK => PortType::Disk,
            sys::GP_PORT_PTPIP => PortType::PtpIp,
            sys::GP_PORT_USB_DISK_DIRECT => PortType::UsbDiskDirect,
            sys::GP_PORT_USB_SCSI => PortType::UsbScsi,
            other => PortType::Other(other),
        }
    }
}

impl From<PortType> for c_int {
    fn from(value: PortType) -> Self {
        match value {
            PortType::None => sys::GP_PORT_NONE,
            PortType::Serial => sys::GP_PORT_SERIAL,
            PortType::Usb => sys::GP_PORT_USB,
            PortType::Disk => sys::GP_PORT_DISK,
            PortType::PtpIp => sys::GP_PORT_PTPIP,
            PortType::UsbDiskDirect => sys::GP_PORT_USB_DISK_DIRECT,
            PortType::UsbScsi => sys::GP_PORT_USB_SCSI,
            PortType::Other(other) => other,
        }
    }
}

/// Driver maturity reported in camera abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// Stable driver
    Production,
    /// Under test
    Testing,
    /// Experimental
    Experimental,
    /// Superseded by another driver
    Deprecated,
    /// Value this binding does not know about
    Other(c_int),
}

impl From<c_int> for DriverStatus {
    fn from(value: c_int) -> Self {
        match value {
            sys::GP_DRIVER_STATUS_PRODUCTION => DriverStatus::Production,
            sys::GP_DRIVER_STATUS_TESTING => DriverStatus::Testing,
            sys::GP_DRIVER_STATUS_EXPERIMENTAL => DriverStatus::Experimental,
            sys::GP_DRIVER_STATUS_DEPRECATED => DriverStatus::Deprecated,
            other => DriverStatus::Other(other),
        }
    }
}

/// What `gp_camera_capture` should capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureType {
    /// Still image
    Image,
    /// Movie clip
    Movie,
    /// Sound recording
    Sound,
}

impl From<CaptureType> for c_int {
    fn from(value: CaptureType) -> Self {
        match value {
            CaptureType::Image => sys::GP_CAPTURE_IMAGE,
            CaptureType::Movie => sys::GP_CAPTURE_MOVIE,
            CaptureType::Sound => sys::GP_CAPTURE_SOUND,
        }
    }
}

/// Which representation of a device file to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Thumbnail
    Preview,
    /// The file as stored
    Normal,
    /// Unprocessed sensor data, where the driver separates it
    Raw,
    /// Attached sound annotation
    Audio,
    /// EXIF block
    Exif,
    /// Driver metadata
    Metadata,
}

impl From<FileType> for c_int {
    fn from(value: FileType) -> Self {
        match value {
            FileType::Preview => sys::GP_FILE_TYPE_PREVIEW,
            FileType::Normal => sys::GP_FILE_TYPE_NORMAL,
            FileType::Raw => sys::GP_FILE_TYPE_RAW,
            FileType::Audio => sys::GP_FILE_TYPE_AUDIO,
            FileType::Exif => sys::GP_FILE_TYPE_EXIF,
            FileType::Metadata => sys::GP_FILE_TYPE_METADATA,
        }
    }
}

bitflags::bitflags! {
    /// Camera-level operations a driver supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CameraOperations: c_int {
        /// Still capture
        const CAPTURE_IMAGE = sys::GP_OPERATION_CAPTURE_IMAGE;
        /// Movie capture
        const CAPTURE_VIDEO = sys::GP_OPERATION_CAPTURE_VIDEO;
        /// Sound capture
        const CAPTURE_AUDIO = sys::GP_OPERATION_CAPTURE_AUDIO;
        /// Live-view frames
        const CAPTURE_PREVIEW = sys::GP_OPERATION_CAPTURE_PREVIEW;
        /// Configuration widgets
        const CONFIG = sys::GP_OPERATION_CONFIG;
        /// Capture without download
        const TRIGGER_CAPTURE = sys::GP_OPERATION_TRIGGER_CAPTURE;
    }

    /// Per-file operations a driver supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileOperations: c_int {
        /// Delete the file
        const DELETE = sys::GP_FILE_OPERATION_DELETE;
        /// Fetch a thumbnail
        const PREVIEW = sys::GP_FILE_OPERATION_PREVIEW;
        /// Fetch raw data
        const RAW = sys::GP_FILE_OPERATION_RAW;
        /// Fetch the sound annotation
        const AUDIO = sys::GP_FILE_OPERATION_AUDIO;
        /// Fetch EXIF data
        const EXIF = sys::GP_FILE_OPERATION_EXIF;
    }

    /// Per-folder operations a driver supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FolderOperations: c_int {
        /// Delete every file in the folder
        const DELETE_ALL = sys::GP_FOLDER_OPERATION_DELETE_ALL;
        /// Upload a file
        const PUT_FILE = sys::GP_FOLDER_OPERATION_PUT_FILE;
        /// Create a subfolder
        const MAKE_DIR = sys::GP_FOLDER_OPERATION_MAKE_DIR;
        /// Remove a subfolder
        const REMOVE_DIR = sys::GP_FOLDER_OPERATION_REMOVE_DIR;
    }
}

/// Location of a file on the device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraFilePath {
    /// Absolute folder on the device
    pub folder: String,
    /// File name within the folder
    pub name: String,
}

impl CameraFilePath {
    /// Path from folder and file name.
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        CameraFilePath {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

impl From<&sys::CameraFilePath> for CameraFilePath {
    fn from(path: &sys::CameraFilePath) -> Self {
        CameraFilePath {
            folder: crate::ffi::fixed_str(&path.folder),
            name: crate::ffi::fixed_str(&path.name),
        }
    }
}

impl fmt::Display for CameraFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder.ends_with('/') {
            write!(f, "{}{}", self.folder, self.name)
        } else {
            write!(f, "{}/{}", self.folder, self.name)
        }
    }
}

/// Bounds of a range widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBounds {
    /// Lowest position
    pub min: f32,
    /// Highest position
    pub max: f32,
    /// Increment between positions
    pub step: f32,
}

impl RangeBounds {
    /// Bounds from their three parts.
    pub fn new(min: f32, max: f32, step: f32) -> Self {
        RangeBounds { min, max, step }
    }
}

impl fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.min, self.max, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_type_conversion() {
        for tag in 0..=8 {
            let widget_type = WidgetType::from_c_enum(tag).unwrap();
            assert_eq!(widget_type.to_c_enum(), tag);
        }
        assert_eq!(
            WidgetType::from_c_enum(sys::GP_WIDGET_RANGE).unwrap(),
            WidgetType::Range
        );
    }

    #[test]
    fn test_unknown_widget_type() {
        match WidgetType::from_c_enum(42) {
            Err(GphotoError::UnknownWidgetType(42)) => {}
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_port_type_bits() {
        assert_eq!(PortType::from(4), PortType::Usb);
        assert_eq!(PortType::from(16), PortType::PtpIp);
        assert_eq!(PortType::from(3), PortType::Other(3));
        assert_eq!(c_int::from(PortType::Usb), sys::GP_PORT_USB);
    }

    #[test]
    fn test_operations_mask() {
        let ops = CameraOperations::from_bits_truncate(
            sys::GP_OPERATION_CAPTURE_IMAGE | sys::GP_OPERATION_CONFIG,
        );
        assert!(ops.contains(CameraOperations::CAPTURE_IMAGE));
        assert!(ops.contains(CameraOperations::CONFIG));
        assert!(!ops.contains(CameraOperations::CAPTURE_PREVIEW));
    }

    #[test]
    fn test_file_path_display() {
        assert_eq!(
            CameraFilePath::new("/store_00010001/DCIM/100CANON", "IMG_0001.JPG").to_string(),
            "/store_00010001/DCIM/100CANON/IMG_0001.JPG"
        );
        assert_eq!(CameraFilePath::new("/", "a.jpg").to_string(), "/a.jpg");
    }
}
