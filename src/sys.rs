//! Hand-declared libgphoto2 ABI: opaque handle types, fixed-size records and
//! the numeric constants the wrappers rely on.
//!
//! Field widths and enum values follow the public gphoto2 headers. With the
//! `system-headers` feature the records are checked against bindgen output.

#![allow(non_camel_case_types)]
#![allow(missing_docs)]

use std::os::raw::{c_char, c_int};

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    GPContext,
    Camera,
    CameraFile,
    CameraList,
    CameraWidget,
    CameraAbilitiesList,
    GPPortInfoList,
    _GPPortInfo,
);

/// `GPPortInfo` on 2.4.99 and 2.5+: a pointer owned by its list.
pub type GPPortInfoPtr = *mut _GPPortInfo;

pub const CAMERA_FILE_PATH_NAME_LEN: usize = 128;
pub const CAMERA_FILE_PATH_FOLDER_LEN: usize = 1024;
pub const CAMERA_TEXT_LEN: usize = 32 * 1024;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CameraFilePath {
    pub name: [c_char; CAMERA_FILE_PATH_NAME_LEN],
    pub folder: [c_char; CAMERA_FILE_PATH_FOLDER_LEN],
}

#[repr(C)]
pub struct CameraText {
    pub text: [c_char; CAMERA_TEXT_LEN],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CameraAbilities {
    pub model: [c_char; 128],
    pub status: c_int,
    pub port: c_int,
    pub speed: [c_int; 64],
    pub operations: c_int,
    pub file_operations: c_int,
    pub folder_operations: c_int,
    pub usb_vendor: c_int,
    pub usb_product: c_int,
    pub usb_class: c_int,
    pub usb_subclass: c_int,
    pub usb_protocol: c_int,
    pub library: [c_char; 1024],
    pub id: [c_char; 1024],
    pub device_type: c_int,
    pub reserved2: c_int,
    pub reserved3: c_int,
    pub reserved4: c_int,
    pub reserved5: c_int,
    pub reserved6: c_int,
    pub reserved7: c_int,
    pub reserved8: c_int,
}

/// `GPPortInfo` before 2.4.99, passed around by value.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GPPortInfoStruct {
    /// enum is 32 bits on 32 and 64 bit Linux
    pub type_: c_int,
    pub name: [c_char; 64],
    pub path: [c_char; 64],
    pub library_filename: [c_char; 1024],
}

macro_rules! zeroed_record {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                /// All-zero record, the state the native getters expect to fill.
                pub fn zeroed() -> Self {
                    // SAFETY: plain C record of integers and char arrays.
                    unsafe { std::mem::zeroed() }
                }
            }
        )*
    };
}

zeroed_record!(CameraFilePath, CameraText, CameraAbilities, GPPortInfoStruct);

// gphoto2-port-result.h
pub const GP_OK: c_int = 0;
pub const GP_ERROR: c_int = -1;
pub const GP_ERROR_BAD_PARAMETERS: c_int = -2;
pub const GP_ERROR_NO_MEMORY: c_int = -3;
pub const GP_ERROR_LIBRARY: c_int = -4;
pub const GP_ERROR_UNKNOWN_PORT: c_int = -5;
pub const GP_ERROR_NOT_SUPPORTED: c_int = -6;
pub const GP_ERROR_IO: c_int = -7;
pub const GP_ERROR_FIXED_LIMIT_EXCEEDED: c_int = -8;
pub const GP_ERROR_TIMEOUT: c_int = -10;
pub const GP_ERROR_IO_SUPPORTED_SERIAL: c_int = -20;
pub const GP_ERROR_IO_SUPPORTED_USB: c_int = -21;
pub const GP_ERROR_IO_INIT: c_int = -31;
pub const GP_ERROR_IO_READ: c_int = -34;
pub const GP_ERROR_IO_WRITE: c_int = -35;
pub const GP_ERROR_IO_UPDATE: c_int = -37;
pub const GP_ERROR_IO_SERIAL_SPEED: c_int = -41;
pub const GP_ERROR_IO_USB_CLEAR_HALT: c_int = -51;
pub const GP_ERROR_IO_USB_FIND: c_int = -52;
pub const GP_ERROR_IO_USB_CLAIM: c_int = -53;
pub const GP_ERROR_IO_LOCK: c_int = -60;
pub const GP_ERROR_HAL: c_int = -70;

// gphoto2-result.h
pub const GP_ERROR_CORRUPTED_DATA: c_int = -102;
pub const GP_ERROR_FILE_EXISTS: c_int = -103;
pub const GP_ERROR_MODEL_NOT_FOUND: c_int = -105;
pub const GP_ERROR_DIRECTORY_NOT_FOUND: c_int = -107;
pub const GP_ERROR_FILE_NOT_FOUND: c_int = -108;
pub const GP_ERROR_DIRECTORY_EXISTS: c_int = -109;
pub const GP_ERROR_CAMERA_BUSY: c_int = -110;
pub const GP_ERROR_PATH_NOT_ABSOLUTE: c_int = -111;
pub const GP_ERROR_CANCEL: c_int = -112;
pub const GP_ERROR_CAMERA_ERROR: c_int = -113;
pub const GP_ERROR_OS_FAILURE: c_int = -114;
pub const GP_ERROR_NO_SPACE: c_int = -115;

// GPVersionVerbosity
pub const GP_VERSION_SHORT: c_int = 0;
pub const GP_VERSION_VERBOSE: c_int = 1;

// CameraDriverStatus
pub const GP_DRIVER_STATUS_PRODUCTION: c_int = 0;
pub const GP_DRIVER_STATUS_TESTING: c_int = 1;
pub const GP_DRIVER_STATUS_EXPERIMENTAL: c_int = 2;
pub const GP_DRIVER_STATUS_DEPRECATED: c_int = 3;

// CameraOperation
pub const GP_OPERATION_NONE: c_int = 0;
pub const GP_OPERATION_CAPTURE_IMAGE: c_int = 1 << 0;
pub const GP_OPERATION_CAPTURE_VIDEO: c_int = 1 << 1;
pub const GP_OPERATION_CAPTURE_AUDIO: c_int = 1 << 2;
pub const GP_OPERATION_CAPTURE_PREVIEW: c_int = 1 << 3;
pub const GP_OPERATION_CONFIG: c_int = 1 << 4;
pub const GP_OPERATION_TRIGGER_CAPTURE: c_int = 1 << 5;

// CameraFileOperation
pub const GP_FILE_OPERATION_NONE: c_int = 0;
pub const GP_FILE_OPERATION_DELETE: c_int = 1 << 1;
pub const GP_FILE_OPERATION_PREVIEW: c_int = 1 << 3;
pub const GP_FILE_OPERATION_RAW: c_int = 1 << 4;
pub const GP_FILE_OPERATION_AUDIO: c_int = 1 << 5;
pub const GP_FILE_OPERATION_EXIF: c_int = 1 << 6;

// CameraFolderOperation
pub const GP_FOLDER_OPERATION_NONE: c_int = 0;
pub const GP_FOLDER_OPERATION_DELETE_ALL: c_int = 1 << 0;
pub const GP_FOLDER_OPERATION_PUT_FILE: c_int = 1 << 1;
pub const GP_FOLDER_OPERATION_MAKE_DIR: c_int = 1 << 2;
pub const GP_FOLDER_OPERATION_REMOVE_DIR: c_int = 1 << 3;

// GPPortType
pub const GP_PORT_NONE: c_int = 0;
pub const GP_PORT_SERIAL: c_int = 1 << 0;
pub const GP_PORT_USB: c_int = 1 << 2;
pub const GP_PORT_DISK: c_int = 1 << 3;
pub const GP_PORT_PTPIP: c_int = 1 << 4;
pub const GP_PORT_USB_DISK_DIRECT: c_int = 1 << 5;
pub const GP_PORT_USB_SCSI: c_int = 1 << 6;

// CameraCaptureType
pub const GP_CAPTURE_IMAGE: c_int = 0;
pub const GP_CAPTURE_MOVIE: c_int = 1;
pub const GP_CAPTURE_SOUND: c_int = 2;

// CameraFileType
pub const GP_FILE_TYPE_PREVIEW: c_int = 0;
pub const GP_FILE_TYPE_NORMAL: c_int = 1;
pub const GP_FILE_TYPE_RAW: c_int = 2;
pub const GP_FILE_TYPE_AUDIO: c_int = 3;
pub const GP_FILE_TYPE_EXIF: c_int = 4;
pub const GP_FILE_TYPE_METADATA: c_int = 5;

// CameraWidgetType
pub const GP_WIDGET_WINDOW: c_int = 0;
pub const GP_WIDGET_SECTION: c_int = 1;
pub const GP_WIDGET_TEXT: c_int = 2;
pub const GP_WIDGET_RANGE: c_int = 3;
pub const GP_WIDGET_TOGGLE: c_int = 4;
pub const GP_WIDGET_RADIO: c_int = 5;
pub const GP_WIDGET_MENU: c_int = 6;
pub const GP_WIDGET_BUTTON: c_int = 7;
pub const GP_WIDGET_DATE: c_int = 8;

/// Bindings generated from the installed headers, used only to check the
/// declarations above.
#[cfg(feature = "system-headers")]
pub mod generated {
    #![allow(non_upper_case_globals)]
    #![allow(non_camel_case_types)]
    #![allow(non_snake_case)]
    #![allow(dead_code)]
    include!(concat!(env!("OUT_DIR"), "/gphoto2_layout.rs"));
}
