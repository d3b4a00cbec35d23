//! The native entry points the wrappers call, as a trait.
//!
//! [`Gphoto2Library`](crate::Gphoto2Library) implements it over the real
//! shared library, [`MockBackend`](crate::mock::MockBackend) over in-memory
//! state. Every method returns the raw status as `Err(code)`; turning that
//! into a [`GphotoError`] happens in one place, [`check`].

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_int;
use std::ptr::NonNull;

use crate::error::{GphotoError, Result};
use crate::sys;
use crate::types::{CaptureType, CameraFilePath, FileType, RangeBounds};

/// Native call outcome: the payload, or the negative status code.
pub type Native<T> = std::result::Result<T, c_int>;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident => $target:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonNull<$target>);

        impl $name {
            /// Wrap a pointer returned by the library, `None` for NULL.
            pub fn from_ptr(ptr: *mut $target) -> Option<Self> {
                NonNull::new(ptr).map($name)
            }

            /// The raw pointer, for passing back to the library.
            pub fn as_ptr(self) -> *mut $target {
                self.0.as_ptr()
            }

            /// Handle standing for an in-memory object; never dereferenced.
            pub(crate) fn from_token(token: usize) -> Option<Self> {
                Self::from_ptr(token as *mut $target)
            }

            pub(crate) fn token(self) -> usize {
                self.0.as_ptr() as usize
            }
        }
    };
}

native_handle!(
    /// `GPContext *`
    ContextHandle => sys::GPContext
);
native_handle!(
    /// `Camera *`
    CameraHandle => sys::Camera
);
native_handle!(
    /// `CameraFile *`
    FileHandle => sys::CameraFile
);
native_handle!(
    /// `CameraList *`
    ListHandle => sys::CameraList
);
native_handle!(
    /// `CameraWidget *`
    WidgetHandle => sys::CameraWidget
);
native_handle!(
    /// `CameraAbilitiesList *`
    AbilitiesListHandle => sys::CameraAbilitiesList
);
native_handle!(
    /// `GPPortInfoList *`
    PortInfoListHandle => sys::GPPortInfoList
);
native_handle!(
    /// `GPPortInfo` on libraries with the pointer layout
    PortInfoHandle => sys::_GPPortInfo
);

/// Which `GPPortInfo` definition the loaded library uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortInfoLayout {
    /// Inline struct, passed by value (stable 2.4.x)
    Struct,
    /// Opaque pointer with accessor functions (2.4.99 and 2.5+)
    Pointer,
}

impl PortInfoLayout {
    /// Pick the layout from the first line of the short version string.
    pub fn for_version(version: &str) -> Self {
        let version = version.trim();
        if version == "2.4.99" {
            return PortInfoLayout::Pointer;
        }
        let mut parts = version
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u32>().unwrap_or(0));
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) if (major, minor) < (2, 5) => PortInfoLayout::Struct,
            _ => PortInfoLayout::Pointer,
        }
    }
}

/// Native representation of one port entry.
#[derive(Clone)]
pub enum RawPortInfo {
    /// Copy of the inline struct
    Struct(Box<sys::GPPortInfoStruct>),
    /// Handle owned by the port info list
    Pointer(PortInfoHandle),
}

impl fmt::Debug for RawPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawPortInfo::Struct(_) => f.write_str("RawPortInfo::Struct"),
            RawPortInfo::Pointer(handle) => write!(f, "RawPortInfo::Pointer({:?})", handle),
        }
    }
}

/// Port entry as read from a port info list.
#[derive(Debug, Clone)]
pub struct PortInfoRecord {
    /// Raw `GP_PORT_*` value
    pub port_type: c_int,
    /// Port name, e.g. `Universal Serial Bus`
    pub name: String,
    /// Port path, e.g. `usb:001,004`
    pub path: String,
    /// What to pass to `gp_camera_set_port_info`
    pub raw: RawPortInfo,
}

/// Which descriptive text `gp_camera_get_{summary,manual,about}` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraTextKind {
    /// `gp_camera_get_summary`
    Summary,
    /// `gp_camera_get_manual`
    Manual,
    /// `gp_camera_get_about`
    About,
}

/// Every libgphoto2 entry point used by this crate.
///
/// Methods mirror the C functions one to one; string arguments are already
/// NUL-terminated, string results already copied out of native memory.
pub trait Backend {
    /// Lines of `gp_library_version`, without trailing newlines.
    fn library_version(&self, verbose: bool) -> Vec<String>;
    /// Description of a status code (`gp_result_as_string`).
    fn result_as_string(&self, code: c_int) -> String;
    /// The `GPPortInfo` layout this library was built with.
    fn port_info_layout(&self) -> PortInfoLayout;

    /// `gp_context_new`; `None` if the library returned NULL.
    fn context_new(&self) -> Option<ContextHandle>;
    /// `gp_context_unref`
    fn context_unref(&self, context: ContextHandle);

    /// `gp_camera_new`
    fn camera_new(&self) -> Native<CameraHandle>;
    /// `gp_camera_init`
    fn camera_init(&self, camera: CameraHandle, context: ContextHandle) -> Native<()>;
    /// `gp_camera_exit`
    fn camera_exit(&self, camera: CameraHandle, context: ContextHandle) -> Native<()>;
    /// `gp_camera_free`
    fn camera_free(&self, camera: CameraHandle) -> Native<()>;
    /// `gp_camera_get_summary`, `gp_camera_get_manual` or `gp_camera_get_about`.
    fn camera_get_text(
        &self,
        camera: CameraHandle,
        kind: CameraTextKind,
        context: ContextHandle,
    ) -> Native<String>;
    /// `gp_camera_get_abilities`
    fn camera_get_abilities(&self, camera: CameraHandle) -> Native<sys::CameraAbilities>;
    /// `gp_camera_set_abilities`
    fn camera_set_abilities(
        &self,
        camera: CameraHandle,
        abilities: &sys::CameraAbilities,
    ) -> Native<()>;
    /// `gp_camera_set_port_info`
    fn camera_set_port_info(&self, camera: CameraHandle, info: &PortInfoRecord) -> Native<()>;
    /// `gp_camera_get_config`; the caller owns the returned root.
    fn camera_get_config(&self, camera: CameraHandle, context: ContextHandle)
        -> Native<WidgetHandle>;
    /// `gp_camera_set_config`
    fn camera_set_config(
        &self,
        camera: CameraHandle,
        window: WidgetHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `gp_camera_capture`, returning where the camera stored the result.
    fn camera_capture(
        &self,
        camera: CameraHandle,
        capture_type: CaptureType,
        context: ContextHandle,
    ) -> Native<CameraFilePath>;
    /// `gp_camera_capture_preview` into an existing file.
    fn camera_capture_preview(
        &self,
        camera: CameraHandle,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `gp_camera_trigger_capture`
    fn camera_trigger_capture(&self, camera: CameraHandle, context: ContextHandle) -> Native<()>;
    /// `gp_camera_folder_list_folders`
    fn camera_folder_list_folders(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `gp_camera_folder_list_files`
    fn camera_folder_list_files(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `gp_camera_file_get` into an existing file.
    fn camera_file_get(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        name: &CStr,
        file_type: FileType,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `None` when the library predates `gp_camera_autodetect`.
    fn camera_autodetect(&self, list: ListHandle, context: ContextHandle) -> Option<Native<()>>;

    /// `gp_file_new`
    fn file_new(&self) -> Native<FileHandle>;
    /// `gp_file_ref`
    fn file_ref(&self, file: FileHandle) -> Native<()>;
    /// `gp_file_unref`
    fn file_unref(&self, file: FileHandle) -> Native<()>;
    /// `gp_file_clean`
    fn file_clean(&self, file: FileHandle) -> Native<()>;
    /// `gp_file_copy`, `source` into `destination`.
    fn file_copy(&self, destination: FileHandle, source: FileHandle) -> Native<()>;
    /// `gp_file_open`: load a file from the local filesystem.
    fn file_open(&self, file: FileHandle, path: &CStr) -> Native<()>;
    /// Copy of the buffer behind `gp_file_get_data_and_size`.
    fn file_get_data(&self, file: FileHandle) -> Native<Vec<u8>>;
    /// `gp_file_get_mime_type`
    fn file_get_mime_type(&self, file: FileHandle) -> Native<String>;
    /// `gp_file_get_name`
    fn file_get_name(&self, file: FileHandle) -> Native<String>;
    /// `gp_file_set_name`
    fn file_set_name(&self, file: FileHandle, name: &CStr) -> Native<()>;

    /// `gp_list_new`
    fn list_new(&self) -> Native<ListHandle>;
    /// `gp_list_ref`
    fn list_ref(&self, list: ListHandle) -> Native<()>;
    /// `gp_list_unref`
    fn list_unref(&self, list: ListHandle) -> Native<()>;
    /// `gp_list_reset`
    fn list_reset(&self, list: ListHandle) -> Native<()>;
    /// `gp_list_sort`
    fn list_sort(&self, list: ListHandle) -> Native<()>;
    /// `gp_list_count`
    fn list_count(&self, list: ListHandle) -> Native<usize>;
    /// `gp_list_append`; a missing value is stored as NULL.
    fn list_append(&self, list: ListHandle, name: &CStr, value: Option<&CStr>) -> Native<()>;
    /// `gp_list_find_by_name`
    fn list_find_by_name(&self, list: ListHandle, name: &CStr) -> Native<usize>;
    /// `gp_list_get_name`; `None` for a NULL entry.
    fn list_get_name(&self, list: ListHandle, index: usize) -> Native<Option<String>>;
    /// `gp_list_get_value`; `None` for a NULL entry.
    fn list_get_value(&self, list: ListHandle, index: usize) -> Native<Option<String>>;
    /// `gp_list_set_name`
    fn list_set_name(&self, list: ListHandle, index: usize, name: &CStr) -> Native<()>;
    /// `gp_list_set_value`
    fn list_set_value(&self, list: ListHandle, index: usize, value: &CStr) -> Native<()>;

    /// `gp_widget_new` with a raw `GP_WIDGET_*` type.
    fn widget_new(&self, widget_type: c_int, label: &CStr) -> Native<WidgetHandle>;
    /// `gp_widget_unref`
    fn widget_unref(&self, widget: WidgetHandle) -> Native<()>;
    /// `gp_widget_get_name`
    fn widget_get_name(&self, widget: WidgetHandle) -> Native<String>;
    /// `gp_widget_set_name`
    fn widget_set_name(&self, widget: WidgetHandle, name: &CStr) -> Native<()>;
    /// `gp_widget_get_label`
    fn widget_get_label(&self, widget: WidgetHandle) -> Native<String>;
    /// `gp_widget_set_label`
    fn widget_set_label(&self, widget: WidgetHandle, label: &CStr) -> Native<()>;
    /// `gp_widget_get_info`
    fn widget_get_info(&self, widget: WidgetHandle) -> Native<String>;
    /// `gp_widget_set_info`
    fn widget_set_info(&self, widget: WidgetHandle, info: &CStr) -> Native<()>;
    /// `gp_widget_get_id`
    fn widget_get_id(&self, widget: WidgetHandle) -> Native<c_int>;
    /// Reads and clears the changed flag, as `gp_widget_changed` does.
    fn widget_changed(&self, widget: WidgetHandle) -> Native<bool>;
    /// `gp_widget_set_changed`
    fn widget_set_changed(&self, widget: WidgetHandle, changed: bool) -> Native<()>;
    /// `gp_widget_get_readonly`
    fn widget_get_readonly(&self, widget: WidgetHandle) -> Native<bool>;
    /// `gp_widget_set_readonly`
    fn widget_set_readonly(&self, widget: WidgetHandle, readonly: bool) -> Native<()>;
    /// Raw `GP_WIDGET_*` type of the widget.
    fn widget_get_type(&self, widget: WidgetHandle) -> Native<c_int>;
    /// `gp_widget_get_value` on a text, radio or menu widget.
    fn widget_get_value_string(&self, widget: WidgetHandle) -> Native<Option<String>>;
    /// `gp_widget_get_value` on a range widget.
    fn widget_get_value_float(&self, widget: WidgetHandle) -> Native<f32>;
    /// `gp_widget_get_value` on a toggle or date widget.
    fn widget_get_value_int(&self, widget: WidgetHandle) -> Native<c_int>;
    /// `gp_widget_set_value` with a string.
    fn widget_set_value_string(&self, widget: WidgetHandle, value: &CStr) -> Native<()>;
    /// `gp_widget_set_value` with a float.
    fn widget_set_value_float(&self, widget: WidgetHandle, value: f32) -> Native<()>;
    /// `gp_widget_set_value` with an int.
    fn widget_set_value_int(&self, widget: WidgetHandle, value: c_int) -> Native<()>;
    /// `gp_widget_append`
    fn widget_append(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()>;
    /// `gp_widget_prepend`
    fn widget_prepend(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()>;
    /// `gp_widget_count_children`
    fn widget_count_children(&self, widget: WidgetHandle) -> Native<usize>;
    /// `gp_widget_get_child`
    fn widget_get_child(&self, widget: WidgetHandle, index: usize) -> Native<WidgetHandle>;
    /// `gp_widget_get_child_by_label`
    fn widget_get_child_by_label(&self, widget: WidgetHandle, label: &CStr)
        -> Native<WidgetHandle>;
    /// `gp_widget_get_child_by_id`
    fn widget_get_child_by_id(&self, widget: WidgetHandle, id: c_int) -> Native<WidgetHandle>;
    /// `gp_widget_get_child_by_name`
    fn widget_get_child_by_name(&self, widget: WidgetHandle, name: &CStr) -> Native<WidgetHandle>;
    /// `gp_widget_get_parent`; `None` at the root.
    fn widget_get_parent(&self, widget: WidgetHandle) -> Native<Option<WidgetHandle>>;
    /// `gp_widget_get_root`
    fn widget_get_root(&self, widget: WidgetHandle) -> Native<WidgetHandle>;
    /// `gp_widget_get_range`
    fn widget_get_range(&self, widget: WidgetHandle) -> Native<RangeBounds>;
    /// `gp_widget_set_range`
    fn widget_set_range(&self, widget: WidgetHandle, range: RangeBounds) -> Native<()>;
    /// `gp_widget_add_choice`
    fn widget_add_choice(&self, widget: WidgetHandle, choice: &CStr) -> Native<()>;
    /// `gp_widget_count_choices`
    fn widget_count_choices(&self, widget: WidgetHandle) -> Native<usize>;
    /// `gp_widget_get_choice`
    fn widget_get_choice(&self, widget: WidgetHandle, index: usize) -> Native<String>;

    /// `gp_abilities_list_new`
    fn abilities_list_new(&self) -> Native<AbilitiesListHandle>;
    /// `gp_abilities_list_free`
    fn abilities_list_free(&self, list: AbilitiesListHandle) -> Native<()>;
    /// `gp_abilities_list_load`
    fn abilities_list_load(&self, list: AbilitiesListHandle, context: ContextHandle)
        -> Native<()>;
    /// `gp_abilities_list_count`
    fn abilities_list_count(&self, list: AbilitiesListHandle) -> Native<usize>;
    /// `gp_abilities_list_detect`: fill `detected` with model/port pairs.
    fn abilities_list_detect(
        &self,
        list: AbilitiesListHandle,
        ports: PortInfoListHandle,
        detected: ListHandle,
        context: ContextHandle,
    ) -> Native<()>;
    /// `gp_abilities_list_lookup_model`, index of the model.
    fn abilities_list_lookup_model(&self, list: AbilitiesListHandle, model: &CStr)
        -> Native<usize>;
    /// `gp_abilities_list_get_abilities`
    fn abilities_list_get_abilities(
        &self,
        list: AbilitiesListHandle,
        index: usize,
    ) -> Native<sys::CameraAbilities>;

    /// `gp_port_info_list_new`
    fn port_info_list_new(&self) -> Native<PortInfoListHandle>;
    /// `gp_port_info_list_free`
    fn port_info_list_free(&self, list: PortInfoListHandle) -> Native<()>;
    /// `gp_port_info_list_load`
    fn port_info_list_load(&self, list: PortInfoListHandle) -> Native<()>;
    /// `gp_port_info_list_count`
    fn port_info_list_count(&self, list: PortInfoListHandle) -> Native<usize>;
    /// `gp_port_info_list_lookup_path`, index of the port.
    fn port_info_list_lookup_path(&self, list: PortInfoListHandle, path: &CStr) -> Native<usize>;
    /// `gp_port_info_list_get_info`, decoded.
    fn port_info_list_get_info(
        &self,
        list: PortInfoListHandle,
        index: usize,
    ) -> Native<PortInfoRecord>;
}

/// The shared result check: negative status becomes a [`GphotoError`]
/// carrying the library's description of the code.
pub(crate) fn check<T>(backend: &dyn Backend, result: Native<T>) -> Result<T> {
    result.map_err(|code| {
        let message = backend.result_as_string(code);
        tracing::debug!("libgphoto2 error {}: {}", code, message);
        GphotoError::Gphoto { code, message }
    })
}

/// Turn a status into `Native<()>`.
pub(crate) fn status(code: c_int) -> Native<()> {
    if code < sys::GP_OK {
        Err(code)
    } else {
        Ok(())
    }
}

/// Turn a count-or-status return into `Native<usize>`.
pub(crate) fn count(code: c_int) -> Native<usize> {
    if code < sys::GP_OK {
        Err(code)
    } else {
        Ok(code as usize)
    }
}

/// Index argument for a C `int` parameter.
pub(crate) fn index_arg(index: usize) -> Native<c_int> {
    c_int::try_from(index).map_err(|_| sys::GP_ERROR_BAD_PARAMETERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_version() {
        assert_eq!(PortInfoLayout::for_version("2.4.99"), PortInfoLayout::Pointer);
        assert_eq!(PortInfoLayout::for_version("2.4.10.1"), PortInfoLayout::Struct);
        assert_eq!(PortInfoLayout::for_version("2.4.8"), PortInfoLayout::Struct);
        assert_eq!(PortInfoLayout::for_version("2.5.27"), PortInfoLayout::Pointer);
        assert_eq!(PortInfoLayout::for_version("3.0"), PortInfoLayout::Pointer);
        assert_eq!(PortInfoLayout::for_version(""), PortInfoLayout::Pointer);
    }

    #[test]
    fn test_status_helpers() {
        assert_eq!(status(0), Ok(()));
        assert_eq!(status(3), Ok(()));
        assert_eq!(status(-60), Err(-60));
        assert_eq!(count(7), Ok(7));
        assert_eq!(count(-1), Err(-1));
        assert_eq!(index_arg(5), Ok(5));
    }

    #[test]
    fn test_handle_tokens() {
        let handle = CameraHandle::from_token(42).unwrap();
        assert_eq!(handle.token(), 42);
        assert!(CameraHandle::from_token(0).is_none());
    }
}
