//! libgphoto2 opened at runtime with `libloading`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int, c_ulong, c_void};
use std::path::{Path, PathBuf};
use std::ptr;

use crate::backend::{
    count, index_arg, status, AbilitiesListHandle, Backend, CameraHandle, CameraTextKind,
    ContextHandle, FileHandle, ListHandle, Native, PortInfoHandle, PortInfoLayout,
    PortInfoListHandle, PortInfoRecord, RawPortInfo, WidgetHandle,
};
use crate::error::{GphotoError, Result};
use crate::ffi::{fixed_str, ptr_to_string};
use crate::sys;
use crate::types::{CaptureType, CameraFilePath, FileType, RangeBounds};

#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["libgphoto2.6.dylib", "libgphoto2.dylib"];
#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["libgphoto2-6.dll", "libgphoto2.dll"];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const LIBRARY_NAMES: &[&str] = &["libgphoto2.so.6", "libgphoto2.so"];

macro_rules! gp_call {
    ($api:expr, $name:ident($($arg:expr),* $(,)?)) => {{
        // SAFETY: signatures are declared in `gphoto2_api!` after the public
        // headers; handles come from the same library.
        let ret = unsafe { ($api.$name)($($arg),*) };
        tracing::debug!("{} -> {:?}", stringify!($name), ret);
        ret
    }};
}

macro_rules! gphoto2_api {
    ($(fn $name:ident($($arg:ty),* $(,)?) -> $ret:ty;)*) => {
        struct Api {
            $($name: unsafe extern "C" fn($($arg),*) -> $ret,)*
        }

        impl Api {
            /// # Safety
            ///
            /// `library` must be libgphoto2, whose exports match the
            /// signatures declared here.
            unsafe fn load(library: &libloading::Library) -> Result<Self> {
                Ok(Api {
                    $(
                        $name: *library
                            .get::<unsafe extern "C" fn($($arg),*) -> $ret>(
                                concat!(stringify!($name), "\0").as_bytes(),
                            )
                            .map_err(|source| GphotoError::MissingSymbol {
                                symbol: stringify!($name),
                                source,
                            })?,
                    )*
                })
            }
        }
    };
}

gphoto2_api! {
    fn gp_library_version(c_int) -> *const *const c_char;
    fn gp_result_as_string(c_int) -> *const c_char;

    fn gp_context_new() -> *mut sys::GPContext;
    fn gp_context_unref(*mut sys::GPContext) -> ();

    fn gp_camera_new(*mut *mut sys::Camera) -> c_int;
    fn gp_camera_init(*mut sys::Camera, *mut sys::GPContext) -> c_int;
    fn gp_camera_exit(*mut sys::Camera, *mut sys::GPContext) -> c_int;
    fn gp_camera_free(*mut sys::Camera) -> c_int;
    fn gp_camera_get_summary(*mut sys::Camera, *mut sys::CameraText, *mut sys::GPContext) -> c_int;
    fn gp_camera_get_manual(*mut sys::Camera, *mut sys::CameraText, *mut sys::GPContext) -> c_int;
    fn gp_camera_get_about(*mut sys::Camera, *mut sys::CameraText, *mut sys::GPContext) -> c_int;
    fn gp_camera_get_abilities(*mut sys::Camera, *mut sys::CameraAbilities) -> c_int;
    fn gp_camera_set_abilities(*mut sys::Camera, sys::CameraAbilities) -> c_int;
    fn gp_camera_get_config(*mut sys::Camera, *mut *mut sys::CameraWidget, *mut sys::GPContext) -> c_int;
    fn gp_camera_set_config(*mut sys::Camera, *mut sys::CameraWidget, *mut sys::GPContext) -> c_int;
    fn gp_camera_capture(*mut sys::Camera, c_int, *mut sys::CameraFilePath, *mut sys::GPContext) -> c_int;
    fn gp_camera_capture_preview(*mut sys::Camera, *mut sys::CameraFile, *mut sys::GPContext) -> c_int;
    fn gp_camera_trigger_capture(*mut sys::Camera, *mut sys::GPContext) -> c_int;
    fn gp_camera_folder_list_folders(*mut sys::Camera, *const c_char, *mut sys::CameraList, *mut sys::GPContext) -> c_int;
    fn gp_camera_folder_list_files(*mut sys::Camera, *const c_char, *mut sys::CameraList, *mut sys::GPContext) -> c_int;
    fn gp_camera_file_get(*mut sys::Camera, *const c_char, *const c_char, c_int, *mut sys::CameraFile, *mut sys::GPContext) -> c_int;

    fn gp_file_new(*mut *mut sys::CameraFile) -> c_int;
    fn gp_file_ref(*mut sys::CameraFile) -> c_int;
    fn gp_file_unref(*mut sys::CameraFile) -> c_int;
    fn gp_file_clean(*mut sys::CameraFile) -> c_int;
    fn gp_file_copy(*mut sys::CameraFile, *mut sys::CameraFile) -> c_int;
    fn gp_file_open(*mut sys::CameraFile, *const c_char) -> c_int;
    fn gp_file_get_data_and_size(*mut sys::CameraFile, *mut *const c_char, *mut c_ulong) -> c_int;
    fn gp_file_get_mime_type(*mut sys::CameraFile, *mut *const c_char) -> c_int;
    fn gp_file_get_name(*mut sys::CameraFile, *mut *const c_char) -> c_int;
    fn gp_file_set_name(*mut sys::CameraFile, *const c_char) -> c_int;

    fn gp_list_new(*mut *mut sys::CameraList) -> c_int;
    fn gp_list_ref(*mut sys::CameraList) -> c_int;
    fn gp_list_unref(*mut sys::CameraList) -> c_int;
    fn gp_list_reset(*mut sys::CameraList) -> c_int;
    fn gp_list_sort(*mut sys::CameraList) -> c_int;
    fn gp_list_count(*mut sys::CameraList) -> c_int;
    fn gp_list_append(*mut sys::CameraList, *const c_char, *const c_char) -> c_int;
    fn gp_list_find_by_name(*mut sys::CameraList, *mut c_int, *const c_char) -> c_int;
    fn gp_list_get_name(*mut sys::CameraList, c_int, *mut *const c_char) -> c_int;
    fn gp_list_get_value(*mut sys::CameraList, c_int, *mut *const c_char) -> c_int;
    fn gp_list_set_name(*mut sys::CameraList, c_int, *const c_char) -> c_int;
    fn gp_list_set_value(*mut sys::CameraList, c_int, *const c_char) -> c_int;

    fn gp_widget_new(c_int, *const c_char, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_unref(*mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_name(*mut sys::CameraWidget, *mut *const c_char) -> c_int;
    fn gp_widget_set_name(*mut sys::CameraWidget, *const c_char) -> c_int;
    fn gp_widget_get_label(*mut sys::CameraWidget, *mut *const c_char) -> c_int;
    fn gp_widget_set_label(*mut sys::CameraWidget, *const c_char) -> c_int;
    fn gp_widget_get_info(*mut sys::CameraWidget, *mut *const c_char) -> c_int;
    fn gp_widget_set_info(*mut sys::CameraWidget, *const c_char) -> c_int;
    fn gp_widget_get_id(*mut sys::CameraWidget, *mut c_int) -> c_int;
    fn gp_widget_changed(*mut sys::CameraWidget) -> c_int;
    fn gp_widget_set_changed(*mut sys::CameraWidget, c_int) -> c_int;
    fn gp_widget_get_readonly(*mut sys::CameraWidget, *mut c_int) -> c_int;
    fn gp_widget_set_readonly(*mut sys::CameraWidget, c_int) -> c_int;
    fn gp_widget_get_type(*mut sys::CameraWidget, *mut c_int) -> c_int;
    fn gp_widget_get_value(*mut sys::CameraWidget, *mut c_void) -> c_int;
    fn gp_widget_set_value(*mut sys::CameraWidget, *const c_void) -> c_int;
    fn gp_widget_append(*mut sys::CameraWidget, *mut sys::CameraWidget) -> c_int;
    fn gp_widget_prepend(*mut sys::CameraWidget, *mut sys::CameraWidget) -> c_int;
    fn gp_widget_count_children(*mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_child(*mut sys::CameraWidget, c_int, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_child_by_label(*mut sys::CameraWidget, *const c_char, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_child_by_id(*mut sys::CameraWidget, c_int, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_child_by_name(*mut sys::CameraWidget, *const c_char, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_parent(*mut sys::CameraWidget, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_root(*mut sys::CameraWidget, *mut *mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_range(*mut sys::CameraWidget, *mut c_float, *mut c_float, *mut c_float) -> c_int;
    fn gp_widget_set_range(*mut sys::CameraWidget, c_float, c_float, c_float) -> c_int;
    fn gp_widget_add_choice(*mut sys::CameraWidget, *const c_char) -> c_int;
    fn gp_widget_count_choices(*mut sys::CameraWidget) -> c_int;
    fn gp_widget_get_choice(*mut sys::CameraWidget, c_int, *mut *const c_char) -> c_int;

    fn gp_abilities_list_new(*mut *mut sys::CameraAbilitiesList) -> c_int;
    fn gp_abilities_list_free(*mut sys::CameraAbilitiesList) -> c_int;
    fn gp_abilities_list_load(*mut sys::CameraAbilitiesList, *mut sys::GPContext) -> c_int;
    fn gp_abilities_list_count(*mut sys::CameraAbilitiesList) -> c_int;
    fn gp_abilities_list_detect(*mut sys::CameraAbilitiesList, *mut sys::GPPortInfoList, *mut sys::CameraList, *mut sys::GPContext) -> c_int;
    fn gp_abilities_list_lookup_model(*mut sys::CameraAbilitiesList, *const c_char) -> c_int;
    fn gp_abilities_list_get_abilities(*mut sys::CameraAbilitiesList, c_int, *mut sys::CameraAbilities) -> c_int;

    fn gp_port_info_list_new(*mut *mut sys::GPPortInfoList) -> c_int;
    fn gp_port_info_list_free(*mut sys::GPPortInfoList) -> c_int;
    fn gp_port_info_list_load(*mut sys::GPPortInfoList) -> c_int;
    fn gp_port_info_list_count(*mut sys::GPPortInfoList) -> c_int;
    fn gp_port_info_list_lookup_path(*mut sys::GPPortInfoList, *const c_char) -> c_int;
    // The out parameter is `GPPortInfo *`, whose pointee depends on the layout.
    fn gp_port_info_list_get_info(*mut sys::GPPortInfoList, c_int, *mut c_void) -> c_int;
}

type AutodetectFn = unsafe extern "C" fn(*mut sys::CameraList, *mut sys::GPContext) -> c_int;
type SetPortInfoStructFn = unsafe extern "C" fn(*mut sys::Camera, sys::GPPortInfoStruct) -> c_int;
type SetPortInfoPtrFn = unsafe extern "C" fn(*mut sys::Camera, sys::GPPortInfoPtr) -> c_int;
type PortInfoStringFn = unsafe extern "C" fn(sys::GPPortInfoPtr, *mut *mut c_char) -> c_int;
type PortInfoTypeFn = unsafe extern "C" fn(sys::GPPortInfoPtr, *mut c_int) -> c_int;

/// The layout-dependent half of the port API.
enum PortApi {
    Struct {
        set_port_info: SetPortInfoStructFn,
    },
    Pointer {
        set_port_info: SetPortInfoPtrFn,
        get_name: PortInfoStringFn,
        get_path: PortInfoStringFn,
        get_type: PortInfoTypeFn,
    },
}

unsafe fn symbol<T: Copy>(library: &libloading::Library, name: &'static str) -> Result<T> {
    let bytes = name.as_bytes();
    library
        .get::<T>(bytes)
        .map(|sym| *sym)
        .map_err(|source| GphotoError::MissingSymbol {
            symbol: name.trim_end_matches('\0'),
            source,
        })
}

impl PortApi {
    unsafe fn load(library: &libloading::Library, layout: PortInfoLayout) -> Result<Self> {
        Ok(match layout {
            PortInfoLayout::Struct => PortApi::Struct {
                set_port_info: symbol(library, "gp_camera_set_port_info\0")?,
            },
            PortInfoLayout::Pointer => PortApi::Pointer {
                set_port_info: symbol(library, "gp_camera_set_port_info\0")?,
                get_name: symbol(library, "gp_port_info_get_name\0")?,
                get_path: symbol(library, "gp_port_info_get_path\0")?,
                get_type: symbol(library, "gp_port_info_get_type\0")?,
            },
        })
    }
}

/// libgphoto2 loaded from disk, every entry point resolved once.
pub struct Gphoto2Library {
    api: Api,
    port_api: PortApi,
    autodetect: Option<AutodetectFn>,
    layout: PortInfoLayout,
    path: PathBuf,
    // Last field: dropped after the function pointers above.
    _library: libloading::Library,
}

impl Gphoto2Library {
    /// Open the library under its usual names.
    pub fn load() -> Result<Self> {
        let mut last_err = None;
        for name in LIBRARY_NAMES {
            match Self::from_path(name) {
                Ok(library) => return Ok(library),
                Err(err @ GphotoError::LibLoading { .. }) => {
                    tracing::debug!("{} not loadable: {}", name, err);
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| GphotoError::InvalidArgument(
            "no libgphoto2 library names for this platform".to_string(),
        )))
    }

    /// Open the library at `path` (a file path or a bare soname).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: loading runs the library's initialisers; libgphoto2 has no
        // unusual requirements there.
        let library = unsafe { libloading::Library::new(&path) }.map_err(|source| {
            GphotoError::LibLoading {
                path: path.clone(),
                source,
            }
        })?;

        // SAFETY: the declarations match the exported C API.
        let api = unsafe { Api::load(&library)? };
        let version = version_lines(&api, sys::GP_VERSION_SHORT);
        let layout = PortInfoLayout::for_version(version.first().map(String::as_str).unwrap_or(""));
        let port_api = unsafe { PortApi::load(&library, layout)? };
        let autodetect = unsafe { symbol::<AutodetectFn>(&library, "gp_camera_autodetect\0") }.ok();

        tracing::info!(
            "Loaded libgphoto2 {} from {} ({:?} port info)",
            version.first().map(String::as_str).unwrap_or("?"),
            path.display(),
            layout
        );

        Ok(Gphoto2Library {
            api,
            port_api,
            autodetect,
            layout,
            path,
            _library: library,
        })
    }

    /// Where the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn version_lines(api: &Api, verbosity: c_int) -> Vec<String> {
    let lines = gp_call!(api, gp_library_version(verbosity));
    let mut out = Vec::new();
    if lines.is_null() {
        return out;
    }
    let mut index = 0;
    loop {
        // SAFETY: NULL-terminated array of static strings.
        let line = unsafe { *lines.add(index) };
        match unsafe { ptr_to_string(line) } {
            Some(line) => out.push(line),
            None => break,
        }
        index += 1;
    }
    out
}

fn out_string(code: c_int, value: *const c_char) -> Native<String> {
    status(code)?;
    // SAFETY: the library returned GP_OK, so `value` is NULL or a live string
    // owned by the object it was read from.
    Ok(unsafe { ptr_to_string(value) }.unwrap_or_default())
}

fn out_opt_string(code: c_int, value: *const c_char) -> Native<Option<String>> {
    status(code)?;
    // SAFETY: as in `out_string`.
    Ok(unsafe { ptr_to_string(value) })
}

fn out_widget(code: c_int, widget: *mut sys::CameraWidget) -> Native<WidgetHandle> {
    status(code)?;
    WidgetHandle::from_ptr(widget).ok_or(sys::GP_ERROR)
}

impl Backend for Gphoto2Library {
    fn library_version(&self, verbose: bool) -> Vec<String> {
        let verbosity = if verbose {
            sys::GP_VERSION_VERBOSE
        } else {
            sys::GP_VERSION_SHORT
        };
        version_lines(&self.api, verbosity)
    }

    fn result_as_string(&self, code: c_int) -> String {
        let text = gp_call!(self.api, gp_result_as_string(code));
        // SAFETY: static string table inside the library.
        unsafe { ptr_to_string(text) }.unwrap_or_else(|| format!("Unknown error {}", code))
    }

    fn port_info_layout(&self) -> PortInfoLayout {
        self.layout
    }

    fn context_new(&self) -> Option<ContextHandle> {
        let context = unsafe { (self.api.gp_context_new)() };
        tracing::debug!("gp_context_new -> {:?}", context);
        ContextHandle::from_ptr(context)
    }

    fn context_unref(&self, context: ContextHandle) {
        tracing::debug!("gp_context_unref({:?})", context);
        unsafe { (self.api.gp_context_unref)(context.as_ptr()) }
    }

    fn camera_new(&self) -> Native<CameraHandle> {
        let mut camera = ptr::null_mut();
        status(gp_call!(self.api, gp_camera_new(&mut camera)))?;
        CameraHandle::from_ptr(camera).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn camera_init(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        status(gp_call!(self.api, gp_camera_init(camera.as_ptr(), context.as_ptr())))
    }

    fn camera_exit(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        status(gp_call!(self.api, gp_camera_exit(camera.as_ptr(), context.as_ptr())))
    }

    fn camera_free(&self, camera: CameraHandle) -> Native<()> {
        status(gp_call!(self.api, gp_camera_free(camera.as_ptr())))
    }

    fn camera_get_text(
        &self,
        camera: CameraHandle,
        kind: CameraTextKind,
        context: ContextHandle,
    ) -> Native<String> {
        let mut buffer = vec![0 as c_char; sys::CAMERA_TEXT_LEN];
        // CameraText is a bare char array, so a char buffer of the same
        // length has the same layout and alignment.
        let text = buffer.as_mut_ptr() as *mut sys::CameraText;
        let code = match kind {
            CameraTextKind::Summary => {
                gp_call!(self.api, gp_camera_get_summary(camera.as_ptr(), text, context.as_ptr()))
            }
            CameraTextKind::Manual => {
                gp_call!(self.api, gp_camera_get_manual(camera.as_ptr(), text, context.as_ptr()))
            }
            CameraTextKind::About => {
                gp_call!(self.api, gp_camera_get_about(camera.as_ptr(), text, context.as_ptr()))
            }
        };
        status(code)?;
        Ok(fixed_str(&buffer))
    }

    fn camera_get_abilities(&self, camera: CameraHandle) -> Native<sys::CameraAbilities> {
        let mut abilities = sys::CameraAbilities::zeroed();
        status(gp_call!(
            self.api,
            gp_camera_get_abilities(camera.as_ptr(), &mut abilities)
        ))?;
        Ok(abilities)
    }

    fn camera_set_abilities(
        &self,
        camera: CameraHandle,
        abilities: &sys::CameraAbilities,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_set_abilities(camera.as_ptr(), *abilities)
        ))
    }

    fn camera_set_port_info(&self, camera: CameraHandle, info: &PortInfoRecord) -> Native<()> {
        let code = match (&self.port_api, &info.raw) {
            (PortApi::Struct { set_port_info }, RawPortInfo::Struct(raw)) => unsafe {
                (*set_port_info)(camera.as_ptr(), **raw)
            },
            (PortApi::Pointer { set_port_info, .. }, RawPortInfo::Pointer(handle)) => unsafe {
                (*set_port_info)(camera.as_ptr(), handle.as_ptr())
            },
            _ => {
                tracing::warn!("port info record does not match the loaded library layout");
                sys::GP_ERROR_BAD_PARAMETERS
            }
        };
        tracing::debug!("gp_camera_set_port_info -> {}", code);
        status(code)
    }

    fn camera_get_config(
        &self,
        camera: CameraHandle,
        context: ContextHandle,
    ) -> Native<WidgetHandle> {
        let mut window = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_camera_get_config(camera.as_ptr(), &mut window, context.as_ptr())
        );
        out_widget(code, window)
    }

    fn camera_set_config(
        &self,
        camera: CameraHandle,
        window: WidgetHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_set_config(camera.as_ptr(), window.as_ptr(), context.as_ptr())
        ))
    }

    fn camera_capture(
        &self,
        camera: CameraHandle,
        capture_type: CaptureType,
        context: ContextHandle,
    ) -> Native<CameraFilePath> {
        let mut path = sys::CameraFilePath::zeroed();
        status(gp_call!(
            self.api,
            gp_camera_capture(
                camera.as_ptr(),
                capture_type.into(),
                &mut path,
                context.as_ptr()
            )
        ))?;
        Ok(CameraFilePath::from(&path))
    }

    fn camera_capture_preview(
        &self,
        camera: CameraHandle,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_capture_preview(camera.as_ptr(), file.as_ptr(), context.as_ptr())
        ))
    }

    fn camera_trigger_capture(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_trigger_capture(camera.as_ptr(), context.as_ptr())
        ))
    }

    fn camera_folder_list_folders(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_folder_list_folders(
                camera.as_ptr(),
                folder.as_ptr(),
                list.as_ptr(),
                context.as_ptr()
            )
        ))
    }

    fn camera_folder_list_files(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_folder_list_files(
                camera.as_ptr(),
                folder.as_ptr(),
                list.as_ptr(),
                context.as_ptr()
            )
        ))
    }

    fn camera_file_get(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        name: &CStr,
        file_type: FileType,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_camera_file_get(
                camera.as_ptr(),
                folder.as_ptr(),
                name.as_ptr(),
                file_type.into(),
                file.as_ptr(),
                context.as_ptr()
            )
        ))
    }

    fn camera_autodetect(&self, list: ListHandle, context: ContextHandle) -> Option<Native<()>> {
        let autodetect = self.autodetect?;
        let code = unsafe { autodetect(list.as_ptr(), context.as_ptr()) };
        tracing::debug!("gp_camera_autodetect -> {}", code);
        Some(status(code))
    }

    fn file_new(&self) -> Native<FileHandle> {
        let mut file = ptr::null_mut();
        status(gp_call!(self.api, gp_file_new(&mut file)))?;
        FileHandle::from_ptr(file).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn file_ref(&self, file: FileHandle) -> Native<()> {
        status(gp_call!(self.api, gp_file_ref(file.as_ptr())))
    }

    fn file_unref(&self, file: FileHandle) -> Native<()> {
        status(gp_call!(self.api, gp_file_unref(file.as_ptr())))
    }

    fn file_clean(&self, file: FileHandle) -> Native<()> {
        status(gp_call!(self.api, gp_file_clean(file.as_ptr())))
    }

    fn file_copy(&self, destination: FileHandle, source: FileHandle) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_file_copy(destination.as_ptr(), source.as_ptr())
        ))
    }

    fn file_open(&self, file: FileHandle, path: &CStr) -> Native<()> {
        status(gp_call!(self.api, gp_file_open(file.as_ptr(), path.as_ptr())))
    }

    fn file_get_data(&self, file: FileHandle) -> Native<Vec<u8>> {
        let mut data: *const c_char = ptr::null();
        let mut size: c_ulong = 0;
        status(gp_call!(
            self.api,
            gp_file_get_data_and_size(file.as_ptr(), &mut data, &mut size)
        ))?;
        if data.is_null() || size == 0 {
            return Ok(Vec::new());
        }
        // SAFETY: the file owns `size` bytes at `data` until it is modified.
        let bytes = unsafe { std::slice::from_raw_parts(data as *const u8, size as usize) };
        Ok(bytes.to_vec())
    }

    fn file_get_mime_type(&self, file: FileHandle) -> Native<String> {
        let mut mime: *const c_char = ptr::null();
        let code = gp_call!(self.api, gp_file_get_mime_type(file.as_ptr(), &mut mime));
        out_string(code, mime)
    }

    fn file_get_name(&self, file: FileHandle) -> Native<String> {
        let mut name: *const c_char = ptr::null();
        let code = gp_call!(self.api, gp_file_get_name(file.as_ptr(), &mut name));
        out_string(code, name)
    }

    fn file_set_name(&self, file: FileHandle, name: &CStr) -> Native<()> {
        status(gp_call!(self.api, gp_file_set_name(file.as_ptr(), name.as_ptr())))
    }

    fn list_new(&self) -> Native<ListHandle> {
        let mut list = ptr::null_mut();
        status(gp_call!(self.api, gp_list_new(&mut list)))?;
        ListHandle::from_ptr(list).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn list_ref(&self, list: ListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_list_ref(list.as_ptr())))
    }

    fn list_unref(&self, list: ListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_list_unref(list.as_ptr())))
    }

    fn list_reset(&self, list: ListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_list_reset(list.as_ptr())))
    }

    fn list_sort(&self, list: ListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_list_sort(list.as_ptr())))
    }

    fn list_count(&self, list: ListHandle) -> Native<usize> {
        count(gp_call!(self.api, gp_list_count(list.as_ptr())))
    }

    fn list_append(&self, list: ListHandle, name: &CStr, value: Option<&CStr>) -> Native<()> {
        let value = value.map_or(ptr::null(), CStr::as_ptr);
        status(gp_call!(
            self.api,
            gp_list_append(list.as_ptr(), name.as_ptr(), value)
        ))
    }

    fn list_find_by_name(&self, list: ListHandle, name: &CStr) -> Native<usize> {
        let mut index: c_int = 0;
        status(gp_call!(
            self.api,
            gp_list_find_by_name(list.as_ptr(), &mut index, name.as_ptr())
        ))?;
        count(index)
    }

    fn list_get_name(&self, list: ListHandle, index: usize) -> Native<Option<String>> {
        let mut name: *const c_char = ptr::null();
        let code = gp_call!(
            self.api,
            gp_list_get_name(list.as_ptr(), index_arg(index)?, &mut name)
        );
        out_opt_string(code, name)
    }

    fn list_get_value(&self, list: ListHandle, index: usize) -> Native<Option<String>> {
        let mut value: *const c_char = ptr::null();
        let code = gp_call!(
            self.api,
            gp_list_get_value(list.as_ptr(), index_arg(index)?, &mut value)
        );
        out_opt_string(code, value)
    }

    fn list_set_name(&self, list: ListHandle, index: usize, name: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_list_set_name(list.as_ptr(), index_arg(index)?, name.as_ptr())
        ))
    }

    fn list_set_value(&self, list: ListHandle, index: usize, value: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_list_set_value(list.as_ptr(), index_arg(index)?, value.as_ptr())
        ))
    }

    fn widget_new(&self, widget_type: c_int, label: &CStr) -> Native<WidgetHandle> {
        let mut widget = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_widget_new(widget_type, label.as_ptr(), &mut widget)
        );
        out_widget(code, widget)
    }

    fn widget_unref(&self, widget: WidgetHandle) -> Native<()> {
        status(gp_call!(self.api, gp_widget_unref(widget.as_ptr())))
    }

    fn widget_get_name(&self, widget: WidgetHandle) -> Native<String> {
        let mut name: *const c_char = ptr::null();
        let code = gp_call!(self.api, gp_widget_get_name(widget.as_ptr(), &mut name));
        out_string(code, name)
    }

    fn widget_set_name(&self, widget: WidgetHandle, name: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_name(widget.as_ptr(), name.as_ptr())
        ))
    }

    fn widget_get_label(&self, widget: WidgetHandle) -> Native<String> {
        let mut label: *const c_char = ptr::null();
        let code = gp_call!(self.api, gp_widget_get_label(widget.as_ptr(), &mut label));
        out_string(code, label)
    }

    fn widget_set_label(&self, widget: WidgetHandle, label: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_label(widget.as_ptr(), label.as_ptr())
        ))
    }

    fn widget_get_info(&self, widget: WidgetHandle) -> Native<String> {
        let mut info: *const c_char = ptr::null();
        let code = gp_call!(self.api, gp_widget_get_info(widget.as_ptr(), &mut info));
        out_string(code, info)
    }

    fn widget_set_info(&self, widget: WidgetHandle, info: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_info(widget.as_ptr(), info.as_ptr())
        ))
    }

    fn widget_get_id(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut id: c_int = 0;
        status(gp_call!(self.api, gp_widget_get_id(widget.as_ptr(), &mut id)))?;
        Ok(id)
    }

    fn widget_changed(&self, widget: WidgetHandle) -> Native<bool> {
        let changed = gp_call!(self.api, gp_widget_changed(widget.as_ptr()));
        status(changed)?;
        Ok(changed != 0)
    }

    fn widget_set_changed(&self, widget: WidgetHandle, changed: bool) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_changed(widget.as_ptr(), c_int::from(changed))
        ))
    }

    fn widget_get_readonly(&self, widget: WidgetHandle) -> Native<bool> {
        let mut readonly: c_int = 0;
        status(gp_call!(
            self.api,
            gp_widget_get_readonly(widget.as_ptr(), &mut readonly)
        ))?;
        Ok(readonly != 0)
    }

    fn widget_set_readonly(&self, widget: WidgetHandle, readonly: bool) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_readonly(widget.as_ptr(), c_int::from(readonly))
        ))
    }

    fn widget_get_type(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut widget_type: c_int = 0;
        status(gp_call!(
            self.api,
            gp_widget_get_type(widget.as_ptr(), &mut widget_type)
        ))?;
        Ok(widget_type)
    }

    fn widget_get_value_string(&self, widget: WidgetHandle) -> Native<Option<String>> {
        let mut value: *const c_char = ptr::null();
        let code = gp_call!(
            self.api,
            gp_widget_get_value(widget.as_ptr(), &mut value as *mut *const c_char as *mut c_void)
        );
        out_opt_string(code, value)
    }

    fn widget_get_value_float(&self, widget: WidgetHandle) -> Native<f32> {
        let mut value: c_float = 0.0;
        status(gp_call!(
            self.api,
            gp_widget_get_value(widget.as_ptr(), &mut value as *mut c_float as *mut c_void)
        ))?;
        Ok(value)
    }

    fn widget_get_value_int(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut value: c_int = 0;
        status(gp_call!(
            self.api,
            gp_widget_get_value(widget.as_ptr(), &mut value as *mut c_int as *mut c_void)
        ))?;
        Ok(value)
    }

    fn widget_set_value_string(&self, widget: WidgetHandle, value: &CStr) -> Native<()> {
        // String widgets take the char pointer itself.
        status(gp_call!(
            self.api,
            gp_widget_set_value(widget.as_ptr(), value.as_ptr() as *const c_void)
        ))
    }

    fn widget_set_value_float(&self, widget: WidgetHandle, value: f32) -> Native<()> {
        let value: c_float = value;
        status(gp_call!(
            self.api,
            gp_widget_set_value(widget.as_ptr(), &value as *const c_float as *const c_void)
        ))
    }

    fn widget_set_value_int(&self, widget: WidgetHandle, value: c_int) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_value(widget.as_ptr(), &value as *const c_int as *const c_void)
        ))
    }

    fn widget_append(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_append(parent.as_ptr(), child.as_ptr())
        ))
    }

    fn widget_prepend(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_prepend(parent.as_ptr(), child.as_ptr())
        ))
    }

    fn widget_count_children(&self, widget: WidgetHandle) -> Native<usize> {
        count(gp_call!(self.api, gp_widget_count_children(widget.as_ptr())))
    }

    fn widget_get_child(&self, widget: WidgetHandle, index: usize) -> Native<WidgetHandle> {
        let mut child = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_widget_get_child(widget.as_ptr(), index_arg(index)?, &mut child)
        );
        out_widget(code, child)
    }

    fn widget_get_child_by_label(
        &self,
        widget: WidgetHandle,
        label: &CStr,
    ) -> Native<WidgetHandle> {
        let mut child = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_widget_get_child_by_label(widget.as_ptr(), label.as_ptr(), &mut child)
        );
        out_widget(code, child)
    }

    fn widget_get_child_by_id(&self, widget: WidgetHandle, id: c_int) -> Native<WidgetHandle> {
        let mut child = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_widget_get_child_by_id(widget.as_ptr(), id, &mut child)
        );
        out_widget(code, child)
    }

    fn widget_get_child_by_name(&self, widget: WidgetHandle, name: &CStr) -> Native<WidgetHandle> {
        let mut child = ptr::null_mut();
        let code = gp_call!(
            self.api,
            gp_widget_get_child_by_name(widget.as_ptr(), name.as_ptr(), &mut child)
        );
        out_widget(code, child)
    }

    fn widget_get_parent(&self, widget: WidgetHandle) -> Native<Option<WidgetHandle>> {
        let mut parent = ptr::null_mut();
        status(gp_call!(
            self.api,
            gp_widget_get_parent(widget.as_ptr(), &mut parent)
        ))?;
        Ok(WidgetHandle::from_ptr(parent))
    }

    fn widget_get_root(&self, widget: WidgetHandle) -> Native<WidgetHandle> {
        let mut root = ptr::null_mut();
        let code = gp_call!(self.api, gp_widget_get_root(widget.as_ptr(), &mut root));
        out_widget(code, root)
    }

    fn widget_get_range(&self, widget: WidgetHandle) -> Native<RangeBounds> {
        let (mut min, mut max, mut step): (c_float, c_float, c_float) = (0.0, 0.0, 0.0);
        status(gp_call!(
            self.api,
            gp_widget_get_range(widget.as_ptr(), &mut min, &mut max, &mut step)
        ))?;
        Ok(RangeBounds::new(min, max, step))
    }

    fn widget_set_range(&self, widget: WidgetHandle, range: RangeBounds) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_set_range(widget.as_ptr(), range.min, range.max, range.step)
        ))
    }

    fn widget_add_choice(&self, widget: WidgetHandle, choice: &CStr) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_widget_add_choice(widget.as_ptr(), choice.as_ptr())
        ))
    }

    fn widget_count_choices(&self, widget: WidgetHandle) -> Native<usize> {
        count(gp_call!(self.api, gp_widget_count_choices(widget.as_ptr())))
    }

    fn widget_get_choice(&self, widget: WidgetHandle, index: usize) -> Native<String> {
        let mut choice: *const c_char = ptr::null();
        let code = gp_call!(
            self.api,
            gp_widget_get_choice(widget.as_ptr(), index_arg(index)?, &mut choice)
        );
        out_string(code, choice)
    }

    fn abilities_list_new(&self) -> Native<AbilitiesListHandle> {
        let mut list = ptr::null_mut();
        status(gp_call!(self.api, gp_abilities_list_new(&mut list)))?;
        AbilitiesListHandle::from_ptr(list).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn abilities_list_free(&self, list: AbilitiesListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_abilities_list_free(list.as_ptr())))
    }

    fn abilities_list_load(
        &self,
        list: AbilitiesListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_abilities_list_load(list.as_ptr(), context.as_ptr())
        ))
    }

    fn abilities_list_count(&self, list: AbilitiesListHandle) -> Native<usize> {
        count(gp_call!(self.api, gp_abilities_list_count(list.as_ptr())))
    }

    fn abilities_list_detect(
        &self,
        list: AbilitiesListHandle,
        ports: PortInfoListHandle,
        detected: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        status(gp_call!(
            self.api,
            gp_abilities_list_detect(
                list.as_ptr(),
                ports.as_ptr(),
                detected.as_ptr(),
                context.as_ptr()
            )
        ))
    }

    fn abilities_list_lookup_model(
        &self,
        list: AbilitiesListHandle,
        model: &CStr,
    ) -> Native<usize> {
        count(gp_call!(
            self.api,
            gp_abilities_list_lookup_model(list.as_ptr(), model.as_ptr())
        ))
    }

    fn abilities_list_get_abilities(
        &self,
        list: AbilitiesListHandle,
        index: usize,
    ) -> Native<sys::CameraAbilities> {
        let mut abilities = sys::CameraAbilities::zeroed();
        status(gp_call!(
            self.api,
            gp_abilities_list_get_abilities(list.as_ptr(), index_arg(index)?, &mut abilities)
        ))?;
        Ok(abilities)
    }

    fn port_info_list_new(&self) -> Native<PortInfoListHandle> {
        let mut list = ptr::null_mut();
        status(gp_call!(self.api, gp_port_info_list_new(&mut list)))?;
        PortInfoListHandle::from_ptr(list).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn port_info_list_free(&self, list: PortInfoListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_port_info_list_free(list.as_ptr())))
    }

    fn port_info_list_load(&self, list: PortInfoListHandle) -> Native<()> {
        status(gp_call!(self.api, gp_port_info_list_load(list.as_ptr())))
    }

    fn port_info_list_count(&self, list: PortInfoListHandle) -> Native<usize> {
        count(gp_call!(self.api, gp_port_info_list_count(list.as_ptr())))
    }

    fn port_info_list_lookup_path(&self, list: PortInfoListHandle, path: &CStr) -> Native<usize> {
        count(gp_call!(
            self.api,
            gp_port_info_list_lookup_path(list.as_ptr(), path.as_ptr())
        ))
    }

    fn port_info_list_get_info(
        &self,
        list: PortInfoListHandle,
        index: usize,
    ) -> Native<PortInfoRecord> {
        let index = index_arg(index)?;
        match &self.port_api {
            PortApi::Struct { .. } => {
                let mut info = Box::new(sys::GPPortInfoStruct::zeroed());
                status(gp_call!(
                    self.api,
                    gp_port_info_list_get_info(
                        list.as_ptr(),
                        index,
                        &mut *info as *mut sys::GPPortInfoStruct as *mut c_void
                    )
                ))?;
                Ok(PortInfoRecord {
                    port_type: info.type_,
                    name: fixed_str(&info.name),
                    path: fixed_str(&info.path),
                    raw: RawPortInfo::Struct(info),
                })
            }
            PortApi::Pointer {
                get_name,
                get_path,
                get_type,
                ..
            } => {
                let mut info: sys::GPPortInfoPtr = ptr::null_mut();
                status(gp_call!(
                    self.api,
                    gp_port_info_list_get_info(
                        list.as_ptr(),
                        index,
                        &mut info as *mut sys::GPPortInfoPtr as *mut c_void
                    )
                ))?;
                let handle = PortInfoHandle::from_ptr(info).ok_or(sys::GP_ERROR)?;

                let mut name: *mut c_char = ptr::null_mut();
                let mut path: *mut c_char = ptr::null_mut();
                let mut port_type: c_int = sys::GP_PORT_NONE;
                // SAFETY: `info` is owned by the list, which outlives this call.
                unsafe {
                    status((*get_name)(info, &mut name))?;
                    status((*get_path)(info, &mut path))?;
                    status((*get_type)(info, &mut port_type))?;
                }
                Ok(PortInfoRecord {
                    port_type,
                    name: out_string(sys::GP_OK, name)?,
                    path: out_string(sys::GP_OK, path)?,
                    raw: RawPortInfo::Pointer(handle),
                })
            }
        }
    }
}
