//! In-memory backend for testing without libgphoto2 or a camera.
//!
//! [`MockBackend`] keeps every native object in a table keyed by handle and
//! tracks reference counts, so tests can check that every handle is released
//! exactly once. Device behaviour (init and capture outcomes, files on the
//! card, the configuration tree, detected cameras) is scripted through the
//! `with_*` builders.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::Path;

use crate::backend::{
    AbilitiesListHandle, Backend, CameraHandle, CameraTextKind, ContextHandle, FileHandle,
    ListHandle, Native, PortInfoHandle, PortInfoLayout, PortInfoListHandle, PortInfoRecord,
    RawPortInfo, WidgetHandle,
};
use crate::ffi::write_fixed_str;
use crate::sys;
use crate::types::{CameraFilePath, CaptureType, FileType, RangeBounds, WidgetType};

/// Template for a configuration tree handed out by `camera_get_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct MockWidget {
    widget_type: WidgetType,
    name: String,
    label: String,
    info: String,
    readonly: bool,
    text: Option<String>,
    float: f32,
    int: i32,
    range: RangeBounds,
    choices: Vec<String>,
    children: Vec<MockWidget>,
}

impl MockWidget {
    /// A widget of any type, with no value.
    #[must_use]
    pub fn new(widget_type: WidgetType, name: &str, label: &str) -> Self {
        MockWidget {
            widget_type,
            name: name.to_owned(),
            label: label.to_owned(),
            info: String::new(),
            readonly: false,
            text: None,
            float: 0.0,
            int: 0,
            range: RangeBounds::new(0.0, 0.0, 0.0),
            choices: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Root window.
    #[must_use]
    pub fn window(name: &str, label: &str) -> Self {
        Self::new(WidgetType::Window, name, label)
    }

    /// Section grouping other widgets.
    #[must_use]
    pub fn section(name: &str, label: &str) -> Self {
        Self::new(WidgetType::Section, name, label)
    }

    /// Text setting.
    #[must_use]
    pub fn text(name: &str, label: &str, value: &str) -> Self {
        let mut widget = Self::new(WidgetType::Text, name, label);
        widget.text = Some(value.to_owned());
        widget
    }

    /// Radio setting with its options.
    #[must_use]
    pub fn radio(name: &str, label: &str, value: &str, choices: &[&str]) -> Self {
        let mut widget = Self::new(WidgetType::Radio, name, label);
        widget.text = Some(value.to_owned());
        widget.choices = choices.iter().map(|c| c.to_string()).collect();
        widget
    }

    /// Menu setting with its options.
    #[must_use]
    pub fn menu(name: &str, label: &str, value: &str, choices: &[&str]) -> Self {
        let mut widget = Self::radio(name, label, value, choices);
        widget.widget_type = WidgetType::Menu;
        widget
    }

    /// Slider with its bounds and current position.
    #[must_use]
    pub fn range(name: &str, label: &str, range: RangeBounds, position: f32) -> Self {
        let mut widget = Self::new(WidgetType::Range, name, label);
        widget.range = range;
        widget.float = position;
        widget
    }

    /// On/off setting.
    #[must_use]
    pub fn toggle(name: &str, label: &str, value: i32) -> Self {
        let mut widget = Self::new(WidgetType::Toggle, name, label);
        widget.int = value;
        widget
    }

    /// Date setting, as a Unix timestamp.
    #[must_use]
    pub fn date(name: &str, label: &str, timestamp: i32) -> Self {
        let mut widget = Self::new(WidgetType::Date, name, label);
        widget.int = timestamp;
        widget
    }

    /// Button; carries no value.
    #[must_use]
    pub fn button(name: &str, label: &str) -> Self {
        Self::new(WidgetType::Button, name, label)
    }

    /// Append a child.
    #[must_use]
    pub fn child(mut self, child: MockWidget) -> Self {
        self.children.push(child);
        self
    }

    /// Help text shown as the widget info.
    #[must_use]
    pub fn info(mut self, info: &str) -> Self {
        self.info = info.to_owned();
        self
    }

    /// Mark read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

#[derive(Debug, Clone)]
struct MockPort {
    port_type: c_int,
    name: String,
    path: String,
}

struct CameraState {
    initialized: bool,
    abilities: sys::CameraAbilities,
}

struct FileState {
    refs: u32,
    data: Vec<u8>,
    name: String,
    mime: String,
}

struct ListState {
    refs: u32,
    entries: Vec<(Option<String>, Option<String>)>,
}

struct WidgetNode {
    refs: u32,
    widget_type: c_int,
    name: String,
    label: String,
    info: String,
    id: c_int,
    readonly: bool,
    changed: bool,
    text: Option<String>,
    float: f32,
    int: i32,
    range: RangeBounds,
    choices: Vec<String>,
    children: Vec<usize>,
    parent: Option<usize>,
}

struct PortListState {
    ports: Vec<MockPort>,
    /// Handles given out for each entry on the pointer layout
    infos: Vec<Option<usize>>,
}

enum Object {
    Context,
    Camera(CameraState),
    File(FileState),
    List(ListState),
    Widget(WidgetNode),
    AbilitiesList(Vec<sys::CameraAbilities>),
    PortInfoList(PortListState),
    PortInfo,
}

macro_rules! accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        fn $fn_name(&mut self, token: usize) -> Native<&mut $ty> {
            if !matches!(self.objects.get(&token), Some(Object::$variant(_))) {
                self.invalid_uses += 1;
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
            match self.objects.get_mut(&token) {
                Some(Object::$variant(value)) => Ok(value),
                _ => Err(sys::GP_ERROR_BAD_PARAMETERS),
            }
        }
    };
}

struct State {
    next_token: usize,
    objects: HashMap<usize, Object>,
    calls: HashMap<&'static str, usize>,
    invalid_uses: usize,

    version: Vec<String>,
    layout: PortInfoLayout,
    context_available: bool,
    autodetect_available: bool,

    init_results: VecDeque<c_int>,
    capture_results: VecDeque<c_int>,
    preview_results: VecDeque<c_int>,
    capture_path: CameraFilePath,
    capture_data: Vec<u8>,
    preview_data: Vec<u8>,
    device_files: BTreeMap<(String, String), Vec<u8>>,
    config: Option<MockWidget>,
    summary: String,

    models: Vec<sys::CameraAbilities>,
    ports: Vec<MockPort>,
    detected: Vec<(String, String)>,
    camera_port: Option<String>,
}

impl State {
    fn alloc(&mut self, object: Object) -> usize {
        let token = self.next_token;
        self.next_token += 0x10;
        self.objects.insert(token, object);
        token
    }

    fn record(&mut self, call: &'static str) {
        *self.calls.entry(call).or_insert(0) += 1;
    }

    fn context(&mut self, token: usize) -> Native<()> {
        if matches!(self.objects.get(&token), Some(Object::Context)) {
            Ok(())
        } else {
            self.invalid_uses += 1;
            Err(sys::GP_ERROR_BAD_PARAMETERS)
        }
    }

    fn remove(&mut self, token: usize, is_kind: fn(&Object) -> bool) -> Native<Object> {
        match self.objects.get(&token) {
            Some(object) if is_kind(object) => self
                .objects
                .remove(&token)
                .ok_or(sys::GP_ERROR_BAD_PARAMETERS),
            _ => {
                self.invalid_uses += 1;
                Err(sys::GP_ERROR_BAD_PARAMETERS)
            }
        }
    }

    accessor!(camera, Camera, CameraState);
    accessor!(file, File, FileState);
    accessor!(list, List, ListState);
    accessor!(widget, Widget, WidgetNode);
    accessor!(abilities_list, AbilitiesList, Vec<sys::CameraAbilities>);
    accessor!(port_list, PortInfoList, PortListState);

    /// An initialized camera, as device calls need.
    fn ready_camera(&mut self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        self.context(context.token())?;
        if self.camera(camera.token())?.initialized {
            Ok(())
        } else {
            Err(sys::GP_ERROR_BAD_PARAMETERS)
        }
    }

    fn widget_ref(&self, token: usize) -> Option<&WidgetNode> {
        match self.objects.get(&token) {
            Some(Object::Widget(node)) => Some(node),
            _ => None,
        }
    }

    fn instantiate(&mut self, template: &MockWidget, parent: Option<usize>) -> usize {
        let token = self.alloc(Object::Widget(WidgetNode {
            refs: 1,
            widget_type: template.widget_type.to_c_enum(),
            name: template.name.clone(),
            label: template.label.clone(),
            info: template.info.clone(),
            id: 0,
            readonly: template.readonly,
            changed: false,
            text: template.text.clone(),
            float: template.float,
            int: template.int,
            range: template.range,
            choices: template.choices.clone(),
            children: Vec::new(),
            parent,
        }));
        let children: Vec<usize> = template
            .children
            .iter()
            .map(|child| self.instantiate(child, Some(token)))
            .collect();
        if let Some(Object::Widget(node)) = self.objects.get_mut(&token) {
            node.id = token as c_int;
            node.children = children;
        }
        token
    }

    fn snapshot(&self, token: usize) -> Option<MockWidget> {
        let node = self.widget_ref(token)?;
        Some(MockWidget {
            widget_type: WidgetType::try_from(node.widget_type).ok()?,
            name: node.name.clone(),
            label: node.label.clone(),
            info: node.info.clone(),
            readonly: node.readonly,
            text: node.text.clone(),
            float: node.float,
            int: node.int,
            range: node.range,
            choices: node.choices.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.snapshot(child))
                .collect::<Option<Vec<_>>>()?,
        })
    }

    fn free_widget(&mut self, token: usize) {
        if let Some(Object::Widget(node)) = self.objects.remove(&token) {
            for child in node.children {
                self.free_widget(child);
            }
        }
    }

    fn find_descendant<F>(&self, token: usize, matches: &F) -> Option<usize>
    where
        F: Fn(&WidgetNode) -> bool,
    {
        let node = self.widget_ref(token)?;
        for &child in &node.children {
            if self.widget_ref(child).map_or(false, matches) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant(child, matches) {
                return Some(found);
            }
        }
        None
    }

    fn folder_exists(&self, folder: &str) -> bool {
        folder == "/"
            || self.device_files.keys().any(|(dir, _)| {
                dir == folder || dir.starts_with(&format!("{}/", folder))
            })
    }

    fn subfolders(&self, folder: &str) -> BTreeSet<String> {
        let prefix = if folder == "/" {
            "/".to_string()
        } else {
            format!("{}/", folder)
        };
        self.device_files
            .keys()
            .filter_map(|(dir, _)| dir.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn append_to_list(&mut self, list: ListHandle, names: Vec<(String, Option<String>)>) -> Native<()> {
        let list = self.list(list.token())?;
        list.entries
            .extend(names.into_iter().map(|(name, value)| (Some(name), value)));
        Ok(())
    }
}

fn lossy(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

fn mime_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "cr2" => "image/x-canon-cr2",
        "nef" => "image/x-nikon-nef",
        _ => "application/octet-stream",
    }
}

fn mock_abilities(model: &str, port: c_int) -> sys::CameraAbilities {
    let mut abilities = sys::CameraAbilities::zeroed();
    write_fixed_str(&mut abilities.model, model);
    write_fixed_str(&mut abilities.library, "mock");
    write_fixed_str(&mut abilities.id, "mock");
    abilities.status = sys::GP_DRIVER_STATUS_PRODUCTION;
    abilities.port = port;
    abilities.operations = sys::GP_OPERATION_CAPTURE_IMAGE
        | sys::GP_OPERATION_CAPTURE_PREVIEW
        | sys::GP_OPERATION_CONFIG
        | sys::GP_OPERATION_TRIGGER_CAPTURE;
    abilities.file_operations = sys::GP_FILE_OPERATION_DELETE | sys::GP_FILE_OPERATION_PREVIEW;
    abilities
}

/// Scriptable stand-in for libgphoto2.
pub struct MockBackend {
    state: RefCell<State>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A library reporting version 2.5.27 with one healthy camera attached.
    #[must_use]
    pub fn new() -> Self {
        MockBackend {
            state: RefCell::new(State {
                next_token: 0x1000,
                objects: HashMap::new(),
                calls: HashMap::new(),
                invalid_uses: 0,
                version: vec!["2.5.27".to_owned()],
                layout: PortInfoLayout::Pointer,
                context_available: true,
                autodetect_available: true,
                init_results: VecDeque::new(),
                capture_results: VecDeque::new(),
                preview_results: VecDeque::new(),
                capture_path: CameraFilePath::new("/store_00010001/DCIM/100CANON", "IMG_0001.JPG"),
                capture_data: b"\xff\xd8mock image\xff\xd9".to_vec(),
                preview_data: b"\xff\xd8mock preview\xff\xd9".to_vec(),
                device_files: BTreeMap::new(),
                config: None,
                summary: "Mock camera summary".to_owned(),
                models: Vec::new(),
                ports: Vec::new(),
                detected: Vec::new(),
                camera_port: None,
            }),
        }
    }

    /// Lines returned by `gp_library_version`.
    #[must_use]
    pub fn with_version(mut self, lines: &[&str]) -> Self {
        self.state.get_mut().version = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Port info layout reported to the wrappers.
    #[must_use]
    pub fn with_layout(mut self, layout: PortInfoLayout) -> Self {
        self.state.get_mut().layout = layout;
        self
    }

    /// `gp_context_new` returns NULL.
    #[must_use]
    pub fn without_context(mut self) -> Self {
        self.state.get_mut().context_available = false;
        self
    }

    /// Behave like a library without `gp_camera_autodetect`.
    #[must_use]
    pub fn without_autodetect(mut self) -> Self {
        self.state.get_mut().autodetect_available = false;
        self
    }

    /// Statuses returned by successive `gp_camera_init` calls, then `GP_OK`.
    #[must_use]
    pub fn with_init_results(mut self, results: &[c_int]) -> Self {
        self.state.get_mut().init_results = results.iter().copied().collect();
        self
    }

    /// Statuses returned by successive `gp_camera_capture` calls, then `GP_OK`.
    #[must_use]
    pub fn with_capture_results(mut self, results: &[c_int]) -> Self {
        self.state.get_mut().capture_results = results.iter().copied().collect();
        self
    }

    /// Statuses returned by successive `gp_camera_capture_preview` calls.
    #[must_use]
    pub fn with_preview_results(mut self, results: &[c_int]) -> Self {
        self.state.get_mut().preview_results = results.iter().copied().collect();
        self
    }

    /// Where the next capture lands on the card, and its contents.
    #[must_use]
    pub fn with_capture(mut self, folder: &str, name: &str, data: &[u8]) -> Self {
        let state = self.state.get_mut();
        state.capture_path = CameraFilePath::new(folder, name);
        state.capture_data = data.to_vec();
        self
    }

    /// Contents of every preview frame.
    #[must_use]
    pub fn with_preview_data(mut self, data: &[u8]) -> Self {
        self.state.get_mut().preview_data = data.to_vec();
        self
    }

    /// A file already on the card.
    #[must_use]
    pub fn with_device_file(mut self, folder: &str, name: &str, data: &[u8]) -> Self {
        self.state
            .get_mut()
            .device_files
            .insert((folder.to_owned(), name.to_owned()), data.to_vec());
        self
    }

    /// Configuration tree the camera reports.
    #[must_use]
    pub fn with_config(mut self, root: MockWidget) -> Self {
        self.state.get_mut().config = Some(root);
        self
    }

    /// Text of `gp_camera_get_summary`.
    #[must_use]
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.state.get_mut().summary = summary.to_owned();
        self
    }

    /// A driver in the abilities list.
    #[must_use]
    pub fn with_model(mut self, model: &str, port: c_int) -> Self {
        self.state.get_mut().models.push(mock_abilities(model, port));
        self
    }

    /// A port in the port info list.
    #[must_use]
    pub fn with_port(mut self, port_type: c_int, name: &str, path: &str) -> Self {
        self.state.get_mut().ports.push(MockPort {
            port_type,
            name: name.to_owned(),
            path: path.to_owned(),
        });
        self
    }

    /// A (model, path) pair reported by detection.
    #[must_use]
    pub fn with_detected(mut self, model: &str, path: &str) -> Self {
        self.state
            .get_mut()
            .detected
            .push((model.to_owned(), path.to_owned()));
        self
    }

    /// Native objects not yet released.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// How often a backend method was called. Widget value setters of all
    /// types count as `widget_set_value`.
    pub fn calls(&self, method: &str) -> usize {
        self.state.borrow().calls.get(method).copied().unwrap_or(0)
    }

    /// Calls made with a handle that was never allocated, already released,
    /// or of the wrong kind.
    pub fn invalid_handle_uses(&self) -> usize {
        self.state.borrow().invalid_uses
    }

    /// Path of the last port handed to `gp_camera_set_port_info`.
    pub fn camera_port(&self) -> Option<String> {
        self.state.borrow().camera_port.clone()
    }

    /// The configuration as last written with `gp_camera_set_config`.
    pub fn config(&self) -> Option<MockWidget> {
        self.state.borrow().config.clone()
    }

    /// Overwrite the raw type tag of a widget.
    pub fn force_widget_type(&self, widget: WidgetHandle, tag: c_int) {
        let mut state = self.state.borrow_mut();
        if let Ok(node) = state.widget(widget.token()) {
            node.widget_type = tag;
        }
    }

    fn state(&self, call: &'static str) -> std::cell::RefMut<'_, State> {
        let mut state = self.state.borrow_mut();
        state.record(call);
        state
    }

    fn widget_string<F>(&self, call: &'static str, widget: WidgetHandle, read: F) -> Native<String>
    where
        F: Fn(&WidgetNode) -> String,
    {
        let mut state = self.state(call);
        Ok(read(state.widget(widget.token())?))
    }

    fn update_widget<F>(&self, call: &'static str, widget: WidgetHandle, update: F) -> Native<()>
    where
        F: FnOnce(&mut WidgetNode) -> Native<()>,
    {
        let mut state = self.state(call);
        update(state.widget(widget.token())?)
    }
}

fn is_string_type(tag: c_int) -> bool {
    matches!(
        tag,
        sys::GP_WIDGET_TEXT | sys::GP_WIDGET_RADIO | sys::GP_WIDGET_MENU
    )
}

fn is_int_type(tag: c_int) -> bool {
    matches!(tag, sys::GP_WIDGET_TOGGLE | sys::GP_WIDGET_DATE)
}

impl Backend for MockBackend {
    fn library_version(&self, verbose: bool) -> Vec<String> {
        let state = self.state.borrow();
        if verbose {
            state.version.clone()
        } else {
            state.version.iter().take(1).cloned().collect()
        }
    }

    fn result_as_string(&self, code: c_int) -> String {
        match code {
            sys::GP_OK => "No error",
            sys::GP_ERROR => "Unspecified error",
            sys::GP_ERROR_BAD_PARAMETERS => "Bad parameters",
            sys::GP_ERROR_NO_MEMORY => "Out of memory",
            sys::GP_ERROR_UNKNOWN_PORT => "Unknown port",
            sys::GP_ERROR_NOT_SUPPORTED => "Unsupported operation",
            sys::GP_ERROR_IO => "I/O problem",
            sys::GP_ERROR_IO_READ => "Error reading from port",
            sys::GP_ERROR_IO_LOCK => "Could not lock the device",
            sys::GP_ERROR_MODEL_NOT_FOUND => "Unknown model",
            sys::GP_ERROR_DIRECTORY_NOT_FOUND => "Directory not found",
            sys::GP_ERROR_FILE_NOT_FOUND => "File not found",
            sys::GP_ERROR_CAMERA_BUSY => "I/O in progress",
            _ => "Unknown error",
        }
        .to_owned()
    }

    fn port_info_layout(&self) -> PortInfoLayout {
        self.state.borrow().layout
    }

    fn context_new(&self) -> Option<ContextHandle> {
        let mut state = self.state("context_new");
        if !state.context_available {
            return None;
        }
        ContextHandle::from_token(state.alloc(Object::Context))
    }

    fn context_unref(&self, context: ContextHandle) {
        let mut state = self.state("context_unref");
        let _ = state.remove(context.token(), |o| matches!(o, Object::Context));
    }

    fn camera_new(&self) -> Native<CameraHandle> {
        let mut state = self.state("camera_new");
        let token = state.alloc(Object::Camera(CameraState {
            initialized: false,
            abilities: mock_abilities("Mock Camera", sys::GP_PORT_USB),
        }));
        CameraHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn camera_init(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        let mut state = self.state("camera_init");
        state.context(context.token())?;
        state.camera(camera.token())?;
        let code = state.init_results.pop_front().unwrap_or(sys::GP_OK);
        if code < sys::GP_OK {
            return Err(code);
        }
        state.camera(camera.token())?.initialized = true;
        Ok(())
    }

    fn camera_exit(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        let mut state = self.state("camera_exit");
        state.context(context.token())?;
        state.camera(camera.token())?.initialized = false;
        Ok(())
    }

    fn camera_free(&self, camera: CameraHandle) -> Native<()> {
        let mut state = self.state("camera_free");
        state.remove(camera.token(), |o| matches!(o, Object::Camera(_)))?;
        Ok(())
    }

    fn camera_get_text(
        &self,
        camera: CameraHandle,
        kind: CameraTextKind,
        context: ContextHandle,
    ) -> Native<String> {
        let mut state = self.state("camera_get_text");
        state.context(context.token())?;
        state.camera(camera.token())?;
        Ok(match kind {
            CameraTextKind::Summary => state.summary.clone(),
            CameraTextKind::Manual => "Mock camera manual".to_owned(),
            CameraTextKind::About => "Mock camera driver".to_owned(),
        })
    }

    fn camera_get_abilities(&self, camera: CameraHandle) -> Native<sys::CameraAbilities> {
        let mut state = self.state("camera_get_abilities");
        Ok(state.camera(camera.token())?.abilities)
    }

    fn camera_set_abilities(
        &self,
        camera: CameraHandle,
        abilities: &sys::CameraAbilities,
    ) -> Native<()> {
        let mut state = self.state("camera_set_abilities");
        state.camera(camera.token())?.abilities = *abilities;
        Ok(())
    }

    fn camera_set_port_info(&self, camera: CameraHandle, info: &PortInfoRecord) -> Native<()> {
        let mut state = self.state("camera_set_port_info");
        state.camera(camera.token())?;
        if let RawPortInfo::Pointer(handle) = &info.raw {
            if !matches!(state.objects.get(&handle.token()), Some(Object::PortInfo)) {
                state.invalid_uses += 1;
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
        }
        state.camera_port = Some(info.path.clone());
        Ok(())
    }

    fn camera_get_config(
        &self,
        camera: CameraHandle,
        context: ContextHandle,
    ) -> Native<WidgetHandle> {
        let mut state = self.state("camera_get_config");
        state.ready_camera(camera, context)?;
        let template = state.config.clone().ok_or(sys::GP_ERROR_NOT_SUPPORTED)?;
        let root = state.instantiate(&template, None);
        WidgetHandle::from_token(root).ok_or(sys::GP_ERROR)
    }

    fn camera_set_config(
        &self,
        camera: CameraHandle,
        window: WidgetHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("camera_set_config");
        state.ready_camera(camera, context)?;
        state.widget(window.token())?;
        let snapshot = state.snapshot(window.token()).ok_or(sys::GP_ERROR)?;
        state.config = Some(snapshot);
        Ok(())
    }

    fn camera_capture(
        &self,
        camera: CameraHandle,
        capture_type: CaptureType,
        context: ContextHandle,
    ) -> Native<CameraFilePath> {
        let mut state = self.state("camera_capture");
        state.ready_camera(camera, context)?;
        if capture_type != CaptureType::Image {
            return Err(sys::GP_ERROR_NOT_SUPPORTED);
        }
        let code = state.capture_results.pop_front().unwrap_or(sys::GP_OK);
        if code < sys::GP_OK {
            return Err(code);
        }
        let path = state.capture_path.clone();
        let data = state.capture_data.clone();
        state
            .device_files
            .insert((path.folder.clone(), path.name.clone()), data);
        Ok(path)
    }

    fn camera_capture_preview(
        &self,
        camera: CameraHandle,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("camera_capture_preview");
        state.ready_camera(camera, context)?;
        state.file(file.token())?;
        let code = state.preview_results.pop_front().unwrap_or(sys::GP_OK);
        if code < sys::GP_OK {
            return Err(code);
        }
        let data = state.preview_data.clone();
        let file = state.file(file.token())?;
        file.data = data;
        file.name = "capture_preview.jpg".to_owned();
        file.mime = "image/jpeg".to_owned();
        Ok(())
    }

    fn camera_trigger_capture(&self, camera: CameraHandle, context: ContextHandle) -> Native<()> {
        let mut state = self.state("camera_trigger_capture");
        state.ready_camera(camera, context)
    }

    fn camera_folder_list_folders(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("camera_folder_list_folders");
        state.ready_camera(camera, context)?;
        let folder = lossy(folder);
        if !state.folder_exists(&folder) {
            return Err(sys::GP_ERROR_DIRECTORY_NOT_FOUND);
        }
        let names = state
            .subfolders(&folder)
            .into_iter()
            .map(|name| (name, None))
            .collect();
        state.append_to_list(list, names)
    }

    fn camera_folder_list_files(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        list: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("camera_folder_list_files");
        state.ready_camera(camera, context)?;
        let folder = lossy(folder);
        if !state.folder_exists(&folder) {
            return Err(sys::GP_ERROR_DIRECTORY_NOT_FOUND);
        }
        let names = state
            .device_files
            .keys()
            .filter(|(dir, _)| *dir == folder)
            .map(|(_, name)| (name.clone(), None))
            .collect();
        state.append_to_list(list, names)
    }

    fn camera_file_get(
        &self,
        camera: CameraHandle,
        folder: &CStr,
        name: &CStr,
        _file_type: FileType,
        file: FileHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("camera_file_get");
        state.ready_camera(camera, context)?;
        state.file(file.token())?;
        let name = lossy(name);
        let data = state
            .device_files
            .get(&(lossy(folder), name.clone()))
            .cloned()
            .ok_or(sys::GP_ERROR_FILE_NOT_FOUND)?;
        let file = state.file(file.token())?;
        file.data = data;
        file.mime = mime_for(&name).to_owned();
        file.name = name;
        Ok(())
    }

    fn camera_autodetect(&self, list: ListHandle, context: ContextHandle) -> Option<Native<()>> {
        let mut state = self.state("camera_autodetect");
        if !state.autodetect_available {
            return None;
        }
        if let Err(code) = state.context(context.token()) {
            return Some(Err(code));
        }
        let detected = state
            .detected
            .iter()
            .map(|(model, path)| (model.clone(), Some(path.clone())))
            .collect();
        Some(state.append_to_list(list, detected))
    }

    fn file_new(&self) -> Native<FileHandle> {
        let mut state = self.state("file_new");
        let token = state.alloc(Object::File(FileState {
            refs: 1,
            data: Vec::new(),
            name: String::new(),
            mime: "application/octet-stream".to_owned(),
        }));
        FileHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn file_ref(&self, file: FileHandle) -> Native<()> {
        let mut state = self.state("file_ref");
        state.file(file.token())?.refs += 1;
        Ok(())
    }

    fn file_unref(&self, file: FileHandle) -> Native<()> {
        let mut state = self.state("file_unref");
        let entry = state.file(file.token())?;
        entry.refs -= 1;
        if entry.refs == 0 {
            state.objects.remove(&file.token());
        }
        Ok(())
    }

    fn file_clean(&self, file: FileHandle) -> Native<()> {
        let mut state = self.state("file_clean");
        let entry = state.file(file.token())?;
        entry.data.clear();
        entry.name.clear();
        Ok(())
    }

    fn file_copy(&self, destination: FileHandle, source: FileHandle) -> Native<()> {
        let mut state = self.state("file_copy");
        let source = state.file(source.token())?;
        let (data, name, mime) = (source.data.clone(), source.name.clone(), source.mime.clone());
        let destination = state.file(destination.token())?;
        destination.data = data;
        destination.name = name;
        destination.mime = mime;
        Ok(())
    }

    fn file_open(&self, file: FileHandle, path: &CStr) -> Native<()> {
        let mut state = self.state("file_open");
        state.file(file.token())?;
        let path = lossy(path);
        let data = std::fs::read(&path).map_err(|_| sys::GP_ERROR_IO_READ)?;
        let name = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entry = state.file(file.token())?;
        entry.data = data;
        entry.mime = mime_for(&name).to_owned();
        entry.name = name;
        Ok(())
    }

    fn file_get_data(&self, file: FileHandle) -> Native<Vec<u8>> {
        let mut state = self.state("file_get_data");
        Ok(state.file(file.token())?.data.clone())
    }

    fn file_get_mime_type(&self, file: FileHandle) -> Native<String> {
        let mut state = self.state("file_get_mime_type");
        Ok(state.file(file.token())?.mime.clone())
    }

    fn file_get_name(&self, file: FileHandle) -> Native<String> {
        let mut state = self.state("file_get_name");
        Ok(state.file(file.token())?.name.clone())
    }

    fn file_set_name(&self, file: FileHandle, name: &CStr) -> Native<()> {
        let mut state = self.state("file_set_name");
        state.file(file.token())?.name = lossy(name);
        Ok(())
    }

    fn list_new(&self) -> Native<ListHandle> {
        let mut state = self.state("list_new");
        let token = state.alloc(Object::List(ListState {
            refs: 1,
            entries: Vec::new(),
        }));
        ListHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn list_ref(&self, list: ListHandle) -> Native<()> {
        let mut state = self.state("list_ref");
        state.list(list.token())?.refs += 1;
        Ok(())
    }

    fn list_unref(&self, list: ListHandle) -> Native<()> {
        let mut state = self.state("list_unref");
        let entry = state.list(list.token())?;
        entry.refs -= 1;
        if entry.refs == 0 {
            state.objects.remove(&list.token());
        }
        Ok(())
    }

    fn list_reset(&self, list: ListHandle) -> Native<()> {
        let mut state = self.state("list_reset");
        state.list(list.token())?.entries.clear();
        Ok(())
    }

    fn list_sort(&self, list: ListHandle) -> Native<()> {
        let mut state = self.state("list_sort");
        state
            .list(list.token())?
            .entries
            .sort_by(|a, b| a.0.cmp(&b.0));
        Ok(())
    }

    fn list_count(&self, list: ListHandle) -> Native<usize> {
        let mut state = self.state("list_count");
        Ok(state.list(list.token())?.entries.len())
    }

    fn list_append(&self, list: ListHandle, name: &CStr, value: Option<&CStr>) -> Native<()> {
        let mut state = self.state("list_append");
        state
            .list(list.token())?
            .entries
            .push((Some(lossy(name)), value.map(lossy)));
        Ok(())
    }

    fn list_find_by_name(&self, list: ListHandle, name: &CStr) -> Native<usize> {
        let mut state = self.state("list_find_by_name");
        let name = lossy(name);
        state
            .list(list.token())?
            .entries
            .iter()
            .position(|(entry, _)| entry.as_deref() == Some(name.as_str()))
            .ok_or(sys::GP_ERROR)
    }

    fn list_get_name(&self, list: ListHandle, index: usize) -> Native<Option<String>> {
        let mut state = self.state("list_get_name");
        let entries = &state.list(list.token())?.entries;
        entries
            .get(index)
            .map(|(name, _)| name.clone())
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn list_get_value(&self, list: ListHandle, index: usize) -> Native<Option<String>> {
        let mut state = self.state("list_get_value");
        let entries = &state.list(list.token())?.entries;
        entries
            .get(index)
            .map(|(_, value)| value.clone())
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn list_set_name(&self, list: ListHandle, index: usize, name: &CStr) -> Native<()> {
        let mut state = self.state("list_set_name");
        let entry = state
            .list(list.token())?
            .entries
            .get_mut(index)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)?;
        entry.0 = Some(lossy(name));
        Ok(())
    }

    fn list_set_value(&self, list: ListHandle, index: usize, value: &CStr) -> Native<()> {
        let mut state = self.state("list_set_value");
        let entry = state
            .list(list.token())?
            .entries
            .get_mut(index)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)?;
        entry.1 = Some(lossy(value));
        Ok(())
    }

    fn widget_new(&self, widget_type: c_int, label: &CStr) -> Native<WidgetHandle> {
        let mut state = self.state("widget_new");
        let widget_type =
            WidgetType::try_from(widget_type).map_err(|_| sys::GP_ERROR_BAD_PARAMETERS)?;
        let template = MockWidget::new(widget_type, "", &lossy(label));
        let token = state.instantiate(&template, None);
        WidgetHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn widget_unref(&self, widget: WidgetHandle) -> Native<()> {
        let mut state = self.state("widget_unref");
        let node = state.widget(widget.token())?;
        node.refs -= 1;
        if node.refs == 0 {
            state.free_widget(widget.token());
        }
        Ok(())
    }

    fn widget_get_name(&self, widget: WidgetHandle) -> Native<String> {
        self.widget_string("widget_get_name", widget, |node| node.name.clone())
    }

    fn widget_set_name(&self, widget: WidgetHandle, name: &CStr) -> Native<()> {
        self.update_widget("widget_set_name", widget, |node| {
            node.name = lossy(name);
            Ok(())
        })
    }

    fn widget_get_label(&self, widget: WidgetHandle) -> Native<String> {
        self.widget_string("widget_get_label", widget, |node| node.label.clone())
    }

    fn widget_set_label(&self, widget: WidgetHandle, label: &CStr) -> Native<()> {
        self.update_widget("widget_set_label", widget, |node| {
            node.label = lossy(label);
            Ok(())
        })
    }

    fn widget_get_info(&self, widget: WidgetHandle) -> Native<String> {
        self.widget_string("widget_get_info", widget, |node| node.info.clone())
    }

    fn widget_set_info(&self, widget: WidgetHandle, info: &CStr) -> Native<()> {
        self.update_widget("widget_set_info", widget, |node| {
            node.info = lossy(info);
            Ok(())
        })
    }

    fn widget_get_id(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut state = self.state("widget_get_id");
        Ok(state.widget(widget.token())?.id)
    }

    fn widget_changed(&self, widget: WidgetHandle) -> Native<bool> {
        let mut state = self.state("widget_changed");
        let node = state.widget(widget.token())?;
        Ok(std::mem::replace(&mut node.changed, false))
    }

    fn widget_set_changed(&self, widget: WidgetHandle, changed: bool) -> Native<()> {
        self.update_widget("widget_set_changed", widget, |node| {
            node.changed = changed;
            Ok(())
        })
    }

    fn widget_get_readonly(&self, widget: WidgetHandle) -> Native<bool> {
        let mut state = self.state("widget_get_readonly");
        Ok(state.widget(widget.token())?.readonly)
    }

    fn widget_set_readonly(&self, widget: WidgetHandle, readonly: bool) -> Native<()> {
        self.update_widget("widget_set_readonly", widget, |node| {
            node.readonly = readonly;
            Ok(())
        })
    }

    fn widget_get_type(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut state = self.state("widget_get_type");
        Ok(state.widget(widget.token())?.widget_type)
    }

    fn widget_get_value_string(&self, widget: WidgetHandle) -> Native<Option<String>> {
        let mut state = self.state("widget_get_value");
        let node = state.widget(widget.token())?;
        if !is_string_type(node.widget_type) {
            return Err(sys::GP_ERROR_BAD_PARAMETERS);
        }
        Ok(node.text.clone())
    }

    fn widget_get_value_float(&self, widget: WidgetHandle) -> Native<f32> {
        let mut state = self.state("widget_get_value");
        let node = state.widget(widget.token())?;
        if node.widget_type != sys::GP_WIDGET_RANGE {
            return Err(sys::GP_ERROR_BAD_PARAMETERS);
        }
        Ok(node.float)
    }

    fn widget_get_value_int(&self, widget: WidgetHandle) -> Native<c_int> {
        let mut state = self.state("widget_get_value");
        let node = state.widget(widget.token())?;
        if !is_int_type(node.widget_type) {
            return Err(sys::GP_ERROR_BAD_PARAMETERS);
        }
        Ok(node.int)
    }

    fn widget_set_value_string(&self, widget: WidgetHandle, value: &CStr) -> Native<()> {
        self.update_widget("widget_set_value", widget, |node| {
            if !is_string_type(node.widget_type) {
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
            node.text = Some(lossy(value));
            node.changed = true;
            Ok(())
        })
    }

    fn widget_set_value_float(&self, widget: WidgetHandle, value: f32) -> Native<()> {
        self.update_widget("widget_set_value", widget, |node| {
            if node.widget_type != sys::GP_WIDGET_RANGE {
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
            node.float = value;
            node.changed = true;
            Ok(())
        })
    }

    fn widget_set_value_int(&self, widget: WidgetHandle, value: c_int) -> Native<()> {
        self.update_widget("widget_set_value", widget, |node| {
            if !is_int_type(node.widget_type) {
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
            node.int = value;
            node.changed = true;
            Ok(())
        })
    }

    fn widget_append(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()> {
        let mut state = self.state("widget_append");
        state.widget(child.token())?.parent = Some(parent.token());
        state.widget(parent.token())?.children.push(child.token());
        Ok(())
    }

    fn widget_prepend(&self, parent: WidgetHandle, child: WidgetHandle) -> Native<()> {
        let mut state = self.state("widget_prepend");
        state.widget(child.token())?.parent = Some(parent.token());
        state.widget(parent.token())?.children.insert(0, child.token());
        Ok(())
    }

    fn widget_count_children(&self, widget: WidgetHandle) -> Native<usize> {
        let mut state = self.state("widget_count_children");
        Ok(state.widget(widget.token())?.children.len())
    }

    fn widget_get_child(&self, widget: WidgetHandle, index: usize) -> Native<WidgetHandle> {
        let mut state = self.state("widget_get_child");
        let child = *state
            .widget(widget.token())?
            .children
            .get(index)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)?;
        WidgetHandle::from_token(child).ok_or(sys::GP_ERROR)
    }

    fn widget_get_child_by_label(
        &self,
        widget: WidgetHandle,
        label: &CStr,
    ) -> Native<WidgetHandle> {
        let mut state = self.state("widget_get_child_by_label");
        state.widget(widget.token())?;
        let label = lossy(label);
        let found = state.find_descendant(widget.token(), &|node: &WidgetNode| node.label == label);
        found
            .and_then(WidgetHandle::from_token)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn widget_get_child_by_id(&self, widget: WidgetHandle, id: c_int) -> Native<WidgetHandle> {
        let mut state = self.state("widget_get_child_by_id");
        state.widget(widget.token())?;
        let found = state.find_descendant(widget.token(), &|node: &WidgetNode| node.id == id);
        found
            .and_then(WidgetHandle::from_token)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn widget_get_child_by_name(&self, widget: WidgetHandle, name: &CStr) -> Native<WidgetHandle> {
        let mut state = self.state("widget_get_child_by_name");
        state.widget(widget.token())?;
        let name = lossy(name);
        let found = state.find_descendant(widget.token(), &|node: &WidgetNode| node.name == name);
        found
            .and_then(WidgetHandle::from_token)
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn widget_get_parent(&self, widget: WidgetHandle) -> Native<Option<WidgetHandle>> {
        let mut state = self.state("widget_get_parent");
        Ok(state
            .widget(widget.token())?
            .parent
            .and_then(WidgetHandle::from_token))
    }

    fn widget_get_root(&self, widget: WidgetHandle) -> Native<WidgetHandle> {
        let mut state = self.state("widget_get_root");
        let mut token = widget.token();
        while let Some(parent) = state.widget(token)?.parent {
            token = parent;
        }
        WidgetHandle::from_token(token).ok_or(sys::GP_ERROR)
    }

    fn widget_get_range(&self, widget: WidgetHandle) -> Native<RangeBounds> {
        let mut state = self.state("widget_get_range");
        let node = state.widget(widget.token())?;
        if node.widget_type != sys::GP_WIDGET_RANGE {
            return Err(sys::GP_ERROR_BAD_PARAMETERS);
        }
        Ok(node.range)
    }

    fn widget_set_range(&self, widget: WidgetHandle, range: RangeBounds) -> Native<()> {
        self.update_widget("widget_set_range", widget, |node| {
            if node.widget_type != sys::GP_WIDGET_RANGE {
                return Err(sys::GP_ERROR_BAD_PARAMETERS);
            }
            node.range = range;
            Ok(())
        })
    }

    fn widget_add_choice(&self, widget: WidgetHandle, choice: &CStr) -> Native<()> {
        self.update_widget("widget_add_choice", widget, |node| {
            node.choices.push(lossy(choice));
            Ok(())
        })
    }

    fn widget_count_choices(&self, widget: WidgetHandle) -> Native<usize> {
        let mut state = self.state("widget_count_choices");
        Ok(state.widget(widget.token())?.choices.len())
    }

    fn widget_get_choice(&self, widget: WidgetHandle, index: usize) -> Native<String> {
        let mut state = self.state("widget_get_choice");
        state
            .widget(widget.token())?
            .choices
            .get(index)
            .cloned()
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn abilities_list_new(&self) -> Native<AbilitiesListHandle> {
        let mut state = self.state("abilities_list_new");
        let token = state.alloc(Object::AbilitiesList(Vec::new()));
        AbilitiesListHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn abilities_list_free(&self, list: AbilitiesListHandle) -> Native<()> {
        let mut state = self.state("abilities_list_free");
        state.remove(list.token(), |o| matches!(o, Object::AbilitiesList(_)))?;
        Ok(())
    }

    fn abilities_list_load(
        &self,
        list: AbilitiesListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("abilities_list_load");
        state.context(context.token())?;
        let models = state.models.clone();
        *state.abilities_list(list.token())? = models;
        Ok(())
    }

    fn abilities_list_count(&self, list: AbilitiesListHandle) -> Native<usize> {
        let mut state = self.state("abilities_list_count");
        Ok(state.abilities_list(list.token())?.len())
    }

    fn abilities_list_detect(
        &self,
        list: AbilitiesListHandle,
        ports: PortInfoListHandle,
        detected: ListHandle,
        context: ContextHandle,
    ) -> Native<()> {
        let mut state = self.state("abilities_list_detect");
        state.context(context.token())?;
        state.abilities_list(list.token())?;
        state.port_list(ports.token())?;
        let found = state
            .detected
            .iter()
            .map(|(model, path)| (model.clone(), Some(path.clone())))
            .collect();
        state.append_to_list(detected, found)
    }

    fn abilities_list_lookup_model(
        &self,
        list: AbilitiesListHandle,
        model: &CStr,
    ) -> Native<usize> {
        let mut state = self.state("abilities_list_lookup_model");
        let model = lossy(model);
        state
            .abilities_list(list.token())?
            .iter()
            .position(|abilities| crate::ffi::fixed_str(&abilities.model) == model)
            .ok_or(sys::GP_ERROR_MODEL_NOT_FOUND)
    }

    fn abilities_list_get_abilities(
        &self,
        list: AbilitiesListHandle,
        index: usize,
    ) -> Native<sys::CameraAbilities> {
        let mut state = self.state("abilities_list_get_abilities");
        state
            .abilities_list(list.token())?
            .get(index)
            .copied()
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)
    }

    fn port_info_list_new(&self) -> Native<PortInfoListHandle> {
        let mut state = self.state("port_info_list_new");
        let token = state.alloc(Object::PortInfoList(PortListState {
            ports: Vec::new(),
            infos: Vec::new(),
        }));
        PortInfoListHandle::from_token(token).ok_or(sys::GP_ERROR_NO_MEMORY)
    }

    fn port_info_list_free(&self, list: PortInfoListHandle) -> Native<()> {
        let mut state = self.state("port_info_list_free");
        if let Object::PortInfoList(removed) =
            state.remove(list.token(), |o| matches!(o, Object::PortInfoList(_)))?
        {
            for token in removed.infos.into_iter().flatten() {
                state.objects.remove(&token);
            }
        }
        Ok(())
    }

    fn port_info_list_load(&self, list: PortInfoListHandle) -> Native<()> {
        let mut state = self.state("port_info_list_load");
        let ports = state.ports.clone();
        let entry = state.port_list(list.token())?;
        entry.infos = vec![None; ports.len()];
        entry.ports = ports;
        Ok(())
    }

    fn port_info_list_count(&self, list: PortInfoListHandle) -> Native<usize> {
        let mut state = self.state("port_info_list_count");
        Ok(state.port_list(list.token())?.ports.len())
    }

    fn port_info_list_lookup_path(&self, list: PortInfoListHandle, path: &CStr) -> Native<usize> {
        let mut state = self.state("port_info_list_lookup_path");
        let path = lossy(path);
        state
            .port_list(list.token())?
            .ports
            .iter()
            .position(|port| port.path == path)
            .ok_or(sys::GP_ERROR_UNKNOWN_PORT)
    }

    fn port_info_list_get_info(
        &self,
        list: PortInfoListHandle,
        index: usize,
    ) -> Native<PortInfoRecord> {
        let mut state = self.state("port_info_list_get_info");
        let layout = state.layout;
        let entry = state.port_list(list.token())?;
        let port = entry
            .ports
            .get(index)
            .cloned()
            .ok_or(sys::GP_ERROR_BAD_PARAMETERS)?;
        let existing = entry.infos.get(index).copied().flatten();

        let raw = match layout {
            PortInfoLayout::Struct => {
                let mut raw = Box::new(sys::GPPortInfoStruct::zeroed());
                raw.type_ = port.port_type;
                write_fixed_str(&mut raw.name, &port.name);
                write_fixed_str(&mut raw.path, &port.path);
                RawPortInfo::Struct(raw)
            }
            PortInfoLayout::Pointer => {
                let token = match existing {
                    Some(token) => token,
                    None => {
                        let token = state.alloc(Object::PortInfo);
                        state.port_list(list.token())?.infos[index] = Some(token);
                        token
                    }
                };
                RawPortInfo::Pointer(PortInfoHandle::from_token(token).ok_or(sys::GP_ERROR)?)
            }
        };
        Ok(PortInfoRecord {
            port_type: port.port_type,
            name: port.name,
            path: port.path,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_released_handles_are_flagged() {
        let mock = MockBackend::new();
        let list = mock.list_new().unwrap();
        mock.list_unref(list).unwrap();
        assert_eq!(mock.live_objects(), 0);
        assert_eq!(mock.list_unref(list), Err(sys::GP_ERROR_BAD_PARAMETERS));
        assert_eq!(mock.invalid_handle_uses(), 1);
    }

    #[test]
    fn test_widget_tree_freed_from_root() {
        let mock = MockBackend::new();
        let label = CString::new("x").unwrap();
        let root = mock.widget_new(sys::GP_WIDGET_WINDOW, &label).unwrap();
        let child = mock.widget_new(sys::GP_WIDGET_TEXT, &label).unwrap();
        mock.widget_append(root, child).unwrap();
        assert_eq!(mock.live_objects(), 2);
        mock.widget_unref(root).unwrap();
        assert_eq!(mock.live_objects(), 0);
    }

    #[test]
    fn test_config_template_instantiated_fresh() {
        let mock = MockBackend::new()
            .with_config(MockWidget::window("main", "Main").child(MockWidget::toggle("af", "AF", 1)));
        let context = mock.context_new().unwrap();
        let camera = mock.camera_new().unwrap();
        mock.camera_init(camera, context).unwrap();
        let first = mock.camera_get_config(camera, context).unwrap();
        let second = mock.camera_get_config(camera, context).unwrap();
        assert_ne!(first, second);
        assert_eq!(mock.widget_count_children(first), Ok(1));
        mock.widget_unref(first).unwrap();
        mock.widget_unref(second).unwrap();
        mock.camera_exit(camera, context).unwrap();
        mock.camera_free(camera).unwrap();
        mock.context_unref(context);
        assert_eq!(mock.live_objects(), 0);
        assert_eq!(mock.invalid_handle_uses(), 0);
    }

    #[test]
    fn test_folders_derived_from_files() {
        let mock = MockBackend::new().with_device_file("/a/b/c", "x.jpg", b"x");
        let state = mock.state.borrow();
        assert!(state.folder_exists("/a/b"));
        assert!(!state.folder_exists("/a/bc"));
        assert_eq!(
            state.subfolders("/a").into_iter().collect::<Vec<_>>(),
            vec!["b"]
        );
    }
}
