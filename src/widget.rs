//! Configuration widgets.
//!
//! libgphoto2 hands out configuration as a tree of widgets owned through its
//! root: releasing the root releases every node. A [`Widget`] is a node plus a
//! shared reference to the tree it lives in, so any node keeps the whole tree
//! alive and the root is released once, when the last node goes away.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::os::raw::c_int;
use std::rc::Rc;

use crate::backend::WidgetHandle;
use crate::context::Context;
use crate::error::{GphotoError, Result};
use crate::ffi::to_c_string;
use crate::types::{RangeBounds, WidgetType};

/// Owner of one native widget tree.
struct WidgetTree {
    ctx: Context,
    /// `None` once the tree has been grafted into another one.
    root: Cell<Option<WidgetHandle>>,
    /// The tree that owns this one's nodes after a graft.
    adopted_by: RefCell<Option<Rc<WidgetTree>>>,
}

impl WidgetTree {
    fn new(ctx: &Context, root: WidgetHandle) -> Rc<Self> {
        Rc::new(WidgetTree {
            ctx: ctx.clone(),
            root: Cell::new(Some(root)),
            adopted_by: RefCell::new(None),
        })
    }

    /// True if `other` is this tree or owns it, directly or through grafts.
    fn is_within(self: &Rc<Self>, other: &Rc<WidgetTree>) -> bool {
        let mut current = Some(self.clone());
        while let Some(tree) = current {
            if Rc::ptr_eq(&tree, other) {
                return true;
            }
            current = tree.adopted_by.borrow().clone();
        }
        false
    }
}

impl Drop for WidgetTree {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            if let Err(code) = self.ctx.backend().widget_unref(root) {
                tracing::warn!("gp_widget_unref failed: {}", code);
            }
        }
    }
}

/// A widget value, in the representation its type tag calls for.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetValue {
    /// Window, section and button widgets carry no value
    None,
    /// Text, radio and menu widgets
    Text(String),
    /// Range widgets read as their bounds
    Range(RangeBounds),
    /// Slider position of a range widget (write only)
    Float(f32),
    /// Toggle state, or a date as a unix timestamp
    Int(i32),
}

impl WidgetValue {
    fn kind(&self) -> &'static str {
        match self {
            WidgetValue::None => "empty",
            WidgetValue::Text(_) => "text",
            WidgetValue::Range(_) => "range",
            WidgetValue::Float(_) => "float",
            WidgetValue::Int(_) => "integer",
        }
    }

    /// Text, radio or menu value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WidgetValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Toggle or date value.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            WidgetValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Range bounds.
    pub fn as_range(&self) -> Option<RangeBounds> {
        match self {
            WidgetValue::Range(range) => Some(*range),
            _ => None,
        }
    }
}

impl fmt::Display for WidgetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetValue::None => f.write_str("None"),
            WidgetValue::Text(text) => f.write_str(text),
            WidgetValue::Range(range) => write!(f, "{}", range),
            WidgetValue::Float(value) => write!(f, "{}", value),
            WidgetValue::Int(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for WidgetValue {
    fn from(value: &str) -> Self {
        WidgetValue::Text(value.to_string())
    }
}

impl From<String> for WidgetValue {
    fn from(value: String) -> Self {
        WidgetValue::Text(value)
    }
}

impl From<i32> for WidgetValue {
    fn from(value: i32) -> Self {
        WidgetValue::Int(value)
    }
}

impl From<f32> for WidgetValue {
    fn from(value: f32) -> Self {
        WidgetValue::Float(value)
    }
}

impl From<RangeBounds> for WidgetValue {
    fn from(value: RangeBounds) -> Self {
        WidgetValue::Range(value)
    }
}

/// One node of a configuration tree.
#[derive(Clone)]
pub struct Widget {
    handle: WidgetHandle,
    tree: Rc<WidgetTree>,
}

impl Widget {
    /// A new detached widget, root of its own tree.
    pub fn new(ctx: &Context, widget_type: WidgetType, label: &str) -> Result<Self> {
        let label = to_c_string(label)?;
        let handle = ctx.check(ctx.backend().widget_new(widget_type.to_c_enum(), &label))?;
        Ok(Self::from_root(ctx, handle))
    }

    /// Take ownership of a tree the library handed out.
    pub(crate) fn from_root(ctx: &Context, root: WidgetHandle) -> Self {
        Widget {
            handle: root,
            tree: WidgetTree::new(ctx, root),
        }
    }

    fn node(&self, handle: WidgetHandle) -> Widget {
        Widget {
            handle,
            tree: self.tree.clone(),
        }
    }

    fn ctx(&self) -> &Context {
        &self.tree.ctx
    }

    pub(crate) fn handle(&self) -> WidgetHandle {
        self.handle
    }

    /// Widget name, the key used by [`child_by_name`](Self::child_by_name).
    pub fn name(&self) -> Result<String> {
        self.ctx().check(self.ctx().backend().widget_get_name(self.handle))
    }

    /// Set the name.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let name = to_c_string(name)?;
        self.ctx()
            .check(self.ctx().backend().widget_set_name(self.handle, &name))
    }

    /// Human-readable label.
    pub fn label(&self) -> Result<String> {
        self.ctx().check(self.ctx().backend().widget_get_label(self.handle))
    }

    /// Set the label.
    pub fn set_label(&self, label: &str) -> Result<()> {
        let label = to_c_string(label)?;
        self.ctx()
            .check(self.ctx().backend().widget_set_label(self.handle, &label))
    }

    /// Help text
    pub fn info(&self) -> Result<String> {
        self.ctx().check(self.ctx().backend().widget_get_info(self.handle))
    }

    /// Set the help text.
    pub fn set_info(&self, info: &str) -> Result<()> {
        let info = to_c_string(info)?;
        self.ctx()
            .check(self.ctx().backend().widget_set_info(self.handle, &info))
    }

    /// Numeric id, unique within the tree.
    pub fn id(&self) -> Result<c_int> {
        self.ctx().check(self.ctx().backend().widget_get_id(self.handle))
    }

    /// Whether the value was modified since the last call. Reading clears
    /// the flag.
    pub fn changed(&self) -> Result<bool> {
        self.ctx().check(self.ctx().backend().widget_changed(self.handle))
    }

    /// Set or clear the changed flag.
    pub fn set_changed(&self, changed: bool) -> Result<()> {
        self.ctx()
            .check(self.ctx().backend().widget_set_changed(self.handle, changed))
    }

    /// Whether the camera ignores writes.
    pub fn readonly(&self) -> Result<bool> {
        self.ctx()
            .check(self.ctx().backend().widget_get_readonly(self.handle))
    }

    /// Mark the widget read-only.
    pub fn set_readonly(&self, readonly: bool) -> Result<()> {
        self.ctx()
            .check(self.ctx().backend().widget_set_readonly(self.handle, readonly))
    }

    /// Type tag.
    pub fn widget_type(&self) -> Result<WidgetType> {
        let raw = self.ctx().check(self.ctx().backend().widget_get_type(self.handle))?;
        WidgetType::try_from(raw)
    }

    /// Current value, decoded according to the type tag.
    pub fn value(&self) -> Result<WidgetValue> {
        let ctx = self.ctx();
        let backend = ctx.backend();
        let widget_type = self.widget_type()?;
        let value = if widget_type.has_string_value() {
            let text = ctx.check(backend.widget_get_value_string(self.handle))?;
            WidgetValue::Text(text.unwrap_or_default())
        } else if widget_type == WidgetType::Range {
            WidgetValue::Range(ctx.check(backend.widget_get_range(self.handle))?)
        } else if widget_type.has_int_value() {
            WidgetValue::Int(ctx.check(backend.widget_get_value_int(self.handle))?)
        } else {
            WidgetValue::None
        };
        Ok(value)
    }

    /// Store `value`, which must be the representation the type tag calls
    /// for. Nothing reaches the library on a mismatch.
    pub fn set_value<V: Into<WidgetValue>>(&self, value: V) -> Result<()> {
        let value = value.into();
        let ctx = self.ctx();
        let backend = ctx.backend();
        let widget_type = self.widget_type()?;
        match (widget_type, &value) {
            (WidgetType::Window | WidgetType::Section | WidgetType::Button, _) => {
                Err(GphotoError::NotImplemented {
                    operation: "setting the value of a window, section or button widget",
                })
            }
            (t, WidgetValue::Text(text)) if t.has_string_value() => {
                let text = to_c_string(text)?;
                ctx.check(backend.widget_set_value_string(self.handle, &text))
            }
            (WidgetType::Range, WidgetValue::Range(range)) => {
                ctx.check(backend.widget_set_range(self.handle, *range))
            }
            (WidgetType::Range, WidgetValue::Float(position)) => {
                ctx.check(backend.widget_set_value_float(self.handle, *position))
            }
            (t, WidgetValue::Int(int)) if t.has_int_value() => {
                ctx.check(backend.widget_set_value_int(self.handle, *int))
            }
            (t, given) => Err(GphotoError::ValueMismatch {
                widget_type: t.as_str(),
                given: given.kind(),
            }),
        }
    }

    /// Slider position of a range widget.
    pub fn position(&self) -> Result<f32> {
        let widget_type = self.widget_type()?;
        if widget_type != WidgetType::Range {
            return Err(GphotoError::ValueMismatch {
                widget_type: widget_type.as_str(),
                given: "float",
            });
        }
        self.ctx()
            .check(self.ctx().backend().widget_get_value_float(self.handle))
    }

    fn adopt(&self, child: &Widget) -> Result<()> {
        if child.tree.root.get() != Some(child.handle) {
            return Err(GphotoError::InvalidArgument(
                "only the root of a detached widget tree can be added as a child".to_string(),
            ));
        }
        if self.tree.is_within(&child.tree) {
            return Err(GphotoError::InvalidArgument(
                "a widget cannot be added below itself".to_string(),
            ));
        }
        Ok(())
    }

    fn graft(&self, child: Widget) {
        child.tree.root.set(None);
        *child.tree.adopted_by.borrow_mut() = Some(self.tree.clone());
    }

    /// Add `child` as the last child. The child must be the root of a
    /// detached tree, which becomes part of this one.
    pub fn append(&self, child: Widget) -> Result<()> {
        self.adopt(&child)?;
        self.ctx()
            .check(self.ctx().backend().widget_append(self.handle, child.handle))?;
        self.graft(child);
        Ok(())
    }

    /// Add `child` as the first child. Same rules as [`append`](Self::append).
    pub fn prepend(&self, child: Widget) -> Result<()> {
        self.adopt(&child)?;
        self.ctx()
            .check(self.ctx().backend().widget_prepend(self.handle, child.handle))?;
        self.graft(child);
        Ok(())
    }

    /// Number of direct children.
    pub fn count_children(&self) -> Result<usize> {
        self.ctx()
            .check(self.ctx().backend().widget_count_children(self.handle))
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Result<Widget> {
        let handle = self
            .ctx()
            .check(self.ctx().backend().widget_get_child(self.handle, index))?;
        Ok(self.node(handle))
    }

    /// Direct children in order.
    pub fn children(&self) -> Result<Vec<Widget>> {
        (0..self.count_children()?)
            .map(|index| self.child(index))
            .collect()
    }

    /// First descendant with this label.
    pub fn child_by_label(&self, label: &str) -> Result<Widget> {
        let label = to_c_string(label)?;
        let handle = self.ctx().check(
            self.ctx()
                .backend()
                .widget_get_child_by_label(self.handle, &label),
        )?;
        Ok(self.node(handle))
    }

    /// Descendant with this id.
    pub fn child_by_id(&self, id: c_int) -> Result<Widget> {
        let handle = self
            .ctx()
            .check(self.ctx().backend().widget_get_child_by_id(self.handle, id))?;
        Ok(self.node(handle))
    }

    /// First descendant with this name.
    pub fn child_by_name(&self, name: &str) -> Result<Widget> {
        let name = to_c_string(name)?;
        let handle = self.ctx().check(
            self.ctx()
                .backend()
                .widget_get_child_by_name(self.handle, &name),
        )?;
        Ok(self.node(handle))
    }

    /// `None` at the root.
    pub fn parent(&self) -> Result<Option<Widget>> {
        let parent = self
            .ctx()
            .check(self.ctx().backend().widget_get_parent(self.handle))?;
        Ok(parent.map(|handle| self.node(handle)))
    }

    /// Root of the tree.
    pub fn root(&self) -> Result<Widget> {
        let handle = self
            .ctx()
            .check(self.ctx().backend().widget_get_root(self.handle))?;
        Ok(self.node(handle))
    }

    /// Bounds of a range widget.
    pub fn range(&self) -> Result<RangeBounds> {
        self.ctx()
            .check(self.ctx().backend().widget_get_range(self.handle))
    }

    /// Set the bounds of a range widget.
    pub fn set_range(&self, range: RangeBounds) -> Result<()> {
        self.ctx()
            .check(self.ctx().backend().widget_set_range(self.handle, range))
    }

    /// Add an option to a radio or menu widget.
    pub fn add_choice(&self, choice: &str) -> Result<()> {
        let choice = to_c_string(choice)?;
        self.ctx()
            .check(self.ctx().backend().widget_add_choice(self.handle, &choice))
    }

    /// Number of options.
    pub fn count_choices(&self) -> Result<usize> {
        self.ctx()
            .check(self.ctx().backend().widget_count_choices(self.handle))
    }

    /// Option at `index`.
    pub fn choice(&self, index: usize) -> Result<String> {
        self.ctx()
            .check(self.ctx().backend().widget_get_choice(self.handle, index))
    }

    /// All options in order.
    pub fn choices(&self) -> Result<Vec<String>> {
        (0..self.count_choices()?)
            .map(|index| self.choice(index))
            .collect()
    }

    /// Multi-line description: label, info, type, then one line per child.
    pub fn describe(&self) -> Result<String> {
        let info = self.info()?;
        let mut lines = vec![
            format!("Label: {}", self.label()?),
            format!("Info: {}", if info.is_empty() { "n/a" } else { info.as_str() }),
            format!("Type: {}", self.widget_type()?),
        ];
        let children = self.children()?;
        if !children.is_empty() {
            lines.push("Children:".to_string());
            for child in children {
                lines.push(format!("  - {}: {}", child.name()?, child.label()?));
            }
        }
        Ok(lines.join("\n"))
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = (|| -> Result<_> {
            Ok((
                self.label()?,
                self.name()?,
                self.info()?,
                self.widget_type()?,
                self.value()?,
            ))
        })()
        .map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}:{}:{}:{}:{}",
            fields.0, fields.1, fields.2, fields.3, fields.4
        )
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("handle", &self.handle)
            .field("name", &self.name().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::Config;

    fn context() -> (Rc<MockBackend>, Context) {
        let mock = Rc::new(MockBackend::new());
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        (mock, ctx)
    }

    fn widget(ctx: &Context, widget_type: WidgetType, name: &str) -> Widget {
        let widget = Widget::new(ctx, widget_type, name).unwrap();
        widget.set_name(name).unwrap();
        widget
    }

    #[test]
    fn test_string_values_round_trip() {
        let (_mock, ctx) = context();
        for widget_type in [WidgetType::Text, WidgetType::Radio, WidgetType::Menu] {
            let w = widget(&ctx, widget_type, "iso");
            assert_eq!(w.value().unwrap(), WidgetValue::Text(String::new()));
            w.set_value("400").unwrap();
            assert_eq!(w.value().unwrap(), WidgetValue::Text("400".to_string()));
        }
    }

    #[test]
    fn test_range_round_trip() {
        let (_mock, ctx) = context();
        let w = widget(&ctx, WidgetType::Range, "zoom");
        let bounds = RangeBounds::new(0.0, 10.0, 0.5);
        w.set_value(bounds).unwrap();
        assert_eq!(w.value().unwrap(), WidgetValue::Range(bounds));
        assert_eq!(w.range().unwrap(), bounds);

        w.set_value(2.5f32).unwrap();
        assert_eq!(w.position().unwrap(), 2.5);
        // Reading a range widget still gives the bounds.
        assert_eq!(w.value().unwrap(), WidgetValue::Range(bounds));
    }

    #[test]
    fn test_int_values_round_trip() {
        let (_mock, ctx) = context();
        let toggle = widget(&ctx, WidgetType::Toggle, "autofocus");
        toggle.set_value(1).unwrap();
        assert_eq!(toggle.value().unwrap(), WidgetValue::Int(1));

        let date = widget(&ctx, WidgetType::Date, "datetime");
        date.set_value(1_262_304_000).unwrap();
        assert_eq!(date.value().unwrap().as_int(), Some(1_262_304_000));
    }

    #[test]
    fn test_valueless_widgets() {
        let (mock, ctx) = context();
        for widget_type in [WidgetType::Window, WidgetType::Section, WidgetType::Button] {
            let w = widget(&ctx, widget_type, "w");
            assert_eq!(w.value().unwrap(), WidgetValue::None);
            let before = mock.calls("widget_set_value");
            match w.set_value("x") {
                Err(GphotoError::NotImplemented { .. }) => {}
                other => panic!("Unexpected result: {:?}", other),
            }
            assert_eq!(mock.calls("widget_set_value"), before);
        }
    }

    #[test]
    fn test_value_mismatch_sends_nothing() {
        let (mock, ctx) = context();
        let toggle = widget(&ctx, WidgetType::Toggle, "autofocus");
        match toggle.set_value("on") {
            Err(GphotoError::ValueMismatch {
                widget_type: "Toggle",
                given: "text",
            }) => {}
            other => panic!("Unexpected result: {:?}", other),
        }
        let text = widget(&ctx, WidgetType::Text, "owner");
        assert!(text.set_value(3).is_err());
        assert!(text.position().is_err());
        assert_eq!(mock.calls("widget_set_value"), 0);
    }

    #[test]
    fn test_unknown_type_tag() {
        let (mock, ctx) = context();
        let w = widget(&ctx, WidgetType::Text, "odd");
        mock.force_widget_type(w.handle(), 42);
        match w.value() {
            Err(GphotoError::UnknownWidgetType(42)) => {}
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_tree_navigation() {
        let (mock, ctx) = context();
        let root = widget(&ctx, WidgetType::Window, "main");
        let settings = widget(&ctx, WidgetType::Section, "settings");
        let iso = widget(&ctx, WidgetType::Radio, "iso");
        iso.set_label("ISO Speed").unwrap();
        iso.add_choice("100").unwrap();
        iso.add_choice("200").unwrap();
        settings.append(iso).unwrap();
        let owner = widget(&ctx, WidgetType::Text, "owner");
        settings.prepend(owner).unwrap();
        root.append(settings).unwrap();

        assert_eq!(root.count_children().unwrap(), 1);
        let settings = root.child(0).unwrap();
        let names: Vec<_> = settings
            .children()
            .unwrap()
            .iter()
            .map(|c| c.name().unwrap())
            .collect();
        assert_eq!(names, vec!["owner", "iso"]);

        let iso = root.child_by_name("iso").unwrap();
        assert_eq!(iso.choices().unwrap(), vec!["100", "200"]);
        assert_eq!(root.child_by_label("ISO Speed").unwrap().name().unwrap(), "iso");
        assert_eq!(root.child_by_id(iso.id().unwrap()).unwrap().name().unwrap(), "iso");
        assert_eq!(iso.parent().unwrap().unwrap().name().unwrap(), "settings");
        assert_eq!(iso.root().unwrap().name().unwrap(), "main");
        assert!(root.parent().unwrap().is_none());
        assert!(root.child_by_name("aperture").is_err());

        // Nodes keep the tree alive after the root handle is gone.
        drop(root);
        assert_eq!(iso.name().unwrap(), "iso");
        drop((iso, settings, ctx));
        assert_eq!(mock.live_objects(), 0);
        assert_eq!(mock.invalid_handle_uses(), 0);
    }

    #[test]
    fn test_append_rejects_non_root() {
        let (_mock, ctx) = context();
        let root = widget(&ctx, WidgetType::Window, "main");
        let section = widget(&ctx, WidgetType::Section, "s");
        root.append(section).unwrap();
        let other = widget(&ctx, WidgetType::Window, "other");

        let attached = root.child(0).unwrap();
        assert!(matches!(
            other.append(attached),
            Err(GphotoError::InvalidArgument(_))
        ));
        assert!(matches!(
            root.child(0).unwrap().append(root.clone()),
            Err(GphotoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_changed_and_readonly_flags() {
        let (_mock, ctx) = context();
        let w = widget(&ctx, WidgetType::Text, "artist");
        assert!(!w.changed().unwrap());
        w.set_value("me").unwrap();
        assert!(w.changed().unwrap());
        assert!(!w.changed().unwrap());
        w.set_changed(true).unwrap();
        assert!(w.changed().unwrap());

        assert!(!w.readonly().unwrap());
        w.set_readonly(true).unwrap();
        assert!(w.readonly().unwrap());
    }

    #[test]
    fn test_describe() {
        let (_mock, ctx) = context();
        let section = widget(&ctx, WidgetType::Section, "capturesettings");
        section.set_label("Capture Settings").unwrap();
        let shutter = widget(&ctx, WidgetType::Radio, "shutterspeed");
        shutter.set_label("Shutter Speed").unwrap();
        section.append(shutter).unwrap();

        assert_eq!(
            section.describe().unwrap(),
            "Label: Capture Settings\nInfo: n/a\nType: Section\nChildren:\n  - shutterspeed: Shutter Speed"
        );

        let leaf = section.child(0).unwrap();
        leaf.set_info("Exposure time").unwrap();
        assert_eq!(
            leaf.describe().unwrap(),
            "Label: Shutter Speed\nInfo: Exposure time\nType: Radio"
        );
    }

    #[test]
    fn test_display() {
        let (_mock, ctx) = context();
        let w = widget(&ctx, WidgetType::Menu, "iso");
        w.set_label("ISO Speed").unwrap();
        w.set_value("400").unwrap();
        assert_eq!(w.to_string(), "ISO Speed:iso::Menu:400");
    }
}
