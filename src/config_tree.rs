//! Walking a configuration widget tree into flat entries or an ordered
//! mirror of the tree.

use std::fmt;

use crate::error::Result;
use crate::types::{RangeBounds, WidgetType};
use crate::widget::{Widget, WidgetValue};

/// A leaf setting, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    /// Dotted path from the root, e.g. `main.capturesettings.shutterspeed`
    pub path: String,
    /// Widget name
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Type tag
    pub widget_type: WidgetType,
    /// Decoded value
    pub value: WidgetValue,
    /// Radio and menu options, and text suggestions when the camera offers
    /// them; empty for other types
    pub choices: Vec<String>,
    /// Bounds of a range widget
    pub range: Option<RangeBounds>,
    /// Writes are ignored by the camera
    pub readonly: bool,
}

impl ConfigEntry {
    pub(crate) fn from_widget(widget: &Widget, path: String) -> Result<Self> {
        let widget_type = widget.widget_type()?;
        let choices = match widget_type {
            WidgetType::Radio | WidgetType::Menu => widget.choices()?,
            // libgphoto2 rejects choice queries on most text widgets
            WidgetType::Text => widget.choices().unwrap_or_default(),
            _ => Vec::new(),
        };
        let range = if widget_type == WidgetType::Range {
            Some(widget.range()?)
        } else {
            None
        };
        Ok(ConfigEntry {
            path,
            name: widget.name()?,
            label: widget.label()?,
            widget_type,
            value: widget.value()?,
            choices,
            range,
            readonly: widget.readonly()?,
        })
    }

    /// The options line of a dump: `[lo .. hi]` for a run of consecutive
    /// integers, the full list otherwise, the bounds for a range widget.
    pub fn choice_summary(&self) -> Option<String> {
        if let Some(range) = self.range {
            return Some(range.to_string());
        }
        if self.choices.is_empty() {
            return None;
        }

        let numbers: Option<Vec<i64>> = self
            .choices
            .iter()
            .map(|choice| choice.trim().parse().ok())
            .collect();
        if let Some(numbers) = numbers {
            let (lower, upper) = (numbers[0], numbers[numbers.len() - 1]);
            let span = (i128::from(upper) - i128::from(lower)).max(0);
            let covered = numbers
                .iter()
                .filter(|&&n| n >= lower && n < upper)
                .count();
            if usize::try_from(span).ok() == Some(covered) {
                return Some(format!("{}[{} .. {}]", " ".repeat(56), lower, upper));
            }
        }
        Some(format!("{:?}", self.choices))
    }
}

/// One dump line, `path = value` with the label right-aligned, followed by
/// the choice summary when there is one.
impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.to_string();
        let label = format!("({})", self.label);
        let width = 58usize.saturating_sub(value.chars().count());
        write!(f, "{:<40} = {}{:>width$}", self.path, value, label, width = width)?;
        if let Some(summary) = self.choice_summary() {
            write!(f, "\n    {}", summary)?;
        }
        Ok(())
    }
}

/// Leaves of the tree below `root`, depth first in child order.
pub fn walk(root: &Widget) -> Result<Vec<ConfigEntry>> {
    let mut entries = Vec::new();
    walk_into(root, root.name()?, &mut entries)?;
    Ok(entries)
}

fn walk_into(widget: &Widget, path: String, entries: &mut Vec<ConfigEntry>) -> Result<()> {
    let children = widget.children()?;
    if children.is_empty() {
        entries.push(ConfigEntry::from_widget(widget, path)?);
        return Ok(());
    }
    for child in &children {
        let child_path = format!("{}.{}", path, child.name()?);
        walk_into(child, child_path, entries)?;
    }
    Ok(())
}

/// Dotted paths of every leaf below `root`.
pub fn list_paths(root: &Widget) -> Result<Vec<String>> {
    Ok(walk(root)?.into_iter().map(|entry| entry.path).collect())
}

/// A node of a [`ConfigTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// A setting
    Leaf(ConfigEntry),
    /// A section with its children
    Section {
        /// [`Widget::describe`] of the section
        doc: String,
        /// Settings and subsections, in widget order
        children: ConfigTree,
    },
}

impl ConfigNode {
    /// The setting, if this is a leaf.
    pub fn entry(&self) -> Option<&ConfigEntry> {
        match self {
            ConfigNode::Leaf(entry) => Some(entry),
            ConfigNode::Section { .. } => None,
        }
    }

    /// The children, if this is a section.
    pub fn children(&self) -> Option<&ConfigTree> {
        match self {
            ConfigNode::Leaf(_) => None,
            ConfigNode::Section { children, .. } => Some(children),
        }
    }

    /// [`Widget::describe`] text, if this is a section.
    pub fn doc(&self) -> Option<&str> {
        match self {
            ConfigNode::Leaf(_) => None,
            ConfigNode::Section { doc, .. } => Some(doc),
        }
    }
}

/// Configuration as an ordered name → node mapping, mirroring the widget
/// tree. The top level holds a single section named after the root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigTree {
    nodes: Vec<(String, ConfigNode)>,
}

impl ConfigTree {
    /// Mirror the tree below `root`.
    pub fn build(root: &Widget) -> Result<Self> {
        let name = root.name()?;
        let node = ConfigNode::Section {
            doc: root.describe()?,
            children: Self::children_of(root, &name)?,
        };
        Ok(ConfigTree {
            nodes: vec![(name, node)],
        })
    }

    fn children_of(widget: &Widget, path: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        for child in widget.children()? {
            let name = child.name()?;
            let child_path = format!("{}.{}", path, name);
            let node = if child.count_children()? > 0 {
                ConfigNode::Section {
                    doc: child.describe()?,
                    children: Self::children_of(&child, &child_path)?,
                }
            } else {
                ConfigNode::Leaf(ConfigEntry::from_widget(&child, child_path)?)
            };
            nodes.push((name, node));
        }
        Ok(ConfigTree { nodes })
    }

    /// Direct child called `name`.
    pub fn get(&self, name: &str) -> Option<&ConfigNode> {
        self.nodes
            .iter()
            .find(|(node_name, _)| node_name == name)
            .map(|(_, node)| node)
    }

    /// Node at a dotted path such as `main.imgsettings.iso`.
    pub fn lookup(&self, path: &str) -> Option<&ConfigNode> {
        let mut parts = path.split('.');
        let mut node = self.get(parts.next()?)?;
        for part in parts {
            node = node.children()?.get(part)?;
        }
        Some(node)
    }

    /// Children in widget order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Child names in widget order.
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every leaf entry, depth first.
    pub fn leaves(&self) -> Vec<&ConfigEntry> {
        let mut leaves = Vec::new();
        for (_, node) in &self.nodes {
            match node {
                ConfigNode::Leaf(entry) => leaves.push(entry),
                ConfigNode::Section { children, .. } => leaves.extend(children.leaves()),
            }
        }
        leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::{Config, Context};
    use std::rc::Rc;

    fn context() -> Context {
        Context::with_backend(Rc::new(MockBackend::new()), Config::default()).unwrap()
    }

    fn node(ctx: &Context, widget_type: WidgetType, name: &str, label: &str) -> Widget {
        let widget = Widget::new(ctx, widget_type, label).unwrap();
        widget.set_name(name).unwrap();
        widget
    }

    fn camera_like(ctx: &Context) -> Widget {
        let main = node(ctx, WidgetType::Window, "main", "Camera and Driver Configuration");
        let settings = node(ctx, WidgetType::Section, "imgsettings", "Image Settings");
        let iso = node(ctx, WidgetType::Radio, "iso", "ISO Speed");
        for choice in ["100", "200", "400"] {
            iso.add_choice(choice).unwrap();
        }
        iso.set_value("400").unwrap();
        settings.append(iso).unwrap();
        let zoom = node(ctx, WidgetType::Range, "zoom", "Zoom");
        zoom.set_range(RangeBounds::new(0.0, 10.0, 1.0)).unwrap();
        settings.append(zoom).unwrap();
        main.append(settings).unwrap();
        let owner = node(ctx, WidgetType::Text, "owner", "Owner Name");
        owner.set_value("Jane").unwrap();
        main.append(owner).unwrap();
        main
    }

    #[test]
    fn test_walk_two_leaves() {
        let ctx = context();
        let main = node(&ctx, WidgetType::Section, "main", "Main");
        let iso = node(&ctx, WidgetType::Text, "iso", "ISO");
        iso.set_value("400").unwrap();
        let shutter = node(&ctx, WidgetType::Text, "shutter", "Shutter");
        shutter.set_value("1/250").unwrap();
        main.append(iso).unwrap();
        main.append(shutter).unwrap();

        assert_eq!(list_paths(&main).unwrap(), vec!["main.iso", "main.shutter"]);
        let entries = walk(&main).unwrap();
        assert_eq!(entries[0].value, WidgetValue::Text("400".to_string()));
        assert_eq!(entries[1].value, WidgetValue::Text("1/250".to_string()));
    }

    #[test]
    fn test_walk_nested() {
        let ctx = context();
        let main = camera_like(&ctx);
        assert_eq!(
            list_paths(&main).unwrap(),
            vec!["main.imgsettings.iso", "main.imgsettings.zoom", "main.owner"]
        );
        let entries = walk(&main).unwrap();
        assert_eq!(entries[0].choices, vec!["100", "200", "400"]);
        assert_eq!(entries[1].range, Some(RangeBounds::new(0.0, 10.0, 1.0)));
        assert_eq!(entries[2].label, "Owner Name");
    }

    #[test]
    fn test_walk_childless_root() {
        let ctx = context();
        let root = node(&ctx, WidgetType::Window, "main", "Main");
        assert_eq!(list_paths(&root).unwrap(), vec!["main"]);
    }

    #[test]
    fn test_tree_mirror() {
        let ctx = context();
        let main = camera_like(&ctx);
        let tree = ConfigTree::build(&main).unwrap();

        assert_eq!(tree.names(), vec!["main"]);
        let root = tree.get("main").unwrap();
        assert!(root.doc().unwrap().starts_with("Label: Camera and Driver Configuration"));
        assert_eq!(root.children().unwrap().names(), vec!["imgsettings", "owner"]);

        let iso = tree.lookup("main.imgsettings.iso").unwrap().entry().unwrap();
        assert_eq!(iso.value.as_text(), Some("400"));
        assert!(tree.lookup("main.imgsettings").unwrap().entry().is_none());
        assert!(tree.lookup("main.nothing").is_none());
        assert_eq!(tree.leaves().len(), 3);
    }

    fn entry(value: &str, choices: &[&str]) -> ConfigEntry {
        ConfigEntry {
            path: "main.capturesettings.iso".to_string(),
            name: "iso".to_string(),
            label: "ISO Speed".to_string(),
            widget_type: WidgetType::Radio,
            value: WidgetValue::Text(value.to_string()),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            range: None,
            readonly: false,
        }
    }

    #[test]
    fn test_dump_line() {
        let line = entry("400", &[]).to_string();
        let expected = format!(
            "{:<40} = 400{:>55}",
            "main.capturesettings.iso", "(ISO Speed)"
        );
        assert_eq!(line, expected);
    }

    #[test]
    fn test_choice_summary() {
        assert_eq!(
            entry("1", &["1", "2", "3"]).choice_summary().unwrap().trim(),
            "[1 .. 3]"
        );
        assert_eq!(
            entry("100", &["100", "200"]).choice_summary().unwrap(),
            "[\"100\", \"200\"]"
        );
        assert_eq!(
            entry("Auto", &["Auto", "100"]).choice_summary().unwrap(),
            "[\"Auto\", \"100\"]"
        );
        assert_eq!(entry("x", &[]).choice_summary(), None);
    }

    #[test]
    fn test_choice_summary_extreme_bounds() {
        let wide = entry("0", &["-9223372036854775808", "9223372036854775807"]);
        assert_eq!(
            wide.choice_summary().unwrap(),
            "[\"-9223372036854775808\", \"9223372036854775807\"]"
        );
        assert_eq!(
            entry("5", &["9223372036854775806", "9223372036854775807"])
                .choice_summary()
                .unwrap()
                .trim(),
            "[9223372036854775806 .. 9223372036854775807]"
        );
    }

    #[test]
    fn test_text_widget_choices() {
        let ctx = context();
        let main = node(&ctx, WidgetType::Window, "main", "Main");
        let owner = node(&ctx, WidgetType::Text, "owner", "Owner Name");
        owner.set_value("Jane").unwrap();
        owner.add_choice("Jane").unwrap();
        owner.add_choice("John").unwrap();
        main.append(owner).unwrap();
        let plain = node(&ctx, WidgetType::Text, "artist", "Artist");
        plain.set_value("").unwrap();
        main.append(plain).unwrap();

        let entries = walk(&main).unwrap();
        assert_eq!(entries[0].choices, vec!["Jane", "John"]);
        assert_eq!(
            entries[0].choice_summary().unwrap(),
            "[\"Jane\", \"John\"]"
        );
        assert!(entries[1].choices.is_empty());
        assert_eq!(entries[1].choice_summary(), None);
    }
}
