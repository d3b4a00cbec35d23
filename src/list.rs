//! Native name/value lists.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::backend::ListHandle;
use crate::context::Context;
use crate::error::Result;
use crate::ffi::to_c_string;

/// Ordered (name, value) pairs. Names need not be unique.
pub struct CameraList {
    ctx: Context,
    handle: ListHandle,
}

impl CameraList {
    /// Empty list.
    pub fn new(ctx: &Context) -> Result<Self> {
        let handle = ctx.check(ctx.backend().list_new())?;
        Ok(CameraList {
            ctx: ctx.clone(),
            handle,
        })
    }

    pub(crate) fn handle(&self) -> ListHandle {
        self.handle
    }

    /// Number of entries.
    pub fn count(&self) -> Result<usize> {
        self.ctx.check(self.ctx.backend().list_count(self.handle))
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Name at `index`; an unset name reads as `""`.
    pub fn name(&self, index: usize) -> Result<String> {
        let name = self.ctx.check(self.ctx.backend().list_get_name(self.handle, index))?;
        Ok(name.unwrap_or_default())
    }

    /// Value at `index`; an unset value reads as `""`.
    pub fn value(&self, index: usize) -> Result<String> {
        let value = self
            .ctx
            .check(self.ctx.backend().list_get_value(self.handle, index))?;
        Ok(value.unwrap_or_default())
    }

    /// Replace the name at `index`.
    pub fn set_name(&self, index: usize, name: &str) -> Result<()> {
        let name = to_c_string(name)?;
        self.ctx
            .check(self.ctx.backend().list_set_name(self.handle, index, &name))
    }

    /// Replace the value at `index`.
    pub fn set_value(&self, index: usize, value: &str) -> Result<()> {
        let value = to_c_string(value)?;
        self.ctx
            .check(self.ctx.backend().list_set_value(self.handle, index, &value))
    }

    /// Index of the first entry called `name`.
    pub fn find_by_name(&self, name: &str) -> Result<usize> {
        let name = to_c_string(name)?;
        self.ctx
            .check(self.ctx.backend().list_find_by_name(self.handle, &name))
    }

    /// Sort by name.
    pub fn sort(&self) -> Result<()> {
        self.ctx.check(self.ctx.backend().list_sort(self.handle))
    }

    /// Remove every entry.
    pub fn reset(&self) -> Result<()> {
        self.ctx.check(self.ctx.backend().list_reset(self.handle))
    }

    /// Add an entry; a missing value is stored as NULL.
    pub fn append(&self, name: &str, value: Option<&str>) -> Result<()> {
        let name = to_c_string(name)?;
        let value = value.map(to_c_string).transpose()?;
        self.ctx.check(
            self.ctx
                .backend()
                .list_append(self.handle, &name, value.as_deref()),
        )
    }

    /// Every entry, in list order.
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        (0..self.count()?)
            .map(|index| Ok((self.name(index)?, self.value(index)?)))
            .collect()
    }

    /// Every name, in list order. Folder and file listings carry no values.
    pub fn names(&self) -> Result<Vec<String>> {
        (0..self.count()?).map(|index| self.name(index)).collect()
    }

    /// Entries as a map; for repeated names the last value wins.
    pub fn to_map(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries()?.into_iter().collect())
    }

    /// A second owner of the same native list.
    pub fn try_clone(&self) -> Result<Self> {
        self.ctx.check(self.ctx.backend().list_ref(self.handle))?;
        Ok(CameraList {
            ctx: self.ctx.clone(),
            handle: self.handle,
        })
    }
}

impl Drop for CameraList {
    fn drop(&mut self) {
        if let Err(code) = self.ctx.backend().list_unref(self.handle) {
            tracing::warn!("gp_list_unref failed: {}", code);
        }
    }
}

impl fmt::Display for CameraList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries().map_err(|_| fmt::Error)?;
        write!(f, "CameraList object with {} elements:", entries.len())?;
        for (index, (name, value)) in entries.iter().enumerate() {
            write!(f, "\n{}: ({}, {})", index, name, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CameraList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraList")
            .field("handle", &self.handle)
            .finish()
    }
}

fn usb_path_regex() -> Option<&'static Regex> {
    static USB_PATH: OnceLock<Option<Regex>> = OnceLock::new();
    USB_PATH
        .get_or_init(|| Regex::new(r"^usb:\d{3},\d{3}").ok())
        .as_ref()
}

/// Pick the usable entries from an ability-list detection.
///
/// Entries with a bus/device path (`usb:BBB,DDD`) are kept when there are
/// any. Otherwise a bare `usb:` entry is kept only if it is the only one, as
/// several of them cannot be told apart. Everything else is dropped.
pub fn select_usb_paths(entries: &[(String, String)]) -> Vec<(String, String)> {
    let specific: Vec<_> = entries
        .iter()
        .filter(|(_, path)| usb_path_regex().map_or(false, |regex| regex.is_match(path)))
        .cloned()
        .collect();
    if !specific.is_empty() {
        return specific;
    }

    let generic: Vec<_> = entries
        .iter()
        .filter(|(_, path)| path == "usb:")
        .cloned()
        .collect();
    if generic.len() == 1 {
        generic
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::Config;
    use std::rc::Rc;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn context() -> (Rc<MockBackend>, Context) {
        let mock = Rc::new(MockBackend::new());
        let ctx = Context::with_backend(mock.clone(), Config::default()).unwrap();
        (mock, ctx)
    }

    #[test]
    fn test_select_keeps_specific_paths() {
        let detected = pairs(&[("Canon", "usb:"), ("Canon", "usb:001,004")]);
        assert_eq!(select_usb_paths(&detected), pairs(&[("Canon", "usb:001,004")]));
    }

    #[test]
    fn test_select_single_generic() {
        let detected = pairs(&[("Canon", "usb:")]);
        assert_eq!(select_usb_paths(&detected), detected);
    }

    #[test]
    fn test_select_ambiguous_generic() {
        let detected = pairs(&[("Canon", "usb:"), ("Nikon", "usb:")]);
        assert!(select_usb_paths(&detected).is_empty());
    }

    #[test]
    fn test_select_ignores_other_ports() {
        let detected = pairs(&[("Directory Browse", "disk:/media/card"), ("Canon", "usb:12,3")]);
        assert!(select_usb_paths(&detected).is_empty());
    }

    #[test]
    fn test_usb_path_pattern() {
        let regex = usb_path_regex().unwrap();
        assert!(regex.is_match("usb:001,004"));
        assert!(!regex.is_match("usb:"));
        assert!(!regex.is_match("ptpip:usb:001,004"));
    }

    #[test]
    fn test_list_operations() {
        let (_mock, ctx) = context();
        let list = CameraList::new(&ctx).unwrap();
        assert!(list.is_empty().unwrap());
        list.append("shutter", Some("1/250")).unwrap();
        list.append("iso", Some("400")).unwrap();
        list.append("DCIM", None).unwrap();

        assert_eq!(list.count().unwrap(), 3);
        assert_eq!(list.find_by_name("iso").unwrap(), 1);
        assert_eq!(list.value(2).unwrap(), "");

        list.sort().unwrap();
        assert_eq!(list.names().unwrap(), vec!["DCIM", "iso", "shutter"]);

        list.set_value(1, "800").unwrap();
        assert_eq!(list.to_map().unwrap()["iso"], "800");

        list.reset().unwrap();
        assert_eq!(list.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_name_is_error() {
        let (_mock, ctx) = context();
        let list = CameraList::new(&ctx).unwrap();
        assert!(list.find_by_name("nope").is_err());
    }

    #[test]
    fn test_display() {
        let (_mock, ctx) = context();
        let list = CameraList::new(&ctx).unwrap();
        list.append("Canon EOS 5D", Some("usb:001,004")).unwrap();
        list.append("Nikon D90", Some("usb:001,005")).unwrap();
        assert_eq!(
            list.to_string(),
            "CameraList object with 2 elements:\n\
             0: (Canon EOS 5D, usb:001,004)\n\
             1: (Nikon D90, usb:001,005)"
        );
    }

    #[test]
    fn test_clone_shares_native_list() {
        let (mock, ctx) = context();
        let list = CameraList::new(&ctx).unwrap();
        let other = list.try_clone().unwrap();
        list.append("a", Some("1")).unwrap();
        drop(list);
        assert_eq!(other.count().unwrap(), 1);
        drop(other);
        drop(ctx);
        assert_eq!(mock.live_objects(), 0);
    }
}
