//! String marshalling between Rust and the C side.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::error::Result;

/// Decode a fixed-size, NUL-padded C buffer. Stops at the first NUL or at the
/// end of the buffer, whichever comes first.
pub(crate) fn fixed_str(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copy `value` into a fixed-size buffer, truncating so a terminating NUL
/// always fits.
pub(crate) fn write_fixed_str(buf: &mut [c_char], value: &str) {
    buf.iter_mut().for_each(|c| *c = 0);
    let max = buf.len().saturating_sub(1);
    for (dst, &src) in buf.iter_mut().zip(value.as_bytes().iter().take(max)) {
        *dst = src as c_char;
    }
}

/// Owned copy of a C string, `None` for NULL.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub(crate) unsafe fn ptr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

pub(crate) fn to_c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let mut buf = [0 as c_char; 16];
        write_fixed_str(&mut buf, "usb:001,002");
        assert_eq!(fixed_str(&buf), "usb:001,002");
    }

    #[test]
    fn test_write_fixed_str_truncates() {
        let mut buf = [0 as c_char; 4];
        write_fixed_str(&mut buf, "abcdef");
        assert_eq!(fixed_str(&buf), "abc");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn test_fixed_str_without_terminator() {
        let buf = [b'a' as c_char, b'b' as c_char];
        assert_eq!(fixed_str(&buf), "ab");
    }

    #[test]
    fn test_null_pointer() {
        assert_eq!(unsafe { ptr_to_string(std::ptr::null()) }, None);
    }

    #[test]
    fn test_interior_nul_rejected() {
        assert!(to_c_string("a\0b").is_err());
    }
}
