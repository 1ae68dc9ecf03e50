//! Scoped ownership of a native-allocated result string.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::NonNull;

use super::NativeLibrary;
use crate::{BenchError, BenchResult};

/// A result buffer allocated by a [`NativeLibrary`].
///
/// The guard releases the buffer through the library's deallocator exactly once,
/// when it is dropped. It is neither `Clone` nor `Send`, and [`into_string`]
/// consumes it, so the text is read at most once and never after release.
///
/// [`into_string`]: NativeResultBuffer::into_string
pub struct NativeResultBuffer<'lib> {
    ptr: NonNull<c_char>,
    library: &'lib dyn NativeLibrary,
}

impl<'lib> NativeResultBuffer<'lib> {
    /// Take ownership of `ptr`. Returns `None` for a null handle, in which case
    /// nothing will be released.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must have been returned by `library.run_benchmark`, must
    /// point to a NUL-terminated string, and must not have been released.
    pub unsafe fn from_raw(library: &'lib dyn NativeLibrary, ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| NativeResultBuffer { ptr, library })
    }

    fn as_c_str(&self) -> &CStr {
        // SAFETY: `from_raw` requires a live NUL-terminated buffer, and it stays
        // live until `drop` runs.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    /// Copy the text into an owned `String` and release the native buffer.
    ///
    /// An empty or non-UTF-8 buffer is a [`BenchError::NativeInvocation`]; the
    /// buffer is released in every case.
    pub fn into_string(self) -> BenchResult<String> {
        let bytes = self.as_c_str().to_bytes();
        if bytes.is_empty() {
            return Err(BenchError::native("native library returned an empty result"));
        }
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| BenchError::native(format!("result is not valid UTF-8: {e}")))
    }
}

impl Drop for NativeResultBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: the pointer came from this library and the guard is the only
        // owner; drop runs once.
        unsafe { self.library.free_result(self.ptr.as_ptr()) }
    }
}
