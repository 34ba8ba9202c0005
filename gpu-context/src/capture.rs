//! RenderDoc-style capture hook (specification §1, §6).
//!
//! `start_capture()`/`end_capture()` load the RenderDoc in-application API
//! if present and no-op otherwise; correct placement around a region of
//! device work causes an attached RenderDoc instance to record that
//! region. This is ambient debug tooling, not part of the tensor engine.

#[cfg(feature = "renderdoc")]
mod imp {
    use once_cell::sync::OnceCell;
    use renderdoc_sys::RENDERDOC_API_1_1_2;
    use std::os::raw::{c_int, c_void};

    static API: OnceCell<Option<*mut RENDERDOC_API_1_1_2>> = OnceCell::new();

    #[cfg(unix)]
    const LIB_NAME: &str = "librenderdoc.so";
    #[cfg(windows)]
    const LIB_NAME: &str = "renderdoc.dll";
    #[cfg(target_os = "macos")]
    const LIB_NAME: &str = "librenderdoc.dylib";

    fn load_api() -> Option<*mut RENDERDOC_API_1_1_2> {
        type GetApiFn =
            unsafe extern "C" fn(version: u32, out: *mut *mut c_void) -> c_int;

        let lib = unsafe { libloading::Library::new(LIB_NAME) }.ok()?;
        let get_api: libloading::Symbol<GetApiFn> =
            unsafe { lib.get(b"RENDERDOC_GetAPI") }.ok()?;

        let mut api_ptr: *mut c_void = std::ptr::null_mut();
        // eRENDERDOC_API_Version_1_1_2 = 10102
        let ok = unsafe { get_api(10102, &mut api_ptr) };
        if ok == 1 && !api_ptr.is_null() {
            std::mem::forget(lib);
            Some(api_ptr as *mut RENDERDOC_API_1_1_2)
        } else {
            None
        }
    }

    fn api() -> Option<*mut RENDERDOC_API_1_1_2> {
        *API.get_or_init(load_api)
    }

    pub fn start_capture() {
        if let Some(api) = api() {
            unsafe {
                if let Some(start) = (*api).StartFrameCapture {
                    start(std::ptr::null_mut(), std::ptr::null_mut());
                }
            }
        } else {
            log::debug!("start_capture: no RenderDoc instance attached, no-op");
        }
    }

    pub fn end_capture() {
        if let Some(api) = api() {
            unsafe {
                if let Some(end) = (*api).EndFrameCapture {
                    end(std::ptr::null_mut(), std::ptr::null_mut());
                }
            }
        } else {
            log::debug!("end_capture: no RenderDoc instance attached, no-op");
        }
    }
}

#[cfg(not(feature = "renderdoc"))]
mod imp {
    pub fn start_capture() {
        log::debug!("start_capture: renderdoc feature disabled, no-op");
    }

    pub fn end_capture() {
        log::debug!("end_capture: renderdoc feature disabled, no-op");
    }
}

pub use imp::{end_capture, start_capture};
