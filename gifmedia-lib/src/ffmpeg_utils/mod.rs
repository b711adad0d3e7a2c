//! FFmpeg module - provides wrappers and utilities for FFmpeg library access
//!
//! This module handles:
//! - FFmpeg initialization
//! - Routing FFmpeg's own log output into `tracing`
//! - Timebase conversion and other utilities

pub mod helpers;
pub mod utils;

pub use ffmpeg_next as ffmpeg;
#[allow(unused_imports)]
pub use utils::*;

/// Initialize the FFmpeg library.
///
/// Call once at application startup before loading assets or exporting.
pub fn init() -> Result<(), crate::error::FfmpegError> {
    ffmpeg::init().map_err(|e| {
        crate::error::FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e))
    })?;

    tracing::info!("FFmpeg initialized");

    Ok(())
}

/// Install a custom FFmpeg log callback that forwards messages to `tracing`
/// and drops known-noisy ones.
///
/// **Safety & Ordering:** Must be called after `init()` and before any export
/// starts, because altering the global log callback is not thread-safe.
pub fn install_log_filter() {
    // SAFETY: both functions modify global FFmpeg state and are safe to call
    // after `ffmpeg::init()`. They are called once at startup before any
    // export thread is spawned.
    unsafe {
        ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_WARNING as i32);
        ffmpeg_next::ffi::av_log_set_callback(Some(ffmpeg_log_callback));
    }
}

/// Messages emitted by decoders and the swscale/filter layers that carry no
/// actionable information for an export.
const SUPPRESSED_MESSAGES: &[&str] = &[
    "deprecated pixel format used, make sure you did set range correctly",
    "No accelerated colorspace conversion found",
    "Could not update timestamps for skipped samples",
    "Could not update timestamps for discarded samples",
    "Timestamps are unset in a packet",
];

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut std::ffi::c_void,
    level: std::ffi::c_int,
    fmt: *const std::ffi::c_char,
    vl: ffmpeg_next::ffi::va_list,
) {
    if level > ffmpeg_next::ffi::av_log_get_level() {
        return;
    }

    let mut line = [0 as std::ffi::c_char; 1024];
    let mut print_prefix: std::ffi::c_int = 1;
    ffmpeg_next::ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        line.as_mut_ptr(),
        line.len() as std::ffi::c_int,
        &mut print_prefix,
    );
    let msg = std::ffi::CStr::from_ptr(line.as_ptr()).to_string_lossy();
    forward_log(level, &msg);
}

/// Re-emit one formatted FFmpeg log line through `tracing`.  Returns `false`
/// when the line was dropped.
fn forward_log(level: std::ffi::c_int, msg: &str) -> bool {
    let msg = msg.trim_end();
    if msg.is_empty() || SUPPRESSED_MESSAGES.iter().any(|s| msg.contains(s)) {
        return false;
    }
    match level {
        l if l <= ffmpeg_next::ffi::AV_LOG_ERROR as std::ffi::c_int => {
            tracing::error!(target: "ffmpeg", "{}", msg)
        }
        l if l <= ffmpeg_next::ffi::AV_LOG_WARNING as std::ffi::c_int => {
            tracing::warn!(target: "ffmpeg", "{}", msg)
        }
        _ => tracing::debug!(target: "ffmpeg", "{}", msg),
    }
    true
}

/// Version of the linked libavcodec, as `major.minor.micro`.
pub fn version_info() -> String {
    // SAFETY: `avcodec_version` only reads a compile-time constant.
    let v = unsafe { ffmpeg_next::ffi::avcodec_version() };
    format!("libavcodec {}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_log_filters_noise() {
        let warning = ffmpeg_next::ffi::AV_LOG_WARNING as std::ffi::c_int;
        assert!(forward_log(warning, "[mov] stream 0: odd edit list\n"));
        assert!(!forward_log(warning, "   \n"));
        assert!(!forward_log(
            warning,
            "[swscaler] No accelerated colorspace conversion found from yuv420p to rgb24.\n"
        ));
    }

    #[test]
    fn test_version_info_format() {
        let v = version_info();
        assert!(v.starts_with("libavcodec "));
        assert_eq!(v.split('.').count(), 3);
    }
}
