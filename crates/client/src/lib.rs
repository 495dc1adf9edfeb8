//! Screenshot capture for shotit.
//!
//! This crate provides the [`Capturer`] trait with a headless Chromium
//! backend (feature `render`) and a remote HTTP backend, plus the target
//! guard applied before any capture.

pub mod capture;
pub mod guard;

pub use capture::{CaptureError, CaptureOptions, Capturer, RemoteCapturer, ViewportConfig, build_capturer, viewport_for};
pub use guard::{GuardError, check_target};

#[cfg(feature = "render")]
pub use capture::HeadlessCapturer;
