//! macOS `.app` bundles.

pub mod dylib;
