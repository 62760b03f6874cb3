//! In-memory sample accumulation

pub mod window;

pub use window::{SampleWindow, WindowState};
