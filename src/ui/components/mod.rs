//! UI components module
//!
//! Reusable pieces of the avatar window.

pub mod avatar;
pub mod chat_log;
pub mod debug_panel;
pub mod stop_button;
pub mod visualizer;

pub use avatar::Avatar;
pub use chat_log::ChatLog;
pub use debug_panel::DebugPanel;
pub use stop_button::{StopButton, STOP_LABEL};
pub use visualizer::{Visualizer, VisualizerBars, BAR_COUNT, BAR_INTERVAL};
