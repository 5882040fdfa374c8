//! egui/eframe user interface
//!
//! The UI only reads shared state; the stop button and typed input are the
//! only ways it talks back to the voice loop.

pub mod app;
pub mod components;
pub mod presenter;
pub mod theme;

pub use app::{AvatarApp, INPUT_LABEL, TITLE};
pub use presenter::{present, AvatarView};
pub use theme::Theme;
