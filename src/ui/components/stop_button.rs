//! Stop-speaking control

use crate::ui::theme::Theme;
use egui::{Button, RichText};

/// Accessible label of the stop control
pub const STOP_LABEL: &str = "Stop speaking";

/// Button bound to active speech; disabled otherwise
pub struct StopButton<'a> {
    enabled: bool,
    theme: &'a Theme,
}

impl<'a> StopButton<'a> {
    pub fn new(enabled: bool, theme: &'a Theme) -> Self {
        Self { enabled, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) -> egui::Response {
        let text = RichText::new(STOP_LABEL).color(self.theme.text_primary);
        let fill = if self.enabled {
            self.theme.error
        } else {
            self.theme.bg_tertiary
        };
        let button = Button::new(text)
            .fill(fill)
            .rounding(self.theme.button_rounding);

        ui.add_enabled(self.enabled, button)
            .on_hover_text("Interrupt the reply and listen again")
    }
}
