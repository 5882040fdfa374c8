//! Debug panel
//!
//! Shows the turn state flags and the recent debug log. Hidden by default;
//! double-clicking the title toggles it.

use crate::state::{LogLevel, VoiceStatus};
use crate::ui::theme::Theme;
use egui::{Color32, RichText, ScrollArea, Ui};

pub struct DebugPanel<'a> {
    status: &'a VoiceStatus,
    theme: &'a Theme,
}

impl<'a> DebugPanel<'a> {
    pub fn new(status: &'a VoiceStatus, theme: &'a Theme) -> Self {
        Self { status, theme }
    }

    pub fn show(&self, ui: &mut Ui) {
        ui.label(
            RichText::new("Debug Log")
                .strong()
                .size(14.0)
                .color(self.theme.text_primary),
        );
        ui.separator();

        egui::Grid::new("debug_state_grid")
            .num_columns(2)
            .spacing([20.0, 4.0])
            .striped(true)
            .show(ui, |ui| {
                self.row(ui, "Turn", &self.status.turn.to_string());
                self.row(ui, "Stop enabled", &self.status.stop_enabled.to_string());
                self.row(ui, "Visualizer", &self.status.visualizer_active.to_string());
                self.row(
                    ui,
                    "Microphone",
                    self.status.mic_error.as_deref().unwrap_or("ok"),
                );
                self.row(
                    ui,
                    "Server",
                    self.status.server_status.as_deref().unwrap_or("ok"),
                );
            });

        ui.separator();

        ScrollArea::vertical()
            .id_salt("debug_log")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.status.debug_log {
                    ui.label(
                        RichText::new(format!("{} {}", line.time, line.message))
                            .family(egui::FontFamily::Monospace)
                            .size(11.0)
                            .color(self.level_color(line.level)),
                    );
                }
            });
    }

    fn row(&self, ui: &mut Ui, name: &str, value: &str) {
        ui.label(RichText::new(name).color(self.theme.text_muted));
        ui.label(RichText::new(value).color(self.theme.text_secondary));
        ui.end_row();
    }

    fn level_color(&self, level: LogLevel) -> Color32 {
        match level {
            LogLevel::Info => self.theme.text_secondary,
            LogLevel::Success => self.theme.success,
            LogLevel::Warning => self.theme.warning,
            LogLevel::Error => self.theme.error,
        }
    }
}
