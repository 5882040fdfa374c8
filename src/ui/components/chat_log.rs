//! Chat transcript display

use crate::messages::{Author, ChatEntry, ChatTranscript};
use crate::ui::theme::Theme;
use egui::{Align, Layout, RichText, ScrollArea};

pub struct ChatLog<'a> {
    transcript: &'a ChatTranscript,
    theme: &'a Theme,
}

impl<'a> ChatLog<'a> {
    pub fn new(transcript: &'a ChatTranscript, theme: &'a Theme) -> Self {
        Self { transcript, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let entries = self.transcript.get_all();

        ScrollArea::vertical()
            .id_salt("chat_log")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if entries.is_empty() {
                    ui.vertical_centered(|ui| {
                        ui.label(
                            RichText::new("Say something to start the conversation")
                                .color(self.theme.text_muted),
                        );
                    });
                    return;
                }

                for entry in &entries {
                    self.show_entry(ui, entry);
                    ui.add_space(self.theme.spacing_sm);
                }
            });
    }

    fn show_entry(&self, ui: &mut egui::Ui, entry: &ChatEntry) {
        let (layout, fill, prefix) = match entry.author {
            Author::User => (
                Layout::right_to_left(Align::TOP),
                self.theme.bubble_user,
                "User message",
            ),
            Author::Bot => (
                Layout::left_to_right(Align::TOP),
                self.theme.bubble_bot,
                "Bot message",
            ),
        };

        ui.with_layout(layout, |ui| {
            let max_width = ui.available_width() * 0.75;
            egui::Frame::none()
                .fill(fill)
                .rounding(self.theme.card_rounding)
                .inner_margin(self.theme.spacing_sm + 2.0)
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    let response = ui.label(RichText::new(&entry.text).color(self.theme.text_primary));
                    let label = format!("{}: {}", prefix, entry.text);
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                    });
                    ui.label(
                        RichText::new(entry.timestamp.format("%H:%M").to_string())
                            .size(10.0)
                            .color(self.theme.text_muted),
                    );
                });
        });
    }
}
