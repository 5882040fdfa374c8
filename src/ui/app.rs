//! Main application struct and eframe integration

use crate::backends::KeyboardInput;
use crate::runtime::VoiceLoopHandle;
use crate::ui::components::{Avatar, ChatLog, DebugPanel, StopButton, Visualizer, VisualizerBars};
use crate::ui::presenter::present;
use crate::ui::theme::Theme;
use egui::{CentralPanel, Key, RichText, Sense, SidePanel, TextEdit, TopBottomPanel};
use tracing::{info, warn};

/// Window title, also the double-click target for the debug panel
pub const TITLE: &str = "Voice Avatar";

/// Accessible label of the typed input box
pub const INPUT_LABEL: &str = "Message input";

/// Main voice avatar application
pub struct AvatarApp {
    handle: VoiceLoopHandle,
    /// Present when typed input stands in for the microphone
    keyboard: Option<KeyboardInput>,
    theme: Theme,
    bars: VisualizerBars,
    show_debug: bool,
    input_text: String,
}

impl AvatarApp {
    pub fn new(handle: VoiceLoopHandle, keyboard: Option<KeyboardInput>, show_debug: bool) -> Self {
        Self {
            handle,
            keyboard,
            theme: Theme::dark(),
            bars: VisualizerBars::default(),
            show_debug,
            input_text: String::new(),
        }
    }

    /// Create the app from eframe, applying the theme
    pub fn from_creation_context(
        cc: &eframe::CreationContext<'_>,
        handle: VoiceLoopHandle,
        keyboard: Option<KeyboardInput>,
        show_debug: bool,
    ) -> Self {
        let app = Self::new(handle, keyboard, show_debug);
        app.theme.apply(&cc.egui_ctx);
        app
    }

    pub fn is_debug_visible(&self) -> bool {
        self.show_debug
    }

    pub fn toggle_debug(&mut self) {
        self.show_debug = !self.show_debug;
    }

    /// Render one frame
    pub fn ui(&mut self, ctx: &egui::Context) {
        let status = self.handle.state().snapshot();
        let view = present(status.turn);

        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let title = ui.add(
                        egui::Label::new(
                            RichText::new(TITLE)
                                .size(20.0)
                                .strong()
                                .color(self.theme.text_primary),
                        )
                        .sense(Sense::click()),
                    );
                    if title.double_clicked() {
                        self.show_debug = !self.show_debug;
                    }
                });
            });

        if self.show_debug {
            SidePanel::right("debug_panel")
                .resizable(true)
                .default_width(300.0)
                .min_width(220.0)
                .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(self.theme.spacing))
                .show(ctx, |ui| {
                    DebugPanel::new(&status, &self.theme).show(ui);
                });
        }

        TopBottomPanel::bottom("controls")
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                if let Some(mic_error) = &status.mic_error {
                    egui::Frame::none()
                        .fill(self.theme.error.gamma_multiply(0.25))
                        .rounding(self.theme.card_rounding)
                        .inner_margin(self.theme.spacing_sm)
                        .show(ui, |ui| {
                            ui.label(RichText::new(mic_error).color(self.theme.error));
                        });
                    ui.add_space(self.theme.spacing_sm);
                }

                if self.keyboard.is_some() {
                    self.show_typed_input(ui);
                    ui.add_space(self.theme.spacing_sm);
                }

                ui.vertical_centered(|ui| {
                    let stop = StopButton::new(status.stop_enabled, &self.theme).show(ui);
                    if stop.clicked() {
                        info!("Stop requested from UI");
                        if let Err(e) = self.handle.stop_speaking() {
                            warn!("Failed to request stop: {}", e);
                        }
                    }
                });
            });

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    Avatar::new(view, &self.theme).show(ui);

                    let (status_text, status_color) = match &status.server_status {
                        Some(server_status) => (server_status.as_str(), self.theme.error),
                        None => (view.status_text, self.theme.text_secondary),
                    };
                    ui.label(RichText::new(status_text).size(16.0).color(status_color));

                    Visualizer::new(&mut self.bars, status.visualizer_active, &self.theme).show(ui);
                });

                ui.add_space(self.theme.spacing_sm);
                ui.separator();
                ChatLog::new(self.handle.transcript(), &self.theme).show(ui);
            });
    }

    fn show_typed_input(&mut self, ui: &mut egui::Ui) {
        let Some(keyboard) = &self.keyboard else {
            return;
        };
        let listening = keyboard.is_listening();

        ui.horizontal(|ui| {
            let hint = if listening {
                "Type what you would say..."
            } else {
                "Wait for listening to resume"
            };
            let edit = ui.add(
                TextEdit::singleline(&mut self.input_text)
                    .hint_text(hint)
                    .desired_width(ui.available_width() - 80.0),
            );
            edit.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, listening, INPUT_LABEL)
            });
            if edit.changed() {
                keyboard.typing();
            }
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            let send = ui.add_enabled(listening, egui::Button::new("Send"));

            if (submitted || send.clicked()) && !self.input_text.trim().is_empty() {
                if keyboard.submit(&self.input_text) {
                    self.input_text.clear();
                }
                edit.request_focus();
            }
        });
    }
}

impl eframe::App for AvatarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);

        // Pick up state changes made by the voice loop
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Voice avatar shutting down");
        self.handle.shutdown();
    }
}
