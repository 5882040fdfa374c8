//! Avatar disc

use crate::ui::presenter::AvatarView;
use crate::ui::theme::Theme;
use egui::{Color32, Sense, Vec2};

/// Colored disc reflecting the turn state
pub struct Avatar<'a> {
    view: AvatarView,
    theme: &'a Theme,
    radius: f32,
}

impl<'a> Avatar<'a> {
    pub fn new(view: AvatarView, theme: &'a Theme) -> Self {
        Self {
            view,
            theme,
            radius: 56.0,
        }
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> egui::Response {
        let size = Vec2::splat(self.radius * 2.0 + 24.0);
        let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
        let label = format!("Avatar {}", self.view.class);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label));

        if !ui.is_rect_visible(rect) {
            return response;
        }

        let painter = ui.painter();
        let center = rect.center();
        let color = self.theme.avatar_color(&self.view);

        // Pulse while anything other than idle
        if self.view.class != "idle" {
            let t = ui.ctx().input(|i| i.time);
            let speed = if self.view.class == "thinking" { 5.0 } else { 3.0 };
            let pulse = ((t * speed).sin() * 0.5 + 0.5) as f32;
            painter.circle_stroke(
                center,
                self.radius + 4.0 + pulse * 8.0,
                egui::Stroke::new(2.0 + pulse * 2.0, color.gamma_multiply(1.0 - pulse * 0.7)),
            );
            ui.ctx().request_repaint();
        }

        painter.circle_filled(center, self.radius, color);

        // Eyes
        let eye_offset = Vec2::new(self.radius * 0.35, -self.radius * 0.15);
        let eye_radius = self.radius * 0.1;
        let left_eye = center + Vec2::new(-eye_offset.x, eye_offset.y);
        painter.circle_filled(left_eye, eye_radius, Color32::WHITE);
        painter.circle_filled(center + eye_offset, eye_radius, Color32::WHITE);

        // Mouth opens while speaking
        let mouth_height = if self.view.class == "speaking" {
            let t = ui.ctx().input(|i| i.time);
            self.radius * (0.08 + 0.12 * ((t * 9.0).sin().abs() as f32))
        } else {
            self.radius * 0.04
        };
        painter.rect_filled(
            egui::Rect::from_center_size(
                center + Vec2::new(0.0, self.radius * 0.35),
                Vec2::new(self.radius * 0.5, mouth_height),
            ),
            mouth_height / 2.0,
            Color32::WHITE,
        );

        response
    }
}
