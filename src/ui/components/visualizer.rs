//! Listening visualizer
//!
//! A row of bars that jump to new random heights every 100 ms while
//! listening, and rest flat otherwise.

use crate::ui::theme::Theme;
use egui::{Rect, Sense, Vec2};
use rand::Rng;
use std::time::{Duration, Instant};

pub const BAR_COUNT: usize = 5;
pub const BAR_INTERVAL: Duration = Duration::from_millis(100);

const REST_HEIGHT: f32 = 0.1;

/// Bar heights (0.0 to 1.0) kept across frames
#[derive(Clone, Debug)]
pub struct VisualizerBars {
    heights: Vec<f32>,
    last_update: Option<Instant>,
}

impl Default for VisualizerBars {
    fn default() -> Self {
        Self {
            heights: vec![REST_HEIGHT; BAR_COUNT],
            last_update: None,
        }
    }
}

impl VisualizerBars {
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Advance the animation. Returns true when the heights changed.
    pub fn tick(&mut self, active: bool, now: Instant) -> bool {
        if !active {
            self.last_update = None;
            if self.heights.iter().all(|h| *h == REST_HEIGHT) {
                return false;
            }
            self.heights.fill(REST_HEIGHT);
            return true;
        }

        let due = self
            .last_update
            .map_or(true, |last| now.duration_since(last) >= BAR_INTERVAL);
        if !due {
            return false;
        }

        let mut rng = rand::thread_rng();
        for height in &mut self.heights {
            *height = rng.gen_range(0.15..=1.0);
        }
        self.last_update = Some(now);
        true
    }
}

pub struct Visualizer<'a> {
    bars: &'a mut VisualizerBars,
    active: bool,
    theme: &'a Theme,
    height: f32,
}

impl<'a> Visualizer<'a> {
    pub fn new(bars: &'a mut VisualizerBars, active: bool, theme: &'a Theme) -> Self {
        Self {
            bars,
            active,
            theme,
            height: 40.0,
        }
    }

    pub fn show(self, ui: &mut egui::Ui) -> egui::Response {
        self.bars.tick(self.active, Instant::now());
        if self.active {
            ui.ctx().request_repaint_after(BAR_INTERVAL);
        }

        let bar_width = 6.0;
        let gap = 5.0;
        let width = BAR_COUNT as f32 * (bar_width + gap) - gap;
        let (rect, response) = ui.allocate_exact_size(Vec2::new(width, self.height), Sense::hover());
        let label = if self.active {
            "Visualizer active"
        } else {
            "Visualizer idle"
        };
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, label));

        if ui.is_rect_visible(rect) {
            let color = if self.active {
                self.theme.bar_active
            } else {
                self.theme.bar_inactive
            };
            for (i, height) in self.bars.heights().iter().enumerate() {
                let bar_height = (self.height * height).max(3.0);
                let x = rect.left() + i as f32 * (bar_width + gap);
                let bar = Rect::from_min_size(
                    egui::pos2(x, rect.center().y - bar_height / 2.0),
                    Vec2::new(bar_width, bar_height),
                );
                ui.painter().rect_filled(bar, bar_width / 2.0, color);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_update_at_most_every_interval() {
        let mut bars = VisualizerBars::default();
        let start = Instant::now();

        assert!(bars.tick(true, start));
        assert!(!bars.tick(true, start + Duration::from_millis(50)));
        assert!(bars.tick(true, start + Duration::from_millis(100)));
        assert!(bars.heights().iter().all(|h| (0.15..=1.0).contains(h)));
    }

    #[test]
    fn test_inactive_bars_rest() {
        let mut bars = VisualizerBars::default();
        assert!(!bars.tick(false, Instant::now()));

        bars.tick(true, Instant::now());
        assert!(bars.tick(false, Instant::now()));
        assert!(bars.heights().iter().all(|h| *h == REST_HEIGHT));
    }
}
