//! Mapping between editor-local pixels and (time, lane).
//!
//! Time runs bottom to top: the visible window `[now - lookbehind, now + lookahead]`
//! spans the full height with earlier times lower. Horizontally there are four
//! equal lanes followed by the fixed-width SV strip.

use crate::editor::EditorOptions;
use crate::structure::{Lane, LANE_COUNT};
use egui::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub size: Vec2,
    pub lookbehind: f64,
    pub lookahead: f64,
    pub sv_strip_width: f32,
}

impl Viewport {
    pub fn new(size: Vec2, options: &EditorOptions) -> Self {
        Self {
            size,
            lookbehind: options.lookbehind,
            lookahead: options.lookahead,
            sv_strip_width: options.sv_strip_width,
        }
    }

    fn span(&self) -> f64 {
        self.lookbehind + self.lookahead
    }

    pub fn is_empty(&self) -> bool {
        !(self.size.x > 0.0 && self.size.y > 0.0 && self.span() > 0.0)
    }

    /// Visible `[start, end]` time range around `now`.
    pub fn window(&self, now: f64) -> (f64, f64) {
        (now - self.lookbehind, now + self.lookahead)
    }

    pub fn time_to_pos(&self, time: f64, now: f64) -> f32 {
        let start = now - self.lookbehind;
        let fraction = (time - start) / self.span();
        (self.size.y as f64 * (1.0 - fraction)) as f32
    }

    pub fn pos_to_time(&self, y: f32, now: f64) -> f64 {
        let start = now - self.lookbehind;
        let fraction = 1.0 - y as f64 / self.size.y as f64;
        start + fraction * self.span()
    }

    pub fn pixels_to_seconds(&self, pixels: f32) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        pixels as f64 / self.size.y as f64 * self.span()
    }

    fn lanes_width(&self) -> f32 {
        (self.size.x - self.sv_strip_width).max(0.0)
    }

    pub fn lane_width(&self) -> f32 {
        self.lanes_width() / LANE_COUNT as f32
    }

    /// Unclamped numeric column under `x`; drags use it for lane deltas.
    pub fn column_at(&self, x: f32) -> i32 {
        let width = self.lane_width();
        if width <= 0.0 {
            return 0;
        }
        (x / width).floor() as i32
    }

    pub fn lane_at(&self, x: f32) -> Option<Lane> {
        if self.is_empty() || x < 0.0 || x >= self.size.x {
            return None;
        }
        if x >= self.lanes_width() {
            return Some(Lane::Sv);
        }
        let column = self.column_at(x).clamp(0, LANE_COUNT as i32 - 1);
        Some(Lane::Key(column as u8))
    }

    /// Horizontal extent `[left, right)` of a lane.
    pub fn lane_x_range(&self, lane: Lane) -> (f32, f32) {
        match lane {
            Lane::Key(index) => {
                let width = self.lane_width();
                let left = index as f32 * width;
                (left, left + width)
            }
            Lane::Sv => (self.lanes_width(), self.size.x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn viewport() -> Viewport {
        Viewport::new(Vec2::new(448.0, 1100.0), &EditorOptions::default())
    }

    #[test]
    fn window_edges_map_to_bottom_and_top() {
        let vp = viewport();
        assert!((vp.time_to_pos(9.9, 10.0) - 1100.0).abs() < 1e-3);
        assert!(vp.time_to_pos(11.0, 10.0).abs() < 1e-3);
        assert!((vp.time_to_pos(10.0, 10.0) - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn pos_and_time_are_inverse() {
        let vp = viewport();
        for step in 0..20 {
            let time = 4.9 + step as f64 * 0.05;
            let y = vp.time_to_pos(time, 5.0);
            assert!((vp.pos_to_time(y, 5.0) - time).abs() < 1e-5);
        }
    }

    #[test_case(0.0, Some(Lane::Key(0)))]
    #[test_case(99.9, Some(Lane::Key(0)))]
    #[test_case(100.0, Some(Lane::Key(1)))]
    #[test_case(399.0, Some(Lane::Key(3)))]
    #[test_case(400.0, Some(Lane::Sv))]
    #[test_case(447.0, Some(Lane::Sv))]
    #[test_case(448.0, None)]
    #[test_case(-1.0, None)]
    fn lanes(x: f32, expected: Option<Lane>) {
        assert_eq!(viewport().lane_at(x), expected);
    }

    #[test]
    fn zero_size_hits_nothing() {
        let vp = Viewport::new(Vec2::ZERO, &EditorOptions::default());
        assert!(vp.is_empty());
        assert_eq!(vp.lane_at(0.0), None);
        assert_eq!(vp.pixels_to_seconds(10.0), 0.0);
    }

    #[test]
    fn lane_ranges_tile_the_width() {
        let vp = viewport();
        assert_eq!(vp.lane_x_range(Lane::Key(2)), (200.0, 300.0));
        assert_eq!(vp.lane_x_range(Lane::Sv), (400.0, 448.0));
    }
}
