//! Per-frame drawing of the chart editor.
//!
//! Everything goes through [`Surface`] in editor-local coordinates, so the
//! same code draws into an egui `Painter` or a recording surface in tests.

use super::viewport::Viewport;
use crate::snap::{classify_color, Snap, SnapGrid, MISTIMED_COLOR};
use crate::structure::{Beatmap, Lane, Note, NoteId};
use crate::sv::SvPattern;
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use std::collections::{BTreeMap, BTreeSet};

pub const BACKGROUND_COLOR: Color32 = Color32::from_rgb(22, 22, 28);
pub const LANE_SEPARATOR_COLOR: Color32 = Color32::from_rgb(60, 60, 70);
pub const SELECTION_ACCENT: Color32 = Color32::from_rgb(255, 170, 40);
pub const SV_STRIP_COLOR: Color32 = Color32::from_rgb(30, 30, 40);
pub const SV_ERROR_COLOR: Color32 = Color32::from_rgb(230, 60, 60);
pub const SELECTION_BOX_COLOR: Color32 = Color32::from_rgb(100, 150, 255);

const NOTE_INSET: f32 = 4.0;
const CURVE_STEPS: usize = 16;

/// Immediate-mode 2D canvas, origin at the top-left of the editor.
pub trait Surface {
    fn size(&self) -> Vec2;
    fn pixels_per_point(&self) -> f32;
    fn clear(&mut self, color: Color32);
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke);
    fn stroke_path(&mut self, points: &[Pos2], stroke: Stroke);
}

/// [`Surface`] backed by an egui painter clipped to the editor rect.
pub struct PainterSurface {
    painter: Painter,
    rect: Rect,
    pixels_per_point: f32,
}

impl PainterSurface {
    pub fn new(painter: Painter, rect: Rect, pixels_per_point: f32) -> Self {
        Self {
            painter,
            rect,
            pixels_per_point,
        }
    }

    fn to_screen(&self, rect: Rect) -> Rect {
        rect.translate(self.rect.min.to_vec2())
    }
}

impl Surface for PainterSurface {
    fn size(&self) -> Vec2 {
        self.rect.size()
    }

    fn pixels_per_point(&self) -> f32 {
        self.pixels_per_point
    }

    fn clear(&mut self, color: Color32) {
        self.painter.rect_filled(self.rect, 0.0, color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter.rect_filled(self.to_screen(rect), 0.0, color);
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.painter.rect_stroke(self.to_screen(rect), 0.0, stroke);
    }

    fn stroke_path(&mut self, points: &[Pos2], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        let offset = self.rect.min.to_vec2();
        let points: Vec<Pos2> = points.iter().map(|p| *p + offset).collect();
        self.painter.add(Shape::line(points, stroke));
    }
}

/// Everything one frame needs, borrowed from the controller.
pub struct RenderFrame<'a> {
    pub map: &'a Beatmap,
    pub grid: SnapGrid<'a>,
    pub viewport: &'a Viewport,
    pub now: f64,
    pub selection: &'a BTreeSet<NoteId>,
    pub held: &'a BTreeMap<Lane, f64>,
    /// Dragged notes at their provisional position; their originals are hidden.
    pub drag_preview: &'a [Note],
    pub selection_box: Option<Rect>,
    pub tap_height: f32,
}

pub fn render(surface: &mut dyn Surface, frame: &RenderFrame<'_>) {
    surface.clear(BACKGROUND_COLOR);
    if frame.viewport.is_empty() {
        return;
    }
    draw_lanes(surface, frame.viewport);
    draw_grid(surface, frame);

    let hidden: BTreeSet<NoteId> = frame.drag_preview.iter().map(|n| n.id).collect();
    for note in frame.map.notes.iter().filter(|n| !hidden.contains(&n.id)) {
        draw_note(surface, frame, note, frame.selection.contains(&note.id));
    }
    for note in frame.drag_preview {
        draw_note(surface, frame, note, true);
    }
    draw_held_lanes(surface, frame);
    if let Some(rect) = frame.selection_box {
        draw_selection_box(surface, rect);
    }
    draw_judgement_line(surface, frame);
}

pub fn draw_lanes(surface: &mut dyn Surface, viewport: &Viewport) {
    let height = viewport.size.y;
    let (strip_left, strip_right) = viewport.lane_x_range(Lane::Sv);
    surface.fill_rect(
        Rect::from_min_max(Pos2::new(strip_left, 0.0), Pos2::new(strip_right, height)),
        SV_STRIP_COLOR,
    );
    let stroke = Stroke::new(1.0 / surface.pixels_per_point().max(0.5), LANE_SEPARATOR_COLOR);
    for lane in Lane::KEYS.iter().skip(1).chain(std::iter::once(&Lane::Sv)) {
        let (x, _) = viewport.lane_x_range(*lane);
        surface.stroke_path(&[Pos2::new(x, 0.0), Pos2::new(x, height)], stroke);
    }
}

fn draw_grid(surface: &mut dyn Surface, frame: &RenderFrame<'_>) {
    let (start, end) = frame.viewport.window(frame.now);
    let (lanes_right, _) = frame.viewport.lane_x_range(Lane::Sv);
    for time in frame.grid.points(start, end) {
        let y = frame.viewport.time_to_pos(time, frame.now);
        let snap = frame.grid.classify(time);
        let width = if snap == Some(Snap::Whole) { 2.0 } else { 1.0 };
        let color = snap.map(Snap::color).unwrap_or(MISTIMED_COLOR).gamma_multiply(0.6);
        surface.stroke_path(
            &[Pos2::new(0.0, y), Pos2::new(lanes_right, y)],
            Stroke::new(width, color),
        );
    }
}

fn note_rect(frame: &RenderFrame<'_>, lane: Lane, start: f64, end: f64) -> Rect {
    let (left, right) = frame.viewport.lane_x_range(lane);
    let bottom = frame.viewport.time_to_pos(start, frame.now);
    let x_min = left + NOTE_INSET;
    let x_max = (right - NOTE_INSET).max(x_min);
    if end > start {
        let top = frame.viewport.time_to_pos(end, frame.now);
        Rect::from_min_max(Pos2::new(x_min, top), Pos2::new(x_max, bottom))
    } else {
        let half = frame.tap_height / 2.0;
        Rect::from_min_max(Pos2::new(x_min, bottom - half), Pos2::new(x_max, bottom + half))
    }
}

fn draw_note(surface: &mut dyn Surface, frame: &RenderFrame<'_>, note: &Note, selected: bool) {
    let (_, window_end) = frame.viewport.window(frame.now);
    if note.end_time < frame.now || note.start_time > window_end {
        return;
    }
    let color = classify_color(frame.map.tempo_map(), note.start_time);
    let rect = note_rect(frame, note.lane, note.start_time, note.end_time);

    if note.lane.is_sv() {
        draw_sv_note(surface, frame, note, rect, color);
    } else if note.is_tap() {
        surface.fill_rect(rect, color);
    } else {
        surface.fill_rect(rect, color.gamma_multiply(0.35));
        surface.stroke_rect(rect, Stroke::new(2.0, color));
    }

    if selected {
        surface.stroke_rect(rect.expand(1.0), Stroke::new(2.0, SELECTION_ACCENT));
    }
}

fn draw_sv_note(surface: &mut dyn Surface, frame: &RenderFrame<'_>, note: &Note, rect: Rect, color: Color32) {
    let pattern = note
        .sv_pattern
        .and_then(|id| frame.map.sv_patterns.get(&id).copied())
        .unwrap_or_else(SvPattern::linear);
    let flagged = pattern.curve().error;
    let border = if flagged { SV_ERROR_COLOR } else { color };

    surface.fill_rect(rect, border.gamma_multiply(0.25));
    surface.stroke_rect(rect, Stroke::new(1.5, border));
    if note.is_tap() {
        return;
    }

    let points: Vec<Pos2> = (0..=CURVE_STEPS)
        .map(|step| {
            let fraction = step as f64 / CURVE_STEPS as f64;
            let time = note.start_time + fraction * note.duration();
            let x = rect.min.x + pattern.progress_at(fraction) as f32 * rect.width();
            Pos2::new(x, frame.viewport.time_to_pos(time, frame.now))
        })
        .collect();
    surface.stroke_path(&points, Stroke::new(2.0, border));
}

fn draw_held_lanes(surface: &mut dyn Surface, frame: &RenderFrame<'_>) {
    for (lane, start) in frame.held {
        let (from, to) = if frame.now < *start {
            (frame.now, *start)
        } else {
            (*start, frame.now)
        };
        let rect = note_rect(frame, *lane, from, to);
        surface.fill_rect(rect, Color32::from_white_alpha(60));
        surface.stroke_rect(rect, Stroke::new(1.0, Color32::WHITE));
    }
}

pub fn draw_selection_box(surface: &mut dyn Surface, rect: Rect) {
    surface.fill_rect(rect, Color32::from_rgba_unmultiplied(100, 150, 255, 50));
    surface.stroke_rect(rect, Stroke::new(2.0, SELECTION_BOX_COLOR));
}

fn draw_judgement_line(surface: &mut dyn Surface, frame: &RenderFrame<'_>) {
    let y = frame.viewport.time_to_pos(frame.now, frame.now);
    let color = classify_color(frame.map.tempo_map(), frame.now);
    surface.stroke_path(
        &[Pos2::new(0.0, y), Pos2::new(frame.viewport.size.x, y)],
        Stroke::new(3.0, color),
    );
}


#[cfg(test)]
mod tests {
    use super::recording::{DrawOp, RecordingSurface};
    use super::*;
    use crate::editor::EditorOptions;
    use pretty_assertions::assert_eq;

    const SIZE: Vec2 = Vec2::new(448.0, 1100.0);

    fn viewport() -> Viewport {
        Viewport::new(SIZE, &EditorOptions::default())
    }

    fn draw_full(
        map: &Beatmap,
        now: f64,
        held: &BTreeMap<Lane, f64>,
        selection_box: Option<Rect>,
    ) -> RecordingSurface {
        let viewport = viewport();
        let selection = BTreeSet::new();
        let frame = RenderFrame {
            map,
            grid: SnapGrid::new(map.tempo_map(), Snap::Quarter),
            viewport: &viewport,
            now,
            selection: &selection,
            held,
            drag_preview: &[],
            selection_box,
            tap_height: 8.0,
        };
        let mut surface = RecordingSurface::new(SIZE);
        render(&mut surface, &frame);
        surface
    }

    fn draw(map: &Beatmap, now: f64, selection: &BTreeSet<NoteId>) -> RecordingSurface {
        let viewport = viewport();
        let held = BTreeMap::new();
        let frame = RenderFrame {
            map,
            grid: SnapGrid::new(map.tempo_map(), Snap::Quarter),
            viewport: &viewport,
            now,
            selection,
            held: &held,
            drag_preview: &[],
            selection_box: None,
            tap_height: 8.0,
        };
        let mut surface = RecordingSurface::new(SIZE);
        render(&mut surface, &frame);
        surface
    }

    /// Strokes of every horizontal line drawn at height `y`.
    fn horizontal_strokes(surface: &RecordingSurface, y: f32) -> Vec<Stroke> {
        surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Path(points, stroke)
                    if points.len() == 2
                        && (points[0].y - y).abs() < 0.01
                        && (points[1].y - y).abs() < 0.01 =>
                {
                    Some(*stroke)
                }
                _ => None,
            })
            .collect()
    }

    fn judgement_color(surface: &RecordingSurface) -> Option<Color32> {
        surface.ops.iter().find_map(|op| match op {
            DrawOp::Path(_, stroke) if stroke.width == 3.0 => Some(stroke.color),
            _ => None,
        })
    }

    fn fills_of(surface: &RecordingSurface, color: Color32) -> usize {
        surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Fill(_, c) if *c == color))
            .count()
    }

    #[test]
    fn frame_starts_with_clear() {
        let surface = draw(&Beatmap::with_tempo(120.0), 0.0, &BTreeSet::new());
        assert_eq!(surface.ops.first(), Some(&DrawOp::Clear(BACKGROUND_COLOR)));
    }

    #[test]
    fn passed_notes_are_not_drawn() {
        let mut map = Beatmap::with_tempo(120.0);
        map.notes.push(Note::tap(1.0, Lane::Key(0)));
        let whole = Snap::Whole.color();
        assert_eq!(fills_of(&draw(&map, 0.5, &BTreeSet::new()), whole), 1);
        assert_eq!(fills_of(&draw(&map, 1.5, &BTreeSet::new()), whole), 0);
    }

    #[test]
    fn mistimed_notes_are_gray() {
        let mut map = Beatmap::with_tempo(120.0);
        map.notes.push(Note::tap(0.3, Lane::Key(2)));
        assert_eq!(fills_of(&draw(&map, 0.0, &BTreeSet::new()), MISTIMED_COLOR), 1);
    }

    #[test]
    fn selected_notes_get_accent_outline() {
        let mut map = Beatmap::with_tempo(120.0);
        let note = Note::tap(0.5, Lane::Key(1));
        map.notes.push(note);
        map.notes.push(Note::tap(0.5, Lane::Key(2)));
        let selection = BTreeSet::from([note.id]);
        let surface = draw(&map, 0.0, &selection);
        let outlines = surface.stroked_with(SELECTION_ACCENT);
        assert_eq!(outlines.len(), 1);
        assert!(outlines[0].min.x < 200.0);
    }

    #[test]
    fn grid_lines_follow_their_classification() {
        let map = Beatmap::with_tempo(120.0);
        let surface = draw(&map, 0.0, &BTreeSet::new());
        let y = |time: f64| viewport().time_to_pos(time, 0.0);
        let faded = |snap: Snap| snap.color().gamma_multiply(0.6);

        assert_eq!(
            horizontal_strokes(&surface, y(0.5)),
            vec![Stroke::new(2.0, faded(Snap::Whole))]
        );
        assert_eq!(
            horizontal_strokes(&surface, y(0.25)),
            vec![Stroke::new(1.0, faded(Snap::Half))]
        );
        assert_eq!(
            horizontal_strokes(&surface, y(0.375)),
            vec![Stroke::new(1.0, faded(Snap::Quarter))]
        );
    }

    #[test]
    fn judgement_line_takes_the_color_of_now() {
        let map = Beatmap::with_tempo(120.0);
        let on_beat = draw(&map, 0.5, &BTreeSet::new());
        assert_eq!(judgement_color(&on_beat), Some(Snap::Whole.color()));
        let on_eighth = draw(&map, 0.0625, &BTreeSet::new());
        assert_eq!(judgement_color(&on_eighth), Some(Snap::Eighth.color()));
        let off_grid = draw(&map, 0.3, &BTreeSet::new());
        assert_eq!(judgement_color(&off_grid), Some(MISTIMED_COLOR));
    }

    #[test]
    fn held_lane_spans_from_start_to_now() {
        let map = Beatmap::with_tempo(120.0);
        let held = BTreeMap::from([(Lane::Key(1), 0.25)]);
        let surface = draw_full(&map, 0.75, &held, None);
        let rects: Vec<Rect> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeRect(rect, stroke) if stroke.color == Color32::WHITE => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 1);

        let viewport = viewport();
        let (left, right) = viewport.lane_x_range(Lane::Key(1));
        assert!(rects[0].min.x >= left && rects[0].max.x <= right);
        assert_eq!(rects[0].max.y, viewport.time_to_pos(0.25, 0.75));
        assert_eq!(rects[0].min.y, viewport.time_to_pos(0.75, 0.75));
    }

    #[test]
    fn selection_box_is_drawn_when_present() {
        let map = Beatmap::with_tempo(120.0);
        let held = BTreeMap::new();
        let rect = Rect::from_min_max(Pos2::new(20.0, 300.0), Pos2::new(180.0, 600.0));
        assert!(draw_full(&map, 0.0, &held, None)
            .stroked_with(SELECTION_BOX_COLOR)
            .is_empty());
        let surface = draw_full(&map, 0.0, &held, Some(rect));
        assert_eq!(surface.stroked_with(SELECTION_BOX_COLOR), vec![rect]);
    }

    #[test]
    fn empty_viewport_only_clears() {
        let map = Beatmap::with_tempo(120.0);
        let viewport = Viewport::new(Vec2::ZERO, &EditorOptions::default());
        let held = BTreeMap::new();
        let selection = BTreeSet::new();
        let frame = RenderFrame {
            map: &map,
            grid: SnapGrid::new(map.tempo_map(), Snap::Quarter),
            viewport: &viewport,
            now: 0.0,
            selection: &selection,
            held: &held,
            drag_preview: &[],
            selection_box: None,
            tap_height: 8.0,
        };
        let mut surface = RecordingSurface::new(Vec2::ZERO);
        render(&mut surface, &frame);
        assert_eq!(surface.ops.len(), 1);
    }
}
