//! Interactive chart editing surface.
//!
//! `ChartEditor` owns only transient state (selection, gesture, held lanes).
//! The chart itself belongs to a [`MapStore`]; every edit builds a new
//! `Beatmap` and hands it back wholesale.

pub mod renderer;
pub mod viewport;

use crate::clipboard::{decode_notes, encode_notes, ClipboardBackend};
use crate::config::EditorConfig;
use crate::editor::{canonical_code, EditorEvent, EditorOptions, KeyAction, Keybinds};
use crate::snap::{Snap, SnapGrid};
use crate::store::MapStore;
use crate::structure::{Beatmap, Lane, Note, NoteId, SvPatternId, LANE_COUNT, TIME_EPSILON};
use crate::transport::Transport;
use egui::{Event, Key, Modifiers, Pos2, Rect, Response, Sense, Ui, Vec2};
use renderer::{PainterSurface, RenderFrame, Surface};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use viewport::Viewport;

/// Host collaborators lent to the editor for one call.
pub struct EditorHost<'a> {
    pub store: &'a mut dyn MapStore,
    pub transport: &'a mut dyn Transport,
    pub clipboard: &'a mut dyn ClipboardBackend,
    /// A text-entry widget has keyboard focus: key-downs and shortcuts are ignored.
    pub text_input_focused: bool,
}

#[derive(Clone, Debug)]
struct DragState {
    anchor: NoteId,
    start_time: f64,
    start_column: i32,
    originals: Vec<Note>,
    preview: Vec<Note>,
}

#[derive(Clone, Debug, Default)]
enum Interaction {
    #[default]
    Idle,
    BoxSelecting {
        anchor_x: f32,
        anchor_time: f64,
        current: Pos2,
        additive: bool,
    },
    Dragging(DragState),
}

pub struct ChartEditor {
    map: Arc<Beatmap>,
    note_index: HashMap<NoteId, usize>,
    snap: Snap,
    keybinds: Arc<Keybinds>,
    key_lookup: HashMap<String, KeyAction>,
    held_lanes: BTreeMap<Lane, f64>,
    active_sv_pattern: Option<SvPatternId>,
    selected_notes: BTreeSet<NoteId>,
    interaction: Interaction,
    last_pointer: Pos2,
    options: EditorOptions,
    viewport: Viewport,

    // Integration
    pub pending_events: Vec<EditorEvent>,
    event_listener: Option<Box<dyn FnMut(&EditorEvent)>>,
}

impl Default for ChartEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default(), Arc::new(Keybinds::default()))
    }
}

impl ChartEditor {
    pub fn new(options: EditorOptions, keybinds: Arc<Keybinds>) -> Self {
        let key_lookup = keybinds.reverse_lookup();
        Self {
            map: Arc::new(Beatmap::default()),
            note_index: HashMap::new(),
            snap: options.snap,
            keybinds,
            key_lookup,
            held_lanes: BTreeMap::new(),
            active_sv_pattern: None,
            selected_notes: BTreeSet::new(),
            interaction: Interaction::Idle,
            last_pointer: Pos2::ZERO,
            viewport: Viewport::new(Vec2::ZERO, &options),
            options,
            pending_events: Vec::new(),
            event_listener: None,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.options.clone(), Arc::new(config.keybinds.clone()))
    }

    pub fn apply_options(&mut self, options: EditorOptions) {
        let size = self.viewport.size;
        self.viewport = Viewport::new(size, &options);
        self.snap = options.snap;
        self.options = options;
    }

    pub fn set_event_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.event_listener = Some(Box::new(listener));
    }

    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn map(&self) -> &Arc<Beatmap> {
        &self.map
    }

    pub fn snap(&self) -> Snap {
        self.snap
    }

    pub fn keybinds(&self) -> &Arc<Keybinds> {
        &self.keybinds
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selected_notes(&self) -> &BTreeSet<NoteId> {
        &self.selected_notes
    }

    pub fn held_lanes(&self) -> &BTreeMap<Lane, f64> {
        &self.held_lanes
    }

    pub fn active_sv_pattern(&self) -> Option<SvPatternId> {
        self.active_sv_pattern
    }

    pub fn is_interacting(&self) -> bool {
        !matches!(self.interaction, Interaction::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, Interaction::Dragging(_))
    }

    pub fn is_box_selecting(&self) -> bool {
        matches!(self.interaction, Interaction::BoxSelecting { .. })
    }

    pub fn grid(&self) -> SnapGrid<'_> {
        SnapGrid::new(self.map.tempo_map(), self.snap)
    }

    /// Adopt the store's chart if it changed identity. Returns whether it did.
    pub fn sync_map(&mut self, map: &Arc<Beatmap>) -> bool {
        if Arc::ptr_eq(&self.map, map) {
            return false;
        }
        self.adopt_map(Arc::clone(map));

        let previous = self.selected_notes.clone();
        let index = &self.note_index;
        self.selected_notes.retain(|id| index.contains_key(id));

        let drag_lost = matches!(
            &self.interaction,
            Interaction::Dragging(drag) if drag.originals.iter().any(|n| !self.note_index.contains_key(&n.id))
        );
        if drag_lost {
            log::debug!("chart replaced under an active drag, gesture dropped");
            self.interaction = Interaction::Idle;
        }

        self.emit_event(EditorEvent::MapReplaced);
        self.notify_selection_changed(previous);
        true
    }

    pub fn set_snap(&mut self, snap: Snap) {
        self.snap = snap;
    }

    pub fn set_keybinds(&mut self, keybinds: Arc<Keybinds>) {
        if Arc::ptr_eq(&self.keybinds, &keybinds) {
            return;
        }
        self.key_lookup = keybinds.reverse_lookup();
        self.keybinds = keybinds;
        if !self.held_lanes.is_empty() {
            log::debug!("keybinds changed, dropping {} held lanes", self.held_lanes.len());
            self.held_lanes.clear();
        }
    }

    /// Pattern given to new SV notes.
    pub fn set_active_sv_pattern(&mut self, pattern: Option<SvPatternId>) {
        self.active_sv_pattern = pattern;
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport.size = size;
    }

    fn adopt_map(&mut self, map: Arc<Beatmap>) {
        self.note_index = map.note_index();
        self.map = map;
    }

    fn commit(&mut self, host: &mut EditorHost<'_>, next: Beatmap) {
        let next = Arc::new(next);
        self.adopt_map(Arc::clone(&next));
        host.store.set_map(next);
        self.emit_event(EditorEvent::MapCommitted);
    }

    fn emit_event(&mut self, event: EditorEvent) {
        if let Some(listener) = &mut self.event_listener {
            listener(&event);
        }
        self.pending_events.push(event);
    }

    fn notify_selection_changed(&mut self, previous: BTreeSet<NoteId>) {
        if previous != self.selected_notes {
            self.emit_event(EditorEvent::SelectionChanged(
                self.selected_notes.iter().copied().collect(),
            ));
        }
    }

    fn set_single_selection(&mut self, note_id: NoteId) {
        let prev = self.selected_notes.clone();
        self.selected_notes.clear();
        self.selected_notes.insert(note_id);
        self.notify_selection_changed(prev);
    }

    fn toggle_selection(&mut self, note_id: NoteId) {
        let prev = self.selected_notes.clone();
        if !self.selected_notes.insert(note_id) {
            self.selected_notes.remove(&note_id);
        }
        self.notify_selection_changed(prev);
    }

    pub fn clear_selection(&mut self) {
        let prev = std::mem::take(&mut self.selected_notes);
        self.notify_selection_changed(prev);
    }

    pub fn select_all(&mut self, host: &mut EditorHost<'_>) {
        self.sync_map(&host.store.map());
        let prev = self.selected_notes.clone();
        self.selected_notes = self.map.notes.iter().map(|n| n.id).collect();
        self.notify_selection_changed(prev);
    }

    fn note_by_id(&self, id: NoteId) -> Option<Note> {
        self.note_index
            .get(&id)
            .and_then(|idx| self.map.notes.get(*idx))
            .copied()
    }

    fn selected_notes_snapshot(&self) -> Vec<Note> {
        self.selected_notes
            .iter()
            .filter_map(|id| self.note_by_id(*id))
            .collect()
    }

    /// The note under an editor-local position, nearest vertical center first.
    pub fn hit_test(&self, pos: Pos2, now: f64) -> Option<NoteId> {
        let lane = self.viewport.lane_at(pos.x)?;
        let time = self.viewport.pos_to_time(pos.y, now);
        let tolerance = self
            .viewport
            .pixels_to_seconds(self.options.tap_hit_tolerance);
        let center_distance = |note: &Note| ((note.start_time + note.end_time) / 2.0 - time).abs();
        self.map
            .notes
            .iter()
            .filter(|n| n.lane == lane)
            .filter(|n| {
                if n.is_tap() {
                    (n.start_time - time).abs() <= tolerance
                } else {
                    n.start_time <= time && time <= n.end_time
                }
            })
            .min_by(|a, b| center_distance(a).total_cmp(&center_distance(b)))
            .map(|n| n.id)
    }

    pub fn pointer_down(&mut self, host: &mut EditorHost<'_>, pos: Pos2, modifiers: Modifiers) {
        self.sync_map(&host.store.map());
        self.last_pointer = pos;
        if self.is_interacting() {
            log::debug!("pointer down during an active gesture ignored");
            return;
        }
        if self.viewport.lane_at(pos.x).is_none() {
            log::debug!("pointer down outside the lanes ignored");
            return;
        }

        let now = host.transport.current_time();
        let multi = modifiers.shift || modifiers.command;
        match self.hit_test(pos, now) {
            None => {
                if !multi {
                    self.clear_selection();
                }
                self.interaction = Interaction::BoxSelecting {
                    anchor_x: pos.x,
                    anchor_time: self.viewport.pos_to_time(pos.y, now),
                    current: pos,
                    additive: multi,
                };
            }
            Some(id) => {
                if multi {
                    let was_selected = self.selected_notes.contains(&id);
                    self.toggle_selection(id);
                    if was_selected {
                        return;
                    }
                } else {
                    self.set_single_selection(id);
                }
                self.begin_drag(id, pos, now);
            }
        }
    }

    pub fn pointer_move(&mut self, host: &mut EditorHost<'_>, pos: Pos2) {
        let now = host.transport.current_time();
        self.track_pointer(pos, now);
    }

    /// Resolves the current gesture. Release is the only way a gesture ends.
    pub fn pointer_up(&mut self, host: &mut EditorHost<'_>, pos: Pos2) {
        self.sync_map(&host.store.map());
        let now = host.transport.current_time();
        self.track_pointer(pos, now);

        match std::mem::take(&mut self.interaction) {
            Interaction::Idle => {}
            Interaction::BoxSelecting {
                anchor_x,
                anchor_time,
                current,
                additive,
            } => {
                let anchor = Pos2::new(anchor_x, self.viewport.time_to_pos(anchor_time, now));
                let extent = current - anchor;
                if extent.x.abs().max(extent.y.abs()) <= self.options.box_select_threshold {
                    log::debug!("box gesture below threshold, treated as a click");
                    return;
                }
                self.select_in_rect(Rect::from_two_pos(anchor, current), now, additive);
            }
            Interaction::Dragging(drag) => self.finish_drag(host, drag),
        }
    }

    fn track_pointer(&mut self, pos: Pos2, now: f64) {
        self.last_pointer = pos;
        if let Interaction::BoxSelecting { current, .. } = &mut self.interaction {
            *current = pos;
        } else if self.is_dragging() {
            self.update_drag(pos, now);
        }
    }

    fn begin_drag(&mut self, anchor: NoteId, pos: Pos2, now: f64) {
        let originals = self.selected_notes_snapshot();
        if originals.is_empty() {
            return;
        }
        self.interaction = Interaction::Dragging(DragState {
            anchor,
            start_time: self.viewport.pos_to_time(pos.y, now),
            start_column: self.viewport.column_at(pos.x),
            preview: originals.clone(),
            originals,
        });
    }

    fn update_drag(&mut self, pos: Pos2, now: f64) {
        let grid = SnapGrid::new(self.map.tempo_map(), self.snap);
        let time = self.viewport.pos_to_time(pos.y, now);
        let column = self.viewport.column_at(pos.x);
        let Interaction::Dragging(drag) = &mut self.interaction else {
            return;
        };

        let (lane_min, lane_max) = numeric_lane_span(&drag.originals);
        let lane_delta = (column - drag.start_column)
            .clamp(-(lane_min as i32), (LANE_COUNT - 1 - lane_max) as i32);
        let raw_delta = time - drag.start_time;
        if raw_delta.abs() < TIME_EPSILON && lane_delta == 0 {
            drag.preview = drag.originals.clone();
            return;
        }

        let Some(anchor) = drag.originals.iter().find(|n| n.id == drag.anchor) else {
            return;
        };
        let shifted = anchor.start_time + raw_delta;
        let snapped = grid.nearest(shifted).unwrap_or(shifted);
        let earliest = drag
            .originals
            .iter()
            .map(|n| n.start_time)
            .fold(f64::INFINITY, f64::min);
        let delta = (snapped - anchor.start_time).max(-earliest);

        drag.preview = drag
            .originals
            .iter()
            .map(|n| {
                let mut moved = n.shifted(delta);
                moved.lane = n.lane.shifted(lane_delta);
                moved
            })
            .collect();
    }

    fn finish_drag(&mut self, host: &mut EditorHost<'_>, drag: DragState) {
        if drag.preview == drag.originals {
            log::debug!("drag released without movement");
            return;
        }
        let mut next = (*self.map).clone();
        let mut moved = Vec::with_capacity(drag.preview.len());
        for note in &drag.preview {
            if let Some(&idx) = self.note_index.get(&note.id) {
                next.notes[idx] = *note;
                moved.push(note.id);
            }
        }
        if moved.is_empty() {
            return;
        }
        next.sort_notes();

        let previous = self.selected_notes.clone();
        self.selected_notes = moved.iter().copied().collect();
        self.commit(host, next);
        self.emit_event(EditorEvent::NotesMoved(moved));
        self.notify_selection_changed(previous);
    }

    fn select_in_rect(&mut self, rect: Rect, now: f64, additive: bool) {
        let half_tap = self.options.tap_height / 2.0;
        let hits: BTreeSet<NoteId> = self
            .map
            .notes
            .iter()
            .filter(|n| {
                let (left, right) = self.viewport.lane_x_range(n.lane);
                let start_y = self.viewport.time_to_pos(n.start_time, now);
                let (top, bottom) = if n.is_tap() {
                    (start_y - half_tap, start_y + half_tap)
                } else {
                    (self.viewport.time_to_pos(n.end_time, now), start_y)
                };
                left < rect.max.x && right > rect.min.x && top <= rect.max.y && bottom >= rect.min.y
            })
            .map(|n| n.id)
            .collect();

        let previous = self.selected_notes.clone();
        if additive {
            self.selected_notes.extend(hits);
        } else {
            self.selected_notes = hits;
        }
        self.notify_selection_changed(previous);
    }

    /// Handles a key press by code. Returns whether the code is bound.
    pub fn key_down(&mut self, host: &mut EditorHost<'_>, code: &str, repeat: bool) -> bool {
        if host.text_input_focused {
            return false;
        }
        let Some(action) = self.key_lookup.get(&canonical_code(code)).copied() else {
            return false;
        };
        self.sync_map(&host.store.map());
        match action {
            KeyAction::Place(_) if repeat => {}
            KeyAction::Place(lane) => self.begin_placement(host, lane),
            KeyAction::DeleteSelection => self.delete_selection(host),
            KeyAction::FlipHorizontal => self.flip_selection(host),
            KeyAction::SeekForward => self.seek_next(host),
            KeyAction::SeekBackward => self.seek_previous(host),
        }
        true
    }

    /// Handles a key release. Honoured even while a text widget has focus.
    pub fn key_up(&mut self, host: &mut EditorHost<'_>, code: &str) -> bool {
        let Some(KeyAction::Place(lane)) = self.key_lookup.get(&canonical_code(code)).copied() else {
            return false;
        };
        let Some(start) = self.held_lanes.remove(&lane) else {
            return false;
        };
        self.sync_map(&host.store.map());
        let now = host.transport.current_time();
        let end = self.grid().nearest(now).unwrap_or(start);
        self.place_note(host, lane, start, end);
        true
    }

    fn begin_placement(&mut self, host: &mut EditorHost<'_>, lane: Lane) {
        if self.held_lanes.contains_key(&lane) {
            return;
        }
        let now = host.transport.current_time();
        match self.grid().nearest(now) {
            Some(start) => {
                self.held_lanes.insert(lane, start);
            }
            None => log::info!("no tempo segment near {now:.3}s, placement ignored"),
        }
    }

    fn place_note(&mut self, host: &mut EditorHost<'_>, lane: Lane, start: f64, end: f64) {
        let mut next = (*self.map).clone();

        if let Some(existing) = self.map.note_at(start, lane).map(|n| n.id) {
            next.notes.retain(|n| n.id != existing);
            let previous = self.selected_notes.clone();
            self.selected_notes.remove(&existing);
            self.commit(host, next);
            self.emit_event(EditorEvent::NotesRemoved(vec![existing]));
            self.notify_selection_changed(previous);
            return;
        }

        let (from, mut to) = if end < start { (end, start) } else { (start, end) };
        if lane.is_sv() && to - from < TIME_EPSILON {
            to = self.grid().next_after(from).unwrap_or(to);
        }
        let pattern = if lane.is_sv() {
            self.active_sv_pattern
                .filter(|id| self.map.sv_patterns.contains_key(id))
        } else {
            None
        };
        let note = Note::new(from, to, lane).with_pattern(pattern);
        next.notes.push(note);
        next.sort_notes();
        self.commit(host, next);
        self.emit_event(EditorEvent::NotesAdded(vec![note.id]));
    }

    pub fn delete_selection(&mut self, host: &mut EditorHost<'_>) {
        self.sync_map(&host.store.map());
        let ids: Vec<NoteId> = self
            .selected_notes
            .iter()
            .copied()
            .filter(|id| self.note_index.contains_key(id))
            .collect();
        if ids.is_empty() {
            return;
        }
        let doomed: BTreeSet<NoteId> = ids.iter().copied().collect();
        let mut next = (*self.map).clone();
        next.notes.retain(|n| !doomed.contains(&n.id));

        let previous = std::mem::take(&mut self.selected_notes);
        self.commit(host, next);
        log::info!("deleted {} notes", ids.len());
        self.emit_event(EditorEvent::NotesRemoved(ids));
        self.notify_selection_changed(previous);
    }

    /// Mirror selected notes across the playfield (`lane -> 3 - lane`). SV notes stay put.
    pub fn flip_selection(&mut self, host: &mut EditorHost<'_>) {
        self.sync_map(&host.store.map());
        let mut next = (*self.map).clone();
        let mut moved = Vec::new();
        for note in next
            .notes
            .iter_mut()
            .filter(|n| self.selected_notes.contains(&n.id))
        {
            let mirrored = note.lane.mirrored();
            if mirrored != note.lane {
                note.lane = mirrored;
                moved.push(note.id);
            }
        }
        if moved.is_empty() {
            return;
        }
        self.commit(host, next);
        self.emit_event(EditorEvent::NotesMoved(moved));
    }

    /// Copies the selection to the clipboard. Returns whether anything was copied.
    pub fn copy_selection(&mut self, host: &mut EditorHost<'_>) -> bool {
        self.sync_map(&host.store.map());
        let notes = self.selected_notes_snapshot();
        if notes.is_empty() {
            log::debug!("nothing selected to copy");
            return false;
        }
        let text = match encode_notes(&notes) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("could not encode selection: {err}");
                return false;
            }
        };
        if let Err(err) = host.clipboard.set_text(&text) {
            log::warn!("copy failed: {err}");
            return false;
        }
        self.emit_event(EditorEvent::Copied { count: notes.len() });
        true
    }

    pub fn cut_selection(&mut self, host: &mut EditorHost<'_>) {
        if self.copy_selection(host) {
            self.delete_selection(host);
        }
    }

    pub fn paste(&mut self, host: &mut EditorHost<'_>) -> Vec<NoteId> {
        match host.clipboard.get_text() {
            Ok(text) => self.paste_text(host, &text),
            Err(err) => {
                log::warn!("paste failed: {err}");
                Vec::new()
            }
        }
    }

    /// Inserts clipboard records anchored at the grid point nearest "now" and
    /// selects them.
    pub fn paste_text(&mut self, host: &mut EditorHost<'_>, text: &str) -> Vec<NoteId> {
        self.sync_map(&host.store.map());
        let records = match decode_notes(text, &self.map) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("paste failed: {err}");
                return Vec::new();
            }
        };
        if records.is_empty() {
            log::debug!("clipboard holds no usable notes");
            return Vec::new();
        }
        let now = host.transport.current_time();
        let Some(anchor) = self.grid().nearest(now) else {
            log::info!("no tempo segment near {now:.3}s, paste ignored");
            return Vec::new();
        };

        let notes: Vec<Note> = records
            .iter()
            .map(|r| {
                Note::new(anchor + r.start_time, anchor + r.end_time, r.lane)
                    .with_pattern(r.sv_pattern.filter(|_| r.lane.is_sv()))
            })
            .collect();
        let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
        let mut next = (*self.map).clone();
        next.notes.extend(notes);
        next.sort_notes();

        let previous = self.selected_notes.clone();
        self.selected_notes = ids.iter().copied().collect();
        self.commit(host, next);
        log::info!("pasted {} notes at {anchor:.3}s", ids.len());
        self.emit_event(EditorEvent::Pasted(ids.clone()));
        self.notify_selection_changed(previous);
        ids
    }

    pub fn undo(&mut self, host: &mut EditorHost<'_>) -> bool {
        if host.store.undo() {
            self.sync_map(&host.store.map());
            return true;
        }
        false
    }

    pub fn redo(&mut self, host: &mut EditorHost<'_>) -> bool {
        if host.store.redo() {
            self.sync_map(&host.store.map());
            return true;
        }
        false
    }

    pub fn seek_next(&mut self, host: &mut EditorHost<'_>) {
        let now = host.transport.current_time();
        match self.grid().next_after(now) {
            Some(time) => self.seek_to(host, time),
            None => log::debug!("no grid point after {now:.3}s"),
        }
    }

    pub fn seek_previous(&mut self, host: &mut EditorHost<'_>) {
        let now = host.transport.current_time();
        match self.grid().previous_before(now) {
            Some(time) => self.seek_to(host, time),
            None => log::debug!("no grid point before {now:.3}s"),
        }
    }

    fn seek_to(&mut self, host: &mut EditorHost<'_>, time: f64) {
        host.transport.seek(time);
        self.emit_event(EditorEvent::Seeked { time });
    }

    pub fn render(&self, surface: &mut dyn Surface, now: f64) {
        let drag_preview: &[Note] = match &self.interaction {
            Interaction::Dragging(drag) => &drag.preview,
            _ => &[],
        };
        let selection_box = match &self.interaction {
            Interaction::BoxSelecting {
                anchor_x,
                anchor_time,
                current,
                ..
            } => Some(Rect::from_two_pos(
                Pos2::new(*anchor_x, self.viewport.time_to_pos(*anchor_time, now)),
                *current,
            )),
            _ => None,
        };
        let frame = RenderFrame {
            map: &self.map,
            grid: self.grid(),
            viewport: &self.viewport,
            now,
            selection: &self.selected_notes,
            held: &self.held_lanes,
            drag_preview,
            selection_box,
            tap_height: self.options.tap_height,
        };
        renderer::render(surface, &frame);
    }

    /// Runs one frame: sync, input, drawing. Requests continuous repaint.
    pub fn ui(
        &mut self,
        ui: &mut Ui,
        store: &mut dyn MapStore,
        transport: &mut dyn Transport,
        clipboard: &mut dyn ClipboardBackend,
    ) -> Response {
        let mut host = EditorHost {
            store,
            transport,
            clipboard,
            text_input_focused: ui.ctx().wants_keyboard_input(),
        };
        self.sync_map(&host.store.map());

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.set_viewport_size(rect.size());
        let to_local = |p: Pos2| (p - rect.min).to_pos2();

        let (pressed, down, modifiers, pointer, scroll) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.modifiers,
                i.pointer.interact_pos(),
                i.raw_scroll_delta.y,
            )
        });
        if pressed && response.hovered() {
            if let Some(p) = pointer {
                self.pointer_down(&mut host, to_local(p), modifiers);
            }
        } else if self.is_interacting() {
            let pos = pointer.map(to_local).unwrap_or(self.last_pointer);
            if down {
                self.pointer_move(&mut host, pos);
            } else {
                self.pointer_up(&mut host, pos);
            }
        }

        if response.hovered() && !host.text_input_focused {
            if scroll > 0.0 {
                self.seek_next(&mut host);
            } else if scroll < 0.0 {
                self.seek_previous(&mut host);
            }
        }

        let events = ui.input(|i| i.events.clone());
        for event in events {
            match event {
                Event::Copy if !host.text_input_focused => {
                    self.copy_selection(&mut host);
                }
                Event::Cut if !host.text_input_focused => self.cut_selection(&mut host),
                Event::Paste(_) if !host.text_input_focused => {
                    self.paste(&mut host);
                }
                Event::Key {
                    key,
                    pressed,
                    repeat,
                    modifiers,
                    ..
                } => self.handle_key(&mut host, key, pressed, repeat, modifiers),
                _ => {}
            }
        }

        let now = host.transport.current_time();
        let mut surface = PainterSurface::new(ui.painter_at(rect), rect, ui.ctx().pixels_per_point());
        self.render(&mut surface, now);
        ui.ctx().request_repaint();
        response
    }

    fn handle_key(&mut self, host: &mut EditorHost<'_>, key: Key, pressed: bool, repeat: bool, modifiers: Modifiers) {
        if !pressed {
            self.key_up(host, key.name());
            return;
        }
        if !modifiers.command {
            self.key_down(host, key.name(), repeat);
            return;
        }
        if repeat || host.text_input_focused {
            return;
        }
        match key {
            Key::Z if modifiers.shift => {
                self.redo(host);
            }
            Key::Z => {
                self.undo(host);
            }
            Key::Y => {
                self.redo(host);
            }
            Key::A => self.select_all(host),
            _ => {}
        }
    }
}

/// Lowest and highest playable lane among `notes`; `(0, 0)` when none are playable.
fn numeric_lane_span(notes: &[Note]) -> (u8, u8) {
    let keys: Vec<u8> = notes.iter().filter_map(|n| n.lane.key()).collect();
    let min = keys.iter().copied().min().unwrap_or(0);
    let max = keys.iter().copied().max().unwrap_or(0);
    (min, max)
}
