use crate::snap::Snap;
use crate::structure::{Lane, NoteId, LANE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Edit events the host can listen to.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// The editor handed a new chart to the map store.
    MapCommitted,
    /// The store's chart was replaced from outside the editor.
    MapReplaced,
    NotesAdded(Vec<NoteId>),
    NotesRemoved(Vec<NoteId>),
    NotesMoved(Vec<NoteId>),
    SelectionChanged(Vec<NoteId>),
    Copied { count: usize },
    Pasted(Vec<NoteId>),
    Seeked { time: f64 },
}

/// Something a bound key does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Place(Lane),
    DeleteSelection,
    FlipHorizontal,
    SeekForward,
    SeekBackward,
}

/// Logical actions mapped to key codes (egui key names such as `"D"` or `"Space"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Keybinds {
    pub lanes: [Vec<String>; LANE_COUNT as usize],
    pub sv: Vec<String>,
    pub delete_selection: Vec<String>,
    pub flip_horizontal: Vec<String>,
    pub seek_forward: Vec<String>,
    pub seek_backward: Vec<String>,
}

impl Default for Keybinds {
    fn default() -> Self {
        let keys = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            lanes: [keys(&["D"]), keys(&["F"]), keys(&["J"]), keys(&["K"])],
            sv: keys(&["Space"]),
            delete_selection: keys(&["Delete", "Backspace"]),
            flip_horizontal: keys(&["H"]),
            seek_forward: keys(&["ArrowUp"]),
            seek_backward: keys(&["ArrowDown"]),
        }
    }
}

impl Keybinds {
    /// Code -> action lookup. When a code is bound twice the first binding wins.
    ///
    /// Codes egui knows are stored under `Key::name()`, so `"ArrowUp"` and `"Up"`
    /// resolve to the same key.
    pub fn reverse_lookup(&self) -> HashMap<String, KeyAction> {
        let mut lookup = HashMap::new();
        let mut bind = |codes: &[String], action: KeyAction| {
            for code in codes {
                lookup.entry(canonical_code(code)).or_insert(action);
            }
        };
        for (lane, codes) in Lane::KEYS.iter().zip(self.lanes.iter()) {
            bind(codes, KeyAction::Place(*lane));
        }
        bind(&self.sv, KeyAction::Place(Lane::Sv));
        bind(&self.delete_selection, KeyAction::DeleteSelection);
        bind(&self.flip_horizontal, KeyAction::FlipHorizontal);
        bind(&self.seek_forward, KeyAction::SeekForward);
        bind(&self.seek_backward, KeyAction::SeekBackward);
        lookup
    }
}

pub fn canonical_code(code: &str) -> String {
    egui::Key::from_name(code)
        .map(|key| key.name().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// View and interaction settings, loadable from the editor config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Seconds visible below the judgement line.
    pub lookbehind: f64,
    /// Seconds visible above the judgement line.
    pub lookahead: f64,
    pub sv_strip_width: f32,
    pub snap: Snap,
    /// Half-height in pixels of the band in which a tap note can be grabbed.
    pub tap_hit_tolerance: f32,
    /// Drawn height of a tap note, also its box-selection hitbox.
    pub tap_height: f32,
    /// Box gestures shorter than this (pixels) count as a click.
    pub box_select_threshold: f32,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            lookbehind: 0.1,
            lookahead: 1.0,
            sv_strip_width: 48.0,
            snap: Snap::Quarter,
            tap_hit_tolerance: 8.0,
            tap_height: 8.0,
            box_select_threshold: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_lookup_covers_every_action() {
        let lookup = Keybinds::default().reverse_lookup();
        assert_eq!(lookup.get("D"), Some(&KeyAction::Place(Lane::Key(0))));
        assert_eq!(lookup.get("K"), Some(&KeyAction::Place(Lane::Key(3))));
        assert_eq!(lookup.get("Space"), Some(&KeyAction::Place(Lane::Sv)));
        assert_eq!(lookup.get("Backspace"), Some(&KeyAction::DeleteSelection));
        assert_eq!(lookup.get("H"), Some(&KeyAction::FlipHorizontal));
        assert_eq!(lookup.get("Q"), None);
    }

    #[test]
    fn arrow_aliases_share_a_code() {
        let lookup = Keybinds::default().reverse_lookup();
        let up = egui::Key::ArrowUp.name();
        assert_eq!(lookup.get(up), Some(&KeyAction::SeekForward));
        assert_eq!(canonical_code("ArrowDown"), egui::Key::ArrowDown.name());
    }

    #[test]
    fn lane_may_have_several_codes() {
        let mut binds = Keybinds::default();
        binds.lanes[1].push("S".to_string());
        let lookup = binds.reverse_lookup();
        assert_eq!(lookup.get("S"), Some(&KeyAction::Place(Lane::Key(1))));
        assert_eq!(lookup.get("F"), Some(&KeyAction::Place(Lane::Key(1))));
    }

    #[test]
    fn first_binding_wins() {
        let mut binds = Keybinds::default();
        binds.flip_horizontal = vec!["D".to_string()];
        assert_eq!(
            binds.reverse_lookup().get("D"),
            Some(&KeyAction::Place(Lane::Key(0)))
        );
    }

    #[test]
    fn partial_keybinds_json_keeps_defaults() {
        let binds: Keybinds = serde_json::from_str(r#"{"sv": ["L"]}"#).unwrap();
        assert_eq!(binds.sv, vec!["L".to_string()]);
        assert_eq!(binds.lanes, Keybinds::default().lanes);
    }

    #[test]
    fn options_json_uses_snap_division() {
        let options: EditorOptions = serde_json::from_str(r#"{"snap": 8, "lookahead": 2.0}"#).unwrap();
        assert_eq!(options.snap, Snap::Eighth);
        assert_eq!(options.lookahead, 2.0);
        assert_eq!(options.lookbehind, 0.1);
    }
}
