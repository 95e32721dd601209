//! # egui_chart
//!
//! Editing core for 4-lane rhythm charts, packaged as an egui component.
//!
//! ## Features
//!
//! - **Tempo map**: time <-> beat conversion across tempo segments, lazy grid iteration
//! - **Snap grid**: subdivision classification and next/previous/nearest lookups
//! - **SV curves**: two-segment velocity patterns for `sv` notes
//! - **Editing surface**: hit testing, box select, group drag, keyboard placement,
//!   copy/paste, flip and per-frame rendering
//!
//! ## Basic usage
//!
//! ```no_run
//! use egui_chart::{ChartEditor, ClockTransport, HistoryStore, SystemClipboard};
//!
//! # fn demo(ui: &mut egui::Ui) {
//! let mut editor = ChartEditor::default();
//! let mut store = HistoryStore::default();
//! let mut transport = ClockTransport::new();
//! let mut clipboard = SystemClipboard::new();
//!
//! editor.ui(ui, &mut store, &mut transport, &mut clipboard);
//! for event in editor.take_events() {
//!     log::debug!("{event:?}");
//! }
//! # }
//! ```

pub mod clipboard;
pub mod config;
pub mod editor;
pub mod snap;
pub mod store;
pub mod structure;
pub mod sv;
pub mod tempo;
pub mod transport;
pub mod ui;
pub mod utils;

pub use clipboard::{ClipboardBackend, ClipboardError, MemoryClipboard, SystemClipboard};
pub use config::{ConfigError, EditorConfig};
pub use editor::{EditorEvent, EditorOptions, KeyAction, Keybinds};
pub use snap::{Snap, SnapGrid};
pub use store::{HistoryStore, MapStore};
pub use structure::{Beatmap, BeatmapMetadata, Lane, Note, NoteId, SvPatternId, TempoSegment, TempoSegmentId};
pub use sv::{sv_ratios, sv_regions, SvCurve, SvPattern, SvRegion};
pub use tempo::TempoMap;
pub use transport::{ClockTransport, Transport};
pub use ui::renderer::{PainterSurface, Surface};
pub use ui::{ChartEditor, EditorHost};
