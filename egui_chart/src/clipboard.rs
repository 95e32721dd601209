//! Clipboard backends and the note clipboard payload.
//!
//! Notes travel as a JSON list of records whose times are relative to the
//! earliest copied note, so a paste can re-anchor them anywhere.

use crate::structure::{Beatmap, Lane, Note, SvPatternId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard is empty")]
    Empty,
    #[error("clipboard text is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("clipboard JSON is not a list of notes")]
    NotAList,
}

pub trait ClipboardBackend {
    fn get_text(&mut self) -> Result<String, ClipboardError>;
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("clipboard not initialised".to_string()))
    }
}

impl ClipboardBackend for SystemClipboard {
    fn get_text(&mut self) -> Result<String, ClipboardError> {
        match self.handle()?.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::Empty),
            Err(err) => Err(ClipboardError::Unavailable(err.to_string())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.handle()?
            .set_text(text.to_owned())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// Process-local clipboard, for tests and headless hosts.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn get_text(&mut self) -> Result<String, ClipboardError> {
        self.text.clone().ok_or(ClipboardError::Empty)
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.text = Some(text.to_owned());
        Ok(())
    }
}

/// One copied note, times relative to the earliest copied start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardNote {
    pub start_time: f64,
    pub end_time: f64,
    pub lane: Lane,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sv_pattern: Option<SvPatternId>,
}

pub fn encode_notes<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Result<String, ClipboardError> {
    let mut notes: Vec<&Note> = notes.into_iter().collect();
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let origin = notes.first().map(|n| n.start_time).unwrap_or(0.0);
    let records: Vec<ClipboardNote> = notes
        .iter()
        .map(|n| ClipboardNote {
            start_time: n.start_time - origin,
            end_time: n.end_time - origin,
            lane: n.lane,
            sv_pattern: n.sv_pattern,
        })
        .collect();
    Ok(serde_json::to_string(&records)?)
}

/// Parses clipboard text into relative records.
///
/// The text must be a JSON list; individual malformed entries are skipped with
/// a warning. Pattern references missing from `map` are dropped.
pub fn decode_notes(text: &str, map: &Beatmap) -> Result<Vec<ClipboardNote>, ClipboardError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ClipboardError::NotAList);
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let mut record: ClipboardNote = match serde_json::from_value(item) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("skipping clipboard entry {idx}: {err}");
                continue;
            }
        };
        if !record.start_time.is_finite() || !record.end_time.is_finite() {
            log::warn!("skipping clipboard entry {idx}: non-finite time");
            continue;
        }
        if record.end_time < record.start_time {
            log::warn!("skipping clipboard entry {idx}: ends before it starts");
            continue;
        }
        if let Some(pattern) = record.sv_pattern {
            if !map.sv_patterns.contains_key(&pattern) {
                log::warn!("clipboard entry {idx} references missing SV pattern {}", pattern.0);
                record.sv_pattern = None;
            }
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv::SvPattern;
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_is_relative_to_earliest_note() {
        let notes = vec![
            Note::new(3.0, 3.5, Lane::Key(1)),
            Note::tap(2.0, Lane::Key(0)),
        ];
        let text = encode_notes(&notes).unwrap();
        let records = decode_notes(&text, &Beatmap::new()).unwrap();
        assert_eq!(
            records,
            vec![
                ClipboardNote {
                    start_time: 0.0,
                    end_time: 0.0,
                    lane: Lane::Key(0),
                    sv_pattern: None
                },
                ClipboardNote {
                    start_time: 1.0,
                    end_time: 1.5,
                    lane: Lane::Key(1),
                    sv_pattern: None
                },
            ]
        );
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let text = r#"[
            {"startTime": 0.0, "endTime": 0.0, "lane": 2},
            {"startTime": 1.0, "endTime": 0.5, "lane": 1},
            {"startTime": 0.0, "endTime": 0.0, "lane": 7},
            {"startTime": "soon", "endTime": 0.0, "lane": 0},
            {"startTime": 0.5, "endTime": 1.0, "lane": "sv"}
        ]"#;
        let records = decode_notes(text, &Beatmap::new()).unwrap();
        let lanes: Vec<Lane> = records.iter().map(|r| r.lane).collect();
        assert_eq!(lanes, vec![Lane::Key(2), Lane::Sv]);
    }

    #[test]
    fn unknown_pattern_reference_is_dropped() {
        let (map, id) = Beatmap::new().add_sv_pattern(SvPattern::linear());
        let text = format!(
            r#"[{{"startTime": 0.0, "endTime": 1.0, "lane": "sv", "svPattern": {}}},
                {{"startTime": 0.0, "endTime": 1.0, "lane": "sv", "svPattern": 99}}]"#,
            id.0
        );
        let records = decode_notes(&text, &map).unwrap();
        assert_eq!(records[0].sv_pattern, Some(id));
        assert_eq!(records[1].sv_pattern, None);
    }

    #[test]
    fn non_list_payloads_are_errors() {
        assert!(matches!(
            decode_notes("{\"startTime\": 0}", &Beatmap::new()),
            Err(ClipboardError::NotAList)
        ));
        assert!(matches!(
            decode_notes("hello", &Beatmap::new()),
            Err(ClipboardError::Json(_))
        ));
    }

    #[test]
    fn memory_clipboard_starts_empty() {
        let mut clipboard = MemoryClipboard::new();
        assert!(matches!(clipboard.get_text(), Err(ClipboardError::Empty)));
        clipboard.set_text("[]").unwrap();
        assert_eq!(clipboard.get_text().unwrap(), "[]");
    }
}
