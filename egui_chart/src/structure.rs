//! Data model module
//!
//! Charts, tempo segments, notes and SV patterns. A `Beatmap` is treated as an
//! immutable value by the editor: every edit builds a new one.

use crate::sv::SvPattern;
use crate::tempo::TempoMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of playable lanes.
pub const LANE_COUNT: u8 = 4;

/// Serialized tag of the SV lane.
pub const SV_LANE_TAG: &str = "sv";

/// Two note times closer than this are the same instant.
pub const TIME_EPSILON: f64 = 1e-6;

static NOTE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
static TEMPO_SEGMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub u64);

impl NoteId {
    pub fn next() -> Self {
        NoteId(NOTE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempoSegmentId(pub u64);

impl TempoSegmentId {
    pub fn next() -> Self {
        TempoSegmentId(TEMPO_SEGMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SvPatternId(pub u64);

/// A run of constant BPM starting at `start_time` (seconds).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoSegment {
    #[serde(default = "TempoSegmentId::next")]
    pub id: TempoSegmentId,
    pub start_time: f64,
    pub bpm: f64,
}

impl TempoSegment {
    pub fn new(start_time: f64, bpm: f64) -> Self {
        Self {
            id: TempoSegmentId::next(),
            start_time,
            bpm,
        }
    }
}

/// The track a note lives on: one of the playable lanes or the SV strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Key(u8),
    Sv,
}

impl Lane {
    pub const KEYS: [Lane; LANE_COUNT as usize] = [Lane::Key(0), Lane::Key(1), Lane::Key(2), Lane::Key(3)];

    pub fn key(self) -> Option<u8> {
        match self {
            Lane::Key(index) => Some(index),
            Lane::Sv => None,
        }
    }

    pub fn is_sv(self) -> bool {
        matches!(self, Lane::Sv)
    }

    /// Mirror a playable lane (`0 <-> 3`, `1 <-> 2`). The SV lane has no mirror.
    pub fn mirrored(self) -> Lane {
        match self {
            Lane::Key(index) => Lane::Key(LANE_COUNT - 1 - index.min(LANE_COUNT - 1)),
            Lane::Sv => Lane::Sv,
        }
    }

    /// Shift a playable lane, clamped to the lane range.
    pub fn shifted(self, delta: i32) -> Lane {
        match self {
            Lane::Key(index) => Lane::Key((index as i32 + delta).clamp(0, LANE_COUNT as i32 - 1) as u8),
            Lane::Sv => Lane::Sv,
        }
    }
}

impl Serialize for Lane {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Lane::Key(index) => serializer.serialize_u8(*index),
            Lane::Sv => serializer.serialize_str(SV_LANE_TAG),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaneRepr {
    Index(i64),
    Tag(String),
}

impl<'de> Deserialize<'de> for Lane {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match LaneRepr::deserialize(deserializer)? {
            LaneRepr::Index(index) if (0..LANE_COUNT as i64).contains(&index) => Ok(Lane::Key(index as u8)),
            LaneRepr::Index(index) => Err(D::Error::custom(format!("lane {index} out of range"))),
            LaneRepr::Tag(tag) if tag == SV_LANE_TAG => Ok(Lane::Sv),
            LaneRepr::Tag(tag) => Err(D::Error::custom(format!("unknown lane tag {tag:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(skip, default = "NoteId::next")]
    pub id: NoteId,
    pub start_time: f64, // seconds
    pub end_time: f64,   // seconds, equal to start_time for taps
    pub lane: Lane,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sv_pattern: Option<SvPatternId>,
}

impl Note {
    pub fn new(start_time: f64, end_time: f64, lane: Lane) -> Self {
        Self::with_id(NoteId::next(), start_time, end_time, lane)
    }

    pub fn with_id(id: NoteId, start_time: f64, end_time: f64, lane: Lane) -> Self {
        Self {
            id,
            start_time,
            end_time,
            lane,
            sv_pattern: None,
        }
    }

    pub fn tap(time: f64, lane: Lane) -> Self {
        Self::new(time, time, lane)
    }

    pub fn with_pattern(mut self, pattern: Option<SvPatternId>) -> Self {
        self.sv_pattern = pattern;
        self
    }

    pub fn is_tap(&self) -> bool {
        self.end_time <= self.start_time
    }

    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Copy of this note moved by `delta` seconds, keeping its id.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            start_time: self.start_time + delta,
            end_time: self.end_time + delta,
            ..*self
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BeatmapMetadata {
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub version: String,
    pub audio_file: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Beatmap {
    pub metadata: BeatmapMetadata,
    #[serde(deserialize_with = "deserialize_tempo_segments")]
    pub tempo_segments: Vec<TempoSegment>,
    pub notes: Vec<Note>,
    pub sv_patterns: BTreeMap<SvPatternId, SvPattern>,
}

impl Beatmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tempo(bpm: f64) -> Self {
        Self {
            tempo_segments: vec![TempoSegment::new(0.0, bpm)],
            ..Self::default()
        }
    }

    pub fn tempo_map(&self) -> TempoMap<'_> {
        TempoMap::new(&self.tempo_segments)
    }

    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Sort segments by start time; of two segments sharing a start the later one wins.
    pub fn sort_tempo_segments(&mut self) {
        normalize_tempo_segments(&mut self.tempo_segments);
    }

    pub fn note_index(&self) -> HashMap<NoteId, usize> {
        self.notes
            .iter()
            .enumerate()
            .map(|(idx, note)| (note.id, idx))
            .collect()
    }

    pub fn note_at(&self, start_time: f64, lane: Lane) -> Option<&Note> {
        self.notes
            .iter()
            .find(|n| n.lane == lane && (n.start_time - start_time).abs() < TIME_EPSILON)
    }

    /// Copy of the chart with `segment` inserted (replacing a segment on the same start).
    pub fn with_tempo_segment(&self, segment: TempoSegment) -> Self {
        let mut next = self.clone();
        next.tempo_segments.push(segment);
        next.sort_tempo_segments();
        next
    }

    pub fn set_segment_start(&self, id: TempoSegmentId, start_time: f64) -> Self {
        let mut next = self.clone();
        if let Some(segment) = next.tempo_segments.iter_mut().find(|s| s.id == id) {
            segment.start_time = start_time;
        }
        next.sort_tempo_segments();
        next
    }

    pub fn set_segment_bpm(&self, id: TempoSegmentId, bpm: f64) -> Self {
        let mut next = self.clone();
        if let Some(segment) = next.tempo_segments.iter_mut().find(|s| s.id == id) {
            segment.bpm = bpm;
        }
        next
    }

    pub fn remove_tempo_segment(&self, id: TempoSegmentId) -> Self {
        let mut next = self.clone();
        next.tempo_segments.retain(|s| s.id != id);
        next
    }

    /// Copy of the chart with a new pattern stored under the next free id.
    pub fn add_sv_pattern(&self, pattern: SvPattern) -> (Self, SvPatternId) {
        let id = self
            .sv_patterns
            .keys()
            .next_back()
            .map(|last| SvPatternId(last.0 + 1))
            .unwrap_or(SvPatternId(1));
        let mut next = self.clone();
        next.sv_patterns.insert(id, pattern);
        (next, id)
    }

    pub fn set_sv_pattern(&self, id: SvPatternId, pattern: SvPattern) -> Self {
        let mut next = self.clone();
        next.sv_patterns.insert(id, pattern);
        next
    }

    /// Removes the pattern unconditionally; callers check `pattern_usage` first.
    pub fn remove_sv_pattern(&self, id: SvPatternId) -> Self {
        let mut next = self.clone();
        next.sv_patterns.remove(&id);
        next
    }

    pub fn pattern_usage(&self, id: SvPatternId) -> usize {
        self.notes
            .iter()
            .filter(|n| n.sv_pattern == Some(id))
            .count()
    }
}

fn normalize_tempo_segments(segments: &mut Vec<TempoSegment>) {
    segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let mut deduped: Vec<TempoSegment> = Vec::with_capacity(segments.len());
    for segment in segments.drain(..) {
        match deduped.last_mut() {
            Some(last) if (last.start_time - segment.start_time).abs() < TIME_EPSILON => {
                *last = segment;
            }
            _ => deduped.push(segment),
        }
    }
    *segments = deduped;
}

/// Charts written by hand or by other tools may list segments in any order.
fn deserialize_tempo_segments<'de, D>(deserializer: D) -> Result<Vec<TempoSegment>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut segments = Vec::<TempoSegment>::deserialize(deserializer)?;
    normalize_tempo_segments(&mut segments);
    Ok(segments)
}
