//! Snap grid: subdivision levels, classification and grid lookups.

use crate::tempo::{beat_duration, usable, TempoMap};
use egui::Color32;
use serde::{Deserialize, Serialize};

/// How far `next_after`/`previous_before`/`nearest` look for a grid point.
pub const SNAP_SEARCH_WINDOW: f64 = 10.0;

/// Grid points closer than this to the query time are not "next" or "previous".
pub const SNAP_EPSILON: f64 = 1e-4;

/// Tolerance, in divisions, for a time to count as landing on a subdivision.
pub const CLASSIFY_TOLERANCE: f64 = 1e-5;

/// Color of notes and grid lines that land on no subdivision.
pub const MISTIMED_COLOR: Color32 = Color32::from_rgb(120, 120, 120);

/// 1/N of a beat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Snap {
    Whole,
    Half,
    Third,
    #[default]
    Quarter,
    Sixth,
    Eighth,
    Twelfth,
    Sixteenth,
    TwentyFourth,
}

impl Snap {
    pub const ALL: [Snap; 9] = [
        Snap::Whole,
        Snap::Half,
        Snap::Third,
        Snap::Quarter,
        Snap::Sixth,
        Snap::Eighth,
        Snap::Twelfth,
        Snap::Sixteenth,
        Snap::TwentyFourth,
    ];

    /// Order in which `classify` tries divisions: whole beats and power-of-two
    /// subdivisions win over triplet subdivisions.
    pub const CLASSIFY_PRIORITY: [Snap; 9] = [
        Snap::Whole,
        Snap::Half,
        Snap::Quarter,
        Snap::Eighth,
        Snap::Sixteenth,
        Snap::Third,
        Snap::Sixth,
        Snap::Twelfth,
        Snap::TwentyFourth,
    ];

    pub fn division(self) -> u32 {
        match self {
            Snap::Whole => 1,
            Snap::Half => 2,
            Snap::Third => 3,
            Snap::Quarter => 4,
            Snap::Sixth => 6,
            Snap::Eighth => 8,
            Snap::Twelfth => 12,
            Snap::Sixteenth => 16,
            Snap::TwentyFourth => 24,
        }
    }

    pub fn from_division(division: u32) -> Option<Snap> {
        Snap::ALL.into_iter().find(|s| s.division() == division)
    }

    pub fn color(self) -> Color32 {
        match self {
            Snap::Whole => Color32::from_rgb(240, 240, 240),
            Snap::Half => Color32::from_rgb(235, 69, 44),
            Snap::Third => Color32::from_rgb(168, 93, 226),
            Snap::Quarter => Color32::from_rgb(62, 131, 233),
            Snap::Sixth => Color32::from_rgb(229, 120, 216),
            Snap::Eighth => Color32::from_rgb(244, 208, 63),
            Snap::Twelfth => Color32::from_rgb(160, 160, 200),
            Snap::Sixteenth => Color32::from_rgb(104, 214, 255),
            Snap::TwentyFourth => Color32::from_rgb(80, 200, 120),
        }
    }

    pub fn label(self) -> String {
        format!("1/{}", self.division())
    }
}

impl TryFrom<u32> for Snap {
    type Error = String;

    fn try_from(division: u32) -> Result<Self, Self::Error> {
        Snap::from_division(division).ok_or_else(|| format!("unsupported snap division 1/{division}"))
    }
}

impl From<Snap> for u32 {
    fn from(snap: Snap) -> u32 {
        snap.division()
    }
}

/// The first subdivision (in `CLASSIFY_PRIORITY` order) `time` lands on, or
/// `None` for a mistimed / untimed instant.
pub fn classify(tempo: TempoMap<'_>, time: f64) -> Option<Snap> {
    let segment = tempo.segment_at(time)?;
    if !usable(segment) {
        return None;
    }
    let elapsed = time - segment.start_time;
    Snap::CLASSIFY_PRIORITY.into_iter().find(|snap| {
        let divisions = elapsed / beat_duration(segment.bpm, snap.division());
        (divisions - divisions.round()).abs() < CLASSIFY_TOLERANCE
    })
}

pub fn classify_color(tempo: TempoMap<'_>, time: f64) -> Color32 {
    classify(tempo, time)
        .map(Snap::color)
        .unwrap_or(MISTIMED_COLOR)
}

/// A tempo map viewed at one snap division.
#[derive(Clone, Copy, Debug)]
pub struct SnapGrid<'a> {
    tempo: TempoMap<'a>,
    snap: Snap,
}

impl<'a> SnapGrid<'a> {
    pub fn new(tempo: TempoMap<'a>, snap: Snap) -> Self {
        Self { tempo, snap }
    }

    pub fn snap(&self) -> Snap {
        self.snap
    }

    pub fn tempo(&self) -> TempoMap<'a> {
        self.tempo
    }

    pub fn points(&self, start: f64, end: f64) -> impl Iterator<Item = f64> + 'a {
        self.tempo.grid_times(start, end, self.snap.division())
    }

    pub fn classify(&self, time: f64) -> Option<Snap> {
        classify(self.tempo, time)
    }

    /// First grid point strictly after `time`.
    pub fn next_after(&self, time: f64) -> Option<f64> {
        self.points(time + SNAP_EPSILON, time + SNAP_SEARCH_WINDOW).next()
    }

    /// Last grid point strictly before `time`.
    pub fn previous_before(&self, time: f64) -> Option<f64> {
        self.points(time - SNAP_SEARCH_WINDOW, time - SNAP_EPSILON).last()
    }

    pub fn nearest(&self, time: f64) -> Option<f64> {
        self.points(time - SNAP_SEARCH_WINDOW, time + SNAP_SEARCH_WINDOW)
            .min_by(|a, b| (a - time).abs().total_cmp(&(b - time).abs()))
    }
}
