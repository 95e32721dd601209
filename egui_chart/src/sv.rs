//! Velocity curve model for SV notes.
//!
//! An SV pattern `{from, to}` splits a note's duration at time fraction `to`;
//! scroll progress reaches fraction `from` at that point. This turns into two
//! constant-velocity segments relative to a uniform baseline.

use serde::{Deserialize, Serialize};

/// Largest velocity ratio either segment may have before the pattern is flagged.
pub const MAX_SV_RATIO: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvPattern {
    pub from: f64,
    pub to: f64,
}

impl Default for SvPattern {
    fn default() -> Self {
        Self::linear()
    }
}

impl SvPattern {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn linear() -> Self {
        Self { from: 0.5, to: 0.5 }
    }

    pub fn curve(&self) -> SvCurve {
        sv_ratios(self.from, self.to)
    }

    /// Scroll progress (0..=1) after `fraction` of the note's duration has elapsed.
    pub fn progress_at(&self, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        let from = self.from.clamp(0.0, 1.0);
        let to = self.to.clamp(0.0, 1.0);
        if fraction <= to {
            if to <= 0.0 {
                from
            } else {
                fraction / to * from
            }
        } else if to >= 1.0 {
            1.0
        } else {
            from + (fraction - to) / (1.0 - to) * (1.0 - from)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvCurve {
    pub start_ratio: f64,
    pub end_ratio: f64,
    /// The pattern cannot be played back as two finite segments ("SV too powerful").
    pub error: bool,
}

/// Converts a pattern into the velocities of its two segments.
///
/// Ratios are only meaningful when `error` is false.
pub fn sv_ratios(from: f64, to: f64) -> SvCurve {
    let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_unit(from) || !in_unit(to) {
        return SvCurve {
            start_ratio: f64::NAN,
            end_ratio: f64::NAN,
            error: true,
        };
    }

    let start_ratio = if to > 0.0 { from / to } else { f64::INFINITY };
    let end_ratio = if to < 1.0 {
        (1.0 - from) / (1.0 - to)
    } else {
        f64::INFINITY
    };
    let acceptable = |r: f64| r.is_finite() && (0.0..=MAX_SV_RATIO).contains(&r);
    let error = to <= 0.0 || to >= 1.0 || !acceptable(start_ratio) || !acceptable(end_ratio);

    SvCurve {
        start_ratio,
        end_ratio,
        error,
    }
}

/// One constant-velocity stretch of an SV note.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvRegion {
    pub start_time: f64,
    pub end_time: f64,
    pub ratio: f64,
}

/// The two constant-velocity regions standing in for one curved note, or
/// `None` when the pattern is flagged.
pub fn sv_regions(start_time: f64, end_time: f64, pattern: &SvPattern) -> Option<[SvRegion; 2]> {
    let curve = pattern.curve();
    if curve.error || end_time <= start_time {
        return None;
    }
    let split = start_time + (end_time - start_time) * pattern.to;
    Some([
        SvRegion {
            start_time,
            end_time: split,
            ratio: curve.start_ratio,
        },
        SvRegion {
            start_time: split,
            end_time,
            ratio: curve.end_ratio,
        },
    ])
}
