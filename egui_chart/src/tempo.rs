//! Tempo map module
//!
//! Converts between absolute time (seconds) and beat subdivisions across a
//! sorted list of tempo segments. Segment `i` governs `[start_i, start_{i+1})`,
//! the last one never ends; there is no tempo before the first segment.

use crate::structure::TempoSegment;

/// Length in seconds of one 1/`division` beat at `bpm`.
pub fn beat_duration(bpm: f64, division: u32) -> f64 {
    60.0 / bpm / division.max(1) as f64
}

/// Tempos above this are treated like a missing tempo; the grid would be too dense to walk.
pub const MAX_BPM: f64 = 10_000.0;

pub(crate) fn usable(segment: &TempoSegment) -> bool {
    segment.bpm.is_finite()
        && segment.bpm > 0.0
        && segment.bpm <= MAX_BPM
        && segment.start_time.is_finite()
}

pub(crate) fn is_sorted_by_start(segments: &[TempoSegment]) -> bool {
    segments
        .windows(2)
        .all(|w| w[0].start_time.total_cmp(&w[1].start_time).is_le())
}

#[derive(Clone, Copy, Debug)]
pub struct TempoMap<'a> {
    segments: &'a [TempoSegment],
}

impl<'a> TempoMap<'a> {
    /// `segments` must be sorted by start time (see `Beatmap::sort_tempo_segments`).
    /// An unsorted slice yields an empty map.
    pub fn new(segments: &'a [TempoSegment]) -> Self {
        if !is_sorted_by_start(segments) {
            log::debug!("tempo segments out of order, tempo map left empty");
            return Self { segments: &[] };
        }
        Self { segments }
    }

    pub fn segments(&self) -> &'a [TempoSegment] {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the last segment starting at or before `time`.
    pub fn segment_index_at(&self, time: f64) -> Option<usize> {
        let count = self.segments.partition_point(|s| s.start_time <= time);
        count.checked_sub(1)
    }

    pub fn segment_at(&self, time: f64) -> Option<&'a TempoSegment> {
        self.segment_index_at(time).map(|idx| &self.segments[idx])
    }

    /// Fractional beats elapsed since the governing segment started.
    pub fn beats_at(&self, time: f64) -> Option<f64> {
        let segment = self.segment_at(time)?;
        if !usable(segment) {
            return None;
        }
        Some((time - segment.start_time) / beat_duration(segment.bpm, 1))
    }

    pub fn time_at_beat(segment: &TempoSegment, beats: f64) -> f64 {
        segment.start_time + beats * beat_duration(segment.bpm, 1)
    }

    /// Every time in `[start, end)` lying on a 1/`division` beat boundary of its
    /// governing segment, in ascending order.
    pub fn grid_times(&self, start: f64, end: f64, division: u32) -> GridTimes<'a> {
        GridTimes {
            segments: self.segments,
            start,
            end,
            division: division.max(1),
            segment: self.segment_index_at(start).unwrap_or(0),
            cursor: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SubRange {
    origin: f64,
    step: f64,
    index: f64,
    end: f64,
}

/// Lazy, finite iterator over grid points; clone it to restart.
#[derive(Clone, Debug)]
pub struct GridTimes<'a> {
    segments: &'a [TempoSegment],
    start: f64,
    end: f64,
    division: u32,
    segment: usize,
    cursor: Option<SubRange>,
}

impl GridTimes<'_> {
    fn open_next_sub_range(&mut self) -> bool {
        while self.segment < self.segments.len() {
            let idx = self.segment;
            self.segment += 1;
            let segment = &self.segments[idx];
            if !usable(segment) {
                continue;
            }
            let seg_end = self
                .segments
                .get(idx + 1)
                .map(|next| next.start_time)
                .unwrap_or(f64::INFINITY);
            let sub_start = self.start.max(segment.start_time);
            let sub_end = self.end.min(seg_end);
            if sub_start >= sub_end {
                if segment.start_time >= self.end {
                    self.segment = self.segments.len();
                    return false;
                }
                continue;
            }
            let step = beat_duration(segment.bpm, self.division);
            let index = ((sub_start - segment.start_time) / step).ceil();
            self.cursor = Some(SubRange {
                origin: segment.start_time,
                step,
                index,
                end: sub_end,
            });
            return true;
        }
        false
    }
}

impl Iterator for GridTimes<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        loop {
            if let Some(range) = &mut self.cursor {
                let time = range.origin + range.index * range.step;
                if time < range.end {
                    range.index += 1.0;
                    return Some(time);
                }
                self.cursor = None;
            }
            if !self.open_next_sub_range() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn segments(list: &[(f64, f64)]) -> Vec<TempoSegment> {
        list.iter()
            .map(|&(start, bpm)| TempoSegment::new(start, bpm))
            .collect()
    }

    #[test]
    fn quarter_grid_at_120() {
        let segs = segments(&[(0.0, 120.0)]);
        let times: Vec<f64> = TempoMap::new(&segs).grid_times(0.0, 0.5, 4).collect();
        assert_eq!(times, vec![0.0, 0.125, 0.25, 0.375]);
    }

    #[test]
    fn window_inside_a_segment_starts_on_the_next_boundary() {
        let segs = segments(&[(1.0, 60.0)]);
        let times: Vec<f64> = TempoMap::new(&segs).grid_times(1.3, 3.0, 2).collect();
        assert_eq!(times, vec![1.5, 2.0, 2.5]);
    }

    #[test]
    fn grid_restarts_at_each_segment() {
        // 60 bpm from 0, 120 bpm from 1.25 (off the first grid).
        let segs = segments(&[(0.0, 60.0), (1.25, 120.0)]);
        let times: Vec<f64> = TempoMap::new(&segs).grid_times(0.0, 2.5, 1).collect();
        assert_eq!(times, vec![0.0, 1.0, 1.25, 1.75, 2.25]);
    }

    #[test]
    fn nothing_before_the_first_segment() {
        let segs = segments(&[(5.0, 120.0)]);
        let map = TempoMap::new(&segs);
        assert_eq!(map.grid_times(0.0, 4.0, 4).count(), 0);
        assert_eq!(map.grid_times(4.5, 5.6, 1).collect::<Vec<_>>(), vec![5.0, 5.5]);
    }

    #[test]
    fn empty_map_has_no_grid() {
        let map = TempoMap::new(&[]);
        assert!(map.is_empty());
        assert_eq!(map.grid_times(0.0, 10.0, 4).next(), None);
        assert_eq!(map.beats_at(1.0), None);
    }

    #[test]
    fn invalid_bpm_segments_are_skipped() {
        let segs = segments(&[(0.0, 0.0), (1.0, 60.0)]);
        let times: Vec<f64> = TempoMap::new(&segs).grid_times(0.0, 3.0, 1).collect();
        assert_eq!(times, vec![1.0, 2.0]);
    }

    #[test]
    fn runaway_bpm_is_treated_as_no_tempo() {
        let segs = segments(&[(0.0, 1e9), (2.0, 60.0)]);
        let map = TempoMap::new(&segs);
        assert_eq!(map.beats_at(1.0), None);
        let times: Vec<f64> = map.grid_times(0.0, 4.0, 24).take(3).collect();
        assert_eq!(times, vec![2.0, 2.0 + 1.0 / 24.0, 2.0 + 2.0 / 24.0]);
    }

    #[test]
    fn unsorted_segments_give_an_empty_map() {
        let segs = segments(&[(5.0, 120.0), (0.0, 60.0)]);
        let map = TempoMap::new(&segs);
        assert!(map.is_empty());
        assert_eq!(map.segment_at(6.0), None);
        assert_eq!(map.grid_times(0.0, 10.0, 1).next(), None);
    }

    #[test]
    fn iterator_is_restartable() {
        let segs = segments(&[(0.0, 120.0)]);
        let grid = TempoMap::new(&segs).grid_times(0.0, 2.0, 4);
        let first: Vec<f64> = grid.clone().collect();
        let second: Vec<f64> = grid.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
    }

    #[test_case(0.0, None)]
    #[test_case(1.0, Some(0))]
    #[test_case(2.99, Some(0))]
    #[test_case(3.0, Some(1))]
    #[test_case(100.0, Some(1))]
    fn governing_segment(time: f64, expected: Option<usize>) {
        let segs = segments(&[(1.0, 120.0), (3.0, 90.0)]);
        assert_eq!(TempoMap::new(&segs).segment_index_at(time), expected);
    }

    #[test]
    fn beats_round_trip() {
        let segs = segments(&[(0.5, 180.0)]);
        let map = TempoMap::new(&segs);
        let beats = map.beats_at(1.5).unwrap();
        assert!((beats - 3.0).abs() < 1e-9);
        assert!((TempoMap::time_at_beat(&segs[0], beats) - 1.5).abs() < 1e-9);
    }
}
