//! Transport abstraction.
//!
//! The editor never owns playback; it only asks the host for the current
//! position and requests seeks.

/// Clock the host can swap in (audio engine, video, manual clock).
pub trait Transport {
    fn current_time(&self) -> f64;
    fn seek(&mut self, time: f64);
}

/// Silent clock advanced by frame time while playing.
#[derive(Clone, Debug, Default)]
pub struct ClockTransport {
    position: f64,
    is_playing: bool,
}

impl ClockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: f64) -> Self {
        Self {
            position: position.max(0.0),
            is_playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    pub fn toggle(&mut self) {
        self.is_playing = !self.is_playing;
    }

    /// Advance by a frame delta. Deltas of a second or more (window regained
    /// focus, debugger pause) are dropped instead of jumping ahead.
    pub fn advance(&mut self, dt: f64) {
        if self.is_playing && dt > 0.0 && dt < 1.0 {
            self.position += dt;
        }
    }
}

impl Transport for ClockTransport {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, time: f64) {
        if time.is_finite() {
            self.position = time.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0.016, 1.016)]
    #[test_case(0.0, 1.0)]
    #[test_case(-0.5, 1.0)]
    #[test_case(1.5, 1.0)]
    fn advance_while_playing(dt: f64, expected: f64) {
        let mut clock = ClockTransport::at(1.0);
        clock.set_playing(true);
        clock.advance(dt);
        assert_eq!(clock.current_time(), expected);
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut clock = ClockTransport::at(2.0);
        clock.advance(0.1);
        assert_eq!(clock.current_time(), 2.0);
        clock.toggle();
        assert!(clock.is_playing());
    }

    #[test]
    fn seek_clamps_at_zero() {
        let mut clock = ClockTransport::new();
        clock.seek(-3.0);
        assert_eq!(clock.current_time(), 0.0);
        clock.seek(f64::NAN);
        assert_eq!(clock.current_time(), 0.0);
        clock.seek(4.5);
        assert_eq!(clock.current_time(), 4.5);
    }
}
