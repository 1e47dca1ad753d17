use crate::modules::protocol::{AnalysisResult, ChordInterval};
use tracing::warn;

/// What is sounding at one playback position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChordCursor<'a> {
    /// Index of the interval containing the position, if any.
    pub index: Option<usize>,
    pub active: Option<&'a str>,
    pub previous: Option<&'a str>,
    pub next: Option<&'a str>,
}

impl ChordCursor<'_> {
    pub fn to_state(&self) -> ChordState {
        ChordState {
            index: self.index,
            active: self.active.map(str::to_string),
            previous: self.previous.map(str::to_string),
            next: self.next.map(str::to_string),
        }
    }
}

/// Owned form of [`ChordCursor`], for handing to a display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChordState {
    pub index: Option<usize>,
    pub active: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Maps position `t` (seconds) onto `intervals`.
///
/// Inside an interval (`start_time <= t < end_time`, first match wins) the
/// neighbours are the interval's own `previous_chord`/`next_chord`. In a gap,
/// before the first or after the last interval nothing is active; previous is
/// the last interval that has started and next the first that has not.
pub fn locate(intervals: &[ChordInterval], t: f64) -> ChordCursor<'_> {
    if let Some((index, iv)) = intervals
        .iter()
        .enumerate()
        .find(|(_, iv)| iv.start_time <= t && t < iv.end_time)
    {
        return ChordCursor {
            index: Some(index),
            active: Some(iv.chord.as_str()),
            previous: iv.previous_chord.as_deref(),
            next: iv.next_chord.as_deref(),
        };
    }

    ChordCursor {
        index: None,
        active: None,
        previous: intervals
            .iter()
            .rev()
            .find(|iv| iv.start_time <= t)
            .map(|iv| iv.chord.as_str()),
        next: intervals
            .iter()
            .find(|iv| iv.start_time > t)
            .map(|iv| iv.chord.as_str()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    intervals: Vec<ChordInterval>,
}

impl Timeline {
    pub fn new(intervals: Vec<ChordInterval>) -> Self {
        let timeline = Self { intervals };
        if !timeline.is_ordered() {
            warn!(
                intervals = timeline.intervals.len(),
                "chord intervals are out of order or empty-length; lookups may be wrong"
            );
        }
        timeline
    }

    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        Self::new(analysis.chords.clone())
    }

    pub fn intervals(&self) -> &[ChordInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// End of the last-ending interval, or 0 for an empty timeline.
    pub fn duration(&self) -> f64 {
        self.intervals
            .iter()
            .map(|iv| iv.end_time)
            .fold(0.0, f64::max)
    }

    /// Start times never decrease and every interval has positive length.
    pub fn is_ordered(&self) -> bool {
        self.intervals.iter().all(|iv| iv.start_time < iv.end_time)
            && self
                .intervals
                .windows(2)
                .all(|w| w[0].start_time <= w[1].start_time)
    }

    pub fn at(&self, t: f64) -> ChordCursor<'_> {
        locate(&self.intervals, t)
    }
}

/// Fed with playback positions on every UI tick; yields only when the mapped
/// chord state differs from the previous tick.
#[derive(Debug, Clone, Default)]
pub struct TimelineFollower {
    timeline: Timeline,
    last: Option<ChordState>,
}

impl TimelineFollower {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            last: None,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tick(&mut self, t: f64) -> Option<ChordState> {
        let state = self.timeline.at(t).to_state();
        if self.last.as_ref() == Some(&state) {
            return None;
        }
        self.last = Some(state.clone());
        Some(state)
    }

    /// Forget the last reported state, e.g. after a seek.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
