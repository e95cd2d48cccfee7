use chrono::{NaiveDateTime, TimeDelta};

use crate::{RespiratoryEvent, StageKind};

/// Fixed-length slice of a recording with one scored stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Epoch {
    start: NaiveDateTime,
    duration: TimeDelta,
    stage: StageKind,
    event: RespiratoryEvent,
}

impl Epoch {
    pub fn new(start: NaiveDateTime, duration: TimeDelta, stage: StageKind) -> Self {
        Self::with_event(start, duration, stage, RespiratoryEvent::NoEvent)
    }

    pub fn with_event(
        start: NaiveDateTime,
        duration: TimeDelta,
        stage: StageKind,
        event: RespiratoryEvent,
    ) -> Self {
        Self {
            start,
            duration,
            stage,
            event,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Saturates at [`NaiveDateTime::MAX`].
    pub fn end(&self) -> NaiveDateTime {
        self.start
            .checked_add_signed(self.duration)
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn event(&self) -> RespiratoryEvent {
        self.event
    }

    /// Half-open: `start <= time < end`.
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time < self.end()
    }
}
