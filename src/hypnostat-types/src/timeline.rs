use chrono::{NaiveDateTime, TimeDelta};

use crate::{Epoch, RespiratoryEvent, StageKind, ValidationError};

/// Longest gap, in epochs, that is filled with unscored epochs.
pub const MAX_GAP_EPOCHS: usize = 86_400;

type Entry = Result<(NaiveDateTime, StageKind, RespiratoryEvent), ValidationError>;

/// One subject's night as a gap-free, time-ordered run of equal-length epochs.
///
/// Grid-aligned gaps in the input are materialised as [`StageKind::Unknown`]
/// epochs, so position `i` always starts `i * epoch_duration` after
/// [`Timeline::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeline {
    epochs: Vec<Epoch>,
    epoch_duration: TimeDelta,
    has_events: bool,
}

impl Timeline {
    /// Timestamps are taken as given; no timezone conversion happens here or
    /// in any metric. Use `SleepMetrics::with_offset` to shift clock times.
    pub fn new<I>(epochs: I, epoch_duration: TimeDelta) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (NaiveDateTime, StageKind)>,
    {
        let entries = epochs
            .into_iter()
            .map(|(start, stage)| Ok((start, stage, RespiratoryEvent::NoEvent)));
        Self::build(entries, epoch_duration, false)
    }

    /// Like [`Timeline::new`], carrying a respiratory annotation per epoch.
    pub fn with_events<I>(epochs: I, epoch_duration: TimeDelta) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (NaiveDateTime, StageKind, RespiratoryEvent)>,
    {
        Self::build(epochs.into_iter().map(Ok), epoch_duration, true)
    }

    /// Contiguous timeline starting at `start`.
    pub fn from_stages<I>(
        start: NaiveDateTime,
        epoch_duration: TimeDelta,
        stages: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = StageKind>,
    {
        let entries = stages
            .into_iter()
            .map(|stage| (stage, RespiratoryEvent::NoEvent));
        Self::build(contiguous(start, epoch_duration, entries), epoch_duration, false)
    }

    /// Contiguous timeline starting at `start` with respiratory annotations.
    pub fn from_annotated_stages<I>(
        start: NaiveDateTime,
        epoch_duration: TimeDelta,
        stages: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (StageKind, RespiratoryEvent)>,
    {
        Self::build(contiguous(start, epoch_duration, stages), epoch_duration, true)
    }

    fn build<I>(
        entries: I,
        epoch_duration: TimeDelta,
        has_events: bool,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = Entry>,
    {
        if epoch_duration <= TimeDelta::zero() {
            return Err(ValidationError::NonPositiveDuration(epoch_duration));
        }

        let mut epochs: Vec<Epoch> = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let (start, stage, event) = entry?;
            if start.checked_add_signed(epoch_duration).is_none() {
                return Err(ValidationError::OutOfRange { index });
            }

            if let Some(last) = epochs.last().copied() {
                let offset = start - last.start();
                if offset < TimeDelta::zero() {
                    return Err(ValidationError::Unsorted { index });
                }
                if offset.is_zero() {
                    return Err(ValidationError::DuplicateTimestamp { index });
                }
                if offset < epoch_duration {
                    return Err(ValidationError::Overlapping { index });
                }

                let missing = whole_epochs(offset - epoch_duration, epoch_duration)
                    .ok_or(ValidationError::MisalignedGap { index })?;
                if missing > MAX_GAP_EPOCHS as i128 {
                    return Err(ValidationError::GapTooLarge {
                        index,
                        epochs: missing,
                        max: MAX_GAP_EPOCHS,
                    });
                }
                if missing > 0 {
                    debug!("filling {} unscored epochs before {}", missing, start);
                }

                let mut gap_start = last.end();
                for _ in 0..missing {
                    epochs.push(Epoch::new(gap_start, epoch_duration, StageKind::Unknown));
                    gap_start += epoch_duration;
                }
            }

            epochs.push(Epoch::with_event(start, epoch_duration, stage, event));
        }

        Ok(Self {
            epochs,
            epoch_duration,
            has_events,
        })
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn epoch_duration(&self) -> TimeDelta {
        self.epoch_duration
    }

    /// Whether respiratory annotations were supplied at construction.
    pub fn has_events(&self) -> bool {
        self.has_events
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.epochs.first().map(Epoch::start)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.epochs.last().map(Epoch::end)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Epoch> {
        self.epochs.iter()
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.epochs.iter().map(Epoch::stage)
    }

    pub fn get(&self, index: usize) -> Option<&Epoch> {
        self.epochs.get(index)
    }

    /// Position of the epoch covering `time`.
    pub fn position_at(&self, time: NaiveDateTime) -> Option<usize> {
        let index = self
            .epochs
            .partition_point(|epoch| epoch.start() <= time)
            .checked_sub(1)?;
        self.epochs[index].contains(time).then_some(index)
    }

    /// Epoch covering `time`.
    pub fn at(&self, time: NaiveDateTime) -> Option<&Epoch> {
        self.position_at(time).map(|index| &self.epochs[index])
    }

    /// Duration of `count` epochs.
    pub fn span(&self, count: usize) -> TimeDelta {
        i32::try_from(count)
            .ok()
            .and_then(|count| self.epoch_duration.checked_mul(count))
            .unwrap_or(TimeDelta::MAX)
    }

    /// Total recording time.
    pub fn duration(&self) -> TimeDelta {
        self.span(self.len())
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Epoch;
    type IntoIter = std::slice::Iter<'a, Epoch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn contiguous<I>(
    start: NaiveDateTime,
    epoch_duration: TimeDelta,
    stages: I,
) -> impl Iterator<Item = Entry>
where
    I: IntoIterator<Item = (StageKind, RespiratoryEvent)>,
{
    stages
        .into_iter()
        .enumerate()
        .scan(Some(start), move |time, (index, (stage, event))| {
            let current = *time;
            *time = current.and_then(|t| t.checked_add_signed(epoch_duration));
            Some(
                current
                    .map(|current| (current, stage, event))
                    .ok_or(ValidationError::OutOfRange { index }),
            )
        })
}

/// Number of whole epochs in `gap`, `None` when it is not a multiple.
fn whole_epochs(gap: TimeDelta, epoch_duration: TimeDelta) -> Option<i128> {
    let gap = total_nanos(gap);
    let step = total_nanos(epoch_duration);
    (gap % step == 0).then_some(gap / step)
}

fn total_nanos(delta: TimeDelta) -> i128 {
    i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos())
}
