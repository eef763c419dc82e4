//! Timed message lists.
//!
//! A [`Schedule`] stores every message together with its delta timestamp,
//! i.e. its offset from the start of the sequence. Schedules can be built
//! from gaps between consecutive messages or from absolute offsets, or be
//! generated from a seeded [`NotePattern`].

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::InvalidData;
use crate::message::MidiMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledMessage {
    pub offset: Duration,
    pub message: MidiMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    entries: Vec<ScheduledMessage>,
}

impl Schedule {
    /// Each gap is measured from the previous message (the first from the start).
    pub fn from_deltas<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (Duration, MidiMessage)>,
    {
        let mut offset = Duration::ZERO;
        let entries = items
            .into_iter()
            .map(|(gap, message)| {
                offset += gap;
                ScheduledMessage { offset, message }
            })
            .collect();
        Schedule { entries }
    }

    pub fn from_offsets<I>(items: I) -> Result<Self, InvalidData>
    where
        I: IntoIterator<Item = (Duration, MidiMessage)>,
    {
        let mut entries: Vec<ScheduledMessage> = Vec::new();
        for (index, (offset, message)) in items.into_iter().enumerate() {
            if let Some(prev) = entries.last() {
                if offset < prev.offset {
                    return Err(InvalidData::OffsetOutOfOrder { index });
                }
            }
            entries.push(ScheduledMessage { offset, message });
        }
        Ok(Schedule { entries })
    }

    /// A single note-on sent right away.
    pub fn single_note() -> Self {
        Schedule::from_deltas(vec![(Duration::ZERO, MidiMessage::note_on(0, 100, 90))])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduledMessage] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ScheduledMessage> {
        self.entries.get(index)
    }

    /// Offset of the last message, i.e. the length of the sequence.
    pub fn duration(&self) -> Duration {
        self.entries.last().map_or(Duration::ZERO, |e| e.offset)
    }

    /// Gaps between consecutive messages.
    pub fn delays(&self) -> Vec<Duration> {
        self.entries
            .windows(2)
            .map(|w| w[1].offset - w[0].offset)
            .collect()
    }
}

/// Random note-on/note-off pairs, reproducible from `seed`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotePattern {
    pub notes: usize,
    pub channel: u8,
    pub seed: u64,
    pub min_gap: Duration,
    pub max_gap: Duration,
    pub min_length: Duration,
    pub max_length: Duration,
}

impl Default for NotePattern {
    fn default() -> Self {
        NotePattern {
            notes: 8,
            channel: 0,
            seed: 0,
            min_gap: Duration::from_millis(20),
            max_gap: Duration::from_millis(120),
            min_length: Duration::from_millis(10),
            max_length: Duration::from_millis(200),
        }
    }
}

impl NotePattern {
    pub fn generate(&self) -> Schedule {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut events: Vec<(Duration, usize, MidiMessage)> = Vec::with_capacity(self.notes * 2);
        let mut start = Duration::ZERO;

        for i in 0..self.notes {
            if i > 0 {
                start += random_between(&mut rng, self.min_gap, self.max_gap);
            }
            let key = rng.gen_range(36..=96u8);
            let velocity = rng.gen_range(1..=127u8);
            let length = random_between(&mut rng, self.min_length, self.max_length);
            let on = MidiMessage::note_on(self.channel, key, velocity);
            let off = MidiMessage::note_off(self.channel, key, 0);
            events.push((start, events.len(), on));
            events.push((start + length, events.len(), off));
        }

        // stable on ties so a note-on stays ahead of its own note-off
        events.sort_by_key(|&(offset, seq, _)| (offset, seq));
        Schedule {
            entries: events
                .into_iter()
                .map(|(offset, _, message)| ScheduledMessage { offset, message })
                .collect(),
        }
    }
}

fn random_between(rng: &mut StdRng, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let micros = rng.gen_range(min.as_micros() as u64..=max.as_micros() as u64);
    Duration::from_micros(micros)
}
