//! Shared buffering behind stream copies.
//!
//! A tee hub owns one source and hands out readers with independent cursors.
//! Samples (and faults) pulled from the source are buffered until the slowest
//! live reader has consumed them, so every reader observes the same sequence
//! no matter how their pulls interleave. Dropping a reader releases its cursor
//! and lets the buffer shrink.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::signals::{Length, Sample, Signal};

struct TeeHub {
    source: Box<dyn Signal + Send>,
    /// Pulled results not yet seen by every live reader.
    buffer: VecDeque<Result<Sample>>,
    /// Absolute index of `buffer[0]`.
    base: u64,
    /// Absolute position of each reader, `None` once dropped.
    cursors: Vec<Option<u64>>,
    ended: bool,
}

impl TeeHub {
    fn pull(&mut self, slot: usize) -> Result<Sample> {
        let position = match self.cursors.get(slot).copied().flatten() {
            Some(position) => position,
            None => return Err(Error::EndOfSequence),
        };
        let offset = (position - self.base) as usize;

        if offset == self.buffer.len() {
            if self.ended {
                return Err(Error::EndOfSequence);
            }
            match self.source.next_sample() {
                Err(Error::EndOfSequence) => {
                    self.ended = true;
                    return Err(Error::EndOfSequence);
                }
                result => self.buffer.push_back(result),
            }
        }

        let result = self.buffer[offset].clone();
        self.cursors[slot] = Some(position + 1);
        self.trim();
        result
    }

    fn trim(&mut self) {
        let slowest = self.cursors.iter().flatten().copied().min();
        let Some(slowest) = slowest else {
            self.buffer.clear();
            return;
        };
        while self.base < slowest && self.buffer.pop_front().is_some() {
            self.base += 1;
        }
    }

    fn register(&mut self, position: u64) -> usize {
        if let Some(free) = self.cursors.iter().position(Option::is_none) {
            self.cursors[free] = Some(position);
            free
        } else {
            self.cursors.push(Some(position));
            self.cursors.len() - 1
        }
    }

    fn remaining(&self, slot: usize) -> Length {
        let Some(position) = self.cursors.get(slot).copied().flatten() else {
            return Length::Finite(0);
        };
        let buffered = self.buffer.len() - (position - self.base) as usize;
        if self.ended {
            return Length::Finite(buffered);
        }
        Length::Finite(buffered).followed_by(self.source.length())
    }
}

/// One independent view of a shared source.
///
/// Readers are created in pairs by [`TeeReader::split`] and further by
/// [`TeeReader::fork`], which starts the new reader at the current position
/// of the forked one.
pub(crate) struct TeeReader {
    hub: Arc<Mutex<TeeHub>>,
    slot: usize,
}

impl TeeReader {
    /// Moves `source` into a new hub and returns two readers positioned at its start.
    pub(crate) fn split(source: Box<dyn Signal + Send>) -> (TeeReader, TeeReader) {
        let hub = Arc::new(Mutex::new(TeeHub {
            source,
            buffer: VecDeque::new(),
            base: 0,
            cursors: vec![Some(0), Some(0)],
            ended: false,
        }));
        (
            TeeReader {
                hub: Arc::clone(&hub),
                slot: 0,
            },
            TeeReader { hub, slot: 1 },
        )
    }

    /// Creates another reader at this reader's position.
    pub(crate) fn fork(&self) -> TeeReader {
        let mut hub = self.hub.lock();
        let position = hub.cursors[self.slot].unwrap_or(hub.base);
        let slot = hub.register(position);
        drop(hub);
        TeeReader {
            hub: Arc::clone(&self.hub),
            slot,
        }
    }

    /// Number of results currently held for slower readers.
    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.hub.lock().buffer.len()
    }
}

impl Signal for TeeReader {
    fn next_sample(&mut self) -> Result<Sample> {
        self.hub.lock().pull(self.slot)
    }

    fn length(&self) -> Length {
        self.hub.lock().remaining(self.slot)
    }
}

impl Drop for TeeReader {
    fn drop(&mut self) {
        let mut hub = self.hub.lock();
        if let Some(cursor) = hub.cursors.get_mut(self.slot) {
            *cursor = None;
        }
        hub.trim();
    }
}
