use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Result, ScopeError};

/// Fixed-capacity ring of the most recent samples, shared between the
/// generator thread and any number of readers.
///
/// Every operation takes the same lock, so a reader sees the storage either
/// entirely before or entirely after a given `write`.
pub struct CircularBuffer {
    capacity: usize,
    ring: Mutex<Ring>,
}

struct Ring {
    storage: Vec<f64>,
    write_cursor: usize,
}

/// Copy of the storage in memory order, for consumers that draw the layout
/// rather than a chronological window.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSnapshot {
    pub samples: Vec<f64>,
    pub write_cursor: usize,
}

impl CircularBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ScopeError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            ring: Mutex::new(Ring {
                storage: vec![0.0; capacity],
                write_cursor: 0,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index the next write starts at.
    pub fn write_cursor(&self) -> usize {
        self.lock().write_cursor
    }

    /// Appends `samples`, overwriting the oldest values once the ring is full.
    ///
    /// A chunk at least as long as the capacity replaces the whole storage
    /// with its trailing `capacity` values and resets the cursor to 0.
    pub fn write(&self, samples: &[f64]) {
        let capacity = self.capacity;
        let mut ring = self.lock();
        let len = samples.len();

        if len >= capacity {
            ring.storage.copy_from_slice(&samples[len - capacity..]);
            ring.write_cursor = 0;
            return;
        }

        let start = ring.write_cursor;
        let head = (capacity - start).min(len);
        ring.storage[start..start + head].copy_from_slice(&samples[..head]);
        ring.storage[..len - head].copy_from_slice(&samples[head..]);
        ring.write_cursor = (start + len) % capacity;
    }

    /// Returns the `count` most recently written values, oldest first.
    pub fn read_latest(&self, count: usize) -> Result<Vec<f64>> {
        if count > self.capacity {
            return Err(ScopeError::OutOfRange {
                requested: count,
                capacity: self.capacity,
            });
        }
        let capacity = self.capacity;
        let ring = self.lock();
        let start = (ring.write_cursor + capacity - count) % capacity;

        if start + count <= capacity {
            return Ok(ring.storage[start..start + count].to_vec());
        }
        let mut out = Vec::with_capacity(count);
        out.extend_from_slice(&ring.storage[start..]);
        out.extend_from_slice(&ring.storage[..start + count - capacity]);
        Ok(out)
    }

    pub fn raw_snapshot(&self) -> RawSnapshot {
        let ring = self.lock();
        RawSnapshot {
            samples: ring.storage.clone(),
            write_cursor: ring.write_cursor,
        }
    }

    // A panic can't happen while the guard is held, so a poisoned ring is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            CircularBuffer::new(0),
            Err(ScopeError::ZeroCapacity)
        ));
    }

    #[test]
    fn starts_zeroed() {
        let buffer = CircularBuffer::new(3).unwrap();
        assert_eq!(buffer.read_latest(3).unwrap(), vec![0.0, 0.0, 0.0]);
        assert_eq!(buffer.write_cursor(), 0);
    }

    #[test]
    fn single_chunk_reads_back_in_order() {
        let buffer = CircularBuffer::new(8).unwrap();
        buffer.write(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.read_latest(3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(buffer.write_cursor(), 3);
    }

    #[test]
    fn wraparound_evicts_oldest() {
        let buffer = CircularBuffer::new(4).unwrap();
        buffer.write(&[1.0, 2.0, 3.0]);
        buffer.write(&[4.0, 5.0]);
        assert_eq!(buffer.read_latest(4).unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.write_cursor(), 1);
        assert_eq!(
            buffer.raw_snapshot(),
            RawSnapshot {
                samples: vec![5.0, 2.0, 3.0, 4.0],
                write_cursor: 1,
            }
        );
    }

    #[test]
    fn oversized_write_keeps_trailing_values() {
        let buffer = CircularBuffer::new(4).unwrap();
        buffer.write(&[9.0]);
        buffer.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.read_latest(4).unwrap(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.write_cursor(), 0);
    }

    #[test]
    fn exact_capacity_write_resets_cursor() {
        let buffer = CircularBuffer::new(3).unwrap();
        buffer.write(&[1.0]);
        buffer.write(&[4.0, 5.0, 6.0]);
        assert_eq!(buffer.write_cursor(), 0);
        assert_eq!(buffer.read_latest(2).unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn partial_read_spans_the_seam() {
        let buffer = CircularBuffer::new(5).unwrap();
        buffer.write(&[1.0, 2.0, 3.0, 4.0]);
        buffer.write(&[5.0, 6.0, 7.0]);
        // storage is [6, 7, 3, 4, 5], cursor 2
        assert_eq!(buffer.read_latest(3).unwrap(), vec![5.0, 6.0, 7.0]);
        assert_eq!(buffer.read_latest(1).unwrap(), vec![7.0]);
    }

    #[test]
    fn read_range_is_bounded_by_capacity() {
        let buffer = CircularBuffer::new(4).unwrap();
        assert!(buffer.read_latest(4).is_ok());
        assert_eq!(
            buffer.read_latest(5),
            Err(ScopeError::OutOfRange {
                requested: 5,
                capacity: 4,
            })
        );
    }

    #[test]
    fn empty_write_changes_nothing() {
        let buffer = CircularBuffer::new(4).unwrap();
        buffer.write(&[1.0, 2.0]);
        buffer.write(&[]);
        assert_eq!(buffer.write_cursor(), 2);
        assert_eq!(buffer.read_latest(2).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn read_returns_an_independent_copy() {
        let buffer = CircularBuffer::new(4).unwrap();
        buffer.write(&[1.0, 2.0]);
        let snapshot = buffer.read_latest(2).unwrap();
        buffer.write(&[3.0, 4.0, 5.0]);
        assert_eq!(snapshot, vec![1.0, 2.0]);
    }

    #[test]
    fn cursor_stays_in_range_over_uneven_writes() {
        let buffer = CircularBuffer::new(7).unwrap();
        let mut next = 0.0;
        for len in [1, 3, 6, 7, 2, 9, 5, 4, 13, 1] {
            let chunk: Vec<f64> = (0..len)
                .map(|_| {
                    next += 1.0;
                    next
                })
                .collect();
            buffer.write(&chunk);
            let raw = buffer.raw_snapshot();
            assert_eq!(raw.samples.len(), 7);
            assert!(raw.write_cursor < 7);
        }
        let expected: Vec<f64> = ((next as i64 - 6)..=next as i64).map(|v| v as f64).collect();
        assert_eq!(buffer.read_latest(7).unwrap(), expected);
    }

    #[test]
    fn readers_never_see_a_torn_chunk() {
        // every chunk is a run of one repeated value, so a full-capacity read
        // must always consist of at most two runs in ascending order
        let buffer = Arc::new(CircularBuffer::new(64).unwrap());
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 1..=2_000 {
                    buffer.write(&[i as f64; 32]);
                }
            })
        };
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let window = buffer.read_latest(64).unwrap();
                        let mut runs = window.clone();
                        runs.dedup();
                        assert!(runs.len() <= 2, "torn read: {runs:?}");
                        assert!(runs.windows(2).all(|w| w[0] < w[1]));
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(buffer.read_latest(32).unwrap(), vec![2_000.0; 32]);
    }
}
