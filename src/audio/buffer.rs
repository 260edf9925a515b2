//! Fixed-capacity circular store of waveform amplitudes for live display.
//!
//! [`WaveformRingBuffer`] always overwrites the oldest slot, so the most
//! recent `capacity` points stay available to the renderer.  Its capacity
//! follows the pixel width of the view it feeds: [`resize`] keeps as much of
//! the recent history as fits.
//!
//! [`SharedWaveformBuffer`] is the cross-thread handle: the capture thread
//! writes through it, the render thread takes a [`WaveformSnapshot`] (backing
//! array and cursor copied under one short critical section) and reads the
//! copy at its own pace.
//!
//! # Example
//!
//! ```rust
//! use waveform_extract::audio::WaveformRingBuffer;
//!
//! let mut buf = WaveformRingBuffer::new(3);
//! for v in [0.1, 0.2, 0.3, 0.4] {
//!     buf.write(v);
//! }
//! assert_eq!(buf.get(0), 0.4); // newest
//! assert_eq!(buf.get(2), 0.2); // oldest still held
//! ```
//!
//! [`resize`]: WaveformRingBuffer::resize

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// WaveformRingBuffer
// ---------------------------------------------------------------------------

/// Circular buffer of `f32` amplitudes indexed from the newest value.
///
/// ## Resize layout
///
/// [`resize`](Self::resize) copies the retained values so that the newest
/// lands in the last slot and older ones fill backwards, then resets the
/// write cursor to `0`.  Slot `0` therefore always holds either the oldest
/// retained value or an unused zero, and the next write overwrites it in
/// chronological order.
#[derive(Debug, Clone)]
pub struct WaveformRingBuffer {
    storage: Vec<f32>,
    /// Slot the next write goes to; always in `[0, capacity)`.
    write_cursor: usize,
    /// Logically valid entries (≤ capacity).
    occupied: usize,
}

impl WaveformRingBuffer {
    /// Create a zero-filled buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "WaveformRingBuffer capacity must be > 0");
        Self {
            storage: vec![0.0; capacity],
            write_cursor: 0,
            occupied: 0,
        }
    }

    /// Store `value` in the oldest slot and advance the cursor.  O(1).
    #[inline]
    pub fn write(&mut self, value: f32) {
        let capacity = self.storage.len();
        self.storage[self.write_cursor] = value;
        self.write_cursor = (self.write_cursor + 1) % capacity;
        if self.occupied < capacity {
            self.occupied += 1;
        }
    }

    /// Value `offset` positions before the newest one (`0` = newest).
    ///
    /// Offsets wrap modulo the capacity; slots never written read as `0.0`.
    pub fn get(&self, offset: usize) -> f32 {
        self.storage[slot_for(self.write_cursor, self.storage.len(), offset)]
    }

    /// Change the capacity, keeping the `min(capacity, new_capacity)` most
    /// recent values reachable through [`get`](Self::get).
    ///
    /// No-op when the capacity is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity == 0`.
    pub fn resize(&mut self, new_capacity: usize) {
        assert!(new_capacity > 0, "WaveformRingBuffer capacity must be > 0");
        let capacity = self.storage.len();
        if new_capacity == capacity {
            return;
        }

        let keep = capacity.min(new_capacity);
        let mut storage = vec![0.0; new_capacity];
        for i in 0..keep {
            storage[new_capacity - 1 - i] = self.get(i);
        }

        log::debug!("waveform ring resized {capacity} → {new_capacity} (kept {keep})");
        self.storage = storage;
        self.write_cursor = 0;
        self.occupied = self.occupied.min(new_capacity);
    }

    /// Zero every slot and reset the cursor.
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
        self.write_cursor = 0;
        self.occupied = 0;
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of logically valid entries (never more than the capacity).
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` when nothing has been written since creation or the
    /// last [`clear`](Self::clear).
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Copy of the backing array and cursor.
    pub fn snapshot(&self) -> WaveformSnapshot {
        WaveformSnapshot {
            storage: self.storage.clone(),
            write_cursor: self.write_cursor,
            occupied: self.occupied,
        }
    }
}

#[inline]
fn slot_for(write_cursor: usize, capacity: usize, offset: usize) -> usize {
    (write_cursor + capacity - (offset % capacity) - 1) % capacity
}

// ---------------------------------------------------------------------------
// WaveformSnapshot
// ---------------------------------------------------------------------------

/// Immutable, consistent copy of a ring buffer taken for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSnapshot {
    storage: Vec<f32>,
    write_cursor: usize,
    occupied: usize,
}

impl WaveformSnapshot {
    /// Same indexing as [`WaveformRingBuffer::get`].
    pub fn get(&self, offset: usize) -> f32 {
        self.storage[slot_for(self.write_cursor, self.storage.len(), offset)]
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// The valid entries in chronological order (oldest first).
    pub fn to_vec(&self) -> Vec<f32> {
        (0..self.occupied).rev().map(|offset| self.get(offset)).collect()
    }
}

// ---------------------------------------------------------------------------
// SharedWaveformBuffer
// ---------------------------------------------------------------------------

/// Cheaply clonable handle to a ring buffer shared by a producer thread and
/// a render thread.
///
/// Writes hold the lock only for the O(1) slot update; reads go through
/// [`snapshot`](Self::snapshot) so the renderer never observes a torn
/// cursor/storage pair.
#[derive(Debug, Clone)]
pub struct SharedWaveformBuffer {
    inner: Arc<Mutex<WaveformRingBuffer>>,
}

impl SharedWaveformBuffer {
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WaveformRingBuffer::new(capacity))),
        }
    }

    // A panic on another thread must not take the display down with it.
    fn lock(&self) -> MutexGuard<'_, WaveformRingBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self, value: f32) {
        self.lock().write(value);
    }

    /// Write several values under a single lock acquisition.
    pub fn write_all(&self, values: &[f32]) {
        let mut ring = self.lock();
        for &v in values {
            ring.write(v);
        }
    }

    pub fn resize(&self, new_capacity: usize) {
        self.lock().resize(new_capacity);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn snapshot(&self) -> WaveformSnapshot {
        self.lock().snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
