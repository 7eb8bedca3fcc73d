// Atomic parameters - Lock-free communication UI ↔ Audio thread
// Uses atomic operations to share parameters between threads without locks

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Shortest attack accepted from the UI (seconds)
pub const MIN_ATTACK: f64 = 0.001;

/// Thread-safe f32 parameter using atomic operations
/// Converts f32 to u32 bits for atomic storage
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// Set the value (called from UI thread)
    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get the value (called from audio thread)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Same as [`AtomicF32`] for envelope times, which are kept in f64 seconds
#[derive(Clone)]
pub struct AtomicF64 {
    inner: Arc<AtomicU64>,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f64) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

/// Envelope settings read at trigger time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlValues {
    /// Attack in seconds (> 0)
    pub attack: f64,
    /// Release in seconds (>= 0)
    pub release: f64,
}

/// Slider values shared between the UI and the engine
///
/// The UI writes, the engine reads once per trigger. Cloning shares the
/// same underlying atomics.
#[derive(Clone)]
pub struct SharedControls {
    attack: AtomicF64,
    release: AtomicF64,
    volume: AtomicF32,
}

impl SharedControls {
    pub fn new(attack: f64, release: f64, volume: f32) -> Self {
        let controls = Self {
            attack: AtomicF64::new(MIN_ATTACK),
            release: AtomicF64::new(0.0),
            volume: AtomicF32::new(0.0),
        };
        controls.set_attack(attack);
        controls.set_release(release);
        controls.set_volume(volume);
        controls
    }

    /// Set attack, clamped to at least [`MIN_ATTACK`]
    pub fn set_attack(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { MIN_ATTACK };
        self.attack.set(seconds.max(MIN_ATTACK));
    }

    /// Set release, clamped to be non-negative
    pub fn set_release(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        self.release.set(seconds.max(0.0));
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_finite() { volume } else { 0.0 };
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    pub fn control_values(&self) -> ControlValues {
        ControlValues {
            attack: self.attack.get(),
            release: self.release.get(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new(0.05, 0.3, 0.5)
    }
}
