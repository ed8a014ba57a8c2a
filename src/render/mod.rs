//! Render adapter contract
//!
//! The engine never paints anything itself; each tick it hands every moving
//! reel's wrapped offset and a blur intensity to a `RenderAdapter`.

#[cfg(target_arch = "wasm32")]
pub mod dom;

#[cfg(target_arch = "wasm32")]
pub use dom::DomReelAdapter;

use crate::ReelId;

/// Paints a reel at a given scroll offset
pub trait RenderAdapter {
    /// `offset_px` is in [0, cycle_length); `blur` is in [0, max_blur]
    fn set_offset(&mut self, reel: ReelId, offset_px: f64, blur: f64);
}

/// Motion blur for a reel moving at `velocity`
///
/// Monotonic in velocity, reaching `max_blur` at `cruise_speed` and clamped there.
pub fn blur_intensity(velocity: f64, cruise_speed: f64, max_blur: f64) -> f64 {
    if !(cruise_speed > 0.0) || !velocity.is_finite() || velocity <= 0.0 {
        return 0.0;
    }
    (velocity / cruise_speed).min(1.0) * max_blur.max(0.0)
}

/// Records every painted frame in order; used by the native demo and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingAdapter {
    pub frames: Vec<(ReelId, f64, f64)>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent offset painted for `reel`
    pub fn last_offset(&self, reel: ReelId) -> Option<f64> {
        self.frames
            .iter()
            .rev()
            .find(|(id, _, _)| *id == reel)
            .map(|(_, offset, _)| *offset)
    }
}

impl RenderAdapter for RecordingAdapter {
    fn set_offset(&mut self, reel: ReelId, offset_px: f64, blur: f64) {
        self.frames.push((reel, offset_px, blur));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_is_monotonic_and_clamped() {
        let mut last = 0.0;
        for v in [0.0, 100.0, 900.0, 2999.0, 3000.0, 6000.0] {
            let blur = blur_intensity(v, 3000.0, 6.0);
            assert!(blur >= last);
            assert!(blur <= 6.0);
            last = blur;
        }
        assert_eq!(blur_intensity(6000.0, 3000.0, 6.0), 6.0);
        assert_eq!(blur_intensity(f64::NAN, 3000.0, 6.0), 0.0);
    }

    #[test]
    fn test_recording_adapter_last_offset() {
        let mut adapter = RecordingAdapter::new();
        adapter.set_offset(1, 10.0, 0.0);
        adapter.set_offset(2, 20.0, 0.0);
        adapter.set_offset(1, 30.0, 0.0);
        assert_eq!(adapter.last_offset(1), Some(30.0));
        assert_eq!(adapter.last_offset(3), None);
    }
}
