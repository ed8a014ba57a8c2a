//! Easing curves and scalar helpers
//!
//! All curves map [0, 1] onto [0, 1] and clamp their input.

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub fn clamp01(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Quadratic ease-out
#[inline]
pub fn ease_out_quad(t: f64) -> f64 {
    let t = clamp01(t);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Cubic ease-out
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - clamp01(t);
    1.0 - inv * inv * inv
}

/// Exponential ease-out, exact at both ends
#[inline]
pub fn ease_out_expo(t: f64) -> f64 {
    let t = clamp01(t);
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curves_hit_endpoints() {
        for ease in [ease_out_quad, ease_out_cubic, ease_out_expo] {
            assert_eq!(ease(0.0), 0.0);
            assert_eq!(ease(1.0), 1.0);
            assert_eq!(ease(-3.0), 0.0);
            assert_eq!(ease(7.0), 1.0);
        }
    }

    #[test]
    fn test_ease_out_is_front_loaded() {
        assert!(ease_out_quad(0.5) > 0.5);
        assert!(ease_out_cubic(0.5) > ease_out_quad(0.5));
        assert!(ease_out_expo(0.5) > ease_out_cubic(0.5));
    }

    #[test]
    fn test_clamp01_nan() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(lerp(400.0, 3000.0, 0.5), 1700.0);
    }
}
