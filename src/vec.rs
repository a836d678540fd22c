//! Vector helpers that round out the `glam` 2D vector.

use crate::{Fp, Vec2};

#[inline]
pub fn lerp(a: Vec2, b: Vec2, t: Fp) -> Vec2 {
    //! Returns the point a coefficient distance `t` along `a -> b`.
    a + (b - a) * t
}

#[inline]
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    //! Reflects `v` about the unit normal `n`: `v - 2(v . n)n`.
    v - n * (2.0 * v.dot(n))
}

#[inline]
pub fn rotate(v: Vec2, angle: Fp) -> Vec2 {
    //! Rotates `v` counterclockwise by `angle` radians.
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    //! Returns `v` at unit length, or the zero vector for a zero-length `v`.
    let mag2 = v.length_squared();
    if mag2 > 0.0 {
        v * mag2.sqrt().recip()
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, -2.0);
        assert_eq!(lerp(a, b, 0.0), a);
        assert_eq!(lerp(a, b, 1.0), b);
        assert_eq!(lerp(a, b, 0.5), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn reflect_about_axis() {
        let v = reflect(Vec2::new(1.0, -1.0), Vec2::new(0.0, 1.0));
        assert_relative_eq!(v.x, 1.0);
        assert_relative_eq!(v.y, 1.0);
        // reflection preserves length
        assert_relative_eq!(v.length(), Vec2::new(1.0, -1.0).length());
    }

    #[test]
    fn rotate_quarter_turn() {
        let quarter = std::f64::consts::FRAC_PI_2 as Fp;
        let v = rotate(Vec2::new(1.0, 0.0), quarter);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_degenerate_is_zero() {
        assert_eq!(normalize_or_zero(Vec2::ZERO), Vec2::ZERO);
        let n = normalize_or_zero(Vec2::new(3.0, 4.0));
        assert_relative_eq!(n.x, 0.6);
        assert_relative_eq!(n.y, 0.8);
    }
}
