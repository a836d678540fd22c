//! The result of a pairwise time-of-impact query.

use crate::{vec, Fp, Shape, Vec2};
use std::cmp::Ordering;

/// Margin subtracted from impact times when positioning shapes, landing them
/// just shy of contact so the same contact does not re-trigger next step.
pub const TIME_EPSILON: Fp = 0.0001;

/// A contact predicted between two swept shapes.
///
/// The pair is asymmetric: the solver held the `subject` stationary and swept
/// the `object` through its rest frame, and the normal points from the
/// subject's surface toward the object. `time` is the fraction of the step at
/// which the shapes first touch; values outside `[0, 1)` mean the pair is
/// either already overlapping (negative) or only touches beyond this step.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub subject: u32,
    pub object: u32,
    pub time: Fp,
    pub normal: Vec2,
    pub contact: Vec2,
}

impl Intersection {
    pub fn new(subject: &Shape, object: &Shape, time: Fp, normal: Vec2, contact: Vec2) -> Intersection {
        Intersection {
            subject: subject.id(),
            object: object.id(),
            time,
            normal,
            contact,
        }
    }

    #[inline]
    pub fn is_valid_time(&self) -> bool {
        //! Whether the contact is actionable within this step.
        self.time >= 0.0 && self.time < 1.0 && self.is_finite_time()
    }
    #[inline]
    pub fn is_finite_time(&self) -> bool {
        self.time.is_finite()
    }

    #[inline]
    pub fn involves(&self, id: u32) -> bool {
        self.subject == id || self.object == id
    }
    #[inline]
    pub fn other(&self, id: u32) -> u32 {
        //! The participant that is not `id`.
        if self.subject == id { self.object } else { self.subject }
    }

    pub fn impact_position(&self, shape: &Shape) -> Vec2 {
        //! Where `shape` sits along its own path at the moment of contact,
        //! an epsilon early.
        vec::lerp(shape.start, shape.end, self.time - TIME_EPSILON)
    }

    pub fn future_position(&self, shape: &Shape, restitution: Fp) -> Vec2 {
        //! Where `shape` ends up after bouncing: its remaining displacement
        //! reflected about the contact normal, scaled by `restitution` over
        //! the remaining fraction of the step.
        let remaining = 1.0 - self.time + TIME_EPSILON;
        let bounce = vec::reflect(shape.end - shape.start, self.normal) * (remaining * restitution);
        self.impact_position(shape) + bounce
    }

    #[inline]
    fn id_pair(&self) -> (u32, u32) {
        if self.subject <= self.object {
            (self.subject, self.object)
        } else {
            (self.object, self.subject)
        }
    }
}

// Ordered by time, earliest first. Exact time ties break on the lowest id
// pair so event ordering never depends on container internals.
impl Ord for Intersection {
    fn cmp(&self, other: &Intersection) -> Ordering {
        self.time
            .partial_cmp(&other.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id_pair().cmp(&other.id_pair()))
    }
}
impl PartialOrd for Intersection {
    fn partial_cmp(&self, other: &Intersection) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Intersection {
    fn eq(&self, other: &Intersection) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Intersection {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inter(subject: u32, object: u32, time: Fp) -> Intersection {
        Intersection {
            subject,
            object,
            time,
            normal: Vec2::new(0.0, 1.0),
            contact: Vec2::ZERO,
        }
    }

    #[test]
    fn time_validity() {
        assert_eq!(inter(0, 1, 0.0).is_valid_time(), true);
        assert_eq!(inter(0, 1, 0.999).is_valid_time(), true);
        assert_eq!(inter(0, 1, 1.0).is_valid_time(), false);
        assert_eq!(inter(0, 1, -0.25).is_valid_time(), false);
        assert_eq!(inter(0, 1, Fp::NAN).is_valid_time(), false);
        assert_eq!(inter(0, 1, Fp::INFINITY).is_finite_time(), false);
        assert_eq!(inter(0, 1, -3.0).is_finite_time(), true);
    }

    #[test]
    fn ordering_by_time_then_ids() {
        let early = inter(4, 5, 0.25);
        let late = inter(0, 1, 0.75);
        assert_eq!(early < late, true);

        // ties fall back to the lowest id pair, orientation ignored
        let a = inter(2, 7, 0.5);
        let b = inter(3, 1, 0.5);
        assert_eq!(b < a, true);
        assert_eq!(inter(7, 2, 0.5) == a, true);
    }

    #[test]
    fn impact_position_lands_just_before_contact() {
        let mut s = Shape::circle(1.0);
        s.start = Vec2::new(0.0, 0.0);
        s.end = Vec2::new(100.0, 0.0);
        let i = inter(0, 1, 0.5);
        let at = i.impact_position(&s);
        assert_relative_eq!(at.x, 50.0 - 100.0 * TIME_EPSILON, epsilon = 1e-3);
        assert_eq!(at.x < 50.0, true);
    }

    #[test]
    fn future_position_reflects_remaining_path() {
        // straight down onto a floor normal, elastic
        let mut s = Shape::circle(1.0);
        s.start = Vec2::new(0.0, 10.0);
        s.end = Vec2::new(0.0, -10.0);
        let i = inter(0, 1, 0.5);
        let future = i.future_position(&s, 1.0);
        // the remaining half of the drop turns back upward
        assert_relative_eq!(future.x, 0.0);
        assert_relative_eq!(future.y, 10.0, epsilon = 0.01);
    }
}
