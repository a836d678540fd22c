//! Candidate-pair enumeration ahead of the exact sweep solvers.

use crate::shape::{Shape, ShapeSet};

// ---------- IndexPair ---------- //

/// An unordered pair of shape ids, normalized to (min, max). Used as the
/// dedup key for pending candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPair {
    pub min: u32,
    pub max: u32,
}

impl IndexPair {
    #[inline]
    pub fn new(a: u32, b: u32) -> IndexPair {
        if a <= b {
            IndexPair { min: a, max: b }
        } else {
            IndexPair { min: b, max: a }
        }
    }

    #[inline]
    pub fn has(&self, id: u32) -> bool {
        self.min == id || self.max == id
    }
}

// ---------- Broad phase ---------- //

/// Narrows all shapes down to the pairs worth running exact sweeps on.
///
/// Implementations must enumerate exactly the unordered pairs passing
/// [`Shape::can_collide`], visiting each once and never yielding expired
/// shapes. The add/expire/prepare hooks exist for spatial structures to
/// maintain and rebuild their bookkeeping; a drop-in replacement must keep
/// both query contracts and the filter semantics intact.
pub trait BroadPhase {
    /// A shape entered the registry.
    fn on_add(&mut self, _shape: &Shape) {}
    /// An expired shape is being dropped from the registry.
    fn on_expire(&mut self, _shape: &Shape) {}
    /// Called once per frame before any matching.
    fn prepare(&mut self, _shapes: &ShapeSet) {}

    /// Every candidate pair, each visited once.
    fn all_pairs(&self, shapes: &ShapeSet, found: &mut dyn FnMut(&Shape, &Shape));
    /// Candidate pairs involving `subject`, used to re-query after an event.
    fn pairs_with(&self, subject: &Shape, shapes: &ShapeSet, found: &mut dyn FnMut(&Shape, &Shape));
}

/// The reference broad phase: no bookkeeping, every live pair checked
/// against the filter. O(n^2) per full pass, O(n) per single-shape query.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForce;

impl BroadPhase for BruteForce {
    fn all_pairs(&self, shapes: &ShapeSet, found: &mut dyn FnMut(&Shape, &Shape)) {
        let mut ahead = shapes.iter();
        while let Some(a) = ahead.next() {
            if a.is_expired() {
                continue;
            }
            for b in ahead.clone() {
                if !b.is_expired() && Shape::can_collide(a, b) {
                    found(a, b);
                }
            }
        }
    }

    fn pairs_with(&self, subject: &Shape, shapes: &ShapeSet, found: &mut dyn FnMut(&Shape, &Shape)) {
        if subject.is_expired() {
            return;
        }
        for b in shapes.iter() {
            if b.id() != subject.id() && !b.is_expired() && Shape::can_collide(subject, b) {
                found(subject, b);
            }
        }
    }
}
