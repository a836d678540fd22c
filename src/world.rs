//! The simulation engine: predicts contacts over one step, resolves the
//! earliest, advances everything else to that moment, and re-queries only
//! the shapes it disturbed.

use crate::broad::{BroadPhase, BruteForce, IndexPair};
use crate::inters::{Intersection, TIME_EPSILON};
use crate::shape::{Shape, ShapeSet};
use crate::swept::FinderTable;
use fnv::FnvBuildHasher;
use indexmap::IndexSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Pending candidate pairs. Insertion-ordered so queue seeding, and with it
/// same-time event ordering, never depends on hash iteration order.
type PairSet = IndexSet<IndexPair, FnvBuildHasher>;

/// Per-frame contact notifications, implemented by the simulation's owner.
pub trait ContactListener {
    /// A contact is about to be handled. Return `false` to veto the physical
    /// resolution, typically because one of the shapes is being expired; the
    /// frame still advances to the contact time either way.
    fn on_contact(&mut self, _inter: &Intersection, _subject: &mut Shape, _object: &mut Shape) -> bool {
        true
    }
    /// A contact was physically resolved.
    fn on_resolve(&mut self, _inter: &Intersection, _subject: &Shape, _object: &Shape) {}
    /// Fired per direction after an accepted resolution, for each
    /// participant whose `collides_with` mask covers the other's group.
    fn on_collision(&mut self, _shape: &Shape, _other: &Shape) {}
}

/// Resolve everything, observe nothing.
impl ContactListener for () {}

/// The shape registry, finder dispatch, and per-step contact loop.
pub struct World {
    shapes: ShapeSet,
    finders: FinderTable,
    matcher: Box<dyn BroadPhase>,
    /// Cap on contacts handled per step. Pathological repeat-collision
    /// configurations stop here instead of spinning; the remainder of the
    /// frame is simply left unresolved.
    pub try_max: usize,
}

impl Default for World {
    fn default() -> World {
        World::new()
    }
}

impl World {
    pub fn new() -> World {
        World::with_matcher(Box::new(BruteForce))
    }
    pub fn with_matcher(matcher: Box<dyn BroadPhase>) -> World {
        World::with_finders(FinderTable::standard(), matcher)
    }
    pub fn with_finders(finders: FinderTable, matcher: Box<dyn BroadPhase>) -> World {
        World {
            shapes: ShapeSet::new(),
            finders,
            matcher,
            try_max: 1000,
        }
    }

    pub fn add(&mut self, shape: Shape) -> u32 {
        //! Registers the shape and returns its assigned id.
        let id = self.shapes.add(shape);
        if let Some(shape) = self.shapes.get(id) {
            self.matcher.on_add(shape);
        }
        id
    }
    pub fn add_all(&mut self, shapes: impl IntoIterator<Item = Shape>) {
        for shape in shapes {
            self.add(shape);
        }
    }

    pub fn prune(&mut self) {
        //! Drops expired shapes, releasing them from the broad phase and
        //! recycling their ids.
        let matcher = &mut self.matcher;
        self.shapes.prune(|shape| matcher.on_expire(shape));
    }

    #[inline]
    pub fn shape(&self, id: u32) -> Option<&Shape> {
        self.shapes.get(id)
    }
    #[inline]
    pub fn shape_mut(&mut self, id: u32) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }
    #[inline]
    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[inline]
    pub fn finders(&self) -> &FinderTable {
        &self.finders
    }
    #[inline]
    pub fn finders_mut(&mut self) -> &mut FinderTable {
        &mut self.finders
    }

    pub fn integrate(&mut self, dt: crate::Fp) {
        //! Derives every live shape's path for the coming step from its
        //! velocity.
        for shape in self.shapes.iter_mut() {
            if !shape.is_expired() {
                shape.apply_velocity(dt);
            }
        }
    }

    pub fn find_intersection(&self, a: u32, b: u32) -> Option<Intersection> {
        //! Direct pair query, outside of any step.
        let a = self.shapes.get(a)?;
        let b = self.shapes.get(b)?;
        self.finders.find(a, b).into_hit()
    }

    pub fn step(&mut self, listener: &mut dyn ContactListener) {
        //! Resolves one step's contacts in physical order, then commits
        //! every surviving shape's `start` to its `end`.
        self.matcher.prepare(&self.shapes);

        let mut pending = PairSet::default();
        self.matcher.all_pairs(&self.shapes, &mut |a, b| {
            pending.insert(IndexPair::new(a.id(), b.id()));
        });

        let mut queue = BinaryHeap::new();
        self.seed_queue(pending.iter(), &mut queue);

        let mut handled = 0;
        while let Some(Reverse(inter)) = queue.pop() {
            if handled >= self.try_max {
                log::debug!(
                    "contact cap {} reached; leaving later contacts unresolved this step",
                    self.try_max
                );
                break;
            }
            handled += 1;

            let (subject_id, object_id) = (inter.subject, inter.object);

            // predictions involving either participant are stale now
            pending.retain(|pair| !pair.has(subject_id) && !pair.has(object_id));

            let resolved = match self.shapes.pair_mut(subject_id, object_id) {
                Some((subject, object)) => {
                    let accepted = listener.on_contact(&inter, subject, object);
                    if accepted {
                        resolve_contact(&inter, subject, object);
                        listener.on_resolve(&inter, subject, object);
                        if subject.collides_with & object.group != 0 {
                            listener.on_collision(subject, object);
                        }
                        if object.collides_with & subject.group != 0 {
                            listener.on_collision(object, subject);
                        }
                    }
                    accepted
                }
                None => false,
            };
            log::trace!(
                "contact t={} #{}/#{} {}",
                inter.time,
                subject_id,
                object_id,
                if resolved { "resolved" } else { "vetoed" }
            );

            // everyone else advances to the contact; resolved participants
            // were already repositioned, vetoed ones move with the crowd
            let skip = if resolved { Some((subject_id, object_id)) } else { None };
            self.shapes.tick(inter.time, skip);

            // surviving predictions shift into the shrunken remaining-time
            // frame; stale ones are rebuilt below from current geometry
            let remaining_inv = 1.0 / (1.0 - inter.time);
            queue = queue
                .into_iter()
                .filter_map(|Reverse(mut queued)| {
                    if queued.involves(subject_id) || queued.involves(object_id) {
                        return None;
                    }
                    queued.time = (queued.time - inter.time) * remaining_inv;
                    if queued.is_valid_time() {
                        Some(Reverse(queued))
                    } else {
                        None
                    }
                })
                .collect();

            // only the two disturbed shapes need fresh candidates; each
            // skips the other so this contact cannot repeat at t=0
            let mut fresh = PairSet::default();
            if let Some(subject) = self.shapes.get(subject_id) {
                if !subject.is_expired() {
                    self.matcher.pairs_with(subject, &self.shapes, &mut |a, b| {
                        let pair = IndexPair::new(a.id(), b.id());
                        if !pair.has(object_id) {
                            fresh.insert(pair);
                        }
                    });
                }
            }
            if let Some(object) = self.shapes.get(object_id) {
                if !object.is_expired() {
                    self.matcher.pairs_with(object, &self.shapes, &mut |a, b| {
                        let pair = IndexPair::new(a.id(), b.id());
                        if !pair.has(subject_id) {
                            fresh.insert(pair);
                        }
                    });
                }
            }
            self.seed_queue(fresh.iter(), &mut queue);
            pending.extend(fresh);
        }

        self.shapes.commit();
    }

    pub fn step_rescan(&mut self, listener: &mut dyn ContactListener) {
        //! Older flavor of [`World::step`] that re-runs the full broad phase
        //! after every accepted resolution instead of re-querying only the
        //! disturbed shapes. Equivalent contact ordering, higher cost.
        self.matcher.prepare(&self.shapes);

        let mut attempt = 0;
        while attempt < self.try_max {
            attempt += 1;

            let mut pending = PairSet::default();
            self.matcher.all_pairs(&self.shapes, &mut |a, b| {
                pending.insert(IndexPair::new(a.id(), b.id()));
            });
            let mut queue = BinaryHeap::new();
            self.seed_queue(pending.iter(), &mut queue);

            let mut resolved = false;
            while let Some(Reverse(inter)) = queue.pop() {
                if let Some((subject, object)) = self.shapes.pair_mut(inter.subject, inter.object) {
                    if listener.on_contact(&inter, subject, object) {
                        resolve_contact(&inter, subject, object);
                        listener.on_resolve(&inter, subject, object);
                        if subject.collides_with & object.group != 0 {
                            listener.on_collision(subject, object);
                        }
                        if object.collides_with & subject.group != 0 {
                            listener.on_collision(object, subject);
                        }
                        resolved = true;
                        break;
                    }
                }
            }
            if !resolved {
                break;
            }
        }

        self.shapes.commit();
    }

    fn seed_queue<'a>(
        &self,
        pairs: impl Iterator<Item = &'a IndexPair>,
        queue: &mut BinaryHeap<Reverse<Intersection>>,
    ) {
        for pair in pairs {
            if let (Some(a), Some(b)) = (self.shapes.get(pair.min), self.shapes.get(pair.max)) {
                if let Some(inter) = self.finders.find(a, b).into_hit() {
                    if inter.is_valid_time() {
                        queue.push(Reverse(inter));
                    }
                }
            }
        }
    }
}

/// Applies the impulse response for an accepted contact, rewriting both
/// shapes' paths for the remainder of the step.
///
/// Zero-mass shapes are immovable anchors: against one, the movable side
/// snaps to its impact position and its remaining displacement reflects
/// under the combined restitution. Between two massive shapes an impulse
/// along the normal exchanges momentum, with tangential motion damped by
/// the larger of the two frictions.
pub fn resolve_contact(inter: &Intersection, subject: &mut Shape, object: &mut Shape) {
    let smass = subject.mass();
    let omass = object.mass();
    if smass == 0.0 && omass == 0.0 {
        return;
    }

    let restitution = subject.restitution * object.restitution * 0.5 + 0.5;
    let friction = subject.friction.max(object.friction);

    if smass == 0.0 {
        let start = inter.impact_position(object);
        let end = inter.future_position(object, restitution);
        object.start = start;
        object.end = end;
        return;
    }
    if omass == 0.0 {
        let start = inter.impact_position(subject);
        let end = inter.future_position(subject, restitution);
        subject.start = start;
        subject.end = end;
        return;
    }

    let mass_sum_inv = 1.0 / (smass + omass);
    let svel = subject.end - subject.start;
    let ovel = object.end - object.start;

    let v = svel - ovel;
    let vn = inter.normal * v.dot(inter.normal);
    let vt = v - vn;
    let vout = vn * restitution + vt * friction;

    let svel = (svel - vout) * (omass * mass_sum_inv);
    let ovel = (ovel + vout) * (smass * mass_sum_inv);

    let si = inter.impact_position(subject);
    let oi = inter.impact_position(object);
    let remaining = 1.0 - inter.time + TIME_EPSILON;
    subject.start = si;
    subject.end = si + svel * remaining;
    object.start = oi;
    object.end = oi + ovel * remaining;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fp, Vec2};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        veto: bool,
        contacts: Vec<(u32, u32, Fp)>,
        resolutions: usize,
        collisions: Vec<(u32, u32)>,
    }
    impl ContactListener for Recorder {
        fn on_contact(&mut self, inter: &Intersection, _: &mut Shape, _: &mut Shape) -> bool {
            self.contacts.push((inter.subject, inter.object, inter.time));
            !self.veto
        }
        fn on_resolve(&mut self, _: &Intersection, _: &Shape, _: &Shape) {
            self.resolutions += 1;
        }
        fn on_collision(&mut self, shape: &Shape, other: &Shape) {
            self.collisions.push((shape.id(), other.id()));
        }
    }

    fn falling_ball() -> Shape {
        let mut ball = Shape::circle(5.0);
        ball.start = Vec2::new(0.0, 100.0);
        ball.end = Vec2::new(0.0, -100.0);
        ball
    }

    #[test]
    fn anchor_resolution_snaps_only_the_movable_side() {
        let mut floor = Shape::plane(0.0, 1.0, 0.0);
        floor.set_mass(0.0);
        let mut ball = falling_ball();

        let inter = FinderTable::standard().find(&floor, &ball).into_hit().unwrap();
        resolve_contact(&inter, &mut floor, &mut ball);

        // the anchor never moves
        assert_eq!(floor.start, Vec2::ZERO);
        assert_eq!(floor.end, Vec2::ZERO);
        // the ball's start snapped to the contact, path reflected upward
        assert_relative_eq!(ball.start.y, 5.0, epsilon = 0.05);
        assert_eq!(ball.end.y > ball.start.y, true);
    }

    #[test]
    fn step_bounces_ball_off_floor() {
        let mut world = World::new();
        let mut floor = Shape::plane(0.0, 1.0, 0.0);
        floor.set_mass(0.0);
        let floor_id = world.add(floor);
        let ball_id = world.add(falling_ball());

        let mut recorder = Recorder::default();
        world.step(&mut recorder);

        assert_eq!(recorder.contacts.len(), 1);
        assert_eq!(recorder.resolutions, 1);
        assert_relative_eq!(recorder.contacts[0].2, 0.475, epsilon = 1e-3);

        let floor = world.shape(floor_id).unwrap();
        assert_eq!(floor.start, Vec2::ZERO);
        let ball = world.shape(ball_id).unwrap();
        // committed above the surface, having bounced
        assert_eq!(ball.start.y > 5.0, true);
        assert_relative_eq!(ball.start.y, 110.0, epsilon = 0.5);
    }

    #[test]
    fn veto_lets_the_ball_pass_through() {
        let mut world = World::new();
        let mut floor = Shape::plane(0.0, 1.0, 0.0);
        floor.set_mass(0.0);
        world.add(floor);
        let ball_id = world.add(falling_ball());

        let mut recorder = Recorder { veto: true, ..Recorder::default() };
        world.step(&mut recorder);

        assert_eq!(recorder.contacts.len(), 1);
        assert_eq!(recorder.resolutions, 0);
        assert_eq!(recorder.collisions.len(), 0);
        // the frame still ran to completion on the original path
        let ball = world.shape(ball_id).unwrap();
        assert_relative_eq!(ball.start.y, -100.0);
    }

    #[test]
    fn events_resolve_in_renormalized_time_order() {
        let mut world = World::new();
        let mut hub = Shape::circle(10.0);
        hub.set_mass(0.0);
        let hub_id = world.add(hub);

        let mut near = Shape::circle(10.0);
        near.start = Vec2::new(100.0, 0.0);
        near.end = Vec2::new(0.0, 0.0);
        let near_id = world.add(near);

        let mut far = Shape::circle(10.0);
        far.start = Vec2::new(0.0, 200.0);
        far.end = Vec2::new(0.0, 0.0);
        let far_id = world.add(far);

        let mut recorder = Recorder::default();
        world.step(&mut recorder);

        // near strikes at 0.8; far was due at 0.9, which renormalizes to
        // 0.5 of the remaining fifth of the step
        assert_eq!(recorder.contacts.len(), 2);
        let (s0, o0, t0) = recorder.contacts[0];
        let (s1, o1, t1) = recorder.contacts[1];
        assert_eq!(IndexPair::new(s0, o0), IndexPair::new(hub_id, near_id));
        assert_eq!(IndexPair::new(s1, o1), IndexPair::new(hub_id, far_id));
        assert_relative_eq!(t0, 0.8, epsilon = 1e-3);
        assert_relative_eq!(t1, 0.5, epsilon = 1e-2);
    }

    #[test]
    fn contact_cap_bounds_a_bounce_storm() {
        let mut world = World::new();
        world.try_max = 8;

        let mut floor = Shape::plane(0.0, 1.0, 0.0);
        floor.set_mass(0.0);
        world.add(floor);
        let mut ceiling = Shape::plane(0.0, -1.0, 20.0);
        ceiling.set_mass(0.0);
        world.add(ceiling);

        // fast enough to bounce between the planes far more than 8 times
        let mut ball = Shape::circle(5.0);
        ball.start = Vec2::new(0.0, 10.0);
        ball.end = Vec2::new(0.0, -10000.0);
        let ball_id = world.add(ball);

        let mut recorder = Recorder::default();
        world.step(&mut recorder);

        // the cap bounds the frame; later contacts are simply dropped
        assert_eq!(recorder.contacts.len(), 8);
        let ball = world.shape(ball_id).unwrap();
        assert_eq!(ball.start.y.is_finite(), true);
    }

    #[test]
    fn equal_masses_push_apart() {
        let mut world = World::new();
        let mut a = Shape::circle(10.0);
        a.start = Vec2::new(0.0, 0.0);
        a.end = Vec2::new(50.0, 0.0);
        let a_id = world.add(a);
        let mut b = Shape::circle(10.0);
        b.start = Vec2::new(100.0, 0.0);
        b.end = Vec2::new(50.0, 0.0);
        let b_id = world.add(b);

        world.step(&mut ());

        let a = world.shape(a_id).unwrap();
        let b = world.shape(b_id).unwrap();
        assert_eq!(a.start.x < 40.0, true);
        assert_eq!(b.start.x > 60.0, true);
        // the exchange is symmetric
        assert_relative_eq!(a.start.x + b.start.x, 100.0, epsilon = 0.1);
    }

    #[test]
    fn collision_notification_follows_masks() {
        let mut world = World::new();
        let mut a = Shape::circle(10.0);
        a.start = Vec2::new(0.0, 0.0);
        a.end = Vec2::new(50.0, 0.0);
        a.group = 0b001;
        a.collides_with = 0b010;
        let a_id = world.add(a);
        let mut b = Shape::circle(10.0);
        b.start = Vec2::new(100.0, 0.0);
        b.end = Vec2::new(50.0, 0.0);
        b.group = 0b010;
        b.collides_with = 0b100; // does not care about a's group
        let b_id = world.add(b);

        let mut recorder = Recorder::default();
        world.step(&mut recorder);

        assert_eq!(recorder.resolutions, 1);
        assert_eq!(recorder.collisions, vec![(a_id, b_id)]);
    }

    #[test]
    fn no_finder_no_result() {
        let mut world = World::with_finders(FinderTable::empty(), Box::new(BruteForce));
        let floor = world.add(Shape::plane(0.0, 1.0, 0.0));
        let ball = world.add(falling_ball());

        assert_eq!(world.find_intersection(floor, ball).is_none(), true);

        let mut recorder = Recorder::default();
        world.step(&mut recorder);
        assert_eq!(recorder.contacts.len(), 0);
    }

    #[test]
    fn rescan_variant_matches_event_order() {
        let mut world = World::new();
        let mut hub = Shape::circle(10.0);
        hub.set_mass(0.0);
        let hub_id = world.add(hub);
        let mut near = Shape::circle(10.0);
        near.start = Vec2::new(100.0, 0.0);
        near.end = Vec2::new(0.0, 0.0);
        let near_id = world.add(near);

        let mut recorder = Recorder::default();
        world.step_rescan(&mut recorder);

        assert_eq!(recorder.resolutions >= 1, true);
        let (s, o, t) = recorder.contacts[0];
        assert_eq!(IndexPair::new(s, o), IndexPair::new(hub_id, near_id));
        assert_relative_eq!(t, 0.8, epsilon = 1e-3);
    }

    #[test]
    fn expired_shapes_leave_the_world_on_prune() {
        let mut world = World::new();
        let a = world.add(Shape::circle(1.0));
        world.add(Shape::circle(2.0));
        world.shape_mut(a).unwrap().expire();
        world.prune();
        assert_eq!(world.len(), 1);
        assert_eq!(world.shape(a).is_none(), true);

        // the freed id is handed to the next arrival
        let again = world.add(Shape::circle(3.0));
        assert_eq!(again, a);
    }

    #[test]
    fn integrate_builds_paths_from_velocity() {
        let mut world = World::new();
        let mut ball = Shape::circle(1.0);
        ball.reset(Vec2::new(1.0, 1.0));
        ball.vel = Vec2::new(4.0, 0.0);
        let id = world.add(ball);

        world.integrate(0.25);
        let ball = world.shape(id).unwrap();
        assert_eq!(ball.end, Vec2::new(2.0, 1.0));
    }
}
