//! Pairwise swept time-of-impact solvers and their dispatch table.
//!
//! Every solver is written against one stationary shape: [`Finder::find`]
//! shifts the object's path into the subject's rest frame before solving,
//! then maps the contact point back into world space afterward. A
//! two-moving-shape problem therefore never appears below this point.

use crate::shape::{ShapeKind, KIND_COUNT, PLANE_THICKNESS};
use crate::{vec, Fp, Intersection, Shape, Vec2};

// ---------- Sweep outcome ---------- //

/// Outcome of a pairwise sweep query.
#[derive(Debug, Clone)]
pub enum Sweep {
    /// A contact along the step. The time may fall outside `[0, 1)`; see
    /// [`Intersection::is_valid_time`].
    Hit(Intersection),
    /// The pair cannot touch within this step.
    Clear,
    /// Geometry too degenerate to solve: a zero-length relative path, a zero
    /// radius sum, parallel lines. Callers treat this like [`Sweep::Clear`];
    /// the distinction exists for diagnostics.
    Degenerate,
}

impl Sweep {
    #[inline]
    pub fn into_hit(self) -> Option<Intersection> {
        match self {
            Sweep::Hit(inter) => Some(inter),
            _ => None,
        }
    }
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, Sweep::Hit(_))
    }
}

// ---------- Finder dispatch ---------- //

/// A rest-frame solver: subject, object, and the object's relative path.
pub type SolveFn = fn(&Shape, &Shape, Vec2, Vec2) -> Sweep;

/// A solver bound to its canonical (subject kind, object kind) roles.
#[derive(Clone, Copy)]
pub struct Finder {
    subject: usize,
    object: usize,
    solve: SolveFn,
}

impl Finder {
    pub fn new(subject: usize, object: usize, solve: SolveFn) -> Finder {
        Finder { subject, object, solve }
    }

    #[inline]
    pub fn subject_tag(&self) -> usize {
        self.subject
    }
    #[inline]
    pub fn object_tag(&self) -> usize {
        self.object
    }

    pub fn find(&self, a: &Shape, b: &Shape) -> Sweep {
        //! Orients the unordered pair into this finder's canonical roles,
        //! solves with the subject held stationary, and restores the
        //! subject's own motion to the contact point.
        let ordered = a.kind.tag() == self.subject;
        let (subject, object) = if ordered { (a, b) } else { (b, a) };

        // the object's path with the subject's displacement removed
        let rel_start = object.start;
        let rel_end = object.end + (subject.start - subject.end);

        match (self.solve)(subject, object, rel_start, rel_end) {
            Sweep::Hit(mut inter) => {
                if inter.is_finite_time() {
                    // the solver placed the contact with the subject frozen
                    // at its start; add back what it moved by impact time
                    inter.contact += inter.impact_position(subject) - subject.start;
                }
                Sweep::Hit(inter)
            }
            miss => miss,
        }
    }
}

/// Symmetric kind-by-kind dispatch table. Owned by whichever engine uses it,
/// so separate engines can carry separate solver sets.
#[derive(Clone)]
pub struct FinderTable {
    table: [[Option<Finder>; KIND_COUNT]; KIND_COUNT],
}

impl FinderTable {
    pub fn empty() -> FinderTable {
        FinderTable { table: [[None; KIND_COUNT]; KIND_COUNT] }
    }

    pub fn standard() -> FinderTable {
        //! The full stock solver set, one per supported kind pair.
        let mut finders = FinderTable::empty();
        finders.insert(Finder::new(ShapeKind::CIRCLE, ShapeKind::CIRCLE, circle_circle));
        finders.insert(Finder::new(ShapeKind::PLANE, ShapeKind::CIRCLE, plane_circle));
        finders.insert(Finder::new(ShapeKind::PLANE, ShapeKind::RECT, plane_rect));
        finders.insert(Finder::new(ShapeKind::RECT, ShapeKind::CIRCLE, rect_circle));
        finders.insert(Finder::new(ShapeKind::RECT, ShapeKind::RECT, rect_rect));
        finders
    }

    pub fn insert(&mut self, finder: Finder) {
        //! Installs the finder for its kind pair, in both orientations.
        self.table[finder.subject][finder.object] = Some(finder);
        self.table[finder.object][finder.subject] = Some(finder);
    }

    #[inline]
    pub fn get(&self, a: &ShapeKind, b: &ShapeKind) -> Option<&Finder> {
        self.table[a.tag()][b.tag()].as_ref()
    }

    pub fn find(&self, a: &Shape, b: &Shape) -> Sweep {
        //! Runs the installed solver for the pair's kinds. A pair with no
        //! installed solver never intersects.
        match self.get(&a.kind, &b.kind) {
            Some(finder) => finder.find(a, b),
            None => Sweep::Clear,
        }
    }
}

impl Default for FinderTable {
    fn default() -> FinderTable {
        FinderTable::standard()
    }
}

// ---------- Solvers ---------- //

pub fn circle_circle(subject: &Shape, object: &Shape, start: Vec2, end: Vec2) -> Sweep {
    //! Fixed circle against a swept circle.
    let (srad, orad) = match (&subject.kind, &object.kind) {
        (ShapeKind::Circle { rad: s }, ShapeKind::Circle { rad: o }) => (*s, *o),
        _ => return Sweep::Clear,
    };
    let fixed = subject.start;
    let d = end - start;
    let sq = d.length_squared();
    if sq == 0.0 {
        return Sweep::Degenerate; // no relative motion
    }

    // closest approach of the path line to the fixed center;
    // 0 = path start, 1 = path end
    let delta = (fixed - start).dot(d) / sq;
    if delta < 0.0 {
        return Sweep::Clear; // receding
    }

    let closest = start + d * delta;
    let cdsq = (closest - fixed).length_squared();
    let rsum = srad + orad;
    if cdsq > rsum * rsum {
        return Sweep::Clear; // passes wide
    }
    if rsum == 0.0 {
        return Sweep::Degenerate;
    }

    // back up from the closest approach by the half-chord the combined
    // radius spans across the path
    let side = (rsum * rsum - cdsq).sqrt();
    let time = delta - side / sq.sqrt();

    let center = start + d * time;
    let normal = (center - fixed) / rsum;
    let contact = center - normal * orad;
    Sweep::Hit(Intersection::new(subject, object, time, normal, contact))
}

pub fn plane_circle(subject: &Shape, object: &Shape, start: Vec2, end: Vec2) -> Sweep {
    //! Fixed half-space boundary against a swept circle.
    let ((a, b, c), rad) = match (&subject.kind, &object.kind) {
        (ShapeKind::Plane { a, b, c }, ShapeKind::Circle { rad }) => ((*a, *b, *c), *rad),
        _ => return Sweep::Clear,
    };
    let d0 = a * start.x + b * start.y + c;
    let d1 = a * end.x + b * end.y + c;

    // already penetrating at the start, or never arriving by the end
    if d0 < rad || d1 > rad {
        return Sweep::Clear;
    }
    if d0 == d1 {
        return Sweep::Degenerate; // path parallel to the surface
    }

    // signed distance is linear along the path; contact when it shrinks to
    // the radius plus the surface's thickness
    let reach = rad + PLANE_THICKNESS;
    let time = (d0 - reach) / (d0 - d1);
    let normal = Vec2::new(a, b);
    let contact = vec::lerp(start, end, time) - normal * reach;
    Sweep::Hit(Intersection::new(subject, object, time, normal, contact))
}

pub fn plane_rect(subject: &Shape, object: &Shape, start: Vec2, end: Vec2) -> Sweep {
    //! Fixed half-space boundary against a swept box, corner by corner.
    let ((a, b, c), (left, top, right, bottom)) = match (&subject.kind, &object.kind) {
        (ShapeKind::Plane { a, b, c }, ShapeKind::Rect { left, top, right, bottom }) => {
            ((*a, *b, *c), (*left, *top, *right, *bottom))
        }
        _ => return Sweep::Clear,
    };
    let dist = |p: Vec2| a * p.x + b * p.y + c;
    let corners = [
        Vec2::new(left, top),
        Vec2::new(left, bottom),
        Vec2::new(right, top),
        Vec2::new(right, bottom),
    ];

    // a start corner already through the surface means overlap, not contact
    if corners.iter().any(|&e| dist(start + e) < 0.0) {
        return Sweep::Clear;
    }
    // no end corner ever crosses
    if corners.iter().all(|&e| dist(end + e) >= 0.0) {
        return Sweep::Clear;
    }

    let d = end - start;
    let slope = a * d.x + b * d.y;
    if slope == 0.0 {
        return Sweep::Degenerate;
    }

    // every corner closes on the surface at the same rate; the first one
    // across decides the contact
    let mut first_time = 1.0;
    let mut first = Vec2::ZERO;
    let mut found = false;
    for &e in corners.iter() {
        let corner = start + e;
        let time = -dist(corner) / slope;
        if time < first_time {
            first_time = time;
            first = corner + d * time;
            found = true;
        }
    }
    if !found {
        return Sweep::Clear;
    }
    Sweep::Hit(Intersection::new(subject, object, first_time, Vec2::new(a, b), first))
}

pub fn rect_circle(subject: &Shape, object: &Shape, start: Vec2, end: Vec2) -> Sweep {
    //! Fixed box against a swept circle: face crossings first, then corners.
    let ((left, top, right, bottom), rad) = match (&subject.kind, &object.kind) {
        (ShapeKind::Rect { left, top, right, bottom }, ShapeKind::Circle { rad }) => {
            ((*left, *top, *right, *bottom), *rad)
        }
        _ => return Sweep::Clear,
    };
    let center = subject.start;
    let l = left + center.x;
    let r = right + center.x;
    let t = top + center.y;
    let b = bottom + center.y;

    // the path's bounding box, grown by the radius, must reach the box
    if start.x.max(end.x) + rad < l
        || start.x.min(end.x) - rad > r
        || start.y.max(end.y) + rad < t
        || start.y.min(end.y) - rad > b
    {
        return Sweep::Clear;
    }

    let d = end - start;
    let invdx = if d.x == 0.0 { 0.0 } else { 1.0 / d.x };
    let invdy = if d.y == 0.0 { 0.0 } else { 1.0 / d.y };

    // face planes pushed out by the radius; a hit must land within the face
    // span and be travelling inward
    let ltime = ((l - rad) - start.x) * invdx;
    if ltime >= 0.0 && ltime <= 1.0 && d.x > 0.0 {
        let ly = d.y * ltime + start.y;
        if ly >= t && ly <= b {
            return Sweep::Hit(Intersection::new(
                subject, object, ltime, Vec2::new(-1.0, 0.0), Vec2::new(l, ly),
            ));
        }
    }
    let rtime = (start.x - (r + rad)) * -invdx;
    if rtime >= 0.0 && rtime <= 1.0 && d.x < 0.0 {
        let ry = d.y * rtime + start.y;
        if ry >= t && ry <= b {
            return Sweep::Hit(Intersection::new(
                subject, object, rtime, Vec2::new(1.0, 0.0), Vec2::new(r, ry),
            ));
        }
    }
    let ttime = ((t - rad) - start.y) * invdy;
    if ttime >= 0.0 && ttime <= 1.0 && d.y > 0.0 {
        let tx = d.x * ttime + start.x;
        if tx >= l && tx <= r {
            return Sweep::Hit(Intersection::new(
                subject, object, ttime, Vec2::new(0.0, -1.0), Vec2::new(tx, t),
            ));
        }
    }
    let btime = (start.y - (b + rad)) * -invdy;
    if btime >= 0.0 && btime <= 1.0 && d.y < 0.0 {
        let bx = d.x * btime + start.x;
        if bx >= l && bx <= r {
            return Sweep::Hit(Intersection::new(
                subject, object, btime, Vec2::new(0.0, 1.0), Vec2::new(bx, b),
            ));
        }
    }

    // corner case: sweep the center against each corner's radius circle and
    // keep the earliest entry within the step
    let len = d.length();
    if len == 0.0 {
        return Sweep::Degenerate;
    }
    let unit = d / len;
    let mut best: Option<(Fp, Vec2)> = None;
    for &corner in [Vec2::new(l, t), Vec2::new(l, b), Vec2::new(r, t), Vec2::new(r, b)].iter() {
        let vo = start - corner;
        let dot = unit.dot(vo);
        let discr = rad * rad + dot * dot - vo.length_squared();
        if discr > 0.0 {
            // tangential passes are not contacts
            let time = -(dot + discr.sqrt()) / len;
            if time >= 0.0 && time <= 1.0 && best.map_or(true, |(t0, _)| time < t0) {
                best = Some((time, corner));
            }
        }
    }
    match best {
        Some((time, corner)) => {
            let at = start + d * time;
            let normal = (at - corner) / rad;
            Sweep::Hit(Intersection::new(subject, object, time, normal, corner))
        }
        None => Sweep::Clear,
    }
}

pub fn rect_rect(subject: &Shape, object: &Shape, start: Vec2, end: Vec2) -> Sweep {
    //! Fixed box against a swept box. The fixed box's faces are grown by the
    //! swept box's extents so only the swept center needs tracing.
    let ((sl, st, sr, sb), (ol, ot, or, ob)) = match (&subject.kind, &object.kind) {
        (
            ShapeKind::Rect { left: sl, top: st, right: sr, bottom: sb },
            ShapeKind::Rect { left: ol, top: ot, right: or, bottom: ob },
        ) => ((*sl, *st, *sr, *sb), (*ol, *ot, *or, *ob)),
        _ => return Sweep::Clear,
    };
    let center = subject.start;
    let l = sl + center.x;
    let r = sr + center.x;
    let t = st + center.y;
    let b = sb + center.y;

    // the path's bounding box, grown by the object's extents, must reach
    if start.x.max(end.x) + or < l
        || start.x.min(end.x) + ol > r
        || start.y.max(end.y) + ob < t
        || start.y.min(end.y) + ot > b
    {
        return Sweep::Clear;
    }
    // already overlapping at the start means no new contact this step
    if !(start.x + or < l || start.x + ol > r || start.y + ob < t || start.y + ot > b) {
        return Sweep::Clear;
    }

    let d = end - start;
    let invdx = if d.x == 0.0 { 0.0 } else { 1.0 / d.x };
    let invdy = if d.y == 0.0 { 0.0 } else { 1.0 / d.y };
    let diag = (0.5 as Fp).sqrt();
    let hit = |time, normal, contact| Sweep::Hit(Intersection::new(subject, object, time, normal, contact));

    // Left face: the object's right edge crosses the box's left bound.
    if start.x + or < l && end.x + or > l {
        let ltime = ((l - or) - start.x) * invdx;
        if ltime >= 0.0 && ltime <= 1.0 {
            let ly = d.y * ltime + start.y;
            let ly_t = ly + ot;
            let ly_b = ly + ob;
            if ly_t < b && ly_b > t {
                return hit(ltime, Vec2::new(-1.0, 0.0), Vec2::new(l, ly.clamp(t, b)));
            } else if ly_b == t {
                // exactly grazing the top-left corner
                return hit(ltime, Vec2::new(-diag, -diag), Vec2::new(l, ly_b));
            } else if ly_t == b {
                return hit(ltime, Vec2::new(-diag, diag), Vec2::new(l, ly_t));
            }
        }
    }

    // Right face.
    if start.x + ol > r && end.x + ol < r {
        let rtime = (start.x - (r - ol)) * -invdx;
        if rtime >= 0.0 && rtime <= 1.0 {
            let ry = d.y * rtime + start.y;
            let ry_t = ry + ot;
            let ry_b = ry + ob;
            if ry_b > t && ry_t < b {
                return hit(rtime, Vec2::new(1.0, 0.0), Vec2::new(r, ry.clamp(t, b)));
            } else if ry_b == t {
                return hit(rtime, Vec2::new(diag, -diag), Vec2::new(r, ry_b));
            } else if ry_t == b {
                return hit(rtime, Vec2::new(diag, diag), Vec2::new(r, ry_t));
            }
        }
    }

    // Top face.
    if start.y + ob < t && end.y + ob > t {
        let ttime = ((t - ob) - start.y) * invdy;
        if ttime >= 0.0 && ttime <= 1.0 {
            let tx = d.x * ttime + start.x;
            let tx_l = tx + ol;
            let tx_r = tx + or;
            if tx_r > l && tx_l < r {
                return hit(ttime, Vec2::new(0.0, -1.0), Vec2::new(tx.clamp(l, r), t));
            } else if tx_r == l {
                return hit(ttime, Vec2::new(-diag, -diag), Vec2::new(tx_r, t));
            } else if tx_l == r {
                return hit(ttime, Vec2::new(diag, -diag), Vec2::new(tx_l, t));
            }
        }
    }

    // Bottom face.
    if start.y + ot > b && end.y + ot < b {
        let btime = (start.y - (b - ot)) * -invdy;
        if btime >= 0.0 && btime <= 1.0 {
            let bx = d.x * btime + start.x;
            let bx_l = bx + ol;
            let bx_r = bx + or;
            if bx_r > l && bx_l < r {
                return hit(btime, Vec2::new(0.0, 1.0), Vec2::new(bx.clamp(l, r), b));
            } else if bx_r == l {
                return hit(btime, Vec2::new(-diag, diag), Vec2::new(bx_r, b));
            } else if bx_l == r {
                return hit(btime, Vec2::new(diag, diag), Vec2::new(bx_l, b));
            }
        }
    }

    Sweep::Clear
}
