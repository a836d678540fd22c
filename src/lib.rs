//! A priori 2D collision detection and resolution.
//!
//! Shapes declare where they start and where they intend to end up over a
//! step. The engine finds the exact fraction of the step at which any two of
//! them first touch, resolves that contact, and only then considers later
//! contacts, so fast movers cannot tunnel and contacts within a frame are
//! handled in physical order.
//!
//! The pieces compose bottom-up: [`shape`] holds the swept shape model and
//! registry, [`swept`] the per-pair time-of-impact solvers and their
//! dispatch table, [`broad`] the candidate-pair enumeration, and [`world`]
//! the event loop that orders, resolves, and re-queries contacts.
//!
//! Enable the `f64` feature to run the whole crate in double precision.

pub mod vec;
pub mod shape;
pub mod inters;
pub mod swept;
pub mod broad;
pub mod world;

/// Scalar precision in use. `f32` by default, `f64` behind the `f64` feature.
#[cfg(not(feature = "f64"))]
pub type Fp = f32;
#[cfg(not(feature = "f64"))]
pub type Vec2 = glam::Vec2;

/// Scalar precision in use. `f32` by default, `f64` behind the `f64` feature.
#[cfg(feature = "f64")]
pub type Fp = f64;
#[cfg(feature = "f64")]
pub type Vec2 = glam::DVec2;

pub use shape::{Shape, ShapeKind, ShapeSet, PLANE_THICKNESS};
pub use inters::{Intersection, TIME_EPSILON};
pub use swept::{Finder, FinderTable, Sweep};
pub use broad::{BroadPhase, BruteForce, IndexPair};
pub use world::{ContactListener, World};
