//! GJK boolean intersection test over the Minkowski difference of two convex bodies.
//!
//! The configuration space obstacle (CSO) used here is `B - A`: a CSO vertex along
//! `d` is `support(B, d) - support(A, -d)`. The bodies overlap iff the CSO contains
//! the origin. All search state lives on the stack of [`gjk`], so the test is
//! reentrant and may be run on any number of pairs in any order.

use glam::Vec3;
use tracing::debug;

use super::collider::SupportMap;

/// Maximum number of support queries after the initial edge.
pub const MAX_GJK_ITERATIONS: usize = 64;

/// Squared length below which a search direction is considered zero.
const DEGENERATE_DIRECTION_SQ: f32 = 1e-12;

/// One point of the CSO together with the body supports that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsoVertex {
    /// Support point on body A (queried along `-d`).
    pub support_a: Vec3,
    /// Support point on body B (queried along `d`).
    pub support_b: Vec3,
    /// `support_b - support_a`.
    pub point: Vec3,
}

impl CsoVertex {
    pub fn new(support_a: Vec3, support_b: Vec3) -> Self {
        Self {
            support_a,
            support_b,
            point: support_b - support_a,
        }
    }

    /// The CSO vertex extreme along `direction`.
    #[inline]
    pub fn along<A, B>(a: &A, b: &B, direction: Vec3) -> Self
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        Self::new(a.support(-direction), b.support(direction))
    }
}

/// Ordered GJK working set, most recently added vertex first. Holds at most 4 vertices.
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    vertices: [CsoVertex; 4],
    len: usize,
}

impl Simplex {
    fn from_vertices(vertices: &[CsoVertex]) -> Self {
        let mut simplex = Self {
            vertices: [vertices[0]; 4],
            len: 0,
        };
        simplex.set(vertices);
        simplex
    }

    fn set(&mut self, vertices: &[CsoVertex]) {
        debug_assert!(!vertices.is_empty() && vertices.len() <= 4);
        self.vertices[..vertices.len()].copy_from_slice(vertices);
        self.len = vertices.len();
    }

    fn push_front(&mut self, vertex: CsoVertex) {
        debug_assert!(self.len < 4);
        self.vertices.copy_within(0..self.len, 1);
        self.vertices[0] = vertex;
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Vertices ordered newest first.
    #[inline]
    pub fn vertices(&self) -> &[CsoVertex] {
        &self.vertices[..self.len]
    }
}

/// Outcome of a GJK query.
#[derive(Debug, Clone, Copy)]
pub enum GjkResult {
    /// The CSO contains the origin; carries the enclosing tetrahedron.
    Overlap(Simplex),
    NoOverlap,
}

impl GjkResult {
    #[inline]
    pub fn is_overlap(&self) -> bool {
        matches!(self, GjkResult::Overlap(_))
    }
}

#[inline]
fn is_degenerate(v: Vec3) -> bool {
    v.length_squared() < DEGENERATE_DIRECTION_SQ
}

/// Direction perpendicular to the edge `newer -> older`, pointing at the origin.
///
/// Falls back to crossing the edge with the X axis, then the Z axis, when the edge
/// passes through the origin.
fn edge_direction(edge: Vec3, to_origin: Vec3) -> Vec3 {
    let direction = edge.cross(to_origin).cross(edge);
    if !is_degenerate(direction) {
        return direction;
    }
    let direction = edge.cross(Vec3::X);
    if !is_degenerate(direction) {
        return direction;
    }
    edge.cross(Vec3::Z)
}

/// Test whether two convex bodies overlap.
///
/// Gives up after [`MAX_GJK_ITERATIONS`] refinements and reports no overlap.
pub fn gjk<A, B>(a: &A, b: &B) -> GjkResult
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    gjk_with_limit(a, b, MAX_GJK_ITERATIONS)
}

fn gjk_with_limit<A, B>(a: &A, b: &B, max_iterations: usize) -> GjkResult
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    let mut seed = a.center() - b.center();
    if is_degenerate(seed) {
        seed = Vec3::X;
    }
    let third = CsoVertex::along(a, b, seed);

    let mut direction = -third.point;
    if is_degenerate(direction) {
        direction = -seed;
    }
    let second = CsoVertex::along(a, b, direction);

    // The CSO provably excludes the origin on this side.
    if second.point.dot(direction) < 0.0 {
        return GjkResult::NoOverlap;
    }

    let mut simplex = Simplex::from_vertices(&[second, third]);
    direction = edge_direction(third.point - second.point, -second.point);

    for _ in 0..max_iterations {
        let newest = CsoVertex::along(a, b, direction);
        if newest.point.dot(direction) < 0.0 {
            return GjkResult::NoOverlap;
        }
        simplex.push_front(newest);

        let enclosed = if simplex.len() == 3 {
            update_triangle(&mut simplex, &mut direction);
            false
        } else {
            update_tetrahedron(&mut simplex, &mut direction)
        };
        if enclosed {
            return GjkResult::Overlap(simplex);
        }
    }

    debug!(
        iterations = max_iterations,
        "GJK hit its iteration cap, reporting no overlap"
    );
    GjkResult::NoOverlap
}

/// Reduce a triangle to the feature closest to the origin and pick the next direction.
///
/// Edge (newest, second) is tested before edge (newest, third); otherwise the
/// triangle is kept and wound so that its normal faces the origin.
fn update_triangle(simplex: &mut Simplex, direction: &mut Vec3) {
    let [a, b, c] = [
        simplex.vertices[0],
        simplex.vertices[1],
        simplex.vertices[2],
    ];
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let normal = ab.cross(ac);

    if ab.cross(normal).dot(ao) > 0.0 {
        simplex.set(&[b, a]);
        *direction = ab.cross(ao).cross(ab);
    } else if normal.cross(ac).dot(ao) > 0.0 {
        simplex.set(&[a, c]);
        *direction = ac.cross(ao).cross(ac);
    } else if normal.dot(ao) > 0.0 {
        *direction = normal;
    } else {
        simplex.set(&[a, c, b]);
        *direction = -normal;
    }
}

/// Check the three faces around the newest vertex. Returns true when the origin is
/// inside all of them, otherwise drops the vertex opposite the first face that sees
/// the origin.
fn update_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [a, b, c, d] = simplex.vertices;
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    if abc.dot(ao) > 0.0 {
        simplex.set(&[a, b, c]);
        *direction = abc;
        return false;
    }
    if acd.dot(ao) > 0.0 {
        simplex.set(&[a, c, d]);
        *direction = acd;
        return false;
    }
    if adb.dot(ao) > 0.0 {
        simplex.set(&[a, d, b]);
        *direction = adb;
        return false;
    }

    true
}
