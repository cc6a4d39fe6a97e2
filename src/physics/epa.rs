//! Expanding Polytope Algorithm: penetration normal and depth from a GJK overlap.
//!
//! Starts from the tetrahedron GJK terminated with and grows it toward the CSO
//! boundary until the face closest to the origin stops moving. Faces reference the
//! polytope's vertex buffer by index; every face normal points away from the origin.

use glam::Vec3;
use tracing::debug;

use super::collider::SupportMap;
use super::gjk::{CsoVertex, Simplex};

/// Maximum number of expansion steps.
pub const MAX_EPA_ITERATIONS: usize = 64;

/// A face is accepted once a new support point improves on it by less than this.
pub const EPA_TOLERANCE: f32 = 1e-4;

/// Signed distance a new face may sit behind the origin before its winding is flipped.
const WINDING_BIAS: f32 = 1e-6;

/// Squared cross-product length below which a face has no usable normal.
const DEGENERATE_FACE_SQ: f32 = 1e-12;

/// Triangular polytope face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Corner indices into the polytope's vertex buffer.
    pub indices: [usize; 3],
    /// Unit outward normal.
    pub normal: Vec3,
    /// Signed distance from the origin along `normal`.
    pub distance: f32,
}

impl Face {
    /// Build a face over `indices`, rewinding it when its normal would face the origin.
    /// Returns `None` for zero-area triangles.
    fn new(vertices: &[CsoVertex], mut indices: [usize; 3]) -> Option<Self> {
        let a = vertices[indices[0]].point;
        let b = vertices[indices[1]].point;
        let c = vertices[indices[2]].point;

        let cross = (b - a).cross(c - a);
        if cross.length_squared() < DEGENERATE_FACE_SQ {
            return None;
        }
        let mut normal = cross.normalize();
        let mut distance = a.dot(normal);

        if distance < -WINDING_BIAS {
            indices.swap(0, 1);
            normal = -normal;
            distance = -distance;
        }

        Some(Self {
            indices,
            normal,
            distance,
        })
    }

    /// The face sees `point` when the point lies strictly in front of its plane.
    #[inline]
    fn is_visible_from(&self, vertices: &[CsoVertex], point: Vec3) -> bool {
        self.normal.dot(point - vertices[self.indices[0]].point) > 0.0
    }

    #[inline]
    fn edges(&self) -> [(usize, usize); 3] {
        let [i, j, k] = self.indices;
        [(i, j), (j, k), (k, i)]
    }
}

/// The face EPA settled on, with its corners resolved.
#[derive(Debug, Clone, Copy)]
pub struct EpaResult {
    pub corners: [CsoVertex; 3],
    /// Unit outward normal of the face in CSO space.
    pub normal: Vec3,
    /// Penetration depth (the face's distance from the origin).
    pub depth: f32,
}

/// Convex polytope in CSO space being expanded toward the boundary.
#[derive(Debug, Clone)]
struct Polytope {
    vertices: Vec<CsoVertex>,
    faces: Vec<Face>,
}

impl Polytope {
    fn from_tetrahedron(simplex: &Simplex) -> Self {
        let vertices = simplex.vertices().to_vec();
        let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]]
            .into_iter()
            .filter_map(|indices| Face::new(&vertices, indices))
            .collect();
        Self { vertices, faces }
    }

    fn closest_face(&self) -> Option<Face> {
        self.faces
            .iter()
            .copied()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Add `vertex`, carve out every face it can see, and stitch the hole shut.
    fn expand(&mut self, vertex: CsoVertex) {
        self.vertices.push(vertex);
        let new_index = self.vertices.len() - 1;

        let mut loose_edges: Vec<(usize, usize)> = Vec::new();
        let vertices = &self.vertices;
        self.faces.retain(|face| {
            if !face.is_visible_from(vertices, vertex.point) {
                return true;
            }
            for (from, to) in face.edges() {
                // A shared edge shows up once per adjacent face, reversed.
                if let Some(pos) = loose_edges.iter().position(|&e| e == (to, from)) {
                    loose_edges.swap_remove(pos);
                } else {
                    loose_edges.push((from, to));
                }
            }
            false
        });

        for (from, to) in loose_edges {
            if let Some(face) = Face::new(&self.vertices, [from, to, new_index]) {
                self.faces.push(face);
            }
        }
    }

    fn resolve(&self, face: Face) -> EpaResult {
        EpaResult {
            corners: face.indices.map(|i| self.vertices[i]),
            normal: face.normal,
            depth: face.distance,
        }
    }
}

/// Run EPA on the terminal simplex of an overlapping GJK query.
///
/// Returns `None` when the simplex is not a tetrahedron or the polytope collapses
/// into zero-area faces. After [`MAX_EPA_ITERATIONS`] expansions the closest face so
/// far is accepted.
pub fn epa<A, B>(a: &A, b: &B, simplex: &Simplex) -> Option<EpaResult>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    epa_with_limit(a, b, simplex, MAX_EPA_ITERATIONS)
}

fn epa_with_limit<A, B>(
    a: &A,
    b: &B,
    simplex: &Simplex,
    max_iterations: usize,
) -> Option<EpaResult>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    if simplex.len() != 4 {
        debug!(len = simplex.len(), "EPA needs a tetrahedron");
        return None;
    }

    let mut polytope = Polytope::from_tetrahedron(simplex);

    for _ in 0..max_iterations {
        let Some(closest) = polytope.closest_face() else {
            debug!("EPA polytope has no usable faces, dropping pair");
            return None;
        };

        let vertex = CsoVertex::along(a, b, closest.normal);
        if vertex.point.dot(closest.normal) - closest.distance < EPA_TOLERANCE {
            return Some(polytope.resolve(closest));
        }

        polytope.expand(vertex);
    }

    debug!(
        iterations = max_iterations,
        "EPA hit its iteration cap, accepting closest face"
    );
    match polytope.closest_face() {
        Some(face) => Some(polytope.resolve(face)),
        None => {
            debug!("EPA polytope has no usable faces, dropping pair");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collider::WorldHull;
    use crate::physics::gjk::{gjk, GjkResult};

    fn cube(center: Vec3, half: f32) -> WorldHull {
        let mut vertices = Vec::with_capacity(8);
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    vertices.push(center + Vec3::new(sx, sy, sz) * half);
                }
            }
        }
        WorldHull::with_center(vertices, center).unwrap()
    }

    fn penetration(a: &WorldHull, b: &WorldHull) -> EpaResult {
        let GjkResult::Overlap(simplex) = gjk(a, b) else {
            panic!("expected overlap");
        };
        epa(a, b, &simplex).expect("EPA should find a face")
    }

    #[test]
    fn test_cubes_offset_on_x() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::new(0.5, 0.0, 0.0), 0.5);
        let result = penetration(&a, &b);

        let eps = 1e-3;
        assert!((result.normal.x.abs() - 1.0).abs() < eps, "normal {:?}", result.normal);
        assert!((result.depth - 0.5).abs() < eps, "depth {}", result.depth);
        // B sits on +X, so A has to move toward -X.
        assert!(result.normal.x < 0.0);
    }

    #[test]
    fn test_normal_is_unit_and_repeatable() {
        let a = cube(Vec3::new(0.1, 0.0, -0.2), 0.5);
        let b = cube(Vec3::new(0.3, 0.7, 0.1), 0.6);
        let first = penetration(&a, &b);
        let second = penetration(&a, &b);

        assert!((first.normal.length() - 1.0).abs() < 1e-4);
        assert_eq!(first.normal, second.normal);
        assert_eq!(first.depth, second.depth);
    }

    #[test]
    fn test_shallow_contact_depth() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::new(0.0, 0.99, 0.0), 0.5);
        let result = penetration(&a, &b);
        assert!((result.depth - 0.01).abs() < 1e-3);
        assert!((result.normal - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_diagonal_overlap_takes_shallowest_axis() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::splat(0.8), 0.5);
        let result = penetration(&a, &b);
        assert!((result.depth - 0.2).abs() < 1e-3);
        assert!((result.normal.abs().max_element() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_concentric_cubes() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::ZERO, 0.5);
        let result = penetration(&a, &b);
        assert!((result.depth - 1.0).abs() < 1e-3);
        assert!((result.normal.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_accepted_face_corners_are_cso_points() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::new(0.0, 0.0, 0.6), 0.5);
        let result = penetration(&a, &b);
        for corner in result.corners {
            assert_eq!(corner.point, corner.support_b - corner.support_a);
            // Every corner lies on the accepted plane.
            assert!((corner.point.dot(result.normal) - result.depth).abs() < 1e-3);
        }
    }

    /// Exact sphere; EPA can only approximate it with a finite polytope.
    struct Ball {
        center: Vec3,
        radius: f32,
    }

    impl SupportMap for Ball {
        fn support(&self, direction: Vec3) -> Vec3 {
            self.center + direction.normalize_or_zero() * self.radius
        }

        fn center(&self) -> Vec3 {
            self.center
        }
    }

    #[test]
    fn test_curved_bodies_accept_closest_face_at_cap() {
        let a = Ball {
            center: Vec3::ZERO,
            radius: 50.0,
        };
        let b = Ball {
            center: Vec3::new(99.5, 0.0, 0.0),
            radius: 50.0,
        };
        let GjkResult::Overlap(simplex) = gjk(&a, &b) else {
            panic!("balls 0.5 deep must overlap");
        };
        let result = epa(&a, &b, &simplex).expect("cap must still yield a face");

        // The accepted face has not converged: a support along it still gains more
        // than the tolerance.
        let support = CsoVertex::along(&a, &b, result.normal).point;
        let gain = support.dot(result.normal) - result.depth;
        assert!(gain >= EPA_TOLERANCE, "gain {}", gain);

        assert!(
            result.depth > 0.49 && result.depth <= 0.5 + 1e-3,
            "depth {}",
            result.depth
        );
        assert!(result.normal.x < -0.99, "normal {:?}", result.normal);
    }

    #[test]
    fn test_zero_iterations_accept_initial_closest_face() {
        let a = cube(Vec3::ZERO, 0.5);
        let b = cube(Vec3::new(0.5, 0.0, 0.0), 0.5);
        let GjkResult::Overlap(simplex) = gjk(&a, &b) else {
            panic!("expected overlap");
        };
        let initial = Polytope::from_tetrahedron(&simplex)
            .closest_face()
            .expect("GJK tetrahedron has faces");

        let result = epa_with_limit(&a, &b, &simplex, 0).expect("closest face accepted");
        assert_eq!(result.normal, initial.normal);
        assert_eq!(result.depth, initial.distance);
        assert!(result.depth <= 0.5 + 1e-4);
    }

    #[test]
    fn test_face_winding_points_away_from_origin() {
        let vertices = [
            CsoVertex::new(Vec3::ZERO, Vec3::new(1.0, 0.0, -1.0)),
            CsoVertex::new(Vec3::ZERO, Vec3::new(0.0, 1.0, -1.0)),
            CsoVertex::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)),
        ];
        // Counter-clockwise from above gives +Z, which faces the origin; expect a flip.
        let face = Face::new(&vertices, [2, 0, 1]).unwrap();
        assert!((face.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert!((face.distance - 1.0).abs() < 1e-6);
        assert_eq!(face.indices, [0, 2, 1]);
    }

    #[test]
    fn test_zero_area_face_rejected() {
        let vertices = [
            CsoVertex::new(Vec3::ZERO, Vec3::X),
            CsoVertex::new(Vec3::ZERO, Vec3::X * 2.0),
            CsoVertex::new(Vec3::ZERO, Vec3::X * 3.0),
        ];
        assert!(Face::new(&vertices, [0, 1, 2]).is_none());
    }
}
