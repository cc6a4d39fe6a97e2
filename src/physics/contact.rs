//! Contact data structures for collision response.

use glam::{Mat4, Vec3};

use super::epa::EpaResult;

/// `1 / sqrt(3)`: below this |n.x| some other component dominates the normal.
const TANGENT_SPLIT: f32 = 0.577_350_26;

/// Geometry of a single contact between two shapes, before it is tied to entities.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal, pointing from shape B toward shape A.
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Contact point on shape A in world space.
    pub point_a: Vec3,
    /// Contact point on shape B in world space.
    pub point_b: Vec3,
}

impl ContactInfo {
    /// Reconstruct the contact from the face EPA accepted.
    ///
    /// The origin's projection onto the face is expressed in barycentric coordinates,
    /// which are then applied to the per-body support points stored in each corner.
    pub fn from_epa(result: &EpaResult) -> Self {
        let [a, b, c] = result.corners;
        let projected = result.normal * result.depth;

        let (point_a, point_b) = match barycentric(a.point, b.point, c.point, projected) {
            Some([u, v, w]) => (
                a.support_a * u + b.support_a * v + c.support_a * w,
                a.support_b * u + b.support_b * v + c.support_b * w,
            ),
            None => (a.support_a, a.support_b),
        };

        Self {
            normal: result.normal,
            penetration: result.depth,
            point_a,
            point_b,
        }
    }
}

/// Barycentric coordinates of `p` in triangle `abc` by Cramer's rule.
/// `None` when the triangle is degenerate.
fn barycentric(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> Option<[f32; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f32::EPSILON * (d00 * d11).max(f32::MIN_POSITIVE) {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - v - w, v, w])
}

/// Two unit tangents completing `normal` into an orthonormal basis.
pub fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let t1 = if normal.x.abs() >= TANGENT_SPLIT {
        Vec3::new(normal.y, -normal.x, 0.0).normalize()
    } else {
        Vec3::new(0.0, normal.z, -normal.y).normalize()
    };
    (t1, normal.cross(t1))
}

/// A contact between two colliders, consumed once by the solver.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub body_a: hecs::Entity,
    pub body_b: hecs::Entity,
    pub collider_a: hecs::Entity,
    pub collider_b: hecs::Entity,
    /// Contact point on A in world space.
    pub point_a: Vec3,
    /// Contact point on B in world space.
    pub point_b: Vec3,
    /// `point_a` in collider A's local frame.
    pub local_point_a: Vec3,
    /// `point_b` in collider B's local frame.
    pub local_point_b: Vec3,
    /// Unit normal pointing from B toward A; A separates by moving along it.
    pub normal: Vec3,
    pub tangent1: Vec3,
    pub tangent2: Vec3,
    pub penetration: f32,
}

/// Entities and world matrices of one collider taking part in a contact.
#[derive(Debug, Clone, Copy)]
pub struct ContactSide {
    pub body: hecs::Entity,
    pub collider: hecs::Entity,
    pub world_matrix: Mat4,
}

impl Contact {
    pub fn new(a: &ContactSide, b: &ContactSide, info: &ContactInfo) -> Self {
        let (tangent1, tangent2) = tangent_basis(info.normal);
        Self {
            body_a: a.body,
            body_b: b.body,
            collider_a: a.collider,
            collider_b: b.collider,
            point_a: info.point_a,
            point_b: info.point_b,
            local_point_a: a.world_matrix.inverse().transform_point3(info.point_a),
            local_point_b: b.world_matrix.inverse().transform_point3(info.point_b),
            normal: info.normal,
            tangent1,
            tangent2,
            penetration: info.penetration,
        }
    }
}
