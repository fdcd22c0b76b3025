use crate::Tolerance;

use super::curves::{Circle3d, Curve, Ellipse3d, Line3d};
use super::point::Point3d;
use super::surfaces::{Cylinder, Plane, Sphere};

/// Result of intersecting two analytic surfaces.
#[derive(Debug, Clone)]
pub enum SurfaceIntersection {
    /// Surfaces do not intersect.
    None,
    /// Surfaces touch at a single point (degenerate/tangent case).
    Point(Point3d),
    /// Surfaces intersect along a curve.
    Curve(Curve),
    /// Surfaces intersect along two separate curves (e.g. plane cutting cylinder
    /// parallel to its axis yields two lines).
    TwoCurves(Curve, Curve),
    /// Surfaces are coincident (identical geometric locus).
    Coincident,
}

// ─── Plane–Plane ─────────────────────────────────────────────────────────────

/// Intersect two infinite planes.
///
/// - Parallel, non-coincident -> `None`
/// - Coincident -> `Coincident`
/// - Transverse -> `Curve(Line3d)`
pub fn plane_plane(p1: &Plane, p2: &Plane, tol: &Tolerance) -> SurfaceIntersection {
    let cross = p1.normal.cross(&p2.normal);
    let cross_len = cross.length();

    if cross_len < tol.angular {
        // Normals are parallel — check if the planes are coincident.
        let dist = p1.distance_to_point(&p2.origin).abs();
        if dist < tol.coincidence {
            return SurfaceIntersection::Coincident;
        }
        return SurfaceIntersection::None;
    }

    let dir = cross / cross_len;

    // Find a point on the intersection line by solving the two plane equations.
    // Plane i: n_i . P = d_i
    let d1 = p1.origin.to_vec3().dot(&p1.normal);
    let d2 = p2.origin.to_vec3().dot(&p2.normal);

    let n1n2 = p1.normal.dot(&p2.normal);
    let denom = 1.0 - n1n2 * n1n2;
    // denom cannot be ~0 here because cross_len is already checked above.
    let c1 = (d1 - d2 * n1n2) / denom;
    let c2 = (d2 - d1 * n1n2) / denom;
    let origin = Point3d::ORIGIN + p1.normal * c1 + p2.normal * c2;

    SurfaceIntersection::Curve(Curve::Line(Line3d { origin, direction: dir }))
}

// ─── Plane–Cylinder ──────────────────────────────────────────────────────────

/// Intersect an infinite plane with an infinite cylinder.
///
/// Cases (let `theta` be the angle between the plane normal and the cylinder axis):
///
/// - `theta ~ 0` (plane perpendicular to axis) -> `Circle3d`
/// - `theta ~ PI/2` (plane parallel to axis):
///   - distance from axis to plane > radius -> `None`
///   - distance == radius (tangent)  -> single `Line3d`
///   - distance < radius -> `TwoCurves(Line3d, Line3d)`
/// - otherwise -> `Ellipse3d`
pub fn plane_cylinder(plane: &Plane, cyl: &Cylinder, tol: &Tolerance) -> SurfaceIntersection {
    let cos_theta = plane.normal.dot(&cyl.axis).abs();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    // ── Case 1: plane perpendicular to cylinder axis (cos_theta ~ 1) ──
    if sin_theta < tol.angular {
        // The intersection is a circle whose center is the projection of the
        // cylinder origin onto the plane.  Since the plane is perpendicular to
        // the axis, the circle lies in the plane with the cylinder's radius.
        let center = plane.project_point(&cyl.origin);
        let circle = Circle3d::new(center, plane.normal, cyl.radius);
        return SurfaceIntersection::Curve(Curve::Circle(circle));
    }

    // ── Case 2: plane parallel to cylinder axis (cos_theta ~ 0) ──
    if cos_theta < tol.angular {
        // Distance from the cylinder axis to the plane.
        let dist = plane.distance_to_point(&cyl.origin).abs();

        if dist > cyl.radius + tol.coincidence {
            return SurfaceIntersection::None;
        }

        // Direction along which the lines run: the cylinder axis projected into
        // the plane.  Since the plane is parallel to the axis, the axis already
        // lies in the plane direction.
        let line_dir = cyl.axis;

        if (dist - cyl.radius).abs() < tol.coincidence {
            // Tangent — single line.
            let foot = plane.project_point(&cyl.origin);
            return SurfaceIntersection::Curve(Curve::Line(Line3d {
                origin: foot,
                direction: line_dir,
            }));
        }

        // Two lines.
        let half_chord = (cyl.radius * cyl.radius - dist * dist).max(0.0).sqrt();

        // A direction in the plane perpendicular to both the plane normal and
        // the axis-to-plane direction — this is along the cylinder axis cross
        // the radial direction, but we need the component in the plane that is
        // perpendicular to the line direction.  Since line_dir == cyl.axis, and
        // axis_to_plane is perpendicular to it, the offset direction is simply
        // axis_to_plane cross line_dir, but we can also get it more directly.
        //
        // Actually the two lines are offset from the foot (closest point on the
        // axis projected onto the plane) in the direction perpendicular to both
        // the axis and the plane normal, which is the cross product.
        let lateral = cyl.axis.cross(&plane.normal).normalize();
        let foot = plane.project_point(&cyl.origin);

        let p1 = foot + lateral * half_chord;
        let p2 = foot - lateral * half_chord;

        return SurfaceIntersection::TwoCurves(
            Curve::Line(Line3d {
                origin: p1,
                direction: line_dir,
            }),
            Curve::Line(Line3d {
                origin: p2,
                direction: line_dir,
            }),
        );
    }

    // ── Case 3: oblique plane -> ellipse ──
    //
    // The intersection of a plane with a circular cylinder at angle theta to
    // the axis is an ellipse whose minor radius equals the cylinder radius R
    // and whose major radius equals R / sin(theta).
    //
    // The center of the ellipse is the point on the cylinder axis closest to
    // the plane, projected onto the plane (equivalently, the point where the
    // axis pierces the plane).

    // Find where the cylinder axis meets the plane.
    let denom = plane.normal.dot(&cyl.axis);
    // denom != 0 because cos_theta != 0 (already handled above).
    let t = (plane.origin - cyl.origin).dot(&plane.normal) / denom;
    let center = cyl.origin + cyl.axis * t;

    let minor_radius = cyl.radius;
    let major_radius = cyl.radius / cos_theta;

    // The major axis direction lies in the plane and in the plane containing
    // the cylinder axis and the plane normal.
    // It is the component of the cylinder axis projected into the plane,
    // normalised.
    let axis_in_plane = cyl.axis - plane.normal * plane.normal.dot(&cyl.axis);
    let major_axis = match axis_in_plane.normalized() {
        Some(v) => v,
        // Degenerate — should not happen given sin_theta > angular tolerance.
        std::option::Option::None => return SurfaceIntersection::None,
    };

    let ellipse = Ellipse3d::new(center, plane.normal, major_axis, major_radius, minor_radius);
    SurfaceIntersection::Curve(Curve::Ellipse(ellipse))
}

// ─── Plane–Sphere ────────────────────────────────────────────────────────────

/// Intersect an infinite plane with a sphere.
///
/// - Plane outside sphere -> `None`
/// - Plane tangent to sphere -> `Point`
/// - Plane cutting sphere -> `Circle3d`
/// - (Coincidence is not geometrically meaningful for plane vs sphere.)
pub fn plane_sphere(plane: &Plane, sphere: &Sphere, tol: &Tolerance) -> SurfaceIntersection {
    let signed_dist = plane.distance_to_point(&sphere.center);
    let dist = signed_dist.abs();

    if dist > sphere.radius + tol.coincidence {
        return SurfaceIntersection::None;
    }

    if (dist - sphere.radius).abs() < tol.coincidence {
        // Tangent — single point.
        let point = sphere.center - plane.normal * signed_dist;
        return SurfaceIntersection::Point(point);
    }

    // The intersection circle.
    let circle_radius = (sphere.radius * sphere.radius - dist * dist).max(0.0).sqrt();
    let center = sphere.center - plane.normal * signed_dist;

    let circle = Circle3d::new(center, plane.normal, circle_radius);
    SurfaceIntersection::Curve(Curve::Circle(circle))
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════
