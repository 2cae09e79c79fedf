use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const UP: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Rotate about X, then Y, then Z by the angles of `euler`.
    pub fn rotated_by_euler(&self, euler: &Euler) -> Vector3 {
        let (sx, cx) = euler.x.sin_cos();
        let (sy, cy) = euler.y.sin_cos();
        let (sz, cz) = euler.z.sin_cos();

        let (x, y, z) = (self.x, self.y * cx - self.z * sx, self.y * sx + self.z * cx);
        let (x, y, z) = (x * cy - z * sy, y, x * sy + z * cy);
        Vector3::new(x * cz + y * sz, -x * sz + y * cz, z)
    }

    pub fn rotated_by_quaternion(&self, q: &Quaternion) -> Vector3 {
        let (qx, qy, qz, qw) = (q.x, q.y, q.z, q.w);
        let (xx, yy, zz) = (qx * qx, qy * qy, qz * qz);
        Vector3::new(
            self.x * (1.0 - 2.0 * yy - 2.0 * zz)
                + self.y * (2.0 * (qx * qy - qw * qz))
                + self.z * (2.0 * (qx * qz + qw * qy)),
            self.x * (2.0 * (qx * qy + qw * qz))
                + self.y * (1.0 - 2.0 * xx - 2.0 * zz)
                + self.z * (2.0 * (qy * qz - qw * qx)),
            self.x * (2.0 * (qx * qz - qw * qy))
                + self.y * (2.0 * (qy * qz + qw * qx))
                + self.z * (1.0 - 2.0 * xx - 2.0 * yy),
        )
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Vector3::new(v[0], v[1], v[2])
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Orientation as rotations in radians about X (heading), Y (pitch) and Z (roll).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Euler {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Euler {
    pub const IDENTITY: Euler = Euler::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit rotation about one axis, scaled by `angle` radians.
    pub fn about_axis(axis: [f64; 3], angle: f64) -> Self {
        Euler::new(axis[0] * angle, axis[1] * angle, axis[2] * angle)
    }
}

impl Add for Euler {
    type Output = Euler;
    fn add(self, rhs: Euler) -> Euler {
        Euler::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Euler {
    fn add_assign(&mut self, rhs: Euler) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Shortest rotation taking direction `u` to direction `v`.
    pub fn between(u: &Vector3, v: &Vector3) -> Quaternion {
        let w = u.cross(v);
        Quaternion::new(1.0 + u.dot(v), w.x, w.y, w.z).normalized()
    }

    pub fn normalized(&self) -> Quaternion {
        let magnitude =
            (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if magnitude == 0.0 {
            return Quaternion::new(0.0, 0.0, 0.0, 0.0);
        }
        Quaternion::new(
            self.w / magnitude,
            self.x / magnitude,
            self.y / magnitude,
            self.z / magnitude,
        )
    }

    /// Euler equivalent of a normalized quaternion. A rotation with no axis
    /// keeps `compatible` unchanged. At gimbal lock the Y angle is clamped to
    /// ±π/2 and the remaining angles stay finite.
    pub fn to_euler(&self, compatible: Euler) -> Euler {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        if x == 0.0 && y == 0.0 && z == 0.0 {
            return compatible;
        }
        let (ww, xx, yy, zz) = (w * w, x * x, y * y, z * z);
        Euler::new(
            (2.0 * (y * z + x * w)).atan2(-xx - yy + zz + ww),
            (2.0 * (x * z - y * w)).clamp(-1.0, 1.0).asin(),
            (-2.0 * (x * y + z * w)).atan2(xx - yy - zz + ww),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_euler_rotation_about_x() {
        let angle = 39f64.to_radians();
        let v = Vector3::UP.rotated_by_euler(&Euler::new(angle, 0.0, 0.0));
        assert!(close(v.x, 0.0));
        assert!(close(v.y, -angle.sin()));
        assert!(close(v.z, angle.cos()));
    }

    #[test]
    fn test_quaternion_round_trip_through_euler() {
        let angle = 0.7;
        let heading = Vector3::UP.rotated_by_euler(&Euler::new(angle, 0.0, 0.0));
        let q = Quaternion::between(&Vector3::UP, &heading);
        let e = q.to_euler(Euler::IDENTITY);
        assert!(close(e.x, angle) && close(e.y, 0.0) && close(e.z, 0.0), "{:?}", e);

        let rotated = Vector3::UP.rotated_by_quaternion(&q);
        assert!(close(rotated.y, heading.y) && close(rotated.z, heading.z));
    }

    #[test]
    fn test_quarter_turn_about_y_is_finite() {
        let heading = Vector3::new(1.0, 0.0, 0.0);
        let q = Quaternion::between(&Vector3::UP, &heading);
        let e = q.to_euler(Euler::IDENTITY);
        assert!(e.x.is_finite() && e.y.is_finite() && e.z.is_finite(), "{:?}", e);
        assert!((e.y.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-6, "{:?}", e);

        let rotated = Vector3::UP.rotated_by_euler(&e);
        // asin loses precision next to ±1
        let near = |a: f64, b: f64| (a - b).abs() < 1e-6;
        assert!(near(rotated.x, 1.0) && near(rotated.y, 0.0) && near(rotated.z, 0.0), "{:?}", rotated);
    }

    #[test]
    fn test_identity_rotation_keeps_compatible_euler() {
        let q = Quaternion::between(&Vector3::UP, &Vector3::UP);
        let previous = Euler::new(0.1, 0.2, 0.3);
        assert_eq!(q.to_euler(previous), previous);
    }
}
