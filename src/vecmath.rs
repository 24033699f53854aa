use serde::{Serialize, Deserialize};

// Minkowski-style 4-vector used for both positions (x, y, z, t) and
// momenta (px, py, pz, E). Units are whatever the caller stores; the
// geometry code documents its conventions (mm, s or us, MeV).
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct FourVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
}

impl FourVector {
    #[inline(always)]
    pub fn new(x: f64, y: f64, z: f64, t: f64) -> Self { Self { x, y, z, t } }
    #[inline(always)]
    pub fn zero() -> Self { Self::new(0.0, 0.0, 0.0, 0.0) }

    /// Squared length of the spatial part only.
    #[inline(always)]
    pub fn spatial_length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    #[inline(always)]
    pub fn spatial_length(self) -> f64 { self.spatial_length_squared().sqrt() }

    /// Transverse (x-y plane) radius, distance from the detector axis.
    #[inline(always)]
    pub fn perp(self) -> f64 { (self.x * self.x + self.y * self.y).sqrt() }

    /// Normalizes the spatial part, returning `None` for a zero or
    /// near-zero vector rather than dividing by it.
    pub fn spatial_direction(self) -> Option<FourVector> {
        let len_sq = self.spatial_length_squared();
        if len_sq > 1e-24 {
            let inv = 1.0 / len_sq.sqrt();
            Some(Self::new(self.x * inv, self.y * inv, self.z * inv, 0.0))
        } else {
            None
        }
    }

    /// Azimuthal angle of the spatial part, measured from the origin.
    #[inline(always)]
    pub fn phi(self) -> f64 { self.y.atan2(self.x) }

    /// Polar angle of the spatial part, measured from the z (detector) axis.
    #[inline(always)]
    pub fn theta(self) -> f64 { self.perp().atan2(self.z) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn direction_normalizes_spatial_part() {
        let v = FourVector::new(3.0, 0.0, 4.0, 7.0);
        let d = v.spatial_direction().unwrap();
        assert_approx_eq!(d.x, 0.6);
        assert_approx_eq!(d.z, 0.8);
        assert_approx_eq!(d.spatial_length(), 1.0);
    }

    #[test]
    fn zero_momentum_has_no_direction() {
        assert!(FourVector::new(0.0, 0.0, 0.0, 1.157).spatial_direction().is_none());
    }

    #[test]
    fn angles_measured_from_origin() {
        let v = FourVector::new(0.0, 1.0, 0.0, 0.0);
        assert_approx_eq!(v.phi(), std::f64::consts::FRAC_PI_2);
        assert_approx_eq!(v.theta(), std::f64::consts::FRAC_PI_2);
    }
}
