use log::warn;

use crate::event::Event;
use crate::smearing::EnergySmearing;
use crate::vecmath::FourVector;

// Speed of light in mm per microsecond; hit times are stored in us while
// emission times arrive in seconds.
const C_MM_PER_US: f64 = 299_792.458;
const SECONDS_TO_US: f64 = 1.0e6;

// Below this squared transverse direction component the barrel quadratic is
// degenerate and the ray can only hit an end cap.
const TRANSVERSE_EPS_SQ: f64 = 1.0e-18;

/// Idealized detector: a cylinder of radius `radius_mm` centered on the
/// origin, axis along z, extending to ±`half_length_mm`.
#[derive(Copy, Clone, Debug)]
pub struct DetectorGeometry {
    pub radius_mm: f64,
    pub half_length_mm: f64,
}

/// A computed intersection with the detector shell. Angles are the
/// azimuthal/polar angles of the hit point as seen from the global origin,
/// not from the emission point.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    pub point: FourVector,
    pub phi: f64,
    pub theta: f64,
}

impl DetectorGeometry {
    pub fn new(radius_mm: f64, half_length_mm: f64) -> Self {
        Self { radius_mm, half_length_mm }
    }

    /// Intersects a photon ray with the detector shell. The ray starts at
    /// `emission` (mm, t in seconds) and travels along the spatial part of
    /// `momentum` at the speed of light. Returns `None` when the ray never
    /// reaches the shell in its direction of motion, or when the momentum
    /// direction is undefined.
    pub fn compute_hit_point(&self, emission: FourVector, momentum: FourVector) -> Option<Hit> {
        let dir = momentum.spatial_direction()?;

        // Barrel surface first: (ex + s*dx)^2 + (ey + s*dy)^2 = R^2.
        // A near-axial direction makes the quadratic degenerate; skip
        // straight to the caps instead of dividing by ~0.
        let a = dir.x * dir.x + dir.y * dir.y;
        if a > TRANSVERSE_EPS_SQ {
            let b = 2.0 * (emission.x * dir.x + emission.y * dir.y);
            let c = emission.x * emission.x + emission.y * emission.y
                - self.radius_mm * self.radius_mm;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sqrt_disc = disc.sqrt();
                // Smallest positive root is the first crossing along the ray.
                let s = [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)]
                    .into_iter()
                    .find(|&s| s > 0.0);
                if let Some(s) = s {
                    let z = emission.z + s * dir.z;
                    if z.abs() <= self.half_length_mm {
                        return Some(self.make_hit(emission, dir, s));
                    }
                    // Barrel crossing lies beyond the end caps; fall through.
                }
            }
        }
        self.cap_intersection(emission, dir)
    }

    // Plane z = ±L in the direction of motion, accepted only within the cap
    // radius.
    fn cap_intersection(&self, emission: FourVector, dir: FourVector) -> Option<Hit> {
        if dir.z.abs() < 1.0e-12 {
            return None;
        }
        let cap_z = self.half_length_mm.copysign(dir.z);
        let s = (cap_z - emission.z) / dir.z;
        if s <= 0.0 {
            return None;
        }
        let x = emission.x + s * dir.x;
        let y = emission.y + s * dir.y;
        if (x * x + y * y).sqrt() > self.radius_mm {
            return None;
        }
        Some(self.make_hit(emission, dir, s))
    }

    fn make_hit(&self, emission: FourVector, dir: FourVector, path_mm: f64) -> Hit {
        let point = FourVector::new(
            emission.x + path_mm * dir.x,
            emission.y + path_mm * dir.y,
            emission.z + path_mm * dir.z,
            emission.t * SECONDS_TO_US + path_mm / C_MM_PER_US,
        );
        Hit { point, phi: point.phi(), theta: point.theta() }
    }

    /// Fills an event's derived fields: hit points and angles, per-photon
    /// acceptance flags, raw and smeared deposited energy. A photon with a
    /// zero-magnitude momentum is a recoverable degeneracy: its hit fields
    /// stay unset, its cut flag is forced false and the rest of the event is
    /// still processed. The pass flag is re-derived through the cut setters.
    pub fn process_event(&self, event: &mut Event, smearing: &mut EnergySmearing) {
        for i in 0..event.num_products() {
            let momentum = event.four_momentum(i);
            if momentum.spatial_direction().is_none() {
                warn!(
                    "event {}: photon {} has zero-magnitude momentum, forcing cut failure",
                    event.id(),
                    i
                );
                event.set_cut_passing(i, false);
                continue;
            }
            match self.compute_hit_point(event.emission_point(i), momentum) {
                Some(hit) => {
                    event.set_hit(i, hit.point, hit.phi, hit.theta);
                    let edep = momentum.t;
                    event.set_edep(i, edep);
                    event.set_edep_smear(i, smearing.smear(edep));
                    event.set_cut_passing(i, true);
                }
                None => event.set_cut_passing(i, false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DecayType;
    use assert_approx_eq::assert_approx_eq;

    fn detector() -> DetectorGeometry {
        DetectorGeometry::new(437.3, 250.0)
    }

    #[test]
    fn axial_photon_hits_end_cap() {
        let hit = detector()
            .compute_hit_point(
                FourVector::zero(),
                FourVector::new(0.0, 0.0, 0.511, 0.511),
            )
            .unwrap();
        assert_approx_eq!(hit.point.z, 250.0);
        assert_approx_eq!(hit.point.x, 0.0);
        assert_approx_eq!(hit.point.y, 0.0);
        // Polar angle at the pole, on-axis.
        assert_approx_eq!(hit.theta, 0.0);
    }

    #[test]
    fn axial_photon_hits_negative_cap() {
        let hit = detector()
            .compute_hit_point(
                FourVector::zero(),
                FourVector::new(0.0, 0.0, -0.511, 0.511),
            )
            .unwrap();
        assert_approx_eq!(hit.point.z, -250.0);
    }

    #[test]
    fn transverse_photon_hits_barrel_at_radius() {
        let hit = detector()
            .compute_hit_point(
                FourVector::zero(),
                FourVector::new(0.511, 0.0, 0.0, 0.511),
            )
            .unwrap();
        assert_approx_eq!(hit.point.x, 437.3);
        assert_approx_eq!(hit.point.y, 0.0);
        assert_approx_eq!(hit.point.z, 0.0);
        assert_approx_eq!(hit.phi, 0.0);
        assert_approx_eq!(hit.theta, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn steep_photon_exits_through_cap_not_barrel() {
        // Slightly off-axis: the barrel crossing would land past the cap.
        let hit = detector()
            .compute_hit_point(
                FourVector::zero(),
                FourVector::new(0.01, 0.0, 1.0, 1.0),
            )
            .unwrap();
        assert_approx_eq!(hit.point.z, 250.0);
        assert!(hit.point.x < detector().radius_mm);
    }

    #[test]
    fn off_center_emission_still_reaches_barrel() {
        let hit = detector()
            .compute_hit_point(
                FourVector::new(100.0, 0.0, 0.0, 0.0),
                FourVector::new(1.0, 0.0, 0.0, 1.0),
            )
            .unwrap();
        assert_approx_eq!(hit.point.x, 437.3);
    }

    #[test]
    fn hit_time_converted_to_microseconds() {
        let hit = detector()
            .compute_hit_point(
                FourVector::new(0.0, 0.0, 0.0, 1.0e-6), // emitted at 1 us
                FourVector::new(1.0, 0.0, 0.0, 1.0),
            )
            .unwrap();
        let flight_us = 437.3 / C_MM_PER_US;
        assert_approx_eq!(hit.point.t, 1.0 + flight_us, 1e-9);
    }

    #[test]
    fn zero_momentum_photon_recovered_without_aborting_event() {
        let origin = FourVector::zero();
        let good = FourVector::new(0.511, 0.0, 0.0, 0.511);
        let degenerate = FourVector::new(0.0, 0.0, 0.0, 0.511);
        let mut ev = Event::new(
            11,
            DecayType::Two,
            1.0,
            vec![origin, origin],
            vec![good, degenerate],
        )
        .unwrap();
        let mut smearing = EnergySmearing::identity();
        detector().process_event(&mut ev, &mut smearing);
        assert!(ev.cut_passing(0));
        assert!(!ev.cut_passing(1));
        assert!(!ev.pass_flag());
        assert_approx_eq!(ev.edep(0), 0.511);
    }

    #[test]
    fn photon_leaving_through_open_volume_misses() {
        // Emitted outside the barrel radius, moving straight away from it.
        let hit = detector().compute_hit_point(
            FourVector::new(500.0, 0.0, 0.0, 0.0),
            FourVector::new(1.0, 0.0, 0.0, 1.0),
        );
        assert!(hit.is_none());
    }
}
