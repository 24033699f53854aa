use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Experimental energy-resolution model: a deposited energy E is replaced by
/// a Gaussian sample centered on E with sigma = `resolution_coeff` * sqrt(E),
/// the fractional resolution of the scintillator readout. Deterministic for
/// a fixed seed; negative samples are clamped to zero.
#[derive(Debug)]
pub struct EnergySmearing {
    resolution_coeff: f64,
    rng: StdRng,
}

impl EnergySmearing {
    pub fn new(resolution_coeff: f64, seed: u64) -> Self {
        Self { resolution_coeff, rng: StdRng::seed_from_u64(seed) }
    }

    /// Pass-through model, no smearing applied.
    pub fn identity() -> Self {
        Self::new(0.0, 0)
    }

    pub fn smear(&mut self, energy_mev: f64) -> f64 {
        if self.resolution_coeff <= 0.0 || energy_mev <= 0.0 {
            return energy_mev;
        }
        let sigma = self.resolution_coeff * energy_mev.sqrt();
        match Normal::new(energy_mev, sigma) {
            Ok(dist) => dist.sample(&mut self.rng).max(0.0),
            // Non-finite sigma only arises from non-finite input; keep it raw.
            Err(_) => energy_mev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn identity_model_returns_input() {
        let mut s = EnergySmearing::identity();
        assert_approx_eq!(s.smear(0.511), 0.511);
    }

    #[test]
    fn same_seed_same_samples() {
        let mut a = EnergySmearing::new(0.044, 42);
        let mut b = EnergySmearing::new(0.044, 42);
        for _ in 0..10 {
            assert_approx_eq!(a.smear(0.511), b.smear(0.511));
        }
    }

    #[test]
    fn smeared_values_stay_non_negative() {
        // Huge resolution so the Gaussian often crosses zero.
        let mut s = EnergySmearing::new(5.0, 1);
        for _ in 0..1000 {
            assert!(s.smear(0.05) >= 0.0);
        }
    }

    #[test]
    fn samples_scatter_around_the_true_energy() {
        let mut s = EnergySmearing::new(0.044, 7);
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| s.smear(0.511)).sum::<f64>() / n as f64;
        assert_approx_eq!(mean, 0.511, 2e-3);
    }
}
