use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::vecmath::FourVector;

/// Nominal annihilation-quantum energy in MeV.
pub const REFERENCE_ENERGY_MEV: f64 = 0.511;

// Tolerance used when classifying an emitted photon as a 511 keV quantum.
const CLASSIFY_TOLERANCE_MEV: f64 = 0.01;

/// Decay channel that produced the event's photons. `Wrong` marks a
/// malformed/unusable record and never passes reconstruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayType {
    Wrong,
    One,
    Two,
    Three,
    TwoAndOne,
    TwoAndN,
}

impl DecayType {
    /// Parses the integer codes used in event records (0..=5).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Wrong),
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::TwoAndOne),
            5 => Some(Self::TwoAndN),
            _ => None,
        }
    }

    /// Product indices that must all pass the detector cuts for the event
    /// to be reconstructible. This is the policy table: the grouping per
    /// channel lives here, nowhere else. For the mixed channels
    /// (`TwoAndOne`, `TwoAndN`) the requirement is the annihilation pair,
    /// always stored first.
    pub fn required_indices(self) -> &'static [usize] {
        match self {
            Self::Wrong => &[],
            Self::One => &[0],
            Self::Two => &[0, 1],
            Self::Three => &[0, 1, 2],
            Self::TwoAndOne | Self::TwoAndN => &[0, 1],
        }
    }
}

/// Truth category of a photon, used to partition deposited-energy samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GammaKind {
    Reference511,
    Prompt,
}

impl GammaKind {
    /// Classifies a photon by its emitted energy in MeV.
    pub fn classify(energy_mev: f64) -> Self {
        if (energy_mev - REFERENCE_ENERGY_MEV).abs() <= CLASSIFY_TOLERANCE_MEV {
            Self::Reference511
        } else {
            Self::Prompt
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedEventError {
    #[error("event {id} has no decay products")]
    NoProducts { id: i64 },
    #[error("event {id} has {emission_points} emission points but {momenta} four-momenta")]
    MismatchedLengths { id: i64, emission_points: usize, momenta: usize },
}

/// One simulated decay. Per-photon attributes are stored as index-aligned
/// parallel vectors of identical length; index i always refers to the same
/// photon across all of them. Hit points, angles and deposited energies are
/// only meaningful where `cut_passing(i)` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: i64,
    decay_type: DecayType,
    weight: f64,
    emission_points: Vec<FourVector>, // x, y, z [mm], t [s]
    four_momenta: Vec<FourVector>,    // px, py, pz [MeV/c], E [MeV]
    cut_passing: Vec<bool>,
    primary: Vec<bool>,
    hit_points: Vec<FourVector>, // x, y, z [mm], t [us]
    hit_phi: Vec<f64>,
    hit_theta: Vec<f64>,
    edep: Vec<f64>,
    edep_smear: Vec<f64>,
    // Cached; recomputed whenever any cut_passing entry changes.
    pass_flag: bool,
}

impl Event {
    /// Builds an event from raw simulation output. Derived fields start
    /// unset and are filled by the geometry stage. Fails on zero products
    /// or mismatched sequence lengths; a malformed event is rejected whole,
    /// never partially processed.
    pub fn new(
        id: i64,
        decay_type: DecayType,
        weight: f64,
        emission_points: Vec<FourVector>,
        four_momenta: Vec<FourVector>,
    ) -> Result<Self, MalformedEventError> {
        if emission_points.is_empty() || four_momenta.is_empty() {
            return Err(MalformedEventError::NoProducts { id });
        }
        if emission_points.len() != four_momenta.len() {
            return Err(MalformedEventError::MismatchedLengths {
                id,
                emission_points: emission_points.len(),
                momenta: four_momenta.len(),
            });
        }
        let n = emission_points.len();
        Ok(Self {
            id,
            decay_type,
            weight,
            emission_points,
            four_momenta,
            cut_passing: vec![false; n],
            primary: vec![true; n],
            hit_points: vec![FourVector::zero(); n],
            hit_phi: vec![0.0; n],
            hit_theta: vec![0.0; n],
            edep: vec![0.0; n],
            edep_smear: vec![0.0; n],
            pass_flag: false,
        })
    }

    pub fn id(&self) -> i64 { self.id }
    pub fn decay_type(&self) -> DecayType { self.decay_type }
    pub fn weight(&self) -> f64 { self.weight }
    pub fn num_products(&self) -> usize { self.four_momenta.len() }
    pub fn emission_point(&self, i: usize) -> FourVector { self.emission_points[i] }
    pub fn four_momentum(&self, i: usize) -> FourVector { self.four_momenta[i] }
    pub fn cut_passing(&self, i: usize) -> bool { self.cut_passing.get(i).copied().unwrap_or(false) }
    pub fn is_primary(&self, i: usize) -> bool { self.primary.get(i).copied().unwrap_or(false) }
    pub fn hit_point(&self, i: usize) -> FourVector { self.hit_points[i] }
    pub fn hit_phi(&self, i: usize) -> f64 { self.hit_phi[i] }
    pub fn hit_theta(&self, i: usize) -> f64 { self.hit_theta[i] }
    pub fn edep(&self, i: usize) -> f64 { self.edep[i] }
    pub fn edep_smear(&self, i: usize) -> f64 { self.edep_smear[i] }
    pub fn pass_flag(&self) -> bool { self.pass_flag }

    /// Number of photons that individually passed the cuts.
    pub fn num_cut_passing(&self) -> usize {
        self.cut_passing.iter().filter(|&&p| p).count()
    }

    pub fn set_cut_passing(&mut self, i: usize, val: bool) {
        if i < self.cut_passing.len() {
            self.cut_passing[i] = val;
            self.pass_flag = self.derive_pass_flag();
        }
    }

    pub fn set_primary(&mut self, i: usize, is_primary: bool) {
        if i < self.primary.len() {
            self.primary[i] = is_primary;
        }
    }

    pub fn set_hit(&mut self, i: usize, point: FourVector, phi: f64, theta: f64) {
        self.hit_points[i] = point;
        self.hit_phi[i] = phi;
        self.hit_theta[i] = theta;
    }

    pub fn set_edep(&mut self, i: usize, val: f64) { self.edep[i] = val; }
    pub fn set_edep_smear(&mut self, i: usize, val: f64) { self.edep_smear[i] = val; }

    /// Evaluates the decay-type policy: all required product indices must
    /// exist and have passed their cuts.
    fn derive_pass_flag(&self) -> bool {
        if self.decay_type == DecayType::Wrong {
            return false;
        }
        self.decay_type
            .required_indices()
            .iter()
            .all(|&i| self.cut_passing.get(i).copied().unwrap_or(false))
    }
}
