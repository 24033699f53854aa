use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::event::{Event, GammaKind};
use crate::histogram::Histogram;

/// Which deposited-energy value of a photon feeds the histograms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnergyMode {
    Raw,
    Smeared,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("histograms have different binning; per-bin curves need a shared energy axis")]
    BinningMismatch,
}

/// Scalar diagnostics at a fixed energy threshold. Ratios with a zero
/// denominator take the defined value 1 and `degenerate` is set so the
/// caller knows the convention kicked in; `clamped` is set when the
/// requested threshold fell outside the histogram range and the boundary
/// bin was used instead.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PointEstimate {
    pub threshold_mev: f64,
    pub efficiency: f64,
    pub purity_reference: f64,
    pub purity_prompt: f64,
    pub clamped: bool,
    pub degenerate: bool,
}

/// Accumulates deposited-energy samples partitioned by truth category and
/// derives threshold-sweep curves from them. Accumulation must finish
/// before any curve is read; the engine itself never filters events, the
/// caller decides which events are worth counting.
#[derive(Debug)]
pub struct ThresholdStatistics {
    h_all: Histogram,
    h_reference: Histogram,
    h_prompt: Histogram,
    // Weighted count of events by how many photons passed the cuts.
    cut_multiplicity: Vec<f64>,
}

impl ThresholdStatistics {
    pub fn new(n_bins: usize, e_max: f64) -> Self {
        Self {
            h_all: Histogram::new(n_bins, e_max),
            h_reference: Histogram::new(n_bins, e_max),
            h_prompt: Histogram::new(n_bins, e_max),
            cut_multiplicity: Vec::new(),
        }
    }

    pub fn h_all(&self) -> &Histogram { &self.h_all }
    pub fn h_reference(&self) -> &Histogram { &self.h_reference }
    pub fn h_prompt(&self) -> &Histogram { &self.h_prompt }
    pub fn cut_multiplicity(&self) -> &[f64] { &self.cut_multiplicity }

    /// Adds every cut-passing photon of the event to the combined histogram
    /// and to its truth-category histogram, weighted by the event weight.
    /// Also records the event's cut-passing multiplicity.
    pub fn accumulate(&mut self, event: &Event, mode: EnergyMode) {
        let weight = event.weight();
        for i in 0..event.num_products() {
            if !event.cut_passing(i) {
                continue;
            }
            let edep = match mode {
                EnergyMode::Raw => event.edep(i),
                EnergyMode::Smeared => event.edep_smear(i),
            };
            self.h_all.fill(edep, weight);
            match GammaKind::classify(event.four_momentum(i).t) {
                GammaKind::Reference511 => self.h_reference.fill(edep, weight),
                GammaKind::Prompt => self.h_prompt.fill(edep, weight),
            }
        }
        let n_passing = event.num_cut_passing();
        if self.cut_multiplicity.len() <= n_passing {
            self.cut_multiplicity.resize(n_passing + 1, 0.0);
        }
        self.cut_multiplicity[n_passing] += weight;
    }

    pub fn point_estimate(&self, threshold_mev: f64) -> PointEstimate {
        point_estimate(&self.h_all, &self.h_reference, &self.h_prompt, threshold_mev)
    }
}

/// Fraction of the histogram's mass at or below each bin's upper edge.
/// Non-decreasing, ends at 1.0 for any non-empty histogram; an empty
/// histogram yields all zeros.
pub fn efficiency_curve(h: &Histogram) -> Vec<f64> {
    let total = h.total();
    let cum = h.cumulative();
    if total <= 0.0 {
        return vec![0.0; h.n_bins()];
    }
    cum.into_iter().map(|c| c / total).collect()
}

/// Fraction of the histogram's mass strictly above each bin's upper edge.
/// Non-increasing, ends at 0.0.
pub fn one_minus_efficiency_curve(h: &Histogram) -> Vec<f64> {
    let total = h.total();
    let cum = h.cumulative();
    if total <= 0.0 {
        return vec![0.0; h.n_bins()];
    }
    cum.into_iter().map(|c| (total - c) / total).collect()
}

/// cumulative(subset)[i] / cumulative(all)[i] with the zero-denominator
/// convention: an empty denominator makes the ratio 1, never NaN. The two
/// histograms must share an energy axis.
pub fn purity_left_curve(h_all: &Histogram, h_subset: &Histogram) -> Result<Vec<f64>, StatsError> {
    if !h_all.same_binning(h_subset) {
        return Err(StatsError::BinningMismatch);
    }
    let cum_all = h_all.cumulative();
    let cum_sub = h_subset.cumulative();
    Ok(cum_all
        .iter()
        .zip(cum_sub.iter())
        .map(|(&den, &num)| ratio_or_one(num, den))
        .collect())
}

/// tail(subset)[i..] / tail(all)[i..], same zero-denominator convention.
pub fn purity_right_curve(h_all: &Histogram, h_subset: &Histogram) -> Result<Vec<f64>, StatsError> {
    if !h_all.same_binning(h_subset) {
        return Err(StatsError::BinningMismatch);
    }
    let last = h_all.n_bins() - 1;
    Ok((0..h_all.n_bins())
        .map(|i| ratio_or_one(h_subset.integral(i, last), h_all.integral(i, last)))
        .collect())
}

/// Efficiency and purities at a fixed threshold. Each histogram's threshold
/// bin is located independently; a shared index is reused only when the bin
/// edges are verified identical, never assumed.
pub fn point_estimate(
    h_all: &Histogram,
    h_reference: &Histogram,
    h_prompt: &Histogram,
    threshold_mev: f64,
) -> PointEstimate {
    let (bin_all, clamped_all) = h_all.find_bin(threshold_mev);
    let (bin_ref, clamped_ref) = if h_reference.same_binning(h_all) {
        (bin_all, clamped_all)
    } else {
        h_reference.find_bin(threshold_mev)
    };
    let (bin_prompt, clamped_prompt) = if h_prompt.same_binning(h_all) {
        (bin_all, clamped_all)
    } else {
        h_prompt.find_bin(threshold_mev)
    };
    let clamped = clamped_all || clamped_ref || clamped_prompt;
    if clamped {
        warn!(
            "threshold {:.4} MeV outside histogram range [0, {:.4}], clamped to boundary bin",
            threshold_mev,
            h_all.e_max()
        );
    }

    let below_all = h_all.integral(0, bin_all);
    let below_ref = h_reference.integral(0, bin_ref);
    let below_prompt = h_prompt.integral(0, bin_prompt);
    let total_ref = h_reference.total();

    let degenerate = total_ref <= 0.0 || below_all <= 0.0;
    PointEstimate {
        threshold_mev,
        efficiency: ratio_or_one(below_ref, total_ref),
        purity_reference: ratio_or_one(below_ref, below_all),
        purity_prompt: ratio_or_one(below_prompt, below_all),
        clamped,
        degenerate,
    }
}

// The deliberate, non-obvious convention from the original analysis: a
// zero-count denominator defines the ratio as 1, keeping curves well formed
// at the low-energy edge before any events have accumulated.
#[inline]
fn ratio_or_one(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        1.0
    } else {
        num / den
    }
}
