use serde::Serialize;

/// One exported bin: `[low_edge, high_edge)` in MeV and its weighted count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BinTriple {
    pub low_edge: f64,
    pub high_edge: f64,
    pub count: f64,
}

/// Fixed-width weighted histogram over `[0, e_max)`. Samples outside the
/// range land in under/overflow counters and never contribute to bin
/// contents, cumulative sums or totals.
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: Vec<f64>,
    e_max: f64,
    bin_width: f64,
    underflow: f64,
    overflow: f64,
}

impl Histogram {
    /// `n_bins` and `e_max` must be positive; the config layer validates
    /// both before any histogram is built.
    pub fn new(n_bins: usize, e_max: f64) -> Self {
        Self {
            counts: vec![0.0; n_bins],
            e_max,
            bin_width: e_max / n_bins as f64,
            underflow: 0.0,
            overflow: 0.0,
        }
    }

    pub fn n_bins(&self) -> usize { self.counts.len() }
    pub fn e_max(&self) -> f64 { self.e_max }
    pub fn bin_width(&self) -> f64 { self.bin_width }
    pub fn counts(&self) -> &[f64] { &self.counts }
    pub fn underflow(&self) -> f64 { self.underflow }
    pub fn overflow(&self) -> f64 { self.overflow }

    pub fn bin_low_edge(&self, bin: usize) -> f64 { bin as f64 * self.bin_width }
    pub fn bin_high_edge(&self, bin: usize) -> f64 { (bin + 1) as f64 * self.bin_width }

    pub fn fill(&mut self, value: f64, weight: f64) {
        if value < 0.0 {
            self.underflow += weight;
        } else if value >= self.e_max {
            self.overflow += weight;
        } else {
            let bin = ((value / self.bin_width) as usize).min(self.counts.len() - 1);
            self.counts[bin] += weight;
        }
    }

    /// Sum of all in-range bin contents.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Inclusive sum of bins `lo..=hi`, clamped to the valid range.
    pub fn integral(&self, lo: usize, hi: usize) -> f64 {
        if lo > hi || lo >= self.counts.len() {
            return 0.0;
        }
        let hi = hi.min(self.counts.len() - 1);
        self.counts[lo..=hi].iter().sum()
    }

    /// Prefix sums from the low-energy edge: element i is the sum of bins
    /// `0..=i`.
    pub fn cumulative(&self) -> Vec<f64> {
        let mut acc = 0.0;
        self.counts
            .iter()
            .map(|&c| {
                acc += c;
                acc
            })
            .collect()
    }

    /// Locates the bin whose `[low_edge, high_edge)` interval contains the
    /// threshold; a threshold exactly on a bin edge resolves to the bin
    /// whose lower edge equals it. Out-of-range thresholds clamp to the
    /// boundary bin, reported through the second element.
    pub fn find_bin(&self, threshold: f64) -> (usize, bool) {
        if threshold < 0.0 {
            return (0, true);
        }
        if threshold > self.e_max {
            return (self.counts.len() - 1, true);
        }
        if threshold == self.e_max {
            return (self.counts.len() - 1, false);
        }
        (((threshold / self.bin_width) as usize).min(self.counts.len() - 1), false)
    }

    /// True when two histograms share an identical energy axis and the same
    /// bin index therefore refers to the same energy interval in both.
    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.counts.len() == other.counts.len()
            && (self.e_max - other.e_max).abs() < 1.0e-12
    }

    pub fn export(&self) -> Vec<BinTriple> {
        (0..self.counts.len())
            .map(|i| BinTriple {
                low_edge: self.bin_low_edge(i),
                high_edge: self.bin_high_edge(i),
                count: self.counts[i],
            })
            .collect()
    }
}
