// THEORY:
// The `histogram` module implements Distribution Statistics, the leaf of the engine.
// Everything here is derived from a single 256-bin intensity histogram, built once
// from a single-channel array.
//
// Key architectural principles:
// 1.  **One pass, many statistics**: The histogram is the only pass over the pixels.
//     Entropy, bin-count dispersion, mean, median and variance are all read back
//     from the 256 counts, so their cost is independent of image size.
// 2.  **Entropy of the distribution**: Shannon entropy `-Σ p·log2(p)` in bits, over
//     bins with non-zero probability only. Empty bins contribute nothing, which is
//     what keeps a constant image at exactly 0 instead of NaN.
// 3.  **Shape, not brightness**: `histogram_std` is the population standard deviation
//     of the 256 bin *counts*. It describes how peaked the distribution is, not how
//     spread the intensities are (that is the tonal variance).

pub const BINS: usize = 256;

pub type Histogram = [u64; BINS];

/// Summary of one channel's intensity distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionStats {
    pub histogram: Histogram,
    /// Total number of samples counted.
    pub total: u64,
    /// Shannon entropy in bits, in [0, 8].
    pub entropy: f64,
    /// Population standard deviation of the bin counts.
    pub histogram_std: f64,
}

impl DistributionStats {
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let histogram = build_histogram(samples);
        Self::from_histogram(histogram)
    }

    pub fn from_histogram(histogram: Histogram) -> Self {
        let total: u64 = histogram.iter().sum();
        Self {
            entropy: shannon_entropy(&histogram, total),
            histogram_std: bin_count_std(&histogram, total),
            histogram,
            total,
        }
    }

    /// Mean intensity. Zero for an empty histogram.
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .histogram
            .iter()
            .enumerate()
            .map(|(value, &count)| value as f64 * count as f64)
            .sum();
        weighted / self.total as f64
    }

    /// Median intensity. For an even number of samples this is the mean of the two
    /// central order statistics. Zero for an empty histogram.
    pub fn median(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let lower_rank = (self.total - 1) / 2;
        let upper_rank = self.total / 2;
        let lower = self.value_at_rank(lower_rank);
        let upper = self.value_at_rank(upper_rank);
        (lower as f64 + upper as f64) / 2.0
    }

    /// Population variance of the intensities.
    pub fn variance(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let squared: f64 = self
            .histogram
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(value, &count)| count as f64 * (value as f64 - mean).powi(2))
            .sum();
        squared / self.total as f64
    }

    fn value_at_rank(&self, rank: u64) -> u8 {
        let mut seen = 0u64;
        for (value, &count) in self.histogram.iter().enumerate() {
            seen += count;
            if seen > rank {
                return value as u8;
            }
        }
        u8::MAX
    }
}

pub fn build_histogram<I>(samples: I) -> Histogram
where
    I: IntoIterator<Item = u8>,
{
    let mut histogram = [0u64; BINS];
    for sample in samples {
        histogram[sample as usize] += 1;
    }
    histogram
}

fn shannon_entropy(histogram: &Histogram, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let entropy: f64 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    // A single occupied bin sums to -0.0.
    entropy.max(0.0)
}

fn bin_count_std(histogram: &Histogram, total: u64) -> f64 {
    let mean = total as f64 / BINS as f64;
    let variance = histogram
        .iter()
        .map(|&count| (count as f64 - mean).powi(2))
        .sum::<f64>()
        / BINS as f64;
    variance.sqrt()
}
