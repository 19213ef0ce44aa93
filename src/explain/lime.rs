//! Perturbation-based tabular explainer with quartile discretization.
//!
//! Each feature is split into quartile bins over the background matrix.
//! Perturbations draw a bin per feature from the background bin frequencies
//! and a value inside that bin; the surrogate is a kernel-weighted ridge
//! regression on "same bin as the row" indicators.
//!
//! TODO: fit the bins once on a training background shipped next to the
//! scaler artefact instead of on every uploaded batch.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::config::ExplainCfg;
use crate::model::domain::Classifier;

use super::domain::{Explainer, Explanation, ExplanationError, FeatureWeight};

const RIDGE_ALPHA: f64 = 1.0;
const STD_FLOOR: f64 = 1e-11;
const TRUNCATION_TRIES: usize = 16;

/// Per-feature quartile bins fitted on the background.
#[derive(Clone, Debug)]
struct FeatureBins {
    /// Sorted, de-duplicated quartile cut points.
    cuts: Vec<f64>,
    freqs: Vec<f64>,
    means: Vec<f64>,
    stds: Vec<f64>,
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl FeatureBins {
    fn fit(column: ArrayView1<'_, f64>) -> Self {
        let mut sorted: Vec<f64> = column.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut cuts: Vec<f64> = [0.25, 0.5, 0.75]
            .iter()
            .map(|&q| percentile(&sorted, q))
            .collect();
        cuts.dedup();

        let n_bins = cuts.len() + 1;
        let lo = sorted.first().copied().unwrap_or(0.0);
        let hi = sorted.last().copied().unwrap_or(0.0);
        let mut mins = vec![lo];
        mins.extend(&cuts);
        let mut maxs = cuts.clone();
        maxs.push(hi);

        let mut members: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
        for &v in column.iter() {
            members[bin_of(&cuts, v)].push(v);
        }

        let total = column.len().max(1) as f64;
        let freqs = members.iter().map(|m| m.len() as f64 / total).collect();
        let means: Vec<f64> = members
            .iter()
            .map(|m| if m.is_empty() { 0.0 } else { m.iter().sum::<f64>() / m.len() as f64 })
            .collect();
        let stds = members
            .iter()
            .zip(&means)
            .map(|(m, &mean)| {
                let var = if m.is_empty() {
                    0.0
                } else {
                    m.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / m.len() as f64
                };
                var.sqrt() + STD_FLOOR
            })
            .collect();

        Self {
            cuts,
            freqs,
            means,
            stds,
            mins,
            maxs,
        }
    }

    fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    fn sample_bin(&self, rng: &mut StdRng) -> usize {
        let u: f64 = rng.gen();
        let mut acc = 0.0;
        for (bin, &f) in self.freqs.iter().enumerate() {
            acc += f;
            if u < acc {
                return bin;
            }
        }
        self.n_bins() - 1
    }

    /// Normal draw around the bin mean, kept inside the bin bounds.
    fn sample_value(&self, bin: usize, rng: &mut StdRng) -> f64 {
        let (lo, hi) = (self.mins[bin], self.maxs[bin]);
        if hi - lo <= STD_FLOOR {
            return lo;
        }
        let (mean, std) = (self.means[bin], self.stds[bin]);
        for _ in 0..TRUNCATION_TRIES {
            let v = mean + std * standard_normal(rng);
            if (lo..=hi).contains(&v) {
                return v;
            }
        }
        mean.clamp(lo, hi)
    }

    fn condition(&self, name: &str, bin: usize) -> String {
        let last = self.n_bins() - 1;
        match bin {
            0 => format!("{name} <= {:.2}", self.cuts[0]),
            b if b == last => format!("{name} > {:.2}", self.cuts[last - 1]),
            b => format!("{:.2} < {name} <= {:.2}", self.cuts[b - 1], self.cuts[b]),
        }
    }
}

/// Tabular explainer fitted on one batch's scaled feature matrix.
#[derive(Clone, Debug)]
pub struct LimeTabular {
    names: Vec<String>,
    bins: Vec<FeatureBins>,
    num_samples: usize,
    kernel_width: f64,
    seed: u64,
}

impl LimeTabular {
    /// Fit the quartile discretizer on `background` (`[rows, features]`).
    pub fn fit(
        background: ArrayView2<'_, f64>,
        names: &[String],
        cfg: &ExplainCfg,
    ) -> Result<Self, ExplanationError> {
        if background.nrows() == 0 || background.ncols() == 0 {
            return Err(ExplanationError::EmptyBackground);
        }
        if names.len() != background.ncols() {
            return Err(ExplanationError::WidthMismatch {
                expected: names.len(),
                got: background.ncols(),
            });
        }
        let bins = background.axis_iter(Axis(1)).map(FeatureBins::fit).collect();
        let kernel_width = cfg
            .kernel_width
            .unwrap_or_else(|| (background.ncols() as f64).sqrt() * 0.75);

        Ok(Self {
            names: names.to_vec(),
            bins,
            num_samples: cfg.num_samples.max(1),
            kernel_width,
            seed: cfg.seed,
        })
    }

    /// Draw perturbations: `(binary indicators, continuous samples)`.
    /// Row 0 is always the instance itself.
    fn perturb(&self, instance: ArrayView1<'_, f64>, rng: &mut StdRng) -> (Array2<f64>, Array2<f64>) {
        let d = self.bins.len();
        let mut binary = Array2::<f64>::ones((self.num_samples, d));
        let mut inverse = Array2::<f64>::zeros((self.num_samples, d));
        inverse.row_mut(0).assign(&instance);

        for (j, bins) in self.bins.iter().enumerate() {
            let home = bin_of(&bins.cuts, instance[j]);
            for i in 1..self.num_samples {
                let bin = bins.sample_bin(rng);
                binary[[i, j]] = if bin == home { 1.0 } else { 0.0 };
                inverse[[i, j]] = bins.sample_value(bin, rng);
            }
        }
        (binary, inverse)
    }
}

impl Explainer for LimeTabular {
    fn explain(
        &self,
        row: usize,
        instance: ArrayView1<'_, f64>,
        model: &dyn Classifier,
    ) -> Result<Explanation, ExplanationError> {
        if instance.len() != self.bins.len() {
            return Err(ExplanationError::WidthMismatch {
                expected: self.bins.len(),
                got: instance.len(),
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(row as u64));
        let (binary, inverse) = self.perturb(instance, &mut rng);

        let targets = model.predict_proba(inverse.view());
        if targets.iter().any(|p| !p.is_finite()) {
            return Err(ExplanationError::NonFinitePredictions);
        }

        let origin = binary.row(0);
        let width2 = self.kernel_width * self.kernel_width;
        let weights: Array1<f64> = binary
            .axis_iter(Axis(0))
            .map(|sample| {
                let d2: f64 = sample.iter().zip(origin.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (-d2 / width2).exp().sqrt()
            })
            .collect();

        let fit = weighted_ridge(binary.view(), targets.view(), weights.view(), RIDGE_ALPHA)?;

        let mut feature_weights: Vec<FeatureWeight> = self
            .names
            .iter()
            .zip(&self.bins)
            .zip(fit.coef.iter())
            .enumerate()
            .map(|(j, ((name, bins), &weight))| FeatureWeight {
                feature: name.clone(),
                condition: bins.condition(name, bin_of(&bins.cuts, instance[j])),
                weight,
            })
            .collect();
        feature_weights.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

        Ok(Explanation {
            intercept: fit.intercept,
            local_prediction: fit.intercept + fit.coef.dot(&origin),
            score: fit.score,
            weights: feature_weights,
        })
    }
}

struct RidgeFit {
    coef: Array1<f64>,
    intercept: f64,
    score: f64,
}

/// Weighted ridge regression with an unpenalized intercept.
fn weighted_ridge(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    w: ArrayView1<'_, f64>,
    alpha: f64,
) -> Result<RidgeFit, ExplanationError> {
    let total: f64 = w.sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(ExplanationError::Singular);
    }
    let x_mean = x.t().dot(&w) / total;
    let y_mean = y.dot(&w) / total;

    let xc = &x - &x_mean;
    let yc = &y - y_mean;
    let xw = &xc * &w.insert_axis(Axis(1));

    let mut gram = xw.t().dot(&xc);
    for j in 0..gram.nrows() {
        gram[[j, j]] += alpha;
    }
    let rhs = xw.t().dot(&yc);
    let coef = solve_spd(gram, rhs)?;
    if coef.iter().any(|c| !c.is_finite()) {
        return Err(ExplanationError::NonFiniteCoefficients);
    }
    let intercept = y_mean - x_mean.dot(&coef);

    let residual = &yc - &xc.dot(&coef);
    let ss_res: f64 = residual.iter().zip(w.iter()).map(|(r, wi)| wi * r * r).sum();
    let ss_tot: f64 = yc.iter().zip(w.iter()).map(|(v, wi)| wi * v * v).sum();
    let score = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    Ok(RidgeFit {
        coef,
        intercept,
        score,
    })
}

/// Cholesky solve of a symmetric positive definite system.
fn solve_spd(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>, ExplanationError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let pivot = a[[i, i]] - dot;
                if !(pivot.is_finite() && pivot > 0.0) {
                    return Err(ExplanationError::Singular);
                }
                l[[i, i]] = pivot.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - dot) / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - dot) / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (z[i] - dot) / l[[i, i]];
    }
    Ok(x)
}

/// Bin index: number of cut points strictly below `v`.
fn bin_of(cuts: &[f64], v: f64) -> usize {
    cuts.iter().take_while(|&&c| c < v).count()
}

/// Linear-interpolated percentile of sorted data, `q` in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Box-Muller standard normal draw.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
