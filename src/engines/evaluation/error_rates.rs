use crate::data::Dataset;

/// Source of the two error statistics a forest's fitness is built from.
///
/// `estimates` holds `outputs` values per dataset row. Both returned rates
/// lie in `[0, 1]` and lower is better.
pub trait ErrorRates: Send + Sync {
    fn error_rates(&self, dataset: &Dataset, estimates: &[f64], outputs: usize) -> (f64, f64);
}

/// Fuzzy precision and recall of the estimates against the target columns.
///
/// Per target, `tp = sum(min(estimate, target))`; precision is `tp` over the
/// estimate sum and recall `tp` over the target sum. Both are averaged over
/// targets and returned as `(1 - precision, 1 - recall)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetErrorRates;

impl ErrorRates for TargetErrorRates {
    fn error_rates(&self, dataset: &Dataset, estimates: &[f64], outputs: usize) -> (f64, f64) {
        let targets = outputs.min(dataset.targets());
        if targets == 0 {
            return (1.0, 1.0);
        }

        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;

        for t in 0..targets {
            let mut true_positive = 0.0;
            let mut estimated = 0.0;

            for row in 0..dataset.records() {
                if Some(row) == dataset.leave_out_idx() {
                    continue;
                }
                let estimate = estimates[row * outputs + t];
                let target = dataset.target_values(row)[t];
                true_positive += estimate.min(target);
                estimated += estimate;
            }

            let sigma = dataset.sigma(t);
            precision_sum += if estimated > 0.0 { true_positive / estimated } else { 0.0 };
            recall_sum += if sigma > 0.0 { true_positive / sigma } else { 0.0 };
        }

        let precision = precision_sum / targets as f64;
        let recall = recall_sum / targets as f64;
        (1.0 - precision, 1.0 - recall)
    }
}
