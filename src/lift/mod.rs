//! Quantile-lift analysis
//!
//! Splits each cohort into score quantiles and reports volume, event rate,
//! score range and lift per bucket. Bucket 1 holds the lowest scores.
//! Cut points are always computed within a cohort, so train and test tables
//! line up by position, not by absolute score.

use crate::error::{Result, ScoringError};
use crate::sample::{check_aligned, ScoredSample};
use crate::utils::{ascending_order, count_distinct, rank_bucket, sorted};
use serde::{Deserialize, Serialize};

/// What to do when a cohort has fewer distinct scores than requested buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationPolicy {
    /// Use as many buckets as there are distinct scores
    #[default]
    ReduceBuckets,
    /// Return [`ScoringError::InsufficientVariation`]
    Fail,
}

/// Quantile-lift configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftConfig {
    /// Number of quantile buckets
    pub n_quantiles: usize,
    pub policy: VariationPolicy,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            n_quantiles: 10,
            policy: VariationPolicy::ReduceBuckets,
        }
    }
}

impl LiftConfig {
    pub fn new(n_quantiles: usize) -> Self {
        Self {
            n_quantiles,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: VariationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_quantiles == 0 {
            return Err(ScoringError::invalid_parameter(
                "n_quantiles",
                self.n_quantiles,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// One score quantile of a cohort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileBucket {
    /// 1-based, 1 = lowest scores
    pub index: usize,
    pub cohort: String,
    pub score_min: f64,
    pub score_max: f64,
    pub count: usize,
    pub events: usize,
    pub event_rate: f64,
    /// Bucket event rate over cohort event rate; `None` without events
    pub lift: Option<f64>,
    /// Share of all cohort events captured from the top bucket down to this one
    pub cumulative_capture: Option<f64>,
}

/// Quantile table of one cohort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortLift {
    pub cohort: String,
    pub requested_quantiles: usize,
    /// Buckets actually used; lower than requested only under
    /// [`VariationPolicy::ReduceBuckets`]
    pub n_quantiles: usize,
    pub n_records: usize,
    pub event_rate: f64,
    pub buckets: Vec<QuantileBucket>,
}

impl CohortLift {
    pub fn was_reduced(&self) -> bool {
        self.n_quantiles < self.requested_quantiles
    }
}

/// Quantile-lift analyzer
#[derive(Debug, Clone, Default)]
pub struct QuantileLiftAnalyzer {
    config: LiftConfig,
}

impl QuantileLiftAnalyzer {
    pub fn new(config: LiftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LiftConfig {
        &self.config
    }

    /// One table per cohort, in cohort order
    pub fn analyze(&self, sample: &ScoredSample) -> Result<Vec<CohortLift>> {
        sample
            .cohort_groups()
            .into_iter()
            .map(|(cohort, indices)| {
                let (labels, scores) = sample.select(&indices);
                self.analyze_cohort(&cohort, &labels, &scores)
            })
            .collect()
    }

    /// Table for a single cohort.
    ///
    /// Records are ranked by score with a stable sort, so tied scores keep
    /// their original order and may straddle a cut point; bucket sizes never
    /// differ by more than one.
    pub fn analyze_cohort(&self, cohort: &str, labels: &[bool], scores: &[f64]) -> Result<CohortLift> {
        check_aligned(labels.len(), scores)?;

        let requested = self.config.n_quantiles;
        let distinct = count_distinct(&sorted(scores));
        let n_quantiles = if distinct < requested {
            match self.config.policy {
                VariationPolicy::ReduceBuckets => distinct,
                VariationPolicy::Fail => {
                    return Err(ScoringError::InsufficientVariation { requested, distinct })
                }
            }
        } else {
            requested
        };

        let n = scores.len();
        let total_events = labels.iter().filter(|&&l| l).count();
        let cohort_rate = total_events as f64 / n as f64;

        let mut counts = vec![0usize; n_quantiles];
        let mut events = vec![0usize; n_quantiles];
        let mut mins = vec![f64::INFINITY; n_quantiles];
        let mut maxs = vec![f64::NEG_INFINITY; n_quantiles];

        for (rank, &i) in ascending_order(scores).iter().enumerate() {
            let b = rank_bucket(rank, n, n_quantiles);
            counts[b] += 1;
            if labels[i] {
                events[b] += 1;
            }
            mins[b] = mins[b].min(scores[i]);
            maxs[b] = maxs[b].max(scores[i]);
        }

        let mut buckets: Vec<QuantileBucket> = (0..n_quantiles)
            .map(|b| {
                let event_rate = events[b] as f64 / counts[b] as f64;
                QuantileBucket {
                    index: b + 1,
                    cohort: cohort.to_string(),
                    score_min: mins[b],
                    score_max: maxs[b],
                    count: counts[b],
                    events: events[b],
                    event_rate,
                    lift: (total_events > 0).then(|| event_rate / cohort_rate),
                    cumulative_capture: None,
                }
            })
            .collect();

        if total_events > 0 {
            let mut captured = 0usize;
            for bucket in buckets.iter_mut().rev() {
                captured += bucket.events;
                bucket.cumulative_capture = Some(captured as f64 / total_events as f64);
            }
        }

        Ok(CohortLift {
            cohort: cohort.to_string(),
            requested_quantiles: requested,
            n_quantiles,
            n_records: n,
            event_rate: cohort_rate,
            buckets,
        })
    }
}
