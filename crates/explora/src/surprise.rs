// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Bayesian surprise
//!
//! Rates per region (counties, say) are easy to misread: small regions swing wildly,
//! large ones barely move. Surprise weighs each region's deviation from the mean rate
//! by how much of the population it holds, and reports how improbable that deviation
//! is, signed by its direction.
//!
//! For every row, with `mean` and `sd` the mean and sample standard deviation of the
//! rate column:
//!
//! * `z = (rate − mean) / sd`
//! * `t = (rate − mean) / (sd / √(population / Σ population))`
//! * `p = max(2 · (1 − Φ(|t|)), 1e-10)`
//! * `surprise = ±|p · log₂ p|`, positive above the mean, and `0` for a zero rate.
//!
//! ```
//! use explora::surprise::{Frame, Surprise};
//!
//! let mut frame = Frame::new();
//! frame.insert("name", vec!["A", "B", "C"]).unwrap();
//! frame.insert("state", vec!["X", "X", "Y"]).unwrap();
//! frame.insert("global_rate", vec![1.0, 2.0, 3.0]).unwrap();
//! frame.insert("global_population", vec![100.0, 100.0, 100.0]).unwrap();
//!
//! Surprise::new("global_rate", "global_population")
//!     .calculate(&mut frame)
//!     .unwrap();
//!
//! let surprise = frame.numbers("global_surprise").unwrap();
//!
//! assert!(surprise[0] < 0.0);
//! assert_eq!(surprise[1], 0.0);
//! assert!(surprise[2] > 0.0);
//! ```

use serde::Serialize;

use crate::report::{Error, ErrorKind, Report};

mod frame;
pub mod normal;

pub use frame::{Column, Frame};

/// Floor for the tail probability, so that `p · log₂ p` stays finite.
pub const MIN_PROBABILITY: f64 = 1e-10;

/// Name of the group computed over the whole population.
pub const GLOBAL: &str = "global";

/// One group of rates, and the populations they were measured over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurpriseGroup {
    name: String,
    rate_key: String,
    population_key: String,
}

/// Everything computed for a group, row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSurprise {
    pub mean: f64,
    pub std_dev: f64,
    pub z_scores: Vec<f64>,
    /// Tail probability of each row's deviation.
    pub p_ms: Vec<f64>,
    pub kl: Vec<f64>,
    pub surprise: Vec<f64>,
}

impl SurpriseGroup {
    pub fn new<N, R, P>(name: N, rate_key: R, population_key: P) -> Self
    where
        N: Into<String>,
        R: Into<String>,
        P: Into<String>,
    {
        SurpriseGroup {
            name: name.into(),
            rate_key: rate_key.into(),
            population_key: population_key.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn z_score_key(&self) -> String {
        format!("{}_zScore", self.name)
    }

    pub fn surprise_key(&self) -> String {
        format!("{}_surprise", self.name)
    }

    /// Compute the group's statistics without touching the frame.
    pub fn compute(&self, frame: &Frame) -> Report<GroupSurprise> {
        let rates = frame.numbers(&self.rate_key)?;
        let populations = frame.numbers(&self.population_key)?;

        let (mean, std_dev) = mean_and_std_dev(rates).ok_or_else(|| {
            Error::new(
                ErrorKind::Degenerate,
                format!(
                    "group `{}` needs at least two distinct rates in `{}`",
                    self.name, self.rate_key
                ),
            )
        })?;

        let total: f64 = populations.iter().sum();

        if total.is_nan() || total <= 0.0 {
            return Err(Error::new(
                ErrorKind::Degenerate,
                format!(
                    "group `{}` has no population in `{}`",
                    self.name, self.population_key
                ),
            ));
        }

        let rows = rates.len();
        let mut out = GroupSurprise {
            mean,
            std_dev,
            z_scores: Vec::with_capacity(rows),
            p_ms: Vec::with_capacity(rows),
            kl: Vec::with_capacity(rows),
            surprise: Vec::with_capacity(rows),
        };

        for (&rate, &population) in rates.iter().zip(populations) {
            let deviation = rate - mean;
            let t = deviation / (std_dev / (population / total).sqrt());

            let p = normal::two_sided_p(t).clamp(MIN_PROBABILITY, 1.0);
            let kl = p * p.log2();

            let surprise = if rate == 0.0 {
                0.0
            } else if deviation > 0.0 {
                kl.abs()
            } else {
                -kl.abs()
            };

            out.z_scores.push(deviation / std_dev);
            out.p_ms.push(p);
            out.kl.push(kl);
            out.surprise.push(surprise);
        }

        Ok(out)
    }

    /// Compute the group's statistics and write z-scores and surprise back into
    /// the frame as `{name}_zScore` and `{name}_surprise`.
    pub fn calculate(&self, frame: &mut Frame) -> Report<GroupSurprise> {
        let out = self.compute(frame)?;

        frame.insert(self.z_score_key(), out.z_scores.clone())?;
        frame.insert(self.surprise_key(), out.surprise.clone())?;

        log::debug!(
            "surprise for `{}`: mean {:.4}, sd {:.4} over {} rows",
            self.name,
            out.mean,
            out.std_dev,
            frame.rows()
        );

        Ok(out)
    }
}

fn mean_and_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev > 0.0 && std_dev.is_finite() {
        Some((mean, std_dev))
    } else {
        None
    }
}

/// Surprise over a global rate and any number of sub-groups (demographics, for
/// example) measured on the same rows.
#[derive(Debug, Clone)]
pub struct Surprise {
    global: SurpriseGroup,
    groups: Vec<SurpriseGroup>,
}

/// One bar of the per-state surprise chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub name: String,
    pub state: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Surprise")]
    pub surprise: f64,
}

impl Surprise {
    pub fn new<R, P>(global_rate_key: R, global_population_key: P) -> Self
    where
        R: Into<String>,
        P: Into<String>,
    {
        Surprise {
            global: SurpriseGroup::new(GLOBAL, global_rate_key, global_population_key),
            groups: Vec::new(),
        }
    }

    /// Add a sub-group.
    pub fn group<N, R, P>(mut self, name: N, rate_key: R, population_key: P) -> Self
    where
        N: Into<String>,
        R: Into<String>,
        P: Into<String>,
    {
        self.groups
            .push(SurpriseGroup::new(name, rate_key, population_key));
        self
    }

    pub fn groups(&self) -> &[SurpriseGroup] {
        &self.groups
    }

    pub fn global(&self) -> &SurpriseGroup {
        &self.global
    }

    /// Surprise columns of the sub-groups, in the order they were added.
    pub fn surprise_keys(&self) -> Vec<String> {
        self.groups.iter().map(SurpriseGroup::surprise_key).collect()
    }

    /// Run every sub-group, then the global group.
    pub fn calculate(&self, frame: &mut Frame) -> Report<()> {
        for group in &self.groups {
            group.calculate(frame)?;
        }

        self.global.calculate(frame)?;

        Ok(())
    }

    /// Long-format rows for one state: every region of the state once per sub-group,
    /// then once more for the global surprise. Needs `name` and `state` text columns
    /// and a previous [`calculate`](Surprise::calculate).
    pub fn chart_rows(&self, frame: &Frame, state: &str) -> Report<Vec<ChartRow>> {
        let names = frame.text("name")?;
        let states = frame.text("state")?;

        let mut keys = self.surprise_keys();
        keys.push(self.global.surprise_key());

        let mut rows = Vec::new();

        for key in keys {
            let surprise = frame.numbers(&key)?;

            for ((name, s), &value) in names.iter().zip(states).zip(surprise) {
                if s != state {
                    continue;
                }

                rows.push(ChartRow {
                    name: name.clone(),
                    state: s.clone(),
                    group: key.clone(),
                    surprise: value,
                });
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    fn frame() -> Frame {
        let mut frame = Frame::new();
        frame.insert("name", vec!["A", "B", "C", "D"]).unwrap();
        frame.insert("state", vec!["X", "X", "Y", "X"]).unwrap();
        frame.insert("global_rate", vec![1.0, 2.0, 3.0, 2.0]).unwrap();
        frame.insert("global_population", vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        frame.insert("young_rate", vec![0.0, 4.0, 2.0, 2.0]).unwrap();
        frame.insert("young_population", vec![5.0, 1.0, 1.0, 1.0]).unwrap();
        frame
    }

    #[test]
    fn mean_and_sample_deviation() {
        let (mean, sd) = mean_and_std_dev(&[1.0, 2.0, 3.0]).unwrap();

        assert_eq!(mean, 2.0);
        assert_eq!(sd, 1.0);

        assert!(mean_and_std_dev(&[1.0]).is_none());
        assert!(mean_and_std_dev(&[2.0, 2.0]).is_none());
    }

    #[test]
    fn known_values() {
        let mut frame = Frame::new();
        frame.insert("rate", vec![1.0, 2.0, 3.0]).unwrap();
        frame.insert("pop", vec![1.0, 1.0, 1.0]).unwrap();

        let out = SurpriseGroup::new("g", "rate", "pop").compute(&frame).unwrap();

        assert_eq!(out.z_scores, [-1.0, 0.0, 1.0]);

        // t = ±1/√3 → two-sided p ≈ 0.5637
        assert!(close(out.p_ms[0], 0.563_703));
        assert!(close(out.p_ms[1], 1.0));
        assert!(close(out.kl[2], -0.466_177));

        assert!(close(out.surprise[0], -0.466_177));
        assert!(close(out.surprise[1], 0.0));
        assert!(close(out.surprise[2], 0.466_177));
    }

    #[test]
    fn zero_rate_has_no_surprise() {
        let out = SurpriseGroup::new("young", "young_rate", "young_population")
            .compute(&frame())
            .unwrap();

        assert_eq!(out.surprise[0], 0.0);
        assert!(out.z_scores[0] < 0.0);
    }

    #[test]
    fn probability_floor() {
        let mut rates = vec![0.001; 99];
        let mut populations = vec![1.0; 99];
        rates.push(1000.0);
        populations.push(1e9);

        let mut frame = Frame::new();
        frame.insert("rate", rates).unwrap();
        frame.insert("pop", populations).unwrap();

        let out = SurpriseGroup::new("g", "rate", "pop").compute(&frame).unwrap();

        assert_eq!(out.p_ms[99], MIN_PROBABILITY);
        assert!(out.surprise[99] > 0.0);
        assert!(out.surprise[0] <= 0.0);
        assert!(out.kl.iter().all(|kl| kl.is_finite()));
    }

    #[test]
    fn calculate_writes_columns() {
        let mut frame = frame();

        Surprise::new("global_rate", "global_population")
            .group("young", "young_rate", "young_population")
            .calculate(&mut frame)
            .unwrap();

        for column in [
            "young_zScore",
            "young_surprise",
            "global_zScore",
            "global_surprise",
        ] {
            assert_eq!(frame.numbers(column).unwrap().len(), 4, "{column}");
        }
    }

    #[test]
    fn chart_rows_for_state() {
        let mut frame = frame();
        let surprise =
            Surprise::new("global_rate", "global_population").group("young", "young_rate", "young_population");

        surprise.calculate(&mut frame).unwrap();

        let rows = surprise.chart_rows(&frame, "X").unwrap();
        let labels: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.group.as_str())).collect();

        assert_eq!(
            labels,
            [
                ("A", "young_surprise"),
                ("B", "young_surprise"),
                ("D", "young_surprise"),
                ("A", "global_surprise"),
                ("B", "global_surprise"),
                ("D", "global_surprise"),
            ]
        );

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["Group"], "young_surprise");
        assert_eq!(json["name"], "A");
    }

    #[test]
    fn chart_rows_need_calculate() {
        let frame = frame();
        let surprise = Surprise::new("global_rate", "global_population");

        let err = surprise.chart_rows(&frame, "X").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingColumn);
    }

    #[test]
    fn degenerate_groups() {
        let mut frame = Frame::new();
        frame.insert("rate", vec![3.0, 3.0]).unwrap();
        frame.insert("pop", vec![1.0, 1.0]).unwrap();
        frame.insert("nobody", vec![0.0, 0.0]).unwrap();
        frame.insert("spread", vec![1.0, 2.0]).unwrap();

        let flat = SurpriseGroup::new("g", "rate", "pop").compute(&frame);
        assert_eq!(flat.unwrap_err().kind(), ErrorKind::Degenerate);

        let empty = SurpriseGroup::new("g", "spread", "nobody").compute(&frame);
        assert_eq!(empty.unwrap_err().kind(), ErrorKind::Degenerate);

        let missing = SurpriseGroup::new("g", "spread", "absent").compute(&frame);
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::MissingColumn);
    }
}
