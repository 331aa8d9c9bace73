//! Binned fake-rate lookup tables.
//!
//! The fake-rate measurement is produced upstream (dijet / W+jet control
//! samples) and delivered as a calibration artifact: one 2-D (pt, |eta|)
//! table per lepton flavor and per numerator/denominator ID pair. The
//! engine only reads it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use hpp_core::{Error, Flavor, IdTier, Result};

/// A fake-rate value with its statistical uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeRate {
    /// Measured fake rate.
    pub rate: f64,
    /// Statistical error on the rate.
    pub error: f64,
}

/// Fake-rate source seam.
///
/// Implemented by the binned calibration tables in production and by
/// uniform tables in tests.
pub trait FakeRates: Send + Sync {
    /// Look up the rate for one lepton. `pt` above 100 GeV is capped to
    /// 99 before the bin search; out-of-range values clamp to the boundary
    /// bin, never an error.
    fn lookup(&self, flavor: Flavor, pt: f64, eta: f64, num: IdTier, denom: IdTier)
        -> Result<FakeRate>;
}

/// One 2-D binned table: rates\[pt_bin\]\[eta_bin\].
#[derive(Debug, Clone, Deserialize)]
pub struct RateTable2D {
    /// Pt bin edges (length = n_pt + 1, increasing).
    pub pt_edges: Vec<f64>,
    /// |eta| bin edges (length = n_eta + 1, increasing).
    pub eta_edges: Vec<f64>,
    /// Rates, outer index pt bin, inner index eta bin.
    pub rates: Vec<Vec<f64>>,
    /// Errors, same shape as `rates`.
    pub errors: Vec<Vec<f64>>,
}

impl RateTable2D {
    fn validate(&self) -> Result<()> {
        let n_pt = self.pt_edges.len().saturating_sub(1);
        let n_eta = self.eta_edges.len().saturating_sub(1);
        if n_pt == 0 || n_eta == 0 {
            return Err(Error::Config("fake-rate table needs at least one bin per axis".into()));
        }
        if !self.pt_edges.windows(2).all(|w| w[0] < w[1])
            || !self.eta_edges.windows(2).all(|w| w[0] < w[1])
        {
            return Err(Error::Config("fake-rate bin edges must be increasing".into()));
        }
        if self.rates.len() != n_pt
            || self.errors.len() != n_pt
            || self.rates.iter().any(|row| row.len() != n_eta)
            || self.errors.iter().any(|row| row.len() != n_eta)
        {
            return Err(Error::Config(format!(
                "fake-rate table shape mismatch ({n_pt} pt bins × {n_eta} eta bins)"
            )));
        }
        Ok(())
    }

    fn lookup(&self, pt: f64, eta: f64) -> FakeRate {
        let pt = if pt > 100.0 { 99.0 } else { pt };
        let i = clamped_bin(&self.pt_edges, pt);
        let j = clamped_bin(&self.eta_edges, eta.abs());
        FakeRate { rate: self.rates[i][j], error: self.errors[i][j] }
    }
}

/// Bin index for `val`, clamped to the boundary bins.
fn clamped_bin(edges: &[f64], val: f64) -> usize {
    let n_bins = edges.len() - 1;
    if val < edges[0] {
        return 0;
    }
    if val >= edges[n_bins] {
        return n_bins - 1;
    }
    match edges.binary_search_by(|e| e.total_cmp(&val)) {
        Ok(i) => i.min(n_bins - 1),
        Err(i) => i - 1,
    }
}

/// Fake-rate tables loaded from a calibration artifact.
///
/// The artifact is a JSON object keyed first by flavor (`e`, `m`, `t`),
/// then by ID pair (`tight_loose`, `tight_medium`, `medium_loose`).
#[derive(Debug, Clone)]
pub struct BinnedFakeRates {
    tables: HashMap<(Flavor, IdTier, IdTier), RateTable2D>,
}

impl BinnedFakeRates {
    /// Load from a JSON calibration artifact on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, HashMap<String, RateTable2D>> = serde_json::from_str(raw)?;
        let mut tables = HashMap::new();
        for (flavor_key, pairs) in parsed {
            let flavor = parse_flavor_key(&flavor_key)?;
            for (pair_key, table) in pairs {
                let (num, denom) = parse_pair_key(&pair_key)?;
                table.validate()?;
                tables.insert((flavor, num, denom), table);
            }
        }
        Ok(Self { tables })
    }

    /// A single-bin table returning the same rate everywhere, for every
    /// flavor and ID pair. Test helper.
    pub fn uniform(rate: f64, error: f64) -> Self {
        let mut tables = HashMap::new();
        let pairs = [
            (IdTier::Tight, IdTier::Loose),
            (IdTier::Tight, IdTier::Medium),
            (IdTier::Medium, IdTier::Loose),
        ];
        for flavor in [Flavor::Electron, Flavor::Muon, Flavor::Tau] {
            for (num, denom) in pairs {
                tables.insert(
                    (flavor, num, denom),
                    RateTable2D {
                        pt_edges: vec![0.0, 1e9],
                        eta_edges: vec![0.0, 1e9],
                        rates: vec![vec![rate]],
                        errors: vec![vec![error]],
                    },
                );
            }
        }
        Self { tables }
    }
}

impl FakeRates for BinnedFakeRates {
    fn lookup(
        &self,
        flavor: Flavor,
        pt: f64,
        eta: f64,
        num: IdTier,
        denom: IdTier,
    ) -> Result<FakeRate> {
        let table = self.tables.get(&(flavor, num, denom)).ok_or_else(|| {
            Error::Config(format!("no fake-rate table for {flavor:?} {num:?}/{denom:?}"))
        })?;
        Ok(table.lookup(pt, eta))
    }
}

fn parse_flavor_key(key: &str) -> Result<Flavor> {
    match key {
        "e" => Ok(Flavor::Electron),
        "m" => Ok(Flavor::Muon),
        "t" => Ok(Flavor::Tau),
        other => Err(Error::Config(format!("unknown fake-rate flavor key '{other}'"))),
    }
}

fn parse_pair_key(key: &str) -> Result<(IdTier, IdTier)> {
    match key {
        "tight_loose" => Ok((IdTier::Tight, IdTier::Loose)),
        "tight_medium" => Ok((IdTier::Tight, IdTier::Medium)),
        "medium_loose" => Ok((IdTier::Medium, IdTier::Loose)),
        other => Err(Error::Config(format!("unknown fake-rate ID pair key '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_bin_table() -> RateTable2D {
        RateTable2D {
            pt_edges: vec![10.0, 50.0, 100.0],
            eta_edges: vec![0.0, 1.5, 2.5],
            rates: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            errors: vec![vec![0.01, 0.02], vec![0.03, 0.04]],
        }
    }

    #[test]
    fn in_range_lookup() {
        let t = two_bin_table();
        assert_relative_eq!(t.lookup(20.0, 0.5).rate, 0.1);
        assert_relative_eq!(t.lookup(20.0, 2.0).rate, 0.2);
        assert_relative_eq!(t.lookup(60.0, -2.0).rate, 0.4); // |eta|
    }

    #[test]
    fn out_of_range_clamps_to_boundary() {
        let t = two_bin_table();
        assert_relative_eq!(t.lookup(5.0, 0.5).rate, 0.1); // below first pt bin
        assert_relative_eq!(t.lookup(99.9, 0.5).rate, 0.3); // last pt bin
        assert_relative_eq!(t.lookup(60.0, 3.0).rate, 0.4); // above last eta bin
    }

    #[test]
    fn pt_capped_at_99_over_100() {
        let t = RateTable2D {
            pt_edges: vec![0.0, 98.0, 200.0],
            eta_edges: vec![0.0, 2.5],
            rates: vec![vec![0.1], vec![0.5]],
            errors: vec![vec![0.0], vec![0.0]],
        };
        // 150 caps to 99, which lands in the second bin, not wherever 150
        // would have.
        assert_relative_eq!(t.lookup(150.0, 1.0).rate, 0.5);
        assert_relative_eq!(t.lookup(99.5, 1.0).rate, 0.5);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let t = RateTable2D {
            pt_edges: vec![0.0, 50.0, 100.0],
            eta_edges: vec![0.0, 2.5],
            rates: vec![vec![0.1]],
            errors: vec![vec![0.0]],
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let raw = r#"{
            "e": {
                "medium_loose": {
                    "pt_edges": [10.0, 100.0],
                    "eta_edges": [0.0, 2.5],
                    "rates": [[0.15]],
                    "errors": [[0.02]]
                }
            }
        }"#;
        let fr = BinnedFakeRates::from_json(raw).unwrap();
        let v = fr
            .lookup(Flavor::Electron, 40.0, 1.0, IdTier::Medium, IdTier::Loose)
            .unwrap();
        assert_relative_eq!(v.rate, 0.15);
        assert_relative_eq!(v.error, 0.02);
    }

    #[test]
    fn missing_pair_is_config_error() {
        let fr = BinnedFakeRates::from_json(r#"{}"#).unwrap();
        assert!(fr
            .lookup(Flavor::Muon, 40.0, 1.0, IdTier::Medium, IdTier::Loose)
            .is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(BinnedFakeRates::from_json(r#"{"x": {}}"#).is_err());
        let raw = r#"{"e": {"tight_tight": {
            "pt_edges": [0.0, 1.0], "eta_edges": [0.0, 1.0],
            "rates": [[0.1]], "errors": [[0.0]]}}}"#;
        assert!(BinnedFakeRates::from_json(raw).is_err());
    }

    #[test]
    fn uniform_covers_all_pairs() {
        let fr = BinnedFakeRates::uniform(0.1, 0.01);
        for flavor in [Flavor::Electron, Flavor::Muon, Flavor::Tau] {
            let v = fr.lookup(flavor, 25.0, 1.0, IdTier::Tight, IdTier::Loose).unwrap();
            assert_relative_eq!(v.rate, 0.1);
        }
    }
}
