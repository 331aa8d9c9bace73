//! Per-event weight calculation: nominal and fake-rate-corrected modes.

use hpp_core::{Error, Flavor, IdTier, Mode, Result, Shift, Variant};

use crate::fake_rate::FakeRates;
use crate::record::EventRecord;

/// Residual qqZZ k-factor normalization already applied upstream.
const QQZZ_BASE_KFACTOR: f64 = 1.1;

/// Computes the per-event scalar weight.
///
/// Signal mode multiplies the generator, pileup and trigger factors, the
/// per-leg ID scale factors and the luminosity ratio; control mode further
/// applies the fake-rate sign and transfer factors. The configured [`Shift`]
/// replaces exactly one base factor.
pub struct WeightCalculator<'a> {
    variant: Variant,
    shift: Shift,
    int_lumi: f64,
    sample_lumi: Option<f64>,
    fakes: &'a dyn FakeRates,
}

impl<'a> WeightCalculator<'a> {
    /// Create a calculator for one sample configuration.
    pub fn new(
        variant: Variant,
        shift: Shift,
        int_lumi: f64,
        sample_lumi: Option<f64>,
        fakes: &'a dyn FakeRates,
    ) -> Self {
        Self { variant, shift, int_lumi, sample_lumi, fakes }
    }

    /// Per-leg nominal-ID pass flags, in lepton order.
    pub fn pass_flags(&self, record: &EventRecord) -> Result<Vec<bool>> {
        self.variant
            .leptons()
            .iter()
            .map(|lep| record.get_bool(&format!("{lep}_passMedium")))
            .collect()
    }

    /// Compute the event weight for the given mode.
    pub fn weight(&self, record: &EventRecord, mode: Mode) -> Result<f64> {
        let is_data = record.is_data()?;
        let pass = self.pass_flags(record)?;

        let mut weight = if is_data { 1.0 } else { self.simulation_weight(record, &pass)? };

        if mode == Mode::Control {
            weight *= self.fake_correction(record, &pass, is_data)?;
        }

        Ok(weight)
    }

    /// Product of simulation weight factors, dropping NaN factors with a
    /// diagnostic (lenient-degrade, not fatal).
    fn simulation_weight(&self, record: &EventRecord, pass: &[bool]) -> Result<f64> {
        // Each shift replaces exactly one base factor.
        let pileup = match self.shift {
            Shift::PuUp => "pileupWeightUp",
            Shift::PuDown => "pileupWeightDown",
            _ => "pileupWeight",
        };
        let trigger = match self.shift {
            Shift::TrigUp => "triggerEfficiencyUp",
            Shift::TrigDown => "triggerEfficiencyDown",
            _ => "triggerEfficiency",
        };
        let lep_suffix = match self.shift {
            Shift::LepUp => "Up",
            Shift::LepDown => "Down",
            _ => "",
        };

        let mut factors: Vec<String> =
            vec!["genWeight".into(), pileup.into(), trigger.into()];
        for (lep, &passed) in self.variant.leptons().iter().zip(pass) {
            let tier = if passed { "medium" } else { "loose" };
            factors.push(format!("{lep}_{tier}Scale{lep_suffix}"));
        }

        let mut weight = 1.0;
        for name in &factors {
            let val = record.get_f64(name)?;
            if val.is_nan() {
                let channel = record.get_str("channel").unwrap_or("?");
                tracing::warn!(channel, factor = name.as_str(), "NaN weight factor dropped");
                continue;
            }
            weight *= val;
        }

        // Scale to lumi / cross-section.
        weight *= match self.sample_lumi {
            Some(lumi) if lumi != 0.0 => self.int_lumi / lumi,
            _ => 0.0,
        };

        // Process-specific variable k-factor, when the sample carries one.
        if let Some(k) = record.get_f64_opt("qqZZkfactor")? {
            weight *= k / QQZZ_BASE_KFACTOR;
        }

        Ok(weight)
    }

    /// Sign and fake-transfer factors for the control region.
    fn fake_correction(
        &self,
        record: &EventRecord,
        pass: &[bool],
        is_data: bool,
    ) -> Result<f64> {
        let n_fail = pass.iter().filter(|&&p| !p).count();
        // Combinatorial parity: subtract double-counted multi-fake strata.
        let mut corr = if n_fail > 0 && n_fail % 2 == 0 { -1.0 } else { 1.0 };
        if !is_data && n_fail > 0 {
            // Simulated contamination enters the control region with
            // opposite sign.
            corr *= -1.0;
        }

        if n_fail == 0 {
            return Ok(corr);
        }

        let flavors = channel_flavors(record, self.variant)?;
        for (l, lep) in self.variant.leptons().iter().enumerate() {
            if pass[l] {
                continue;
            }
            let pt = record.get_f64(&format!("{lep}_pt"))?;
            let eta = record.get_f64(&format!("{lep}_eta"))?;
            let fr =
                self.fakes.lookup(flavors[l], pt, eta, IdTier::Medium, IdTier::Loose)?;
            let rate = match self.shift {
                Shift::FakeUp => (fr.rate + fr.error).clamp(0.0, 0.999),
                Shift::FakeDown => (fr.rate - fr.error).clamp(0.0, 0.999),
                _ => fr.rate.clamp(0.0, 0.999),
            };
            corr *= rate / (1.0 - rate);
        }
        Ok(corr)
    }
}

/// Per-leg flavors from the record's channel string.
fn channel_flavors(record: &EventRecord, variant: Variant) -> Result<Vec<Flavor>> {
    let chan = record.get_str("channel")?;
    let flavors: Vec<Flavor> = chan.chars().filter_map(Flavor::from_char).collect();
    if flavors.len() < variant.n_leptons() {
        return Err(Error::Schema(format!(
            "channel '{chan}' has {} flavor characters, {} legs expected",
            flavors.len(),
            variant.n_leptons()
        )));
    }
    Ok(flavors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_rate::BinnedFakeRates;
    use approx::assert_relative_eq;

    /// MC record with all weight factors 1 and the given pass pattern.
    fn mc_record(variant: Variant, pattern: &str) -> EventRecord {
        let mut r = EventRecord::new();
        r.set_bool("isData", false);
        r.set_str("channel", "m".repeat(variant.n_leptons()));
        r.set_f64("genWeight", 1.0);
        r.set_f64("pileupWeight", 1.0);
        r.set_f64("triggerEfficiency", 1.0);
        for (lep, c) in variant.leptons().iter().zip(pattern.chars()) {
            let passed = c == 'P';
            r.set_bool(&format!("{lep}_passMedium"), passed);
            r.set_f64(&format!("{lep}_mediumScale"), 1.0);
            r.set_f64(&format!("{lep}_looseScale"), 1.0);
            r.set_f64(&format!("{lep}_pt"), 40.0);
            r.set_f64(&format!("{lep}_eta"), 1.0);
        }
        r
    }

    fn data_record(variant: Variant, pattern: &str) -> EventRecord {
        let mut r = mc_record(variant, pattern);
        r.set_bool("isData", true);
        r
    }

    #[test]
    fn data_signal_weight_is_exactly_one() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let wc = WeightCalculator::new(Variant::Hpp3l, Shift::Nominal, 35867.0, None, &fakes);
        let r = data_record(Variant::Hpp3l, "PPP");
        assert_eq!(wc.weight(&r, Mode::Signal).unwrap(), 1.0);
    }

    #[test]
    fn control_sign_rule() {
        // Fake rate 0.5 makes each transfer factor 1, isolating the sign.
        let fakes = BinnedFakeRates::uniform(0.5, 0.0);
        let wc = WeightCalculator::new(Variant::Hpp4l, Shift::Nominal, 1.0, None, &fakes);
        let cases = [("PPPP", 1.0), ("PPPF", 1.0), ("PPFF", -1.0), ("PFFF", 1.0), ("FFFF", -1.0)];
        for (pattern, expected) in cases {
            let r = data_record(Variant::Hpp4l, pattern);
            let w = wc.weight(&r, Mode::Control).unwrap();
            assert_relative_eq!(w, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn mc_control_subtracts_contamination() {
        // PPF on simulation: nominal factors 1, lumi ratio 2, fake rate 0.1.
        // sign(+1) × MC(−1) × 0.1/0.9 × 2 = −0.2222…
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let wc =
            WeightCalculator::new(Variant::Hpp3l, Shift::Nominal, 2.0, Some(1.0), &fakes);
        let r = mc_record(Variant::Hpp3l, "PPF");
        let w = wc.weight(&r, Mode::Control).unwrap();
        assert_relative_eq!(w, -0.2222, epsilon = 1e-3);
    }

    #[test]
    fn nan_factor_is_dropped_not_zeroed() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let wc =
            WeightCalculator::new(Variant::Hpp3l, Shift::Nominal, 3.0, Some(1.0), &fakes);
        let mut r = mc_record(Variant::Hpp3l, "PPP");
        r.set_f64("pileupWeight", f64::NAN);
        let w = wc.weight(&r, Mode::Signal).unwrap();
        assert_relative_eq!(w, 3.0);
    }

    #[test]
    fn unset_sample_lumi_zeroes_mc_weight() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let wc = WeightCalculator::new(Variant::Hpp3l, Shift::Nominal, 35867.0, None, &fakes);
        let r = mc_record(Variant::Hpp3l, "PPP");
        assert_eq!(wc.weight(&r, Mode::Signal).unwrap(), 0.0);
    }

    #[test]
    fn shift_replaces_one_factor() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let mut r = mc_record(Variant::Hpp3l, "PPP");
        r.set_f64("triggerEfficiencyUp", 1.5);

        let wc = WeightCalculator::new(Variant::Hpp3l, Shift::TrigUp, 1.0, Some(1.0), &fakes);
        assert_relative_eq!(wc.weight(&r, Mode::Signal).unwrap(), 1.5);
    }

    #[test]
    fn lep_shift_applies_suffix_per_leg() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let mut r = mc_record(Variant::Hpp3l, "PPF");
        for lep in Variant::Hpp3l.leptons() {
            r.set_f64(&format!("{lep}_mediumScaleDown"), 0.9);
            r.set_f64(&format!("{lep}_looseScaleDown"), 0.8);
        }
        let wc =
            WeightCalculator::new(Variant::Hpp3l, Shift::LepDown, 1.0, Some(1.0), &fakes);
        // Two passing legs at 0.9 and one failing leg at 0.8.
        assert_relative_eq!(wc.weight(&r, Mode::Signal).unwrap(), 0.9 * 0.9 * 0.8);
    }

    #[test]
    fn fake_shift_moves_rate_by_error() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.05);
        let r = data_record(Variant::Hpp3l, "PPF");
        let up = WeightCalculator::new(Variant::Hpp3l, Shift::FakeUp, 1.0, None, &fakes);
        let down = WeightCalculator::new(Variant::Hpp3l, Shift::FakeDown, 1.0, None, &fakes);
        assert_relative_eq!(
            up.weight(&r, Mode::Control).unwrap(),
            0.15 / 0.85,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            down.weight(&r, Mode::Control).unwrap(),
            0.05 / 0.95,
            epsilon = 1e-12
        );
    }

    #[test]
    fn kfactor_applied_when_present() {
        let fakes = BinnedFakeRates::uniform(0.1, 0.0);
        let wc =
            WeightCalculator::new(Variant::Hpp3l, Shift::Nominal, 1.0, Some(1.0), &fakes);
        let mut r = mc_record(Variant::Hpp3l, "PPP");
        r.set_f64("qqZZkfactor", 1.21);
        assert_relative_eq!(wc.weight(&r, Mode::Signal).unwrap(), 1.21 / 1.1);
    }
}
