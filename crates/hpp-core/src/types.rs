//! Common vocabulary types for hppskim

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Z boson mass in GeV, used for the Z-veto distance.
pub const Z_MASS: f64 = 91.1876;

/// Analysis variant: number of selected leptons and pair topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Three leptons: a doubly-charged pair plus one singly-charged leg
    /// (associated production).
    Hpp3l,
    /// Four leptons: two doubly-charged pairs (pair production).
    Hpp4l,
}

impl Variant {
    /// Lepton leg prefixes in record-field order.
    pub fn leptons(&self) -> &'static [&'static str] {
        match self {
            Variant::Hpp3l => &["hpp1", "hpp2", "hm1"],
            Variant::Hpp4l => &["hpp1", "hpp2", "hmm1", "hmm2"],
        }
    }

    /// Number of lepton legs.
    pub fn n_leptons(&self) -> usize {
        self.leptons().len()
    }

    /// Mass hypotheses probed by this variant, in GeV, increasing.
    pub fn mass_hypotheses(&self) -> &'static [u32] {
        &[200, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500]
    }
}

/// Systematic variation applied to the event weight.
///
/// Each shift replaces exactly one base factor in the weight product; the
/// mapping lives in the weight calculator. Unknown shift names are rejected
/// at parse time, so the engine never sees an unrecognized variation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Shift {
    /// No variation (nominal weights).
    #[default]
    Nominal,
    /// Trigger efficiency +1σ.
    TrigUp,
    /// Trigger efficiency −1σ.
    TrigDown,
    /// Pileup weight +1σ.
    PuUp,
    /// Pileup weight −1σ.
    PuDown,
    /// Lepton ID scale factors +1σ.
    LepUp,
    /// Lepton ID scale factors −1σ.
    LepDown,
    /// Fake rate +1σ.
    FakeUp,
    /// Fake rate −1σ.
    FakeDown,
}

impl Shift {
    /// The short name used in configuration and output paths. Nominal is
    /// the empty string.
    pub fn name(&self) -> &'static str {
        match self {
            Shift::Nominal => "",
            Shift::TrigUp => "trigUp",
            Shift::TrigDown => "trigDown",
            Shift::PuUp => "puUp",
            Shift::PuDown => "puDown",
            Shift::LepUp => "lepUp",
            Shift::LepDown => "lepDown",
            Shift::FakeUp => "fakeUp",
            Shift::FakeDown => "fakeDown",
        }
    }
}

impl FromStr for Shift {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Shift::Nominal),
            "trigUp" => Ok(Shift::TrigUp),
            "trigDown" => Ok(Shift::TrigDown),
            "puUp" => Ok(Shift::PuUp),
            "puDown" => Ok(Shift::PuDown),
            "lepUp" => Ok(Shift::LepUp),
            "lepDown" => Ok(Shift::LepDown),
            "fakeUp" => Ok(Shift::FakeUp),
            "fakeDown" => Ok(Shift::FakeDown),
            other => Err(Error::Config(format!("unknown shift '{other}'"))),
        }
    }
}

impl TryFrom<String> for Shift {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

impl From<Shift> for String {
    fn from(s: Shift) -> String {
        s.name().to_string()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lepton flavor, as encoded by the channel string characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// Electron (`e`).
    Electron,
    /// Muon (`m`).
    Muon,
    /// Hadronically decaying tau (`t`).
    Tau,
}

impl Flavor {
    /// Parse a channel-string character. Non-flavor characters yield `None`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'e' => Some(Flavor::Electron),
            'm' => Some(Flavor::Muon),
            't' => Some(Flavor::Tau),
            _ => None,
        }
    }
}

/// Lepton identification tier used for fake-rate numerator/denominator pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdTier {
    /// Loose working point.
    Loose,
    /// Medium working point (the nominal analysis ID).
    Medium,
    /// Tight working point.
    Tight,
}

/// Weighting mode for one classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Strict-ID weight (data weight is exactly 1).
    Signal,
    /// Fake-rate-corrected control-region weight.
    Control,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_round_trip() {
        for s in [
            Shift::Nominal,
            Shift::TrigUp,
            Shift::TrigDown,
            Shift::PuUp,
            Shift::PuDown,
            Shift::LepUp,
            Shift::LepDown,
            Shift::FakeUp,
            Shift::FakeDown,
        ] {
            assert_eq!(s.name().parse::<Shift>().unwrap(), s);
        }
    }

    #[test]
    fn shift_unknown_rejected() {
        assert!("jesUp".parse::<Shift>().is_err());
    }

    #[test]
    fn variant_leptons() {
        assert_eq!(Variant::Hpp3l.n_leptons(), 3);
        assert_eq!(Variant::Hpp4l.n_leptons(), 4);
        assert_eq!(Variant::Hpp4l.leptons()[3], "hmm2");
    }

    #[test]
    fn flavor_chars() {
        assert_eq!(Flavor::from_char('e'), Some(Flavor::Electron));
        assert_eq!(Flavor::from_char('x'), None);
    }
}
