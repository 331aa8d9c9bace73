//! Sample-name driven configuration: jet-bin vetoes and signal flags.
//!
//! Inclusive and jet-binned simulation samples of the same process overlap;
//! each sample keeps a disjoint `numGenJets` slice so the combination does
//! not double count.

use hpp_core::Variant;

/// Generator-jet-multiplicity slice kept for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JetBinCut {
    /// Inclusive sample: keep 0 jets or more than 4 (the 1–4 jet slices
    /// come from the dedicated binned samples).
    Inclusive,
    /// Jet-binned sample: keep exactly this multiplicity.
    Exactly(u32),
}

impl JetBinCut {
    /// Whether an event with `n` generator jets is kept.
    pub fn accepts(&self, n: u32) -> bool {
        match self {
            JetBinCut::Inclusive => n == 0 || n > 4,
            JetBinCut::Exactly(k) => n == *k,
        }
    }
}

/// Sample name → jet-bin veto table. Samples not listed keep every event.
const JET_BIN_TABLE: &[(&str, JetBinCut)] = &[
    ("DYJetsToLL_M-10to50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Inclusive),
    ("DY1JetsToLL_M-10to50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(1)),
    ("DY2JetsToLL_M-10to50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(2)),
    ("DY3JetsToLL_M-10to50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(3)),
    ("DY4JetsToLL_M-10to50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(4)),
    ("DYJetsToLL_M-50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Inclusive),
    ("DY1JetsToLL_M-50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(1)),
    ("DY2JetsToLL_M-50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(2)),
    ("DY3JetsToLL_M-50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(3)),
    ("DY4JetsToLL_M-50_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(4)),
    ("WJetsToLNu_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Inclusive),
    ("W1JetsToLNu_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(1)),
    ("W2JetsToLNu_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(2)),
    ("W3JetsToLNu_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(3)),
    ("W4JetsToLNu_TuneCUETP8M1_13TeV-madgraphMLM-pythia8", JetBinCut::Exactly(4)),
];

/// Primary datasets treated as real data.
const DATA_SAMPLES: &[&str] =
    &["DoubleMuon", "DoubleEG", "MuonEG", "SingleMuon", "SingleElectron", "Tau"];

/// Jet-bin veto for a sample, if it has one.
pub fn jet_bin_cut(sample: &str) -> Option<JetBinCut> {
    JET_BIN_TABLE.iter().find(|(name, _)| *name == sample).map(|(_, cut)| *cut)
}

/// Whether the sample belongs to the doubly-charged Higgs signal family.
pub fn is_signal_sample(sample: &str) -> bool {
    sample.contains("HPlusPlusHMinus")
}

/// Whether the signal sample is pair production (both legs doubly charged)
/// rather than associated production.
pub fn is_pair_signal(sample: &str) -> bool {
    sample.contains("HPlusPlusHMinusMinus")
}

/// Whether the sample is a real-data primary dataset.
pub fn is_data_sample(sample: &str) -> bool {
    DATA_SAMPLES.contains(&sample)
}

/// Generated mass point encoded in a signal sample name (`M-500`), if any.
pub fn signal_mass(sample: &str) -> Option<u32> {
    let idx = sample.find("M-")?;
    let digits: String =
        sample[idx + 2..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Mass hypotheses probed for a sample: the full variant list, except that
/// signal samples are restricted to their own generated mass point.
pub fn masses_for_sample(variant: Variant, sample: &str) -> Vec<u32> {
    let all = variant.mass_hypotheses();
    if is_signal_sample(sample) {
        if let Some(m) = signal_mass(sample) {
            return all.iter().copied().filter(|&x| x == m).collect();
        }
    }
    all.to_vec()
}
