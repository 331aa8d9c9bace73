//! Skim orchestration: per-record classification and counter accumulation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use hpp_core::{Error, Mode, Result, Shift, Variant};

use crate::channels;
use crate::counter::{CountEntry, CounterStore};
use crate::fake_rate::FakeRates;
use crate::record::EventRecord;
use crate::regions::{Kinematics, ScanVar, hypothesis_paths};
use crate::samples::{self, JetBinCut};
use crate::weights::WeightCalculator;

/// Configuration for one skim run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkimConfig {
    /// Analysis variant.
    pub variant: Variant,
    /// Sample name (drives jet-bin veto, signal flags and mass filtering).
    pub sample: String,
    /// Systematic shift to apply. Nominal when omitted.
    #[serde(default)]
    pub shift: Shift,
    /// Integrated luminosity to scale simulation to, in /pb.
    pub int_lumi: f64,
    /// Per-sample generated luminosity; simulation weight is zero when unset.
    #[serde(default)]
    pub sample_lumi: Option<f64>,
    /// Optimization-scan variable; disables the per-category hypothesis
    /// counters when set.
    #[serde(default)]
    pub scan: Option<ScanVar>,
    /// Mass-hypothesis override; defaults to the variant list, restricted
    /// to the generated point for signal samples.
    #[serde(default)]
    pub masses: Option<Vec<u32>>,
}

impl SkimConfig {
    /// Validate internal consistency.
    pub fn validate(&self) -> Result<()> {
        if let Some(var) = self.scan {
            if !var.valid_for(self.variant) {
                return Err(Error::Config(format!(
                    "scan variable '{}' is not defined for {:?}",
                    var.name(),
                    self.variant
                )));
            }
        }
        if self.int_lumi < 0.0 {
            return Err(Error::Config("int_lumi must be non-negative".into()));
        }
        if let Some(masses) = &self.masses {
            if masses.is_empty() {
                return Err(Error::Config("mass list must not be empty".into()));
            }
            if !masses.windows(2).all(|w| w[0] < w[1]) {
                return Err(Error::Config("mass hypotheses must be increasing".into()));
            }
        }
        Ok(())
    }

    fn resolved_masses(&self) -> Vec<u32> {
        match &self.masses {
            Some(m) => m.clone(),
            None => samples::masses_for_sample(self.variant, &self.sample),
        }
    }
}

/// Per-run skim context: configuration, fake-rate tables and the counter
/// store, passed explicitly (no global state).
pub struct Skimmer<F: FakeRates> {
    cfg: SkimConfig,
    fakes: F,
    masses: Vec<u32>,
    is_signal: bool,
    is_pair: bool,
    jet_cut: Option<JetBinCut>,
    counters: CounterStore,
}

impl<F: FakeRates> Skimmer<F> {
    /// Create a skimmer for one sample.
    pub fn new(cfg: SkimConfig, fakes: F) -> Result<Self> {
        cfg.validate()?;
        let masses = cfg.resolved_masses();
        if masses.is_empty() {
            return Err(Error::Config(format!(
                "no mass hypothesis applies to sample '{}'",
                cfg.sample
            )));
        }
        let is_signal = samples::is_signal_sample(&cfg.sample);
        let is_pair = samples::is_pair_signal(&cfg.sample);
        let jet_cut = samples::jet_bin_cut(&cfg.sample);
        Ok(Self { cfg, fakes, masses, is_signal, is_pair, jet_cut, counters: CounterStore::new() })
    }

    /// Classify one record and increment every applicable counter.
    pub fn process_record(&mut self, record: &EventRecord) -> Result<()> {
        // Sample-level jet-multiplicity veto, before anything else.
        if let Some(cut) = self.jet_cut {
            let n_jets = record.get_f64("numGenJets")? as u32;
            if !cut.accepts(n_jets) {
                return Ok(());
            }
        }

        let is_data = record.is_data()?;
        let calc = WeightCalculator::new(
            self.cfg.variant,
            self.cfg.shift,
            self.cfg.int_lumi,
            self.cfg.sample_lumi,
            &self.fakes,
        );
        let w = calc.weight(record, Mode::Signal)?;
        let wf = calc.weight(record, Mode::Control)?;

        let pass = calc.pass_flags(record)?;
        let n_fail = pass.iter().filter(|&&p| !p).count();
        let all_pass = n_fail == 0;
        let fake_chan = format!("{}P{}F", pass.len() - n_fail, n_fail);

        let reco = channels::reco_channel(self.cfg.variant, record.get_str("channel")?);
        let gen = if !is_data && self.is_signal {
            channels::gen_channel(false, true, self.is_pair, record.get_str("genChannel")?)
        } else {
            channels::GEN_ALL.to_string()
        };

        // Fake-corrected counters require gen-matched legs on simulation.
        let fake_gate = is_data || self.gen_matched(record)?;

        let kin = Kinematics::derive(self.cfg.variant, record)?;

        // Unconditional counters.
        if all_pass {
            self.counters.increment("default", w, &reco, &gen);
        }
        if fake_gate {
            self.counters.increment(&fake_chan, wf, &reco, &gen);
        }
        self.counters.increment(&format!("{fake_chan}_regular"), w, &reco, &gen);

        // Hypothesis grid (or the optimization scan when configured).
        for path in hypothesis_paths(self.cfg.variant, &kin, &self.masses, self.cfg.scan)? {
            if all_pass {
                self.counters.increment(&path, w, &reco, &gen);
            }
            if fake_gate {
                self.counters.increment(&format!("{fake_chan}/{path}"), wf, &reco, &gen);
            }
        }

        // Low-mass control counters, independent of the hypothesis grid.
        if kin.lowmass() {
            if all_pass {
                self.counters.increment("lowmass", w, &reco, &gen);
            }
            if fake_gate {
                self.counters.increment(&format!("{fake_chan}/lowmass"), wf, &reco, &gen);
            }
            self.counters.increment(&format!("{fake_chan}_regular/lowmass"), w, &reco, &gen);
        }

        Ok(())
    }

    /// Whether every leg is generator-matched within ΔR < 0.1. Always true
    /// for data.
    fn gen_matched(&self, record: &EventRecord) -> Result<bool> {
        if record.is_data()? {
            return Ok(true);
        }
        for lep in self.cfg.variant.leptons() {
            if !record.get_bool(&format!("{lep}_genMatch"))?
                || record.get_f64(&format!("{lep}_genDeltaR"))? >= 0.1
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Read-only view of the accumulated counters.
    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    /// Consume the skimmer, keeping the accumulated store.
    pub fn into_store(self) -> CounterStore {
        self.counters
    }

    /// Finish the run and export the sorted counter totals.
    pub fn flush(self) -> Vec<CountEntry> {
        self.counters.flush()
    }
}

/// Skim a record slice across rayon workers, one independent store per
/// partition, merged by key afterward. Equivalent to a single-threaded pass
/// because accumulation is additive and commutative.
pub fn skim_partitioned<F>(
    cfg: &SkimConfig,
    fakes: &F,
    records: &[EventRecord],
    partition_size: usize,
) -> Result<Vec<CountEntry>>
where
    F: FakeRates + Clone + Sync,
{
    let size = partition_size.max(1);
    let stores = records
        .par_chunks(size)
        .map(|partition| {
            let mut skimmer = Skimmer::new(cfg.clone(), fakes.clone())?;
            for record in partition {
                skimmer.process_record(record)?;
            }
            Ok(skimmer.into_store())
        })
        .collect::<Result<Vec<CounterStore>>>()?;

    let mut total = CounterStore::new();
    for store in stores {
        total.merge(store);
    }
    Ok(total.flush())
}
