//! # hpp-skim
//!
//! Per-event classification and counter-aggregation engine for the
//! doubly-charged Higgs search.
//!
//! For every input record the engine computes a nominal and a
//! fake-rate-corrected event weight, derives canonical channel labels,
//! walks the (mass hypothesis × tau category) grid of signal-region and
//! sideband definitions, and increments the matching named counters.
//!
//! ## Example
//!
//! ```no_run
//! use hpp_core::{Shift, Variant};
//! use hpp_skim::{BinnedFakeRates, EventRecord, SkimConfig, Skimmer};
//!
//! let cfg = SkimConfig {
//!     variant: Variant::Hpp3l,
//!     sample: "DoubleMuon".into(),
//!     shift: Shift::Nominal,
//!     int_lumi: 35867.0,
//!     sample_lumi: None,
//!     scan: None,
//!     masses: None,
//! };
//! let fakes = BinnedFakeRates::from_path("fakerates.json").unwrap();
//! let mut skimmer = Skimmer::new(cfg, fakes).unwrap();
//! let record: EventRecord = serde_json::from_str("{}").unwrap();
//! skimmer.process_record(&record).unwrap();
//! let counts = skimmer.flush();
//! println!("{} bins", counts.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channels;
pub mod counter;
pub mod fake_rate;
pub mod record;
pub mod regions;
pub mod samples;
pub mod skimmer;
pub mod weights;

pub use counter::{CountEntry, CounterKey, CounterStore};
pub use fake_rate::{BinnedFakeRates, FakeRate, FakeRates, RateTable2D};
pub use record::{EventRecord, FieldValue};
pub use regions::{Kinematics, RegionCategory, ScanVar, hypothesis_paths};
pub use samples::JetBinCut;
pub use skimmer::{SkimConfig, Skimmer, skim_partitioned};
pub use weights::WeightCalculator;
