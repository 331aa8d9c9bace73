//! Region definitions and the hypothesis-grid evaluator.
//!
//! For every (mass hypothesis × tau-category) combination the event is
//! classified by the pair (all side cuts, all mass windows) into exactly one
//! of four categories, and a counter path is produced for the one that
//! holds. In scan mode the grid instead produces one path per satisfied
//! threshold of the scan variable, with the remaining side cuts applied
//! N−1 style.

use serde::{Deserialize, Serialize};

use hpp_core::{Error, Result, Variant, Z_MASS};

use crate::record::EventRecord;

/// Derived per-event kinematic scalars, computed once per event.
#[derive(Debug, Clone, Copy)]
pub struct Kinematics {
    /// Scalar sum of selected-lepton pt.
    pub st: f64,
    /// |m(ll) − m(Z)| for the best Z candidate.
    pub zdiff: f64,
    /// ΔR of the ++ pair.
    pub dr_pp: f64,
    /// ΔR of the −− pair (4-lepton variant only).
    pub dr_mm: Option<f64>,
    /// Invariant mass of the ++ pair.
    pub m_pp: f64,
    /// Invariant mass of the −− pair (4-lepton variant only).
    pub m_mm: Option<f64>,
    /// Missing transverse energy (3-lepton variant only).
    pub met: Option<f64>,
}

impl Kinematics {
    /// Derive the kinematics for one record.
    pub fn derive(variant: Variant, record: &EventRecord) -> Result<Self> {
        let st = variant
            .leptons()
            .iter()
            .map(|lep| record.get_f64(&format!("{lep}_pt")))
            .sum::<Result<f64>>()?;
        let zdiff = (record.get_f64("z_mass")? - Z_MASS).abs();
        let m_pp = record.get_f64("hpp_mass")?;
        let dr_pp = record.get_f64("hpp_deltaR")?;
        match variant {
            Variant::Hpp3l => Ok(Self {
                st,
                zdiff,
                dr_pp,
                dr_mm: None,
                m_pp,
                m_mm: None,
                met: Some(record.get_f64("met_pt")?),
            }),
            Variant::Hpp4l => Ok(Self {
                st,
                zdiff,
                dr_pp,
                dr_mm: Some(record.get_f64("hmm_deltaR")?),
                m_pp,
                m_mm: Some(record.get_f64("hmm_mass")?),
                met: None,
            }),
        }
    }

    /// The unconditional low-mass category: any pair mass below 100 GeV.
    pub fn lowmass(&self) -> bool {
        self.m_pp < 100.0 || self.m_mm.is_some_and(|m| m < 100.0)
    }
}

/// Fractional lower edge of the mass window per tau count; upper edge is
/// 1.1 × mass throughout.
const WINDOW_LOW_FRAC: [f64; 3] = [0.9, 0.4, 0.3];

/// Scalar-sum-pt threshold: linear in the hypothesis mass, with an absolute
/// 1600 GeV escape for the highest masses.
fn st_cut(variant: Variant, st: f64, mass: f64, n_taus: usize) -> bool {
    let linear = match (variant, n_taus) {
        (Variant::Hpp3l, 0) => 1.44 * mass - 4.0,
        (Variant::Hpp3l, 1) => 1.17 * mass + 120.0,
        (Variant::Hpp3l, _) => 1.12 * mass + 168.0,
        (Variant::Hpp4l, 0) => 1.69 * mass + 58.0,
        (Variant::Hpp4l, 1) => 1.6 * mass - 20.0,
        (Variant::Hpp4l, _) => 0.79 * mass + 141.0,
    };
    st > linear || st > 1600.0
}

/// Z-veto distance threshold.
fn zveto_cut(variant: Variant, zdiff: f64, n_taus: usize) -> bool {
    let threshold = match (variant, n_taus) {
        (Variant::Hpp3l, 0) => 10.0,
        (Variant::Hpp3l, 1) => 20.0,
        (Variant::Hpp3l, _) => 25.0,
        (Variant::Hpp4l, _) => 10.0,
    };
    zdiff > threshold
}

/// Missing-energy threshold (3-lepton variant; trivially true at zero taus).
fn met_cut(met: f64, n_taus: usize) -> bool {
    match n_taus {
        0 => true,
        1 => met > 20.0,
        _ => met > 50.0,
    }
}

/// Pair angular-separation threshold.
fn dr_cut(variant: Variant, dr: f64, pair_mass: f64, mass: f64, n_taus: usize) -> bool {
    match (variant, n_taus) {
        (Variant::Hpp3l, 0) => true,
        (Variant::Hpp3l, 1) => dr < 3.2,
        (Variant::Hpp3l, _) => {
            if pair_mass < 400.0 {
                dr < mass / 380.0 + 1.86
            } else {
                dr < mass / 750.0 + 2.37
            }
        }
        (Variant::Hpp4l, 0) => true,
        (Variant::Hpp4l, 1) => dr < 3.3,
        (Variant::Hpp4l, _) => dr < 2.5,
    }
}

/// Mass window: tau-count-dependent fractional band around the hypothesis.
fn mass_window(pair_mass: f64, mass: f64, n_taus: usize) -> bool {
    let lo = WINDOW_LOW_FRAC[n_taus.min(2)];
    pair_mass > lo * mass && pair_mass < 1.1 * mass
}

/// One of the four mutually exclusive region categories per hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionCategory {
    /// Fails some side cut, outside the mass window.
    Sideband,
    /// Fails some side cut, inside the mass window.
    MassWindow,
    /// Passes all side cuts, outside the mass window.
    AllSideband,
    /// Passes all side cuts, inside the mass window.
    AllMassWindow,
}

impl RegionCategory {
    /// Classify from the (all sides, all windows) pair. Total by
    /// construction: exactly one category per pair.
    pub fn classify(all_sides: bool, all_windows: bool) -> Self {
        match (all_sides, all_windows) {
            (false, false) => RegionCategory::Sideband,
            (false, true) => RegionCategory::MassWindow,
            (true, false) => RegionCategory::AllSideband,
            (true, true) => RegionCategory::AllMassWindow,
        }
    }

    /// Path segment for this category.
    pub fn label(&self) -> &'static str {
        match self {
            RegionCategory::Sideband => "sideband",
            RegionCategory::MassWindow => "massWindow",
            RegionCategory::AllSideband => "allSideband",
            RegionCategory::AllMassWindow => "allMassWindow",
        }
    }
}

/// Side-cut variable scanned in optimization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanVar {
    /// Scalar-sum-pt lower threshold.
    St,
    /// Z-veto distance lower threshold.
    Zveto,
    /// Pair ΔR upper threshold.
    Dr,
    /// Missing-energy lower threshold (3-lepton variant only).
    Met,
}

impl ScanVar {
    /// Path segment for this variable.
    pub fn name(&self) -> &'static str {
        match self {
            ScanVar::St => "st",
            ScanVar::Zveto => "zveto",
            ScanVar::Dr => "dr",
            ScanVar::Met => "met",
        }
    }

    /// The fixed, evenly spaced threshold grid for this variable.
    pub fn grid(&self, variant: Variant) -> Vec<f64> {
        match self {
            ScanVar::St => (0..100).map(|x| f64::from(x * 20)).collect(),
            ScanVar::Zveto => {
                let n = match variant {
                    Variant::Hpp3l => 25,
                    Variant::Hpp4l => 20,
                };
                (0..n).map(|x| f64::from(x * 5)).collect()
            }
            ScanVar::Dr => (0..50).map(|x| 1.5 + 0.1 * f64::from(x)).collect(),
            ScanVar::Met => (0..40).map(|x| f64::from(x * 5)).collect(),
        }
    }

    /// Format a grid value as a path segment.
    fn format(&self, value: f64) -> String {
        match self {
            ScanVar::Dr => format!("{value:.1}"),
            _ => format!("{}", value as i64),
        }
    }

    /// Whether this variable exists for the variant.
    pub fn valid_for(&self, variant: Variant) -> bool {
        !(matches!(self, ScanVar::Met) && variant == Variant::Hpp4l)
    }
}

/// Paths produced by one hypothesis-grid walk. The caller increments each
/// path once with the signal weight and once (prefixed) with the control
/// weight; the sequence is consumed immediately and never retained.
pub fn hypothesis_paths(
    variant: Variant,
    kin: &Kinematics,
    masses: &[u32],
    scan: Option<ScanVar>,
) -> Result<Vec<String>> {
    if let Some(var) = scan {
        if !var.valid_for(variant) {
            return Err(Error::Config(format!(
                "scan variable '{}' is not defined for {variant:?}",
                var.name()
            )));
        }
    }
    let mut paths = Vec::new();
    match variant {
        Variant::Hpp3l => walk_3l(kin, masses, scan, &mut paths),
        Variant::Hpp4l => walk_4l(kin, masses, scan, &mut paths),
    }
    Ok(paths)
}

fn walk_3l(kin: &Kinematics, masses: &[u32], scan: Option<ScanVar>, paths: &mut Vec<String>) {
    let met = kin.met.unwrap_or(0.0);
    for n_taus in 0..=2usize {
        for &mass_u in masses {
            let mass = f64::from(mass_u);
            let name = format!("{mass_u}/hpp{n_taus}");

            let st = st_cut(Variant::Hpp3l, kin.st, mass, n_taus);
            let zveto = zveto_cut(Variant::Hpp3l, kin.zdiff, n_taus);
            let met_ok = met_cut(met, n_taus);
            let dr = dr_cut(Variant::Hpp3l, kin.dr_pp, kin.m_pp, mass, n_taus);
            let window = mass_window(kin.m_pp, mass, n_taus);

            let mut sides = vec![st, zveto];
            if n_taus > 0 {
                sides.push(met_ok);
            }
            sides.push(dr);
            let all_sides = sides.iter().all(|&c| c);

            match scan {
                None => {
                    let cat = RegionCategory::classify(all_sides, window);
                    paths.push(format!("new/{}/{name}", cat.label()));
                }
                Some(var) => {
                    if !window {
                        continue;
                    }
                    let n_minus_one = match var {
                        ScanVar::St => zveto && dr && met_ok,
                        ScanVar::Zveto => st && dr && met_ok,
                        ScanVar::Dr => zveto && st && met_ok,
                        ScanVar::Met => zveto && dr && st,
                    };
                    if !n_minus_one {
                        continue;
                    }
                    for value in var.grid(Variant::Hpp3l) {
                        let pass = match var {
                            ScanVar::St => kin.st > value,
                            ScanVar::Zveto => kin.zdiff > value,
                            ScanVar::Dr => kin.dr_pp < value,
                            ScanVar::Met => met > value,
                        };
                        if pass {
                            paths.push(format!(
                                "optimize/{}/{}/{name}",
                                var.name(),
                                var.format(value)
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn walk_4l(kin: &Kinematics, masses: &[u32], scan: Option<ScanVar>, paths: &mut Vec<String>) {
    let dr_mm = kin.dr_mm.unwrap_or(0.0);
    let m_mm = kin.m_mm.unwrap_or(0.0);
    for p_taus in 0..=2usize {
        for m_taus in 0..=2usize {
            let n_taus = p_taus.max(m_taus);
            for &mass_u in masses {
                let mass = f64::from(mass_u);
                let name = format!("{mass_u}/hpp{p_taus}hmm{m_taus}");

                let st = st_cut(Variant::Hpp4l, kin.st, mass, n_taus);
                let zveto = zveto_cut(Variant::Hpp4l, kin.zdiff, n_taus);
                let dr_pp_ok = dr_cut(Variant::Hpp4l, kin.dr_pp, kin.m_pp, mass, p_taus);
                let dr_mm_ok = dr_cut(Variant::Hpp4l, dr_mm, m_mm, mass, m_taus);
                let win_pp = mass_window(kin.m_pp, mass, p_taus);
                let win_mm = mass_window(m_mm, mass, m_taus);
                let all_windows = win_pp && win_mm;

                let mut sides = vec![st];
                if n_taus > 0 {
                    sides.push(zveto);
                }
                if p_taus > 1 {
                    sides.push(dr_pp_ok);
                }
                if m_taus > 1 {
                    sides.push(dr_mm_ok);
                }
                let all_sides = sides.iter().all(|&c| c);

                match scan {
                    None => {
                        let cat = RegionCategory::classify(all_sides, all_windows);
                        paths.push(format!("new/{}/{name}", cat.label()));
                    }
                    Some(var) => {
                        // Scan only the symmetric tau diagonal inside the
                        // mass window.
                        if p_taus != m_taus || !all_windows {
                            continue;
                        }
                        let n_minus_one = match var {
                            ScanVar::St => zveto && dr_pp_ok && dr_mm_ok,
                            ScanVar::Zveto => st && dr_pp_ok && dr_mm_ok,
                            ScanVar::Dr => st && zveto,
                            ScanVar::Met => unreachable!("met scan rejected for Hpp4l"),
                        };
                        if !n_minus_one {
                            continue;
                        }
                        for value in var.grid(Variant::Hpp4l) {
                            let pass = match var {
                                ScanVar::St => kin.st > value,
                                ScanVar::Zveto => kin.zdiff > value,
                                ScanVar::Dr => kin.dr_pp < value && dr_mm < value,
                                ScanVar::Met => unreachable!(),
                            };
                            if pass {
                                paths.push(format!(
                                    "optimize/{}/{}/{name}",
                                    var.name(),
                                    var.format(value)
                                ));
                            }
                        }
                    }
                }
            }
        }
    }
}
