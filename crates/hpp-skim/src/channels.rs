//! Channel-label normalization.
//!
//! Lepton ordering within a same-charge group is arbitrary upstream, so
//! labels are canonicalized by sorting each charge sub-group independently
//! (`"eme"` and `"eem"` denote the same channel). The doubly-charged pair
//! occupies the first two characters.

use hpp_core::Variant;

/// Sentinel generator channel for data and non-signal simulation.
pub const GEN_ALL: &str = "all";

/// Sort a character slice and append it to `out`.
fn push_sorted(out: &mut String, group: &[char]) {
    let mut g: Vec<char> = group.to_vec();
    g.sort_unstable();
    out.extend(g);
}

/// Normalize a channel string by sorting the sub-groups split at `split`.
fn normalize(chan: &str, split: usize) -> String {
    let chars: Vec<char> = chan.chars().collect();
    let split = split.min(chars.len());
    let mut out = String::with_capacity(chars.len());
    push_sorted(&mut out, &chars[..split]);
    push_sorted(&mut out, &chars[split..]);
    out
}

/// Canonical reconstructed-channel label: flavor characters only, each
/// charge sub-group sorted.
pub fn reco_channel(variant: Variant, channel: &str) -> String {
    let flavors: String = channel.chars().filter(|c| "emt".contains(*c)).collect();
    let _ = variant; // split point is the pair boundary for both variants
    normalize(&flavors, 2)
}

/// Canonical generator-channel label.
///
/// Data and non-signal samples get [`GEN_ALL`]. Pair-production signals
/// sort 2+2 sub-groups; associated production sorts 2+1.
pub fn gen_channel(is_data: bool, is_signal: bool, is_pair: bool, gen: &str) -> String {
    if is_data || !is_signal {
        return GEN_ALL.to_string();
    }
    let chars: Vec<char> = gen.chars().collect();
    let take = if is_pair { 4 } else { 3 };
    let truncated: String = chars.into_iter().take(take).collect();
    normalize(&truncated, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reco_sorts_each_group() {
        assert_eq!(reco_channel(Variant::Hpp3l, "mem"), "emm");
        assert_eq!(reco_channel(Variant::Hpp3l, "eem"), "eem");
        assert_eq!(reco_channel(Variant::Hpp4l, "teme"), "etem"); // pair sorted, rest sorted
    }

    #[test]
    fn reco_drops_non_flavor_characters() {
        assert_eq!(reco_channel(Variant::Hpp3l, "e1m2t3"), "emt");
    }

    #[test]
    fn reco_is_permutation_invariant_within_groups() {
        // All orderings of the pair and of the singly-charged group map to
        // one label.
        let variants = ["emt", "met"];
        let labels: Vec<String> =
            variants.iter().map(|c| reco_channel(Variant::Hpp3l, c)).collect();
        assert!(labels.iter().all(|l| l == &labels[0]));

        let four = ["emme", "meem", "emem"];
        let labels: Vec<String> =
            four.iter().map(|c| reco_channel(Variant::Hpp4l, c)).collect();
        assert!(labels.iter().all(|l| l == &labels[0]));
    }

    #[test]
    fn gen_all_for_data_and_background() {
        assert_eq!(gen_channel(true, true, true, "emem"), GEN_ALL);
        assert_eq!(gen_channel(false, false, false, "emem"), GEN_ALL);
    }

    #[test]
    fn gen_split_depends_on_topology() {
        // Pair production: 2+2.
        assert_eq!(gen_channel(false, true, true, "meme"), "emem");
        // Associated production: 2+1, trailing characters ignored.
        assert_eq!(gen_channel(false, true, false, "mete"), "emt");
    }
}
