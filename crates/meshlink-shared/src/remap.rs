//! Position-independent channel remapping.
//!
//! When the user edits, reorders, or replaces the channel list, stored
//! message history must keep pointing at the same *logical* channel even
//! though messages record only a list index.  This module computes an
//! explicit old-index -> new-index partial map from two channel lists,
//! matching by `(psk, name)` identity with a deterministic tie-break
//! pipeline.  Applying the map to persisted rows is the store's job.

use crate::channel::Channel;

/// An explicit old-index -> new-index partial map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRemap {
    /// `mapping[i]` is the new index for old index `i`, or `None` when the
    /// old channel has no PSK match in the new list.
    pub mapping: Vec<Option<usize>>,
}

impl ChannelRemap {
    /// Resolved pairs whose index actually changed.
    pub fn moves(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mapping
            .iter()
            .enumerate()
            .filter_map(|(old, new)| new.map(|n| (old, n)))
            .filter(|(old, new)| old != new)
    }

    /// Old indices with no match in the new list.
    pub fn unresolved(&self) -> Vec<usize> {
        self.mapping
            .iter()
            .enumerate()
            .filter_map(|(old, new)| new.is_none().then_some(old))
            .collect()
    }

    /// True when no row needs to move.
    pub fn is_identity(&self) -> bool {
        self.moves().next().is_none()
    }
}

/// Compute the remap between two ordered channel lists.
///
/// For each old index the candidate set is narrowed in discrete steps:
/// 1. new indices whose raw `psk` matches;
/// 2. among several, those whose `name` also matches (the PSK set is kept
///    if no name matches);
/// 3. among several still, the candidate at the old index itself, else the
///    first in list order.
///
/// An empty candidate set leaves the old index unresolved; callers decide
/// what to do with rows on such channels.
pub fn channel_remap(old: &[Channel], new: &[Channel]) -> ChannelRemap {
    let mapping = old
        .iter()
        .enumerate()
        .map(|(index, channel)| {
            let candidates = psk_candidates(channel, new);
            let candidates = narrow_by_name(channel, new, candidates);
            pick(index, &candidates)
        })
        .collect();
    ChannelRemap { mapping }
}

/// Step 1: all new indices sharing the old channel's raw PSK bytes.
fn psk_candidates(channel: &Channel, new: &[Channel]) -> Vec<usize> {
    new.iter()
        .enumerate()
        .filter_map(|(i, c)| (c.psk == channel.psk).then_some(i))
        .collect()
}

/// Step 2: when several channels share the PSK, prefer the ones that also
/// share the name.  If none do, the ambiguity stands and the PSK set is
/// returned unchanged.
fn narrow_by_name(channel: &Channel, new: &[Channel], candidates: Vec<usize>) -> Vec<usize> {
    if candidates.len() <= 1 {
        return candidates;
    }
    let named: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| new[i].name == channel.name)
        .collect();
    if named.is_empty() {
        candidates
    } else {
        named
    }
}

/// Step 3: stable fallback.  Keep the original slot if it is still a
/// candidate, otherwise take the first candidate in list order.
fn pick(old_index: usize, candidates: &[usize]) -> Option<usize> {
    if candidates.contains(&old_index) {
        return Some(old_index);
    }
    candidates.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(name: &str, psk: &[u8]) -> Channel {
        Channel::new(name, psk.to_vec())
    }

    #[test]
    fn identical_lists_map_to_identity() {
        let list = vec![ch("A", &[1]), ch("B", &[2])];
        let remap = channel_remap(&list, &list);
        assert_eq!(remap.mapping, vec![Some(0), Some(1)]);
        assert!(remap.is_identity());
    }

    #[test]
    fn unique_psk_follows_reorder() {
        let old = vec![ch("A", &[1]), ch("B", &[2])];
        let new = vec![ch("B", &[2]), ch("A", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(1), Some(0)]);
        assert_eq!(remap.moves().collect::<Vec<_>>(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn duplicate_psk_in_new_list_keeps_original_slot() {
        // One old channel, two new channels with the same PSK: the name
        // match keeps the message where it was.
        let old = vec![ch("LongFast", &[1])];
        let new = vec![ch("LongFast", &[1]), ch("NewChan", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(0)]);
        assert!(remap.is_identity());
    }

    #[test]
    fn shared_psk_disambiguated_by_name() {
        let old = vec![ch("A1", &[1]), ch("A2", &[1])];
        let new = vec![ch("A2", &[1]), ch("A1", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(1), Some(0)]);
    }

    #[test]
    fn full_ambiguity_prefers_same_index() {
        // Two identical (psk, name) channels in the new list: stay put.
        let old = vec![ch("A", &[1])];
        let new = vec![ch("A", &[1]), ch("A", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(0)]);
    }

    #[test]
    fn full_ambiguity_off_index_takes_first_candidate() {
        // The old slot no longer exists; deterministic first-in-order pick.
        let old = vec![ch("X", &[9]), ch("A", &[1])];
        let new = vec![ch("A", &[1]), ch("A", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping[1], Some(0));
    }

    #[test]
    fn no_psk_match_is_unresolved() {
        let old = vec![ch("A", &[1]), ch("gone", &[7])];
        let new = vec![ch("A", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(0), None]);
        assert_eq!(remap.unresolved(), vec![1]);
    }

    #[test]
    fn name_mismatch_alone_does_not_unresolve() {
        // PSK matches but every name differs: the PSK candidates stand and
        // the stable fallback applies.
        let old = vec![ch("OldName", &[1])];
        let new = vec![ch("NewName", &[1]), ch("Other", &[1])];
        let remap = channel_remap(&old, &new);
        assert_eq!(remap.mapping, vec![Some(0)]);
    }
}
