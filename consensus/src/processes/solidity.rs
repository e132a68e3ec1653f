use std::collections::HashSet;
use tangle_consensus_core::{api::TangleReader, checkpoint::AncestorRefs};
use tangle_hashes::Hash;

#[derive(Debug, PartialEq, Eq)]
pub enum AncestryStatus {
    /// Every entry of the past is present. `traversed` holds the entries which were not
    /// yet marked solid, in discovery order.
    Complete { traversed: Vec<Hash> },
    /// Entries referenced but absent from the local tangle
    Incomplete { missing: Vec<Hash> },
}

/// Walks the tangle backward from `start`, stopping at entries already solid and at the
/// zero hash which bounds the tangle.
pub fn walk_ancestry(reader: &dyn TangleReader, start: AncestorRefs) -> AncestryStatus {
    let mut visited = HashSet::new();
    let mut stack = start.hashes().collect::<Vec<_>>();
    let mut traversed = Vec::new();
    let mut missing = Vec::new();

    while let Some(hash) = stack.pop() {
        if !visited.insert(hash) || hash.is_zero() || reader.is_solid(hash) {
            continue;
        }
        match reader.ancestors(hash) {
            Some(refs) => {
                traversed.push(hash);
                stack.extend(refs.hashes().filter(|h| !visited.contains(h)));
            }
            None => missing.push(hash),
        }
    }

    if missing.is_empty() { AncestryStatus::Complete { traversed } } else { AncestryStatus::Incomplete { missing } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MemoryTangle;
    use tangle_consensus_core::api::TangleStore;
    use tangle_hashes::ZERO_HASH;

    #[test]
    fn test_complete_walk_stops_at_solid_entries() {
        let tangle = MemoryTangle::default();
        // 1 <- 2 <- 3, with 4 referencing both 3 and 2
        tangle.insert(1.into(), AncestorRefs::new(ZERO_HASH, ZERO_HASH));
        tangle.insert(2.into(), AncestorRefs::new(1.into(), ZERO_HASH));
        tangle.insert(3.into(), AncestorRefs::new(2.into(), 1.into()));
        tangle.insert(4.into(), AncestorRefs::new(3.into(), 2.into()));

        match walk_ancestry(&tangle, AncestorRefs::new(4.into(), 3.into())) {
            AncestryStatus::Complete { mut traversed } => {
                traversed.sort();
                assert_eq!(traversed, vec![1.into(), 2.into(), 3.into(), 4.into()]);
            }
            status => panic!("unexpected {:?}", status),
        }

        tangle.mark_solid(&[2.into(), 1.into()]);
        assert_eq!(
            walk_ancestry(&tangle, AncestorRefs::new(4.into(), 4.into())),
            AncestryStatus::Complete { traversed: vec![4.into(), 3.into()] }
        );
    }

    #[test]
    fn test_missing_entries_are_reported_once() {
        let tangle = MemoryTangle::default();
        tangle.insert(5.into(), AncestorRefs::new(6.into(), 7.into()));
        tangle.insert(8.into(), AncestorRefs::new(6.into(), 5.into()));

        match walk_ancestry(&tangle, AncestorRefs::new(8.into(), 5.into())) {
            AncestryStatus::Incomplete { mut missing } => {
                missing.sort();
                assert_eq!(missing, vec![6.into(), 7.into()]);
            }
            status => panic!("unexpected {:?}", status),
        }
    }
}
