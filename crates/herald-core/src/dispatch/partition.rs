//! Work partitioning across sending identities

use herald_common::types::IdentityId;
use herald_storage::models::Group;

/// Identity slot for the contact at `index` when spreading over `identities`
/// slots. Slots are filled from the last one backwards, so an uneven
/// remainder lands on the trailing identities.
pub fn identity_slot(index: usize, identities: usize) -> usize {
    (identities - 1) - (index % identities)
}

/// Split items into one bucket per identity using reversed round-robin
pub fn partition_round_robin<T>(items: Vec<T>, identities: usize) -> Vec<Vec<T>> {
    let mut buckets: Vec<Vec<T>> = (0..identities).map(|_| Vec::new()).collect();
    if identities == 0 {
        return buckets;
    }

    for (index, item) in items.into_iter().enumerate() {
        buckets[identity_slot(index, identities)].push(item);
    }
    buckets
}

/// Route groups to the bucket of their owning identity
///
/// `owners` is the ordered list of eligible identities; groups owned by
/// anyone else are dropped. Returns the buckets and the number dropped.
pub fn partition_by_owner(groups: Vec<Group>, owners: &[IdentityId]) -> (Vec<Vec<Group>>, usize) {
    let mut buckets: Vec<Vec<Group>> = owners.iter().map(|_| Vec::new()).collect();
    let mut dropped = 0;

    for group in groups {
        match owners.iter().position(|owner| *owner == group.identity_id) {
            Some(slot) => buckets[slot].push(group),
            None => dropped += 1,
        }
    }
    (buckets, dropped)
}
