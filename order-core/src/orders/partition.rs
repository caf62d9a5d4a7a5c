//! Cart partitioning - grouping cart lines by seller
//!
//! Every order belongs to exactly one seller, so a multi-seller cart
//! becomes one partition per seller. BTreeMap keeps iteration order
//! deterministic across runs.

use shared::order::CartLine;
use std::collections::BTreeMap;

/// Group cart lines by seller, preserving line order within each group
///
/// Pure function. Lines are expected to carry a non-empty seller id;
/// that is validated before placement reaches this point.
pub fn partition_by_seller(lines: &[CartLine]) -> BTreeMap<String, Vec<CartLine>> {
    let mut partitions: BTreeMap<String, Vec<CartLine>> = BTreeMap::new();
    for line in lines {
        partitions
            .entry(line.seller_id.clone())
            .or_default()
            .push(line.clone());
    }
    partitions
}
