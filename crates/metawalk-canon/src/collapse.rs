//! Merge records that became identical after remapping.

use std::collections::BTreeMap;

use crate::model::{CanonicalRecord, DirectEdges, EdgeObject, MetapathStep};

/// Group records by metapath and witness counts by edge list.
///
/// Witness edge lists are sorted and deduplicated first, so lists that differ
/// only in order (or in a duplicate left by symmetric normalization) merge.
/// Totals are recomputed from the witness counts. Output is sorted by total
/// (descending) then metapath; witnesses by count (descending) then edges.
/// Collapsing a collapsed list returns it unchanged.
pub fn collapse<I>(records: I) -> Vec<CanonicalRecord>
where
    I: IntoIterator<Item = CanonicalRecord>,
{
    let mut grouped: BTreeMap<Vec<MetapathStep>, BTreeMap<Vec<EdgeObject>, u64>> =
        BTreeMap::new();
    for record in records {
        let slot = grouped.entry(record.metapath).or_default();
        for direct in record.direct_edges {
            let mut edge = direct.edge;
            edge.sort();
            edge.dedup();
            *slot.entry(edge).or_default() += direct.count;
        }
    }

    let mut out: Vec<CanonicalRecord> = grouped
        .into_iter()
        .map(|(metapath, witnesses)| {
            let mut direct_edges: Vec<DirectEdges> = witnesses
                .into_iter()
                .map(|(edge, count)| DirectEdges { count, edge })
                .collect();
            // Stable: ties keep the BTreeMap's ascending edge order.
            direct_edges.sort_by(|a, b| b.count.cmp(&a.count));
            let total_count = direct_edges.iter().map(|d| d.count).sum();
            CanonicalRecord {
                metapath,
                direct_edges,
                total_count,
            }
        })
        .collect();
    out.sort_by(|a, b| b.total_count.cmp(&a.total_count));
    out
}
