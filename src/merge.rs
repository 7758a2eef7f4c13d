//! Reconciling a saved dataset with freshly scraped records.
//!
//! Records are matched by URL. A fresh record replaces the saved one only
//! when its content differs; otherwise the saved record is kept verbatim so
//! metadata enriched by an earlier run survives. Saved records that were not
//! scraped again are appended unchanged, so nothing is ever dropped.

use crate::models::ArticleRecord;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merge `new` into `old`.
///
/// Output order: one record per URL in `new` (first occurrence wins), then the
/// unmatched `old` records in their original order. The output holds exactly
/// one record per distinct URL across both inputs.
pub fn merge_records(old: Vec<ArticleRecord>, new: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let mut old_by_url: HashMap<String, usize> = HashMap::with_capacity(old.len());
    let mut old_slots: Vec<Option<ArticleRecord>> = Vec::with_capacity(old.len());
    for record in old {
        if old_by_url.contains_key(&record.url) {
            // a saved dataset should not repeat URLs; keep the first copy
            continue;
        }
        old_by_url.insert(record.url.clone(), old_slots.len());
        old_slots.push(Some(record));
    }

    let mut emitted: HashSet<String> = HashSet::with_capacity(new.len());
    let mut out = Vec::with_capacity(old_slots.len() + new.len());
    let (mut replaced, mut kept, mut added) = (0usize, 0usize, 0usize);

    for record in new {
        if !emitted.insert(record.url.clone()) {
            continue;
        }
        match old_by_url.get(&record.url).and_then(|&i| old_slots[i].take()) {
            Some(previous) if previous.content == record.content => {
                kept += 1;
                out.push(previous);
            }
            Some(_) => {
                replaced += 1;
                out.push(record);
            }
            None => {
                added += 1;
                out.push(record);
            }
        }
    }

    let leftover_start = out.len();
    out.extend(old_slots.into_iter().flatten());

    debug!(
        replaced,
        kept,
        added,
        carried_over = out.len() - leftover_start,
        total = out.len(),
        "Merged records"
    );
    out
}
