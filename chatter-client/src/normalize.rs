use std::{collections::HashMap, sync::Arc};

use crate::{
    api::{CommentId, CommentRecord, UserId},
    NormalizedComment,
};

/// Structural problems found while normalizing a batch. None of them is fatal: every record
/// still ends up exactly once in the resulting forest.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Anomalies {
    /// Comments whose parent is not part of the batch, promoted to roots
    pub orphans: Vec<CommentId>,

    /// One entry per extra occurrence of an id; the last record with that id is the one kept
    pub duplicates: Vec<CommentId>,

    /// Comments listing themselves as their parent, promoted to roots
    pub self_references: Vec<CommentId>,

    /// Comments promoted to roots to break a cycle in parent pointers
    pub cycles_broken: Vec<CommentId>,
}

impl Anomalies {
    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
            && self.duplicates.is_empty()
            && self.self_references.is_empty()
            && self.cycles_broken.is_empty()
    }
}

/// Builds the reply forest of a thread out of the flat records returned by the store.
///
/// Roots keep the order of `records`, and so do the replies of each comment. See
/// [`normalize_with_report`] for how malformed parent references are handled.
pub fn normalize(
    records: Vec<CommentRecord>,
    thread_author: &UserId,
) -> Vec<Arc<NormalizedComment>> {
    normalize_with_report(records, thread_author).0
}

#[derive(Clone, Copy, PartialEq)]
enum Walk {
    Unvisited,
    InProgress,
    Done,
}

/// Same as [`normalize`], also returning the anomalies that had to be worked around:
/// - a record whose parent is absent from the batch (or is itself) becomes a root,
/// - when several records share an id, the last one wins and sits at the position of its
///   own occurrence,
/// - a cycle of parent pointers is broken by making its earliest record a root.
pub fn normalize_with_report(
    records: Vec<CommentRecord>,
    thread_author: &UserId,
) -> (Vec<Arc<NormalizedComment>>, Anomalies) {
    let n = records.len();
    let mut report = Anomalies::default();

    // First pass: index every record, so that link order cannot matter
    let mut index = HashMap::with_capacity(n);
    for (slot, r) in records.iter().enumerate() {
        if index.insert(r.id.clone(), slot).is_some() {
            tracing::warn!(id = %r.id, "duplicate comment id in batch, keeping the last record");
            report.duplicates.push(r.id.clone());
        }
    }
    let is_live = |slot: usize, r: &CommentRecord| index.get(&r.id) == Some(&slot);

    // Second pass: resolve parents
    let mut parent = vec![None; n];
    for (slot, r) in records.iter().enumerate() {
        if !is_live(slot, r) {
            continue;
        }
        parent[slot] = match &r.parent_id {
            None => None,
            Some(p) if *p == r.id => {
                tracing::warn!(id = %r.id, "comment is its own parent, promoting it to root");
                report.self_references.push(r.id.clone());
                None
            }
            Some(p) => match index.get(p) {
                Some(&p) => Some(p),
                None => {
                    tracing::warn!(
                        id = %r.id,
                        parent = %p,
                        "parent not in batch, promoting comment to root"
                    );
                    report.orphans.push(r.id.clone());
                    None
                }
            },
        };
    }

    // Every parent chain must end on a root, otherwise the comments on it would be unreachable
    let mut state = vec![Walk::Unvisited; n];
    let mut path = Vec::new();
    for start in 0..n {
        let mut cur = Some(start);
        while let Some(slot) = cur {
            match state[slot] {
                Walk::Done => break,
                Walk::InProgress => {
                    // The cycle is the part of the path starting at the first visit of `slot`
                    let promoted = path
                        .iter()
                        .skip_while(|s| **s != slot)
                        .copied()
                        .min()
                        .unwrap_or(slot);
                    tracing::warn!(
                        id = %records[promoted].id,
                        "cycle in parent pointers, promoting comment to root"
                    );
                    report.cycles_broken.push(records[promoted].id.clone());
                    parent[promoted] = None;
                    break;
                }
                Walk::Unvisited => {
                    state[slot] = Walk::InProgress;
                    path.push(slot);
                    cur = parent[slot];
                }
            }
        }
        for slot in path.drain(..) {
            state[slot] = Walk::Done;
        }
    }

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); n];
    for (slot, r) in records.iter().enumerate() {
        if !is_live(slot, r) {
            continue;
        }
        match parent[slot] {
            None => roots.push(slot),
            Some(p) => children[p].push(slot),
        }
    }

    // Pre-order, so that building nodes in reverse sees every child before its parent
    let mut order = Vec::with_capacity(n);
    let mut stack = roots.iter().rev().copied().collect::<Vec<_>>();
    while let Some(slot) = stack.pop() {
        order.push(slot);
        stack.extend(children[slot].iter().rev());
    }

    let mut records = records.into_iter().map(Some).collect::<Vec<_>>();
    let mut built: Vec<Option<Arc<NormalizedComment>>> = vec![None; n];
    for &slot in order.iter().rev() {
        if let Some(record) = records[slot].take() {
            let mut node = NormalizedComment::new(record, thread_author);
            node.replies = children[slot]
                .iter()
                .filter_map(|c| built[*c].take())
                .collect();
            built[slot] = Some(Arc::new(node));
        }
    }
    let roots = roots
        .into_iter()
        .filter_map(|r| built[r].take())
        .collect::<Vec<_>>();

    tracing::debug!(
        num_records = n,
        num_roots = roots.len(),
        num_anomalies = report.orphans.len()
            + report.duplicates.len()
            + report.self_references.len()
            + report.cycles_broken.len(),
        "normalized comment batch"
    );
    (roots, report)
}
