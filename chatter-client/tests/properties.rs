use std::sync::Arc;

use chatter_client::{
    api::{CommentId, CommentRecord, UserId},
    flatten, normalize, update_node, CommentPatch, NormalizedComment,
};

// Few distinct ids, so that duplicates, cycles and self references come up often
fn records(graph: &[(u8, Option<u8>)]) -> Vec<CommentRecord> {
    graph
        .iter()
        .enumerate()
        .map(|(i, (id, parent))| {
            let mut r = CommentRecord::stub(
                &(id % 32).to_string(),
                parent.map(|p| (p % 32).to_string()).as_deref(),
            );
            r.body = i.to_string();
            r
        })
        .collect()
}

fn num_distinct(records: &[CommentRecord]) -> usize {
    let mut ids = records.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    ids.len()
}

fn preorder_records(roots: &[Arc<NormalizedComment>]) -> Vec<CommentRecord> {
    let mut res = Vec::new();
    let mut stack = roots.iter().rev().collect::<Vec<_>>();
    while let Some(c) = stack.pop() {
        res.push(c.record.clone());
        stack.extend(c.replies.iter().rev());
    }
    res
}

#[test]
fn every_record_lands_exactly_once() {
    bolero::check!()
        .with_type::<Vec<(u8, Option<u8>)>>()
        .cloned()
        .for_each(|graph| {
            let records = records(&graph);
            let roots = normalize(records.clone(), &UserId::stub());
            let mut ids = NormalizedComment::ids_in(&roots);
            let total = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), total, "an id shows up twice");
            assert_eq!(total, num_distinct(&records));
        })
}

#[test]
fn normalizing_is_idempotent() {
    bolero::check!()
        .with_type::<Vec<(u8, Option<u8>)>>()
        .cloned()
        .for_each(|graph| {
            let roots = normalize(records(&graph), &UserId::stub());
            let again = normalize(preorder_records(&roots), &UserId::stub());
            assert_eq!(roots, again);
        })
}

#[test]
fn flattening_lists_every_reply() {
    bolero::check!()
        .with_type::<Vec<(u8, Option<u8>)>>()
        .cloned()
        .for_each(|graph| {
            let roots = normalize(records(&graph), &UserId::stub());
            let total = NormalizedComment::ids_in(&roots).len();
            assert_eq!(flatten(&roots).len(), total - roots.len());
        })
}

#[test]
fn updates_only_touch_their_path() {
    bolero::check!()
        .with_type::<(Vec<(u8, Option<u8>)>, u8)>()
        .cloned()
        .for_each(|(graph, target)| {
            let roots = normalize(records(&graph), &UserId::stub());
            let target = CommentId((target % 32).to_string());
            let patch = CommentPatch {
                body: Some(String::from("edited")),
                ..CommentPatch::default()
            };
            let after = update_node(&roots, &target, &patch);
            assert_eq!(roots.len(), after.len());
            for (b, a) in roots.iter().zip(&after) {
                let on_path =
                    NormalizedComment::find_in(std::slice::from_ref(b), &target).is_some();
                assert_eq!(!on_path, Arc::ptr_eq(b, a));
            }
            if let Some(c) = NormalizedComment::find_in(&after, &target) {
                assert_eq!(c.record.body, "edited");
            }
        })
}
