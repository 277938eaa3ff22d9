use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{api::CommentId, NormalizedComment};

/// Maximum length of the connector segment going into the last reply of a comment
pub const ELBOW: u32 = 16;

pub trait Measure {
    /// Rendered height of the row of `comment` displayed at `depth`, replies excluded
    fn row_height(&self, comment: &NormalizedComment, depth: usize) -> u32;
}

impl<F> Measure for F
where
    F: Fn(&NormalizedComment, usize) -> u32,
{
    fn row_height(&self, comment: &NormalizedComment, depth: usize) -> u32 {
        self(comment, depth)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowLayout {
    pub id: CommentId,
    pub depth: usize,
    pub collapsed: bool,

    /// Height of the row itself
    pub height: u32,

    /// Height of the row and of all its visible replies
    pub subtree_height: u32,

    /// Length of the line linking this comment to its replies, `None` when no reply is shown
    pub connector: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LayoutStats {
    pub measured: usize,
    pub reused: usize,
}

#[derive(Clone, Debug)]
struct Measured {
    node: Arc<NormalizedComment>,
    depth: usize,
    height: u32,
}

/// Collapse state and connector geometry of a thread.
///
/// Row measurements are remembered per node identity: as long as a subtree is the same `Arc`
/// it is not measured again, which is what keeps a local edit from re-measuring the whole
/// thread.
#[derive(Clone, Debug, Default)]
pub struct ThreadLayout {
    collapsed: HashSet<CommentId>,
    cache: HashMap<CommentId, Measured>,
}

struct Pass<'a, M: ?Sized> {
    measure: &'a M,
    rows: Vec<RowLayout>,
    stats: LayoutStats,
    seen: HashSet<CommentId>,
}

enum Frame<'n> {
    Enter {
        node: &'n Arc<NormalizedComment>,
        depth: usize,
        parent: Option<usize>,
    },

    /// Every visible reply of the comment at `row` got laid out
    Exit {
        row: usize,
        parent: Option<usize>,
        expanded: bool,
    },
}

/// Visible replies of a row, accumulated as they get laid out
#[derive(Clone, Copy, Default)]
struct Replies {
    height: u32,
    last_subtree: u32,
    last_row: u32,
}

impl ThreadLayout {
    pub fn new() -> ThreadLayout {
        ThreadLayout::default()
    }

    pub fn is_collapsed(&self, id: &CommentId) -> bool {
        self.collapsed.contains(id)
    }

    pub fn set_collapsed(&mut self, id: CommentId, collapsed: bool) {
        if collapsed {
            self.collapsed.insert(id);
        } else {
            self.collapsed.remove(&id);
        }
    }

    /// Flips the collapse state of `id`, returning whether it is now collapsed
    pub fn toggle(&mut self, id: &CommentId) -> bool {
        let now_collapsed = !self.is_collapsed(id);
        self.set_collapsed(id.clone(), now_collapsed);
        now_collapsed
    }

    /// Lays out the visible rows of `roots`, top to bottom
    pub fn compute<M>(
        &mut self,
        roots: &[Arc<NormalizedComment>],
        measure: &M,
    ) -> (Vec<RowLayout>, LayoutStats)
    where
        M: Measure + ?Sized,
    {
        let mut pass = Pass {
            measure,
            rows: Vec::new(),
            stats: LayoutStats::default(),
            seen: HashSet::new(),
        };
        let mut replies = Vec::<Replies>::new();
        let mut stack = roots
            .iter()
            .rev()
            .map(|node| Frame::Enter {
                node,
                depth: 0,
                parent: None,
            })
            .collect::<Vec<_>>();
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter {
                    node,
                    depth,
                    parent,
                } => {
                    let height = self.row_height(node, depth, &mut pass);
                    pass.seen.insert(node.id().clone());
                    let collapsed = self.is_collapsed(node.id());
                    let row = pass.rows.len();
                    pass.rows.push(RowLayout {
                        id: node.id().clone(),
                        depth,
                        collapsed,
                        height,
                        subtree_height: height,
                        connector: None,
                    });
                    replies.push(Replies::default());

                    let expanded = !collapsed && !node.replies.is_empty();
                    if collapsed {
                        pass.seen.extend(NormalizedComment::ids_in(&node.replies));
                    }
                    stack.push(Frame::Exit {
                        row,
                        parent,
                        expanded,
                    });
                    if expanded {
                        stack.extend(node.replies.iter().rev().map(|r| Frame::Enter {
                            node: r,
                            depth: depth + 1,
                            parent: Some(row),
                        }));
                    }
                }
                Frame::Exit {
                    row,
                    parent,
                    expanded,
                } => {
                    let height = pass.rows[row].height;
                    if expanded {
                        let r = replies[row];
                        pass.rows[row].subtree_height = height.saturating_add(r.height);
                        pass.rows[row].connector = Some(
                            (r.height - r.last_subtree).saturating_add(r.last_row.min(ELBOW)),
                        );
                    }
                    if let Some(p) = parent {
                        let subtree = pass.rows[row].subtree_height;
                        let r = &mut replies[p];
                        r.height = r.height.saturating_add(subtree);
                        r.last_subtree = subtree;
                        r.last_row = height;
                    }
                }
            }
        }
        // Hidden subtrees stay cached, so that expanding them again does not re-measure
        self.cache.retain(|id, _| pass.seen.contains(id));
        tracing::trace!(
            rows = pass.rows.len(),
            measured = pass.stats.measured,
            reused = pass.stats.reused,
            "computed thread layout"
        );
        (pass.rows, pass.stats)
    }

    fn row_height<M>(
        &mut self,
        node: &Arc<NormalizedComment>,
        depth: usize,
        pass: &mut Pass<'_, M>,
    ) -> u32
    where
        M: Measure + ?Sized,
    {
        let cached = self
            .cache
            .get(node.id())
            .filter(|m| Arc::ptr_eq(&m.node, node) && m.depth == depth)
            .map(|m| m.height);
        if let Some(height) = cached {
            pass.stats.reused += 1;
            return height;
        }
        let height = pass.measure.row_height(node, depth);
        pass.stats.measured += 1;
        self.cache.insert(
            node.id().clone(),
            Measured {
                node: node.clone(),
                depth,
                height,
            },
        );
        height
    }
}
