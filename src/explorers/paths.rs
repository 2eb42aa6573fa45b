//! Iterative enumeration of root-to-final paths of a graph.
//!
//! Paths are enumerated depth-first with an explicit work stack. Instead of
//! keeping a copy of the path in each stack entry, every entry points to a
//! node of the search tree, which knows its parent; a path is rebuilt by
//! following parent pointers back to the root when a final node is popped.
//!
//! Search-tree nodes are recycled as soon as their whole subtree has been
//! explored, so the memory held is proportional to the number of nodes
//! still waiting on the stack (plus their ancestors), not to the number of
//! paths.

/// How far paths are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Follow each path until it reaches a final node. A path never
    /// revisits a node already on it.
    Unbounded,
    /// Stop each path at a final node, or after this many steps.
    Bounded(usize),
}

#[derive(Debug)]
struct Node<N> {
    item: N,
    parent: Option<usize>,
    depth: usize,
    // Children pushed on the stack and not yet fully explored.
    pending: usize,
}

/// Search tree with recyclable slots.
#[derive(Debug)]
struct SearchTree<N> {
    nodes: Vec<Node<N>>,
    free: Vec<usize>,
}

impl<N: Copy + PartialEq> SearchTree<N> {
    fn new() -> SearchTree<N> {
        SearchTree {
            nodes: vec![],
            free: vec![],
        }
    }

    fn insert(&mut self, item: N, parent: Option<usize>) -> usize {
        let depth = match parent {
            Some(p) => {
                self.nodes[p].pending += 1;
                self.nodes[p].depth + 1
            },
            None => 0,
        };
        let node = Node { item, parent, depth, pending: 0 };

        match self.free.pop() {
            Some(i) => {
                self.nodes[i] = node;
                i
            },
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            },
        }
    }

    /// Releases a node that has no pending children, and then every
    /// ancestor whose subtree became fully explored.
    fn release(&mut self, mut i: usize) {
        loop {
            self.free.push(i);
            match self.nodes[i].parent {
                Some(p) => {
                    self.nodes[p].pending -= 1;
                    if self.nodes[p].pending > 0 {
                        return;
                    }
                    i = p;
                },
                None => return,
            }
        }
    }

    /// Returns true if `item` is on the path from the root to node `i`.
    fn on_path(&self, mut i: usize, item: N) -> bool {
        loop {
            if self.nodes[i].item == item {
                return true;
            }
            match self.nodes[i].parent {
                Some(p) => i = p,
                None => return false,
            }
        }
    }

    /// Rebuilds the path from the root to node `i`.
    fn path(&self, i: usize) -> Vec<N> {
        let mut path = Vec::with_capacity(self.nodes[i].depth + 1);
        let mut current = Some(i);
        while let Some(c) = current {
            path.push(self.nodes[c].item);
            current = self.nodes[c].parent;
        }
        path.reverse();
        path
    }

    fn allocated(&self) -> usize {
        self.nodes.len()
    }
}

/// Enumerates every path from `root` to a final node, calling `visit` on
/// each of them (root first). Returns the number of paths visited.
///
/// `successors` lists the children of a node, and `is_final` tells
/// whether a node closes a path; final nodes are never expanded.
/// A non-final node whose successors are all excluded ends its path
/// without visiting it.
pub fn explore_paths<N, S, I, F, V>(root: N, depth: Depth, mut successors: S,
                                    mut is_final: F, mut visit: V) -> usize
where N: Copy + PartialEq,
      S: FnMut(N) -> I,
      I: IntoIterator<Item = N>,
      F: FnMut(N) -> bool,
      V: FnMut(&[N]) {
    let mut tree = SearchTree::new();
    let mut stack = vec![tree.insert(root, None)];
    let mut npaths = 0;

    while let Some(current) = stack.pop() {
        let (item, node_depth) = (tree.nodes[current].item, tree.nodes[current].depth);

        let closes_path = is_final(item) || match depth {
            Depth::Bounded(k) => node_depth >= k,
            Depth::Unbounded => false,
        };

        if closes_path {
            visit(&tree.path(current));
            npaths += 1;
        } else {
            for next in successors(item) {
                if depth == Depth::Unbounded && tree.on_path(current, next) {
                    continue;
                }
                let child = tree.insert(next, Some(current));
                stack.push(child);
            }
        }

        if tree.nodes[current].pending == 0 {
            tree.release(current);
        }
    }
    tracing::trace!("{} paths explored, {} search nodes allocated",
                    npaths, tree.allocated());

    npaths
}
