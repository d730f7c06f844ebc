//! Depth-first cycle search shared by the import and dependency graphs

use std::collections::HashMap;
use std::hash::Hash;

/// Outcome of a successful traversal
#[derive(Debug)]
pub(crate) struct Traversal<N> {
    /// Nodes in post-order: every node after the nodes it points to
    pub order: Vec<N>,
    /// Closed paths of tolerated cycles (every edge deferred)
    pub deferred_cycles: Vec<Vec<N>>,
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

struct Walker<N, F> {
    edges: F,
    marks: HashMap<N, Mark>,
    stack: Vec<N>,
    // deferred flag of the edge that led to stack[i]
    entered_by: Vec<bool>,
    order: Vec<N>,
    deferred_cycles: Vec<Vec<N>>,
}

impl<N, F> Walker<N, F>
where
    N: Clone + Eq + Hash,
    F: FnMut(&N) -> Vec<(N, bool)>,
{
    fn visit(&mut self, node: &N, deferred: bool) -> Result<(), Vec<N>> {
        self.marks.insert(node.clone(), Mark::Visiting);
        self.stack.push(node.clone());
        self.entered_by.push(deferred);

        for (next, edge_deferred) in (self.edges)(node) {
            match self.marks.get(&next).copied() {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let Some(start) = self.stack.iter().position(|n| n == &next) else {
                        continue;
                    };
                    let mut path = self.stack[start..].to_vec();
                    path.push(next);
                    let all_deferred =
                        edge_deferred && self.entered_by[start + 1..].iter().all(|d| *d);
                    if !all_deferred {
                        return Err(path);
                    }
                    self.deferred_cycles.push(path);
                }
                None => self.visit(&next, edge_deferred)?,
            }
        }

        self.stack.pop();
        self.entered_by.pop();
        self.marks.insert(node.clone(), Mark::Done);
        self.order.push(node.clone());
        Ok(())
    }
}

/// Walk every node reachable from `roots`, in root order then edge order
///
/// `edges` yields `(target, deferred)` pairs. A cycle is tolerated when all
/// of its edges are deferred; otherwise the closed cycle path
/// (`[A, B, A]`) is returned as the error.
pub(crate) fn traverse<N, F>(roots: &[N], edges: F) -> Result<Traversal<N>, Vec<N>>
where
    N: Clone + Eq + Hash,
    F: FnMut(&N) -> Vec<(N, bool)>,
{
    let mut walker = Walker {
        edges,
        marks: HashMap::new(),
        stack: Vec::new(),
        entered_by: Vec::new(),
        order: Vec::new(),
        deferred_cycles: Vec::new(),
    };

    for root in roots {
        if walker.marks.contains_key(root) {
            continue;
        }
        walker.visit(root, false)?;
    }

    Ok(Traversal {
        order: walker.order,
        deferred_cycles: walker.deferred_cycles,
    })
}
