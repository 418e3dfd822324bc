//! The PID dependency graph: a node per process identifier, an edge
//! `p -> q` whenever `p`'s body contains `call(q, _)` or
//! `call_assign(q, _)` (§4.3 step 1, §4.4 "Process SCC").
use alpha_ir::{Pid, ProcessExpr, ProcessSpec};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Walks every `call`/`call_assign` node reachable from `expr`, invoking
/// `f` with each referenced PID. Does not recurse into the callee's own
/// equation body — callers that need the full dependency closure do that
/// via the graph built here.
pub fn for_each_call<F: FnMut(&Pid)>(expr: &ProcessExpr, f: &mut F) {
    match expr {
        ProcessExpr::Delta | ProcessExpr::Tau | ProcessExpr::Action { .. } => {}
        ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => f(pid),
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. }
        | ProcessExpr::Block(_, body)
        | ProcessExpr::Hide(_, body)
        | ProcessExpr::Rename(_, body)
        | ProcessExpr::Comm(_, body)
        | ProcessExpr::Allow(_, body) => for_each_call(body, f),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            for_each_call(then_branch, f);
            for_each_call(else_branch, f);
        }
        ProcessExpr::Choice(l, r)
        | ProcessExpr::Seq(l, r)
        | ProcessExpr::BoundedInit(l, r)
        | ProcessExpr::Merge(l, r)
        | ProcessExpr::LeftMerge(l, r)
        | ProcessExpr::Sync(l, r) => {
            for_each_call(l, f);
            for_each_call(r, f);
        }
    }
}

/// Collects every PID mentioned by a `call`/`call_assign` node in `expr`.
pub fn find_process_identifiers(expr: &ProcessExpr) -> Vec<Pid> {
    let mut result = Vec::new();
    for_each_call(expr, &mut |pid| result.push(pid.clone()));
    result
}

/// A `petgraph::DiGraph` over PIDs: edge `p -> q` iff `p` calls `q`.
pub struct PidGraph {
    index: HashMap<Pid, NodeIndex>,
    graph: DiGraph<Pid, ()>,
}

impl PidGraph {
    /// Builds the dependency graph over every equation in `spec`
    /// (§4.3 step 1: "Build the PID dependency graph by scanning
    /// equation bodies for call / call_assign").
    pub fn build(spec: &ProcessSpec) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for eq in &spec.equations {
            index
                .entry(eq.pid.clone())
                .or_insert_with(|| graph.add_node(eq.pid.clone()));
        }
        for eq in &spec.equations {
            let from = index[&eq.pid];
            for_each_call(&eq.expression, &mut |callee| {
                let to = *index
                    .entry(callee.clone())
                    .or_insert_with(|| graph.add_node(callee.clone()));
                graph.add_edge(from, to, ());
            });
        }
        PidGraph { index, graph }
    }

    pub fn node(&self, pid: &Pid) -> Option<NodeIndex> {
        self.index.get(pid).copied()
    }

    pub fn pid_at(&self, idx: NodeIndex) -> &Pid {
        &self.graph[idx]
    }

    pub fn contains(&self, pid: &Pid) -> bool {
        self.index.contains_key(pid)
    }

    /// Strongly connected components, in petgraph's (reverse topological)
    /// order (§4.4 "Tarjan SCC").
    pub fn sccs(&self) -> Vec<Vec<Pid>> {
        algo::tarjan_scc(&self.graph)
            .into_iter()
            .map(|component| component.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .collect()
    }

    /// `true` iff `pid` is in a non-trivial SCC or has a direct self-loop
    /// (§4.4 `is_recursive`).
    pub fn is_recursive(&self, pid: &Pid) -> bool {
        let Some(idx) = self.node(pid) else {
            return false;
        };
        if self.graph.contains_edge(idx, idx) {
            return true;
        }
        self.sccs().into_iter().any(|scc| scc.len() >= 2 && scc.contains(pid))
    }

    /// Strongly connected components restricted to the PIDs reachable from
    /// `roots`, mirroring the original's init-restricted SCC overload.
    pub fn sccs_reachable_from(&self, roots: &[Pid]) -> Vec<Vec<Pid>> {
        let mut reached = self.reachable_from(roots);
        reached.extend(roots.iter().cloned());
        self.sccs()
            .into_iter()
            .map(|component| component.into_iter().filter(|pid| reached.contains(pid)).collect())
            .filter(|component: &Vec<Pid>| !component.is_empty())
            .collect()
    }

    /// Breadth-first reachability from `roots` (§4.4 "Reachability from initial").
    pub fn reachable_from(&self, roots: &[Pid]) -> std::collections::HashSet<Pid> {
        let mut seen = std::collections::HashSet::new();
        let mut queue: std::collections::VecDeque<Pid> = std::collections::VecDeque::new();
        for r in roots {
            if seen.insert(r.clone()) {
                queue.push_back(r.clone());
            }
        }
        while let Some(pid) = queue.pop_front() {
            let Some(idx) = self.node(&pid) else { continue };
            for succ in self.graph.neighbors(idx) {
                let callee = self.graph[succ].clone();
                if seen.insert(callee.clone()) {
                    queue.push_back(callee);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{Id, ProcessEquation};

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec![])
    }

    fn spec_with(eqs: Vec<(Pid, ProcessExpr)>, initial: ProcessExpr) -> ProcessSpec {
        ProcessSpec {
            equations: eqs
                .into_iter()
                .map(|(pid, expr)| ProcessEquation::new(pid, vec![], expr))
                .collect(),
            initial,
            ..Default::default()
        }
    }

    #[test]
    fn builds_edges_from_calls() {
        let spec = spec_with(
            vec![
                (pid("P"), ProcessExpr::call(pid("Q"), vec![])),
                (pid("Q"), ProcessExpr::Delta),
            ],
            ProcessExpr::call(pid("P"), vec![]),
        );
        let g = PidGraph::build(&spec);
        assert!(g.contains(&pid("P")));
        assert!(g.contains(&pid("Q")));
    }

    #[test]
    fn detects_self_recursion() {
        let spec = spec_with(
            vec![(pid("R"), ProcessExpr::call(pid("R"), vec![]))],
            ProcessExpr::call(pid("R"), vec![]),
        );
        let g = PidGraph::build(&spec);
        assert!(g.is_recursive(&pid("R")));
    }

    #[test]
    fn reachability_follows_calls() {
        let spec = spec_with(
            vec![
                (pid("P"), ProcessExpr::call(pid("Q"), vec![])),
                (pid("Q"), ProcessExpr::Delta),
                (pid("Unused"), ProcessExpr::Delta),
            ],
            ProcessExpr::call(pid("P"), vec![]),
        );
        let g = PidGraph::build(&spec);
        let reached = g.reachable_from(&find_process_identifiers(&spec.initial));
        assert!(reached.contains(&pid("P")));
        assert!(reached.contains(&pid("Q")));
        assert!(!reached.contains(&pid("Unused")));
    }
}
