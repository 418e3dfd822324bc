//! Unused-equation pruning (§4.4): removes every equation not reachable
//! from `initial` by following `call`/`call_assign` edges.
use alpha_ir::ProcessSpec;

use crate::analysis::{find_process_identifiers, PidGraph};

/// Runs unused-equation pruning over `spec` in place.
pub fn eliminate_unused_equations(spec: &mut ProcessSpec) {
    let graph = PidGraph::build(spec);
    let roots = find_process_identifiers(&spec.initial);
    let mut reachable = graph.reachable_from(&roots);
    reachable.extend(roots);
    spec.equations.retain(|eq| reachable.contains(&eq.pid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{Id, Pid, ProcessEquation, ProcessExpr};

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec![])
    }

    #[test]
    fn drops_equations_unreachable_from_initial() {
        let mut spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(pid("P"), vec![], ProcessExpr::call(pid("Q"), vec![])),
                ProcessEquation::new(pid("Q"), vec![], ProcessExpr::Delta),
                ProcessEquation::new(pid("Dead"), vec![], ProcessExpr::Delta),
            ],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        eliminate_unused_equations(&mut spec);
        let pids: Vec<_> = spec.equations.iter().map(|eq| eq.pid.clone()).collect();
        assert!(pids.contains(&pid("P")));
        assert!(pids.contains(&pid("Q")));
        assert!(!pids.contains(&pid("Dead")));
    }

    #[test]
    fn keeps_everything_when_all_reachable() {
        let mut spec = ProcessSpec {
            equations: vec![ProcessEquation::new(pid("P"), vec![], ProcessExpr::Delta)],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        eliminate_unused_equations(&mut spec);
        assert_eq!(spec.equations.len(), 1);
    }
}
