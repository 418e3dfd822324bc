//! pCRL / mCRL classification (§4.4): a process expression is mCRL if it
//! contains a parallel or restriction operator, directly or through a
//! call to an equation that is itself mCRL.
use alpha_ir::{Pid, ProcessExpr, ProcessSpec};
use std::collections::{HashMap, HashSet};

/// `true` iff `expr` directly (not through a call) contains a parallel
/// or restriction operator.
fn has_direct_mcrl_operator(expr: &ProcessExpr) -> bool {
    match expr {
        ProcessExpr::Merge(..)
        | ProcessExpr::LeftMerge(..)
        | ProcessExpr::Sync(..)
        | ProcessExpr::Block(..)
        | ProcessExpr::Hide(..)
        | ProcessExpr::Rename(..)
        | ProcessExpr::Comm(..)
        | ProcessExpr::Allow(..) => true,
        ProcessExpr::Delta | ProcessExpr::Tau | ProcessExpr::Action { .. } => false,
        ProcessExpr::Call { .. } | ProcessExpr::CallAssign { .. } => false,
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. } => has_direct_mcrl_operator(body),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => has_direct_mcrl_operator(then_branch) || has_direct_mcrl_operator(else_branch),
        ProcessExpr::Choice(l, r) | ProcessExpr::Seq(l, r) | ProcessExpr::BoundedInit(l, r) => {
            has_direct_mcrl_operator(l) || has_direct_mcrl_operator(r)
        }
    }
}

fn direct_calls(expr: &ProcessExpr, out: &mut Vec<Pid>) {
    crate::analysis::pid_graph::for_each_call(expr, &mut |pid| out.push(pid.clone()));
}

/// Runs the fixpoint of §4.4: starts optimistically with every equation
/// classified pCRL; whenever an equation's body contains a parallel or
/// restriction operator, or calls an equation already marked mCRL, it is
/// promoted to mCRL; repeats until stable.
pub fn classify_pcrl(spec: &ProcessSpec) -> HashMap<Pid, bool> {
    let mut is_mcrl: HashMap<Pid, bool> = spec
        .equations
        .iter()
        .map(|eq| (eq.pid.clone(), has_direct_mcrl_operator(&eq.expression)))
        .collect();
    loop {
        let mut changed = false;
        for eq in &spec.equations {
            if is_mcrl.get(&eq.pid).copied().unwrap_or(false) {
                continue;
            }
            let mut calls = Vec::new();
            direct_calls(&eq.expression, &mut calls);
            if calls.iter().any(|callee| is_mcrl.get(callee).copied().unwrap_or(false)) {
                is_mcrl.insert(eq.pid.clone(), true);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    is_mcrl
}

/// `true` iff `eqn`'s PID classifies as pCRL under `classification`.
pub fn is_pcrl(pid: &Pid, classification: &HashMap<Pid, bool>) -> bool {
    !classification.get(pid).copied().unwrap_or(false)
}

/// The set of PIDs classified as pCRL.
pub fn pcrl_pids(classification: &HashMap<Pid, bool>) -> HashSet<Pid> {
    classification
        .iter()
        .filter(|(_, is_mcrl)| !**is_mcrl)
        .map(|(pid, _)| pid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{Id, ProcessEquation};

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec![])
    }

    #[test]
    fn plain_action_sequence_is_pcrl() {
        let body = ProcessExpr::seq(
            ProcessExpr::Action {
                label: Id::new("a"),
                args: vec![],
            },
            ProcessExpr::Delta,
        );
        let spec = ProcessSpec {
            equations: vec![ProcessEquation::new(pid("P"), vec![], body)],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        let classification = classify_pcrl(&spec);
        assert!(is_pcrl(&pid("P"), &classification));
    }

    #[test]
    fn merge_forces_mcrl() {
        let body = ProcessExpr::merge(ProcessExpr::Delta, ProcessExpr::Delta);
        let spec = ProcessSpec {
            equations: vec![ProcessEquation::new(pid("P"), vec![], body)],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        let classification = classify_pcrl(&spec);
        assert!(!is_pcrl(&pid("P"), &classification));
    }

    #[test]
    fn mcrl_propagates_through_calls() {
        let spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid("P"),
                    vec![],
                    ProcessExpr::call(pid("Q"), vec![]),
                ),
                ProcessEquation::new(
                    pid("Q"),
                    vec![],
                    ProcessExpr::merge(ProcessExpr::Delta, ProcessExpr::Delta),
                ),
            ],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        let classification = classify_pcrl(&spec);
        assert!(!is_pcrl(&pid("P"), &classification));
        assert!(!is_pcrl(&pid("Q"), &classification));
    }
}
