//! Single-usage elimination (§4.4): inlines every equation used at most
//! `lowerbound` times (default 1) and not self-recursive, substituting
//! its body at each call site in topological (leaves-first) order.
use alpha_ir::{Pid, ProcessEquation, ProcessExpr, ProcessSpec};
use std::collections::{HashMap, HashSet};

use super::substitution::DataSubstituter;

/// Counts occurrences of `call`/`call_assign` for every PID across all
/// equation bodies and `initial`, and records which PIDs each equation's
/// body calls (its dependency set).
fn compute_count_and_dependencies(
    spec: &ProcessSpec,
) -> (HashMap<Pid, usize>, HashMap<Pid, HashSet<Pid>>) {
    let mut count: HashMap<Pid, usize> = spec.equations.iter().map(|eq| (eq.pid.clone(), 0)).collect();
    let mut dependencies: HashMap<Pid, HashSet<Pid>> =
        spec.equations.iter().map(|eq| (eq.pid.clone(), HashSet::new())).collect();

    let mut tally = |current: Option<&Pid>, expr: &ProcessExpr| {
        crate::analysis::for_each_call(expr, &mut |callee| {
            *count.entry(callee.clone()).or_insert(0) += 1;
            if let Some(current) = current {
                dependencies.entry(current.clone()).or_default().insert(callee.clone());
            }
        });
    };
    for eq in &spec.equations {
        tally(Some(&eq.pid), &eq.expression);
    }
    tally(None, &spec.initial);
    (count, dependencies)
}

/// For every PID used at most `lowerbound` times and not present in its
/// own dependency set, marks it for elimination.
fn compute_to_be_eliminated(
    count: &HashMap<Pid, usize>,
    dependencies: &HashMap<Pid, HashSet<Pid>>,
    lowerbound: usize,
) -> HashSet<Pid> {
    dependencies
        .iter()
        .filter(|(pid, deps)| count.get(*pid).copied().unwrap_or(0) <= lowerbound && !deps.contains(*pid))
        .map(|(pid, _)| pid.clone())
        .collect()
}

/// Orders `to_be_eliminated` leaves-first: an equation can be substituted
/// once every eliminated PID it depends on has already been substituted.
fn compute_substitution_order(
    dependencies: &HashMap<Pid, HashSet<Pid>>,
    to_be_eliminated: &HashSet<Pid>,
) -> Vec<Pid> {
    let mut remaining: HashMap<Pid, HashSet<Pid>> = to_be_eliminated
        .iter()
        .map(|pid| {
            let deps = dependencies
                .get(pid)
                .map(|d| d.intersection(to_be_eliminated).cloned().collect())
                .unwrap_or_default();
            (pid.clone(), deps)
        })
        .collect();

    let mut order = Vec::new();
    loop {
        let ready: Vec<Pid> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(pid, _)| pid.clone())
            .collect();
        if ready.is_empty() {
            break;
        }
        let mut ready_sorted = ready.clone();
        ready_sorted.sort();
        for pid in &ready_sorted {
            remaining.remove(pid);
        }
        for deps in remaining.values_mut() {
            for pid in &ready_sorted {
                deps.remove(pid);
            }
        }
        order.extend(ready_sorted);
    }
    order
}

fn inline_calls(
    expr: &ProcessExpr,
    current: Option<&Pid>,
    to_be_eliminated: &HashSet<Pid>,
    equations: &HashMap<Pid, ProcessEquation>,
    subst: &dyn DataSubstituter,
) -> ProcessExpr {
    let rewrite_child =
        |child: &ProcessExpr| inline_calls(child, current, to_be_eliminated, equations, subst);
    match expr {
        ProcessExpr::Call { pid, args } => {
            if to_be_eliminated.contains(pid) && Some(pid) != current {
                if let Some(eq) = equations.get(pid) {
                    let inlined = subst.substitute_body(&eq.expression, &eq.formal_parameters, args);
                    return inline_calls(&inlined, current, to_be_eliminated, equations, subst);
                }
            }
            expr.clone()
        }
        ProcessExpr::CallAssign { pid, assignments } => {
            if to_be_eliminated.contains(pid) && Some(pid) != current {
                if let Some(eq) = equations.get(pid) {
                    let args: Vec<_> = assignments.iter().map(|a| a.value.clone()).collect();
                    let inlined = subst.substitute_body(&eq.expression, &eq.formal_parameters, &args);
                    return inline_calls(&inlined, current, to_be_eliminated, equations, subst);
                }
            }
            expr.clone()
        }
        ProcessExpr::Delta | ProcessExpr::Tau | ProcessExpr::Action { .. } => expr.clone(),
        ProcessExpr::Sum { vars, body } => ProcessExpr::Sum {
            vars: vars.clone(),
            body: Box::new(rewrite_child(body)),
        },
        ProcessExpr::At { body, time } => ProcessExpr::At {
            body: Box::new(rewrite_child(body)),
            time: time.clone(),
        },
        ProcessExpr::IfThen { cond, body } => ProcessExpr::IfThen {
            cond: cond.clone(),
            body: Box::new(rewrite_child(body)),
        },
        ProcessExpr::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => ProcessExpr::IfThenElse {
            cond: cond.clone(),
            then_branch: Box::new(rewrite_child(then_branch)),
            else_branch: Box::new(rewrite_child(else_branch)),
        },
        ProcessExpr::SumQuantified { vars, body } => ProcessExpr::SumQuantified {
            vars: vars.clone(),
            body: Box::new(rewrite_child(body)),
        },
        ProcessExpr::Choice(l, r) => ProcessExpr::Choice(Box::new(rewrite_child(l)), Box::new(rewrite_child(r))),
        ProcessExpr::Seq(l, r) => ProcessExpr::Seq(Box::new(rewrite_child(l)), Box::new(rewrite_child(r))),
        ProcessExpr::BoundedInit(l, r) => {
            ProcessExpr::BoundedInit(Box::new(rewrite_child(l)), Box::new(rewrite_child(r)))
        }
        ProcessExpr::Stochastic { vars, dist, body } => ProcessExpr::Stochastic {
            vars: vars.clone(),
            dist: dist.clone(),
            body: Box::new(rewrite_child(body)),
        },
        ProcessExpr::Merge(l, r) => ProcessExpr::Merge(Box::new(rewrite_child(l)), Box::new(rewrite_child(r))),
        ProcessExpr::LeftMerge(l, r) => {
            ProcessExpr::LeftMerge(Box::new(rewrite_child(l)), Box::new(rewrite_child(r)))
        }
        ProcessExpr::Sync(l, r) => ProcessExpr::Sync(Box::new(rewrite_child(l)), Box::new(rewrite_child(r))),
        ProcessExpr::Block(h, body) => ProcessExpr::Block(h.clone(), Box::new(rewrite_child(body))),
        ProcessExpr::Hide(i, body) => ProcessExpr::Hide(i.clone(), Box::new(rewrite_child(body))),
        ProcessExpr::Rename(r, body) => ProcessExpr::Rename(r.clone(), Box::new(rewrite_child(body))),
        ProcessExpr::Comm(c, body) => ProcessExpr::Comm(c.clone(), Box::new(rewrite_child(body))),
        ProcessExpr::Allow(v, body) => ProcessExpr::Allow(v.clone(), Box::new(rewrite_child(body))),
    }
}

/// Runs single-usage elimination over `spec` in place, then prunes the
/// now-unreachable eliminated equations (mirroring the original's call
/// to unused-equation pruning at the end of its `run()`).
pub fn eliminate_single_usage_equations(
    spec: &mut ProcessSpec,
    lowerbound: usize,
    subst: &dyn DataSubstituter,
) {
    let (count, dependencies) = compute_count_and_dependencies(spec);
    let to_be_eliminated = compute_to_be_eliminated(&count, &dependencies, lowerbound);
    if to_be_eliminated.is_empty() {
        return;
    }
    let order = compute_substitution_order(&dependencies, &to_be_eliminated);

    let mut equations: HashMap<Pid, ProcessEquation> =
        spec.equations.iter().map(|eq| (eq.pid.clone(), eq.clone())).collect();

    for pid in &order {
        let current_body = equations[pid].expression.clone();
        let rewritten = inline_calls(&current_body, Some(pid), &to_be_eliminated, &equations, subst);
        equations.get_mut(pid).unwrap().expression = rewritten;
    }
    // Remaining, kept equations must also have their calls to eliminated
    // PIDs substituted.
    let kept_pids: Vec<Pid> = spec
        .equations
        .iter()
        .map(|eq| eq.pid.clone())
        .filter(|pid| !to_be_eliminated.contains(pid))
        .collect();
    for pid in &kept_pids {
        let body = equations[pid].expression.clone();
        let rewritten = inline_calls(&body, Some(pid), &to_be_eliminated, &equations, subst);
        equations.get_mut(pid).unwrap().expression = rewritten;
    }
    spec.initial = inline_calls(&spec.initial, None, &to_be_eliminated, &equations, subst);

    spec.equations = kept_pids
        .into_iter()
        .map(|pid| equations.remove(&pid).unwrap())
        .collect();

    super::eliminate_unused_equations::eliminate_unused_equations(spec);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::substitution::NoopSubstituter;
    use alpha_ir::Id;

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec![])
    }

    fn action(name: &str) -> ProcessExpr {
        ProcessExpr::Action {
            label: Id::new(name),
            args: vec![],
        }
    }

    #[test]
    fn inlines_single_use_equation() {
        let mut spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid("P"),
                    vec![],
                    ProcessExpr::seq(action("a"), ProcessExpr::call(pid("Q"), vec![])),
                ),
                ProcessEquation::new(pid("Q"), vec![], action("b")),
            ],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        eliminate_single_usage_equations(&mut spec, 1, &NoopSubstituter);
        assert_eq!(spec.equations.len(), 1);
        assert_eq!(spec.equations[0].pid, pid("P"));
        assert_eq!(
            spec.equations[0].expression,
            ProcessExpr::seq(action("a"), action("b"))
        );
    }

    #[test]
    fn self_recursive_equation_is_not_inlined() {
        let mut spec = ProcessSpec {
            equations: vec![ProcessEquation::new(
                pid("R"),
                vec![],
                ProcessExpr::seq(action("a"), ProcessExpr::call(pid("R"), vec![])),
            )],
            initial: ProcessExpr::call(pid("R"), vec![]),
            ..Default::default()
        };
        eliminate_single_usage_equations(&mut spec, 1, &NoopSubstituter);
        assert_eq!(spec.equations.len(), 1);
    }
}
