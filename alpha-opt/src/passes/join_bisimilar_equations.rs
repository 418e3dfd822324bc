//! Duplicate-equation merging (§4.4, bisimulation-lite partition
//! refinement): equations are first grouped by formal-parameter shape,
//! then iteratively refined by comparing bodies with callees abstracted
//! to their current class, until the partition is stable. Within each
//! final class the lowest-indexed equation survives; every other member
//! is replaced by it everywhere.
use alpha_ir::{Id, Pid, ProcessExpr, ProcessSpec, SortToken};
use std::collections::HashMap;

fn parameter_shape(formals: &[alpha_ir::VarDecl]) -> Vec<SortToken> {
    formals.iter().map(|v| v.sort.clone()).collect()
}

/// A placeholder PID standing in for "whichever equation ends up in
/// class `idx`", used only to compare bodies up to the current
/// partition; never appears in the final output.
fn class_marker(idx: usize) -> Pid {
    Pid::new(Id::new(format!("#class{idx}")), vec![])
}

fn abstract_calls(expr: &ProcessExpr, class_of: &HashMap<Pid, usize>) -> ProcessExpr {
    let rewrite = |child: &ProcessExpr| abstract_calls(child, class_of);
    match expr {
        ProcessExpr::Call { pid, args } => ProcessExpr::Call {
            pid: class_of.get(pid).map(|idx| class_marker(*idx)).unwrap_or_else(|| pid.clone()),
            args: args.clone(),
        },
        ProcessExpr::CallAssign { pid, assignments } => ProcessExpr::CallAssign {
            pid: class_of.get(pid).map(|idx| class_marker(*idx)).unwrap_or_else(|| pid.clone()),
            assignments: assignments.clone(),
        },
        ProcessExpr::Delta | ProcessExpr::Tau | ProcessExpr::Action { .. } => expr.clone(),
        ProcessExpr::Sum { vars, body } => ProcessExpr::Sum {
            vars: vars.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::At { body, time } => ProcessExpr::At {
            body: Box::new(rewrite(body)),
            time: time.clone(),
        },
        ProcessExpr::IfThen { cond, body } => ProcessExpr::IfThen {
            cond: cond.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => ProcessExpr::IfThenElse {
            cond: cond.clone(),
            then_branch: Box::new(rewrite(then_branch)),
            else_branch: Box::new(rewrite(else_branch)),
        },
        ProcessExpr::SumQuantified { vars, body } => ProcessExpr::SumQuantified {
            vars: vars.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::Choice(l, r) => ProcessExpr::Choice(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Seq(l, r) => ProcessExpr::Seq(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::BoundedInit(l, r) => ProcessExpr::BoundedInit(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Stochastic { vars, dist, body } => ProcessExpr::Stochastic {
            vars: vars.clone(),
            dist: dist.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::Merge(l, r) => ProcessExpr::Merge(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::LeftMerge(l, r) => ProcessExpr::LeftMerge(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Sync(l, r) => ProcessExpr::Sync(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Block(h, body) => ProcessExpr::Block(h.clone(), Box::new(rewrite(body))),
        ProcessExpr::Hide(i, body) => ProcessExpr::Hide(i.clone(), Box::new(rewrite(body))),
        ProcessExpr::Rename(r, body) => ProcessExpr::Rename(r.clone(), Box::new(rewrite(body))),
        ProcessExpr::Comm(c, body) => ProcessExpr::Comm(c.clone(), Box::new(rewrite(body))),
        ProcessExpr::Allow(v, body) => ProcessExpr::Allow(v.clone(), Box::new(rewrite(body))),
    }
}

fn substitute_calls(expr: &mut ProcessExpr, subst: &HashMap<Pid, Pid>) {
    match expr {
        ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => {
            if let Some(new_pid) = subst.get(pid) {
                *pid = new_pid.clone();
            }
        }
        ProcessExpr::Delta | ProcessExpr::Tau | ProcessExpr::Action { .. } => {}
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. }
        | ProcessExpr::Block(_, body)
        | ProcessExpr::Hide(_, body)
        | ProcessExpr::Rename(_, body)
        | ProcessExpr::Comm(_, body)
        | ProcessExpr::Allow(_, body) => substitute_calls(body, subst),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            substitute_calls(then_branch, subst);
            substitute_calls(else_branch, subst);
        }
        ProcessExpr::Choice(l, r)
        | ProcessExpr::Seq(l, r)
        | ProcessExpr::BoundedInit(l, r)
        | ProcessExpr::Merge(l, r)
        | ProcessExpr::LeftMerge(l, r)
        | ProcessExpr::Sync(l, r) => {
            substitute_calls(l, subst);
            substitute_calls(r, subst);
        }
    }
}

/// Runs duplicate-equation merging over `spec` in place.
pub fn join_bisimilar_equations(spec: &mut ProcessSpec) {
    if spec.equations.is_empty() {
        return;
    }
    // Initial partition: by (length, sort list) of formal parameters,
    // each group kept in original equation order.
    let mut shape_groups: HashMap<Vec<SortToken>, Vec<usize>> = HashMap::new();
    for (i, eq) in spec.equations.iter().enumerate() {
        shape_groups.entry(parameter_shape(&eq.formal_parameters)).or_default().push(i);
    }
    let mut shapes: Vec<_> = shape_groups.keys().cloned().collect();
    shapes.sort();
    let mut partition: Vec<Vec<usize>> = shapes.into_iter().map(|s| shape_groups.remove(&s).unwrap()).collect();

    loop {
        let mut class_of: HashMap<Pid, usize> = HashMap::new();
        for (idx, class) in partition.iter().enumerate() {
            for &i in class {
                class_of.insert(spec.equations[i].pid.clone(), idx);
            }
        }

        let mut changed = false;
        let mut next_partition = Vec::new();
        for class in &partition {
            let mut buckets: Vec<(ProcessExpr, Vec<usize>)> = Vec::new();
            for &i in class {
                let abstracted = abstract_calls(&spec.equations[i].expression, &class_of);
                match buckets.iter_mut().find(|(body, _)| *body == abstracted) {
                    Some((_, members)) => members.push(i),
                    None => buckets.push((abstracted, vec![i])),
                }
            }
            if buckets.len() > 1 {
                changed = true;
            }
            for (_, members) in buckets {
                next_partition.push(members);
            }
        }
        partition = next_partition;
        if !changed {
            break;
        }
    }

    let mut subst: HashMap<Pid, Pid> = HashMap::new();
    for class in &partition {
        if class.len() < 2 {
            continue;
        }
        let representative = class.iter().min().copied().unwrap();
        let representative_pid = spec.equations[representative].pid.clone();
        for &i in class {
            if i != representative {
                subst.insert(spec.equations[i].pid.clone(), representative_pid.clone());
            }
        }
    }
    if subst.is_empty() {
        return;
    }

    for eq in &mut spec.equations {
        substitute_calls(&mut eq.expression, &subst);
    }
    substitute_calls(&mut spec.initial, &subst);
    spec.equations.retain(|eq| !subst.contains_key(&eq.pid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{ProcessEquation, VarDecl};

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec!["Bool".to_string()])
    }

    fn action_expr(name: &str, then: ProcessExpr) -> ProcessExpr {
        ProcessExpr::seq(
            ProcessExpr::Action {
                label: Id::new(name),
                args: vec![],
            },
            then,
        )
    }

    fn bool_param() -> Vec<VarDecl> {
        vec![VarDecl {
            name: Id::new("b"),
            sort: "Bool".to_string(),
        }]
    }

    #[test]
    fn scenario_6_merges_duplicate_equations() {
        // proc S(b) = r1 . T(b); proc T(b) = s2 . S(b);
        // proc S2(b) = r1 . T1(b); proc T1(b) = s2 . S2(b); init S(true);
        let mut spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid("S"),
                    bool_param(),
                    action_expr("r1", ProcessExpr::call(pid("T"), vec![])),
                ),
                ProcessEquation::new(
                    pid("T"),
                    bool_param(),
                    action_expr("s2", ProcessExpr::call(pid("S"), vec![])),
                ),
                ProcessEquation::new(
                    pid("S2"),
                    bool_param(),
                    action_expr("r1", ProcessExpr::call(pid("T1"), vec![])),
                ),
                ProcessEquation::new(
                    pid("T1"),
                    bool_param(),
                    action_expr("s2", ProcessExpr::call(pid("S2"), vec![])),
                ),
            ],
            initial: ProcessExpr::call(pid("S"), vec![]),
            ..Default::default()
        };
        join_bisimilar_equations(&mut spec);
        let pids: Vec<_> = spec.equations.iter().map(|eq| eq.pid.clone()).collect();
        assert!(pids.contains(&pid("S")));
        assert!(pids.contains(&pid("T")));
        assert!(!pids.contains(&pid("S2")));
        assert!(!pids.contains(&pid("T1")));
        assert_eq!(spec.initial, ProcessExpr::call(pid("S"), vec![]));
    }

    #[test]
    fn differing_bodies_are_not_merged() {
        let mut spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(pid("A"), bool_param(), action_expr("a", ProcessExpr::Delta)),
                ProcessEquation::new(pid("B"), bool_param(), action_expr("b", ProcessExpr::Delta)),
            ],
            initial: ProcessExpr::call(pid("A"), vec![]),
            ..Default::default()
        };
        join_bisimilar_equations(&mut spec);
        assert_eq!(spec.equations.len(), 2);
    }
}
