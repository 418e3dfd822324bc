//! `push_comm` (§4.5): drives a `comm(C, _)` restriction into a parallel
//! composition when `C` can be (partially) split across its operands;
//! everything else is wrapped at the outer level.
use std::collections::BTreeSet;

use alpha_ir::{man, ActionName, Assignment, CommRule, CommSet, DataExpr, Man, ManSet, Pid, ProcessExpr};
use alpha_utils::{AlphaResult, Error};

use crate::analysis::alphabet_efficient;

use super::engine::{MemoStatus, PushEngine};

enum CallShape<'a> {
    Args(&'a [DataExpr]),
    Assign(&'a [Assignment]),
}

fn rebuild_call(pid: Pid, shape: &CallShape<'_>) -> ProcessExpr {
    match shape {
        CallShape::Args(args) => ProcessExpr::Call {
            pid,
            args: args.to_vec(),
        },
        CallShape::Assign(assignments) => ProcessExpr::CallAssign {
            pid,
            assignments: assignments.to_vec(),
        },
    }
}

fn push_call(
    engine: &mut PushEngine<'_>,
    c: &CommSet,
    pid: &Pid,
    shape: CallShape<'_>,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    if let Some(status) = engine.comm_status(c, pid) {
        return match status {
            MemoStatus::Finished(fresh, alpha) => Ok((alpha, rebuild_call(fresh, &shape))),
            MemoStatus::Busy(fresh) => {
                engine.mark_cycle();
                Ok((engine.comm_hint(c, pid), rebuild_call(fresh, &shape)))
            }
        };
    }
    let eq = engine
        .original
        .find_equation(pid)
        .ok_or_else(|| Error::undefined_pid(pid.name))?
        .clone();
    let fresh_name = engine.namegen.gen_equation_name(pid.name, "comm");
    let fresh = pid.with_name(fresh_name);
    engine.comm_mark_busy(c.clone(), pid.clone(), fresh.clone());
    let (alpha, body) = push_comm(engine, c, &eq.expression)?;
    engine.emit_equation(alpha_ir::ProcessEquation::new(
        fresh.clone(),
        eq.formal_parameters.clone(),
        body,
    ));
    engine.comm_mark_finished(c.clone(), pid.clone(), fresh.clone(), alpha.clone());
    Ok((alpha, rebuild_call(fresh, &shape)))
}

fn names_of(a: &ManSet) -> BTreeSet<ActionName> {
    a.iter().flat_map(|m| m.iter().cloned()).collect()
}

fn rule_names(rule: &CommRule) -> BTreeSet<ActionName> {
    rule.lhs.iter().cloned().collect()
}

/// Splits `c` into `(c_l, c_r, c_both)` by whether each rule's lhs names
/// are exclusively contributable by the left operand, the right operand,
/// or straddle both (§4.5 push_comm).
fn classify(c: &CommSet, left: &BTreeSet<ActionName>, right: &BTreeSet<ActionName>) -> (CommSet, CommSet, CommSet) {
    let mut c_l = CommSet::new();
    let mut c_r = CommSet::new();
    let mut c_both = CommSet::new();
    for rule in c {
        let names = rule_names(rule);
        let in_left = names.is_subset(left);
        let in_right = names.is_subset(right);
        if in_left && !in_right {
            c_l.push(rule.clone());
        } else if in_right && !in_left {
            c_r.push(rule.clone());
        } else {
            c_both.push(rule.clone());
        }
    }
    (c_l, c_r, c_both)
}

/// `comm(C, _)` is only ever distributed into `merge`, never
/// `left_merge`/`sync` (§4.5 push_comm names `merge` specifically).
fn push_comm_merge(
    engine: &mut PushEngine<'_>,
    c: &CommSet,
    l: &ProcessExpr,
    r: &ProcessExpr,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    let left_names = names_of(&alphabet_efficient(l, engine.alpha_cache));
    let right_names = names_of(&alphabet_efficient(r, engine.alpha_cache));
    let (c_l, c_r, c_both) = classify(c, &left_names, &right_names);

    let (alpha_l, l2) = push_comm(engine, &c_l, l)?;
    let (alpha_r, r2) = push_comm(engine, &c_r, r)?;
    let (alpha_merged, merged) = (man::merge(&alpha_l, &alpha_r), ProcessExpr::merge(l2, r2));
    if c_both.is_empty() {
        Ok((alpha_merged, merged))
    } else {
        let alpha = man::comm(&c_both, &alpha_merged);
        Ok((alpha, ProcessExpr::comm(c_both, merged)))
    }
}

/// `push_comm(C, x, eqns, cache)` (§4.5).
pub fn push_comm(
    engine: &mut PushEngine<'_>,
    c: &CommSet,
    x: &ProcessExpr,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    match x {
        ProcessExpr::Delta => Ok((ManSet::new(), ProcessExpr::Delta)),
        ProcessExpr::Tau => Ok((man::man_set_of([Man::tau()]), ProcessExpr::Tau)),
        ProcessExpr::Call { pid, args } => push_call(engine, c, pid, CallShape::Args(args)),
        ProcessExpr::CallAssign { pid, assignments } => {
            push_call(engine, c, pid, CallShape::Assign(assignments))
        }
        ProcessExpr::Merge(l, r) => push_comm_merge(engine, c, l, r),
        // left_merge/sync are not distributed into (only merge is), nor
        // is anything else (including a bare action, which a
        // singleton-lhs rule could still legally rewrite); wrap as-is.
        _ => {
            let wrapped = ProcessExpr::comm(c.clone(), x.clone());
            let alpha = alphabet_efficient(&wrapped, engine.alpha_cache);
            Ok((alpha, wrapped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ReduceOptions;
    use alpha_ir::{Id, ProcessSpec};

    fn action(name: &str) -> ProcessExpr {
        ProcessExpr::Action {
            label: Id::new(name),
            args: vec![],
        }
    }

    #[test]
    fn distributes_only_into_merge() {
        let spec = ProcessSpec::default();
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let c: CommSet = vec![CommRule::new(
            Man::from_names([Id::new("a"), Id::new("b")]),
            Some(Id::new("c")),
        )];

        let left_merge_expr = ProcessExpr::left_merge(action("a"), action("b"));
        let (_, rewritten) = push_comm(&mut engine, &c, &left_merge_expr).unwrap();
        assert_eq!(rewritten, ProcessExpr::comm(c.clone(), left_merge_expr));

        let sync_expr = ProcessExpr::sync(action("a"), action("b"));
        let (_, rewritten) = push_comm(&mut engine, &c, &sync_expr).unwrap();
        assert_eq!(rewritten, ProcessExpr::comm(c.clone(), sync_expr));

        let merge_expr = ProcessExpr::merge(action("a"), action("b"));
        let (_, rewritten) = push_comm(&mut engine, &c, &merge_expr).unwrap();
        assert!(matches!(rewritten, ProcessExpr::Merge(..)));
    }
}
