//! `push_block` (§4.5): drives a `block(H, _)` restriction toward the
//! leaves of a process expression.
use alpha_ir::{man, AllowSet, Assignment, BlockSet, DataExpr, Man, ManSet, Pid, ProcessExpr};
use alpha_utils::{AlphaResult, Error};

use super::allow::push_allow;
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
    h: &BlockSet,
    pid: &Pid,
    shape: CallShape<'_>,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    if let Some(status) = engine.block_status(h, pid) {
        return match status {
            MemoStatus::Finished(fresh, alpha) => Ok((alpha, rebuild_call(fresh, &shape))),
            MemoStatus::Busy(fresh) => {
                engine.mark_cycle();
                Ok((engine.block_hint(h, pid), rebuild_call(fresh, &shape)))
            }
        };
    }
    let eq = engine
        .original
        .find_equation(pid)
        .ok_or_else(|| Error::undefined_pid(pid.name))?
        .clone();
    let fresh_name = engine.namegen.gen_equation_name(pid.name, "block");
    let fresh = pid.with_name(fresh_name);
    engine.block_mark_busy(h.clone(), pid.clone(), fresh.clone());
    let (alpha, body) = push_block(engine, h, &eq.expression)?;
    engine.emit_equation(alpha_ir::ProcessEquation::new(
        fresh.clone(),
        eq.formal_parameters.clone(),
        body,
    ));
    engine.block_mark_finished(h.clone(), pid.clone(), fresh.clone(), alpha.clone());
    Ok((alpha, rebuild_call(fresh, &shape)))
}

/// `partition_block_set(H, C)` (§4.5 push_block/comm): splits `H` into
/// the names mentioned by some rule of `C` (`H_a`) and the rest (`H_c`).
fn partition_block_set(h: &BlockSet, c: &alpha_ir::CommSet) -> (BlockSet, BlockSet) {
    let mentioned: std::collections::BTreeSet<_> = c
        .iter()
        .flat_map(|rule| rule.lhs.iter().cloned().chain(rule.rhs))
        .collect();
    let h_a: BlockSet = h.intersection(&mentioned).cloned().collect();
    let h_c: BlockSet = h.difference(&mentioned).cloned().collect();
    (h_a, h_c)
}

/// `push_block(H, x, eqns, cache)` (§4.5).
pub fn push_block(
    engine: &mut PushEngine<'_>,
    h: &BlockSet,
    x: &ProcessExpr,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    match x {
        ProcessExpr::Delta => Ok((ManSet::new(), ProcessExpr::Delta)),
        ProcessExpr::Tau => Ok((man::man_set_of([Man::tau()]), ProcessExpr::Tau)),
        ProcessExpr::Action { label, args } => {
            if h.contains(label) {
                Ok((ManSet::new(), ProcessExpr::Delta))
            } else {
                Ok((
                    man::man_set_of([Man::singleton(*label)]),
                    ProcessExpr::Action {
                        label: *label,
                        args: args.clone(),
                    },
                ))
            }
        }
        ProcessExpr::Call { pid, args } => push_call(engine, h, pid, CallShape::Args(args)),
        ProcessExpr::CallAssign { pid, assignments } => {
            push_call(engine, h, pid, CallShape::Assign(assignments))
        }
        ProcessExpr::Block(h_prime, b) => {
            let union: BlockSet = h.union(h_prime).cloned().collect();
            push_block(engine, &union, b)
        }
        ProcessExpr::Hide(i, b) => {
            let diff: BlockSet = h.difference(i).cloned().collect();
            let (alpha_b, b2) = push_block(engine, &diff, b)?;
            let alpha = man::hide(i, &alpha_b);
            Ok((alpha, ProcessExpr::hide(i.clone(), b2)))
        }
        ProcessExpr::Rename(r, b) => {
            let h_inv = man::rename_inverse_names(r, h);
            let (alpha_b, b2) = push_block(engine, &h_inv, b)?;
            let alpha = man::rename(r, &alpha_b);
            Ok((alpha, ProcessExpr::rename(r.clone(), b2)))
        }
        ProcessExpr::Comm(c, b) => {
            let (h_a, h_c) = partition_block_set(h, c);
            let (alpha_b, b2) = push_block(engine, &h_c, b)?;
            let alpha_comm = man::comm(c, &alpha_b);
            let alpha = man::block(&h_a, &alpha_comm, false);
            let expr = ProcessExpr::block(h_a, ProcessExpr::comm(c.clone(), b2));
            Ok((alpha, expr))
        }
        ProcessExpr::Allow(v, b) => {
            let v2 = AllowSet::from_mans(v.clone()).block(h);
            push_allow(engine, &v2, b)
        }
        ProcessExpr::Merge(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            Ok((man::merge(&alpha_l, &alpha_r), ProcessExpr::merge(l2, r2)))
        }
        ProcessExpr::LeftMerge(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            Ok((
                man::left_merge(&alpha_l, &alpha_r),
                ProcessExpr::left_merge(l2, r2),
            ))
        }
        ProcessExpr::Sync(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            Ok((man::sync(&alpha_l, &alpha_r), ProcessExpr::sync(l2, r2)))
        }
        ProcessExpr::Sum { vars, body } => {
            let (alpha, body2) = push_block(engine, h, body)?;
            Ok((
                alpha,
                ProcessExpr::Sum {
                    vars: vars.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::At { body, time } => {
            let (alpha, body2) = push_block(engine, h, body)?;
            Ok((
                alpha,
                ProcessExpr::At {
                    body: Box::new(body2),
                    time: time.clone(),
                },
            ))
        }
        ProcessExpr::IfThen { cond, body } => {
            let (alpha, body2) = push_block(engine, h, body)?;
            Ok((
                alpha,
                ProcessExpr::IfThen {
                    cond: cond.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::SumQuantified { vars, body } => {
            let (alpha, body2) = push_block(engine, h, body)?;
            Ok((
                alpha,
                ProcessExpr::SumQuantified {
                    vars: vars.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::Stochastic { vars, dist, body } => {
            let (alpha, body2) = push_block(engine, h, body)?;
            Ok((
                alpha,
                ProcessExpr::Stochastic {
                    vars: vars.clone(),
                    dist: dist.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => {
            let (alpha_t, then2) = push_block(engine, h, then_branch)?;
            let (alpha_e, else2) = push_block(engine, h, else_branch)?;
            let mut alpha = alpha_t;
            alpha.extend(alpha_e);
            Ok((
                alpha,
                ProcessExpr::IfThenElse {
                    cond: cond.clone(),
                    then_branch: Box::new(then2),
                    else_branch: Box::new(else2),
                },
            ))
        }
        ProcessExpr::Choice(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::choice(l2, r2)))
        }
        ProcessExpr::Seq(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::seq(l2, r2)))
        }
        ProcessExpr::BoundedInit(l, r) => {
            let (alpha_l, l2) = push_block(engine, h, l)?;
            let (alpha_r, r2) = push_block(engine, h, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::BoundedInit(Box::new(l2), Box::new(r2))))
        }
    }
}
