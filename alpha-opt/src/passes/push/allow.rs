//! `push_allow` (§4.5): drives an `allow(V, _)` restriction toward the
//! leaves of a process expression.
use alpha_ir::{man, AllowSet, Assignment, DataExpr, Man, ManSet, Pid, ProcessExpr};
use alpha_utils::{AlphaResult, Error};

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

/// Post-filter of §4.5 step 4: restricts `alpha` to `V`, wrapping `expr`
/// in `allow(_, _)` only when that restriction is non-trivial, and
/// side-stepping the illegal "allow set containing only τ" case by
/// picking one non-τ representative of `V` instead.
fn apply_allow(v: &AllowSet, alpha: ManSet, expr: ProcessExpr) -> AlphaResult<(ManSet, ProcessExpr)> {
    let filtered = v.intersect(&alpha);
    if filtered == alpha {
        return Ok((alpha, expr));
    }
    if filtered.len() == 1 && filtered.contains(&Man::tau()) {
        let pick = v.pick_element()?;
        let wrapped = ProcessExpr::allow(man::man_set_of([pick]), expr);
        return Ok((filtered, wrapped));
    }
    let wrapped = ProcessExpr::allow(filtered.clone(), expr);
    Ok((filtered, wrapped))
}

/// `extend_allow_comm(V, C)` (§4.5 push_allow/comm): enlarges `V` to
/// include every MAN that, after applying `C`, lands in `V`. This is
/// exactly the allow-set `comm_inverse` operator of §4.2.
fn extend_allow_comm(v: &AllowSet, c: &alpha_ir::CommSet) -> AlphaResult<AllowSet> {
    v.comm_inverse(c)
        .map_err(|_| Error::structural("push_allow: communication set is not well-formed"))
}

fn push_call(
    engine: &mut PushEngine<'_>,
    v: &AllowSet,
    pid: &Pid,
    shape: CallShape<'_>,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    if let Some(status) = engine.allow_status(v, pid) {
        return match status {
            MemoStatus::Finished(fresh, alpha) => {
                apply_allow(v, alpha, rebuild_call(fresh, &shape))
            }
            MemoStatus::Busy(fresh) => {
                engine.mark_cycle();
                Ok((engine.allow_hint(v, pid), rebuild_call(fresh, &shape)))
            }
        };
    }
    let eq = engine
        .original
        .find_equation(pid)
        .ok_or_else(|| Error::undefined_pid(pid.name))?
        .clone();
    let fresh_name = engine.namegen.gen_equation_name(pid.name, "allow");
    let fresh = pid.with_name(fresh_name);
    engine.allow_mark_busy(v.clone(), pid.clone(), fresh.clone());
    let (alpha, body) = push_allow(engine, v, &eq.expression)?;
    engine.emit_equation(alpha_ir::ProcessEquation::new(
        fresh.clone(),
        eq.formal_parameters.clone(),
        body,
    ));
    engine.allow_mark_finished(v.clone(), pid.clone(), fresh.clone(), alpha.clone());
    apply_allow(v, alpha, rebuild_call(fresh, &shape))
}

/// `push_allow(V, x, eqns, W)` (§4.5): returns `(alpha, expr)` with
/// `expr` equivalent to `allow(V, x)` and `alpha` its alphabet.
pub fn push_allow(
    engine: &mut PushEngine<'_>,
    v: &AllowSet,
    x: &ProcessExpr,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    match x {
        ProcessExpr::Delta => Ok((ManSet::new(), ProcessExpr::Delta)),
        ProcessExpr::Tau => Ok((man::man_set_of([Man::tau()]), ProcessExpr::Tau)),
        ProcessExpr::Action { label, args } => {
            if v.contains(&Man::singleton(*label)) {
                Ok((
                    man::man_set_of([Man::singleton(*label)]),
                    ProcessExpr::Action {
                        label: *label,
                        args: args.clone(),
                    },
                ))
            } else {
                Ok((ManSet::new(), ProcessExpr::Delta))
            }
        }
        ProcessExpr::Call { pid, args } => push_call(engine, v, pid, CallShape::Args(args)),
        ProcessExpr::CallAssign { pid, assignments } => {
            push_call(engine, v, pid, CallShape::Assign(assignments))
        }
        ProcessExpr::Block(h, b) => {
            let (alpha_b, b2) = push_allow(engine, v, b)?;
            let alpha = man::block(h, &alpha_b, false);
            Ok((alpha, ProcessExpr::block(h.clone(), b2)))
        }
        ProcessExpr::Hide(i, b) => {
            let v2 = v.hide_inverse(i);
            let (alpha_b, b2) = push_allow(engine, &v2, b)?;
            let alpha = man::hide(i, &alpha_b);
            Ok((alpha, ProcessExpr::hide(i.clone(), b2)))
        }
        ProcessExpr::Rename(r, b) => {
            let v2 = v.rename_inverse(r);
            let (alpha_b, b2) = push_allow(engine, &v2, b)?;
            let alpha = man::rename(r, &alpha_b);
            Ok((alpha, ProcessExpr::rename(r.clone(), b2)))
        }
        ProcessExpr::Comm(c, b) => {
            let v2 = extend_allow_comm(v, c)?;
            let (alpha_b, b2) = push_allow(engine, &v2, b)?;
            let alpha_comm = man::comm(c, &alpha_b);
            if engine.options.push_comm_through_allow {
                let inner = ProcessExpr::comm(c.clone(), b2);
                apply_allow(v, alpha_comm, inner)
            } else {
                let inner = ProcessExpr::comm(c.clone(), b2);
                let wrapped = ProcessExpr::allow(v.a().clone(), inner);
                Ok((v.intersect(&alpha_comm), wrapped))
            }
        }
        ProcessExpr::Allow(v_prime, b) => {
            let v2 = v.allow(v_prime);
            push_allow(engine, &v2, b)
        }
        ProcessExpr::Merge(l, r) => push_parallel(engine, v, l, r, ParKind::Merge),
        ProcessExpr::LeftMerge(l, r) => push_parallel(engine, v, l, r, ParKind::LeftMerge),
        ProcessExpr::Sync(l, r) => push_parallel(engine, v, l, r, ParKind::Sync),
        ProcessExpr::Sum { vars, body } => {
            let (alpha, body2) = push_allow(engine, v, body)?;
            Ok((
                alpha,
                ProcessExpr::Sum {
                    vars: vars.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::At { body, time } => {
            let (alpha, body2) = push_allow(engine, v, body)?;
            Ok((
                alpha,
                ProcessExpr::At {
                    body: Box::new(body2),
                    time: time.clone(),
                },
            ))
        }
        ProcessExpr::IfThen { cond, body } => {
            let (alpha, body2) = push_allow(engine, v, body)?;
            Ok((
                alpha,
                ProcessExpr::IfThen {
                    cond: cond.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::SumQuantified { vars, body } => {
            let (alpha, body2) = push_allow(engine, v, body)?;
            Ok((
                alpha,
                ProcessExpr::SumQuantified {
                    vars: vars.clone(),
                    body: Box::new(body2),
                },
            ))
        }
        ProcessExpr::Stochastic { vars, dist, body } => {
            let (alpha, body2) = push_allow(engine, v, body)?;
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
            let (alpha_t, then2) = push_allow(engine, v, then_branch)?;
            let (alpha_e, else2) = push_allow(engine, v, else_branch)?;
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
            let (alpha_l, l2) = push_allow(engine, v, l)?;
            let (alpha_r, r2) = push_allow(engine, v, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::choice(l2, r2)))
        }
        ProcessExpr::Seq(l, r) => {
            let (alpha_l, l2) = push_allow(engine, v, l)?;
            let (alpha_r, r2) = push_allow(engine, v, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::seq(l2, r2)))
        }
        ProcessExpr::BoundedInit(l, r) => {
            let (alpha_l, l2) = push_allow(engine, v, l)?;
            let (alpha_r, r2) = push_allow(engine, v, r)?;
            let mut alpha = alpha_l;
            alpha.extend(alpha_r);
            Ok((alpha, ProcessExpr::BoundedInit(Box::new(l2), Box::new(r2))))
        }
    }
}

enum ParKind {
    Merge,
    LeftMerge,
    Sync,
}

fn push_parallel(
    engine: &mut PushEngine<'_>,
    v: &AllowSet,
    l: &ProcessExpr,
    r: &ProcessExpr,
    kind: ParKind,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    let v_sub = v.subsets(engine.options.subsets_budget);
    let (alpha_l, l2) = push_allow(engine, &v_sub, l)?;
    let v_arrow = v.left_arrow(&alpha_l);
    let (alpha_r, r2) = push_allow(engine, &v_arrow, r)?;
    let (alpha, expr) = match kind {
        ParKind::Merge => (man::merge(&alpha_l, &alpha_r), ProcessExpr::merge(l2, r2)),
        ParKind::LeftMerge => (
            man::left_merge(&alpha_l, &alpha_r),
            ProcessExpr::left_merge(l2, r2),
        ),
        ParKind::Sync => (man::sync(&alpha_l, &alpha_r), ProcessExpr::sync(l2, r2)),
    };
    apply_allow(v, alpha, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ReduceOptions;
    use alpha_ir::{Id, ProcessEquation, ProcessSpec};

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
    fn allowed_action_passes_blocked_action_becomes_delta() {
        let spec = ProcessSpec::default();
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let v = AllowSet::from_mans(man::man_set_of([Man::singleton(Id::new("a"))]));

        let (alpha, rewritten) = push_allow(&mut engine, &v, &action("a")).unwrap();
        assert_eq!(rewritten, action("a"));
        assert_eq!(alpha, man::man_set_of([Man::singleton(Id::new("a"))]));

        let (alpha, rewritten) = push_allow(&mut engine, &v, &action("b")).unwrap();
        assert_eq!(rewritten, ProcessExpr::Delta);
        assert_eq!(alpha, ManSet::new());
    }

    /// Regression test for the `AllowSet::allow` fix: a nested
    /// `allow(V, allow(V', b))` composes `V` and `V'` via
    /// `AllowSet::allow`, which must hide `V`'s own hidden names out of
    /// each candidate from `V'` before matching it against `V`'s `A`.
    #[test]
    fn nested_allow_hides_names_before_composing() {
        let spec = ProcessSpec::default();
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());

        let mut hidden = std::collections::BTreeSet::new();
        hidden.insert(Id::new("b"));
        let outer = AllowSet::new(
            man::man_set_of([Man::from_names([Id::new("a")])]),
            false,
            hidden,
        );
        let inner = man::man_set_of([Man::from_names([Id::new("a"), Id::new("b")])]);
        let nested = ProcessExpr::allow(inner, action("a"));

        let (alpha, rewritten) = push_allow(&mut engine, &outer, &nested).unwrap();
        assert_eq!(rewritten, action("a"));
        assert_eq!(alpha, man::man_set_of([Man::singleton(Id::new("a"))]));
    }

    #[test]
    fn allow_is_pushed_through_a_self_recursive_call() {
        // proc P = a . P; init allow({a}, P);
        let spec = ProcessSpec {
            equations: vec![ProcessEquation::new(
                pid("P"),
                vec![],
                ProcessExpr::seq(action("a"), ProcessExpr::call(pid("P"), vec![])),
            )],
            initial: ProcessExpr::allow(
                man::man_set_of([Man::singleton(Id::new("a"))]),
                ProcessExpr::call(pid("P"), vec![]),
            ),
            ..Default::default()
        };
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let v = AllowSet::from_mans(man::man_set_of([Man::singleton(Id::new("a"))]));
        let (alpha, _) = engine
            .run_to_convergence(|engine| push_allow(engine, &v, &ProcessExpr::call(pid("P"), vec![])))
            .unwrap();
        assert_eq!(alpha, man::man_set_of([Man::singleton(Id::new("a"))]));
    }
}
