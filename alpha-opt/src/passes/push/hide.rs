//! `push_hide` (§4.5): drives a `hide(I, _)` restriction into the
//! restriction/call nodes that carry alphabets cleanly. Per §4.5, it is
//! deliberately *not* distributed over the sequencing, choice or
//! parallel combinators — doing so would break downstream linearisation
//! — so those node kinds are left as an opaque `hide(I, _)` wrapper.
use alpha_ir::{man, Assignment, DataExpr, HideSet, Man, ManSet, Pid, ProcessExpr};
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
    i: &HideSet,
    pid: &Pid,
    shape: CallShape<'_>,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    if let Some(status) = engine.hide_status(i, pid) {
        return match status {
            MemoStatus::Finished(fresh, alpha) => Ok((alpha, rebuild_call(fresh, &shape))),
            MemoStatus::Busy(fresh) => {
                engine.mark_cycle();
                Ok((engine.hide_hint(i, pid), rebuild_call(fresh, &shape)))
            }
        };
    }
    let eq = engine
        .original
        .find_equation(pid)
        .ok_or_else(|| Error::undefined_pid(pid.name))?
        .clone();
    let fresh_name = engine.namegen.gen_equation_name(pid.name, "hide");
    let fresh = pid.with_name(fresh_name);
    engine.hide_mark_busy(i.clone(), pid.clone(), fresh.clone());
    let (alpha, body) = push_hide(engine, i, &eq.expression)?;
    engine.emit_equation(alpha_ir::ProcessEquation::new(
        fresh.clone(),
        eq.formal_parameters.clone(),
        body,
    ));
    engine.hide_mark_finished(i.clone(), pid.clone(), fresh.clone(), alpha.clone());
    Ok((alpha, rebuild_call(fresh, &shape)))
}

/// `push_hide(I, x, eqns, cache)` (§4.5).
pub fn push_hide(
    engine: &mut PushEngine<'_>,
    i: &HideSet,
    x: &ProcessExpr,
) -> AlphaResult<(ManSet, ProcessExpr)> {
    match x {
        ProcessExpr::Delta => Ok((ManSet::new(), ProcessExpr::Delta)),
        ProcessExpr::Tau => Ok((man::man_set_of([Man::tau()]), ProcessExpr::Tau)),
        ProcessExpr::Action { label, args } => {
            if i.contains(label) {
                Ok((man::man_set_of([Man::tau()]), ProcessExpr::Tau))
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
        ProcessExpr::Call { pid, args } => push_call(engine, i, pid, CallShape::Args(args)),
        ProcessExpr::CallAssign { pid, assignments } => {
            push_call(engine, i, pid, CallShape::Assign(assignments))
        }
        ProcessExpr::Block(h, b) => {
            let (alpha_b, b2) = push_hide(engine, i, b)?;
            let alpha = man::hide(i, &man::block(h, &alpha_b, false));
            Ok((alpha, ProcessExpr::block(h.clone(), b2)))
        }
        ProcessExpr::Rename(r, b) => {
            let (alpha_b, b2) = push_hide(engine, i, b)?;
            let alpha = man::hide(i, &man::rename(r, &alpha_b));
            Ok((alpha, ProcessExpr::rename(r.clone(), b2)))
        }
        ProcessExpr::Comm(c, b) => {
            let (alpha_b, b2) = push_hide(engine, i, b)?;
            let alpha = man::hide(i, &man::comm(c, &alpha_b));
            Ok((alpha, ProcessExpr::comm(c.clone(), b2)))
        }
        ProcessExpr::Allow(v, b) => {
            let (alpha_b, b2) = push_hide(engine, i, b)?;
            let alpha = man::hide(i, &man::allow(v, &alpha_b, false));
            Ok((alpha, ProcessExpr::allow(v.clone(), b2)))
        }
        ProcessExpr::Hide(i_prime, b) => {
            let union: HideSet = i.union(i_prime).cloned().collect();
            push_hide(engine, &union, b)
        }
        // Not distributed over sum / at / choice / seq / if_then /
        // if_then_else / sync / merge / left_merge / bounded_init: wrap
        // the whole node instead of descending into it.
        _ => {
            let wrapped = ProcessExpr::hide(i.clone(), x.clone());
            let alpha = alphabet_efficient(&wrapped, engine.alpha_cache);
            Ok((alpha, wrapped))
        }
    }
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
    fn hidden_action_becomes_tau() {
        let spec = ProcessSpec::default();
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let i: HideSet = [Id::new("a")].into_iter().collect();
        let (alpha, rewritten) = push_hide(&mut engine, &i, &action("a")).unwrap();
        assert_eq!(rewritten, ProcessExpr::Tau);
        assert_eq!(alpha, man::man_set_of([Man::tau()]));
    }

    #[test]
    fn non_hidden_action_is_unchanged() {
        let spec = ProcessSpec::default();
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let i: HideSet = [Id::new("a")].into_iter().collect();
        let (_, rewritten) = push_hide(&mut engine, &i, &action("b")).unwrap();
        assert_eq!(rewritten, action("b"));
    }

    #[test]
    fn hide_is_pushed_through_a_recursive_call() {
        // proc P = a . P; init hide({a}, P);
        let spec = ProcessSpec {
            equations: vec![ProcessEquation::new(
                pid("P"),
                vec![],
                ProcessExpr::seq(action("a"), ProcessExpr::call(pid("P"), vec![])),
            )],
            initial: ProcessExpr::hide([Id::new("a")].into_iter().collect(), ProcessExpr::call(pid("P"), vec![])),
            ..Default::default()
        };
        let cache = crate::analysis::AlphaCache::new();
        let mut engine = PushEngine::new(&spec, &cache, ReduceOptions::default());
        let i: HideSet = [Id::new("a")].into_iter().collect();
        let (alpha, _) = engine
            .run_to_convergence(|engine| push_hide(engine, &i, &ProcessExpr::call(pid("P"), vec![])))
            .unwrap();
        assert_eq!(alpha, man::man_set_of([Man::tau()]));
    }
}
