//! The driver (§4.6): sequences preprocessing, classification, the push
//! rewriters and the equation-graph simplification passes into a single
//! `alphabet-reduce` entry point.
use alpha_ir::{AllowSet, BlockSet, ProcessExpr, ProcessSpec};
use log::debug;

use crate::analysis::{
    alphabet_fixpoint_restricted, classify_pcrl, find_process_identifiers, is_pcrl, PidGraph,
};
use crate::passes::push::{push_allow, push_block, push_comm, push_hide, PushEngine};
use crate::passes::{
    eliminate_single_usage_equations, eliminate_trivial_equations, eliminate_unused_equations,
    join_bisimilar_equations, NoopSubstituter,
};

/// Tunables controlling the driver's simplify step and the push
/// rewriters' search budgets (§4.5 Open Question "push_comm_through_allow",
/// §4.6 step 4 "tunable threshold").
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ReduceOptions {
    /// Above this many remaining equations, duplicate-equation merging
    /// (§4.4 bisimulation-lite partition refinement) is skipped — it is
    /// the most expensive simplification pass.
    pub duplicate_merge_threshold: usize,
    /// Search budget handed to [`alpha_ir::AllowSet::subsets`] when
    /// `push_allow` descends into a parallel composition's left operand.
    pub subsets_budget: usize,
    /// When `push_allow` meets a `comm(C, _)` node, whether to push the
    /// extended allow set all the way through `C` (`true`, the default)
    /// or to stop at the original `V` and re-wrap (`false`).
    pub push_comm_through_allow: bool,
    /// Lower bound passed to `eliminate_single_usage_equations`: an
    /// equation used at most this many times is inlined.
    pub single_usage_lowerbound: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        ReduceOptions {
            duplicate_merge_threshold: 1000,
            subsets_budget: 1000,
            push_comm_through_allow: true,
            single_usage_lowerbound: 1,
        }
    }
}

/// Step 1 of §4.6: prunes equations unreachable from `initial`. In debug
/// mode (`keep_unreachable`) the equations are kept so
/// `process-info`/`anonimyze` can still inspect them.
fn preprocess(spec: &mut ProcessSpec, keep_unreachable: bool) {
    if !keep_unreachable {
        eliminate_unused_equations(spec);
    }
}

/// Drives the restriction node found at `initial` (§4.6 step 3): a
/// top-level `block`/`allow` dispatches straight to the matching push
/// rewriter; anything else is walked by the generic traversal below,
/// which descends into non-restriction combinators and invokes the
/// matching push rewriter as soon as it meets a restriction node.
fn drive_expr(engine: &mut PushEngine<'_>, expr: &ProcessExpr) -> alpha_utils::AlphaResult<ProcessExpr> {
    match expr {
        ProcessExpr::Block(h, body) => {
            let (_, rewritten) = engine.run_to_convergence(|engine| push_block(engine, h, body))?;
            Ok(rewritten)
        }
        ProcessExpr::Allow(v, body) => {
            let v = AllowSet::from_mans(v.clone());
            let (_, rewritten) = engine.run_to_convergence(|engine| push_allow(engine, &v, body))?;
            Ok(rewritten)
        }
        ProcessExpr::Hide(i, body) => {
            let (_, rewritten) = engine.run_to_convergence(|engine| push_hide(engine, i, body))?;
            Ok(rewritten)
        }
        ProcessExpr::Comm(c, body) => {
            let (_, rewritten) = engine.run_to_convergence(|engine| push_comm(engine, c, body))?;
            Ok(rewritten)
        }
        ProcessExpr::Rename(..) => {
            // `rename` alone carries no alphabet-narrowing information for
            // a push rewriter to exploit; left as-is (§4.5 only defines
            // push_allow/push_block/push_hide/push_comm).
            Ok(expr.clone())
        }
        ProcessExpr::Choice(l, r) => Ok(ProcessExpr::choice(drive_expr(engine, l)?, drive_expr(engine, r)?)),
        ProcessExpr::Seq(l, r) => Ok(ProcessExpr::seq(drive_expr(engine, l)?, drive_expr(engine, r)?)),
        ProcessExpr::BoundedInit(l, r) => Ok(ProcessExpr::BoundedInit(
            Box::new(drive_expr(engine, l)?),
            Box::new(drive_expr(engine, r)?),
        )),
        ProcessExpr::Merge(l, r) => Ok(ProcessExpr::merge(drive_expr(engine, l)?, drive_expr(engine, r)?)),
        ProcessExpr::LeftMerge(l, r) => {
            Ok(ProcessExpr::left_merge(drive_expr(engine, l)?, drive_expr(engine, r)?))
        }
        ProcessExpr::Sync(l, r) => Ok(ProcessExpr::sync(drive_expr(engine, l)?, drive_expr(engine, r)?)),
        ProcessExpr::Sum { vars, body } => Ok(ProcessExpr::Sum {
            vars: vars.clone(),
            body: Box::new(drive_expr(engine, body)?),
        }),
        ProcessExpr::At { body, time } => Ok(ProcessExpr::At {
            body: Box::new(drive_expr(engine, body)?),
            time: time.clone(),
        }),
        ProcessExpr::IfThen { cond, body } => Ok(ProcessExpr::IfThen {
            cond: cond.clone(),
            body: Box::new(drive_expr(engine, body)?),
        }),
        ProcessExpr::IfThenElse {
            cond,
            then_branch,
            else_branch,
        } => Ok(ProcessExpr::IfThenElse {
            cond: cond.clone(),
            then_branch: Box::new(drive_expr(engine, then_branch)?),
            else_branch: Box::new(drive_expr(engine, else_branch)?),
        }),
        ProcessExpr::SumQuantified { vars, body } => Ok(ProcessExpr::SumQuantified {
            vars: vars.clone(),
            body: Box::new(drive_expr(engine, body)?),
        }),
        ProcessExpr::Stochastic { vars, dist, body } => Ok(ProcessExpr::Stochastic {
            vars: vars.clone(),
            dist: dist.clone(),
            body: Box::new(drive_expr(engine, body)?),
        }),
        ProcessExpr::Delta
        | ProcessExpr::Tau
        | ProcessExpr::Action { .. }
        | ProcessExpr::Call { .. }
        | ProcessExpr::CallAssign { .. } => Ok(expr.clone()),
    }
}

/// `alphabet_reduce(eqns, W)` (§4.6): the full five-step driver.
pub fn alphabet_reduce(spec: &ProcessSpec, options: ReduceOptions) -> alpha_utils::AlphaResult<ProcessSpec> {
    let mut working = spec.clone();

    // 1. Preprocess.
    preprocess(&mut working, false);

    // 2. Classify: run the pCRL/mCRL fixpoint, compute alphabets for the
    // pCRL equations reachable from initial.
    let classification = classify_pcrl(&working);
    let graph = PidGraph::build(&working);
    let roots = find_process_identifiers(&working.initial);
    let mut reachable = graph.reachable_from(&roots);
    reachable.extend(roots);
    let pcrl_reachable: std::collections::HashSet<_> = working
        .equations
        .iter()
        .map(|eq| eq.pid.clone())
        .filter(|pid| reachable.contains(pid) && is_pcrl(pid, &classification))
        .collect();
    let alpha_cache = alphabet_fixpoint_restricted(&working, &pcrl_reachable);
    debug!(
        "alphabet_reduce: classified {} pCRL equations reachable from initial",
        pcrl_reachable.len()
    );

    // 3. Reduce: drive the restriction operator(s) found in `initial` as
    // deep as possible, collecting the freshly generated equations.
    let mut engine = PushEngine::new(&working, &alpha_cache, options);
    let new_initial = match &working.initial {
        ProcessExpr::Block(h, body) => {
            let h: BlockSet = h.clone();
            let (_, rewritten) = engine.run_to_convergence(|engine| push_block(engine, &h, body))?;
            rewritten
        }
        ProcessExpr::Allow(v, body) => {
            let v = AllowSet::from_mans(v.clone());
            let (_, rewritten) = engine.run_to_convergence(|engine| push_allow(engine, &v, body))?;
            rewritten
        }
        other => drive_expr(&mut engine, other)?,
    };
    working.initial = new_initial;
    working.equations.extend(engine.new_equations);
    debug!(
        "alphabet_reduce: push rewriters emitted {} new equations",
        working.equations.len()
    );

    // 4. Simplify.
    eliminate_trivial_equations(&mut working, &NoopSubstituter);
    eliminate_single_usage_equations(&mut working, options.single_usage_lowerbound, &NoopSubstituter);
    eliminate_unused_equations(&mut working);
    if working.equations.len() < options.duplicate_merge_threshold {
        join_bisimilar_equations(&mut working);
    }

    // 5. Emit.
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{Id, Man, Pid, ProcessEquation};

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
    fn scenario_1_allow_simplifies_parallel_composition() {
        // act a, b; init allow({a, a|b}, a || b);
        let v = alpha_ir::man::man_set_of([
            Man::singleton(Id::new("a")),
            Man::from_names([Id::new("a"), Id::new("b")]),
        ]);
        let spec = ProcessSpec {
            initial: ProcessExpr::allow(v.clone(), ProcessExpr::merge(action("a"), action("b"))),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        let alpha = crate::analysis::alphabet(&result.initial, &result);
        assert_eq!(alpha, v);
    }

    #[test]
    fn scenario_2_push_block_into_parallel_composition() {
        // act a, b, c; init block({c}, a || (b || c));
        let h: BlockSet = [Id::new("c")].into_iter().collect();
        let spec = ProcessSpec {
            initial: ProcessExpr::block(
                h,
                ProcessExpr::merge(action("a"), ProcessExpr::merge(action("b"), action("c"))),
            ),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        assert!(!matches!(result.initial, ProcessExpr::Delta));
        let alpha = crate::analysis::alphabet(&result.initial, &result);
        let expected = alpha_ir::man::man_set_of([
            Man::singleton(Id::new("a")),
            Man::singleton(Id::new("b")),
            Man::from_names([Id::new("a"), Id::new("b")]),
        ]);
        assert_eq!(alpha, expected);
    }

    #[test]
    fn scenario_5_trivial_equation_chain_is_collapsed() {
        // proc P=Q; proc Q=R; proc R=a.R; init P;
        let spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(pid("P"), vec![], ProcessExpr::call(pid("Q"), vec![])),
                ProcessEquation::new(pid("Q"), vec![], ProcessExpr::call(pid("R"), vec![])),
                ProcessEquation::new(
                    pid("R"),
                    vec![],
                    ProcessExpr::seq(action("a"), ProcessExpr::call(pid("R"), vec![])),
                ),
            ],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        assert_eq!(result.equations.len(), 1);
        assert_eq!(result.equations[0].pid, pid("R"));
        assert_eq!(result.initial, ProcessExpr::call(pid("R"), vec![]));
    }

    #[test]
    fn scenario_6_duplicate_equations_are_merged() {
        let bool_param = || {
            vec![alpha_ir::VarDecl {
                name: Id::new("b"),
                sort: "Bool".to_string(),
            }]
        };
        let pid_b = |name: &str| Pid::new(Id::new(name), vec!["Bool".to_string()]);
        let action_then = |name: &str, then: ProcessExpr| ProcessExpr::seq(action(name), then);
        let spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid_b("S"),
                    bool_param(),
                    action_then("r1", ProcessExpr::call(pid_b("T"), vec![])),
                ),
                ProcessEquation::new(
                    pid_b("T"),
                    bool_param(),
                    action_then("s2", ProcessExpr::call(pid_b("S"), vec![])),
                ),
                ProcessEquation::new(
                    pid_b("S2"),
                    bool_param(),
                    action_then("r1", ProcessExpr::call(pid_b("T1"), vec![])),
                ),
                ProcessEquation::new(
                    pid_b("T1"),
                    bool_param(),
                    action_then("s2", ProcessExpr::call(pid_b("S2"), vec![])),
                ),
            ],
            initial: ProcessExpr::call(pid_b("S"), vec![]),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        let pids: Vec<_> = result.equations.iter().map(|eq| eq.pid.clone()).collect();
        assert!(!pids.contains(&pid_b("S2")));
        assert!(!pids.contains(&pid_b("T1")));
    }

    #[test]
    fn nested_allow_composes_allow_sets() {
        // act a, b; init allow({a,b}, allow({a}, a));
        let outer = alpha_ir::man::man_set_of([Man::singleton(Id::new("a")), Man::singleton(Id::new("b"))]);
        let inner = alpha_ir::man::man_set_of([Man::singleton(Id::new("a"))]);
        let spec = ProcessSpec {
            initial: ProcessExpr::allow(outer, ProcessExpr::allow(inner.clone(), action("a"))),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        let alpha = crate::analysis::alphabet(&result.initial, &result);
        assert_eq!(alpha, inner);
    }

    #[test]
    fn mutually_recursive_pids_converge_under_allow() {
        // proc P = a . Q; proc Q = b . P; init allow({a}, P);
        let v = alpha_ir::man::man_set_of([Man::singleton(Id::new("a"))]);
        let spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid("P"),
                    vec![],
                    ProcessExpr::seq(action("a"), ProcessExpr::call(pid("Q"), vec![])),
                ),
                ProcessEquation::new(
                    pid("Q"),
                    vec![],
                    ProcessExpr::seq(action("b"), ProcessExpr::call(pid("P"), vec![])),
                ),
            ],
            initial: ProcessExpr::allow(v.clone(), ProcessExpr::call(pid("P"), vec![])),
            ..Default::default()
        };
        let result = alphabet_reduce(&spec, ReduceOptions::default()).unwrap();
        let alpha = crate::analysis::alphabet(&result.initial, &result);
        assert_eq!(alpha, v);
    }
}
