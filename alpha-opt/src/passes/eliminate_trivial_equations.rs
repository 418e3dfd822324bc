//! Trivial-equation elimination (§4.4): an equation is trivial iff its
//! body is exactly `call(_, _)` or `call_assign(_, _)`. Collapses chains
//! `P -> Q -> R -> ...` and substitutes the final target everywhere `P`
//! is called, composing each hop's actual-parameter substitution
//! right-to-left via the same `DataSubstituter` seam
//! `eliminate_single_usage_equations` uses.
use alpha_ir::{Assignment, DataExpr, Pid, ProcessEquation, ProcessExpr, ProcessSpec, VarDecl};
use std::collections::{HashMap, HashSet};

use super::substitution::DataSubstituter;

/// A trivial equation's own formal parameters and body — enough to
/// compose the actual-parameter substitution right-to-left along a
/// chain of trivial equations.
#[derive(Clone)]
struct TrivialEdge {
    formal_parameters: Vec<VarDecl>,
    body: ProcessExpr,
}

fn trivial_target(expr: &ProcessExpr) -> Option<Pid> {
    match expr {
        ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => Some(pid.clone()),
        _ => None,
    }
}

/// The actual parameters passed at one hop of a trivial-equation chain,
/// in either call shape. `CallAssign` actuals are reduced to their
/// positional value list for the purpose of substitution, the same
/// simplification `eliminate_single_usage_equations::inline_calls` makes.
enum CallShape {
    Args(Vec<DataExpr>),
    Assign(Vec<Assignment>),
}

impl CallShape {
    fn as_actuals(&self) -> Vec<DataExpr> {
        match self {
            CallShape::Args(args) => args.clone(),
            CallShape::Assign(assignments) => assignments.iter().map(|a| a.value.clone()).collect(),
        }
    }

    fn rebuild(self, pid: Pid) -> ProcessExpr {
        match self {
            CallShape::Args(args) => ProcessExpr::Call { pid, args },
            CallShape::Assign(assignments) => ProcessExpr::CallAssign { pid, assignments },
        }
    }
}

fn call_shape(expr: &ProcessExpr) -> Option<CallShape> {
    match expr {
        ProcessExpr::Call { args, .. } => Some(CallShape::Args(args.clone())),
        ProcessExpr::CallAssign { assignments, .. } => Some(CallShape::Assign(assignments.clone())),
        _ => None,
    }
}

/// Chases `P -> Q -> R -> ...` by target PID alone (no substitution),
/// used only to find a chain's endpoint and detect self-cycles for the
/// final `retain` pass. Returns `None` if the chain cycles back on
/// itself (`P = Q = ... = P`); per §4.4 and the boundary behaviour in
/// §8, a self-cycle is left unrewritten rather than rejected outright.
fn final_target(start: &Pid, edges: &HashMap<Pid, TrivialEdge>) -> Option<Pid> {
    let mut current = start.clone();
    let mut seen = HashSet::new();
    seen.insert(current.clone());
    loop {
        match edges.get(&current).and_then(|edge| trivial_target(&edge.body)) {
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return None;
                }
                current = next;
            }
            None => return Some(current),
        }
    }
}

/// Follows the same chain as [`final_target`], but at each hop composes
/// the actual-parameter substitution right-to-left via `subst`: `P`'s
/// own body (`call(Q, args)`) has `P`'s formals replaced by the actuals
/// supplied at the call site being rewritten, then the process repeats
/// for `Q`. Returns `None` on a cycle, mirroring `final_target`.
fn resolve_chain(
    start: &Pid,
    start_shape: CallShape,
    edges: &HashMap<Pid, TrivialEdge>,
    subst: &dyn DataSubstituter,
) -> Option<ProcessExpr> {
    let mut current = start.clone();
    let mut shape = start_shape;
    let mut seen = HashSet::new();
    seen.insert(current.clone());
    loop {
        match edges.get(&current) {
            Some(edge) => {
                let substituted =
                    subst.substitute_body(&edge.body, &edge.formal_parameters, &shape.as_actuals());
                let next = trivial_target(&substituted)?;
                if !seen.insert(next.clone()) {
                    return None;
                }
                shape = call_shape(&substituted)?;
                current = next;
            }
            None => return Some(shape.rebuild(current)),
        }
    }
}

fn substitute_calls(expr: &mut ProcessExpr, edges: &HashMap<Pid, TrivialEdge>, subst: &dyn DataSubstituter) {
    match expr {
        ProcessExpr::Call { pid, args } if edges.contains_key(pid) => {
            if let Some(rewritten) = resolve_chain(pid, CallShape::Args(args.clone()), edges, subst) {
                *expr = rewritten;
            }
        }
        ProcessExpr::CallAssign { pid, assignments } if edges.contains_key(pid) => {
            if let Some(rewritten) = resolve_chain(pid, CallShape::Assign(assignments.clone()), edges, subst) {
                *expr = rewritten;
            }
        }
        ProcessExpr::Call { .. } | ProcessExpr::CallAssign { .. } => {}
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
        | ProcessExpr::Allow(_, body) => substitute_calls(body, edges, subst),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            substitute_calls(then_branch, edges, subst);
            substitute_calls(else_branch, edges, subst);
        }
        ProcessExpr::Choice(l, r)
        | ProcessExpr::Seq(l, r)
        | ProcessExpr::BoundedInit(l, r)
        | ProcessExpr::Merge(l, r)
        | ProcessExpr::LeftMerge(l, r)
        | ProcessExpr::Sync(l, r) => {
            substitute_calls(l, edges, subst);
            substitute_calls(r, edges, subst);
        }
    }
}

/// Runs trivial-equation elimination over `spec` in place: every chain of
/// trivial equations is collapsed to its non-trivial (or cyclic) end, all
/// calls to an eliminated PID are redirected to the chain's end with
/// their actual parameters rewritten through `subst`, and the eliminated
/// equations are dropped.
pub fn eliminate_trivial_equations(spec: &mut ProcessSpec, subst: &dyn DataSubstituter) {
    let mut edges: HashMap<Pid, TrivialEdge> = HashMap::new();
    for eq in &spec.equations {
        if trivial_target(&eq.expression).is_some() {
            edges.insert(
                eq.pid.clone(),
                TrivialEdge {
                    formal_parameters: eq.formal_parameters.clone(),
                    body: eq.expression.clone(),
                },
            );
        }
    }

    let eliminated: HashSet<Pid> = edges
        .keys()
        .filter_map(|pid| final_target(pid, &edges).map(|end| (pid.clone(), end)))
        .filter(|(pid, end)| pid != end)
        .map(|(pid, _)| pid)
        .collect();
    let edges: HashMap<Pid, TrivialEdge> = edges
        .into_iter()
        .filter(|(pid, _)| eliminated.contains(pid))
        .collect();

    for eq in &mut spec.equations {
        substitute_calls(&mut eq.expression, &edges, subst);
    }
    substitute_calls(&mut spec.initial, &edges, subst);

    spec.equations.retain(|eq| !eliminated.contains(&eq.pid));
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
    fn scenario_5_collapses_chain() {
        // proc P = Q; proc Q = R; proc R = a . R; init P;
        let mut spec = ProcessSpec {
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
        eliminate_trivial_equations(&mut spec, &NoopSubstituter);
        assert_eq!(spec.equations.len(), 1);
        assert_eq!(spec.equations[0].pid, pid("R"));
        assert_eq!(spec.initial, ProcessExpr::call(pid("R"), vec![]));
    }

    #[test]
    fn self_recursive_trivial_equation_is_left_unrewritten() {
        let mut spec = ProcessSpec {
            equations: vec![ProcessEquation::new(
                pid("P"),
                vec![],
                ProcessExpr::call(pid("P"), vec![]),
            )],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        eliminate_trivial_equations(&mut spec, &NoopSubstituter);
        assert_eq!(spec.equations.len(), 1);
        assert_eq!(spec.equations[0].pid, pid("P"));
    }

    /// A substituter that treats a data term equal to a formal's own
    /// name as a bare variable reference to that formal, so chains with
    /// genuine parameters can be exercised without a full data-term
    /// parser/engine (data terms are opaque strings at this layer).
    struct RecordingSubstituter;

    fn rewrite_var(expr: &DataExpr, formals: &[VarDecl], actuals: &[DataExpr]) -> DataExpr {
        match formals.iter().position(|f| f.name.as_str() == expr.as_str()) {
            Some(i) => actuals[i].clone(),
            None => expr.clone(),
        }
    }

    impl DataSubstituter for RecordingSubstituter {
        fn substitute_body(&self, body: &ProcessExpr, formals: &[VarDecl], actuals: &[DataExpr]) -> ProcessExpr {
            match body {
                ProcessExpr::Call { pid, args } => ProcessExpr::Call {
                    pid: pid.clone(),
                    args: args.iter().map(|a| rewrite_var(a, formals, actuals)).collect(),
                },
                ProcessExpr::CallAssign { pid, assignments } => ProcessExpr::CallAssign {
                    pid: pid.clone(),
                    assignments: assignments
                        .iter()
                        .map(|a| Assignment {
                            name: a.name,
                            value: rewrite_var(&a.value, formals, actuals),
                        })
                        .collect(),
                },
                other => other.clone(),
            }
        }
    }

    #[test]
    fn parameterized_chain_composes_actual_parameter_substitution() {
        // proc P(x) = call(Q, [x]);
        // proc Q(y) = call(R, [y]);
        // init call(P, [call g(y)]);  -- g(y) stands in for an opaque data term
        let x = VarDecl {
            name: Id::new("x"),
            sort: "Nat".to_string(),
        };
        let y = VarDecl {
            name: Id::new("y"),
            sort: "Nat".to_string(),
        };
        let mut spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(
                    pid("P"),
                    vec![x.clone()],
                    ProcessExpr::call(pid("Q"), vec!["x".to_string()]),
                ),
                ProcessEquation::new(
                    pid("Q"),
                    vec![y.clone()],
                    ProcessExpr::call(pid("R"), vec!["y".to_string()]),
                ),
                ProcessEquation::new(
                    pid("R"),
                    vec![y.clone()],
                    ProcessExpr::seq(action("a"), ProcessExpr::call(pid("R"), vec![])),
                ),
            ],
            initial: ProcessExpr::call(pid("P"), vec!["g_of_z".to_string()]),
            ..Default::default()
        };

        eliminate_trivial_equations(&mut spec, &RecordingSubstituter);

        // P and Q are gone; `init` now calls R directly with the original
        // actual `g_of_z` carried all the way through, not the formal `x`
        // or `y` left dangling.
        let pids: Vec<_> = spec.equations.iter().map(|eq| eq.pid.clone()).collect();
        assert!(!pids.contains(&pid("P")));
        assert!(!pids.contains(&pid("Q")));
        assert_eq!(
            spec.initial,
            ProcessExpr::call(pid("R"), vec!["g_of_z".to_string()])
        );
    }
}
