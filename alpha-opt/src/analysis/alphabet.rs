//! The alphabet calculator (§4.3): computes, for a process expression and
//! an equation context, an over-approximation of the multi-action names
//! the expression can perform.
use alpha_ir::{man, AllowSet, Man, ManSet, Pid, ProcessExpr, ProcessSpec};
use alpha_utils::{AlphaResult, Error};
use std::collections::BTreeMap;

/// Per-PID alphabet cache, keyed by lexicographically-sorted PID to keep
/// fixpoint iteration order stable (§5 "Ordering").
pub type AlphaCache = BTreeMap<Pid, ManSet>;

/// Evaluates the one-step structural alphabet rule for `expr`, using
/// `cache` for every `call`/`call_assign` node (§4.3 step 4). Calls to a
/// PID not yet present in `cache` are treated as `∅` — this is exactly
/// the "cycle handling" rule: visiting the body of a call still being
/// expanded returns `∅` for that sub-term, and the fixpoint iteration
/// lifts the value on a later pass.
fn eval_body(expr: &ProcessExpr, cache: &AlphaCache) -> ManSet {
    match expr {
        ProcessExpr::Delta => ManSet::new(),
        ProcessExpr::Tau => man::man_set_of([Man::tau()]),
        ProcessExpr::Action { label, .. } => man::man_set_of([Man::singleton(*label)]),
        ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => {
            cache.get(pid).cloned().unwrap_or_default()
        }
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. } => eval_body(body, cache),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            let mut r = eval_body(then_branch, cache);
            r.extend(eval_body(else_branch, cache));
            r
        }
        ProcessExpr::Choice(l, r) | ProcessExpr::Seq(l, r) | ProcessExpr::BoundedInit(l, r) => {
            let mut result = eval_body(l, cache);
            result.extend(eval_body(r, cache));
            result
        }
        ProcessExpr::Merge(l, r) => man::merge(&eval_body(l, cache), &eval_body(r, cache)),
        ProcessExpr::LeftMerge(l, r) => {
            man::left_merge(&eval_body(l, cache), &eval_body(r, cache))
        }
        ProcessExpr::Sync(l, r) => man::sync(&eval_body(l, cache), &eval_body(r, cache)),
        ProcessExpr::Block(h, b) => man::block(h, &eval_body(b, cache), false),
        ProcessExpr::Hide(i, b) => man::hide(i, &eval_body(b, cache)),
        ProcessExpr::Rename(r, b) => man::rename(r, &eval_body(b, cache)),
        ProcessExpr::Comm(c, b) => man::comm(c, &eval_body(b, cache)),
        ProcessExpr::Allow(v, b) => man::allow(v, &eval_body(b, cache), false),
    }
}

/// Runs the fixpoint of §4.3 over every equation in `spec`: initialises
/// `alpha[p] = ∅`, then repeatedly recomputes each body's alphabet from
/// the current cache (in sorted-PID order, for determinism) until no
/// value changes. Terminates because `ManSet` under `⊆` has finite
/// height bounded by the number of distinct action names.
pub fn alphabet_fixpoint(spec: &ProcessSpec) -> AlphaCache {
    let mut cache: AlphaCache = spec
        .equations
        .iter()
        .map(|eq| (eq.pid.clone(), ManSet::new()))
        .collect();
    loop {
        let mut changed = false;
        let pids: Vec<Pid> = cache.keys().cloned().collect();
        for pid in pids {
            let Some(eq) = spec.find_equation(&pid) else {
                continue;
            };
            let new_value = eval_body(&eq.expression, &cache);
            if cache.get(&pid) != Some(&new_value) {
                cache.insert(pid, new_value);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    cache
}

/// Same fixpoint, restricted to the PIDs in `reachable` — the variant
/// used by the driver, which only needs alphabets for pCRL equations
/// reachable from `initial` (§4.6 step 2).
pub fn alphabet_fixpoint_restricted(
    spec: &ProcessSpec,
    reachable: &std::collections::HashSet<Pid>,
) -> AlphaCache {
    let mut cache: AlphaCache = spec
        .equations
        .iter()
        .filter(|eq| reachable.contains(&eq.pid))
        .map(|eq| (eq.pid.clone(), ManSet::new()))
        .collect();
    loop {
        let mut changed = false;
        let pids: Vec<Pid> = cache.keys().cloned().collect();
        for pid in pids {
            let Some(eq) = spec.find_equation(&pid) else {
                continue;
            };
            let new_value = eval_body(&eq.expression, &cache);
            if cache.get(&pid) != Some(&new_value) {
                cache.insert(pid, new_value);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    cache
}

/// `alphabet(x, eqns)`: runs the fixpoint over all of `spec`'s equations
/// and evaluates `expr` against the resulting cache.
pub fn alphabet(expr: &ProcessExpr, spec: &ProcessSpec) -> ManSet {
    let cache = alphabet_fixpoint(spec);
    eval_body(expr, &cache)
}

/// `alphabet_efficient(x, eqns)`: identical result to [`alphabet`], but
/// takes an already-computed per-PID cache so repeated calls over the
/// same equation set don't re-run the fixpoint.
pub fn alphabet_efficient(expr: &ProcessExpr, cache: &AlphaCache) -> ManSet {
    eval_body(expr, cache)
}

/// `alphabet_new(x, eqns)`: the iterative variant that uses a
/// pre-computed per-PID cache restricted to pCRL equations reachable
/// from the initial state. Same evaluator as `alphabet_efficient`; the
/// distinction is entirely in how the caller built `cache`.
pub fn alphabet_new(expr: &ProcessExpr, cache: &AlphaCache) -> ManSet {
    eval_body(expr, cache)
}

/// `alphabet_intersection(x, eqns, A)`: like [`eval_body`], but
/// intersects with `bound` at every node and fails with
/// [`Error::unsupported_node`] if it encounters `block`, `hide`,
/// `rename`, `comm` or `allow` anywhere in `expr` (§4.3 "Failure").
pub fn alphabet_intersection(
    expr: &ProcessExpr,
    cache: &AlphaCache,
    bound: &ManSet,
) -> AlphaResult<ManSet> {
    let raw = eval_body_checked(expr, cache)?;
    Ok(raw.intersection(bound).cloned().collect())
}

fn eval_body_checked(expr: &ProcessExpr, cache: &AlphaCache) -> AlphaResult<ManSet> {
    match expr {
        ProcessExpr::Block(..)
        | ProcessExpr::Hide(..)
        | ProcessExpr::Rename(..)
        | ProcessExpr::Comm(..)
        | ProcessExpr::Allow(..) => Err(Error::unsupported_node(
            "alphabet_intersection does not support restriction operators",
        )),
        ProcessExpr::Delta => Ok(ManSet::new()),
        ProcessExpr::Tau => Ok(man::man_set_of([Man::tau()])),
        ProcessExpr::Action { label, .. } => Ok(man::man_set_of([Man::singleton(*label)])),
        ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => {
            Ok(cache.get(pid).cloned().unwrap_or_default())
        }
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. } => eval_body_checked(body, cache),
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            let mut r = eval_body_checked(then_branch, cache)?;
            r.extend(eval_body_checked(else_branch, cache)?);
            Ok(r)
        }
        ProcessExpr::Choice(l, r) | ProcessExpr::Seq(l, r) | ProcessExpr::BoundedInit(l, r) => {
            let mut result = eval_body_checked(l, cache)?;
            result.extend(eval_body_checked(r, cache)?);
            Ok(result)
        }
        ProcessExpr::Merge(l, r) => Ok(man::merge(
            &eval_body_checked(l, cache)?,
            &eval_body_checked(r, cache)?,
        )),
        ProcessExpr::LeftMerge(l, r) => Ok(man::left_merge(
            &eval_body_checked(l, cache)?,
            &eval_body_checked(r, cache)?,
        )),
        ProcessExpr::Sync(l, r) => Ok(man::sync(
            &eval_body_checked(l, cache)?,
            &eval_body_checked(r, cache)?,
        )),
    }
}

/// `alphabet_bounded(x, A, eqns)`: a top-down variant that restricts
/// exploration to MANs that will survive the outer allow set `A`,
/// applying the length/allowed-filtered `bounded_merge`/`bounded_concat`
/// combinators at every `merge`/`sync`/`left_merge` node instead of the
/// plain ones, so intermediate products discarded by `A` are never
/// materialised (§4.3 "Length-bounded and allowed-filtered variants").
pub fn alphabet_bounded(expr: &ProcessExpr, bound: &AllowSet, cache: &AlphaCache) -> AllowSet {
    let allowed: Option<ManSet> = (!bound.is_empty()).then(|| bound.a().clone());
    let raw = eval_body_bounded(expr, cache, allowed.as_ref());
    AllowSet::from_mans(bound.intersect(&raw))
}

fn eval_body_bounded(expr: &ProcessExpr, cache: &AlphaCache, allowed: Option<&ManSet>) -> ManSet {
    match expr {
        ProcessExpr::Merge(l, r) => {
            let (result, _) = man::bounded_merge(
                &eval_body_bounded(l, cache, allowed),
                &eval_body_bounded(r, cache, allowed),
                None,
                allowed,
            );
            result
        }
        ProcessExpr::LeftMerge(l, r) => {
            let (result, _) = man::bounded_merge(
                &eval_body_bounded(l, cache, allowed),
                &eval_body_bounded(r, cache, allowed),
                None,
                allowed,
            );
            result
        }
        ProcessExpr::Sync(l, r) => {
            let (result, _) = man::bounded_concat(
                &eval_body_bounded(l, cache, allowed),
                &eval_body_bounded(r, cache, allowed),
                None,
                allowed,
            );
            result
        }
        ProcessExpr::Choice(l, r) | ProcessExpr::Seq(l, r) | ProcessExpr::BoundedInit(l, r) => {
            let mut result = eval_body_bounded(l, cache, allowed);
            result.extend(eval_body_bounded(r, cache, allowed));
            result
        }
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => {
            let mut result = eval_body_bounded(then_branch, cache, allowed);
            result.extend(eval_body_bounded(else_branch, cache, allowed));
            result
        }
        ProcessExpr::Sum { body, .. }
        | ProcessExpr::At { body, .. }
        | ProcessExpr::IfThen { body, .. }
        | ProcessExpr::SumQuantified { body, .. }
        | ProcessExpr::Stochastic { body, .. } => eval_body_bounded(body, cache, allowed),
        ProcessExpr::Block(h, b) => man::block(h, &eval_body_bounded(b, cache, allowed), false),
        ProcessExpr::Hide(i, b) => man::hide(i, &eval_body_bounded(b, cache, allowed)),
        ProcessExpr::Rename(r, b) => man::rename(r, &eval_body_bounded(b, cache, allowed)),
        ProcessExpr::Comm(c, b) => man::comm(c, &eval_body_bounded(b, cache, allowed)),
        ProcessExpr::Allow(v, b) => man::allow(v, &eval_body_bounded(b, cache, allowed), false),
        _ => eval_body(expr, cache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::{Id, ProcessEquation};

    fn id(s: &str) -> alpha_ir::Id {
        Id::new(s)
    }

    fn pid(name: &str) -> Pid {
        Pid::new(id(name), vec![])
    }

    #[test]
    fn action_alphabet_is_singleton() {
        let spec = ProcessSpec::default();
        let expr = ProcessExpr::Action {
            label: id("a"),
            args: vec![],
        };
        let a = alphabet(&expr, &spec);
        assert!(a.contains(&Man::singleton(id("a"))));
    }

    #[test]
    fn merge_alphabet_matches_scenario_1() {
        // act a, b; init allow({a, a|b}, a || b) — alphabet of `a || b` is
        // { {a}, {b}, {a,b} }, and intersecting with {a, a|b} yields
        // { {a}, {a,b} } (scenario 1).
        let a_expr = ProcessExpr::Action {
            label: id("a"),
            args: vec![],
        };
        let b_expr = ProcessExpr::Action {
            label: id("b"),
            args: vec![],
        };
        let merged = ProcessExpr::merge(a_expr, b_expr);
        let spec = ProcessSpec::default();
        let alpha = alphabet(&merged, &spec);
        let v = man::man_set_of([
            Man::singleton(id("a")),
            Man::from_names([id("a"), id("b")]),
        ]);
        let restricted = man::allow(&v, &alpha, false);
        assert_eq!(restricted, v);
    }

    #[test]
    fn fixpoint_resolves_recursive_equation() {
        // proc R = a . R; alphabet(R) should include {a}.
        let r_pid = pid("R");
        let body = ProcessExpr::seq(
            ProcessExpr::Action {
                label: id("a"),
                args: vec![],
            },
            ProcessExpr::call(r_pid.clone(), vec![]),
        );
        let spec = ProcessSpec {
            equations: vec![ProcessEquation::new(r_pid.clone(), vec![], body)],
            initial: ProcessExpr::call(r_pid, vec![]),
            ..Default::default()
        };
        let cache = alphabet_fixpoint(&spec);
        let r_alpha = cache.values().next().unwrap();
        assert!(r_alpha.contains(&Man::singleton(id("a"))));
    }

    #[test]
    fn intersection_rejects_restriction_nodes() {
        let cache = AlphaCache::new();
        let expr = ProcessExpr::hide(Default::default(), ProcessExpr::Delta);
        assert!(alphabet_intersection(&expr, &cache, &ManSet::new()).is_err());
    }
}
