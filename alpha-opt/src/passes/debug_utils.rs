//! CLI-surface-only utility algorithms (§6): these never run as part of
//! `alphabet-reduce` itself, but are exposed as individually-selectable
//! `--algorithm` choices for inspecting or sanitising a spec before/after
//! reduction.
use std::collections::{BTreeMap, HashMap};

use alpha_ir::{Assignment, Id, Pid, ProcessExpr, ProcessSpec, VarDecl};

use crate::analysis::{classify_pcrl, is_pcrl, PidGraph};

/// A snapshot of structural facts about a `ProcessSpec`, returned by the
/// `process-info` algorithm.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessInfo {
    pub equation_count: usize,
    pub pcrl_count: usize,
    pub mcrl_count: usize,
    pub recursive_count: usize,
    pub reachable_count: usize,
    pub unreachable_pids: Vec<String>,
}

/// `process-info(eqns)` (§6): equation counts, pCRL/mCRL classification
/// tally, recursive-equation count (§4.4 `is_recursive`), and
/// reachability from `initial`.
pub fn process_info(spec: &ProcessSpec) -> ProcessInfo {
    let classification = classify_pcrl(spec);
    let pcrl_count = spec
        .equations
        .iter()
        .filter(|eq| is_pcrl(&eq.pid, &classification))
        .count();

    let graph = PidGraph::build(spec);
    let recursive_count = spec.equations.iter().filter(|eq| graph.is_recursive(&eq.pid)).count();

    let roots = crate::analysis::find_process_identifiers(&spec.initial);
    let mut reachable = graph.reachable_from(&roots);
    reachable.extend(roots);
    let unreachable_pids: Vec<String> = spec
        .equations
        .iter()
        .map(|eq| eq.pid.clone())
        .filter(|pid| !reachable.contains(pid))
        .map(|pid| pid.name.to_string())
        .collect();

    ProcessInfo {
        equation_count: spec.equations.len(),
        pcrl_count,
        mcrl_count: spec.equations.len() - pcrl_count,
        recursive_count,
        reachable_count: reachable.len(),
        unreachable_pids,
    }
}

const PLACEHOLDER: &str = "_";

fn strip_expr(expr: &ProcessExpr) -> ProcessExpr {
    let rewrite = |child: &ProcessExpr| strip_expr(child);
    match expr {
        ProcessExpr::Delta | ProcessExpr::Tau => expr.clone(),
        ProcessExpr::Action { label, args } => ProcessExpr::Action {
            label: *label,
            args: vec![PLACEHOLDER.to_string(); args.len()],
        },
        ProcessExpr::Call { pid, args } => ProcessExpr::Call {
            pid: pid.clone(),
            args: vec![PLACEHOLDER.to_string(); args.len()],
        },
        ProcessExpr::CallAssign { pid, assignments } => ProcessExpr::CallAssign {
            pid: pid.clone(),
            assignments: assignments
                .iter()
                .map(|a| Assignment {
                    name: a.name,
                    value: PLACEHOLDER.to_string(),
                })
                .collect(),
        },
        ProcessExpr::Sum { vars, body } => ProcessExpr::Sum {
            vars: vars.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::At { body, .. } => ProcessExpr::At {
            body: Box::new(rewrite(body)),
            time: PLACEHOLDER.to_string(),
        },
        ProcessExpr::IfThen { body, .. } => ProcessExpr::IfThen {
            cond: PLACEHOLDER.to_string(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::IfThenElse {
            then_branch,
            else_branch,
            ..
        } => ProcessExpr::IfThenElse {
            cond: PLACEHOLDER.to_string(),
            then_branch: Box::new(rewrite(then_branch)),
            else_branch: Box::new(rewrite(else_branch)),
        },
        ProcessExpr::SumQuantified { vars, body } => ProcessExpr::SumQuantified {
            vars: vars.clone(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::Choice(l, r) => ProcessExpr::Choice(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Seq(l, r) => ProcessExpr::Seq(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::BoundedInit(l, r) => {
            ProcessExpr::BoundedInit(Box::new(rewrite(l)), Box::new(rewrite(r)))
        }
        ProcessExpr::Stochastic { vars, body, .. } => ProcessExpr::Stochastic {
            vars: vars.clone(),
            dist: PLACEHOLDER.to_string(),
            body: Box::new(rewrite(body)),
        },
        ProcessExpr::Merge(l, r) => ProcessExpr::Merge(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::LeftMerge(l, r) => {
            ProcessExpr::LeftMerge(Box::new(rewrite(l)), Box::new(rewrite(r)))
        }
        ProcessExpr::Sync(l, r) => ProcessExpr::Sync(Box::new(rewrite(l)), Box::new(rewrite(r))),
        ProcessExpr::Block(h, body) => ProcessExpr::Block(h.clone(), Box::new(rewrite(body))),
        ProcessExpr::Hide(i, body) => ProcessExpr::Hide(i.clone(), Box::new(rewrite(body))),
        ProcessExpr::Rename(r, body) => ProcessExpr::Rename(r.clone(), Box::new(rewrite(body))),
        ProcessExpr::Comm(c, body) => ProcessExpr::Comm(c.clone(), Box::new(rewrite(body))),
        ProcessExpr::Allow(v, body) => ProcessExpr::Allow(v.clone(), Box::new(rewrite(body))),
    }
}

fn strip_vars(vars: &[VarDecl]) -> Vec<VarDecl> {
    vars.iter()
        .map(|v| VarDecl {
            name: v.name,
            sort: v.sort.clone(),
        })
        .collect()
}

/// `remove-data-parameters(eqns)` (§6): replaces every data-expression
/// argument, condition, timestamp and distribution with an opaque
/// placeholder, keeping parameter/variable declarations (names, sorts,
/// arities) intact. Used to shrink a spec down to its pure control-flow
/// skeleton for debugging the alphabet layer in isolation.
pub fn remove_data_parameters(spec: &mut ProcessSpec) {
    for eq in &mut spec.equations {
        eq.formal_parameters = strip_vars(&eq.formal_parameters);
        eq.expression = strip_expr(&eq.expression);
    }
    spec.initial = strip_expr(&spec.initial);
}

struct Anonymizer {
    pids: HashMap<Pid, Pid>,
    names: HashMap<Id, Id>,
    next_pid: usize,
    next_name: usize,
}

impl Anonymizer {
    fn new() -> Self {
        Anonymizer {
            pids: HashMap::new(),
            names: HashMap::new(),
            next_pid: 0,
            next_name: 0,
        }
    }

    fn pid(&mut self, pid: &Pid) -> Pid {
        if let Some(p) = self.pids.get(pid) {
            return p.clone();
        }
        let fresh = pid.with_name(Id::new(format!("P{}", self.next_pid)));
        self.next_pid += 1;
        self.pids.insert(pid.clone(), fresh.clone());
        fresh
    }

    fn name(&mut self, name: Id) -> Id {
        if let Some(n) = self.names.get(&name) {
            return *n;
        }
        let fresh = Id::new(format!("a{}", self.next_name));
        self.next_name += 1;
        self.names.insert(name, fresh);
        fresh
    }

    fn var(&mut self, v: &VarDecl) -> VarDecl {
        VarDecl {
            name: self.name(v.name),
            sort: v.sort.clone(),
        }
    }

    fn expr(&mut self, expr: &ProcessExpr) -> ProcessExpr {
        match expr {
            ProcessExpr::Delta | ProcessExpr::Tau => expr.clone(),
            ProcessExpr::Action { label, args } => ProcessExpr::Action {
                label: self.name(*label),
                args: args.clone(),
            },
            ProcessExpr::Call { pid, args } => ProcessExpr::Call {
                pid: self.pid(pid),
                args: args.clone(),
            },
            ProcessExpr::CallAssign { pid, assignments } => ProcessExpr::CallAssign {
                pid: self.pid(pid),
                assignments: assignments
                    .iter()
                    .map(|a| Assignment {
                        name: self.name(a.name),
                        value: a.value.clone(),
                    })
                    .collect(),
            },
            ProcessExpr::Sum { vars, body } => ProcessExpr::Sum {
                vars: vars.iter().map(|v| self.var(v)).collect(),
                body: Box::new(self.expr(body)),
            },
            ProcessExpr::At { body, time } => ProcessExpr::At {
                body: Box::new(self.expr(body)),
                time: time.clone(),
            },
            ProcessExpr::IfThen { cond, body } => ProcessExpr::IfThen {
                cond: cond.clone(),
                body: Box::new(self.expr(body)),
            },
            ProcessExpr::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => ProcessExpr::IfThenElse {
                cond: cond.clone(),
                then_branch: Box::new(self.expr(then_branch)),
                else_branch: Box::new(self.expr(else_branch)),
            },
            ProcessExpr::SumQuantified { vars, body } => ProcessExpr::SumQuantified {
                vars: vars.iter().map(|v| self.var(v)).collect(),
                body: Box::new(self.expr(body)),
            },
            ProcessExpr::Choice(l, r) => ProcessExpr::Choice(Box::new(self.expr(l)), Box::new(self.expr(r))),
            ProcessExpr::Seq(l, r) => ProcessExpr::Seq(Box::new(self.expr(l)), Box::new(self.expr(r))),
            ProcessExpr::BoundedInit(l, r) => {
                ProcessExpr::BoundedInit(Box::new(self.expr(l)), Box::new(self.expr(r)))
            }
            ProcessExpr::Stochastic { vars, dist, body } => ProcessExpr::Stochastic {
                vars: vars.iter().map(|v| self.var(v)).collect(),
                dist: dist.clone(),
                body: Box::new(self.expr(body)),
            },
            ProcessExpr::Merge(l, r) => ProcessExpr::Merge(Box::new(self.expr(l)), Box::new(self.expr(r))),
            ProcessExpr::LeftMerge(l, r) => {
                ProcessExpr::LeftMerge(Box::new(self.expr(l)), Box::new(self.expr(r)))
            }
            ProcessExpr::Sync(l, r) => ProcessExpr::Sync(Box::new(self.expr(l)), Box::new(self.expr(r))),
            ProcessExpr::Block(h, body) => {
                let h2 = h.iter().map(|n| self.name(*n)).collect();
                ProcessExpr::Block(h2, Box::new(self.expr(body)))
            }
            ProcessExpr::Hide(i, body) => {
                let i2 = i.iter().map(|n| self.name(*n)).collect();
                ProcessExpr::Hide(i2, Box::new(self.expr(body)))
            }
            ProcessExpr::Rename(r, body) => {
                let r2 = alpha_ir::RenameMap::from_pairs(
                    r.rules().iter().map(|(s, t)| (self.name(*s), self.name(*t))),
                );
                ProcessExpr::Rename(r2, Box::new(self.expr(body)))
            }
            ProcessExpr::Comm(c, body) => {
                let c2 = c
                    .iter()
                    .map(|rule| {
                        alpha_ir::CommRule::new(
                            alpha_ir::Man::from_names(rule.lhs.iter().map(|n| self.name(*n))),
                            rule.rhs.map(|n| self.name(n)),
                        )
                    })
                    .collect();
                ProcessExpr::Comm(c2, Box::new(self.expr(body)))
            }
            ProcessExpr::Allow(v, body) => {
                let v2 = v
                    .iter()
                    .map(|m| alpha_ir::Man::from_names(m.iter().map(|n| self.name(*n))))
                    .collect();
                ProcessExpr::Allow(v2, Box::new(self.expr(body)))
            }
        }
    }
}

/// `anonimyze(eqns)` (§6): renames every process identifier and action
/// name to a synthetic `P<n>`/`a<n>` identifier, consistently across all
/// equations and `initial`, preserving every structural relationship
/// (call graph shape, alphabet, signature lengths). Intended for sharing
/// a minimized repro without leaking the original model's naming.
pub fn anonymize(spec: &mut ProcessSpec) {
    let mut anon = Anonymizer::new();
    // Pre-register PIDs in declaration order so the first defined
    // equation becomes `P0`, matching the intuitive reading order.
    let ordered: Vec<Pid> = spec.equations.iter().map(|eq| eq.pid.clone()).collect();
    for pid in &ordered {
        anon.pid(pid);
    }
    for eq in &mut spec.equations {
        eq.pid = anon.pid(&eq.pid);
        eq.formal_parameters = eq.formal_parameters.iter().map(|v| anon.var(v)).collect();
        eq.expression = anon.expr(&eq.expression);
    }
    spec.initial = anon.expr(&spec.initial);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_ir::ProcessEquation;

    fn pid(name: &str) -> Pid {
        Pid::new(Id::new(name), vec![])
    }

    fn action(name: &str) -> ProcessExpr {
        ProcessExpr::Action {
            label: Id::new(name),
            args: vec!["x".to_string()],
        }
    }

    #[test]
    fn process_info_counts_equations_and_reachability() {
        let spec = ProcessSpec {
            equations: vec![
                ProcessEquation::new(pid("P"), vec![], ProcessExpr::call(pid("Q"), vec![])),
                ProcessEquation::new(pid("Q"), vec![], ProcessExpr::Delta),
                ProcessEquation::new(pid("Dead"), vec![], ProcessExpr::Delta),
            ],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        let info = process_info(&spec);
        assert_eq!(info.equation_count, 3);
        assert_eq!(info.reachable_count, 2);
        assert_eq!(info.unreachable_pids, vec!["Dead".to_string()]);
    }

    #[test]
    fn remove_data_parameters_blanks_action_args() {
        let mut spec = ProcessSpec {
            equations: vec![ProcessEquation::new(pid("P"), vec![], action("a"))],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        remove_data_parameters(&mut spec);
        match &spec.equations[0].expression {
            ProcessExpr::Action { args, .. } => assert_eq!(args, &vec![PLACEHOLDER.to_string()]),
            _ => panic!("expected Action"),
        }
    }

    #[test]
    fn anonymize_renames_pids_consistently() {
        let mut spec = ProcessSpec {
            equations: vec![ProcessEquation::new(pid("P"), vec![], ProcessExpr::call(pid("P"), vec![]))],
            initial: ProcessExpr::call(pid("P"), vec![]),
            ..Default::default()
        };
        anonymize(&mut spec);
        assert_eq!(spec.equations[0].pid.name.to_string(), "P0");
        match &spec.equations[0].expression {
            ProcessExpr::Call { pid, .. } => assert_eq!(pid.name.to_string(), "P0"),
            _ => panic!("expected Call"),
        }
        match &spec.initial {
            ProcessExpr::Call { pid, .. } => assert_eq!(pid.name.to_string(), "P0"),
            _ => panic!("expected Call"),
        }
    }
}
