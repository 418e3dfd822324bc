//! The data model of §3: process identifiers, process expressions,
//! equations and the top-level process specification.
use crate::man::{ActionName, CommSet, ManSet, RenameMap};
use crate::allow_set::{BlockSet, HideSet};
use alpha_utils::Id;

/// An opaque sort-expression token. The core never interprets these; it
/// only compares and copies them.
pub type SortToken = String;

/// `(name: identifier, signature: ordered list of sort-expression tokens)`.
/// Two PIDs are equal iff both components are equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid {
    pub name: Id,
    pub signature: Vec<SortToken>,
}

impl Pid {
    pub fn new(name: Id, signature: Vec<SortToken>) -> Self {
        Pid { name, signature }
    }

    /// A fresh PID carrying the same signature, for use by the push
    /// rewriters when specialising an equation under a restriction.
    pub fn with_name(&self, name: Id) -> Self {
        Pid::new(name, self.signature.clone())
    }
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An opaque data-expression argument. The core treats these as
/// unstructured payloads carried through unmodified.
pub type DataExpr = String;

/// A formal or actual parameter: a variable name paired with its sort.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDecl {
    pub name: Id,
    pub sort: SortToken,
}

/// A named-assignment used by `call_assign`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub name: Id,
    pub value: DataExpr,
}

/// Variant tree of process expressions (§3). Recursive children are
/// boxed; this is the natural ADT encoding of the original's tagged sum
/// type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessExpr {
    Delta,
    Tau,
    Action {
        label: ActionName,
        args: Vec<DataExpr>,
    },
    Call {
        pid: Pid,
        args: Vec<DataExpr>,
    },
    CallAssign {
        pid: Pid,
        assignments: Vec<Assignment>,
    },
    Sum {
        vars: Vec<VarDecl>,
        body: Box<ProcessExpr>,
    },
    At {
        body: Box<ProcessExpr>,
        time: DataExpr,
    },
    IfThen {
        cond: DataExpr,
        body: Box<ProcessExpr>,
    },
    IfThenElse {
        cond: DataExpr,
        then_branch: Box<ProcessExpr>,
        else_branch: Box<ProcessExpr>,
    },
    SumQuantified {
        vars: Vec<VarDecl>,
        body: Box<ProcessExpr>,
    },
    Choice(Box<ProcessExpr>, Box<ProcessExpr>),
    Seq(Box<ProcessExpr>, Box<ProcessExpr>),
    BoundedInit(Box<ProcessExpr>, Box<ProcessExpr>),
    Stochastic {
        vars: Vec<VarDecl>,
        dist: DataExpr,
        body: Box<ProcessExpr>,
    },
    Merge(Box<ProcessExpr>, Box<ProcessExpr>),
    LeftMerge(Box<ProcessExpr>, Box<ProcessExpr>),
    Sync(Box<ProcessExpr>, Box<ProcessExpr>),
    Block(BlockSet, Box<ProcessExpr>),
    Hide(HideSet, Box<ProcessExpr>),
    Rename(RenameMap, Box<ProcessExpr>),
    Comm(CommSet, Box<ProcessExpr>),
    Allow(ManSet, Box<ProcessExpr>),
}

impl ProcessExpr {
    pub fn choice(l: ProcessExpr, r: ProcessExpr) -> Self {
        ProcessExpr::Choice(Box::new(l), Box::new(r))
    }
    pub fn seq(l: ProcessExpr, r: ProcessExpr) -> Self {
        ProcessExpr::Seq(Box::new(l), Box::new(r))
    }
    pub fn merge(l: ProcessExpr, r: ProcessExpr) -> Self {
        ProcessExpr::Merge(Box::new(l), Box::new(r))
    }
    pub fn left_merge(l: ProcessExpr, r: ProcessExpr) -> Self {
        ProcessExpr::LeftMerge(Box::new(l), Box::new(r))
    }
    pub fn sync(l: ProcessExpr, r: ProcessExpr) -> Self {
        ProcessExpr::Sync(Box::new(l), Box::new(r))
    }
    pub fn block(h: BlockSet, body: ProcessExpr) -> Self {
        ProcessExpr::Block(h, Box::new(body))
    }
    pub fn hide(i: HideSet, body: ProcessExpr) -> Self {
        ProcessExpr::Hide(i, Box::new(body))
    }
    pub fn rename(r: RenameMap, body: ProcessExpr) -> Self {
        ProcessExpr::Rename(r, Box::new(body))
    }
    pub fn comm(c: CommSet, body: ProcessExpr) -> Self {
        ProcessExpr::Comm(c, Box::new(body))
    }
    pub fn allow(v: ManSet, body: ProcessExpr) -> Self {
        ProcessExpr::Allow(v, Box::new(body))
    }
    pub fn call(pid: Pid, args: Vec<DataExpr>) -> Self {
        ProcessExpr::Call { pid, args }
    }

    /// `true` for the handful of constructors the push rewriters treat
    /// as restriction nodes.
    pub fn is_restriction(&self) -> bool {
        matches!(
            self,
            ProcessExpr::Block(..)
                | ProcessExpr::Hide(..)
                | ProcessExpr::Rename(..)
                | ProcessExpr::Comm(..)
                | ProcessExpr::Allow(..)
        )
    }

    /// Collects every PID mentioned by a `call` or `call_assign` node in
    /// this expression (not its descendants' descendants beyond that —
    /// this is a flat, one-level-deep helper; see `analysis::find_calls`
    /// for the full recursive walk used by `find_process_identifiers`).
    pub fn direct_call(&self) -> Option<&Pid> {
        match self {
            ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => Some(pid),
            _ => None,
        }
    }
}

/// `(pid, formal_parameters, expression)`. Formal-parameter list length
/// must equal the PID signature length.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessEquation {
    pub pid: Pid,
    pub formal_parameters: Vec<VarDecl>,
    pub expression: ProcessExpr,
}

impl ProcessEquation {
    pub fn new(pid: Pid, formal_parameters: Vec<VarDecl>, expression: ProcessExpr) -> Self {
        ProcessEquation {
            pid,
            formal_parameters,
            expression,
        }
    }
}

/// Opaque carried-through declarations the core never mutates (§3).
pub type SortDecl = String;
pub type ActionLabelDecl = String;
pub type GlobalDecl = String;

/// `(data_spec, action_labels, globals, equations, initial)`. Only
/// `equations` and `initial` are mutated at the alphabet layer.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessSpec {
    pub data_spec: Vec<SortDecl>,
    pub action_labels: Vec<ActionLabelDecl>,
    pub globals: Vec<GlobalDecl>,
    pub equations: Vec<ProcessEquation>,
    pub initial: ProcessExpr,
}

impl Default for ProcessExpr {
    fn default() -> Self {
        ProcessExpr::Delta
    }
}

impl ProcessSpec {
    pub fn find_equation(&self, pid: &Pid) -> Option<&ProcessEquation> {
        self.equations.iter().find(|eq| &eq.pid == pid)
    }

    pub fn find_equation_mut(&mut self, pid: &Pid) -> Option<&mut ProcessEquation> {
        self.equations.iter_mut().find(|eq| &eq.pid == pid)
    }

    /// All PIDs currently bound by an equation.
    pub fn defined_pids(&self) -> impl Iterator<Item = &Pid> {
        self.equations.iter().map(|eq| &eq.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_round_trip_into_boxed_children() {
        let expr = ProcessExpr::choice(ProcessExpr::Delta, ProcessExpr::Tau);
        match expr {
            ProcessExpr::Choice(l, r) => {
                assert_eq!(*l, ProcessExpr::Delta);
                assert_eq!(*r, ProcessExpr::Tau);
            }
            _ => panic!("expected Choice"),
        }
    }

    #[test]
    fn find_equation_by_pid() {
        let pid = Pid::new(Id::new("P"), vec![]);
        let eq = ProcessEquation::new(pid.clone(), vec![], ProcessExpr::Delta);
        let spec = ProcessSpec {
            equations: vec![eq],
            ..Default::default()
        };
        assert!(spec.find_equation(&pid).is_some());
    }
}
