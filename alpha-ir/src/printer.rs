//! A debug/trace formatter for the process-expression IR. Not a full
//! pretty-printer for the mCRL2 surface syntax (that lives with the
//! parser collaborator, out of scope here); just enough structure to
//! make `log::debug!` traces through the push rewriters legible.
use crate::allow_set::AllowSet;
use crate::expr::{Pid, ProcessExpr};
use crate::man::{CommSet, Man, ManSet, RenameMap};
use itertools::Itertools;

pub struct Printer;

impl Printer {
    pub fn format_man(alpha: &Man) -> String {
        if alpha.is_empty() {
            return "tau".to_string();
        }
        alpha.iter().map(|a| a.to_string()).join("|")
    }

    pub fn format_man_set(a: &ManSet) -> String {
        format!("{{{}}}", a.iter().map(Printer::format_man).join(", "))
    }

    pub fn format_rename_map(r: &RenameMap) -> String {
        format!(
            "{{{}}}",
            r.rules()
                .iter()
                .map(|(src, tgt)| format!("{src}->{tgt}"))
                .join(", ")
        )
    }

    pub fn format_comm_set(c: &CommSet) -> String {
        format!(
            "{{{}}}",
            c.iter()
                .map(|rule| {
                    let rhs = rule
                        .rhs
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "tau".to_string());
                    format!("{}->{}", Printer::format_man(&rule.lhs), rhs)
                })
                .join(", ")
        )
    }

    pub fn format_allow_set(x: &AllowSet) -> String {
        let mut s = String::new();
        if !x.a().is_empty() {
            s.push_str(&Printer::format_man_set(x.a()));
            if x.include_subsets() {
                s.push('@');
            }
        }
        if !x.i().is_empty() {
            s.push_str(&format!(
                "{{{}}}*",
                x.i().iter().map(|a| a.to_string()).join(", ")
            ));
        }
        if x.a().is_empty() && x.i().is_empty() {
            s.push_str("{}");
        }
        s
    }

    pub fn format_pid(pid: &Pid) -> String {
        pid.name.to_string()
    }

    /// A one-line, non-recursive-pretty-printing summary used for trace
    /// logging (e.g. `log::debug!("push_allow: {}", Printer::summarize(expr))`).
    pub fn summarize(expr: &ProcessExpr) -> String {
        match expr {
            ProcessExpr::Delta => "delta".to_string(),
            ProcessExpr::Tau => "tau".to_string(),
            ProcessExpr::Action { label, .. } => label.to_string(),
            ProcessExpr::Call { pid, .. } | ProcessExpr::CallAssign { pid, .. } => {
                Printer::format_pid(pid)
            }
            ProcessExpr::Choice(..) => "choice(..)".to_string(),
            ProcessExpr::Seq(..) => "seq(..)".to_string(),
            ProcessExpr::Merge(..) => "merge(..)".to_string(),
            ProcessExpr::LeftMerge(..) => "left_merge(..)".to_string(),
            ProcessExpr::Sync(..) => "sync(..)".to_string(),
            ProcessExpr::Block(h, _) => format!("block({} names, ..)", h.len()),
            ProcessExpr::Hide(i, _) => format!("hide({} names, ..)", i.len()),
            ProcessExpr::Rename(r, _) => format!("rename({}, ..)", Printer::format_rename_map(r)),
            ProcessExpr::Comm(c, _) => format!("comm({}, ..)", Printer::format_comm_set(c)),
            ProcessExpr::Allow(v, _) => format!("allow({}, ..)", Printer::format_man_set(v)),
            _ => "expr(..)".to_string(),
        }
    }
}
