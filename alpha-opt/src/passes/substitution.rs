//! Capture-avoiding substitution for data parameters is explicitly out of
//! scope for this crate (§9 open question: "the core only needs to invoke
//! it"). `DataSubstituter` is the seam a surrounding toolchain plugs a
//! real substitution engine into; `NoopSubstituter` is the identity
//! implementation used wherever equations carry no data parameters.
use alpha_ir::{DataExpr, ProcessExpr, VarDecl};

pub trait DataSubstituter {
    /// Returns `body` with `formals` replaced by `actuals`. Implementors
    /// are responsible for renaming any formal that would otherwise
    /// capture a free variable already present in `body`.
    fn substitute_body(&self, body: &ProcessExpr, formals: &[VarDecl], actuals: &[DataExpr]) -> ProcessExpr;
}

/// Leaves `body` unchanged. Correct for parameterless equations; a
/// deliberate placeholder elsewhere, documented in DESIGN.md, until a
/// real data-term substitution engine is wired in.
pub struct NoopSubstituter;

impl DataSubstituter for NoopSubstituter {
    fn substitute_body(&self, body: &ProcessExpr, _formals: &[VarDecl], _actuals: &[DataExpr]) -> ProcessExpr {
        body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_returns_body_unchanged() {
        let body = ProcessExpr::Delta;
        let out = NoopSubstituter.substitute_body(&body, &[], &[]);
        assert_eq!(out, body);
    }
}
