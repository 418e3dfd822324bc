//! Errors produced by the alphabet-reduction core.
use crate::Id;

/// Convenience wrapper for a result that may fail with an [`Error`].
pub type AlphaResult<T> = std::result::Result<T, Error>;

/// Errors produced by the alphabet-reduction core.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{}", post)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    /// An identifier appears in a multi-action, rename map or
    /// communication rule but is not bound anywhere the caller expected.
    pub fn undefined_identifier(name: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::UndefinedIdentifier(name)),
            post_msg: None,
        }
    }

    /// A process equation refers to a PID that does not exist in the spec.
    pub fn undefined_pid(name: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::UndefinedPid(name)),
            post_msg: None,
        }
    }

    /// An input violates one of the data-model invariants of §3 (e.g. a
    /// communication set with an action on both some lhs and some rhs).
    pub fn structural<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::StructuralError(msg.to_string())),
            post_msg: None,
        }
    }

    /// A push rewriter was asked to handle a node shape it does not
    /// support (e.g. a restriction combinator nested where the algorithm
    /// assumes a plain summand).
    pub fn unsupported_node<S: ToString>(what: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnsupportedNode(what.to_string())),
            post_msg: None,
        }
    }

    /// A fixpoint or worklist exceeded its configured iteration budget.
    pub fn budget_exceeded<S: ToString>(what: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::BudgetExceeded(what.to_string())),
            post_msg: None,
        }
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Misc(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidFile(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WriteError(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[derive(Clone)]
enum ErrorKind {
    /// An action name used in a multi-action / rename / comm rule that
    /// the caller did not expect to see.
    UndefinedIdentifier(Id),
    /// A process identifier referenced by an equation or expression with
    /// no matching definition in the `ProcessSpec`.
    UndefinedPid(Id),
    /// Input violates a data-model invariant from §3.
    StructuralError(String),
    /// A node shape a pass does not (yet) support.
    UnsupportedNode(String),
    /// A fixpoint exceeded its iteration budget; see `ReduceOptions`.
    BudgetExceeded(String),

    // =========== CLI-boundary errors ===============
    /// Miscellaneous error message.
    Misc(String),
    /// The input file is invalid (does not exist or fails to parse as JSON).
    InvalidFile(String),
    /// Failed to write the output.
    WriteError(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            UndefinedIdentifier(name) => write!(f, "Undefined action name: {name}"),
            UndefinedPid(name) => write!(f, "Undefined process identifier: {name}"),
            StructuralError(msg) => write!(f, "Structural error: {msg}"),
            UnsupportedNode(what) => write!(f, "Unsupported node: {what}"),
            BudgetExceeded(what) => write!(f, "Iteration budget exceeded: {what}"),
            InvalidFile(msg) | WriteError(msg) | Misc(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO error: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::invalid_file(format!("JSON error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name() {
        let e = Error::undefined_identifier(Id::new("a"));
        assert!(e.message().contains('a'));
    }
}
