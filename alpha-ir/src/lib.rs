//! The in-memory data model for the alphabet-reduction core: multi-action
//! names and sets (§4.1), the allow-set lattice (§4.2), and the process
//! expression / equation / specification tree (§3).
pub mod allow_set;
pub mod expr;
pub mod man;
pub mod printer;

pub use allow_set::{AllowSet, BlockSet, HideSet, DEFAULT_SUBSETS_BUDGET};
pub use expr::{
    ActionLabelDecl, Assignment, DataExpr, GlobalDecl, Pid, ProcessEquation, ProcessExpr,
    ProcessSpec, SortDecl, SortToken, VarDecl,
};
pub use man::{ActionName, CommRule, CommSet, Man, ManSet, RenameMap};
pub use printer::Printer;

pub use alpha_utils::Id;
