//! Pure queries over a `ProcessSpec`: the alphabet calculator (AC, §4.3)
//! and the equation-graph utilities (EG, §4.4) that don't rewrite
//! anything — SCC decomposition, reachability, pCRL/mCRL classification.
pub mod alphabet;
pub mod classify;
pub mod pid_graph;

pub use alphabet::{
    alphabet, alphabet_bounded, alphabet_efficient, alphabet_fixpoint,
    alphabet_fixpoint_restricted, alphabet_intersection, alphabet_new, AlphaCache,
};
pub use classify::{classify_pcrl, is_pcrl, pcrl_pids};
pub use pid_graph::{find_process_identifiers, for_each_call, PidGraph};
