//! Alphabet-reduction analyses and rewriting passes (§4) over
//! `alpha_ir::ProcessSpec`.
pub mod analysis;
pub mod driver;
pub mod passes;

pub use analysis::{
    alphabet, alphabet_bounded, alphabet_efficient, alphabet_fixpoint,
    alphabet_fixpoint_restricted, alphabet_intersection, alphabet_new, classify_pcrl, is_pcrl,
    pcrl_pids, AlphaCache, PidGraph,
};
pub use driver::{alphabet_reduce, ReduceOptions};
pub use passes::{
    anonymize, eliminate_single_usage_equations, eliminate_trivial_equations,
    eliminate_unused_equations, join_bisimilar_equations, process_info, push_allow, push_block,
    push_comm, push_hide, remove_data_parameters, DataSubstituter, MemoStatus, NoopSubstituter,
    ProcessInfo, PushEngine,
};
