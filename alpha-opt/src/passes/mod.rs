//! Rewriting passes (§4.4, §4.5): each pass is a pure function over
//! `&mut ProcessSpec`, independently callable. The driver (§4.6) is
//! responsible for sequencing them; passes only call one another where
//! the original algorithm they're grounded on does so internally.
pub mod debug_utils;
pub mod eliminate_single_usage_equations;
pub mod eliminate_trivial_equations;
pub mod eliminate_unused_equations;
pub mod join_bisimilar_equations;
pub mod push;
pub mod substitution;

pub use debug_utils::{anonymize, process_info, remove_data_parameters, ProcessInfo};
pub use eliminate_single_usage_equations::eliminate_single_usage_equations;
pub use eliminate_trivial_equations::eliminate_trivial_equations;
pub use eliminate_unused_equations::eliminate_unused_equations;
pub use join_bisimilar_equations::join_bisimilar_equations;
pub use push::{push_allow, push_block, push_comm, push_hide, MemoStatus, PushEngine};
pub use substitution::{DataSubstituter, NoopSubstituter};
