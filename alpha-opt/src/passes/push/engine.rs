//! Shared recursion context for the four push rewriters (§4.5): the
//! equation store new equations are appended to, a fresh-name generator,
//! and one memoisation map per restriction kind, keyed by
//! `(restriction, pid)` and driven by the busy/finished/unknown status
//! machine. An entry absent from a map is implicitly `unknown`; a
//! recursive call stack visiting the same `(restriction, pid)` pair a
//! second time always finds it at least `busy`, which is what breaks
//! cycles in the PID dependency graph without extra bookkeeping.
//!
//! A `Busy` hit means the entry that's about to finish depended on a node
//! still being resolved, so its alphabet may be an under-approximation.
//! Rather than track that per entry, the engine sets a single `had_cycle`
//! flag whenever any `Busy` is observed and, by the time a top-level
//! `run_to_convergence` call returns, re-runs the whole computation with
//! the previous round's finished alphas as the seed a `Busy` hit returns
//! (instead of `∅`) — this is the "post-pass that revisits unfinished
//! entries" (spec §4.5), a Gauss-Seidel iteration over the same finite
//! lattice `alphabet_fixpoint` converges over for the plain PID call
//! graph.
use std::collections::{BTreeMap, BTreeSet};

use alpha_ir::{AllowSet, BlockSet, CommSet, HideSet, ManSet, Pid, ProcessEquation, ProcessExpr, ProcessSpec};
use alpha_utils::{AlphaResult, NameGenerator};

use crate::analysis::AlphaCache;
use crate::driver::ReduceOptions;

#[derive(Clone, Debug)]
pub enum MemoStatus {
    Busy(Pid),
    Finished(Pid, ManSet),
}

pub struct PushEngine<'a> {
    pub original: &'a ProcessSpec,
    pub alpha_cache: &'a AlphaCache,
    pub options: ReduceOptions,
    pub namegen: NameGenerator,
    pub new_equations: Vec<ProcessEquation>,
    had_cycle: bool,
    allow_memo: BTreeMap<(AllowSet, Pid), MemoStatus>,
    block_memo: BTreeMap<(BlockSet, Pid), MemoStatus>,
    hide_memo: BTreeMap<(HideSet, Pid), MemoStatus>,
    comm_memo: BTreeMap<(CommSet, Pid), MemoStatus>,
    prior_allow: BTreeMap<(AllowSet, Pid), ManSet>,
    prior_block: BTreeMap<(BlockSet, Pid), ManSet>,
    prior_hide: BTreeMap<(HideSet, Pid), ManSet>,
    prior_comm: BTreeMap<(CommSet, Pid), ManSet>,
}

impl<'a> PushEngine<'a> {
    pub fn new(original: &'a ProcessSpec, alpha_cache: &'a AlphaCache, options: ReduceOptions) -> Self {
        let namegen = NameGenerator::with_prev_defined_names(original.defined_pids().map(|p| p.name));
        PushEngine {
            original,
            alpha_cache,
            options,
            namegen,
            new_equations: Vec::new(),
            had_cycle: false,
            allow_memo: BTreeMap::new(),
            block_memo: BTreeMap::new(),
            hide_memo: BTreeMap::new(),
            comm_memo: BTreeMap::new(),
            prior_allow: BTreeMap::new(),
            prior_block: BTreeMap::new(),
            prior_hide: BTreeMap::new(),
            prior_comm: BTreeMap::new(),
        }
    }

    pub fn emit_equation(&mut self, eq: ProcessEquation) {
        self.new_equations.push(eq);
    }

    /// Records that a `Busy` entry was read (§4.5): the caller of this
    /// round's top-level `run_to_convergence` must revisit before
    /// trusting the result.
    pub fn mark_cycle(&mut self) {
        self.had_cycle = true;
    }

    /// Runs `f` against this engine, then, if any same-kind recursive
    /// `call` was left `Busy` while a dependency resolved (`mark_cycle`),
    /// re-runs it with the round's finished alphas seeded as the value a
    /// future `Busy` hit returns, repeating until the entries this call
    /// touched stop changing. Terminates because every touched alphabet
    /// only grows round over round and is bounded by the finite universe
    /// of action names, the same argument `alphabet_fixpoint` relies on.
    pub fn run_to_convergence<F>(&mut self, mut f: F) -> AlphaResult<(ManSet, ProcessExpr)>
    where
        F: FnMut(&mut PushEngine<'a>) -> AlphaResult<(ManSet, ProcessExpr)>,
    {
        let cap = self.original.equations.len() + 1;
        let mut round = 0usize;
        loop {
            let allow_before: BTreeSet<_> = self.allow_memo.keys().cloned().collect();
            let block_before: BTreeSet<_> = self.block_memo.keys().cloned().collect();
            let hide_before: BTreeSet<_> = self.hide_memo.keys().cloned().collect();
            let comm_before: BTreeSet<_> = self.comm_memo.keys().cloned().collect();
            let eq_before = self.new_equations.len();

            self.had_cycle = false;
            let result = f(self)?;

            if !self.had_cycle {
                return Ok(result);
            }
            round += 1;
            if round > cap {
                log::warn!(
                    "push rewriter: gave up converging a recursive restriction after {cap} rounds"
                );
                return Ok(result);
            }

            let allow_converged = diff_and_stash(&mut self.allow_memo, &mut self.prior_allow, &allow_before);
            let block_converged = diff_and_stash(&mut self.block_memo, &mut self.prior_block, &block_before);
            let hide_converged = diff_and_stash(&mut self.hide_memo, &mut self.prior_hide, &hide_before);
            let comm_converged = diff_and_stash(&mut self.comm_memo, &mut self.prior_comm, &comm_before);
            self.new_equations.truncate(eq_before);

            if allow_converged && block_converged && hide_converged && comm_converged {
                return Ok(result);
            }
        }
    }
}

/// Moves every entry this round added (i.e. present in the live map but
/// not in `before`) into `prior`, removing it from the live map so the
/// next round recomputes it fresh. Returns `true` if none of those
/// entries' finished alphas differ from what `prior` already held.
fn diff_and_stash<K: Ord + Clone>(
    live: &mut BTreeMap<(K, Pid), MemoStatus>,
    prior: &mut BTreeMap<(K, Pid), ManSet>,
    before: &BTreeSet<(K, Pid)>,
) -> bool {
    let touched: Vec<(K, Pid)> = live.keys().cloned().filter(|k| !before.contains(k)).collect();
    let mut converged = true;
    for key in touched {
        if let Some(MemoStatus::Finished(_, alpha)) = live.remove(&key) {
            if prior.get(&key) != Some(&alpha) {
                converged = false;
            }
            prior.insert(key, alpha);
        }
    }
    converged
}

macro_rules! memo_accessors {
    ($status:ident, $busy:ident, $finished:ident, $hint:ident, $field:ident, $prior_field:ident, $key_ty:ty) => {
        impl<'a> PushEngine<'a> {
            pub fn $status(&self, key: &$key_ty, pid: &Pid) -> Option<MemoStatus> {
                self.$field.get(&(key.clone(), pid.clone())).cloned()
            }
            pub fn $busy(&mut self, key: $key_ty, pid: Pid, fresh: Pid) {
                self.$field.insert((key, pid), MemoStatus::Busy(fresh));
            }
            pub fn $finished(&mut self, key: $key_ty, pid: Pid, fresh: Pid, alpha: ManSet) {
                self.$field.insert((key, pid), MemoStatus::Finished(fresh, alpha));
            }
            /// The previous round's finished alphabet for `(key, pid)`,
            /// or `∅` on the first round — what a `Busy` hit should
            /// return instead of always assuming the empty set.
            pub fn $hint(&self, key: &$key_ty, pid: &Pid) -> ManSet {
                self.$prior_field
                    .get(&(key.clone(), pid.clone()))
                    .cloned()
                    .unwrap_or_default()
            }
        }
    };
}

memo_accessors!(
    allow_status, allow_mark_busy, allow_mark_finished, allow_hint, allow_memo, prior_allow,
    AllowSet
);
memo_accessors!(
    block_status, block_mark_busy, block_mark_finished, block_hint, block_memo, prior_block,
    BlockSet
);
memo_accessors!(
    hide_status, hide_mark_busy, hide_mark_finished, hide_hint, hide_memo, prior_hide, HideSet
);
memo_accessors!(
    comm_status, comm_mark_busy, comm_mark_finished, comm_hint, comm_memo, prior_comm, CommSet
);
