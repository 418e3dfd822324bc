//! The allow-set lattice (§4.2): an `AllowSet` value pairs a
//! multi-action-name set `A` with an `include_subsets` flag and an
//! "inner hidden names" set `I`, compactly encoding the (possibly
//! infinite) family `A · I*`.
use crate::man::{self, ActionName, CommSet, Man, ManSet, RenameMap};
use alpha_utils::{AlphaResult, Error};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Set of action names blocked by a `block` restriction.
pub type BlockSet = BTreeSet<ActionName>;
/// Set of action names hidden by a `hide` restriction.
pub type HideSet = BTreeSet<ActionName>;

/// The maximum size of `A` at which `subsets` still runs `remove_subsets`
/// eagerly; beyond this the compaction is skipped to bound cost (§4.2,
/// §5's "tunable size (e.g., 1000)").
pub const DEFAULT_SUBSETS_BUDGET: usize = 1000;

/// `(A: MANS, include_subsets: bool, I: set<ActionName>)`.
///
/// Invariant: no element of `A` contains any name from `I`; constructors
/// re-establish this by hiding `I` from every `α ∈ A`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowSet {
    a: ManSet,
    include_subsets: bool,
    i: BTreeSet<ActionName>,
}

impl AllowSet {
    /// Builds an `AllowSet`, re-hiding `i` out of `a` to establish the
    /// invariant.
    pub fn new(a: ManSet, include_subsets: bool, i: BTreeSet<ActionName>) -> Self {
        let a = if i.is_empty() {
            a
        } else {
            man::hide(&i, &a)
        };
        AllowSet {
            a,
            include_subsets,
            i,
        }
    }

    pub fn from_mans(a: ManSet) -> Self {
        AllowSet::new(a, false, BTreeSet::new())
    }

    pub fn empty() -> Self {
        AllowSet::new(ManSet::new(), false, BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.i.is_empty()
    }

    pub fn a(&self) -> &ManSet {
        &self.a
    }

    pub fn include_subsets(&self) -> bool {
        self.include_subsets
    }

    pub fn i(&self) -> &BTreeSet<ActionName> {
        &self.i
    }

    /// Establishes the class invariant after a field was mutated in place.
    fn establish_invariant(&mut self) {
        if !self.i.is_empty() {
            self.a = man::hide(&self.i, &self.a);
        }
    }

    /// Picks an arbitrary representative multi-action belonging to this
    /// allow set — the first element of `A` in sorted order, or else a
    /// singleton from `I`. Fails only when both `A` and `I` are empty
    /// (SPEC_FULL §C.1).
    pub fn pick_element(&self) -> AlphaResult<Man> {
        if let Some(alpha) = self.a.iter().next() {
            return Ok(alpha.clone());
        }
        if let Some(name) = self.i.iter().next() {
            return Ok(Man::singleton(*name));
        }
        Err(Error::structural("cannot pick element from empty allow set"))
    }

    /// `true` iff `alpha` (after hiding `I`) is accepted by this allow set.
    pub fn contains(&self, alpha: &Man) -> bool {
        let beta = man::hide_man(&self.i, alpha);
        if beta.is_empty() {
            return true;
        }
        if self.include_subsets {
            self.a.iter().any(|a| man::includes(a, &beta))
        } else {
            self.a.contains(&beta)
        }
    }

    /// Returns the members of `alphabet` accepted by `self.contains`,
    /// always preserving a `τ` element if present.
    pub fn intersect(&self, alphabet: &ManSet) -> ManSet {
        let mut result: ManSet = alphabet
            .iter()
            .filter(|alpha| self.contains(alpha))
            .cloned()
            .collect();
        if alphabet.contains(&Man::tau()) {
            result.insert(Man::tau());
        }
        result
    }

    /// `block(H, x)`.
    pub fn block(&self, h: &BlockSet) -> Self {
        if self.include_subsets {
            AllowSet::new(
                man::hide(h, &self.a),
                true,
                man::hide(h, &self.i),
            )
        } else {
            AllowSet::new(
                man::block(h, &self.a, false),
                false,
                man::hide(h, &self.i),
            )
        }
    }

    /// `hide_inverse(I', x)`.
    pub fn hide_inverse(&self, i_prime: &HideSet) -> Self {
        let mut result = self.clone();
        result.a = man::block(i_prime, &result.a, result.include_subsets);
        result.i.extend(i_prime.iter().cloned());
        result.establish_invariant();
        result
    }

    /// `rename_inverse(R, x)`.
    pub fn rename_inverse(&self, r: &RenameMap) -> Self {
        AllowSet::new(
            man::rename_inverse(r, &self.a, self.include_subsets),
            self.include_subsets,
            man::rename_inverse_names(r, &self.i),
        )
    }

    /// `comm_inverse(C, x)`. Fails if `C` violates its well-formedness
    /// invariant (see `man::comm_inverse_man`).
    pub fn comm_inverse(&self, c: &CommSet) -> AlphaResult<Self> {
        let a = man::comm_inverse(c, &self.a, self.include_subsets)
            .map_err(|_| Error::structural("comm_inverse: communication set is not well-formed"))?;
        Ok(AllowSet::new(
            a,
            self.include_subsets,
            man::comm_inverse_names(c, &self.i),
        ))
    }

    /// `allow(V, x)`: intersects `V` (as a MANS) with `self`, producing a
    /// fresh `AllowSet` with `include_subsets = false`, `I = ∅`.
    pub fn allow(&self, v: &ManSet) -> Self {
        let mut a = ManSet::new();
        for beta in v {
            let beta = man::hide_man(&self.i, beta);
            let add = if self.include_subsets {
                self.a.iter().any(|x| man::includes(x, &beta))
            } else {
                self.a.contains(&beta)
            };
            if add {
                a.insert(beta);
            }
        }
        AllowSet::from_mans(a)
    }

    /// `left_arrow(x, B)`: adjusts `x.A` by `left_arrow2` when
    /// `!include_subsets`; leaves the flag unchanged.
    pub fn left_arrow(&self, b: &ManSet) -> Self {
        let mut result = self.clone();
        if !self.include_subsets {
            result.a = left_arrow2(&self.a, &self.i, b);
        }
        result.establish_invariant();
        result
    }

    /// Sets `include_subsets = true`, compacting `A` with
    /// [`man::remove_subsets`] unless it exceeds `budget`.
    pub fn subsets(&self, budget: usize) -> Self {
        let mut result = self.clone();
        result.include_subsets = true;
        if result.a.len() <= budget {
            result.a = man::remove_subsets(&result.a);
        } else {
            log::debug!(
                "AllowSet::subsets: skipped remove_subsets on a set of {} elements",
                result.a.len()
            );
        }
        result.establish_invariant();
        result
    }
}

/// `left_arrow(A I*, A2)`: like [`man::left_arrow1`] but names in `i` are
/// re-hidden out of the differences it produces.
fn left_arrow2(a: &ManSet, i: &BTreeSet<ActionName>, a2: &ManSet) -> ManSet {
    let mut result = a.clone();
    for alpha2 in a2 {
        let beta = man::hide_man(i, alpha2);
        for alpha in a {
            if man::includes(alpha, &beta) {
                let gamma = man::difference(alpha, &beta);
                if !gamma.is_empty() {
                    result.insert(man::hide_man(i, &gamma));
                }
            }
        }
    }
    result
}

impl PartialOrd for AllowSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic over `(include_subsets, |A|, |I|, A, I)`, required for
/// memoisation keys (§4.2).
impl Ord for AllowSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.include_subsets
            .cmp(&other.include_subsets)
            .then_with(|| self.a.len().cmp(&other.a.len()))
            .then_with(|| self.i.len().cmp(&other.i.len()))
            .then_with(|| self.a.cmp(&other.a))
            .then_with(|| self.i.cmp(&other.i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::man::man_set_of;

    fn id(s: &str) -> ActionName {
        ActionName::new(s)
    }

    #[test]
    fn invariant_hides_i_from_a() {
        let a = man_set_of([Man::from_names([id("a"), id("b")])]);
        let mut i = BTreeSet::new();
        i.insert(id("b"));
        let set = AllowSet::new(a, false, i);
        assert!(set.a().contains(&Man::from_names([id("a")])));
        assert!(!set.a().iter().any(|m| m.contains_name(&id("b"))));
    }

    #[test]
    fn pick_element_prefers_a() {
        let a = man_set_of([Man::from_names([id("a")])]);
        let set = AllowSet::from_mans(a);
        assert_eq!(set.pick_element().unwrap(), Man::from_names([id("a")]));
    }

    #[test]
    fn pick_element_falls_back_to_i() {
        let mut i = BTreeSet::new();
        i.insert(id("x"));
        let set = AllowSet::new(ManSet::new(), false, i);
        assert_eq!(set.pick_element().unwrap(), Man::singleton(id("x")));
    }

    #[test]
    fn pick_element_empty_errors() {
        assert!(AllowSet::empty().pick_element().is_err());
    }

    #[test]
    fn allow_hides_i_before_matching_against_a() {
        // self = {a} I*, with b hidden. `allow({a,b})` should accept the
        // candidate because hiding b out of it yields `a`, which is in A;
        // it must not be rejected for literally containing an `I` name.
        let a = man_set_of([Man::from_names([id("a")])]);
        let mut i = BTreeSet::new();
        i.insert(id("b"));
        let set = AllowSet::new(a, false, i);

        let candidate = man_set_of([Man::from_names([id("a"), id("b")])]);
        let result = set.allow(&candidate);
        assert!(result.a().contains(&Man::from_names([id("a")])));
    }

    #[test]
    fn subsets_sets_flag_and_compacts() {
        let a = man_set_of([
            Man::from_names([id("a")]),
            Man::from_names([id("a"), id("b")]),
        ]);
        let set = AllowSet::from_mans(a).subsets(DEFAULT_SUBSETS_BUDGET);
        assert!(set.include_subsets());
        // {a} is a subset of {a,b}, so remove_subsets drops it.
        assert_eq!(set.a().len(), 1);
    }
}
