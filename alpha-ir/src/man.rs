//! Multi-action-name algebra: finite multisets of action names (MAN),
//! finite sets of such multisets (MANS), and the operators between them.
use alpha_utils::Id;
use itertools::Itertools;
use std::collections::BTreeSet;

/// An action name is just an interned identifier; sort information lives
/// one layer up and is opaque here.
pub type ActionName = Id;

/// A finite multiset of action names, kept sorted so that multiset
/// equality is plain `Vec` equality and ordering is the canonical
/// lexicographic order over sorted representatives (§3).
///
/// The empty `Man` denotes the silent action `τ`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Man(Vec<ActionName>);

impl Man {
    pub fn tau() -> Self {
        Man(Vec::new())
    }

    pub fn is_tau(&self) -> bool {
        self.0.is_empty()
    }

    pub fn singleton(a: ActionName) -> Self {
        Man(vec![a])
    }

    pub fn from_names<I: IntoIterator<Item = ActionName>>(names: I) -> Self {
        let mut v: Vec<_> = names.into_iter().collect();
        v.sort();
        Man(v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self, a: &ActionName) -> usize {
        self.0.iter().filter(|x| *x == a).count()
    }

    pub fn contains_name(&self, a: &ActionName) -> bool {
        self.0.binary_search(a).is_ok()
    }

    /// Removes one occurrence of `a`, if present.
    pub fn remove_one(&mut self, a: &ActionName) -> bool {
        if let Ok(idx) = self.0.binary_search(a) {
            self.0.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn insert(&mut self, a: ActionName) {
        let idx = self.0.partition_point(|x| x < &a);
        self.0.insert(idx, a);
    }
}

/// `true` iff `y` is contained in `x` as a sub-multiset.
pub fn includes(x: &Man, y: &Man) -> bool {
    let mut needed: Vec<ActionName> = y.0.clone();
    for have in &x.0 {
        if let Some(pos) = needed.iter().position(|n| n == have) {
            needed.remove(pos);
        }
    }
    needed.is_empty()
}

/// Multiset sum.
pub fn union(alpha: &Man, beta: &Man) -> Man {
    let mut v = alpha.0.clone();
    v.extend(beta.0.iter().cloned());
    v.sort();
    Man(v)
}

/// Multiset difference, saturating at zero.
pub fn difference(alpha: &Man, beta: &Man) -> Man {
    let mut v = alpha.0.clone();
    for b in &beta.0 {
        if let Some(pos) = v.iter().position(|n| n == b) {
            v.remove(pos);
        }
    }
    Man(v)
}

/// A finite set of MANs; never contains duplicates under MAN equality.
pub type ManSet = BTreeSet<Man>;

pub fn man_set_of<I: IntoIterator<Item = Man>>(xs: I) -> ManSet {
    xs.into_iter().collect()
}

/// `{ α ∪ β | α ∈ A, β ∈ B }`
pub fn concat(a: &ManSet, b: &ManSet) -> ManSet {
    let mut result = ManSet::new();
    for i in a {
        for j in b {
            result.insert(union(i, j));
        }
    }
    result
}

/// `A ∪ B ∪ concat(A, B)`
pub fn merge(a: &ManSet, b: &ManSet) -> ManSet {
    let mut result: ManSet = a.union(b).cloned().collect();
    result.extend(concat(a, b));
    result
}

/// Alias of [`merge`].
pub fn left_merge(a: &ManSet, b: &ManSet) -> ManSet {
    merge(a, b)
}

/// Alias of [`concat`].
pub fn sync(a: &ManSet, b: &ManSet) -> ManSet {
    concat(a, b)
}

/// `A ∪ { α ∖ β | β ∈ B, α ∈ A, β ⊆ α, α ∖ β ≠ ∅ }`
pub fn left_arrow1(a: &ManSet, b: &ManSet) -> ManSet {
    let mut result = a.clone();
    for beta in b {
        for gamma in a {
            if includes(gamma, beta) {
                let alpha = difference(gamma, beta);
                if !alpha.is_empty() {
                    result.insert(alpha);
                }
            }
        }
    }
    result
}

/// `left_arrow(A1, A2)`: identity when `a1_includes_subsets`, else
/// `A1 ∪ left_arrow1(A1, A2)`.
pub fn left_arrow(a1: &ManSet, a1_includes_subsets: bool, a2: &ManSet) -> ManSet {
    if a1_includes_subsets {
        a1.clone()
    } else {
        let mut result: ManSet = a1.clone();
        result.extend(left_arrow1(a1, a2));
        result
    }
}

/// Removes every occurrence of names in `hidden` from `alpha`; the result
/// may collapse to `τ`.
pub fn hide_man(hidden: &BTreeSet<ActionName>, alpha: &Man) -> Man {
    Man(alpha.0.iter().filter(|a| !hidden.contains(a)).cloned().collect())
}

/// Applies [`hide_man`] to every element of `a`.
pub fn hide(hidden: &BTreeSet<ActionName>, a: &ManSet) -> ManSet {
    a.iter().map(|alpha| hide_man(hidden, alpha)).collect()
}

/// `block(H, A, include_subsets)`.
pub fn block(h: &BTreeSet<ActionName>, a: &ManSet, include_subsets: bool) -> ManSet {
    let mut result = ManSet::new();
    for alpha in a {
        if include_subsets {
            let beta = Man(alpha.0.iter().filter(|x| !h.contains(x)).cloned().collect());
            if !beta.is_empty() {
                result.insert(beta);
            }
        } else if !alpha.0.iter().any(|x| h.contains(x)) {
            result.insert(alpha.clone());
        }
    }
    result
}

/// A rename map: finite bijection of action names, source → target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenameMap(Vec<(ActionName, ActionName)>);

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I: IntoIterator<Item = (ActionName, ActionName)>>(pairs: I) -> Self {
        RenameMap(pairs.into_iter().collect())
    }

    pub fn rules(&self) -> &[(ActionName, ActionName)] {
        &self.0
    }

    fn is_source(&self, x: &ActionName) -> bool {
        self.0.iter().any(|(src, _)| src == x)
    }

    fn apply_one(&self, x: &ActionName) -> ActionName {
        self.0
            .iter()
            .find(|(src, _)| src == x)
            .map(|(_, tgt)| *tgt)
            .unwrap_or(*x)
    }

    /// `{ a | R(a) = b } ∪ ({b} if b is not a source of R)`, for every `b`
    /// appearing as a target. Sources not mentioned here pass through
    /// unchanged in [`rename_inverse`].
    fn inverse_map(&self) -> std::collections::BTreeMap<ActionName, Vec<ActionName>> {
        let mut inv: std::collections::BTreeMap<ActionName, Vec<ActionName>> =
            std::collections::BTreeMap::new();
        for (src, tgt) in &self.0 {
            let entry = inv.entry(*tgt).or_default();
            entry.push(*src);
            if !self.is_source(tgt) && !entry.contains(tgt) {
                entry.push(*tgt);
            }
            inv.entry(*src).or_default();
        }
        inv
    }
}

/// Applies `R` pointwise to every element of `a`.
pub fn rename(r: &RenameMap, a: &ManSet) -> ManSet {
    a.iter()
        .map(|alpha| Man::from_names(alpha.iter().map(|x| r.apply_one(x))))
        .collect()
}

/// `rename_inverse(R, I)` for a plain set of action names.
pub fn rename_inverse_names(r: &RenameMap, names: &BTreeSet<ActionName>) -> BTreeSet<ActionName> {
    let inv = r.inverse_map();
    let mut result = BTreeSet::new();
    for n in names {
        match inv.get(n) {
            Some(reps) => result.extend(reps.iter().cloned()),
            None => {
                result.insert(*n);
            }
        }
    }
    result
}

/// For every action name `b` appearing in a MAN, substitutes the set of
/// candidate preimages under `R`, then takes the Cartesian product across
/// the MAN's names (§4.1, supplemented in SPEC_FULL §C.3).
pub fn rename_inverse_man(r: &RenameMap, alpha: &Man, include_subsets: bool) -> ManSet {
    let inv = r.inverse_map();
    let mut kept = Man::tau();
    let mut choices: Vec<Vec<ActionName>> = Vec::new();
    for name in alpha.iter() {
        match inv.get(name) {
            Some(reps) => {
                if !reps.is_empty() || !include_subsets {
                    choices.push(reps.clone());
                }
            }
            None => kept.insert(*name),
        }
    }
    if choices.is_empty() {
        return man_set_of([kept]);
    }
    choices
        .into_iter()
        .multi_cartesian_product()
        .map(|combo| {
            let mut m = kept.clone();
            for a in combo {
                m.insert(a);
            }
            m
        })
        .collect()
}

/// `rename_inverse(R, A, include_subsets)`.
pub fn rename_inverse(r: &RenameMap, a: &ManSet, include_subsets: bool) -> ManSet {
    let mut result = ManSet::new();
    for alpha in a {
        result.extend(rename_inverse_man(r, alpha, include_subsets));
    }
    result
}

/// A communication rule: a non-empty multiset lhs and a rhs that is
/// either an action name or the τ-marker (`None`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommRule {
    pub lhs: Man,
    pub rhs: Option<ActionName>,
}

impl CommRule {
    pub fn new(lhs: Man, rhs: Option<ActionName>) -> Self {
        CommRule { lhs, rhs }
    }
}

/// A finite set of communication rules. Well-formedness (no action on
/// both some lhs and some rhs) is a precondition, not enforced here; see
/// `alpha_opt::driver` for the check that raises `StructuralError`.
pub type CommSet = Vec<CommRule>;

fn apply_comm_to(alpha: &Man, rules: &CommSet) -> ManSet {
    let mut frontier = man_set_of([alpha.clone()]);
    for rule in rules {
        let mut additions = Vec::new();
        for beta in &frontier {
            let mut cur = beta.clone();
            while includes(&cur, &rule.lhs) {
                for n in rule.lhs.iter() {
                    cur.remove_one(n);
                }
                if let Some(rhs) = rule.rhs {
                    cur.insert(rhs);
                }
                additions.push(cur.clone());
            }
        }
        frontier.extend(additions);
    }
    frontier
}

/// Sequentially applies each rule in `c`, accumulating every multi-action
/// reachable by zero or more rule applications.
pub fn comm(c: &CommSet, a: &ManSet) -> ManSet {
    let mut result = a.clone();
    for rule in c {
        let names: Vec<Man> = result.iter().cloned().collect();
        for alpha in names {
            result.extend(apply_comm_to(&alpha, std::slice::from_ref(rule)));
        }
    }
    result
}

/// Maximum number of worklist rounds `comm_inverse` will run once `C` has
/// passed [`comm_set_is_well_formed`], purely as a backstop against
/// unexpectedly large (but legal) rule sets — not as the malformedness
/// detector.
fn comm_inverse_budget(c: &CommSet, alpha: &Man) -> usize {
    (c.len() + 1) * (alpha.len() + 1) * 8 + 64
}

/// `true` iff no action appears on both some rule's lhs and some (possibly
/// different) rule's rhs, the well-formedness invariant §3 requires of a
/// communication set. A self-rewrite such as `a -> a` violates this (`a`
/// is simultaneously a lhs member and a rhs), even though it would
/// otherwise dedup away silently in the worklist below.
fn comm_set_is_well_formed(c: &CommSet) -> bool {
    let rhs_names: BTreeSet<ActionName> = c.iter().filter_map(|rule| rule.rhs).collect();
    !c.iter().any(|rule| rule.lhs.iter().any(|n| rhs_names.contains(n)))
}

/// Preimage of a single MAN under `C`, run as an explicit worklist rather
/// than the naive unbounded recursion the original algorithm uses. `C`'s
/// well-formedness (§3: "no action appears on both some lhs and some
/// rhs") is checked up front and reported as an error rather than left to
/// the worklist to detect: a self-rewriting rule like `a -> a` leaves a
/// MAN unchanged, so the dedup in the loop below would silently swallow
/// it instead of looping, and the budget guard would never fire.
pub fn comm_inverse_man(c: &CommSet, alpha: &Man) -> Result<ManSet, ()> {
    if !comm_set_is_well_formed(c) {
        return Err(());
    }
    let budget = comm_inverse_budget(c, alpha);
    let mut result = ManSet::new();
    let mut worklist = vec![alpha.clone()];
    let mut steps = 0usize;
    while let Some(cur) = worklist.pop() {
        if !result.insert(cur.clone()) {
            continue;
        }
        for rule in c {
            if let Some(rhs) = rule.rhs {
                if cur.contains_name(&rhs) {
                    let mut next = cur.clone();
                    next.remove_one(&rhs);
                    for n in rule.lhs.iter() {
                        next.insert(*n);
                    }
                    worklist.push(next);
                }
            }
        }
        steps += 1;
        if steps > budget {
            return Err(());
        }
    }
    Ok(result)
}

/// `comm_inverse(C, A, include_subsets)`.
pub fn comm_inverse(c: &CommSet, a: &ManSet, _include_subsets: bool) -> Result<ManSet, ()> {
    let mut result = ManSet::new();
    for alpha in a {
        result.extend(comm_inverse_man(c, alpha)?);
    }
    Ok(result)
}

/// `comm_inverse` over a plain set of action names, used by `AllowSet::hide_inverse`.
pub fn comm_inverse_names(c: &CommSet, names: &BTreeSet<ActionName>) -> BTreeSet<ActionName> {
    let mut result = names.clone();
    for i in names {
        for rule in c {
            if rule.rhs == Some(*i) {
                result.extend(rule.lhs.iter().cloned());
            }
        }
    }
    result
}

/// `{ v ∈ V | some α ∈ A with α = v or (include_subsets and v ⊆ α) }`
pub fn allow(v: &ManSet, a: &ManSet, include_subsets: bool) -> ManSet {
    let mut result = ManSet::new();
    for candidate in v {
        let keep = if include_subsets {
            a.iter().any(|alpha| includes(alpha, candidate))
        } else {
            a.contains(candidate)
        };
        if keep {
            result.insert(candidate.clone());
        }
    }
    result
}

/// Drops any MAN that is a proper subset of another MAN in `a`.
pub fn remove_subsets(a: &ManSet) -> ManSet {
    a.iter()
        .filter(|alpha| !a.iter().any(|beta| beta != *alpha && includes(beta, alpha)))
        .cloned()
        .collect()
}

/// Keeps only the rules of `c` whose lhs is contained in some MAN of `a`.
pub fn filter_comm_set(c: &CommSet, a: &ManSet) -> CommSet {
    c.iter()
        .filter(|rule| a.iter().any(|alpha| includes(alpha, &rule.lhs)))
        .cloned()
        .collect()
}

/// Intersection of `concat(a1, a2)` with a length/allowed-filtered bound,
/// used by the length-bounded variant of the alphabet calculator (§4.3).
/// Returns the filtered result plus whether anything was dropped.
pub fn bounded_concat(
    a1: &ManSet,
    a2: &ManSet,
    length_limit: Option<usize>,
    allowed: Option<&ManSet>,
) -> (ManSet, bool) {
    let mut removed = false;
    let mut result = ManSet::new();
    for i in a1 {
        for j in a2 {
            let alpha = union(i, j);
            let within_length = length_limit.map_or(true, |limit| alpha.len() <= limit);
            let within_allowed =
                allowed.map_or(true, |bound| bound.iter().any(|b| includes(b, &alpha)));
            if within_length && within_allowed {
                result.insert(alpha);
            } else {
                removed = true;
            }
        }
    }
    (result, removed)
}

/// Intersection of `merge(a1, a2)` with the same bound as [`bounded_concat`].
pub fn bounded_merge(
    a1: &ManSet,
    a2: &ManSet,
    length_limit: Option<usize>,
    allowed: Option<&ManSet>,
) -> (ManSet, bool) {
    let (prod, removed) = bounded_concat(a1, a2, length_limit, allowed);
    let mut result: ManSet = a1.union(a2).cloned().collect();
    result.extend(prod);
    (result, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ActionName {
        ActionName::new(s)
    }

    #[test]
    fn union_is_multiset_sum() {
        let a = Man::from_names([id("a")]);
        let b = Man::from_names([id("a"), id("b")]);
        let u = union(&a, &b);
        assert_eq!(u.len(), 3);
        assert_eq!(u.count(&id("a")), 2);
    }

    #[test]
    fn difference_saturates() {
        let a = Man::from_names([id("a")]);
        let b = Man::from_names([id("a"), id("a")]);
        assert!(difference(&a, &b).is_empty());
    }

    #[test]
    fn merge_includes_concat() {
        let a = man_set_of([Man::from_names([id("a")])]);
        let b = man_set_of([Man::from_names([id("b")])]);
        let m = merge(&a, &b);
        assert!(m.contains(&Man::from_names([id("a")])));
        assert!(m.contains(&Man::from_names([id("b")])));
        assert!(m.contains(&Man::from_names([id("a"), id("b")])));
    }

    #[test]
    fn comm_inverse_scenario_4() {
        // a|b -> c; V = {c}; comm_inverse = { {a,b}, {c} }
        let c = vec![CommRule::new(Man::from_names([id("a"), id("b")]), Some(id("c")))];
        let v = man_set_of([Man::from_names([id("c")])]);
        let result = comm_inverse(&c, &v, false).unwrap();
        assert!(result.contains(&Man::from_names([id("a"), id("b")])));
        assert!(result.contains(&Man::from_names([id("c")])));
    }

    #[test]
    fn rename_inverse_scenario_3() {
        // rho = {a->b, c->d}; V = {b, bb}; rename_inverse(rho, V) = {a, b, aa, ab, bb}
        let r = RenameMap::from_pairs([(id("a"), id("b")), (id("c"), id("d"))]);
        let v = man_set_of([
            Man::from_names([id("b")]),
            Man::from_names([id("b"), id("b")]),
        ]);
        let result = rename_inverse(&r, &v, false);
        let expected = man_set_of([
            Man::from_names([id("a")]),
            Man::from_names([id("b")]),
            Man::from_names([id("a"), id("a")]),
            Man::from_names([id("a"), id("b")]),
            Man::from_names([id("b"), id("b")]),
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn comm_inverse_malformed_input_errors() {
        // a -> a: an action on both lhs and rhs of the same rule, violating
        // the well-formedness invariant; the worklist should not loop forever.
        let c = vec![CommRule::new(Man::from_names([id("a")]), Some(id("a")))];
        let v = man_set_of([Man::from_names([id("a")])]);
        assert!(comm_inverse(&c, &v, false).is_err());
    }
}
