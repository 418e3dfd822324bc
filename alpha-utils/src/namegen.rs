//! Generates fresh, non-conflicting names for the equations a push
//! rewriter introduces (§4.5: every new equation is named
//! `<base>_<op>_<n>` for the smallest `n` not already in use).
use crate::Id;
use std::collections::HashSet;

/// Tracks names already in use and hands out fresh ones deterministically.
///
/// Determinism matters here: two runs over the same `ProcessSpec` must
/// produce byte-identical fresh names, since the driver (§4.6) is required
/// to be a deterministic function of its input.
#[derive(Debug, Default)]
pub struct NameGenerator {
    used: HashSet<Id>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prev_defined_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = Id>,
    {
        Self {
            used: names.into_iter().collect(),
        }
    }

    /// Records `name` as taken without generating anything.
    pub fn reserve(&mut self, name: Id) {
        self.used.insert(name);
    }

    pub fn is_used(&self, name: &Id) -> bool {
        self.used.contains(name)
    }

    /// Returns the first name of the form `<prefix>_<n>` (n starting at 0)
    /// not already in use, and reserves it.
    pub fn gen_name<S: AsRef<str>>(&mut self, prefix: S) -> Id {
        let prefix = prefix.as_ref();
        if !self.used.contains(&Id::new(prefix)) {
            let id = Id::new(prefix);
            self.used.insert(id);
            return id;
        }
        let mut n = 0u64;
        loop {
            let candidate = Id::new(format!("{prefix}_{n}"));
            if !self.used.contains(&candidate) {
                self.used.insert(candidate);
                return candidate;
            }
            n += 1;
        }
    }

    /// Returns the first name of the form `<base>_<op>_<n>` not already in
    /// use, matching §4.5's naming scheme for equations synthesized by a
    /// push rewriter.
    pub fn gen_equation_name(&mut self, base: Id, op: &str) -> Id {
        self.gen_name(format!("{base}_{op}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avoids_previously_defined_names() {
        let mut gen = NameGenerator::with_prev_defined_names([Id::new("p_allow")]);
        let fresh = gen.gen_name("p_allow");
        assert_ne!(fresh, Id::new("p_allow"));
        assert_eq!(fresh, Id::new("p_allow_0"));
    }

    #[test]
    fn equation_naming_matches_scheme() {
        let mut gen = NameGenerator::new();
        let a = gen.gen_equation_name(Id::new("P"), "allow");
        let b = gen.gen_equation_name(Id::new("P"), "allow");
        assert_eq!(a, Id::new("P_allow"));
        assert_eq!(b, Id::new("P_allow_0"));
    }

    #[test]
    fn deterministic_across_runs() {
        let mut g1 = NameGenerator::new();
        let mut g2 = NameGenerator::new();
        let names: Vec<_> = (0..5).map(|_| g1.gen_name("x")).collect();
        let names2: Vec<_> = (0..5).map(|_| g2.gen_name("x")).collect();
        assert_eq!(names, names2);
    }
}
