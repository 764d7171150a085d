// src/dag/readiness.rs

//! Readiness evaluation: which pending rules can run right now.

use crate::dag::graph::RuleGraph;
use crate::dag::store::ResultStore;
use crate::types::RuleName;

/// Return the candidates whose direct sub-rules all have non-empty outputs in
/// `store`, preserving candidate order.
///
/// Rules without sub-rules are always ready.
pub fn ready_rules<G>(candidates: &[RuleName], graph: &G, store: &ResultStore) -> Vec<RuleName>
where
    G: RuleGraph + ?Sized,
{
    candidates
        .iter()
        .filter(|rule| is_ready(rule, graph, store))
        .cloned()
        .collect()
}

/// Whether every direct sub-rule of `rule` has produced output.
pub fn is_ready<G>(rule: &str, graph: &G, store: &ResultStore) -> bool
where
    G: RuleGraph + ?Sized,
{
    graph
        .sub_rules_of(rule)
        .iter()
        .all(|sub| store.has_outputs(sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::RuleSet;
    use crate::dag::rule::Rule;
    use crate::types::OutputRef;

    fn graph() -> RuleSet {
        RuleSet::from_rules([
            Rule::new("a", "true"),
            Rule::new("b", "true"),
            Rule::new("c", "true").with_sub_rule("a").with_sub_rule("b"),
            Rule::new("d", "true").with_sub_rule("a"),
        ])
    }

    fn names(items: &[&str]) -> Vec<RuleName> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn leaves_are_ready_on_an_empty_store() {
        let g = graph();
        let store = ResultStore::new(["a", "b", "c", "d"]);
        let ready = ready_rules(&names(&["c", "b", "d", "a"]), &g, &store);
        assert_eq!(ready, names(&["b", "a"]));
    }

    #[test]
    fn rule_waits_for_every_sub_rule() {
        let g = graph();
        let mut store = ResultStore::new(["a", "b", "c", "d"]);
        store.record("a", vec![OutputRef::from("a1")]).unwrap();

        let ready = ready_rules(&names(&["c", "d"]), &g, &store);
        assert_eq!(ready, names(&["d"]));

        store.record("b", vec![OutputRef::from("b1")]).unwrap();
        let ready = ready_rules(&names(&["c", "d"]), &g, &store);
        assert_eq!(ready, names(&["c", "d"]));
    }

    #[test]
    fn sub_rule_with_empty_outputs_blocks_dependents() {
        let g = graph();
        let mut store = ResultStore::new(["a", "b", "c", "d"]);
        store.record("a", Vec::new()).unwrap();
        assert!(!is_ready("d", &g, &store));
    }
}
