//! Relevance engine
//!
//! Pure queries deciding whether a setting is currently relevant, plus
//! whole-graph analyses (dependents, cycles, ordering).
//!
//! Dependency discovery walks the `Relevance` expression tree. `Custom`
//! predicates are opaque and contribute no edges, so discovery can under-report
//! dependents for configurations that lean on them. Results are therefore used
//! for diagnostics and informational ordering only, never to decide which
//! values are stored or persisted.

use crate::contract::{Definition, Relevance, SettingKey, Snapshot, Structure};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of `validate_relevance_tree`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceReport {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Every key found on a cycle, reported once
    pub cycle_keys: BTreeSet<SettingKey>,
}

/// Evaluate one relevance expression against a snapshot
pub fn evaluate_expression(relevance: &Relevance, snapshot: &Snapshot) -> bool {
    match relevance {
        Relevance::DependsOn(key) => snapshot.get(key).is_some_and(|v| v.is_truthy()),
        Relevance::Equals(key, expected) => snapshot.get(key) == Some(expected),
        Relevance::AllOf(children) => children.iter().all(|c| evaluate_expression(c, snapshot)),
        Relevance::AnyOf(children) => children.iter().any(|c| evaluate_expression(c, snapshot)),
        Relevance::Not(inner) => !evaluate_expression(inner, snapshot),
        Relevance::Custom { predicate, .. } => predicate(snapshot),
    }
}

/// Keys read by an expression; `Custom` nodes contribute nothing
pub fn referenced_keys(relevance: &Relevance) -> BTreeSet<SettingKey> {
    fn collect(relevance: &Relevance, out: &mut BTreeSet<SettingKey>) {
        match relevance {
            Relevance::DependsOn(key) | Relevance::Equals(key, _) => {
                out.insert(key.clone());
            }
            Relevance::AllOf(children) | Relevance::AnyOf(children) => {
                for child in children {
                    collect(child, out);
                }
            }
            Relevance::Not(inner) => collect(inner, out),
            Relevance::Custom { .. } => {}
        }
    }

    let mut out = BTreeSet::new();
    collect(relevance, &mut out);
    out
}

fn references(relevance: Option<&Relevance>, key: &str) -> bool {
    relevance.is_some_and(|r| referenced_keys(r).contains(key))
}

/// Decide whether `key` is relevant for `snapshot`
///
/// Both the definition-level and the structure-level predicates must pass.
/// A missing predicate on either side counts as passing, and an unknown key is
/// relevant.
pub fn evaluate(
    key: &str,
    structure: &Structure,
    definitions: &[Definition],
    snapshot: &Snapshot,
) -> bool {
    let definition_passes = definitions
        .iter()
        .find(|d| d.key == key)
        .and_then(|d| d.relevance.as_ref())
        .is_none_or(|r| evaluate_expression(r, snapshot));

    definition_passes
        && structure
            .items_for(key)
            .iter()
            .filter_map(|item| item.relevance.as_ref())
            .all(|r| evaluate_expression(r, snapshot))
}

/// Keys reachable through the structure that are currently relevant
pub fn visible_settings(
    structure: &Structure,
    definitions: &[Definition],
    snapshot: &Snapshot,
) -> BTreeSet<SettingKey> {
    structure
        .items()
        .into_iter()
        .map(|item| item.key.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|key| evaluate(key, structure, definitions, snapshot))
        .collect()
}

/// Keys whose relevance (definition- or structure-level) reads `changed_key`
pub fn dependent_settings(
    changed_key: &str,
    structure: &Structure,
    definitions: &[Definition],
) -> BTreeSet<SettingKey> {
    let mut dependents: BTreeSet<SettingKey> = definitions
        .iter()
        .filter(|d| references(d.relevance.as_ref(), changed_key))
        .map(|d| d.key.clone())
        .collect();

    for item in structure.items() {
        if references(item.relevance.as_ref(), changed_key) {
            dependents.insert(item.key.clone());
        }
    }

    dependents
}

/// Dependency graph over every key known to a configuration
///
/// Edges point from a key to the keys whose relevance reads it.
#[derive(Debug, Clone, Default)]
pub struct RelevanceGraph {
    dependents: BTreeMap<SettingKey, BTreeSet<SettingKey>>,
}

impl RelevanceGraph {
    pub fn build(structure: &Structure, definitions: &[Definition]) -> Self {
        let mut keys: BTreeSet<SettingKey> = definitions.iter().map(|d| d.key.clone()).collect();
        for item in structure.items() {
            keys.insert(item.key.clone());
        }

        let dependents = keys
            .into_iter()
            .map(|key| {
                let deps = dependent_settings(&key, structure, definitions);
                (key, deps)
            })
            .collect();

        Self { dependents }
    }

    pub fn keys(&self) -> impl Iterator<Item = &SettingKey> {
        self.dependents.keys()
    }

    /// Keys whose relevance reads `key`
    pub fn dependents_of(&self, key: &str) -> BTreeSet<SettingKey> {
        self.dependents.get(key).cloned().unwrap_or_default()
    }

    /// Keys read by the relevance of `key`
    pub fn dependencies_of(&self, key: &str) -> BTreeSet<SettingKey> {
        self.dependents
            .iter()
            .filter(|(_, dependents)| dependents.contains(key))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Detect cycles with a DFS over the graph, keeping a recursion stack
    pub fn find_cycles(&self) -> RelevanceReport {
        fn visit(
            graph: &RelevanceGraph,
            key: &str,
            visited: &mut BTreeSet<SettingKey>,
            stack: &mut Vec<SettingKey>,
            report: &mut RelevanceReport,
        ) {
            visited.insert(key.to_string());
            stack.push(key.to_string());

            for next in graph.dependents.get(key).into_iter().flatten() {
                if let Some(pos) = stack.iter().position(|k| k == next) {
                    for participant in &stack[pos..] {
                        if report.cycle_keys.insert(participant.clone()) {
                            report.errors.push(format!(
                                "Circular relevance dependency detected involving '{participant}'"
                            ));
                        }
                    }
                } else if !visited.contains(next) {
                    visit(graph, next, visited, stack, report);
                }
            }

            stack.pop();
        }

        let mut report = RelevanceReport::default();
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();
        for key in self.dependents.keys() {
            if !visited.contains(key) {
                visit(self, key, &mut visited, &mut stack, &mut report);
            }
        }
        report.valid = report.errors.is_empty();
        report
    }

    /// Keys ordered so that dependencies precede their dependents
    ///
    /// Post-order DFS over the dependents graph, reversed. Every node is
    /// visited once, so a cyclic graph still yields an ordering.
    pub fn order(&self) -> Vec<SettingKey> {
        fn visit(
            graph: &RelevanceGraph,
            key: &str,
            visited: &mut BTreeSet<SettingKey>,
            out: &mut Vec<SettingKey>,
        ) {
            if !visited.insert(key.to_string()) {
                return;
            }
            for next in graph.dependents.get(key).into_iter().flatten() {
                visit(graph, next, visited, out);
            }
            out.push(key.to_string());
        }

        let mut visited = BTreeSet::new();
        let mut out = Vec::with_capacity(self.dependents.len());
        for key in self.dependents.keys() {
            visit(self, key, &mut visited, &mut out);
        }
        out.reverse();
        out
    }
}

/// Check the configuration's relevance graph for cycles
pub fn validate_relevance_tree(structure: &Structure, definitions: &[Definition]) -> RelevanceReport {
    let report = RelevanceGraph::build(structure, definitions).find_cycles();
    for error in &report.errors {
        tracing::warn!(%error, "relevance graph is cyclic");
    }
    report
}

/// Keys in dependency order (dependencies first)
///
/// Does not fail on cycles; call `validate_relevance_tree` first for a guarantee.
pub fn dependency_order(structure: &Structure, definitions: &[Definition]) -> Vec<SettingKey> {
    RelevanceGraph::build(structure, definitions).order()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Grouping, SettingValue, StructureItem};

    fn snapshot(entries: &[(&str, SettingValue)]) -> Snapshot {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn flat_structure(keys: &[&str]) -> Structure {
        let mut grouping = Grouping::new("main", "Main");
        for key in keys {
            grouping.items.push(StructureItem::new(*key));
        }
        Structure::new(vec![grouping])
    }

    #[test]
    fn test_expression_semantics() {
        let snap = snapshot(&[("a", true.into()), ("b", "x".into()), ("n", 0.into())]);

        assert!(evaluate_expression(&Relevance::depends_on("a"), &snap));
        assert!(!evaluate_expression(&Relevance::depends_on("n"), &snap));
        assert!(!evaluate_expression(&Relevance::depends_on("missing"), &snap));
        assert!(evaluate_expression(&Relevance::equals("b", "x"), &snap));
        assert!(!evaluate_expression(&Relevance::equals("missing", "x"), &snap));
        assert!(evaluate_expression(&Relevance::AllOf(vec![]), &snap));
        assert!(!evaluate_expression(&Relevance::AnyOf(vec![]), &snap));
        assert!(evaluate_expression(
            &Relevance::not(Relevance::depends_on("n")),
            &snap
        ));
        assert!(evaluate_expression(
            &Relevance::custom("always", |_| true),
            &snap
        ));
    }

    #[test]
    fn test_referenced_keys_skip_custom() {
        let relevance = Relevance::AllOf(vec![
            Relevance::depends_on("a"),
            Relevance::AnyOf(vec![
                Relevance::equals("b", 1),
                Relevance::not(Relevance::depends_on("c")),
            ]),
            Relevance::custom("opaque", |s| s.contains_key("d")),
        ]);
        let keys: Vec<_> = referenced_keys(&relevance).into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_evaluate_without_predicates_is_true() {
        let defs = vec![Definition::new("plain", 1)];
        let structure = flat_structure(&["plain"]);
        assert!(evaluate("plain", &structure, &defs, &Snapshot::new()));
        assert!(evaluate("unknown", &structure, &defs, &Snapshot::new()));
    }

    #[test]
    fn test_evaluate_requires_both_levels() {
        let defs = vec![Definition::new("x", 1).with_relevance(Relevance::depends_on("a"))];
        let mut grouping = Grouping::new("main", "Main");
        grouping
            .items
            .push(StructureItem::new("x").with_relevance(Relevance::depends_on("b")));
        let structure = Structure::new(vec![grouping]);

        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let snap = snapshot(&[("a", a.into()), ("b", b.into())]);
            assert_eq!(evaluate("x", &structure, &defs, &snap), a && b, "a={a} b={b}");
        }
    }

    #[test]
    fn test_visible_settings_walks_nested_groupings() {
        let defs = vec![
            Definition::new("audio.enabled", true),
            Definition::new("audio.volume", 50).with_relevance(Relevance::depends_on("audio.enabled")),
        ];
        let structure = Structure::new(vec![Grouping::new("audio", "Audio")
            .with_item(StructureItem::new("audio.enabled"))
            .with_grouping(Grouping::new("levels", "Levels").with_item(StructureItem::new("audio.volume")))]);

        let on = snapshot(&[("audio.enabled", true.into())]);
        let off = snapshot(&[("audio.enabled", false.into())]);

        let visible: Vec<_> = visible_settings(&structure, &defs, &on).into_iter().collect();
        assert_eq!(visible, vec!["audio.enabled", "audio.volume"]);
        let visible: Vec<_> = visible_settings(&structure, &defs, &off).into_iter().collect();
        assert_eq!(visible, vec!["audio.enabled"]);
        assert_eq!(
            visible_settings(&structure, &defs, &on),
            visible_settings(&structure, &defs, &on)
        );
    }

    #[test]
    fn test_dependents_include_structure_predicates() {
        let defs = vec![
            Definition::new("a", true),
            Definition::new("b", 1).with_relevance(Relevance::depends_on("a")),
            Definition::new("c", 1),
        ];
        let mut grouping = Grouping::new("main", "Main");
        grouping
            .items
            .push(StructureItem::new("c").with_relevance(Relevance::equals("a", true)));
        let structure = Structure::new(vec![grouping]);

        let deps: Vec<_> = dependent_settings("a", &structure, &defs).into_iter().collect();
        assert_eq!(deps, vec!["b", "c"]);
        assert!(dependent_settings("b", &structure, &defs).is_empty());
    }

    #[test]
    fn test_acyclic_tree_is_valid() {
        let defs = vec![
            Definition::new("a", true),
            Definition::new("b", true).with_relevance(Relevance::depends_on("a")),
            Definition::new("c", true).with_relevance(Relevance::depends_on("b")),
        ];
        let report = validate_relevance_tree(&flat_structure(&["a", "b", "c"]), &defs);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_cycle_reports_each_participant_once() {
        let defs = vec![
            Definition::new("a", true).with_relevance(Relevance::depends_on("b")),
            Definition::new("b", true).with_relevance(Relevance::depends_on("a")),
            Definition::new("c", true).with_relevance(Relevance::depends_on("a")),
        ];
        let report = validate_relevance_tree(&flat_structure(&["a", "b", "c"]), &defs);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.contains("'a'")));
        assert!(report.errors.iter().any(|e| e.contains("'b'")));
        assert!(!report.cycle_keys.contains("c"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let defs = vec![Definition::new("a", true).with_relevance(Relevance::depends_on("a"))];
        let report = validate_relevance_tree(&Structure::default(), &defs);
        assert!(!report.valid);
        assert!(report.cycle_keys.contains("a"));
    }

    #[test]
    fn test_dependency_order_puts_dependencies_first() {
        let defs = vec![
            Definition::new("z.child", 1).with_relevance(Relevance::depends_on("m.parent")),
            Definition::new("m.parent", true).with_relevance(Relevance::depends_on("a.root")),
            Definition::new("a.root", true),
            Definition::new("b.free", true),
        ];
        let order = dependency_order(&Structure::default(), &defs);
        let pos = |k: &str| order.iter().position(|x| x == k).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos("a.root") < pos("m.parent"));
        assert!(pos("m.parent") < pos("z.child"));
        assert_eq!(order, dependency_order(&Structure::default(), &defs));
    }

    #[test]
    fn test_dependency_order_terminates_on_cycle() {
        let defs = vec![
            Definition::new("a", true).with_relevance(Relevance::depends_on("b")),
            Definition::new("b", true).with_relevance(Relevance::depends_on("a")),
        ];
        let order = dependency_order(&Structure::default(), &defs);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_graph_dependencies_of() {
        let defs = vec![
            Definition::new("a", true),
            Definition::new("b", true),
            Definition::new("c", true).with_relevance(Relevance::AllOf(vec![
                Relevance::depends_on("a"),
                Relevance::depends_on("b"),
            ])),
        ];
        let graph = RelevanceGraph::build(&Structure::default(), &defs);
        let deps: Vec<_> = graph.dependencies_of("c").into_iter().collect();
        assert_eq!(deps, vec!["a", "b"]);
        assert_eq!(graph.keys().count(), 3);
        assert!(graph.dependents_of("c").is_empty());
    }
}
