use super::SchemaRegistry;
use crate::core::Result;
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Towards embedding schemas.
    Parents,
    /// Towards embedded schemas.
    Children,
}

impl SchemaRegistry {
    /// Every schema that directly or transitively embeds `schema_key`,
    /// excluding the schema itself. Diamond-shaped reuse yields each ancestor
    /// once, and an accidental cycle terminates.
    pub fn get_ancestors(&self, schema_key: &str) -> Result<BTreeSet<String>> {
        self.closure(schema_key, Direction::Parents)
    }

    /// Every schema that `schema_key` directly or transitively embeds.
    pub fn get_descendants(&self, schema_key: &str) -> Result<BTreeSet<String>> {
        self.closure(schema_key, Direction::Children)
    }

    /// Whether any other schema embeds `schema_key`.
    pub fn is_embedded_elsewhere(&self, schema_key: &str) -> Result<bool> {
        let idx = self.index_of(schema_key)?;
        Ok(self.nodes[idx].parents.iter().any(|&parent| parent != idx))
    }

    pub fn parent_keys(&self, schema_key: &str) -> Result<BTreeSet<String>> {
        let idx = self.index_of(schema_key)?;
        Ok(self.nodes[idx]
            .parents
            .iter()
            .map(|&parent| self.key_at(parent).to_string())
            .collect())
    }

    fn closure(&self, schema_key: &str, direction: Direction) -> Result<BTreeSet<String>> {
        let traversal = self.traverse(schema_key, direction)?;
        if traversal.cycle_detected {
            warn!(
                schema = schema_key,
                ?direction,
                "schema graph reachable from this schema contains a cycle"
            );
        }
        Ok(traversal.reached)
    }

    /// Depth-first walk keeping the current path, so that an edge back into
    /// it marks a cycle while diamond-shaped reuse does not.
    fn traverse(&self, schema_key: &str, direction: Direction) -> Result<Traversal> {
        let start = self.index_of(schema_key)?;

        let mut visited = HashSet::from([start]);
        let mut on_path = HashSet::from([start]);
        // (node, next edge to follow)
        let mut stack = vec![(start, 0usize)];
        let mut traversal = Traversal::default();

        while let Some(frame) = stack.last_mut() {
            let (node, edge) = *frame;
            frame.1 += 1;

            let edges = match direction {
                Direction::Parents => &self.nodes[node].parents,
                Direction::Children => &self.nodes[node].children,
            };
            let Some(&next) = edges.get(edge) else {
                on_path.remove(&node);
                stack.pop();
                continue;
            };

            if on_path.contains(&next) {
                traversal.cycle_detected = true;
                continue;
            }
            if !visited.insert(next) {
                continue;
            }
            traversal.reached.insert(self.key_at(next).to_string());
            on_path.insert(next);
            stack.push((next, 0));
        }

        Ok(traversal)
    }
}

#[derive(Debug, Default)]
struct Traversal {
    reached: BTreeSet<String>,
    cycle_detected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attribute, AttributeType, SchemaError};

    fn define(registry: &mut SchemaRegistry, key: &str, children: &[&str]) {
        let attributes = children
            .iter()
            .map(|child| Attribute::new(child.to_lowercase(), AttributeType::entity(*child)))
            .collect();
        registry.define_schema(key, attributes, vec![], vec![]).unwrap();
    }

    #[test]
    fn ancestors_follow_embedding_transitively() {
        let mut registry = SchemaRegistry::new();
        define(&mut registry, "GrandChild", &[]);
        define(&mut registry, "Neighbor", &[]);
        define(&mut registry, "Parent", &["GrandChild"]);
        define(&mut registry, "GrandParent", &["Parent"]);

        let ancestors = registry.get_ancestors("GrandChild").unwrap();
        assert_eq!(
            ancestors,
            BTreeSet::from(["Parent".to_string(), "GrandParent".to_string()])
        );
        assert!(registry.get_ancestors("Neighbor").unwrap().is_empty());
        assert!(registry.get_ancestors("GrandParent").unwrap().is_empty());
        assert_eq!(
            registry.get_descendants("GrandParent").unwrap(),
            BTreeSet::from(["Parent".to_string(), "GrandChild".to_string()])
        );
    }

    #[test]
    fn diamond_reuse_reports_each_ancestor_once() {
        let mut registry = SchemaRegistry::new();
        define(&mut registry, "Address", &[]);
        define(&mut registry, "Home", &["Address"]);
        define(&mut registry, "Office", &["Address"]);
        define(&mut registry, "Applicant", &["Home", "Office"]);

        let ancestors = registry.get_ancestors("Address").unwrap();
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains("Applicant"));
        assert!(!registry.traverse("Address", Direction::Parents).unwrap().cycle_detected);
    }

    #[test]
    fn cycles_terminate_and_exclude_the_start() {
        let mut registry = SchemaRegistry::new();
        define(&mut registry, "A", &[]);
        define(&mut registry, "B", &["A"]);
        define(&mut registry, "C", &["B"]);
        registry.link_parent("A", "C").unwrap();

        let ancestors = registry.get_ancestors("A").unwrap();
        assert_eq!(ancestors, BTreeSet::from(["B".to_string(), "C".to_string()]));
        assert!(registry.traverse("A", Direction::Parents).unwrap().cycle_detected);

        // self-embedding after redefinition
        registry
            .redefine_schema(
                "A",
                vec![Attribute::new("inner", AttributeType::entity("A"))],
                vec![],
                vec![],
            )
            .unwrap();
        assert!(!registry.get_ancestors("A").unwrap().contains("A"));
    }

    #[test]
    fn cycles_away_from_the_start_are_detected() {
        let mut registry = SchemaRegistry::new();
        define(&mut registry, "Leaf", &[]);
        define(&mut registry, "Mid", &["Leaf"]);
        define(&mut registry, "Top", &["Mid"]);
        registry.link_parent("Mid", "Top").unwrap();

        let traversal = registry.traverse("Leaf", Direction::Parents).unwrap();
        assert_eq!(
            traversal.reached,
            BTreeSet::from(["Mid".to_string(), "Top".to_string()])
        );
        assert!(traversal.cycle_detected);
        let below_leaf = registry.traverse("Leaf", Direction::Children).unwrap();
        assert!(below_leaf.reached.is_empty());
        assert!(!below_leaf.cycle_detected);
    }

    #[test]
    fn redefinition_replaces_edges() {
        let mut registry = SchemaRegistry::new();
        define(&mut registry, "Address", &[]);
        define(&mut registry, "Person", &["Address"]);
        assert!(registry.is_embedded_elsewhere("Address").unwrap());

        registry
            .redefine_schema("Person", vec![], vec![], vec![])
            .unwrap();
        assert!(registry.get_ancestors("Address").unwrap().is_empty());
        assert!(registry.parent_keys("Address").unwrap().is_empty());
    }

    #[test]
    fn unknown_key_is_not_found() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.get_ancestors("Ghost").unwrap_err(),
            SchemaError::SchemaNotFound("Ghost".into())
        );
    }
}
