//! core::graph
//!
//! Lib dependency graph resolution.
//!
//! # Architecture
//!
//! The dependency graph is a DAG where:
//! - Nodes are lib names
//! - An edge A -> B means "A depends on B" (B is provisioned first)
//! - Roots are the app's direct lib references
//!
//! The graph is built fresh per resolution request from the libs reachable
//! from an app's direct dependencies; it is never persisted.
//!
//! # Invariants
//!
//! - Graph must be acyclic; cycles fail with the cycle members named
//! - Every `depends` reference must resolve to a known spec
//! - Ordering is deterministic: ties between unrelated libs break by
//!   declaration order (the app's direct list, then each lib's `depends`
//!   list), never by map iteration order
//!
//! Traversal uses an explicit stack with visiting/visited marks rather
//! than call-stack recursion, so arbitrarily deep graphs fail with a named
//! cycle instead of exhausting the stack.

use std::collections::HashMap;

use thiserror::Error;

use super::spec::{AppSpec, SpecSet};
use super::types::LibName;

/// Errors from graph construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The dependency graph contains a cycle.
    #[error("cyclic lib dependency: {}", members.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(" -> "))]
    CyclicDependency {
        /// The libs forming the cycle, in traversal order.
        members: Vec<LibName>,
    },

    /// A `depends` entry names a lib with no known spec.
    #[error("unknown lib '{name}' referenced by '{referenced_by}'")]
    UnknownLibReference {
        /// The unresolvable name.
        name: LibName,
        /// The app or lib whose dependency list references it.
        referenced_by: LibName,
    },
}

/// Per-node traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current traversal path; re-entry means a cycle.
    Visiting,
    /// Fully processed and emitted.
    Visited,
}

/// The resolved dependency graph for one app.
///
/// Holds the topologically ordered active lib set plus the edges among
/// them. Dependencies always precede dependents in [`order`](Self::order).
///
/// # Example
///
/// ```
/// use gantry::core::graph::DependencyGraph;
/// use gantry::core::spec::{AppSpec, LibSpec, RepoTarget, SpecSet};
/// use gantry::core::types::{LibName, MountPoint};
///
/// let x = LibSpec {
///     name: LibName::new("x").unwrap(),
///     repo: RepoTarget::new("/repos/x"),
///     mount: MountPoint::new("/libs/x").unwrap(),
///     assets: vec![],
///     install: vec![],
///     depends: vec![],
///     test: None,
/// };
/// let mut y = x.clone();
/// y.name = LibName::new("y").unwrap();
/// y.depends = vec![x.name.clone()];
///
/// let universe = SpecSet::from_specs(vec![x, y]).unwrap();
/// let app = AppSpec {
///     name: LibName::new("app").unwrap(),
///     libs: vec![LibName::new("y").unwrap()],
///     once: vec![],
///     always: vec![],
/// };
///
/// let graph = DependencyGraph::resolve(&app, &universe).unwrap();
/// let order: Vec<&str> = graph.order().iter().map(|l| l.as_str()).collect();
/// assert_eq!(order, vec!["x", "y"]);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Active libs, dependencies first.
    order: Vec<LibName>,
    /// Direct dependencies per active lib, in declared order.
    deps: HashMap<LibName, Vec<LibName>>,
}

impl DependencyGraph {
    /// Resolve the transitive dependency graph for an app.
    ///
    /// Pure function of the inputs: no side effects, no I/O.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownLibReference`] if the app or any reachable
    ///   lib names a spec that does not exist
    /// - [`GraphError::CyclicDependency`] naming the members of the first
    ///   cycle encountered
    pub fn resolve(app: &AppSpec, universe: &SpecSet) -> Result<Self, GraphError> {
        let mut marks: HashMap<LibName, Mark> = HashMap::new();
        let mut order = Vec::new();
        let mut deps = HashMap::new();

        for root in &app.libs {
            if universe.get(root).is_none() {
                return Err(GraphError::UnknownLibReference {
                    name: root.clone(),
                    referenced_by: app.name.clone(),
                });
            }
            Self::visit(root, universe, &mut marks, &mut order, &mut deps)?;
        }

        Ok(Self { order, deps })
    }

    /// Iterative depth-first visit emitting post-order.
    ///
    /// Each stack frame tracks how many of the node's dependencies have
    /// been dispatched; a frame is emitted once all of them are Visited.
    fn visit(
        root: &LibName,
        universe: &SpecSet,
        marks: &mut HashMap<LibName, Mark>,
        order: &mut Vec<LibName>,
        deps: &mut HashMap<LibName, Vec<LibName>>,
    ) -> Result<(), GraphError> {
        if marks.get(root) == Some(&Mark::Visited) {
            return Ok(());
        }

        // (node, next dependency index to dispatch)
        let mut stack: Vec<(LibName, usize)> = vec![(root.clone(), 0)];
        marks.insert(root.clone(), Mark::Visiting);

        while let Some((node, next)) = stack.last().cloned() {
            let spec = universe
                .get(&node)
                .expect("visiting marks are only set for known specs");

            match spec.depends.get(next) {
                Some(dep) => {
                    stack.last_mut().expect("stack is non-empty").1 += 1;

                    match marks.get(dep) {
                        Some(Mark::Visited) => continue,
                        Some(Mark::Visiting) => {
                            // Cycle: everything from the dep's frame to the
                            // top of the stack is on the loop.
                            let start =
                                stack.iter().position(|(n, _)| n == dep).unwrap_or(0);
                            let mut members: Vec<LibName> =
                                stack[start..].iter().map(|(n, _)| n.clone()).collect();
                            members.push(dep.clone());
                            return Err(GraphError::CyclicDependency { members });
                        }
                        None => {
                            if universe.get(dep).is_none() {
                                return Err(GraphError::UnknownLibReference {
                                    name: dep.clone(),
                                    referenced_by: node.clone(),
                                });
                            }
                            marks.insert(dep.clone(), Mark::Visiting);
                            stack.push((dep.clone(), 0));
                        }
                    }
                }
                None => {
                    // All dependencies emitted; emit this node.
                    stack.pop();
                    marks.insert(node.clone(), Mark::Visited);
                    deps.insert(node.clone(), spec.depends.clone());
                    order.push(node);
                }
            }
        }

        Ok(())
    }

    /// Active libs in provisioning order: every lib appears after all libs
    /// it depends on.
    pub fn order(&self) -> &[LibName] {
        &self.order
    }

    /// Direct dependencies of an active lib, in declared order.
    pub fn dependencies_of(&self, lib: &LibName) -> &[LibName] {
        self.deps.get(lib).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Active libs that directly depend on `lib`.
    pub fn dependents_of(&self, lib: &LibName) -> Vec<&LibName> {
        self.order
            .iter()
            .filter(|candidate| self.dependencies_of(candidate).contains(lib))
            .collect()
    }

    /// Whether `lib` transitively depends on `other`.
    pub fn depends_transitively(&self, lib: &LibName, other: &LibName) -> bool {
        let mut pending: Vec<&LibName> = self.dependencies_of(lib).iter().collect();
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = pending.pop() {
            if current == other {
                return true;
            }
            if seen.insert(current) {
                pending.extend(self.dependencies_of(current));
            }
        }
        false
    }

    /// Number of active libs.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the app has no lib dependencies at all.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{LibSpec, RepoTarget};
    use crate::core::types::MountPoint;

    fn name(s: &str) -> LibName {
        LibName::new(s).unwrap()
    }

    fn lib(n: &str, depends: &[&str]) -> LibSpec {
        LibSpec {
            name: name(n),
            repo: RepoTarget::new(format!("/repos/{n}")),
            mount: MountPoint::new(format!("/libs/{n}")).unwrap(),
            assets: vec![],
            install: vec![],
            depends: depends.iter().map(|d| name(d)).collect(),
            test: None,
        }
    }

    fn app(libs: &[&str]) -> AppSpec {
        AppSpec {
            name: name("app"),
            libs: libs.iter().map(|l| name(l)).collect(),
            once: vec![],
            always: vec![],
        }
    }

    fn order_of(graph: &DependencyGraph) -> Vec<&str> {
        graph.order().iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn empty_app_resolves_empty() {
        let universe = SpecSet::new();
        let graph = DependencyGraph::resolve(&app(&[]), &universe).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn single_lib() {
        let universe = SpecSet::from_specs(vec![lib("a", &[])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["a"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["a"]);
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        let universe =
            SpecSet::from_specs(vec![lib("a", &[]), lib("b", &["a"]), lib("c", &["b"])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["c"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_emits_shared_dependency_once() {
        // app -> {y, z}; y -> x, z -> x
        let universe =
            SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"]), lib("z", &["x"])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["y", "z"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["x", "y", "z"]);
    }

    #[test]
    fn app_depending_on_x_and_y_where_y_needs_x() {
        // X before Y; X appears exactly once even though both the app and
        // Y require it.
        let universe = SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["x", "y"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["x", "y"]);
    }

    #[test]
    fn tie_break_is_declaration_order() {
        // p and q are unrelated; the app declares q first.
        let universe = SpecSet::from_specs(vec![lib("p", &[]), lib("q", &[])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["q", "p"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["q", "p"]);
    }

    #[test]
    fn depends_order_breaks_ties_within_a_lib() {
        let universe = SpecSet::from_specs(vec![
            lib("m", &[]),
            lib("n", &[]),
            lib("top", &["n", "m"]),
        ])
        .unwrap();
        let graph = DependencyGraph::resolve(&app(&["top"]), &universe).unwrap();
        assert_eq!(order_of(&graph), vec!["n", "m", "top"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let universe = SpecSet::from_specs(vec![
            lib("a", &[]),
            lib("b", &["a"]),
            lib("c", &["a"]),
            lib("d", &["b", "c"]),
        ])
        .unwrap();
        let first = DependencyGraph::resolve(&app(&["d"]), &universe).unwrap();
        let second = DependencyGraph::resolve(&app(&["d"]), &universe).unwrap();
        assert_eq!(first.order(), second.order());
    }

    #[test]
    fn self_cycle_detected() {
        let universe = SpecSet::from_specs(vec![lib("a", &["a"])]).unwrap();
        let err = DependencyGraph::resolve(&app(&["a"]), &universe).unwrap_err();
        match err {
            GraphError::CyclicDependency { members } => {
                assert!(members.contains(&name("a")));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn two_node_cycle_names_both_members() {
        let universe = SpecSet::from_specs(vec![lib("a", &["b"]), lib("b", &["a"])]).unwrap();
        let err = DependencyGraph::resolve(&app(&["a"]), &universe).unwrap_err();
        match err {
            GraphError::CyclicDependency { members } => {
                assert!(members.contains(&name("a")));
                assert!(members.contains(&name("b")));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_deep_in_the_graph_is_found() {
        let universe = SpecSet::from_specs(vec![
            lib("root", &["mid"]),
            lib("mid", &["deep"]),
            lib("deep", &["mid"]),
        ])
        .unwrap();
        let err = DependencyGraph::resolve(&app(&["root"]), &universe).unwrap_err();
        match err {
            GraphError::CyclicDependency { members } => {
                assert!(members.contains(&name("mid")));
                assert!(members.contains(&name("deep")));
                assert!(!members.contains(&name("root")));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_direct_reference_names_the_app() {
        let universe = SpecSet::new();
        let err = DependencyGraph::resolve(&app(&["ghost"]), &universe).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownLibReference {
                name: name("ghost"),
                referenced_by: name("app"),
            }
        );
    }

    #[test]
    fn unknown_transitive_reference_names_the_referrer() {
        let universe = SpecSet::from_specs(vec![lib("a", &["ghost"])]).unwrap();
        let err = DependencyGraph::resolve(&app(&["a"]), &universe).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownLibReference {
                name: name("ghost"),
                referenced_by: name("a"),
            }
        );
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        // An explicit traversal stack has no recursion limit to hit.
        let mut specs = vec![lib("lib0", &[])];
        for i in 1..2000 {
            specs.push(lib(&format!("lib{i}"), &[&format!("lib{}", i - 1)]));
        }
        let universe = SpecSet::from_specs(specs).unwrap();
        let graph = DependencyGraph::resolve(&app(&["lib1999"]), &universe).unwrap();
        assert_eq!(graph.len(), 2000);
        assert_eq!(graph.order()[0].as_str(), "lib0");
        assert_eq!(graph.order()[1999].as_str(), "lib1999");
    }

    #[test]
    fn dependents_and_transitive_queries() {
        let universe =
            SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"]), lib("z", &["y"])]).unwrap();
        let graph = DependencyGraph::resolve(&app(&["z"]), &universe).unwrap();

        let dependents: Vec<&str> = graph
            .dependents_of(&name("x"))
            .into_iter()
            .map(|l| l.as_str())
            .collect();
        assert_eq!(dependents, vec!["y"]);

        assert!(graph.depends_transitively(&name("z"), &name("x")));
        assert!(!graph.depends_transitively(&name("x"), &name("z")));
    }
}
