//! Route matching logic.
//!
//! # Responsibilities
//! - Walk a compiled tree one segment at a time
//! - Extract parameter values into variables
//! - Return the leaf or an explicit no-match
//!
//! # Design Decisions
//! - Literal child is tried first, the parameter child only as fallback
//! - No backtracking: once a segment is consumed the walk never revisits it
//! - Case-sensitive, whole-segment comparison
//! - A path ending on a non-terminal node is a no-match

use std::collections::HashMap;

use crate::routing::router::{CompiledNode, CompiledRouteTree};
use crate::routing::segment::split_path;

/// Successful match: the leaf plus extracted parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a, L> {
    pub leaf: &'a L,
    pub variables: HashMap<String, String>,
}

impl<L> CompiledRouteTree<L> {
    /// Match a path already split into segments.
    pub fn match_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<RouteMatch<'_, L>> {
        let mut node: &CompiledNode<L> = &self.root;
        let mut variables = HashMap::new();

        for segment in segments {
            let segment = segment.as_ref();
            node = match node.literals.get(segment) {
                Some(next) => next,
                None => {
                    let (name, next) = node.param.as_ref()?;
                    variables.insert(name.clone(), segment.to_string());
                    &**next
                }
            };
        }

        node.leaf.as_ref().map(|leaf| RouteMatch { leaf, variables })
    }

    /// Match a raw path such as `/user/7/message`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_, L>> {
        self.match_segments(&split_path(path))
    }
}

#[cfg(test)]
mod tests {
    use crate::routing::{compile, RawRouteTree};

    fn tree() -> crate::routing::CompiledRouteTree<&'static str> {
        let mut raw = RawRouteTree::new();
        *raw.node_mut("/user/:id").leaf_mut() = Some("user");
        *raw.node_mut("/user/active").leaf_mut() = Some("active");
        *raw.node_mut("/user/:id/message").leaf_mut() = Some("message");
        compile(&raw).unwrap()
    }

    #[test]
    fn literal_wins_over_param() {
        let tree = tree();

        let m = tree.match_segments(&["user", "active"]).unwrap();
        assert_eq!(*m.leaf, "active");
        assert!(m.variables.is_empty());

        let m = tree.match_segments(&["user", "42"]).unwrap();
        assert_eq!(*m.leaf, "user");
        assert_eq!(m.variables.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn node_can_be_prefix_and_endpoint() {
        let tree = tree();
        let m = tree.match_path("/user/7/message").unwrap();
        assert_eq!(*m.leaf, "message");
        assert_eq!(m.variables["id"], "7");
    }

    #[test]
    fn unmatched_paths() {
        let mut raw = RawRouteTree::new();
        *raw.node_mut("/user/:id").leaf_mut() = Some("user");
        let tree = compile(&raw).unwrap();

        assert!(tree.match_segments(&["user", "42", "extra"]).is_none());
        // Non-terminal node.
        assert!(tree.match_segments(&["user"]).is_none());
        assert!(tree.match_segments(&["other"]).is_none());
    }

    #[test]
    fn separators_and_case() {
        let tree = tree();
        assert_eq!(
            tree.match_path("/user/9/message/"),
            tree.match_path("user/9/message")
        );
        assert!(tree.match_path("/User/9").is_none());
    }

    #[test]
    fn deterministic_across_compilations() {
        let a = tree();
        let b = tree();
        for path in ["/user/active", "/user/1", "/user/1/message", "/nope"] {
            assert_eq!(a.match_path(path), b.match_path(path));
            assert_eq!(a.match_path(path), a.match_path(path));
        }
    }

    #[test]
    fn root_leaf() {
        let raw = RawRouteTree::leaf("root");
        let tree = compile(&raw).unwrap();
        assert_eq!(*tree.match_path("/").unwrap().leaf, "root");
    }
}
