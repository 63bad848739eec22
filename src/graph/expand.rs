use std::collections::{HashMap, HashSet, VecDeque};

use super::store::GraphStore;

/// One level of expansion: the frontier nodes to mark expanded, and the
/// subset whose children must be fetched first.
#[derive(Clone, Debug, Default)]
pub struct ExpansionPlan {
    pub frontier: Vec<String>,
    pub to_fetch: Vec<String>,
}

impl ExpansionPlan {
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }
}

/// Picks the next expansion frontier. A target that names a visible root
/// expands that root alone; any other target falls through to global mode,
/// where the frontier is every visible, unexpanded node with at least one
/// known child at the shallowest depth where any such node exists, so the
/// tree deepens evenly one level per invocation. Childless nodes never
/// enter the frontier.
pub fn plan_expansion(
    store: &GraphStore,
    visible: &HashSet<String>,
    expanded: &HashSet<String>,
    target: Option<&str>,
) -> ExpansionPlan {
    let (children, roots) = store.content_tree();

    if let Some(target) = target
        && roots.iter().any(|root| root == target)
        && visible.contains(target)
    {
        if expanded.contains(target) {
            return ExpansionPlan::default();
        }
        return plan_for(store, vec![target.to_owned()]);
    }

    let depths = content_depths(&children, &roots);

    let mut frontier_depth = None;
    let mut frontier = Vec::new();

    let mut ordered = depths.into_iter().collect::<Vec<_>>();
    ordered.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    for (id, depth) in ordered {
        if let Some(min) = frontier_depth
            && depth > min
        {
            break;
        }
        if !visible.contains(&id) || expanded.contains(&id) {
            continue;
        }
        if !children.get(&id).is_some_and(|kids| !kids.is_empty()) {
            continue;
        }
        frontier_depth = Some(depth);
        frontier.push(id);
    }

    plan_for(store, frontier)
}

fn plan_for(store: &GraphStore, frontier: Vec<String>) -> ExpansionPlan {
    let to_fetch = frontier
        .iter()
        .filter(|id| !store.has_fetched(id))
        .cloned()
        .collect();
    ExpansionPlan { frontier, to_fetch }
}

/// Minimal depth of every content node reachable from the roots.
fn content_depths(
    children: &HashMap<String, Vec<String>>,
    roots: &[String],
) -> HashMap<String, u32> {
    let mut depths = HashMap::new();
    let mut queue = VecDeque::new();

    for root in roots {
        depths.insert(root.clone(), 0);
        queue.push_back(root.clone());
    }

    while let Some(current) = queue.pop_front() {
        let depth = depths[&current];
        let Some(kids) = children.get(&current) else {
            continue;
        };
        for kid in kids {
            if !depths.contains_key(kid) {
                depths.insert(kid.clone(), depth + 1);
                queue.push_back(kid.clone());
            }
        }
    }

    depths
}

#[cfg(test)]
mod tests {
    use crate::api::RemoteNode;
    use crate::graph::visible::visible_nodes;

    use super::*;

    fn node(id: &str, children: Vec<RemoteNode>) -> RemoteNode {
        RemoteNode {
            id: id.to_owned(),
            title: Some(id.to_uppercase()),
            node_type: Some("document".to_owned()),
            children,
            ..RemoteNode::default()
        }
    }

    /// a -> {b, c}, b -> {d}; c and d are childless.
    fn scenario_store() -> GraphStore {
        let root = node("a", vec![node("b", vec![node("d", vec![])]), node("c", vec![])]);
        let mut store = GraphStore::new();
        store.merge_roots(&[root]);
        store
    }

    #[test]
    fn frontier_deepens_one_level_at_a_time() {
        let store = scenario_store();
        let mut expanded = HashSet::new();

        let visible = visible_nodes(&store, &expanded, &HashSet::new());
        let first = plan_expansion(&store, &visible, &expanded, None);
        assert_eq!(first.frontier, vec!["a".to_owned()]);
        assert!(first.to_fetch.is_empty());

        expanded.insert("a".to_owned());
        let visible = visible_nodes(&store, &expanded, &HashSet::new());
        let second = plan_expansion(&store, &visible, &expanded, None);
        assert_eq!(second.frontier, vec!["b".to_owned()]);

        expanded.insert("b".to_owned());
        let visible = visible_nodes(&store, &expanded, &HashSet::new());
        let third = plan_expansion(&store, &visible, &expanded, None);
        assert!(third.is_empty());
    }

    #[test]
    fn childless_nodes_never_enter_the_frontier() {
        let store = scenario_store();
        let expanded = HashSet::from(["a".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        // b and c sit at the same depth; only b has children, and c's
        // unfetched state does not make it a candidate.
        let plan = plan_expansion(&store, &visible, &expanded, None);
        assert_eq!(plan.frontier, vec!["b".to_owned()]);
        assert!(!store.has_fetched("c"));
    }

    #[test]
    fn frontier_nodes_without_a_fetch_are_fetch_targets() {
        // b arrives flat with a parent_id reference, so a gains a known
        // child without ever being marked fetched.
        let child = RemoteNode {
            parent_id: Some("a".to_owned()),
            ..node("b", vec![])
        };
        let mut store = GraphStore::new();
        store.merge_roots(&[node("a", vec![]), child]);

        let visible = visible_nodes(&store, &HashSet::new(), &HashSet::new());
        let plan = plan_expansion(&store, &visible, &HashSet::new(), None);

        assert_eq!(plan.frontier, vec!["a".to_owned()]);
        assert_eq!(plan.to_fetch, vec!["a".to_owned()]);
    }

    #[test]
    fn targeted_mode_expands_only_a_visible_root() {
        let store = scenario_store();
        let expanded = HashSet::new();
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        let plan = plan_expansion(&store, &visible, &expanded, Some("a"));
        assert_eq!(plan.frontier, vec!["a".to_owned()]);

        // An already-expanded root yields nothing.
        let expanded = HashSet::from(["a".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());
        assert!(plan_expansion(&store, &visible, &expanded, Some("a")).is_empty());
    }

    #[test]
    fn non_root_target_falls_back_to_the_global_frontier() {
        // Two roots; r1 is expanded, its child c1 is visible and has its
        // own children.
        let roots = vec![
            node("r1", vec![node("c1", vec![node("g1", vec![])])]),
            node("r2", vec![node("c2", vec![])]),
        ];
        let mut store = GraphStore::new();
        store.merge_roots(&roots);

        let expanded = HashSet::from(["r1".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        // Highlighting the mid-tree node must not shrink the expansion to
        // that single branch; the shallowest unexpanded root still wins.
        let plan = plan_expansion(&store, &visible, &expanded, Some("c1"));
        assert_eq!(plan.frontier, vec!["r2".to_owned()]);
    }

    #[test]
    fn known_leaves_never_enter_the_frontier() {
        let store = scenario_store();
        let expanded = HashSet::from(["a".to_owned(), "b".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        let plan = plan_expansion(&store, &visible, &expanded, None);
        assert!(plan.is_empty());
    }
}
