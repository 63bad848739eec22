use std::collections::{HashSet, VecDeque};

use super::store::GraphStore;

/// Fade-out duration for a collapsing node, after its stagger delay.
pub const FADE_MS: u64 = 180;
/// Delay step between consecutive collapsing nodes.
pub const STAGGER_MS: u64 = 15;
/// Stagger indices wrap so large collapses still finish quickly.
pub const STAGGER_GROUP: usize = 10;
/// Commit happens this long after the last fade can have finished.
pub const COMMIT_GRACE_MS: u64 = 10;
/// The viewport refits this long after a collapse starts.
pub const COLLAPSE_REFIT_MS: u64 = 350;

pub fn fade_delay_ms(index: usize) -> u64 {
    STAGGER_MS * (index % STAGGER_GROUP) as u64
}

/// Time from fade start until the structural change may be committed.
pub fn fade_window_ms(count: usize) -> u64 {
    if count == 0 {
        return 0;
    }
    STAGGER_MS * (count.min(STAGGER_GROUP) - 1) as u64 + FADE_MS + COMMIT_GRACE_MS
}

/// Collapse targets: visible expanded nodes with no visible expanded content
/// child. Collapsing these retracts exactly the deepest expanded level.
pub fn deepest_expanded(
    store: &GraphStore,
    visible: &HashSet<String>,
    expanded: &HashSet<String>,
) -> Vec<String> {
    let mut targets = Vec::new();

    for record in store.nodes() {
        let id = &record.id;
        if record.is_meta() || !visible.contains(id) || !expanded.contains(id) {
            continue;
        }
        let has_expanded_child = store.links().iter().any(|link| {
            link.source == *id
                && !store.is_meta(&link.target)
                && visible.contains(&link.target)
                && expanded.contains(&link.target)
        });
        if !has_expanded_child {
            targets.push(id.clone());
        }
    }

    targets.sort();
    targets
}

/// Everything that disappears when `root` collapses: its visible content
/// descendants plus any visible non-shared metadata hanging off them.
/// Sorted lexicographically so stagger delays are assigned the same way
/// every time.
pub fn descendants_of(
    store: &GraphStore,
    root: &str,
    visible: &HashSet<String>,
) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([root.to_owned()]);
    let mut queue = VecDeque::from([root.to_owned()]);

    while let Some(current) = queue.pop_front() {
        for link in store.links() {
            let neighbor = if link.source == current {
                &link.target
            } else if link.target == current {
                &link.source
            } else {
                continue;
            };

            if seen.contains(neighbor) || !visible.contains(neighbor) {
                continue;
            }

            if store.is_meta(neighbor) {
                if !is_shared_meta(store, neighbor) {
                    seen.insert(neighbor.clone());
                    found.push(neighbor.clone());
                }
            } else if link.source == current {
                // Content descendants follow link direction only.
                seen.insert(neighbor.clone());
                found.push(neighbor.clone());
                queue.push_back(neighbor.clone());
            }
        }
    }

    found.sort();
    found
}

/// A metadata node is shared when more than one distinct content node links
/// to it anywhere in the graph, visible or not.
pub fn is_shared_meta(store: &GraphStore, meta_id: &str) -> bool {
    let mut owners = HashSet::new();
    for link in store.links() {
        let other = if link.source == meta_id {
            &link.target
        } else if link.target == meta_id {
            &link.source
        } else {
            continue;
        };
        if !store.is_meta(other) {
            owners.insert(other.as_str());
            if owners.len() > 1 {
                return true;
            }
        }
    }
    false
}

/// Edges to drop from the scene as soon as a collapse starts: edges internal
/// to the vanishing set, and edges from it to non-shared metadata. Edges to
/// outside content nodes survive until the visibility recompute.
pub fn edges_to_remove(
    store: &GraphStore,
    descendants: &HashSet<String>,
) -> Vec<(String, String)> {
    let mut removed = Vec::new();

    for link in store.links() {
        let source_in = descendants.contains(&link.source);
        let target_in = descendants.contains(&link.target);
        if !source_in && !target_in {
            continue;
        }

        if source_in && target_in {
            removed.push((link.source.clone(), link.target.clone()));
            continue;
        }

        let other = if source_in { &link.target } else { &link.source };
        if store.is_meta(other) && !is_shared_meta(store, other) {
            removed.push((link.source.clone(), link.target.clone()));
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use crate::api::RemoteNode;
    use crate::graph::visible::visible_nodes;

    use super::*;

    fn node(id: &str, tags: Vec<&str>, children: Vec<RemoteNode>) -> RemoteNode {
        RemoteNode {
            id: id.to_owned(),
            title: Some(id.to_uppercase()),
            node_type: Some("document".to_owned()),
            tags: tags.into_iter().map(str::to_owned).collect(),
            children,
            ..RemoteNode::default()
        }
    }

    /// a -> {b, c}, b -> {d}. b carries a unique tag, b and c share one.
    fn store_with_tree() -> GraphStore {
        let root = node(
            "a",
            vec![],
            vec![
                node("b", vec!["Unique", "Shared"], vec![node("d", vec![], vec![])]),
                node("c", vec!["Shared"], vec![]),
            ],
        );
        let mut store = GraphStore::new();
        store.merge_roots(&[root]);
        store
    }

    #[test]
    fn deepest_expanded_skips_nodes_with_expanded_children() {
        let store = store_with_tree();
        let expanded = HashSet::from(["a".to_owned(), "b".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        assert_eq!(deepest_expanded(&store, &visible, &expanded), vec!["b".to_owned()]);

        let expanded = HashSet::from(["a".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());
        assert_eq!(deepest_expanded(&store, &visible, &expanded), vec!["a".to_owned()]);
    }

    #[test]
    fn descendants_include_non_shared_metadata_only() {
        let store = store_with_tree();
        let expanded = HashSet::from(["a".to_owned(), "b".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        let descendants = descendants_of(&store, "b", &visible);
        assert!(descendants.contains(&"d".to_owned()));
        assert!(descendants.contains(&"tag:unique".to_owned()));
        assert!(!descendants.contains(&"tag:shared".to_owned()));
        assert!(!descendants.contains(&"b".to_owned()));
    }

    #[test]
    fn descendants_are_sorted_for_the_fade_stagger() {
        let store = store_with_tree();
        let expanded = HashSet::from(["a".to_owned(), "b".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        // Stagger delays follow lexicographic id order, not discovery or
        // depth order.
        let descendants = descendants_of(&store, "a", &visible);
        assert_eq!(
            descendants,
            vec![
                "b".to_owned(),
                "c".to_owned(),
                "d".to_owned(),
                "tag:unique".to_owned(),
            ]
        );
    }

    #[test]
    fn shared_metadata_detection_counts_distinct_owners() {
        let store = store_with_tree();
        assert!(is_shared_meta(&store, "tag:shared"));
        assert!(!is_shared_meta(&store, "tag:unique"));
    }

    #[test]
    fn shared_metadata_edges_survive_collapse() {
        let store = store_with_tree();
        let expanded = HashSet::from(["a".to_owned(), "b".to_owned()]);
        let visible = visible_nodes(&store, &expanded, &HashSet::new());

        let descendants: HashSet<String> =
            descendants_of(&store, "b", &visible).into_iter().collect();
        let removed = edges_to_remove(&store, &descendants);

        assert!(removed.contains(&("b".to_owned(), "tag:unique".to_owned())));
        assert!(!removed.contains(&("b".to_owned(), "tag:shared".to_owned())));
        assert!(!removed.contains(&("c".to_owned(), "tag:shared".to_owned())));
        // Edge from the collapsing root to a vanishing child goes away with
        // the visibility recompute, not here.
        assert!(!removed.contains(&("a".to_owned(), "b".to_owned())));
    }

    #[test]
    fn fade_timing_matches_stagger_schedule() {
        assert_eq!(fade_delay_ms(0), 0);
        assert_eq!(fade_delay_ms(3), 45);
        assert_eq!(fade_delay_ms(12), 30);

        assert_eq!(fade_window_ms(0), 0);
        assert_eq!(fade_window_ms(1), 190);
        assert_eq!(fade_window_ms(5), 250);
        assert_eq!(fade_window_ms(25), 325);
    }
}
