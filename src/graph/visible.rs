use std::collections::{HashSet, VecDeque};

use super::store::GraphStore;

/// Computes the set of visible node ids: content roots are always shown,
/// content children only under an expanded visible parent, and metadata
/// nodes whenever at least one attached content node is visible. Nodes
/// mid-way through a collapse fade stay visible until the fade commits.
pub fn visible_nodes(
    store: &GraphStore,
    expanded: &HashSet<String>,
    exiting: &HashSet<String>,
) -> HashSet<String> {
    let (children, roots) = store.content_tree();
    let mut visible = HashSet::new();
    let mut queue = VecDeque::new();

    for root in roots {
        if expanded.contains(&root) {
            queue.push_back(root.clone());
        }
        visible.insert(root);
    }

    while let Some(current) = queue.pop_front() {
        let Some(kids) = children.get(&current) else {
            continue;
        };
        for kid in kids {
            if visible.insert(kid.clone()) && expanded.contains(kid) {
                queue.push_back(kid.clone());
            }
        }
    }

    for link in store.links() {
        if store.is_meta(&link.target)
            && !store.is_meta(&link.source)
            && visible.contains(&link.source)
        {
            visible.insert(link.target.clone());
        } else if store.is_meta(&link.source)
            && !store.is_meta(&link.target)
            && visible.contains(&link.target)
        {
            visible.insert(link.source.clone());
        }
    }

    for id in exiting {
        visible.insert(id.clone());
    }

    visible
}

pub fn visible_links(store: &GraphStore, visible: &HashSet<String>) -> Vec<(String, String)> {
    store
        .links()
        .iter()
        .filter(|link| visible.contains(&link.source) && visible.contains(&link.target))
        .map(|link| (link.source.clone(), link.target.clone()))
        .collect()
}
