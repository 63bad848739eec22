use std::collections::{HashMap, HashSet};

use crate::api::{GraphPayload, RemoteNode};

use super::meta::{self, MetaKind};

#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub id: String,
    pub title: String,
    pub node_type: String,
    pub summary: Option<String>,
    pub index: Option<i64>,
    pub created_at: Option<String>,
}

impl NodeRecord {
    pub fn is_meta(&self) -> bool {
        meta::classify(&self.id, &self.node_type).is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: String,
    pub target: String,
}

/// Accumulated graph state. Nodes and links only ever grow; visibility is a
/// separate concern layered on top by the view model.
#[derive(Default)]
pub struct GraphStore {
    nodes: HashMap<String, NodeRecord>,
    links: Vec<Link>,
    link_keys: HashSet<(String, String)>,
    fetched: HashSet<String>,
    in_flight: HashSet<String>,
    meta_ids: HashMap<String, String>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn is_meta(&self, id: &str) -> bool {
        match self.nodes.get(id) {
            Some(record) => record.is_meta(),
            None => meta::is_metadata_id(id),
        }
    }

    /// Whether the node has at least one known content child. Metadata
    /// attachments do not count.
    pub fn has_children(&self, id: &str) -> bool {
        self.links
            .iter()
            .any(|link| link.source == id && !self.is_meta(&link.target))
    }

    pub fn has_fetched(&self, id: &str) -> bool {
        self.fetched.contains(id)
    }

    /// Claims a node for fetching. Returns false when the children are
    /// already known or another fetch for the same node is in flight.
    pub fn begin_fetch(&mut self, id: &str) -> bool {
        if self.fetched.contains(id) || self.in_flight.contains(id) {
            return false;
        }
        self.in_flight.insert(id.to_owned());
        true
    }

    /// Folds a child-fetch result into the store. `None` means the fetch
    /// failed; the claim is released so a later attempt can retry, and the
    /// node is not marked fetched.
    pub fn complete_fetch(&mut self, parent_id: &str, result: Option<&[RemoteNode]>) {
        self.in_flight.remove(parent_id);
        let Some(nodes) = result else {
            return;
        };

        for node in nodes {
            if node.id == parent_id {
                self.merge_node(node, None);
            } else {
                self.merge_node(node, Some(parent_id));
            }
        }
        self.fetched.insert(parent_id.to_owned());
    }

    /// Merges an initial search result: a forest with children nested to the
    /// requested depth.
    pub fn merge_roots(&mut self, nodes: &[RemoteNode]) {
        for node in nodes {
            self.merge_node(node, None);
        }
    }

    /// Loads a complete graph file (offline mode). Everything is local, so
    /// every node counts as fetched.
    pub fn load_payload(&mut self, payload: &GraphPayload) {
        for node in &payload.nodes {
            self.merge_node(node, None);
        }
        for link in &payload.links {
            let source = self.resolve_id(link.source.id());
            let target = self.resolve_id(link.target.id());
            self.push_link(&source, &target);
        }
        let ids = self.nodes.keys().cloned().collect::<Vec<_>>();
        self.fetched.extend(ids);
    }

    /// Content child map and roots, ignoring metadata nodes entirely.
    /// Children and roots are sorted for deterministic traversal.
    pub fn content_tree(&self) -> (HashMap<String, Vec<String>>, Vec<String>) {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut targets = HashSet::new();

        for link in &self.links {
            if self.is_meta(&link.source) || self.is_meta(&link.target) {
                continue;
            }
            children
                .entry(link.source.clone())
                .or_default()
                .push(link.target.clone());
            targets.insert(link.target.as_str());
        }

        for list in children.values_mut() {
            list.sort();
            list.dedup();
        }

        let mut roots = self
            .nodes
            .values()
            .filter(|record| !record.is_meta() && !targets.contains(record.id.as_str()))
            .map(|record| record.id.clone())
            .collect::<Vec<_>>();
        roots.sort();

        (children, roots)
    }

    fn merge_node(&mut self, node: &RemoteNode, parent: Option<&str>) {
        let title = node
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| node.id.clone());
        let node_type = node.node_type.clone().unwrap_or_else(|| "node".to_owned());

        let id = match meta::classify(&node.id, &node_type) {
            Some(kind) => self.register_meta(kind, &title, Some(&node.id)),
            None => node.id.clone(),
        };

        self.upsert(NodeRecord {
            id: id.clone(),
            title,
            node_type,
            summary: node.summary.clone(),
            index: node.index,
            created_at: node.created_at.clone(),
        });

        if let Some(parent) = parent {
            self.push_link(parent, &id);
        } else if let Some(parent_id) = &node.parent_id
            && self.nodes.contains_key(parent_id)
        {
            self.push_link(parent_id, &id);
        }

        self.attach_meta_lists(&id, node);

        if !node.children.is_empty() {
            self.fetched.insert(id.clone());
        }
        for child in &node.children {
            self.merge_node(child, Some(&id));
        }
    }

    fn attach_meta_lists(&mut self, owner: &str, node: &RemoteNode) {
        let lists = [
            (MetaKind::Tag, node.tags()),
            (MetaKind::Hypernym, node.hypernyms()),
            (MetaKind::Hyponym, node.hyponyms()),
        ];
        for (kind, values) in lists {
            for value in values {
                let meta_id = self.register_meta(kind, value, None);
                self.upsert(NodeRecord {
                    id: meta_id.clone(),
                    title: value.clone(),
                    node_type: kind.label().to_owned(),
                    summary: None,
                    index: None,
                    created_at: None,
                });
                self.push_link(owner, &meta_id);
            }
        }
    }

    /// Same (kind, title) always resolves to one node id, so a tag shared by
    /// many documents becomes a single shared node.
    fn register_meta(&mut self, kind: MetaKind, title: &str, real_id: Option<&str>) -> String {
        let key = kind.canonical_id(title);
        if let Some(existing) = self.meta_ids.get(&key) {
            return existing.clone();
        }
        let id = real_id.map(str::to_owned).unwrap_or_else(|| key.clone());
        self.meta_ids.insert(key, id.clone());
        id
    }

    // Link endpoints from graph files may use the canonical key form.
    fn resolve_id(&self, id: &str) -> String {
        self.meta_ids
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_owned())
    }

    fn upsert(&mut self, record: NodeRecord) {
        match self.nodes.get_mut(&record.id) {
            Some(existing) => {
                if existing.title == existing.id && record.title != record.id {
                    existing.title = record.title;
                }
                if existing.summary.is_none() {
                    existing.summary = record.summary;
                }
                if existing.index.is_none() {
                    existing.index = record.index;
                }
                if existing.created_at.is_none() {
                    existing.created_at = record.created_at;
                }
            }
            None => {
                self.nodes.insert(record.id.clone(), record);
            }
        }
    }

    fn push_link(&mut self, source: &str, target: &str) {
        if source == target {
            return;
        }
        let key = (source.to_owned(), target.to_owned());
        if self.link_keys.contains(&key) {
            return;
        }
        self.link_keys.insert(key);
        self.links.push(Link {
            source: source.to_owned(),
            target: target.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str) -> RemoteNode {
        RemoteNode {
            id: id.to_owned(),
            title: Some(title.to_owned()),
            node_type: Some("document".to_owned()),
            ..RemoteNode::default()
        }
    }

    #[test]
    fn shared_tag_canonicalizes_to_one_node() {
        let mut store = GraphStore::new();
        let mut a = doc("a", "Alpha");
        a.tags = vec!["Machine Learning".to_owned()];
        let mut b = doc("b", "Beta");
        b.tags = vec!["machine learning".to_owned()];

        store.merge_roots(&[a, b]);

        let tag_nodes = store
            .nodes()
            .filter(|record| record.node_type == "tag")
            .count();
        assert_eq!(tag_nodes, 1);
        assert!(store.node("tag:machine-learning").is_some());
        let tag_links = store
            .links()
            .iter()
            .filter(|link| link.target == "tag:machine-learning")
            .count();
        assert_eq!(tag_links, 2);
    }

    #[test]
    fn real_meta_id_wins_registry_slot() {
        let mut store = GraphStore::new();
        let mut a = doc("a", "Alpha");
        a.children = vec![RemoteNode {
            id: "tag_7-rust".to_owned(),
            title: Some("Rust".to_owned()),
            node_type: Some("tag".to_owned()),
            ..RemoteNode::default()
        }];
        let mut b = doc("b", "Beta");
        b.tags = vec!["Rust".to_owned()];

        store.merge_roots(&[a, b]);

        // The second document's plain "Rust" tag resolves to the real id.
        assert!(store.node("tag_7-rust").is_some());
        assert!(store.node("tag:rust").is_none());
        assert!(
            store
                .links()
                .contains(&Link { source: "b".to_owned(), target: "tag_7-rust".to_owned() })
        );
    }

    #[test]
    fn metadata_attachments_do_not_count_as_children() {
        let mut store = GraphStore::new();
        let mut a = doc("a", "Alpha");
        a.tags = vec!["Rust".to_owned()];
        store.merge_roots(&[a]);
        assert!(!store.has_children("a"));

        store.begin_fetch("a");
        store.complete_fetch("a", Some(&[doc("b", "Beta")]));
        assert!(store.has_children("a"));
    }

    #[test]
    fn begin_fetch_claims_once() {
        let mut store = GraphStore::new();
        store.merge_roots(&[doc("a", "Alpha")]);

        assert!(store.begin_fetch("a"));
        assert!(!store.begin_fetch("a"));

        store.complete_fetch("a", Some(&[doc("b", "Beta")]));
        assert!(store.has_fetched("a"));
        assert!(!store.begin_fetch("a"));
    }

    #[test]
    fn failed_fetch_releases_claim_without_marking_fetched() {
        let mut store = GraphStore::new();
        store.merge_roots(&[doc("a", "Alpha")]);

        assert!(store.begin_fetch("a"));
        store.complete_fetch("a", None);

        assert!(!store.has_fetched("a"));
        assert!(store.begin_fetch("a"));
    }

    #[test]
    fn fetched_set_only_grows() {
        let mut store = GraphStore::new();
        let mut root = doc("a", "Alpha");
        root.children = vec![doc("b", "Beta")];
        store.merge_roots(&[root]);
        assert!(store.has_fetched("a"));

        store.begin_fetch("b");
        store.complete_fetch("b", Some(&[doc("c", "Gamma")]));
        assert!(store.has_fetched("a"));
        assert!(store.has_fetched("b"));
    }

    #[test]
    fn child_fetch_result_links_under_parent() {
        let mut store = GraphStore::new();
        store.merge_roots(&[doc("a", "Alpha")]);
        store.begin_fetch("a");

        // Result shaped as the parent node carrying its children.
        let mut parent = doc("a", "Alpha");
        parent.children = vec![doc("b", "Beta"), doc("c", "Gamma")];
        store.complete_fetch("a", Some(&[parent]));

        let (children, roots) = store.content_tree();
        assert_eq!(roots, vec!["a".to_owned()]);
        assert_eq!(
            children.get("a"),
            Some(&vec!["b".to_owned(), "c".to_owned()])
        );
    }

    #[test]
    fn content_tree_ignores_metadata() {
        let mut store = GraphStore::new();
        let mut root = doc("a", "Alpha");
        root.tags = vec!["Rust".to_owned()];
        root.children = vec![doc("b", "Beta")];
        store.merge_roots(&[root]);

        let (children, roots) = store.content_tree();
        assert_eq!(roots, vec!["a".to_owned()]);
        assert_eq!(children.get("a"), Some(&vec!["b".to_owned()]));
        assert!(!roots.contains(&"tag:rust".to_owned()));
    }

    #[test]
    fn payload_load_marks_everything_fetched() {
        let mut store = GraphStore::new();
        let payload: GraphPayload = serde_json::from_str(
            r#"{"nodes":[{"id":"a","title":"Alpha","type":"document"},
                         {"id":"b","title":"Beta","type":"document"}],
                "links":[{"source":"a","target":"b"}]}"#,
        )
        .expect("valid payload");

        store.load_payload(&payload);

        assert!(store.has_fetched("a"));
        assert!(store.has_fetched("b"));
        assert_eq!(store.links().len(), 1);
    }

    #[test]
    fn duplicate_and_self_links_are_dropped() {
        let mut store = GraphStore::new();
        let payload: GraphPayload = serde_json::from_str(
            r#"{"nodes":[{"id":"a"},{"id":"b"}],
                "links":[{"source":"a","target":"b"},
                         {"source":"a","target":"b"},
                         {"source":"a","target":"a"}]}"#,
        )
        .expect("valid payload");

        store.load_payload(&payload);
        assert_eq!(store.links().len(), 1);
    }
}
