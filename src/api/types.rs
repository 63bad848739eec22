use serde::Deserialize;

/// One node as returned by the search endpoint, possibly carrying nested
/// children up to the requested depth and a metadata field set.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RemoteNode {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub children: Vec<RemoteNode>,
    #[serde(default)]
    pub metadata: Option<MetaFields>,
    // Older payloads carry these flat instead of under `metadata`.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hypernyms: Vec<String>,
    #[serde(default)]
    pub hyponyms: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MetaFields {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hypernyms: Vec<String>,
    #[serde(default)]
    pub hyponyms: Vec<String>,
}

impl RemoteNode {
    pub fn tags(&self) -> &[String] {
        match &self.metadata {
            Some(meta) if !meta.tags.is_empty() => &meta.tags,
            _ => &self.tags,
        }
    }

    pub fn hypernyms(&self) -> &[String] {
        match &self.metadata {
            Some(meta) if !meta.hypernyms.is_empty() => &meta.hypernyms,
            _ => &self.hypernyms,
        }
    }

    pub fn hyponyms(&self) -> &[String] {
        match &self.metadata {
            Some(meta) if !meta.hyponyms.is_empty() => &meta.hyponyms,
            _ => &self.hyponyms,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, alias = "results")]
    pub nodes: Vec<RemoteNode>,
}

#[derive(Clone, Debug, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub id: Option<String>,
    pub depth: Option<u32>,
    pub field_set: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub direction: Option<String>,
}

impl SearchParams {
    pub fn initial(query: &str, depth: u32, limit: u32) -> Self {
        Self {
            query: Some(query.to_owned()),
            depth: Some(depth),
            field_set: Some("metadata".to_owned()),
            page: Some(1),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn children_of(id: &str) -> Self {
        Self {
            id: Some(id.to_owned()),
            depth: Some(1),
            field_set: Some("metadata".to_owned()),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(value) = &self.query {
            query.push(("query".to_owned(), value.clone()));
        }
        if let Some(value) = &self.id {
            query.push(("id".to_owned(), value.clone()));
        }
        if let Some(value) = self.depth {
            query.push(("depth".to_owned(), value.to_string()));
        }
        if let Some(value) = &self.field_set {
            query.push(("field_set".to_owned(), value.clone()));
        }
        if let Some(value) = self.page {
            query.push(("page".to_owned(), value.to_string()));
        }
        if let Some(value) = self.limit {
            query.push(("limit".to_owned(), value.to_string()));
        }
        if let Some(value) = &self.direction {
            query.push(("direction".to_owned(), value.clone()));
        }
        query
    }
}

/// Graph files loaded in offline mode: a node forest plus explicit links
/// whose endpoints may be bare ids or embedded node objects.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<RemoteNode>,
    #[serde(default)]
    pub links: Vec<RawLink>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawLink {
    pub source: LinkEnd,
    pub target: LinkEnd,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum LinkEnd {
    Id(String),
    Node { id: String },
}

impl LinkEnd {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Node { id } => id,
        }
    }
}
