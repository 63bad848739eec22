use crate::util::slugify;

/// Metadata nodes annotate content nodes and are never expandable themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Tag,
    Hypernym,
    Hyponym,
}

impl MetaKind {
    pub const ALL: [MetaKind; 3] = [MetaKind::Tag, MetaKind::Hypernym, MetaKind::Hyponym];

    pub fn label(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Hypernym => "hypernym",
            Self::Hyponym => "hyponym",
        }
    }

    pub fn from_type(node_type: &str) -> Option<Self> {
        match node_type {
            "tag" => Some(Self::Tag),
            "hypernym" => Some(Self::Hypernym),
            "hyponym" => Some(Self::Hyponym),
            _ => None,
        }
    }

    fn from_id(id: &str) -> Option<Self> {
        for kind in Self::ALL {
            let label = kind.label();
            if id.len() > label.len()
                && id.starts_with(label)
                && matches!(id.as_bytes()[label.len()], b':' | b'_')
            {
                return Some(kind);
            }
        }
        None
    }

    pub fn canonical_id(self, title: &str) -> String {
        format!("{}:{}", self.label(), slugify(title))
    }
}

/// Classifies a node as metadata by declared type or, failing that, by the
/// `tag:`/`tag_`/`hypernym:`/... id prefix convention used by the backend.
pub fn classify(id: &str, node_type: &str) -> Option<MetaKind> {
    if node_type == "metadata" {
        return MetaKind::from_id(id).or(Some(MetaKind::Tag));
    }
    MetaKind::from_type(node_type).or_else(|| MetaKind::from_id(id))
}

pub fn is_metadata_id(id: &str) -> bool {
    MetaKind::from_id(id).is_some()
}
