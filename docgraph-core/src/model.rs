//! The property-graph model shared by the walkers and the Cypher compiler.

use crate::error::ModelError;
use crate::ids::{Id, IdSource};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Null,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Number => "Number",
            ScalarType::Boolean => "Boolean",
            ScalarType::Null => "Null",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    /// An HTML element. Its attributes are also emitted as separate
    /// [`NodeKind::Attribute`] nodes.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Attribute {
        name: String,
        value: String,
    },
    Text {
        content: String,
    },
    /// JSON object marker.
    Record,
    /// JSON object key.
    Field {
        name: String,
    },
    /// JSON array marker.
    List,
    Scalar {
        scalar_type: ScalarType,
        content: String,
    },
    /// A URL seen in recorded traffic.
    Endpoint {
        url: String,
        path: String,
        method: String,
        extension: Option<String>,
        data_type: Option<String>,
    },
    Domain {
        host: String,
    },
    ResponseType {
        data_type: String,
    },
    Extension {
        extension: String,
    },
}

impl NodeKind {
    /// The primary store label of this kind.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Element { .. } => "Element",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Text { .. } => "Text",
            NodeKind::Record => "Record",
            NodeKind::Field { .. } => "Field",
            NodeKind::List => "List",
            NodeKind::Scalar { .. } => "Scalar",
            NodeKind::Endpoint { .. } => "Endpoint",
            NodeKind::Domain { .. } => "Domain",
            NodeKind::ResponseType { .. } => "ResponseType",
            NodeKind::Extension { .. } => "Extension",
        }
    }

    /// Every primary label a node can carry.
    pub const LABELS: [&'static str; 11] = [
        "Element",
        "Attribute",
        "Text",
        "Record",
        "Field",
        "List",
        "Scalar",
        "Endpoint",
        "Domain",
        "ResponseType",
        "Extension",
    ];

    /// Raw values that may become secondary labels, before sanitizing.
    pub fn discriminators(&self) -> Vec<&str> {
        match self {
            NodeKind::Element { tag, .. } => vec![tag.as_str()],
            NodeKind::Attribute { name, .. } => vec![name.as_str()],
            NodeKind::Scalar { scalar_type, .. } => vec![scalar_type.as_str()],
            NodeKind::Endpoint {
                method, extension, ..
            } => {
                let mut found = vec![method.as_str()];
                if let Some(extension) = extension {
                    found.push(extension.as_str());
                }
                found
            }
            _ => Vec::new(),
        }
    }

    /// Nodes identified by a natural key rather than a minted identifier.
    /// The same key may legitimately be written by more than one run.
    pub fn is_natural_key(&self) -> bool {
        matches!(
            self,
            NodeKind::Domain { .. } | NodeKind::ResponseType { .. } | NodeKind::Extension { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Contains,
    HasAttribute,
    HasElement,
    HasField,
    HasValue,
    Precedes,
    HasEndpoint,
    HasResponse,
    HasExtension,
    HasHtml,
    HasJson,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Contains => "contains",
            LinkType::HasAttribute => "has_attribute",
            LinkType::HasElement => "has_element",
            LinkType::HasField => "has_field",
            LinkType::HasValue => "has_value",
            LinkType::Precedes => "precedes",
            LinkType::HasEndpoint => "has_endpoint",
            LinkType::HasResponse => "has_response",
            LinkType::HasExtension => "has_extension",
            LinkType::HasHtml => "has_html",
            LinkType::HasJson => "has_json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: Id,
    pub source: Id,
    pub target: Id,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

/// Nodes and links produced by one walker call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<I: IdSource + ?Sized>(&mut self, ids: &mut I, kind: NodeKind) -> Id {
        let id = ids.next_id();
        self.nodes.push(Node {
            id: id.clone(),
            kind,
        });
        id
    }

    pub fn add_link<I: IdSource + ?Sized>(
        &mut self,
        ids: &mut I,
        source: &Id,
        target: &Id,
        link_type: LinkType,
    ) {
        self.links.push(Link {
            id: ids.next_id(),
            source: source.clone(),
            target: target.clone(),
            link_type,
        });
    }

    /// Link consecutive ids with `precedes`, in the given order.
    pub fn chain<I: IdSource + ?Sized>(&mut self, ids: &mut I, sequence: &[Id]) {
        for pair in sequence.windows(2) {
            self.add_link(ids, &pair[0], &pair[1], LinkType::Precedes);
        }
    }

    /// Append another graph's nodes and links after this one's. Natural-key
    /// nodes already present are kept once; links to them still resolve.
    pub fn merge(&mut self, other: Graph) {
        let present: HashSet<Id> = self
            .nodes
            .iter()
            .filter(|n| n.kind.is_natural_key())
            .map(|n| n.id.clone())
            .collect();
        self.nodes.extend(
            other
                .nodes
                .into_iter()
                .filter(|n| !(n.kind.is_natural_key() && present.contains(&n.id))),
        );
        self.links.extend(other.links);
    }

    pub fn node(&self, id: &Id) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn nodes_labelled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.kind.label() == label)
    }

    pub fn links_of_type(&self, link_type: LinkType) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |l| l.link_type == link_type)
    }

    /// Links leaving `source`, in emission order.
    pub fn outgoing<'a>(&'a self, source: &'a Id) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| &l.source == source)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Link>) {
        (self.nodes, self.links)
    }

    /// Check identifier uniqueness, that every link resolves inside this
    /// graph, and that the graph is acyclic.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut graph = DiGraph::<&str, LinkType>::new();
        let mut index = HashMap::new();

        for node in &self.nodes {
            let slot = graph.add_node(node.id.as_str());
            if index.insert(node.id.as_str(), slot).is_some() {
                return Err(ModelError::DuplicateId(node.id.to_string()));
            }
        }

        let mut link_ids = HashSet::new();
        for link in &self.links {
            if !link_ids.insert(link.id.as_str()) || index.contains_key(link.id.as_str()) {
                return Err(ModelError::DuplicateId(link.id.to_string()));
            }
            let resolve = |endpoint: &Id| {
                index
                    .get(endpoint.as_str())
                    .copied()
                    .ok_or_else(|| ModelError::DanglingLink {
                        link: link.id.to_string(),
                        endpoint: endpoint.to_string(),
                    })
            };
            let source = resolve(&link.source)?;
            let target = resolve(&link.target)?;
            graph.add_edge(source, target, link.link_type);
        }

        if is_cyclic_directed(&graph) {
            return Err(ModelError::Cycle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CounterIds;

    fn text(content: &str) -> NodeKind {
        NodeKind::Text {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_chain_links_in_order() {
        let mut ids = CounterIds::new();
        let mut graph = Graph::new();
        let a = graph.add_node(&mut ids, text("a"));
        let b = graph.add_node(&mut ids, text("b"));
        let c = graph.add_node(&mut ids, text("c"));

        graph.chain(&mut ids, &[a.clone(), b.clone(), c.clone()]);

        let chain: Vec<(&Id, &Id)> = graph
            .links_of_type(LinkType::Precedes)
            .map(|l| (&l.source, &l.target))
            .collect();
        assert_eq!(chain, vec![(&a, &b), (&b, &c)]);
    }

    #[test]
    fn test_chain_of_one_is_empty() {
        let mut ids = CounterIds::new();
        let mut graph = Graph::new();
        let a = graph.add_node(&mut ids, text("a"));
        graph.chain(&mut ids, &[a]);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_validate_accepts_tree() {
        let mut ids = CounterIds::new();
        let mut graph = Graph::new();
        let parent = graph.add_node(&mut ids, NodeKind::List);
        let child = graph.add_node(&mut ids, text("x"));
        graph.add_link(&mut ids, &parent, &child, LinkType::HasElement);
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut graph = Graph::new();
        for _ in 0..2 {
            graph.nodes.push(Node {
                id: Id::from("same"),
                kind: NodeKind::Record,
            });
        }
        assert_eq!(
            graph.validate(),
            Err(ModelError::DuplicateId("same".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_dangling_link() {
        let mut ids = CounterIds::new();
        let mut graph = Graph::new();
        let a = graph.add_node(&mut ids, NodeKind::Record);
        graph.add_link(&mut ids, &a, &Id::from("missing"), LinkType::HasField);
        assert!(matches!(
            graph.validate(),
            Err(ModelError::DanglingLink { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let mut ids = CounterIds::new();
        let mut graph = Graph::new();
        let a = graph.add_node(&mut ids, NodeKind::List);
        let b = graph.add_node(&mut ids, NodeKind::List);
        graph.add_link(&mut ids, &a, &b, LinkType::HasElement);
        graph.add_link(&mut ids, &b, &a, LinkType::HasElement);
        assert_eq!(graph.validate(), Err(ModelError::Cycle));
    }

    #[test]
    fn test_merge_keeps_one_copy_of_natural_keys() {
        let domain = || Node {
            id: Id::from("example.com"),
            kind: NodeKind::Domain {
                host: "example.com".to_string(),
            },
        };
        let mut ids = CounterIds::new();
        let mut first = Graph::new();
        first.nodes.push(domain());
        let a = first.add_node(&mut ids, NodeKind::Record);
        first.add_link(&mut ids, &domain().id, &a, LinkType::HasField);

        let mut second = Graph::new();
        second.nodes.push(domain());
        let b = second.add_node(&mut ids, NodeKind::Record);
        second.add_link(&mut ids, &domain().id, &b, LinkType::HasField);

        first.merge(second);
        assert_eq!(first.nodes_labelled("Domain").count(), 1);
        assert_eq!(first.nodes_labelled("Record").count(), 2);
        assert_eq!(first.links.len(), 2);
        assert_eq!(first.validate(), Ok(()));
    }

    #[test]
    fn test_merge_keeps_minted_duplicates() {
        let mut graph = Graph::new();
        graph.nodes.push(Node {
            id: Id::from("same"),
            kind: NodeKind::Record,
        });
        let copy = graph.clone();
        graph.merge(copy);
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_node_serializes_with_kind_tag() {
        let node = Node {
            id: Id::from("7"),
            kind: NodeKind::Field {
                name: "a".to_string(),
            },
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "7");
        assert_eq!(value["kind"], "Field");
        assert_eq!(value["name"], "a");
    }

    #[test]
    fn test_endpoint_discriminators() {
        let kind = NodeKind::Endpoint {
            url: "https://example.com/app.js".to_string(),
            path: "/app.js".to_string(),
            method: "GET".to_string(),
            extension: Some("js".to_string()),
            data_type: None,
        };
        assert_eq!(kind.discriminators(), vec!["GET", "js"]);
    }
}
