//! HTML element trees to graph.
//!
//! Every element becomes an `Element` node with one `Attribute` node per
//! attribute, every non-blank text leaf becomes a `Text` node, and children
//! are linked to their parent with `contains` and to each other with a
//! `precedes` chain in document order.
//!
//! Comments and doctypes produce no node at all, not even a `Text` one, so
//! they never sit in a `precedes` chain.

use crate::ids::{Id, IdSource};
use crate::model::{Graph, LinkType, NodeKind};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

/// The graph of one HTML document plus the ids of its top-level nodes.
#[derive(Debug, Clone, Default)]
pub struct HtmlGraph {
    pub graph: Graph,
    pub top_level: Vec<Id>,
}

enum Piece<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

/// Parse `html` and convert it.
///
/// Input that carries an `<html>` tag or a doctype is parsed as a full
/// document (its single top-level node is the `html` element); anything
/// else is parsed as a fragment so that `<p>x</p>` stays one paragraph
/// instead of gaining an implied `html`/`head`/`body` scaffold.
pub fn html_to_graph<I: IdSource + ?Sized>(html: &str, ids: &mut I) -> HtmlGraph {
    let document = parse_html(html);
    document_to_graph(&document, ids)
}

pub fn parse_html(html: &str) -> Html {
    let lowered = html.to_ascii_lowercase();
    if lowered.contains("<html") || lowered.trim_start().starts_with("<!doctype") {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    }
}

/// Convert an already parsed tree.
pub fn document_to_graph<I: IdSource + ?Sized>(document: &Html, ids: &mut I) -> HtmlGraph {
    let top = if matches!(document.tree.root().value(), Node::Fragment) {
        // Fragments hang off a synthetic `html` element
        pieces(document.root_element())
    } else {
        vec![Piece::Element(document.root_element())]
    };

    let (top_level, graph) = walk_siblings(top, None, ids);
    debug!(
        "HTML converted: {} nodes, {} links, {} top-level",
        graph.nodes.len(),
        graph.links.len(),
        top_level.len()
    );
    HtmlGraph { graph, top_level }
}

fn pieces(element: ElementRef<'_>) -> Vec<Piece<'_>> {
    element
        .children()
        .filter_map(|child| {
            if let Some(child_element) = ElementRef::wrap(child) {
                Some(Piece::Element(child_element))
            } else if let Node::Text(text) = child.value() {
                Some(Piece::Text(&**text))
            } else {
                // comment, doctype or processing instruction
                None
            }
        })
        .collect()
}

/// Walk a run of siblings and chain the ones that produced a node.
fn walk_siblings<I: IdSource + ?Sized>(
    siblings: Vec<Piece<'_>>,
    parent: Option<&Id>,
    ids: &mut I,
) -> (Vec<Id>, Graph) {
    let mut graph = Graph::new();
    let mut sibling_ids = Vec::new();

    for piece in siblings {
        let walked = match piece {
            Piece::Element(element) => Some(walk_element(element, parent, ids)),
            Piece::Text(text) => walk_text(text, parent, ids),
        };
        if let Some((id, subgraph)) = walked {
            graph.merge(subgraph);
            sibling_ids.push(id);
        }
    }

    graph.chain(ids, &sibling_ids);
    (sibling_ids, graph)
}

fn walk_element<I: IdSource + ?Sized>(
    element: ElementRef<'_>,
    parent: Option<&Id>,
    ids: &mut I,
) -> (Id, Graph) {
    let mut graph = Graph::new();
    let value = element.value();

    let attributes: Vec<(String, String)> = value
        .attrs()
        .map(|(name, val)| (name.to_string(), val.to_string()))
        .collect();

    let element_id = graph.add_node(
        ids,
        NodeKind::Element {
            tag: value.name().to_string(),
            attributes: attributes.clone(),
        },
    );

    if let Some(parent) = parent {
        graph.add_link(ids, parent, &element_id, LinkType::Contains);
    }

    for (name, val) in attributes {
        let attribute_id = graph.add_node(
            ids,
            NodeKind::Attribute {
                name: name.trim().replace('-', "_"),
                value: val,
            },
        );
        graph.add_link(ids, &element_id, &attribute_id, LinkType::HasAttribute);
    }

    let (_, children) = walk_siblings(pieces(element), Some(&element_id), ids);
    graph.merge(children);

    (element_id, graph)
}

fn walk_text<I: IdSource + ?Sized>(
    text: &str,
    parent: Option<&Id>,
    ids: &mut I,
) -> Option<(Id, Graph)> {
    let content = text.trim();
    if content.is_empty() {
        return None;
    }

    let mut graph = Graph::new();
    let text_id = graph.add_node(
        ids,
        NodeKind::Text {
            content: content.to_string(),
        },
    );
    if let Some(parent) = parent {
        graph.add_link(ids, parent, &text_id, LinkType::Contains);
    }
    Some((text_id, graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CounterIds;

    fn convert(html: &str) -> HtmlGraph {
        html_to_graph(html, &mut CounterIds::new())
    }

    fn tags(graph: &Graph) -> Vec<&str> {
        graph
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Element { tag, .. } => Some(tag.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_paragraph() {
        let result = convert(r#"<p>Hello "world"</p>"#);
        let graph = &result.graph;

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(tags(graph), vec!["p"]);
        assert_eq!(
            graph.nodes[1].kind,
            NodeKind::Text {
                content: r#"Hello "world""#.to_string()
            }
        );
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].link_type, LinkType::Contains);
        assert_eq!(graph.links[0].source, graph.nodes[0].id);
        assert_eq!(graph.links[0].target, graph.nodes[1].id);
        assert_eq!(result.top_level, vec![graph.nodes[0].id.clone()]);
    }

    #[test]
    fn test_whitespace_text_is_dropped() {
        let result = convert("<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>");
        let graph = &result.graph;

        assert_eq!(graph.nodes_labelled("Text").count(), 2);
        assert_eq!(graph.links_of_type(LinkType::Precedes).count(), 1);
        assert_eq!(graph.links_of_type(LinkType::Contains).count(), 4);
    }

    #[test]
    fn test_attributes_become_nodes() {
        let result = convert(r#"<a href="/x" data-role="nav">go</a>"#);
        let graph = &result.graph;

        let mut names: Vec<&str> = graph
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Attribute { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["data_role", "href"]);
        assert_eq!(graph.links_of_type(LinkType::HasAttribute).count(), 2);
        // Attribute nodes are not siblings of the text child
        assert_eq!(graph.links_of_type(LinkType::Precedes).count(), 0);

        match &graph.nodes[0].kind {
            NodeKind::Element { attributes, .. } => assert_eq!(attributes.len(), 2),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_top_level_siblings_are_chained() {
        let result = convert("<h1>A</h1> <p>B</p>");
        let graph = &result.graph;

        assert_eq!(result.top_level.len(), 2);
        let precedes: Vec<_> = graph.links_of_type(LinkType::Precedes).collect();
        assert_eq!(precedes.len(), 1);
        assert_eq!(precedes[0].source, result.top_level[0]);
        assert_eq!(precedes[0].target, result.top_level[1]);
    }

    #[test]
    fn test_mixed_text_and_elements_keep_document_order() {
        let result = convert("<p>before <b>bold</b> after</p>");
        let graph = &result.graph;
        let p = &result.top_level[0];

        let children: Vec<&Id> = graph
            .outgoing(p)
            .filter(|l| l.link_type == LinkType::Contains)
            .map(|l| &l.target)
            .collect();
        assert_eq!(children.len(), 3);

        let chain: Vec<(&Id, &Id)> = graph
            .links_of_type(LinkType::Precedes)
            .map(|l| (&l.source, &l.target))
            .collect();
        assert_eq!(chain, vec![(children[0], children[1]), (children[1], children[2])]);
        assert_eq!(
            graph.node(children[0]).map(|n| &n.kind),
            Some(&NodeKind::Text {
                content: "before".to_string()
            })
        );
    }

    #[test]
    fn test_full_document_keeps_scaffold() {
        let result = convert(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>",
        );
        let graph = &result.graph;

        assert_eq!(result.top_level.len(), 1);
        assert_eq!(tags(graph), vec!["html", "head", "title", "body", "p"]);
        assert_eq!(graph.nodes_labelled("Text").count(), 2);
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_comments_are_ignored() {
        let result = convert("<div><!-- note --><span>a</span></div>");
        assert_eq!(result.graph.nodes.len(), 3);
        assert_eq!(result.graph.links_of_type(LinkType::Precedes).count(), 0);
        assert!(result.graph.nodes.iter().all(|n| match &n.kind {
            NodeKind::Text { content } => !content.contains("note"),
            _ => true,
        }));
    }

    #[test]
    fn test_blank_document_is_empty() {
        let result = convert("   \n ");
        assert!(result.graph.is_empty());
        assert!(result.top_level.is_empty());
    }
}
