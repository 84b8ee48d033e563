//! JSON values to graph.

use crate::error::{ConversionError, Result};
use crate::ids::{Id, IdSource};
use crate::model::{Graph, LinkType, NodeKind, ScalarType};
use serde_json::Value;

/// A converted value: the id of the node standing for it plus everything
/// emitted beneath it.
#[derive(Debug, Clone)]
pub struct Converted {
    pub root: Id,
    pub graph: Graph,
}

/// Convert a whole JSON document with no parent.
pub fn json_to_graph<I: IdSource + ?Sized>(value: &Value, ids: &mut I) -> Converted {
    let (root, graph) = walk_value(value, None, ids);
    Converted { root, graph }
}

/// Parse JSON text and convert it. Object keys keep their document order.
pub fn json_str_to_graph<I: IdSource + ?Sized>(text: &str, ids: &mut I) -> Result<Converted> {
    let value: Value = serde_json::from_str(text).map_err(ConversionError::InvalidJson)?;
    Ok(json_to_graph(&value, ids))
}

/// Convert `value`, linking it from `parent` with the given link type when
/// one is supplied. Returns the id of the node representing `value`.
pub fn walk_value<I: IdSource + ?Sized>(
    value: &Value,
    parent: Option<(&Id, LinkType)>,
    ids: &mut I,
) -> (Id, Graph) {
    let mut graph = Graph::new();

    let kind = match value {
        Value::Null => scalar(ScalarType::Null, "null".to_string()),
        Value::Bool(b) => scalar(ScalarType::Boolean, b.to_string()),
        Value::Number(n) => scalar(ScalarType::Number, n.to_string()),
        Value::String(s) => scalar(ScalarType::String, s.clone()),
        Value::Array(_) => NodeKind::List,
        Value::Object(_) => NodeKind::Record,
    };
    let id = graph.add_node(ids, kind);

    if let Some((parent, link_type)) = parent {
        graph.add_link(ids, parent, &id, link_type);
    }

    match value {
        Value::Array(elements) => {
            let mut element_ids = Vec::with_capacity(elements.len());
            for element in elements {
                let (element_id, subgraph) =
                    walk_value(element, Some((&id, LinkType::HasElement)), ids);
                graph.merge(subgraph);
                element_ids.push(element_id);
            }
            graph.chain(ids, &element_ids);
        }
        Value::Object(map) => {
            for (key, field_value) in map {
                let field_id = graph.add_node(ids, NodeKind::Field { name: key.clone() });
                graph.add_link(ids, &id, &field_id, LinkType::HasField);

                let (value_id, subgraph) = walk_value(field_value, None, ids);
                graph.merge(subgraph);
                graph.add_link(ids, &field_id, &value_id, LinkType::HasValue);
            }
        }
        _ => {}
    }

    (id, graph)
}

fn scalar(scalar_type: ScalarType, content: String) -> NodeKind {
    NodeKind::Scalar {
        scalar_type,
        content,
    }
}
