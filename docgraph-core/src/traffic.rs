//! Recorded HTTP traffic to graph.
//!
//! Each record becomes an `Endpoint` node hanging off the `Domain` it was
//! served from. The response type and the path's file extension become
//! shared nodes keyed by their uppercased value, and HTML or JSON bodies are
//! walked and attached to the endpoint.
//!
//! Links are matched on `id` alone, so the shared keys carry a kind prefix
//! (`response_type:HTML`, `extension:HTML`) to stay apart.

use crate::error::{ConversionError, Result};
use crate::html::html_to_graph;
use crate::ids::{Id, IdSource};
use crate::json::walk_value;
use crate::model::{Graph, LinkType, Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// `html`, `json` or absent when the body was neither.
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

pub fn parse_traffic(text: &str) -> Result<Vec<TrafficRecord>> {
    serde_json::from_str(text).map_err(ConversionError::InvalidTraffic)
}

/// The file extension of the last path segment, without the dot.
/// Hidden files such as `/.env` have none.
pub fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.trim_start_matches('.').is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_string())
}

fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Convert a batch of records. Domains, response types and extensions are
/// emitted once per call no matter how many endpoints share them.
pub fn traffic_to_graph<I: IdSource + ?Sized>(records: &[TrafficRecord], ids: &mut I) -> Graph {
    let mut graph = Graph::new();
    let mut seen: HashSet<Id> = HashSet::new();

    for record in records {
        let url = match Url::parse(&record.request.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping record with bad URL {}: {}", record.request.url, e);
                continue;
            }
        };

        let path = url.path().to_string();
        let extension = path_extension(&path);
        let data_type = record.response.data_type.clone();

        let endpoint_id = graph.add_node(
            ids,
            NodeKind::Endpoint {
                url: record.request.url.clone(),
                path,
                method: record.request.method.to_uppercase(),
                extension: extension.clone(),
                data_type: data_type.clone(),
            },
        );

        let host = netloc(&url);
        let domain_id = Id::new(host.clone());
        if seen.insert(domain_id.clone()) {
            graph.nodes.push(Node {
                id: domain_id.clone(),
                kind: NodeKind::Domain { host },
            });
        }
        graph.add_link(ids, &domain_id, &endpoint_id, LinkType::HasEndpoint);

        if let Some(data_type) = data_type.as_deref().filter(|d| !d.is_empty()) {
            let type_id = Id::new(format!("response_type:{}", data_type.to_uppercase()));
            if seen.insert(type_id.clone()) {
                graph.nodes.push(Node {
                    id: type_id.clone(),
                    kind: NodeKind::ResponseType {
                        data_type: data_type.to_string(),
                    },
                });
            }
            graph.add_link(ids, &endpoint_id, &type_id, LinkType::HasResponse);
        }

        if let Some(extension) =
            extension.filter(|e| e.starts_with(|c: char| c.is_alphabetic()))
        {
            let extension_id = Id::new(format!("extension:{}", extension.to_uppercase()));
            if seen.insert(extension_id.clone()) {
                graph.nodes.push(Node {
                    id: extension_id.clone(),
                    kind: NodeKind::Extension { extension },
                });
            }
            graph.add_link(ids, &endpoint_id, &extension_id, LinkType::HasExtension);
        }

        match (record.response.data_type.as_deref(), &record.response.data) {
            (Some("html"), Value::String(body)) => {
                let html = html_to_graph(body, ids);
                graph.merge(html.graph);
                for top in &html.top_level {
                    graph.add_link(ids, &endpoint_id, top, LinkType::HasHtml);
                }
            }
            (Some("json"), body) => {
                let (_, body_graph) =
                    walk_value(body, Some((&endpoint_id, LinkType::HasJson)), ids);
                graph.merge(body_graph);
            }
            _ => {}
        }
    }

    debug!(
        "Traffic converted: {} records, {} nodes, {} links",
        records.len(),
        graph.nodes.len(),
        graph.links.len()
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CounterIds;
    use serde_json::json;

    fn record(url: &str, data_type: Option<&str>, data: Value) -> TrafficRecord {
        TrafficRecord {
            request: RecordedRequest {
                url: url.to_string(),
                method: "GET".to_string(),
                headers: HashMap::new(),
            },
            response: RecordedResponse {
                status_code: 200,
                headers: HashMap::new(),
                data_type: data_type.map(str::to_string),
                data,
            },
        }
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("/static/app.min.js"), Some("js".to_string()));
        assert_eq!(path_extension("/v1/users"), None);
        assert_eq!(path_extension("/.env"), None);
        assert_eq!(path_extension("/archive.7z"), Some("7z".to_string()));
        assert_eq!(path_extension("/dir.d/file"), None);
    }

    #[test]
    fn test_shared_nodes_are_emitted_once() {
        let records = vec![
            record("https://example.com/a.js", None, Value::Null),
            record("https://example.com/b.js", None, Value::Null),
            record("https://cdn.example.com:8443/c.css", None, Value::Null),
        ];
        let graph = traffic_to_graph(&records, &mut CounterIds::new());

        assert_eq!(graph.nodes_labelled("Endpoint").count(), 3);
        assert_eq!(graph.nodes_labelled("Domain").count(), 2);
        assert_eq!(graph.nodes_labelled("Extension").count(), 2);
        assert!(graph.node(&Id::from("cdn.example.com:8443")).is_some());
        assert!(graph.node(&Id::from("extension:JS")).is_some());
        assert_eq!(graph.links_of_type(LinkType::HasEndpoint).count(), 3);
        assert_eq!(graph.links_of_type(LinkType::HasExtension).count(), 3);
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_numeric_extension_gets_no_node() {
        let graph = traffic_to_graph(
            &[record("https://example.com/a.7z", None, Value::Null)],
            &mut CounterIds::new(),
        );
        assert_eq!(graph.nodes_labelled("Extension").count(), 0);
        match &graph.nodes[0].kind {
            NodeKind::Endpoint { extension, .. } => assert_eq!(extension.as_deref(), Some("7z")),
            other => panic!("expected endpoint, got {:?}", other),
        }
    }

    #[test]
    fn test_html_body_is_attached() {
        let graph = traffic_to_graph(
            &[record(
                "https://example.com/",
                Some("html"),
                json!("<h1>Title</h1><p>Body</p>"),
            )],
            &mut CounterIds::new(),
        );

        assert_eq!(graph.links_of_type(LinkType::HasHtml).count(), 2);
        assert_eq!(graph.links_of_type(LinkType::HasResponse).count(), 1);
        assert!(graph.node(&Id::from("response_type:HTML")).is_some());
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_json_body_is_attached() {
        let graph = traffic_to_graph(
            &[record(
                "https://api.example.com/items",
                Some("json"),
                json!({"items": [1, 2]}),
            )],
            &mut CounterIds::new(),
        );

        let has_json: Vec<_> = graph.links_of_type(LinkType::HasJson).collect();
        assert_eq!(has_json.len(), 1);
        assert_eq!(
            graph.node(&has_json[0].target).map(|n| n.kind.label()),
            Some("Record")
        );
    }

    #[test]
    fn test_extension_and_response_type_do_not_collide() {
        let graph = traffic_to_graph(
            &[record(
                "https://example.com/index.html",
                Some("html"),
                json!("<p>x</p>"),
            )],
            &mut CounterIds::new(),
        );

        assert_eq!(graph.nodes_labelled("ResponseType").count(), 1);
        assert_eq!(graph.nodes_labelled("Extension").count(), 1);
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_bad_url_is_skipped() {
        let graph = traffic_to_graph(
            &[record("not a url", None, Value::Null)],
            &mut CounterIds::new(),
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_parse_traffic() {
        let text = r#"[{
            "request": {"url": "https://example.com/x.json", "method": "get"},
            "response": {"status_code": 200, "data_type": "json", "data": {"ok": true}}
        }]"#;
        let records = parse_traffic(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response.data, json!({"ok": true}));

        assert!(matches!(
            parse_traffic(r#"[{"request": {}}]"#),
            Err(ConversionError::InvalidTraffic(_))
        ));
    }
}
