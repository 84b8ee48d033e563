// End-to-end conversion: documents in, graphs and statements out

use docgraph_core::cypher::{Compiler, node_to_cypher};
use docgraph_core::html::html_to_graph;
use docgraph_core::json::json_str_to_graph;
use docgraph_core::statement::parse_statement;
use docgraph_core::{CounterIds, Graph, LinkType, NodeKind, UuidIds};
use docgraph_ingest::CompileMode;

const PAGE: &str = r#"
<div class="card" id="main">
  <h2 data-role="title">Quarterly <em>results</em></h2>
  <!-- generated -->
  <ul>
    <li>Revenue: 10</li>
    <li>Costs: "7"</li>
    <li>   </li>
  </ul>
  <a href="/next">Next page</a>
</div>
<footer>bye</footer>
"#;

fn count(graph: &Graph, label: &str) -> usize {
    graph.nodes_labelled(label).count()
}

fn count_links(graph: &Graph, link_type: LinkType) -> usize {
    graph.links_of_type(link_type).count()
}

#[test]
fn test_html_counts_add_up() {
    let result = html_to_graph(PAGE, &mut CounterIds::new());
    let graph = &result.graph;

    assert_eq!(
        count(graph, "Element") + count(graph, "Attribute") + count(graph, "Text"),
        graph.nodes.len()
    );
    assert_eq!(
        count_links(graph, LinkType::Contains)
            + count_links(graph, LinkType::HasAttribute)
            + count_links(graph, LinkType::Precedes),
        graph.links.len()
    );

    // div, h2, em, ul, li x3, a, footer
    assert_eq!(count(graph, "Element"), 9);
    // class, id, data-role, href
    assert_eq!(count(graph, "Attribute"), 4);
    // "Quarterly", "results", two list items, "Next page", "bye"
    assert_eq!(count(graph, "Text"), 6);
    assert_eq!(result.top_level.len(), 2);
    assert_eq!(graph.validate(), Ok(()));
}

#[test]
fn test_every_element_child_is_contained_once() {
    let result = html_to_graph(PAGE, &mut CounterIds::new());
    let graph = &result.graph;

    for node in &graph.nodes {
        let incoming = graph
            .links
            .iter()
            .filter(|l| {
                l.target == node.id
                    && matches!(l.link_type, LinkType::Contains | LinkType::HasAttribute)
            })
            .count();
        let expected = usize::from(!result.top_level.contains(&node.id));
        assert_eq!(incoming, expected, "node {:?}", node);
    }
}

#[test]
fn test_scenario_paragraph_statement() {
    let result = html_to_graph(r#"<p>Hello "world"</p>"#, &mut CounterIds::new());
    let text = result
        .graph
        .nodes_labelled("Text")
        .next()
        .expect("text node");

    let statement = node_to_cypher(text, CompileMode::Full);
    assert!(statement.contains(r#"content: "Hello 'world'""#));
    assert!(parse_statement(&statement).is_ok());
}

#[test]
fn test_scenario_record_with_list() {
    let converted = json_str_to_graph(r#"{"a": [1, 2]}"#, &mut CounterIds::new()).unwrap();
    let graph = &converted.graph;

    assert_eq!(count(graph, "Record"), 1);
    assert_eq!(count(graph, "Field"), 1);
    assert_eq!(count(graph, "List"), 1);
    assert_eq!(count(graph, "Scalar"), 2);
    assert_eq!(count_links(graph, LinkType::HasField), 1);
    assert_eq!(count_links(graph, LinkType::HasValue), 1);
    assert_eq!(count_links(graph, LinkType::HasElement), 2);
    assert_eq!(count_links(graph, LinkType::Precedes), 1);
}

#[test]
fn test_compiled_graph_parses() {
    let mut ids = UuidIds;
    let mut graph = html_to_graph(PAGE, &mut ids).graph;
    graph.merge(
        json_str_to_graph(
            r#"{"name": "x", "tags": ["a", "b"], "n": -1.5e3, "ok": true, "none": null}"#,
            &mut ids,
        )
        .unwrap()
        .graph,
    );

    let statements = Compiler::default().graph(&graph);
    assert_eq!(statements.len(), graph.nodes.len() + graph.links.len());
    for statement in &statements {
        assert!(
            parse_statement(statement).is_ok(),
            "rejected: {}",
            statement
        );
    }
}

#[test]
fn test_uuid_ids_are_unique_across_documents() {
    let mut ids = UuidIds;
    let mut graph = html_to_graph(PAGE, &mut ids).graph;
    graph.merge(html_to_graph(PAGE, &mut ids).graph);
    assert_eq!(graph.validate(), Ok(()));
}

#[test]
fn test_attribute_names_are_normalized() {
    let result = html_to_graph(r#"<i aria-hidden="true"></i>"#, &mut CounterIds::new());
    let names: Vec<_> = result
        .graph
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Attribute { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["aria_hidden"]);
}
