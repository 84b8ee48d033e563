//! Rendering graph nodes and links as openCypher statements.
//!
//! Compilation is pure: the same item, options and mode always give the
//! same statement. Strings are always double-quoted; how their content is
//! made safe for that is chosen by [`EscapePolicy`].

use crate::model::{Graph, Link, Node, NodeKind, ScalarType};
use docgraph_ingest::{Compile, CompileMode};

/// Stands in for free-text content the store refused to parse.
pub const PLACEHOLDER: &str = "[CANNOT ATTACH TO CYPHER]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapePolicy {
    /// Swap `"` for `'` and turn newlines, carriage returns and tabs into
    /// two-character tokens. Backslashes are left alone, so content that
    /// carries them may still be rejected by the store.
    #[default]
    QuoteSwap,
    /// Backslash-escape `\`, `"`, newline, carriage return and tab.
    Backslash,
}

impl EscapePolicy {
    pub fn escape(&self, raw: &str) -> String {
        let mut escaped = String::with_capacity(raw.len());
        for c in raw.chars() {
            match (self, c) {
                (_, '\n') => escaped.push_str("\\n"),
                (_, '\r') => escaped.push_str("\\r"),
                (_, '\t') => escaped.push_str("\\t"),
                (EscapePolicy::QuoteSwap, '"') => escaped.push('\''),
                (EscapePolicy::Backslash, '"') => escaped.push_str("\\\""),
                (EscapePolicy::Backslash, '\\') => escaped.push_str("\\\\"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub escape: EscapePolicy,
    pub placeholder: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            escape: EscapePolicy::default(),
            placeholder: PLACEHOLDER.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_escape(mut self, escape: EscapePolicy) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

/// Compiles nodes and links with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn node(&self, node: &Node, mode: CompileMode) -> String {
        let mut labels = vec![node.kind.label().to_string()];
        labels.extend(
            node.kind
                .discriminators()
                .into_iter()
                .filter_map(label_token),
        );

        // The retry must always parse, so every field is fully escaped there
        let escape = match mode {
            CompileMode::Full => self.options.escape,
            CompileMode::IgnoreContent => EscapePolicy::Backslash,
        };
        let mut props = Properties::new(escape);
        props.string("id", node.id.as_str());

        // Free text is swapped for the placeholder when suppressed
        let content = |value: &str| -> String {
            match mode {
                CompileMode::Full => value.to_string(),
                CompileMode::IgnoreContent => self.options.placeholder.clone(),
            }
        };

        match &node.kind {
            NodeKind::Element { tag, .. } => props.string("tag", tag),
            NodeKind::Attribute { name, value } => {
                props.string("name", name);
                props.string("value", &content(value));
            }
            NodeKind::Text { content: text } => props.string("content", &content(text)),
            NodeKind::Record | NodeKind::List => {}
            NodeKind::Field { name } => props.string("name", &content(name)),
            NodeKind::Scalar {
                scalar_type,
                content: value,
            } => {
                props.string("type", scalar_type.as_str());
                match scalar_type {
                    ScalarType::String => props.string("content", &content(value)),
                    ScalarType::Number | ScalarType::Boolean => props.raw("content", value),
                    ScalarType::Null => {}
                }
            }
            NodeKind::Endpoint {
                url,
                path,
                method,
                extension,
                data_type,
            } => {
                props.string("url", &content(url));
                props.string("path", &content(path));
                props.string("method", method);
                if let Some(extension) = extension {
                    props.string("extension", extension);
                }
                if let Some(data_type) = data_type {
                    props.string("data_type", data_type);
                }
            }
            NodeKind::Domain { host } => props.string("host", host),
            NodeKind::ResponseType { data_type } => props.string("data_type", data_type),
            NodeKind::Extension { extension } => props.string("extension", extension),
        }

        let verb = if node.kind.is_natural_key() {
            "MERGE"
        } else {
            "CREATE"
        };
        format!("{} (n:{} {})", verb, labels.join(":"), props.render())
    }

    /// Every node statement followed by every link statement, in the order
    /// they have to be applied.
    pub fn graph(&self, graph: &Graph) -> Vec<String> {
        graph
            .nodes
            .iter()
            .map(|node| self.node(node, CompileMode::Full))
            .chain(graph.links.iter().map(|link| self.link(link)))
            .collect()
    }

    pub fn link(&self, link: &Link) -> String {
        let escape = self.options.escape;
        format!(
            "MATCH (a {{id: \"{}\"}}), (b {{id: \"{}\"}}) CREATE (a)-[:{} {{id: \"{}\"}}]->(b)",
            escape.escape(link.source.as_str()),
            escape.escape(link.target.as_str()),
            link.link_type.as_str().to_uppercase(),
            escape.escape(link.id.as_str()),
        )
    }
}

impl Compile<Node> for Compiler {
    fn compile(&self, item: &Node, mode: CompileMode) -> String {
        self.node(item, mode)
    }
}

impl Compile<Link> for Compiler {
    fn compile(&self, item: &Link, _mode: CompileMode) -> String {
        self.link(item)
    }
}

/// Passes prepared statements through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Compile<String> for Verbatim {
    fn compile(&self, item: &String, _mode: CompileMode) -> String {
        item.clone()
    }
}

pub fn node_to_cypher(node: &Node, mode: CompileMode) -> String {
    Compiler::default().node(node, mode)
}

pub fn link_to_cypher(link: &Link) -> String {
    Compiler::default().link(link)
}

/// One uniqueness constraint on `id` per node kind.
pub fn constraint_statements() -> Vec<String> {
    NodeKind::LABELS
        .iter()
        .map(|label| {
            format!(
                "CREATE CONSTRAINT unique_id_for_{} IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
                snake_case(label),
                label
            )
        })
        .collect()
}

/// Turn a raw discriminator into a usable secondary label.
///
/// Anything outside `[A-Za-z0-9]` becomes `_` and the result is uppercased.
/// Values that end up empty or not starting with a letter give no label.
pub fn label_token(raw: &str) -> Option<String> {
    let token: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    match token.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => Some(token),
        _ => None,
    }
}

fn snake_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 4);
    for (i, c) in label.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

struct Properties {
    escape: EscapePolicy,
    entries: Vec<String>,
}

impl Properties {
    fn new(escape: EscapePolicy) -> Self {
        Self {
            escape,
            entries: Vec::new(),
        }
    }

    fn string(&mut self, key: &str, value: &str) {
        self.entries
            .push(format!("{}: \"{}\"", key, self.escape.escape(value)));
    }

    fn raw(&mut self, key: &str, value: &str) {
        self.entries.push(format!("{}: {}", key, value));
    }

    fn render(&self) -> String {
        format!("{{{}}}", self.entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Id;
    use crate::model::LinkType;
    use crate::statement::parse_statement;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: Id::from(id),
            kind,
        }
    }

    fn text(content: &str) -> Node {
        node(
            "t1",
            NodeKind::Text {
                content: content.to_string(),
            },
        )
    }

    #[test]
    fn test_text_quotes_are_swapped() {
        let statement = node_to_cypher(&text(r#"Hello "world""#), CompileMode::Full);
        assert_eq!(
            statement,
            r#"CREATE (n:Text {id: "t1", content: "Hello 'world'"})"#
        );
    }

    #[test]
    fn test_quote_swap_leaves_no_raw_quote_or_newline() {
        let statement = node_to_cypher(&text("Hello \"world\"\n"), CompileMode::Full);
        let literal = statement
            .split("content: \"")
            .nth(1)
            .and_then(|rest| rest.strip_suffix("\"})"))
            .unwrap();

        assert_eq!(literal, "Hello 'world'\\n");
        assert!(!literal.contains('"'));
        assert!(!literal.contains('\n'));
    }

    #[test]
    fn test_backslash_policy() {
        let compiler = Compiler::new(CompileOptions::default().with_escape(EscapePolicy::Backslash));
        let statement = compiler.node(&text("a \"b\"\\c\n"), CompileMode::Full);
        assert_eq!(
            statement,
            r#"CREATE (n:Text {id: "t1", content: "a \"b\"\\c\n"})"#
        );
    }

    #[test]
    fn test_element_gets_tag_label() {
        let element = node(
            "e1",
            NodeKind::Element {
                tag: "p".to_string(),
                attributes: vec![],
            },
        );
        assert_eq!(
            node_to_cypher(&element, CompileMode::Full),
            r#"CREATE (n:Element:P {id: "e1", tag: "p"})"#
        );
    }

    #[test]
    fn test_attribute_label_and_placeholder() {
        let attribute = node(
            "a1",
            NodeKind::Attribute {
                name: "data_role".to_string(),
                value: "nav".to_string(),
            },
        );
        assert_eq!(
            node_to_cypher(&attribute, CompileMode::Full),
            r#"CREATE (n:Attribute:DATA_ROLE {id: "a1", name: "data_role", value: "nav"})"#
        );
        assert_eq!(
            node_to_cypher(&attribute, CompileMode::IgnoreContent),
            r#"CREATE (n:Attribute:DATA_ROLE {id: "a1", name: "data_role", value: "[CANNOT ATTACH TO CYPHER]"})"#
        );
    }

    #[test]
    fn test_ignore_content_escapes_every_field() {
        let attribute = node(
            "a2",
            NodeKind::Attribute {
                name: "b\\".to_string(),
                value: "x".to_string(),
            },
        );
        let full = node_to_cypher(&attribute, CompileMode::Full);
        assert!(parse_statement(&full).is_err());

        let retry = node_to_cypher(&attribute, CompileMode::IgnoreContent);
        assert_eq!(
            retry,
            r#"CREATE (n:Attribute:B_ {id: "a2", name: "b\\", value: "[CANNOT ATTACH TO CYPHER]"})"#
        );
        assert!(parse_statement(&retry).is_ok());
    }

    #[test]
    fn test_label_token_rules() {
        assert_eq!(label_token("div"), Some("DIV".to_string()));
        assert_eq!(label_token("x:y"), Some("X_Y".to_string()));
        assert_eq!(label_token("1st"), None);
        assert_eq!(label_token("_x"), None);
        assert_eq!(label_token(""), None);
    }

    #[test]
    fn test_scalars() {
        let number = node(
            "s1",
            NodeKind::Scalar {
                scalar_type: ScalarType::Number,
                content: "1.5".to_string(),
            },
        );
        let null = node(
            "s2",
            NodeKind::Scalar {
                scalar_type: ScalarType::Null,
                content: "null".to_string(),
            },
        );
        let string = node(
            "s3",
            NodeKind::Scalar {
                scalar_type: ScalarType::String,
                content: "hi".to_string(),
            },
        );

        assert_eq!(
            node_to_cypher(&number, CompileMode::Full),
            r#"CREATE (n:Scalar:NUMBER {id: "s1", type: "Number", content: 1.5})"#
        );
        assert_eq!(
            node_to_cypher(&null, CompileMode::Full),
            r#"CREATE (n:Scalar:NULL {id: "s2", type: "Null"})"#
        );
        // Numbers are not free text and survive the fallback
        assert_eq!(
            node_to_cypher(&number, CompileMode::IgnoreContent),
            node_to_cypher(&number, CompileMode::Full)
        );
        assert!(
            node_to_cypher(&string, CompileMode::IgnoreContent).contains(PLACEHOLDER)
        );
    }

    #[test]
    fn test_natural_keys_merge() {
        let domain = node(
            "example.com",
            NodeKind::Domain {
                host: "example.com".to_string(),
            },
        );
        assert_eq!(
            node_to_cypher(&domain, CompileMode::Full),
            r#"MERGE (n:Domain {id: "example.com", host: "example.com"})"#
        );
    }

    #[test]
    fn test_endpoint_labels() {
        let endpoint = node(
            "ep",
            NodeKind::Endpoint {
                url: "https://example.com/a.js".to_string(),
                path: "/a.js".to_string(),
                method: "GET".to_string(),
                extension: Some("js".to_string()),
                data_type: None,
            },
        );
        let statement = node_to_cypher(&endpoint, CompileMode::Full);
        assert!(statement.starts_with("CREATE (n:Endpoint:GET:JS {"));
        assert!(!statement.contains("data_type"));
    }

    #[test]
    fn test_link_statement() {
        let link = Link {
            id: Id::from("l1"),
            source: Id::from("a"),
            target: Id::from("b"),
            link_type: LinkType::HasAttribute,
        };
        assert_eq!(
            link_to_cypher(&link),
            r#"MATCH (a {id: "a"}), (b {id: "b"}) CREATE (a)-[:HAS_ATTRIBUTE {id: "l1"}]->(b)"#
        );
    }

    #[test]
    fn test_constraint_statements() {
        let statements = constraint_statements();
        assert_eq!(statements.len(), NodeKind::LABELS.len());
        assert!(statements.contains(
            &"CREATE CONSTRAINT unique_id_for_response_type IF NOT EXISTS FOR (n:ResponseType) REQUIRE n.id IS UNIQUE".to_string()
        ));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let item = text("same");
        let compiler = Compiler::default();
        assert_eq!(
            Compile::<Node>::compile(&compiler, &item, CompileMode::Full),
            Compile::<Node>::compile(&compiler, &item, CompileMode::Full)
        );
    }
}
