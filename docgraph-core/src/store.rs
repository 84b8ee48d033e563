//! An embedded graph store on top of SQLite.
//!
//! Nodes carry a JSON property bag and any number of labels; links join two
//! node rows. Statements arrive as openCypher text, are parsed with
//! [`crate::statement`] and run inside one immediate transaction each, so a
//! failing statement leaves nothing behind. Uniqueness constraints are kept
//! in a side table whose primary key does the enforcing.

use crate::statement::{NodePattern, Statement, parse_statement};
use chrono::Utc;
use docgraph_ingest::{GraphStore, Session, StoreError};
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, TransactionBehavior, params, params_from_iter,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    path: PathBuf,
}

/// A node as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNode {
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub label: String,
    pub property: String,
}

/// Counts for reporting. Nodes are grouped by their first label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub nodes: usize,
    pub links: usize,
    pub labels: BTreeMap<String, usize>,
    pub link_types: BTreeMap<String, usize>,
    pub constraints: usize,
}

fn sql_error(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(e.to_string()),
        Some(ErrorCode::DatabaseBusy)
        | Some(ErrorCode::DatabaseLocked)
        | Some(ErrorCode::CannotOpen)
        | Some(ErrorCode::NotADatabase) => StoreError::Connection(e.to_string()),
        _ => StoreError::Backend(e.to_string()),
    }
}

fn json_error(e: serde_json::Error) -> StoreError {
    StoreError::Backend(format!("Corrupt property data: {}", e))
}

impl SqliteGraphStore {
    /// Open (creating if needed) the database at `path` and make sure the
    /// schema exists.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::Connection(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(sql_error)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )
        .map_err(sql_error)?;
        init_schema(&conn)?;

        debug!("Graph store ready at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Delete the database file and its WAL companions.
    pub fn remove(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut companion = path.as_os_str().to_owned();
            companion.push(suffix);
            let companion = PathBuf::from(companion);
            if companion.exists() {
                fs::remove_file(companion)?;
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn =
            Connection::open(&self.path).map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )
        .map_err(sql_error)?;
        Ok(conn)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.connect()?;
        let count = |sql: &str| -> Result<usize, StoreError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(sql_error)
        };

        let mut stats = StoreStats {
            nodes: count("SELECT COUNT(*) FROM graph_nodes")?,
            links: count("SELECT COUNT(*) FROM graph_links")?,
            constraints: count("SELECT COUNT(*) FROM constraints")?,
            ..StoreStats::default()
        };

        let grouped = |sql: &str| -> Result<BTreeMap<String, usize>, StoreError> {
            let mut stmt = conn.prepare(sql).map_err(sql_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                })
                .map_err(sql_error)?
                .collect::<rusqlite::Result<BTreeMap<_, _>>>()
                .map_err(sql_error)?;
            Ok(rows)
        };

        stats.labels = grouped(
            "SELECT COALESCE(primary_label, ''), COUNT(*) FROM graph_nodes GROUP BY primary_label",
        )?;
        stats.link_types =
            grouped("SELECT link_type, COUNT(*) FROM graph_links GROUP BY link_type")?;
        Ok(stats)
    }

    /// Look a node up by its `id` property.
    pub fn find_node(&self, id: &str) -> Result<Option<StoredNode>, StoreError> {
        let conn = self.connect()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT labels, properties FROM graph_nodes WHERE node_id = ?1 ORDER BY key LIMIT 1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sql_error)?;

        row.map(|(labels, properties)| {
            Ok(StoredNode {
                labels: serde_json::from_str(&labels).map_err(json_error)?,
                properties: serde_json::from_str(&properties).map_err(json_error)?,
            })
        })
        .transpose()
    }

    /// Number of stored nodes whose `id` property equals `id`.
    pub fn count_nodes_with_id(&self, id: &str) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT COUNT(*) FROM graph_nodes WHERE node_id = ?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(sql_error)
    }

    /// `(link type, source id, target id)` of every stored link.
    pub fn links(&self) -> Result<Vec<(String, String, String)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT l.link_type, s.node_id, t.node_id
                 FROM graph_links l
                 JOIN graph_nodes s ON s.key = l.source_key
                 JOIN graph_nodes t ON t.key = l.target_key
                 ORDER BY l.key",
            )
            .map_err(sql_error)?;
        let links = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                ))
            })
            .map_err(sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_error)?;
        Ok(links)
    }

    pub fn constraints(&self) -> Result<Vec<ConstraintInfo>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT name, label, property FROM constraints ORDER BY name")
            .map_err(sql_error)?;
        let constraints = stmt
            .query_map([], |row| {
                Ok(ConstraintInfo {
                    name: row.get(0)?,
                    label: row.get(1)?,
                    property: row.get(2)?,
                })
            })
            .map_err(sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_error)?;
        Ok(constraints)
    }
}

impl GraphStore for SqliteGraphStore {
    type Session = SqliteSession;

    fn open_session(&self) -> Result<Self::Session, StoreError> {
        Ok(SqliteSession {
            conn: self.connect()?,
        })
    }
}

/// One connection to the store. Dropping it closes the connection.
pub struct SqliteSession {
    conn: Connection,
}

impl Session for SqliteSession {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        let parsed = parse_statement(statement).map_err(|e| StoreError::Syntax(e.to_string()))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_error)?;
        apply(&tx, &parsed)?;
        tx.commit().map_err(sql_error)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS graph_nodes (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id TEXT,                 -- value of the `id` property, if a string
            primary_label TEXT,
            labels TEXT NOT NULL,         -- JSON array
            properties TEXT NOT NULL,     -- JSON object
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_graph_nodes_id ON graph_nodes(node_id);
        CREATE INDEX IF NOT EXISTS idx_graph_nodes_label ON graph_nodes(primary_label);

        CREATE TABLE IF NOT EXISTS node_labels (
            node_key INTEGER NOT NULL,
            label TEXT NOT NULL,
            PRIMARY KEY(node_key, label),
            FOREIGN KEY(node_key) REFERENCES graph_nodes(key) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_node_labels_label ON node_labels(label);

        CREATE TABLE IF NOT EXISTS graph_links (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            link_id TEXT,
            link_type TEXT NOT NULL,
            source_key INTEGER NOT NULL,
            target_key INTEGER NOT NULL,
            properties TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY(source_key) REFERENCES graph_nodes(key) ON DELETE CASCADE,
            FOREIGN KEY(target_key) REFERENCES graph_nodes(key) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_graph_links_type ON graph_links(link_type);
        CREATE INDEX IF NOT EXISTS idx_graph_links_source ON graph_links(source_key);

        CREATE TABLE IF NOT EXISTS constraints (
            name TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            property TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(label, property)
        );

        -- One row per constrained (label, property, value); the primary key
        -- is what rejects duplicates.
        CREATE TABLE IF NOT EXISTS unique_keys (
            label TEXT NOT NULL,
            property TEXT NOT NULL,
            value TEXT NOT NULL,          -- JSON encoded
            node_key INTEGER NOT NULL,
            PRIMARY KEY(label, property, value),
            FOREIGN KEY(node_key) REFERENCES graph_nodes(key) ON DELETE CASCADE
        );
        ",
    )
    .map_err(sql_error)
}

fn apply(conn: &Connection, statement: &Statement) -> Result<(), StoreError> {
    match statement {
        Statement::CreateNode(pattern) => create_node(conn, pattern).map(|_| ()),
        Statement::MergeNode(pattern) => {
            if find_nodes(conn, pattern)?.is_empty() {
                create_node(conn, pattern)?;
            }
            Ok(())
        }
        Statement::CreateLink { matches, link } => {
            let mut bound: HashMap<&str, Vec<i64>> = HashMap::new();
            for pattern in matches {
                let Some(variable) = pattern.variable.as_deref() else {
                    continue;
                };
                let found = find_nodes(conn, pattern)?;
                match bound.get_mut(variable) {
                    Some(existing) => existing.retain(|key| found.contains(key)),
                    None => {
                        bound.insert(variable, found);
                    }
                }
            }

            let sources = bound.get(link.source.as_str()).cloned().unwrap_or_default();
            let targets = bound.get(link.target.as_str()).cloned().unwrap_or_default();
            if sources.is_empty() || targets.is_empty() {
                debug!("MATCH found nothing for {} link", link.link_type);
                return Ok(());
            }

            let link_id = link
                .properties
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);
            let properties = Value::Object(link.properties.clone()).to_string();
            let now = Utc::now().timestamp();
            for source in &sources {
                for target in &targets {
                    conn.execute(
                        "INSERT INTO graph_links (link_id, link_type, source_key, target_key, properties, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![link_id, link.link_type, source, target, properties, now],
                    )
                    .map_err(sql_error)?;
                }
            }
            Ok(())
        }
        Statement::CreateConstraint {
            name,
            if_not_exists,
            label,
            property,
        } => create_constraint(conn, name.as_deref(), *if_not_exists, label, property),
    }
}

fn create_node(conn: &Connection, pattern: &NodePattern) -> Result<i64, StoreError> {
    let mut labels: Vec<&str> = Vec::new();
    for label in &pattern.labels {
        if !labels.contains(&label.as_str()) {
            labels.push(label);
        }
    }

    let node_id = pattern.properties.get("id").and_then(Value::as_str);
    let labels_json = serde_json::to_string(&labels).map_err(json_error)?;
    let properties = Value::Object(pattern.properties.clone()).to_string();

    conn.execute(
        "INSERT INTO graph_nodes (node_id, primary_label, labels, properties, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            node_id,
            labels.first().copied(),
            labels_json,
            properties,
            Utc::now().timestamp()
        ],
    )
    .map_err(sql_error)?;
    let key = conn.last_insert_rowid();

    for label in &labels {
        conn.execute(
            "INSERT INTO node_labels (node_key, label) VALUES (?1, ?2)",
            params![key, label],
        )
        .map_err(sql_error)?;
    }

    for constraint in constraints_for(conn, &labels)? {
        let Some(value) = pattern.properties.get(&constraint.property) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        claim_unique_key(conn, &constraint, value, key)?;
    }

    Ok(key)
}

fn claim_unique_key(
    conn: &Connection,
    constraint: &ConstraintInfo,
    value: &Value,
    key: i64,
) -> Result<(), StoreError> {
    let inserted = conn.execute(
        "INSERT INTO unique_keys (label, property, value, node_key) VALUES (?1, ?2, ?3, ?4)",
        params![constraint.label, constraint.property, value.to_string(), key],
    );
    match inserted {
        Ok(_) => Ok(()),
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
            Err(StoreError::Constraint(format!(
                "Node already exists with label `{}` and property `{}` = {} (constraint {})",
                constraint.label, constraint.property, value, constraint.name
            )))
        }
        Err(e) => Err(sql_error(e)),
    }
}

fn constraints_for(conn: &Connection, labels: &[&str]) -> Result<Vec<ConstraintInfo>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT name, label, property FROM constraints WHERE label = ?1")
        .map_err(sql_error)?;
    let mut found = Vec::new();
    for label in labels {
        let rows = stmt
            .query_map(params![label], |row| {
                Ok(ConstraintInfo {
                    name: row.get(0)?,
                    label: row.get(1)?,
                    property: row.get(2)?,
                })
            })
            .map_err(sql_error)?;
        for row in rows {
            found.push(row.map_err(sql_error)?);
        }
    }
    Ok(found)
}

/// Keys of every node carrying all of the pattern's labels and properties.
fn find_nodes(conn: &Connection, pattern: &NodePattern) -> Result<Vec<i64>, StoreError> {
    let mut sql = String::from("SELECT n.key FROM graph_nodes n WHERE 1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();

    for label in &pattern.labels {
        values.push(SqlValue::Text(label.clone()));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM node_labels l WHERE l.node_key = n.key AND l.label = ?{})",
            values.len()
        ));
    }

    for (key, value) in &pattern.properties {
        if key == "id"
            && let Value::String(id) = value
        {
            values.push(SqlValue::Text(id.clone()));
            sql.push_str(&format!(" AND n.node_id = ?{}", values.len()));
            continue;
        }

        values.push(SqlValue::Text(format!("$.{}", key)));
        let path = values.len();
        match sql_value(value) {
            Some(v) => {
                values.push(v);
                sql.push_str(&format!(
                    " AND json_extract(n.properties, ?{}) = ?{}",
                    path,
                    values.len()
                ));
            }
            None => sql.push_str(&format!(" AND json_extract(n.properties, ?{}) IS NULL", path)),
        }
    }
    sql.push_str(" ORDER BY n.key");

    let mut stmt = conn.prepare(&sql).map_err(sql_error)?;
    let keys = stmt
        .query_map(params_from_iter(values.iter()), |row| row.get(0))
        .map_err(sql_error)?
        .collect::<rusqlite::Result<Vec<i64>>>()
        .map_err(sql_error)?;
    Ok(keys)
}

/// What `json_extract` yields for a scalar; `None` for null. Objects and
/// arrays never appear in statements.
fn sql_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

fn create_constraint(
    conn: &Connection,
    name: Option<&str>,
    if_not_exists: bool,
    label: &str,
    property: &str,
) -> Result<(), StoreError> {
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("constraint_{}_{}", label.to_lowercase(), property));

    let existing: Option<String> = conn
        .query_row(
            "SELECT name FROM constraints WHERE name = ?1 OR (label = ?2 AND property = ?3)",
            params![name, label, property],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_error)?;
    if let Some(existing) = existing {
        if if_not_exists {
            return Ok(());
        }
        return Err(StoreError::Backend(format!(
            "An equivalent constraint already exists: {}",
            existing
        )));
    }

    let constraint = ConstraintInfo {
        name: name.clone(),
        label: label.to_string(),
        property: property.to_string(),
    };

    // Existing data has to satisfy the new constraint
    let mut stmt = conn
        .prepare(
            "SELECT n.key, n.properties FROM graph_nodes n
             JOIN node_labels l ON l.node_key = n.key
             WHERE l.label = ?1 ORDER BY n.key",
        )
        .map_err(sql_error)?;
    let rows = stmt
        .query_map(params![label], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sql_error)?;

    for (key, properties) in rows {
        let properties: Map<String, Value> = serde_json::from_str(&properties).map_err(json_error)?;
        if let Some(value) = properties.get(property)
            && !value.is_null()
        {
            claim_unique_key(conn, &constraint, value, key)?;
        }
    }

    conn.execute(
        "INSERT INTO constraints (name, label, property, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, label, property, Utc::now().timestamp()],
    )
    .map_err(sql_error)?;
    debug!("Constraint {} installed on {}.{}", name, label, property);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteGraphStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteGraphStore::new(&temp_dir.path().join("graph.db")).unwrap();
        (temp_dir, store)
    }

    const TEXT_CONSTRAINT: &str =
        "CREATE CONSTRAINT unique_id_for_text IF NOT EXISTS FOR (n:Text) REQUIRE n.id IS UNIQUE";

    #[test]
    fn test_create_and_find_node() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session
            .execute(r#"CREATE (n:Element:P {id: "e1", tag: "p"})"#)
            .unwrap();

        let node = store.find_node("e1").unwrap().unwrap();
        assert_eq!(node.labels, vec!["Element", "P"]);
        assert_eq!(node.properties["tag"], "p");
        assert!(store.find_node("missing").unwrap().is_none());
    }

    #[test]
    fn test_syntax_error_is_classified() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        let err = session
            .execute(r#"CREATE (n:Text {id: "t", content: "C:\temp"})"#)
            .unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(store.stats().unwrap().nodes, 0);
    }

    #[test]
    fn test_constraint_rejects_duplicate() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(TEXT_CONSTRAINT).unwrap();
        session
            .execute(r#"CREATE (n:Text {id: "t1", content: "a"})"#)
            .unwrap();

        let err = session
            .execute(r#"CREATE (n:Text {id: "t1", content: "a"})"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.count_nodes_with_id("t1").unwrap(), 1);
    }

    #[test]
    fn test_duplicates_allowed_without_constraint() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        for _ in 0..2 {
            session.execute(r#"CREATE (n:Text {id: "t1"})"#).unwrap();
        }
        assert_eq!(store.count_nodes_with_id("t1").unwrap(), 2);
    }

    #[test]
    fn test_constraint_statement_is_idempotent() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(TEXT_CONSTRAINT).unwrap();
        session.execute(TEXT_CONSTRAINT).unwrap();
        assert_eq!(store.constraints().unwrap().len(), 1);

        let err = session
            .execute("CREATE CONSTRAINT unique_id_for_text FOR (n:Text) REQUIRE n.id IS UNIQUE")
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn test_constraint_over_existing_duplicates_fails() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(r#"CREATE (n:Text {id: "dup"})"#).unwrap();
        session.execute(r#"CREATE (n:Text {id: "dup"})"#).unwrap();

        let err = session.execute(TEXT_CONSTRAINT).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.constraints().unwrap().is_empty());
    }

    #[test]
    fn test_merge_creates_once() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        for _ in 0..3 {
            session
                .execute(r#"MERGE (n:Domain {id: "example.com", host: "example.com"})"#)
                .unwrap();
        }
        assert_eq!(store.count_nodes_with_id("example.com").unwrap(), 1);
    }

    #[test]
    fn test_link_between_matched_nodes() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(r#"CREATE (n:Element:P {id: "a"})"#).unwrap();
        session.execute(r#"CREATE (n:Text {id: "b"})"#).unwrap();
        session
            .execute(r#"MATCH (a {id: "a"}), (b {id: "b"}) CREATE (a)-[:CONTAINS {id: "l"}]->(b)"#)
            .unwrap();

        assert_eq!(
            store.links().unwrap(),
            vec![("CONTAINS".to_string(), "a".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_link_with_missing_endpoint_is_noop() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(r#"CREATE (n:Text {id: "a"})"#).unwrap();
        session
            .execute(r#"MATCH (a {id: "a"}), (b {id: "nope"}) CREATE (a)-[:CONTAINS]->(b)"#)
            .unwrap();
        assert_eq!(store.stats().unwrap().links, 0);
    }

    #[test]
    fn test_match_by_label_and_typed_property() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session
            .execute(r#"CREATE (n:Scalar:NUMBER {id: "s1", content: 2})"#)
            .unwrap();
        session
            .execute(r#"CREATE (n:Scalar:BOOLEAN {id: "s2", content: true})"#)
            .unwrap();
        session
            .execute("MATCH (a:NUMBER {content: 2}), (b {content: true}) CREATE (a)-[:PRECEDES]->(b)")
            .unwrap();

        assert_eq!(
            store.links().unwrap(),
            vec![("PRECEDES".to_string(), "s1".to_string(), "s2".to_string())]
        );
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = create_test_store();
        let mut session = store.open_session().unwrap();
        session.execute(TEXT_CONSTRAINT).unwrap();
        session.execute(r#"CREATE (n:Element:DIV {id: "1"})"#).unwrap();
        session.execute(r#"CREATE (n:Text {id: "2"})"#).unwrap();
        session.execute(r#"CREATE (n:Text {id: "3"})"#).unwrap();
        session
            .execute(r#"MATCH (a {id: "1"}), (b {id: "2"}) CREATE (a)-[:CONTAINS]->(b)"#)
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.links, 1);
        assert_eq!(stats.constraints, 1);
        assert_eq!(stats.labels.get("Text"), Some(&2));
        assert_eq!(stats.labels.get("Element"), Some(&1));
        assert_eq!(stats.link_types.get("CONTAINS"), Some(&1));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("graph.db");
        SqliteGraphStore::new(&path).unwrap();
        assert!(SqliteGraphStore::exists(&path));
        SqliteGraphStore::remove(&path).unwrap();
        assert!(!SqliteGraphStore::exists(&path));
    }
}
