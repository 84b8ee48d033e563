pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    DEFAULT_DB_PATH, load_graph, load_inputs_from_file, load_inputs_from_source, parse_input_line,
    prepare_store, resolve_db_path, run_ingest,
};
