pub mod json;

pub use json::{DeckExport, export_json_to_path, import_json};
