pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod erd;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use analyzer::{AssociationTable, ElementKind, RelationKind};
pub use corpus::{EntityId, Namespace};
pub use error::{RunFailure, SchemaError, Stage, Warning};
pub use loader::{BundleSource, CorpusSource, DirectorySource, Loader};
pub use model::NormalizedSchemaModel;
pub use naming::{NamingPolicy, SnakeCasePolicy};
pub use pipeline::Pipeline;
pub use types::{StorageType, TypeMapper};

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn analyze_bundle(bundle: &str) -> Result<NormalizedSchemaModel, String> {
    let source = BundleSource::from_json(bundle).map_err(|e| e.to_string())?;
    Pipeline::default().run(&source).map_err(|e| e.to_string())
}

/// Analyze a bundled schema document and return the model as JSON.
#[wasm_bindgen(js_name = "analyzeSchema")]
pub fn analyze_schema(bundle: &str) -> Result<String, String> {
    analyze_bundle(bundle)?.to_json().map_err(|e| e.to_string())
}

/// Analyze a bundled schema document and render it as ERD notation.
#[wasm_bindgen(js_name = "schemaToErd")]
pub fn schema_to_erd(bundle: &str) -> Result<String, String> {
    let model = analyze_bundle(bundle)?;
    Ok(erd::render(&model, &SnakeCasePolicy::default()))
}
