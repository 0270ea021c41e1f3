//! Corpus traversal: where schema documents come from.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Version,
    Dictionary,
    Categories,
    Object,
    Event,
    Profile,
}

/// One logical schema document yielded by a [`CorpusSource`].
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub kind: DocumentKind,
    /// Where the document came from, for diagnostics.
    pub origin: String,
    /// Identifier to use when the document carries no `name` key.
    pub default_name: Option<String>,
    /// Category implied by the document's location.
    pub category: Option<String>,
    pub body: Value,
}

impl SourceDocument {
    fn new(kind: DocumentKind, origin: impl Into<String>, body: Value) -> Self {
        Self {
            kind,
            origin: origin.into(),
            default_name: None,
            category: None,
            body,
        }
    }

    fn named(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    fn in_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}

/// A traversal over every document of a schema corpus. The loader does not
/// care how the documents are stored.
pub trait CorpusSource {
    fn documents(&self) -> Result<Vec<SourceDocument>, SchemaError>;

    fn describe(&self) -> String;
}

/// An OCSF schema repository checked out on disk:
///
/// ```text
/// schema/
/// ├── version.json
/// ├── dictionary.json
/// ├── categories.json
/// ├── objects/device.json
/// ├── events/base_event.json
/// ├── events/system/process_activity.json   (category = system)
/// └── profiles/host.json
/// ```
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn required(&self, file: &str, kind: DocumentKind) -> Result<SourceDocument, SchemaError> {
        let path = self.root.join(file);
        if !path.is_file() {
            return Err(SchemaError::MissingDocument {
                name: path.display().to_string(),
            });
        }
        Ok(SourceDocument::new(
            kind,
            path.display().to_string(),
            read_json(&path)?,
        ))
    }

    fn directory(
        &self,
        dir: &Path,
        kind: DocumentKind,
        category: Option<&str>,
        out: &mut Vec<SourceDocument>,
    ) -> Result<usize, SchemaError> {
        let files = json_files(dir)?;
        for path in &files {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            out.push(
                SourceDocument::new(kind, path.display().to_string(), read_json(path)?)
                    .named(stem)
                    .in_category(category.map(str::to_string)),
            );
        }
        Ok(files.len())
    }
}

impl CorpusSource for DirectorySource {
    fn documents(&self) -> Result<Vec<SourceDocument>, SchemaError> {
        if !self.root.is_dir() {
            return Err(SchemaError::MissingDocument {
                name: self.root.display().to_string(),
            });
        }

        let mut docs = vec![
            self.required("version.json", DocumentKind::Version)?,
            self.required("dictionary.json", DocumentKind::Dictionary)?,
            self.required("categories.json", DocumentKind::Categories)?,
        ];

        let objects_dir = self.root.join("objects");
        if objects_dir.is_dir() {
            let count = self.directory(&objects_dir, DocumentKind::Object, None, &mut docs)?;
            debug!("read {} object documents from {:?}", count, objects_dir);
        }

        // events/*.json carry their own category; events/<category>/*.json
        // take it from the directory name.
        let events_dir = self.root.join("events");
        if events_dir.is_dir() {
            let mut count = self.directory(&events_dir, DocumentKind::Event, None, &mut docs)?;
            for sub in subdirectories(&events_dir)? {
                let category = sub
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                count += self.directory(&sub, DocumentKind::Event, Some(&category), &mut docs)?;
            }
            debug!("read {} event documents from {:?}", count, events_dir);
        }

        let profiles_dir = self.root.join("profiles");
        if profiles_dir.is_dir() {
            let count = self.directory(&profiles_dir, DocumentKind::Profile, None, &mut docs)?;
            debug!("read {} profile documents from {:?}", count, profiles_dir);
        }

        Ok(docs)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// A whole corpus held in one JSON document:
///
/// ```json
/// { "version": "1.3.0", "types": {}, "dictionary": {}, "categories": {},
///   "objects": { "device": {} }, "events": {}, "profiles": {} }
/// ```
pub struct BundleSource {
    label: String,
    bundle: Value,
}

impl BundleSource {
    pub fn new(bundle: Value) -> Self {
        Self {
            label: "bundle".into(),
            bundle,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let bundle = serde_json::from_str(text).map_err(|source| SchemaError::Json {
            origin: "bundle".into(),
            source,
        })?;
        Ok(Self::new(bundle))
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn section(&self, key: &str) -> Result<Map<String, Value>, SchemaError> {
        match self.bundle.get(key) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(SchemaError::MalformedDocument {
                origin: format!("{}/{}", self.label, key),
                reason: "expected an object".into(),
            }),
        }
    }
}

impl CorpusSource for BundleSource {
    fn documents(&self) -> Result<Vec<SourceDocument>, SchemaError> {
        if !self.bundle.is_object() {
            return Err(SchemaError::MalformedDocument {
                origin: self.label.clone(),
                reason: "bundle must be a JSON object".into(),
            });
        }

        let version = self
            .bundle
            .get("version")
            .cloned()
            .ok_or_else(|| SchemaError::MissingDocument {
                name: format!("{}/version", self.label),
            })?;

        let mut docs = vec![
            SourceDocument::new(
                DocumentKind::Version,
                format!("{}/version", self.label),
                json!({ "version": version }),
            ),
            SourceDocument::new(
                DocumentKind::Dictionary,
                format!("{}/dictionary", self.label),
                json!({
                    "types": { "attributes": self.section("types")? },
                    "attributes": self.section("dictionary")?,
                }),
            ),
            SourceDocument::new(
                DocumentKind::Categories,
                format!("{}/categories", self.label),
                json!({ "attributes": self.section("categories")? }),
            ),
        ];

        let sections = [
            ("objects", DocumentKind::Object),
            ("events", DocumentKind::Event),
            ("profiles", DocumentKind::Profile),
        ];
        for (key, kind) in sections {
            for (name, body) in self.section(key)? {
                let origin = format!("{}/{}/{}", self.label, key, name);
                docs.push(SourceDocument::new(kind, origin, body).named(name));
            }
        }

        Ok(docs)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

fn read_json(path: &Path) -> Result<Value, SchemaError> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SchemaError::Json {
        origin: path.display().to_string(),
        source,
    })
}

/// `*.json` files directly inside `dir`, sorted so traversal is stable.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let mut files: Vec<PathBuf> = list(dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let mut dirs: Vec<PathBuf> = list(dir)?.into_iter().filter(|p| p.is_dir()).collect();
    dirs.sort();
    Ok(dirs)
}

fn list(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let io_err = |source| SchemaError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}
