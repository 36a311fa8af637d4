//! Loading pipeline: finds data files, deserializes them, and builds the
//! catalog, engine configuration, and graph snapshots.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by the higher-level loaders.

use crate::schema::{GeneratorData, ItemData, MachineData, RecipeData};
use flowplan_core::catalog::{Catalog, CatalogBuilder, CatalogError, DanglingRef};
use flowplan_core::config::EngineConfig;
use flowplan_core::graph::GraphSnapshot;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An id is empty or contains whitespace or control characters.
    #[error("malformed id {id:?} in {file}")]
    MalformedId { file: PathBuf, id: String },

    /// A duplicate id was found.
    #[error("duplicate id '{id}' in {file}")]
    DuplicateId { file: PathBuf, id: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DataLoadError {
    fn from_catalog(file: &Path, err: CatalogError) -> Self {
        match err {
            CatalogError::MalformedId(id) => DataLoadError::MalformedId {
                file: file.to_path_buf(),
                id,
            },
            CatalogError::Duplicate(id) => DataLoadError::DuplicateId {
                file: file.to_path_buf(),
                id,
            },
        }
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if none exists, or `Err(ConflictingFormats)` if more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), ?format, "reading data file");

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML cannot hold a top-level array, so
/// for TOML files the array is read from the `toml_key` entry of the
/// top-level table. RON and JSON files hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), toml_key, "reading data list");
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Register every entry of one table, converting each through its schema type.
fn register_all<D, T>(
    builder: &mut CatalogBuilder,
    path: &Path,
    toml_key: &str,
    register: fn(&mut CatalogBuilder, T) -> Result<&mut CatalogBuilder, CatalogError>,
) -> Result<usize, DataLoadError>
where
    D: DeserializeOwned,
    T: From<D>,
{
    let entries: Vec<D> = deserialize_list(path, toml_key)?;
    let count = entries.len();
    for entry in entries {
        register(builder, T::from(entry)).map_err(|e| DataLoadError::from_catalog(path, e))?;
    }
    Ok(count)
}

/// Load the catalog tables from `dir`.
///
/// `items`, `recipes`, and `machines` are required; `generators` is
/// optional. Recipes that name missing items or machines are kept and
/// logged: the engine reports such recipes as unset when a node uses them.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    let items_path = require_data_file(dir, "items")?;
    let items = register_all::<ItemData, _>(&mut builder, &items_path, "items", CatalogBuilder::register_item)?;

    let machines_path = require_data_file(dir, "machines")?;
    let machines = register_all::<MachineData, _>(
        &mut builder,
        &machines_path,
        "machines",
        CatalogBuilder::register_machine,
    )?;

    let recipes_path = require_data_file(dir, "recipes")?;
    let recipes = register_all::<RecipeData, _>(
        &mut builder,
        &recipes_path,
        "recipes",
        CatalogBuilder::register_recipe,
    )?;

    let generators = match find_data_file(dir, "generators")? {
        Some(path) => register_all::<GeneratorData, _>(
            &mut builder,
            &path,
            "generators",
            CatalogBuilder::register_generator,
        )?,
        None => 0,
    };

    let catalog = builder.build();
    for dangling in catalog.dangling_references() {
        match dangling {
            DanglingRef::Item { recipe, item } => {
                warn!(%recipe, %item, "recipe references an unknown item")
            }
            DanglingRef::Machine { recipe, machine } => {
                warn!(%recipe, %machine, "recipe references an unknown machine")
            }
        }
    }
    info!(items, recipes, machines, generators, dir = %dir.display(), "catalog loaded");
    Ok(catalog)
}

// ===========================================================================
// Engine configuration and snapshots
// ===========================================================================

/// Load `engine.{ron,toml,json}` from `dir`, or the defaults when absent.
pub fn load_engine_config(dir: &Path) -> Result<EngineConfig, DataLoadError> {
    match find_data_file(dir, "engine")? {
        Some(path) => deserialize_file(&path),
        None => {
            debug!(dir = %dir.display(), "no engine config, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

/// Everything the engine needs besides the graph itself.
#[derive(Debug, Clone)]
pub struct GameData {
    pub catalog: Catalog,
    pub config: EngineConfig,
}

/// Load the catalog and engine configuration from one directory.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    Ok(GameData {
        catalog: load_catalog(dir)?,
        config: load_engine_config(dir)?,
    })
}

/// Load a graph snapshot saved by the editor, in any supported format.
pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot, DataLoadError> {
    let snapshot: GraphSnapshot = deserialize_file(path)?;
    debug!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

// ===========================================================================
// Tests
// ===========================================================================
