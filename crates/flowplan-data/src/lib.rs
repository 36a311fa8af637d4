//! Data-file loading for the flow engine: catalog tables, engine
//! configuration, and graph snapshots, each in RON, TOML, or JSON.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_catalog, load_engine_config, load_game_data, load_snapshot};
