//! Settings file schema and loading
//!
//! Settings come from a TOML file with `[api]` and `[cache]` sections,
//! optionally overlaid by `INAT_*` environment variables. Only front ends
//! load settings; the client library takes fully-formed values.

mod loader;
mod schema;

pub use loader::{user_config_path, CONFIG_FILE_NAME};
pub use schema::*;
