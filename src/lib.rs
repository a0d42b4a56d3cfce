pub mod cddb;
pub mod config;
pub mod disc;
pub mod encoding;
pub mod error;
pub mod interrupt;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod provenance;
pub mod rip;
pub mod select;
pub mod titles;

/// Application name for XDG paths
pub const APP_NAME: &str = "discrip";

/// Sidecar file written into every disc directory
pub const PROVENANCE_FILENAME: &str = "00 - disc info.yaml";

/// Replacement for `/` in titles, since titles become path components
pub const PATH_SEPARATOR_PLACEHOLDER: &str = "::";
