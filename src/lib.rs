//! # Restruct - Spreadsheet restructuring onto a template schema
//!
//! Restruct takes a source tabular file (CSV, TSV or XLSX) and a template
//! file, maps the source rows onto the template's column schema with a
//! deterministic rule-based engine, and produces a generated spreadsheet
//! plus a textual change log of every mapping decision.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Source file │────▶│   Reader    │────▶│   Mapper    │────▶│ XLSX output │
//! │ (CSV/XLSX)  │     │ (auto-enc)  │     │ (rules)     │     │ + change log│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                               ▲
//!                                     template header row
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restruct::mapper::{map_table, MapperOptions, TransformCatalog};
//! use restruct::reader::read_table;
//!
//! let source = read_table(&bytes, "funcionarios.csv")?;
//! let template = read_table(&template_bytes, "template.csv")?;
//! let out = map_table(
//!     &source.table,
//!     template.table.headers(),
//!     &TransformCatalog::default(),
//!     &MapperOptions::default(),
//! );
//! println!("{}", out.changelog.render());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - Typed cells and the in-memory table model
//! - [`reader`] - Tabular file parsing with encoding auto-detection
//! - [`sampler`] - Bounded row samples for diagnostics
//! - [`mapper`] - The rule-based schema-reconciliation engine
//! - [`changelog`] - The per-run audit trail
//! - [`writer`] - XLSX/CSV serialization
//! - [`storage`] - Generated-file store with TTL expiry
//! - [`pipeline`] - End-to-end orchestration
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod changelog;
pub mod error;
pub mod table;

// Input
pub mod reader;
pub mod sampler;

// Mapping
pub mod mapper;

// Output
pub mod storage;
pub mod writer;

// Orchestration
pub mod config;
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, PipelineError, ReadError, ServerError, StorageError, WriteError,
};

// =============================================================================
// Re-exports - Table model
// =============================================================================

pub use table::{Cell, CellType, ColumnProfile, Table};

// =============================================================================
// Re-exports - Reader
// =============================================================================

pub use reader::{detect_delimiter, detect_encoding, read_table, FileFormat, ParsedFile};

// =============================================================================
// Re-exports - Sampler
// =============================================================================

pub use sampler::{sample_rows, sample_to_json, DEFAULT_SAMPLE_ROWS};

// =============================================================================
// Re-exports - Mapper
// =============================================================================

pub use mapper::{
    example_catalog, map_table, plan_rules, LookupRule, MappedOutput, MapperOptions, MappingRule,
    operations_description, ScaleRule, SplitRule, TransformCatalog, TransformOp,
};

// =============================================================================
// Re-exports - Change log
// =============================================================================

pub use changelog::{ChangeLog, ChangeLogEntry};

// =============================================================================
// Re-exports - Writer and storage
// =============================================================================

pub use storage::{DiskStore, FileStore, StoredFile};
pub use writer::{write_csv, write_xlsx, XLSX_CONTENT_TYPE};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{restructure, FileInput, RestructureOutcome};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::AppConfig;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, RestructureResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
