//! `codegen_core` keeps generated regions of source files in sync with the
//! presets that produce them.
//!
//! A region is delimited by a start marker carrying YAML options and an end
//! marker:
//!
//! ```ts
//! // codegen:start {preset: barrel, include: ./lib/*.ts}
//! export * from './lib/a'
//! export * from './lib/b'
//! // codegen:end
//! ```
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source file
//!   → Lexer (finds start/end marker pairs for the file's comment style)
//!   → Options parser (YAML flow mapping → `PresetOptions`)
//!   → Preset registry (name → generator)
//!   → Cache layer (optional `codegen:hash` annotations)
//!   → Engine (runs the preset, compares, reports diagnostics with fixes)
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Configuration loading from `codegen.toml`: cache max age,
//!   command presets and include/exclude patterns.
//! - [`presets`] — The built-in presets.
//! - [`bridge`] — Helpers for hosts that can only lint code-like files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codegen_core::Codegen;
//! use std::path::Path;
//!
//! let codegen = Codegen::default();
//! let path = Path::new("src/index.ts");
//! let text = std::fs::read_to_string(path).unwrap();
//!
//! for diagnostic in codegen.lint(path, &text).unwrap() {
//!     eprintln!("{}:{}: {}", diagnostic.position.start.line, diagnostic.position.start.column, diagnostic.message);
//! }
//!
//! let fixed = codegen.fix(path, &text).unwrap();
//! std::fs::write(path, fixed.content).unwrap();
//! ```

pub use bridge::*;
pub use cache::*;
pub use config::*;
pub use context::*;
pub use dependencies::*;
pub use diagnostic::*;
pub use engine::*;
pub use error::*;
pub use lexer::*;
pub use options::*;
pub use position::*;
pub use presets::*;
pub use registry::*;
pub use validator::*;

pub mod bridge;
mod cache;
pub mod config;
mod context;
mod dependencies;
mod diagnostic;
mod engine;
#[allow(unused_assignments)]
mod error;
mod lexer;
mod options;
mod position;
pub mod presets;
mod registry;
mod validator;

#[cfg(test)]
mod __fixtures;
