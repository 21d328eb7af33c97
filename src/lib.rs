//! Mailforge - static localized HTML email builder
//!
//! Mailforge compiles a mail artifact (Handlebars templates plus CSS
//! sources) into one self-contained HTML document per locale: CSS is
//! compiled, partitioned into head and inline streams, pruned against
//! the markup, inlined onto matching elements, and localized by
//! substituting `${{ file.key }}$` placeholders from per-locale JSON
//! translation files.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (argument parsing and dispatch)
//! - `config`: Build configuration and project layout conventions
//! - `styles`: CSS source compilation (`@import` resolution, auto-imports)
//! - `css`: CSS document model, partitioning, usage scan, pruning, minify
//! - `render`: Handlebars template rendering with partial discovery
//! - `inline`: Style inlining onto matching elements
//! - `localize`: Placeholder substitution from translation indexes
//! - `html`: HTML tag rewriting, whitespace collapse, beautifier
//! - `build`: The build pipeline tying the stages together
//! - `serve`: Preview server with live reload
//! - `dev`: Watch-rebuild-reload loop
//! - `report`: Tagged console output and recoverable-step policy

pub mod build;
pub mod cli;
pub mod config;
pub mod css;
pub mod dev;
pub mod html;
pub mod inline;
pub mod localize;
pub mod render;
pub mod report;
pub mod serve;
pub mod styles;
