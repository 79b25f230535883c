//! doclinks: link and anchor integrity for documentation trees
//!
//! This crate checks and repairs the cross-references of a tree of
//! Markdown (`.md`) and AsciiDoc (`.adoc`) documents laid out the way static
//! site generators render them: `dir/page.md` is served at `dir/page/`, and
//! `index.*` / `_index.*` files at their directory.
//!
//! # Overview
//!
//! A run ([`link_repair`]) does the following:
//!
//! - **Document Index**: every file of the tree, reachable by a short,
//!   disambiguated name (`stem`, `parent/stem`, `grandparent/parent/stem`)
//! - **Anchor Inspection**: anchors declared by several documents are renamed
//!   per document, duplicates inside one document are reported
//! - **Link Fixing**: whitespace and missing `/` are repaired in link text
//! - **Link Resolution**: each link is matched to the file it means, its
//!   anchor checked, and the link rewritten to canonical relative form
//!
//! Only lines that need a correction are rewritten; every other byte of a
//! file is left as it was. A second run over the output changes nothing.
//!
//! # Architecture
//!
//! - [`storage`]: the document index, with lazily built per-component indices
//! - [`document`]: the line buffer of one file and the two dialects' syntax
//! - [`file_dict`]: every document and asset of a run
//! - [`anchors`], [`fixer`], [`resolver`]: the three repair stages
//! - [`repair`]: sequencing of the stages, writing, reporting
//! - [`audit`]: record of every issue and fix, written as JSON
//! - [`config`]: layered configuration
//!
//! # Usage
//!
//! ```ignore
//! use doclinks::config::Settings;
//! use doclinks::link_repair;
//!
//! let settings = Settings { dry_run: true, ..Settings::for_target(&docs_path) };
//! let report = link_repair(&settings)?;
//! println!("{report}");
//! ```

// Model
pub mod document;
pub mod file_dict;
pub mod paths;
pub mod storage;

// Repair stages
pub mod anchors;
pub mod fixer;
pub mod repair;
pub mod resolver;

// Configuration and reporting
pub mod audit;
pub mod config;
pub mod error;
pub mod logging;

// Utilities
pub mod cli;

pub use repair::{link_repair, RepairReport};

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
