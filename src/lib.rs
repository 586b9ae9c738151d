//! # Orgsite
//!
//! A static site publisher for workspaces of structured text: org-mode
//! documents, Markdown files, and notebooks become a cross-linked HTML site,
//! configured the Jupyter-Book way (`_config.yml` + `_toc.yml`) or natively
//! (`.org-publish.json`).
//!
//! # Architecture: One Sequential Pipeline
//!
//! A publish run is a single ordered pass per project:
//!
//! ```text
//! load config → load + flatten _toc.yml → discover files
//!     → per file: up-to-date gate → format dispatch → convert → write
//!     → sitemap/index page → (per workspace) GitHub Pages artifacts
//! ```
//!
//! Files within a project, and projects within a workspace, are processed
//! strictly one at a time. The filesystem is the only shared state, every
//! file's failure is contained in its own result record, and a progress
//! callback fires before each file — which keeps runs reproducible and
//! output ordering deterministic.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Project/workspace config model, JSON and Jupyter-Book YAML loaders, validation |
//! | [`yaml`] | Indentation-sensitive mini-YAML reader for `_config.yml` and `_toc.yml` |
//! | [`toc`] | TOC tree model and the flattener that derives linear prev/next navigation |
//! | [`discover`] | TOC-driven and scan-driven source discovery with include/exclude globs |
//! | [`publish`] | Up-to-date gate, output path mapping, per-format publish dispatch |
//! | [`org`] | Org parsing, `#+INCLUDE` expansion, HTML export |
//! | [`markdown`] | Markdown conversion with `.md` → `.html` link rewriting |
//! | [`notebook`] | Notebook JSON model and cell rendering |
//! | [`sitemap`] | TOC-structured and auto-generated index pages |
//! | [`theme`] | Theme protocol, registry, default theme, search-index text extraction |
//! | [`orchestrate`] | Multi-project ordering, themed/plain runs, GitHub Pages output |
//! | [`output`] | CLI result formatting |
//!
//! # Design Decisions
//!
//! ## A Dedicated Mini-YAML Reader
//!
//! `_config.yml` and `_toc.yml` use a small, fixed YAML shape: mappings,
//! sequences, and sequence items that are themselves flat mappings. The
//! [`yaml`] module parses exactly that with a line scanner and an indent
//! stack. A full YAML library would add anchors, tags, and round-trip
//! machinery this engine never reads.
//!
//! ## Closed Dispatch
//!
//! The publishing-function setting collapses to a closed enum
//! ([`config::PublishingFunction`]) and converter routing happens at one
//! exhaustive `match` ([`publish::resolve_format`]). Converters are sibling
//! strategies; adding a format touches the enum, the match, and nothing
//! else.
//!
//! ## Incremental by Modification Time
//!
//! A file whose output is strictly newer than its source is skipped as an
//! up-to-date success carrying no metadata. That makes a second publish of
//! an unchanged workspace a pure no-op, while `--force` and generated
//! sitemaps (always republished) stay exact.
//!
//! ## Themes Are Values, Not Globals
//!
//! Page assembly goes through the [`theme::Theme`] trait. Callers build a
//! [`theme::ThemeRegistry`] and pass it in; a lookup miss falls back to the
//! built-in default theme, so a misspelled theme name degrades to a working
//! site instead of failing the run.

pub mod config;
pub mod discover;
pub mod markdown;
pub mod notebook;
pub mod orchestrate;
pub mod org;
pub mod output;
pub mod publish;
pub mod sitemap;
pub mod theme;
pub mod toc;
pub mod yaml;

#[cfg(test)]
pub(crate) mod test_helpers;
