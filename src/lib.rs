//! Carrybook turns the scanned tutorial sheets of babywearing carries into step images, and the
//! carries stored in the database into printable artifacts: a social media post per carry and a
//! catalog book of all of them.
//!
//! The crate is organised around two pure cores, the slicing of a tutorial sheet into numbered
//! steps (`grid` and `extract`) and the normalization of the database rows for display (`title`,
//! `normalize` and `carry`). Everything touching the outside world sits behind the traits of the
//! `source` and `storage` modules, so that the pipelines of the `pipeline` module can be driven
//! with in-memory collaborators.
#![warn(clippy::unwrap_used)]

/// The `Carry` record and the raw database row it is built from.
pub mod carry;

/// Settings read from the environment (`.env` included) and the JSON configuration of the renderer.
pub mod configuration;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every error carries a human readable context, the message of the error it was caused by (if any)
/// and an `ErrorKind` telling the caller which family of failure happened: a carry missing from the
/// database is a `NotFound`, a value missing from a lookup table is a `Lookup`, and so on.
///
/// Also, the `ContextError` type implements `std::fmt::Display` and `Debug`, so it can be explicitly printed out.
pub mod error;

/// Slicing of the tutorial sheets.
///
/// # Introduction
///
/// A tutorial sheet is a PDF document whose pages hold a 3×3 grid of steps at fixed coordinates.
/// The `StepExtractor` rasterizes every cell at 300 DPI, row by row from the top left corner, and
/// saves the cells which are not blank as `<carry>_stepNN.png`. A blank cell ends its row, since a
/// tutorial runs out of steps mid-row, but the following rows are still looked at.
pub mod extract;

/// The fixed geometry of the tutorial sheets and the blank cell detection.
pub mod grid;

/// Display strings for the numeric columns of a carry.
pub mod normalize;

/// The module were the `PdfDocument` interface for writing PDF documents is presented.
///
/// # Disclaimer
///
/// The font embedding follows the one of [fschutt](https://github.com/fschutt) for the crate [printpdf](https://github.com/fschutt/printpdf):
/// fonts are embedded whole as Type0 fonts with an `Identity-H` encoding, text is written as glyph identifiers
/// and a ToUnicode map keeps it searchable.
pub mod pdf;

/// The end to end jobs run by the command line: `publish_tutorial_steps`, `generate_post` and `generate_book`.
pub mod pipeline;

/// Layout of the cover and tutorial pages, driven by a declarative `PageTemplate`.
pub mod render;

/// The scanned documents, read with `lopdf` and rasterized with poppler's `pdftoppm`.
pub mod source;

/// The traits of the remote collaborators and the idempotent uploader.
pub mod storage;

/// The hosted database and bucket, reached through their REST interfaces.
pub mod supabase;

/// Splitting of a long title into the title proper and the finish.
pub mod title;
