// font-fallback/src/lib.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `font-fallback` draws and measures Unicode text using a pool of installed fonts that each
//! cover only part of Unicode.
//!
//! Every font is scanned once into a compact `CharacterSet`. From all of those a single
//! `SubstitutionTable` records, for each Basic Multilingual Plane character, the first font in
//! catalog order that has it. Text is then split into runs: characters the requested font has
//! stay in it, the rest move to their substitution font, and characters no font has are drawn
//! as small hex-code boxes. Each run is handed to the platform glyph service, which the
//! application supplies by implementing `FontService`.
//!
//! ```ignore
//! let mut library = FontLibrary::new(service, &LibraryOptions::new())?;
//! let width = library.width("Homerton", Style::Regular, 240, "Hello, ὕαλον")?;
//! ```

pub mod catalog;
pub mod charset;
pub mod charset_cache;
pub mod error;
pub mod handle_cache;
pub mod library;
pub mod process;
pub mod segment;
pub mod service;
pub mod substitution;

pub use crate::catalog::{FontCatalog, Style};
pub use crate::charset::{CharacterSet, GlyphScan};
pub use crate::error::{CacheError, Error, FontServiceError};
pub use crate::library::{FontLibrary, Hit, LibraryOptions};
pub use crate::service::{FontService, HitMode, PaintFlags};
pub use crate::substitution::SubstitutionTable;
