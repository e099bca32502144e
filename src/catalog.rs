// font-fallback/src/catalog.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ordered list of installed fonts, grouped into families.
//!
//! Font identifiers have the form `Family.Tail`, for example `Homerton.Bold.Oblique`. The family
//! is everything before the first dot and the tail picks one of four style slots.

use std::cmp::Ordering;

use crate::charset::CharacterSet;

/// Number of style slots per family.
pub const STYLES: usize = 4;

/// One of the four faces of a family.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Style {
    /// The upright, normal-weight face.
    Regular = 0,
    /// An italic or oblique face.
    Slanted = 1,
    /// A bold face.
    Bold = 2,
    /// A bold italic or bold oblique face.
    BoldSlanted = 3,
}

impl Default for Style {
    fn default() -> Style {
        Style::Regular
    }
}

// Sorted by tail, for binary search.
static STYLE_TABLE: [(&str, Style); 11] = [
    ("Bold", Style::Bold),
    ("Bold.Italic", Style::BoldSlanted),
    ("Bold.Oblique", Style::BoldSlanted),
    ("Italic", Style::Slanted),
    ("Medium", Style::Regular),
    ("Medium.Italic", Style::Slanted),
    ("Medium.Oblique", Style::Slanted),
    ("Oblique", Style::Slanted),
    ("Regular", Style::Regular),
    ("Regular.Italic", Style::Slanted),
    ("Regular.Oblique", Style::Slanted),
];

impl Style {
    /// Looks up the style named by the tail of a font identifier, such as `Bold.Italic`.
    pub fn from_tail(tail: &str) -> Option<Style> {
        STYLE_TABLE
            .binary_search_by(|&(name, _)| name.cmp(tail))
            .ok()
            .map(|index| STYLE_TABLE[index].1)
    }
}

/// One installed font.
#[derive(Clone, Debug)]
pub struct FontEntry {
    identifier: String,
    charset: Option<CharacterSet>,
}

impl FontEntry {
    /// Returns the font's identifier, as passed to the font service.
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the characters this font has, if it has been scanned.
    #[inline]
    pub fn charset(&self) -> Option<&CharacterSet> {
        self.charset.as_ref()
    }
}

#[derive(Clone, Debug)]
struct FamilyEntry {
    name: String,
    fonts: [usize; STYLES],
}

/// The installed fonts in priority order, plus a dense family and style map.
///
/// Catalog order is the substitution priority: a character missing from the requested font is
/// taken from the first font in this order that has it. Different machines listing their fonts
/// in different orders will therefore substitute differently.
#[derive(Clone, Debug, Default)]
pub struct FontCatalog {
    fonts: Vec<FontEntry>,
    // Sorted case-insensitively by name.
    families: Vec<FamilyEntry>,
}

impl FontCatalog {
    /// Creates an empty catalog.
    #[inline]
    pub fn new() -> FontCatalog {
        FontCatalog::default()
    }

    /// Builds a catalog from font identifiers, keeping their order.
    ///
    /// The first font seen for a family fills all of its style slots. Later fonts whose tail
    /// names a known style take over that slot.
    pub fn from_identifiers<I, S>(identifiers: I) -> FontCatalog
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = FontCatalog::new();
        for identifier in identifiers {
            catalog.push(identifier.into());
        }
        catalog
    }

    /// Appends a font to the end of the catalog and returns its index.
    pub fn push(&mut self, identifier: String) -> usize {
        let font_index = self.fonts.len();
        let (family, tail) = match identifier.find('.') {
            Some(dot) => (&identifier[..dot], Some(&identifier[(dot + 1)..])),
            None => (&identifier[..], None),
        };

        match self.family_position(family) {
            Ok(position) => {
                if let Some(style) = tail.and_then(Style::from_tail) {
                    self.families[position].fonts[style as usize] = font_index;
                }
            }
            Err(position) => self.families.insert(
                position,
                FamilyEntry {
                    name: family.to_owned(),
                    fonts: [font_index; STYLES],
                },
            ),
        }

        self.fonts.push(FontEntry {
            identifier,
            charset: None,
        });
        font_index
    }

    /// Returns the number of fonts.
    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Returns true if and only if the catalog has no fonts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Returns all fonts in priority order.
    #[inline]
    pub fn fonts(&self) -> &[FontEntry] {
        &self.fonts
    }

    /// Returns the font at `index`.
    #[inline]
    pub fn font(&self, index: usize) -> Option<&FontEntry> {
        self.fonts.get(index)
    }

    /// Returns the names of all families, sorted.
    pub fn families(&self) -> Vec<String> {
        self.families.iter().map(|family| family.name.clone()).collect()
    }

    /// Returns the font to use for a family and style. Family names are matched ignoring case.
    pub fn select(&self, family_name: &str, style: Style) -> Option<usize> {
        self.family_position(family_name)
            .ok()
            .map(|position| self.families[position].fonts[style as usize])
    }

    /// Finds a font by identifier, ignoring case.
    pub fn font_index_by_identifier(&self, identifier: &str) -> Option<usize> {
        self.fonts
            .iter()
            .position(|font| font.identifier.eq_ignore_ascii_case(identifier))
    }

    /// Attaches a character set to a font, replacing any it had.
    ///
    /// A substitution table built before this call is stale and must be rebuilt.
    pub fn set_charset(&mut self, index: usize, charset: Option<CharacterSet>) {
        self.fonts[index].charset = charset;
    }

    fn family_position(&self, family_name: &str) -> Result<usize, usize> {
        self.families
            .binary_search_by(|family| cmp_ignore_case(&family.name, family_name))
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
}
