// font-fallback/src/segment.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Splits text into runs that can each be drawn with a single font.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::charset::CharacterSet;
use crate::substitution::SubstitutionTable;

/// The maximum number of characters in one run.
///
/// This only bounds buffer sizes. A run cut at this length is followed by another run in the
/// same font.
pub const MAX_RUN_LENGTH: usize = 200;

/// A stretch of text drawn with one font.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Run {
    /// The catalog index of the font, or `None` if no installed font has these characters.
    pub font: Option<usize>,
    /// The characters, all in the Basic Multilingual Plane.
    pub chars: Vec<char>,
    /// The byte offset in the source text of each character, plus one trailing entry for the
    /// byte offset just past the run.
    pub offsets: Vec<usize>,
}

impl Run {
    /// Returns the number of characters in the run.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns true if the run has no characters. Runs produced by a `Segmenter` never are.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Returns the byte offset in the source text where the run starts.
    #[inline]
    pub fn start(&self) -> usize {
        self.offsets[0]
    }

    /// Returns the byte offset in the source text just past the run.
    #[inline]
    pub fn end(&self) -> usize {
        self.offsets[self.chars.len()]
    }
}

/// Walks text and yields maximal same-font runs.
///
/// A character goes to the primary font if the primary font has it, otherwise to the font the
/// substitution table names for it, otherwise to no font. Characters outside the Basic
/// Multilingual Plane are treated as U+FFFD.
#[derive(Debug)]
pub struct Segmenter<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    primary: usize,
    charset: Option<&'a CharacterSet>,
    substitution: &'a SubstitutionTable,
}

impl<'a> Segmenter<'a> {
    /// Creates a segmenter for `text` with the given primary font.
    ///
    /// `charset` is the primary font's character set; pass `None` if it could not be scanned, in
    /// which case every character is substituted.
    pub fn new(
        text: &'a str,
        primary: usize,
        charset: Option<&'a CharacterSet>,
        substitution: &'a SubstitutionTable,
    ) -> Segmenter<'a> {
        Segmenter {
            text,
            chars: text.char_indices().peekable(),
            primary,
            charset,
            substitution,
        }
    }

    /// Returns the font a single character is drawn with.
    pub fn resolve(&self, character: char) -> Option<usize> {
        let codepoint = bmp_char(character) as u32;
        match self.charset {
            Some(charset) if charset.contains(codepoint) => Some(self.primary),
            _ => self.substitution.lookup(codepoint),
        }
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        let (offset, character) = self.chars.next()?;
        let font = self.resolve(character);

        let mut chars = vec![bmp_char(character)];
        let mut offsets = vec![offset];
        while chars.len() < MAX_RUN_LENGTH {
            let (offset, character) = match self.chars.peek() {
                Some(&next) => next,
                None => break,
            };
            if self.resolve(character) != font {
                break;
            }
            self.chars.next();
            chars.push(bmp_char(character));
            offsets.push(offset);
        }

        let end = match self.chars.peek() {
            Some(&(offset, _)) => offset,
            None => self.text.len(),
        };
        offsets.push(end);

        Some(Run {
            font,
            chars,
            offsets,
        })
    }
}

#[inline]
fn bmp_char(character: char) -> char {
    if (character as u32) > 0xffff {
        '\u{fffd}'
    } else {
        character
    }
}
