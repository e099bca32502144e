// font-fallback/src/substitution.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Maps every Basic Multilingual Plane character to a font that has it.

use log::{debug, warn};
use std::fmt;

use crate::catalog::FontCatalog;
use crate::charset::{BlockIndex, CharacterSet, BLOCK_COUNT};
use crate::error::Error;

const NOT_AVAILABLE: u16 = 0xffff;

/// The largest number of fonts that can take part in substitution.
pub const MAX_FONTS: usize = NOT_AVAILABLE as usize;

/// What is known about one block of 256 codepoints in the substitution table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubstitutionBlock {
    /// No installed font has any character in the block.
    NoneAvailable,
    /// Fonts for the block are listed in the given entry of the block table.
    Block(u8),
}

/// Maps each codepoint from U+0000 to U+FFFF to the first font in catalog order that has it.
///
/// The table is built once from every font's character set and never updated in place. When
/// fonts are added or rescanned, build a new one.
#[derive(Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    index: [SubstitutionBlock; BLOCK_COUNT],
    blocks: Vec<[u16; 256]>,
}

impl SubstitutionTable {
    /// Builds the table from all scanned fonts in `catalog`.
    pub fn build(catalog: &FontCatalog) -> Result<SubstitutionTable, Error> {
        let charsets = catalog.fonts().iter().map(|font| font.charset());
        SubstitutionTable::from_charsets(charsets)
    }

    /// Builds the table from character sets in priority order. `None` entries are skipped but
    /// still take up a font index.
    pub fn from_charsets<'a, I>(charsets: I) -> Result<SubstitutionTable, Error>
    where
        I: IntoIterator<Item = Option<&'a CharacterSet>>,
    {
        let mut flat: Vec<u16> = Vec::new();
        flat.try_reserve_exact(0x10000)?;
        flat.resize(0x10000, NOT_AVAILABLE);

        for (font_index, charset) in charsets.into_iter().enumerate() {
            let charset = match charset {
                Some(charset) => charset,
                None => continue,
            };
            if font_index >= MAX_FONTS {
                warn!("font {} is past the substitution limit; ignored", font_index);
                break;
            }
            fill_from_charset(&mut flat, font_index as u16, charset);
        }

        let mut table = SubstitutionTable {
            index: [SubstitutionBlock::NoneAvailable; BLOCK_COUNT],
            blocks: vec![],
        };
        for (block, fonts) in flat.chunks_exact(256).enumerate() {
            if fonts.iter().all(|&font| font == NOT_AVAILABLE) {
                continue;
            }
            let mut entry = [NOT_AVAILABLE; 256];
            entry.copy_from_slice(fonts);
            table.blocks.try_reserve(1)?;
            table.index[block] = SubstitutionBlock::Block(table.blocks.len() as u8);
            table.blocks.push(entry);
        }

        debug!(
            "substitution table: {} of {} blocks available",
            table.blocks.len(),
            BLOCK_COUNT
        );
        Ok(table)
    }

    /// Returns the first font in priority order that has `codepoint`, if any.
    #[inline]
    pub fn lookup(&self, codepoint: u32) -> Option<usize> {
        if codepoint > 0xffff {
            return None;
        }
        match self.index[(codepoint >> 8) as usize] {
            SubstitutionBlock::NoneAvailable => None,
            SubstitutionBlock::Block(offset) => {
                match self.blocks[offset as usize][(codepoint & 0xff) as usize] {
                    NOT_AVAILABLE => None,
                    font => Some(font as usize),
                }
            }
        }
    }

    /// Returns the index entry for the block containing codepoints `block * 256` onward.
    #[inline]
    pub fn block(&self, block: u8) -> SubstitutionBlock {
        self.index[block as usize]
    }

    /// Returns the number of codepoints some font has.
    pub fn available(&self) -> usize {
        self.blocks
            .iter()
            .map(|fonts| fonts.iter().filter(|&&font| font != NOT_AVAILABLE).count())
            .sum()
    }
}

impl fmt::Debug for SubstitutionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionTable")
            .field("available", &self.available())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

// Fonts are applied in priority order, so a codepoint that already has a font keeps it.
fn fill_from_charset(flat: &mut [u16], font: u16, charset: &CharacterSet) {
    for block in 0..BLOCK_COUNT {
        let base = block << 8;
        match charset.block_index(block as u8) {
            BlockIndex::Empty => {}
            BlockIndex::Full => {
                for slot in &mut flat[base..(base + 256)] {
                    if *slot == NOT_AVAILABLE {
                        *slot = font;
                    }
                }
            }
            BlockIndex::Block(offset) => {
                let bitmap = match charset.bitmap(offset) {
                    Some(bitmap) => bitmap,
                    None => continue,
                };
                for (byte_index, &byte) in bitmap.iter().enumerate() {
                    if byte == 0 {
                        continue;
                    }
                    for bit in 0..8 {
                        let slot = &mut flat[base + (byte_index << 3) + bit];
                        if *slot == NOT_AVAILABLE && byte & (1 << bit) != 0 {
                            *slot = font;
                        }
                    }
                }
            }
        }
    }
}
