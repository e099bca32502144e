// font-fallback/src/charset.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The set of Basic Multilingual Plane characters that a font can render.
//!
//! The representation is built for fast lookup: a 256-entry index, one entry per block of 256
//! codepoints, each entry saying that the block is empty, full, or described by a 256-bit bitmap
//! in a separate block table. A typical 200-glyph font touches around ten blocks, so the whole
//! set is well under a kilobyte.

use log::{debug, warn};
use pathfinder_geometry::rect::RectI;
use std::fmt;

use crate::error::{Error, FontServiceError};
use crate::service::FontService;

/// Number of 256-codepoint blocks in the Basic Multilingual Plane.
pub const BLOCK_COUNT: usize = 256;

/// Number of bytes in the bitmap of one partially-filled block.
pub const BITMAP_SIZE: usize = 32;

/// The maximum number of partially-filled blocks a character set can hold.
///
/// Two values of the legacy one-byte index are reserved for empty and full blocks, which leaves
/// 254 block references. A font touching more partial blocks than this is truncated.
pub const MAX_BLOCKS: usize = 254;

/// Pixel size at which fonts are opened for scanning.
pub const SCAN_SIZE: u32 = 160;

/// The first codepoint probed when scanning a font. Control characters are never present.
pub const SCAN_START: u32 = 0x20;

pub(crate) const INDEX_EMPTY: u8 = 254;
pub(crate) const INDEX_FULL: u8 = 255;

/// A 256-bit presence bitmap for one block.
pub type Bitmap = [u8; BITMAP_SIZE];

/// What is known about one block of 256 codepoints.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockIndex {
    /// No codepoint in the block is present.
    Empty,
    /// Every codepoint in the block is present.
    Full,
    /// Presence is recorded in the given entry of the block table.
    Block(u8),
}

impl BlockIndex {
    /// Returns the legacy one-byte encoding of this index entry.
    #[inline]
    pub fn to_byte(self) -> u8 {
        match self {
            BlockIndex::Empty => INDEX_EMPTY,
            BlockIndex::Full => INDEX_FULL,
            BlockIndex::Block(offset) => offset,
        }
    }

    /// Decodes the legacy one-byte encoding of an index entry.
    #[inline]
    pub fn from_byte(byte: u8) -> BlockIndex {
        match byte {
            INDEX_EMPTY => BlockIndex::Empty,
            INDEX_FULL => BlockIndex::Full,
            offset => BlockIndex::Block(offset),
        }
    }
}

/// The characters that a font can render, over the range U+0000 to U+FFFF.
///
/// Character sets are immutable once built. Build one with a `CharacterSetBuilder`, with
/// `CharacterSet::from_codepoints`, or by scanning a font with `CharacterSet::scan`.
#[derive(Clone, PartialEq, Eq)]
pub struct CharacterSet {
    index: [BlockIndex; BLOCK_COUNT],
    blocks: Vec<Bitmap>,
}

impl CharacterSet {
    /// Creates a character set with no characters in it.
    #[inline]
    pub fn empty() -> CharacterSet {
        CharacterSet {
            index: [BlockIndex::Empty; BLOCK_COUNT],
            blocks: vec![],
        }
    }

    /// Builds a character set from a list of codepoints in any order.
    ///
    /// Codepoints above U+FFFF are ignored. Like a scanned font, the result is truncated if more
    /// than `MAX_BLOCKS` partial blocks would be needed.
    pub fn from_codepoints<I>(codepoints: I) -> Result<CharacterSet, Error>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut codepoints: Vec<u32> = codepoints.into_iter().filter(|&u| u <= 0xffff).collect();
        codepoints.sort_unstable();
        codepoints.dedup();

        let mut builder = CharacterSetBuilder::new();
        for codepoint in codepoints {
            builder.push(codepoint, true)?;
            if builder.is_truncated() {
                break;
            }
        }
        builder.finish()
    }

    /// Returns true if and only if the codepoint is present.
    #[inline]
    pub fn contains(&self, codepoint: u32) -> bool {
        if codepoint > 0xffff {
            return false;
        }
        match self.index[(codepoint >> 8) as usize] {
            BlockIndex::Empty => false,
            BlockIndex::Full => true,
            BlockIndex::Block(offset) => {
                let byte = ((codepoint >> 3) & 31) as usize;
                let bit = codepoint & 7;
                self.blocks[offset as usize][byte] & (1 << bit) != 0
            }
        }
    }

    /// Returns the index entry for the block containing codepoints `block * 256` onward.
    #[inline]
    pub fn block_index(&self, block: u8) -> BlockIndex {
        self.index[block as usize]
    }

    /// Returns the bitmap stored at the given offset of the block table.
    #[inline]
    pub fn bitmap(&self, offset: u8) -> Option<&Bitmap> {
        self.blocks.get(offset as usize)
    }

    /// Returns the number of partially-filled blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the size in bytes of the compact form: the index plus the block table.
    #[inline]
    pub fn size(&self) -> usize {
        BLOCK_COUNT + BITMAP_SIZE * self.blocks.len()
    }

    /// Returns the number of codepoints present.
    pub fn len(&self) -> usize {
        self.index
            .iter()
            .map(|entry| match *entry {
                BlockIndex::Empty => 0,
                BlockIndex::Full => 256,
                BlockIndex::Block(offset) => self.blocks[offset as usize]
                    .iter()
                    .map(|byte| byte.count_ones() as usize)
                    .sum(),
            })
            .sum()
    }

    /// Returns true if and only if no codepoint is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.iter().all(|entry| *entry == BlockIndex::Empty)
    }

    /// Returns the legacy one-byte encoding of the whole index.
    pub(crate) fn index_bytes(&self) -> [u8; BLOCK_COUNT] {
        let mut bytes = [INDEX_EMPTY; BLOCK_COUNT];
        for (byte, entry) in bytes.iter_mut().zip(self.index.iter()) {
            *byte = entry.to_byte();
        }
        bytes
    }

    /// Returns the block table.
    #[inline]
    pub(crate) fn bitmaps(&self) -> &[Bitmap] {
        &self.blocks
    }

    /// Reassembles a character set from its compact form, as stored in the cache file.
    ///
    /// Returns `None` if an index entry refers past the end of the block table.
    pub(crate) fn from_raw_parts(
        index_bytes: &[u8; BLOCK_COUNT],
        blocks: Vec<Bitmap>,
    ) -> Option<CharacterSet> {
        if blocks.len() > MAX_BLOCKS {
            return None;
        }
        let mut index = [BlockIndex::Empty; BLOCK_COUNT];
        for (entry, &byte) in index.iter_mut().zip(index_bytes.iter()) {
            *entry = BlockIndex::from_byte(byte);
            if let BlockIndex::Block(offset) = *entry {
                if offset as usize >= blocks.len() {
                    return None;
                }
            }
        }
        Some(CharacterSet { index, blocks })
    }

    /// Scans a font through the font service, probing every codepoint from U+0020 to U+FFFF.
    ///
    /// Returns `Ok(None)` if the service cannot open the font at all; such a font takes no part
    /// in substitution. A failure while probing a glyph aborts the scan.
    pub fn scan<S>(service: &mut S, identifier: &str) -> Result<Option<CharacterSet>, Error>
    where
        S: FontService + ?Sized,
    {
        let handle = match service.acquire_handle(identifier, SCAN_SIZE) {
            Ok(handle) => handle,
            Err(err) => {
                warn!("cannot open \"{}\" for scanning: {}", identifier, err);
                return Ok(None);
            }
        };

        let result = scan_with_handle(service, &handle, identifier);
        service.release_handle(handle);
        let set = result?;

        debug!(
            "scanned \"{}\": {} characters in {} partial blocks",
            identifier,
            set.len(),
            set.block_count()
        );
        Ok(Some(set))
    }
}

fn scan_with_handle<S>(
    service: &mut S,
    handle: &S::Handle,
    identifier: &str,
) -> Result<CharacterSet, Error>
where
    S: FontService + ?Sized,
{
    let mut builder = CharacterSetBuilder::new();
    for codepoint in SCAN_START..=0xffff {
        let scan = service
            .scan_glyph(handle, codepoint)
            .map_err(|err: FontServiceError| {
                warn!(
                    "scanning U+{:04X} of \"{}\" failed: {}",
                    codepoint, identifier, err
                );
                err
            })?;
        builder.push(codepoint, scan.is_present_for(codepoint))?;
        if builder.is_truncated() {
            warn!("\"{}\" has too many glyphs; character set truncated", identifier);
            break;
        }
    }
    builder.finish()
}

impl Default for CharacterSet {
    #[inline]
    fn default() -> CharacterSet {
        CharacterSet::empty()
    }
}

impl fmt::Debug for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self
            .index
            .iter()
            .filter(|entry| **entry == BlockIndex::Full)
            .count();
        f.debug_struct("CharacterSet")
            .field("characters", &self.len())
            .field("full_blocks", &full)
            .field("partial_blocks", &self.blocks.len())
            .finish()
    }
}

/// Incrementally builds a `CharacterSet` from presence observations.
///
/// Observations must arrive in increasing codepoint order. Codepoints that are never pushed are
/// absent.
#[derive(Debug)]
pub struct CharacterSetBuilder {
    set: CharacterSet,
    block: Option<u32>,
    bitmap: Bitmap,
    present: u32,
    last: Option<u32>,
    truncated: bool,
}

impl CharacterSetBuilder {
    /// Creates a builder with nothing observed yet.
    pub fn new() -> CharacterSetBuilder {
        CharacterSetBuilder {
            set: CharacterSet::empty(),
            block: None,
            bitmap: [0; BITMAP_SIZE],
            present: 0,
            last: None,
            truncated: false,
        }
    }

    /// Records whether `codepoint` is present.
    ///
    /// Once the builder is truncated, further observations are dropped.
    pub fn push(&mut self, codepoint: u32, present: bool) -> Result<(), Error> {
        debug_assert!(codepoint <= 0xffff);
        debug_assert!(self.last.map_or(true, |last| last < codepoint));
        self.last = Some(codepoint);

        if self.truncated {
            return Ok(());
        }

        let block = codepoint >> 8;
        if self.block != Some(block) {
            self.close_block()?;
            if self.truncated {
                return Ok(());
            }
            self.block = Some(block);
        }

        if present {
            let byte = ((codepoint >> 3) & 31) as usize;
            let bit = codepoint & 7;
            self.bitmap[byte] |= 1 << bit;
            self.present += 1;
        }
        Ok(())
    }

    /// Returns true if a block had to be dropped because the block table was full.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Finishes the character set.
    pub fn finish(mut self) -> Result<CharacterSet, Error> {
        self.close_block()?;
        Ok(self.set)
    }

    fn close_block(&mut self) -> Result<(), Error> {
        let block = match self.block.take() {
            Some(block) => block as usize,
            None => return Ok(()),
        };
        let bitmap = self.bitmap;
        let present = self.present;
        self.bitmap = [0; BITMAP_SIZE];
        self.present = 0;

        if present == 0 {
            return Ok(());
        }
        if present == 256 {
            self.set.index[block] = BlockIndex::Full;
            return Ok(());
        }
        if self.set.blocks.len() == MAX_BLOCKS {
            self.truncated = true;
            return Ok(());
        }
        self.set.blocks.try_reserve(1)?;
        self.set.index[block] = BlockIndex::Block(self.set.blocks.len() as u8);
        self.set.blocks.push(bitmap);
        Ok(())
    }
}

impl Default for CharacterSetBuilder {
    #[inline]
    fn default() -> CharacterSetBuilder {
        CharacterSetBuilder::new()
    }
}

/// The result of probing one codepoint of a font.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GlyphScan {
    /// The font has no glyph for the codepoint.
    Absent,
    /// The font reports a glyph with the given ink bounding box, in pixels.
    Present {
        /// Ink bounds of the glyph. All zero for a blank glyph.
        bounds: RectI,
    },
}

impl GlyphScan {
    /// Decides whether this probe result means `codepoint` is really present.
    ///
    /// Some fonts report blank glyphs for characters they do not have. A glyph with no ink only
    /// counts as present for the Unicode space separators.
    pub fn is_present_for(&self, codepoint: u32) -> bool {
        match *self {
            GlyphScan::Absent => false,
            GlyphScan::Present { bounds } => {
                let blank = bounds.origin_x() == 0
                    && bounds.origin_y() == 0
                    && bounds.width() == 0
                    && bounds.height() == 0;
                !blank || is_space_separator(codepoint)
            }
        }
    }
}

/// Returns true if the codepoint is in the Unicode `Zs` (space separator) category.
pub fn is_space_separator(codepoint: u32) -> bool {
    match codepoint {
        0x0020 | 0x00a0 | 0x1680 | 0x202f | 0x205f | 0x3000 => true,
        0x2000..=0x200a => true,
        _ => false,
    }
}
