// font-fallback/src/charset_cache.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Saves and restores scanned character sets, so that fonts need not be rescanned on every start.
//!
//! The format is little endian:
//!
//! * `u32` format version (`CACHE_VERSION`),
//! * then, for each scanned font, until the end of the file:
//!   * `u32` identifier length and the identifier in UTF-8,
//!   * `u32` number of partial blocks `n`,
//!   * 256 index bytes: 254 for an empty block, 255 for a full one, otherwise a block number,
//!   * `n` bitmaps of 32 bytes each.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use std::io::{self, Read, Write};

use crate::catalog::FontCatalog;
use crate::charset::{Bitmap, CharacterSet, BITMAP_SIZE, BLOCK_COUNT, MAX_BLOCKS};
use crate::error::CacheError;

/// The version of the format written by this crate.
pub const CACHE_VERSION: u32 = 2;

// Identifiers longer than this are not font identifiers.
const MAX_IDENTIFIER_LEN: u32 = 1024;

/// Writes the character set of every scanned font in `catalog`, in catalog order.
///
/// Returns the number of character sets written.
pub fn write_cache<W>(writer: &mut W, catalog: &FontCatalog) -> Result<usize, CacheError>
where
    W: Write,
{
    writer.write_u32::<LittleEndian>(CACHE_VERSION)?;

    let mut count = 0;
    for font in catalog.fonts() {
        let charset = match font.charset() {
            Some(charset) => charset,
            None => continue,
        };
        let identifier = font.identifier().as_bytes();
        writer.write_u32::<LittleEndian>(identifier.len() as u32)?;
        writer.write_all(identifier)?;
        writer.write_u32::<LittleEndian>(charset.block_count() as u32)?;
        writer.write_all(&charset.index_bytes())?;
        for bitmap in charset.bitmaps() {
            writer.write_all(bitmap)?;
        }
        count += 1;
    }
    writer.flush()?;

    info!("{} charsets saved", count);
    Ok(count)
}

/// Reads character sets and attaches each to the catalog font with the same identifier.
///
/// Identifiers are matched ignoring case; records for fonts not in the catalog are skipped. If
/// the file is cut short, the records before the cut stay attached and `UnexpectedEof` is
/// returned. Returns the number of character sets attached.
pub fn read_cache<R>(reader: &mut R, catalog: &mut FontCatalog) -> Result<usize, CacheError>
where
    R: Read,
{
    let version = reader.read_u32::<LittleEndian>()?;
    if version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            found: version,
            expected: CACHE_VERSION,
        });
    }

    let mut count = 0;
    while let Some((identifier, charset)) = read_record(reader)? {
        match catalog.font_index_by_identifier(&identifier) {
            Some(index) => {
                catalog.set_charset(index, Some(charset));
                count += 1;
            }
            None => debug!("\"{}\" not in font list", identifier),
        }
    }

    info!("{} charsets loaded", count);
    Ok(count)
}

fn read_record<R>(reader: &mut R) -> Result<Option<(String, CharacterSet)>, CacheError>
where
    R: Read,
{
    // The end of the file is only clean between records, so the first byte of the length is read
    // on its own.
    let mut prefix = [0; 4];
    loop {
        match reader.read(&mut prefix[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    reader.read_exact(&mut prefix[1..])?;
    let len = LittleEndian::read_u32(&prefix);
    if len > MAX_IDENTIFIER_LEN {
        return Err(CacheError::Malformed);
    }

    let mut identifier = vec![0; len as usize];
    reader.read_exact(&mut identifier)?;
    let identifier = String::from_utf8(identifier).map_err(|_| CacheError::Malformed)?;

    let block_count = reader.read_u32::<LittleEndian>()? as usize;
    if block_count > MAX_BLOCKS {
        return Err(CacheError::Malformed);
    }

    let mut index = [0; BLOCK_COUNT];
    reader.read_exact(&mut index)?;

    let mut blocks = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        let mut bitmap: Bitmap = [0; BITMAP_SIZE];
        reader.read_exact(&mut bitmap)?;
        blocks.push(bitmap);
    }

    let charset = CharacterSet::from_raw_parts(&index, blocks).ok_or(CacheError::Malformed)?;
    Ok(Some((identifier, charset)))
}
