// font-fallback/src/library.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The library context: installed fonts, their character sets, the substitution table, and the
//! handle cache, with the text operations built on them.

use log::{debug, info};
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::Vector2I;
use std::path::PathBuf;

use crate::catalog::{FontCatalog, Style};
use crate::charset::CharacterSet;
use crate::error::Error;
use crate::handle_cache::HandleCache;
use crate::process::{Action, Dispatcher, Outcome, PaintCallback, PaintSpan};
use crate::service::{FontService, HitMode, PaintFlags};
use crate::substitution::SubstitutionTable;

/// Options that control how a `FontLibrary` is initialized.
#[derive(Clone, PartialEq, Debug)]
pub struct LibraryOptions {
    /// Where scanned character sets are cached between runs. `None` disables the cache file.
    pub charset_cache_path: Option<PathBuf>,
    /// Whether fonts missing from the cache file are scanned.
    pub scan_fonts: bool,
    /// Whether the cache file is rewritten after new fonts were scanned.
    pub save_charset_cache: bool,
}

impl Default for LibraryOptions {
    fn default() -> LibraryOptions {
        LibraryOptions {
            charset_cache_path: None,
            scan_fonts: true,
            save_charset_cache: true,
        }
    }
}

impl LibraryOptions {
    /// Initializes options to their defaults: no cache file, scan every font.
    #[inline]
    pub fn new() -> LibraryOptions {
        LibraryOptions::default()
    }

    /// Sets the cache file path and returns these options for method chaining.
    #[inline]
    pub fn charset_cache_path(&mut self, path: Option<PathBuf>) -> &mut LibraryOptions {
        self.charset_cache_path = path;
        self
    }

    /// Sets whether unscanned fonts are scanned and returns these options for method chaining.
    #[inline]
    pub fn scan_fonts(&mut self, scan_fonts: bool) -> &mut LibraryOptions {
        self.scan_fonts = scan_fonts;
        self
    }

    /// Sets whether the cache file is saved and returns these options for method chaining.
    #[inline]
    pub fn save_charset_cache(&mut self, save: bool) -> &mut LibraryOptions {
        self.save_charset_cache = save;
        self
    }

    /// Returns the per-user location for the cache file, if the platform has a cache directory.
    pub fn default_charset_cache_path() -> Option<PathBuf> {
        dirs_next::cache_dir().map(|dir| dir.join("font-fallback").join("charsets"))
    }
}

/// The result of hit-testing or splitting text.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Hit {
    /// Byte offset of the character boundary in the text.
    pub offset: usize,
    /// The x coordinate of that boundary, measured from the start of the text.
    pub x: i32,
}

/// Renders and measures Unicode text with whichever installed fonts have its characters.
///
/// All state lives here; there are no globals. Operations take `&mut self` because every run
/// touches the handle cache, so a library shared between threads needs an outer lock.
#[allow(missing_debug_implementations)]
pub struct FontLibrary<S>
where
    S: FontService,
{
    service: S,
    catalog: FontCatalog,
    substitution: SubstitutionTable,
    cache: HandleCache<S::Handle>,
}

impl<S> FontLibrary<S>
where
    S: FontService,
{
    /// Initializes the library: lists the installed fonts, loads cached character sets, scans
    /// the remaining fonts, and builds the substitution table.
    ///
    /// Scanning probes every character of every font and may take some time. A font that cannot
    /// be opened is left out of substitution; any other service failure aborts initialization.
    pub fn new(mut service: S, options: &LibraryOptions) -> Result<FontLibrary<S>, Error> {
        let mut catalog = FontCatalog::from_identifiers(service.all_fonts()?);
        info!(
            "{} faces, {} families",
            catalog.len(),
            catalog.families().len()
        );

        load_charset_cache(options, &mut catalog);

        let mut changes = 0;
        if options.scan_fonts {
            for index in 0..catalog.len() {
                if catalog.fonts()[index].charset().is_some() {
                    continue;
                }
                let identifier = catalog.fonts()[index].identifier().to_owned();
                debug!("scanning {} \"{}\"", index, identifier);
                let charset = CharacterSet::scan(&mut service, &identifier)?;
                catalog.set_charset(index, charset);
                changes += 1;
            }
        }

        let substitution = SubstitutionTable::build(&catalog)?;

        if changes != 0 {
            info!("{} new charsets", changes);
            if options.save_charset_cache {
                save_charset_cache(options, &catalog);
            }
        }

        Ok(FontLibrary {
            service,
            catalog,
            substitution,
            cache: HandleCache::new(),
        })
    }

    /// Creates a library from a catalog whose character sets are already attached.
    pub fn from_catalog(service: S, catalog: FontCatalog) -> Result<FontLibrary<S>, Error> {
        let substitution = SubstitutionTable::build(&catalog)?;
        Ok(FontLibrary {
            service,
            catalog,
            substitution,
            cache: HandleCache::new(),
        })
    }

    /// Replaces the catalog, for example after fonts were installed or removed.
    ///
    /// The substitution table is rebuilt from scratch and every cached handle is released, since
    /// font indices may now refer to other fonts.
    pub fn replace_catalog(&mut self, catalog: FontCatalog) -> Result<(), Error> {
        let substitution = SubstitutionTable::build(&catalog)?;
        self.cache.invalidate(&mut self.service);
        self.catalog = catalog;
        self.substitution = substitution;
        Ok(())
    }

    /// Returns the installed fonts.
    #[inline]
    pub fn catalog(&self) -> &FontCatalog {
        &self.catalog
    }

    /// Returns the names of all font families, sorted.
    #[inline]
    pub fn families(&self) -> Vec<String> {
        self.catalog.families()
    }

    /// Returns the substitution table.
    #[inline]
    pub fn substitution_table(&self) -> &SubstitutionTable {
        &self.substitution
    }

    /// Returns the handle cache.
    #[inline]
    pub fn handle_cache(&self) -> &HandleCache<S::Handle> {
        &self.cache
    }

    /// Returns the font service.
    #[inline]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns the font service mutably.
    #[inline]
    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    /// Paints text with its origin at `origin`.
    pub fn paint(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        origin: Vector2I,
        flags: PaintFlags,
    ) -> Result<(), Error> {
        let mut action = Action::Paint {
            y: origin.y(),
            transform: None,
            flags: self.paint_flags(flags),
            callback: None,
        };
        self.process(&mut action, family, style, size, text, origin.x())?;
        Ok(())
    }

    /// Paints text through a transform. Only transforms that keep the direction of the x axis
    /// are supported.
    pub fn paint_transformed(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        origin: Vector2I,
        transform: &Transform2F,
        flags: PaintFlags,
    ) -> Result<(), Error> {
        let mut action = Action::Paint {
            y: origin.y(),
            transform: Some(transform),
            flags: self.paint_flags(flags),
            callback: None,
        };
        self.process(&mut action, family, style, size, text, origin.x())?;
        Ok(())
    }

    /// Lays text out as `paint` would, but hands each span to `callback` instead of painting it.
    pub fn paint_with<F>(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        origin: Vector2I,
        mut callback: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&PaintSpan<'_>),
    {
        let callback: &mut PaintCallback<'_> = &mut callback;
        let mut action = Action::Paint {
            y: origin.y(),
            transform: None,
            flags: PaintFlags::empty(),
            callback: Some(callback),
        };
        self.process(&mut action, family, style, size, text, origin.x())?;
        Ok(())
    }

    /// Returns the width of text.
    pub fn width(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
    ) -> Result<i32, Error> {
        let outcome = self.process(&mut Action::Width, family, style, size, text, 0)?;
        Ok(outcome.x)
    }

    /// Finds the character boundary nearest to `x`.
    pub fn x_to_offset(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        x: i32,
    ) -> Result<Hit, Error> {
        let mut action = Action::Hit {
            target: x,
            mode: HitMode::Caret,
        };
        let outcome = self.process(&mut action, family, style, size, text, 0)?;
        Ok(Hit {
            offset: outcome.offset,
            x: outcome.x,
        })
    }

    /// Finds the longest prefix of text that fits in `width`.
    ///
    /// The returned `x` never exceeds `width`; a character ending exactly at `width` fits.
    pub fn split(
        &mut self,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        width: i32,
    ) -> Result<Hit, Error> {
        let mut action = Action::Hit {
            target: width,
            mode: HitMode::Fit,
        };
        let outcome = self.process(&mut action, family, style, size, text, 0)?;
        Ok(Hit {
            offset: outcome.offset,
            x: outcome.x,
        })
    }

    /// Releases every cached handle.
    ///
    /// Call this when the output target changes, since handles may no longer be valid.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate(&mut self.service);
    }

    /// Logs the fonts, families, substitution coverage, and handle cache.
    pub fn dump_state(&self) {
        info!("fonts:");
        for (index, font) in self.catalog.fonts().iter().enumerate() {
            match font.charset() {
                Some(charset) => info!("  {} \"{}\" {:?}", index, font.identifier(), charset),
                None => info!("  {} \"{}\" (not scanned)", index, font.identifier()),
            }
        }

        info!("families:");
        for family in self.catalog.families() {
            let styles: Vec<String> = [
                Style::Regular,
                Style::Slanted,
                Style::Bold,
                Style::BoldSlanted,
            ]
            .iter()
            .filter_map(|&style| self.catalog.select(&family, style))
            .map(|index| index.to_string())
            .collect();
            info!("  \"{}\" {}", family, styles.join(" "));
        }

        info!(
            "substitution table: {} characters available",
            self.substitution.available()
        );

        info!("handle cache:");
        for (slot, (tag, size, last_used)) in self.cache.entries().iter().enumerate() {
            info!("  {} {:?} size {} last used {}", slot, tag, size, last_used);
        }
    }

    fn paint_flags(&self, flags: PaintFlags) -> PaintFlags {
        if flags.contains(PaintFlags::BLEND_FONT) && !self.service.supports_background_blend() {
            flags - PaintFlags::BLEND_FONT
        } else {
            flags
        }
    }

    fn process(
        &mut self,
        action: &mut Action<'_, '_>,
        family: &str,
        style: Style,
        size: u32,
        text: &str,
        x: i32,
    ) -> Result<Outcome, Error> {
        if text.is_empty() {
            return Ok(Outcome { x, offset: 0 });
        }
        if let Action::Hit { target, .. } = *action {
            if target <= 0 {
                return Ok(Outcome::default());
            }
        }

        let primary = self
            .catalog
            .select(family, style)
            .ok_or(Error::FontNotFound)?;
        let mut dispatcher = Dispatcher {
            service: &mut self.service,
            cache: &mut self.cache,
            catalog: &self.catalog,
            substitution: &self.substitution,
        };
        dispatcher.process(action, primary, size, text, x)
    }
}

impl<S> Drop for FontLibrary<S>
where
    S: FontService,
{
    fn drop(&mut self) {
        self.cache.invalidate(&mut self.service);
    }
}

#[cfg(feature = "cache-file")]
fn load_charset_cache(options: &LibraryOptions, catalog: &mut FontCatalog) {
    use log::warn;
    use std::fs::File;
    use std::io::BufReader;

    use crate::charset_cache;

    let path = match options.charset_cache_path {
        Some(ref path) => path,
        None => return,
    };
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            debug!("no charset cache at {}: {}", path.display(), err);
            return;
        }
    };
    if let Err(err) = charset_cache::read_cache(&mut BufReader::new(file), catalog) {
        warn!("charset cache {}: {}", path.display(), err);
    }
}

#[cfg(not(feature = "cache-file"))]
fn load_charset_cache(_: &LibraryOptions, _: &mut FontCatalog) {}

#[cfg(feature = "cache-file")]
fn save_charset_cache(options: &LibraryOptions, catalog: &FontCatalog) {
    use log::warn;
    use std::fs::File;
    use std::io::BufWriter;

    use crate::charset_cache;
    use crate::error::CacheError;

    let path = match options.charset_cache_path {
        Some(ref path) => path,
        None => return,
    };
    let result = create_parent(path)
        .and_then(|_| File::create(path))
        .map_err(CacheError::from)
        .and_then(|file| charset_cache::write_cache(&mut BufWriter::new(file), catalog));
    if let Err(err) = result {
        warn!("saving charset cache {}: {}", path.display(), err);
    }
}

#[cfg(feature = "cache-file")]
fn create_parent(path: &std::path::Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(not(feature = "cache-file"))]
fn save_charset_cache(_: &LibraryOptions, _: &FontCatalog) {}
