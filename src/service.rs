// font-fallback/src/service.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Provides a common interface to the platform glyph service that enumerates, opens, paints, and
//! measures fonts.
//!
//! This crate never talks to a platform API itself. The embedding application implements
//! `FontService` once and everything else is built on top of it.

use bitflags::bitflags;
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::Vector2I;

use crate::charset::GlyphScan;
use crate::error::FontServiceError;

bitflags! {
    /// Options for painting.
    pub struct PaintFlags: u32 {
        /// Blend glyph edges with the existing background.
        ///
        /// Cleared automatically when the service does not support background blending.
        const BLEND_FONT = 0x01;
    }
}

impl Default for PaintFlags {
    #[inline]
    fn default() -> PaintFlags {
        PaintFlags::empty()
    }
}

/// How a partial measurement picks the character boundary for a target x coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HitMode {
    /// The boundary nearest to the target, as for placing a caret under a click.
    Caret,
    /// The last boundary whose advance does not exceed the target. A character that ends exactly
    /// on the target is included.
    Fit,
}

/// The external glyph service.
///
/// Every method is a blocking call. Text is always passed as Basic Multilingual Plane characters
/// and every run handed to `paint`, `measure` and `measure_to` belongs to the font the handle was
/// opened for.
pub trait FontService {
    /// The service's own representation of one open (font, size) instance.
    type Handle;

    /// Returns the identifiers of all installed fonts.
    ///
    /// The order of this list is significant: when a character is missing from the requested
    /// font, the first font in this order that has it is used instead.
    fn all_fonts(&mut self) -> Result<Vec<String>, FontServiceError>;

    /// Opens a font at the given pixel size.
    fn acquire_handle(&mut self, identifier: &str, size: u32)
        -> Result<Self::Handle, FontServiceError>;

    /// Opens the font used to draw the hex codes of characters no installed font has.
    ///
    /// `size` is the size the placeholder digits are drawn at, half of the requested text size.
    fn acquire_placeholder_handle(&mut self, size: u32) -> Result<Self::Handle, FontServiceError>;

    /// Closes a handle. The handle is never used again.
    fn release_handle(&mut self, handle: Self::Handle);

    /// Probes whether the font behind `handle` has a glyph for `codepoint`.
    fn scan_glyph(
        &mut self,
        handle: &Self::Handle,
        codepoint: u32,
    ) -> Result<GlyphScan, FontServiceError>;

    /// Paints `text` with its origin at `origin`.
    fn paint(
        &mut self,
        handle: &Self::Handle,
        text: &[char],
        origin: Vector2I,
        transform: Option<&Transform2F>,
        flags: PaintFlags,
    ) -> Result<(), FontServiceError>;

    /// Returns the horizontal advance of `text`, in pixels.
    fn measure(
        &mut self,
        handle: &Self::Handle,
        text: &[char],
        transform: Option<&Transform2F>,
    ) -> Result<i32, FontServiceError>;

    /// Finds the character boundary in `text` for `target_x`, measured from the start of `text`.
    ///
    /// Returns the number of characters before the boundary and the advance up to it.
    fn measure_to(
        &mut self,
        handle: &Self::Handle,
        text: &[char],
        target_x: i32,
        mode: HitMode,
        transform: Option<&Transform2F>,
    ) -> Result<(usize, i32), FontServiceError>;

    /// Returns true if the service can blend glyphs with the background.
    #[inline]
    fn supports_background_blend(&self) -> bool {
        false
    }
}
