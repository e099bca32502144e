// font-fallback/src/process.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runs an operation (paint, measure, hit-test, split) over the runs of a piece of text.
//!
//! Every mode walks the same run sequence; they differ only in what is done with each run and in
//! when the walk stops.

use log::warn;
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::Vector2I;

use crate::catalog::FontCatalog;
use crate::error::Error;
use crate::handle_cache::{FontTag, HandleCache};
use crate::segment::{Run, Segmenter};
use crate::service::{FontService, HitMode, PaintFlags};
use crate::substitution::SubstitutionTable;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// One span of painting handed to a `paint_with` callback instead of the font service.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PaintSpan<'a> {
    /// The identifier of the font, or `None` for the hex-code placeholder font.
    pub font: Option<&'a str>,
    /// The size to paint at. For the placeholder font this is already halved.
    pub size: u32,
    /// The characters to paint.
    pub text: &'a [char],
    /// Where the span starts.
    pub origin: Vector2I,
}

/// The callback type accepted by `paint_with`.
pub type PaintCallback<'a> = dyn FnMut(&PaintSpan<'_>) + 'a;

pub(crate) enum Action<'a, 'b> {
    Paint {
        y: i32,
        transform: Option<&'a Transform2F>,
        flags: PaintFlags,
        callback: Option<&'a mut PaintCallback<'b>>,
    },
    Width,
    Hit {
        target: i32,
        mode: HitMode,
    },
}

impl<'a, 'b> Action<'a, 'b> {
    fn transform(&self) -> Option<&'a Transform2F> {
        match *self {
            Action::Paint { transform, .. } => transform,
            _ => None,
        }
    }
}

/// Where an operation ended up.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct Outcome {
    /// The pen position after the last processed character.
    pub x: i32,
    /// For hit-testing, the byte offset of the boundary found.
    pub offset: usize,
}

pub(crate) struct Dispatcher<'a, S>
where
    S: FontService + ?Sized,
{
    pub service: &'a mut S,
    pub cache: &'a mut HandleCache<S::Handle>,
    pub catalog: &'a FontCatalog,
    pub substitution: &'a SubstitutionTable,
}

impl<'a, S> Dispatcher<'a, S>
where
    S: FontService + ?Sized,
{
    /// Walks `text` with `primary` as the requested font, starting with the pen at `x`.
    ///
    /// Side effects of runs processed before a failure are not undone.
    pub fn process(
        &mut self,
        action: &mut Action<'_, '_>,
        primary: usize,
        size: u32,
        text: &str,
        x: i32,
    ) -> Result<Outcome, Error> {
        let (catalog, substitution) = (self.catalog, self.substitution);
        let charset = catalog.font(primary).and_then(|font| font.charset());
        let mut x = x;
        for run in Segmenter::new(text, primary, charset, substitution) {
            let boundary = match run.font {
                Some(font) => self.process_span(action, &run, font, size, &mut x)?,
                None => self.process_not_available(action, &run, size, &mut x)?,
            };
            if let Action::Hit { target, .. } = *action {
                if boundary < run.len() || target < x {
                    return Ok(Outcome {
                        x,
                        offset: run.offsets[boundary],
                    });
                }
            }
        }
        Ok(Outcome {
            x,
            offset: text.len(),
        })
    }

    // Returns the boundary found within the run; the whole run unless hit-testing.
    fn process_span(
        &mut self,
        action: &mut Action<'_, '_>,
        run: &Run,
        font: usize,
        size: u32,
        x: &mut i32,
    ) -> Result<usize, Error> {
        let catalog = self.catalog;
        let identifier = match catalog.font(font) {
            Some(entry) => entry.identifier(),
            None => return Err(Error::FontNotFound),
        };
        let transform = action.transform();
        let handle = self
            .cache
            .acquire(&mut *self.service, FontTag::Font(font), identifier, size)?;

        match action {
            Action::Paint {
                y, flags, callback, ..
            } => {
                let origin = Vector2I::new(*x, *y);
                match callback {
                    Some(callback) => (*callback)(&PaintSpan {
                        font: Some(identifier),
                        size,
                        text: &run.chars,
                        origin,
                    }),
                    None => {
                        if let Err(err) =
                            self.service
                                .paint(handle, &run.chars, origin, transform, *flags)
                        {
                            warn!("painting {} characters failed: {}", run.len(), err);
                            return Err(err.into());
                        }
                    }
                }
                *x += self.service.measure(handle, &run.chars, transform)?;
                Ok(run.len())
            }
            Action::Width => {
                *x += self.service.measure(handle, &run.chars, transform)?;
                Ok(run.len())
            }
            Action::Hit { target, mode } => {
                let (boundary, advance) =
                    self.service
                        .measure_to(handle, &run.chars, *target - *x, *mode, transform)?;
                *x += advance;
                Ok(boundary.min(run.len()))
            }
        }
    }

    // Characters no font has are drawn as their hex code, two digits above two, in a fixed
    // width cell. Measuring them never touches the service.
    fn process_not_available(
        &mut self,
        action: &mut Action<'_, '_>,
        run: &Run,
        size: u32,
        x: &mut i32,
    ) -> Result<usize, Error> {
        let transform = action.transform();
        let advance = placeholder_advance(size, transform);
        let n = run.len();

        let (y, flags, callback) = match action {
            Action::Width => {
                *x += n as i32 * advance;
                return Ok(n);
            }
            Action::Hit { target, .. } => {
                let remaining = *target - *x;
                let boundary = if remaining < n as i32 * advance {
                    (remaining / advance).max(0) as usize
                } else {
                    n
                };
                *x += boundary as i32 * advance;
                return Ok(boundary);
            }
            Action::Paint {
                y, flags, callback, ..
            } => (*y, *flags, callback),
        };

        let raise = match transform {
            Some(transform) => (transform.matrix.m22() * 5.0 * size as f32 / 64.0) as i32,
            None => (5 * u64::from(size) / 64) as i32,
        };
        let handle = match callback {
            Some(_) => None,
            None => Some(self.cache.acquire(
                &mut *self.service,
                FontTag::Placeholder,
                "",
                size,
            )?),
        };

        for &character in &run.chars {
            let digits = hex_digits(character);
            let rows = [
                (&digits[..2], Vector2I::new(*x, y + raise)),
                (&digits[2..], Vector2I::new(*x, y)),
            ];
            for &(text, origin) in &rows {
                match (handle, callback.as_mut()) {
                    (_, Some(callback)) => (*callback)(&PaintSpan {
                        font: None,
                        size: size / 2,
                        text,
                        origin,
                    }),
                    (Some(handle), None) => {
                        self.service.paint(handle, text, origin, transform, flags)?
                    }
                    (None, None) => {}
                }
            }
            *x += advance;
        }
        Ok(n)
    }
}

/// Returns the width of one hex-code placeholder at `size`.
///
/// Never less than one pixel, so hit-testing can divide by it.
pub fn placeholder_advance(size: u32, transform: Option<&Transform2F>) -> i32 {
    let advance = match transform {
        Some(transform) => (transform.matrix.m11() * 7.0 * size as f32 / 64.0) as i32,
        None => (7 * u64::from(size) / 64) as i32,
    };
    advance.max(1)
}

pub(crate) fn hex_digits(character: char) -> [char; 4] {
    let codepoint = character as u32;
    let mut digits = ['0'; 4];
    for (index, digit) in digits.iter_mut().enumerate() {
        let nibble = (codepoint >> (12 - 4 * index)) & 0xf;
        *digit = HEX_DIGITS[nibble as usize] as char;
    }
    digits
}
