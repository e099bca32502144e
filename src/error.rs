// font-fallback/src/error.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Various types of errors that `font-fallback` can return.

use std::collections::TryReserveError;
use std::convert::From;
use std::io;
use thiserror::Error;

/// A failure reported by the external font service.
///
/// The `code` and `message` are whatever the service attached; this crate never interprets them.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("font service error 0x{code:x}: {message}")]
pub struct FontServiceError {
    /// Service-specific error number.
    pub code: u32,
    /// Human-readable description from the service.
    pub message: String,
}

impl FontServiceError {
    /// Creates a new service error.
    #[inline]
    pub fn new<S>(code: u32, message: S) -> FontServiceError
    where
        S: Into<String>,
    {
        FontServiceError {
            code,
            message: message.into(),
        }
    }
}

/// Reasons why painting, measuring, or initialization might fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Memory was exhausted while building a table.
    #[error("out of memory")]
    OutOfMemory,

    /// The font service reported a failure; details are attached.
    #[error("font service failure: {0}")]
    FontService(#[from] FontServiceError),

    /// No font family with the requested name exists.
    #[error("no such font family")]
    FontNotFound,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Error {
        Error::OutOfMemory
    }
}

/// Reasons why the character set cache file might fail to load or save.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A disk or similar I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// The file ended in the middle of a record.
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// The file was written by an incompatible version of the format.
    #[error("cache version {found} (expected {expected})")]
    VersionMismatch {
        /// Version found in the file.
        found: u32,
        /// Version this crate reads and writes.
        expected: u32,
    },

    /// A record was internally inconsistent.
    #[error("malformed character set record")]
    Malformed,
}

// A short read anywhere inside a record is a truncated file, not an I/O failure.
impl From<io::Error> for CacheError {
    fn from(error: io::Error) -> CacheError {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            CacheError::UnexpectedEof
        } else {
            CacheError::Io(error)
        }
    }
}
