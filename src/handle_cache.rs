// font-fallback/src/handle_cache.rs
//
// Copyright © 2018 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A small cache of recently used font service handles.
//!
//! Opening a font at a size is expensive, and the service may run out of handles if too many are
//! open at once, so at most `CACHE_SIZE` are kept and the least recently used is closed to make
//! room.

use log::debug;

use crate::error::FontServiceError;
use crate::service::FontService;

/// The number of slots, and so the most handles this library holds open at any time.
pub const CACHE_SIZE: usize = 10;

/// What a cached handle was opened for.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum FontTag {
    /// The catalog font with this index.
    Font(usize),
    /// The font used for hex-code placeholders.
    Placeholder,
}

#[derive(Debug)]
struct CacheEntry<H> {
    tag: FontTag,
    size: u32,
    handle: H,
    last_used: u64,
}

/// A fixed-capacity least-recently-used cache from (font, size) to an open handle.
#[derive(Debug)]
pub struct HandleCache<H> {
    entries: Vec<CacheEntry<H>>,
    capacity: usize,
    clock: u64,
}

impl<H> HandleCache<H> {
    /// Creates an empty cache with `CACHE_SIZE` slots.
    pub fn new() -> HandleCache<H> {
        HandleCache::with_capacity(CACHE_SIZE)
    }

    /// Creates an empty cache with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> HandleCache<H> {
        assert!(capacity > 0);
        HandleCache {
            entries: Vec::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of open handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no handle is open.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a handle for `tag` at `size` is cached.
    pub fn contains(&self, tag: FontTag, size: u32) -> bool {
        self.find(tag, size).is_some()
    }

    /// Returns the handle for `tag` at `size`, opening one through `service` on a miss.
    ///
    /// `size` is the key; the handle itself is opened at `size` for fonts and at half of it for
    /// the placeholder font. On a miss with every slot taken, the least recently used handle is
    /// released before the new one is opened, so no more than `capacity` handles are ever open.
    /// If the service cannot open the handle the error is returned and the freed slot stays
    /// empty.
    pub fn acquire<S>(
        &mut self,
        service: &mut S,
        tag: FontTag,
        identifier: &str,
        size: u32,
    ) -> Result<&H, FontServiceError>
    where
        S: FontService<Handle = H> + ?Sized,
    {
        let now = self.tick();

        if let Some(index) = self.find(tag, size) {
            let entry = &mut self.entries[index];
            entry.last_used = now;
            return Ok(&entry.handle);
        }

        let index = match self.victim() {
            Some(victim) => {
                let evicted = self.entries.remove(victim);
                debug!("evicting {:?} at size {}", evicted.tag, evicted.size);
                service.release_handle(evicted.handle);
                victim
            }
            None => self.entries.len(),
        };

        debug!("opening {:?} \"{}\" at size {}", tag, identifier, size);
        let handle = match tag {
            FontTag::Font(_) => service.acquire_handle(identifier, size)?,
            FontTag::Placeholder => service.acquire_placeholder_handle(size / 2)?,
        };
        self.entries.insert(
            index,
            CacheEntry {
                tag,
                size,
                handle,
                last_used: now,
            },
        );
        Ok(&self.entries[index].handle)
    }

    /// Releases and forgets every handle.
    ///
    /// Call this when previously opened handles become invalid, for example after the output
    /// target changes.
    pub fn invalidate<S>(&mut self, service: &mut S)
    where
        S: FontService<Handle = H> + ?Sized,
    {
        for entry in self.entries.drain(..) {
            service.release_handle(entry.handle);
        }
    }

    /// Lists the cached (font, size) pairs with their last-used times.
    pub fn entries(&self) -> Vec<(FontTag, u32, u64)> {
        self.entries
            .iter()
            .map(|entry| (entry.tag, entry.size, entry.last_used))
            .collect()
    }

    fn tick(&mut self) -> u64 {
        let now = self.clock;
        self.clock += 1;
        now
    }

    fn find(&self, tag: FontTag, size: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.tag == tag && entry.size == size)
    }

    // `None` while a slot is free, otherwise the oldest entry. `min_by_key` keeps the first of
    // equal keys, so ties go to the lowest slot.
    fn victim(&self) -> Option<usize> {
        if self.entries.len() < self.capacity {
            return None;
        }
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(index, _)| index)
    }
}

impl<H> Default for HandleCache<H> {
    #[inline]
    fn default() -> HandleCache<H> {
        HandleCache::new()
    }
}
