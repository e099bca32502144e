// font-fallback/tests/tests.rs
//
// Copyright © 2019 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// End-to-end tests against a scripted font service.

use font_fallback::catalog::{FontCatalog, Style};
use font_fallback::charset::{CharacterSet, GlyphScan};
use font_fallback::error::{Error, FontServiceError};
use font_fallback::handle_cache::CACHE_SIZE;
use font_fallback::library::{FontLibrary, Hit, LibraryOptions};
use font_fallback::process::PaintSpan;
use font_fallback::service::{FontService, HitMode, PaintFlags};
use pathfinder_geometry::rect::RectI;
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::Vector2I;
use std::cell::Cell;
use std::ops::RangeInclusive;
use std::rc::Rc;

static PLACEHOLDER_FONT: &'static str = "Corpus.Medium";

const SIZE: u32 = 160;
// Every glyph of the scripted fonts advances by `size / 16`.
const ADVANCE: i32 = 10;
// 7 * 160 / 64
const PLACEHOLDER_ADVANCE: i32 = 17;
// 5 * 160 / 64
const PLACEHOLDER_RAISE: i32 = 12;

#[derive(Clone, PartialEq, Debug)]
struct PaintCall {
    font: String,
    size: u32,
    text: String,
    origin: Vector2I,
    transformed: bool,
    flags: PaintFlags,
}

#[derive(Debug)]
struct MockHandle {
    font: String,
    size: u32,
}

struct MockService {
    fonts: Vec<(String, Vec<RangeInclusive<u32>>)>,
    refused: Vec<String>,
    blend: bool,
    paints: Vec<PaintCall>,
    scans: usize,
    open: Rc<Cell<usize>>,
    max_open: usize,
}

impl MockService {
    fn new() -> MockService {
        MockService {
            fonts: vec![],
            refused: vec![],
            blend: false,
            paints: vec![],
            scans: 0,
            open: Rc::new(Cell::new(0)),
            max_open: 0,
        }
    }

    fn font(mut self, identifier: &str, coverage: Vec<RangeInclusive<u32>>) -> MockService {
        self.fonts.push((identifier.to_owned(), coverage));
        self
    }

    // "Sans" has printable ASCII, "Symbol" only the euro sign. Nothing has CJK.
    fn standard() -> MockService {
        MockService::new()
            .font("Sans", vec![0x20..=0x7e])
            .font("Symbol", vec![0x20ac..=0x20ac])
    }

    fn covers(&self, font: &str, codepoint: u32) -> bool {
        self.fonts
            .iter()
            .filter(|(identifier, _)| identifier == font)
            .any(|(_, ranges)| ranges.iter().any(|range| range.contains(&codepoint)))
    }

    fn open_handle(&mut self, font: &str, size: u32) -> Result<MockHandle, FontServiceError> {
        if self.refused.iter().any(|refused| refused == font) {
            return Err(FontServiceError::new(0x20d, format!("font {} not found", font)));
        }
        self.open.set(self.open.get() + 1);
        self.max_open = self.max_open.max(self.open.get());
        Ok(MockHandle {
            font: font.to_owned(),
            size,
        })
    }
}

impl FontService for MockService {
    type Handle = MockHandle;

    fn all_fonts(&mut self) -> Result<Vec<String>, FontServiceError> {
        Ok(self.fonts.iter().map(|(identifier, _)| identifier.clone()).collect())
    }

    fn acquire_handle(&mut self, identifier: &str, size: u32) -> Result<MockHandle, FontServiceError> {
        self.open_handle(identifier, size)
    }

    fn acquire_placeholder_handle(&mut self, size: u32) -> Result<MockHandle, FontServiceError> {
        self.open_handle(PLACEHOLDER_FONT, size)
    }

    fn release_handle(&mut self, _: MockHandle) {
        self.open.set(self.open.get() - 1);
    }

    fn scan_glyph(
        &mut self,
        handle: &MockHandle,
        codepoint: u32,
    ) -> Result<GlyphScan, FontServiceError> {
        self.scans += 1;
        if self.covers(&handle.font, codepoint) {
            Ok(GlyphScan::Present {
                bounds: RectI::new(Vector2I::new(0, -8), Vector2I::new(6, 8)),
            })
        } else {
            Ok(GlyphScan::Absent)
        }
    }

    fn paint(
        &mut self,
        handle: &MockHandle,
        text: &[char],
        origin: Vector2I,
        transform: Option<&Transform2F>,
        flags: PaintFlags,
    ) -> Result<(), FontServiceError> {
        self.paints.push(PaintCall {
            font: handle.font.clone(),
            size: handle.size,
            text: text.iter().collect(),
            origin,
            transformed: transform.is_some(),
            flags,
        });
        Ok(())
    }

    fn measure(
        &mut self,
        handle: &MockHandle,
        text: &[char],
        _: Option<&Transform2F>,
    ) -> Result<i32, FontServiceError> {
        Ok(text.len() as i32 * (handle.size / 16) as i32)
    }

    fn measure_to(
        &mut self,
        handle: &MockHandle,
        text: &[char],
        target_x: i32,
        mode: HitMode,
        _: Option<&Transform2F>,
    ) -> Result<(usize, i32), FontServiceError> {
        let advance = (handle.size / 16) as i32;
        let target = target_x.max(0);
        let n = match mode {
            HitMode::Caret => (target + advance / 2) / advance,
            HitMode::Fit => target / advance,
        };
        let n = (n as usize).min(text.len());
        Ok((n, n as i32 * advance))
    }

    fn supports_background_blend(&self) -> bool {
        self.blend
    }
}

fn library(service: MockService) -> FontLibrary<MockService> {
    FontLibrary::new(service, &LibraryOptions::new()).unwrap()
}

#[test]
pub fn scan_fonts_on_initialization() {
    let library = library(MockService::standard());
    let catalog = library.catalog();
    assert_eq!(catalog.len(), 2);
    let sans = catalog.fonts()[0].charset().unwrap();
    assert!(sans.contains('A' as u32));
    assert!(!sans.contains(0x20ac));
    assert_eq!(sans.len(), 0x7f - 0x20);
    let symbol = catalog.fonts()[1].charset().unwrap();
    assert_eq!(symbol.len(), 1);
    assert_eq!(library.substitution_table().lookup(0x20ac), Some(1));
    assert_eq!(library.substitution_table().lookup(0x4e2d), None);
    assert_eq!(library.families(), vec!["Sans", "Symbol"]);
}

#[test]
pub fn unopenable_fonts_take_no_part_in_substitution() {
    let mut service = MockService::standard();
    service.refused.push("Symbol".to_owned());
    let mut library = library(service);
    assert!(library.catalog().fonts()[1].charset().is_none());
    assert_eq!(library.substitution_table().lookup(0x20ac), None);

    library.service_mut().refused.clear();
    let width = library.width("Sans", Style::Regular, SIZE, "€").unwrap();
    assert_eq!(width, PLACEHOLDER_ADVANCE);
}

#[test]
pub fn measure_mixed_text() {
    let mut library = library(MockService::standard());
    let width = library.width("Sans", Style::Regular, SIZE, "A€中").unwrap();
    assert_eq!(width, ADVANCE + ADVANCE + PLACEHOLDER_ADVANCE);
}

#[test]
pub fn paint_mixed_text() {
    let mut library = library(MockService::standard());
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            "A€中",
            Vector2I::new(100, 200),
            PaintFlags::empty(),
        )
        .unwrap();

    let paints = &library.service().paints;
    let fonts: Vec<&str> = paints.iter().map(|call| &call.font[..]).collect();
    assert_eq!(fonts, vec!["Sans", "Symbol", PLACEHOLDER_FONT, PLACEHOLDER_FONT]);

    assert_eq!(paints[0].text, "A");
    assert_eq!(paints[0].origin, Vector2I::new(100, 200));
    assert_eq!(paints[1].text, "€");
    assert_eq!(paints[1].origin, Vector2I::new(110, 200));

    // U+4E2D, high byte raised above low byte.
    assert_eq!(paints[2].text, "4e");
    assert_eq!(paints[2].origin, Vector2I::new(120, 200 + PLACEHOLDER_RAISE));
    assert_eq!(paints[2].size, SIZE / 2);
    assert_eq!(paints[3].text, "2d");
    assert_eq!(paints[3].origin, Vector2I::new(120, 200));
}

#[test]
pub fn split_before_unavailable_character() {
    let mut library = library(MockService::standard());
    let text = "A€中";
    let hit = library.split("Sans", Style::Regular, SIZE, text, 25).unwrap();
    assert_eq!(
        hit,
        Hit {
            offset: text.find('中').unwrap(),
            x: 2 * ADVANCE,
        }
    );
}

#[test]
pub fn split_inside_unavailable_characters() {
    let mut library = library(MockService::standard());
    let text = "A中中中";
    let hit = library.split("Sans", Style::Regular, SIZE, text, 49).unwrap();
    assert_eq!(
        hit,
        Hit {
            offset: 1 + 2 * '中'.len_utf8(),
            x: ADVANCE + 2 * PLACEHOLDER_ADVANCE,
        }
    );
    let hit = library.x_to_offset("Sans", Style::Regular, SIZE, text, 49).unwrap();
    assert_eq!(hit.offset, 7);
}

#[test]
pub fn split_includes_exact_fit() {
    let mut library = library(MockService::standard());
    let hit = library.split("Sans", Style::Regular, SIZE, "abc", 20).unwrap();
    assert_eq!(hit, Hit { offset: 2, x: 20 });
}

#[test]
pub fn split_wide_enough_for_everything() {
    let mut library = library(MockService::standard());
    let text = "A€中";
    let hit = library.split("Sans", Style::Regular, SIZE, text, 1000).unwrap();
    assert_eq!(
        hit,
        Hit {
            offset: text.len(),
            x: 2 * ADVANCE + PLACEHOLDER_ADVANCE,
        }
    );
}

#[test]
pub fn x_to_offset_picks_nearest_boundary() {
    let mut library = library(MockService::standard());
    let hit = library.x_to_offset("Sans", Style::Regular, SIZE, "A€中", 14).unwrap();
    assert_eq!(hit, Hit { offset: 1, x: ADVANCE });
    let hit = library.x_to_offset("Sans", Style::Regular, SIZE, "A€中", 16).unwrap();
    assert_eq!(hit, Hit { offset: 4, x: 2 * ADVANCE });
}

#[test]
pub fn x_to_offset_at_or_before_start() {
    let mut library = library(MockService::standard());
    for &x in &[0, -5] {
        let hit = library.x_to_offset("Sans", Style::Regular, SIZE, "A€中", x).unwrap();
        assert_eq!(hit, Hit { offset: 0, x: 0 });
        let hit = library.split("Sans", Style::Regular, SIZE, "A€中", x).unwrap();
        assert_eq!(hit, Hit { offset: 0, x: 0 });
    }
    assert!(library.handle_cache().is_empty());
}

#[test]
pub fn empty_text() {
    let mut library = library(MockService::standard());
    assert_eq!(library.width("Sans", Style::Regular, SIZE, "").unwrap(), 0);
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            "",
            Vector2I::new(5, 5),
            PaintFlags::empty(),
        )
        .unwrap();
    assert!(library.service().paints.is_empty());
    let hit = library.split("Sans", Style::Regular, SIZE, "", 100).unwrap();
    assert_eq!(hit, Hit { offset: 0, x: 0 });
}

#[test]
pub fn unknown_family() {
    let mut library = library(MockService::standard());
    match library.width("Nope", Style::Regular, SIZE, "A") {
        Err(Error::FontNotFound) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
pub fn family_names_ignore_case() {
    let mut library = library(MockService::standard());
    assert_eq!(library.width("sans", Style::Bold, SIZE, "ab").unwrap(), 2 * ADVANCE);
}

#[test]
pub fn handle_failure_is_reported() {
    let mut library = library(MockService::standard());
    library.service_mut().refused.push("Symbol".to_owned());
    match library.width("Sans", Style::Regular, SIZE, "A€") {
        Err(Error::FontService(error)) => assert_eq!(error.code, 0x20d),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
pub fn failed_paint_keeps_earlier_runs() {
    let mut library = library(MockService::standard());
    library.service_mut().refused.push("Symbol".to_owned());
    let result = library.paint(
        "Sans",
        Style::Regular,
        SIZE,
        "A€",
        Vector2I::new(0, 0),
        PaintFlags::empty(),
    );
    match result {
        Err(Error::FontService(error)) => assert_eq!(error.code, 0x20d),
        other => panic!("unexpected result: {:?}", other),
    }
    let paints = &library.service().paints;
    assert_eq!(paints.len(), 1);
    assert_eq!(paints[0].font, "Sans");
    assert_eq!(paints[0].text, "A");
}

#[test]
pub fn blend_flag_needs_service_support() {
    let mut library = library(MockService::standard());
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            "A",
            Vector2I::new(0, 0),
            PaintFlags::BLEND_FONT,
        )
        .unwrap();
    assert_eq!(library.service().paints[0].flags, PaintFlags::empty());

    library.service_mut().blend = true;
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            "A",
            Vector2I::new(0, 0),
            PaintFlags::BLEND_FONT,
        )
        .unwrap();
    assert_eq!(library.service().paints[1].flags, PaintFlags::BLEND_FONT);
}

#[test]
pub fn paint_through_transform() {
    let mut library = library(MockService::standard());
    let transform = Transform2F::row_major(2.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    library
        .paint_transformed(
            "Sans",
            Style::Regular,
            SIZE,
            "A中",
            Vector2I::new(0, 0),
            &transform,
            PaintFlags::empty(),
        )
        .unwrap();
    let paints = &library.service().paints;
    assert_eq!(paints.len(), 3);
    assert!(paints.iter().all(|call| call.transformed));
}

#[test]
pub fn paint_with_callback() {
    let mut library = library(MockService::standard());
    let mut spans = vec![];
    library
        .paint_with(
            "Sans",
            Style::Regular,
            SIZE,
            "A€中",
            Vector2I::new(0, 50),
            |span: &PaintSpan| {
                spans.push((
                    span.font.map(|font| font.to_owned()),
                    span.size,
                    span.text.iter().collect::<String>(),
                    span.origin,
                ));
            },
        )
        .unwrap();

    assert!(library.service().paints.is_empty());
    assert_eq!(
        spans,
        vec![
            (Some("Sans".to_owned()), SIZE, "A".to_owned(), Vector2I::new(0, 50)),
            (Some("Symbol".to_owned()), SIZE, "€".to_owned(), Vector2I::new(10, 50)),
            (None, SIZE / 2, "4e".to_owned(), Vector2I::new(20, 50 + PLACEHOLDER_RAISE)),
            (None, SIZE / 2, "2d".to_owned(), Vector2I::new(20, 50)),
        ]
    );
}

#[test]
pub fn long_text_is_split_into_bounded_runs() {
    let mut library = library(MockService::standard());
    let text: String = std::iter::repeat('x').take(450).collect();
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            &text,
            Vector2I::new(0, 0),
            PaintFlags::empty(),
        )
        .unwrap();
    let paints = &library.service().paints;
    let lengths: Vec<usize> = paints.iter().map(|call| call.text.len()).collect();
    assert_eq!(lengths, vec![200, 200, 50]);
    assert_eq!(paints[1].origin, Vector2I::new(2000, 0));
    assert_eq!(library.width("Sans", Style::Regular, SIZE, &text).unwrap(), 4500);
}

#[test]
pub fn handle_cache_is_bounded() {
    let mut library = library(MockService::standard());
    for size in 1..=(CACHE_SIZE as u32 + 5) {
        library
            .width("Sans", Style::Regular, size * 16, "ab")
            .unwrap();
    }
    assert_eq!(library.handle_cache().len(), CACHE_SIZE);
    assert!(library.service().max_open <= CACHE_SIZE);
    assert_eq!(library.service().open.get(), CACHE_SIZE);

    library.invalidate_cache();
    assert_eq!(library.service().open.get(), 0);
    assert!(library.handle_cache().is_empty());
}

#[test]
pub fn dropping_the_library_releases_handles() {
    let service = MockService::standard();
    let open = service.open.clone();
    let mut library = library(service);
    library.width("Sans", Style::Regular, SIZE, "A€中").unwrap();
    library
        .paint(
            "Sans",
            Style::Regular,
            SIZE,
            "中",
            Vector2I::new(0, 0),
            PaintFlags::empty(),
        )
        .unwrap();
    assert_eq!(open.get(), 3);
    library.dump_state();
    drop(library);
    assert_eq!(open.get(), 0);
}

#[test]
pub fn library_from_prepared_catalog() {
    let mut catalog = FontCatalog::from_identifiers(vec!["Sans", "Symbol"]);
    catalog.set_charset(0, Some(CharacterSet::from_codepoints(0x20..0x7f).unwrap()));
    catalog.set_charset(1, Some(CharacterSet::from_codepoints(vec![0x20ac]).unwrap()));
    let mut library = FontLibrary::from_catalog(MockService::standard(), catalog).unwrap();
    assert_eq!(library.service().scans, 0);
    assert_eq!(
        library.width("Sans", Style::Regular, SIZE, "A€").unwrap(),
        2 * ADVANCE
    );

    let catalog = FontCatalog::from_identifiers(vec!["Sans", "Symbol"]);
    library.replace_catalog(catalog).unwrap();
    assert!(library.handle_cache().is_empty());
    assert_eq!(
        library.width("Sans", Style::Regular, SIZE, "A").unwrap(),
        PLACEHOLDER_ADVANCE
    );
}

#[cfg(feature = "cache-file")]
#[test]
pub fn charset_cache_file_skips_rescanning() {
    let dir = std::env::temp_dir().join(format!("font-fallback-{}", std::process::id()));
    let path = dir.join("charsets");
    let mut options = LibraryOptions::new();
    options.charset_cache_path(Some(path.clone()));

    let first = FontLibrary::new(MockService::standard(), &options).unwrap();
    assert!(first.service().scans > 0);
    assert!(path.exists());

    let mut second = FontLibrary::new(MockService::standard(), &options).unwrap();
    assert_eq!(second.service().scans, 0);
    assert_eq!(
        second.catalog().fonts()[0].charset(),
        first.catalog().fonts()[0].charset()
    );
    assert_eq!(
        second.width("Sans", Style::Regular, SIZE, "A€中").unwrap(),
        2 * ADVANCE + PLACEHOLDER_ADVANCE
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
pub fn default_cache_path_is_per_user() {
    if let Some(path) = LibraryOptions::default_charset_cache_path() {
        assert!(path.ends_with("font-fallback/charsets"));
    }
}

#[test]
pub fn scanning_can_be_disabled() {
    let mut options = LibraryOptions::new();
    options.scan_fonts(false);
    let library = FontLibrary::new(MockService::standard(), &options).unwrap();
    assert_eq!(library.service().scans, 0);
    assert!(library.catalog().fonts().iter().all(|font| font.charset().is_none()));
    assert_eq!(library.substitution_table().available(), 0);
}
