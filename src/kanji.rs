//! 16x16 kanji glyphs used to spell general names

use crate::bitmap::{Atlas, IndexedImage, RgbImage};
use crate::names::{self, GlyphRef};
use crate::rom::Rom;
use crate::tile::{GRAYSCALE, Tile};
use anyhow::Result;
use sgs_common::memmap::{GLYPH_TILE_LEN, KANJI_PAGE0, KANJI_PAGE1};
use std::fs;
use std::path::Path;

/// Glyph size in pixels
pub const GLYPH_SIZE: usize = 16;

/// Glyphs checked against the real font, written out at a large scale
pub const KNOWN_SAMPLES: [(u8, char); 9] = [
    (0x8e, '曹'),
    (0x8d, '操'),
    (0x91, '孫'),
    (0x3e, '堅'),
    (0xe3, '劉'),
    (0xbd, '備'),
    (0x9f, '張'),
    (0x24, '關'),
    (0x05, '羽'),
];

/// File offset of glyph `id`. Page 1 selects the second font page, any other value the first.
pub fn glyph_offset(id: u8, page: u8) -> usize {
    let table = if page == 1 { KANJI_PAGE1 } else { KANJI_PAGE0 };

    table.offset(usize::from(id))
}

/// Decode a glyph: 4 single plane tiles laid out `[0][1]` over `[2][3]`
pub fn decode_glyph(rom: &Rom, id: u8, page: u8) -> IndexedImage {
    let base = glyph_offset(id, page);

    let mut img = IndexedImage::new(GLYPH_SIZE, GLYPH_SIZE);

    for i in 0..4 {
        let tile = rom
            .slice(base + i * GLYPH_TILE_LEN, GLYPH_TILE_LEN)
            .map(Tile::decode_mono)
            .unwrap_or(Tile::BLANK);

        img.blit_tile(i % 2, i / 2, &tile);
    }

    img
}

pub fn render_glyph(rom: &Rom, id: u8, page: u8, scale: usize) -> RgbImage {
    decode_glyph(rom, id, page).to_rgb(&GRAYSCALE).scale(scale)
}

/// A glyph reference found in the name table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NameGlyph {
    /// Name record index
    pub index: usize,
    pub glyph: GlyphRef,
    /// Position of the character in the name, 0..3
    pub position: usize,
}

/// All non-empty glyph references of the name table
pub fn name_table_glyphs(rom: &Rom) -> Vec<NameGlyph> {
    names::read_all(rom)
        .iter()
        .flat_map(|n| {
            n.glyphs
                .iter()
                .enumerate()
                .filter(|(_, g)| g.id != 0)
                .map(move |(position, &glyph)| NameGlyph {
                    index: n.index,
                    glyph,
                    position,
                })
        })
        .collect()
}

/// Distinct (id, page) pairs, sorted
pub fn unique_glyphs(glyphs: &[NameGlyph]) -> Vec<GlyphRef> {
    let mut v: Vec<GlyphRef> = glyphs.iter().map(|g| g.glyph).collect();

    v.sort_by_key(|g| (g.id, g.page));
    v.dedup();

    v
}

/// All 256 glyphs of page 0 on a 16x16 grid
pub fn page0_atlas(rom: &Rom, scale: usize) -> RgbImage {
    let atlas = Atlas {
        cols: 16,
        rows: 16,
        cell_width: GLYPH_SIZE * scale,
        cell_height: GLYPH_SIZE * scale,
        margin: 1,
        background: [240, 240, 240],
    };

    let glyphs: Vec<RgbImage> = (0..=255u8).map(|id| render_glyph(rom, id, 0, scale)).collect();

    atlas.render(&glyphs)
}

/// What `export` wrote
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub samples: usize,
    pub page0: usize,
    pub other_pages: usize,
}

/// Write the known samples, the page 0 atlas and every glyph used in the name table to `out_dir`
pub fn export<P: AsRef<Path>>(rom: &Rom, out_dir: P) -> Result<ExportStats> {
    let out_dir = out_dir.as_ref();

    fs::create_dir_all(out_dir)?;

    let mut stats = ExportStats::default();

    for &(id, name) in KNOWN_SAMPLES.iter() {
        let path = out_dir.join(format!("kanji_{:02X}_{}.png", id, name));

        render_glyph(rom, id, 0, 8).write_png(&path)?;
        debug!("Wrote `{}`", path.display());

        stats.samples += 1;
    }

    let atlas_path = out_dir.join("kanji_atlas_page0.png");
    page0_atlas(rom, 2).write_png(&atlas_path)?;
    info!("Wrote `{}`", atlas_path.display());

    let individual = out_dir.join("individual");
    fs::create_dir_all(&individual)?;

    let used = unique_glyphs(&name_table_glyphs(rom));

    info!("{} distinct glyphs used in the name table", used.len());

    for g in used {
        let path = individual.join(format!("kanji_p{}_{:02X}.png", g.page, g.id));

        render_glyph(rom, g.id, g.page, 4).write_png(&path)?;

        if g.page == 0 {
            stats.page0 += 1;
        } else {
            stats.other_pages += 1;
        }
    }

    Ok(stats)
}

#[test]
fn test_glyph_offset() {
    assert_eq!(glyph_offset(0, 0), 0x20014);
    assert_eq!(glyph_offset(0x8e, 0), 0x20014 + 0x8e * 32);
    assert_eq!(glyph_offset(0x42, 1), 0x22014 + 0x42 * 32);
    // Unknown pages fall back to page 0
    assert_eq!(glyph_offset(0x10, 7), glyph_offset(0x10, 0));
}

#[test]
fn test_decode_glyph() {
    let mut data = crate::rom::blank_image();

    let off = glyph_offset(0x8e, 0);
    // Top-left tile: first row set. Bottom-right tile: last row set.
    data[off] = 0xff;
    data[off + 3 * 8 + 7] = 0x81;

    let rom = Rom::from_bytes(data).unwrap();

    let img = decode_glyph(&rom, 0x8e, 0);

    assert_eq!((img.width(), img.height()), (16, 16));
    assert_eq!(img.pixel(0, 0), 3);
    assert_eq!(img.pixel(7, 0), 3);
    assert_eq!(img.pixel(8, 0), 0);
    assert_eq!(img.pixel(8, 15), 3);
    assert_eq!(img.pixel(15, 15), 3);
    assert_eq!(img.pixel(9, 15), 0);

    let rgb = render_glyph(&rom, 0x8e, 0, 8);

    assert_eq!((rgb.width(), rgb.height()), (128, 128));
    assert_eq!(rgb.pixel(0, 0), [0, 0, 0]);
    assert_eq!(rgb.pixel(127, 0), [255, 255, 255]);
}

#[test]
fn test_atlas_size() {
    let rom = Rom::from_bytes(crate::rom::blank_image()).unwrap();

    let atlas = page0_atlas(&rom, 2);

    assert_eq!(atlas.width(), 16 * 33 + 1);
    assert_eq!(atlas.height(), 16 * 33 + 1);
    assert_eq!(atlas.pixel(0, 0), [240, 240, 240]);
    assert_eq!(atlas.pixel(1, 1), [255, 255, 255]);
}

#[test]
fn test_name_table_glyphs() {
    use sgs_common::memmap::NAMES;

    let mut data = crate::rom::blank_image();

    let off = NAMES.offset(1);
    data[off + 8] = 0x8e;
    data[off + 10] = 0x8d;

    let off = NAMES.offset(5);
    data[off + 8] = 0x8e;
    data[off + 12] = 0x20;
    data[off + 13] = 1;

    let rom = Rom::from_bytes(data).unwrap();

    let glyphs = name_table_glyphs(&rom);

    assert_eq!(glyphs.len(), 4);
    assert_eq!(
        glyphs[3],
        NameGlyph {
            index: 5,
            glyph: GlyphRef { id: 0x20, page: 1 },
            position: 2
        }
    );

    let unique = unique_glyphs(&glyphs);

    assert_eq!(
        unique,
        vec![
            GlyphRef { id: 0x20, page: 1 },
            GlyphRef { id: 0x8d, page: 0 },
            GlyphRef { id: 0x8e, page: 0 },
        ]
    );
}

#[test]
fn test_export_creates_dirs() {
    use sgs_common::memmap::NAMES;

    let mut data = crate::rom::blank_image();

    // One page 1 glyph in the name table
    data[NAMES.offset(1) + 8] = 0x42;
    data[NAMES.offset(1) + 9] = 1;

    let rom = Rom::from_bytes(data).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("kanji_output");

    let stats = export(&rom, &out).unwrap();

    assert_eq!(
        stats,
        ExportStats {
            samples: KNOWN_SAMPLES.len(),
            page0: 0,
            other_pages: 1,
        }
    );

    assert!(out.join("kanji_atlas_page0.png").exists());
    assert!(out.join("individual").join("kanji_p1_42.png").exists());
}
