//! Named portraits P00-P80: a banked pointer to the tile data plus a 6x6 arrangement

use crate::bitmap::{Atlas, RgbImage};
use crate::metatile::{self, GRID, Grid, PORTRAIT_SIZE};
use crate::rom::{self, Rom};
use crate::tile::{PORTRAIT, Tile};
use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use sgs_common::error::DecodeResult;
use sgs_common::memmap::{ARRANGEMENTS, PORTRAIT_POINTERS, TILE_LEN};
use sgs_common::records;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

pub type Layout = Grid<u8>;

/// Tile order of a full 36 tile portrait: 2x2 metatiles, left to right then top to bottom
pub const STANDARD_LAYOUT: Layout = [
    [1, 2, 5, 6, 9, 10],
    [3, 4, 7, 8, 11, 12],
    [13, 14, 17, 18, 21, 22],
    [15, 16, 19, 20, 23, 24],
    [25, 26, 29, 30, 33, 34],
    [27, 28, 31, 32, 35, 36],
];

/// Portraits drawn with `STANDARD_LAYOUT`
pub const STANDARD_PORTRAITS: [usize; 32] = [
    6, 7, 8, 24, 25, 26, 29, 35, 38, 40, 41, 43, 44, 45, 46, 47, 49, 51, 58, 59, 61, 66, 68, 69,
    70, 72, 74, 75, 76, 77, 79, 80,
];

/// P01 isn't in the arrangement table
pub const PORTRAIT_01_LAYOUT: Layout = [
    [1, 2, 5, 6, 9, 10],
    [3, 4, 7, 8, 11, 12],
    [10, 13, 15, 16, 19, 20],
    [10, 14, 17, 18, 21, 22],
    [10, 23, 26, 27, 30, 10],
    [24, 25, 28, 29, 31, 32],
];

/// Portrait to arrangement pairs checked by eye. Where several arrangements fit the lowest one
/// was kept.
pub const MANUAL_MAPPING: [(usize, usize); 25] = [
    // 32 tiles
    (5, 27),
    (20, 2),
    (21, 17),
    (30, 18),
    (31, 28),
    (33, 30),
    (36, 33),
    (54, 51),
    // 33 tiles
    (2, 12),
    (11, 8),
    (15, 12),
    (16, 13),
    (17, 14),
    (18, 14),
    (34, 31),
    (39, 36),
    (48, 45),
    (56, 31),
    (64, 31),
    // 35 tiles
    (63, 60),
    (65, 62),
    (67, 57),
    (71, 62),
    (73, 70),
    (78, 75),
];

const ARRANGEMENT_TILE_BASE: u8 = 0x63;

/// Entry of the portrait pointer table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PortraitPointer {
    pub index: usize,
    pub bank: u8,
    pub tile_count: u8,
    /// CPU address in the $8000 window
    pub addr: u16,
}

impl PortraitPointer {
    pub fn decode(index: usize, bytes: &[u8]) -> PortraitPointer {
        PortraitPointer {
            index,
            bank: bytes[0],
            tile_count: bytes[1],
            addr: LittleEndian::read_u16(&bytes[2..4]),
        }
    }

    pub fn file_offset(&self) -> DecodeResult<usize> {
        rom::prg_file_offset(self.bank, self.addr)
    }

    pub fn is_standard(&self) -> bool {
        STANDARD_PORTRAITS.contains(&self.index)
    }
}

pub fn read_pointers(rom: &Rom) -> Vec<PortraitPointer> {
    records::get(rom.as_bytes(), PORTRAIT_POINTERS)
        .map(|r| PortraitPointer::decode(r.index, r.bytes))
        .collect()
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Arrangement {
    pub index: usize,
    /// 1-based tile numbers, bytes outside of 0x64..=0x87 are kept as is
    pub layout: Layout,
}

impl Arrangement {
    pub fn decode(index: usize, bytes: &[u8]) -> Arrangement {
        let layout = metatile::grid_from_fn(|r, c| {
            let b = bytes[r * GRID + c];

            if (0x64..=0x87).contains(&b) {
                b - ARRANGEMENT_TILE_BASE
            } else {
                b
            }
        });

        Arrangement { index, layout }
    }

    /// Highest tile number referenced, 0 if none
    pub fn max_tile(&self) -> u8 {
        self.layout
            .iter()
            .flatten()
            .copied()
            .filter(|t| (1..=36).contains(t))
            .max()
            .unwrap_or(0)
    }

    pub fn is_standard(&self) -> bool {
        self.layout == STANDARD_LAYOUT
    }
}

pub fn read_arrangements(rom: &Rom) -> Vec<Arrangement> {
    records::get(rom.as_bytes(), ARRANGEMENTS)
        .map(|r| Arrangement::decode(r.index, r.bytes))
        .collect()
}

/// Pick a layout for every portrait that isn't drawn with the standard one. Manual pairs go
/// first, then the remaining portraits, fewest tiles first, take the first unused arrangement
/// with exactly as many tiles, or failing that with fewer.
pub fn build_mapping(
    pointers: &[PortraitPointer],
    arrangements: &[Arrangement],
) -> BTreeMap<usize, Layout> {
    let mut mapping = BTreeMap::new();
    let mut used = HashSet::new();

    for &(portrait, arr) in MANUAL_MAPPING.iter() {
        if let Some(a) = arrangements.iter().find(|a| a.index == arr) {
            mapping.insert(portrait, a.layout);
            used.insert(arr);
        }
    }

    let mut pending: Vec<&PortraitPointer> = pointers
        .iter()
        .filter(|p| !p.is_standard() && !mapping.contains_key(&p.index))
        .collect();

    pending.sort_by_key(|p| p.tile_count);

    for p in pending {
        let candidates = || {
            arrangements
                .iter()
                .filter(|a| !used.contains(&a.index) && !a.is_standard())
        };

        let found = candidates()
            .find(|a| a.max_tile() == p.tile_count)
            .or_else(|| candidates().find(|a| a.max_tile() < p.tile_count));

        match found {
            Some(a) => {
                debug!("P{:02} -> A{}", p.index, a.index);
                mapping.insert(p.index, a.layout);
                used.insert(a.index);
            }
            None => {
                debug!("P{:02}: no arrangement left, using the standard layout", p.index);
                mapping.insert(p.index, STANDARD_LAYOUT);
            }
        }
    }

    mapping
}

/// Final layout of portrait `p`
pub fn layout_for(p: &PortraitPointer, mapping: &BTreeMap<usize, Layout>) -> Layout {
    if p.index == 1 {
        PORTRAIT_01_LAYOUT
    } else if p.is_standard() {
        STANDARD_LAYOUT
    } else {
        mapping.get(&p.index).copied().unwrap_or(STANDARD_LAYOUT)
    }
}

/// Draw a portrait. Cells referencing tiles past `tile_count` stay black.
pub fn render(rom: &Rom, p: &PortraitPointer, layout: &Layout) -> RgbImage {
    let base = match p.file_offset() {
        Ok(o) => o,
        Err(e) => {
            warn!("P{:02}: {}", p.index, e);
            return RgbImage::new(PORTRAIT_SIZE, PORTRAIT_SIZE, PORTRAIT.color(0));
        }
    };

    let tiles: Vec<Tile> = rom
        .tiles(base, usize::from(p.tile_count))
        .map(Tile::decode)
        .collect();

    metatile::compose(|r, c| {
        let v = usize::from(layout[r][c]);

        if v == 0 {
            None
        } else {
            tiles.get(v - 1).copied()
        }
    })
    .to_rgb(&PORTRAIT)
}

/// Decoded portrait tables
pub struct Portraits {
    pub pointers: Vec<PortraitPointer>,
    pub mapping: BTreeMap<usize, Layout>,
}

impl Portraits {
    pub fn load(rom: &Rom) -> Portraits {
        let pointers = read_pointers(rom);
        let arrangements = read_arrangements(rom);
        let mapping = build_mapping(&pointers, &arrangements);

        Portraits { pointers, mapping }
    }

    pub fn render_all(&self, rom: &Rom, scale: usize) -> Vec<RgbImage> {
        self.pointers
            .iter()
            .map(|p| render(rom, p, &layout_for(p, &self.mapping)).scale(scale))
            .collect()
    }

    pub fn standard_count(&self) -> usize {
        self.pointers.iter().filter(|p| p.is_standard()).count()
    }
}

/// Write `portraits/portrait_NN.png` and `portrait_atlas.png` to `out_dir`
pub fn export<P: AsRef<Path>>(rom: &Rom, out_dir: P, scale: usize) -> Result<Portraits> {
    let out_dir = out_dir.as_ref();
    let portrait_dir = out_dir.join("portraits");

    fs::create_dir_all(&portrait_dir)?;

    let portraits = Portraits::load(rom);
    let images = portraits.render_all(rom, scale);

    for (p, img) in portraits.pointers.iter().zip(images.iter()) {
        img.write_png(portrait_dir.join(format!("portrait_{:02}.png", p.index)))?;
    }

    info!(
        "Wrote {} portraits to `{}`",
        images.len(),
        portrait_dir.display()
    );

    let atlas = Atlas {
        cols: 9,
        rows: 9,
        cell_width: PORTRAIT_SIZE * scale.max(1),
        cell_height: PORTRAIT_SIZE * scale.max(1),
        margin: 2,
        background: [128, 128, 128],
    };

    let atlas_path = out_dir.join("portrait_atlas.png");
    atlas.render(&images).write_png(&atlas_path)?;
    info!("Wrote `{}`", atlas_path.display());

    Ok(portraits)
}

#[cfg(test)]
fn arrangement_bytes(layout: &Layout) -> Vec<u8> {
    layout
        .iter()
        .flatten()
        .map(|&v| if (1..=36).contains(&v) { v + ARRANGEMENT_TILE_BASE } else { v })
        .collect()
}

#[test]
fn test_pointer_decode() {
    let p = PortraitPointer::decode(3, &[0x06, 36, 0x00, 0x94]);

    assert_eq!(p.tile_count, 36);
    assert_eq!(p.addr, 0x9400);
    assert_eq!(p.file_offset(), Ok(6 * 0x4000 + 0x1400 + 0x10));
    assert!(!p.is_standard());

    let p = PortraitPointer::decode(6, &[0x06, 36, 0x00, 0x12]);

    assert!(p.is_standard());
    assert!(p.file_offset().is_err());
}

#[test]
fn test_arrangement_decode() {
    let a = Arrangement::decode(0, &arrangement_bytes(&STANDARD_LAYOUT));

    assert_eq!(a.layout, STANDARD_LAYOUT);
    assert!(a.is_standard());
    assert_eq!(a.max_tile(), 36);

    let mut bytes = arrangement_bytes(&PORTRAIT_01_LAYOUT);
    bytes[0] = 0x00;
    bytes[1] = 0xff;

    let a = Arrangement::decode(1, &bytes);

    assert_eq!(a.layout[0][0], 0);
    assert_eq!(a.layout[0][1], 0xff);
    assert_eq!(a.layout[5][5], 32);
    assert_eq!(a.max_tile(), 32);
    assert!(!a.is_standard());
}

#[test]
fn test_mapping() {
    let arr = |index: usize, max: u8| {
        let mut layout = [[0; GRID]; GRID];
        layout[0][0] = max;
        // Tag, outside of the tile range
        layout[5][5] = 100 + index as u8;
        Arrangement { index, layout }
    };

    // 0: standard, 1..: candidates
    let mut arrangements = vec![Arrangement {
        index: 0,
        layout: STANDARD_LAYOUT,
    }];
    arrangements.extend((1..70).map(|i| arr(i, if i % 2 == 0 { 33 } else { 30 })));

    let ptr = |index, tile_count| PortraitPointer {
        index,
        bank: 6,
        tile_count,
        addr: 0x8000,
    };

    let pointers = vec![ptr(0, 33), ptr(3, 30), ptr(4, 31), ptr(5, 32), ptr(6, 36), ptr(9, 36)];

    let mapping = build_mapping(&pointers, &arrangements);

    // Manual override
    assert_eq!(mapping[&5], arrangements[27].layout);
    // Standard portraits aren't mapped
    assert!(!mapping.contains_key(&6));
    // 3 goes first (30 tiles), takes the first unused 30-tile arrangement
    assert_eq!(mapping[&3], arrangements[1].layout);
    // 4 has no exact match, takes the first unused smaller one
    assert_eq!(mapping[&4], arrangements[3].layout);
    // 0 is exact on the first even one that's not used by a manual pair
    assert_eq!(mapping[&0], arrangements[4].layout);
    // 9 isn't standard and 36 tiles: no exact match, first unused smaller
    assert_eq!(mapping[&9], arrangements[5].layout);

    assert_eq!(layout_for(&pointers[4], &mapping), STANDARD_LAYOUT);
    assert_eq!(layout_for(&ptr(1, 32), &mapping), PORTRAIT_01_LAYOUT);
}

#[test]
fn test_render() {
    let mut data = crate::rom::blank_image();

    // 2 tiles at bank 6 $8000: tile 0 all index 1, tile 1 all index 3
    let base = rom::prg_file_offset(6, 0x8000).unwrap();
    data[base..base + 8].fill(0xff);
    data[base + 16..base + 32].fill(0xff);

    let rom = Rom::from_bytes(data).unwrap();

    let p = PortraitPointer {
        index: 3,
        bank: 6,
        tile_count: 2,
        addr: 0x8000,
    };

    let mut layout = [[0; GRID]; GRID];
    layout[0][0] = 1;
    layout[5][5] = 2;
    // Past tile_count, left black
    layout[2][2] = 3;

    let img = render(&rom, &p, &layout);

    assert_eq!((img.width(), img.height()), (48, 48));
    assert_eq!(img.pixel(0, 0), [247, 216, 165]);
    assert_eq!(img.pixel(47, 47), [255, 255, 255]);
    assert_eq!(img.pixel(20, 20), [0, 0, 0]);
    assert_eq!(img.pixel(8, 0), [0, 0, 0]);

    // Bad pointers render blank
    let bad = PortraitPointer { addr: 0x1000, ..p };
    let img = render(&rom, &bad, &layout);

    assert!(img.pixels().iter().all(|&c| c == [0, 0, 0]));
}

#[test]
fn test_standard_tables() {
    assert_eq!(STANDARD_PORTRAITS.len(), 32);
    assert!(STANDARD_PORTRAITS.windows(2).all(|w| w[0] < w[1]));

    let mut seen: Vec<u8> = STANDARD_LAYOUT.iter().flatten().copied().collect();
    seen.sort();

    assert_eq!(seen, (1..=36).collect::<Vec<u8>>());
}

#[test]
fn test_export_creates_dirs() {
    let rom = Rom::from_bytes(crate::rom::blank_image()).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("kanji_output");

    let portraits = export(&rom, &out, 1).unwrap();

    assert_eq!(portraits.pointers.len(), 81);
    assert!(out.join("portraits").join("portrait_00.png").exists());
    assert!(out.join("portraits").join("portrait_80.png").exists());

    let atlas = RgbImage::read_png(out.join("portrait_atlas.png")).unwrap();

    assert_eq!(atlas.width(), 2 + 9 * (48 + 2));
}
