//! 2bpp planar tiles and the fixed palettes they're displayed with

use sgs_common::memmap::{GLYPH_TILE_LEN, TILE_LEN};

const_assert!(GLYPH_TILE_LEN * 2 == TILE_LEN);

/// Width and height of a tile in pixels
pub const TILE_SIZE: usize = 8;

/// 8x8 tile of 2-bit palette indices
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Tile {
    rows: [[u8; TILE_SIZE]; TILE_SIZE],
}

impl Tile {
    pub const BLANK: Tile = Tile {
        rows: [[0; TILE_SIZE]; TILE_SIZE],
    };

    /// Decode a PPU tile: plane 0 in bytes 0..8, plane 1 in bytes 8..16. Anything shorter than a
    /// full tile decodes blank.
    pub fn decode(data: &[u8]) -> Tile {
        match (data.get(..GLYPH_TILE_LEN), data.get(GLYPH_TILE_LEN..TILE_LEN)) {
            (Some(p0), Some(p1)) => Tile::from_planes(p0, p1),
            _ => Tile::BLANK,
        }
    }

    /// Decode a single plane glyph tile. Plane 1 mirrors plane 0 so set pixels come out as index
    /// 3.
    pub fn decode_mono(data: &[u8]) -> Tile {
        match data.get(..GLYPH_TILE_LEN) {
            Some(p0) => Tile::from_planes(p0, p0),
            None => Tile::BLANK,
        }
    }

    fn from_planes(p0: &[u8], p1: &[u8]) -> Tile {
        let mut rows = [[0; TILE_SIZE]; TILE_SIZE];

        for (y, row) in rows.iter_mut().enumerate() {
            for (x, p) in row.iter_mut().enumerate() {
                let shift = 7 - x;
                let lo = (p0[y] >> shift) & 1;
                let hi = (p1[y] >> shift) & 1;

                *p = lo | (hi << 1);
            }
        }

        Tile { rows }
    }

    /// Pack back into the 16 byte PPU representation
    pub fn encode(&self) -> [u8; TILE_LEN] {
        let mut out = [0; TILE_LEN];

        for (y, row) in self.rows.iter().enumerate() {
            for (x, &p) in row.iter().enumerate() {
                let bit = 0x80 >> x;

                if p & 1 != 0 {
                    out[y] |= bit;
                }
                if p & 2 != 0 {
                    out[GLYPH_TILE_LEN + y] |= bit;
                }
            }
        }

        out
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.rows[y][x]
    }

    pub fn rows(&self) -> &[[u8; TILE_SIZE]; TILE_SIZE] {
        &self.rows
    }

    pub fn is_blank(&self) -> bool {
        *self == Tile::BLANK
    }
}

pub type Rgb = [u8; 3];

/// The 4 colours a tile's indices map to
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Palette(pub [Rgb; 4]);

impl Palette {
    pub fn color(&self, index: u8) -> Rgb {
        self.0[usize::from(index & 3)]
    }

    /// Index of the closest colour (squared RGB distance, lowest index on ties)
    pub fn nearest(&self, c: Rgb) -> u8 {
        let dist = |p: &Rgb| -> u32 {
            p.iter()
                .zip(c.iter())
                .map(|(&a, &b)| {
                    let d = i32::from(a) - i32::from(b);
                    (d * d) as u32
                })
                .sum()
        };

        let mut best = 0;

        for (i, p) in self.0.iter().enumerate().skip(1) {
            if dist(p) < dist(&self.0[best]) {
                best = i;
            }
        }

        best as u8
    }
}

/// Palette the game loads for the portrait window
pub const PORTRAIT: Palette = Palette([
    [0, 0, 0],
    [247, 216, 165],
    [234, 158, 34],
    [255, 255, 255],
]);

/// Neutral palette used for glyphs
pub const GRAYSCALE: Palette = Palette([
    [255, 255, 255],
    [170, 170, 170],
    [85, 85, 85],
    [0, 0, 0],
]);

#[test]
fn test_decode_planes() {
    let mut data = [0u8; 16];

    // Row 0: plane 0 only
    data[0] = 0xff;
    // Row 1: plane 1 only
    data[9] = 0xff;
    // Row 2: both planes, leftmost pixel only
    data[2] = 0x80;
    data[10] = 0x80;
    // Row 7: alternating
    data[7] = 0xaa;
    data[15] = 0x55;

    let t = Tile::decode(&data);

    assert_eq!(t.rows()[0], [1; 8]);
    assert_eq!(t.rows()[1], [2; 8]);
    assert_eq!(t.rows()[2], [3, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(t.rows()[3], [0; 8]);
    assert_eq!(t.rows()[7], [1, 2, 1, 2, 1, 2, 1, 2]);

    assert_eq!(t.encode(), data);
}

#[test]
fn test_decode_mono() {
    let data = [0x80, 0x01, 0xff, 0, 0, 0, 0, 0x3c];

    let t = Tile::decode_mono(&data);

    assert_eq!(t.pixel(0, 0), 3);
    assert_eq!(t.pixel(1, 0), 0);
    assert_eq!(t.pixel(7, 1), 3);
    assert_eq!(t.rows()[2], [3; 8]);
    assert_eq!(t.rows()[7], [0, 0, 3, 3, 3, 3, 0, 0]);

    for row in t.rows() {
        assert!(row.iter().all(|&p| p == 0 || p == 3));
    }
}

#[test]
fn test_short_input() {
    assert!(Tile::decode(&[0xff; 15]).is_blank());
    assert!(Tile::decode(&[]).is_blank());
    assert!(Tile::decode_mono(&[0xff; 7]).is_blank());
    assert!(!Tile::decode_mono(&[0xff; 8]).is_blank());
}

#[test]
fn test_palette() {
    assert_eq!(PORTRAIT.color(1), [247, 216, 165]);
    assert_eq!(GRAYSCALE.color(3), [0, 0, 0]);

    assert_eq!(PORTRAIT.nearest([10, 5, 0]), 0);
    assert_eq!(PORTRAIT.nearest([240, 210, 160]), 1);
    assert_eq!(PORTRAIT.nearest([230, 150, 40]), 2);
    assert_eq!(PORTRAIT.nearest([250, 250, 250]), 3);

    for i in 0..4 {
        assert_eq!(PORTRAIT.nearest(PORTRAIT.color(i)), i);
    }
}
