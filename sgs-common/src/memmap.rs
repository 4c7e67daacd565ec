//! Sangokushi cartridge map
//!
//! Every offset in this file is a file offset, i.e. it includes the 16 byte iNES header.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub base: usize,
    pub len: usize,
}

impl Range {
    /// Return `Some(offset)` if addr is contained in `self`
    pub const fn contains(self, addr: usize) -> Option<usize> {
        if addr >= self.base && addr <= self.base + (self.len - 1) {
            Some(addr - self.base)
        } else {
            None
        }
    }

    /// First offset past the end of the range
    pub const fn end(self) -> usize {
        self.base + self.len
    }
}

/// A table of `count` records laid out every `stride` bytes starting at `base`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub base: usize,
    pub stride: usize,
    pub count: usize,
}

impl Table {
    /// Offset of record `index`. `index` is not checked against `count` since some tables are
    /// addressed one past their documented end.
    pub const fn offset(self, index: usize) -> usize {
        self.base + index * self.stride
    }

    /// Offset of the last record
    pub const fn last(self) -> usize {
        self.offset(self.count - 1)
    }

    pub const fn range(self) -> Range {
        Range {
            base: self.base,
            len: self.stride * self.count,
        }
    }
}

pub const INES_MAGIC: [u8; 4] = *b"NES\x1a";

pub const INES_HEADER_LEN: usize = 0x10;

/// Size of a switchable MMC1 PRG bank
pub const PRG_BANK_LEN: usize = 0x4000;

/// CPU address where the switchable bank is mapped
pub const PRG_WINDOW_BASE: u16 = 0x8000;

pub const PRG_ROM: Range = Range {
    base: INES_HEADER_LEN,
    len: 16 * PRG_BANK_LEN,
};

/// 8x8 tile, two bitplanes
pub const TILE_LEN: usize = 16;

/// 8x8 glyph tile, single bitplane
pub const GLYPH_TILE_LEN: usize = 8;

/// `4C 00 00 00` in front of the character table
pub const CHARACTER_HEADER: Range = Range {
    base: 0x38010,
    len: 4,
};

/// General stat records: 12 data bytes followed by `CHARACTER_SEPARATOR`
pub const CHARACTERS: Table = Table {
    base: 0x38014,
    stride: 17,
    count: 256,
};

pub const CHARACTER_DATA_LEN: usize = 12;

pub const CHARACTER_SEPARATOR: [u8; 5] = [0x0a, 0x0a, 0x0a, 0x00, 0x00];

/// Name records. Entry 0 is the template used for new rulers, the rest line up with
/// `CHARACTERS`.
pub const NAMES: Table = Table {
    base: 0x3a314,
    stride: 15,
    count: 257,
};

/// Length of the half-width katakana field at the start of a name record
pub const NAME_KANA_LEN: usize = 8;

/// 16x16 kanji glyphs, 4 single plane tiles each
pub const KANJI_PAGE0: Table = Table {
    base: 0x20014,
    stride: 4 * GLYPH_TILE_LEN,
    count: 256,
};

pub const KANJI_PAGE1: Table = Table {
    base: 0x22014,
    stride: 4 * GLYPH_TILE_LEN,
    count: 256,
};

/// Named portrait pointers: bank, tile count, address (LE)
pub const PORTRAIT_POINTERS: Table = Table {
    base: 0x1bc38,
    stride: 4,
    count: 81,
};

/// 6x6 tile arrangements for the named portraits. The table runs right up to
/// `PORTRAIT_POINTERS`.
pub const ARRANGEMENTS: Table = Table {
    base: 0x1b140,
    stride: 36,
    count: 78,
};

/// Mob portrait head frameworks
pub const MOB_HEADS: Table = Table {
    base: 0x1c014,
    stride: MOB_HEAD_TILES * TILE_LEN,
    count: 20,
};

pub const MOB_HEAD_TILES: usize = 24;

pub const MOB_EYES: Table = Table {
    base: 0x1de14,
    stride: 3 * TILE_LEN,
    count: 20,
};

pub const MOB_NOSES: Table = Table {
    base: 0x1e1d4,
    stride: 3 * TILE_LEN,
    count: 20,
};

pub const MOB_MOUTHS: Table = Table {
    base: 0x1e594,
    stride: 6 * TILE_LEN,
    count: 20,
};

/// 6x6 templates, one per head. 0 marks a variant slot, anything else is `0x64 + head tile`.
pub const MOB_TEMPLATES: Table = Table {
    base: 0x1ed14,
    stride: 36,
    count: 20,
};

/// `[cat, head, eye, nose, mouth]` for every mob portrait
pub const MOB_COMPONENTS: Table = Table {
    base: 0x1f034,
    stride: 5,
    count: 174,
};

/// Index of the first mob portrait, the ones before are the named portraits
pub const MOB_FIRST_PORTRAIT: usize = 81;

#[test]
fn test_table_boundaries() {
    assert_eq!(CHARACTERS.offset(0), 0x38014);
    assert_eq!(CHARACTERS.last(), 0x38014 + 255 * 17);
    assert_eq!(CHARACTERS.range().end(), 0x39114);

    assert_eq!(NAMES.offset(0), 0x3a314);
    assert_eq!(NAMES.last(), 0x3a314 + 256 * 15);

    assert_eq!(KANJI_PAGE0.offset(0x8e), 0x20014 + 0x8e * 32);
    assert_eq!(KANJI_PAGE1.offset(0), KANJI_PAGE0.offset(0) + 0x2000);

    assert_eq!(PORTRAIT_POINTERS.last(), 0x1bc38 + 80 * 4);

    assert_eq!(MOB_HEADS.offset(1), 0x1c194);
    assert_eq!(MOB_HEADS.last(), 0x1dc94);

    assert_eq!(MOB_COMPONENTS.offset(0), 0x1f034);
    assert_eq!(MOB_COMPONENTS.last(), 0x1f034 + 173 * 5);
}

#[test]
fn test_tables_are_contiguous() {
    // The arrangement table ends where the pointer table starts
    assert_eq!(ARRANGEMENTS.range().end(), PORTRAIT_POINTERS.base);

    // Heads, eyes, noses and mouths are packed back to back
    assert_eq!(MOB_HEADS.range().end(), MOB_EYES.base);
    assert_eq!(MOB_EYES.range().end(), MOB_NOSES.base);
    assert_eq!(MOB_NOSES.range().end(), MOB_MOUTHS.base);
    assert_eq!(MOB_MOUTHS.range().end(), MOB_TEMPLATES.base);

    assert!(MOB_TEMPLATES.range().end() <= MOB_COMPONENTS.base);
}

#[test]
fn test_range_contains() {
    assert_eq!(CHARACTER_HEADER.contains(0x38010), Some(0));
    assert_eq!(CHARACTER_HEADER.contains(0x38013), Some(3));
    assert_eq!(CHARACTER_HEADER.contains(0x38014), None);
    assert_eq!(CHARACTER_HEADER.contains(0x3800f), None);

    assert!(PRG_ROM.contains(NAMES.last()).is_some());
    assert_eq!(PRG_ROM.end(), 0x40010);
}
