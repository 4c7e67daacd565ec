//! Build a generic portrait from a tile group, a framework and variant numbers
//!
//! A group is a window of the tile banks starting at one of the head framework addresses.
//! Variant tiles are numbered relative to group A, other groups shift them by their distance to
//! A in tiles.

use crate::bitmap::IndexedImage;
use crate::metatile::{self, GRID, Grid};
use crate::rom::Rom;
use crate::tile::Tile;
use sgs_common::error::{DecodeError, DecodeResult};
use sgs_common::memmap::TILE_LEN;
use std::fmt;
use std::str::FromStr;

/// How many tiles are loaded from the group base
pub const GROUP_TILES: usize = 800;

/// First eye, face and mouth tile for group A
pub const EYE_BASE: i32 = 120;
pub const FACE_BASE: i32 = 180;
pub const MOUTH_BASE: i32 = 240;

/// Mouth tile offsets for rows 4 and 5
pub const MOUTH_OFFSETS: [[i32; 3]; 2] = [[0, 1, 4], [2, 3, 5]];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    /// Only seen while matching screenshots, lives in another bank
    H,
}

impl Group {
    pub const ALL: [Group; 8] = [
        Group::A,
        Group::B,
        Group::C,
        Group::D,
        Group::E,
        Group::F,
        Group::G,
        Group::H,
    ];

    pub fn letter(self) -> char {
        match self {
            Group::A => 'A',
            Group::B => 'B',
            Group::C => 'C',
            Group::D => 'D',
            Group::E => 'E',
            Group::F => 'F',
            Group::G => 'G',
            Group::H => 'H',
        }
    }

    pub fn from_letter(c: char) -> DecodeResult<Group> {
        let u = c.to_ascii_uppercase();

        Group::ALL
            .iter()
            .copied()
            .find(|g| g.letter() == u)
            .ok_or(DecodeError::UnknownGroup(c))
    }

    /// File offset of tile 0
    pub fn base(self) -> usize {
        match self {
            Group::A => 0x1d694,
            Group::B => 0x1c194,
            Group::C => 0x1c914,
            Group::D => 0x1db14,
            Group::E => 0x1d394,
            Group::F => 0x1d994,
            Group::G => 0x1dc94,
            Group::H => 0x102a4,
        }
    }

    /// Distance from our base to group A's, in tiles
    pub fn offset(self) -> i32 {
        (Group::A.base() as i32 - self.base() as i32) / TILE_LEN as i32
    }

    /// Frameworks known to work with this group, the first one is the default
    pub fn frameworks(self) -> &'static [&'static Framework] {
        match self {
            Group::A => &A_FRAMEWORKS,
            Group::C => &C_FRAMEWORKS,
            Group::E => &E_FRAMEWORKS,
            _ => &DEFAULT_FRAMEWORKS,
        }
    }

    /// Framework `index` of this group, the default one if out of range
    pub fn framework(self, index: usize) -> &'static Framework {
        let list = self.frameworks();

        list.get(index).copied().unwrap_or(list[0])
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Group {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Group, DecodeError> {
        let mut chars = s.chars();

        match (chars.next(), chars.next()) {
            (Some(c), None) => Group::from_letter(c),
            (Some(c), Some(_)) => Err(DecodeError::UnknownGroup(c)),
            (None, _) => Err(DecodeError::UnknownGroup(' ')),
        }
    }
}

/// Fixed framework tiles around the variant slots (`None`)
pub struct Framework {
    pub name: &'static str,
    pub grid: Grid<Option<u16>>,
}

/// Variant slot marker for `slots`
const V: i16 = -1;

const fn slots(cells: [[i16; GRID]; GRID]) -> Grid<Option<u16>> {
    let mut out = [[None; GRID]; GRID];
    let mut r = 0;

    while r < GRID {
        let mut c = 0;

        while c < GRID {
            if cells[r][c] >= 0 {
                out[r][c] = Some(cells[r][c] as u16);
            }
            c += 1;
        }
        r += 1;
    }

    out
}

pub static STANDARD: Framework = Framework {
    name: "standard",
    grid: slots([
        [0, 1, 4, 5, 8, 9],
        [2, 3, 6, 7, 10, 11],
        [12, V, V, V, 14, 15],
        [13, V, V, V, 16, 17],
        [18, V, V, V, 20, 21],
        [19, V, V, V, 22, 23],
    ]),
};

/// Second head in group A
pub static A_72: Framework = Framework {
    name: "A_72",
    grid: slots([
        [72, 73, 76, 77, 80, 81],
        [74, 75, 78, 79, 82, 83],
        [84, V, V, V, 86, 87],
        [85, V, V, V, 88, 89],
        [90, V, V, V, 92, 93],
        [91, V, V, V, 94, 95],
    ]),
};

pub static C_STANDARD: Framework = Framework {
    name: "C_standard",
    grid: slots([
        [0, 1, 4, 5, 8, 9],
        [2, 3, 6, 7, 10, 11],
        [12, V, V, V, 14, 15],
        [13, V, V, V, 16, 13],
        [13, V, V, V, 18, 13],
        [17, V, V, V, 19, 20],
    ]),
};

pub static C_48: Framework = Framework {
    name: "C_48",
    grid: slots([
        [48, 49, 51, 52, 55, 56],
        [48, 50, 53, 54, 57, 58],
        [48, V, V, V, 59, 60],
        [48, V, V, V, 61, 62],
        [48, V, V, V, 64, 65],
        [63, V, V, V, 66, 67],
    ]),
};

pub static E_STANDARD: Framework = Framework {
    name: "E_standard",
    grid: slots([
        [0, 1, 4, 5, 8, 9],
        [2, 3, 6, 7, 10, 11],
        [12, V, V, V, 14, 15],
        [13, V, V, V, 16, 17],
        [13, V, V, V, 19, 13],
        [18, V, V, V, 20, 21],
    ]),
};

static A_FRAMEWORKS: [&Framework; 2] = [&STANDARD, &A_72];
static C_FRAMEWORKS: [&Framework; 2] = [&C_STANDARD, &C_48];
static E_FRAMEWORKS: [&Framework; 1] = [&E_STANDARD];
static DEFAULT_FRAMEWORKS: [&Framework; 1] = [&STANDARD];

/// What to generate
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub group: Group,
    pub framework: usize,
    pub eye: i32,
    pub face: i32,
    pub mouth: i32,
}

/// Tile numbers, relative to the group base, for every cell
pub type Layout = Grid<i32>;

/// Fill the variant slots of the selected framework
pub fn resolve_layout(sel: &Selection) -> Layout {
    let framework = sel.group.framework(sel.framework);
    let offset = sel.group.offset();

    let eye = EYE_BASE + sel.eye * 3 + offset;
    let face = FACE_BASE + sel.face * 3 + offset;
    let mouth = MOUTH_BASE + sel.mouth * 6 + offset;

    metatile::grid_from_fn(|r, c| match framework.grid[r][c] {
        Some(t) => i32::from(t),
        None => {
            let vc = c.saturating_sub(1).min(2);

            match r {
                2 => eye + vc as i32,
                3 => face + vc as i32,
                4 | 5 => mouth + MOUTH_OFFSETS[r - 4][vc],
                // Frameworks only have slots in rows 2 to 5
                _ => -1,
            }
        }
    })
}

/// Decode up to `count` tiles from the group base, stopping at the end of the image
pub fn load_group_tiles(rom: &Rom, group: Group, count: usize) -> Vec<Tile> {
    let base = group.base();

    (0..count)
        .map_while(|i| rom.slice(base + i * TILE_LEN, TILE_LEN).ok())
        .map(Tile::decode)
        .collect()
}

/// Draw `layout`, tile numbers outside of `tiles` stay black
pub fn render_layout(tiles: &[Tile], layout: &Layout) -> IndexedImage {
    metatile::compose(|r, c| {
        usize::try_from(layout[r][c])
            .ok()
            .and_then(|t| tiles.get(t))
            .copied()
    })
}

pub fn generate(rom: &Rom, sel: &Selection) -> DecodeResult<(Layout, IndexedImage)> {
    if sel.group == Group::H {
        return Err(DecodeError::UnknownGroup('H'));
    }

    let layout = resolve_layout(sel);
    let tiles = load_group_tiles(rom, sel.group, GROUP_TILES);

    debug!(
        "Group {} (0x{:05x}): {} tiles loaded",
        sel.group,
        sel.group.base(),
        tiles.len()
    );

    let img = render_layout(&tiles, &layout);

    Ok((layout, img))
}

#[test]
fn test_group_offsets() {
    let expected = [
        (Group::A, 0),
        (Group::B, 336),
        (Group::C, 216),
        (Group::D, -72),
        (Group::E, 48),
        (Group::F, -48),
        (Group::G, -96),
        (Group::H, 3391),
    ];

    for (g, off) in expected {
        assert_eq!(g.offset(), off, "group {}", g);
    }
}

#[test]
fn test_group_parse() {
    assert_eq!("a".parse::<Group>(), Ok(Group::A));
    assert_eq!("G".parse::<Group>(), Ok(Group::G));
    assert_eq!("Z".parse::<Group>(), Err(DecodeError::UnknownGroup('Z')));
    assert!("AB".parse::<Group>().is_err());
    assert!("".parse::<Group>().is_err());
}

#[test]
fn test_frameworks() {
    let counts: Vec<usize> = Group::ALL.iter().map(|g| g.frameworks().len()).collect();

    assert_eq!(counts, [2, 1, 2, 1, 1, 1, 1, 1]);

    assert_eq!(Group::A.framework(1).name, "A_72");
    assert_eq!(Group::C.framework(1).name, "C_48");
    // Out of range falls back to the default
    assert_eq!(Group::B.framework(3).name, "standard");
    assert_eq!(Group::E.framework(0).name, "E_standard");

    assert_eq!(STANDARD.grid[0], [0, 1, 4, 5, 8, 9].map(Some));
    assert_eq!(STANDARD.grid[2][1], None);
    assert_eq!(C_48.grid[5][0], Some(63));

    // Variant slots are always columns 1 to 3 of rows 2 to 5
    for f in [&STANDARD, &A_72, &C_STANDARD, &C_48, &E_STANDARD] {
        for (r, row) in f.grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let slot = (2..6).contains(&r) && (1..4).contains(&c);

                assert_eq!(cell.is_none(), slot, "{} [{}][{}]", f.name, r, c);
            }
        }
    }
}

#[test]
fn test_resolve_layout() {
    let sel = Selection {
        group: Group::A,
        framework: 0,
        eye: 17,
        face: 18,
        mouth: 16,
    };

    let layout = resolve_layout(&sel);

    assert_eq!(layout[0], [0, 1, 4, 5, 8, 9]);
    assert_eq!(&layout[2][1..4], &[171, 172, 173]);
    assert_eq!(&layout[3][1..4], &[234, 235, 236]);
    assert_eq!(&layout[4][1..4], &[336, 337, 340]);
    assert_eq!(&layout[5][1..4], &[338, 339, 341]);

    // Same variants seen from group D
    let layout = resolve_layout(&Selection {
        group: Group::D,
        ..sel
    });

    assert_eq!(layout[2][1], 171 - 72);
    assert_eq!(layout[5][0], 19);
}

#[test]
fn test_generate() {
    let mut data = crate::rom::blank_image();

    // Group A tile 0 all index 3
    let base = Group::A.base();
    data[base..base + 16].fill(0xff);

    let rom = Rom::from_bytes(data).unwrap();

    let sel = Selection {
        group: Group::A,
        framework: 0,
        eye: 0,
        face: 0,
        mouth: 0,
    };

    let (layout, img) = generate(&rom, &sel).unwrap();

    assert_eq!(layout[0][0], 0);
    assert_eq!((img.width(), img.height()), (48, 48));
    assert_eq!(img.pixel(0, 0), 3);
    assert_eq!(img.pixel(8, 0), 0);

    assert_eq!(
        generate(&rom, &Selection { group: Group::H, ..sel }).err(),
        Some(DecodeError::UnknownGroup('H'))
    );
}

#[test]
fn test_truncated_group() {
    let mut data = crate::rom::blank_image();

    assert_eq!(
        load_group_tiles(&Rom::from_bytes(data.clone()).unwrap(), Group::A, GROUP_TILES).len(),
        800
    );

    // Leave room for 10 tiles and a half
    data.truncate(Group::A.base() + 10 * 16 + 8);
    data[Group::A.base() + 9 * 16..Group::A.base() + 10 * 16].fill(0xff);

    let rom = Rom::from_bytes(data).unwrap();
    let tiles = load_group_tiles(&rom, Group::A, GROUP_TILES);

    assert_eq!(tiles.len(), 10);

    let mut layout = [[-1; GRID]; GRID];
    layout[0][0] = 9;
    layout[0][1] = 10;

    let img = render_layout(&tiles, &layout);

    assert_eq!(img.pixel(0, 0), 3);
    assert_eq!(img.pixel(8, 0), 0);
    assert_eq!(img.pixel(47, 47), 0);
}
