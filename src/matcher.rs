//! Identify the tiles and components of an in-game portrait screenshot

use crate::bitmap::RgbImage;
use crate::explorer::{self, VariantKind};
use crate::generator::{EYE_BASE, FACE_BASE, GROUP_TILES, Group, MOUTH_BASE, load_group_tiles};
use crate::metatile::{self, Grid, GridDisplay, PORTRAIT_SIZE};
use crate::rom::Rom;
use crate::tile::{PORTRAIT, TILE_SIZE, Tile};
use anyhow::Result;
use sgs_common::memmap::MOB_HEADS;
use std::fmt;
use std::path::Path;

/// Stop searching once a tile scores at least this much
pub const PERFECT_SCORE: f64 = 0.999;

/// Tiles scoring below this are reported
pub const LOW_SCORE: f64 = 0.95;

/// Load a screenshot and bring it down to 48x48
pub fn load_screenshot<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let img = RgbImage::read_png(path)?;

    Ok(normalize(img))
}

pub fn normalize(img: RgbImage) -> RgbImage {
    if img.width() != img.height() {
        warn!("Screenshot isn't square ({}x{})", img.width(), img.height());
    }

    if img.width() == PORTRAIT_SIZE && img.height() == PORTRAIT_SIZE {
        img
    } else {
        debug!(
            "Resizing screenshot from {}x{} to {}x{}",
            img.width(),
            img.height(),
            PORTRAIT_SIZE,
            PORTRAIT_SIZE
        );

        img.resize_nearest(PORTRAIT_SIZE, PORTRAIT_SIZE)
    }
}

/// Snap every pixel to the closest portrait palette color
pub fn quantize(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();

    for y in 0..img.height() {
        for x in 0..img.width() {
            let c = PORTRAIT.color(PORTRAIT.nearest(img.pixel(x, y)));

            out.set_pixel(x, y, c);
        }
    }

    out
}

fn abs_diff(a: [u8; 3], b: [u8; 3]) -> u64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum()
}

/// Similarity between the 8x8 block of `shot` at (`x`, `y`) and `tile`, 1.0 for identical
/// colors
pub fn tile_similarity(shot: &RgbImage, x: usize, y: usize, tile: &Tile) -> f64 {
    let mut diff = 0;

    for ty in 0..TILE_SIZE {
        for tx in 0..TILE_SIZE {
            let rom = PORTRAIT.color(tile.pixel(tx, ty));

            diff += abs_diff(shot.pixel(x + tx, y + ty), rom);
        }
    }

    let max = (TILE_SIZE * TILE_SIZE * 3 * 255) as f64;

    1.0 - diff as f64 / max
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileMatch {
    /// Best ROM tile, `None` if there was nothing to compare with
    pub tile: Option<usize>,
    pub score: f64,
}

impl Default for TileMatch {
    fn default() -> TileMatch {
        TileMatch {
            tile: None,
            score: 0.0,
        }
    }
}

/// Best scoring tile, the first one wins ties
pub fn best_tile(shot: &RgbImage, x: usize, y: usize, tiles: &[Tile]) -> TileMatch {
    let mut best = TileMatch::default();

    for (i, t) in tiles.iter().enumerate() {
        let score = tile_similarity(shot, x, y, t);

        if score > best.score {
            best = TileMatch {
                tile: Some(i),
                score,
            };
        }

        if score >= PERFECT_SCORE {
            break;
        }
    }

    best
}

pub struct LayoutMatch {
    pub group: Group,
    pub tiles_loaded: usize,
    pub cells: Grid<TileMatch>,
}

/// Eye, face and mouth variant numbers inferred from a layout
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariantGuess {
    pub eye: Option<i64>,
    pub face: Option<i64>,
    pub mouth: Option<i64>,
}

impl LayoutMatch {
    pub fn layout(&self) -> Grid<Option<usize>> {
        metatile::grid_from_fn(|r, c| self.cells[r][c].tile)
    }

    /// `(row, col, match)` of every cell scoring below `LOW_SCORE`
    pub fn low_scores(&self) -> Vec<(usize, usize, TileMatch)> {
        let mut low = Vec::new();

        for (r, row) in self.cells.iter().enumerate() {
            for (c, m) in row.iter().enumerate() {
                if m.score < LOW_SCORE {
                    low.push((r, c, *m));
                }
            }
        }

        low
    }

    pub fn variants(&self) -> VariantGuess {
        let offset = i64::from(self.group.offset());

        let guess = |row: usize, base: i32, stride: i64| {
            let base = i64::from(base) + offset;
            let t = self.cells[row][1].tile? as i64;

            (t >= base).then(|| (t - base) / stride)
        };

        VariantGuess {
            eye: guess(2, EYE_BASE, 3),
            face: guess(3, FACE_BASE, 3),
            mouth: guess(4, MOUTH_BASE, 6),
        }
    }
}

fn opt_index(v: Option<i64>) -> String {
    v.map_or_else(|| "?".to_string(), |v| v.to_string())
}

impl fmt::Display for LayoutMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let low = self.low_scores();

        if low.is_empty() {
            writeln!(f, "All tiles match above {:.0}%", LOW_SCORE * 100.)?;
        } else {
            writeln!(f, "Low confidence tiles:")?;

            for (r, c, m) in low {
                let tile = m.tile.map_or_else(|| "-".to_string(), |t| t.to_string());

                writeln!(f, "  [{}][{}] = {}, {:.1}%", r, c, tile, m.score * 100.)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Layout (group {}, base 0x{:X}, {} tiles loaded):",
            self.group,
            self.group.base(),
            self.tiles_loaded
        )?;
        write!(f, "{}", GridDisplay(&self.layout()))?;

        let v = self.variants();

        writeln!(f)?;
        writeln!(
            f,
            "eye_idx={}, face_idx={}, mouth_idx={}",
            opt_index(v.eye),
            opt_index(v.face),
            opt_index(v.mouth)
        )
    }
}

/// Find the best ROM tile of `group` for every cell of a 48x48 screenshot
pub fn match_layout(rom: &Rom, group: Group, shot: &RgbImage) -> LayoutMatch {
    let tiles = load_group_tiles(rom, group, GROUP_TILES);
    let shot = quantize(shot);

    debug!("Matching against {} tiles of group {}", tiles.len(), group);

    let cells = metatile::grid_from_fn(|r, c| {
        best_tile(&shot, c * TILE_SIZE, r * TILE_SIZE, &tiles)
    });

    LayoutMatch {
        group,
        tiles_loaded: tiles.len(),
        cells,
    }
}

/// `1 - Σ|Δ| / (n * 255)` over the overlapping area of `a` and `b`, `n` counting channels
pub fn region_similarity(a: &RgbImage, b: &RgbImage) -> f64 {
    let w = a.width().min(b.width());
    let h = a.height().min(b.height());

    if w == 0 || h == 0 {
        return 0.0;
    }

    let mut diff = 0;

    for y in 0..h {
        for x in 0..w {
            diff += abs_diff(a.pixel(x, y), b.pixel(x, y));
        }
    }

    1.0 - diff as f64 / (w * h * 3 * 255) as f64
}

/// Candidates ordered by score
#[derive(Clone, Debug, PartialEq)]
pub struct Ranking {
    pub best: Option<usize>,
    pub score: f64,
    pub top: Vec<(usize, f64)>,
}

pub fn rank<I>(target: &RgbImage, candidates: I) -> Ranking
where
    I: IntoIterator<Item = (usize, RgbImage)>,
{
    let mut scores: Vec<(usize, f64)> = candidates
        .into_iter()
        .map(|(i, img)| (i, region_similarity(target, &img)))
        .collect();

    let mut best = None;
    let mut best_score = 0.0;

    for &(i, s) in &scores {
        if s > best_score {
            best = Some(i);
            best_score = s;
        }
    }

    // Stable, equal scores keep their order
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.truncate(3);

    Ranking {
        best,
        score: best_score,
        top: scores,
    }
}

pub struct ComponentMatch {
    pub name: String,
    pub framework: Ranking,
    pub eyes: Ranking,
    pub noses: Ranking,
    pub mouths: Ranking,
}

fn rank_variants(rom: &Rom, target: &RgbImage, kind: VariantKind) -> Ranking {
    let candidates = (0..kind.table().count)
        .filter_map(|i| explorer::render_variant(rom, kind, i).ok().map(|img| (i, img)));

    rank(target, candidates)
}

/// Compare a 48x48 screenshot with every head framework and variant
pub fn match_components(rom: &Rom, name: &str, shot: &RgbImage) -> ComponentMatch {
    let top = shot.region(0, 0, PORTRAIT_SIZE, 2 * TILE_SIZE);

    let frameworks = (0..MOB_HEADS.count).filter_map(|i| {
        explorer::render_framework(rom, i)
            .ok()
            .map(|img| (i, img.region(0, 0, PORTRAIT_SIZE, 2 * TILE_SIZE)))
    });

    let face_x = TILE_SIZE;
    let face_w = 3 * TILE_SIZE;

    let eyes = shot.region(face_x, 2 * TILE_SIZE, face_w, TILE_SIZE);
    let noses = shot.region(face_x, 3 * TILE_SIZE, face_w, TILE_SIZE);
    let mouths = shot.region(face_x, 4 * TILE_SIZE, face_w, 2 * TILE_SIZE);

    ComponentMatch {
        name: name.to_string(),
        framework: rank(&top, frameworks),
        eyes: rank_variants(rom, &eyes, VariantKind::Eyes),
        noses: rank_variants(rom, &noses, VariantKind::Noses),
        mouths: rank_variants(rom, &mouths, VariantKind::Mouths),
    }
}

fn write_ranking(f: &mut fmt::Formatter<'_>, what: &str, tag: &str, r: &Ranking) -> fmt::Result {
    match r.best {
        Some(b) => writeln!(f, "{}: {}{:02} ({:.3})", what, tag, b, r.score)?,
        None => writeln!(f, "{}: no match", what)?,
    }

    write!(f, "  top 3:")?;

    for (i, s) in &r.top {
        write!(f, " {}{:02} {:.3}", tag, i, s)?;
    }

    writeln!(f)
}

impl fmt::Display for ComponentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;

        write_ranking(f, "Framework", "G", &self.framework)?;
        write_ranking(f, "Eyes", "#", &self.eyes)?;
        write_ranking(f, "Nose", "#", &self.noses)?;
        write_ranking(f, "Mouth", "#", &self.mouths)
    }
}

fn js_index(v: Option<usize>) -> String {
    v.map_or_else(|| "null".to_string(), |v| v.to_string())
}

/// `KNOWN_COMBINATIONS` array ready to paste in the explorer page
pub fn known_combinations_js(matches: &[ComponentMatch]) -> Result<String> {
    use std::fmt::Write as _;

    let mut s = String::new();

    writeln!(s, "const KNOWN_COMBINATIONS = [")?;

    for m in matches {
        writeln!(
            s,
            "    {{ name: {}, group: {}, eyes: {}, noses: {}, mouths: {} }},",
            serde_json::to_string(&m.name)?,
            js_index(m.framework.best),
            js_index(m.eyes.best),
            js_index(m.noses.best),
            js_index(m.mouths.best)
        )?;
    }

    writeln!(s, "];")?;

    Ok(s)
}

/// Render what the game would show for head/variant globals, used to check matches
#[cfg(test)]
fn fake_screenshot(rom: &Rom, head: usize, eye: usize, nose: usize, mouth: usize) -> RgbImage {
    crate::mob::MobParts::load(rom, head, eye, nose, mouth)
        .unwrap()
        .compose()
        .to_rgb(&PORTRAIT)
}

#[test]
fn test_normalize() {
    let img = RgbImage::new(96, 96, [1, 2, 3]);
    let n = normalize(img);

    assert_eq!((n.width(), n.height()), (48, 48));
    assert_eq!(n.pixel(47, 47), [1, 2, 3]);

    let img = RgbImage::new(48, 48, [0, 0, 0]);
    assert_eq!(normalize(img.clone()), img);
}

#[test]
fn test_tile_similarity() {
    let mut data = [0u8; 16];
    data[..8].fill(0xff);
    let tile = Tile::decode(&data);

    let shot = RgbImage::new(8, 8, PORTRAIT.color(1));
    assert_eq!(tile_similarity(&shot, 0, 0, &tile), 1.0);

    // Slightly off colors quantize back onto the palette
    let shot = quantize(&RgbImage::new(8, 8, [240, 210, 160]));
    assert_eq!(tile_similarity(&shot, 0, 0, &tile), 1.0);

    let shot = RgbImage::new(8, 8, [255, 255, 255]);
    let s = tile_similarity(&shot, 0, 0, &Tile::BLANK);
    assert_eq!(s, 0.0);
}

#[test]
fn test_best_tile() {
    let mut data = [0u8; 16];
    data[8..].fill(0xff);
    let two = Tile::decode(&data);

    let shot = RgbImage::new(8, 8, PORTRAIT.color(2));

    let tiles = [Tile::BLANK, two, two];
    let m = best_tile(&shot, 0, 0, &tiles);

    assert_eq!(m.tile, Some(1));
    assert_eq!(m.score, 1.0);

    assert_eq!(best_tile(&shot, 0, 0, &[]).tile, None);
}

#[test]
fn test_match_layout() {
    let mut data = crate::rom::blank_image();
    let base = Group::A.base();

    // Tile 5 of group A is solid index 3, tile 130 solid index 2
    data[base + 5 * 16..base + 6 * 16].fill(0xff);
    data[base + 130 * 16 + 8..base + 131 * 16].fill(0xff);

    let rom = Rom::from_bytes(data).unwrap();

    let mut shot = RgbImage::new(48, 48, [0, 0, 0]);
    shot.paste(0, 0, &RgbImage::new(8, 8, [250, 250, 250]));
    shot.paste(8, 16, &RgbImage::new(8, 8, PORTRAIT.color(2)));

    let m = match_layout(&rom, Group::A, &shot);

    assert_eq!(m.tiles_loaded, 800);
    assert_eq!(m.cells[0][0].tile, Some(5));
    assert_eq!(m.cells[2][1].tile, Some(130));
    // Black cells match the first blank tile
    assert_eq!(m.cells[0][1].tile, Some(0));
    assert!(m.low_scores().is_empty());

    let v = m.variants();

    assert_eq!(v.eye, Some(3));
    assert_eq!(v.face, None);
    assert_eq!(v.mouth, None);

    let report = m.to_string();

    assert!(report.contains("  row 2:    0  130    0    0    0    0"));
    assert!(report.contains("eye_idx=3, face_idx=?, mouth_idx=?"));
}

#[test]
fn test_rank() {
    let target = RgbImage::new(4, 4, [10, 10, 10]);

    let r = rank(
        &target,
        vec![
            (0, RgbImage::new(4, 4, [0, 0, 0])),
            (1, RgbImage::new(4, 4, [10, 10, 10])),
            (2, RgbImage::new(4, 4, [20, 20, 20])),
            (3, RgbImage::new(4, 4, [255, 255, 255])),
        ],
    );

    assert_eq!(r.best, Some(1));
    assert_eq!(r.score, 1.0);
    assert_eq!(r.top.len(), 3);
    assert_eq!(r.top[0].0, 1);
    // 0 and 2 tie, 0 comes first
    assert_eq!(r.top[1].0, 0);
    assert_eq!(r.top[2].0, 2);

    // Different sizes compare the overlap
    let big = RgbImage::new(8, 8, [10, 10, 10]);
    assert_eq!(region_similarity(&target, &big), 1.0);
}

#[test]
fn test_match_components() {
    let rom = crate::mob::test_rom();

    let shot = fake_screenshot(&rom, 6, 7, 7, 8);
    let m = match_components(&rom, "周泰", &shot);

    assert_eq!(m.framework.best, Some(6));
    assert_eq!(m.eyes.best, Some(7));
    assert_eq!(m.noses.best, Some(7));
    assert_eq!(m.mouths.best, Some(8));
    assert_eq!(m.eyes.score, 1.0);

    let js = known_combinations_js(&[m]).unwrap();

    assert_eq!(
        js,
        "const KNOWN_COMBINATIONS = [\n    { name: \"周泰\", group: 6, eyes: 7, noses: 7, mouths: 8 },\n];\n"
    );
}
