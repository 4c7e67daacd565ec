//! Assets for the mob portrait variant explorer: framework and variant PNGs, the JavaScript
//! tables the page draws from and the standalone HTML page itself.

use crate::bitmap::{IndexedImage, RgbImage};
use crate::metatile::PORTRAIT_SIZE;
use crate::mob::{self, MOUTH_ROWS};
use crate::rom::Rom;
use crate::tile::{PORTRAIT, TILE_SIZE, Tile};
use anyhow::{Context, Result};
use sgs_common::error::DecodeResult;
use sgs_common::memmap::{MOB_EYES, MOB_HEAD_TILES, MOB_HEADS, MOB_MOUTHS, MOB_NOSES, Table};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const DEFAULT_ASSET_DIR: &str = "explorer/assets";

pub const DEFAULT_HTML_PATH: &str = "mob-kao-explorer.html";

pub const DEFAULT_SCALE: usize = 3;

pub const TILE_DATA_START: &str = "// === TILE DATA START ===";
pub const TILE_DATA_END: &str = "// === TILE DATA END ===";

pub const EMBEDDED_START: &str = "// === EMBEDDED DATA START ===";
pub const EMBEDDED_END: &str = "// === EMBEDDED DATA END ===";

/// Page written when the target HTML doesn't exist yet
const HTML_TEMPLATE: &str = include_str!("explorer.html");

const FRAMEWORK_BACKGROUND: [u8; 3] = [64, 64, 64];

/// Head framework `index`: file offset of tile 0 and tile count
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeadGroup {
    pub index: usize,
    pub base: usize,
    pub tile_count: usize,
}

impl HeadGroup {
    pub fn new(index: usize) -> HeadGroup {
        HeadGroup {
            index,
            base: MOB_HEADS.offset(index),
            tile_count: MOB_HEAD_TILES,
        }
    }
}

pub fn groups() -> impl Iterator<Item = HeadGroup> {
    (0..MOB_HEADS.count).map(HeadGroup::new)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariantKind {
    Eyes,
    Noses,
    Mouths,
}

impl VariantKind {
    pub const ALL: [VariantKind; 3] = [VariantKind::Eyes, VariantKind::Noses, VariantKind::Mouths];

    pub fn name(self) -> &'static str {
        match self {
            VariantKind::Eyes => "eyes",
            VariantKind::Noses => "noses",
            VariantKind::Mouths => "mouths",
        }
    }

    pub fn table(self) -> Table {
        match self {
            VariantKind::Eyes => MOB_EYES,
            VariantKind::Noses => MOB_NOSES,
            VariantKind::Mouths => MOB_MOUTHS,
        }
    }

    /// Strip size in tiles
    pub fn tile_dims(self) -> (usize, usize) {
        match self {
            VariantKind::Mouths => (3, 2),
            _ => (3, 1),
        }
    }
}

fn tile_image(tile: &Tile) -> RgbImage {
    let mut img = IndexedImage::new(TILE_SIZE, TILE_SIZE);

    img.blit_tile(0, 0, tile);

    img.to_rgb(&PORTRAIT)
}

fn head_tiles(rom: &Rom, group: &HeadGroup) -> Vec<Tile> {
    rom.tiles(group.base, group.tile_count)
        .map(Tile::decode)
        .collect()
}

/// Head `index` drawn through its template. Variant slots and cells pointing outside the head's
/// tiles are left grey.
pub fn render_framework(rom: &Rom, index: usize) -> DecodeResult<RgbImage> {
    let template = mob::read_template(rom, index)?;

    let tiles = head_tiles(rom, &HeadGroup::new(index));

    let mut img = RgbImage::new(PORTRAIT_SIZE, PORTRAIT_SIZE, FRAMEWORK_BACKGROUND);

    for (r, row) in template.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let tile = cell
                .and_then(|t| usize::try_from(t).ok())
                .and_then(|t| tiles.get(t));

            if let Some(tile) = tile {
                img.paste(c * TILE_SIZE, r * TILE_SIZE, &tile_image(tile));
            }
        }
    }

    Ok(img)
}

/// Variant `index` of `kind` as a strip: eyes and noses 24x8, mouths 24x16
pub fn render_variant(rom: &Rom, kind: VariantKind, index: usize) -> DecodeResult<RgbImage> {
    let tiles: Vec<Tile> = mob::component_tile_bytes(rom, kind.name(), kind.table(), index)?
        .into_iter()
        .map(Tile::decode)
        .collect();

    let (w, h) = kind.tile_dims();
    let mut img = RgbImage::new(w * TILE_SIZE, h * TILE_SIZE, [0, 0, 0]);

    match kind {
        VariantKind::Mouths => {
            for (row, line) in MOUTH_ROWS.iter().enumerate() {
                for (col, &t) in line.iter().enumerate() {
                    if let Some(tile) = tiles.get(t) {
                        img.paste(col * TILE_SIZE, row * TILE_SIZE, &tile_image(tile));
                    }
                }
            }
        }
        _ => {
            for (col, tile) in tiles.iter().enumerate() {
                img.paste(col * TILE_SIZE, 0, &tile_image(tile));
            }
        }
    }

    Ok(img)
}

/// Template as a JS array literal, `null` for variant slots
fn grid_js(template: &mob::Template) -> String {
    let rows: Vec<String> = template
        .iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .map(|c| c.map_or_else(|| "null".to_string(), |t| t.to_string()))
                .collect();

            format!("[{}]", cells.join(", "))
        })
        .collect();

    format!("[{}]", rows.join(", "))
}

/// `data.js`: one `HEADS` entry per head framework plus the variant counts
pub fn data_js(rom: &Rom) -> Result<String> {
    let mut s = String::new();

    writeln!(s, "// Auto-generated data for variant explorer")?;
    writeln!(s)?;
    writeln!(s, "const HEADS = [")?;

    for g in groups() {
        let template = mob::read_template(rom, g.index)?;

        writeln!(
            s,
            "  {{ idx: {}, template: {}, baseAddr: \"0x{:x}\", tileCount: {}, grid: {} }},",
            g.index,
            g.index,
            g.base,
            g.tile_count,
            grid_js(&template)
        )?;
    }

    writeln!(s, "];")?;
    writeln!(s)?;
    writeln!(s, "{}", variant_counts_js())?;

    Ok(s)
}

fn variant_counts_js() -> String {
    format!(
        "const VARIANT_COUNTS = {{ eyes: {}, noses: {}, mouths: {} }};",
        MOB_EYES.count, MOB_NOSES.count, MOB_MOUTHS.count
    )
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn tile_list(tiles: impl Iterator<Item = impl AsRef<[u8]>>) -> Result<String> {
    let hex: Vec<String> = tiles.map(|t| hex_string(t.as_ref())).collect();

    Ok(serde_json::to_string(&hex)?)
}

/// Raw tile tables for the page, framed by `TILE_DATA_START`/`TILE_DATA_END`
pub fn tile_data_js(rom: &Rom) -> Result<String> {
    let mut s = String::new();

    writeln!(s, "{}", TILE_DATA_START)?;
    writeln!(s, "// Raw NES tile data (16 bytes = 32 hex chars per tile)")?;
    writeln!(s)?;

    writeln!(s, "const PALETTE = [")?;
    for c in PORTRAIT.0 {
        writeln!(s, "  [{}, {}, {}],", c[0], c[1], c[2])?;
    }
    writeln!(s, "];")?;
    writeln!(s)?;

    writeln!(s, "const HEAD_TILES = [")?;
    for i in 0..MOB_HEADS.count {
        writeln!(s, "  // H{:02}", i)?;
        writeln!(
            s,
            "  {},",
            tile_list(rom.tiles(MOB_HEADS.offset(i), MOB_HEAD_TILES))?
        )?;
    }
    writeln!(s, "];")?;
    writeln!(s)?;

    writeln!(s, "const TEMPLATES = [")?;
    for i in 0..MOB_HEADS.count {
        let t = mob::read_template(rom, i)?;

        writeln!(s, "  {},  // T{:02}", serde_json::to_string(&t)?, i)?;
    }
    writeln!(s, "];")?;
    writeln!(s)?;

    for (kind, name, tag) in [
        (VariantKind::Eyes, "EYE_TILES", 'E'),
        (VariantKind::Noses, "NOSE_TILES", 'N'),
        (VariantKind::Mouths, "MOUTH_TILES", 'M'),
    ] {
        let table = kind.table();

        writeln!(s, "const {} = [", name)?;
        for i in 0..table.count {
            let tiles = mob::component_tile_bytes(rom, kind.name(), table, i)?;

            writeln!(s, "  {},  // {}{:02}", tile_list(tiles.into_iter())?, tag, i)?;
        }
        writeln!(s, "];")?;
        writeln!(s)?;
    }

    writeln!(s, "{}", variant_counts_js())?;
    writeln!(s, "{}", TILE_DATA_END)?;

    Ok(s)
}

/// Replace everything between the embedded data markers of `html` with `data`
pub fn embed_data(html: &str, data: &str) -> Result<String> {
    let start = html
        .find(EMBEDDED_START)
        .ok_or_else(|| anyhow!("Missing `{}` marker", EMBEDDED_START))?;

    let body = start + EMBEDDED_START.len();

    let end = html[body..]
        .find(EMBEDDED_END)
        .map(|e| body + e)
        .ok_or_else(|| anyhow!("Missing `{}` marker", EMBEDDED_END))?;

    let mut out = String::with_capacity(html.len() + data.len());

    out.push_str(&html[..body]);
    out.push('\n');
    out.push_str(data);
    out.push_str(&html[end..]);

    Ok(out)
}

/// Write the standalone explorer page. An existing page only gets its data section refreshed.
pub fn write_html<P: AsRef<Path>>(rom: &Rom, path: P) -> Result<()> {
    let path = path.as_ref();

    let html = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Can't read `{}`", path.display()))?
    } else {
        info!("`{}` doesn't exist, starting from the built-in page", path.display());
        HTML_TEMPLATE.to_string()
    };

    let html = embed_data(&html, &tile_data_js(rom)?)
        .with_context(|| format!("Can't update `{}`", path.display()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, html).with_context(|| format!("Can't write `{}`", path.display()))?;

    info!("Wrote `{}`", path.display());

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub tiles: usize,
    pub frameworks: usize,
    pub variants: usize,
}

/// Dump per-group tiles, frameworks, variant strips, `data.js` and `tile_data.js` to `out_dir`
pub fn export_assets<P: AsRef<Path>>(rom: &Rom, out_dir: P, scale: usize) -> Result<AssetStats> {
    let out_dir = out_dir.as_ref();
    let scale = scale.max(1);

    let mut stats = AssetStats::default();

    for g in groups() {
        let group_dir = out_dir.join(format!("group_{:02}", g.index));

        fs::create_dir_all(&group_dir)?;

        for (i, tile) in head_tiles(rom, &g).iter().enumerate() {
            tile_image(tile)
                .scale(scale)
                .write_png(group_dir.join(format!("tile_{:02}.png", i)))?;

            stats.tiles += 1;
        }

        render_framework(rom, g.index)?
            .scale(scale)
            .write_png(out_dir.join(format!("framework_{:02}.png", g.index)))?;

        stats.frameworks += 1;
    }

    for kind in VariantKind::ALL {
        let dir = out_dir.join("variants").join(kind.name());

        fs::create_dir_all(&dir)?;

        for i in 0..kind.table().count {
            render_variant(rom, kind, i)?
                .scale(scale)
                .write_png(dir.join(format!("{}_{:02}.png", kind.name(), i)))?;

            stats.variants += 1;
        }
    }

    fs::write(out_dir.join("data.js"), data_js(rom)?)?;
    fs::write(out_dir.join("tile_data.js"), tile_data_js(rom)?)?;

    info!(
        "Wrote {} tiles, {} frameworks and {} variants to `{}`",
        stats.tiles,
        stats.frameworks,
        stats.variants,
        out_dir.display()
    );

    Ok(stats)
}

#[test]
fn test_groups() {
    let g: Vec<_> = groups().collect();

    assert_eq!(g.len(), 20);
    assert_eq!(g[0].base, 0x1c014);
    assert_eq!(g[19].base, 0x1dc94);
    assert!(g.iter().all(|g| g.tile_count == 24));
}

#[test]
fn test_render_framework() {
    let rom = mob::test_rom();

    let img = render_framework(&rom, 6).unwrap();

    assert_eq!((img.width(), img.height()), (48, 48));
    // Head 6 tiles are all index 1
    assert_eq!(img.pixel(0, 0), PORTRAIT.color(1));
    // Variant slot
    assert_eq!(img.pixel(8, 16), FRAMEWORK_BACKGROUND);

    // Template 0 is all variant slots in the blank image
    let img = render_framework(&rom, 0).unwrap();
    assert_eq!(img.pixel(0, 0), FRAMEWORK_BACKGROUND);

    assert!(render_framework(&rom, 20).is_err());
}

#[test]
fn test_render_variant() {
    let rom = mob::test_rom();

    let eyes = render_variant(&rom, VariantKind::Eyes, 7).unwrap();

    assert_eq!((eyes.width(), eyes.height()), (24, 8));
    assert_eq!(eyes.pixel(23, 7), PORTRAIT.color(2));

    // Mouth 8 only has tile 4, placed at column 2 row 0
    let mouth = render_variant(&rom, VariantKind::Mouths, 8).unwrap();

    assert_eq!((mouth.width(), mouth.height()), (24, 16));
    assert_eq!(mouth.pixel(16, 0), PORTRAIT.color(3));
    assert_eq!(mouth.pixel(16, 8), PORTRAIT.color(0));
    assert_eq!(mouth.pixel(0, 0), PORTRAIT.color(0));

    assert!(render_variant(&rom, VariantKind::Noses, 20).is_err());
}

#[test]
fn test_tile_data_js() {
    let rom = mob::test_rom();

    let js = tile_data_js(&rom).unwrap();

    assert!(js.starts_with(TILE_DATA_START));
    assert!(js.trim_end().ends_with(TILE_DATA_END));
    assert!(js.contains("  [247, 216, 165],"));

    // Head 6 tile 0 is index 1: plane 0 set
    let tile = format!("\"{}{}\"", "ff".repeat(8), "00".repeat(8));
    let h06 = js.lines().skip_while(|l| *l != "  // H06").nth(1).unwrap();

    assert!(h06.starts_with(&format!("  [{},", tile)));
    assert_eq!(h06.matches('"').count(), 24 * 2);

    assert!(js.contains("[[0,1,4,5,8,9],[2,3,6,7,10,11],[12,null,null,null,14,15]"));
    assert!(js.contains("const VARIANT_COUNTS = { eyes: 20, noses: 20, mouths: 20 };"));
}

#[test]
fn test_data_js() {
    let rom = mob::test_rom();

    let js = data_js(&rom).unwrap();

    assert!(js.starts_with("// Auto-generated data for variant explorer\n\nconst HEADS = [\n"));

    let heads: Vec<_> = js.lines().filter(|l| l.starts_with("  { idx: ")).collect();

    assert_eq!(heads.len(), 20);
    assert!(heads.iter().all(|l| l.contains(", tileCount: 24, ")));

    assert!(heads[0].starts_with(r#"  { idx: 0, template: 0, baseAddr: "0x1c014", tileCount: 24, "#));
    assert!(heads[0].contains("grid: [[null, null, null, null, null, null], "));
    assert!(heads[6].contains(r#"baseAddr: "0x1c914""#));
    assert!(heads[6].contains(
        "grid: [[0, 1, 4, 5, 8, 9], [2, 3, 6, 7, 10, 11], [12, null, null, null, 14, 15], "
    ));

    assert!(js.contains("const VARIANT_COUNTS = { eyes: 20, noses: 20, mouths: 20 };"));
}

#[test]
fn test_framework_matches_portrait() {
    use sgs_common::memmap::{MOB_COMPONENTS, MOB_TEMPLATES, TILE_LEN};

    let mut data = crate::rom::blank_image();

    for i in 0..MOB_HEAD_TILES {
        mob::fill_tile(&mut data, MOB_HEADS.offset(5) + i * TILE_LEN, 1 + (i % 3) as u8);
    }

    // Every framework cell uses a head tile, the first row the last ones
    let off = MOB_TEMPLATES.offset(5);
    for r in 0..6 {
        for c in 0..6 {
            let variant = (2..6).contains(&r) && (1..4).contains(&c);

            data[off + r * 6 + c] = if variant { 0 } else { 0x64 + ((r * 6 + c + 22) % 24) as u8 };
        }
    }

    // P081: cat 1, head 0
    let rec_off = MOB_COMPONENTS.offset(0);
    data[rec_off..rec_off + 5].copy_from_slice(&[1, 0, 0, 0, 0]);

    let rom = Rom::from_bytes(data).unwrap();

    let rec = &mob::read_components(&rom)[0];
    assert_eq!(rec.global(rec.head), 5);

    let portrait = mob::render(&rom, rec).unwrap();
    let framework = render_framework(&rom, 5).unwrap();
    let template = mob::read_template(&rom, 5).unwrap();

    assert_eq!(template[0][0], Some(22));
    assert_eq!(template[0][1], Some(23));

    for (r, row) in template.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if cell.is_none() {
                continue;
            }

            for (x, y) in [(0, 0), (7, 7)] {
                let (px, py) = (c * TILE_SIZE + x, r * TILE_SIZE + y);

                assert_eq!(framework.pixel(px, py), portrait.pixel(px, py));
            }
        }
    }

    // Tile 22 is index 2, tile 23 index 3
    assert_eq!(framework.pixel(0, 0), PORTRAIT.color(2));
    assert_eq!(framework.pixel(8, 0), PORTRAIT.color(3));
}

#[test]
fn test_export_creates_dirs() {
    let rom = mob::test_rom();
    let tmp = tempfile::tempdir().unwrap();

    let assets = tmp.path().join("explorer").join("assets");

    let stats = export_assets(&rom, &assets, 1).unwrap();

    assert_eq!(
        stats,
        AssetStats {
            tiles: 20 * 24,
            frameworks: 20,
            variants: 60,
        }
    );

    assert!(assets.join("group_05").join("tile_23.png").exists());
    assert!(assets.join("framework_19.png").exists());
    assert!(assets.join("variants").join("mouths").join("mouths_19.png").exists());
    assert!(assets.join("data.js").exists());
    assert!(assets.join("tile_data.js").exists());

    let html = tmp.path().join("pages").join(DEFAULT_HTML_PATH);

    write_html(&rom, &html).unwrap();

    let page = fs::read_to_string(&html).unwrap();

    assert!(page.contains(EMBEDDED_START));
    assert!(page.contains("const HEAD_TILES = ["));
}

#[test]
fn test_embed_data() {
    let html = format!("<script>\n{}\nold\n{}\n</script>", EMBEDDED_START, EMBEDDED_END);

    let out = embed_data(&html, "const X = 1;\n").unwrap();

    assert_eq!(
        out,
        format!(
            "<script>\n{}\nconst X = 1;\n{}\n</script>",
            EMBEDDED_START, EMBEDDED_END
        )
    );

    // Idempotent
    assert_eq!(embed_data(&out, "const X = 1;\n").unwrap(), out);

    assert!(embed_data("<html></html>", "x").is_err());
    assert!(embed_data(EMBEDDED_START, "x").is_err());

    // The built-in page carries both markers
    assert!(embed_data(HTML_TEMPLATE, "x").is_ok());
}
