//! Generic portraits P081-P254, assembled from a head framework plus eye, nose and mouth
//! variants

use crate::bitmap::{Atlas, IndexedImage, RgbImage};
use crate::character::CharacterRow;
use crate::metatile::{self, GRID, Grid, PORTRAIT_SIZE};
use crate::names::NameEntry;
use crate::rom::Rom;
use crate::tile::{PORTRAIT, Tile};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sgs_common::error::{DecodeError, DecodeResult};
use sgs_common::memmap::{
    CHARACTERS, MOB_COMPONENTS, MOB_EYES, MOB_FIRST_PORTRAIT, MOB_HEAD_TILES, MOB_HEADS,
    MOB_MOUTHS, MOB_NOSES, MOB_TEMPLATES, TILE_LEN, Table,
};
use sgs_common::records;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Each category holds 5 of every component
pub const CATEGORY_SIZE: usize = 5;

pub const COMPONENT_FIELDS: [&str; 5] = ["cat", "head", "eye", "nose", "mouth"];

/// Mouth tiles drawn in template rows 4 and 5, columns 1 to 3
pub const MOUTH_ROWS: [[usize; 3]; 2] = [[0, 1, 4], [2, 3, 5]];

/// Template byte of the first head tile
const TEMPLATE_TILE_BASE: i16 = 0x64;

const_assert_eq!(MOB_HEADS.stride, MOB_HEAD_TILES * TILE_LEN);

/// Component indices of one generic portrait
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ComponentRecord {
    pub portrait_index: usize,
    pub rom_offset: String,
    pub cat: u8,
    pub head: u8,
    pub eye: u8,
    pub nose: u8,
    pub mouth: u8,
}

impl ComponentRecord {
    pub fn decode(index: usize, offset: usize, bytes: &[u8]) -> ComponentRecord {
        ComponentRecord {
            portrait_index: MOB_FIRST_PORTRAIT + index,
            rom_offset: format!("0x{:05X}", offset),
            cat: bytes[0],
            head: bytes[1],
            eye: bytes[2],
            nose: bytes[3],
            mouth: bytes[4],
        }
    }

    /// Field by position, in `COMPONENT_FIELDS` order
    pub fn field(&self, i: usize) -> u8 {
        [self.cat, self.head, self.eye, self.nose, self.mouth][i]
    }

    /// Index into the 20 entry tables of a component local to our category
    pub fn global(&self, local: u8) -> usize {
        usize::from(self.cat) * CATEGORY_SIZE + usize::from(local)
    }
}

/// File offset of the component record of `portrait`
pub fn component_offset(portrait: usize) -> Option<usize> {
    portrait
        .checked_sub(MOB_FIRST_PORTRAIT)
        .filter(|&i| i < MOB_COMPONENTS.count)
        .map(|i| MOB_COMPONENTS.offset(i))
}

pub fn read_components(rom: &Rom) -> Vec<ComponentRecord> {
    records::get(rom.as_bytes(), MOB_COMPONENTS)
        .map(|r| ComponentRecord::decode(r.index, r.offset, r.bytes))
        .collect()
}

/// Template cell: `None` is a variant slot, otherwise a head tile index. Bytes below the tile
/// base come out negative.
pub type Template = Grid<Option<i16>>;

pub fn read_template(rom: &Rom, index: usize) -> DecodeResult<Template> {
    check_index("template", MOB_TEMPLATES, index)?;

    let bytes = rom.slice(MOB_TEMPLATES.offset(index), MOB_TEMPLATES.stride)?;

    Ok(metatile::grid_from_fn(|r, c| match bytes[r * GRID + c] {
        0 => None,
        v => Some(i16::from(v) - TEMPLATE_TILE_BASE),
    }))
}

fn check_index(kind: &'static str, table: Table, index: usize) -> DecodeResult<()> {
    if index >= table.count {
        Err(DecodeError::ComponentOutOfRange { kind, index })
    } else {
        Ok(())
    }
}

/// Raw 16 byte tiles of entry `index` of a component table
pub fn component_tile_bytes<'a>(
    rom: &'a Rom,
    kind: &'static str,
    table: Table,
    index: usize,
) -> DecodeResult<Vec<&'a [u8]>> {
    check_index(kind, table, index)?;

    Ok(rom
        .tiles(table.offset(index), table.stride / TILE_LEN)
        .collect())
}

fn component_tiles(
    rom: &Rom,
    kind: &'static str,
    table: Table,
    index: usize,
) -> DecodeResult<Vec<Tile>> {
    Ok(component_tile_bytes(rom, kind, table, index)?
        .into_iter()
        .map(Tile::decode)
        .collect())
}

/// Decoded pieces of one face
pub struct MobParts {
    pub template: Template,
    pub head: Vec<Tile>,
    pub eyes: Vec<Tile>,
    pub noses: Vec<Tile>,
    pub mouths: Vec<Tile>,
}

impl MobParts {
    /// Gather the pieces for the global component indices given
    pub fn load(
        rom: &Rom,
        head: usize,
        eye: usize,
        nose: usize,
        mouth: usize,
    ) -> DecodeResult<MobParts> {
        Ok(MobParts {
            template: read_template(rom, head)?,
            head: component_tiles(rom, "head", MOB_HEADS, head)?,
            eyes: component_tiles(rom, "eye", MOB_EYES, eye)?,
            noses: component_tiles(rom, "nose", MOB_NOSES, nose)?,
            mouths: component_tiles(rom, "mouth", MOB_MOUTHS, mouth)?,
        })
    }

    pub fn for_record(rom: &Rom, rec: &ComponentRecord) -> DecodeResult<MobParts> {
        MobParts::load(
            rom,
            rec.global(rec.head),
            rec.global(rec.eye),
            rec.global(rec.nose),
            rec.global(rec.mouth),
        )
    }

    /// Tile for template cell (`row`, `col`)
    pub fn cell(&self, row: usize, col: usize) -> Option<Tile> {
        match self.template[row][col] {
            Some(t) => usize::try_from(t)
                .ok()
                .and_then(|t| self.head.get(t))
                .copied(),
            None => {
                let vc = col.checked_sub(1).filter(|&c| c < 3)?;

                match row {
                    2 => self.eyes.get(vc).copied(),
                    3 => self.noses.get(vc).copied(),
                    4 | 5 => self.mouths.get(MOUTH_ROWS[row - 4][vc]).copied(),
                    _ => None,
                }
            }
        }
    }

    pub fn compose(&self) -> IndexedImage {
        metatile::compose(|r, c| self.cell(r, c))
    }
}

pub fn render(rom: &Rom, rec: &ComponentRecord) -> DecodeResult<RgbImage> {
    let parts = MobParts::for_record(rom, rec)?;

    Ok(parts.compose().to_rgb(&PORTRAIT))
}

/// Count of each value, per component field
pub fn value_distribution(records: &[ComponentRecord]) -> [BTreeMap<u8, usize>; 5] {
    let mut dist: [BTreeMap<u8, usize>; 5] = Default::default();

    for r in records {
        for (i, d) in dist.iter_mut().enumerate() {
            *d.entry(r.field(i)).or_default() += 1;
        }
    }

    dist
}

/// Portrait number to the characters drawn with it
pub fn portrait_to_chars(names: &[NameEntry]) -> BTreeMap<i16, Vec<usize>> {
    let mut map: BTreeMap<i16, Vec<usize>> = BTreeMap::new();

    for n in names.iter().take(CHARACTERS.count) {
        map.entry(n.portrait()).or_default().push(n.index);
    }

    map
}

pub fn dump_component_csv<W: Write>(records: &[ComponentRecord], mut w: W) -> Result<()> {
    w.write_all(b"\xef\xbb\xbf")?;

    let mut writer = csv::Writer::from_writer(w);

    for r in records {
        writer.serialize(r)?;
    }

    writer.flush()?;

    Ok(())
}

pub fn export_component_csv<P: AsRef<Path>>(records: &[ComponentRecord], path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let f = File::create(path).with_context(|| format!("Can't create `{}`", path.display()))?;

    dump_component_csv(records, BufWriter::new(f))
}

/// First non-empty name for every generic portrait
pub fn portrait_names(rows: &[CharacterRow]) -> BTreeMap<usize, String> {
    let mut names = BTreeMap::new();

    for row in rows {
        let Ok(p) = usize::try_from(row.portrait) else {
            continue;
        };

        if p >= MOB_FIRST_PORTRAIT && !row.ext_name.is_empty() {
            names.entry(p).or_insert_with(|| row.ext_name.clone());
        }
    }

    names
}

/// Where portraits go for a given scale
pub fn default_portrait_dir(scale: usize) -> &'static str {
    if scale > 1 {
        "output/mob_portraits"
    } else {
        "output/mob_portraits_48"
    }
}

pub fn portrait_file_name(portrait: usize, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("P{:03}_{}.png", portrait, name),
        _ => format!("P{:03}.png", portrait),
    }
}

/// Render every generic portrait to `out_dir` along with `_atlas.png`. Returns the number of
/// portraits written, portraits with out of range components are logged and skipped.
pub fn export_portraits<P: AsRef<Path>>(
    rom: &Rom,
    names: &BTreeMap<usize, String>,
    out_dir: P,
    scale: usize,
) -> Result<usize> {
    let out_dir = out_dir.as_ref();
    let scale = scale.max(1);
    let size = PORTRAIT_SIZE * scale;

    fs::create_dir_all(out_dir)?;

    let records = read_components(rom);

    let mut cells = Vec::with_capacity(records.len());
    let mut written = 0;

    for rec in &records {
        let img = match render(rom, rec) {
            Ok(img) => img.scale(scale),
            Err(e) => {
                error!("P{:03}: {}", rec.portrait_index, e);
                cells.push(RgbImage::new(size, size, [128, 128, 128]));
                continue;
            }
        };

        let name = names.get(&rec.portrait_index).map(String::as_str);
        let path = out_dir.join(portrait_file_name(rec.portrait_index, name));

        img.write_png(&path)?;
        written += 1;

        cells.push(img);
    }

    let atlas = Atlas::for_count(cells.len(), 15, size, 2, [128, 128, 128]);

    let atlas_path = out_dir.join("_atlas.png");
    atlas.render(&cells).write_png(&atlas_path)?;
    info!("Wrote `{}`", atlas_path.display());

    Ok(written)
}

#[cfg(test)]
pub(crate) fn fill_tile(data: &mut [u8], offset: usize, index: u8) {
    let (p0, p1) = (index & 1 != 0, index & 2 != 0);

    data[offset..offset + 8].fill(if p0 { 0xff } else { 0 });
    data[offset + 8..offset + 16].fill(if p1 { 0xff } else { 0 });
}

/// Cartridge with head 6 and eye/nose/mouth 7 in place, and a component record for P082 using
/// them through category 1
#[cfg(test)]
pub(crate) fn test_rom() -> Rom {
    let mut data = crate::rom::blank_image();

    // Head 6: every tile is index 1
    for i in 0..MOB_HEAD_TILES {
        fill_tile(&mut data, MOB_HEADS.offset(6) + i * TILE_LEN, 1);
    }

    // Template 6: standard framework
    let template: [u8; 36] = [
        0x64, 0x65, 0x68, 0x69, 0x6c, 0x6d, //
        0x66, 0x67, 0x6a, 0x6b, 0x6e, 0x6f, //
        0x70, 0, 0, 0, 0x72, 0x73, //
        0x71, 0, 0, 0, 0x74, 0x75, //
        0x76, 0, 0, 0, 0x78, 0x79, //
        0x77, 0, 0, 0, 0x7a, 0x7b, //
    ];
    let off = MOB_TEMPLATES.offset(6);
    data[off..off + 36].copy_from_slice(&template);

    // Eye 7: index 2, nose 7: index 3
    for i in 0..3 {
        fill_tile(&mut data, MOB_EYES.offset(7) + i * TILE_LEN, 2);
        fill_tile(&mut data, MOB_NOSES.offset(7) + i * TILE_LEN, 3);
    }

    // Mouth 8: only tile 4 (row 4, col 3) is set
    fill_tile(&mut data, MOB_MOUTHS.offset(8) + 4 * TILE_LEN, 3);

    // P082: cat 1, head 1, eye 2, nose 2, mouth 3
    let off = MOB_COMPONENTS.offset(1);
    data[off..off + 5].copy_from_slice(&[1, 1, 2, 2, 3]);

    Rom::from_bytes(data).unwrap()
}

#[test]
fn test_component_offsets() {
    assert_eq!(component_offset(81), Some(0x1f034));
    assert_eq!(component_offset(254), Some(0x1f034 + 173 * 5));
    assert_eq!(component_offset(80), None);
    assert_eq!(component_offset(255), None);
}

#[test]
fn test_read_components() {
    let rom = test_rom();
    let recs = read_components(&rom);

    assert_eq!(recs.len(), 174);
    assert_eq!(recs[0].portrait_index, 81);
    assert_eq!(recs[173].portrait_index, 254);

    let r = &recs[1];

    assert_eq!(r.rom_offset, "0x1F039");
    assert_eq!(r.global(r.head), 6);
    assert_eq!(r.global(r.eye), 7);
    assert_eq!(r.global(r.mouth), 8);

    let dist = value_distribution(&recs);

    assert_eq!(dist[0][&0], 173);
    assert_eq!(dist[0][&1], 1);
    assert_eq!(dist[4][&3], 1);
}

#[test]
fn test_template() {
    let rom = test_rom();
    let t = read_template(&rom, 6).unwrap();

    assert_eq!(t[0][0], Some(0));
    assert_eq!(t[5][5], Some(23));
    assert_eq!(t[2][1], None);

    // Blank template: every cell is a variant slot
    assert!(read_template(&rom, 0).unwrap().iter().flatten().all(|c| c.is_none()));

    assert_eq!(
        read_template(&rom, 20).err(),
        Some(DecodeError::ComponentOutOfRange {
            kind: "template",
            index: 20
        })
    );
}

#[test]
fn test_render() {
    let rom = test_rom();
    let recs = read_components(&rom);

    let img = render(&rom, &recs[1]).unwrap();

    assert_eq!((img.width(), img.height()), (48, 48));

    let light = PORTRAIT.color(1);
    let dark = PORTRAIT.color(2);
    let white = PORTRAIT.color(3);
    let black = PORTRAIT.color(0);

    // Framework
    assert_eq!(img.pixel(0, 0), light);
    assert_eq!(img.pixel(47, 47), light);
    // Eyes in row 2, noses in row 3
    assert_eq!(img.pixel(8, 16), dark);
    assert_eq!(img.pixel(31, 23), dark);
    assert_eq!(img.pixel(8, 24), white);
    // Mouth tile 4 lands on row 4 column 3
    assert_eq!(img.pixel(24, 32), white);
    assert_eq!(img.pixel(8, 32), black);
    assert_eq!(img.pixel(24, 40), black);
}

#[test]
fn test_out_of_range() {
    let rom = test_rom();

    let rec = ComponentRecord {
        portrait_index: 100,
        rom_offset: String::new(),
        cat: 4,
        head: 0,
        eye: 0,
        nose: 0,
        mouth: 0,
    };

    assert_eq!(
        render(&rom, &rec).err(),
        Some(DecodeError::ComponentOutOfRange {
            kind: "template",
            index: 20
        })
    );
}

#[test]
fn test_negative_template_cells() {
    let mut data = crate::rom::blank_image();

    data[MOB_TEMPLATES.offset(2)] = 0x10;

    let rom = Rom::from_bytes(data).unwrap();

    let parts = MobParts::load(&rom, 2, 0, 0, 0).unwrap();

    assert_eq!(parts.template[0][0], Some(0x10 - 0x64));
    assert_eq!(parts.cell(0, 0), None);
}

#[test]
fn test_names_and_files() {
    let row = |portrait: i16, name: &str| CharacterRow {
        index: 0,
        rom_offset: String::new(),
        rom_kana: String::new(),
        rom_kanji: String::new(),
        ext_name: name.to_string(),
        ext_kana: String::new(),
        age: 0,
        body: 0,
        intelligence: 0,
        military: 0,
        charisma: 0,
        luck: 0,
        loyalty: 0,
        b7_raw: 0,
        navy: String::new(),
        role: String::new(),
        troops: 0,
        city: 0,
        faction: 0,
        portrait,
        raw_hex: String::new(),
    };

    let rows = vec![
        row(2, "劉備"),
        row(81, "周泰"),
        row(81, "蔣欽"),
        row(90, ""),
        row(-1, "無"),
    ];

    let names = portrait_names(&rows);

    assert_eq!(names.len(), 1);
    assert_eq!(names[&81], "周泰");

    assert_eq!(portrait_file_name(81, Some("周泰")), "P081_周泰.png");
    assert_eq!(portrait_file_name(90, None), "P090.png");
    assert_eq!(default_portrait_dir(2), "output/mob_portraits");
    assert_eq!(default_portrait_dir(1), "output/mob_portraits_48");
}

#[test]
fn test_component_csv() {
    let rom = test_rom();
    let recs = read_components(&rom);

    let mut buf = Vec::new();
    dump_component_csv(&recs[..2], &mut buf).unwrap();

    let text = std::str::from_utf8(&buf[3..]).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines[0], "portrait_index,rom_offset,cat,head,eye,nose,mouth");
    assert_eq!(lines[2], "82,0x1F039,1,1,2,2,3");
}

#[test]
fn test_export_creates_dirs() {
    let rom = test_rom();

    let tmp = tempfile::tempdir().unwrap();

    let csv_path = tmp.path().join("output").join("mob_component_index.csv");
    export_component_csv(&read_components(&rom), &csv_path).unwrap();
    assert!(csv_path.exists());

    let names = BTreeMap::from([(82, "周泰".to_string())]);
    let out = tmp.path().join("output").join("mob_portraits_48");

    assert_eq!(export_portraits(&rom, &names, &out, 1).unwrap(), 174);

    assert!(out.join("P081.png").exists());
    assert!(out.join("P082_周泰.png").exists());
    assert!(out.join("_atlas.png").exists());
}
