//! General stat records

use crate::names::{self, NameEntry};
use crate::rom::Rom;
use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use serde::{Deserialize, Serialize};
use sgs_common::memmap::{CHARACTER_DATA_LEN, CHARACTER_HEADER, CHARACTER_SEPARATOR, CHARACTERS};
use sgs_common::records;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Community-maintained stat sheet used to put names on records, looked up in the working
/// directory
pub const EXT_CSV_PATH: &str = "光榮三國志系列武將登場統計 - 能力表.csv";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Rulers of the 11 factions, indexed by faction number minus one
pub const FACTIONS: [&str; 11] = [
    "曹操", "孫堅", "劉備", "袁紹", "袁術", "劉表", "董卓", "劉焉", "馬騰", "公孫瓚", "陶謙",
];

pub fn faction_name(faction: u8) -> Option<&'static str> {
    usize::from(faction)
        .checked_sub(1)
        .and_then(|i| FACTIONS.get(i).copied())
}

/// (body, intelligence, military, charisma, luck), unique enough to identify most generals
pub type StatsKey = [u8; 5];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub index: usize,
    /// File offset of the record
    pub offset: usize,
    /// Age when the game starts, negative for generals not born yet
    pub age: i8,
    pub body: u8,
    pub intelligence: u8,
    pub military: u8,
    pub charisma: u8,
    pub luck: u8,
    pub loyalty: u8,
    /// bit 0: navy, bit 1: leader (ruler or strategist)
    pub b7_raw: u8,
    pub troops: u16,
    pub city: u8,
    pub faction: u8,
    pub raw: [u8; CHARACTER_DATA_LEN],
    pub rom_kana: String,
    pub rom_kanji: String,
    pub portrait: i16,
    pub ext_name: String,
    pub ext_kana: String,
}

impl Character {
    /// Decode a 17 byte record. Returns `None` if the record is short or isn't followed by the
    /// separator, which marks the end of the table.
    pub fn decode(index: usize, offset: usize, bytes: &[u8]) -> Option<Character> {
        let (data, sep) = bytes.split_at_checked(CHARACTER_DATA_LEN)?;

        if sep != CHARACTER_SEPARATOR {
            return None;
        }

        let raw: [u8; CHARACTER_DATA_LEN] = data.try_into().ok()?;

        Some(Character {
            index,
            offset,
            age: raw[0] as i8,
            body: raw[1],
            intelligence: raw[2],
            military: raw[3],
            charisma: raw[4],
            luck: raw[5],
            loyalty: raw[6],
            b7_raw: raw[7],
            troops: u16::from_le_bytes([raw[8], raw[9]]),
            city: raw[10],
            faction: raw[11],
            raw,
            rom_kana: String::new(),
            rom_kanji: String::new(),
            portrait: -1,
            ext_name: String::new(),
            ext_kana: String::new(),
        })
    }

    pub fn is_navy(&self) -> bool {
        self.b7_raw & 1 != 0
    }

    pub fn is_leader(&self) -> bool {
        self.b7_raw & 2 != 0
    }

    pub fn role(&self) -> &'static str {
        if self.is_leader() { "統領" } else { "一般" }
    }

    /// Both B7 flags in one label
    pub fn status(&self) -> String {
        match self.b7_raw {
            0 => "一般・非水軍".to_string(),
            1 => "一般・水軍".to_string(),
            2 => "統領・非水軍".to_string(),
            3 => "統領・水軍".to_string(),
            v => format!("未知({})", v),
        }
    }

    pub fn stats_key(&self) -> StatsKey {
        [
            self.body,
            self.intelligence,
            self.military,
            self.charisma,
            self.luck,
        ]
    }

    fn set_name(&mut self, name: &NameEntry) {
        self.rom_kana = name.kana.clone();
        self.rom_kanji = name.kanji();
        self.portrait = name.portrait();
    }

    pub fn to_row(&self) -> CharacterRow {
        CharacterRow {
            index: self.index,
            rom_offset: format!("0x{:05X}", self.offset),
            rom_kana: self.rom_kana.clone(),
            rom_kanji: self.rom_kanji.clone(),
            ext_name: self.ext_name.clone(),
            ext_kana: self.ext_kana.clone(),
            age: self.age,
            body: self.body,
            intelligence: self.intelligence,
            military: self.military,
            charisma: self.charisma,
            luck: self.luck,
            loyalty: self.loyalty,
            b7_raw: self.b7_raw,
            navy: if self.is_navy() { "水軍" } else { "" }.to_string(),
            role: self.role().to_string(),
            troops: self.troops,
            city: self.city,
            faction: self.faction,
            portrait: self.portrait,
            raw_hex: self
                .raw
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One line of the exported table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CharacterRow {
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "ROM_Offset")]
    pub rom_offset: String,
    #[serde(rename = "ROM_Kana")]
    pub rom_kana: String,
    #[serde(rename = "ROM_Kanji")]
    pub rom_kanji: String,
    #[serde(rename = "[EXT]Name")]
    pub ext_name: String,
    #[serde(rename = "[EXT]Kana")]
    pub ext_kana: String,
    #[serde(rename = "Age")]
    pub age: i8,
    #[serde(rename = "Body")]
    pub body: u8,
    #[serde(rename = "Intelligence")]
    pub intelligence: u8,
    #[serde(rename = "Military")]
    pub military: u8,
    #[serde(rename = "Charisma")]
    pub charisma: u8,
    #[serde(rename = "Luck")]
    pub luck: u8,
    #[serde(rename = "Loyalty")]
    pub loyalty: u8,
    #[serde(rename = "B7_Raw")]
    pub b7_raw: u8,
    #[serde(rename = "Navy")]
    pub navy: String,
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Troops")]
    pub troops: u16,
    #[serde(rename = "City")]
    pub city: u8,
    #[serde(rename = "Faction")]
    pub faction: u8,
    #[serde(rename = "Portrait")]
    pub portrait: i16,
    #[serde(rename = "Raw_Hex")]
    pub raw_hex: String,
}

impl CharacterRow {
    /// Parse `Raw_Hex` back into the record bytes
    pub fn raw_bytes(&self) -> Result<[u8; CHARACTER_DATA_LEN]> {
        let bytes = self
            .raw_hex
            .split_whitespace()
            .map(|h| u8::from_str_radix(h, 16))
            .collect::<Result<Vec<u8>, _>>()
            .with_context(|| format!("Bad Raw_Hex for record {}", self.index))?;

        bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow!("Raw_Hex of record {} has {} bytes", self.index, v.len()))
    }
}

/// Name and kana of the generals we can't read a name for from the cartridge alone
static EXT_CHAR_INFO: &[(usize, &str, &str)] = &[
    (1, "曹操", "そうそう"),
    (2, "孫堅", "そんけん"),
    (3, "劉備", "りゅうび"),
    (4, "袁紹", "えんしょう"),
    (5, "袁術", "えんしゅう"),
    (6, "劉表", "りゅうびょう"),
    (7, "董卓", "とうたく"),
    (8, "劉焉", "りゅうえん"),
    (9, "馬騰", ""),
    (10, "公孫瓚", "こうそんさん"),
    (43, "關羽", "かんう"),
    (44, "張飛", "ちょうひ"),
    (47, "孫亁", "そんかん"),
    (173, "徐庶", ""),
    (174, "諸葛亮", "しょかつりょう"),
    (230, "孟獲", "もうかく"),
    (231, "雍闓", "よんがい"),
];

/// External names keyed by stats
#[derive(Default, Debug)]
pub struct ExtNames {
    by_stats: HashMap<StatsKey, (String, String)>,
}

impl ExtNames {
    /// Load the external stat sheet. A missing or unreadable sheet isn't fatal, we just fall back
    /// to the built-in names.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ExtNames {
        let path = path.as_ref();

        if !path.exists() {
            info!(
                "No external stat sheet at `{}`, using built-in names",
                path.display()
            );
            return ExtNames::default();
        }

        let loaded = File::open(path)
            .map_err(anyhow::Error::from)
            .and_then(ExtNames::from_reader);

        match loaded {
            Ok(ext) => {
                info!(
                    "Loaded {} external names from `{}`",
                    ext.len(),
                    path.display()
                );
                ext
            }
            Err(e) => {
                warn!("Can't load `{}`: {:#}", path.display(), e);
                ExtNames::default()
            }
        }
    }

    /// Column 0 is the name, 5 the kana and 8..=12 the stats for this game. Rows without stats
    /// are skipped.
    pub fn from_reader<R: Read>(r: R) -> Result<ExtNames> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(r);

        let mut by_stats = HashMap::new();

        for row in reader.records() {
            let row = row?;

            if row.len() <= 12 || row[8].is_empty() {
                continue;
            }

            let mut key = [0u8; 5];
            let mut valid = true;

            for (k, col) in key.iter_mut().zip(8..=12) {
                match row[col].trim().parse() {
                    Ok(v) => *k = v,
                    Err(_) => valid = false,
                }
            }

            if !valid {
                continue;
            }

            let name = row[0].to_string();
            let kana = row[5].to_string();

            match by_stats.entry(key) {
                Entry::Occupied(e) => {
                    let (existing, _): &(String, String) = e.get();

                    warn!(
                        "Duplicate stats {:?}: `{}` and `{}`, keeping the first",
                        key, existing, name
                    );
                }
                Entry::Vacant(e) => {
                    e.insert((name, kana));
                }
            }
        }

        Ok(ExtNames { by_stats })
    }

    pub fn len(&self) -> usize {
        self.by_stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stats.is_empty()
    }

    /// Name and kana for `c`: by stats first, then the built-in table by index
    pub fn lookup(&self, c: &Character) -> (&str, &str) {
        if let Some((name, kana)) = self.by_stats.get(&c.stats_key()) {
            return (name.as_str(), kana.as_str());
        }

        EXT_CHAR_INFO
            .iter()
            .find(|&&(i, _, _)| i == c.index)
            .map(|&(_, name, kana)| (name, kana))
            .unwrap_or(("", ""))
    }
}

/// Decode the whole table and put names on it
pub fn decode_all(rom: &Rom, ext: &ExtNames) -> Vec<Character> {
    if let Ok(header) = rom.slice(CHARACTER_HEADER.base, CHARACTER_HEADER.len) {
        if header != [0x4c, 0, 0, 0] {
            warn!("Unexpected character table header {:02x?}", header);
        }
    }

    let names = names::read_all(rom);

    let mut chars = Vec::new();

    for r in records::get(rom.as_bytes(), CHARACTERS) {
        let Some(mut c) = Character::decode(r.index, r.offset, r.bytes) else {
            debug!("No separator after record {}, end of table", r.index);
            break;
        };

        if let Some(name) = names.get(r.index) {
            c.set_name(name);
        }

        let (name, kana) = ext.lookup(&c);
        c.ext_name = name.to_string();
        c.ext_kana = kana.to_string();

        chars.push(c);
    }

    info!("Decoded {} character records", chars.len());

    chars
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub navy: usize,
    pub leaders: usize,
    pub named: usize,
}

impl Summary {
    pub fn of(chars: &[Character]) -> Summary {
        Summary {
            total: chars.len(),
            navy: chars.iter().filter(|c| c.is_navy()).count(),
            leaders: chars.iter().filter(|c| c.is_leader()).count(),
            named: chars.iter().filter(|c| !c.ext_name.is_empty()).count(),
        }
    }
}

fn table_file_name(rom_path: &Path, ext: &str) -> String {
    let stem = rom_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rom".to_string());

    format!("{}_characters_v2.{}", stem, ext)
}

/// Name of the exported table for the cartridge at `rom_path`
pub fn csv_file_name<P: AsRef<Path>>(rom_path: P) -> String {
    table_file_name(rom_path.as_ref(), "csv")
}

pub fn xlsx_file_name<P: AsRef<Path>>(rom_path: P) -> String {
    table_file_name(rom_path.as_ref(), "xlsx")
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Can't create `{}`", dir.display()))?;
    }

    Ok(())
}

/// Write the table as UTF-8 CSV with a BOM so that spreadsheets pick the right encoding
pub fn dump_csv<W: Write>(chars: &[Character], mut w: W) -> Result<()> {
    w.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(w);

    for c in chars {
        writer.serialize(c.to_row())?;
    }

    writer.flush()?;

    Ok(())
}

pub fn export_csv<P: AsRef<Path>>(chars: &[Character], path: P) -> Result<()> {
    let path = path.as_ref();

    create_parent(path)?;

    let f = File::create(path).with_context(|| format!("Can't create `{}`", path.display()))?;

    dump_csv(chars, BufWriter::new(f))
        .with_context(|| format!("Can't write `{}`", path.display()))?;

    info!("Exported {} records to `{}`", chars.len(), path.display());

    Ok(())
}

pub const XLSX_SHEET: &str = "武將資料";

/// Workbook headers and column widths
pub const XLSX_COLUMNS: [(&str, f64); 20] = [
    ("序號", 5.),
    ("偏移", 9.),
    ("ROM假名", 12.),
    ("ROM漢字", 10.),
    ("[EXT]姓名", 10.),
    ("[EXT]假名", 14.),
    ("年齡", 5.),
    ("體力", 5.),
    ("智力", 5.),
    ("武力", 5.),
    ("魅力", 5.),
    ("運氣", 5.),
    ("忠誠", 5.),
    ("B7", 4.),
    ("水軍", 5.),
    ("身份", 10.),
    ("兵士", 8.),
    ("城市", 5.),
    ("勢力", 5.),
    ("Raw Hex", 38.),
];

enum Cell {
    Number(f64),
    Text(String),
}

impl Character {
    fn xlsx_cells(&self) -> [Cell; 20] {
        let row = self.to_row();
        let n = Cell::Number;

        [
            n(self.index as f64),
            Cell::Text(row.rom_offset),
            Cell::Text(row.rom_kana),
            Cell::Text(row.rom_kanji),
            Cell::Text(row.ext_name),
            Cell::Text(row.ext_kana),
            n(self.age.into()),
            n(self.body.into()),
            n(self.intelligence.into()),
            n(self.military.into()),
            n(self.charisma.into()),
            n(self.luck.into()),
            n(self.loyalty.into()),
            n(self.b7_raw.into()),
            Cell::Text(if self.is_navy() { "●" } else { "" }.to_string()),
            Cell::Text(row.role),
            n(self.troops.into()),
            n(self.city.into()),
            n(self.faction.into()),
            Cell::Text(row.raw_hex),
        ]
    }

    /// Row colour: leaders yellow, navy blue, both green
    fn xlsx_fill(&self) -> Option<u32> {
        match (self.is_leader(), self.is_navy()) {
            (true, true) => Some(0xD5F5E3),
            (true, false) => Some(0xFFF2CC),
            (false, true) => Some(0xD6EAF8),
            (false, false) => None,
        }
    }
}

fn xlsx_header_format(name: &str) -> Format {
    let fill = if name.starts_with("[EXT]") { 0x2E75B6 } else { 0x4472C4 };

    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(fill))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn xlsx_cell_format(col: usize, cell: &Cell, fill: Option<u32>) -> Format {
    let f = Format::new()
        .set_border_bottom(FormatBorder::Thin)
        .set_border_bottom_color(Color::RGB(0xD0D0D0));

    let f = match col {
        2..=5 | 19 => f.set_align(FormatAlign::Left),
        _ => f.set_align(FormatAlign::Center),
    };

    let f = match (col, cell) {
        (19, _) => f
            .set_font_name("Consolas")
            .set_font_size(9)
            .set_font_color(Color::RGB(0x666666)),
        (4 | 5, _) => f
            .set_font_name("Arial")
            .set_font_size(10)
            .set_font_color(Color::RGB(0x1A5276)),
        (6, Cell::Number(v)) if *v < 0. => f
            .set_font_name("Arial")
            .set_font_size(10)
            .set_font_color(Color::RGB(0xCC0000)),
        _ => f.set_font_name("Arial").set_font_size(10),
    };

    match fill {
        Some(bg) => f.set_background_color(Color::RGB(bg)),
        None => f,
    }
}

/// Styled workbook with a frozen, filterable header row
pub fn build_workbook(chars: &[Character]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    sheet.set_name(XLSX_SHEET)?;

    for (col, &(name, width)) in XLSX_COLUMNS.iter().enumerate() {
        let col = col as u16;

        sheet.write_string_with_format(0, col, name, &xlsx_header_format(name))?;
        sheet.set_column_width(col, width)?;
    }

    for (i, c) in chars.iter().enumerate() {
        let row = (i + 1) as u32;
        let fill = c.xlsx_fill();

        for (col, cell) in c.xlsx_cells().iter().enumerate() {
            let format = xlsx_cell_format(col, cell, fill);
            let col = col as u16;

            match cell {
                Cell::Number(v) => {
                    sheet.write_number_with_format(row, col, *v, &format)?;
                }
                Cell::Text(t) if t.is_empty() => {
                    sheet.write_blank(row, col, &format)?;
                }
                Cell::Text(t) => {
                    sheet.write_string_with_format(row, col, t, &format)?;
                }
            }
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofilter(0, 0, chars.len() as u32, (XLSX_COLUMNS.len() - 1) as u16)?;

    Ok(workbook)
}

pub fn dump_xlsx<W: Write>(chars: &[Character], mut w: W) -> Result<()> {
    let buf = build_workbook(chars)?.save_to_buffer()?;

    w.write_all(&buf)?;

    Ok(())
}

pub fn export_xlsx<P: AsRef<Path>>(chars: &[Character], path: P) -> Result<()> {
    let path = path.as_ref();

    create_parent(path)?;

    build_workbook(chars)?
        .save(path)
        .with_context(|| format!("Can't write `{}`", path.display()))?;

    info!("Exported {} records to `{}`", chars.len(), path.display());

    Ok(())
}

/// Read back a table written by `dump_csv`
pub fn load_csv<R: Read>(mut r: R) -> Result<Vec<CharacterRow>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;

    let data = buf.strip_prefix(UTF8_BOM).unwrap_or(&buf[..]);

    let mut reader = csv::Reader::from_reader(data);

    let rows = reader.deserialize().collect::<Result<Vec<CharacterRow>, _>>()?;

    Ok(rows)
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CharacterRow>> {
    let path = path.as_ref();

    let data = fs::read(path).with_context(|| format!("Can't open `{}`", path.display()))?;

    load_csv(data.as_slice()).with_context(|| format!("Can't parse `{}`", path.display()))
}

#[cfg(test)]
fn put_record(data: &mut [u8], index: usize, rec: [u8; CHARACTER_DATA_LEN]) {
    let off = CHARACTERS.offset(index);

    data[off..off + CHARACTER_DATA_LEN].copy_from_slice(&rec);
    data[off + CHARACTER_DATA_LEN..off + CHARACTERS.stride].copy_from_slice(&CHARACTER_SEPARATOR);
}

/// Cartridge with records 0..=3 in place, 3 being 劉備 with its name record
#[cfg(test)]
fn test_rom() -> Rom {
    use sgs_common::memmap::NAMES;

    let mut data = crate::rom::blank_image();

    data[CHARACTER_HEADER.base] = 0x4c;

    put_record(&mut data, 0, [20, 50, 50, 50, 50, 50, 100, 0, 0, 0, 0, 0]);
    put_record(&mut data, 1, [40, 88, 91, 72, 96, 80, 100, 3, 0xe8, 0x03, 1, 1]);
    put_record(&mut data, 2, [0xef, 60, 40, 70, 30, 45, 60, 1, 0x34, 0x12, 12, 0]);
    put_record(&mut data, 3, [29, 82, 95, 63, 99, 91, 100, 3, 0x10, 0x27, 7, 3]);

    let off = NAMES.offset(3);
    data[off..off + 5].copy_from_slice(&[0xd8, 0xad, 0xb3, 0xcb, 0xde]);
    data[off + 8] = 0xe3;
    data[off + 10] = 0xbd;
    data[off + 14] = 3;

    Rom::from_bytes(data).unwrap()
}

#[test]
fn test_decode_record() {
    let rom = test_rom();
    let chars = decode_all(&rom, &ExtNames::default());

    // Record 4 has no separator
    assert_eq!(chars.len(), 4);

    let c = &chars[2];

    assert_eq!(c.offset, 0x38014 + 2 * 17);
    assert_eq!(c.age, -17);
    assert_eq!(c.troops, 0x1234);
    assert_eq!(c.city, 12);
    assert!(c.is_navy());
    assert!(!c.is_leader());
    assert_eq!(c.role(), "一般");
    assert_eq!(c.status(), "一般・水軍");
    assert_eq!(c.portrait, -1);
}

#[test]
fn test_liu_bei() {
    let rom = test_rom();
    let chars = decode_all(&rom, &ExtNames::default());

    let c = &chars[3];

    assert_eq!(c.age, 29);
    assert_eq!(c.intelligence, 95);
    assert_eq!(c.military, 63);
    assert_eq!(c.charisma, 99);
    assert_eq!(c.troops, 10000);
    assert_eq!(c.role(), "統領");
    assert_eq!(faction_name(c.faction), Some("劉備"));
    assert_eq!(c.rom_kana, "ﾘｭｳﾋﾞ");
    assert_eq!(c.rom_kanji, "劉備");
    assert_eq!(c.portrait, 2);
    // Built-in name by index
    assert_eq!(c.ext_name, "劉備");
    assert_eq!(c.ext_kana, "りゅうび");

    let s = Summary::of(&chars);

    assert_eq!(
        s,
        Summary {
            total: 4,
            navy: 3,
            leaders: 2,
            named: 3
        }
    );
}

#[test]
fn test_bad_separator_stops() {
    let mut c = Character::decode(0, 0, &[0; 17]);
    assert!(c.is_none());

    let mut rec = [0u8; 17];
    rec[12..].copy_from_slice(&CHARACTER_SEPARATOR);
    c = Character::decode(0, 0, &rec);
    assert!(c.is_some());

    assert!(Character::decode(0, 0, &rec[..16]).is_none());
}

#[test]
fn test_ext_names() {
    let sheet = "\
姓名,a,b,c,d,假名,e,f,S01身體,S01知力,S01武力,S01魅力,S01運勢
張三,,,,,ちょうさん,,,50,50,50,50,50
李四,,,,,りし,,,50,50,50,50,50
短,,,
空,,,,,から,,,,1,2,3,4
壞,,,,,こわ,,,x,1,2,3,4
";

    let ext = ExtNames::from_reader(sheet.as_bytes()).unwrap();

    assert_eq!(ext.len(), 1);

    let rom = test_rom();
    let chars = decode_all(&rom, &ext);

    // Duplicate stats keep the first row
    assert_eq!(chars[0].ext_name, "張三");
    assert_eq!(chars[0].ext_kana, "ちょうさん");
    // Falls back to the built-in table
    assert_eq!(chars[1].ext_name, "曹操");
    assert_eq!(chars[2].ext_name, "孫堅");

    let s = Summary::of(&chars);
    assert_eq!(s.named, 4);
}

#[test]
fn test_missing_ext_sheet() {
    let ext = ExtNames::from_path("no/such/sheet.csv");

    assert!(ext.is_empty());
}

#[test]
fn test_csv_round_trip() {
    let rom = test_rom();
    let chars = decode_all(&rom, &ExtNames::default());

    let mut buf = Vec::new();
    dump_csv(&chars, &mut buf).unwrap();

    assert!(buf.starts_with(UTF8_BOM));

    let text = std::str::from_utf8(&buf[3..]).unwrap();
    let header = text.lines().next().unwrap();

    assert!(header.starts_with("Index,ROM_Offset,ROM_Kana,ROM_Kanji,[EXT]Name,[EXT]Kana,Age"));
    assert!(header.ends_with("Faction,Portrait,Raw_Hex"));
    assert!(text.contains("0x38047"));

    let rows = load_csv(buf.as_slice()).unwrap();

    assert_eq!(rows.len(), chars.len());

    for (row, c) in rows.iter().zip(chars.iter()) {
        assert_eq!(row, &c.to_row());
        assert_eq!(row.raw_bytes().unwrap(), c.raw);
    }

    assert_eq!(rows[3].raw_hex, "1D 52 5F 3F 63 5B 64 03 10 27 07 03");
    assert_eq!(rows[3].navy, "水軍");
}

#[test]
fn test_csv_file_name() {
    assert_eq!(
        csv_file_name("roms/Sangokushi (Japan).nes"),
        "Sangokushi (Japan)_characters_v2.csv"
    );
    assert_eq!(
        xlsx_file_name("Sangokushi (Japan).nes"),
        "Sangokushi (Japan)_characters_v2.xlsx"
    );
}

#[test]
fn test_export_creates_output_dir() {
    let rom = test_rom();
    let chars = decode_all(&rom, &ExtNames::default());

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("output").join(csv_file_name(crate::rom::DEFAULT_ROM_PATH));

    assert!(!path.parent().unwrap().exists());

    export_csv(&chars, &path).unwrap();

    let rows = read_csv(&path).unwrap();
    assert_eq!(rows.len(), 4);

    // Empty tables too
    let empty = tmp.path().join("a").join("b").join("x_characters_v2.csv");

    export_csv(&[], &empty).unwrap();
    assert!(read_csv(&empty).unwrap().is_empty());
}

#[test]
fn test_xlsx_export() {
    use calamine::{Data, Reader, Xlsx, open_workbook};

    let rom = test_rom();
    let chars = decode_all(&rom, &ExtNames::default());

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp
        .path()
        .join("output")
        .join(xlsx_file_name(crate::rom::DEFAULT_ROM_PATH));

    export_xlsx(&chars, &path).unwrap();

    let mut wb: Xlsx<_> = open_workbook(&path).unwrap();
    let range = wb.worksheet_range(XLSX_SHEET).unwrap();

    assert_eq!(range.height(), chars.len() + 1);
    assert_eq!(range.width(), XLSX_COLUMNS.len());

    for (col, (name, _)) in XLSX_COLUMNS.iter().enumerate() {
        assert_eq!(range.get((0, col)), Some(&Data::String(name.to_string())));
    }

    // 劉備
    assert_eq!(range.get((4, 1)), Some(&Data::String("0x38047".to_string())));
    assert_eq!(range.get((4, 6)), Some(&Data::Float(29.0)));
    assert_eq!(range.get((4, 14)), Some(&Data::String("●".to_string())));
    assert_eq!(range.get((4, 15)), Some(&Data::String("統領".to_string())));
    assert_eq!(
        range.get((4, 19)),
        Some(&Data::String("1D 52 5F 3F 63 5B 64 03 10 27 07 03".to_string()))
    );

    // Same bytes through a writer
    let mut buf = Vec::new();
    dump_xlsx(&chars, &mut buf).unwrap();

    assert!(buf.starts_with(b"PK"));
}

#[test]
#[ignore]
fn test_real_rom() {
    let rom = Rom::from_path(crate::rom::DEFAULT_ROM_PATH).unwrap();
    let chars = decode_all(&rom, &ExtNames::default());

    assert_eq!(chars.len(), 256);

    let liu_bei = &chars[3];
    assert_eq!(
        (liu_bei.age, liu_bei.intelligence, liu_bei.military, liu_bei.charisma),
        (29, 95, 63, 99)
    );

    let guan_yu = &chars[43];
    assert_eq!(
        (guan_yu.age, guan_yu.intelligence, guan_yu.military, guan_yu.charisma),
        (28, 83, 99, 70)
    );

    let zhuge_liang = &chars[174];
    assert_eq!(
        (
            zhuge_liang.age,
            zhuge_liang.intelligence,
            zhuge_liang.military,
            zhuge_liang.charisma
        ),
        (8, 100, 72, 97)
    );
}
