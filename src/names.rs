//! General name records: half-width katakana reading, kanji glyph ids and portrait number

use crate::rom::Rom;
use sgs_common::memmap::{NAME_KANA_LEN, NAMES};
use sgs_common::records;

/// Offsets of the (glyph id, page) byte pairs within a name record
const GLYPH_FIELDS: [(usize, usize); 3] = [(8, 9), (10, 11), (12, 13)];

const PORTRAIT_FIELD: usize = 14;

/// A kanji glyph reference from a name record
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GlyphRef {
    pub id: u8,
    pub page: u8,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NameEntry {
    pub index: usize,
    pub kana: String,
    /// Up to 3 glyph references, empty (id 0) slots included
    pub glyphs: [GlyphRef; 3],
    /// Raw portrait byte, the portrait number plus one
    pub portrait_byte: u8,
}

impl NameEntry {
    pub fn decode(index: usize, bytes: &[u8]) -> NameEntry {
        let glyphs = GLYPH_FIELDS.map(|(id, page)| GlyphRef {
            id: bytes.get(id).copied().unwrap_or(0),
            page: bytes.get(page).copied().unwrap_or(0),
        });

        NameEntry {
            index,
            kana: decode_kana(&bytes[..NAME_KANA_LEN.min(bytes.len())]),
            glyphs,
            portrait_byte: bytes.get(PORTRAIT_FIELD).copied().unwrap_or(0),
        }
    }

    /// The kanji spelling, glyph ids we don't have a character for are left out
    pub fn kanji(&self) -> String {
        self.glyphs.iter().filter_map(|g| kanji_for_tile(g.id)).collect()
    }

    /// Portrait number, -1 when the record has none
    pub fn portrait(&self) -> i16 {
        i16::from(self.portrait_byte) - 1
    }
}

/// Decode Shift-JIS half-width katakana (0xa6-0xdf). 0 terminates the string, anything else is
/// skipped.
pub fn decode_kana(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .filter(|&&b| (0xa6..=0xdf).contains(&b))
        .filter_map(|&b| char::from_u32(0xff66 + u32::from(b - 0xa6)))
        .collect()
}

/// Every complete name record in the image, 257 on a good dump
pub fn read_all(rom: &Rom) -> Vec<NameEntry> {
    let names: Vec<_> = records::get(rom.as_bytes(), NAMES)
        .map(|r| NameEntry::decode(r.index, r.bytes))
        .collect();

    if names.len() < NAMES.count {
        warn!(
            "Name table truncated: {} of {} records",
            names.len(),
            NAMES.count
        );
    }

    names
}

/// Character drawn by page 0 glyph `id`, if known
pub fn kanji_for_tile(id: u8) -> Option<char> {
    KANJI_TILES
        .binary_search_by_key(&id, |&(i, _)| i)
        .ok()
        .map(|pos| KANJI_TILES[pos].1)
}

/// Page 0 glyph id to character, sorted by id. Some glyphs are drawn twice in the font.
static KANJI_TILES: &[(u8, char)] = &[
    (0x01, '翊'), (0x02, '苞'), (0x03, '允'), (0x04, '紘'), (0x05, '羽'), (0x06, '熙'), (0x07, '叡'),
    (0x08, '蔡'), (0x09, '永'), (0x0a, '琦'), (0x0b, '琮'), (0x0c, '越'), (0x0d, '延'), (0x0e, '應'),
    (0x0f, '汜'), (0x10, '王'), (0x11, '黃'), (0x12, '樊'), (0x13, '稠'), (0x14, '軫'), (0x15, '夏'),
    (0x16, '華'), (0x17, '旻'), (0x18, '陶'), (0x19, '璋'), (0x1a, '沛'), (0x1b, '郭'), (0x1c, '懿'),
    (0x1d, '龐'), (0x1e, '桓'), (0x1f, '于'), (0x20, '糜'), (0x21, '桓'), (0x22, '鮑'), (0x23, '暹'),
    (0x24, '關'), (0x25, '韓'), (0x26, '玩'), (0x27, '雍'), (0x28, '曠'), (0x29, '翔'), (0x2a, '紀'),
    (0x2b, '儀'), (0x2c, '宜'), (0x2d, '休'), (0x2e, '宮'), (0x2f, '玠'), (0x30, '許'), (0x31, '顗'),
    (0x32, '興'), (0x33, '欽'), (0x34, '禁'), (0x35, '瑾'), (0x36, '金'), (0x37, '傅'), (0x38, '虞'),
    (0x39, '勳'), (0x3a, '群'), (0x3b, '邢'), (0x3c, '珪'), (0x3e, '堅'), (0x3f, '憲'), (0x40, '權'),
    (0x41, '謙'), (0x42, '謙'), (0x43, '嚴'), (0x44, '玄'), (0x45, '胡'), (0x46, '顧'), (0x47, '吳'),
    (0x49, '侯'), (0x4a, '公'), (0x4b, '孔'), (0x4c, '洪'), (0x4d, '晃'), (0x4e, '洪'), (0x4f, '紘'),
    (0x50, '高'), (0x51, '綱'), (0x52, '濟'), (0x53, '策'), (0x54, '索'), (0x55, '司'), (0x56, '史'),
    (0x57, '士'), (0x58, '師'), (0x59, '志'), (0x5a, '慈'), (0x5b, '治'), (0x5c, '竺'), (0x5d, '芝'),
    (0x5e, '朱'), (0x5f, '儒'), (0x60, '授'), (0x62, '周'), (0x64, '脩'), (0x65, '脩'), (0x66, '繡'),
    (0x67, '醜'), (0x68, '肅'), (0x69, '術'), (0x6a, '循'), (0x6b, '荀'), (0x6c, '純'), (0x6d, '庶'),
    (0x6e, '諸'), (0x6f, '徐'), (0x70, '紹'), (0x71, '昭'), (0x72, '昭'), (0x73, '紹'), (0x74, '蔣'),
    (0x75, '鍾'), (0x76, '植'), (0x77, '信'), (0x78, '審'), (0x79, '真'), (0x7a, '辛'), (0x7b, '進'),
    (0x7c, '仁'), (0x7d, '圖'), (0x7e, '遂'), (0x7f, '成'), (0x80, '正'), (0x81, '盛'), (0x83, '籍'),
    (0x84, '績'), (0x85, '旋'), (0x86, '選'), (0x87, '全'), (0x88, '禪'), (0x89, '祖'), (0x8a, '雙'),
    (0x8b, '倉'), (0x8c, '宋'), (0x8d, '操'), (0x8e, '曹'), (0x91, '孫'), (0x92, '遜'), (0x93, '太'),
    (0x94, '岱'), (0x95, '泰'), (0x97, '卓'), (0x98, '澤'), (0x99, '達'), (0x9a, '堪'), (0x9b, '中'),
    (0x9c, '忠'), (0x9d, '丁'), (0x9e, '寵'), (0x9f, '張'), (0xa0, '超'), (0xa1, '陳'), (0xa2, '定'),
    (0xa3, '程'), (0xa4, '鐵'), (0xa5, '典'), (0xa7, '登'), (0xa8, '度'), (0xa9, '當'), (0xaa, '統'),
    (0xab, '董'), (0xac, '陶'), (0xad, '騰'), (0xae, '銅'), (0xaf, '道'), (0xb0, '德'), (0xb1, '惇'),
    (0xb2, '任'), (0xb3, '寧'), (0xb4, '之'), (0xb5, '巴'), (0xb6, '馬'), (0xb7, '配'), (0xb8, '薄'),
    (0xb9, '班'), (0xba, '範'), (0xbb, '費'), (0xbc, '飛'), (0xbd, '備'), (0xbe, '彪'), (0xbf, '表'),
    (0xc0, '豹'), (0xc1, '布'), (0xc2, '普'), (0xc3, '武'), (0xc4, '封'), (0xc5, '淵'), (0xc6, '文'),
    (0xc7, '平'), (0xc8, '圃'), (0xc9, '步'), (0xca, '奉'), (0xcb, '法'), (0xcc, '芳'), (0xcd, '褒'),
    (0xce, '豐'), (0xcf, '翻'), (0xd0, '摩'), (0xd1, '滿'), (0xd2, '孟'), (0xd3, '毛'), (0xd4, '蒙'),
    (0xd5, '靖'), (0xd6, '優'), (0xd8, '雄'), (0xd9, '融'), (0xdc, '楊'), (0xdd, '雷'), (0xde, '蘭'),
    (0xdf, '覽'), (0xe0, '李'), (0xe1, '理'), (0xe2, '陸'), (0xe3, '劉'), (0xe4, '隆'), (0xe5, '亮'),
    (0xe6, '凌'), (0xe7, '梁'), (0xe9, '良'), (0xea, '遼'), (0xeb, '琳'), (0xec, '累'), (0xee, '靈'),
    (0xef, '呂'), (0xf0, '魯'), (0xf1, '朗'), (0xf2, '和'), (0xf6, '袁'), (0xf7, '焉'), (0xf8, '瓚'),
    (0xf9, '荀'), (0xfa, '彧'), (0xfb, '昱'), (0xfc, '韋'), (0xfd, '曄'), (0xfe, '攸'), (0xff, '丕'),
];

#[test]
fn test_kanji_table_sorted() {
    assert!(KANJI_TILES.windows(2).all(|w| w[0].0 < w[1].0));

    assert_eq!(kanji_for_tile(0x8e), Some('曹'));
    assert_eq!(kanji_for_tile(0x8d), Some('操'));
    assert_eq!(kanji_for_tile(0xe3), Some('劉'));
    assert_eq!(kanji_for_tile(0xff), Some('丕'));
    assert_eq!(kanji_for_tile(0x00), None);
    assert_eq!(kanji_for_tile(0x3d), None);
}

#[test]
fn test_decode_kana() {
    // ﾘｭｳﾋﾞ
    assert_eq!(decode_kana(&[0xd8, 0xad, 0xb3, 0xcb, 0xde, 0, 0xb1, 0xb1]), "ﾘｭｳﾋﾞ");
    // Bytes outside of the kana range are dropped
    assert_eq!(decode_kana(&[0x20, 0xa6, 0x41, 0xdf]), "ｦﾟ");
    assert_eq!(decode_kana(&[0; 8]), "");
}

#[test]
fn test_name_entry() {
    let mut rec = [0u8; 15];

    rec[..4].copy_from_slice(&[0xb6, 0xdd, 0xb3, 0x00]);
    rec[8] = 0x24;
    rec[10] = 0x05;
    rec[11] = 1;
    rec[14] = 44;

    let name = NameEntry::decode(43, &rec);

    assert_eq!(name.kana, "ｶﾝｳ");
    assert_eq!(name.kanji(), "關羽");
    assert_eq!(name.glyphs[1], GlyphRef { id: 0x05, page: 1 });
    assert_eq!(name.glyphs[2].id, 0);
    assert_eq!(name.portrait(), 43);

    assert_eq!(NameEntry::decode(0, &[0; 15]).portrait(), -1);
}

#[test]
fn test_read_all() {
    let mut data = crate::rom::blank_image();

    let off = NAMES.offset(3);
    data[off + 8] = 0xe3;
    data[off + 10] = 0xbd;
    data[off + 14] = 3;

    let rom = Rom::from_bytes(data).unwrap();
    let names = read_all(&rom);

    assert_eq!(names.len(), 257);
    assert_eq!(names[3].kanji(), "劉備");
    assert_eq!(names[3].portrait(), 2);
}
