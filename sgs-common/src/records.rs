//! Walk the entries of a fixed-stride record table

use crate::memmap::Table;

pub struct Record<'a> {
    pub index: usize,
    /// File offset of the first byte of the record
    pub offset: usize,
    pub bytes: &'a [u8],
}

pub struct RecordIter<'a> {
    data: &'a [u8],
    table: Table,
    index: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.count {
            return None;
        }

        let offset = self.table.offset(self.index);
        let end = offset + self.table.stride;

        // Truncated image, stop at the last complete record
        let bytes = self.data.get(offset..end)?;

        let r = Record {
            index: self.index,
            offset,
            bytes,
        };

        self.index += 1;

        Some(r)
    }
}

/// Iterate over the complete records of `table` found in `data`
pub fn get(data: &[u8], table: Table) -> RecordIter<'_> {
    RecordIter {
        data,
        table,
        index: 0,
    }
}

#[test]
fn test_record_iter() {
    let table = Table {
        base: 4,
        stride: 3,
        count: 4,
    };

    let data: Vec<u8> = (0..32).collect();

    let recs: Vec<_> = get(&data, table).collect();

    assert_eq!(recs.len(), 4);
    assert_eq!(recs[0].index, 0);
    assert_eq!(recs[0].offset, 4);
    assert_eq!(recs[0].bytes, &[4, 5, 6]);
    assert_eq!(recs[3].offset, 13);
    assert_eq!(recs[3].bytes, &[13, 14, 15]);
}

#[test]
fn test_record_iter_truncated() {
    let table = Table {
        base: 2,
        stride: 4,
        count: 100,
    };

    let data = [0u8; 13];

    // 2..6, 6..10, 10..14 doesn't fit
    assert_eq!(get(&data, table).count(), 2);
}
