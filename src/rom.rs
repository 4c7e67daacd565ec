//! iNES cartridge image

use anyhow::{Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use sgs_common::error::{DecodeError, DecodeResult};
use sgs_common::memmap::{INES_HEADER_LEN, INES_MAGIC, PRG_BANK_LEN, PRG_WINDOW_BASE, TILE_LEN};
use std::fs;
use std::path::Path;

/// Where the tools look for the cartridge when no path is given
pub const DEFAULT_ROM_PATH: &str = "Sangokushi (Japan).nes";

pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Rom> {
        let path = path.as_ref();

        let data =
            fs::read(path).with_context(|| format!("Can't open ROM `{}`", path.display()))?;

        let rom = Rom::from_bytes(data)
            .with_context(|| format!("`{}` is not a usable cartridge image", path.display()))?;

        debug!("Loaded `{}` ({} bytes)", path.display(), rom.len());

        Ok(rom)
    }

    pub fn from_bytes(data: Vec<u8>) -> DecodeResult<Rom> {
        if data.len() < INES_HEADER_LEN || data[..4] != INES_MAGIC {
            return Err(DecodeError::BadMagic);
        }

        let rom = Rom { data };

        debug!(
            "iNES header: {} PRG bank(s), {} CHR bank(s), mapper {}",
            rom.prg_banks(),
            rom.chr_banks(),
            rom.mapper()
        );

        Ok(rom)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of 16KiB PRG banks announced by the header
    pub fn prg_banks(&self) -> u8 {
        self.data[4]
    }

    /// Number of 8KiB CHR banks, 0 for CHR-RAM carts like this one
    pub fn chr_banks(&self) -> u8 {
        self.data[5]
    }

    pub fn mapper(&self) -> u8 {
        (self.data[6] >> 4) | (self.data[7] & 0xf0)
    }

    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub fn slice(&self, offset: usize, len: usize) -> DecodeResult<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(DecodeError::OutOfBounds { offset, len })
    }

    pub fn read_u16_le(&self, offset: usize) -> DecodeResult<u16> {
        self.slice(offset, 2).map(LittleEndian::read_u16)
    }

    /// The 16 bytes of the 2bpp tile at `offset`. Tiles running past the end of the image come
    /// back empty and decode to a blank tile.
    pub fn tile(&self, offset: usize) -> &[u8] {
        self.slice(offset, TILE_LEN).unwrap_or(&[])
    }

    /// `count` consecutive tiles starting at `offset`
    pub fn tiles(&self, offset: usize, count: usize) -> impl Iterator<Item = &[u8]> + '_ {
        (0..count).map(move |i| self.tile(offset + i * TILE_LEN))
    }
}

/// Convert a banked pointer (bank number + address in the $8000 window) to a file offset
pub fn prg_file_offset(bank: u8, addr: u16) -> DecodeResult<usize> {
    if addr < PRG_WINDOW_BASE {
        return Err(DecodeError::BadPointer { bank, addr });
    }

    let window_off = usize::from(addr - PRG_WINDOW_BASE);

    Ok(usize::from(bank) * PRG_BANK_LEN + window_off + INES_HEADER_LEN)
}

/// Blank 256KiB mapper 1 image for the unit tests
#[cfg(test)]
pub(crate) fn blank_image() -> Vec<u8> {
    use sgs_common::memmap::PRG_ROM;

    let mut data = vec![0u8; PRG_ROM.end()];

    data[..4].copy_from_slice(&INES_MAGIC);
    data[4] = 16;
    data[6] = 0x10;

    data
}

#[test]
fn test_header() {
    let rom = Rom::from_bytes(blank_image()).unwrap();

    assert_eq!(rom.len(), 0x40010);
    assert_eq!(rom.prg_banks(), 16);
    assert_eq!(rom.chr_banks(), 0);
    assert_eq!(rom.mapper(), 1);
}

#[test]
fn test_bad_magic() {
    let mut data = blank_image();

    data[3] = 0x1b;

    assert_eq!(Rom::from_bytes(data).err(), Some(DecodeError::BadMagic));
    assert_eq!(Rom::from_bytes(vec![b'N', b'E']).err(), Some(DecodeError::BadMagic));
}

#[test]
fn test_missing_file() {
    let e = Rom::from_path("this/rom/does/not/exist.nes").err().unwrap();

    assert!(e.to_string().contains("this/rom/does/not/exist.nes"));
}

#[test]
fn test_bounds() {
    let mut data = blank_image();
    let len = data.len();

    data[len - 2] = 0x34;
    data[len - 1] = 0x12;

    let rom = Rom::from_bytes(data).unwrap();

    assert_eq!(rom.read_u16_le(len - 2), Ok(0x1234));
    assert_eq!(
        rom.read_u16_le(len - 1),
        Err(DecodeError::OutOfBounds {
            offset: len - 1,
            len: 2
        })
    );
    assert_eq!(rom.byte(len), None);
    assert_eq!(rom.tile(len - 8), &[] as &[u8]);
    assert_eq!(rom.tile(len - 16).len(), 16);
}

#[test]
fn test_prg_file_offset() {
    assert_eq!(prg_file_offset(0, 0x8000), Ok(0x10));
    assert_eq!(prg_file_offset(7, 0x8000), Ok(0x1c010));
    assert_eq!(prg_file_offset(6, 0xbfff), Ok(0x1c00f));
    assert_eq!(
        prg_file_offset(6, 0x7fff),
        Err(DecodeError::BadPointer {
            bank: 6,
            addr: 0x7fff
        })
    );
}
