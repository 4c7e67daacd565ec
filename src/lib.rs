//! Decoders for the tables and graphics of the Sangokushi (KOEI, 1988) Famicom cartridge.
//!
//! Everything here works on an in-memory copy of the iNES image: fixed offset tables are walked,
//! 2bpp tiles are decoded and composed into glyphs and portraits, and the results are handed back
//! as plain structs and RGB images for the tools to dump.

#[macro_use]
extern crate static_assertions;
#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod bitmap;
pub mod character;
pub mod explorer;
pub mod generator;
pub mod kanji;
pub mod matcher;
pub mod metatile;
pub mod mob;
pub mod names;
pub mod portrait;
pub mod rom;
pub mod tile;

pub use rom::Rom;
