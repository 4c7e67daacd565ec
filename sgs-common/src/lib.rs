//! Layout of the Sangokushi (KOEI, 1988) Famicom cartridge image, shared by the decoding library
//! and the command line tools.

pub mod error;
pub mod memmap;
pub mod records;
