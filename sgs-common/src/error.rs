use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The image doesn't start with `NES\x1a`
    BadMagic,
    /// Attempted to read `len` bytes at `offset`, past the end of the image
    OutOfBounds { offset: usize, len: usize },
    /// Banked pointer outside of the $8000-$FFFF PRG window
    BadPointer { bank: u8, addr: u16 },
    /// Global component index past the end of its table
    ComponentOutOfRange { kind: &'static str, index: usize },
    /// Portrait group letter we don't have a base address for
    UnknownGroup(char),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodeError::BadMagic => write!(f, "not an iNES image (bad magic)"),
            DecodeError::OutOfBounds { offset, len } => {
                write!(f, "read of {}B at 0x{:05x} is out of bounds", len, offset)
            }
            DecodeError::BadPointer { bank, addr } => {
                write!(f, "pointer {:02x}:{:04x} is outside of the PRG window", bank, addr)
            }
            DecodeError::ComponentOutOfRange { kind, index } => {
                write!(f, "{} index {} is out of range", kind, index)
            }
            DecodeError::UnknownGroup(g) => write!(f, "unknown portrait group `{}`", g),
        }
    }
}

impl std::error::Error for DecodeError {}

pub type DecodeResult<T> = Result<T, DecodeError>;

#[test]
fn test_display() {
    let e = DecodeError::OutOfBounds {
        offset: 0x3a314,
        len: 15,
    };

    assert_eq!(e.to_string(), "read of 15B at 0x3a314 is out of bounds");

    let e = DecodeError::BadPointer {
        bank: 6,
        addr: 0x1234,
    };

    assert_eq!(e.to_string(), "pointer 06:1234 is outside of the PRG window");
}
