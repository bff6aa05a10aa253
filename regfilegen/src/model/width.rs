use std::fmt;

use crate::error::InvalidWidthError;

/// Bit width of a single register and of the bus data path
///
/// Always a power of two of at least one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegisterWidth(u32);

impl RegisterWidth {
    /// Width used when none is given
    pub const DEFAULT_BITS: u32 = 32;

    /// # Errors
    ///
    /// - `bits` is not a power of two or is narrower than a byte
    pub const fn new(bits: u32) -> Result<Self, InvalidWidthError> {
        if bits < 8 || !bits.is_power_of_two() {
            return Err(InvalidWidthError { width: bits });
        }
        Ok(Self(bits))
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Number of bytes in a register, i.e., the byte address stride between registers
    #[must_use]
    pub const fn byte_width(self) -> u32 {
        self.0 / 8
    }

    /// Exact, since the byte width is a power of two
    #[must_use]
    pub const fn log2_byte_width(self) -> u32 {
        self.byte_width().trailing_zeros()
    }

    /// Whether `value` can be stored in a register of this width
    #[must_use]
    pub const fn can_represent(self, value: u64) -> bool {
        bits_required(value) <= self.0
    }
}

impl Default for RegisterWidth {
    fn default() -> Self {
        Self(Self::DEFAULT_BITS)
    }
}

impl TryFrom<u32> for RegisterWidth {
    type Error = InvalidWidthError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RegisterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bits", self.0)
    }
}

/// Number of bits needed to represent `val`
///
/// Equals `ceil(log2(val + 1))`, without the overflow at `u64::MAX`.
pub(crate) const fn bits_required(val: u64) -> u32 {
    u64::BITS - val.leading_zeros()
}

#[test]
fn bits_required_works() {
    let test = bits_required;

    assert_eq!(test(0), 0);
    assert_eq!(test(u64::MAX), 64);
    assert_eq!(test(u32::MAX.into()), 32);
    assert_eq!(test(u16::MAX.into()), 16);
    assert_eq!(test(u8::MAX.into()), 8);
    assert_eq!(test(0b1), 1);
    assert_eq!(test(0b10), 2);
    assert_eq!(test(0b11), 2);
    assert_eq!(test(0b100), 3);
    assert_eq!(test(0b101), 3);
}

#[test]
fn width_must_be_power_of_two() {
    for bits in [8, 16, 32, 64, 128, 1 << 20, 1 << 31] {
        assert!(RegisterWidth::new(bits).is_ok(), "{bits}");
    }
    for bits in [0, 1, 2, 4, 12, 24, 33, 48, 1000, (1 << 20) + 1, u32::MAX] {
        assert_eq!(
            RegisterWidth::new(bits),
            Err(InvalidWidthError { width: bits }),
            "{bits}"
        );
    }
}

#[test]
fn byte_geometry_is_derived() {
    let w = RegisterWidth::new(16).unwrap();
    assert_eq!(w.byte_width(), 2);
    assert_eq!(w.log2_byte_width(), 1);

    let w = RegisterWidth::default();
    assert_eq!(w.bits(), 32);
    assert_eq!(w.byte_width(), 4);
    assert_eq!(w.log2_byte_width(), 2);

    let w = RegisterWidth::new(8).unwrap();
    assert_eq!(w.byte_width(), 1);
    assert_eq!(w.log2_byte_width(), 0);
}

#[test]
fn values_are_checked_against_width() {
    let w = RegisterWidth::new(8).unwrap();
    assert!(w.can_represent(0xff));
    assert!(!w.can_represent(0x100));

    let w = RegisterWidth::new(64).unwrap();
    assert!(w.can_represent(u64::MAX));

    let w = RegisterWidth::new(128).unwrap();
    assert!(w.can_represent(u64::MAX));
}
