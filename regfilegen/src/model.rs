//! Encodes information about memory mapped registers. This information is used to derive the
//! address space of a register file.

mod register;
mod width;

// Anything that's part of the public API of register is also part of the public API of model
pub use register::*;
pub use width::*;

use std::ops;

/// An ordered list of register declarations (newtype)
///
/// Order is preserved exactly as declared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers(Vec<Register>);

impl From<Vec<Register>> for Registers {
    fn from(value: Vec<Register>) -> Self {
        Self(value)
    }
}

impl FromIterator<Register> for Registers {
    fn from_iter<T: IntoIterator<Item = Register>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ops::Deref for Registers {
    type Target = Vec<Register>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
