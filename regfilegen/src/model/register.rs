//! `Register` is the main primitive of the generator. It represents one addressable location in the
//! register file together with its access mode and reset value.

use std::fmt;

use crate::error::InvalidRegisterError;
use serde::Serialize;

/// Access policy tag of a register, e.g., `stat`, `trig` or `ctrl`
///
/// The tag is opaque to the address space planner and is handed to the template as is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Mode(String);

impl Mode {
    /// Read-only status, driven by hardware
    pub const STATUS: &'static str = "stat";
    /// Write-triggered pulse, reads back as zero
    pub const TRIGGER: &'static str = "trig";
    /// Read-write control
    pub const CONTROL: &'static str = "ctrl";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the built-in template knows how to implement this mode
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::STATUS | Self::TRIGGER | Self::CONTROL
        )
    }
}

impl From<&str> for Mode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a single memory-mapped register
///
/// Registers are immutable once constructed. Field names in the serialized form match the names
/// templates use (`addr`, `label`, `mode`, `initval`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Register {
    /// Register index in the register file, not a byte address
    #[serde(rename = "addr")]
    address: u64,
    label: String,
    mode: Mode,
    /// Value on reset
    initval: u64,
}

impl Register {
    /// Declare a register that resets to zero
    ///
    /// # Errors
    ///
    /// - `label` is empty
    pub fn new(
        address: u64,
        label: impl Into<String>,
        mode: impl Into<Mode>,
    ) -> Result<Self, InvalidRegisterError> {
        Self::with_initval(address, label, mode, 0)
    }

    /// Declare a register with an explicit reset value
    ///
    /// Whether `initval` fits in the register is only known once the register width is known, see
    /// [`crate::plan`].
    ///
    /// # Errors
    ///
    /// - `label` is empty
    pub fn with_initval(
        address: u64,
        label: impl Into<String>,
        mode: impl Into<Mode>,
        initval: u64,
    ) -> Result<Self, InvalidRegisterError> {
        let label = label.into();
        if label.is_empty() {
            return Err(InvalidRegisterError::EmptyLabel { address });
        }
        Ok(Self {
            address,
            label,
            mode: mode.into(),
            initval,
        })
    }

    /// Declare a register from signed integers, e.g., as read from a loosely typed source
    ///
    /// # Errors
    ///
    /// - `address` or `initval` is negative or does not fit in 64 bits
    /// - `label` is empty
    pub fn try_from_signed(
        address: i128,
        label: impl Into<String>,
        mode: impl Into<Mode>,
        initval: i128,
    ) -> Result<Self, InvalidRegisterError> {
        let label = label.into();
        let address = to_u64(address, &label, "address")?;
        let initval = to_u64(initval, &label, "initval")?;
        Self::with_initval(address, label, mode, initval)
    }

    #[must_use]
    pub const fn address(&self) -> u64 {
        self.address
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    #[must_use]
    pub const fn initval(&self) -> u64 {
        self.initval
    }

    /// Number of characters in the label, used for column alignment
    pub(crate) fn label_width(&self) -> usize {
        self.label.chars().count()
    }
}

fn to_u64(value: i128, label: &str, field: &'static str) -> Result<u64, InvalidRegisterError> {
    if value < 0 {
        return Err(InvalidRegisterError::Negative {
            label: label.to_owned(),
            field,
            value,
        });
    }
    u64::try_from(value).map_err(|_| InvalidRegisterError::TooLarge {
        label: label.to_owned(),
        field,
        value,
    })
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ address: {:#x}, label: {}, mode: {}, initval: {:#x} }}",
            self.address, self.label, self.mode, self.initval
        )
    }
}

#[test]
fn register_defaults_to_zero_reset() {
    let reg = Register::new(2, "ctrl1", Mode::CONTROL).unwrap();
    assert_eq!(reg.address(), 2);
    assert_eq!(reg.label(), "ctrl1");
    assert_eq!(reg.mode().as_str(), "ctrl");
    assert_eq!(reg.initval(), 0);
}

#[test]
fn register_rejects_empty_label() {
    assert_eq!(
        Register::new(3, "", Mode::STATUS),
        Err(InvalidRegisterError::EmptyLabel { address: 3 })
    );
}

#[test]
fn register_rejects_negative_fields() {
    assert!(matches!(
        Register::try_from_signed(-1, "status", Mode::STATUS, 0),
        Err(InvalidRegisterError::Negative {
            field: "address",
            value: -1,
            ..
        })
    ));
    assert!(matches!(
        Register::try_from_signed(0, "status", Mode::STATUS, -5),
        Err(InvalidRegisterError::Negative {
            field: "initval",
            value: -5,
            ..
        })
    ));
    assert!(matches!(
        Register::try_from_signed(i128::from(u64::MAX) + 1, "status", Mode::STATUS, 0),
        Err(InvalidRegisterError::TooLarge {
            field: "address",
            ..
        })
    ));
    assert_eq!(
        Register::try_from_signed(7, "start", Mode::TRIGGER, 0x2a).unwrap(),
        Register::with_initval(7, "start", Mode::TRIGGER, 0x2a).unwrap()
    );
}

#[test]
fn label_width_counts_chars() {
    assert_eq!(Register::new(0, "status", "stat").unwrap().label_width(), 6);
    assert_eq!(Register::new(0, "tila_ä", "stat").unwrap().label_width(), 6);
}

#[test]
fn builtin_modes_are_recognized() {
    assert!(Mode::from("stat").is_builtin());
    assert!(Mode::from("trig").is_builtin());
    assert!(Mode::from("ctrl").is_builtin());
    assert!(!Mode::from("CTRL").is_builtin());
    assert!(!Mode::from("fifo").is_builtin());
}
