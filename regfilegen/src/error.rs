use std::path;

use thiserror::Error;

/// A single register declaration has malformed fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRegisterError {
    #[error("register at address {address:#x} has an empty label")]
    EmptyLabel { address: u64 },
    #[error("register '{label}' has a negative {field}: {value}")]
    Negative {
        label: String,
        field: &'static str,
        value: i128,
    },
    #[error("register '{label}' has a {field} that does not fit in 64 bits: {value}")]
    TooLarge {
        label: String,
        field: &'static str,
        value: i128,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("register width must be a power of two and at least 8 bits, got {width}")]
pub struct InvalidWidthError {
    pub width: u32,
}

/// Error that happened while deriving the address space of a register file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("zero registers were supplied, cannot plan an empty register file")]
    EmptyRegisterSet,
    #[error("invalid register width")]
    InvalidWidth(#[from] InvalidWidthError),
    #[error("registers '{first}' and '{second}' share address {address:#x}")]
    DuplicateAddress {
        address: u64,
        first: String,
        second: String,
    },
    #[error("label '{label}' is declared at both {first:#x} and {second:#x}")]
    DuplicateLabel {
        label: String,
        first: u64,
        second: u64,
    },
    #[error(
        "reset value {initval:#x} of register '{label}' at {address:#x} does not fit in {register_width} bits"
    )]
    ValueOutOfRange {
        address: u64,
        label: String,
        initval: u64,
        register_width: u32,
    },
    #[error(
        "overflow: {addr_bits} register index bits + {log2_register_byte_width} byte offset bits do not fit a 64-bit bus address"
    )]
    AddrWidthOverflow {
        addr_bits: u32,
        log2_register_byte_width: u32,
    },
}

/// Error that happened while reading a register declaration file
#[derive(Error, Debug)]
pub enum ParseDeclError {
    #[error("malformed JSON")]
    Json(#[from] json::Error),
    #[error("expected an object for {0}")]
    ExpectedObject(String),
    #[error("expected an array for {0}")]
    ExpectedArray(String),
    #[error("expected a string for {0}")]
    ExpectedString(String),
    #[error("field '{0}' not found")]
    FieldNotFound(String),
    #[error("cannot parse an integer for '{field}' from {text}")]
    InvalidInteger { field: String, text: String },
    #[error("register width {0} does not fit in 32 bits")]
    WidthOverflow(i128),
    #[error("register #{index} is invalid")]
    InvalidRegister {
        index: usize,
        #[source]
        err: InvalidRegisterError,
    },
}

/// Error that happened while rendering a template
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template engine failure")]
    Tera(#[from] tera::Error),
    #[error("template directory path is not valid UTF-8: {0:?}")]
    NonUtf8Path(path::PathBuf),
    #[error("template '{name}' not found in {dir:?}")]
    TemplateNotFound { name: String, dir: path::PathBuf },
}
