//! Register file declarations read from JSON
//!
//! ```json
//! {
//!     "module": "regfile",
//!     "register_width": 32,
//!     "registers": [
//!         { "address": 0, "label": "status", "mode": "stat" },
//!         { "address": 1, "label": "start", "mode": "trig" },
//!         { "address": 2, "label": "ctrl1", "mode": "ctrl", "initval": "0x2a" }
//!     ]
//! }
//! ```
//!
//! `register_width` defaults to 32 and `initval` to 0. Integers may be given as JSON numbers or as
//! strings in decimal, `0x` hexadecimal or `0b` binary notation, with `_` separators.

use std::path;

use crate::{
    error::ParseDeclError,
    model::{Mode, Register, RegisterWidth, Registers},
    util,
};
use json::JsonValue;
use log::debug;

/// A register file as declared by the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegfileDecl {
    pub module: String,
    /// Not validated until planning
    pub register_width: u32,
    pub registers: Registers,
}

impl RegfileDecl {
    pub fn new(module: impl Into<String>, register_width: u32, registers: Registers) -> Self {
        Self {
            module: module.into(),
            register_width,
            registers,
        }
    }

    /// # Errors
    ///
    /// - `text` is not JSON or does not follow the declaration format
    pub fn from_json_str(text: &str) -> Result<Self, ParseDeclError> {
        Self::try_from(json::parse(text)?)
    }

    /// # Errors
    ///
    /// - The file cannot be read
    /// - The file does not follow the declaration format
    pub fn from_file(path: &path::Path) -> Result<Self, crate::ApiError> {
        let text = util::read_file(path)?;
        let decl = Self::from_json_str(&text)?;
        debug!(
            "read {} register declarations from {}",
            decl.registers.len(),
            path.display()
        );
        Ok(decl)
    }

    /// Declaration in the same format [`Self::from_json_str`] accepts
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let registers: Vec<JsonValue> = self
            .registers
            .iter()
            .map(|reg| {
                json::object! {
                    address: reg.address(),
                    label: reg.label(),
                    mode: reg.mode().as_str(),
                    initval: format!("{:#x}", reg.initval()),
                }
            })
            .collect();
        json::object! {
            module: self.module.as_str(),
            register_width: self.register_width,
            registers: registers,
        }
    }
}

impl TryFrom<JsonValue> for RegfileDecl {
    type Error = ParseDeclError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let JsonValue::Object(obj) = &value else {
            return Err(ParseDeclError::ExpectedObject("register file".to_owned()));
        };
        let module = get_str(obj, "module")?.to_owned();
        let register_width = match obj.get("register_width") {
            Some(v) => {
                let w = get_int(v, "register_width")?;
                u32::try_from(w).map_err(|_| ParseDeclError::WidthOverflow(w))?
            }
            None => RegisterWidth::DEFAULT_BITS,
        };
        let registers = match obj.get("registers") {
            Some(JsonValue::Array(array)) => array
                .iter()
                .enumerate()
                .map(|(index, value)| match value {
                    JsonValue::Object(obj) => register_from_object(obj, index),
                    _ => Err(ParseDeclError::ExpectedObject(format!("register #{index}"))),
                })
                .collect::<Result<Registers, _>>()?,
            Some(_) => return Err(ParseDeclError::ExpectedArray("registers".to_owned())),
            None => return Err(ParseDeclError::FieldNotFound("registers".to_owned())),
        };
        Ok(Self {
            module,
            register_width,
            registers,
        })
    }
}

fn register_from_object(
    obj: &json::object::Object,
    index: usize,
) -> Result<Register, ParseDeclError> {
    let get_field = |field: &str| -> Result<&JsonValue, ParseDeclError> {
        obj.get(field)
            .ok_or_else(|| ParseDeclError::FieldNotFound(format!("register #{index}: {field}")))
    };
    let get_str_field = |field: &str| -> Result<&str, ParseDeclError> {
        get_field(field)?
            .as_str()
            .ok_or_else(|| ParseDeclError::ExpectedString(format!("register #{index}: {field}")))
    };
    let address = get_int(get_field("address")?, "address")?;
    let label = get_str_field("label")?;
    let mode = get_str_field("mode")?;
    let initval = match obj.get("initval") {
        Some(v) => get_int(v, "initval")?,
        None => 0,
    };
    Register::try_from_signed(address, label, Mode::new(mode), initval)
        .map_err(|err| ParseDeclError::InvalidRegister { index, err })
}

fn get_str<'a>(obj: &'a json::object::Object, field: &str) -> Result<&'a str, ParseDeclError> {
    obj.get(field)
        .ok_or_else(|| ParseDeclError::FieldNotFound(field.to_owned()))?
        .as_str()
        .ok_or_else(|| ParseDeclError::ExpectedString(field.to_owned()))
}

/// Read an integer from a JSON number or string
fn get_int(value: &JsonValue, field: &str) -> Result<i128, ParseDeclError> {
    let err = || ParseDeclError::InvalidInteger {
        field: field.to_owned(),
        text: value.dump(),
    };
    match value {
        JsonValue::Number(n) => {
            let (positive, mantissa, exponent) = n.as_parts();
            if exponent != 0 {
                return Err(err());
            }
            let mantissa = i128::from(mantissa);
            Ok(if positive { mantissa } else { -mantissa })
        }
        JsonValue::String(_) | JsonValue::Short(_) => {
            value.as_str().and_then(parse_int).ok_or_else(err)
        }
        _ => Err(err()),
    }
}

/// Parses an integer literal in decimal, `0x` hexadecimal or `0b` binary notation
fn parse_int(text: &str) -> Option<i128> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(d) = text.strip_prefix("0x").or(text.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = text.strip_prefix("0b").or(text.strip_prefix("0B")) {
        (2, d)
    } else {
        (10, text)
    };
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let value = i128::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

#[test]
fn parse_int_works() {
    assert_eq!(parse_int("42"), Some(42));
    assert_eq!(parse_int("0x2a"), Some(42));
    assert_eq!(parse_int("0X2A"), Some(42));
    assert_eq!(parse_int("0b101010"), Some(42));
    assert_eq!(parse_int("0xdead_beef"), Some(0xdead_beef));
    assert_eq!(parse_int(" +7 "), Some(7));
    assert_eq!(parse_int("-3"), Some(-3));
    assert_eq!(parse_int("0xffffffffffffffff"), Some(i128::from(u64::MAX)));
    assert_eq!(parse_int(""), None);
    assert_eq!(parse_int("0x"), None);
    assert_eq!(parse_int("--3"), None);
    assert_eq!(parse_int("0x-3"), None);
    assert_eq!(parse_int("twelve"), None);
}

#[test]
fn reference_declaration_parses() {
    let text = indoc::indoc! {r#"
        {
            "module": "regfile",
            "register_width": 32,
            "registers": [
                { "address": 0, "label": "status", "mode": "stat" },
                { "address": 1, "label": "start", "mode": "trig" },
                { "address": 2, "label": "ctrl1", "mode": "ctrl", "initval": "0x2a" }
            ]
        }
    "#};
    let decl = RegfileDecl::from_json_str(text).unwrap();
    assert_eq!(decl.module, "regfile");
    assert_eq!(decl.register_width, 32);
    assert_eq!(
        *decl.registers,
        vec![
            Register::new(0, "status", "stat").unwrap(),
            Register::new(1, "start", "trig").unwrap(),
            Register::with_initval(2, "ctrl1", "ctrl", 0x2a).unwrap(),
        ]
    );
}

#[test]
fn declaration_defaults_apply() {
    let decl = RegfileDecl::from_json_str(
        r#"{ "module": "m", "registers": [ { "address": 3, "label": "a", "mode": "ctrl" } ] }"#,
    )
    .unwrap();
    assert_eq!(decl.register_width, RegisterWidth::DEFAULT_BITS);
    assert_eq!(decl.registers[0].initval(), 0);
}

#[test]
fn declaration_round_trips_through_json() {
    let decl = RegfileDecl::new(
        "rt",
        16,
        vec![Register::with_initval(4, "x", "ctrl", 0xbeef).unwrap()].into(),
    );
    assert_eq!(
        RegfileDecl::from_json_str(&decl.to_json().dump()).unwrap(),
        decl
    );
}

#[test]
fn malformed_declarations_fail() {
    let parse = RegfileDecl::from_json_str;

    assert!(matches!(parse("{"), Err(ParseDeclError::Json(_))));
    assert!(matches!(parse("[]"), Err(ParseDeclError::ExpectedObject(_))));
    assert!(matches!(
        parse(r#"{ "module": "m" }"#),
        Err(ParseDeclError::FieldNotFound(f)) if f == "registers"
    ));
    assert!(matches!(
        parse(r#"{ "module": "m", "registers": {} }"#),
        Err(ParseDeclError::ExpectedArray(_))
    ));
    assert!(matches!(
        parse(r#"{ "module": 3, "registers": [] }"#),
        Err(ParseDeclError::ExpectedString(f)) if f == "module"
    ));
    assert!(matches!(
        parse(r#"{ "module": "m", "registers": [ { "label": "a", "mode": "ctrl" } ] }"#),
        Err(ParseDeclError::FieldNotFound(_))
    ));
    assert!(matches!(
        parse(r#"{ "module": "m", "registers": [ { "address": 1.5, "label": "a", "mode": "ctrl" } ] }"#),
        Err(ParseDeclError::InvalidInteger { .. })
    ));
    assert!(matches!(
        parse(r#"{ "module": "m", "register_width": -8, "registers": [] }"#),
        Err(ParseDeclError::WidthOverflow(-8))
    ));
}

#[test]
fn invalid_registers_are_reported_with_index() {
    let parse = RegfileDecl::from_json_str;

    assert!(matches!(
        parse(r#"{ "module": "m", "registers": [
            { "address": 0, "label": "a", "mode": "ctrl" },
            { "address": -1, "label": "b", "mode": "ctrl" } ] }"#),
        Err(ParseDeclError::InvalidRegister {
            index: 1,
            err: crate::error::InvalidRegisterError::Negative { field: "address", .. }
        })
    ));
    assert!(matches!(
        parse(r#"{ "module": "m", "registers": [ { "address": 0, "label": "", "mode": "ctrl" } ] }"#),
        Err(ParseDeclError::InvalidRegister {
            index: 0,
            err: crate::error::InvalidRegisterError::EmptyLabel { address: 0 }
        })
    ));
}

#[test]
fn missing_register_fields_name_the_register() {
    let parse = RegfileDecl::from_json_str;

    for (decl, field) in [
        (r#"{ "label": "a", "mode": "ctrl" }"#, "address"),
        (r#"{ "address": 0, "mode": "ctrl" }"#, "label"),
        (r#"{ "address": 0, "label": "a" }"#, "mode"),
    ] {
        let text = format!(
            r#"{{ "module": "m", "registers": [ {{ "address": 9, "label": "z", "mode": "stat" }}, {decl} ] }}"#
        );
        assert!(
            matches!(
                parse(&text),
                Err(ParseDeclError::FieldNotFound(f)) if f == format!("register #1: {field}")
            ),
            "{field}"
        );
    }
    assert!(matches!(
        parse(r#"{ "module": "m", "registers": [ { "address": 0, "label": 7, "mode": "ctrl" } ] }"#),
        Err(ParseDeclError::ExpectedString(f)) if f == "register #0: label"
    ));
}
