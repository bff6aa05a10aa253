//! Derives the address space geometry of a register file
//!
//! The planner validates a full register set against a register width and resolves every parameter
//! the template needs into a [`GenerationDescriptor`].

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    error::PlanError,
    model::{bits_required, Register, RegisterWidth, Registers},
};
use log::debug;

/// Widest bus address the planner will produce
pub const MAX_ADDR_WIDTH: u32 = u64::BITS;

/// Fully resolved parameters for rendering one register file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationDescriptor {
    module_name: String,
    register_width: RegisterWidth,
    /// `ceil(log2(max(address) + 1))`
    addr_bits: u32,
    axi_addr_width: u32,
    num_registers: u64,
    label_column_width: usize,
    registers: Registers,
}

impl GenerationDescriptor {
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub const fn register_width(&self) -> u32 {
        self.register_width.bits()
    }

    #[must_use]
    pub const fn register_byte_width(&self) -> u32 {
        self.register_width.byte_width()
    }

    #[must_use]
    pub const fn log2_register_byte_width(&self) -> u32 {
        self.register_width.log2_byte_width()
    }

    /// Number of bits used to select a register, excluding the byte offset
    #[must_use]
    pub const fn addr_bits(&self) -> u32 {
        self.addr_bits
    }

    /// Number of bits in a byte address on the bus
    #[must_use]
    pub const fn axi_addr_width(&self) -> u32 {
        self.axi_addr_width
    }

    /// Register count padded up to a power of two
    #[must_use]
    pub const fn num_registers(&self) -> u64 {
        self.num_registers
    }

    /// Length of the longest label
    #[must_use]
    pub const fn label_column_width(&self) -> usize {
        self.label_column_width
    }

    /// Registers in declaration order
    #[must_use]
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Byte address of `reg` on the bus
    ///
    /// Wider than `u64` so that offsets of a full 64-bit address space cannot overflow.
    #[must_use]
    pub fn byte_offset(&self, reg: &Register) -> u128 {
        u128::from(reg.address()) << self.log2_register_byte_width()
    }

    /// JSON summary of the derived geometry
    #[must_use]
    pub fn to_json(&self) -> json::JsonValue {
        let registers: Vec<json::JsonValue> = self
            .registers
            .iter()
            .map(|reg| {
                json::object! {
                    address: reg.address(),
                    byte_offset: format!("{:#x}", self.byte_offset(reg)),
                    label: reg.label(),
                    mode: reg.mode().as_str(),
                    initval: format!("{:#x}", reg.initval()),
                }
            })
            .collect();
        json::object! {
            module_name: self.module_name.as_str(),
            register_width: self.register_width(),
            register_byte_width: self.register_byte_width(),
            log2_register_byte_width: self.log2_register_byte_width(),
            addr_bits: self.addr_bits,
            axi_addr_width: self.axi_addr_width,
            num_registers: self.num_registers,
            label_column_width: self.label_column_width,
            registers: registers,
        }
    }
}

/// Validate `registers` against `register_width` and derive the address space of the register file
///
/// All preconditions are checked before anything is derived, in this order: non-empty set, valid
/// width, unique addresses, unique labels, reset values that fit in the width. The first violation
/// is returned.
///
/// # Arguments
///
/// * `module_name` - Name of the generated hardware module, passed through unmodified
/// * `registers` - Register declarations; order is preserved in the result
/// * `register_width` - Bit width of one register, must be a power of two
///
/// # Errors
///
/// See [`PlanError`].
pub fn plan(
    module_name: &str,
    registers: &[Register],
    register_width: u32,
) -> Result<GenerationDescriptor, PlanError> {
    let max_addr = registers
        .iter()
        .map(Register::address)
        .max()
        .ok_or(PlanError::EmptyRegisterSet)?;
    let width = RegisterWidth::new(register_width)?;
    check_unique_addresses(registers)?;
    check_unique_labels(registers)?;
    check_values_fit(registers, width)?;

    let log2_register_byte_width = width.log2_byte_width();
    let addr_bits = bits_required(max_addr);
    let overflow = PlanError::AddrWidthOverflow {
        addr_bits,
        log2_register_byte_width,
    };
    let axi_addr_width = addr_bits + log2_register_byte_width;
    if axi_addr_width > MAX_ADDR_WIDTH {
        return Err(overflow);
    }
    let num_registers = 1u64.checked_shl(addr_bits).ok_or(overflow)?;
    let label_column_width = registers
        .iter()
        .map(Register::label_width)
        .max()
        .unwrap_or_default();

    debug!(
        "planned '{module_name}': {} registers padded to {num_registers}, {axi_addr_width}-bit bus address, {width} per register",
        registers.len()
    );

    Ok(GenerationDescriptor {
        module_name: module_name.to_owned(),
        register_width: width,
        addr_bits,
        axi_addr_width,
        num_registers,
        label_column_width,
        registers: registers.iter().cloned().collect(),
    })
}

fn check_unique_addresses(registers: &[Register]) -> Result<(), PlanError> {
    let mut seen: HashMap<u64, &Register> = HashMap::with_capacity(registers.len());
    for reg in registers {
        match seen.entry(reg.address()) {
            Entry::Occupied(first) => {
                return Err(PlanError::DuplicateAddress {
                    address: reg.address(),
                    first: first.get().label().to_owned(),
                    second: reg.label().to_owned(),
                })
            }
            Entry::Vacant(v) => {
                v.insert(reg);
            }
        }
    }
    Ok(())
}

/// Labels are compared case-sensitively
fn check_unique_labels(registers: &[Register]) -> Result<(), PlanError> {
    let mut seen: HashMap<&str, &Register> = HashMap::with_capacity(registers.len());
    for reg in registers {
        match seen.entry(reg.label()) {
            Entry::Occupied(first) => {
                return Err(PlanError::DuplicateLabel {
                    label: reg.label().to_owned(),
                    first: first.get().address(),
                    second: reg.address(),
                })
            }
            Entry::Vacant(v) => {
                v.insert(reg);
            }
        }
    }
    Ok(())
}

fn check_values_fit(registers: &[Register], width: RegisterWidth) -> Result<(), PlanError> {
    match registers
        .iter()
        .find(|reg| !width.can_represent(reg.initval()))
    {
        Some(reg) => Err(PlanError::ValueOutOfRange {
            address: reg.address(),
            label: reg.label().to_owned(),
            initval: reg.initval(),
            register_width: width.bits(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
fn regs(decls: &[(u64, &str, &str)]) -> Vec<Register> {
    decls
        .iter()
        .map(|&(addr, label, mode)| Register::new(addr, label, mode).unwrap())
        .collect()
}

#[test]
fn reference_example_plans() {
    let registers = regs(&[(0, "status", "stat"), (1, "start", "trig"), (2, "ctrl1", "ctrl")]);
    let desc = plan("regfile", &registers, 32).unwrap();

    assert_eq!(desc.module_name(), "regfile");
    assert_eq!(desc.register_width(), 32);
    assert_eq!(desc.register_byte_width(), 4);
    assert_eq!(desc.log2_register_byte_width(), 2);
    assert_eq!(desc.addr_bits(), 2);
    assert_eq!(desc.axi_addr_width(), 4);
    assert_eq!(desc.num_registers(), 4);
    assert_eq!(desc.label_column_width(), 6);
    assert_eq!(desc.registers(), registers.as_slice());
}

#[test]
fn single_register_at_zero_has_no_index_bits() {
    let desc = plan("one", &regs(&[(0, "only", "ctrl")]), 32).unwrap();
    assert_eq!(desc.addr_bits(), 0);
    assert_eq!(desc.num_registers(), 1);
    assert_eq!(desc.axi_addr_width(), 2);
}

#[test]
fn sixteen_bit_registers_plan() {
    let desc = plan("r16", &regs(&[(0, "a", "ctrl"), (1, "b", "ctrl"), (2, "c", "ctrl")]), 16)
        .unwrap();
    assert_eq!(desc.register_byte_width(), 2);
    assert_eq!(desc.addr_bits(), 2);
    assert_eq!(desc.num_registers(), 4);
    assert_eq!(desc.axi_addr_width(), 3);
}

#[test]
fn address_space_is_padded_to_power_of_two() {
    for max_addr in [0u64, 1, 2, 3, 4, 5, 7, 8, 9, 31, 32, 33, 1000, 1 << 40, (1 << 40) + 1] {
        let registers = regs(&[(max_addr, "top", "ctrl")]);
        let desc = plan("pad", &registers, 32).unwrap();
        let n = desc.num_registers();
        assert!(n.is_power_of_two(), "{max_addr}: {n}");
        assert!(n > max_addr, "{max_addr}: {n}");
        // Smallest such power of two
        assert!(n == 1 || n / 2 <= max_addr, "{max_addr}: {n}");
        assert_eq!(
            1u64 << (desc.axi_addr_width() - desc.log2_register_byte_width()),
            n
        );
    }
}

#[test]
fn addresses_need_not_be_contiguous_or_sorted() {
    let registers = regs(&[(9, "late", "ctrl"), (0, "early", "stat")]);
    let desc = plan("sparse", &registers, 64).unwrap();
    assert_eq!(desc.addr_bits(), 4);
    assert_eq!(desc.num_registers(), 16);
    assert_eq!(desc.axi_addr_width(), 7);
    assert_eq!(desc.registers()[0].label(), "late");
    assert_eq!(desc.registers()[1].label(), "early");
}

#[test]
fn plan_is_pure() {
    let registers = regs(&[(0, "status", "stat"), (5, "start", "trig")]);
    let first = plan("regfile", &registers, 32).unwrap();
    let _discarded = plan("regfile", &registers, 32).unwrap();
    let third = plan("regfile", &registers, 32).unwrap();
    assert_eq!(first, third);
    assert_eq!(first.to_json().dump(), third.to_json().dump());
}

#[test]
fn label_column_width_is_longest_label() {
    let desc = plan(
        "regfile",
        &regs(&[(0, "status", "stat"), (1, "start", "trig"), (2, "ctrl1", "ctrl")]),
        32,
    )
    .unwrap();
    assert_eq!(desc.label_column_width(), 6);

    let desc = plan("regfile", &regs(&[(0, "x", "stat"), (1, "a_long_label", "ctrl")]), 32)
        .unwrap();
    assert_eq!(desc.label_column_width(), 12);
}

#[test]
fn empty_register_set_fails() {
    assert_eq!(plan("empty", &[], 32), Err(PlanError::EmptyRegisterSet));
    // Emptiness is reported before the width
    assert_eq!(plan("empty", &[], 24), Err(PlanError::EmptyRegisterSet));
}

#[test]
fn non_power_of_two_width_fails() {
    let registers = regs(&[(0, "status", "stat")]);
    for width in [0, 4, 24, 31, 33, 96] {
        assert!(
            matches!(
                plan("w", &registers, width),
                Err(PlanError::InvalidWidth(e)) if e.width == width
            ),
            "{width}"
        );
    }
}

#[test]
fn duplicate_address_fails() {
    let registers = regs(&[(5, "a", "ctrl"), (1, "b", "ctrl"), (5, "c", "stat")]);
    assert_eq!(
        plan("dup", &registers, 32),
        Err(PlanError::DuplicateAddress {
            address: 5,
            first: "a".to_owned(),
            second: "c".to_owned(),
        })
    );
}

#[test]
fn duplicate_label_fails() {
    let registers = regs(&[(0, "ctrl", "ctrl"), (1, "ctrl", "ctrl")]);
    assert_eq!(
        plan("dup", &registers, 32),
        Err(PlanError::DuplicateLabel {
            label: "ctrl".to_owned(),
            first: 0,
            second: 1,
        })
    );

    // Labels are case-sensitive
    let registers = regs(&[(0, "ctrl", "ctrl"), (1, "CTRL", "ctrl")]);
    assert!(plan("case", &registers, 32).is_ok());
}

#[test]
fn out_of_range_reset_value_fails() {
    let registers = vec![
        Register::with_initval(0, "ok", "ctrl", 0xff).unwrap(),
        Register::with_initval(1, "wide", "ctrl", 0x100).unwrap(),
    ];
    assert_eq!(
        plan("range", &registers, 8),
        Err(PlanError::ValueOutOfRange {
            address: 1,
            label: "wide".to_owned(),
            initval: 0x100,
            register_width: 8,
        })
    );
    assert!(plan("range", &registers, 16).is_ok());
}

#[test]
fn oversized_address_space_fails() {
    let registers = regs(&[(u64::MAX, "last", "ctrl")]);
    assert_eq!(
        plan("huge", &registers, 32),
        Err(PlanError::AddrWidthOverflow {
            addr_bits: 64,
            log2_register_byte_width: 2,
        })
    );
    // 64 index bits fit the bus address but not the register count
    assert_eq!(
        plan("huge", &registers, 8),
        Err(PlanError::AddrWidthOverflow {
            addr_bits: 64,
            log2_register_byte_width: 0,
        })
    );

    let registers = regs(&[((1 << 61) - 1, "last", "ctrl")]);
    let desc = plan("big", &registers, 64).unwrap();
    assert_eq!(desc.axi_addr_width(), 64);
    assert_eq!(desc.num_registers(), 1 << 61);
    assert_eq!(desc.byte_offset(&registers[0]), ((1 << 61) - 1) * 8);
}

#[test]
fn descriptor_serializes_to_json() {
    let desc = plan(
        "regfile",
        &[Register::with_initval(3, "ctrl", "ctrl", 0xbeef).unwrap()],
        32,
    )
    .unwrap();
    let js = desc.to_json();
    assert_eq!(js["module_name"], "regfile");
    assert_eq!(js["num_registers"], 4);
    assert_eq!(js["axi_addr_width"], 4);
    assert_eq!(js["registers"][0]["byte_offset"], "0xc");
    assert_eq!(js["registers"][0]["initval"], "0xbeef");
}
