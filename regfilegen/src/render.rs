//! Render a [`GenerationDescriptor`] into hardware description source text

use std::{collections::HashMap, path};

use crate::{
    error::RenderError,
    model::{Mode, Register},
    plan::GenerationDescriptor,
};
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;
use tera::{Context, Tera, Value};

/// Name of the template compiled into the crate
pub const BUILTIN_TEMPLATE_NAME: &str = "axi_regfile.vhd";

const BUILTIN_TEMPLATE: &str = include_str!("../templates/axi_regfile.vhd");

/// Turns a resolved descriptor into source text
///
/// Implementations must be deterministic: the same descriptor always renders to the same text.
pub trait Render {
    /// # Errors
    ///
    /// - The template cannot be rendered with the given descriptor
    fn render(&self, descriptor: &GenerationDescriptor) -> Result<String, RenderError>;
}

/// [`Render`] implementation backed by a `tera` template
pub struct TemplateRenderer {
    tera: Tera,
    template: String,
    builtin: bool,
}

impl TemplateRenderer {
    /// Renderer for the built-in AXI4-Lite VHDL template
    ///
    /// # Errors
    ///
    /// - The built-in template fails to compile
    pub fn builtin() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(BUILTIN_TEMPLATE_NAME, BUILTIN_TEMPLATE)?;
        Ok(Self::with_filters(tera, BUILTIN_TEMPLATE_NAME, true))
    }

    /// Renderer for template `name` found in directory `dir`
    ///
    /// All files under `dir` are loaded, so templates may include or extend each other.
    ///
    /// # Errors
    ///
    /// - `dir` is not valid UTF-8
    /// - A template under `dir` fails to compile
    /// - No template called `name` exists in `dir`
    pub fn from_dir(dir: &path::Path, name: &str) -> Result<Self, RenderError> {
        let glob = dir.join("**").join("*");
        let glob = glob
            .to_str()
            .ok_or_else(|| RenderError::NonUtf8Path(dir.to_owned()))?;
        let tera = Tera::new(glob)?;
        if !tera.get_template_names().any(|n| n == name) {
            return Err(RenderError::TemplateNotFound {
                name: name.to_owned(),
                dir: dir.to_owned(),
            });
        }
        debug!(
            "loaded templates from {}: {}",
            dir.display(),
            tera.get_template_names().sorted().join(", ")
        );
        Ok(Self::with_filters(tera, name, false))
    }

    fn with_filters(mut tera: Tera, template: &str, builtin: bool) -> Self {
        // Output is source code, never HTML
        tera.autoescape_on(vec![]);
        tera.register_filter("ljust", ljust);
        tera.register_filter("vhdl_hex", vhdl_hex);
        Self {
            tera,
            template: template.to_owned(),
            builtin,
        }
    }

    #[must_use]
    pub fn template_name(&self) -> &str {
        &self.template
    }
}

impl Render for TemplateRenderer {
    fn render(&self, descriptor: &GenerationDescriptor) -> Result<String, RenderError> {
        if self.builtin {
            for reg in descriptor
                .registers()
                .iter()
                .filter(|reg| !reg.mode().is_builtin())
            {
                warn!(
                    "register '{}' has mode '{}' which {} does not implement, the register is left out",
                    reg.label(),
                    reg.mode(),
                    BUILTIN_TEMPLATE_NAME
                );
            }
            for (first, second) in case_collisions(descriptor.registers()) {
                warn!(
                    "labels '{first}' and '{second}' differ only in case, which VHDL does not distinguish"
                );
            }
        }
        Ok(self.tera.render(&self.template, &context(descriptor))?)
    }
}

/// Pairs of labels that are equal when compared case-insensitively
fn case_collisions(registers: &[Register]) -> Vec<(&str, &str)> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(registers.len());
    let mut collisions = vec![];
    for reg in registers {
        if let Some(first) = seen.insert(reg.label().to_uppercase(), reg.label()) {
            collisions.push((first, reg.label()));
        }
    }
    collisions
}

/// A register as seen by templates
#[derive(Serialize)]
struct RegisterView<'a> {
    addr: u64,
    label: &'a str,
    mode: &'a Mode,
    initval: u64,
    /// Hexadecimal, template arithmetic is limited to `i64`
    byte_offset: String,
}

/// Template variables, named as the templates expect them
fn context(desc: &GenerationDescriptor) -> Context {
    let registers = desc
        .registers()
        .iter()
        .map(|reg| RegisterView {
            addr: reg.address(),
            label: reg.label(),
            mode: reg.mode(),
            initval: reg.initval(),
            byte_offset: format!("{:#x}", desc.byte_offset(reg)),
        })
        .collect_vec();
    let mut ctx = Context::new();
    ctx.insert("MODULE_NAME", desc.module_name());
    ctx.insert("registers", &registers);
    ctx.insert("JUST_WIDTH", &desc.label_column_width());
    ctx.insert("NUM_REGISTERS", &desc.num_registers());
    ctx.insert("AXI_ADDR_WIDTH", &desc.axi_addr_width());
    ctx.insert("REGISTER_WIDTH", &desc.register_width());
    ctx.insert("REGISTER_BYTE_WIDTH", &desc.register_byte_width());
    ctx.insert("LOG2_REGISTER_BYTE_WIDTH", &desc.log2_register_byte_width());
    ctx
}

fn required_arg<T: serde::de::DeserializeOwned>(
    filter: &str,
    args: &HashMap<String, Value>,
    name: &str,
) -> tera::Result<T> {
    let value = args
        .get(name)
        .ok_or_else(|| tera::Error::msg(format!("Filter `{filter}` expected an arg called `{name}`")))?;
    tera::from_value(value.clone()).map_err(|_| {
        tera::Error::msg(format!(
            "Filter `{filter}` received an incorrect type for arg `{name}`: got `{value}`"
        ))
    })
}

/// Pad a string on the right to `width` characters
fn ljust(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("ljust", "value", String, value);
    let width: usize = required_arg("ljust", args, "width")?;
    Ok(Value::String(format!("{s:<width$}")))
}

/// Format an integer as a VHDL bit string literal of `bits` bits
///
/// # Examples
///
/// `0x2a`, `bits = 32` -> `x"0000002A"`
/// `0b101`, `bits = 6` -> `"000101"`
fn vhdl_hex(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let v = tera::try_get_value!("vhdl_hex", "value", u64, value);
    let bits: usize = required_arg("vhdl_hex", args, "bits")?;
    let lit = if bits % 4 == 0 {
        let digits = bits / 4;
        format!("x\"{v:0digits$X}\"")
    } else {
        format!("\"{v:0bits$b}\"")
    };
    Ok(Value::String(lit))
}

#[cfg(test)]
fn reference_descriptor() -> GenerationDescriptor {
    let registers = [
        Register::new(0, "status", "stat").unwrap(),
        Register::new(1, "start", "trig").unwrap(),
        Register::with_initval(2, "ctrl1", "ctrl", 0x2a).unwrap(),
    ];
    crate::plan::plan("regfile", &registers, 32).unwrap()
}

#[test]
fn ljust_pads_to_width() {
    let args = HashMap::from([("width".to_owned(), Value::from(6))]);
    assert_eq!(
        ljust(&Value::from("start"), &args).unwrap(),
        Value::from("start ")
    );
    assert_eq!(
        ljust(&Value::from("status_long"), &args).unwrap(),
        Value::from("status_long")
    );
    assert!(ljust(&Value::from("start"), &HashMap::new()).is_err());
}

#[test]
fn vhdl_literals_generate() {
    let args = |bits: u32| HashMap::from([("bits".to_owned(), Value::from(bits))]);

    assert_eq!(
        vhdl_hex(&Value::from(0x2a), &args(32)).unwrap(),
        Value::from("x\"0000002A\"")
    );
    assert_eq!(
        vhdl_hex(&Value::from(0xbeef), &args(16)).unwrap(),
        Value::from("x\"BEEF\"")
    );
    assert_eq!(
        vhdl_hex(&Value::from(0b101), &args(6)).unwrap(),
        Value::from("\"000101\"")
    );
    assert_eq!(
        vhdl_hex(&Value::from(1), &args(128)).unwrap(),
        Value::from(format!("x\"{}1\"", "0".repeat(31)))
    );
    assert!(vhdl_hex(&Value::from("nope"), &args(8)).is_err());
}

#[test]
fn builtin_template_renders_reference_example() {
    let renderer = TemplateRenderer::builtin().unwrap();
    let text = renderer.render(&reference_descriptor()).unwrap();

    assert!(text.contains("entity regfile is"));
    assert!(text.contains("end architecture rtl;"));
    assert!(text.contains("C_S_AXI_DATA_WIDTH : integer := 32;"));
    assert!(text.contains("C_S_AXI_ADDR_WIDTH : integer := 4"));
    assert!(text.contains("constant C_NUM_REGISTERS : integer := 4;"));
    assert!(text.contains("constant C_ADDR_LSB      : integer := 2;"));
    // Labels are aligned to the longest one
    assert!(text.contains("    status : in  std_logic_vector"));
    assert!(text.contains("    start  : out std_logic_vector"));
    assert!(text.contains("    ctrl1  : out std_logic_vector"));
    assert!(text.contains("C_CTRL1  => x\"0000002A\","));
    assert!(text.contains("C_START  => true,"));
    assert!(!text.contains("C_STATUS => true,"));
    assert!(text.contains("regs(C_START) <= (others => '0');"));
    assert!(text.contains("readback(C_STATUS) <= status;"));
    assert!(text.contains("-- ctrl1   ctrl  0x8"));
    // No HTML escaping in source output
    assert!(!text.contains("&gt;"));
    assert!(!text.contains("&quot;"));
}

#[test]
fn rendering_is_deterministic() {
    let renderer = TemplateRenderer::builtin().unwrap();
    let desc = reference_descriptor();
    assert_eq!(
        renderer.render(&desc).unwrap(),
        renderer.render(&desc).unwrap()
    );
}

#[test]
fn raw_template_sees_all_parameters() {
    let mut tera = Tera::default();
    tera.add_raw_template(
        "summary.txt",
        "{{ MODULE_NAME }} {{ REGISTER_WIDTH }} {{ REGISTER_BYTE_WIDTH }} \
         {{ LOG2_REGISTER_BYTE_WIDTH }} {{ AXI_ADDR_WIDTH }} {{ NUM_REGISTERS }} {{ JUST_WIDTH }}\
         {% for r in registers %} {{ r.addr }}:{{ r.label | ljust(width=JUST_WIDTH) }}:{{ r.mode }}:{{ r.initval }}{% endfor %}",
    )
    .unwrap();
    let renderer = TemplateRenderer::with_filters(tera, "summary.txt", false);
    assert_eq!(
        renderer.render(&reference_descriptor()).unwrap(),
        "regfile 32 4 2 4 4 6 0:status:stat:0 1:start :trig:0 2:ctrl1 :ctrl:42"
    );
}

#[test]
fn full_address_space_renders() {
    let registers = [Register::new((1 << 61) - 1, "last", "ctrl").unwrap()];
    let desc = crate::plan::plan("big", &registers, 64).unwrap();
    assert_eq!(desc.axi_addr_width(), 64);

    let text = TemplateRenderer::builtin().unwrap().render(&desc).unwrap();
    assert!(text.contains("C_S_AXI_ADDR_WIDTH : integer := 64"));
    assert!(text.contains("-- last  ctrl  0xfffffffffffffff8"));
}

#[test]
fn labels_differing_in_case_collide() {
    let registers = [
        Register::new(0, "ctrl", "ctrl").unwrap(),
        Register::new(1, "status", "stat").unwrap(),
        Register::new(2, "CTRL", "ctrl").unwrap(),
        Register::new(3, "Status", "stat").unwrap(),
    ];
    assert_eq!(
        case_collisions(&registers),
        vec![("ctrl", "CTRL"), ("status", "Status")]
    );
    assert!(case_collisions(&registers[..2]).is_empty());
}
