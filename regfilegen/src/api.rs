//! Exposes functionality supported by this crate
mod error;

use std::path;

use crate::util;
use log::info;

pub use crate::error::{
    InvalidRegisterError, InvalidWidthError, ParseDeclError, PlanError, RenderError,
};
pub use crate::frontend::RegfileDecl;
pub use crate::model::{Mode, Register, RegisterWidth, Registers};
pub use crate::plan::{plan, GenerationDescriptor, MAX_ADDR_WIDTH};
pub use crate::render::{Render, TemplateRenderer, BUILTIN_TEMPLATE_NAME};
pub use error::ApiError;

/// Which template to render a register file with
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// AXI4-Lite VHDL template shipped with the crate
    #[default]
    Builtin,
    /// Template `name` from a directory of user supplied templates
    Dir { path: path::PathBuf, name: String },
}

impl TemplateSource {
    /// Build a renderer for this template
    ///
    /// # Errors
    ///
    /// - The template cannot be found or compiled
    pub fn renderer(&self) -> Result<TemplateRenderer, RenderError> {
        match self {
            Self::Builtin => TemplateRenderer::builtin(),
            Self::Dir { path, name } => TemplateRenderer::from_dir(path, name),
        }
    }
}

/// Options applied on top of a [`RegfileDecl`]
#[derive(Clone, Debug, Default)]
pub struct GenerateConfig {
    /// Replaces the module name of the declaration
    module_name: Option<String>,
    /// Replaces the register width of the declaration
    register_width: Option<u32>,
    template: TemplateSource,
}

impl GenerateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn module_name(mut self, module_name: Option<String>) -> Self {
        self.module_name = module_name;
        self
    }

    #[must_use]
    pub fn register_width(mut self, register_width: Option<u32>) -> Self {
        self.register_width = register_width;
        self
    }

    #[must_use]
    pub fn template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    fn resolve<'a>(&'a self, decl: &'a RegfileDecl) -> (&'a str, u32) {
        (
            self.module_name.as_deref().unwrap_or(&decl.module),
            self.register_width.unwrap_or(decl.register_width),
        )
    }
}

/// Plan the address space of `registers` and render it with `renderer`
///
/// # Errors
///
/// - The register set is invalid, see [`PlanError`]
/// - Rendering fails
pub fn regfilegen(
    registers: &[Register],
    module_name: &str,
    register_width: u32,
    renderer: &dyn Render,
) -> Result<String, ApiError> {
    let descriptor = plan(module_name, registers, register_width)?;
    Ok(renderer.render(&descriptor)?)
}

/// Validate a declaration and derive its address space without rendering anything
///
/// Good for checking whether a declaration is valid.
///
/// # Errors
///
/// - The register set is invalid, see [`PlanError`]
pub fn dry_run(
    decl: &RegfileDecl,
    config: &GenerateConfig,
) -> Result<GenerationDescriptor, ApiError> {
    let (module_name, register_width) = config.resolve(decl);
    Ok(plan(module_name, &decl.registers, register_width)?)
}

/// Render the register file for `decl`
///
/// # Errors
///
/// - The register set is invalid, see [`PlanError`]
/// - The template cannot be loaded or rendered
pub fn generate(decl: &RegfileDecl, config: &GenerateConfig) -> Result<String, ApiError> {
    let descriptor = dry_run(decl, config)?;
    let renderer = config.template.renderer()?;
    Ok(renderer.render(&descriptor)?)
}

/// Read a declaration from `input`, render it and write the result into `output`
///
/// Parent directories of `output` are created as needed. Nothing is written if any step before
/// writing fails.
///
/// # Errors
///
/// - Either file cannot be accessed
/// - See [`generate`]
pub fn generate_to_file(
    input: &path::Path,
    output: &path::Path,
    config: &GenerateConfig,
) -> Result<GenerationDescriptor, ApiError> {
    let decl = RegfileDecl::from_file(input)?;
    let descriptor = dry_run(&decl, config)?;
    let text = config.template.renderer()?.render(&descriptor)?;
    util::write_file(output, &text)?;
    info!(
        "wrote register file '{}' with {} registers into {}",
        descriptor.module_name(),
        descriptor.registers().len(),
        output.display()
    );
    Ok(descriptor)
}

/// A small register file with one register of each built-in mode
#[must_use]
pub fn example_decl() -> RegfileDecl {
    let registers = [
        (0, "status", Mode::STATUS),
        (1, "start", Mode::TRIGGER),
        (2, "ctrl1", Mode::CONTROL),
    ]
    .into_iter()
    // Labels above are non-empty so construction cannot fail
    .map(|(address, label, mode)| {
        Register::new(address, label, mode).expect("example register is valid")
    })
    .collect();
    RegfileDecl::new("regfile", RegisterWidth::DEFAULT_BITS, registers)
}

#[test]
fn example_generates_end_to_end() {
    let decl = example_decl();
    let text = generate(&decl, &GenerateConfig::default()).unwrap();
    assert!(text.contains("entity regfile is"));
    assert!(text.contains("C_S_AXI_ADDR_WIDTH : integer := 4"));
}

#[test]
fn config_overrides_declaration() {
    let decl = example_decl();
    let config = GenerateConfig::new()
        .module_name(Some("other".to_owned()))
        .register_width(Some(16));
    let desc = dry_run(&decl, &config).unwrap();
    assert_eq!(desc.module_name(), "other");
    assert_eq!(desc.register_width(), 16);
    assert_eq!(desc.axi_addr_width(), 3);

    assert!(matches!(
        dry_run(&decl, &GenerateConfig::new().register_width(Some(24))),
        Err(ApiError::Plan(PlanError::InvalidWidth(_)))
    ));
}

#[test]
fn regfilegen_uses_given_renderer() {
    struct Summary;

    impl Render for Summary {
        fn render(&self, d: &GenerationDescriptor) -> Result<String, RenderError> {
            Ok(format!("{} {} {}", d.module_name(), d.num_registers(), d.axi_addr_width()))
        }
    }

    let registers = example_decl().registers;
    assert_eq!(
        regfilegen(&registers, "regfile", 32, &Summary).unwrap(),
        "regfile 4 4"
    );
    assert!(matches!(
        regfilegen(&[], "regfile", 32, &Summary),
        Err(ApiError::Plan(PlanError::EmptyRegisterSet))
    ));
}

#[test]
fn template_dir_is_used() {
    let dir = std::env::temp_dir().join(format!("regfilegen-tmpl-{}", std::process::id()));
    util::write_file(
        &dir.join("map.txt"),
        "{% for r in registers %}{{ r.label | ljust(width=JUST_WIDTH) }}|{% endfor %}",
    )
    .unwrap();

    let config = GenerateConfig::new().template(TemplateSource::Dir {
        path: dir.clone(),
        name: "map.txt".to_owned(),
    });
    assert_eq!(
        generate(&example_decl(), &config).unwrap(),
        "status|start |ctrl1 |"
    );

    let missing = GenerateConfig::new().template(TemplateSource::Dir {
        path: dir.clone(),
        name: "nope.vhd".to_owned(),
    });
    assert!(matches!(
        generate(&example_decl(), &missing),
        Err(ApiError::Render(RenderError::TemplateNotFound { .. }))
    ));

    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn generate_to_file_writes_output() {
    let dir = std::env::temp_dir().join(format!("regfilegen-gen-{}", std::process::id()));
    let input = dir.join("regfile.json");
    let output = dir.join("hdl").join("regfile.vhd");
    util::write_file(&input, &example_decl().to_json().pretty(4)).unwrap();

    let desc = generate_to_file(&input, &output, &GenerateConfig::default()).unwrap();
    assert_eq!(desc.num_registers(), 4);
    assert!(util::read_file(&output).unwrap().contains("entity regfile is"));

    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn invalid_declaration_writes_nothing() {
    let dir = std::env::temp_dir().join(format!("regfilegen-bad-{}", std::process::id()));
    let input = dir.join("dup.json");
    let output = dir.join("dup.vhd");
    util::write_file(
        &input,
        r#"{ "module": "dup", "registers": [
            { "address": 5, "label": "a", "mode": "ctrl" },
            { "address": 5, "label": "b", "mode": "ctrl" } ] }"#,
    )
    .unwrap();

    assert!(matches!(
        generate_to_file(&input, &output, &GenerateConfig::default()),
        Err(ApiError::Plan(PlanError::DuplicateAddress { address: 5, .. }))
    ));
    assert!(!output.exists());

    fs_err::remove_dir_all(&dir).unwrap();
}
