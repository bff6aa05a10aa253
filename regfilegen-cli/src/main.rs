use std::path;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(version, about, long_about = None, author = clap::crate_authors!(), subcommand_required = true)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a register file from a JSON declaration
    Gen {
        /// Register file declaration (JSON)
        decl: path::PathBuf,
        /// Output file. Printed to stdout if omitted.
        #[arg(short, long)]
        output: Option<path::PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
        /// Directory of templates to use instead of the built-in one
        #[arg(long, requires = "template")]
        template_dir: Option<path::PathBuf>,
        /// Name of the template to render from `--template-dir`
        #[arg(long, requires = "template_dir")]
        template: Option<String>,
    },
    /// Validate a declaration and print the derived address space
    Plan {
        /// Register file declaration (JSON)
        decl: path::PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Print the address space as JSON
        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },
    /// List the registers of a declaration
    LsRegisters {
        /// Register file declaration (JSON)
        decl: path::PathBuf,
        #[arg(long, default_value = "preserve")]
        sorting: Sorting,
    },
    /// Print an example declaration
    Example,
}

#[derive(clap::Args)]
struct Overrides {
    /// Module name to use instead of the one in the declaration
    #[arg(long)]
    module: Option<String>,
    /// Register width in bits to use instead of the one in the declaration
    #[arg(long, value_parser = clap_num::maybe_hex::<u32>)]
    width: Option<u32>,
}

impl Overrides {
    fn config(&self) -> regfilegen::GenerateConfig {
        regfilegen::GenerateConfig::new()
            .module_name(self.module.clone())
            .register_width(self.width)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Sorting {
    /// Declaration order
    Preserve,
    /// By register address
    Address,
    /// By label
    Alpha,
}

fn read_decl(path: &path::Path) -> anyhow::Result<regfilegen::RegfileDecl> {
    if !path.is_file() {
        return Err(anyhow!("file does not exist: {}", path.display()));
    }
    regfilegen::RegfileDecl::from_file(path)
        .with_context(|| format!("could not read declaration: {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    if let Some(cmd) = &cli.command {
        match cmd {
            Command::Gen {
                decl,
                output,
                overrides,
                template_dir,
                template,
            } => {
                let mut config = overrides.config();
                if let (Some(path), Some(name)) = (template_dir, template) {
                    config = config.template(regfilegen::TemplateSource::Dir {
                        path: path.clone(),
                        name: name.clone(),
                    });
                }
                generate(decl, output.as_deref(), &config)?;
            }
            Command::Plan {
                decl,
                overrides,
                json,
            } => plan(decl, &overrides.config(), *json)?,
            Command::LsRegisters { decl, sorting } => ls_registers(decl, *sorting)?,
            Command::Example => println!("{}", regfilegen::example_decl().to_json().pretty(4)),
        }
    } else {
        println!("Nothing to do. Please issue a subcommand.")
    }

    Ok(())
}

fn generate(
    decl_path: &path::Path,
    output: Option<&path::Path>,
    config: &regfilegen::GenerateConfig,
) -> anyhow::Result<()> {
    match output {
        Some(output) => {
            regfilegen::generate_to_file(decl_path, output, config).with_context(|| {
                format!(
                    "could not generate {} from {}",
                    output.display(),
                    decl_path.display()
                )
            })?;
        }
        None => {
            let decl = read_decl(decl_path)?;
            let text = regfilegen::generate(&decl, config)
                .with_context(|| format!("could not generate from {}", decl_path.display()))?;
            print!("{text}");
        }
    }
    Ok(())
}

fn plan(
    decl_path: &path::Path,
    config: &regfilegen::GenerateConfig,
    json: bool,
) -> anyhow::Result<()> {
    let decl = read_decl(decl_path)?;
    let desc = regfilegen::dry_run(&decl, config)
        .with_context(|| format!("invalid declaration: {}", decl_path.display()))?;
    if json {
        println!("{}", desc.to_json().pretty(4));
        return Ok(());
    }
    println!("module:                   {}", desc.module_name());
    println!("register width:           {}", desc.register_width());
    println!("register byte width:      {}", desc.register_byte_width());
    println!("log2 register byte width: {}", desc.log2_register_byte_width());
    println!("register index bits:      {}", desc.addr_bits());
    println!("axi address width:        {}", desc.axi_addr_width());
    println!(
        "registers:                {} (padded to {})",
        desc.registers().len(),
        desc.num_registers()
    );
    Ok(())
}

fn ls_registers(decl_path: &path::Path, sorting: Sorting) -> anyhow::Result<()> {
    let decl = read_decl(decl_path)?;
    if decl.registers.is_empty() {
        println!("regfilegen: no registers found in input");
        return Ok(());
    }
    let desc = regfilegen::dry_run(&decl, &regfilegen::GenerateConfig::new())
        .with_context(|| format!("invalid declaration: {}", decl_path.display()))?;
    for line in register_table(&desc, sorting) {
        println!("{line}");
    }
    Ok(())
}

/// One line per register, labels padded to the planned column width
fn register_table(desc: &regfilegen::GenerationDescriptor, sorting: Sorting) -> Vec<String> {
    let longest = desc.label_column_width();
    let mut registers = desc.registers().to_vec();
    match sorting {
        Sorting::Preserve => { /* do nothing */ }
        Sorting::Address => registers.sort_by_key(regfilegen::Register::address),
        Sorting::Alpha => registers.sort_by(|a, b| a.label().cmp(b.label())),
    };
    registers
        .iter()
        .map(|reg| {
            format!(
                "{:#06x} {: <longest$} {: <4} {:#x}",
                reg.address(),
                reg.label(),
                reg.mode().as_str(),
                reg.initval()
            )
        })
        .collect()
}

#[test]
fn register_table_aligns_to_planned_width() {
    let desc = regfilegen::dry_run(
        &regfilegen::example_decl(),
        &regfilegen::GenerateConfig::new(),
    )
    .unwrap();
    assert_eq!(
        register_table(&desc, Sorting::Alpha),
        vec![
            "0x0002 ctrl1  ctrl 0x0",
            "0x0001 start  trig 0x0",
            "0x0000 status stat 0x0",
        ]
    );
}
