#![forbid(unsafe_code)]

mod machines;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cortexm_mcu::{LaunchMode, Mcu, McuConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Build a Cortex-M microcontroller, load its firmware and reset it")]
struct Args {
    /// Board definition to instantiate (see --list-machines).
    #[arg(long, default_value = "cortexm-generic")]
    machine: String,

    /// Print the built-in board definitions and exit.
    #[arg(long)]
    list_machines: bool,

    /// Core model, e.g. `cortex-m4f` or `cortex-m3-r2p1`. Defaults to the board's core.
    #[arg(long)]
    cpu: Option<String>,

    /// Firmware image (ELF or raw binary).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Alternative to --image; ignored when --image is given.
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// SRAM size in KB (0 = board default).
    #[arg(long, default_value_t = 0)]
    sram_size_kb: u32,

    /// Flash size in KB (0 = board default).
    #[arg(long, default_value_t = 0)]
    flash_size_kb: u32,

    /// Wait for a debugger; no firmware image is required.
    #[arg(long)]
    gdb: bool,

    /// Log filter (overrides `RUST_LOG`), e.g. `debug` or `cortexm_mcu=trace`.
    #[arg(long)]
    log: Option<String>,
}

fn init_logging(directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log filter '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(args: Args) -> Result<()> {
    if args.list_machines {
        for m in machines::builtin() {
            println!("{:<16} {}", m.name, m.description);
        }
        return Ok(());
    }

    init_logging(args.log.as_deref())?;

    let machine = machines::find(&args.machine).ok_or_else(|| {
        anyhow!(
            "unknown machine '{}' (available: {})",
            args.machine,
            machines::names()
        )
    })?;
    tracing::info!("Board: '{}' ({}).", machine.name, machine.description);

    let cfg = McuConfig {
        cpu_model: args.cpu,
        sram_size_kb: args.sram_size_kb,
        flash_size_kb: args.flash_size_kb,
        image: args.image,
        kernel: args.kernel,
        launch_mode: if args.gdb {
            LaunchMode::DebugAttach
        } else {
            LaunchMode::Standalone
        },
    };

    let mut mcu = Mcu::new(cfg, &machine.capabilities)?;
    mcu.realize();
    mcu.reset()?;

    println!("{} ({})", machine.name, mcu.display_model());
    for region in mcu.memory_map().regions() {
        println!(
            "  {:<28} {:#010x}..{:#010x}{}",
            region.name,
            region.base,
            region.end(),
            if region.read_only { " ro" } else { "" }
        );
    }
    println!("  irqs: {}", mcu.irqs().len());
    if let Some(image) = mcu.image() {
        println!(
            "  image: {} ({}, entry {:#010x}, {} bytes)",
            image.path.display(),
            image.format,
            image.entry,
            image.size
        );
    }
    let regs = mcu.cpu().regs();
    println!(
        "  msp={:#010x} pc={:#010x} xpsr={:#010x}",
        regs.msp, regs.pc, regs.xpsr
    );
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
