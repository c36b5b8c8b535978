use clap::{Parser, Subcommand, ValueEnum};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};
use sysmodules::{
    config::{self, PanelConfig},
    feedback::TracingFeedback,
    input::Buttons,
    memory::SystemMemory,
    process::InMemoryProcessManager,
    view::TextSurface,
    Error, InternalResult, ModuleController, ProgramId,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, default_value = "sysmodules.json", global = true)]
    config: PathBuf,

    /// Directory mounted as the storage root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List sysmodules with their current status
    List,

    /// Set or clear the boot2 flag of a sysmodule
    Flag {
        /// Program id (hex)
        tid: String,
        state: FlagState,
    },

    /// Toggle the boot2 flag of a sysmodule
    Toggle {
        /// Program id (hex)
        tid: String,
    },

    /// Drive frame refreshes and print the panel on every poll
    Watch {
        #[arg(long, default_value_t = 60)]
        frames: u32,

        /// Milliseconds per frame
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FlagState {
    On,
    Off,
}

fn load_config(path: &Path) -> InternalResult<PanelConfig> {
    if path.exists() {
        Ok(config::from_file(path)?)
    } else {
        debug!("No config at {:?}, using defaults", path);
        Ok(PanelConfig::default())
    }
}

fn listed(controller: &ModuleController, tid: &str) -> InternalResult<ProgramId> {
    let program_id: ProgramId = tid.parse()?;
    if controller.registry().get(program_id).is_none() {
        return Err(Error::internal(format!(
            "Sysmodule {} is not listed",
            program_id
        )));
    }
    Ok(program_id)
}

fn run(cli: &Cli) -> InternalResult<()> {
    let config = load_config(&cli.config)?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    // No process manager on a development host: nothing is ever running.
    let manager = Arc::new(InMemoryProcessManager::new());
    let mut controller =
        ModuleController::open(&cli.root, &config, manager, Box::new(TracingFeedback))
            .with_memory(Box::new(SystemMemory::new()));

    match &cli.command {
        Commands::List => {
            let mut surface = TextSurface::new();
            controller.mount(&mut surface);
            controller.on_frame();
            print!("{}", surface.render());
        }
        Commands::Flag { tid, state } => {
            let program_id = listed(&controller, tid)?;
            controller.refresh();
            let want = matches!(state, FlagState::On);
            let flagged = controller
                .status(program_id)
                .map(|s| s.is_flagged())
                .unwrap_or(false);
            if flagged != want {
                controller.handle_action(program_id, Buttons::Y);
            }
            controller.refresh();
            print!("{}", controller.view().render_text());
        }
        Commands::Toggle { tid } => {
            let program_id = listed(&controller, tid)?;
            if !controller.handle_action(program_id, Buttons::Y) {
                return Err(Error::internal(format!(
                    "Sysmodule {} is locked until reboot",
                    program_id
                )));
            }
            controller.refresh();
            print!("{}", controller.view().render_text());
        }
        Commands::Watch { frames, frame_ms } => {
            let mut surface = TextSurface::new();
            controller.mount(&mut surface);
            for _ in 0..*frames {
                if controller.on_frame() {
                    print!("{}", surface.render());
                }
                thread::sleep(Duration::from_millis(*frame_ms));
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
