use anyhow::{Result, bail};
use clap::Parser;
use modloader::config::Config;
use modloader::loader::DryRunHost;
use modloader::pipeline::ModLoader;
use modloader::runtime::RealRuntime;
use std::path::PathBuf;

/// modloader - discover, order and load game mods
///
/// Scans the mods directory for packaged mods (.smod, .zip) and raw
/// development files (.dll, .pak), checks their dependencies and prints
/// the order they load in.
///
/// Examples:
///   modloader order                 # Print the load order of ./mods
///   modloader --strict load         # Dry-run loading, rejecting raw files
#[derive(Parser, Debug)]
#[command(author, version = env!("MODLOADER_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Mods directory (defaults to ./mods; also via MODLOADER_MODS_DIR)
    #[arg(
        long = "mods-dir",
        short = 'm',
        env = "MODLOADER_MODS_DIR",
        value_name = "PATH",
        global = true
    )]
    pub mods_dir: Option<PathBuf>,

    /// Payload cache directory (also via MODLOADER_CACHE_DIR)
    #[arg(
        long = "cache-dir",
        env = "MODLOADER_CACHE_DIR",
        value_name = "PATH",
        global = true
    )]
    pub cache_dir: Option<PathBuf>,

    /// Directory for extracted mod configs (also via MODLOADER_CONFIG_DIR)
    #[arg(
        long = "config-dir",
        env = "MODLOADER_CONFIG_DIR",
        value_name = "PATH",
        global = true
    )]
    pub config_dir: Option<PathBuf>,

    /// Reject raw .dll/.pak files that have no manifest
    #[arg(long, global = true)]
    pub strict: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Discover mods and print the resolved load order
    Order,

    /// Run the whole pipeline against a dry-run host and report what would load
    Load,
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(cli.verbose)))
        .init();

    let runtime = RealRuntime;
    let config = Config::resolve(
        &runtime,
        cli.mods_dir,
        cli.cache_dir,
        cli.config_dir,
        !cli.strict,
    )?;
    let loader = ModLoader::new(runtime, config);

    match cli.command {
        Commands::Order => {
            let registry = loader.discover()?;
            let entries = loader.resolve(registry)?;
            for (position, entry) in entries.iter().enumerate() {
                let marker = if entry.raw { " [raw]" } else { "" };
                println!(
                    "{:>3}. {} {}{}",
                    position + 1,
                    entry.id(),
                    entry.info.version,
                    marker
                );
            }
        }
        Commands::Load => {
            let mut host = DryRunHost::new(loader.runtime());
            let report = loader.run(&mut host)?;
            let hooks = report.packages.run_init_hooks(&mut host);

            for package in report.packages.iter() {
                let code = if package.has_code() { "code" } else { "no code" };
                println!("{} {} ({})", package.id(), package.info.version, code);
            }
            println!(
                "{} modules, {} data payloads",
                host.modules().len(),
                host.payloads().len()
            );

            let problems = report.problems.len() + hooks.len();
            if problems > 0 {
                for problem in report.problems.iter().chain(hooks.iter()) {
                    eprintln!("{}", problem);
                }
                bail!("{} problem(s) while loading mods", problems);
            }
        }
    }
    Ok(())
}
