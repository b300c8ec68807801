#![forbid(unsafe_code)]

mod cli;

use std::io;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use cli::{write_completion, Cli, Command, SetupTask};
use randrctl::config::{default_config_dirs, Context};
use randrctl::ctl::{DumpOptions, RandrCtl};
use randrctl::hooks::ShellHooks;
use randrctl::profile::{serialize, Format, ProfileManager};
use randrctl::xrandr::Xrandr;

const UDEV_RULE: &str = include_str!("../misc/99-randrctl.rules");
const EXAMPLE_CONFIG: &str = include_str!("../misc/config.toml");

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug || cli.extended_debug {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(cli.extended_debug)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set up logging: {}", e);
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn format(json: bool) -> Format {
    if json {
        Format::Json
    } else {
        Format::Toml
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Version => {
            println!("randrctl {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Setup { task } => {
            match task {
                SetupTask::Udev => print!("{}", UDEV_RULE),
                SetupTask::Completion => write_completion(&mut io::stdout()),
                SetupTask::Config => print!("{}", EXAMPLE_CONFIG),
            }
            return Ok(());
        }
        _ => {}
    }

    let context = Context::load(&default_config_dirs());
    let ctl = RandrCtl::new(
        ProfileManager::new(context.profile_read_locations, context.profile_write_location),
        Xrandr::new(cli.display, cli.xauthority),
        ShellHooks::new(context.config.hooks),
    );

    match cli.command {
        Command::SwitchTo { profile_name } => ctl.switch_to(&profile_name)?,
        Command::Auto => {
            ctl.switch_auto()?;
        }
        Command::Show { json, profile_name } => {
            let profile = match profile_name {
                Some(name) => ctl.show(&name)?,
                None => ctl.dump_current("current", DumpOptions::default(), None)?,
            };
            println!("{}", serialize(&profile, format(json))?);
        }
        Command::List {
            long_listing,
            scored_listing,
        } => {
            if long_listing {
                for profile in ctl.list_all_long() {
                    println!("{}", profile.name);
                    for (name, output) in profile.outputs.iter() {
                        println!("   {} {}", name, output);
                    }
                }
            } else if scored_listing {
                for (score, profile) in ctl.list_all_scored()? {
                    println!("{} {}", profile.name, score);
                }
            } else {
                for name in ctl.list_all() {
                    println!("{}", name);
                }
            }
        }
        Command::Dump {
            match_supports,
            match_preferred,
            match_edid,
            priority,
            json,
            profile_name,
        } => {
            let options = DumpOptions {
                include_supports_rule: match_supports,
                include_preferred_rule: match_preferred,
                include_edid_rule: match_edid,
                // TODO: give the refresh rate its own dump flag instead of riding on -e
                include_refresh_rate: match_edid,
                priority,
            };
            ctl.dump_current(&profile_name, options, Some(format(json)))?;
        }
        Command::Version | Command::Setup { .. } => {}
    }
    Ok(())
}
