use std::io::Write;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, shells::Bash};

use randrctl::model::DEFAULT_PRIORITY;

#[derive(Parser, Debug)]
#[clap(name = "randrctl", version, about = "Profile based screen manager for X11")]
pub struct Cli {
    /// Be verbose
    #[clap(short = 'x', global = true)]
    pub debug: bool,

    /// Be even more verbose
    #[clap(short = 'X', global = true)]
    pub extended_debug: bool,

    /// X display to talk to, instead of $DISPLAY
    #[clap(long, global = true)]
    pub display: Option<String>,

    /// Xauthority file to use, instead of $XAUTHORITY
    #[clap(long, global = true)]
    pub xauthority: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Switch to profile
    SwitchTo {
        /// Name of the profile to switch to
        profile_name: String,
    },

    /// Show profile
    Show {
        /// Use JSON format
        #[clap(short, long)]
        json: bool,

        /// Name of the profile to show. Show current setup if omitted
        profile_name: Option<String>,
    },

    /// List available profiles
    List {
        /// Long listing
        #[clap(short = 'l')]
        long_listing: bool,

        /// Scored listing
        #[clap(short = 's')]
        scored_listing: bool,
    },

    /// Dump current screen setup
    Dump {
        /// Dump with match by supported mode
        #[clap(short = 'm')]
        match_supports: bool,

        /// Dump with match by preferred mode
        #[clap(short = 'p')]
        match_preferred: bool,

        /// Dump with match by edid
        #[clap(short = 'e')]
        match_edid: bool,

        /// Profile priority
        #[clap(short = 'P', default_value_t = DEFAULT_PRIORITY)]
        priority: i32,

        /// Use JSON format
        #[clap(short, long)]
        json: bool,

        /// Name of the profile to dump setup to
        profile_name: String,
    },

    /// Automatically switch to the best matching profile
    Auto,

    /// Print version information and exit
    Version,

    /// Perform various setup tasks
    Setup {
        #[clap(subcommand)]
        task: SetupTask,
    },
}

#[derive(Subcommand, Debug)]
pub enum SetupTask {
    /// Print the udev rule required for auto-switching
    #[clap(
        override_usage = "randrctl setup udev > /etc/udev/rules.d/99-randrctl.rules && udevadm control --reload-rules"
    )]
    Udev,

    /// Print a bash completion script
    #[clap(override_usage = "randrctl setup completion > /usr/share/bash-completion/completions/randrctl")]
    Completion,

    /// Print an example config.toml
    #[clap(override_usage = "randrctl setup config > ${XDG_CONFIG_HOME:-$HOME/.config}/randrctl/config.toml")]
    Config,
}

/// Write the bash completion script for every subcommand and flag.
pub fn write_completion(buf: &mut dyn Write) {
    generate(Bash, &mut Cli::command(), "randrctl", buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dump_flags() {
        let cli = Cli::parse_from(["randrctl", "-x", "dump", "-m", "-e", "-P", "250", "office"]);
        assert!(cli.debug);
        match cli.command {
            Command::Dump {
                match_supports,
                match_preferred,
                match_edid,
                priority,
                json,
                profile_name,
            } => {
                assert!(match_supports && match_edid);
                assert!(!match_preferred && !json);
                assert_eq!(priority, 250);
                assert_eq!(profile_name, "office");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn show_name_is_optional() {
        let cli = Cli::parse_from(["randrctl", "show", "-j"]);
        assert!(matches!(cli.command, Command::Show { json: true, profile_name: None }));
    }

    #[test]
    fn global_session_options() {
        let cli = Cli::parse_from(["randrctl", "switch-to", "home", "--display", ":1"]);
        assert_eq!(cli.display.as_deref(), Some(":1"));
        assert!(matches!(cli.command, Command::SwitchTo { profile_name } if profile_name == "home"));
    }

    #[test]
    fn setup_completion_prints_bash_script() {
        let cli = Cli::parse_from(["randrctl", "setup", "completion"]);
        assert!(matches!(cli.command, Command::Setup { task: SetupTask::Completion }));

        let mut script = Vec::new();
        write_completion(&mut script);
        let script = String::from_utf8(script).unwrap();
        assert!(script.contains("complete -F"));
        assert!(script.contains("randrctl"));
        for command in ["switch-to", "show", "list", "dump", "auto", "setup"] {
            assert!(script.contains(command), "missing {}", command);
        }
    }

    #[test]
    fn switch_to_requires_a_name() {
        assert!(Cli::try_parse_from(["randrctl", "switch-to"]).is_err());
    }
}
