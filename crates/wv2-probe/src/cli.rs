use clap::{Parser, Subcommand, ValueEnum};

/// wv2-probe: exercise the WebView2 bridge from the command line.
#[derive(Parser, Debug)]
#[command(name = "wv2-probe", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Native backend to drive.
    #[arg(long, value_enum, global = true, default_value_t = Backend::platform_default())]
    pub backend: Backend,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the browser runtime version.
    Version {
        /// Fixed-version runtime folder; the installed runtime when omitted.
        #[arg(long)]
        folder: Option<String>,
    },
    /// Compare two browser version strings.
    Compare { version1: String, version2: String },
    /// Print the effective configuration as JSON.
    Config,
    /// Walk environment, controller and page, printing each step.
    Smoke {
        #[arg(long, default_value = "https://example.com/")]
        url: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The installed WebView2 runtime (Windows only).
    Webview2,
    /// In-process mock runtime.
    Mock,
}

impl Backend {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Backend::Webview2
        } else {
            Backend::Mock
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_with_folder() {
        let args = Args::try_parse_from(["wv2-probe", "version", "--folder", "C:\\rt"]).unwrap();
        assert_eq!(
            args.command,
            Command::Version {
                folder: Some("C:\\rt".into())
            }
        );
        assert_eq!(args.backend, Backend::platform_default());
    }

    #[test]
    fn parses_compare_positionals() {
        let args = Args::try_parse_from(["wv2-probe", "compare", "1.0", "1.1"]).unwrap();
        assert_eq!(
            args.command,
            Command::Compare {
                version1: "1.0".into(),
                version2: "1.1".into()
            }
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = Args::try_parse_from([
            "wv2-probe",
            "smoke",
            "--backend",
            "mock",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.backend, Backend::Mock);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(
            args.command,
            Command::Smoke {
                url: "https://example.com/".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Args::try_parse_from(["wv2-probe", "--backend", "edge", "config"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["wv2-probe"]).is_err());
    }
}
