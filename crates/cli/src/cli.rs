use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Offline cache controller and PWA readiness checks for the BIM viewer.
#[derive(Parser, Debug)]
#[command(name = "bimview", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a project directory for PWA requirements.
    Validate(ValidateArgs),

    /// Pre-cache the asset manifest, then activate the current version.
    Install(InstallArgs),

    /// Request a URL through the offline worker.
    Fetch(FetchArgs),

    /// List cache generations.
    Caches,

    /// Delete one cache generation, or all of them.
    Clear(ClearArgs),
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Project root (default: current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Stop after install and leave stale generations in place.
    #[arg(long)]
    pub no_activate: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// A path on the application origin or an absolute URL.
    pub url: String,

    /// HTTP method. Anything other than GET bypasses the cache.
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Generation to delete. Omit to delete every generation.
    #[arg(long)]
    pub generation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["bimview", "validate"]).unwrap();
        match cli.command {
            Command::Validate(args) => assert_eq!(args.dir, PathBuf::from(".")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_method_flag() {
        let cli = Cli::try_parse_from(["bimview", "fetch", "/api/models", "-X", "POST", "--pretty"]).unwrap();
        assert!(cli.pretty);
        match cli.command {
            Command::Fetch(args) => {
                assert_eq!(args.url, "/api/models");
                assert_eq!(args.method, "POST");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_install_and_clear_flags() {
        let cli = Cli::try_parse_from(["bimview", "install", "--no-activate"]).unwrap();
        assert!(matches!(cli.command, Command::Install(InstallArgs { no_activate: true })));

        let cli = Cli::try_parse_from(["bimview", "clear", "--generation", "bim-viewer-v1.0.0"]).unwrap();
        match cli.command {
            Command::Clear(args) => assert_eq!(args.generation.as_deref(), Some("bim-viewer-v1.0.0")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_requires_url() {
        assert!(Cli::try_parse_from(["bimview", "fetch"]).is_err());
    }
}
