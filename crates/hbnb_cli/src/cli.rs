use clap::Parser;
use std::path::PathBuf;

/// Interactive console over the hbnb JSON object store.
#[derive(Debug, Parser)]
#[command(name = "hbnb", version, about)]
pub struct Cli {
    /// Backing JSON file holding every stored object
    #[arg(long, env = "HBNB_FILE", default_value = "file.json")]
    pub file: PathBuf,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "HBNB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rotating log files; logging is off when unset
    #[arg(long, env = "HBNB_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn parses_explicit_flags() {
        let cli = Cli::try_parse_from([
            "hbnb",
            "--file",
            "/tmp/objects.json",
            "--log-level",
            "warn",
            "--log-dir",
            "logs",
        ])
        .unwrap();
        assert_eq!(cli.file, Path::new("/tmp/objects.json"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
        assert_eq!(cli.log_dir.as_deref(), Some(Path::new("logs")));
    }
}
