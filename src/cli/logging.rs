//! Log setup for the command line.
//!
//! Every line goes to stderr and to the audit log file. `RUST_LOG` overrides
//! the level chosen by `--verbose`.

use crate::error::Result;
use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

/// Verbosity selected on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Level {
    /// `info` and above.
    Default,
    /// `debug` and above.
    Verbose,
}

impl Level {
    fn filter(self) -> &'static str {
        match self {
            Level::Default => "info",
            Level::Verbose => "debug",
        }
    }
}

/// Writes every buffer to stderr and the audit file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Installs the global logger. Truncates `log_file`.
pub(crate) fn setup_logging(level: Level, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(log_file)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.filter()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .try_init()
        .map_err(anyhow::Error::from)?;

    Ok(())
}
