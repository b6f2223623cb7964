use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Path to the admission bridge toml config.
    /// Only the `[auction]` and `[address]` sections are used.
    #[arg(long)]
    pub(crate) config: PathBuf,

    /// Hex-encoded raw transaction. Can be repeated.
    #[arg(long = "tx")]
    pub(crate) txs: Vec<String>,

    /// File with one hex-encoded raw transaction per line.
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
}

impl Args {
    /// All transactions to inspect, command line ones first.
    pub(crate) fn raw_txs(&self) -> anyhow::Result<Vec<String>> {
        let mut txs = self.txs.clone();
        if let Some(path) = &self.file {
            let contents = std::fs::read_to_string(path)?;
            txs.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        if txs.is_empty() {
            anyhow::bail!("nothing to inspect: pass --tx or --file");
        }
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn file_lines_follow_command_line_txs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\n0xaa\n\n  0xbb  ").unwrap();

        let args = Args::parse_from([
            "bid-inspector",
            "--config",
            "bridge.toml",
            "--tx",
            "0x01",
            "--file",
            file.path().to_str().unwrap(),
        ]);

        assert_eq!(args.raw_txs().unwrap(), vec!["0x01", "0xaa", "0xbb"]);
    }

    #[test]
    fn no_input_is_an_error() {
        let args = Args::parse_from(["bid-inspector", "--config", "bridge.toml"]);
        assert!(args.raw_txs().is_err());
    }
}
