//! Command-line Interface

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gudang", version, about = "Store, list and delete video files")]
pub struct Cli {
    /// Extra config file, merged over the user and working-directory ones.
    #[arg(short, long, global = true, env = "GUDANG_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More logging; repeat for more detail.
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}
impl Cli {
    pub fn verbosity(&self) -> i8 {
        if self.quiet { -1 } else { i8::try_from(self.verbose).unwrap_or(i8::MAX) }
    }
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Store a video file and record its metadata.
    Upload {
        file: PathBuf,
        /// Store under this name instead of the file's own name.
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List stored videos, newest first.
    #[command(visible_alias = "ls")]
    List,
    /// Show a single stored video.
    Show { filename: String },
    /// Delete a stored video and its metadata.
    #[command(visible_alias = "rm")]
    Delete { filename: String },
    /// Compare the storage directory with the metadata store.
    Verify {
        /// Delete files that have no metadata and partial uploads abandoned for an hour.
        #[arg(long)]
        prune: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["gudang", "list"], Command::List)]
    #[case(&["gudang", "ls"], Command::List)]
    #[case(&["gudang", "rm", "clip.mp4"], Command::Delete { filename: "clip.mp4".to_string() })]
    #[case(&["gudang", "show", "clip.mp4"], Command::Show { filename: "clip.mp4".to_string() })]
    #[case(&["gudang", "verify", "--prune"], Command::Verify { prune: true })]
    #[case(
        &["gudang", "upload", "/tmp/a.mp4", "--name", "b.mp4"],
        Command::Upload { file: PathBuf::from("/tmp/a.mp4"), name: Some("b.mp4".to_string()) }
    )]
    fn test_parse(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.command, expected);
    }

    #[rstest]
    #[case(&["gudang", "list"], 0)]
    #[case(&["gudang", "-vv", "list"], 2)]
    #[case(&["gudang", "list", "-q"], -1)]
    fn test_verbosity(#[case] args: &[&str], #[case] expected: i8) {
        assert_eq!(Cli::try_parse_from(args).unwrap().verbosity(), expected);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["gudang", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_delete_requires_filename() {
        assert!(Cli::try_parse_from(["gudang", "delete"]).is_err());
    }
}
