use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, bail};
use clap::{ArgAction, ArgGroup, Parser};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use fmerge::common::{io_error_msg, parse_size, reset_sigpipe};
use fmerge::merge::{
    MergeError, MergeOptions, MergeRequest, MergeSummary, OutputMode, default_window_size,
    merge_files,
};

#[derive(Parser)]
#[command(
    name = "fmerge",
    version,
    about = "Merge two sorted files into OUTFILE",
    long_about = "Merge two individually sorted files FILE1 and FILE2 into OUTFILE.\n\
                  The result is written to a temporary file next to OUTFILE and only\n\
                  renamed into place once the whole merge has succeeded."
)]
#[command(group(ArgGroup::new("mode").required(true).args(["unique", "all"])))]
struct Cli {
    /// Output each distinct line once
    #[arg(short = 'u', long = "unique")]
    unique: bool,

    /// Output all lines, including duplicates
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Ignore case when comparing lines
    #[arg(short = 'i', long = "ignore-case")]
    ignore_case: bool,

    /// Fail if either input is not sorted
    #[arg(short = 't', long = "check-sorted")]
    check_sorted: bool,

    /// Print the number of lines written
    #[arg(short = 'd', long = "count")]
    count: bool,

    /// Use SIZE bytes for each input buffer (K, M, G suffixes allowed)
    #[arg(short = 'S', long = "buffer-size", value_name = "SIZE")]
    buffer_size: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Destination file
    output: PathBuf,

    /// First sorted input
    file1: PathBuf,

    /// Second sorted input
    file2: PathBuf,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<MergeSummary> {
    let mode = OutputMode::from_flags(cli.unique, cli.all)?;

    let window_size = match &cli.buffer_size {
        Some(s) => parse_size(s).map_err(|e| anyhow!("invalid buffer size '{}': {}", s, e))?,
        None => default_window_size(),
    };
    if window_size == 0 {
        bail!("invalid buffer size '0'");
    }

    let options = MergeOptions {
        mode,
        case_insensitive: cli.ignore_case,
        require_sorted: cli.check_sorted,
        count_lines: cli.count,
        window_size,
    };
    let request = MergeRequest::new(&cli.file1, &cli.file2, &cli.output, options);
    Ok(merge_files(&request)?)
}

fn error_msg(err: &anyhow::Error) -> String {
    match err.downcast_ref::<MergeError>() {
        Some(MergeError::File { path, source }) => {
            format!("{}: {}", path.display(), io_error_msg(source))
        }
        Some(MergeError::Read { input, source }) => {
            format!("{}: {}", input, io_error_msg(source))
        }
        Some(MergeError::Io(e)) => io_error_msg(e),
        _ => format!("{:#}", err),
    }
}

fn main() {
    reset_sigpipe();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            if let Some(n) = summary.lines_written {
                println!("{} lines written to {}", n, cli.output.display());
            }
        }
        Err(e) => {
            eprintln!("fmerge: {}", error_msg(&e));
            let code = e
                .downcast_ref::<MergeError>()
                .map_or(2, MergeError::exit_code);
            process::exit(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    fn cmd() -> Command {
        let mut path = std::env::current_exe().unwrap();
        path.pop();
        path.pop();
        path.push("fmerge");
        Command::new(path)
    }

    fn inputs(a: &str, b: &str) -> (tempfile::TempDir, String, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let f1 = dir.path().join("a.txt");
        let f2 = dir.path().join("b.txt");
        let out = dir.path().join("out.txt");
        std::fs::write(&f1, a).unwrap();
        std::fs::write(&f2, b).unwrap();
        let (f1, f2, out) = (
            f1.to_str().unwrap().to_string(),
            f2.to_str().unwrap().to_string(),
            out.to_str().unwrap().to_string(),
        );
        (dir, f1, f2, out)
    }

    #[test]
    fn test_merge_help() {
        let output = cmd().arg("--help").output().unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
    }

    #[test]
    fn test_merge_version() {
        let output = cmd().arg("--version").output().unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("fmerge"));
    }

    #[test]
    fn test_merge_all_with_count() {
        let (_dir, f1, f2, out) = inputs("apple\nbanana\ncherry\n", "banana\ndate\n");
        let output = cmd().args(["-a", "-d", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert!(output.status.success());
        assert_eq!(
            std::fs::read_to_string(out.as_str()).unwrap(),
            "apple\nbanana\nbanana\ncherry\ndate\n"
        );
        assert!(String::from_utf8_lossy(&output.stdout).contains("5 lines written"));
    }

    #[test]
    fn test_merge_unique_combined_flags() {
        let (_dir, f1, f2, out) = inputs("apple\nbanana\ncherry\n", "banana\ndate\n");
        let output = cmd().args(["-ud", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert!(output.status.success());
        assert_eq!(
            std::fs::read_to_string(out.as_str()).unwrap(),
            "apple\nbanana\ncherry\ndate\n"
        );
        assert!(String::from_utf8_lossy(&output.stdout).contains("4 lines written"));
    }

    #[test]
    fn test_merge_no_count_prints_nothing() {
        let (_dir, f1, f2, out) = inputs("a\n", "b\n");
        let output = cmd().args(["-a", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_merge_requires_mode() {
        let (_dir, f1, f2, out) = inputs("a\n", "b\n");
        let output = cmd().args([out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(!std::path::Path::new(out.as_str()).exists());
    }

    #[test]
    fn test_merge_modes_conflict() {
        let (_dir, f1, f2, out) = inputs("a\n", "b\n");
        let output = cmd().args(["-u", "-a", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_merge_missing_operand() {
        let (_dir, f1, _f2, out) = inputs("a\n", "b\n");
        let output = cmd().args(["-a", out.as_str(), f1.as_str()]).output().unwrap();
        assert!(!output.status.success());
    }

    #[test]
    fn test_merge_not_sorted_exit_code() {
        let (_dir, f1, f2, out) = inputs("b\na\n", "c\n");
        let output = cmd().args(["-a", "-t", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("not in sorted order"));
        assert!(!std::path::Path::new(out.as_str()).exists());
    }

    #[test]
    fn test_merge_unsorted_best_effort() {
        let (_dir, f1, f2, out) = inputs("b\na\n", "c\n");
        let output = cmd().args(["-a", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert!(output.status.success());
        assert_eq!(std::fs::read_to_string(out.as_str()).unwrap(), "b\nc\n");
    }

    #[test]
    fn test_merge_ignore_case() {
        let (_dir, f1, f2, out) = inputs("Apple\nbanana\n", "apple\nBanana\n");
        let output = cmd().args(["-ui", out.as_str(), f1.as_str(), f2.as_str()]).output().unwrap();
        assert!(output.status.success());
        assert_eq!(std::fs::read_to_string(out.as_str()).unwrap(), "Apple\nBanana\n");
    }

    #[test]
    fn test_merge_nonexistent_file() {
        let (_dir, f1, _f2, out) = inputs("a\n", "b\n");
        let output = cmd()
            .args(["-a", out.as_str(), f1.as_str(), "/nonexistent/file"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("No such file"));
    }

    #[test]
    fn test_merge_same_input_twice() {
        let (_dir, f1, _f2, out) = inputs("a\n", "b\n");
        let output = cmd().args(["-a", out.as_str(), f1.as_str(), f1.as_str()]).output().unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("same file"));
    }

    #[test]
    fn test_merge_small_buffer_long_lines() {
        let long_a = "a".repeat(100);
        let long_b = "b".repeat(100);
        let (_dir, f1, f2, out) =
            inputs(&format!("{}\n", long_a), &format!("{}\nc\n", long_b));
        let output = cmd()
            .args(["-a", "-S", "8", out.as_str(), f1.as_str(), f2.as_str()])
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(
            std::fs::read_to_string(out.as_str()).unwrap(),
            format!("{}\n{}\nc\n", long_a, long_b)
        );
    }

    #[test]
    fn test_merge_invalid_buffer_size() {
        let (_dir, f1, f2, out) = inputs("a\n", "b\n");
        let output = cmd()
            .args(["-a", "-S", "12Q", out.as_str(), f1.as_str(), f2.as_str()])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("invalid buffer size"));
    }
}
