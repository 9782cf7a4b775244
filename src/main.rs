use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use humansize::{format_size, BINARY};
use scrub::{get_policy, load_policies, Cleaner, RunOptions, RunReport, DEFAULT_POLICY};
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Back up user data, then remove build output, dependency caches and generated files before a commit",
    long_about = None
)]
struct Args {
    /// Cleanup policy to apply (see --list-policies)
    #[arg(long, short, default_value = DEFAULT_POLICY)]
    policy: String,

    /// Show every removed file and skipped entry
    #[arg(long, short)]
    verbose: bool,

    /// Measure what is removed and report the space freed
    #[arg(long)]
    sizes: bool,

    /// List the built-in policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Project root override for test harnesses; defaults to the executable's directory
    #[arg(long, hide = true)]
    root: Option<PathBuf>,
}

/// The project root is the directory holding the executable, not the cwd
fn default_root() -> Result<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(|p| p.to_path_buf())
        .context("Executable has no parent directory")
}

fn list_policies() -> Result<()> {
    for (name, policy) in load_policies()? {
        let marker = if name == DEFAULT_POLICY { " (default)" } else { "" };
        println!("{}{}", name.bold(), marker);
        if !policy.description.is_empty() {
            println!("  {}", policy.description);
        }
    }
    Ok(())
}

fn print_summary(report: &RunReport, sizes: bool) {
    println!("========================================");
    println!("Directories removed: {}", report.removal.directories.len());
    println!("Files removed: {}", report.removal.files_removed());
    if sizes {
        println!(
            "Total Size Removed: {}",
            format_size(report.removal.bytes_removed(), BINARY).bold().red()
        );
    }

    let warnings = report.warning_count();
    if warnings > 0 {
        println!("{}", format!("Warnings: {}", warnings).yellow());
    }

    if let Some(hint) = &report.restore_hint {
        println!("Restore user data:");
        println!("{}", hint);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_policies {
        return list_policies();
    }

    let policy = get_policy(&args.policy)?;
    let root = match args.root {
        Some(root) => root,
        None => default_root()?,
    };

    let options = RunOptions {
        verbose: args.verbose,
        calculate_sizes: args.sizes,
    };

    let report = Cleaner::new(root, policy, options)?.run()?;
    print_summary(&report, args.sizes);

    Ok(())
}
