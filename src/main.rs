mod check;
mod collectors;
mod config;
mod error;
mod handlers;
mod models;

use anyhow::{Context, Result};
use check::aggregate::Verdict;
use check::{CheckOptions, Status};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use collectors::SourceKind;
use config::{Config, DiskConfig};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "diskcheck", about = "Filesystem capacity check and Zenoss event handler", version)]
struct Cli {
    /// Config file (default: ~/.config/diskcheck/diskcheck.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check block and inode usage: exit 0=OK, 1=WARNING, 2=CRITICAL, 3=UNKNOWN
    Disk(DiskArgs),

    /// Read a Sensu event on stdin and send it to Zenoss
    Zenoss,

    /// Print config file path and current values, then exit
    Config,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
struct DiskArgs {
    /// Only check fs type(s)
    #[arg(short = 't', long = "fstype", value_name = "TYPE[,TYPE]", value_delimiter = ',')]
    fstype: Option<Vec<String>>,

    /// Ignore fs type(s)
    #[arg(short = 'x', long = "ignore-type", value_name = "TYPE[,TYPE]", value_delimiter = ',')]
    ignore_type: Option<Vec<String>>,

    /// Only check mount point(s)
    #[arg(short = 'I', long = "include-mount", value_name = "MNT[,MNT]", value_delimiter = ',')]
    include_mount: Option<Vec<String>>,

    /// Ignore mount point(s)
    #[arg(short = 'i', long = "ignore-mount", value_name = "MNT[,MNT]", value_delimiter = ',')]
    ignore_mount: Option<Vec<String>>,

    /// Only include df line(s) matching regex(es)
    #[arg(short = 'L', long = "include-line", value_name = "PATTERN[,PATTERN]", value_delimiter = ',')]
    include_line: Option<Vec<String>>,

    /// Ignore df line(s) matching regex(es)
    #[arg(short = 'l', long = "ignore-line", value_name = "PATTERN[,PATTERN]", value_delimiter = ',')]
    ignore_line: Option<Vec<String>>,

    /// Include remote filesystems
    #[arg(short = 'r', long = "remote")]
    remote: bool,

    /// Warn if PERCENT or more of disk full
    #[arg(short = 'w', long = "warn", value_name = "PERCENT")]
    warn: Option<u32>,

    /// Critical if PERCENT or more of disk full
    #[arg(short = 'c', long = "crit", value_name = "PERCENT")]
    crit: Option<u32>,

    /// Warn if PERCENT or more of inodes used
    #[arg(short = 'W', long = "iwarn", value_name = "PERCENT")]
    iwarn: Option<u32>,

    /// Critical if PERCENT or more of inodes used
    #[arg(short = 'K', long = "icrit", value_name = "PERCENT")]
    icrit: Option<u32>,

    /// Output list of included filesystems
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Where usage rows come from
    #[arg(long, value_enum)]
    source: Option<SourceKind>,
}

impl DiskArgs {
    /// Flags win over the config file field by field. Empty lists count as unset.
    fn merge(self, base: DiskConfig) -> (CheckOptions, SourceKind) {
        let mut f = base.filters;
        let mut t = base.thresholds;

        override_list(&mut f.include_types, self.fstype);
        override_list(&mut f.exclude_types, self.ignore_type);
        override_list(&mut f.include_mounts, self.include_mount);
        override_list(&mut f.exclude_mounts, self.ignore_mount);
        override_list(&mut f.include_lines, self.include_line);
        override_list(&mut f.exclude_lines, self.ignore_line);
        for list in [
            &mut f.include_types, &mut f.exclude_types,
            &mut f.include_mounts, &mut f.exclude_mounts,
            &mut f.include_lines, &mut f.exclude_lines,
        ] {
            if list.as_ref().is_some_and(|l| l.is_empty()) {
                *list = None;
            }
        }

        t.block_warn = self.warn.or(t.block_warn);
        t.block_crit = self.crit.or(t.block_crit);
        t.inode_warn = self.iwarn.or(t.inode_warn);
        t.inode_crit = self.icrit.or(t.inode_crit);

        let opts = CheckOptions {
            filters:        f,
            thresholds:     t,
            include_remote: self.remote || base.remote,
            debug:          self.debug,
        };
        (opts, self.source.unwrap_or(base.source))
    }
}

fn override_list(slot: &mut Option<Vec<String>>, flag: Option<Vec<String>>) {
    if flag.is_some() {
        *slot = flag;
    }
}

fn main() -> Result<()> {
    let cli = parse_cli();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Disk(args) => run_disk(args, cli.config.as_deref()),
        Command::Zenoss => run_zenoss(cli.config.as_deref()),
        Command::Config => run_print_config(cli.config.as_deref()),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "diskcheck", &mut io::stdout());
            Ok(())
        }
    }
}

/// Usage errors exit UNKNOWN (3), not clap's default 2, which monitoring reads as CRITICAL.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(Status::Unknown.exit_code());
        }
        Err(e) => e.exit(),
    }
}

fn run_disk(args: DiskArgs, config_path: Option<&Path>) -> Result<()> {
    let cfg = match Config::load(config_path) {
        Ok(c)  => c,
        Err(e) => finish(Verdict { status: Status::Unknown, summary: format!("{:#}", e) }),
    };

    let (opts, source) = args.merge(cfg.disk);
    log::info!("reading usage via {:?} (remote {})", source, opts.include_remote);

    let source = source.build();
    let verdict = check::run(source.as_ref(), &opts, &mut |line| println!("{}", line));
    finish(verdict)
}

fn finish(verdict: Verdict) -> ! {
    println!("CheckDisk {}: {}", verdict.status.label(), verdict.summary);
    std::process::exit(verdict.status.exit_code());
}

fn run_zenoss(config_path: Option<&Path>) -> Result<()> {
    let cfg = Config::load(config_path)?;
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("reading event from stdin")?;
    handlers::zenoss::handle(&input, &cfg.zenoss)
}

fn run_print_config(config_path: Option<&Path>) -> Result<()> {
    let cfg = Config::load(config_path)?;
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(Config::config_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    print!("{}", cfg.display_toml()?);
    Ok(())
}
