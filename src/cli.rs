// Command-line front end for rsdelta.
//
// rdiff-style subcommands (signature, delta, patch) over files or stdio,
// plus `inspect` to list the commands in a delta and `remap` to locate a
// signature's blocks inside a basis.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::delta::SeekBasis;
use crate::format::command::{Instruction, InstructionIter};
use crate::hash::config::{DEFAULT_BLOCK_LEN, DEFAULT_STRONG_LEN, SignatureOptions};
use crate::hash::matching::reverse_match;
use crate::io::{self as stream, BUF_SIZE, RunStats};

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// rsync-algorithm signature, delta and patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "rsdelta",
    version,
    about = "rsync-style signature, delta and patch",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Signature block size in bytes (K/M suffixes accepted).
    #[arg(short = 'b', long = "block-size", global = true, value_parser = parse_byte_size, default_value_t = DEFAULT_BLOCK_LEN as u64)]
    block_size: u64,

    /// Bytes of strong checksum kept per block.
    #[arg(short = 'S', long = "sum-size", global = true, value_parser = clap::value_parser!(u8).range(1..=16), default_value_t = DEFAULT_STRONG_LEN as u8)]
    sum_size: u8,

    /// Show job statistics on stderr.
    #[arg(short = 's', long = "statistics", visible_alias = "stats", global = true)]
    statistics: bool,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Verbose mode (twice for per-command tracing).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write the signature of a basis file.
    Signature(SignatureArgs),
    /// Write the delta turning a signature's basis into a new file.
    Delta(DeltaArgs),
    /// Rebuild a new file from its basis and a delta.
    Patch(PatchArgs),
    /// List the commands in a delta file.
    Inspect(InspectArgs),
    /// Locate each block of a signature inside a basis file.
    Remap(RemapArgs),
}

#[derive(Args, Debug)]
struct SignatureArgs {
    /// Basis file (`-` or omitted for stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    basis: Option<PathBuf>,

    /// Signature output (`-` or omitted for stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    signature: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DeltaArgs {
    /// Signature of the basis.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,

    /// New file (`-` or omitted for stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    new: Option<PathBuf>,

    /// Delta output (`-` or omitted for stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    delta: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Basis file; must be seekable.
    #[arg(value_hint = ValueHint::FilePath)]
    basis: PathBuf,

    /// Delta file (`-` or omitted for stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    delta: Option<PathBuf>,

    /// Output (`-` or omitted for stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    new: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Delta file (`-` or omitted for stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    delta: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RemapArgs {
    /// Signature of the new file.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,

    /// Basis file to scan.
    #[arg(value_hint = ValueHint::FilePath)]
    basis: PathBuf,
}

// ---------------------------------------------------------------------------
// Stdio plumbing
// ---------------------------------------------------------------------------

/// `None` or `-` selects stdin/stdout.
fn named(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| *p != Path::new("-"))
}

fn open_input(path: Option<&Path>, what: &str) -> Result<Box<dyn Read>, String> {
    match named(path) {
        Some(path) => File::open(path)
            .map(|f| Box::new(BufReader::with_capacity(BUF_SIZE, f)) as Box<dyn Read>)
            .map_err(|e| format!("{what} file: {}: {e}", path.display())),
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&Path>, force: bool) -> Result<Box<dyn Write>, String> {
    match named(path) {
        Some(path) => {
            if path.exists() && !force {
                return Err(format!(
                    "output file exists, use -f to overwrite: {}",
                    path.display()
                ));
            }
            File::create(path)
                .map(|f| Box::new(BufWriter::with_capacity(BUF_SIZE, f)) as Box<dyn Write>)
                .map_err(|e| format!("output file: {}: {e}", path.display()))
        }
        None => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
    }
}

fn read_all(path: Option<&Path>, what: &str) -> Result<Vec<u8>, String> {
    let mut data = Vec::new();
    open_input(path, what)?
        .read_to_end(&mut data)
        .map_err(|e| format!("{what}: read error: {e}"))?;
    Ok(data)
}

fn load_signature(path: &Path) -> Result<(crate::signature::Signature, RunStats), String> {
    let input = open_input(Some(path), "signature")?;
    let (sig, stats) = stream::load_signature_file(input)
        .map_err(|e| format!("signature: {}: {e}", path.display()))?;
    Ok((sig, RunStats {
        job: stats,
        output_sha256: None,
    }))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_signature(cli: &Cli, args: &SignatureArgs) -> Result<Vec<RunStats>, String> {
    let block_len = usize::try_from(cli.block_size).unwrap_or(usize::MAX);
    let opts = SignatureOptions::new(block_len, usize::from(cli.sum_size))
        .map_err(|e| e.to_string())?;
    let input = open_input(args.basis.as_deref(), "basis")?;
    let output = open_output(args.signature.as_deref(), cli.force)?;
    let stats = stream::signature_file(input, output, opts).map_err(|e| e.to_string())?;
    Ok(vec![stats])
}

fn cmd_delta(cli: &Cli, args: &DeltaArgs) -> Result<Vec<RunStats>, String> {
    if named(Some(args.signature.as_path())).is_none() && named(args.new.as_deref()).is_none() {
        return Err("signature and new file cannot both come from stdin".into());
    }
    let (sig, load_stats) = load_signature(&args.signature)?;
    let input = open_input(args.new.as_deref(), "new")?;
    let output = open_output(args.delta.as_deref(), cli.force)?;
    let stats = stream::delta_file(&sig, input, output).map_err(|e| e.to_string())?;
    Ok(vec![load_stats, stats])
}

fn cmd_patch(cli: &Cli, args: &PatchArgs) -> Result<Vec<RunStats>, String> {
    let Some(basis_path) = named(Some(args.basis.as_path())) else {
        return Err("basis must be a seekable file, not stdin".into());
    };
    let basis = File::open(basis_path)
        .map(|f| BufReader::with_capacity(BUF_SIZE, f))
        .and_then(SeekBasis::new)
        .map_err(|e| format!("basis file: {}: {e}", basis_path.display()))?;
    let input = open_input(args.delta.as_deref(), "delta")?;
    let output = open_output(args.new.as_deref(), cli.force)?;
    let stats = stream::patch_file(basis, input, output).map_err(|e| e.to_string())?;
    Ok(vec![stats])
}

fn cmd_inspect(cli: &Cli, args: &InspectArgs) -> Result<Vec<RunStats>, String> {
    let delta = read_all(args.delta.as_deref(), "delta")?;
    let iter = InstructionIter::new(&delta).map_err(|e| e.to_string())?;

    let mut out = io::stdout().lock();
    let mut position = 0u64;
    let (mut copies, mut literals) = (0u64, 0u64);
    for inst in iter {
        let inst = inst.map_err(|e| e.to_string())?;
        let line = match inst {
            Instruction::Copy { offset, len } => {
                copies += 1;
                format!("{position:>12}  COPY     {offset} {len}")
            }
            Instruction::Literal { len } => {
                literals += 1;
                format!("{position:>12}  LITERAL  {len}")
            }
        };
        if !cli.json_output {
            writeln!(out, "{line}").map_err(|e| e.to_string())?;
        }
        position += inst.output_len();
    }

    if cli.json_output {
        let json = serde_json::json!({
            "command": "inspect",
            "delta_size": delta.len(),
            "output_size": position,
            "copy_cmds": copies,
            "literal_cmds": literals,
        });
        writeln!(out, "{json:#}").map_err(|e| e.to_string())?;
    } else {
        writeln!(
            out,
            "{copies} copies, {literals} literals, {position} bytes of output"
        )
        .map_err(|e| e.to_string())?;
    }
    Ok(Vec::new())
}

fn cmd_remap(cli: &Cli, args: &RemapArgs) -> Result<Vec<RunStats>, String> {
    let (sig, load_stats) = load_signature(&args.signature)?;
    let basis = read_all(Some(args.basis.as_path()), "basis")?;
    let map = reverse_match(&sig, &basis);

    let mut out = io::stdout().lock();
    if cli.json_output {
        let json = serde_json::json!({
            "command": "remap",
            "block_len": sig.block_len(),
            "blocks": map,
        });
        writeln!(out, "{json:#}").map_err(|e| e.to_string())?;
    } else {
        for (block, found) in map.iter().enumerate() {
            match found {
                Some(offset) => writeln!(out, "{block}\t{offset}"),
                None => writeln!(out, "{block}\t-"),
            }
            .map_err(|e| e.to_string())?;
        }
    }
    Ok(vec![load_stats])
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn report(cli: &Cli, runs: &[RunStats]) {
    for run in runs {
        if cli.statistics {
            eprintln!("rsdelta: {}", run.job);
        }
        if cli.json_output {
            let s = &run.job;
            let json = serde_json::json!({
                "op": s.op,
                "literal": { "cmds": s.lit_cmds, "bytes": s.lit_bytes, "cmdbytes": s.lit_cmdbytes },
                "copy": { "cmds": s.copy_cmds, "bytes": s.copy_bytes, "cmdbytes": s.copy_cmdbytes },
                "signature": { "blocks": s.sig_blocks, "bytes": s.sig_bytes, "block_len": s.block_len },
                "false_matches": s.false_matches,
                "in_bytes": s.in_bytes,
                "out_bytes": s.out_bytes,
                "elapsed_secs": s.elapsed.as_secs_f64(),
                "output_sha256": run.output_sha256.map(|h| hex(&h)),
            });
            eprintln!("{json:#}");
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let result = match &cli.command {
        Cmd::Signature(args) => cmd_signature(&cli, args),
        Cmd::Delta(args) => cmd_delta(&cli, args),
        Cmd::Patch(args) => cmd_patch(&cli, args),
        Cmd::Inspect(args) => cmd_inspect(&cli, args),
        Cmd::Remap(args) => cmd_remap(&cli, args),
    };

    match result {
        Ok(runs) => {
            report(&cli, &runs);
            process::exit(0);
        }
        Err(msg) => {
            eprintln!("rsdelta: {msg}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
