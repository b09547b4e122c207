//! binseek - Decode fixed-layout binary records and search binary files
//!
//! This tool splits files of fixed-size binary records into delimited text
//! lines, locates byte patterns in files too large to load at once, and
//! dumps byte ranges as hex.

use anyhow::{bail, Context, Result};
use binseek_core::buffer::take_hex_upper;
use binseek_core::{RecordSchema, RecordSplitter, SeekReader, SplitOptions};
use clap::{Args, Parser, Subcommand};
use encoding_rs::Encoding;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Decode fixed-layout binary records and search binary files
#[derive(Parser, Debug)]
#[command(name = "binseek")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split fixed-size records into delimited text lines
    Split(SplitArgs),
    /// Print the offset of the n-th occurrence of a pattern
    Find(FindArgs),
    /// Print a byte range as uppercase hex
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single record file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of record files to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SplitArgs {
    #[command(flatten)]
    input: InputMode,

    /// Comma-separated field descriptors, e.g. 01s17,02i4,03s8,0403
    #[arg(short, long)]
    schema: String,

    /// Separator placed between fields
    #[arg(long, default_value = "@")]
    separator: String,

    /// Strip trailing spaces from text fields
    #[arg(long)]
    trim_right: bool,

    /// Encoding of text fields (any WHATWG label, e.g. utf-8, gbk)
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// With --directory, only process files ending with this suffix (case-insensitive)
    #[arg(long, default_value = "")]
    suffix: String,

    /// Byte offset of the first record in each file
    #[arg(long, default_value = "0")]
    skip: u64,

    /// Write lines to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
#[group(id = "pattern", required = true, multiple = false)]
struct PatternArgs {
    /// Pattern given as text
    #[arg(long)]
    text: Option<String>,

    /// Pattern given as hex, e.g. 0d0a
    #[arg(long)]
    hex: Option<String>,
}

#[derive(Args, Debug)]
struct FindArgs {
    /// File to search
    #[arg(short, long)]
    file: PathBuf,

    #[command(flatten)]
    pattern: PatternArgs,

    /// Offset to start searching from
    #[arg(long, default_value = "0")]
    from: u64,

    /// Which occurrence to report (1 = first)
    #[arg(long, default_value = "1")]
    nth: usize,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// File to read
    #[arg(short, long)]
    file: PathBuf,

    /// Offset of the first byte
    #[arg(long, default_value = "0")]
    offset: u64,

    /// Number of bytes to dump
    #[arg(short, long)]
    len: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Split(args) => run_split(args),
        Command::Find(args) => run_find(args),
        Command::Dump(args) => run_dump(args),
    }
}

/// Build the splitter described by the command line
fn build_splitter(args: &SplitArgs) -> Result<RecordSplitter> {
    let schema = RecordSchema::parse_list(&args.schema)
        .with_context(|| format!("Invalid schema: {}", args.schema))?;
    if schema.record_len() == 0 {
        bail!("Schema describes zero-length records: {}", args.schema);
    }

    let Some(encoding) = Encoding::for_label(args.encoding.as_bytes()) else {
        bail!("Unknown encoding: {}", args.encoding);
    };

    let options = SplitOptions::new()
        .separator(args.separator.as_str())
        .trim_right(args.trim_right)
        .encoding(encoding);

    Ok(RecordSplitter::new(schema, options)?)
}

fn run_split(args: &SplitArgs) -> Result<()> {
    let splitter = build_splitter(args)?;
    debug!(
        "Schema has {} fields, {} bytes per record",
        splitter.schema().fields().len(),
        splitter.schema().record_len()
    );

    let lines = if let Some(ref file) = args.input.file {
        if !file.is_file() {
            bail!("Input path is not a file: {}", file.display());
        }
        split_file(&splitter, file, args.skip)?
    } else if let Some(ref directory) = args.input.directory {
        split_directory(&splitter, directory, &args.suffix, args.skip)?
    } else {
        bail!("Either --file or --directory must be specified")
    };

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    match args.output {
        Some(ref output) => {
            write_output(output, &content, args.force)?;
            info!("Wrote {} lines to {}", lines.len(), output.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Split every record in one file
fn split_file(splitter: &RecordSplitter, path: &Path, skip: u64) -> Result<Vec<String>> {
    let record_len = splitter.schema().record_len();
    let mut reader = SeekReader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let end = reader.end_position()?;
    if skip > end {
        bail!("Offset {} is past the end of {} ({} bytes)", skip, path.display(), end);
    }
    reader.move_to(skip)?;

    let body = end - skip;
    let record_len_u64 = record_len as u64;
    if body % record_len_u64 != 0 {
        bail!(
            "{}: {} bytes is not a whole number of {}-byte records",
            path.display(),
            body,
            record_len
        );
    }

    let count = body / record_len_u64;
    trace!("Splitting {} records from {}", count, path.display());

    let mut lines = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    for index in 0..count {
        let record = reader.read_bytes(record_len)?;
        let line = splitter.split(&record).with_context(|| {
            format!(
                "{}: record {} at offset {}",
                path.display(),
                index,
                skip + index * record_len_u64
            )
        })?;
        lines.push(line);
    }
    reader.close();

    Ok(lines)
}

/// Split every matching file under a directory
fn split_directory(
    splitter: &RecordSplitter,
    directory: &Path,
    suffix: &str,
    skip: u64,
) -> Result<Vec<String>> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut lines = Vec::new();
    let mut files_processed = 0;

    let mut paths: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_suffix(p, suffix))
        .collect();
    paths.sort();

    for path in paths {
        debug!("Processing {}", path.display());
        match split_file(splitter, &path, skip) {
            Ok(mut file_lines) => {
                lines.append(&mut file_lines);
                files_processed += 1;
            }
            Err(e) => {
                // Log error but continue with other files
                warn!("Error processing {}: {:#}", path.display(), e);
            }
        }
    }

    info!("Processed {} files", files_processed);
    Ok(lines)
}

/// Case-insensitive file name suffix match; an empty suffix matches everything
fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_uppercase().ends_with(&suffix.to_uppercase()))
        .unwrap_or(false)
}

fn run_find(args: &FindArgs) -> Result<()> {
    let needle = parse_pattern(&args.pattern)?;
    let mut reader = SeekReader::from_path(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;

    let found = reader
        .try_index_of_nth(args.from, &needle, args.nth)
        .with_context(|| format!("Search failed in {}", args.file.display()))?;
    reader.close();

    match found {
        Some(offset) => println!("{}", offset),
        None => {
            info!("Pattern occurs fewer than {} times", args.nth);
            println!("not found");
        }
    }
    Ok(())
}

/// Turn the --text / --hex option into the bytes to search for
fn parse_pattern(pattern: &PatternArgs) -> Result<Vec<u8>> {
    let needle = match (&pattern.text, &pattern.hex) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(hex)) => {
            hex::decode(hex.trim()).with_context(|| format!("Invalid hex pattern: {}", hex))?
        }
        (None, None) => bail!("Either --text or --hex must be specified"),
    };
    if needle.is_empty() {
        bail!("Search pattern must not be empty");
    }
    Ok(needle)
}

fn run_dump(args: &DumpArgs) -> Result<()> {
    let mut reader = SeekReader::from_path(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    reader.move_to(args.offset)?;

    let data = reader.read_bytes(args.len).with_context(|| {
        format!(
            "Failed to read {} bytes at offset {} of {}",
            args.len,
            args.offset,
            args.file.display()
        )
    })?;
    reader.close();

    let (hex, _) = take_hex_upper(&data, data.len());
    println!("{}", hex);
    Ok(())
}

/// Write the output file, refusing to clobber an existing one unless forced
fn write_output(output_path: &Path, content: &str, force: bool) -> Result<()> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    // Check if file exists
    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    // Write the file
    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}
