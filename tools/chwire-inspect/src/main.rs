// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! chwire-inspect - Decode RowBinary streams and explain type declarations.
//!
//! Usage:
//!   chwire-inspect rows --input dump.bin --header
//!   chwire-inspect rows --input - --compressed --types "UInt64, String" --names id,name
//!   chwire-inspect type "Map(String, Array(Nullable(UInt8)))"

use anyhow::{bail, Context};
use chwire::codec::{ByteSource, IoSource};
use chwire::transport::BlockReader;
use chwire::types::{parse_type, ColumnList, TypeNode};
use chwire::{RowReader, Schema, WireConfig};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "chwire-inspect")]
#[command(about = "Decode RowBinary streams and explain type declarations")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print decoded rows, one per line, tab separated
    Rows(RowsArgs),
    /// Print the parsed structure of a type declaration
    Type {
        /// Declaration, e.g. "Array(Nullable(UInt8))"
        declaration: String,
    },
}

#[derive(clap::Args, Debug)]
struct RowsArgs {
    /// Input file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Input is a checksummed compressed block stream
    #[arg(short, long)]
    compressed: bool,

    /// Stream starts with a names-and-types header
    #[arg(long)]
    header: bool,

    /// Column types when there is no header, e.g. "UInt64, String"
    #[arg(short, long)]
    types: Option<String>,

    /// Column names for --types, comma separated
    #[arg(short, long)]
    names: Option<String>,

    /// Stop after N rows
    #[arg(short, long)]
    limit: Option<u64>,

    /// YAML stream settings (timezone, limits)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the column header line
    #[arg(long)]
    show_schema: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args.log_level.parse().unwrap_or(tracing::Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match args.command {
        Command::Rows(rows) => run_rows(&rows, &mut out)?,
        Command::Type { declaration } => {
            let node = parse_type(&declaration).context("invalid type declaration")?;
            render_tree(&node, 0, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn open_input(path: &str) -> anyhow::Result<BufReader<Box<dyn Read>>> {
    let inner: Box<dyn Read> = if path == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(path).with_context(|| format!("cannot open {}", path))?)
    };
    Ok(BufReader::new(inner))
}

fn load_config(args: &RowsArgs) -> anyhow::Result<WireConfig> {
    let config = match &args.config {
        Some(path) => WireConfig::from_yaml_file(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => WireConfig::default(),
    };
    let with_header = args.header || config.with_header;
    Ok(config.with_header(with_header))
}

/// Schema from `--types` / `--names`.
fn build_schema(types: &str, names: Option<&str>) -> anyhow::Result<Schema> {
    let nodes = ColumnList::new(types)
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --types")?;
    match names {
        None => Ok(Schema::new(nodes)),
        Some(list) => {
            let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
            if names.len() != nodes.len() {
                bail!("{} names given for {} columns", names.len(), nodes.len());
            }
            Ok(Schema::with_names(names, nodes)?)
        }
    }
}

fn run_rows<W: Write>(args: &RowsArgs, out: &mut W) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let input = open_input(&args.input)?;
    if args.compressed {
        read_rows(BlockReader::with_config(input, &config), args, &config, out)
    } else {
        read_rows(IoSource::new(input), args, &config, out)
    }
}

fn read_rows<S: ByteSource, W: Write>(
    source: S,
    args: &RowsArgs,
    config: &WireConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    let options = config.codec_options()?;
    let reader = if config.with_header {
        RowReader::with_header(source, options).context("cannot read header")?
    } else {
        let Some(types) = &args.types else {
            bail!("either --header or --types is required");
        };
        RowReader::new(source, build_schema(types, args.names.as_deref())?, options)
    };
    debug!("schema: {} columns", reader.schema().len());

    if args.show_schema {
        let header: Vec<String> = reader
            .schema()
            .names()
            .iter()
            .zip(reader.schema().types())
            .map(|(name, node)| format!("{} {}", name, node.canonical()))
            .collect();
        writeln!(out, "{}", header.join("\t"))?;
    }

    let mut count = 0u64;
    for row in reader {
        if args.limit.is_some_and(|limit| count >= limit) {
            break;
        }
        let row = row.with_context(|| format!("row {}", count))?;
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(out, "{}", line.join("\t"))?;
        count += 1;
    }
    info!("{} rows", count);
    Ok(())
}

fn render_tree<W: Write>(node: &TypeNode, depth: usize, out: &mut W) -> io::Result<()> {
    let mut flags = Vec::new();
    if node.is_nullable() {
        flags.push("nullable".to_string());
    }
    if node.is_low_cardinality() {
        flags.push("low_cardinality".to_string());
    }
    if node.array_level() > 0 {
        flags.push(format!("array_level={}", node.array_level()));
    }
    if let Some(tz) = node.timezone() {
        flags.push(format!("tz={}", tz));
    }
    if let Some(spec) = node.aggregate() {
        flags.push(format!("fn={}", spec.signature()));
    }
    if let Some(values) = node.enum_values() {
        flags.push(format!("{} values", values.len()));
    }
    let name = node.name().map(|n| format!("{}: ", n)).unwrap_or_default();
    writeln!(
        out,
        "{:indent$}{}{} [{}]{}",
        "",
        name,
        node.kind(),
        node.declaration(),
        if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        },
        indent = depth * 2
    )?;
    for child in node.children() {
        render_tree(child, depth + 1, out)?;
    }
    Ok(())
}
