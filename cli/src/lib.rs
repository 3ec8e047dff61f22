use anyhow::{anyhow, Error, Result};
use clap::{Parser, Subcommand};
use jelly::delimited::{DelimitedReader, StatementWriter};
use jelly::{decode_row, Decoder, EncoderOptions, PhysicalType, Statement, StreamOptions, TableKind};
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

#[derive(Debug, Parser)]
#[command(name = "jelly")]
#[command(about = "Encode, decode and inspect Jelly RDF streams")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encode RDF files into a single Jelly stream
    Encode {
        /// RDF files to read, in order. Their statements form one stream.
        #[clap(long, short, num_args = 1.., required = true)]
        input: Vec<PathBuf>,
        /// Where to write the stream
        #[clap(long, short)]
        output: PathBuf,
        /// Input syntax (nt, nq, ttl, trig). Guessed from the file extension if omitted.
        #[clap(long, short)]
        format: Option<String>,
        /// Physical stream type (triples or quads). Defaults to quads for dataset inputs.
        #[clap(long)]
        physical: Option<String>,
        /// Disable the prefix table; every IRI goes through the name table whole
        #[clap(long, action, default_value = "false")]
        no_prefix_table: bool,
        /// Send every slot even when it repeats the previous statement
        #[clap(long, action, default_value = "false")]
        no_elision: bool,
        /// JSON file with stream options; flags override its fields
        #[clap(long)]
        options: Option<PathBuf>,
        /// Stream name recorded in the options row
        #[clap(long)]
        name: Option<String>,
        /// Compress the output with zstd
        #[clap(long, action, default_value = "false")]
        zstd: bool,
    },
    /// Decode a Jelly stream back into RDF
    Decode {
        /// Stream to read; zstd-compressed streams are detected automatically
        #[clap(long, short)]
        input: PathBuf,
        /// Where to write the RDF, defaults to stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
        /// Output syntax (nt or nq)
        #[clap(long, short, default_value = "nq")]
        format: String,
    },
    /// Print the options, row counts and table sizes of a Jelly stream
    Stat {
        /// Stream to inspect
        #[clap(long, short)]
        file: PathBuf,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // CLI flags for verbosity take precedence. If nothing is set, we default to "warn".
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    match cmd.command {
        Commands::Encode {
            input,
            output,
            format,
            physical,
            no_prefix_table,
            no_elision,
            options,
            name,
            zstd,
        } => {
            let formats = input
                .iter()
                .map(|p| match &format {
                    Some(f) => rdf_format(f),
                    None => format_from_path(p),
                })
                .collect::<Result<Vec<_>>>()?;

            let mut opts = match &options {
                Some(path) => load_options(path)?,
                None if formats.iter().any(|f| f.supports_datasets()) => StreamOptions::quads(),
                None => StreamOptions::default(),
            };
            if let Some(p) = physical {
                opts = opts.with_physical_type(physical_type(&p)?);
            }
            if no_prefix_table {
                opts = opts.with_prefix_table_size(0);
            }
            if let Some(name) = name {
                opts = opts.with_name(name);
            }
            opts.validate()?;
            let settings = EncoderOptions {
                elide_repeated_terms: !no_elision,
            };

            let sink = BufWriter::new(File::create(&output)?);
            let (rows, statements) = if zstd {
                let compressed = zstd::stream::write::Encoder::new(sink, 0)?;
                let (compressed, counts) = encode_files(compressed, &input, &formats, opts, settings)?;
                compressed.finish()?.flush()?;
                counts
            } else {
                let (mut sink, counts) = encode_files(sink, &input, &formats, opts, settings)?;
                sink.flush()?;
                counts
            };
            info!(
                "Wrote {} statements in {} rows to {}",
                statements,
                rows,
                output.display()
            );
        }
        Commands::Decode {
            input,
            output,
            format,
        } => {
            let format = rdf_format(&format)?;
            if !matches!(format, RdfFormat::NTriples | RdfFormat::NQuads) {
                return Err(anyhow!("Decode writes nt or nq only, not {}", format.name()));
            }
            let reader = open_stream(&input)?;
            let sink: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };
            let mut serializer = RdfSerializer::from_format(format).for_writer(sink);
            let mut count = 0u64;
            for st in DelimitedReader::new(reader).statements() {
                let quad = st?.to_oxigraph()?;
                if !format.supports_datasets() && !quad.graph_name.is_default_graph() {
                    return Err(anyhow!(
                        "Statement in graph {} cannot be written as N-Triples; use --format nq",
                        quad.graph_name
                    ));
                }
                serializer.serialize_quad(&quad)?;
                count += 1;
            }
            serializer.finish()?.flush()?;
            info!("Decoded {} statements from {}", count, input.display());
        }
        Commands::Stat { file, json } => {
            let stats = stat_stream(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats.to_json())?);
            } else {
                stats.print();
            }
        }
    }
    Ok(())
}

fn rdf_format(name: &str) -> Result<RdfFormat> {
    match name.to_ascii_lowercase().as_str() {
        "nt" | "ntriples" | "n-triples" => Ok(RdfFormat::NTriples),
        "nq" | "nquads" | "n-quads" => Ok(RdfFormat::NQuads),
        "ttl" | "turtle" => Ok(RdfFormat::Turtle),
        "trig" => Ok(RdfFormat::TriG),
        other => Err(anyhow!("Unsupported RDF format: {}", other)),
    }
}

fn format_from_path(path: &Path) -> Result<RdfFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("Cannot guess the format of {}; pass --format", path.display()))?;
    rdf_format(ext)
}

fn physical_type(name: &str) -> Result<PhysicalType> {
    match name {
        "triples" => Ok(PhysicalType::Triples),
        "quads" => Ok(PhysicalType::Quads),
        other => Err(anyhow!("Unknown physical type {}; expected triples or quads", other)),
    }
}

fn load_options(path: &Path) -> Result<StreamOptions> {
    let file = File::open(path)
        .map_err(|e| anyhow!("Cannot open options file {}: {}", path.display(), e))?;
    let opts: StreamOptions = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| anyhow!("Invalid options file {}: {}", path.display(), e))?;
    debug!("Loaded stream options from {}: {:?}", path.display(), opts);
    Ok(opts)
}

/// Parse every input in order and write its statements into one stream.
/// Returns the sink along with the row and statement counts.
fn encode_files<W: Write>(
    sink: W,
    inputs: &[PathBuf],
    formats: &[RdfFormat],
    opts: StreamOptions,
    settings: EncoderOptions,
) -> Result<(W, (u64, u64))> {
    let mut writer = StatementWriter::with_options(sink, opts, settings);
    for (path, format) in inputs.iter().zip(formats) {
        info!("Encoding {} as {}", path.display(), format.name());
        let reader = BufReader::new(File::open(path)?);
        for quad in RdfParser::from_format(*format).for_reader(reader) {
            let quad = quad.map_err(|e| anyhow!("{}: {}", path.display(), e))?;
            writer.add(&Statement::try_from(&quad)?)?;
        }
    }
    let rows = writer.rows_written();
    let statements = writer.encoder().statements_written();
    Ok((writer.finish()?, (rows, statements)))
}

/// Open a stream file, transparently decompressing zstd frames.
fn open_stream(path: &Path) -> Result<Box<dyn Read>> {
    let mut reader = BufReader::new(File::open(path)?);
    let compressed = reader.fill_buf()?.starts_with(&ZSTD_MAGIC);
    if compressed {
        debug!("{} is zstd-compressed", path.display());
        Ok(Box::new(zstd::stream::read::Decoder::with_buffer(reader)?))
    } else {
        Ok(Box::new(reader))
    }
}

struct StreamStats {
    options: Option<StreamOptions>,
    rows: BTreeMap<&'static str, u64>,
    statements: u64,
    tables: BTreeMap<&'static str, usize>,
}

fn stat_stream(path: &Path) -> Result<StreamStats> {
    let mut decoder = Decoder::new();
    let mut rows: BTreeMap<&'static str, u64> = ["options", "prefix", "name", "datatype", "triple", "quad"]
        .into_iter()
        .map(|k| (k, 0))
        .collect();
    for unit in DelimitedReader::new(open_stream(path)?) {
        let row = decode_row(&unit?)?;
        *rows.entry(row.kind_name()).or_default() += 1;
        decoder.process_row(row)?;
    }
    let tables = [
        ("prefix", TableKind::Prefix),
        ("name", TableKind::Name),
        ("datatype", TableKind::Datatype),
    ]
    .into_iter()
    .map(|(k, t)| (k, decoder.table_len(t)))
    .collect();
    Ok(StreamStats {
        options: decoder.options().cloned(),
        rows,
        statements: decoder.statements_decoded(),
        tables,
    })
}

impl StreamStats {
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "options": self.options,
            "rows": self.rows,
            "statements": self.statements,
            "tables": self.tables,
        })
    }

    fn print(&self) {
        match &self.options {
            Some(o) => {
                let name = if o.stream_name.is_empty() {
                    "(unnamed)"
                } else {
                    o.stream_name.as_str()
                };
                println!("Stream: {}", name);
                println!("  Physical type: {:?}", o.physical_type);
                println!("  Logical type: {:?}", o.logical_type);
                println!("  Generalized statements: {}", o.generalized_statements);
                println!("  RDF-star: {}", o.rdf_star);
                println!(
                    "  Table limits: prefix={} name={} datatype={}",
                    o.max_prefix_table_size, o.max_name_table_size, o.max_datatype_table_size
                );
                println!("  Version: {}", o.version);
            }
            None => println!("Stream: (empty)"),
        }
        println!("Rows:");
        for (kind, n) in &self.rows {
            println!("  {}: {}", kind, n);
        }
        println!("Statements: {}", self.statements);
        println!("Tables:");
        for (kind, n) in &self.tables {
            println!("  {}: {}", kind, n);
        }
    }
}
