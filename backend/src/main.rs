//! Ofertas CLI - Build offer disclosure files from spreadsheet rows
//!
//! # Main Commands
//!
//! ```bash
//! ofertas convert ofertas.csv --cnpj 11222333000181 -o ofertas.json
//! ofertas convert planilha.xlsx --schema-version v2
//! ofertas convert planilha.json --table ofertas --schema-version v2
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! ofertas parse ofertas.csv          # Just parse the input to JSON tables
//! ofertas groups ofertas.csv         # Show repeated groups found per row
//! ofertas example-schema             # Show a built-in schema mapping
//! ofertas check-schema schema.json   # Validate a schema mapping file
//! ```

use clap::{Args, Parser, Subcommand};
use ofertas::logs::log_error;
use ofertas::{
    convert_file, format_delimiter, group_report, load_schema, read_workbook, validate_headers,
    write_container, OfferSchema, PipelineError, RunConfig, SchemaSource, SchemaVersion,
    DEFAULT_TABLE, LOG_BROADCASTER, LogSummary,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ofertas")]
#[command(about = "Build offer disclosure JSON files from offer spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SchemaArgs {
    /// Schema mapping file (overrides --schema-version)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Built-in schema version (v1 or v2)
    #[arg(long, default_value = "v1")]
    schema_version: SchemaVersion,
}

impl SchemaArgs {
    fn source(&self) -> SchemaSource {
        match self.schema {
            Some(ref path) => SchemaSource::File(path.clone()),
            None => SchemaSource::Builtin(self.schema_version),
        }
    }
}

#[derive(Args)]
struct InputArgs {
    /// Input spreadsheet, CSV file or JSON workbook
    input: PathBuf,

    /// Table holding the offer rows
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full conversion: input rows → disclosure JSON
    Convert {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Issuer CNPJ (punctuation allowed)
        #[arg(long, env = "OFERTAS_CNPJ")]
        cnpj: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse an input file and output its tables as JSON
    Parse {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the repeated group instances found in each row
    Groups {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a built-in schema mapping
    ExampleSchema {
        /// Built-in schema version (v1 or v2)
        #[arg(long, default_value = "v1")]
        schema_version: SchemaVersion,
    },

    /// Load and validate a schema mapping file
    CheckSchema {
        /// Schema JSON file
        file: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            schema,
            cnpj,
            output,
        } => cmd_convert(&input, &schema, cnpj, output.as_deref()),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Groups {
            input,
            schema,
            output,
        } => cmd_groups(&input, &schema, output.as_deref()),

        Commands::ExampleSchema { schema_version } => cmd_example_schema(schema_version),

        Commands::CheckSchema { file } => cmd_check_schema(&file),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &InputArgs,
    schema: &SchemaArgs,
    cnpj: Option<String>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.input.display());
    let mut events = LOG_BROADCASTER.subscribe();

    let config = RunConfig {
        input: input.input.clone(),
        table: input.table.clone(),
        delimiter: input.delimiter,
        schema: schema.source(),
        cnpj,
    };

    let result = convert_file(&config)?;

    eprintln!("   Table: {}", result.input.table);
    if let Some(ref encoding) = result.input.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = result.input.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    eprintln!("   Rows: {}", result.input.row_count);
    eprintln!("   Schema: {}", result.schema_version);
    eprintln!("   Issuer: {}", result.container.metadata().issuer);

    write_container(&result.container, output)?;

    let summary = LogSummary::collect(&mut events);
    eprintln!(
        "\n✨ Done! {} offers, {} warnings",
        result.container.len(),
        summary.warnings
    );
    Ok(())
}

fn cmd_parse(input: &InputArgs, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.input.display());

    let workbook = read_workbook(&input.input, &input.table, input.delimiter)?;

    if let Some(ref encoding) = workbook.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = workbook.delimiter {
        eprintln!(
            "   Delimiter: '{}'{}",
            format_delimiter(delimiter),
            if input.delimiter.is_none() { " (auto-detected)" } else { "" }
        );
    }

    let mut tables = Map::new();
    for table in &workbook.tables {
        eprintln!("✅ Table '{}': {} rows", table.name, table.rows.len());
        eprintln!("   Columns: {}", table.headers.join(", "));
        tables.insert(table.name.clone(), Value::Array(table.rows.clone()));
    }

    let json = serde_json::to_string_pretty(&Value::Object(tables))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_groups(
    input: &InputArgs,
    schema: &SchemaArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Extracting groups: {}", input.input.display());

    let schema = load_schema(&schema.source())?;
    let workbook = read_workbook(&input.input, &input.table, input.delimiter)?;
    let table = workbook
        .table(&input.table)
        .ok_or_else(|| PipelineError::MissingTable {
            table: input.table.clone(),
        })?;

    eprintln!("   {} rows", table.rows.len());
    validate_headers(&schema, &table.headers)?;
    for group in &schema.groups {
        let prefixes: Vec<&str> = group.fields.iter().map(|f| f.prefix.as_str()).collect();
        eprintln!("   {} ← [{}]", group.name, prefixes.join(", "));
    }

    let report = group_report(table, &schema)?;
    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_example_schema(version: SchemaVersion) -> Result<(), Box<dyn std::error::Error>> {
    let schema = version.schema();
    let json = schema.to_json()?;
    println!("{}", json);
    Ok(())
}

fn cmd_check_schema(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking schema: {}", file.display());

    let content = fs::read_to_string(file)?;
    let schema = OfferSchema::from_json(&content)?;

    eprintln!("   Version: {}", schema.version);
    if !schema.description.is_empty() {
        eprintln!("   Description: {}", schema.description);
    }
    eprintln!("   Groups: {}", schema.groups.len());
    eprintln!("   Top-level fields: {}", schema.fields.len());
    eprintln!("   Columns read: {}", schema.source_columns().len());
    eprintln!("✅ Schema is valid");

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
