//! sheetmap CLI - inspect and fill schema-driven spreadsheet layouts

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use sheetmap::prelude::*;
use sheetmap::{match_template, CellAddress, DEFAULT_MAX_ROWS};

#[derive(Parser)]
#[command(name = "sheetmap")]
#[command(
    author,
    version,
    about = "Schema-driven spreadsheet header layouts and column mapping"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Refuse to read or write more data rows than this
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ROWS)]
    max_rows: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged header regions a schema lays out
    Layout {
        /// Schema file: a JSON array of column specs
        schema: PathBuf,
    },

    /// Locate a schema's header in an existing sheet
    Match {
        /// Input spreadsheet (.xlsx)
        input: PathBuf,

        /// Schema file
        schema: PathBuf,

        /// Sheet name (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Read data rows as JSON objects
    Read {
        /// Input spreadsheet (.xlsx)
        input: PathBuf,

        /// Sheet name (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// First data row, 0-based
        #[arg(long, default_value = "1")]
        start_row: u32,

        /// Key columns by this schema instead of the header row
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Write JSON objects under a schema's header
    Write {
        /// Schema file
        schema: PathBuf,

        /// Rows file: a JSON array of objects keyed by field name
        rows: PathBuf,

        /// Output spreadsheet (.xlsx)
        output: PathBuf,

        /// Fill a copy of this template instead of generating a header
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Sheet to write (template) or create (generated header)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input spreadsheet (.xlsx)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = SessionConfig::new().with_max_rows(cli.max_rows);

    match cli.command {
        Commands::Layout { schema } => show_layout(&schema),
        Commands::Match {
            input,
            schema,
            sheet,
        } => show_match(&input, &schema, sheet),
        Commands::Read {
            input,
            sheet,
            start_row,
            schema,
        } => read_rows(&input, sheet, start_row, schema.as_deref(), config),
        Commands::Write {
            schema,
            rows,
            output,
            template,
            sheet,
        } => write_rows(&schema, &rows, &output, template.as_deref(), sheet, config),
        Commands::Sheets { input } => list_sheets(&input),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sheetmap={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_schema(path: &Path) -> Result<Schema> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema '{}'", path.display()))?;
    let schema = Schema::from_json(&json)
        .with_context(|| format!("Invalid schema '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), columns = schema.specs().len(), "loaded schema");
    Ok(schema)
}

fn sheet_ref(sheet: Option<String>) -> SheetRef {
    sheet.map(SheetRef::Name).unwrap_or_default()
}

fn show_layout(schema: &Path) -> Result<()> {
    let schema = load_schema(schema)?;
    let layout = HeaderLayout::build(schema.specs())?;

    println!("Header rows: {}", layout.row_count());
    for region in layout.regions() {
        println!("  {:<12} {}", region.to_range(0).to_string(), region.label);
    }
    Ok(())
}

fn show_match(input: &Path, schema: &Path, sheet: Option<String>) -> Result<()> {
    let schema = load_schema(schema)?;
    let workbook =
        Workbook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;
    let sheet = sheet_ref(sheet);
    let index = sheet.resolve(&workbook)?;
    let worksheet = workbook
        .worksheet(index)
        .with_context(|| format!("Sheet {} not found", sheet))?;

    let found = match_template(worksheet, schema.specs())
        .with_context(|| format!("No header for this schema in sheet '{}'", worksheet.name()))?;
    println!("Header ends on row {}", found.header_last_row + 1);
    println!("Data starts on row {}", found.data_start_row() + 1);
    for (col, field) in found.map.iter() {
        println!("  {:<4} {}", CellAddress::column_to_letters(col), field);
    }
    Ok(())
}

fn read_rows(
    input: &Path,
    sheet: Option<String>,
    start_row: u32,
    schema: Option<&Path>,
    config: SessionConfig,
) -> Result<()> {
    let mut reader = TableReader::open(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?
        .with_config(config);
    if let Some(schema) = schema {
        reader.with_column_specs(load_schema(schema)?.column_specs());
    }
    let records = reader.read_maps(sheet_ref(sheet), start_row)?;

    let rows: Vec<serde_json::Value> = records.iter().map(record_to_json).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn write_rows(
    schema: &Path,
    rows: &Path,
    output: &Path,
    template: Option<&Path>,
    sheet: Option<String>,
    config: SessionConfig,
) -> Result<()> {
    let schema = load_schema(schema)?;
    let json = fs::read_to_string(rows)
        .with_context(|| format!("Failed to read rows '{}'", rows.display()))?;
    let parsed: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&json)
        .with_context(|| format!("Rows file '{}' is not an array of objects", rows.display()))?;
    let records = parsed
        .iter()
        .map(json_to_record)
        .collect::<Result<Vec<_>>>()?;

    let mut writer = match template {
        Some(template) => {
            let mut writer = TableWriter::from_template(template)
                .with_context(|| format!("Failed to open template '{}'", template.display()))?
                .with_config(config);
            writer.write_template_maps(&schema, sheet_ref(sheet), &records, None)?;
            writer
        }
        None => {
            let mut writer = TableWriter::new().with_config(config);
            writer.write_schema_maps(&schema, &records, sheet.as_deref())?;
            writer
        }
    };
    writer
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    eprintln!("Wrote {} rows to '{}'", records.len(), output.display());
    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let workbook =
        Workbook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;
    for (i, name) in workbook.sheet_names().iter().enumerate() {
        println!("{}: {}", i, name);
    }
    Ok(())
}

fn record_to_json(record: &MapRecord) -> serde_json::Value {
    let object = record
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(object)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        // integers and short fractions survive as JSON numbers
        Value::Number(d) => serde_json::from_str::<serde_json::Number>(&d.normalize().to_string())
            .map(serde_json::Value::Number)
            .unwrap_or_else(|_| json!(d.to_string())),
        Value::Text(s) => json!(s),
        Value::Boolean(b) => json!(b),
        Value::DateTime(_) => json!(value.to_string()),
        Value::Empty => serde_json::Value::Null,
    }
}

fn json_to_record(object: &serde_json::Map<String, serde_json::Value>) -> Result<MapRecord> {
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), json_to_value(key, value)?)))
        .collect()
}

fn json_to_value(key: &str, value: &serde_json::Value) -> Result<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Empty,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map(Value::Number)
            .with_context(|| format!("Field '{}': {} is out of range", key, n))?,
        serde_json::Value::String(s) if s.is_empty() => Value::Empty,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => bail!("Field '{}': nested value {} is not supported", key, other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_values_convert_both_ways() {
        let object = json!({
            "qty": 3,
            "price": 1.25,
            "name": "Widget",
            "active": true,
            "note": null,
        });
        let record = json_to_record(object.as_object().unwrap()).unwrap();

        assert_eq!(record["qty"], Value::from(3));
        assert_eq!(record["price"], Value::Number(Decimal::from_str("1.25").unwrap()));
        assert_eq!(record["note"], Value::Empty);
        assert_eq!(record_to_json(&record), object);
    }

    #[test]
    fn test_nested_json_is_rejected() {
        let object = json!({ "tags": ["a", "b"] });
        let err = json_to_record(object.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_cli_parses_write_with_template() {
        let cli = Cli::parse_from([
            "sheetmap",
            "write",
            "schema.json",
            "rows.json",
            "out.xlsx",
            "--template",
            "t.xlsx",
            "--sheet",
            "Orders",
            "--max-rows",
            "50",
        ]);
        assert_eq!(cli.max_rows, 50);
        match cli.command {
            Commands::Write {
                template, sheet, ..
            } => {
                assert_eq!(template, Some(PathBuf::from("t.xlsx")));
                assert_eq!(sheet.as_deref(), Some("Orders"));
            }
            _ => panic!("expected write"),
        }
    }
}
