//! High-level pipeline API: input file → offer disclosure document.
//!
//! Combines every step of a run: issuer and schema configuration, reading the
//! input workbook, assembling one document per row and writing the container.
//!
//! # Example
//!
//! ```rust,ignore
//! use ofertas::{convert_file, write_container, RunConfig};
//!
//! let config = RunConfig::new("ofertas.csv").with_cnpj("11.222.333/0001-81");
//! let result = convert_file(&config)?;
//! write_container(&result.container, Some("ofertas.json".as_ref()))?;
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::dsl::{assemble_counting, GroupTotals, OfferSchema, SchemaVersion};
use super::grouper::extract_all;
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{Cnpj, OutputContainer, RunMetadata};
use crate::parser::{format_delimiter, read_workbook, Table, DEFAULT_TABLE};
use crate::validation::validate_headers;

/// Where the schema of a run comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    Builtin(SchemaVersion),
    File(PathBuf),
}

impl Default for SchemaSource {
    fn default() -> Self {
        SchemaSource::Builtin(SchemaVersion::default())
    }
}

/// Options for one conversion run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input CSV or JSON workbook
    pub input: PathBuf,
    /// Table holding the offer rows
    pub table: String,
    /// CSV delimiter override (auto-detect when `None`)
    pub delimiter: Option<char>,
    pub schema: SchemaSource,
    /// Issuer CNPJ, raw as given by the user
    pub cnpj: Option<String>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            table: DEFAULT_TABLE.to_string(),
            delimiter: None,
            schema: SchemaSource::default(),
            cnpj: None,
        }
    }

    pub fn with_cnpj(mut self, cnpj: &str) -> Self {
        self.cnpj = Some(cnpj.to_string());
        self
    }

    pub fn with_schema(mut self, schema: SchemaSource) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub table: String,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a complete conversion run
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub container: OutputContainer,
    pub input: InputInfo,
    /// Version string of the schema used
    pub schema_version: String,
}

/// Load the schema of a run. File schemas are validated before use.
pub fn load_schema(source: &SchemaSource) -> PipelineResult<OfferSchema> {
    match source {
        SchemaSource::Builtin(version) => Ok(version.schema()),
        SchemaSource::File(path) => {
            let content = fs::read_to_string(path)?;
            Ok(OfferSchema::from_json(&content)?)
        }
    }
}

/// Convert an input file into the disclosure container.
///
/// Configuration is checked before the input is read: a missing or malformed
/// CNPJ and an invalid schema fail without touching the file. A header that
/// starts with a group prefix but has no numeric suffix fails the run.
pub fn convert_file(config: &RunConfig) -> PipelineResult<ConversionResult> {
    let issuer = Cnpj::parse(config.cnpj.as_deref().unwrap_or(""))?;
    let schema = load_schema(&config.schema)?;

    log_info(format!("📖 Reading {}...", config.input.display()));
    let workbook = read_workbook(&config.input, &config.table, config.delimiter)?;
    if let Some(ref encoding) = workbook.encoding {
        log_success(format!("Detected encoding: {}", encoding));
    }
    if let Some(delimiter) = workbook.delimiter {
        log_success(format!("Detected separator: '{}'", format_delimiter(delimiter)));
    }

    let table = workbook
        .table(&config.table)
        .ok_or_else(|| PipelineError::MissingTable {
            table: config.table.clone(),
        })?;

    log_success(format!(
        "Read {} rows from table '{}'",
        table.rows.len(),
        table.name
    ));
    validate_headers(&schema, &table.headers)?;
    report_unmapped_columns(&table.headers, &schema);

    let container = aggregate(table, &schema, RunMetadata::now(issuer))?;

    Ok(ConversionResult {
        input: InputInfo {
            table: table.name.clone(),
            encoding: workbook.encoding.clone(),
            delimiter: workbook.delimiter,
            headers: table.headers.clone(),
            row_count: table.rows.len(),
        },
        schema_version: schema.version.clone(),
        container,
    })
}

/// Assemble every row of a table, in order, into one container.
///
/// Fails on an empty table or a row that is not an object; no partial
/// container is returned.
pub fn aggregate(
    table: &Table,
    schema: &OfferSchema,
    metadata: RunMetadata,
) -> PipelineResult<OutputContainer> {
    if table.rows.is_empty() {
        return Err(PipelineError::EmptyInput {
            table: table.name.clone(),
        });
    }

    log_info(format!(
        "⚙️  Applying schema {} ({} groups, {} top-level fields)...",
        schema.version,
        schema.groups.len(),
        schema.fields.len()
    ));

    let mut totals = GroupTotals::new();
    let mut container = OutputContainer::new(metadata, schema.issuer.clone());

    for (index, row) in table.rows.iter().enumerate() {
        let row = row.as_object().ok_or(PipelineError::InvalidRow { index })?;
        container.push(assemble_counting(row, schema, &mut totals));
    }

    for group in &schema.groups {
        let total = totals.get(&group.name).copied().unwrap_or(0);
        log_info_indent(format!("{}: {} instances", group.name, total), 1);
    }
    log_success(format!("Built {} offer documents", container.len()));

    Ok(container)
}

/// Per-row view of the group instances found by a schema.
///
/// Returns one `{ "row": i, "groups": { name: [...] } }` object per row.
pub fn group_report(table: &Table, schema: &OfferSchema) -> PipelineResult<Vec<Value>> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| -> PipelineResult<Value> {
            let row = row.as_object().ok_or(PipelineError::InvalidRow { index })?;

            let groups: Map<String, Value> = extract_all(row, schema)
                .into_iter()
                .map(|(name, instances)| {
                    let list = instances.into_iter().map(Value::Object).collect();
                    (name.to_string(), Value::Array(list))
                })
                .collect();

            let mut entry = Map::new();
            entry.insert("row".to_string(), Value::from(index));
            entry.insert("groups".to_string(), Value::Object(groups));
            Ok(Value::Object(entry))
        })
        .collect()
}

/// Serialize the container as pretty JSON.
pub fn render_container(container: &OutputContainer) -> PipelineResult<String> {
    Ok(serde_json::to_string_pretty(container)?)
}

/// Write the container to a file, or to stdout when no path is given.
pub fn write_container(container: &OutputContainer, path: Option<&Path>) -> PipelineResult<()> {
    let json = render_container(container)?;
    match path {
        Some(p) => {
            fs::write(p, format!("{}\n", json))?;
            log_success(format!("💾 Output written to: {}", p.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Columns neither read by a field nor matched by a group prefix.
pub fn unmapped_columns<'h>(headers: &'h [String], schema: &OfferSchema) -> Vec<&'h str> {
    let sources = schema.source_columns();
    let prefixes = schema.group_prefixes();

    headers
        .iter()
        .filter(|h| !sources.contains(*h))
        .filter(|h| !prefixes.iter().any(|(_, prefix)| h.starts_with(*prefix)))
        .map(String::as_str)
        .collect()
}

fn report_unmapped_columns(headers: &[String], schema: &OfferSchema) {
    let unmapped = unmapped_columns(headers, schema);
    if unmapped.is_empty() {
        return;
    }

    log_warning(format!("{} columns are not read by the schema:", unmapped.len()));
    for column in unmapped.iter().take(10) {
        log_info_indent(*column, 1);
    }
    if unmapped.len() > 10 {
        log_info_indent(format!("... +{}", unmapped.len() - 10), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SchemaError};
    use crate::transform::dsl::{example_row, GroupDefinition, SchemaField};
    use chrono::NaiveDate;
    use serde_json::json;

    const CNPJ: &str = "11.222.333/0001-81";

    fn metadata() -> RunMetadata {
        RunMetadata {
            generated_on: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            issuer: Cnpj::parse(CNPJ).unwrap(),
        }
    }

    fn table(rows: Vec<Value>) -> Table {
        Table {
            name: DEFAULT_TABLE.to_string(),
            headers: Vec::new(),
            rows,
        }
    }

    fn payments_schema() -> OfferSchema {
        OfferSchema::new()
            .with_group(GroupDefinition::new(
                "pagamentos",
                &["formaPagamento", "descontoPagamento"],
            ))
            .with_field(SchemaField::scalar("identificadorUnico"))
            .with_field(SchemaField::object(
                "custoInicial",
                vec![SchemaField::scalar("adesao")],
            ))
            .with_field(SchemaField::group("formasPagamento", "pagamentos"))
    }

    #[test]
    fn test_aggregate_preserves_row_order() {
        let rows = vec![
            json!({ "identificadorUnico": "C" }),
            json!({ "identificadorUnico": "A" }),
            json!({ "identificadorUnico": "B" }),
        ];

        let container = aggregate(&table(rows), &payments_schema(), metadata()).unwrap();
        let ids: Vec<&Value> = container
            .offers()
            .iter()
            .map(|o| &o["identificadorUnico"])
            .collect();
        assert_eq!(ids, [&json!("C"), &json!("A"), &json!("B")]);
    }

    #[test]
    fn test_aggregate_duplicates_kept() {
        let rows = vec![json!({ "identificadorUnico": "A" }); 2];
        let container = aggregate(&table(rows), &payments_schema(), metadata()).unwrap();
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_aggregate_container_layout() {
        let rows = vec![json!({
            "identificadorUnico": "A",
            "formaPagamento1": "boleto",
            "descontoPagamento1": "10%"
        })];

        let container = aggregate(&table(rows), &payments_schema(), metadata()).unwrap();
        let value = container.to_value().unwrap();

        assert_eq!(value["dataUltimaAtualizacaoArquivo"], "01/06/2024");
        assert_eq!(value["cnpj"], "11222333000181");
        assert_eq!(value["ofertas"][0]["custoInicial"]["adesao"], "");
        assert_eq!(
            value["ofertas"][0]["formasPagamento"],
            json!([{ "formaPagamento": "boleto", "descontoPagamento": "10%" }])
        );
    }

    #[test]
    fn test_empty_table_is_structural_error() {
        match aggregate(&table(vec![]), &payments_schema(), metadata()) {
            Err(PipelineError::EmptyInput { table }) => assert_eq!(table, "offers"),
            other => panic!("expected empty input, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_row_reports_index() {
        let rows = vec![json!({ "identificadorUnico": "A" }), json!(["not", "a", "row"])];
        match aggregate(&table(rows), &payments_schema(), metadata()) {
            Err(PipelineError::InvalidRow { index }) => assert_eq!(index, 1),
            other => panic!("expected invalid row, got {:?}", other),
        }
    }

    #[test]
    fn test_group_report() {
        let rows = vec![
            json!({ "formaPagamento1": "pix", "descontoPagamento1": "5%" }),
            json!({}),
        ];
        let report = group_report(&table(rows), &payments_schema()).unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0]["row"], 0);
        assert_eq!(report[0]["groups"]["pagamentos"][0]["formaPagamento"], "pix");
        assert_eq!(report[1]["groups"]["pagamentos"], json!([]));
    }

    #[test]
    fn test_unmapped_columns() {
        let headers: Vec<String> = ["identificadorUnico", "formaPagamento3", "observacao"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unmapped_columns(&headers, &payments_schema()), vec!["observacao"]);
    }

    #[test]
    fn test_convert_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ofertas.csv");
        fs::write(
            &input,
            "identificadorUnico;nomeOferta;adesao;formaPagamento1;descontoPagamento1;SEAC_listaCanais\n\
             1;Plano A;0;boleto;10%;\"Canal A, Canal B\"\n\
             2;Plano B;;;;\n",
        )
        .unwrap();

        let config = RunConfig::new(&input).with_cnpj(CNPJ);
        let result = convert_file(&config).unwrap();

        assert_eq!(result.input.row_count, 2);
        assert_eq!(result.input.delimiter, Some(';'));
        assert_eq!(result.schema_version, "1");

        let offers = result.container.offers();
        assert_eq!(offers[0]["nomeOferta"], "Plano A");
        assert_eq!(offers[0]["SEAC"]["listaCanais"], json!(["Canal A", "Canal B"]));
        assert_eq!(offers[0]["formasPagamento"].as_array().unwrap().len(), 1);
        assert_eq!(offers[1]["custoInicial"]["adesao"], "");
        assert_eq!(offers[1]["formasPagamento"], json!([]));
    }

    #[test]
    fn test_bare_group_prefix_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ofertas.csv");
        fs::write(
            &input,
            "tempoDesconto;descricaoPromocao1;tempoDesconto1;descontoPromocao1\n\
             12 meses;Boas-vindas;3 meses;50%\n",
        )
        .unwrap();

        let config = RunConfig::new(&input).with_cnpj(CNPJ);
        match convert_file(&config) {
            Err(PipelineError::Schema(SchemaError::PrefixCollision { column, .. })) => {
                assert_eq!(column, "tempoDesconto")
            }
            other => panic!("expected prefix collision, got {:?}", other.map(|r| r.input)),
        }
    }

    #[test]
    fn test_convert_json_workbook_v2() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ofertas.json");
        fs::write(&input, json!({ "ofertas": [example_row()] }).to_string()).unwrap();

        let config = RunConfig::new(&input)
            .with_cnpj(CNPJ)
            .with_table("ofertas")
            .with_schema(SchemaSource::Builtin(SchemaVersion::V2));
        let result = convert_file(&config).unwrap();

        let value = result.container.to_value().unwrap();
        assert_eq!(value["prestadora"]["cnpj"], "11222333000181");
        assert!(value["ofertas"][0].get("destaqueOferta").is_some());
    }

    #[test]
    fn test_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ofertas.json");
        fs::write(&input, r#"{ "planilha1": [] }"#).unwrap();

        let config = RunConfig::new(&input).with_cnpj(CNPJ);
        match convert_file(&config) {
            Err(PipelineError::MissingTable { table }) => assert_eq!(table, "offers"),
            other => panic!("expected missing table, got {:?}", other.map(|r| r.input)),
        }
    }

    #[test]
    fn test_missing_cnpj_fails_before_reading() {
        let config = RunConfig::new("/nonexistent/ofertas.csv");
        assert!(matches!(
            convert_file(&config),
            Err(PipelineError::Config(ConfigError::MissingCnpj))
        ));
    }

    #[test]
    fn test_invalid_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schema.json");
        let schema = OfferSchema::new()
            .with_field(SchemaField::group("formasPagamento", "pagamentos"));
        fs::write(&schema_path, schema.to_json().unwrap()).unwrap();

        let result = load_schema(&SchemaSource::File(schema_path));
        assert!(matches!(
            result,
            Err(PipelineError::Schema(SchemaError::UnknownGroup { .. }))
        ));
    }

    #[test]
    fn test_write_container_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");

        let rows = vec![json!({ "identificadorUnico": "Ação" })];
        let container = aggregate(&table(rows), &payments_schema(), metadata()).unwrap();
        write_container(&container, Some(output.as_path())).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("\"Ação\""));
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, container.to_value().unwrap());
    }
}
