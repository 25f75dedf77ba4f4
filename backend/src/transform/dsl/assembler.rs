//! Schema assembler
//!
//! Applies an [`OfferSchema`] to one flat row to produce one offer document.
//! Every path declared in the schema is present in the result, whatever the
//! row contains: missing cells resolve to defaults and missing groups to `[]`.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::normalize::{is_blank, split_list, to_text};
use super::schema::{FieldRule, OfferSchema, SchemaField};
use crate::transform::grouper::{extract_group, Row};

/// Instances emitted per group name, summed over the assembled rows
pub type GroupTotals = HashMap<String, usize>;

/// Build the offer document for one row.
pub fn assemble(row: &Row, schema: &OfferSchema) -> Value {
    assemble_counting(row, schema, &mut GroupTotals::new())
}

/// Build the offer document for one row, adding the instances emitted by each
/// group leaf to `totals`. A group referenced twice is counted twice.
pub fn assemble_counting(row: &Row, schema: &OfferSchema, totals: &mut GroupTotals) -> Value {
    Value::Object(build_object(row, &schema.fields, schema, totals))
}

/// Build one object level. Sub-objects are rebuilt at each occurrence, so a
/// block reused under two parents yields two independent values.
fn build_object(
    row: &Row,
    fields: &[SchemaField],
    schema: &OfferSchema,
    totals: &mut GroupTotals,
) -> Map<String, Value> {
    let mut object = Map::new();
    for field in fields {
        let value = resolve(row, &field.rule, schema, totals);
        object.insert(field.target.clone(), value);
    }
    object
}

fn resolve(row: &Row, rule: &FieldRule, schema: &OfferSchema, totals: &mut GroupTotals) -> Value {
    match rule {
        FieldRule::Scalar { source, default, text } => {
            let value = match row.get(source) {
                Some(v) if !is_blank(v) => v.clone(),
                _ => default.clone(),
            };
            if *text {
                to_text(&value)
            } else {
                value
            }
        }

        FieldRule::List { source, delimiter } => match row.get(source) {
            Some(v) => split_list(v, delimiter),
            None => Value::Array(Vec::new()),
        },

        FieldRule::Object { fields } => Value::Object(build_object(row, fields, schema, totals)),

        FieldRule::Group { group } => {
            let instances = schema
                .group(group)
                .map(|definition| extract_group(row, definition))
                .unwrap_or_default();
            *totals.entry(group.clone()).or_default() += instances.len();
            Value::Array(instances.into_iter().map(Value::Object).collect())
        }

        FieldRule::Constant { value } => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dsl::{GroupDefinition, GroupField};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn small_schema() -> OfferSchema {
        OfferSchema::new()
            .with_group(GroupDefinition::new(
                "pagamentos",
                &["formaPagamento", "descontoPagamento"],
            ))
            .with_field(SchemaField::scalar("nomeOferta"))
            .with_field(SchemaField::object(
                "custoInicial",
                vec![
                    SchemaField::scalar("adesao"),
                    SchemaField::scalar("instalacao").text(),
                ],
            ))
            .with_field(SchemaField::group("formasPagamento", "pagamentos"))
            .with_field(SchemaField::object(
                "SEAC",
                vec![SchemaField::list_from("listaCanais", "SEAC_listaCanais")],
            ))
    }

    #[test]
    fn test_missing_scalar_defaults_to_empty_string() {
        let doc = assemble(&row(json!({ "nomeOferta": "Plano X" })), &small_schema());
        assert_eq!(doc["nomeOferta"], "Plano X");
        assert_eq!(doc["custoInicial"]["adesao"], "");
    }

    #[test]
    fn test_total_coverage_on_empty_row() {
        let doc = assemble(&Row::new(), &small_schema());
        assert_eq!(
            doc,
            json!({
                "nomeOferta": "",
                "custoInicial": { "adesao": "", "instalacao": "" },
                "formasPagamento": [],
                "SEAC": { "listaCanais": [] }
            })
        );
    }

    #[test]
    fn test_key_order_follows_schema() {
        let doc = assemble(&Row::new(), &small_schema());
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["nomeOferta", "custoInicial", "formasPagamento", "SEAC"]);
    }

    #[test]
    fn test_list_field_split() {
        let doc = assemble(
            &row(json!({ "SEAC_listaCanais": "Canal A, Canal B" })),
            &small_schema(),
        );
        assert_eq!(doc["SEAC"]["listaCanais"], json!(["Canal A", "Canal B"]));
    }

    #[test]
    fn test_group_field_inlined() {
        let doc = assemble(
            &row(json!({
                "formaPagamento1": "boleto",
                "descontoPagamento1": "10%",
                "formaPagamento2": "",
                "descontoPagamento2": "5%"
            })),
            &small_schema(),
        );
        assert_eq!(
            doc["formasPagamento"],
            json!([{ "formaPagamento": "boleto", "descontoPagamento": "10%" }])
        );
    }

    #[test]
    fn test_text_coercion_and_passthrough() {
        let doc = assemble(
            &row(json!({ "adesao": 50, "instalacao": 120.0 })),
            &small_schema(),
        );
        assert_eq!(doc["custoInicial"]["adesao"], 50);
        assert_eq!(doc["custoInicial"]["instalacao"], "120");
    }

    #[test]
    fn test_null_cell_uses_default() {
        let schema = OfferSchema::new()
            .with_field(SchemaField::scalar("wifiIncluso").with_default(json!("não")));
        let doc = assemble(&row(json!({ "wifiIncluso": null })), &schema);
        assert_eq!(doc["wifiIncluso"], "não");
    }

    #[test]
    fn test_reused_block_built_per_occurrence() {
        let voz = || {
            SchemaField::object(
                "franquiaVoz",
                vec![SchemaField::scalar("ldi"), SchemaField::scalar("localFixoOnNet")],
            )
        };
        let schema = OfferSchema::new()
            .with_field(SchemaField::object("STFC", vec![voz()]))
            .with_field(SchemaField::object("SMP", vec![voz()]));

        let doc = assemble(&row(json!({ "ldi": "100 min" })), &schema);
        assert_eq!(doc["STFC"]["franquiaVoz"], doc["SMP"]["franquiaVoz"]);
        assert_eq!(doc["SMP"]["franquiaVoz"]["ldi"], "100 min");
    }

    #[test]
    fn test_renamed_group_keys() {
        let schema = OfferSchema::new()
            .with_group(GroupDefinition::with_fields(
                "pontos",
                vec![
                    GroupField::renamed("tipoPonto", "tipo"),
                    GroupField::new("numeroPontos"),
                ],
            ))
            .with_field(SchemaField::group("pontos", "pontos"));

        let doc = assemble(
            &row(json!({ "tipoPonto1": "HD", "numeroPontos1": "2" })),
            &schema,
        );
        assert_eq!(doc["pontos"], json!([{ "tipo": "HD", "numeroPontos": "2" }]));
    }

    #[test]
    fn test_constant_field() {
        let schema = OfferSchema::new().with_field(SchemaField::constant("versao", json!("2.0")));
        let doc = assemble(&Row::new(), &schema);
        assert_eq!(doc["versao"], "2.0");
    }

    #[test]
    fn test_unregistered_group_is_empty_list() {
        let schema = OfferSchema::new().with_field(SchemaField::group("x", "nope"));
        let doc = assemble(&Row::new(), &schema);
        assert_eq!(doc["x"], json!([]));
    }

    #[test]
    fn test_group_totals_counted_while_assembling() {
        let schema = small_schema();
        let mut totals = GroupTotals::new();

        assemble_counting(
            &row(json!({
                "formaPagamento1": "boleto",
                "descontoPagamento1": "10%",
                "formaPagamento2": "pix",
                "descontoPagamento2": "5%"
            })),
            &schema,
            &mut totals,
        );
        assemble_counting(&Row::new(), &schema, &mut totals);

        assert_eq!(totals.get("pagamentos"), Some(&2));
    }
}
