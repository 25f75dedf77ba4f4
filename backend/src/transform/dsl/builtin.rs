//! Built-in offer schemas
//!
//! The column layout follows the offers spreadsheet: plain column names for
//! most scalars, a section prefix (`SMP_`, `SCM_`, `SEAC_`) where the same
//! list appears in several service blocks, and numbered columns for the
//! repeated groups.
//!
//! Two group prefixes differ from their output key so that no prefix is the
//! start of another column: promotion durations live in `tempoDesconto1..n`
//! while the loyalty discount duration is `fidelizacao_tempoDesconto`, and
//! TV point types live in `tipoPonto1..n` (a bare `tipo` would also match
//! `tipoOferta` and `tipoCobranca`).

use serde_json::json;
use std::fmt;
use std::str::FromStr;

use super::schema::{GroupDefinition, GroupField, OfferSchema, SchemaField};
use crate::error::ConfigError;
use crate::models::IssuerFormat;

/// Group names in the built-in registry.
pub const GROUP_PAYMENTS: &str = "formasPagamento";
pub const GROUP_PROMOTIONS: &str = "listaPromocoes";
pub const GROUP_TOP_UPS: &str = "modalidadesRecarga";
pub const GROUP_TV_POINTS: &str = "pontos";

/// Layout revision of the disclosure file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    /// Flat `cnpj` issuer, base offer fields.
    #[default]
    V1,
    /// Issuer object and extension fields.
    V2,
}

impl SchemaVersion {
    pub fn schema(self) -> OfferSchema {
        match self {
            SchemaVersion::V1 => schema_v1(),
            SchemaVersion::V2 => schema_v2(),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            _ => Err(ConfigError::UnknownSchemaVersion(s.to_string())),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1 => f.write_str("v1"),
            SchemaVersion::V2 => f.write_str("v2"),
        }
    }
}

fn groups() -> Vec<GroupDefinition> {
    vec![
        GroupDefinition::new(GROUP_PAYMENTS, &["formaPagamento", "descontoPagamento"]),
        GroupDefinition::new(
            GROUP_PROMOTIONS,
            &["descricaoPromocao", "tempoDesconto", "descontoPromocao"],
        ),
        GroupDefinition::new(
            GROUP_TOP_UPS,
            &["valorRecarga", "validadeRecarga", "beneficioRecarga"],
        ),
        GroupDefinition::with_fields(
            GROUP_TV_POINTS,
            vec![
                GroupField::renamed("tipoPonto", "tipo"),
                GroupField::new("numeroPontos"),
                GroupField::new("pontoAdicional"),
            ],
        ),
    ]
}

fn custo_inicial() -> SchemaField {
    SchemaField::object(
        "custoInicial",
        vec![
            SchemaField::scalar("adesao").text(),
            SchemaField::scalar("instalacao").text(),
            SchemaField::scalar("equipamento").text(),
        ],
    )
}

fn fidelizacao() -> SchemaField {
    SchemaField::object(
        "fidelizacao",
        vec![
            SchemaField::scalar("tempoFidelizacao"),
            SchemaField::scalar("descontoFidelizacao"),
            SchemaField::scalar_from("tempoDesconto", "fidelizacao_tempoDesconto"),
            SchemaField::scalar("beneficioFidelizacao"),
            SchemaField::scalar("multaFidelizacao"),
        ],
    )
}

fn franquia_voz() -> SchemaField {
    SchemaField::object(
        "franquiaVoz",
        [
            "localFixoOnNet",
            "localFixoOffNet",
            "localMovelOnNet",
            "localMovelOffNet",
            "fixoLdnOnNet",
            "fixoLdnOffNet",
            "movelLdnOnNet",
            "movelLdnOffNet",
            "ldi",
        ]
        .into_iter()
        .map(SchemaField::scalar)
        .collect(),
    )
}

fn stfc() -> SchemaField {
    SchemaField::object(
        "STFC",
        vec![
            SchemaField::list_from("listaPUC", "listaPUC"),
            franquia_voz(),
            SchemaField::scalar("condicoesAposConsumoFranquia"),
        ],
    )
}

fn smp() -> SchemaField {
    SchemaField::object(
        "SMP",
        vec![
            SchemaField::scalar("modalidadePagamento"),
            SchemaField::scalar("validadePacote"),
            SchemaField::object(
                "franquiaDados",
                vec![
                    SchemaField::scalar("unidadeFranquia"),
                    SchemaField::scalar("franquia"),
                    SchemaField::list_from("listaAppsFranquiaEspecial", "listaAppsFranquiaEspecial"),
                    SchemaField::scalar("unidadeFranquiaEspecial"),
                    SchemaField::scalar("franquiaEspecial"),
                ],
            ),
            SchemaField::list_from("listaAppIsentos", "SMP_listaAppIsentos"),
            SchemaField::list_from("listaSVA", "SMP_listaSVA"),
            SchemaField::object(
                "cobrancaTipo",
                vec![
                    SchemaField::scalar("tipoCobranca"),
                    SchemaField::scalar("detalhesCobranca"),
                ],
            ),
            franquia_voz(),
            SchemaField::object(
                "franquiaSMS",
                vec![SchemaField::scalar("onNet"), SchemaField::scalar("offNet")],
            ),
            SchemaField::scalar("condicoesAposConsumoFranquia"),
            SchemaField::scalar("condicoesAposValidadePacote"),
            SchemaField::group("modalidadesRecarga", GROUP_TOP_UPS),
            SchemaField::scalar("roamingNacional"),
            SchemaField::scalar("roamingInternacional"),
            SchemaField::object(
                "dependentes",
                vec![
                    SchemaField::scalar("quantidade"),
                    SchemaField::scalar("valor"),
                    SchemaField::scalar("compartilhamento"),
                ],
            ),
        ],
    )
}

fn scm() -> SchemaField {
    SchemaField::object(
        "SCM",
        vec![
            SchemaField::scalar("wifiIncluso"),
            SchemaField::list_from("listaTecnologia", "SCM_listaTecnologia"),
            SchemaField::object(
                "velocidade",
                vec![
                    SchemaField::scalar("download"),
                    SchemaField::scalar("unidadeDownload"),
                    SchemaField::scalar("downloadMinGarantida"),
                    SchemaField::scalar("unidadeDownloadMinGarantida"),
                    SchemaField::scalar("upload"),
                    SchemaField::scalar("unidadeUpload"),
                ],
            ),
            SchemaField::list_from("listaSVA", "SCM_listaSVA"),
        ],
    )
}

fn seac() -> SchemaField {
    SchemaField::object(
        "SEAC",
        vec![
            SchemaField::list_from("listaTecnologia", "SEAC_listaTecnologia"),
            SchemaField::scalar("multiPlataforma"),
            SchemaField::scalar("dvr"),
            SchemaField::group("pontos", GROUP_TV_POINTS),
            SchemaField::list_from("listaCanais", "SEAC_listaCanais"),
            SchemaField::list_from("listaCanaisAvulsos", "SEAC_listaCanaisAvulsos"),
            SchemaField::list_from("listaSVA", "SEAC_listaSVA"),
        ],
    )
}

fn offer_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::scalar("identificadorUnico").text(),
        SchemaField::scalar("tipoOferta"),
        SchemaField::scalar("nomeOferta"),
        SchemaField::scalar("codigoOferta").text(),
        custo_inicial(),
        SchemaField::scalar("etiquetaOferta"),
        SchemaField::scalar("linkSite"),
        SchemaField::scalar("dataInicioOferta").text(),
        SchemaField::scalar("dataFimOferta").text(),
        fidelizacao(),
        SchemaField::group("formasPagamento", GROUP_PAYMENTS),
        SchemaField::scalar("areasAbrangencia"),
        SchemaField::scalar("focoVenda"),
        SchemaField::scalar("regOferta"),
        SchemaField::scalar("modoEquipamento"),
        SchemaField::scalar("precoSemDescontos").text(),
        SchemaField::group("listaPromocoes", GROUP_PROMOTIONS),
        stfc(),
        smp(),
        scm(),
        seac(),
    ]
}

/// Base layout with a flat `cnpj` issuer.
pub fn schema_v1() -> OfferSchema {
    OfferSchema {
        version: "1".to_string(),
        description: "Offer disclosure file, base layout".to_string(),
        issuer: IssuerFormat::flat("cnpj"),
        groups: groups(),
        fields: offer_fields(),
    }
}

/// Layout with the issuer wrapped in `prestadora` and the extension fields.
pub fn schema_v2() -> OfferSchema {
    let mut fields = offer_fields();
    fields.extend([
        SchemaField::scalar("destaqueOferta"),
        SchemaField::scalar("notasExtras"),
        SchemaField::list_from("beneficiosOfertaConjunta", "beneficiosOfertaConjunta"),
    ]);

    OfferSchema {
        version: "2".to_string(),
        description: "Offer disclosure file with issuer object and extension fields".to_string(),
        issuer: IssuerFormat::nested("prestadora", "cnpj"),
        groups: groups(),
        fields,
    }
}

/// A complete example row for the built-in layout, used by docs and tests.
pub fn example_row() -> serde_json::Value {
    json!({
        "identificadorUnico": 1001,
        "tipoOferta": "Combo",
        "nomeOferta": "Combo Casa 500",
        "codigoOferta": "CC500",
        "adesao": "0",
        "instalacao": 99.9,
        "equipamento": "Comodato",
        "etiquetaOferta": "Mais vendido",
        "linkSite": "https://example.com/combo500",
        "dataInicioOferta": "01/01/2024",
        "dataFimOferta": "31/12/2024",
        "tempoFidelizacao": "12 meses",
        "descontoFidelizacao": "20%",
        "fidelizacao_tempoDesconto": "12 meses",
        "beneficioFidelizacao": "Instalação grátis",
        "multaFidelizacao": "Proporcional",
        "formaPagamento1": "Boleto",
        "descontoPagamento1": "0%",
        "formaPagamento2": "Débito automático",
        "descontoPagamento2": "5%",
        "areasAbrangencia": "SP",
        "focoVenda": "Residencial",
        "regOferta": "https://example.com/regulamento",
        "modoEquipamento": "Comodato",
        "precoSemDescontos": 199.9,
        "descricaoPromocao1": "Desconto de boas-vindas",
        "tempoDesconto1": "3 meses",
        "descontoPromocao1": "50%",
        "listaPUC": "PUC A, PUC B",
        "ldi": "Não incluso",
        "SMP_listaSVA": "",
        "SCM_listaTecnologia": "Fibra",
        "download": 500,
        "unidadeDownload": "Mbps",
        "SEAC_listaCanais": "Canal A, Canal B",
        "tipoPonto1": "HD",
        "numeroPontos1": 2,
        "pontoAdicional1": "R$ 20,00",
        "destaqueOferta": "Wi-Fi 6"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dsl::assemble;
    use crate::transform::grouper::Row;

    fn example() -> Row {
        example_row().as_object().cloned().unwrap()
    }

    #[test]
    fn test_builtin_schemas_are_valid() {
        schema_v1().validate().unwrap();
        schema_v2().validate().unwrap();
    }

    #[test]
    fn test_schema_version_parsing() {
        assert_eq!("v1".parse::<SchemaVersion>().unwrap(), SchemaVersion::V1);
        assert_eq!("V2".parse::<SchemaVersion>().unwrap(), SchemaVersion::V2);
        assert!("v9".parse::<SchemaVersion>().is_err());
        assert_eq!(SchemaVersion::V2.to_string(), "v2");
    }

    #[test]
    fn test_top_level_keys() {
        let doc = assemble(&Row::new(), &schema_v1());
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            [
                "identificadorUnico", "tipoOferta", "nomeOferta", "codigoOferta", "custoInicial",
                "etiquetaOferta", "linkSite", "dataInicioOferta", "dataFimOferta", "fidelizacao",
                "formasPagamento", "areasAbrangencia", "focoVenda", "regOferta", "modoEquipamento",
                "precoSemDescontos", "listaPromocoes", "STFC", "SMP", "SCM", "SEAC",
            ]
        );
    }

    #[test]
    fn test_v2_extension_fields() {
        let doc = assemble(&example(), &schema_v2());
        assert_eq!(doc["destaqueOferta"], "Wi-Fi 6");
        assert_eq!(doc["notasExtras"], "");
        assert_eq!(doc["beneficiosOfertaConjunta"], json!([]));

        let v1 = assemble(&example(), &schema_v1());
        assert!(v1.get("destaqueOferta").is_none());
    }

    #[test]
    fn test_example_row_document() {
        let doc = assemble(&example(), &schema_v1());

        assert_eq!(doc["identificadorUnico"], "1001");
        assert_eq!(doc["custoInicial"]["instalacao"], "99.9");
        assert_eq!(doc["precoSemDescontos"], "199.9");
        assert_eq!(doc["fidelizacao"]["tempoDesconto"], "12 meses");

        assert_eq!(
            doc["formasPagamento"],
            json!([
                { "formaPagamento": "Boleto", "descontoPagamento": "0%" },
                { "formaPagamento": "Débito automático", "descontoPagamento": "5%" }
            ])
        );
        assert_eq!(
            doc["listaPromocoes"],
            json!([{
                "descricaoPromocao": "Desconto de boas-vindas",
                "tempoDesconto": "3 meses",
                "descontoPromocao": "50%"
            }])
        );

        assert_eq!(doc["STFC"]["listaPUC"], json!(["PUC A", "PUC B"]));
        assert_eq!(doc["STFC"]["franquiaVoz"]["ldi"], "Não incluso");
        assert_eq!(doc["SMP"]["franquiaVoz"]["ldi"], "Não incluso");
        assert_eq!(doc["SMP"]["listaSVA"], json!([]));
        assert_eq!(doc["SMP"]["modalidadesRecarga"], json!([]));
        assert_eq!(doc["SCM"]["listaTecnologia"], json!(["Fibra"]));
        assert_eq!(doc["SCM"]["velocidade"]["download"], 500);
        assert_eq!(doc["SEAC"]["listaCanais"], json!(["Canal A", "Canal B"]));
        assert_eq!(
            doc["SEAC"]["pontos"],
            json!([{ "tipo": "HD", "numeroPontos": 2, "pontoAdicional": "R$ 20,00" }])
        );
    }

    #[test]
    fn test_missing_adesao() {
        let mut row = example();
        row.remove("adesao");
        let doc = assemble(&row, &schema_v1());
        assert_eq!(doc["custoInicial"]["adesao"], "");
    }

    #[test]
    fn test_top_up_members_read_own_columns() {
        let row = json!({
            "valorRecarga1": "15",
            "validadeRecarga1": "15 dias",
            "beneficioRecarga1": "Bônus 1GB"
        });
        let doc = assemble(row.as_object().unwrap(), &schema_v1());
        assert_eq!(
            doc["SMP"]["modalidadesRecarga"],
            json!([{
                "valorRecarga": "15",
                "validadeRecarga": "15 dias",
                "beneficioRecarga": "Bônus 1GB"
            }])
        );
    }
}
