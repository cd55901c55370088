//! Field descriptors and the field-generation rules for bulletin filters.
//!
//! Every filter an endpoint exposes is one of the tagged [`FilterKind`]s, and
//! [`FilterKind::descriptor`] is the single dispatcher that turns a kind (plus
//! the endpoint's [`DataReferenceShape`]) into a [`FieldDescriptor`] carrying
//! the widget kind, validator names and render hints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DataReferenceShape, FieldKind};
use crate::validators::names;

/// Field id of the always-present start date.
pub const START_DATE_FIELD: &str = "Data";

/// Field id of the always-present (optional) end date.
pub const END_DATE_FIELD: &str = "DataFim";

/// Suggestions offered by the indicator datalist.
pub const INDICATOR_SUGGESTIONS: [&str; 6] = [
    "IPCA",
    "Selic",
    "Câmbio",
    "PIB Total",
    "IGP-M",
    "Meta para taxa over-Selic",
];

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Presentation hints for a field. Purely descriptive; never consulted by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderHint {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
}

/// A renderable, validatable input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field id; also the key the value is composed under.
    pub id: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Validators applied in order after the required check.
    pub validator_names: Vec<String>,
    pub render_hint: RenderHint,
}

/// Descriptor of the required start date.
#[must_use]
pub fn start_date_field() -> FieldDescriptor {
    FieldDescriptor {
        id: START_DATE_FIELD.to_string(),
        kind: FieldKind::Date,
        required: true,
        validator_names: vec![names::DATE.to_string()],
        render_hint: RenderHint {
            label: "Data de Início".to_string(),
            help: "Data de início da consulta no formato YYYY-MM-DD".to_string(),
            ..RenderHint::default()
        },
    }
}

/// Descriptor of the optional end date.
#[must_use]
pub fn end_date_field() -> FieldDescriptor {
    FieldDescriptor {
        id: END_DATE_FIELD.to_string(),
        kind: FieldKind::Date,
        required: false,
        validator_names: vec![names::DATE.to_string()],
        render_hint: RenderHint {
            label: "Data de Fim (opcional)".to_string(),
            help: "Se não especificada, será usada a data atual".to_string(),
            ..RenderHint::default()
        },
    }
}

// ---------------------------------------------------------------------------
// FilterKind
// ---------------------------------------------------------------------------

/// Filters a bulletin endpoint may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Indicator name, free text with suggestions.
    Indicador,
    /// Reference period; pattern depends on the endpoint's shape.
    DataReferencia,
    /// Copom meeting code.
    Reuniao,
    /// Top-5 calculation horizon.
    TipoCalculo,
    /// Smoothed-expectation flag.
    Suavizada,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        Self::Indicador,
        Self::DataReferencia,
        Self::Reuniao,
        Self::TipoCalculo,
        Self::Suavizada,
    ];

    /// Field name used both as the field id and as the request filter key.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Indicador => "Indicador",
            Self::DataReferencia => "DataReferencia",
            Self::Reuniao => "Reuniao",
            Self::TipoCalculo => "tipoCalculo",
            Self::Suavizada => "Suavizada",
        }
    }

    /// Resolves a catalog filter name. Matching is exact.
    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_name() == name)
    }

    /// Builds the field for this filter. Dynamic filters are never required.
    #[must_use]
    pub fn descriptor(self, shape: DataReferenceShape) -> FieldDescriptor {
        let id = self.field_name().to_string();
        let (kind, validators, render_hint) = match self {
            Self::Indicador => (
                FieldKind::Datalist,
                vec![names::INDICATOR],
                RenderHint {
                    label: "Indicador".to_string(),
                    placeholder: Some("Ex: IPCA, Selic, Câmbio, PIB Total".to_string()),
                    help: "Nome do indicador econômico".to_string(),
                    suggestions: INDICATOR_SUGGESTIONS.iter().map(ToString::to_string).collect(),
                    ..RenderHint::default()
                },
            ),
            Self::DataReferencia => data_reference_rule(shape),
            Self::Reuniao => (
                FieldKind::Text,
                vec![names::MEETING],
                RenderHint {
                    label: "Reunião do Copom".to_string(),
                    placeholder: Some("Ex: R255".to_string()),
                    help: "Número da reunião do Copom".to_string(),
                    ..RenderHint::default()
                },
            ),
            Self::TipoCalculo => (
                FieldKind::Select,
                vec![],
                RenderHint {
                    label: "Tipo de Cálculo".to_string(),
                    help: "Tipo de cálculo para o grupo Top 5".to_string(),
                    options: vec![
                        SelectOption::new("curto prazo", "Curto Prazo"),
                        SelectOption::new("médio prazo", "Médio Prazo"),
                    ],
                    ..RenderHint::default()
                },
            ),
            Self::Suavizada => (
                FieldKind::Select,
                vec![],
                RenderHint {
                    label: "Expectativa Suavizada".to_string(),
                    help: "Indica se a expectativa é suavizada".to_string(),
                    options: vec![
                        SelectOption::new("Sim", "Sim"),
                        SelectOption::new("Não", "Não"),
                    ],
                    ..RenderHint::default()
                },
            ),
        };
        FieldDescriptor {
            id,
            kind,
            required: false,
            validator_names: validators.into_iter().map(str::to_string).collect(),
            render_hint,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

fn data_reference_rule(shape: DataReferenceShape) -> (FieldKind, Vec<&'static str>, RenderHint) {
    match shape {
        DataReferenceShape::Year => (
            FieldKind::Number,
            vec![names::YEAR_REFERENCE],
            RenderHint {
                label: "Ano de Referência".to_string(),
                placeholder: Some("Ex: 2024".to_string()),
                help: "Ano de referência da projeção".to_string(),
                min: Some(crate::validators::FIRST_REFERENCE_YEAR),
                ..RenderHint::default()
            },
        ),
        DataReferenceShape::Month => (
            FieldKind::Text,
            vec![names::MONTH_REFERENCE],
            RenderHint {
                label: "Data de Referência".to_string(),
                placeholder: Some("Ex: jan/2024".to_string()),
                help: "Mês e ano de referência da projeção (formato mmm/yyyy)".to_string(),
                ..RenderHint::default()
            },
        ),
        DataReferenceShape::Quarter => (
            FieldKind::Text,
            vec![names::QUARTER_REFERENCE],
            RenderHint {
                label: "Data de Referência".to_string(),
                placeholder: Some("Ex: 1/2024".to_string()),
                help: "Trimestre e ano de referência da projeção (formato t/yyyy)".to_string(),
                ..RenderHint::default()
            },
        ),
        DataReferenceShape::None => (
            FieldKind::Text,
            vec![],
            RenderHint {
                label: "Data de Referência".to_string(),
                help: "Período de referência da projeção".to_string(),
                ..RenderHint::default()
            },
        ),
    }
}

// ---------------------------------------------------------------------------
// EndpointSchema
// ---------------------------------------------------------------------------

/// Static description of one bulletin endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSchema {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub tooltip: String,
    /// Filters in declaration order; order is kept through rendering and composition.
    pub filter_fields: Vec<FilterKind>,
    pub date_reference_shape: DataReferenceShape,
}

impl EndpointSchema {
    /// Field descriptors for the endpoint-specific block, in declaration order.
    #[must_use]
    pub fn field_descriptors(&self) -> Vec<FieldDescriptor> {
        self.filter_fields
            .iter()
            .map(|k| k.descriptor(self.date_reference_shape))
            .collect()
    }

    /// Filter names as they appear on the wire.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filter_fields.iter().map(|k| k.field_name()).collect()
    }
}
