//! Endpoint schema catalog and its per-activation cache.
//!
//! The catalog maps endpoint keys to [`EndpointSchema`]s. It is either the
//! built-in list of Focus bulletin endpoints or whatever the collection engine
//! reports; remote schemas naming filters without a field-generation rule are
//! rejected at load time so that every schema in a catalog can be rendered.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schema::{EndpointSchema, FilterKind};
use crate::types::DataReferenceShape;

/// Reasons a remote endpoint schema is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("endpoint {endpoint}: unknown filter field {filter:?}")]
    UnknownFilter { endpoint: String, filter: String },
    #[error("endpoint {endpoint}: filter field {filter:?} declared twice")]
    DuplicateFilter { endpoint: String, filter: String },
    #[error("endpoint key must not be empty")]
    EmptyKey,
}

/// Engine catalog, `key -> schema`, in the order the engine declared it.
pub type WireCatalog = IndexMap<String, EndpointSchemaWire>;

/// Endpoint schema as exchanged with the collection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSchemaWire {
    /// Falls back to the map key when absent.
    #[serde(default)]
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tooltip: String,
    #[serde(default)]
    pub filter_fields: Vec<String>,
    #[serde(default)]
    pub date_reference_shape: DataReferenceShape,
}

impl TryFrom<EndpointSchemaWire> for EndpointSchema {
    type Error = CatalogError;

    fn try_from(wire: EndpointSchemaWire) -> Result<Self, Self::Error> {
        if wire.key.trim().is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        let mut filter_fields = Vec::with_capacity(wire.filter_fields.len());
        for name in &wire.filter_fields {
            let Some(kind) = FilterKind::from_field_name(name) else {
                return Err(CatalogError::UnknownFilter {
                    endpoint: wire.key.clone(),
                    filter: name.clone(),
                });
            };
            if filter_fields.contains(&kind) {
                return Err(CatalogError::DuplicateFilter {
                    endpoint: wire.key.clone(),
                    filter: name.clone(),
                });
            }
            filter_fields.push(kind);
        }
        Ok(EndpointSchema {
            key: wire.key,
            display_name: wire.display_name,
            description: wire.description,
            tooltip: wire.tooltip,
            filter_fields,
            date_reference_shape: wire.date_reference_shape,
        })
    }
}

impl From<&EndpointSchema> for EndpointSchemaWire {
    fn from(schema: &EndpointSchema) -> Self {
        Self {
            key: schema.key.clone(),
            display_name: schema.display_name.clone(),
            description: schema.description.clone(),
            tooltip: schema.tooltip.clone(),
            filter_fields: schema.filter_names().into_iter().map(str::to_string).collect(),
            date_reference_shape: schema.date_reference_shape,
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointCatalog
// ---------------------------------------------------------------------------

/// Ordered set of endpoint schemas, unique by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCatalog {
    endpoints: Vec<EndpointSchema>,
}

impl EndpointCatalog {
    /// An empty catalog; every lookup renders the placeholder.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Focus bulletin endpoints known to the application.
    #[must_use]
    pub fn builtin() -> Self {
        use DataReferenceShape as Shape;
        use FilterKind::{DataReferencia, Indicador, Reuniao, Suavizada, TipoCalculo};

        let entry = |key: &str,
                     name: &str,
                     description: &str,
                     tooltip: &str,
                     filters: Vec<FilterKind>,
                     shape: Shape| EndpointSchema {
            key: key.to_string(),
            display_name: name.to_string(),
            description: description.to_string(),
            tooltip: tooltip.to_string(),
            filter_fields: filters,
            date_reference_shape: shape,
        };

        Self {
            endpoints: vec![
                entry(
                    "ExpectativasMercadoAnuais",
                    "Expectativas de Mercado Anuais",
                    "Consulta as projeções anuais para os principais indicadores econômicos.",
                    "Permite consultar expectativas para indicadores como IPCA, PIB, Selic para anos específicos.",
                    vec![Indicador, DataReferencia],
                    Shape::Year,
                ),
                entry(
                    "ExpectativaMercadoMensais",
                    "Expectativas de Mercado Mensais",
                    "Consulta as projeções mensais para os principais indicadores econômicos.",
                    "Consulte expectativas mensais para indicadores como IPCA, IGP-M, Selic.",
                    vec![Indicador, DataReferencia],
                    Shape::Month,
                ),
                entry(
                    "ExpectativasMercadoTrimestrais",
                    "Expectativas de Mercado Trimestrais",
                    "Consulta as projeções trimestrais para o PIB.",
                    "Específico para projeções trimestrais do PIB Total.",
                    vec![Indicador, DataReferencia],
                    Shape::Quarter,
                ),
                entry(
                    "ExpectativasMercadoTop5Anuais",
                    "Expectativas de Mercado Top 5 Anuais",
                    "Consulta as projeções anuais do grupo Top 5 (curto e médio prazo).",
                    "Expectativas das 5 instituições com melhor ranking de acurácia.",
                    vec![Indicador, DataReferencia, TipoCalculo],
                    Shape::Year,
                ),
                entry(
                    "ExpectativasMercadoTop5Mensais",
                    "Expectativas de Mercado Top 5 Mensais",
                    "Consulta as projeções mensais do grupo Top 5 (curto prazo).",
                    "Expectativas mensais das 5 instituições com melhor ranking.",
                    vec![Indicador, DataReferencia, TipoCalculo],
                    Shape::Month,
                ),
                entry(
                    "ExpectativasMercadoSelic",
                    "Expectativas de Mercado Selic",
                    "Consulta as projeções para a taxa Selic nas reuniões do Copom.",
                    "Expectativas para a taxa Selic em reuniões específicas do Copom.",
                    vec![Reuniao],
                    Shape::None,
                ),
                entry(
                    "ExpectativasMercadoInflacao12Meses",
                    "Expectativas de Mercado para Inflação 12 meses",
                    "Consulta as projeções de inflação para os próximos 12 meses.",
                    "Expectativas de inflação acumulada em 12 meses.",
                    vec![Indicador, Suavizada],
                    Shape::None,
                ),
                entry(
                    "ExpectativasMercadoInflacao24Meses",
                    "Expectativas de Mercado para Inflação 13 a 24 meses",
                    "Consulta as projeções de inflação para o período de 13 a 24 meses à frente.",
                    "Expectativas de inflação para o período de 13 a 24 meses.",
                    vec![Indicador, Suavizada],
                    Shape::None,
                ),
                entry(
                    "ExpectativasMercadoTop5Selic",
                    "Expectativas de Mercado Selic Top 5",
                    "Consulta as projeções para a Selic do grupo Top 5.",
                    "Expectativas para Selic das 5 instituições com melhor ranking.",
                    vec![Reuniao, TipoCalculo],
                    Shape::None,
                ),
            ],
        }
    }

    /// Builds a catalog from the engine's `key -> schema` map, keeping its
    /// order.
    ///
    /// Invalid schemas are skipped and returned alongside the catalog.
    #[must_use]
    pub fn from_wire(entries: WireCatalog) -> (Self, Vec<CatalogError>) {
        let mut catalog = Self::empty();
        let mut rejected = Vec::new();
        for (key, mut wire) in entries {
            if wire.key.is_empty() {
                wire.key = key;
            }
            match EndpointSchema::try_from(wire) {
                Ok(schema) => catalog.insert(schema),
                Err(err) => {
                    warn!(error = %err, "rejecting endpoint schema");
                    rejected.push(err);
                }
            }
        }
        debug!(endpoints = catalog.len(), rejected = rejected.len(), "catalog loaded");
        (catalog, rejected)
    }

    /// Inserts a schema, replacing any schema with the same key in place.
    pub fn insert(&mut self, schema: EndpointSchema) {
        match self.endpoints.iter_mut().find(|e| e.key == schema.key) {
            Some(slot) => *slot = schema,
            None => self.endpoints.push(schema),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EndpointSchema> {
        self.endpoints.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointSchema> {
        self.endpoints.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|e| e.key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Wire representation, keyed by endpoint in catalog order.
    #[must_use]
    pub fn to_wire(&self) -> WireCatalog {
        self.endpoints
            .iter()
            .map(|e| (e.key.clone(), EndpointSchemaWire::from(e)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CatalogCache
// ---------------------------------------------------------------------------

/// Catalog held for the lifetime of one settings activation.
///
/// `begin_activation` drops whatever was cached; `populate` stores the freshly
/// fetched catalog. Between activations the cached catalog is reused as-is.
#[derive(Debug, Default)]
pub struct CatalogCache {
    catalog: Option<Arc<EndpointCatalog>>,
    activations: u64,
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new activation, discarding the cached catalog.
    pub fn begin_activation(&mut self) -> u64 {
        self.catalog = None;
        self.activations += 1;
        self.activations
    }

    /// Stores the catalog for the current activation.
    pub fn populate(&mut self, catalog: EndpointCatalog) -> Arc<EndpointCatalog> {
        let catalog = Arc::new(catalog);
        self.catalog = Some(Arc::clone(&catalog));
        catalog
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<EndpointCatalog>> {
        self.catalog.clone()
    }

    /// Cached catalog, or an empty one when nothing was populated.
    #[must_use]
    pub fn get_or_empty(&self) -> Arc<EndpointCatalog> {
        self.catalog
            .clone()
            .unwrap_or_else(|| Arc::new(EndpointCatalog::empty()))
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.catalog.is_some()
    }

    #[must_use]
    pub fn activations(&self) -> u64 {
        self.activations
    }
}
