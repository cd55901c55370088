use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which collection job a start request or completion signal refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// SGS time-series collection (all configured series).
    Series,
    /// Focus bulletin collection for one endpoint and filter set.
    #[serde(rename = "focus")]
    Bulletin,
}

impl JobKind {
    /// Wire/display name of the job kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Bulletin => "focus",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling cadence of a time series.
///
/// Serialized lowercase without accents (`diaria`, `mensal`, `anual`), which is
/// also the suffix used in generated table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Diaria,
    Mensal,
    Anual,
}

impl Periodicity {
    pub const ALL: [Periodicity; 3] = [Self::Diaria, Self::Mensal, Self::Anual];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diaria => "diaria",
            Self::Mensal => "mensal",
            Self::Anual => "anual",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a periodicity tag is not one of the known cadences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown periodicity: {0:?}")]
pub struct UnknownPeriodicity(pub String);

impl FromStr for Periodicity {
    type Err = UnknownPeriodicity;

    /// Case-insensitive; accepts the accented `diária` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diaria" | "diária" => Ok(Self::Diaria),
            "mensal" => Ok(Self::Mensal),
            "anual" => Ok(Self::Anual),
            _ => Err(UnknownPeriodicity(s.to_string())),
        }
    }
}

/// Shape of the `DataReferencia` filter for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataReferenceShape {
    Year,
    Month,
    Quarter,
    #[default]
    None,
}

/// Input widget kind of a rendered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Date,
    Text,
    Number,
    Select,
    Datalist,
}
