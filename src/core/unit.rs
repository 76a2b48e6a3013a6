//! Reference units supported by the converter

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCode {
    Dolar,
    Euro,
    Uf,
}

impl UnitCode {
    pub const ALL: [UnitCode; 3] = [UnitCode::Dolar, UnitCode::Euro, UnitCode::Uf];

    /// Code used by the indicators API, both as snapshot key and path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCode::Dolar => "dolar",
            UnitCode::Euro => "euro",
            UnitCode::Uf => "uf",
        }
    }

    pub fn label(&self) -> &'static str {
        unit_label(self.as_str())
    }
}

impl Display for UnitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dolar" => Ok(UnitCode::Dolar),
            "euro" => Ok(UnitCode::Euro),
            "uf" => Ok(UnitCode::Uf),
            _ => Err(anyhow::anyhow!("Unsupported unit: {}", s)),
        }
    }
}

/// Human readable label for a unit code. Unknown codes map to an empty label.
pub fn unit_label(code: &str) -> &'static str {
    match code {
        "dolar" => "$ (USD)",
        "euro" => "€ (EUR)",
        "uf" => "UF",
        _ => "",
    }
}
