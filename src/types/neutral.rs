use std::fmt;

use serde::{Deserialize, Serialize};

/// Language-neutral scalar type used throughout the Model IR and Rule IR.
///
/// `Date` and `Datetime` columns exist in the schema but carry no
/// comparison operators in rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeutralType {
    String,
    Int32,
    Int64,
    Decimal,
    Float64,
    Bool,
    Date,
    Datetime,
}

impl NeutralType {
    /// Whether this type admits any rule-condition operator at all.
    #[must_use]
    pub fn is_comparable(self) -> bool {
        !matches!(self, NeutralType::Date | NeutralType::Datetime)
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            NeutralType::Int32 | NeutralType::Int64 | NeutralType::Decimal | NeutralType::Float64
        )
    }
}

impl fmt::Display for NeutralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NeutralType::String => "string",
            NeutralType::Int32 => "int32",
            NeutralType::Int64 => "int64",
            NeutralType::Decimal => "decimal",
            NeutralType::Float64 => "float64",
            NeutralType::Bool => "bool",
            NeutralType::Date => "date",
            NeutralType::Datetime => "datetime",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_types_not_comparable() {
        assert!(!NeutralType::Date.is_comparable());
        assert!(!NeutralType::Datetime.is_comparable());
        assert!(NeutralType::String.is_comparable());
        assert!(NeutralType::Decimal.is_comparable());
    }

    #[test]
    fn numeric_types() {
        assert!(NeutralType::Int32.is_numeric());
        assert!(NeutralType::Int64.is_numeric());
        assert!(NeutralType::Decimal.is_numeric());
        assert!(NeutralType::Float64.is_numeric());
        assert!(!NeutralType::Bool.is_numeric());
        assert!(!NeutralType::String.is_numeric());
    }

    #[test]
    fn serde_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&NeutralType::Float64).unwrap(),
            "\"float64\""
        );
        assert_eq!(
            serde_json::from_str::<NeutralType>("\"datetime\"").unwrap(),
            NeutralType::Datetime
        );
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(NeutralType::Int32.to_string(), "int32");
        assert_eq!(NeutralType::Datetime.to_string(), "datetime");
    }
}
