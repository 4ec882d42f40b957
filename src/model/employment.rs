use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Employment type of an employee's latest active contract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EmploymentType {
    Permanent,
    Contractual,
    JobOrder,
    PartTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn column_names_match_serde_names() {
        for kind in EmploymentType::iter() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_ref()));
            assert_eq!(EmploymentType::from_str(kind.as_ref()).unwrap(), kind);
        }
        assert_eq!(EmploymentType::JobOrder.as_ref(), "job-order");
        assert_eq!(EmploymentType::PartTime.to_string(), "part-time");
    }
}
