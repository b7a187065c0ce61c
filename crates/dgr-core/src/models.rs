//! Record types returned by the data store

use serde::{Deserialize, Deserializer, Serialize};

/// Dangerous-goods entry from `dgr_un_list`, keyed by UN number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazmatRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub un_number: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub name_description: Option<String>,

    #[serde(default, rename = "class_devision", deserialize_with = "lenient_text")]
    pub class_division: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub sub_risk: Option<String>,

    #[serde(default, rename = "un_packing_group", deserialize_with = "lenient_text")]
    pub packing_group: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub special_provision: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub limited_quantities: Option<String>,

    #[serde(default, rename = "excepted_qnty", deserialize_with = "lenient_text")]
    pub excepted_quantity: Option<String>,
}

impl HazmatRecord {
    /// Display labels paired with values, in reply order
    pub fn labeled_fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("Name/Description", self.name_description.as_deref()),
            ("Class/Division", self.class_division.as_deref()),
            ("Sub Risk", self.sub_risk.as_deref()),
            ("Packing Group", self.packing_group.as_deref()),
            ("Special Provision", self.special_provision.as_deref()),
            ("Limited Quantities", self.limited_quantities.as_deref()),
            ("Excepted Quantity", self.excepted_quantity.as_deref()),
        ]
    }
}

/// Regulatory class from `dgr_classes`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DgrClass {
    #[serde(default, deserialize_with = "lenient_text")]
    pub icao_class: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub iata_code: Option<String>,
}

/// Accept a JSON string, number or boolean as text; `null` becomes `None`.
///
/// `3` and `"3"` decode identically.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
