//! Backend data shapes

use serde::{Deserialize, Deserializer, Serialize};

/// One inventory line from the backend's location detail browse
///
/// Field values arrive as strings, numbers or null depending on the column,
/// so every field is read leniently into text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthoritativeRecord {
    #[serde(rename = "ld_det.ld_domain", default, deserialize_with = "lenient_text")]
    pub domain: Option<String>,
    #[serde(rename = "ld_det.ld_site", default, deserialize_with = "lenient_text")]
    pub site: Option<String>,
    #[serde(rename = "ld_det.ld_loc", default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(rename = "ld_det.ld_part", default, deserialize_with = "lenient_text")]
    pub part: Option<String>,
    #[serde(rename = "ld_det.ld_lot", default, deserialize_with = "lenient_text")]
    pub lot: Option<String>,
    #[serde(rename = "ld_det.ld_status", default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(rename = "ld_det.ld_grade", default, deserialize_with = "lenient_text")]
    pub grade: Option<String>,
    #[serde(rename = "ld_det.ld_assay", default, deserialize_with = "lenient_text")]
    pub assay: Option<String>,
    #[serde(rename = "ld_det.ld_expire", default, deserialize_with = "lenient_text")]
    pub expire: Option<String>,
    #[serde(rename = "ld_det.ld_qty_oh", default, deserialize_with = "lenient_text")]
    pub qty_on_hand: Option<String>,
    #[serde(rename = "ld_det.ld_qty_all", default, deserialize_with = "lenient_text")]
    pub qty_allocated: Option<String>,
    #[serde(rename = "ld_det.ld_ref", default, deserialize_with = "lenient_text")]
    pub reference: Option<String>,
    #[serde(rename = "pt_mstr.pt_desc1", default, deserialize_with = "lenient_text")]
    pub description1: Option<String>,
    #[serde(rename = "pt_mstr.pt_desc2", default, deserialize_with = "lenient_text")]
    pub description2: Option<String>,
    #[serde(rename = "pt_mstr.pt_um", default, deserialize_with = "lenient_text")]
    pub unit_of_measure: Option<String>,
}

impl AuthoritativeRecord {
    pub fn domain(&self) -> &str {
        self.domain.as_deref().unwrap_or("")
    }

    pub fn site(&self) -> &str {
        self.site.as_deref().unwrap_or("")
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    pub fn part(&self) -> &str {
        self.part.as_deref().unwrap_or("")
    }
}

/// Accepts a JSON string, number, bool or null and keeps it as text
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

/// A backend domain (business unit) the user may work in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub key: String,
    /// Short domain code, e.g. `CZ01`
    pub name: String,
    /// Workspace name as returned by the backend, e.g. `CZ01_Production`
    pub full_name: String,
    pub description: Option<String>,
    pub is_default: bool,
}

/// Workspace entry in the user context response
#[derive(Debug, Deserialize)]
pub(crate) struct Workspace {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl From<Workspace> for Domain {
    fn from(ws: Workspace) -> Self {
        let code = ws.name.split('_').next().unwrap_or(ws.name.as_str()).to_string();
        Self {
            key: ws.key,
            name: code,
            full_name: ws.name,
            description: ws.description,
            is_default: ws.default,
        }
    }
}

/// Pick the domain to work in without asking the operator
///
/// A single domain is always chosen; otherwise the one flagged as default.
pub fn pick_default_domain(domains: &[Domain]) -> Option<&Domain> {
    match domains {
        [only] => Some(only),
        _ => domains.iter().find(|d| d.is_default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_deserializes_mixed_value_types() {
        let json = r#"{
            "ld_det.ld_domain": "CZ01",
            "ld_det.ld_site": 1000,
            "ld_det.ld_loc": "A1-05",
            "ld_det.ld_part": "P-100",
            "ld_det.ld_lot": null,
            "ld_det.ld_qty_oh": 12.5,
            "ld_det.ld_ref": "M0000078",
            "pt_mstr.pt_um": "EA"
        }"#;

        let record: AuthoritativeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.domain(), "CZ01");
        assert_eq!(record.site(), "1000");
        assert_eq!(record.qty_on_hand.as_deref(), Some("12.5"));
        assert_eq!(record.lot, None);
        assert_eq!(record.grade, None);
        assert_eq!(record.unit_of_measure.as_deref(), Some("EA"));
    }

    #[test]
    fn workspace_name_is_shortened_to_domain_code() {
        let ws = Workspace {
            key: "k1".to_string(),
            name: "CZ01_Production".to_string(),
            description: None,
            default: true,
        };
        let domain = Domain::from(ws);
        assert_eq!(domain.name, "CZ01");
        assert_eq!(domain.full_name, "CZ01_Production");
        assert!(domain.is_default);
    }

    fn domain(name: &str, is_default: bool) -> Domain {
        Domain {
            key: name.to_lowercase(),
            name: name.to_string(),
            full_name: name.to_string(),
            description: None,
            is_default,
        }
    }

    #[test]
    fn single_domain_is_picked() {
        let domains = vec![domain("CZ01", false)];
        assert_eq!(pick_default_domain(&domains).unwrap().name, "CZ01");
    }

    #[test]
    fn default_domain_is_picked_among_many() {
        let domains = vec![domain("CZ01", false), domain("DE02", true)];
        assert_eq!(pick_default_domain(&domains).unwrap().name, "DE02");
    }

    #[test]
    fn no_pick_without_default() {
        let domains = vec![domain("CZ01", false), domain("DE02", false)];
        assert!(pick_default_domain(&domains).is_none());
        assert!(pick_default_domain(&[]).is_none());
    }
}
