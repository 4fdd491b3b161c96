//! Structured estimation request consumed by one workflow run.
//!
//! Payloads are produced upstream from free-text requests, so numeric
//! fields arrive either as JSON numbers or as strings. Both are accepted and
//! kept as text; numeric validation happens when the value is typed into
//! the form.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Login pair for one of the two authentication stages.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "secret")]
    pub password: Option<SecretString>,
}

impl Credentials {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.as_deref().map_or(true, |u| u.trim().is_empty()) {
            missing.push("username");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        missing
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub quantity: Option<String>,
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Finished and open dimensions, in millimetres.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSize {
    #[serde(default, deserialize_with = "text_or_number")]
    pub closed_height: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub closed_length: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub open_height: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub open_length: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub spine: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub gsm: Option<String>,
    #[serde(default)]
    pub mill: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printing {
    #[serde(default, deserialize_with = "text_or_number")]
    pub front_colors: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub back_colors: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub special_colors: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub plate_type: Option<String>,
}

/// Margins in the order top, bottom, left, right.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<serde_json::Value>")]
pub struct Margins(pub [String; 4]);

impl Margins {
    pub const SIDES: [&'static str; 4] = ["top", "bottom", "left", "right"];
}

impl TryFrom<Vec<serde_json::Value>> for Margins {
    type Error = String;

    fn try_from(values: Vec<serde_json::Value>) -> Result<Self, Self::Error> {
        let sides: Vec<String> = values
            .into_iter()
            .map(|v| value_text(&v).ok_or_else(|| format!("invalid margin value: {v}")))
            .collect::<Result<_, _>>()?;
        let count = sides.len();
        let sides: [String; 4] = sides
            .try_into()
            .map_err(|_| format!("expected 4 margin values, got {count}"))?;
        Ok(Margins(sides))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finishing {
    #[serde(default, deserialize_with = "text_or_number")]
    pub make_ready_count: Option<String>,
    #[serde(default)]
    pub wastage_type: Option<String>,
    #[serde(default)]
    pub grain_direction: Option<String>,
    #[serde(default)]
    pub coating: Option<String>,
    #[serde(default)]
    pub trim_margins: Option<Margins>,
    #[serde(default)]
    pub strip_margins: Option<Margins>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEntry {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: u32,
}

impl ProcessEntry {
    pub fn new(name: impl Into<String>, required: bool, order: u32) -> Self {
        Self {
            name: name.into(),
            required,
            order,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSelection {
    #[serde(default)]
    pub required: Vec<ProcessEntry>,
    #[serde(default)]
    pub content_based: Vec<ProcessEntry>,
    #[serde(default)]
    pub optional: Vec<ProcessEntry>,
}

impl ProcessSelection {
    /// Processes whose failure fails the job: everything in the required
    /// list plus entries elsewhere carrying the required flag. Sorted by
    /// display order, stable for equal orders.
    pub fn mandatory(&self) -> Vec<&ProcessEntry> {
        let mut entries: Vec<&ProcessEntry> = self
            .required
            .iter()
            .chain(self.content_based.iter().filter(|p| p.required))
            .chain(self.optional.iter().filter(|p| p.required))
            .collect();
        entries.sort_by_key(|p| p.order);
        entries
    }

    /// Content-based then optional processes that may fail without
    /// failing the job.
    pub fn supplementary(&self) -> Vec<&ProcessEntry> {
        let mut content: Vec<&ProcessEntry> =
            self.content_based.iter().filter(|p| !p.required).collect();
        content.sort_by_key(|p| p.order);
        let mut optional: Vec<&ProcessEntry> =
            self.optional.iter().filter(|p| !p.required).collect();
        optional.sort_by_key(|p| p.order);
        content.extend(optional);
        content
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(default)]
    pub company: Option<Credentials>,
    #[serde(default)]
    pub user: Option<Credentials>,
    /// Financial year shown in the user login year selector, e.g. "2024-2025".
    #[serde(default)]
    pub financial_year: Option<String>,
    #[serde(default)]
    pub job: JobDetails,
    #[serde(default)]
    pub size: JobSize,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub printing: Printing,
    #[serde(default)]
    pub finishing: Finishing,
    #[serde(default)]
    pub processes: ProcessSelection,
}

impl JobPayload {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Lists credential fields the login steps will reject, e.g.
    /// `company.password`.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (section, creds) in [("company", &self.company), ("user", &self.user)] {
            match creds {
                Some(creds) => problems.extend(
                    creds
                        .missing_fields()
                        .into_iter()
                        .map(|field| format!("{section}.{field}")),
                ),
                None => problems.push(section.to_string()),
            }
        }
        problems
    }

    /// Short, secret-free description stored alongside the job record.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "client": self.job.client,
            "contentType": self.job.content_type,
            "quantity": self.job.quantity,
            "requiredProcesses": self.processes.mandatory().len(),
        })
    }
}

fn secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

fn value_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => value_text(&v)
            .filter(|s| !s.is_empty())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected text or number, got {v}"))),
    }
}
