//! Job-posting records and the validation pass that builds them from untrusted model output.
//!
//! The model's JSON is first deserialized into the lenient `Raw*` shapes (everything optional,
//! numbers accepted in a few spellings), then `RawJobPostingsContainer::validate` turns it into
//! the typed records below or fails with the first violated constraint.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::dates::normalize_date;

const DEFAULT_COUNTRY: &str = "Unknown";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_PERIOD: &str = "yearly";
const DEFAULT_DEGREE: &str = "Unspecified";
const DEFAULT_FIELD_OF_STUDY: &str = "General";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed response JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job_postings list cannot be empty")]
    EmptyPostings,

    #[error("{path} is a required field")]
    MissingField { path: String },

    #[error("{path} is a required field and cannot be empty")]
    EmptyField { path: String },

    #[error("{path}: salary cannot be negative (got {value})")]
    NegativeSalary { path: String, value: i64 },

    #[error("{path}: expected a whole number, got {value}")]
    InvalidAmount { path: String, value: String },

    #[error("metadata.{key}: expected a string or an integer")]
    InvalidMetadata { key: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Validated records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Salary {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub currency: String,
    pub period: String,
}

impl Default for Salary {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            currency: DEFAULT_CURRENCY.to_string(),
            period: DEFAULT_PERIOD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationalQualification {
    pub degree: String,
    pub field_of_study: String,
}

/// A single validated job posting. Field order here is the field order of the persisted JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPosting {
    pub job_title: String,
    pub company_name: String,
    pub locations: Vec<Location>,
    pub job_tags: Vec<String>,
    pub employment_type: String,
    pub salary: Salary,
    pub job_description: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub skills: Vec<String>,
    pub educational_qualifications: Vec<EducationalQualification>,
    pub date_posted: Option<NaiveDate>,
    pub application_deadline: Option<NaiveDate>,
    pub application_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPostingsContainer {
    pub job_postings: Vec<JobPosting>,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl JobPostingsContainer {
    /// Parses model output text and runs the validation pass.
    /// `today` anchors relative dates such as "3 days ago".
    pub fn from_json(text: &str, today: NaiveDate) -> Result<Self, SchemaError> {
        let raw: RawJobPostingsContainer = serde_json::from_str(text)?;
        raw.validate(today)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw shapes as returned by the model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawJobPostingsContainer {
    #[serde(default)]
    pub job_postings: Option<Vec<RawJobPosting>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawJobPosting {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub locations: Option<Vec<RawLocation>>,
    pub job_tags: Option<Vec<String>>,
    pub employment_type: Option<String>,
    pub salary: Option<RawSalary>,
    pub job_description: Option<String>,
    pub responsibilities: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    pub educational_qualifications: Option<Vec<RawEducationalQualification>>,
    pub date_posted: Option<String>,
    pub application_deadline: Option<String>,
    pub application_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawLocation {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSalary {
    pub min: Option<RawAmount>,
    pub max: Option<RawAmount>,
    pub currency: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawEducationalQualification {
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
}

/// Salary bounds as models actually emit them: `85000`, `85000.0` or `"85000"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawJobPostingsContainer {
    pub fn validate(self, today: NaiveDate) -> Result<JobPostingsContainer, SchemaError> {
        let postings = self.job_postings.ok_or_else(|| SchemaError::MissingField {
            path: "job_postings".to_string(),
        })?;
        if postings.is_empty() {
            return Err(SchemaError::EmptyPostings);
        }

        let job_postings = postings
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.validate(&format!("job_postings[{i}]"), today))
            .collect::<Result<Vec<_>, _>>()?;

        let raw_metadata = self.metadata.ok_or_else(|| SchemaError::MissingField {
            path: "metadata".to_string(),
        })?;
        let mut metadata = BTreeMap::new();
        for (key, value) in raw_metadata {
            if let Some(value) = metadata_value(&key, value)? {
                metadata.insert(key, value);
            }
        }

        Ok(JobPostingsContainer {
            job_postings,
            metadata,
        })
    }
}

impl RawJobPosting {
    fn validate(self, path: &str, today: NaiveDate) -> Result<JobPosting, SchemaError> {
        let job_title = required_text(self.job_title, &format!("{path}.job_title"))?;
        let company_name = required_text(self.company_name, &format!("{path}.company_name"))?;
        let application_link =
            required_text(self.application_link, &format!("{path}.application_link"))?;

        let salary = match self.salary {
            Some(raw) => raw.validate(&format!("{path}.salary"))?,
            None => Salary::default(),
        };

        Ok(JobPosting {
            job_title,
            company_name,
            locations: self
                .locations
                .unwrap_or_default()
                .into_iter()
                .map(RawLocation::into_location)
                .collect(),
            job_tags: dedup_tags(self.job_tags.unwrap_or_default()),
            employment_type: self.employment_type.unwrap_or_default(),
            salary,
            job_description: self.job_description.unwrap_or_default(),
            responsibilities: self.responsibilities.unwrap_or_default(),
            requirements: self.requirements.unwrap_or_default(),
            skills: self.skills.unwrap_or_default(),
            educational_qualifications: self
                .educational_qualifications
                .unwrap_or_default()
                .into_iter()
                .map(RawEducationalQualification::into_qualification)
                .collect(),
            date_posted: self
                .date_posted
                .as_deref()
                .and_then(|d| normalize_date(d, today)),
            application_deadline: self
                .application_deadline
                .as_deref()
                .and_then(|d| normalize_date(d, today)),
            application_link,
        })
    }
}

impl RawLocation {
    fn into_location(self) -> Location {
        Location {
            city: self.city,
            state: self.state,
            country: self.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        }
    }
}

impl RawEducationalQualification {
    fn into_qualification(self) -> EducationalQualification {
        EducationalQualification {
            degree: self.degree.unwrap_or_else(|| DEFAULT_DEGREE.to_string()),
            field_of_study: self
                .field_of_study
                .unwrap_or_else(|| DEFAULT_FIELD_OF_STUDY.to_string()),
        }
    }
}

impl RawSalary {
    pub fn validate(self, path: &str) -> Result<Salary, SchemaError> {
        Ok(Salary {
            min: self
                .min
                .map(|a| a.to_amount(&format!("{path}.min")))
                .transpose()?,
            max: self
                .max
                .map(|a| a.to_amount(&format!("{path}.max")))
                .transpose()?,
            currency: self
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            period: self.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string()),
        })
    }
}

impl RawAmount {
    fn to_amount(&self, path: &str) -> Result<u64, SchemaError> {
        let invalid = || SchemaError::InvalidAmount {
            path: path.to_string(),
            value: self.to_string(),
        };

        let value = match self {
            RawAmount::Integer(n) => *n,
            // `i64::MAX as f64` is 2^63, one past the representable range.
            RawAmount::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                *f as i64
            }
            RawAmount::Float(_) => return Err(invalid()),
            RawAmount::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        };

        u64::try_from(value).map_err(|_| SchemaError::NegativeSalary {
            path: path.to_string(),
            value,
        })
    }
}

impl std::fmt::Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawAmount::Integer(n) => write!(f, "{n}"),
            RawAmount::Float(x) => write!(f, "{x}"),
            RawAmount::Text(s) => write!(f, "{s:?}"),
        }
    }
}

fn required_text(value: Option<String>, path: &str) -> Result<String, SchemaError> {
    let value = value.ok_or_else(|| SchemaError::MissingField {
        path: path.to_string(),
    })?;
    if value.trim().is_empty() {
        return Err(SchemaError::EmptyField {
            path: path.to_string(),
        });
    }
    Ok(value)
}

/// Tags behave like a set but keep the order the page listed them in.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn metadata_value(
    key: &str,
    value: serde_json::Value,
) -> Result<Option<MetadataValue>, SchemaError> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(MetadataValue::Text(s))),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(|n| Some(MetadataValue::Integer(n)))
            .ok_or_else(|| SchemaError::InvalidMetadata {
                key: key.to_string(),
            }),
        _ => Err(SchemaError::InvalidMetadata {
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn posting(overrides: serde_json::Value) -> serde_json::Value {
        let mut base = json!({
            "job_title": "Engineer",
            "company_name": "Acme",
            "application_link": "https://acme.example/apply"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    fn container(postings: Vec<serde_json::Value>) -> String {
        json!({ "job_postings": postings, "metadata": {} }).to_string()
    }

    #[test]
    fn test_minimal_posting_gets_defaults() {
        let parsed = JobPostingsContainer::from_json(&container(vec![posting(json!({}))]), today())
            .unwrap();
        let p = &parsed.job_postings[0];
        assert_eq!(p.job_title, "Engineer");
        assert!(p.locations.is_empty());
        assert_eq!(p.salary, Salary::default());
        assert_eq!(p.salary.currency, "USD");
        assert_eq!(p.salary.period, "yearly");
        assert_eq!(p.employment_type, "");
        assert_eq!(p.date_posted, None);
    }

    #[test]
    fn test_missing_job_title_fails() {
        let text = json!({
            "job_postings": [{"company_name": "Acme", "application_link": "https://x"}],
            "metadata": {}
        })
        .to_string();
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(
            matches!(err, SchemaError::MissingField { ref path } if path == "job_postings[0].job_title"),
            "got {err}"
        );
    }

    #[test]
    fn test_whitespace_company_name_fails() {
        let text = container(vec![posting(json!({"company_name": "   "}))]);
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyField { .. }), "got {err}");
        assert!(err.to_string().contains("company_name"));
    }

    #[test]
    fn test_empty_application_link_fails() {
        let text = container(vec![posting(json!({"application_link": ""}))]);
        assert!(JobPostingsContainer::from_json(&text, today()).is_err());
    }

    #[test]
    fn test_empty_postings_fails() {
        let err = JobPostingsContainer::from_json(&container(vec![]), today()).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyPostings));
    }

    #[test]
    fn test_missing_postings_fails() {
        let err = JobPostingsContainer::from_json(r#"{"metadata": {}}"#, today()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { .. }));
    }

    #[test]
    fn test_missing_metadata_fails() {
        let text = json!({ "job_postings": [posting(json!({}))] }).to_string();
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(
            matches!(err, SchemaError::MissingField { ref path } if path == "metadata"),
            "got {err}"
        );

        let text = json!({ "job_postings": [posting(json!({}))], "metadata": null }).to_string();
        assert!(JobPostingsContainer::from_json(&text, today()).is_err());
    }

    #[test]
    fn test_undeclared_top_level_property_fails() {
        let text = json!({
            "job_postings": [posting(json!({}))],
            "metadata": {},
            "notes": "extra"
        })
        .to_string();
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn test_negative_salary_fails() {
        let raw = RawSalary {
            min: Some(RawAmount::Integer(-5)),
            ..Default::default()
        };
        let err = raw.validate("salary").unwrap_err();
        assert!(matches!(err, SchemaError::NegativeSalary { value: -5, .. }));
    }

    #[test]
    fn test_salary_range_accepted() {
        let raw = RawSalary {
            min: Some(RawAmount::Integer(0)),
            max: Some(RawAmount::Integer(100_000)),
            ..Default::default()
        };
        let salary = raw.validate("salary").unwrap();
        assert_eq!(salary.min, Some(0));
        assert_eq!(salary.max, Some(100_000));
    }

    #[test]
    fn test_salary_lenient_number_forms() {
        let text = container(vec![posting(json!({
            "salary": {"min": "85000", "max": 120000.0, "currency": null, "period": "hourly"}
        }))]);
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        let salary = &parsed.job_postings[0].salary;
        assert_eq!(salary.min, Some(85_000));
        assert_eq!(salary.max, Some(120_000));
        assert_eq!(salary.currency, "USD");
        assert_eq!(salary.period, "hourly");
    }

    #[test]
    fn test_fractional_salary_rejected() {
        let text = container(vec![posting(json!({"salary": {"min": 10.5}}))]);
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAmount { .. }));
    }

    #[test]
    fn test_out_of_range_salary_rejected() {
        let text = container(vec![posting(json!({"salary": {"max": 1e20}}))]);
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(
            matches!(err, SchemaError::InvalidAmount { ref path, .. } if path == "job_postings[0].salary.max"),
            "got {err}"
        );

        let text = container(vec![posting(json!({"salary": {"min": 9.3e18}}))]);
        assert!(matches!(
            JobPostingsContainer::from_json(&text, today()).unwrap_err(),
            SchemaError::InvalidAmount { .. }
        ));
    }

    #[test]
    fn test_dates_normalized() {
        let text = container(vec![posting(json!({
            "date_posted": "3 days ago",
            "application_deadline": "Ongoing"
        }))]);
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        let p = &parsed.job_postings[0];
        assert_eq!(p.date_posted, NaiveDate::from_ymd_opt(2024, 3, 17));
        assert_eq!(p.application_deadline, None);
    }

    #[test]
    fn test_dates_serialize_as_iso_or_null() {
        let text = container(vec![posting(json!({"date_posted": "2024-01-15"}))]);
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["job_postings"][0]["date_posted"], "2024-01-15");
        assert!(value["job_postings"][0]["application_deadline"].is_null());
    }

    #[test]
    fn test_location_and_education_defaults() {
        let text = container(vec![posting(json!({
            "locations": [{"city": "Austin", "state": "TX"}],
            "educational_qualifications": [{"degree": null}]
        }))]);
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        let p = &parsed.job_postings[0];
        assert_eq!(p.locations[0].country, "Unknown");
        assert_eq!(p.locations[0].city.as_deref(), Some("Austin"));
        assert_eq!(p.educational_qualifications[0].degree, "Unspecified");
        assert_eq!(p.educational_qualifications[0].field_of_study, "General");
    }

    #[test]
    fn test_job_tags_deduplicated_in_order() {
        let text = container(vec![posting(json!({
            "job_tags": ["Rust", "AI", " Rust ", "", "Remote"]
        }))]);
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        assert_eq!(parsed.job_postings[0].job_tags, vec!["Rust", "AI", "Remote"]);
    }

    #[test]
    fn test_metadata_values() {
        let text = json!({
            "job_postings": [posting(json!({}))],
            "metadata": {
                "scraped_from": "https://jobs.example/1",
                "total_job_postings": 1,
                "scraper_version": null
            }
        })
        .to_string();
        let parsed = JobPostingsContainer::from_json(&text, today()).unwrap();
        assert_eq!(
            parsed.metadata.get("total_job_postings"),
            Some(&MetadataValue::Integer(1))
        );
        assert_eq!(
            parsed.metadata.get("scraped_from"),
            Some(&MetadataValue::Text("https://jobs.example/1".to_string()))
        );
        assert!(!parsed.metadata.contains_key("scraper_version"));
    }

    #[test]
    fn test_metadata_rejects_nested_values() {
        let text = json!({
            "job_postings": [posting(json!({}))],
            "metadata": {"tags": ["a"]}
        })
        .to_string();
        let err = JobPostingsContainer::from_json(&text, today()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMetadata { ref key } if key == "tags"));
    }
}
