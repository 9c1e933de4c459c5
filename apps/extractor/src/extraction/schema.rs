//! JSON schema sent as the response format of every extraction call.

use serde_json::{json, Value};

/// Fields every posting object must carry.
pub const REQUIRED_POSTING_FIELDS: &[&str] = &["job_title", "company_name", "application_link"];

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

pub fn job_postings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "job_postings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "job_title": { "type": "string" },
                        "company_name": { "type": "string" },
                        "locations": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "city": { "type": "string" },
                                    "state": { "type": "string" },
                                    "country": { "type": "string" }
                                }
                            }
                        },
                        "job_tags": string_array(),
                        "employment_type": { "type": "string" },
                        "salary": {
                            "type": "object",
                            "properties": {
                                "min": { "type": "integer" },
                                "max": { "type": "integer" },
                                "currency": { "type": "string" },
                                "period": { "type": "string" }
                            }
                        },
                        "job_description": { "type": "string" },
                        "responsibilities": string_array(),
                        "requirements": string_array(),
                        "skills": string_array(),
                        "educational_qualifications": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "degree": { "type": "string" },
                                    "field_of_study": { "type": "string" }
                                }
                            }
                        },
                        "date_posted": { "type": "string" },
                        "application_deadline": { "type": "string" },
                        "application_link": { "type": "string" }
                    },
                    "required": REQUIRED_POSTING_FIELDS
                }
            },
            "metadata": {
                "type": "object",
                "properties": {
                    "scraping_timestamp": { "type": "string" },
                    "scraped_from": { "type": "string" },
                    "source_type": { "type": "string" },
                    "scraper_version": { "type": "string" },
                    "data_format_version": { "type": "string" },
                    "total_job_postings": { "type": "integer" }
                }
            }
        },
        "required": ["job_postings", "metadata"],
        "additionalProperties": false
    })
}
