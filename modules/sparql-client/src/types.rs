use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, SparqlError};

/// Response body of a SELECT query in the SPARQL 1.1 JSON results format.
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: Head,
    #[serde(default)]
    pub results: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// One solution row: variable name to RDF term.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Binding(pub HashMap<String, RdfTerm>);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RdfTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    pub lang: Option<String>,
}

impl SparqlResults {
    pub fn bindings(&self) -> &[Binding] {
        &self.results.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    /// Value of `var` in the first row, if there is a first row.
    pub fn first_value(&self, var: &str) -> Result<Option<String>> {
        match self.results.bindings.first() {
            Some(row) => Ok(Some(row.value(var)?.to_string())),
            None => Ok(None),
        }
    }
}

impl Binding {
    pub fn value(&self, var: &str) -> Result<&str> {
        self.0
            .get(var)
            .map(|t| t.value.as_str())
            .ok_or_else(|| SparqlError::MissingBinding(var.to_string()))
    }

    /// Parse an `xsd:dateTime` literal. Values without an offset are read as UTC.
    pub fn datetime(&self, var: &str) -> Result<DateTime<Utc>> {
        let raw = self.value(var)?;
        parse_datetime(raw)
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| SparqlError::Parse(format!("invalid dateTime '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"{
        "head": { "vars": ["file", "created"] },
        "results": { "bindings": [
            {
                "file": { "type": "uri", "value": "share://a.pdf" },
                "created": {
                    "type": "typed-literal",
                    "datatype": "http://www.w3.org/2001/XMLSchema#dateTime",
                    "value": "2020-03-04T10:11:12.500Z"
                }
            },
            {
                "file": { "type": "uri", "value": "share://b.pdf" },
                "created": { "type": "literal", "value": "2021-01-01T00:00:00" }
            }
        ] }
    }"#;

    #[test]
    fn parses_select_results() {
        let results: SparqlResults = serde_json::from_str(BODY).unwrap();
        assert_eq!(results.head.vars, vec!["file", "created"]);
        assert_eq!(results.bindings().len(), 2);
        assert_eq!(results.bindings()[0].value("file").unwrap(), "share://a.pdf");
        assert_eq!(
            results.first_value("file").unwrap().as_deref(),
            Some("share://a.pdf")
        );
    }

    #[test]
    fn datetime_with_and_without_offset() {
        let results: SparqlResults = serde_json::from_str(BODY).unwrap();
        let first = results.bindings()[0].datetime("created").unwrap();
        assert_eq!(first.timestamp_millis() % 1000, 500);

        let second = results.bindings()[1].datetime("created").unwrap();
        assert_eq!(second, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_variable_is_an_error() {
        let results: SparqlResults = serde_json::from_str(BODY).unwrap();
        let err = results.bindings()[0].value("piece").unwrap_err();
        assert!(matches!(err, SparqlError::MissingBinding(v) if v == "piece"));
    }

    #[test]
    fn empty_body_has_no_rows() {
        let results: SparqlResults =
            serde_json::from_str(r#"{"head":{"vars":[]},"results":{"bindings":[]}}"#).unwrap();
        assert!(results.is_empty());
        assert_eq!(results.first_value("url").unwrap(), None);
    }
}
