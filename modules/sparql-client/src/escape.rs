//! Literal and IRI escaping for building query strings.

use chrono::{DateTime, SecondsFormat, Utc};

const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Wrap an IRI in angle brackets, escaping characters that would end it early.
pub fn escape_uri(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len() + 2);
    out.push('<');
    for c in uri.chars() {
        if matches!(c, '\\' | '"' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('>');
    out
}

/// Long-quoted string literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 6);
    out.push_str("\"\"\"");
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\"\"\"");
    out
}

/// Typed `xsd:dateTime` literal in UTC. Keeps every fractional digit the value
/// carries, so a bound built from a stored timestamp compares equal to it.
pub fn escape_datetime(value: DateTime<Utc>) -> String {
    format!(
        "\"{}\"^^<{XSD_DATETIME}>",
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn uri_is_bracketed_and_escaped() {
        assert_eq!(escape_uri("share://a.pdf"), "<share://a.pdf>");
        assert_eq!(escape_uri("http://x/>y"), "<http://x/\\>y>");
    }

    #[test]
    fn string_quotes_are_escaped() {
        assert_eq!(escape_string(r#"say "hi""#), r#""""say \"hi\"""""#);
    }

    #[test]
    fn datetime_is_typed_literal() {
        let ts = Utc.with_ymd_and_hms(2019, 10, 2, 0, 0, 0).unwrap();
        assert_eq!(
            escape_datetime(ts),
            "\"2019-10-02T00:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>"
        );
    }

    #[test]
    fn datetime_keeps_sub_millisecond_digits() {
        let ts = Utc
            .with_ymd_and_hms(2020, 3, 4, 10, 11, 12)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(500_123))
            .unwrap();
        assert!(escape_datetime(ts).starts_with("\"2020-03-04T10:11:12.500123Z\""));
    }
}
