// Trait boundaries to the remote triple store, plus the SPARQL-backed implementation.
//
// PieceSource: the ordered, paginated listing the fetcher walks.
// PieceDirectory: single-piece lookups and the reinsert write used by the
//   HTTP actions and bulk reprocess.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sparql_client::{escape_datetime, escape_uri, SparqlClient};
use tracing::debug;

use crate::error::Result;
use crate::types::{PageRequest, PieceRecord};

/// Graph holding the organization's dossier data.
const ORGANIZATION_GRAPH: &str = "http://mu.semte.ch/graphs/organizations/kanselarij";

const PREFIXES: &str = "\
PREFIX dossier: <https://data.vlaanderen.be/ns/dossier#>
PREFIX pav: <http://purl.org/pav/>
PREFIX dct: <http://purl.org/dc/terms/>
PREFIX sign: <http://mu.semte.ch/vocabularies/ext/handtekenen/>
PREFIX prov: <http://www.w3.org/ns/prov#>
PREFIX nie: <http://www.semanticdesktop.org/ontologies/2007/01/19/nie#>
PREFIX mu: <http://mu.semte.ch/vocabularies/core/>
";

#[async_trait]
pub trait PieceSource: Send + Sync {
    /// Physical files of pieces created strictly inside the request bounds,
    /// ascending by creation time, at most `page_size` rows.
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PieceRecord>>;
}

#[async_trait]
pub trait PieceDirectory: Send + Sync {
    /// Display URL of the piece a physical file belongs to.
    async fn piece_url(&self, physical_uri: &str) -> Result<Option<String>>;

    /// URI of the piece a physical file belongs to.
    async fn piece_uri(&self, physical_uri: &str) -> Result<Option<String>>;

    /// Re-assert the piece's type triple. Idempotent.
    async fn reinsert_piece(&self, piece_uri: &str) -> Result<()>;
}

pub struct PieceGraph {
    client: SparqlClient,
    document_base_url: String,
}

impl PieceGraph {
    pub fn new(client: SparqlClient, document_base_url: &str) -> Self {
        Self {
            client,
            document_base_url: document_base_url.to_string(),
        }
    }
}

#[async_trait]
impl PieceSource for PieceGraph {
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PieceRecord>> {
        let query = page_query(request.lower_exclusive, request.upper_exclusive, request.page_size);
        let results = self.client.query(&query).await?;

        let mut records = Vec::with_capacity(results.bindings().len());
        for row in results.bindings() {
            records.push(PieceRecord {
                identifier: row.value("file")?.to_string(),
                created_at: row.datetime("created")?,
            });
        }
        debug!(
            lower = %request.lower_exclusive,
            rows = records.len(),
            "Fetched piece page"
        );
        Ok(records)
    }
}

#[async_trait]
impl PieceDirectory for PieceGraph {
    async fn piece_url(&self, physical_uri: &str) -> Result<Option<String>> {
        let results = self
            .client
            .query(&piece_url_query(physical_uri, &self.document_base_url))
            .await?;
        Ok(results.first_value("url")?)
    }

    async fn piece_uri(&self, physical_uri: &str) -> Result<Option<String>> {
        let results = self.client.query(&piece_uri_query(physical_uri)).await?;
        Ok(results.first_value("piece")?)
    }

    async fn reinsert_piece(&self, piece_uri: &str) -> Result<()> {
        self.client.update(&reinsert_piece_update(piece_uri)).await?;
        Ok(())
    }
}

/// PDF files of pieces that belong to a series and have no unsigned counterpart.
pub(crate) fn page_query(
    lower_exclusive: DateTime<Utc>,
    upper_exclusive: DateTime<Utc>,
    page_size: usize,
) -> String {
    format!(
        r#"{PREFIXES}
SELECT DISTINCT ?file ?created
WHERE {{
  GRAPH <{ORGANIZATION_GRAPH}> {{
    ?piece a dossier:Stuk ;
      prov:value ?virtualFile ;
      dct:created ?created .
    ?file nie:dataSource ?virtualFile ;
      dct:format ?format .
    FILTER EXISTS {{ ?serie dossier:Collectie.bestaatUit ?piece }}
    FILTER NOT EXISTS {{ ?piece sign:ongetekendStuk ?unsignedPiece }}
    FILTER (CONTAINS(LCASE(?format), "pdf"))
    FILTER (?created > {lower})
    FILTER (?created < {upper})
  }}
}}
ORDER BY ?created
LIMIT {page_size}"#,
        lower = escape_datetime(lower_exclusive),
        upper = escape_datetime(upper_exclusive),
    )
}

pub(crate) fn piece_url_query(physical_uri: &str, base_url: &str) -> String {
    format!(
        r#"{PREFIXES}
SELECT DISTINCT ?url
WHERE {{
  GRAPH <{ORGANIZATION_GRAPH}> {{
    {file} nie:dataSource ?virtualFile .
    ?piece prov:value ?virtualFile ; mu:uuid ?id .
    BIND(CONCAT({base}, STR(?id)) AS ?url)
  }}
}}"#,
        file = escape_uri(physical_uri),
        base = sparql_client::escape_string(base_url),
    )
}

pub(crate) fn piece_uri_query(physical_uri: &str) -> String {
    format!(
        r#"{PREFIXES}
SELECT DISTINCT ?piece
WHERE {{
  GRAPH <{ORGANIZATION_GRAPH}> {{
    {file} nie:dataSource ?virtualFile .
    ?piece prov:value ?virtualFile .
  }}
}}"#,
        file = escape_uri(physical_uri),
    )
}

pub(crate) fn reinsert_piece_update(piece_uri: &str) -> String {
    format!(
        r#"PREFIX dossier: <https://data.omgeving.vlaanderen.be/ns/dossier#>

INSERT DATA {{
  GRAPH <{ORGANIZATION_GRAPH}> {{
    {piece} a dossier:Stuk .
  }}
}}"#,
        piece = escape_uri(piece_uri),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn page_query_carries_both_bounds_and_limit() {
        let lower = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let upper = Utc.with_ymd_and_hms(2024, 4, 12, 0, 0, 0).unwrap();
        let q = page_query(lower, upper, 100);

        assert!(q.contains("FILTER (?created > \"2020-01-01T00:00:00Z\""));
        assert!(q.contains("FILTER (?created < \"2024-04-12T00:00:00Z\""));
        assert!(q.contains("ORDER BY ?created"));
        assert!(q.trim_end().ends_with("LIMIT 100"));
    }

    #[test]
    fn lower_bound_matches_a_sub_millisecond_watermark() {
        let body = r#"{
            "head": { "vars": ["created"] },
            "results": { "bindings": [
                { "created": { "type": "literal", "value": "2020-03-04T10:11:12.500123Z" } }
            ] }
        }"#;
        let results: sparql_client::SparqlResults = serde_json::from_str(body).unwrap();
        let watermark = results.bindings()[0].datetime("created").unwrap();
        let upper = Utc.with_ymd_and_hms(2024, 4, 12, 0, 0, 0).unwrap();

        let q = page_query(watermark, upper, 100);

        assert!(q.contains("FILTER (?created > \"2020-03-04T10:11:12.500123Z\""));
    }

    #[test]
    fn lookups_escape_the_physical_uri() {
        let q = piece_uri_query("share://a>b.pdf");
        assert!(q.contains("<share://a\\>b.pdf> nie:dataSource ?virtualFile"));

        let q = piece_url_query("share://a.pdf", "https://example.org/document/");
        assert!(q.contains(r#"CONCAT("""https://example.org/document/""", STR(?id))"#));
    }

    #[test]
    fn reinsert_targets_the_piece() {
        let u = reinsert_piece_update("http://example.org/piece/1");
        assert!(u.contains("<http://example.org/piece/1> a dossier:Stuk ."));
        assert!(u.starts_with("PREFIX dossier:"));
    }
}
