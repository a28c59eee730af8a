use crate::error::Result;
use crate::graph::PieceDirectory;
use crate::types::Identifier;

/// `physical_uri,url` rows for the given identifiers. A lookup error aborts the export.
pub async fn signed_csv(directory: &dyn PieceDirectory, identifiers: &[Identifier]) -> Result<String> {
    let mut out = String::from("physical_uri,url\n");
    for physical_uri in identifiers {
        let url = directory.piece_url(physical_uri).await?.unwrap_or_default();
        out.push_str(&csv_field(physical_uri));
        out.push(',');
        out.push_str(&csv_field(&url));
        out.push('\n');
    }
    Ok(out)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
