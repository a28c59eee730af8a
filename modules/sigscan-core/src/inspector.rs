use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Result, SigscanError};

/// Bounds walks over malformed or hostile field trees.
const MAX_FIELD_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspection {
    pub has_signature_field: bool,
}

/// Decides whether a document carries a signature field.
pub trait DocumentInspector: Send + Sync {
    /// Fails on input that cannot be parsed as a document.
    fn inspect(&self, bytes: &[u8]) -> Result<Inspection>;
}

/// Reads the AcroForm field tree of a PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfInspector;

impl DocumentInspector for PdfInspector {
    fn inspect(&self, bytes: &[u8]) -> Result<Inspection> {
        let doc = Document::load_mem(bytes)?;
        let catalog = doc.catalog()?;

        let Some(acro_form) = lookup(&doc, catalog, b"AcroForm")?.and_then(as_dict) else {
            return Ok(Inspection {
                has_signature_field: false,
            });
        };
        let fields: &[Object] = match lookup(&doc, acro_form, b"Fields")? {
            Some(Object::Array(fields)) => fields,
            _ => &[],
        };

        let mut visited = HashSet::new();
        let mut has_signature_field = false;
        for field in fields {
            if contains_signature(&doc, field, None, 0, &mut visited)? {
                has_signature_field = true;
                break;
            }
        }
        Ok(Inspection {
            has_signature_field,
        })
    }
}

/// Field type is inheritable, so a widget kid of a `/Sig` parent counts too.
fn contains_signature(
    doc: &Document,
    node: &Object,
    inherited_type: Option<&[u8]>,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
) -> Result<bool> {
    if depth > MAX_FIELD_DEPTH {
        return Err(SigscanError::Pdf("form field tree too deep".to_string()));
    }
    if let Object::Reference(id) = node {
        if !visited.insert(*id) {
            return Ok(false);
        }
    }
    let Some(dict) = as_dict(resolve(doc, node)?) else {
        return Ok(false);
    };

    let field_type = match lookup(doc, dict, b"FT")? {
        Some(Object::Name(name)) => Some(name.as_slice()),
        _ => inherited_type,
    };
    if field_type == Some(b"Sig".as_slice()) {
        return Ok(true);
    }

    if let Some(Object::Array(kids)) = lookup(doc, dict, b"Kids")? {
        for kid in kids {
            if contains_signature(doc, kid, field_type, depth + 1, visited)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn lookup<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Result<Option<&'a Object>> {
    match dict.get(key) {
        Ok(object) => Ok(Some(resolve(doc, object)?)),
        Err(_) => Ok(None),
    }
}

fn as_dict(object: &Object) -> Option<&Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}
