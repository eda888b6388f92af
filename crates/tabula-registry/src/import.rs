use core::fmt;

use tabula_model::TableDocument;

use crate::DocumentValidator;

/// Strict-import failure: every finding, ready for display.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportError {
    pub errors: Vec<String>,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.errors.join("; "))
    }
}

impl std::error::Error for ImportError {}

/// Parse and strictly validate a document from raw JSON.
///
/// Any validation finding is an error; the failure carries the concatenated
/// human-readable list. A syntactically broken payload produces a single
/// finding.
pub fn parse_table_json(
    raw: &str,
    validator: &DocumentValidator,
) -> Result<TableDocument, ImportError> {
    let doc: TableDocument = serde_json::from_str(raw).map_err(|e| ImportError {
        errors: vec![format!("некорректный JSON: {e}")],
    })?;

    let findings = validator.validate(&doc);
    if !findings.is_empty() {
        return Err(ImportError {
            errors: findings.iter().map(ToString::to_string).collect(),
        });
    }
    Ok(doc)
}
