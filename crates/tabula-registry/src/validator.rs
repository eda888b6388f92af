use thiserror::Error;

use tabula_model::{CellRect, TableDocument, SCHEMA_VERSION};

use crate::StyleRegistry;

/// A single validation finding.
///
/// Messages are user-facing (the product UI is Russian); developer-facing
/// errors live in `tabula-model`.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("неподдерживаемая версия документа: {found} (ожидается {SCHEMA_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("сетка должна содержать хотя бы одну строку и один столбец")]
    EmptyGrid,
    #[error("число строк заголовка ({header_rows}) превышает высоту таблицы ({rows})")]
    HeaderRowsOutOfRange { header_rows: u32, rows: u32 },
    #[error("длина columnSizes ({len}) не совпадает с числом столбцов ({cols})")]
    ColumnSizesMismatch { len: usize, cols: u32 },
    #[error("недопустимое объединение в ячейке ({r}, {c}): нулевой размер")]
    ZeroSpan { r: u32, c: u32 },
    #[error("ячейка ({r}, {c}) выходит за пределы сетки")]
    CellOutOfBounds { r: u32, c: u32 },
    #[error("объединение в ячейке ({r}, {c}) выходит за пределы сетки")]
    SpanOutOfBounds { r: u32, c: u32 },
    #[error("повторная ячейка ({r}, {c})")]
    DuplicateCell { r: u32, c: u32 },
    #[error("объединения {a} и {b} пересекаются")]
    OverlappingCells { a: CellRect, b: CellRect },
    #[error("неизвестный класс '{class}' в ячейке ({r}, {c})")]
    UnknownClass { r: u32, c: u32, class: String },
    #[error("конфликт классов '{first}' и '{second}' (группа '{group}') в ячейке ({r}, {c})")]
    ExclusiveConflict {
        r: u32,
        c: u32,
        group: String,
        first: String,
        second: String,
    },
    #[error("неизвестный атрибут '{name}' в ячейке ({r}, {c})")]
    UnknownAttribute { r: u32, c: u32, name: String },
    #[error("недопустимое значение '{value}' атрибута '{name}' в ячейке ({r}, {c})")]
    InvalidAttributeValue {
        r: u32,
        c: u32,
        name: String,
        value: String,
    },
}

/// Validates whole documents: shape, merge geometry, and registry rules
/// (strict: unknown names and bad values are errors, not warnings).
pub struct DocumentValidator {
    registry: StyleRegistry,
}

impl DocumentValidator {
    pub fn new(registry: StyleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    /// Collect every finding; an empty list means the document is valid.
    pub fn validate(&self, doc: &TableDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.check_shape(doc, &mut errors);
        self.check_geometry(doc, &mut errors);
        self.check_registry(doc, &mut errors);
        errors
    }

    fn check_shape(&self, doc: &TableDocument, errors: &mut Vec<ValidationError>) {
        if doc.version != SCHEMA_VERSION {
            errors.push(ValidationError::UnsupportedVersion { found: doc.version });
        }
        let rows = doc.grid.rows;
        let cols = doc.grid.cols;
        if rows == 0 || cols == 0 {
            errors.push(ValidationError::EmptyGrid);
            return;
        }
        if doc.grid.header_rows > rows {
            errors.push(ValidationError::HeaderRowsOutOfRange {
                header_rows: doc.grid.header_rows,
                rows,
            });
        }
        if let Some(sizes) = &doc.grid.column_sizes {
            if sizes.len() != cols as usize {
                errors.push(ValidationError::ColumnSizesMismatch {
                    len: sizes.len(),
                    cols,
                });
            }
        }
        for cell in &doc.cells {
            if cell.row_span == 0 || cell.col_span == 0 {
                errors.push(ValidationError::ZeroSpan { r: cell.r, c: cell.c });
                continue;
            }
            if cell.r >= rows || cell.c >= cols {
                errors.push(ValidationError::CellOutOfBounds { r: cell.r, c: cell.c });
            } else if cell.r + cell.row_span > rows || cell.c + cell.col_span > cols {
                errors.push(ValidationError::SpanOutOfBounds { r: cell.r, c: cell.c });
            }
        }
    }

    fn check_geometry(&self, doc: &TableDocument, errors: &mut Vec<ValidationError>) {
        let mut seen = std::collections::HashSet::new();
        for cell in &doc.cells {
            if !seen.insert((cell.r, cell.c)) {
                errors.push(ValidationError::DuplicateCell { r: cell.r, c: cell.c });
            }
        }
        for (i, a) in doc.cells.iter().enumerate() {
            if a.row_span == 0 || a.col_span == 0 {
                continue;
            }
            for b in &doc.cells[i + 1..] {
                if b.row_span == 0 || b.col_span == 0 {
                    continue;
                }
                if (a.r, a.c) != (b.r, b.c) && a.rect().intersects(&b.rect()) {
                    errors.push(ValidationError::OverlappingCells {
                        a: a.rect(),
                        b: b.rect(),
                    });
                }
            }
        }
    }

    fn check_registry(&self, doc: &TableDocument, errors: &mut Vec<ValidationError>) {
        for cell in &doc.cells {
            // (exclusive group, first class seen in it)
            let mut groups: Vec<(&str, &str)> = Vec::new();
            for class in &cell.classes {
                let Some(spec) = self.registry.class(class) else {
                    errors.push(ValidationError::UnknownClass {
                        r: cell.r,
                        c: cell.c,
                        class: class.clone(),
                    });
                    continue;
                };
                if !self.registry.rules.class_exclusivity {
                    continue;
                }
                if let Some(group) = spec.exclusive_group.as_deref() {
                    match groups.iter().find(|(g, _)| *g == group) {
                        Some((_, first)) => errors.push(ValidationError::ExclusiveConflict {
                            r: cell.r,
                            c: cell.c,
                            group: group.to_string(),
                            first: (*first).to_string(),
                            second: class.clone(),
                        }),
                        None => groups.push((group, class.as_str())),
                    }
                }
            }

            for (name, value) in &cell.data {
                let Some(spec) = self.registry.attribute(name) else {
                    errors.push(ValidationError::UnknownAttribute {
                        r: cell.r,
                        c: cell.c,
                        name: name.clone(),
                    });
                    continue;
                };
                if !spec.accepts(value) {
                    errors.push(ValidationError::InvalidAttributeValue {
                        r: cell.r,
                        c: cell.c,
                        name: name.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }
    }
}
