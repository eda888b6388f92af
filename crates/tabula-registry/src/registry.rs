use serde::{Deserialize, Serialize};

use tabula_model::DataValue;

/// Descriptor of one permitted CSS class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSpec {
    pub name: String,
    /// Free-form grouping for UI palettes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// At most one class per exclusive group may appear on a cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClassSpec {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            group: None,
            exclusive_group: None,
            label: None,
            description: None,
        }
    }

    fn exclusive(name: &str, group: &str, label: &str) -> Self {
        Self {
            exclusive_group: Some(group.to_string()),
            label: Some(label.to_string()),
            ..Self::new(name)
        }
    }

    fn grouped(name: &str, group: &str, label: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            label: Some(label.to_string()),
            ..Self::new(name)
        }
    }
}

/// Declared type of a `data-*` attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    Enum,
    Number,
    Boolean,
}

/// Descriptor of one permitted `data-*` attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrSpec {
    /// Full attribute name (`data-…`).
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttrType,
    /// Permitted values for `enum` attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Inclusive bounds for `number` attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the UI offers this attribute as a one-click toggle.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quick_toggle: bool,
}

impl AttrSpec {
    /// Validate a value against the declared type (and bounds/values).
    pub fn accepts(&self, value: &DataValue) -> bool {
        match self.kind {
            AttrType::Enum => match value {
                DataValue::String(s) => self.values.iter().any(|v| v == s),
                _ => false,
            },
            AttrType::Number => match value {
                DataValue::Number(n) => {
                    self.min.map_or(true, |min| *n >= min) && self.max.map_or(true, |max| *n <= max)
                }
                _ => false,
            },
            AttrType::Boolean => matches!(value, DataValue::Bool(_)),
        }
    }
}

/// How imports treat values outside the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    Strict,
}

/// Composition rules of the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRules {
    pub import_policy: ImportPolicy,
    pub class_exclusivity: bool,
}

impl Default for RegistryRules {
    fn default() -> Self {
        Self {
            import_policy: ImportPolicy::Strict,
            class_exclusivity: true,
        }
    }
}

/// The permitted classes and `data-*` attributes of a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRegistry {
    pub version: u32,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default)]
    pub data_attributes: Vec<AttrSpec>,
    #[serde(default)]
    pub rules: RegistryRules,
}

impl StyleRegistry {
    /// The built-in core descriptor every project starts from.
    pub fn core() -> Self {
        Self {
            version: 1,
            classes: vec![
                ClassSpec::exclusive("hl-yellow", "highlight", "Жёлтая заливка"),
                ClassSpec::exclusive("hl-green", "highlight", "Зелёная заливка"),
                ClassSpec::exclusive("hl-red", "highlight", "Красная заливка"),
                ClassSpec::exclusive("align-left", "align", "По левому краю"),
                ClassSpec::exclusive("align-center", "align", "По центру"),
                ClassSpec::exclusive("align-right", "align", "По правому краю"),
                ClassSpec::grouped("txt-bold", "text", "Полужирный"),
                ClassSpec::grouped("txt-italic", "text", "Курсив"),
                ClassSpec::grouped("txt-strike", "text", "Зачёркнутый"),
            ],
            data_attributes: vec![
                AttrSpec {
                    name: "data-status".to_string(),
                    kind: AttrType::Enum,
                    values: vec![
                        "draft".to_string(),
                        "review".to_string(),
                        "final".to_string(),
                    ],
                    min: None,
                    max: None,
                    default_value: Some(DataValue::String("draft".to_string())),
                    label: Some("Статус".to_string()),
                    description: None,
                    quick_toggle: false,
                },
                AttrSpec {
                    name: "data-priority".to_string(),
                    kind: AttrType::Number,
                    values: Vec::new(),
                    min: Some(0.0),
                    max: Some(10.0),
                    default_value: None,
                    label: Some("Приоритет".to_string()),
                    description: None,
                    quick_toggle: false,
                },
                AttrSpec {
                    name: "data-locked".to_string(),
                    kind: AttrType::Boolean,
                    values: Vec::new(),
                    min: None,
                    max: None,
                    default_value: Some(DataValue::Bool(false)),
                    label: Some("Защищена от изменений".to_string()),
                    description: None,
                    quick_toggle: true,
                },
            ],
            rules: RegistryRules::default(),
        }
    }

    /// Union of `core` and `project` by name; project entries override core
    /// ones, new project entries are appended in their own order. Rules are
    /// shallow-merged with the project winning.
    pub fn merged(core: &Self, project: &Self) -> Self {
        let mut classes = core.classes.clone();
        for spec in &project.classes {
            match classes.iter_mut().find(|existing| existing.name == spec.name) {
                Some(existing) => *existing = spec.clone(),
                None => classes.push(spec.clone()),
            }
        }
        let mut data_attributes = core.data_attributes.clone();
        for spec in &project.data_attributes {
            match data_attributes
                .iter_mut()
                .find(|existing| existing.name == spec.name)
            {
                Some(existing) => *existing = spec.clone(),
                None => data_attributes.push(spec.clone()),
            }
        }
        Self {
            version: core.version.max(project.version),
            classes,
            data_attributes,
            rules: project.rules,
        }
    }

    /// Look up a class descriptor by name.
    pub fn class(&self, name: &str) -> Option<&ClassSpec> {
        self.classes.iter().find(|spec| spec.name == name)
    }

    /// Look up a `data-*` attribute descriptor by name.
    pub fn attribute(&self, name: &str) -> Option<&AttrSpec> {
        self.data_attributes.iter().find(|spec| spec.name == name)
    }

    /// Normalize a class list against the registry:
    /// unknown names are dropped; within each exclusive group only the last
    /// occurrence survives; non-exclusive entries keep their relative order
    /// and exclusive survivors are appended after them.
    pub fn normalize_classes(&self, input: &[String]) -> Vec<String> {
        let mut plain: Vec<String> = Vec::new();
        // (group, surviving name), in first-seen group order.
        let mut exclusive: Vec<(String, String)> = Vec::new();

        for name in input {
            let Some(spec) = self.class(name) else {
                continue;
            };
            match &spec.exclusive_group {
                Some(group) => {
                    match exclusive.iter_mut().find(|(g, _)| g == group) {
                        Some(slot) => slot.1 = name.clone(),
                        None => exclusive.push((group.clone(), name.clone())),
                    }
                }
                None => {
                    if !plain.contains(name) {
                        plain.push(name.clone());
                    }
                }
            }
        }

        plain.extend(exclusive.into_iter().map(|(_, name)| name));
        plain
    }
}
