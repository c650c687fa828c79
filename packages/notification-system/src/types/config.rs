//! Extraction and comparison policy.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use url::Url;

use crate::error::ConfigError;

/// Version of the [`default_config`] field set.
///
/// Bump whenever the default selectors or identity field change, since
/// snapshots scraped with an older set are not comparable field-for-field.
pub const DEFAULT_CONFIG_VERSION: u32 = 2;

/// Separator between values of a field that reads every match.
pub const MULTI_VALUE_SEPARATOR: &str = " | ";

/// One field to extract from each record container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the scraped record
    pub name: String,

    /// CSS selector relative to the container; empty selects the container itself
    pub selector: String,

    /// Attribute to read instead of the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Read every matching element instead of the first, joined with
    /// [`MULTI_VALUE_SEPARATOR`]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,

    /// Leading label removed from the value (case-insensitive), together
    /// with any `:` and spaces after it, e.g. `Date` in `Date: 12.03.2024`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldSpec {
    /// Extract the text of the first element matching `selector`.
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            attribute: None,
            all: false,
            label: None,
        }
    }

    /// Extract `attribute` of the first element matching `selector`.
    pub fn attribute(
        name: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            attribute: Some(attribute.into()),
            all: false,
            label: None,
        }
    }

    /// Read every match instead of only the first.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Strip the configured label from the start of `value`.
    pub fn strip_label<'a>(&self, value: &'a str) -> &'a str {
        let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) else {
            return value;
        };

        match value.get(..label.len()) {
            Some(head) if head.eq_ignore_ascii_case(label) => {
                value[label.len()..].trim_start_matches([':', ' '])
            }
            _ => value,
        }
    }
}

/// Which change kinds are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub added: bool,
    pub removed: bool,
    pub modified: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            added: true,
            removed: true,
            modified: true,
        }
    }
}

/// Immutable, validated extraction and comparison policy.
///
/// Construct with [`Configuration::new`] or [`Configuration::builder`];
/// deserialization runs the same validation, so every value of this type
/// satisfies:
///
/// - `fields` is non-empty and field names are unique
/// - `identity_field` names one of `fields`
/// - every selector parses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigurationBuilder", into = "ConfigurationBuilder")]
pub struct Configuration {
    version: u32,
    container: String,
    fields: Vec<FieldSpec>,
    identity_field: String,
    ignore_whitespace: bool,
    ignore_attributes: BTreeSet<String>,
    base_url: Option<String>,
    report: ReportFilter,
}

impl Configuration {
    /// Create a configuration with default comparison settings
    /// (`ignore_whitespace = true`, nothing ignored, everything reported).
    pub fn new(
        container: impl Into<String>,
        fields: Vec<FieldSpec>,
        identity_field: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::builder(container)
            .fields(fields)
            .identity_field(identity_field)
            .build()
    }

    pub fn builder(container: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(container)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn ignore_whitespace(&self) -> bool {
        self.ignore_whitespace
    }

    pub fn ignore_attributes(&self) -> &BTreeSet<String> {
        &self.ignore_attributes
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn report(&self) -> ReportFilter {
        self.report
    }

    /// Whether `field` takes part in record comparison.
    pub fn is_compared(&self, field: &FieldSpec) -> bool {
        field
            .attribute
            .as_ref()
            .map_or(true, |attr| !self.ignore_attributes.contains(attr))
    }

    /// Normalize a value for comparison or identity matching.
    pub fn normalize<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if self.ignore_whitespace {
            std::borrow::Cow::Owned(value.split_whitespace().collect::<Vec<_>>().join(" "))
        } else {
            std::borrow::Cow::Borrowed(value)
        }
    }
}

/// Unvalidated configuration; also the JSON wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationBuilder {
    #[serde(default = "default_version")]
    pub version: u32,
    pub container: String,
    pub fields: Vec<FieldSpec>,
    pub identity_field: String,
    #[serde(default = "default_true")]
    pub ignore_whitespace: bool,
    #[serde(default)]
    pub ignore_attributes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub report: ReportFilter,
}

fn default_version() -> u32 {
    DEFAULT_CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

impl ConfigurationBuilder {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION,
            container: container.into(),
            fields: Vec::new(),
            identity_field: String::new(),
            ignore_whitespace: true,
            ignore_attributes: BTreeSet::new(),
            base_url: None,
            report: ReportFilter::default(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn identity_field(mut self, name: impl Into<String>) -> Self {
        self.identity_field = name.into();
        self
    }

    pub fn ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }

    pub fn ignore_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.ignore_attributes.insert(attribute.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn report(mut self, report: ReportFilter) -> Self {
        self.report = report;
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }

        let mut names = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField(field.name.clone()));
            }
            if !field.selector.trim().is_empty() {
                check_selector(&field.selector)?;
            }
        }

        if !names.contains(self.identity_field.as_str()) {
            return Err(ConfigError::UnknownIdentityField(self.identity_field));
        }

        check_selector(&self.container)?;

        if let Some(base) = &self.base_url {
            Url::parse(base).map_err(|source| ConfigError::InvalidUrl {
                url: base.clone(),
                source,
            })?;
        }

        Ok(Configuration {
            version: self.version,
            container: self.container,
            fields: self.fields,
            identity_field: self.identity_field,
            ignore_whitespace: self.ignore_whitespace,
            ignore_attributes: self.ignore_attributes,
            base_url: self.base_url,
            report: self.report,
        })
    }
}

impl TryFrom<ConfigurationBuilder> for Configuration {
    type Error = ConfigError;

    fn try_from(builder: ConfigurationBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl From<Configuration> for ConfigurationBuilder {
    fn from(config: Configuration) -> Self {
        Self {
            version: config.version,
            container: config.container,
            fields: config.fields,
            identity_field: config.identity_field,
            ignore_whitespace: config.ignore_whitespace,
            ignore_attributes: config.ignore_attributes,
            base_url: config.base_url,
            report: config.report,
        }
    }
}

fn check_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}

/// Baseline configuration for the DTU notice board.
///
/// One record per notice in the "latest" list of every tab; notices are
/// keyed by title. Anchors after the first one in a notice heading
/// (annexures, corrigenda) are read as attachments.
pub fn default_config() -> Configuration {
    Configuration {
        version: DEFAULT_CONFIG_VERSION,
        container: ".tab_content .latest_tab li".to_string(),
        fields: vec![
            FieldSpec::text("title", "h6 > a"),
            FieldSpec::attribute("link", "h6 > a", "href"),
            FieldSpec::text("attachment_titles", "h6 > a ~ a").all(),
            FieldSpec::attribute("attachments", "h6 > a ~ a", "href").all(),
            FieldSpec::text("date", "small").with_label("Date"),
        ],
        identity_field: "title".to_string(),
        ignore_whitespace: true,
        ignore_attributes: BTreeSet::new(),
        base_url: Some("https://dtu.ac.in".to_string()),
        report: ReportFilter::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::attribute("link", "a", "href"),
            FieldSpec::text("title", "a"),
        ]
    }

    #[test]
    fn test_default_config_is_valid_and_stable() {
        let config = default_config();
        assert!(!config.fields().is_empty());
        assert!(config
            .fields()
            .iter()
            .any(|f| f.name == config.identity_field()));
        assert!(config.ignore_whitespace());
        assert!(config.ignore_attributes().is_empty());
        assert_eq!(config, default_config());

        // The hand-built default must pass the same validation as everything else
        let rebuilt = ConfigurationBuilder::from(config.clone()).build().unwrap();
        assert_eq!(rebuilt, config);
    }

    #[test]
    fn test_rejects_empty_fields() {
        let err = Configuration::new("li", vec![], "link").unwrap_err();
        assert!(matches!(err, ConfigError::NoFields));
    }

    #[test]
    fn test_rejects_unknown_identity() {
        let err = Configuration::new("li", fields(), "id").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownIdentityField(name) if name == "id"));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let err = Configuration::new(
            "li",
            vec![FieldSpec::text("title", "a"), FieldSpec::text("title", "b")],
            "title",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField(_)));
    }

    #[test]
    fn test_rejects_bad_selector() {
        let err = Configuration::new("li", vec![FieldSpec::text("title", "a[")], "title")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));

        let err = Configuration::new("", fields(), "link").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let err = Configuration::builder("li")
            .fields(fields())
            .identity_field("link")
            .base_url("/relative")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_json_wire_format() {
        let config = Configuration::from_json(
            r#"{
                "container": "li",
                "fields": [
                    {"name": "link", "selector": "a", "attribute": "href"},
                    {"name": "title", "selector": "a"}
                ],
                "identityField": "link",
                "ignoreWhitespace": false,
                "ignoreAttributes": ["href"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.identity_field(), "link");
        assert!(!config.ignore_whitespace());
        assert!(!config.is_compared(&config.fields()[0]));
        assert!(config.is_compared(&config.fields()[1]));
        assert_eq!(config.report(), ReportFilter::default());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["identityField"], "link");
        assert_eq!(json["ignoreAttributes"][0], "href");
    }

    #[test]
    fn test_json_validation_runs_on_deserialize() {
        let result = Configuration::from_json(
            r#"{"container": "li", "fields": [], "identityField": "link"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_label() {
        let date = FieldSpec::text("date", "small").with_label("Date");
        assert_eq!(date.strip_label("Date: 12.03.2024"), "12.03.2024");
        assert_eq!(date.strip_label("date :12.03.2024"), "12.03.2024");
        assert_eq!(date.strip_label("12.03.2024"), "12.03.2024");
        assert_eq!(date.strip_label("Da"), "Da");

        let plain = FieldSpec::text("date", "small");
        assert_eq!(plain.strip_label("Date: 12.03.2024"), "Date: 12.03.2024");
    }

    #[test]
    fn test_field_options_on_the_wire() {
        let config = Configuration::from_json(
            r#"{
                "container": "li",
                "fields": [
                    {"name": "title", "selector": "a"},
                    {"name": "files", "selector": "a ~ a", "attribute": "href", "all": true},
                    {"name": "date", "selector": "small", "label": "Date"}
                ],
                "identityField": "title"
            }"#,
        )
        .unwrap();

        assert!(!config.fields()[0].all);
        assert!(config.fields()[1].all);
        assert_eq!(config.fields()[2].label.as_deref(), Some("Date"));

        let json = serde_json::to_value(&config).unwrap();
        assert!(json["fields"][0].get("all").is_none());
        assert_eq!(json["fields"][1]["all"], true);
    }

    #[test]
    fn test_normalize() {
        let config = Configuration::new("li", fields(), "link").unwrap();
        assert_eq!(config.normalize("  a \n\t b\u{a0}"), "a b");

        let strict = Configuration::builder("li")
            .fields(fields())
            .identity_field("link")
            .ignore_whitespace(false)
            .build()
            .unwrap();
        assert_eq!(strict.normalize(" a  b "), " a  b ");
    }
}
