//! Markup to record extraction.
//!
//! Uses the `scraper` crate for HTML parsing with CSS selectors. Each element
//! matched by the configured container selector becomes one
//! [`ScrapedRecord`]; every field is looked up relative to that container.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ParseError, Result};
use crate::types::{
    config::{Configuration, FieldSpec, MULTI_VALUE_SEPARATOR},
    document::RawDocument,
    record::ScrapedRecord,
};

/// Characters stripped from both ends of extracted text.
const TRIM_CHARS: [char; 5] = ['\t', '\n', '\u{a0}', '|', ' '];

/// Attributes holding URLs that are resolved against the base URL.
const LINK_ATTRIBUTES: [&str; 2] = ["href", "src"];

struct CompiledField {
    spec: FieldSpec,
    selector: Option<Selector>,
}

/// Record extractor with pre-compiled selectors.
///
/// Build once per [`Configuration`] and reuse across cycles.
pub struct Scraper {
    container: Selector,
    fields: Vec<CompiledField>,
    base_url: Option<Url>,
}

impl Scraper {
    pub fn new(config: &Configuration) -> std::result::Result<Self, ConfigError> {
        let container = compile(config.container())?;

        let fields = config
            .fields()
            .iter()
            .map(|field| {
                let selector = if field.selector.trim().is_empty() {
                    None
                } else {
                    Some(compile(&field.selector)?)
                };
                Ok(CompiledField {
                    spec: field.clone(),
                    selector,
                })
            })
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        let base_url = config
            .base_url()
            .map(|base| {
                Url::parse(base).map_err(|source| ConfigError::InvalidUrl {
                    url: base.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            container,
            fields,
            base_url,
        })
    }

    /// Extract one record per container, in document order.
    ///
    /// Fails only when the input is not markup at all; a document with no
    /// matching containers yields an empty list.
    pub fn scrape(
        &self,
        document: &RawDocument,
    ) -> std::result::Result<Vec<ScrapedRecord>, ParseError> {
        let content = document.content.trim();
        if content.is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        if !content.contains('<') {
            return Err(ParseError::NoMarkup);
        }

        let html = Html::parse_document(content);

        let records: Vec<ScrapedRecord> = html
            .select(&self.container)
            .enumerate()
            .map(|(position, container)| self.extract_record(position, container))
            .collect();

        debug!(
            url = %document.url,
            records = records.len(),
            "Scraped document"
        );

        Ok(records)
    }

    fn extract_record(&self, position: usize, container: ElementRef<'_>) -> ScrapedRecord {
        let mut record = ScrapedRecord::new(position);

        for field in &self.fields {
            let elements: Vec<ElementRef<'_>> = match &field.selector {
                Some(selector) if field.spec.all => container.select(selector).collect(),
                Some(selector) => container.select(selector).take(1).collect(),
                None => vec![container],
            };

            let values: Vec<String> = elements
                .into_iter()
                .filter_map(|element| self.extract_value(&field.spec, element))
                .collect();

            // Absent, not empty, when nothing matched
            if !values.is_empty() {
                record
                    .fields
                    .insert(field.spec.name.clone(), values.join(MULTI_VALUE_SEPARATOR));
            }
        }

        record
    }

    fn extract_value(&self, field: &FieldSpec, element: ElementRef<'_>) -> Option<String> {
        let value = match &field.attribute {
            Some(attribute) => {
                self.resolve_attribute(attribute, element.value().attr(attribute)?)
            }
            None => clean_text(element),
        };

        Some(field.strip_label(&value).to_string())
    }

    fn resolve_attribute(&self, attribute: &str, raw: &str) -> String {
        let raw = raw.trim();
        match &self.base_url {
            Some(base) if LINK_ATTRIBUTES.contains(&attribute) => base
                .join(raw)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            _ => raw.to_string(),
        }
    }
}

/// Scrape a document with a one-off [`Scraper`].
pub fn scrape(document: &RawDocument, config: &Configuration) -> Result<Vec<ScrapedRecord>> {
    let scraper = Scraper::new(config)?;
    Ok(scraper.scrape(document)?)
}

fn compile(selector: &str) -> std::result::Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .trim()
        .trim_matches(TRIM_CHARS)
        .to_string()
}
