//! Rule-driven record and link extraction
//!
//! This module turns a fetched HTML document into:
//! - Records, one per item block (or one per page without an item selector)
//! - Follow-up links from link rules, resolved to absolute URLs
//!
//! Selector expressions are CSS selectors with an optional suffix:
//! - `::text` reads the matched element's own text nodes
//! - `::attr(name)` reads an attribute
//! - no suffix reads the element's full text, trimmed (link rules read `href`)

use crate::config::{Multiplicity, RuleConfig, RuleSetConfig};
use crate::output::{FieldValue, Record};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while turning a body into a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("document is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Where a rule reads its values from
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueSource {
    /// Full descendant text, trimmed
    Text,
    /// Direct child text nodes
    OwnText,
    /// Attribute value
    Attr(String),
}

/// A rule with its selector compiled
#[derive(Debug)]
struct CompiledRule {
    name: String,
    /// None selects the scope element itself (e.g. a bare `::text`)
    selector: Option<Selector>,
    source: ValueSource,
    multiplicity: Multiplicity,
}

/// The output of extracting one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Records in document order
    pub records: Vec<Record>,

    /// Absolute follow-up URLs in document order, duplicates removed
    pub links: Vec<Url>,
}

/// Applies a compiled rule set to documents
///
/// Construction compiles every selector, so a bad rule set fails before any
/// page is fetched. The extractor holds no mutable state and is shared by all
/// workers.
#[derive(Debug)]
pub struct Extractor {
    item: Option<Selector>,
    fields: Vec<CompiledRule>,
    links: Vec<CompiledRule>,
}

impl Extractor {
    /// Compiles a rule set
    ///
    /// # Returns
    ///
    /// * `Ok(Extractor)` - Every selector compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector failed to parse
    pub fn new(rules: &RuleSetConfig) -> Result<Self, ConfigError> {
        if rules.rules.is_empty() {
            return Err(ConfigError::Validation(
                "rule set must contain at least one rule".to_string(),
            ));
        }

        let item = match &rules.item {
            Some(css) => Some(compile_css("item", css)?),
            None => None,
        };

        let mut fields = Vec::new();
        let mut links = Vec::new();
        for rule in &rules.rules {
            let compiled = compile_rule(rule)?;
            if rule.is_link {
                links.push(compiled);
            } else {
                fields.push(compiled);
            }
        }

        Ok(Self {
            item,
            fields,
            links,
        })
    }

    /// Decodes and parses a body, then extracts from it
    ///
    /// # Arguments
    ///
    /// * `body` - Raw response bytes
    /// * `base_url` - The page's final URL, used for link resolution and as record source
    pub fn extract_body(&self, body: &[u8], base_url: &Url) -> Result<Extraction, ExtractError> {
        let html = std::str::from_utf8(body).map_err(|e| ExtractError::Encoding(e.to_string()))?;
        let html = html.strip_prefix('\u{feff}').unwrap_or(html);
        let document = Html::parse_document(html);
        Ok(self.extract(&document, base_url))
    }

    /// Extracts records and links from a parsed document
    ///
    /// Missing matches never fail: a `single` field becomes null and an `all`
    /// field becomes an empty list.
    pub fn extract(&self, document: &Html, base_url: &Url) -> Extraction {
        let root = document.root_element();

        let records = if self.fields.is_empty() {
            Vec::new()
        } else {
            match &self.item {
                Some(item) => document
                    .select(item)
                    .map(|scope| self.build_record(scope, base_url))
                    .collect(),
                None => vec![self.build_record(root, base_url)],
            }
        };

        let mut links: Vec<Url> = Vec::new();
        for rule in &self.links {
            for href in limit(rule.multiplicity, evaluate(rule, root)) {
                if let Some(url) = resolve_link(&href, base_url) {
                    if !links.contains(&url) {
                        links.push(url);
                    }
                }
            }
        }

        Extraction { records, links }
    }

    fn build_record(&self, scope: ElementRef<'_>, base_url: &Url) -> Record {
        let mut record = Record::new(base_url.as_str());
        for rule in &self.fields {
            let values = evaluate(rule, scope);
            let value = match rule.multiplicity {
                Multiplicity::Single => FieldValue::Single(values.into_iter().next()),
                Multiplicity::All => FieldValue::Many(values),
            };
            record.push(&rule.name, value);
        }
        record
    }
}

/// Truncates to the first value for `single` rules
fn limit(multiplicity: Multiplicity, mut values: Vec<String>) -> Vec<String> {
    if multiplicity == Multiplicity::Single {
        values.truncate(1);
    }
    values
}

/// Collects every value a rule yields within `scope`, in document order
fn evaluate(rule: &CompiledRule, scope: ElementRef<'_>) -> Vec<String> {
    match &rule.selector {
        Some(selector) => scope
            .select(selector)
            .flat_map(|element| element_values(element, &rule.source))
            .collect(),
        None => element_values(scope, &rule.source),
    }
}

fn element_values(element: ElementRef<'_>, source: &ValueSource) -> Vec<String> {
    match source {
        ValueSource::Text => vec![element.text().collect::<String>().trim().to_string()],
        ValueSource::OwnText => element
            .children()
            .filter_map(|child| child.value().as_text())
            .map(|text| text.text.to_string())
            .filter(|text| !text.trim().is_empty())
            .collect(),
        ValueSource::Attr(name) => element
            .value()
            .attr(name)
            .map(|v| vec![v.to_string()])
            .unwrap_or_default(),
    }
}

fn compile_rule(rule: &RuleConfig) -> Result<CompiledRule, ConfigError> {
    let (css, source) = split_pseudo_element(&rule.name, &rule.selector)?;
    let source = match source {
        Some(source) => source,
        None if rule.is_link => ValueSource::Attr("href".to_string()),
        None => ValueSource::Text,
    };

    let selector = if css.trim().is_empty() {
        None
    } else {
        Some(compile_css(&rule.name, css)?)
    };

    Ok(CompiledRule {
        name: rule.name.clone(),
        selector,
        source,
        multiplicity: rule.multiplicity,
    })
}

fn compile_css(rule: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css.trim()).map_err(|e| ConfigError::InvalidSelector {
        rule: rule.to_string(),
        message: format!("'{}': {:?}", css, e),
    })
}

/// Splits `css::text` / `css::attr(name)` into the CSS part and value source
fn split_pseudo_element<'a>(
    rule: &str,
    expression: &'a str,
) -> Result<(&'a str, Option<ValueSource>), ConfigError> {
    let expression = expression.trim();

    if let Some(css) = expression.strip_suffix("::text") {
        return Ok((css, Some(ValueSource::OwnText)));
    }

    if expression.ends_with(')') {
        if let Some(idx) = expression.rfind("::attr(") {
            let name = expression[idx + "::attr(".len()..expression.len() - 1].trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidSelector {
                    rule: rule.to_string(),
                    message: format!("'{}': empty attribute name", expression),
                });
            }
            return Ok((&expression[..idx], Some(ValueSource::Attr(name.to_string()))));
        }
    }

    Ok((expression, None))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}
