// Model output → NormalizedResult: strict JSON first, label-anchored regex heuristics otherwise
use crate::model::{DEFAULT_RATING, NOT_AVAILABLE, NormalizedResult, PriceQuote};
use crate::utils::strip_bullet;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

const PRODUCT_NAME_KEYS: &[&str] = &["Product name", "Product_name"];

static RATING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)rating[:\s]*(\d+\.?\d*)/5",
        r"(\d+\.?\d*)/5",
        r"(?i)(\d+\.?\d*)\s+out\s+of\s+5",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid rating regex"))
    .collect()
});

pub fn normalize(raw: &str) -> NormalizedResult {
    match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Object(map)) => from_json(&map),
        Ok(other) => {
            warn!("Model returned JSON that is not an object ({}), using defaults", kind_of(&other));
            NormalizedResult::default()
        }
        Err(e) => {
            warn!("Model output is not valid JSON ({}), falling back to text heuristics", e);
            from_text(raw)
        }
    }
}

/// Removes a surrounding markdown code fence some models add despite the
/// JSON response mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => {
            let body = body.trim_start();
            body.strip_prefix("json").unwrap_or(body).trim()
        }
    }
}

fn from_json(map: &Map<String, Value>) -> NormalizedResult {
    let product_name = PRODUCT_NAME_KEYS
        .iter()
        .find_map(|key| string_field(map.get(*key)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    NormalizedResult {
        product_name,
        description: string_or_default(map.get("Description")),
        pros: list_field(map.get("pros")),
        cons: list_field(map.get("cons")),
        rating: map
            .get("rating")
            .and_then(number_field)
            .map(clamp_rating)
            .unwrap_or(DEFAULT_RATING),
        rating_justification: string_or_default(map.get("ratingJustification")),
        current_price: string_or_default(map.get("Current price")),
        other_website_prices: price_list(map.get("otherWebsitePrices")),
        recommendations: string_or_default(map.get("recommendations")),
    }
}

fn from_text(text: &str) -> NormalizedResult {
    NormalizedResult {
        product_name: extract_section(text, "Product name", "product"),
        description: extract_section(text, "Product Overview", "description"),
        pros: extract_list(text, "Pros", "advantages"),
        cons: extract_list(text, "Cons", "disadvantages"),
        rating: extract_rating(text),
        rating_justification: extract_section(text, "Justification", "justification"),
        current_price: extract_section(text, "Current price", "price"),
        other_website_prices: Vec::new(),
        recommendations: extract_section(text, "Recommendations", "recommendations"),
    }
}

/// First non-empty line of text following `heading` (or `fallback`),
/// bullet-stripped. `"N/A"` when neither label yields anything.
pub fn extract_section(text: &str, heading: &str, fallback: &str) -> String {
    for label in [heading, fallback] {
        let Some(re) = label_regex(label, r"[:\s]*([^\n]+)") else {
            continue;
        };
        let found = re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| strip_bullet(m.as_str()))
            .find(|line| !line.is_empty());
        if let Some(line) = found {
            return line;
        }
    }
    NOT_AVAILABLE.to_string()
}

/// Lines of the paragraph introduced by `heading` (or `fallback`), with list
/// markers stripped and order preserved. `["N/A"]` when nothing is found.
pub fn extract_list(text: &str, heading: &str, fallback: &str) -> Vec<String> {
    for label in [heading, fallback] {
        // group 1: rest of the heading line, group 2: following non-blank lines
        let Some(re) = label_regex(label, r"([^\n]*)((?:\n[^\n]*\S[^\n]*)*)") else {
            continue;
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let inline = caps
            .get(1)
            .map(|m| m.as_str().trim_start_matches([':', ' ', '\t']))
            .unwrap_or_default();
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let items: Vec<String> = std::iter::once(inline)
            .chain(body.lines())
            .map(strip_bullet)
            .filter(|item| !item.is_empty())
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    vec![NOT_AVAILABLE.to_string()]
}

/// First rating in [1,5] found by `rating: X/5`, `X/5` or `X out of 5`,
/// tried in that order. Defaults to 3.0.
pub fn extract_rating(text: &str) -> f64 {
    for pattern in RATING_PATTERNS.iter() {
        let parsed = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());
        if let Some(rating) = parsed {
            if (1.0..=5.0).contains(&rating) {
                return rating;
            }
            debug!("Ignoring out-of-range rating {}", rating);
        }
    }
    DEFAULT_RATING
}

fn label_regex(label: &str, tail: &str) -> Option<Regex> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b{}", regex::escape(label), tail)).ok()
}

fn clamp_rating(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(1.0, 5.0)
    } else {
        DEFAULT_RATING
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_default(value: Option<&Value>) -> String {
    string_field(value).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn list_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| string_field(Some(item)))
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(strip_bullet)
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn price_list(value: Option<&Value>) -> Vec<PriceQuote> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| PriceQuote {
            site: string_or_default(entry.get("site")),
            price: string_or_default(entry.get("price")),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
