// amazon.in product page extraction
use crate::model::{ExtractError, PageDocument, ProductRecord};
use crate::utils::collapse_whitespace;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)\s+out\s+of\s+5").expect("valid rating regex"));

const TITLE_SELECTORS: &[&str] = &[
    "#productTitle",
    r#"h1[data-automation-id="product-title"]"#,
    ".product-title",
    "h1.a-size-large",
];
const PRICE_SELECTORS: &[&str] = &[
    ".a-price-whole",
    "#priceblock_dealprice",
    "#priceblock_ourprice",
    ".a-price-range",
    ".a-offscreen",
];
const DESCRIPTION_SELECTORS: &[&str] = &[
    "#feature-bullets ul",
    "#productDescription p",
    "#aplus_feature_div",
];
const BRAND_SELECTORS: &[&str] = &[
    "#bylineInfo",
    ".brand",
    r#"[data-automation-id="bylineInfo"]"#,
];
const AVAILABILITY_SELECTORS: &[&str] = &["#availability span", "#availability"];
const IMAGE_SELECTOR: &str = "#landingImage, #imgTagWrapperId img, .a-dynamic-image";
const RATING_SELECTOR: &str = ".a-icon-alt";
const REVIEW_SELECTOR: &str = ".review-text-content, .a-expander-content";
const SPEC_ROW_SELECTOR: &str = "#productDetails_techSpec_section_1 tr, \
     #productDetails_detailBullets_sections1 tr, \
     #productOverview_feature_div tr";
const SPEC_CELL_SELECTOR: &str = "th, td";

/// Reviews this short are boilerplate or empty expander nodes.
const MIN_REVIEW_CHARS: usize = 10;

const PRODUCT_PATH_MARKERS: &[&str] = &["/dp/", "/gp/product/", "/product/", "/p/", "/item/"];

/// Extracts a [`ProductRecord`] from a product page of the supported merchant.
pub struct AmazonParser {
    supported_domain: String,
    title: Vec<Selector>,
    price: Vec<Selector>,
    description: Vec<Selector>,
    brand: Vec<Selector>,
    availability: Vec<Selector>,
    images: Selector,
    rating: Selector,
    reviews: Selector,
    spec_rows: Selector,
    spec_cells: Selector,
}

impl AmazonParser {
    pub fn new(supported_domain: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            supported_domain: supported_domain.to_ascii_lowercase(),
            title: compile_all(TITLE_SELECTORS)?,
            price: compile_all(PRICE_SELECTORS)?,
            description: compile_all(DESCRIPTION_SELECTORS)?,
            brand: compile_all(BRAND_SELECTORS)?,
            availability: compile_all(AVAILABILITY_SELECTORS)?,
            images: compile(IMAGE_SELECTOR)?,
            rating: compile(RATING_SELECTOR)?,
            reviews: compile(REVIEW_SELECTOR)?,
            spec_rows: compile(SPEC_ROW_SELECTOR)?,
            spec_cells: compile(SPEC_CELL_SELECTOR)?,
        })
    }

    /// Scrapes the page. Fails only when the page is not from the supported
    /// domain; every missing field is left at its empty default.
    pub fn extract(&self, page: &PageDocument) -> Result<ProductRecord, ExtractError> {
        let host = host_of(&page.url).unwrap_or_default();
        if !is_supported_host(&host, &self.supported_domain) {
            return Err(ExtractError::UnsupportedSite {
                host,
                supported: self.supported_domain.clone(),
            });
        }

        let document = Html::parse_document(&page.html);
        let mut record = ProductRecord::empty(&page.url, &host);

        record.title = first_text(&document, &self.title);
        record.price_text = first_text(&document, &self.price);
        record.description_text = first_text(&document, &self.description);
        record.brand = first_text(&document, &self.brand);
        record.availability = first_text(&document, &self.availability);
        record.image_urls = self.image_urls(&document);
        record.rating_value = document
            .select(&self.rating)
            .next()
            .and_then(|el| parse_rating(&element_text(el)));
        record.review_texts = self.reviews(&document);
        self.fill_specifications(&document, &mut record);

        info!(
            "Extracted '{}' ({} images, {} reviews, rating {:?})",
            record.title,
            record.image_urls.len(),
            record.review_texts.len(),
            record.rating_value
        );
        Ok(record)
    }

    fn image_urls(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.images)
            .filter_map(|img| {
                let value = img.value();
                value
                    .attr("src")
                    .filter(|src| !src.trim().is_empty())
                    .or_else(|| value.attr("data-src"))
                    .map(|src| src.trim().to_string())
            })
            .filter(|src| !src.is_empty())
            .collect()
    }

    fn reviews(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.reviews)
            .map(element_text)
            .filter(|text| text.chars().count() > MIN_REVIEW_CHARS)
            .collect()
    }

    fn fill_specifications(&self, document: &Html, record: &mut ProductRecord) {
        for row in document.select(&self.spec_rows) {
            let cells: Vec<String> = row.select(&self.spec_cells).map(element_text).collect();
            if let [label, value, ..] = cells.as_slice() {
                if !label.is_empty() && !value.is_empty() {
                    record
                        .specifications
                        .entry(label.clone())
                        .or_insert_with(|| value.clone());
                }
            }
        }
        debug!("Collected {} specification rows", record.specifications.len());
    }
}

/// Heuristic check used to warn about pages that are probably not product
/// pages. Never used to reject a page.
pub fn looks_like_product_page(url: &str) -> bool {
    Url::parse(url)
        .map(|u| {
            let path = u.path().to_ascii_lowercase();
            PRODUCT_PATH_MARKERS.iter().any(|m| path.contains(m))
        })
        .unwrap_or(false)
}

/// Parses "`<number> out of 5`"; values outside [0,5] are discarded.
pub fn parse_rating(text: &str) -> Option<f64> {
    let caps = RATING_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    (0.0..=5.0).contains(&value).then_some(value)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

fn is_supported_host(host: &str, domain: &str) -> bool {
    !host.is_empty()
        && (host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.')))
}

fn compile(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn compile_all(list: &[&str]) -> Result<Vec<Selector>, ExtractError> {
    list.iter().map(|css| compile(css)).collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    let text = collapse_whitespace(&el.text().collect::<String>());
    text.trim_matches(|c: char| c == '\u{200e}' || c == '\u{200f}' || c.is_whitespace())
        .to_string()
}

/// First match of the first selector whose element has non-empty text.
fn first_text(document: &Html, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}
