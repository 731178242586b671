// Analysis prompt template
use crate::model::ProductRecord;
use crate::utils::or_not_available;

/// Closing instruction of every prompt.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Respond with only the JSON object above: valid JSON, no markdown fences, no text before or after it.";

/// Renders the analysis prompt for `record`. Missing URL, title or price are
/// written as `N/A`.
pub fn build_prompt(record: &ProductRecord) -> String {
    format!(
        r#"You are a product analyst. Below is a product listed on an amazon.in merchant page. Your job is to:
1.) Identify the product, its price and features, and read the reviews on the page.
2.) Compare the price with other merchant sites in India (Flipkart, Croma, Reliance Digital).
3.) Check the product's price history and give the lowest, highest and average price.
4.) Give a product rating (out of 5) with a justification.
5.) List the pros and cons.
6.) Suggest other options in this category in a similar price range.
7.) Give a short description of the product (1-2 sentences). Be precise.

Product details:
URL:
    {url}
PRODUCT_DETAILS:
    {title}
    {price}

Notes:
- If you are unsure about a price, use "N/A".
- "rating" is a number between 1 and 5.

Output JSON shape:
{{
  "Product name": "Name of the product",
  "Description": "1-2 sentence description",
  "pros": ["short point", "short point", "short point"],
  "cons": ["short point", "short point"],
  "rating": 4.2,
  "ratingJustification": "short reason",
  "Current price": "price on the current page",
  "otherWebsitePrices": [
    {{"site": "Flipkart", "price": "₹24,999"}},
    {{"site": "Croma", "price": "₹25,499"}}
  ],
  "recommendations": "comparable products in the same price range and category"
}}

{instruction}"#,
        url = or_not_available(&record.source_url),
        title = or_not_available(&record.title),
        price = or_not_available(&record.price_text),
        instruction = JSON_ONLY_INSTRUCTION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, title: &str, price: &str) -> ProductRecord {
        let mut record = ProductRecord::empty(url, "www.amazon.in");
        record.title = title.to_string();
        record.price_text = price.to_string();
        record
    }

    #[test]
    fn prompt_contains_product_details_and_ends_with_json_instruction() {
        let prompt = build_prompt(&record("https://www.amazon.in/dp/ABC", "Widget X", "₹999"));

        assert!(prompt.contains("Widget X"));
        assert!(prompt.contains("₹999"));
        assert!(prompt.contains("https://www.amazon.in/dp/ABC"));
        assert!(prompt.ends_with(JSON_ONLY_INSTRUCTION));
    }

    #[test]
    fn missing_fields_become_not_available() {
        let prompt = build_prompt(&record("", "", "  "));

        assert!(prompt.contains("URL:\n    N/A\n"));
        assert!(prompt.contains("PRODUCT_DETAILS:\n    N/A\n    N/A\n"));
    }

    #[test]
    fn prompt_lists_every_result_key() {
        let prompt = build_prompt(&record("https://www.amazon.in/dp/ABC", "Widget X", "₹999"));
        for key in [
            "\"Product name\"",
            "\"Description\"",
            "\"pros\"",
            "\"cons\"",
            "\"rating\"",
            "\"ratingJustification\"",
            "\"Current price\"",
            "\"otherWebsitePrices\"",
            "\"recommendations\"",
        ] {
            assert!(prompt.contains(key), "prompt is missing {key}");
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let r = record("https://www.amazon.in/dp/ABC", "Widget X", "₹999");
        assert_eq!(build_prompt(&r), build_prompt(&r));
    }
}
