pub mod amazon_parser;

pub use amazon_parser::{AmazonParser, looks_like_product_page};
