pub mod analyzer;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod utils;

pub use analyzer::{Analyzer, GeminiClient};
pub use model::{AppError, NormalizedResult, PageDocument, ProductRecord};
pub use normalizer::normalize;
pub use parser::AmazonParser;
pub use prompt::build_prompt;
pub use session::{AnalysisOutcome, AnalysisSession};
