// Analysis session: the pipeline wired to the credentials read at startup
use crate::analyzer::Analyzer;
use crate::model::{AppError, NormalizedResult, PageDocument, ProductRecord};
use crate::normalizer::normalize;
use crate::parser::AmazonParser;
use crate::prompt::build_prompt;
use crate::storage::Settings;
use crate::telemetry::{TelemetryReporter, TraceInput};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct AnalysisOutcome {
    pub record: ProductRecord,
    pub result: NormalizedResult,
    /// Pending trace upload, if telemetry is configured. Callers may await it
    /// after presenting the result, or drop it.
    pub telemetry: Option<JoinHandle<()>>,
}

pub struct AnalysisSession {
    settings: Settings,
    parser: AmazonParser,
    analyzer: Arc<dyn Analyzer>,
    reporter: Arc<TelemetryReporter>,
}

impl AnalysisSession {
    pub fn new(
        settings: Settings,
        parser: AmazonParser,
        analyzer: Arc<dyn Analyzer>,
        reporter: Arc<TelemetryReporter>,
    ) -> Self {
        Self {
            settings,
            parser,
            analyzer,
            reporter,
        }
    }

    /// Extracts, analyzes and normalizes `page`. Telemetry is handed off to a
    /// detached task and never affects the returned result.
    pub async fn analyze_page(&self, page: &PageDocument) -> Result<AnalysisOutcome, AppError> {
        let record = self.parser.extract(page)?;
        let prompt = build_prompt(&record);
        info!("Prompt created, length: {}", prompt.len());

        let raw = self.analyzer.analyze(&prompt, &self.settings.api_key).await?;
        let result = normalize(&raw.text);

        let telemetry = self.settings.telemetry.is_complete().then(|| {
            TelemetryReporter::spawn_report(
                self.reporter.clone(),
                TraceInput {
                    record: record.clone(),
                    prompt,
                    raw_response: raw.text,
                    result: result.clone(),
                    model: raw.model,
                },
                self.settings.telemetry.clone(),
            )
        });

        Ok(AnalysisOutcome {
            record,
            result,
            telemetry,
        })
    }
}
