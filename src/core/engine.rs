use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct ConversionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ConversionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting conversion...");

        // Extract
        tracing::info!("📸 Extracting text from staged images...");
        let results = self.pipeline.extract().await?;
        let failed = results.iter().filter(|r| r.is_error()).count();
        tracing::info!(
            "Extracted text from {} images ({} failed)",
            results.len() - failed,
            failed
        );

        // Transform
        tracing::info!("📄 Assembling document...");
        let document = self.pipeline.transform(results).await?;
        tracing::info!("Assembled {} paragraphs", document.len());

        // Load
        tracing::info!("💾 Writing document...");
        let output_path = self.pipeline.load(document).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
