use crate::core::assembler::Assembler;
use crate::core::images::select_images;
use crate::core::{
    AssemblyResult, ConfigProvider, DocumentEncoder, OcrProvider, OcrResult, Pipeline, Storage,
};
use crate::utils::error::{ConvertError, Result};
use futures_util::stream::{self, StreamExt};
use std::time::Duration;

/// 暫存區圖片 → OCR → 組裝 → 編碼 → 輸出
pub struct DocumentPipeline<S: Storage, O: OcrProvider, E: DocumentEncoder, C: ConfigProvider> {
    staging: S,
    sink: S,
    ocr: O,
    encoder: E,
    assembler: Assembler,
    config: C,
}

impl<S: Storage, O: OcrProvider, E: DocumentEncoder, C: ConfigProvider> DocumentPipeline<S, O, E, C> {
    pub fn new(staging: S, sink: S, ocr: O, encoder: E, assembler: Assembler, config: C) -> Self {
        Self {
            staging,
            sink,
            ocr,
            encoder,
            assembler,
            config,
        }
    }

    async fn staged_images(&self) -> Result<Vec<(String, &'static str)>> {
        let files = match self.staging.list_files().await {
            Ok(files) => files,
            Err(ConvertError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::NoInputError {
                    location: self.config.input_dir().to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let images = select_images(files);

        if images.is_empty() {
            return Err(ConvertError::NoInputError {
                location: self.config.input_dir().to_string(),
            });
        }

        Ok(images)
    }

    async fn process_image(
        &self,
        index: usize,
        total: usize,
        name: String,
        mime_type: &'static str,
    ) -> OcrResult {
        tracing::info!("🖼️ Processing image {}/{}: {}", index + 1, total, name);

        let data = match self.staging.read_file(&name).await {
            Ok(data) => data,
            Err(e) => return failed_source(name, e.to_string()),
        };

        if data.is_empty() {
            return failed_source(name, "No data found for image".to_string());
        }

        let limit = self.config.max_image_bytes();
        if data.len() > limit {
            let reason = format!("Image is {} bytes, limit is {} bytes", data.len(), limit);
            return failed_source(name, reason);
        }

        match self.extract_with_retry(&name, &data, mime_type).await {
            Ok(text) => {
                tracing::info!(
                    "✅ OCR extracted {} characters from {}",
                    text.chars().count(),
                    name
                );
                OcrResult::new(name, text, mime_type)
            }
            Err(e) => failed_source(name, e.to_string()),
        }
    }

    async fn extract_with_retry(&self, name: &str, data: &[u8], mime_type: &str) -> Result<String> {
        let max_retries = self.config.retry_attempts();
        let delay = Duration::from_secs(self.config.retry_delay_seconds());
        let mut retries = 0;

        loop {
            match self.ocr.extract_text(data, mime_type).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "🔁 OCR for {} failed ({}), retry {}/{} in {:?}",
                        name,
                        e,
                        retries,
                        max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 單一來源失敗只記錄並轉成佔位結果，不中斷整批
fn failed_source(name: String, reason: String) -> OcrResult {
    let err = ConvertError::OcrError {
        source_id: name.clone(),
        message: reason.clone(),
    };
    tracing::warn!("⚠️ {}", err);
    OcrResult::failed(name, reason)
}

#[async_trait::async_trait]
impl<S: Storage, O: OcrProvider, E: DocumentEncoder, C: ConfigProvider> Pipeline
    for DocumentPipeline<S, O, E, C>
{
    async fn extract(&self) -> Result<Vec<OcrResult>> {
        let images = self.staged_images().await?;
        let total = images.len();
        let concurrency = self.config.concurrent_requests().max(1);

        tracing::debug!(
            "Running OCR on {} images with {} requests in flight",
            total,
            concurrency
        );

        // future 是惰性的，buffered 同時只輪詢 concurrency 個，並保持輸入順序
        let pending: Vec<_> = images
            .into_iter()
            .enumerate()
            .map(|(index, (name, mime_type))| self.process_image(index, total, name, mime_type))
            .collect();

        let results = stream::iter(pending)
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(results)
    }

    async fn transform(&self, results: Vec<OcrResult>) -> Result<AssemblyResult> {
        let document = self.assembler.assemble(&results);

        let failed = results.iter().filter(|r| r.is_error()).count();
        if failed > 0 {
            tracing::warn!("{} of {} images could not be read", failed, results.len());
        }

        Ok(document)
    }

    async fn load(&self, document: AssemblyResult) -> Result<String> {
        let filename = self.config.output_filename();
        let output_path = format!("{}/{}", self.config.output_path(), filename);

        let bytes = self.encoder.encode(&document)?;

        tracing::debug!(
            "Writing {} ({} bytes, {})",
            filename,
            bytes.len(),
            self.encoder.content_type()
        );
        self.sink.write_file(filename, &bytes).await?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::docx::DocxEncoder;
    use crate::domain::model::StyledBlock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        missing: bool,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
                missing: false,
            }
        }

        fn missing() -> Self {
            Self {
                missing: true,
                ..Self::new()
            }
        }

        async fn with_files(files: &[(&str, &str)]) -> Self {
            let storage = Self::new();
            for (name, data) in files {
                storage.write_file(name, data.as_bytes()).await.unwrap();
            }
            storage
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ConvertError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self) -> Result<Vec<String>> {
            if self.missing {
                return Err(ConvertError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such directory",
                )));
            }
            let files = self.files.lock().await;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    /// 影像內容即 OCR 文字；特定前綴模擬失敗
    struct MockOcr {
        calls: AtomicUsize,
        flaky_failures: usize,
    }

    impl MockOcr {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                flaky_failures: 0,
            }
        }

        fn flaky(failures: usize) -> Self {
            Self {
                flaky_failures: failures,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl OcrProvider for MockOcr {
        async fn extract_text(&self, image: &[u8], _mime_type: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let text = String::from_utf8_lossy(image).to_string();

            if let Some(rest) = text.strip_prefix("slow:") {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(rest.to_string());
            }
            if text.starts_with("reject") {
                return Err(ConvertError::ServiceError {
                    status: 400,
                    message: "unsupported image".to_string(),
                });
            }
            if call < self.flaky_failures {
                return Err(ConvertError::ServiceError {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            Ok(text)
        }
    }

    struct MockConfig {
        concurrent_requests: usize,
        retry_attempts: u32,
        max_image_bytes: usize,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                concurrent_requests: 4,
                retry_attempts: 2,
                max_image_bytes: 1024,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_dir(&self) -> &str {
            "staging"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_filename(&self) -> &str {
            "document.docx"
        }

        fn concurrent_requests(&self) -> usize {
            self.concurrent_requests
        }

        fn retry_attempts(&self) -> u32 {
            self.retry_attempts
        }

        fn retry_delay_seconds(&self) -> u64 {
            0
        }

        fn max_image_bytes(&self) -> usize {
            self.max_image_bytes
        }
    }

    fn build_pipeline(
        staging: MockStorage,
        sink: MockStorage,
        ocr: MockOcr,
        config: MockConfig,
    ) -> DocumentPipeline<MockStorage, MockOcr, DocxEncoder, MockConfig> {
        DocumentPipeline::new(
            staging,
            sink,
            ocr,
            DocxEncoder::new("test"),
            Assembler::default(),
            config,
        )
    }

    #[tokio::test]
    async fn test_extract_preserves_staging_order() {
        let staging = MockStorage::with_files(&[
            ("01.png", "slow:first"),
            ("02.png", "second"),
            ("03.jpg", "slow:third"),
            ("04.png", "fourth"),
        ])
        .await;
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::new(), MockConfig::new());

        let results = pipeline.extract().await.unwrap();

        let texts: Vec<&str> = results.iter().map(|r| r.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third", "fourth"]);
        assert_eq!(results[2].mime_type, "image/jpeg");
        assert_eq!(results[0].source_id, "01.png");
    }

    #[tokio::test]
    async fn test_extract_skips_non_images() {
        let staging = MockStorage::with_files(&[("a.png", "text"), ("notes.txt", "ignored")]).await;
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::new(), MockConfig::new());

        let results = pipeline.extract().await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, "a.png");
    }

    #[tokio::test]
    async fn test_extract_without_images_fails() {
        let staging = MockStorage::with_files(&[("readme.md", "hi")]).await;
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::new(), MockConfig::new());

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ConvertError::NoInputError { .. }));

        let pipeline = build_pipeline(
            MockStorage::missing(),
            MockStorage::new(),
            MockOcr::new(),
            MockConfig::new(),
        );
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ConvertError::NoInputError { location } if location == "staging"));
    }

    #[tokio::test]
    async fn test_failures_become_placeholders() {
        let oversized = vec![b'x'; 2048];
        let staging = MockStorage::with_files(&[
            ("a.png", "Name: Alice"),
            ("b.png", "reject me"),
            ("c.png", ""),
        ])
        .await;
        staging.write_file("d.png", &oversized).await.unwrap();
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::new(), MockConfig::new());

        let results = pipeline.extract().await.unwrap();

        assert_eq!(results.len(), 4);
        assert!(!results[0].is_error());
        assert!(results[1].is_error());
        assert!(results[1].raw_text.contains("400"));
        assert!(results[2].is_error());
        assert_eq!(results[2].raw_text, "No data found for image");
        assert!(results[3].is_error());
        assert!(results[3].raw_text.contains("limit is 1024 bytes"));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let staging = MockStorage::with_files(&[("a.png", "recovered")]).await;
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::flaky(2), MockConfig::new());

        let results = pipeline.extract().await.unwrap();

        assert_eq!(results[0].raw_text, "recovered");
        assert_eq!(pipeline.ocr.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let staging = MockStorage::with_files(&[("a.png", "never")]).await;
        let config = MockConfig {
            retry_attempts: 1,
            ..MockConfig::new()
        };
        let pipeline = build_pipeline(staging, MockStorage::new(), MockOcr::flaky(5), config);

        let results = pipeline.extract().await.unwrap();

        assert!(results[0].is_error());
        assert_eq!(pipeline.ocr.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transform_assembles_blocks() {
        let pipeline = build_pipeline(
            MockStorage::new(),
            MockStorage::new(),
            MockOcr::new(),
            MockConfig::new(),
        );
        let results = vec![
            OcrResult::new("a.png", "Name: Alice", "image/png"),
            OcrResult::failed("b.png", "timeout"),
        ];

        let document = pipeline.transform(results).await.unwrap();

        assert_eq!(document.error_count(), 1);
        assert_eq!(
            document.blocks[2],
            StyledBlock::LabelValue {
                key: "Name".to_string(),
                value: "Alice".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_load_writes_docx() {
        let sink = MockStorage::new();
        let pipeline = build_pipeline(MockStorage::new(), sink.clone(), MockOcr::new(), MockConfig::new());
        let document = Assembler::default().assemble(&[OcrResult::new("a.png", "hello", "image/png")]);

        let output_path = pipeline.load(document).await.unwrap();

        assert_eq!(output_path, "test_output/document.docx");
        let bytes = sink.get_file("document.docx").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert!(archive.file_names().any(|name| name == "word/document.xml"));
    }
}
