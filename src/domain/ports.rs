use crate::domain::model::{AssemblyResult, OcrResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 列出根目錄下的檔名 (不遞迴)，依名稱排序
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// 影像 → 文字；實作可以是任何託管的 OCR/vision API
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String>;
}

pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, document: &AssemblyResult) -> Result<Vec<u8>>;
    fn content_type(&self) -> &'static str;
}

pub trait ConfigProvider: Send + Sync {
    fn input_dir(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_filename(&self) -> &str;
    fn concurrent_requests(&self) -> usize;
    fn retry_attempts(&self) -> u32;
    fn retry_delay_seconds(&self) -> u64;
    fn max_image_bytes(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<OcrResult>>;
    async fn transform(&self, results: Vec<OcrResult>) -> Result<AssemblyResult>;
    async fn load(&self, document: AssemblyResult) -> Result<String>;
}
