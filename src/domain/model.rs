use serde::{Deserialize, Serialize};

/// 失敗來源的保留 mime 標記
pub const ERROR_MIME: &str = "error";

/// 單張圖片的 OCR 結果，順序即頁面順序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    pub source_id: String,
    pub raw_text: String,
    pub mime_type: String,
}

impl OcrResult {
    pub fn new(
        source_id: impl Into<String>,
        raw_text: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            raw_text: raw_text.into(),
            mime_type: mime_type.into(),
        }
    }

    /// 取得文字失敗時的佔位結果，`raw_text` 為失敗原因
    pub fn failed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(source_id, reason, ERROR_MIME)
    }

    pub fn is_error(&self) -> bool {
        self.mime_type == ERROR_MIME
    }
}

/// 一段帶樣式的文字，對應 Word 的 run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub color: Option<String>,
}

impl TextRun {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyledBlock {
    Header { text: String, accent: Option<String> },
    Spacer,
    LabelValue { key: String, value: String },
    Plain { text: String },
    Error { text: String, color: String },
}

impl StyledBlock {
    /// 區塊的完整文字 (不含樣式)
    pub fn text(&self) -> String {
        match self {
            StyledBlock::Header { text, .. }
            | StyledBlock::Plain { text }
            | StyledBlock::Error { text, .. } => text.clone(),
            StyledBlock::Spacer => String::new(),
            StyledBlock::LabelValue { .. } => self.runs().into_iter().map(|r| r.text).collect(),
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            StyledBlock::Header { .. } | StyledBlock::LabelValue { .. }
        )
    }

    pub fn color_hint(&self) -> Option<&str> {
        match self {
            StyledBlock::Header { accent, .. } => accent.as_deref(),
            StyledBlock::Error { color, .. } => Some(color),
            _ => None,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, StyledBlock::Spacer)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StyledBlock::Error { .. })
    }

    /// 編碼器實際寫出的 runs；label-value 為「粗體鍵 + 一般值」兩段
    pub fn runs(&self) -> Vec<TextRun> {
        match self {
            StyledBlock::Header { text, accent } => vec![TextRun {
                text: text.clone(),
                bold: true,
                color: accent.clone(),
            }],
            StyledBlock::Spacer => Vec::new(),
            StyledBlock::LabelValue { key, value } => {
                let tail = if value.is_empty() {
                    String::new()
                } else {
                    format!(" {}", value)
                };
                vec![
                    TextRun {
                        text: format!("{}:", key),
                        bold: true,
                        color: None,
                    },
                    TextRun::plain(tail),
                ]
            }
            StyledBlock::Plain { text } => vec![TextRun::plain(text.clone())],
            StyledBlock::Error { text, color } => vec![TextRun {
                text: text.clone(),
                bold: false,
                color: Some(color.clone()),
            }],
        }
    }
}

/// 一次組裝產生的文件內容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyResult {
    pub blocks: Vec<StyledBlock>,
}

impl AssemblyResult {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StyledBlock> {
        self.blocks.iter()
    }

    pub fn error_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_error()).count()
    }
}

impl<'a> IntoIterator for &'a AssemblyResult {
    type Item = &'a StyledBlock;
    type IntoIter = std::slice::Iter<'a, StyledBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
