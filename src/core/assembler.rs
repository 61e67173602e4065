use crate::domain::model::{AssemblyResult, OcrResult, StyledBlock};
use crate::utils::error::Result;
use crate::utils::validation::{validate_hex_color, validate_positive_number, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LABEL_THRESHOLD: usize = 50;
pub const DEFAULT_ACCENT_COLOR: &str = "2E74B5";
pub const ERROR_COLOR: &str = "FF0000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub include_headers: bool,
    /// 冒號前的鍵長度 (字元數) 必須嚴格小於此值才視為 label-value
    pub label_threshold: usize,
    /// 頁首強調色；空字串表示不上色
    pub header_accent_color: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            label_threshold: DEFAULT_LABEL_THRESHOLD,
            header_accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

impl Validate for AssemblerConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("assembler.label_threshold", self.label_threshold, 1)?;
        if !self.header_accent_color.is_empty() {
            validate_hex_color("assembler.header_accent_color", &self.header_accent_color)?;
        }
        Ok(())
    }
}

/// 把逐頁 OCR 文字轉成有樣式的文件區塊。無狀態，可跨執行緒共用。
#[derive(Debug, Clone)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn assemble(&self, results: &[OcrResult]) -> AssemblyResult {
        let mut blocks = Vec::new();

        for (index, result) in results.iter().enumerate() {
            if result.is_error() {
                blocks.push(StyledBlock::Error {
                    text: format!("Error processing {}: {}", result.source_id, result.raw_text),
                    color: ERROR_COLOR.to_string(),
                });
                blocks.push(StyledBlock::Spacer);
                continue;
            }

            if self.config.include_headers {
                blocks.push(StyledBlock::Header {
                    text: format!("Page {}: {}", index + 1, result.source_id),
                    accent: self.accent(),
                });
            }
            // 關閉頁首時仍保留頁首後的空行
            blocks.push(StyledBlock::Spacer);

            blocks.extend(
                content_lines(&result.raw_text)
                    .map(|line| classify_line(line, self.config.label_threshold)),
            );

            // 頁與頁之間空兩行
            blocks.push(StyledBlock::Spacer);
            blocks.push(StyledBlock::Spacer);
        }

        tracing::debug!(
            "Assembled {} blocks from {} sources",
            blocks.len(),
            results.len()
        );

        AssemblyResult { blocks }
    }

    fn accent(&self) -> Option<String> {
        if self.config.header_accent_color.is_empty() {
            None
        } else {
            Some(self.config.header_accent_color.clone())
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            config: AssemblerConfig::default(),
        }
    }
}

/// 依 `\n` 切行、去除前後空白並丟棄空行。可重複迭代 (Clone)，保留原順序。
pub fn content_lines(raw_text: &str) -> impl Iterator<Item = &str> + Clone + '_ {
    raw_text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// 只在第一個冒號切開；值中的冒號原樣保留
pub fn classify_line(line: &str, label_threshold: usize) -> StyledBlock {
    if let Some((key, value)) = line.split_once(':') {
        if key.chars().count() < label_threshold {
            return StyledBlock::LabelValue {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            };
        }
    }

    StyledBlock::Plain {
        text: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(text: &str) -> StyledBlock {
        StyledBlock::Header {
            text: text.to_string(),
            accent: Some(DEFAULT_ACCENT_COLOR.to_string()),
        }
    }

    fn label(key: &str, value: &str) -> StyledBlock {
        StyledBlock::LabelValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn plain(text: &str) -> StyledBlock {
        StyledBlock::Plain {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_single_page_with_label_values() {
        let assembler = Assembler::default();
        let results = vec![OcrResult::new("p1", "Name: Alice\nCity: Paris", "image/png")];

        let document = assembler.assemble(&results);

        assert_eq!(
            document.blocks,
            vec![
                header("Page 1: p1"),
                StyledBlock::Spacer,
                label("Name", "Alice"),
                label("City", "Paris"),
                StyledBlock::Spacer,
                StyledBlock::Spacer,
            ]
        );
        assert_eq!(document.blocks[2].runs()[0].text, "Name:");
        assert_eq!(document.blocks[2].runs()[1].text, " Alice");
    }

    #[test]
    fn test_empty_input_produces_empty_document() {
        let document = Assembler::default().assemble(&[]);
        assert!(document.is_empty());
    }

    #[test]
    fn test_long_key_stays_plain() {
        let line = format!("{}: value", "k".repeat(60));
        let results = vec![OcrResult::new("p1", line.clone(), "image/png")];

        let document = Assembler::default().assemble(&results);

        assert_eq!(document.blocks[2], plain(&line));
        assert_eq!(document.len(), 5);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let at_threshold = format!("{}:v", "k".repeat(50));
        let below = format!("{}:v", "k".repeat(49));

        assert_eq!(classify_line(&at_threshold, 50), plain(&at_threshold));
        assert_eq!(classify_line(&below, 50), label(&"k".repeat(49), "v"));
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // 10 個 CJK 字元 = 30 bytes
        let line = "名稱名稱名稱名稱名稱: 值";
        assert_eq!(classify_line(line, 11), label("名稱名稱名稱名稱名稱", "值"));
        assert_eq!(classify_line(line, 10), plain(line));
    }

    #[test]
    fn test_split_on_first_colon_only() {
        assert_eq!(
            classify_line("Time: 10:30:00", 50),
            label("Time", "10:30:00")
        );
        assert_eq!(
            classify_line("URL: https://example.com", 50),
            label("URL", "https://example.com")
        );
    }

    #[test]
    fn test_colon_only_lines_keep_empty_segments() {
        assert_eq!(classify_line(":", 50), label("", ""));
        assert_eq!(classify_line("Key:", 50), label("Key", ""));
        assert_eq!(classify_line(": value", 50), label("", "value"));
    }

    #[test]
    fn test_blank_text_yields_no_content_blocks() {
        let results = vec![OcrResult::new("blank.png", "\n   \n\t\n", "image/png")];

        let document = Assembler::default().assemble(&results);

        assert_eq!(
            document.blocks,
            vec![
                header("Page 1: blank.png"),
                StyledBlock::Spacer,
                StyledBlock::Spacer,
                StyledBlock::Spacer,
            ]
        );
    }

    #[test]
    fn test_content_lines_trims_and_drops_blanks() {
        let raw = "  first  \r\n\n second\u{3000}\n\n";
        let lines: Vec<&str> = content_lines(raw).collect();
        assert_eq!(lines, vec!["first", "second"]);

        // 可重複迭代
        let iter = content_lines(raw);
        assert_eq!(iter.clone().count(), 2);
        assert_eq!(iter.collect::<Vec<_>>(), lines);
    }

    #[test]
    fn test_error_source_does_not_abort_assembly() {
        let results = vec![
            OcrResult::new("a.png", "Alpha", "image/png"),
            OcrResult::new("b.png", "Beta", "image/png"),
            OcrResult::failed("c.png", "status 503"),
            OcrResult::new("d.png", "Delta", "image/png"),
        ];

        let document = Assembler::default().assemble(&results);

        assert_eq!(document.error_count(), 1);
        let error_position = document
            .iter()
            .position(|b| b.is_error())
            .unwrap();
        // a 與 b 各佔 header + spacer + 1 行 + 2 spacer
        assert_eq!(error_position, 10);
        assert_eq!(
            document.blocks[error_position],
            StyledBlock::Error {
                text: "Error processing c.png: status 503".to_string(),
                color: ERROR_COLOR.to_string(),
            }
        );

        let headers: Vec<String> = document
            .iter()
            .filter(|b| matches!(b, StyledBlock::Header { .. }))
            .map(|b| b.text())
            .collect();
        assert_eq!(
            headers,
            vec!["Page 1: a.png", "Page 2: b.png", "Page 4: d.png"]
        );
        assert_eq!(document.blocks[error_position + 2], header("Page 4: d.png"));
    }

    #[test]
    fn test_without_headers() {
        let config = AssemblerConfig {
            include_headers: false,
            ..AssemblerConfig::default()
        };
        let assembler = Assembler::new(config).unwrap();
        let results = vec![OcrResult::new("p1", "hello", "image/png")];

        let document = assembler.assemble(&results);

        assert_eq!(
            document.blocks,
            vec![
                StyledBlock::Spacer,
                plain("hello"),
                StyledBlock::Spacer,
                StyledBlock::Spacer
            ]
        );
    }

    #[test]
    fn test_empty_accent_means_no_color() {
        let config = AssemblerConfig {
            header_accent_color: String::new(),
            ..AssemblerConfig::default()
        };
        let assembler = Assembler::new(config).unwrap();

        let document = assembler.assemble(&[OcrResult::new("p1", "x", "image/png")]);

        assert_eq!(document.blocks[0].color_hint(), None);
        assert!(document.blocks[0].is_bold());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let zero = AssemblerConfig {
            label_threshold: 0,
            ..AssemblerConfig::default()
        };
        assert!(Assembler::new(zero).is_err());

        let bad_color = AssemblerConfig {
            header_accent_color: "blue".to_string(),
            ..AssemblerConfig::default()
        };
        assert!(Assembler::new(bad_color).is_err());
    }

    #[test]
    fn test_configurable_threshold() {
        let config = AssemblerConfig {
            label_threshold: 5,
            ..AssemblerConfig::default()
        };
        let assembler = Assembler::new(config).unwrap();
        let results = vec![OcrResult::new("p1", "Name: A\nAddress: B", "image/png")];

        let document = assembler.assemble(&results);

        assert_eq!(document.blocks[2], label("Name", "A"));
        assert_eq!(document.blocks[3], plain("Address: B"));
    }

    #[test]
    fn test_classification_property() {
        let just_below = "x".repeat(49);
        let at_limit = "y".repeat(50);
        let far_above = "z".repeat(80);
        let keys = [
            "",
            "a",
            " padded ",
            "Invoice No",
            just_below.as_str(),
            at_limit.as_str(),
            far_above.as_str(),
        ];
        let values = ["", "v", "  spaced value ", "with: colon"];

        for key in keys {
            for value in values {
                let line = format!("{}:{}", key, value);
                let trimmed = line.trim();
                let block = classify_line(trimmed, DEFAULT_LABEL_THRESHOLD);
                // trim 後的行會吃掉鍵的前導空白
                let key_segment = trimmed.split_once(':').map(|(k, _)| k).unwrap_or("");

                if key_segment.chars().count() < DEFAULT_LABEL_THRESHOLD {
                    assert_eq!(block, label(key.trim(), value.trim()), "line {:?}", line);
                } else {
                    assert_eq!(block, plain(trimmed), "line {:?}", line);
                }
            }
        }
    }

    #[test]
    fn test_block_count_and_order_properties() {
        let assembler = Assembler::default();
        let inputs: Vec<Vec<OcrResult>> = vec![
            vec![],
            vec![OcrResult::new("only", "", "image/png")],
            vec![
                OcrResult::new("one", "a\nb: c", "image/png"),
                OcrResult::failed("two", "bad"),
                OcrResult::new("three", "\n\n", "image/jpeg"),
            ],
            (1..=6)
                .map(|i| OcrResult::new(format!("img{}", i), format!("Line {}\nKey{}: {}", i, i, i), "image/png"))
                .collect(),
        ];

        for results in inputs {
            let first = assembler.assemble(&results);
            let second = assembler.assemble(&results);
            assert_eq!(first, second);
            assert!(first.len() >= results.len() * 2);

            // 每個來源都依序出現 (header 或錯誤區塊)
            let markers: Vec<String> = first
                .iter()
                .filter(|b| matches!(b, StyledBlock::Header { .. } | StyledBlock::Error { .. }))
                .map(|b| b.text())
                .collect();
            assert_eq!(markers.len(), results.len());
            for (marker, result) in markers.iter().zip(&results) {
                assert!(marker.contains(&result.source_id));
            }
        }
    }

    #[test]
    fn test_assembler_is_shareable_across_threads() {
        let assembler = std::sync::Arc::new(Assembler::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let assembler = assembler.clone();
                std::thread::spawn(move || {
                    assembler
                        .assemble(&[OcrResult::new(format!("t{}", i), "k: v", "image/png")])
                        .len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 5);
        }
    }
}
