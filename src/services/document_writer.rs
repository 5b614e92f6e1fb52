//! 复习笔记文档 - 业务能力层
//!
//! 把笔记文本排版成 PDF。配置的字体不存在时退回内置字体，
//! 此时只保留 ASCII 字符，并在结果中标记 `degraded`。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::DocumentError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const LINE_HEIGHT: f32 = 10.0;
const FONT_SIZE: f32 = 12.0;
const MAX_LINE_CHARS: usize = 90;

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// 是否因缺少字体而丢弃了非 ASCII 字符
    pub degraded: bool,
}

/// 文档渲染器
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, text: &str) -> Result<RenderedDocument, DocumentError>;
}

/// PDF 渲染器
pub struct PdfRenderer {
    title: String,
    font_path: Option<PathBuf>,
}

impl PdfRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            title: "PSC Revision Notes".to_string(),
            font_path: config.font_path.as_ref().map(PathBuf::from),
        }
    }

    pub fn with_font(font_path: Option<impl AsRef<Path>>) -> Self {
        Self {
            title: "PSC Revision Notes".to_string(),
            font_path: font_path.map(|p| p.as_ref().to_path_buf()),
        }
    }

    /// 加载字体，返回 (字体, 是否降级)
    fn load_font(&self, doc: &PdfDocumentReference) -> Result<(IndirectFontRef, bool), DocumentError> {
        if let Some(path) = self.font_path.as_ref().filter(|p| p.exists()) {
            let file = File::open(path).map_err(|source| DocumentError::FontReadFailed {
                path: path.display().to_string(),
                source,
            })?;
            let font = doc
                .add_external_font(BufReader::new(file))
                .map_err(|e| DocumentError::Pdf(format!("{:?}", e)))?;
            debug!("使用字体: {}", path.display());
            return Ok((font, false));
        }

        warn!("⚠️ 字体文件不可用，使用内置字体，非 ASCII 字符将被丢弃");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DocumentError::Pdf(format!("{:?}", e)))?;
        Ok((font, true))
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, text: &str) -> Result<RenderedDocument, DocumentError> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(&self.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

        let (font, degraded) = self.load_font(&doc)?;
        let text = if degraded {
            to_ascii(text)
        } else {
            text.to_string()
        };

        let lines = wrap_lines(&text, MAX_LINE_CHARS);
        let lines_per_page = ((PAGE_HEIGHT - 2.0 * MARGIN) / LINE_HEIGHT) as usize;

        let mut layer = doc.get_page(first_page).get_layer(first_layer);
        for (idx, line) in lines.iter().enumerate() {
            let row = idx % lines_per_page;
            if row == 0 && idx > 0 {
                let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer = doc.get_page(page).get_layer(page_layer);
            }
            let y = PAGE_HEIGHT - MARGIN - LINE_HEIGHT * (row as f32 + 1.0);
            layer.use_text(line.as_str(), FONT_SIZE, Mm(MARGIN), Mm(y), &font);
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| DocumentError::Pdf(format!("{:?}", e)))?;
        debug!("PDF 生成完成: {} 行, {} 字节", lines.len(), bytes.len());

        Ok(RenderedDocument { bytes, degraded })
    }
}

/// 只保留 ASCII 字符
pub fn to_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// 按单词折行，超长单词强制截断
pub fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_lines_by_words() {
        let lines = wrap_lines("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_wrap_lines_keeps_paragraphs_and_splits_long_words() {
        let lines = wrap_lines("abcdefghij\n\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "", "xy"]);
    }

    #[test]
    fn test_to_ascii_drops_other_scripts() {
        assert_eq!(to_ascii("Periyar പെരിയാർ river"), "Periyar  river");
    }

    #[test]
    fn test_missing_font_falls_back_and_reports_degradation() {
        let renderer = PdfRenderer::with_font(Some("/nonexistent/font.ttf"));
        let text = "- Periyar: longest river\n".repeat(60);
        let doc = renderer.render(&text).unwrap();
        assert!(doc.degraded);
        assert!(doc.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_no_font_configured_is_degraded() {
        let renderer = PdfRenderer::with_font(None::<&str>);
        let doc = renderer.render("notes").unwrap();
        assert!(doc.degraded);
    }
}
