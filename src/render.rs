use lopdf::{Document, Object, Stream, dictionary};

use crate::error::ApplyError;

/// Turns plain text into PDF bytes.
pub trait PdfRenderer {
    fn render_pdf(&self, text: &str) -> Result<Vec<u8>, ApplyError>;
}

/// Paginated Helvetica text on A4 pages.
pub struct LopdfRenderer {
    pub font_size: i64,
    pub leading: i64,
    pub margin: i64,
    pub wrap_width: usize,
}

impl Default for LopdfRenderer {
    fn default() -> Self {
        Self {
            font_size: 11,
            leading: 15,
            margin: 56,
            wrap_width: 90,
        }
    }
}

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

impl LopdfRenderer {
    fn lines_per_page(&self) -> usize {
        ((PAGE_HEIGHT - 2 * self.margin) / self.leading).max(1) as usize
    }

    fn wrap(&self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.lines() {
            if paragraph.trim().is_empty() {
                lines.push(String::new());
                continue;
            }
            lines.extend(
                textwrap::wrap(paragraph, self.wrap_width)
                    .into_iter()
                    .map(|l| l.into_owned()),
            );
        }
        lines
    }

    fn page_content(&self, lines: &[String]) -> String {
        let mut content = String::new();
        content.push_str("BT\n");
        content.push_str(&format!("/F1 {} Tf\n", self.font_size));
        content.push_str(&format!(
            "{} {} Td\n",
            self.margin,
            PAGE_HEIGHT - self.margin - self.font_size
        ));
        content.push_str(&format!("{} TL\n", self.leading));
        for line in lines {
            content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
        }
        content.push_str("ET\n");
        content
    }
}

impl PdfRenderer for LopdfRenderer {
    fn render_pdf(&self, text: &str) -> Result<Vec<u8>, ApplyError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let lines = self.wrap(text);
        let chunks: Vec<&[String]> = if lines.is_empty() {
            vec![lines.as_slice()]
        } else {
            lines.chunks(self.lines_per_page()).collect()
        };

        let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let content = Stream::new(dictionary! {}, self.page_content(chunk).into_bytes());
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| ApplyError::Render(e.to_string()))?;
        Ok(buffer)
    }
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            '’' | '‘' => "'".to_string(),
            '“' | '”' => "\"".to_string(),
            '–' | '—' => "-".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_text_spans_pages() {
        let renderer = LopdfRenderer::default();
        let text = (0..200)
            .map(|i| format!("Line {}", i))
            .collect::<Vec<_>>()
            .join("\n");

        let bytes = renderer.render_pdf(&text).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(doc.get_pages().len(), 200_usize.div_ceil(renderer.lines_per_page()));
    }

    #[test]
    fn test_empty_text_renders_one_page() {
        let bytes = LopdfRenderer::default().render_pdf("").unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn test_wrap_and_escape() {
        let renderer = LopdfRenderer {
            wrap_width: 10,
            ..Default::default()
        };
        assert_eq!(renderer.wrap("one two three four"), vec!["one two", "three four"]);
        assert_eq!(escape_pdf_string("a(b)\\ – “c”"), "a\\(b\\)\\\\ - \"c\"");
    }
}
