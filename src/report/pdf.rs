//! Minimal PDF 1.4 writer for text-only documents.
//!
//! Pages are US Letter and use the standard Type1 Helvetica faces, which every
//! viewer ships, so no font embedding is needed. Content streams are left
//! uncompressed.

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
}

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    x: f64,
    y: f64,
    font: Font,
    size: f64,
    color: Rgb,
    text: String,
}

/// Lays text out top-down, starting a new page when the bottom margin is reached.
#[derive(Debug)]
pub struct PdfDocument {
    pages: Vec<Vec<TextLine>>,
    cursor_y: f64,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes one line at the cursor and moves the cursor down by `advance` points.
    pub fn line(&mut self, text: &str, font: Font, size: f64, color: Rgb, advance: f64) {
        if self.cursor_y < MARGIN {
            self.pages.push(Vec::new());
            self.cursor_y = PAGE_HEIGHT - MARGIN;
        }

        let y = self.cursor_y;
        if let Some(page) = self.pages.last_mut() {
            page.push(TextLine {
                x: MARGIN,
                y,
                font,
                size,
                color,
                text: text.to_string(),
            });
        }
        self.cursor_y -= advance;
    }

    pub fn gap(&mut self, points: f64) {
        self.cursor_y -= points;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // 1: catalog, 2: page tree, 3-4: fonts, then a page and content object per page.
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| 5 + i * 2).collect();
        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + self.pages.len() * 2);

        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{kids}] /Count {} >>",
                self.pages.len()
            )
            .into_bytes(),
        );

        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );

        for (page, page_id) in self.pages.iter().zip(&page_ids) {
            let content_id = page_id + 1;
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
                )
                .into_bytes(),
            );

            let stream = content_stream(page);
            let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
            content.extend_from_slice(&stream);
            content.extend_from_slice(b"\nendstream");
            objects.push(content);
        }

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );

        out
    }
}

fn content_stream(lines: &[TextLine]) -> Vec<u8> {
    let mut stream = Vec::new();
    for line in lines {
        let Rgb(r, g, b) = line.color;
        stream.extend_from_slice(
            format!(
                "BT /{} {} Tf {r:.3} {g:.3} {b:.3} rg {:.2} {:.2} Td (",
                line.font.resource_name(),
                line.size,
                line.x,
                line.y
            )
            .as_bytes(),
        );
        stream.extend_from_slice(&escape_text(&line.text));
        stream.extend_from_slice(b") Tj ET\n");
    }
    stream
}

/// Encodes text as a WinAnsi literal string body. Characters outside Latin-1 become `?`.
fn escape_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\u{a0}'..='\u{ff}' => out.extend_from_slice(format!("\\{:03o}", c as u32).as_bytes()),
            _ => out.push(b'?'),
        }
    }
    out
}
