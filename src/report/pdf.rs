use std::fmt::Write as _;

/// A4 in points
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const POINTS_PER_MM: f32 = 72.0 / 25.4;
/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn gray(level: u8) -> Self {
        Rgb(level, level, level)
    }

    fn components(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// Single-page PDF 1.4 document using the built-in Helvetica fonts.
///
/// Coordinates are millimetres from the top-left corner of an A4 page.
/// Text is limited to Latin-1; other characters are replaced with `?`.
#[derive(Debug, Default)]
pub struct PdfPage {
    content: String,
}

impl PdfPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, x: f32, y: f32, size: f32, color: Rgb, align: TextAlign, text: &str) {
        self.styled_text(x, y, size, color, align, false, text);
    }

    pub fn bold_text(&mut self, x: f32, y: f32, size: f32, color: Rgb, align: TextAlign, text: &str) {
        self.styled_text(x, y, size, color, align, true, text);
    }

    #[allow(clippy::too_many_arguments)]
    fn styled_text(
        &mut self,
        x: f32,
        y: f32,
        size: f32,
        color: Rgb,
        align: TextAlign,
        bold: bool,
        text: &str,
    ) {
        let mut px = x * POINTS_PER_MM;
        if align == TextAlign::Center {
            px -= text.chars().count() as f32 * size * AVG_GLYPH_WIDTH / 2.0;
        }
        let py = PAGE_HEIGHT - y * POINTS_PER_MM;
        let (r, g, b) = color.components();
        let font = if bold { "F2" } else { "F1" };

        let _ = writeln!(
            self.content,
            "BT /{} {:.1} Tf {:.3} {:.3} {:.3} rg {:.2} {:.2} Td ({}) Tj ET",
            font,
            size,
            r,
            g,
            b,
            px,
            py,
            escape(text)
        );
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb) {
        let (r, g, b) = color.components();
        let _ = writeln!(
            self.content,
            "{:.3} {:.3} {:.3} RG 0.5 w {:.2} {:.2} m {:.2} {:.2} l S",
            r,
            g,
            b,
            x1 * POINTS_PER_MM,
            PAGE_HEIGHT - y1 * POINTS_PER_MM,
            x2 * POINTS_PER_MM,
            PAGE_HEIGHT - y2 * POINTS_PER_MM
        );
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let (r, g, b) = color.components();
        let _ = writeln!(
            self.content,
            "{:.3} {:.3} {:.3} rg {:.2} {:.2} {:.2} {:.2} re f",
            r,
            g,
            b,
            x * POINTS_PER_MM,
            PAGE_HEIGHT - (y + height) * POINTS_PER_MM,
            width * POINTS_PER_MM,
            height * POINTS_PER_MM
        );
    }

    /// Serialize the page into a complete PDF file
    pub fn finish(self) -> Vec<u8> {
        let stream = encode_latin1(&self.content);

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT
            )
            .into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        ];

        let mut contents = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        contents.extend_from_slice(&stream);
        contents.extend_from_slice(b"\nendstream");
        objects.push(contents);

        let mut pdf = Vec::with_capacity(stream.len() + 1024);
        pdf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            pdf.extend_from_slice(body);
            pdf.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        pdf.extend_from_slice(xref.as_bytes());

        pdf
    }
}

/// Escape a string for a PDF literal
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn encode_latin1(content: &str) -> Vec<u8> {
    content
        .chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Greedy word wrap to at most `width` characters per line
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
