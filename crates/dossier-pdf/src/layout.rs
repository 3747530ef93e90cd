//! Monospace line breaking and pagination.
//!
//! Everything is set in Courier, whose glyphs are all 0.6 em wide in both
//! weights, so line breaking works in character cells and needs no font
//! metrics tables.

use crate::markup::{Block, Cell, ParagraphStyle, Run};

/// Glyph advance of Courier as a fraction of the font size.
pub const CHAR_WIDTH_EM: f32 = 0.6;
/// Baseline-to-baseline distance as a multiple of the font size.
pub const LEADING: f32 = 1.3;
/// Points per centimetre.
pub const PT_PER_CM: f32 = 72.0 / 2.54;
/// A4 in points.
pub const A4: (f32, f32) = (595.28, 841.89);

const CELL_PADDING: f32 = 4.0;
const LIST_INDENT_CHARS: usize = 2;

/// Printable area of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    pub fn a4(margins_cm: [f32; 4]) -> Self {
        let [top, bottom, left, right] = margins_cm;
        Self {
            width: A4.0,
            height: A4.1,
            margin_top: top * PT_PER_CM,
            margin_bottom: bottom * PT_PER_CM,
            margin_left: left * PT_PER_CM,
            margin_right: right * PT_PER_CM,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    fn top(&self) -> f32 {
        self.height - self.margin_top
    }
}

/// A drawing primitive in page coordinates (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    /// Opaque black bar covering a redacted run.
    Redaction { x: f32, y: f32, w: f32, h: f32 },
    /// Filled rectangle in an RGB colour.
    Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rgb: [f32; 3],
    },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// The `index`th image of the document.
    Image {
        index: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
}

impl Page {
    /// Number of redaction bars on the page.
    pub fn redaction_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, Item::Redaction { .. }))
            .count()
    }
}

/// One styled fragment of a broken line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
    pub redacted: bool,
}

impl Segment {
    fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

pub type Line = Vec<Segment>;

/// Greedy line breaking at `max_chars` cells per line.
///
/// Words longer than a line are split. A run whose text is `"\n"` forces a
/// break. Leading and trailing spaces are dropped from every line.
pub fn break_lines(runs: &[Run], max_chars: usize) -> Vec<Line> {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<Line> = Vec::new();
    let mut line: Line = Vec::new();
    let mut len = 0usize;

    fn push(line: &mut Line, text: &str, run: &Run) {
        match line.last_mut() {
            Some(last) if last.bold == run.bold && last.redacted == run.redacted => {
                last.text.push_str(text)
            }
            _ => line.push(Segment {
                text: text.to_string(),
                bold: run.bold,
                redacted: run.redacted,
            }),
        }
    }

    fn end_line(lines: &mut Vec<Line>, line: &mut Line, len: &mut usize) {
        if let Some(last) = line.last_mut() {
            let trimmed = last.text.trim_end_matches(' ').len();
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                line.pop();
            }
        }
        lines.push(std::mem::take(line));
        *len = 0;
    }

    for run in runs {
        if run.text == "\n" {
            end_line(&mut lines, &mut line, &mut len);
            continue;
        }
        for piece in split_keep_spaces(&run.text) {
            if piece == " " {
                if len == 0 {
                    continue;
                }
                if len + 1 > max_chars {
                    end_line(&mut lines, &mut line, &mut len);
                    continue;
                }
                push(&mut line, piece, run);
                len += 1;
                continue;
            }

            let mut word: Vec<char> = piece.chars().collect();
            if len > 0 && len + word.len() > max_chars {
                end_line(&mut lines, &mut line, &mut len);
            }
            while word.len() > max_chars - len {
                let rest = word.split_off(max_chars - len);
                let chunk: String = word.iter().collect();
                push(&mut line, &chunk, run);
                end_line(&mut lines, &mut line, &mut len);
                word = rest;
            }
            if !word.is_empty() {
                let chunk: String = word.iter().collect();
                push(&mut line, &chunk, run);
                len += word.len();
            }
        }
    }
    if !line.is_empty() {
        end_line(&mut lines, &mut line, &mut len);
    }
    lines
}

/// Split into words and single spaces, preserving order.
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == ' ' {
            if start < i {
                out.push(&text[start..i]);
            }
            out.push(" ");
            start = i + 1;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Places blocks onto pages.
pub struct LayoutEngine {
    geometry: PageGeometry,
    body_size: f32,
}

/// Image size in points, in document order.
pub type ImageSize = (f32, f32);

impl LayoutEngine {
    pub fn new(geometry: PageGeometry, body_size: f32) -> Self {
        Self {
            geometry,
            body_size,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Lay out `blocks`. `images` holds the size of every image block in
    /// order; images are scaled down to the content width if needed.
    pub fn layout(&self, blocks: &[Block], images: &[ImageSize]) -> Vec<Page> {
        let mut cursor = Cursor {
            geometry: self.geometry,
            pages: vec![Page::default()],
            y: self.geometry.top(),
        };
        let mut image_index = 0usize;
        let body = self.body_size;

        for block in blocks {
            match block {
                Block::Heading { level, runs } => {
                    let size = match level {
                        1 => body + 8.0,
                        2 => body + 4.0,
                        _ => body + 2.0,
                    };
                    cursor.space(size * 0.4);
                    let bold: Vec<Run> = runs
                        .iter()
                        .map(|r| Run {
                            bold: true,
                            ..r.clone()
                        })
                        .collect();
                    self.paragraph(&mut cursor, &bold, size, 0.0, false);
                    cursor.space(size * 0.2);
                }
                Block::Paragraph { style, runs } => {
                    let size = match style {
                        ParagraphStyle::Body => body,
                        ParagraphStyle::Small => (body - 2.0).max(6.0),
                    };
                    self.paragraph(&mut cursor, runs, size, 0.0, false);
                    cursor.space(size * 0.5);
                }
                Block::ListItem { runs } => {
                    let indent = LIST_INDENT_CHARS as f32 * body * CHAR_WIDTH_EM;
                    let mut bullet = vec![Run {
                        text: "- ".to_string(),
                        bold: false,
                        redacted: false,
                    }];
                    bullet.extend(runs.iter().cloned());
                    self.paragraph(&mut cursor, &bullet, body, indent, false);
                    cursor.space(body * 0.2);
                }
                Block::Banner { color, runs } => {
                    let size = body + 2.0;
                    let height = size * LEADING + CELL_PADDING * 2.0;
                    cursor.ensure(height);
                    let rgb = color.as_deref().and_then(parse_hex_color);
                    if let Some(rgb) = rgb {
                        cursor.push(Item::Fill {
                            x: self.geometry.margin_left,
                            y: cursor.y - height,
                            w: self.geometry.content_width(),
                            h: height,
                            rgb,
                        });
                    }
                    cursor.space(CELL_PADDING);
                    let bold: Vec<Run> = runs
                        .iter()
                        .map(|r| Run {
                            bold: true,
                            ..r.clone()
                        })
                        .collect();
                    self.paragraph(&mut cursor, &bold, size, 0.0, true);
                    cursor.space(CELL_PADDING + size * 0.5);
                }
                Block::Row { cells } => self.row(&mut cursor, cells),
                Block::Rule => {
                    cursor.ensure(body);
                    cursor.space(body * 0.4);
                    cursor.push(Item::Line {
                        x1: self.geometry.margin_left,
                        y1: cursor.y,
                        x2: self.geometry.width - self.geometry.margin_right,
                        y2: cursor.y,
                    });
                    cursor.space(body * 0.6);
                }
                Block::Image { .. } => {
                    let index = image_index;
                    image_index += 1;
                    let Some(&(w, h)) = images.get(index) else {
                        continue;
                    };
                    let max_w = self.geometry.content_width();
                    let max_h = self.geometry.top() - self.geometry.margin_bottom;
                    let scale = (max_w / w).min(max_h / h).min(1.0);
                    let (w, h) = (w * scale, h * scale);
                    cursor.ensure(h);
                    cursor.push(Item::Image {
                        index,
                        x: self.geometry.margin_left,
                        y: cursor.y - h,
                        w,
                        h,
                    });
                    cursor.space(h + body * 0.3);
                }
            }
        }
        cursor.pages
    }

    fn max_chars(&self, width: f32, size: f32) -> usize {
        (width / (size * CHAR_WIDTH_EM)).floor().max(1.0) as usize
    }

    fn paragraph(&self, cursor: &mut Cursor, runs: &[Run], size: f32, indent: f32, center: bool) {
        let width = self.geometry.content_width() - indent;
        for line in break_lines(runs, self.max_chars(width, size)) {
            let line_height = size * LEADING;
            cursor.ensure(line_height);
            let chars: usize = line.iter().map(Segment::chars).sum();
            let offset = if center {
                ((width - chars as f32 * size * CHAR_WIDTH_EM) / 2.0).max(0.0)
            } else {
                0.0
            };
            let baseline = cursor.y - size;
            draw_line(
                cursor,
                &line,
                self.geometry.margin_left + indent + offset,
                baseline,
                size,
            );
            cursor.y -= line_height;
        }
    }

    fn row(&self, cursor: &mut Cursor, cells: &[Cell]) {
        let size = self.body_size;
        let total = self.geometry.content_width();
        let widths: Vec<f32> = if cells.len() == 2 {
            vec![total * 0.3, total * 0.7]
        } else {
            vec![total / cells.len().max(1) as f32; cells.len()]
        };

        let broken: Vec<Vec<Line>> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| break_lines(&cell.runs, self.max_chars(w - CELL_PADDING * 2.0, size)))
            .collect();
        let line_count = broken.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let height = line_count as f32 * size * LEADING + CELL_PADDING;
        cursor.ensure(height);

        let mut x = self.geometry.margin_left;
        for (lines, w) in broken.iter().zip(&widths) {
            let mut y = cursor.y;
            for line in lines {
                draw_line(cursor, line, x + CELL_PADDING, y - size, size);
                y -= size * LEADING;
            }
            x += w;
        }
        cursor.y -= height;
        cursor.push(Item::Line {
            x1: self.geometry.margin_left,
            y1: cursor.y + CELL_PADDING / 2.0,
            x2: self.geometry.margin_left + total,
            y2: cursor.y + CELL_PADDING / 2.0,
        });
    }
}

struct Cursor {
    geometry: PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn push(&mut self, item: Item) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    /// Start a new page unless `height` still fits on this one.
    fn ensure(&mut self, height: f32) {
        let fresh = (self.y - self.geometry.top()).abs() < f32::EPSILON;
        if self.y - height < self.geometry.margin_bottom && !fresh {
            self.pages.push(Page::default());
            self.y = self.geometry.top();
        }
    }

    fn space(&mut self, amount: f32) {
        self.y -= amount;
    }
}

fn draw_line(cursor: &mut Cursor, line: &Line, mut x: f32, baseline: f32, size: f32) {
    for segment in line {
        let w = segment.chars() as f32 * size * CHAR_WIDTH_EM;
        if segment.redacted {
            cursor.push(Item::Redaction {
                x,
                y: baseline - size * 0.22,
                w,
                h: size * 0.95,
            });
        } else if !segment.text.trim().is_empty() {
            cursor.push(Item::Text {
                x,
                y: baseline,
                size,
                bold: segment.bold,
                text: segment.text.clone(),
            });
        }
        x += w;
    }
}

/// `#RRGGBB` to unit RGB.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;

    fn run(text: &str, redacted: bool) -> Run {
        Run {
            text: text.to_string(),
            bold: false,
            redacted,
        }
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.iter().map(|s| s.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_break_lines_greedy() {
        let lines = break_lines(&[run("the quick brown fox jumps", false)], 10);
        assert_eq!(texts(&lines), vec!["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().flatten().all(|s| s.chars() <= 10));
    }

    #[test]
    fn test_break_lines_splits_long_words() {
        let lines = break_lines(&[run("abcdefghijkl", false)], 5);
        assert_eq!(texts(&lines), vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_break_lines_keeps_redaction_flag() {
        let lines = break_lines(&[run("seen in ", false), run("Berlin", true)], 40);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][1].text, "Berlin");
        assert!(lines[0][1].redacted);
    }

    #[test]
    fn test_forced_break() {
        let lines = break_lines(&[run("a", false), run("\n", false), run("b", false)], 40);
        assert_eq!(texts(&lines), vec!["a", "b"]);
    }

    #[test]
    fn test_redacted_text_is_never_drawn() {
        let blocks = markup::parse(
            r#"<p>Last seen in <span class="redacted">Berlin</span></p>"#,
            "redacted",
        );
        let engine = LayoutEngine::new(PageGeometry::a4([1.5; 4]), 10.0);
        let pages = engine.layout(&blocks, &[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].redaction_count(), 1);
        let drawn: String = pages[0]
            .items
            .iter()
            .filter_map(|i| match i {
                Item::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(drawn.contains("Last seen in"));
        assert!(!drawn.contains("Berlin"));
        let Some(Item::Redaction { w, .. }) = pages[0]
            .items
            .iter()
            .find(|i| matches!(i, Item::Redaction { .. }))
        else {
            panic!("no redaction bar");
        };
        assert!((w - 6.0 * 10.0 * CHAR_WIDTH_EM).abs() < 0.01);
    }

    #[test]
    fn test_paginates_long_documents() {
        let blocks: Vec<Block> = (0..200)
            .map(|i| Block::Paragraph {
                style: ParagraphStyle::Body,
                runs: vec![run(&format!("Paragraph {i}"), false)],
            })
            .collect();
        let geometry = PageGeometry::a4([1.5; 4]);
        let pages = LayoutEngine::new(geometry, 10.0).layout(&blocks, &[]);
        assert!(pages.len() > 1);
        for page in &pages {
            for item in &page.items {
                if let Item::Text { y, .. } = item {
                    assert!(*y >= geometry.margin_bottom - 10.0);
                    assert!(*y <= geometry.height - geometry.margin_top);
                }
            }
        }
    }

    #[test]
    fn test_images_scale_to_content_width() {
        let blocks = vec![Block::Image {
            src: "x.jpg".to_string(),
            alt: String::new(),
        }];
        let geometry = PageGeometry::a4([1.5; 4]);
        let pages = LayoutEngine::new(geometry, 10.0).layout(&blocks, &[(2000.0, 1000.0)]);
        let Some(Item::Image { w, h, .. }) = pages[0].items.first() else {
            panic!("no image item");
        };
        assert!((w - geometry.content_width()).abs() < 0.01);
        assert!((w / h - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), Some([1.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }
}
