//! Parser for the controlled markup emitted by the report templates.
//!
//! This is not an HTML parser. It understands the handful of tags the
//! templates produce and turns them into a flat list of [`Block`]s:
//!
//! | Markup                          | Block                    |
//! |---------------------------------|--------------------------|
//! | `h1` `h2` `h3`                  | [`Block::Heading`]       |
//! | `p`, `div`, bare text           | [`Block::Paragraph`]     |
//! | `p class="caption"` etc.        | small paragraph          |
//! | `div class="banner"`            | [`Block::Banner`]        |
//! | `li`                            | [`Block::ListItem`]      |
//! | `tr` / `td`                     | [`Block::Row`]           |
//! | `hr`                            | [`Block::Rule`]          |
//! | `img`                           | [`Block::Image`]         |
//!
//! Inline `b`/`strong` set bold, a `span` carrying the redaction class marks
//! a redacted run, and `br` forces a line break. Anything inside `head`,
//! `style`, `script` or `title` is dropped. Unknown tags are ignored and
//! their text flows into the enclosing block.

/// One styled piece of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub redacted: bool,
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub head: bool,
    pub runs: Vec<Run>,
}

/// Paragraph flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Body,
    /// Captions, footers and control lines.
    Small,
}

/// A laid-out unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, runs: Vec<Run> },
    Paragraph { style: ParagraphStyle, runs: Vec<Run> },
    ListItem { runs: Vec<Run> },
    Row { cells: Vec<Cell> },
    /// Centered classification banner; `color` is a `#RRGGBB` hint.
    Banner { color: Option<String>, runs: Vec<Run> },
    Rule,
    Image { src: String, alt: String },
}

impl Block {
    /// Runs carried by the block, flattened across cells.
    pub fn runs(&self) -> Vec<&Run> {
        match self {
            Block::Heading { runs, .. }
            | Block::Paragraph { runs, .. }
            | Block::ListItem { runs }
            | Block::Banner { runs, .. } => runs.iter().collect(),
            Block::Row { cells } => cells.iter().flat_map(|c| c.runs.iter()).collect(),
            Block::Rule | Block::Image { .. } => Vec::new(),
        }
    }

    /// Plain text of the block, with redacted runs included.
    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }
}

const SKIPPED: &[&str] = &["head", "style", "script", "title"];
const SMALL_CLASSES: &[&str] = &["caption", "footer", "control", "legal"];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close(String),
}

/// Parse template output into blocks. `redaction_class` is the CSS class
/// that marks redacted spans.
pub fn parse(markup: &str, redaction_class: &str) -> Vec<Block> {
    let mut builder = Builder::new(redaction_class);
    for token in tokenize(markup) {
        builder.feed(token);
    }
    builder.finish()
}

#[derive(Debug)]
enum Pending {
    Heading(u8),
    Paragraph(ParagraphStyle),
    ListItem,
    Banner(Option<String>),
}

struct Builder<'a> {
    redaction_class: &'a str,
    blocks: Vec<Block>,
    pending: Option<(Pending, Vec<Run>)>,
    row: Option<Vec<Cell>>,
    cell: Option<Cell>,
    skip_depth: usize,
    bold_depth: usize,
    /// One entry per open `span`: whether it is a redaction span.
    spans: Vec<bool>,
}

impl<'a> Builder<'a> {
    fn new(redaction_class: &'a str) -> Self {
        Self {
            redaction_class,
            blocks: Vec::new(),
            pending: None,
            row: None,
            cell: None,
            skip_depth: 0,
            bold_depth: 0,
            spans: Vec::new(),
        }
    }

    fn redacted(&self) -> bool {
        self.spans.iter().any(|r| *r)
    }

    fn feed(&mut self, token: Token) {
        if self.skip_depth > 0 {
            match token {
                Token::Open { ref name, .. } if SKIPPED.contains(&name.as_str()) => {
                    self.skip_depth += 1
                }
                Token::Close(ref name) if SKIPPED.contains(&name.as_str()) => {
                    self.skip_depth -= 1
                }
                _ => {}
            }
            return;
        }

        match token {
            Token::Text(text) => self.push_text(&text),
            Token::Open { name, attrs } => self.open(&name, &attrs),
            Token::Close(name) => self.close(&name),
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        let class = attr(attrs, "class").unwrap_or_default();
        match name {
            n if SKIPPED.contains(&n) => self.skip_depth = 1,
            "h1" | "h2" | "h3" => {
                let level = name[1..].parse().unwrap_or(3);
                self.start(Pending::Heading(level));
            }
            "p" => {
                let style = if has_class(class, SMALL_CLASSES) {
                    ParagraphStyle::Small
                } else {
                    ParagraphStyle::Body
                };
                self.start(Pending::Paragraph(style));
            }
            "div" => {
                if has_class(class, &["banner"]) {
                    let color = attr(attrs, "data-color").map(str::to_string);
                    self.start(Pending::Banner(color));
                } else {
                    self.flush();
                }
            }
            "li" => self.start(Pending::ListItem),
            "tr" => {
                self.flush();
                self.row = Some(Vec::new());
            }
            "td" | "th" => {
                self.finish_cell();
                self.cell = Some(Cell {
                    head: name == "th" || has_class(class, &["head"]),
                    runs: Vec::new(),
                });
            }
            "br" => self.push_run("\n".to_string()),
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "img" => {
                self.flush();
                if let Some(src) = attr(attrs, "src").filter(|s| !s.trim().is_empty()) {
                    self.blocks.push(Block::Image {
                        src: src.to_string(),
                        alt: attr(attrs, "alt").unwrap_or_default().to_string(),
                    });
                }
            }
            "b" | "strong" => self.bold_depth += 1,
            "span" => {
                let redacted = class.split_whitespace().any(|c| c == self.redaction_class);
                self.spans.push(redacted);
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "p" | "li" | "div" | "table" | "ul" | "ol" | "body" => {
                self.flush()
            }
            "td" | "th" => self.finish_cell(),
            "tr" => self.flush(),
            "b" | "strong" => self.bold_depth = self.bold_depth.saturating_sub(1),
            "span" => {
                self.spans.pop();
            }
            _ => {}
        }
    }

    fn start(&mut self, kind: Pending) {
        self.flush();
        self.pending = Some((kind, Vec::new()));
    }

    fn push_text(&mut self, raw: &str) {
        let text = collapse_whitespace(&decode_entities(raw));
        if text.is_empty() {
            return;
        }
        let in_container = self.cell.is_some() || self.pending.is_some();
        if !in_container {
            if text.trim().is_empty() || self.row.is_some() {
                return;
            }
            self.pending = Some((Pending::Paragraph(ParagraphStyle::Body), Vec::new()));
        }
        self.push_run(text);
    }

    fn push_run(&mut self, text: String) {
        let bold = self.bold_depth > 0 || self.cell.as_ref().is_some_and(|c| c.head);
        let redacted = self.redacted();
        let runs = match (&mut self.cell, &mut self.pending) {
            (Some(cell), _) => &mut cell.runs,
            (None, Some((_, runs))) => runs,
            (None, None) => return,
        };
        match runs.last_mut() {
            Some(last) if last.bold == bold && last.redacted == redacted && text != "\n" && last.text != "\n" => {
                last.text.push_str(&text)
            }
            _ => runs.push(Run {
                text,
                bold,
                redacted,
            }),
        }
    }

    fn finish_cell(&mut self) {
        if let Some(mut cell) = self.cell.take() {
            trim_runs(&mut cell.runs);
            match self.row.as_mut() {
                Some(row) => row.push(cell),
                None => {
                    // A stray cell outside any row still prints.
                    if !cell.runs.is_empty() {
                        self.blocks.push(Block::Paragraph {
                            style: ParagraphStyle::Body,
                            runs: cell.runs,
                        });
                    }
                }
            }
        }
    }

    /// Close whatever block or row is open.
    fn flush(&mut self) {
        self.finish_cell();
        if let Some(cells) = self.row.take() {
            if cells.iter().any(|c| !c.runs.is_empty()) {
                self.blocks.push(Block::Row { cells });
            }
        }
        if let Some((kind, mut runs)) = self.pending.take() {
            trim_runs(&mut runs);
            if runs.is_empty() {
                return;
            }
            self.blocks.push(match kind {
                Pending::Heading(level) => Block::Heading { level, runs },
                Pending::Paragraph(style) => Block::Paragraph { style, runs },
                Pending::ListItem => Block::ListItem { runs },
                Pending::Banner(color) => Block::Banner { color, runs },
            });
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn has_class(class: &str, wanted: &[&str]) -> bool {
    class.split_whitespace().any(|c| wanted.contains(&c))
}

/// Drop leading and trailing whitespace across the run list.
fn trim_runs(runs: &mut Vec<Run>) {
    while let Some(first) = runs.first_mut() {
        let trimmed = first.text.trim_start_matches(' ').to_string();
        if trimmed.is_empty() {
            runs.remove(0);
        } else {
            first.text = trimmed;
            break;
        }
    }
    while let Some(last) = runs.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').to_string();
        if trimmed.is_empty() || trimmed == "\n" {
            runs.pop();
        } else {
            last.text = trimmed;
            break;
        }
    }
}

/// HTML whitespace rules: any run of whitespace becomes one space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(if c == '\u{a0}' { ' ' } else { c });
            in_space = false;
        }
    }
    out
}

/// Decode named and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = markup;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(rest.to_string()));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(rest[..lt].to_string()));
        }
        rest = &rest[lt..];

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }
        let Some(gt) = rest.find('>') else {
            tokens.push(Token::Text(rest.to_string()));
            break;
        };
        let inner = &rest[1..gt];
        rest = &rest[gt + 1..];

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::Close(name.trim().to_ascii_lowercase()));
            continue;
        }
        let inner = inner.trim_end_matches('/').trim();
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();
        if name.is_empty() {
            tokens.push(Token::Text(format!("<{inner}>")));
            continue;
        }
        tokens.push(Token::Open {
            name,
            attrs: parse_attrs(&inner[name_end..]),
        });
    }
    tokens
}

fn parse_attrs(mut rest: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = rest[..key_end].to_ascii_lowercase();
        rest = rest[key_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    rest = body.get(end + 1..).unwrap_or("");
                    &body[..end]
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    rest = &after_eq[end..];
                    &after_eq[..end]
                }
            }
        } else {
            ""
        };
        if !key.is_empty() {
            attrs.push((key, decode_entities(value)));
        }
    }
    attrs
}
