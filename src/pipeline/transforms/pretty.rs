// src/pipeline/transforms/pretty.rs

//! Re-indentation of rendered pages.
//!
//! Block elements get a line of their own, indented two spaces per level.
//! A block whose content is only text and inline elements stays on one line.
//! `pre`, `textarea`, `script` and `style` bodies are copied untouched.

const INDENT: &str = "  ";

const INLINE: &[&str] = &[
    "a", "abbr", "b", "br", "cite", "code", "del", "em", "i", "img", "kbd", "mark", "q", "s", "small",
    "span", "strong", "sub", "sup", "u",
];

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW: &[&str] = &["pre", "textarea", "script", "style"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Open { name: &'a str, src: &'a str },
    Close { name: &'a str, src: &'a str },
    Void { name: &'a str, src: &'a str },
    /// Comments, doctypes and processing instructions.
    Markup(&'a str),
    /// A whole raw-text element, open tag to close tag.
    Raw(&'a str),
}

impl<'a> Token<'a> {
    fn src(&self) -> &'a str {
        match *self {
            Token::Text(src) | Token::Markup(src) | Token::Raw(src) => src,
            Token::Open { src, .. } | Token::Close { src, .. } | Token::Void { src, .. } => src,
        }
    }

    fn is_inline(&self) -> bool {
        match *self {
            Token::Text(_) => true,
            Token::Open { name, .. } | Token::Close { name, .. } | Token::Void { name, .. } => {
                listed(INLINE, name)
            }
            Token::Markup(_) | Token::Raw(_) => false,
        }
    }
}

fn listed(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// Pretty-print an HTML document or fragment.
pub fn pretty_html(html: &str) -> String {
    let tokens = tokenize(html);
    let mut printer = Printer::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        i += 1;

        if token.is_inline() {
            printer.pending.push_str(token.src());
            continue;
        }

        printer.flush();
        match token {
            Token::Open { name, src } => match single_line(&tokens[i..], name) {
                Some((inner, close, used)) => {
                    printer.line(&format!("{src}{}{close}", inner.trim()));
                    i += used;
                }
                None => {
                    printer.line(src);
                    printer.depth += 1;
                }
            },
            Token::Close { src, .. } => {
                printer.depth = printer.depth.saturating_sub(1);
                printer.line(src);
            }
            other => printer.line(other.src()),
        }
    }

    printer.finish()
}

/// If `rest` is inline content followed by the close tag for `name`, with no
/// line break inside, return that content, the close tag and the token count.
fn single_line<'a>(rest: &[Token<'a>], name: &str) -> Option<(String, &'a str, usize)> {
    let mut inner = String::new();
    for (n, token) in rest.iter().enumerate() {
        match *token {
            Token::Close { name: closing, src } if closing.eq_ignore_ascii_case(name) => {
                if inner.trim().contains('\n') {
                    return None;
                }
                return Some((inner, src, n + 1));
            }
            _ if !token.is_inline() => return None,
            _ => inner.push_str(token.src()),
        }
    }
    None
}

#[derive(Default)]
struct Printer {
    out: String,
    pending: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for text in pending.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.line(text);
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        let len = self.out.trim_end_matches('\n').len();
        self.out.truncate(len);
        self.out
    }
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let lt = pos + offset;
        let Some((token, end)) = tag_at(html, lt) else {
            pos = lt + 1;
            continue;
        };
        if text_start < lt {
            tokens.push(Token::Text(&html[text_start..lt]));
        }
        tokens.push(token);
        pos = end;
        text_start = end;
    }

    if text_start < html.len() {
        tokens.push(Token::Text(&html[text_start..]));
    }
    tokens
}

/// Read the tag starting at byte `lt`. A `<` that does not start a tag is text.
fn tag_at(html: &str, lt: usize) -> Option<(Token<'_>, usize)> {
    let rest = &html[lt..];
    if rest.starts_with("<!--") {
        let end = rest.find("-->").map_or(html.len(), |i| lt + i + 3);
        return Some((Token::Markup(&html[lt..end]), end));
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        let end = tag_end(html, lt + 2).unwrap_or(html.len());
        return Some((Token::Markup(&html[lt..end]), end));
    }

    let closing = rest.starts_with("</");
    let name_start = if closing { lt + 2 } else { lt + 1 };
    let after = &html[name_start..];
    if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(after.len());
    let name = &after[..name_len];
    let end = tag_end(html, name_start + name_len)?;
    let src = &html[lt..end];

    if closing {
        return Some((Token::Close { name, src }, end));
    }
    if listed(VOID, name) || src.ends_with("/>") {
        return Some((Token::Void { name, src }, end));
    }
    if listed(RAW, name) {
        let needle = format!("</{}", name.to_ascii_lowercase());
        let body_end = match html[end..].to_ascii_lowercase().find(&needle) {
            Some(i) => tag_end(html, end + i + needle.len()).unwrap_or(html.len()),
            None => html.len(),
        };
        return Some((Token::Raw(&html[lt..body_end]), body_end));
    }
    Some((Token::Open { name, src }, end))
}

/// Byte index just past the `>` closing a tag, skipping quoted attribute values.
fn tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in html[from..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(from + i + 1),
            None => {}
        }
    }
    None
}
