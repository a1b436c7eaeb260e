// src/pipeline/transforms/minify.rs

//! A conservative JavaScript minifier.
//!
//! Comments are removed, runs of whitespace collapse to a single space (or a
//! single newline if the run spanned lines, so automatic semicolon insertion
//! still sees the same line breaks), and spaces next to punctuation that can
//! never join with a neighbouring token are dropped. String, template and
//! regular-expression literals are copied untouched.

use anyhow::{Result, bail};

use crate::pipeline::transform::{OutputFile, SourceFile, Transform};

/// Minifies each script, keeping its name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minify;

impl Transform for Minify {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        let minified = minify_js(file.text()?)?;
        Ok(OutputFile::new(file.relative, minified))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    Space,
    Newline,
}

/// Characters that never need a separating space on either side.
const TIGHT: &str = "{}()[];,:=";

/// After one of these, a `/` starts a regular expression rather than a division.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

pub fn minify_js(source: &str) -> Result<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut gap: Option<Gap> = None;
    // One counter per enclosing `${ ... }`: braces opened inside it.
    let mut template_braces: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\n' => {
                gap = Some(Gap::Newline);
                i += 1;
            }
            c if c.is_whitespace() => {
                gap.get_or_insert(Gap::Space);
                i += 1;
            }
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let Some(end) = find_block_comment_end(&chars, i + 2) else {
                    bail!("unterminated block comment starting on line {}", line_of(&chars, i));
                };
                if chars[i..end].contains(&'\n') {
                    gap = Some(Gap::Newline);
                } else {
                    gap.get_or_insert(Gap::Space);
                }
                i = end;
            }
            '\'' | '"' => {
                let end = scan_string(&chars, i)?;
                flush_gap(&mut out, &mut gap, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '`' => {
                flush_gap(&mut out, &mut gap, c);
                out.push('`');
                let (end, closed) = scan_template_chunk(&chars, i + 1, i)?;
                out.extend(&chars[i + 1..end]);
                if !closed {
                    template_braces.push(0);
                }
                i = end;
            }
            '}' if template_braces.last() == Some(&0) => {
                template_braces.pop();
                flush_gap(&mut out, &mut gap, c);
                out.push('}');
                let (end, closed) = scan_template_chunk(&chars, i + 1, i)?;
                out.extend(&chars[i + 1..end]);
                if !closed {
                    template_braces.push(0);
                }
                i = end;
            }
            '/' if regex_allowed(&out) => {
                let end = scan_regex(&chars, i)?;
                flush_gap(&mut out, &mut gap, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                match c {
                    '{' => {
                        if let Some(depth) = template_braces.last_mut() {
                            *depth += 1;
                        }
                    }
                    '}' => {
                        if let Some(depth) = template_braces.last_mut() {
                            *depth -= 1;
                        }
                    }
                    _ => {}
                }
                flush_gap(&mut out, &mut gap, c);
                out.push(c);
                i += 1;
            }
        }
    }

    if !template_braces.is_empty() {
        bail!("unterminated template literal expression");
    }
    Ok(out)
}

/// Emit the pending whitespace, if it is still needed before `next`.
fn flush_gap(out: &mut String, gap: &mut Option<Gap>, next: char) {
    let Some(pending) = gap.take() else {
        return;
    };
    let Some(prev) = out.chars().last() else {
        return;
    };
    match pending {
        Gap::Newline => out.push('\n'),
        Gap::Space if TIGHT.contains(prev) || TIGHT.contains(next) => {}
        Gap::Space => out.push(' '),
    }
}

fn regex_allowed(out: &str) -> bool {
    let Some(prev) = out.chars().last() else {
        return true;
    };
    if REGEX_PRECEDERS.contains(prev) {
        return true;
    }
    if is_ident_char(prev) {
        let word: String = out
            .chars()
            .rev()
            .take_while(|c| is_ident_char(*c))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return REGEX_KEYWORDS.contains(&word.as_str());
    }
    false
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Index just past the closing `*/`.
fn find_block_comment_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1))
        .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
        .map(|j| j + 2)
}

/// Index just past the closing quote of the string starting at `start`.
fn scan_string(chars: &[char], start: usize) -> Result<usize> {
    let quote = chars[start];
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '\n' => break,
            c if c == quote => return Ok(j + 1),
            _ => j += 1,
        }
    }
    bail!("unterminated string literal on line {}", line_of(chars, start))
}

/// Scan template text from `from` up to the closing backtick (returns
/// `closed = true`) or up to and including the next `${` (`closed = false`).
fn scan_template_chunk(chars: &[char], from: usize, opened_at: usize) -> Result<(usize, bool)> {
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '`' => return Ok((j + 1, true)),
            '$' if chars.get(j + 1) == Some(&'{') => return Ok((j + 2, false)),
            _ => j += 1,
        }
    }
    bail!("unterminated template literal starting on line {}", line_of(chars, opened_at))
}

/// Index just past the flags of the regular expression starting at `start`.
fn scan_regex(chars: &[char], start: usize) -> Result<usize> {
    let mut j = start + 1;
    let mut in_class = false;
    loop {
        match chars.get(j) {
            None | Some('\n') => {
                bail!("unterminated regular expression on line {}", line_of(chars, start))
            }
            Some('\\') => j += 2,
            Some('[') => {
                in_class = true;
                j += 1;
            }
            Some(']') => {
                in_class = false;
                j += 1;
            }
            Some('/') if !in_class => {
                j += 1;
                break;
            }
            Some(_) => j += 1,
        }
    }
    while j < chars.len() && chars[j].is_ascii_alphabetic() {
        j += 1;
    }
    Ok(j)
}

fn line_of(chars: &[char], index: usize) -> usize {
    chars[..index.min(chars.len())]
        .iter()
        .filter(|c| **c == '\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_indentation() {
        let src = "// header\nfunction add(a, b) {\n    /* sum */\n    return a + b; // trailing\n}\n\n\nconst url = \"http://example.com\";\n";
        assert_eq!(
            minify_js(src).unwrap(),
            "function add(a,b){\nreturn a + b;\n}\nconst url=\"http://example.com\";"
        );
    }

    #[test]
    fn comment_markers_inside_strings_are_kept() {
        let src = "var s = '/* not */ // a comment';";
        assert_eq!(minify_js(src).unwrap(), "var s='/* not */ // a comment';");
    }

    #[test]
    fn template_literals_are_untouched() {
        let src = "const s = `a ${ {x: 1}.x } // not a comment`;";
        assert_eq!(minify_js(src).unwrap(), "const s=`a ${{x:1}.x} // not a comment`;");
    }

    #[test]
    fn regex_literals_versus_division() {
        let src = "const re = /\\/\\//g; // strip\nconst q = a / b / c;";
        assert_eq!(
            minify_js(src).unwrap(),
            "const re=/\\/\\//g;\nconst q=a / b / c;"
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = minify_js("let s = 'abc;\nfoo();").unwrap_err();
        assert!(err.to_string().contains("unterminated string literal on line 1"));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = minify_js("a();\n/* open").unwrap_err();
        assert!(err.to_string().contains("unterminated block comment starting on line 2"));
    }

    #[test]
    fn minify_transform_keeps_the_file_name() {
        let out = Minify
            .apply(SourceFile::new("scripts/app.js", "app.js", "let  x = 1;   // one"))
            .unwrap();
        assert_eq!(out, OutputFile::new("app.js", "let x=1;"));
    }
}
