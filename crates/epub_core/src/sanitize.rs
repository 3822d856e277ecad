//! Normalizes HTML fragments into strings that can be embedded in strict XML.
//!
//! The pipeline runs in a fixed order: forbidden characters are dropped, every
//! tag is re-emitted in normalized form (void closure and attribute quoting)
//! while open elements are tracked so that implied and missing end tags are
//! written and unmatched end tags dropped, and entity escaping runs last so
//! nothing it produces is touched again. `sanitize` is idempotent.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::dom::is_void_element;

/// Matches an ampersand together with the reference it may start.
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9]*;)?").unwrap()
});

/// HTML named entities that strict XML does not define, mapped to code points.
const NAMED_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("copy", 169),
    ("mdash", 8212),
    ("ndash", 8211),
    ("quot", 34),
    ("apos", 39),
    ("hellip", 8230),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("laquo", 171),
    ("raquo", 187),
    ("reg", 174),
    ("trade", 8482),
    ("middot", 183),
    ("bull", 8226),
    ("times", 215),
    ("euro", 8364),
    ("deg", 176),
    ("shy", 173),
    ("ensp", 8194),
    ("emsp", 8195),
    ("thinsp", 8201),
];

/// Sanitize an HTML fragment for inclusion in an XHTML document.
pub fn sanitize(fragment: &str) -> String {
    let cleaned: String = fragment.chars().filter(|c| !is_xml_forbidden(*c)).collect();
    let tagged = normalize_tags(&cleaned);
    escape_entities(&tagged)
}

/// Map named HTML entities to numeric references and escape every bare `&`.
///
/// `&amp;`, `&lt;`, `&gt;` and numeric references pass through unchanged.
pub fn escape_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let Some(reference) = caps.get(1).map(|m| m.as_str()) else {
                return "&amp;".to_string();
            };
            if let Some(number) = reference.strip_prefix('#') {
                return if numeric_reference_is_valid(number) {
                    format!("&{reference}")
                } else {
                    String::new()
                };
            }
            let name = &reference[..reference.len() - 1];
            match name {
                "amp" | "lt" | "gt" => format!("&{reference}"),
                _ => match NAMED_ENTITIES.iter().find(|(n, _)| *n == name) {
                    Some((_, code)) => format!("&#{code};"),
                    None => format!("&amp;{reference}"),
                },
            }
        })
        .into_owned()
}

fn numeric_reference_is_valid(number: &str) -> bool {
    let digits = number.trim_end_matches(';');
    let value = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse::<u32>(),
    };
    value
        .ok()
        .and_then(char::from_u32)
        .is_some_and(|c| !is_xml_forbidden(c))
}

pub(crate) fn is_xml_forbidden(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200d}' | '\u{feff}')
}

fn is_curly_quote(c: char) -> bool {
    matches!(c, '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{ff02}')
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn is_valid_attr_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => chars.all(is_tag_name_char),
        _ => false,
    }
}

/// Start tags that end an open element implicitly, as HTML parsers do:
/// `(opening tags, elements they end, elements that stop the search)`.
const IMPLIED_ENDS: &[(&[&str], &[&str], &[&str])] = &[
    (&["li"], &["li"], &["ul", "ol", "menu"]),
    (&["dt", "dd"], &["dt", "dd"], &["dl"]),
    (&["td", "th", "tr"], &["td", "th"], &["tr", "table"]),
    (&["tr"], &["tr"], &["table", "thead", "tbody", "tfoot"]),
    (&["option"], &["option"], &["select", "datalist"]),
    (
        &[
            "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
            "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
            "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
        ],
        &["p"],
        &["button", "caption", "table", "td", "th"],
    ),
];

enum Markup {
    /// Text, or nothing for dropped constructs.
    Verbatim(String),
    Start { name: String, html: String, closed: bool },
    End(String),
}

/// Stack of elements opened and not yet closed in the output.
#[derive(Debug, Default)]
struct OpenElements {
    names: Vec<String>,
}

impl OpenElements {
    fn start(&mut self, name: &str, closed: bool, out: &mut String) {
        for (openers, ended, boundaries) in IMPLIED_ENDS {
            if openers.contains(&name) {
                self.close_implied(ended, boundaries, out);
            }
        }
        if !closed {
            self.names.push(name.to_string());
        }
    }

    /// Close through the matching open element; an end tag with none is dropped.
    fn end(&mut self, name: &str, out: &mut String) {
        if let Some(index) = self.names.iter().rposition(|open| open == name) {
            self.close_from(index, out);
        }
    }

    fn close_implied(&mut self, ended: &[&str], boundaries: &[&str], out: &mut String) {
        for index in (0..self.names.len()).rev() {
            let open = self.names[index].as_str();
            if ended.contains(&open) {
                self.close_from(index, out);
                return;
            }
            if boundaries.contains(&open) {
                return;
            }
        }
    }

    fn close_from(&mut self, index: usize, out: &mut String) {
        while self.names.len() > index {
            if let Some(name) = self.names.pop() {
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }
}

fn normalize_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    let mut open = OpenElements::default();
    let mut rest = input;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match rewrite_markup(candidate) {
            Some((consumed, markup)) => {
                match markup {
                    Markup::Verbatim(text) => out.push_str(&text),
                    Markup::Start { name, html, closed } => {
                        open.start(&name, closed, &mut out);
                        out.push_str(&html);
                    }
                    Markup::End(name) => open.end(&name, &mut out),
                }
                rest = &candidate[consumed..];
            }
            None => {
                out.push_str("&lt;");
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    open.close_from(0, &mut out);
    out
}

/// Rewrite the markup construct at the start of `s` (which begins with `<`).
///
/// Returns the number of bytes consumed and the replacement, or `None` when the
/// `<` does not start a complete construct and must be escaped.
fn rewrite_markup(s: &str) -> Option<(usize, Markup)> {
    if let Some(body) = s.strip_prefix("<!--") {
        let end = body.find("-->")?;
        return Some((4 + end + 3, Markup::Verbatim(String::new())));
    }
    if let Some(body) = s.strip_prefix("<![CDATA[") {
        let end = body.find("]]>")?;
        let text = body[..end].replace('<', "&lt;").replace('>', "&gt;");
        return Some((9 + end + 3, Markup::Verbatim(text)));
    }
    if s.starts_with("<!") || s.starts_with("<?") {
        let end = s.find('>')?;
        return Some((end + 1, Markup::Verbatim(String::new())));
    }
    if let Some(body) = s.strip_prefix("</") {
        let name_len = body
            .find(|c: char| !is_tag_name_char(c))
            .unwrap_or(body.len());
        if name_len == 0 || !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let end = body[name_len..].find('>')?;
        let name = body[..name_len].to_ascii_lowercase();
        return Some((2 + name_len + end + 1, Markup::End(name)));
    }
    if s[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        let (consumed, tag) = read_start_tag(s)?;
        let markup = Markup::Start {
            html: tag.render(),
            closed: tag.is_closed(),
            name: tag.name,
        };
        return Some((consumed, markup));
    }
    None
}

#[derive(Debug)]
struct StartTag {
    name: String,
    attrs: Vec<(String, Option<String>)>,
    self_closing: bool,
}

impl StartTag {
    fn push_attr(&mut self, name: String, value: Option<String>) {
        if !is_valid_attr_name(&name) {
            return;
        }
        if self.attrs.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
            return;
        }
        self.attrs.push((name, value));
    }

    /// Void or self-closed: nothing follows that needs an end tag.
    fn is_closed(&self) -> bool {
        self.self_closing || is_void_element(&self.name)
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(16 + self.attrs.len() * 16);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            push_attr_value(value.as_deref().unwrap_or(name.as_str()), &mut out);
            out.push('"');
        }
        if self.is_closed() {
            out.push_str(" />");
        } else {
            out.push('>');
        }
        out
    }
}

fn push_attr_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if c.is_whitespace() && c != ' ' && c != '\u{a0}' => out.push(' '),
            c => out.push(c),
        }
    }
}

fn read_start_tag(s: &str) -> Option<(usize, StartTag)> {
    let mut chars = s.char_indices().peekable();
    chars.next();

    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_tag_name_char(c) {
            break;
        }
        name.push(c.to_ascii_lowercase());
        chars.next();
    }

    let mut tag = StartTag {
        name,
        attrs: Vec::new(),
        self_closing: false,
    };

    loop {
        skip_insignificant(&mut chars);
        let (index, c) = chars.next()?;
        match c {
            '>' => return Some((index + 1, tag)),
            '/' => {
                if matches!(chars.peek(), Some(&(_, '>'))) {
                    tag.self_closing = true;
                }
            }
            '=' | '"' | '\'' | '<' => {}
            c if is_curly_quote(c) => {}
            c => {
                let mut attr_name = String::new();
                attr_name.push(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace()
                        || matches!(next, '=' | '>' | '/' | '"' | '\'' | '<')
                        || is_curly_quote(next)
                    {
                        break;
                    }
                    chars.next();
                    if !is_zero_width(next) {
                        attr_name.push(next);
                    }
                }
                skip_insignificant(&mut chars);
                let value = if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    skip_insignificant(&mut chars);
                    Some(read_attr_value(&mut chars)?)
                } else {
                    None
                };
                tag.push_attr(attr_name, value);
            }
        }
    }
}

fn skip_insignificant(chars: &mut Peekable<CharIndices<'_>>) {
    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() || is_zero_width(c) {
            chars.next();
        } else {
            break;
        }
    }
}

/// Read a quoted, curly-quoted or unquoted attribute value.
fn read_attr_value(chars: &mut Peekable<CharIndices<'_>>) -> Option<String> {
    let mut value = String::new();
    match chars.peek().map(|&(_, c)| c) {
        None => None,
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                let (_, c) = chars.next()?;
                if c == quote {
                    return Some(value);
                }
                if !is_zero_width(c) {
                    value.push(c);
                }
            }
        }
        Some(c) if is_curly_quote(c) => {
            chars.next();
            loop {
                let (_, c) = chars.next()?;
                if c == '"' || is_curly_quote(c) {
                    return Some(value);
                }
                if !is_zero_width(c) {
                    value.push(c);
                }
            }
        }
        Some(_) => {
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() || c == '>' {
                    break;
                }
                chars.next();
                if !is_zero_width(c) {
                    value.push(c);
                }
            }
            Some(value)
        }
    }
}
