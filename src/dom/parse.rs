//! Lenient markup tokenizer for injected fragments.
//!
//! Fragments are injected verbatim, so the parser never fails: unmatched
//! close tags are dropped, unclosed elements close at end of input, and a
//! stray `<` that does not start a tag is kept as text.

/// A node of a parsed fragment, before it is attached to a document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<ParsedNode>,
    },
    Text(String),
}

struct Open {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<ParsedNode>,
}

/// Parse a markup fragment into a forest of nodes.
pub(crate) fn parse_fragment(markup: &str) -> Vec<ParsedNode> {
    let bytes = markup.as_bytes();
    let mut root: Vec<ParsedNode> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            i = find_subslice(bytes, i + 4, b"-->").map_or(bytes.len(), |end| end + 3);
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            i = find_byte(bytes, i, b'>').map_or(bytes.len(), |end| end + 1);
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(markup, i);
            i = next;
            if let Some(depth) = stack.iter().rposition(|open| open.tag == tag) {
                while stack.len() > depth {
                    close_top(&mut stack, &mut root);
                }
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (tag, attrs, self_closing, next) = parse_start_tag(markup, i);
            i = next;

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_end_tag(bytes, i, tag.as_bytes()).unwrap_or(bytes.len());
                let mut children = Vec::new();
                if let Some(body) = markup.get(i..close)
                    && !body.is_empty()
                {
                    children.push(ParsedNode::Text(body.to_string()));
                }
                push_node(
                    &mut stack,
                    &mut root,
                    ParsedNode::Element {
                        tag: tag.clone(),
                        attrs,
                        children,
                    },
                );
                i = if close < bytes.len() {
                    parse_end_tag(markup, close).1
                } else {
                    close
                };
                continue;
            }

            if self_closing || is_void_tag(&tag) {
                push_node(
                    &mut stack,
                    &mut root,
                    ParsedNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    },
                );
            } else {
                stack.push(Open {
                    tag,
                    attrs,
                    children: Vec::new(),
                });
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = markup.get(text_start..i) {
            push_node(
                &mut stack,
                &mut root,
                ParsedNode::Text(decode_entities(text)),
            );
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut root);
    }
    root
}

fn push_node(stack: &mut [Open], root: &mut Vec<ParsedNode>, node: ParsedNode) {
    let siblings = match stack.last_mut() {
        Some(open) => &mut open.children,
        None => root,
    };
    // Adjacent text runs (split by a stray `<`) collapse into one node.
    if let (Some(ParsedNode::Text(prev)), ParsedNode::Text(next)) = (siblings.last_mut(), &node) {
        prev.push_str(next);
        return;
    }
    siblings.push(node);
}

fn close_top(stack: &mut Vec<Open>, root: &mut Vec<ParsedNode>) {
    if let Some(open) = stack.pop() {
        let node = ParsedNode::Element {
            tag: open.tag,
            attrs: open.attrs,
            children: open.children,
        };
        push_node(stack, root, node);
    }
}

fn parse_start_tag(markup: &str, at: usize) -> (String, Vec<(String, String)>, bool, usize) {
    let bytes = markup.as_bytes();
    let mut i = at + 1;
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = markup
        .get(tag_start..i)
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            // Unknown byte inside a tag; skip it.
            i += 1;
            continue;
        }
        let name = markup
            .get(name_start..i)
            .unwrap_or_default()
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(markup, &mut i)
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    (tag, attrs, self_closing, i)
}

fn parse_attr_value(markup: &str, i: &mut usize) -> String {
    let bytes = markup.as_bytes();
    if *i >= bytes.len() {
        return String::new();
    }

    if bytes[*i] == b'"' || bytes[*i] == b'\'' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        let raw = markup.get(start..*i).unwrap_or_default();
        if *i < bytes.len() {
            *i += 1;
        }
        return decode_entities(raw);
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    decode_entities(markup.get(start..*i).unwrap_or_default())
}

fn parse_end_tag(markup: &str, at: usize) -> (String, usize) {
    let bytes = markup.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = markup
        .get(tag_start..i)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let next = find_byte(bytes, i, b'>').map_or(bytes.len(), |end| end + 1);
    (tag, next)
}

/// Decode the character references that show up in hand-written fragments
/// and in maud output.
fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .map(|(at, _)| at);
        let Some(semi) = semi else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        match decode_entity(entity) {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
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

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text content for serialization.
pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for a double-quoted serialization.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea")
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'@' | b'.')
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|p| p + from)
}

fn find_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while let Some(lt) = find_subslice(bytes, i, b"</") {
        let name_start = lt + 2;
        let matches_tag = bytes
            .get(name_start..name_start + tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag));
        if matches_tag {
            return Some(lt);
        }
        i = name_start;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &ParsedNode) -> (&str, &[(String, String)], &[ParsedNode]) {
        match node {
            ParsedNode::Element {
                tag,
                attrs,
                children,
            } => (tag.as_str(), attrs.as_slice(), children.as_slice()),
            ParsedNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parses_nested_elements_with_attributes() {
        let nodes = parse_fragment(r#"<div id="hero" class="a b"><p data-x='1'>Hi</p></div>"#);
        assert_eq!(nodes.len(), 1);
        let (tag, attrs, children) = element(&nodes[0]);
        assert_eq!(tag, "div");
        assert_eq!(attrs[0], ("id".to_string(), "hero".to_string()));
        assert_eq!(attrs[1], ("class".to_string(), "a b".to_string()));
        let (ptag, pattrs, ptext) = element(&children[0]);
        assert_eq!(ptag, "p");
        assert_eq!(pattrs[0].1, "1");
        assert_eq!(ptext[0], ParsedNode::Text("Hi".to_string()));
    }

    #[test]
    fn void_and_self_closing_tags_take_no_children() {
        let nodes = parse_fragment(r#"<img src="a.png"><br/><span>x</span>"#);
        assert_eq!(nodes.len(), 3);
        assert!(element(&nodes[0]).2.is_empty());
        assert!(element(&nodes[1]).2.is_empty());
    }

    #[test]
    fn unclosed_elements_close_at_end() {
        let nodes = parse_fragment("<section><div>text");
        let (_, _, children) = element(&nodes[0]);
        let (tag, _, grand) = element(&children[0]);
        assert_eq!(tag, "div");
        assert_eq!(grand[0], ParsedNode::Text("text".to_string()));
    }

    #[test]
    fn stray_close_tag_is_ignored() {
        let nodes = parse_fragment("<p>a</span>b</p>");
        let (_, _, children) = element(&nodes[0]);
        assert_eq!(children, &[ParsedNode::Text("ab".to_string())]);
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let nodes = parse_fragment("<!DOCTYPE html><!-- note --><main></main>");
        assert_eq!(nodes.len(), 1);
        assert_eq!(element(&nodes[0]).0, "main");
    }

    #[test]
    fn script_body_is_raw_text() {
        let nodes = parse_fragment("<script>if (a < b) { go(); }</script><p>after</p>");
        let (_, _, children) = element(&nodes[0]);
        assert_eq!(
            children[0],
            ParsedNode::Text("if (a < b) { go(); }".to_string())
        );
        assert_eq!(element(&nodes[1]).0, "p");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_fragment("1 < 2");
        assert_eq!(nodes, vec![ParsedNode::Text("1 < 2".to_string())]);
    }

    #[test]
    fn attribute_entities_are_decoded() {
        let nodes = parse_fragment(
            r#"<button data-product="{&quot;name&quot;:&quot;A &amp; B&quot;}"></button>"#,
        );
        let (_, attrs, _) = element(&nodes[0]);
        assert_eq!(attrs[0].1, r#"{"name":"A & B"}"#);
    }

    #[test]
    fn decode_numeric_and_named_entities() {
        assert_eq!(decode_entities("&#39;&#x27;&lt;&nbsp;"), "''<\u{a0}");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn escape_attr_quotes() {
        assert_eq!(escape_attr(r#"a"b<c>&"#), "a&quot;b&lt;c&gt;&amp;");
        assert_eq!(escape_text("a<b"), "a&lt;b");
    }
}
