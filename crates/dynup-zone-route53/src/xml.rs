//! Minimal XML helpers for the fixed response shapes Route 53 returns
//!
//! The API answers with small, flat documents whose leaf tags carry no
//! attributes, so simple tag scanning is sufficient; no general XML
//! parsing is attempted.

/// Text content of the first `<tag>…</tag>` occurrence
pub fn first_tag_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

/// Inner text of every `<tag>…</tag>` occurrence, in document order
pub fn tag_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let body_start = start + open.len();
        let Some(body_len) = rest[body_start..].find(&close) else {
            break;
        };
        blocks.push(&rest[body_start..body_start + body_len]);
        rest = &rest[body_start + body_len + close.len()..];
    }
    blocks
}

/// Escape text for inclusion in an XML element
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tag_text_finds_leaf() {
        let xml = "<Outer><Code>Throttling</Code><Message>slow down</Message></Outer>";
        assert_eq!(first_tag_text(xml, "Code"), Some("Throttling"));
        assert_eq!(first_tag_text(xml, "Message"), Some("slow down"));
        assert_eq!(first_tag_text(xml, "Missing"), None);
    }

    #[test]
    fn tag_blocks_in_order() {
        let xml = "<L><V>a</V><V>b</V></L><V>c</V>";
        assert_eq!(tag_blocks(xml, "V"), vec!["a", "b", "c"]);
        assert!(tag_blocks(xml, "X").is_empty());
    }

    #[test]
    fn unterminated_tag_stops_cleanly() {
        let xml = "<V>a</V><V>broken";
        assert_eq!(tag_blocks(xml, "V"), vec!["a"]);
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_text("a<b&c>"), "a&lt;b&amp;c&gt;");
        assert_eq!(escape_text("plain.name."), "plain.name.");
    }
}
