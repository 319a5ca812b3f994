pub trait TextEscaper: Send + Sync {
    fn escape_text(&self, raw: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEscaper;

impl TextEscaper for XmlEscaper {
    fn escape_text(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 8);
        for ch in raw.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(ch),
            }
        }
        out
    }
}

pub(crate) fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
