// ABOUTME: Pure XHTML to Markdown conversion for page bodies
// ABOUTME: Emits {{IMG:n}} placeholder tokens and records media references

use crate::model::{MediaReference, MediaStatus};
use scraper::{ElementRef, Html, Node};

pub struct Transformed {
    pub markdown: String,
    /// Image occurrences in emission order; `media[n]` owns token `{{IMG:n}}`.
    pub media: Vec<MediaReference>,
}

/// Convert a page body to Markdown. Pure: no I/O, no network identifiers in
/// the output text. Image tags point at placeholder tokens which the writer
/// substitutes once media resolution has happened.
pub fn transform(html: &str) -> Transformed {
    let doc = Html::parse_document(html);
    let mut renderer = Renderer::default();

    let root = doc.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body");
    match body {
        Some(body) => renderer.walk_blocks(body),
        None => renderer.walk_blocks(root),
    }

    let markdown = if renderer.blocks.is_empty() {
        String::new()
    } else {
        let mut text = renderer.blocks.join("\n\n");
        text.push('\n');
        text
    };

    Transformed {
        markdown,
        media: renderer.media,
    }
}

#[derive(Default)]
struct Renderer {
    blocks: Vec<String>,
    media: Vec<MediaReference>,
}

/// Non-content subtrees dropped outright.
fn is_non_content(tag: &str) -> bool {
    matches!(
        tag,
        "head" | "title" | "style" | "script" | "meta" | "link" | "noscript"
    )
}

/// Elements that interrupt inline flow and get rendered as blocks.
fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "p"
            | "div"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "pre"
            | "blockquote"
            | "hr"
            | "figure"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "main"
            | "form"
            | "object"
    )
}

impl Renderer {
    /// Render the children of a container, gathering loose inline runs into
    /// implicit paragraphs between block elements.
    fn walk_blocks(&mut self, el: ElementRef) {
        let mut inline = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(t) => inline.push_str(&collapse_text(&t.text)),
                Node::Element(_) => {
                    if let Some(ce) = ElementRef::wrap(child) {
                        let name = ce.value().name();
                        if is_non_content(name) {
                            continue;
                        }
                        if is_block(name) {
                            self.flush_paragraph(&mut inline);
                            self.render_block(ce);
                        } else {
                            inline.push_str(&self.render_inline(ce));
                        }
                    }
                }
                _ => {}
            }
        }
        self.flush_paragraph(&mut inline);
    }

    fn flush_paragraph(&mut self, inline: &mut String) {
        let text = tidy(inline);
        if !text.is_empty() {
            self.blocks.push(text);
        }
        inline.clear();
    }

    fn render_block(&mut self, el: ElementRef) {
        let name = el.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level: usize = name[1..].parse().unwrap_or(1);
                let text = tidy(&self.inline_children(el));
                if !text.is_empty() {
                    self.blocks
                        .push(format!("{} {}", "#".repeat(level), text.replace('\n', " ")));
                }
            }
            "p" | "li" => {
                // A stray li outside a list renders as a plain paragraph
                let mut inline = self.inline_children(el);
                self.flush_paragraph(&mut inline);
            }
            "div" | "section" | "article" | "header" | "footer" | "main" => {
                let has_block_child = el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .any(|c| is_block(c.value().name()));
                if has_block_child {
                    self.walk_blocks(el);
                } else {
                    let mut inline = self.inline_children(el);
                    self.flush_paragraph(&mut inline);
                }
            }
            "ul" | "ol" => {
                let mut lines = Vec::new();
                self.render_list(el, 0, &mut lines);
                if !lines.is_empty() {
                    self.blocks.push(lines.join("\n"));
                }
            }
            "table" => self.render_table(el),
            "pre" => {
                let raw: String = el.text().collect();
                let raw = raw.trim_matches('\n');
                self.blocks.push(format!("```\n{}\n```", raw));
            }
            _ => {
                // Unsupported: keep the plain text, visibly marked
                let text = tidy(&collapse_text(&el.text().collect::<String>()));
                let mut block = format!("<!-- unsupported element: {} -->", name);
                if !text.is_empty() {
                    block.push('\n');
                    block.push_str(&text);
                }
                self.blocks.push(block);
            }
        }
    }

    fn inline_children(&mut self, el: ElementRef) -> String {
        let mut out = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(t) => out.push_str(&collapse_text(&t.text)),
                Node::Element(_) => {
                    if let Some(ce) = ElementRef::wrap(child) {
                        out.push_str(&self.render_inline(ce));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn render_inline(&mut self, el: ElementRef) -> String {
        let name = el.value().name();
        if is_non_content(name) {
            return String::new();
        }
        match name {
            "br" => "\n".into(),
            "span" => self.inline_children(el),
            "b" | "strong" => {
                let inner = tidy(&self.inline_children(el));
                if inner.is_empty() {
                    String::new()
                } else {
                    format!("**{}**", inner)
                }
            }
            "i" | "em" => {
                let inner = tidy(&self.inline_children(el));
                if inner.is_empty() {
                    String::new()
                } else {
                    format!("*{}*", inner)
                }
            }
            "code" => {
                let inner: String = el.text().collect();
                format!("`{}`", inner.trim())
            }
            "a" => {
                let href = el.value().attr("href").unwrap_or("").to_string();
                let mut text = tidy(&self.inline_children(el));
                if text.is_empty() {
                    text = href.clone();
                }
                format!("[{}]({})", text, href)
            }
            "img" => self.record_image(el),
            _ => {
                let text = tidy(&collapse_text(&el.text().collect::<String>()));
                if text.is_empty() {
                    format!("<!-- unsupported element: {} -->", name)
                } else {
                    format!("<!-- unsupported element: {} --> {}", name, text)
                }
            }
        }
    }

    fn record_image(&mut self, el: ElementRef) -> String {
        let index = self.media.len();
        let src = el.value().attr("src").unwrap_or("").to_string();
        let alt = sanitize_alt(el.value().attr("alt").unwrap_or(""));
        let media = MediaReference {
            index,
            resource_id: extract_resource_id(&src),
            source_url: src,
            alt,
            status: MediaStatus::Pending,
        };
        let tag = media.tag();
        self.media.push(media);
        tag
    }

    fn render_list(&mut self, el: ElementRef, depth: usize, out: &mut Vec<String>) {
        let ordered = el.value().name() == "ol";
        let indent = "  ".repeat(depth);
        let mut position = 0usize;

        for li in el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li")
        {
            position += 1;
            let mut text = String::new();
            let mut nested = Vec::new();

            for child in li.children() {
                match child.value() {
                    Node::Text(t) => text.push_str(&collapse_text(&t.text)),
                    Node::Element(_) => {
                        if let Some(ce) = ElementRef::wrap(child) {
                            match ce.value().name() {
                                "ul" | "ol" => nested.push(ce),
                                "p" | "div" => {
                                    if !text.is_empty() {
                                        text.push(' ');
                                    }
                                    let inner = self.inline_children(ce);
                                    text.push_str(&inner);
                                }
                                _ => text.push_str(&self.render_inline(ce)),
                            }
                        }
                    }
                    _ => {}
                }
            }

            let marker = if ordered {
                format!("{}.", position)
            } else {
                "-".to_string()
            };
            out.push(format!(
                "{}{} {}",
                indent,
                marker,
                tidy(&text).replace('\n', " ")
            ));

            for list in nested {
                self.render_list(list, depth + 1, out);
            }
        }
    }

    fn render_table(&mut self, el: ElementRef) {
        let mut rows: Vec<Vec<String>> = Vec::new();
        self.collect_rows(el, &mut rows);
        if rows.is_empty() {
            return;
        }

        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let mut lines = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(columns, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                // First row acts as the header row
                lines.push(format!("|{}|", vec![" --- "; columns].join("|")));
            }
        }
        self.blocks.push(lines.join("\n"));
    }

    fn collect_rows(&mut self, el: ElementRef, rows: &mut Vec<Vec<String>>) {
        for child in el.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "tr" => {
                    let mut cells = Vec::new();
                    for cell in child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|c| matches!(c.value().name(), "td" | "th"))
                    {
                        let text = tidy(&self.inline_children(cell))
                            .replace('\n', " ")
                            .replace('|', "\\|");
                        cells.push(text);
                    }
                    rows.push(cells);
                }
                "thead" | "tbody" | "tfoot" => self.collect_rows(child, rows),
                _ => {}
            }
        }
    }
}

/// Collapse whitespace runs in a text node to single spaces.
fn collapse_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_ws {
                out.push(' ');
            }
            last_ws = true;
        } else {
            out.push(c);
            last_ws = false;
        }
    }
    out
}

/// Trim and squeeze an assembled inline run, preserving hard breaks.
fn tidy(s: &str) -> String {
    let lines: Vec<String> = s
        .split('\n')
        .map(|line| {
            let mut out = String::with_capacity(line.len());
            let mut last_space = false;
            for c in line.chars() {
                if c == ' ' {
                    if !last_space {
                        out.push(' ');
                    }
                    last_space = true;
                } else {
                    out.push(c);
                    last_space = false;
                }
            }
            out.trim().to_string()
        })
        .collect();
    lines.join("\n").trim_matches('\n').to_string()
}

/// Keep alt text locatable inside a Markdown image tag.
fn sanitize_alt(alt: &str) -> String {
    let cleaned: String = alt
        .chars()
        .map(|c| match c {
            '[' | ']' | '(' | ')' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect();
    tidy(&cleaned)
}

/// Pull the resource id out of a `.../resources/{id}/$value` media URL.
fn extract_resource_id(src: &str) -> Option<String> {
    let rest = src.split_once("/resources/")?.1;
    let id = rest.split('/').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}


#[cfg(test)]
mod media_tests {
    use super::*;
    use crate::model::MediaStatus;

    #[test]
    fn test_images_become_tokens_in_emission_order() {
        let html = concat!(
            r#"<p><img src="https://g.test/v1.0/me/onenote/resources/r-a/$value" alt="first"/></p>"#,
            r#"<p><img src="https://g.test/v1.0/me/onenote/resources/r-b/$value" alt="second"/></p>"#,
        );
        let out = transform(html);
        assert_eq!(out.media.len(), 2);
        assert_eq!(out.media[0].resource_id.as_deref(), Some("r-a"));
        assert_eq!(out.media[1].resource_id.as_deref(), Some("r-b"));
        assert!(out.media.iter().all(|m| m.status == MediaStatus::Pending));
        assert!(out.markdown.contains("![first]({{IMG:0}})"));
        assert!(out.markdown.contains("![second]({{IMG:1}})"));
        assert!(
            out.markdown.find("{{IMG:0}}").unwrap() < out.markdown.find("{{IMG:1}}").unwrap()
        );
    }

    #[test]
    fn test_alt_text_sanitized_for_relocation() {
        let html = r#"<p><img src="https://g.test/resources/r/$value" alt="shape [a](b)"/></p>"#;
        let out = transform(html);
        assert_eq!(out.media[0].alt, "shape a b");
        assert!(out.markdown.contains("![shape a b]({{IMG:0}})"));
    }

    #[test]
    fn test_resource_id_extraction() {
        assert_eq!(
            extract_resource_id("https://g.test/v1.0/me/onenote/resources/1-abc!2/$value"),
            Some("1-abc!2".into())
        );
        assert_eq!(extract_resource_id("https://g.test/media/other.png"), None);
        assert_eq!(extract_resource_id(""), None);
    }

    #[test]
    fn test_no_network_identifiers_in_markdown() {
        let html = r#"<p><img src="https://g.test/v1.0/me/onenote/resources/r-a/$value" alt="x"/></p>"#;
        let out = transform(html);
        assert!(!out.markdown.contains("r-a"));
        assert!(!out.markdown.contains("g.test"));
    }
}
