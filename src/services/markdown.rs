use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Converts raw markdown to the markup a front-end displays.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, raw: &str) -> String;
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Markdown to HTML, for web-view front-ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkdown;

impl MarkdownRenderer for HtmlMarkdown {
    fn render(&self, raw: &str) -> String {
        let parser = Parser::new_ext(raw, parser_options());
        let mut out = String::with_capacity(raw.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Markdown to plain text laid out for a terminal: headings underlined,
/// bullets, indented code blocks, images kept as raw markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMarkdown;

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, raw: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut in_code_block = false;
        let mut heading: Option<HeadingLevel> = None;
        let mut list_depth = 0usize;
        let mut ordered: Vec<Option<u64>> = Vec::new();
        let mut link_url: Option<String> = None;
        let mut image: Option<(String, String)> = None;

        for event in Parser::new_ext(raw, parser_options()) {
            match event {
                Event::Start(tag) => match tag {
                    Tag::Heading { level, .. } => {
                        flush(&mut current, &mut lines);
                        if !lines.is_empty() {
                            lines.push(String::new());
                        }
                        heading = Some(level);
                    }
                    Tag::Paragraph => {
                        flush(&mut current, &mut lines);
                        if !lines.is_empty() && list_depth == 0 {
                            lines.push(String::new());
                        }
                    }
                    Tag::CodeBlock(kind) => {
                        flush(&mut current, &mut lines);
                        if let CodeBlockKind::Fenced(lang) = kind {
                            if !lang.is_empty() {
                                lines.push(format!("  [{}]", lang));
                            }
                        }
                        in_code_block = true;
                    }
                    Tag::List(start) => {
                        flush(&mut current, &mut lines);
                        list_depth += 1;
                        ordered.push(start);
                    }
                    Tag::Item => {
                        flush(&mut current, &mut lines);
                        let indent = "  ".repeat(list_depth.saturating_sub(1));
                        let marker = match ordered.last_mut() {
                            Some(Some(n)) => {
                                let marker = format!("{}. ", n);
                                *n += 1;
                                marker
                            }
                            _ => format!("{} ", crate::icons::BULLET),
                        };
                        current.push_str(&indent);
                        current.push_str(&marker);
                    }
                    Tag::Link { dest_url, .. } => {
                        link_url = Some(dest_url.to_string());
                    }
                    Tag::Image { dest_url, .. } => {
                        image = Some((String::new(), dest_url.to_string()));
                    }
                    _ => {}
                },
                Event::End(tag_end) => match tag_end {
                    TagEnd::Heading(_) => {
                        let text = std::mem::take(&mut current);
                        let underline = match heading.take() {
                            Some(HeadingLevel::H1) => Some('='),
                            Some(HeadingLevel::H2) => Some('-'),
                            _ => None,
                        };
                        let width = text.chars().count();
                        lines.push(text);
                        if let Some(ch) = underline {
                            lines.push(ch.to_string().repeat(width));
                        }
                    }
                    TagEnd::Paragraph | TagEnd::Item => flush(&mut current, &mut lines),
                    TagEnd::CodeBlock => in_code_block = false,
                    TagEnd::List(_) => {
                        flush(&mut current, &mut lines);
                        list_depth = list_depth.saturating_sub(1);
                        ordered.pop();
                    }
                    TagEnd::Link => {
                        if let Some(url) = link_url.take() {
                            if !current.ends_with(&url) {
                                current.push_str(&format!(" <{}>", url));
                            }
                        }
                    }
                    TagEnd::Image => {
                        if let Some((alt, url)) = image.take() {
                            current.push_str(&format!("![{}]({})", alt, url));
                        }
                    }
                    _ => {}
                },
                Event::Text(text) => {
                    if let Some((alt, _)) = image.as_mut() {
                        alt.push_str(&text);
                    } else if in_code_block {
                        for line in text.lines() {
                            lines.push(format!("    {}", line));
                        }
                    } else {
                        current.push_str(&text);
                    }
                }
                Event::Code(code) => {
                    current.push('`');
                    current.push_str(&code);
                    current.push('`');
                }
                Event::SoftBreak => current.push(' '),
                Event::HardBreak => flush(&mut current, &mut lines),
                Event::Rule => {
                    flush(&mut current, &mut lines);
                    lines.push(crate::icons::SEPARATOR_CHAR.repeat(8));
                }
                Event::TaskListMarker(done) => {
                    current.push_str(if done { "[x] " } else { "[ ] " });
                }
                Event::Html(html) | Event::InlineHtml(html) => current.push_str(html.trim()),
                _ => {}
            }
        }

        flush(&mut current, &mut lines);
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

fn flush(current: &mut String, lines: &mut Vec<String>) {
    if !current.trim().is_empty() {
        lines.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_renderer_produces_markup() {
        let html = HtmlMarkdown.render("Fixes **everything**");
        assert_eq!(html.trim(), "<p>Fixes <strong>everything</strong></p>");
    }

    #[test]
    fn terminal_renderer_lays_out_blocks() {
        let text = TerminalMarkdown.render(
            "# Title\n\nSome *text* with `code`.\n\n- one\n- two\n\n1. first\n2. second\n\n```rust\nfn main() {}\n```",
        );
        let expected = [
            "Title",
            "=====",
            "",
            "Some text with `code`.",
            "• one",
            "• two",
            "1. first",
            "2. second",
            "  [rust]",
            "    fn main() {}",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn terminal_renderer_keeps_link_targets_and_images() {
        let text = TerminalMarkdown.render("See [docs](https://d.io) and ![shot](https://i/x.png)");
        assert_eq!(text, "See docs <https://d.io> and ![shot](https://i/x.png)");
    }

    #[test]
    fn autolinks_are_not_duplicated() {
        let text = TerminalMarkdown.render("<https://d.io>");
        assert_eq!(text, "https://d.io");
    }
}
