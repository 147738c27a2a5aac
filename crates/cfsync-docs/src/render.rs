//! Markdown to Confluence storage format.
//!
//! [`PageRenderer`] turns a page's markdown into XHTML storage markup. Local
//! images become attachment references and are collected for upload; links to
//! other local pages are rewritten to their remote URLs when a
//! [`LinkResolver`] can find them.

use std::fmt::Write;
use std::fs;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::debug;

use crate::error::DocsError;
use crate::nav::{NavPage, NavTree};

/// Maps a page title to the URL of its remote counterpart.
pub trait LinkResolver {
    /// Remote URL of the page titled `title`, if it exists.
    fn resolve(&self, title: &str) -> Option<String>;
}

/// Storage markup and the local files it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// XHTML storage-format body.
    pub body: String,
    /// Referenced local files, deduplicated in first-seen order.
    pub attachments: Vec<PathBuf>,
}

/// Renders nav pages against a source directory.
pub struct PageRenderer<'a> {
    tree: &'a NavTree,
    source_dir: &'a Path,
    links: Option<&'a dyn LinkResolver>,
}

impl<'a> PageRenderer<'a> {
    /// Create a renderer without link rewriting.
    #[must_use]
    pub fn new(tree: &'a NavTree, source_dir: &'a Path) -> Self {
        Self {
            tree,
            source_dir,
            links: None,
        }
    }

    /// Rewrite links to local pages using `links`.
    #[must_use]
    pub fn with_links(mut self, links: &'a dyn LinkResolver) -> Self {
        self.links = Some(links);
        self
    }

    /// Read and render a page.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::Io`] if the markdown file cannot be read.
    pub fn render(&self, page: &NavPage) -> Result<RenderedPage, DocsError> {
        let path = self.source_dir.join(&page.source);
        let markdown = fs::read_to_string(&path).map_err(|e| DocsError::io(&path, e))?;
        Ok(self.render_markdown(&page.source, &markdown))
    }

    /// Render markdown belonging to `source` (relative to the source directory).
    #[must_use]
    pub fn render_markdown(&self, source: &Path, markdown: &str) -> RenderedPage {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let page_dir = source.parent().unwrap_or(Path::new(""));
        let mut renderer = StorageRenderer::new(self, page_dir);
        for event in Parser::new_ext(markdown, options) {
            renderer.process_event(event);
        }
        RenderedPage {
            body: renderer.output,
            attachments: renderer.attachments,
        }
    }

    fn resolve_link(&self, page_dir: &Path, dest: &str) -> Option<String> {
        let links = self.links?;
        if dest.contains("://") {
            return None;
        }
        let path = dest.split('#').next().unwrap_or(dest);
        if !path.ends_with(".md") {
            return None;
        }
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let target = normalize(&page_dir.join(&*decoded));
        let title = self.tree.title_for(&target)?;
        let url = links.resolve(title);
        debug!(link = dest, title, resolved = url.is_some(), "Resolving page link");
        url
    }
}

/// Streams pulldown-cmark events into storage markup.
struct StorageRenderer<'r, 'a> {
    pages: &'r PageRenderer<'a>,
    page_dir: &'r Path,
    output: String,
    attachments: Vec<PathBuf>,
    in_code_block: bool,
    in_image: usize,
    in_table_head: bool,
}

impl<'r, 'a> StorageRenderer<'r, 'a> {
    fn new(pages: &'r PageRenderer<'a>, page_dir: &'r Path) -> Self {
        Self {
            pages,
            page_dir,
            output: String::with_capacity(4096),
            attachments: Vec::new(),
            in_code_block: false,
            in_image: 0,
            in_table_head: false,
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let _ = write!(self.output, "<code>{}</code>", escape_xml(&code));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.output.push_str(&html),
            Event::SoftBreak => self.output.push('\n'),
            Event::HardBreak => self.output.push_str("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.output.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                let _ = write!(self.output, "<h{}>", heading_level_to_num(level));
            }
            Tag::BlockQuote(_) => self.output.push_str(
                r#"<ac:structured-macro ac:name="info" ac:schema-version="1"><ac:rich-text-body>"#,
            ),
            Tag::CodeBlock(kind) => {
                self.in_code_block = true;
                self.output
                    .push_str(r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#);
                if let CodeBlockKind::Fenced(info) = kind
                    && let Some(lang) = info.split_whitespace().next()
                {
                    let _ = write!(
                        self.output,
                        r#"<ac:parameter ac:name="language">{}</ac:parameter>"#,
                        escape_xml(lang)
                    );
                }
                self.output.push_str("<ac:plain-text-body><![CDATA[");
            }
            Tag::List(Some(_)) => self.output.push_str("<ol>"),
            Tag::List(None) => self.output.push_str("<ul>"),
            Tag::Item => self.output.push_str("<li>"),
            Tag::Table(_) => self.output.push_str("<table><tbody>"),
            Tag::TableHead => {
                self.in_table_head = true;
                self.output.push_str("<tr>");
            }
            Tag::TableRow => self.output.push_str("<tr>"),
            Tag::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "<th>" } else { "<td>" });
            }
            Tag::Emphasis => self.output.push_str("<em>"),
            Tag::Strong => self.output.push_str("<strong>"),
            Tag::Strikethrough => self.output.push_str("<s>"),
            Tag::Superscript => self.output.push_str("<sup>"),
            Tag::Subscript => self.output.push_str("<sub>"),
            Tag::Link { dest_url, .. } => {
                let href = self
                    .pages
                    .resolve_link(self.page_dir, &dest_url)
                    .unwrap_or_else(|| dest_url.to_string());
                let _ = write!(self.output, r#"<a href="{}">"#, escape_xml(&href));
            }
            Tag::Image { dest_url, .. } => {
                self.in_image += 1;
                self.image(&dest_url);
            }
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                let _ = write!(self.output, "</h{}>", heading_level_to_num(level));
            }
            TagEnd::BlockQuote(_) => {
                self.output
                    .push_str("</ac:rich-text-body></ac:structured-macro>");
            }
            TagEnd::CodeBlock => {
                self.output
                    .push_str("]]></ac:plain-text-body></ac:structured-macro>");
                self.in_code_block = false;
            }
            TagEnd::List(true) => self.output.push_str("</ol>"),
            TagEnd::List(false) => self.output.push_str("</ul>"),
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.output.push_str("</tr>");
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" });
            }
            TagEnd::Emphasis => self.output.push_str("</em>"),
            TagEnd::Strong => self.output.push_str("</strong>"),
            TagEnd::Strikethrough => self.output.push_str("</s>"),
            TagEnd::Superscript => self.output.push_str("</sup>"),
            TagEnd::Subscript => self.output.push_str("</sub>"),
            TagEnd::Link => self.output.push_str("</a>"),
            TagEnd::Image => self.in_image = self.in_image.saturating_sub(1),
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_image > 0 {
            // Alt text has no place in the image macro.
            return;
        }
        if self.in_code_block {
            self.output.push_str(text);
        } else {
            self.output.push_str(&escape_xml(text));
        }
    }

    fn image(&mut self, dest: &str) {
        if dest.contains("://") || dest.starts_with("data:") {
            let _ = write!(
                self.output,
                r#"<ac:image><ri:url ri:value="{}" /></ac:image>"#,
                escape_xml(dest)
            );
            return;
        }

        let decoded = percent_decode_str(dest).decode_utf8_lossy();
        let relative = normalize(&self.page_dir.join(&*decoded));
        let filename = relative
            .file_name()
            .map_or_else(|| decoded.to_string(), |name| name.to_string_lossy().into_owned());
        let _ = write!(
            self.output,
            r#"<ac:image ac:height="350"><ri:attachment ri:filename="{}" /></ac:image>"#,
            escape_xml(&filename)
        );

        let path = self.pages.source_dir.join(relative);
        if !self.attachments.contains(&path) {
            self.attachments.push(path);
        }
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result
}

fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_yaml::Value;

    use super::*;

    struct StaticLinks(HashMap<&'static str, &'static str>);

    impl LinkResolver for StaticLinks {
        fn resolve(&self, title: &str) -> Option<String> {
            self.0.get(title).map(|url| (*url).to_owned())
        }
    }

    fn nav() -> NavTree {
        let config: Value = serde_yaml::from_str(
            "nav:\n  - Home: index.md\n  - Guide:\n      - Install: guide/install.md\n",
        )
        .unwrap();
        NavTree::from_config(&config, Path::new("/docs")).unwrap()
    }

    fn render(tree: &NavTree, source: &str, markdown: &str) -> RenderedPage {
        PageRenderer::new(tree, Path::new("/docs")).render_markdown(Path::new(source), markdown)
    }

    #[test]
    fn test_basic_markup() {
        let tree = nav();
        let page = render(&tree, "index.md", "# Title\n\nHello *world* & more");
        assert_eq!(
            page.body,
            "<h1>Title</h1><p>Hello <em>world</em> &amp; more</p>"
        );
        assert!(page.attachments.is_empty());
    }

    #[test]
    fn test_code_block_uses_code_macro() {
        let tree = nav();
        let page = render(&tree, "index.md", "```rust\nlet a = 1 < 2;\n```");
        assert!(page.body.contains(r#"ac:name="code""#));
        assert!(page.body.contains(r#"<ac:parameter ac:name="language">rust</ac:parameter>"#));
        assert!(page.body.contains("<![CDATA[let a = 1 < 2;\n]]>"));
    }

    #[test]
    fn test_local_image_becomes_attachment() {
        let tree = nav();
        let page = render(
            &tree,
            "guide/install.md",
            "![Flow chart](../img/flow.png)\n\n![again](../img/flow.png)",
        );
        assert_eq!(
            page.body,
            r#"<p><ac:image ac:height="350"><ri:attachment ri:filename="flow.png" /></ac:image></p><p><ac:image ac:height="350"><ri:attachment ri:filename="flow.png" /></ac:image></p>"#
        );
        assert_eq!(page.attachments, vec![PathBuf::from("/docs/img/flow.png")]);
    }

    #[test]
    fn test_encoded_image_path_is_decoded() {
        let tree = nav();
        let page = render(&tree, "index.md", "![shot](img/my%20pic.png)");
        assert!(page.body.contains(r#"ri:filename="my pic.png""#));
        assert_eq!(page.attachments, vec![PathBuf::from("/docs/img/my pic.png")]);
    }

    #[test]
    fn test_remote_image_is_not_attached() {
        let tree = nav();
        let page = render(&tree, "index.md", "![logo](https://example.com/logo.png)");
        assert!(page.body.contains(r#"<ri:url ri:value="https://example.com/logo.png" />"#));
        assert!(page.attachments.is_empty());
    }

    #[test]
    fn test_page_link_rewritten_when_resolved() {
        let tree = nav();
        let links = StaticLinks(HashMap::from([(
            "Install",
            "https://wiki.example.com/spaces/DOCS/pages/42",
        )]));
        let page = PageRenderer::new(&tree, Path::new("/docs"))
            .with_links(&links)
            .render_markdown(Path::new("index.md"), "[install](guide/install.md)");
        assert_eq!(
            page.body,
            r#"<p><a href="https://wiki.example.com/spaces/DOCS/pages/42">install</a></p>"#
        );
    }

    #[test]
    fn test_relative_page_link_resolved_from_page_dir() {
        let tree = nav();
        let links = StaticLinks(HashMap::from([("Home", "https://wiki/pages/1")]));
        let page = PageRenderer::new(&tree, Path::new("/docs"))
            .with_links(&links)
            .render_markdown(Path::new("guide/install.md"), "[home](../index.md#top)");
        assert!(page.body.contains(r#"href="https://wiki/pages/1""#));
    }

    #[test]
    fn test_unresolved_link_kept() {
        let tree = nav();
        let links = StaticLinks(HashMap::new());
        let page = PageRenderer::new(&tree, Path::new("/docs"))
            .with_links(&links)
            .render_markdown(Path::new("index.md"), "[x](guide/install.md) [y](other.md)");
        assert!(page.body.contains(r#"href="guide/install.md""#));
        assert!(page.body.contains(r#"href="other.md""#));
    }

    #[test]
    fn test_table_header_cells() {
        let tree = nav();
        let page = render(&tree, "index.md", "| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert_eq!(
            page.body,
            "<table><tbody><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_render_reads_source_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.md"), "# Home\n").unwrap();
        let tree = NavTree::default();
        let page = NavPage {
            title: "Home".to_owned(),
            source: PathBuf::from("index.md"),
            ancestors: vec![],
            depth: 0,
        };

        let rendered = PageRenderer::new(&tree, dir.path()).render(&page).unwrap();
        assert_eq!(rendered.body, "<h1>Home</h1>");

        let missing = NavPage {
            source: PathBuf::from("missing.md"),
            ..page
        };
        assert!(matches!(
            PageRenderer::new(&tree, dir.path()).render(&missing),
            Err(DocsError::Io { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("guide/../img/./a.png")), PathBuf::from("img/a.png"));
    }
}
