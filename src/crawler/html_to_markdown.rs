use log::trace;
use scraper::node::Node;
use scraper::Html;

use super::errors::RenderError;
use super::outcome::MarkdownGenerationResult;

/// Elements whose content never reaches the Markdown output.
const NON_CONTENT_TAGS: [&str; 6] = ["head", "script", "style", "noscript", "template", "svg"];

/// Strategy that turns rendered page HTML into Markdown.
pub trait MarkdownGenerator: Send + Sync {
    fn generate(&self, html: &str) -> Result<MarkdownGenerationResult, RenderError>;
}

/// No custom extraction rules: the whole document body is converted.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMarkdownGenerator;

impl MarkdownGenerator for DefaultMarkdownGenerator {
    fn generate(&self, html: &str) -> Result<MarkdownGenerationResult, RenderError> {
        if html.trim().is_empty() {
            return Err(RenderError::EmptyContent);
        }
        Ok(MarkdownGenerationResult::raw(html_to_markdown(html)))
    }
}

pub fn html_to_markdown(html: &str) -> String {
    let content = strip_non_content(html);
    let markdown = html2md::parse_html(&content);

    let trimmed = markdown.trim();
    trace!(
        "converted {} bytes of HTML into {} bytes of Markdown",
        html.len(),
        trimmed.len()
    );
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

/// Detaches head, script and other non-content subtrees, returning the remaining document.
fn strip_non_content(html: &str) -> String {
    let mut document = Html::parse_document(html);

    let skipped: Vec<_> = document
        .tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Element(element) => NON_CONTENT_TAGS.contains(&element.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    for id in skipped {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.root_element().html()
}
