use comrak::{Arena, format_commonmark, format_html, options::Options, parse_document};

use super::DiagramEmbedder;
use crate::application::embed::types::{DiagramRenderer, EmbedError, EmbedSummary};

/// How a document is serialised once its diagrams are embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkdownOutput {
    #[default]
    CommonMark,
    Html,
}

/// A serialised document together with the counts of its embedding pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkdown {
    pub document: String,
    pub summary: EmbedSummary,
}

pub fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.full_info_string = true;
    // Embedded images carry data: URLs, which the safe renderer would blank out.
    render.r#unsafe = true;
}

impl<R: DiagramRenderer> DiagramEmbedder<R> {
    /// Parse `markdown`, embed its diagrams and serialise the result.
    pub async fn embed_markdown(
        &self,
        markdown: &str,
        output: MarkdownOutput,
    ) -> Result<RenderedMarkdown, EmbedError> {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);

        let summary = self.embed(&arena, root).await?;

        let mut document = String::new();
        let formatted = match output {
            MarkdownOutput::CommonMark => format_commonmark(root, &options, &mut document),
            MarkdownOutput::Html => format_html(root, &options, &mut document),
        };
        formatted.map_err(|err| EmbedError::Markdown {
            message: err.to_string(),
        })?;

        Ok(RenderedMarkdown { document, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::embed::{
        service::EmbedSettings,
        types::{RenderArguments, RenderError},
    };
    use async_trait::async_trait;
    use comrak::nodes::NodeValue;

    struct FixedImage;

    #[async_trait]
    impl DiagramRenderer for FixedImage {
        async fn render(&self, source: &str, _: &RenderArguments) -> Result<Vec<u8>, RenderError> {
            if source.trim().is_empty() {
                Err(RenderError::EmptyOutput)
            } else {
                Ok(b"abc".to_vec())
            }
        }
    }

    fn embedder() -> DiagramEmbedder<FixedImage> {
        DiagramEmbedder::with_renderer(EmbedSettings::default(), FixedImage)
    }

    #[tokio::test]
    async fn commonmark_output_links_a_data_url() {
        let rendered = embedder()
            .embed_markdown(
                "# Title\n\n```plantuml\nA -> B\n```\n",
                MarkdownOutput::CommonMark,
            )
            .await
            .expect("embed");

        assert!(rendered.document.starts_with("# Title"));
        assert!(
            rendered
                .document
                .contains("![PlantUML Diagram](data:image/png;base64,YWJj)"),
            "{}",
            rendered.document
        );
        assert!(!rendered.document.contains("```"));
        assert_eq!(rendered.summary.rendered, 1);
    }

    #[tokio::test]
    async fn html_output_keeps_the_data_url() {
        let rendered = embedder()
            .embed_markdown("```plantuml\nA -> B\n```\n", MarkdownOutput::Html)
            .await
            .expect("embed");

        assert!(
            rendered
                .document
                .contains(r#"<img src="data:image/png;base64,YWJj" alt="PlantUML Diagram" />"#),
            "{}",
            rendered.document
        );
    }

    #[tokio::test]
    async fn failed_diagrams_become_error_text() {
        let rendered = embedder()
            .embed_markdown(
                "before\n\n```plantuml\n```\n\nafter\n",
                MarkdownOutput::CommonMark,
            )
            .await
            .expect("embed");

        assert!(rendered.document.contains("before"));
        assert!(rendered.document.contains("after"));
        assert!(
            rendered
                .document
                .contains("Error rendering PlantUML: renderer produced no output")
        );
        assert_eq!(rendered.summary.failed, 1);
    }

    #[tokio::test]
    async fn documents_without_diagrams_round_trip() {
        let rendered = embedder()
            .embed_markdown(
                "plain *text*\n\n```rust\nfn main() {}\n```\n",
                MarkdownOutput::CommonMark,
            )
            .await
            .expect("embed");

        assert!(rendered.document.contains("```rust"));
        assert_eq!(rendered.summary, EmbedSummary::default());
    }

    #[tokio::test]
    async fn error_text_stays_a_separate_paragraph_after_reparsing() {
        let rendered = embedder()
            .embed_markdown(
                "before\n\n```plantuml\n```\n\n```plantuml\nA -> B\n```\n\nafter\n",
                MarkdownOutput::CommonMark,
            )
            .await
            .expect("embed");

        let arena = Arena::new();
        let reparsed = parse_document(&arena, &rendered.document, &default_options());
        let blocks: Vec<String> = reparsed
            .children()
            .map(|block| {
                assert!(
                    matches!(block.data.borrow().value, NodeValue::Paragraph),
                    "{}",
                    rendered.document
                );
                block
                    .children()
                    .map(|inline| match &inline.data.borrow().value {
                        NodeValue::Text(text) => text.to_string(),
                        NodeValue::Image(_) => "<image>".to_string(),
                        other => format!("{other:?}"),
                    })
                    .collect()
            })
            .collect();

        assert_eq!(
            blocks,
            [
                "before",
                "Error rendering PlantUML: renderer produced no output",
                "<image>",
                "after",
            ],
            "{}",
            rendered.document
        );
    }
}
