use std::num::NonZeroUsize;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use comrak::{
    Arena,
    nodes::{AstNode, NodeLink, NodeValue},
};
use futures::{StreamExt, stream};
use tracing::{error, warn};

use crate::application::embed::types::{
    DiagramRenderer, EmbedSummary, RenderArguments, RenderError, Substitution,
};
use crate::domain::options::OutputFormat;

/// Alternative text carried by every embedded diagram image.
pub const DIAGRAM_ALT_TEXT: &str = "PlantUML Diagram";

/// One eligible block found by the walk: its source and the slot it occupies.
///
/// Substitutions are strictly one-for-one, so `index` stays valid for the whole
/// pass no matter in which order renders finish.
#[derive(Debug)]
pub(crate) struct RenderRequest<'a> {
    pub(crate) source: String,
    pub(crate) parent: &'a AstNode<'a>,
    pub(crate) index: usize,
}

/// Read-only depth-first walk collecting every eligible block under `root`.
pub(crate) fn collect_requests<'a>(
    root: &'a AstNode<'a>,
    language: &str,
) -> Vec<RenderRequest<'a>> {
    let mut requests = Vec::new();
    visit_children(root, language, &mut requests);
    requests
}

fn visit_children<'a>(
    parent: &'a AstNode<'a>,
    language: &str,
    requests: &mut Vec<RenderRequest<'a>>,
) {
    for (index, child) in parent.children().enumerate() {
        match eligible_source(child, language) {
            Some(source) => requests.push(RenderRequest {
                source,
                parent,
                index,
            }),
            None => visit_children(child, language, requests),
        }
    }
}

fn eligible_source(node: &AstNode<'_>, language: &str) -> Option<String> {
    let data = node.data.borrow();
    let NodeValue::CodeBlock(block) = &data.value else {
        return None;
    };
    let tag = block.info.split_whitespace().next()?;
    tag.eq_ignore_ascii_case(language)
        .then(|| block.literal.clone())
}

/// Render every request through `renderer`, at most `limit` at a time, and
/// substitute each slot as soon as its own render resolves.
///
/// All renders are interleaved on the calling task. The returned future
/// completes only after every request has been substituted.
pub(crate) async fn render_requests<'a, R>(
    arena: &'a Arena<'a>,
    requests: Vec<RenderRequest<'a>>,
    renderer: &R,
    arguments: &RenderArguments,
    format: OutputFormat,
    limit: NonZeroUsize,
) -> EmbedSummary
where
    R: DiagramRenderer + ?Sized,
{
    let summary = EmbedSummary::discovered(requests.len());

    stream::iter(requests)
        .map(|request| async move {
            let outcome = renderer.render(&request.source, arguments).await;
            substitute(arena, &request, outcome, format)
        })
        .buffer_unordered(limit.get())
        .fold(summary, |summary, substitution| async move {
            summary.record(substitution)
        })
        .await
}

fn substitute<'a>(
    arena: &'a Arena<'a>,
    request: &RenderRequest<'a>,
    outcome: Result<Vec<u8>, RenderError>,
    format: OutputFormat,
) -> Substitution {
    let Some(target) = request.parent.children().nth(request.index) else {
        error!(
            target = "application::embed::transform",
            op = "transform::substitute",
            index = request.index,
            "Diagram slot vanished before substitution"
        );
        return Substitution::Error;
    };

    match outcome {
        Ok(image) => {
            replace_node(target, image_node(arena, format, &image));
            Substitution::Image
        }
        Err(err) => {
            warn!(
                target = "application::embed::transform",
                op = "transform::substitute",
                index = request.index,
                error = %err,
                "Diagram render failed; embedding error text"
            );
            replace_node(target, error_node(arena, &err));
            Substitution::Error
        }
    }
}

/// Swap `target` for `replacement` without changing its parent's child count.
fn replace_node<'a>(target: &'a AstNode<'a>, replacement: &'a AstNode<'a>) {
    target.insert_after(replacement);
    target.detach();
}

/// Build `data:<media-type>;base64,<payload>` for an embedded image.
pub(crate) fn data_uri(format: OutputFormat, image: &[u8]) -> String {
    format!("data:{};base64,{}", format.media_type(), BASE64.encode(image))
}

/// `Paragraph > Image > Text(alt)`: the image is inline content and needs a
/// paragraph to sit in a block container.
fn image_node<'a>(
    arena: &'a Arena<'a>,
    format: OutputFormat,
    image: &[u8],
) -> &'a AstNode<'a> {
    let link = NodeLink {
        url: data_uri(format, image),
        title: String::new(),
    };
    let paragraph = alloc_node(arena, NodeValue::Paragraph);
    let image = alloc_node(arena, NodeValue::Image(Box::new(link)));
    image.append(alloc_node(arena, NodeValue::Text(DIAGRAM_ALT_TEXT.into())));
    paragraph.append(image);
    paragraph
}

/// `Paragraph > Text(message)`, for the same reason as [`image_node`].
fn error_node<'a>(arena: &'a Arena<'a>, err: &RenderError) -> &'a AstNode<'a> {
    let message = format!("Error rendering PlantUML: {err}");
    let paragraph = alloc_node(arena, NodeValue::Paragraph);
    paragraph.append(alloc_node(arena, NodeValue::Text(message.into())));
    paragraph
}

fn alloc_node<'a>(arena: &'a Arena<'a>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::from(value))
}
