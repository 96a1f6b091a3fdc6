//! # Clipboard
//!
//! Copy/paste of objects between documents. A payload is the full source
//! text a copy was taken from plus the span of every copied object; pasting
//! re-parses each span and builds fresh nodes, so the payload needs no
//! schema beyond the markup itself.

use crate::errors::{EditorError, EditorResult};
use crate::merger::build_subtree;
use crate::model::{Model, NodeId};
use crate::rewriter::Rewriter;
use mosaic_common::{find_object_at, TextLocation};
use mosaic_parser::ast::{Member, ObjectDef};
use mosaic_parser::parse;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub spans: Vec<TextLocation>,
    pub source: String,
}

impl ClipboardPayload {
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        let payload: Self = serde_json::from_str(json)?;
        if let Some(span) = payload.spans.iter().find(|span| span.slice(&payload.source).is_none()) {
            return Err(EditorError::Clipboard(format!(
                "span {}..{} is outside the copied text",
                span.offset,
                span.end()
            )));
        }
        Ok(payload)
    }

    /// Copied object texts, in copy order
    pub fn snippets(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().filter_map(|span| span.slice(&self.source))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Capture the text of `nodes` as it currently reads in `rewriter`
pub fn copy_nodes(rewriter: &Rewriter, nodes: &[NodeId]) -> EditorResult<ClipboardPayload> {
    let document = parse(rewriter.text())?;
    let spans = nodes
        .iter()
        .map(|node| {
            rewriter
                .node_offset(*node)
                .and_then(|offset| find_object_at(&document, offset))
                .map(|object| TextLocation::new(object.span.start, object.span.len()))
                .ok_or_else(|| EditorError::Clipboard(format!("node {} is not in the text", node)))
        })
        .collect::<EditorResult<Vec<_>>>()?;

    debug!(nodes = spans.len(), "Copied nodes");
    Ok(ClipboardPayload {
        spans,
        source: rewriter.text().to_string(),
    })
}

/// Append the payload's objects to the list property `owner.property`.
/// Ids already used in the target document are dropped.
pub fn paste(
    rewriter: &mut Rewriter,
    payload: &ClipboardPayload,
    owner: NodeId,
    property: &str,
) -> EditorResult<Vec<NodeId>> {
    let mut objects = Vec::with_capacity(payload.len());
    for span in &payload.spans {
        let snippet = span
            .slice(&payload.source)
            .ok_or_else(|| EditorError::Clipboard("span is outside the copied text".to_string()))?;
        objects.push(parse(snippet)?.root);
    }

    let mut seen = HashSet::new();
    for object in &mut objects {
        drop_taken_ids(object, rewriter.model(), &mut seen);
    }

    let nodes = rewriter.mutate(|editor| {
        let mut nodes = Vec::with_capacity(objects.len());
        for object in &objects {
            let node = build_subtree(editor, object, false)?;
            let index = editor.nodes_in(owner, property).len();
            editor.insert_child(owner, property, index, node)?;
            nodes.push(node);
        }
        Ok(nodes)
    })?;
    debug!(nodes = nodes.len(), property, "Pasted nodes");
    Ok(nodes)
}

fn drop_taken_ids(object: &mut ObjectDef, model: &Model, seen: &mut HashSet<String>) {
    object.members.retain(|member| match member {
        Member::Id { value, .. } => model.node_with_id(value).is_none() && seen.insert(value.clone()),
        _ => true,
    });
    for member in &mut object.members {
        match member {
            Member::Object { object, .. } | Member::Child(object) => drop_taken_ids(object, model, seen),
            Member::Array { objects, .. } => {
                for object in objects {
                    drop_taken_ids(object, model, seen);
                }
            }
            Member::Id { .. } | Member::Script { .. } | Member::Signal { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "Item {\n    Text {\n        id: label\n        text: \"a\"\n    }\n    Rectangle {}\n}\n";

    #[test]
    fn test_copy_captures_object_text() {
        let rewriter = Rewriter::new(SOURCE, SyncConfig::default()).unwrap();
        let root = rewriter.model().root();
        let children = rewriter.model().children(root).to_vec();

        let payload = copy_nodes(&rewriter, &children).unwrap();
        let snippets: Vec<&str> = payload.snippets().collect();
        assert_eq!(
            snippets,
            vec!["Text {\n        id: label\n        text: \"a\"\n    }", "Rectangle {}"]
        );

        let decoded = ClipboardPayload::from_json(&payload.to_json().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_paste_builds_fresh_nodes_and_drops_taken_ids() {
        let mut source = Rewriter::new(SOURCE, SyncConfig::default()).unwrap();
        let root = source.model().root();
        let text = source.model().children(root)[0];
        let payload = copy_nodes(&source, &[text]).unwrap();

        let pasted = paste(&mut source, &payload, root, "data").unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(source.model().children(root).len(), 3);
        assert_eq!(source.model().id(pasted[0]), None);
        assert_eq!(source.model().node_with_id("label"), Some(text));
        assert_eq!(source.text().matches("text: \"a\"").count(), 2);

        let mut target = Rewriter::new("Column {\n}\n", SyncConfig::default()).unwrap();
        let column = target.model().root();
        let pasted = paste(&mut target, &payload, column, "data").unwrap();
        assert_eq!(target.model().id(pasted[0]), Some("label"));
        assert!(target.text().contains("id: label"));
    }

    #[test]
    fn test_bad_payload_is_rejected() {
        let json = r#"{"spans":[{"offset":4,"length":40}],"source":"Item {}"}"#;
        assert!(matches!(
            ClipboardPayload::from_json(json),
            Err(EditorError::Clipboard(_))
        ));
        assert!(matches!(ClipboardPayload::from_json("{"), Err(EditorError::Json(_))));
    }
}
