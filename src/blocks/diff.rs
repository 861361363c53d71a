// src/blocks/diff.rs
//! Structural diff between a page's current blocks and a desired outline.
//!
//! Top-level blocks are compared by an outline of their subtree (kind and
//! text at every depth). Matching blocks are left untouched; changed runs
//! become in-place content updates where the kind allows it, and appends
//! plus deletes otherwise.

use super::BlockOperation;
use crate::constants::NOTION_MAX_APPEND_BLOCKS;
use crate::model::{Block, BlockDraft, BlockKind};
use crate::types::BlockId;

/// `(depth, kind, text, checked)` for every node of a subtree, in pre-order.
type Outline = Vec<(usize, String, String, Option<bool>)>;

fn block_outline(block: &Block) -> Outline {
    let mut outline = Vec::new();
    let mut stack = vec![(block, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let checked = node
            .attributes
            .get("checked")
            .and_then(serde_json::Value::as_bool);
        outline.push((
            depth,
            node.kind.type_name().to_string(),
            node.plain_text(),
            checked,
        ));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    outline
}

fn draft_outline(draft: &BlockDraft) -> Outline {
    let mut outline = Vec::new();
    let mut stack = vec![(draft, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        outline.push((
            depth,
            node.kind.type_name().to_string(),
            node.plain_text(),
            node.checked,
        ));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    outline
}

/// Child pages and databases are never planned for deletion or rewrite.
fn is_preserved(block: &Block) -> bool {
    matches!(block.kind, BlockKind::ChildPage | BlockKind::ChildDatabase)
}

/// Whether `current` can be turned into `desired` with a content update.
fn updatable(current: &Block, desired: &BlockDraft) -> bool {
    current.kind == desired.kind
        && current.kind.carries_text()
        && !current.has_children
        && current.children.is_empty()
        && desired.children.is_empty()
}

/// One maximal stretch of differences between two kept blocks.
#[derive(Default)]
struct Run {
    /// Last kept block before the run.
    anchor: Option<BlockId>,
    removed: Vec<usize>,
    inserted: Vec<usize>,
}

/// Plans the operations that turn the page's `current` top-level blocks
/// into `desired`.
///
/// Appends are anchored after the closest preceding surviving block and
/// come before the deletes of their run. Content cannot be inserted in
/// front of the first block, so a change that needs that rewrites the page.
pub fn plan_content_changes(current: &[Block], desired: &[BlockDraft]) -> Vec<BlockOperation> {
    let current: Vec<&Block> = current.iter().filter(|b| !is_preserved(b)).collect();
    let current_outline: Vec<Outline> = current.iter().map(|b| block_outline(b)).collect();
    let desired_outline: Vec<Outline> = desired.iter().map(draft_outline).collect();

    let mut runs: Vec<Run> = Vec::new();
    let mut open = Run::default();
    let (mut ci, mut di) = (0usize, 0usize);
    for change in diff::slice(&current_outline, &desired_outline) {
        match change {
            diff::Result::Both(_, _) => {
                if !open.removed.is_empty() || !open.inserted.is_empty() {
                    runs.push(std::mem::take(&mut open));
                }
                open.anchor = Some(current[ci].id.clone());
                ci += 1;
                di += 1;
            }
            diff::Result::Left(_) => {
                open.removed.push(ci);
                ci += 1;
            }
            diff::Result::Right(_) => {
                open.inserted.push(di);
                di += 1;
            }
        }
    }
    let trailing_anchor = open.anchor.clone();
    if !open.removed.is_empty() || !open.inserted.is_empty() {
        runs.push(open);
    }
    let kept_any = trailing_anchor.is_some();

    let mut operations = Vec::new();
    for run in runs {
        let pairs = run
            .removed
            .iter()
            .zip(run.inserted.iter())
            .take_while(|&(&c, &d)| updatable(current[c], &desired[d]))
            .count();

        let mut anchor = run.anchor.clone();
        for (&c, &d) in run.removed.iter().zip(run.inserted.iter()).take(pairs) {
            operations.push(BlockOperation::UpdateContent {
                block_id: current[c].id.clone(),
                draft: desired[d].clone(),
            });
            anchor = Some(current[c].id.clone());
        }

        let to_insert = &run.inserted[pairs..];
        if !to_insert.is_empty() {
            let needs_anchor = anchor.is_none() && kept_any;
            if needs_anchor || to_insert.len() > NOTION_MAX_APPEND_BLOCKS {
                log::debug!("Planned changes need a full rewrite of {} blocks", current.len());
                return rewrite(&current, desired);
            }
            operations.push(BlockOperation::Append {
                parent: None,
                after: anchor,
                blocks: to_insert.iter().map(|&d| desired[d].clone()).collect(),
            });
        }

        for &c in &run.removed[pairs..] {
            operations.push(BlockOperation::Delete {
                block_id: current[c].id.clone(),
            });
        }
    }
    operations
}

/// Appends everything at the end, then deletes the old blocks.
fn rewrite(current: &[&Block], desired: &[BlockDraft]) -> Vec<BlockOperation> {
    let appends = desired
        .chunks(NOTION_MAX_APPEND_BLOCKS)
        .map(|chunk| BlockOperation::append(chunk.to_vec()));
    let deletes = current.iter().map(|block| BlockOperation::Delete {
        block_id: block.id.clone(),
    });
    appends.chain(deletes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RichTextItem;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn block(kind: BlockKind, text: &str) -> Block {
        Block {
            id: BlockId::new_v4(),
            kind,
            rich_text: RichTextItem::spans_from_str(text),
            has_children: false,
            archived: false,
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    fn para(text: &str) -> Block {
        block(BlockKind::Paragraph, text)
    }

    #[test]
    fn identical_content_needs_no_operations() {
        let current = vec![para("a"), para("b")];
        let desired = vec![BlockDraft::paragraph("a"), BlockDraft::paragraph("b")];
        assert!(plan_content_changes(&current, &desired).is_empty());
    }

    #[test]
    fn changed_text_becomes_an_update() {
        let current = vec![para("a"), para("b"), para("c")];
        let desired = vec![
            BlockDraft::paragraph("a"),
            BlockDraft::paragraph("B!"),
            BlockDraft::paragraph("c"),
        ];
        assert_eq!(
            plan_content_changes(&current, &desired),
            vec![BlockOperation::UpdateContent {
                block_id: current[1].id.clone(),
                draft: BlockDraft::paragraph("B!"),
            }]
        );
    }

    #[test]
    fn insertions_are_anchored_and_precede_deletes() {
        let current = vec![para("a"), para("old"), para("z")];
        let desired = vec![
            BlockDraft::paragraph("a"),
            BlockDraft::heading(2, "new").unwrap(),
            BlockDraft::bulleted("more"),
            BlockDraft::paragraph("z"),
        ];
        assert_eq!(
            plan_content_changes(&current, &desired),
            vec![
                BlockOperation::Append {
                    parent: None,
                    after: Some(current[0].id.clone()),
                    blocks: vec![BlockDraft::heading(2, "new").unwrap(), BlockDraft::bulleted("more")],
                },
                BlockOperation::Delete {
                    block_id: current[1].id.clone()
                },
            ]
        );
    }

    #[test]
    fn appending_at_the_end_anchors_on_the_last_block() {
        let current = vec![para("a")];
        let desired = vec![BlockDraft::paragraph("a"), BlockDraft::to_do("next", false)];
        assert_eq!(
            plan_content_changes(&current, &desired),
            vec![BlockOperation::Append {
                parent: None,
                after: Some(current[0].id.clone()),
                blocks: vec![BlockDraft::to_do("next", false)],
            }]
        );
    }

    #[test]
    fn prepending_rewrites_the_page() {
        let current = vec![para("a"), para("b")];
        let desired = vec![
            BlockDraft::heading(1, "title").unwrap(),
            BlockDraft::paragraph("a"),
            BlockDraft::paragraph("b"),
        ];
        let ops = plan_content_changes(&current, &desired);
        assert_eq!(
            ops,
            vec![
                BlockOperation::append(desired.clone()),
                BlockOperation::Delete {
                    block_id: current[0].id.clone()
                },
                BlockOperation::Delete {
                    block_id: current[1].id.clone()
                },
            ]
        );
    }

    #[test]
    fn empty_page_gets_a_plain_append() {
        let desired = vec![BlockDraft::paragraph("first")];
        assert_eq!(
            plan_content_changes(&[], &desired),
            vec![BlockOperation::append(desired.clone())]
        );
    }

    #[test]
    fn child_pages_are_left_alone() {
        let mut child_page = block(BlockKind::ChildPage, "");
        child_page.has_children = true;
        let current = vec![para("a"), child_page];
        let desired = vec![BlockDraft::paragraph("a")];
        assert!(plan_content_changes(&current, &desired).is_empty());
    }

    #[test]
    fn nested_differences_replace_the_top_level_block() {
        let mut parent = block(BlockKind::Toggle, "details");
        parent.has_children = true;
        parent.children = vec![para("old child")];
        let current = vec![para("a"), parent];
        let desired = vec![
            BlockDraft::paragraph("a"),
            BlockDraft::new(BlockKind::Toggle, "details")
                .with_children(vec![BlockDraft::paragraph("new child")]),
        ];
        let ops = plan_content_changes(&current, &desired);
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            &ops[0],
            BlockOperation::Append { after: Some(anchor), .. } if *anchor == current[0].id
        ));
        assert!(matches!(
            &ops[1],
            BlockOperation::Delete { block_id } if *block_id == current[1].id
        ));
    }
}
