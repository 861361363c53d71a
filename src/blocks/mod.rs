// src/blocks/mod.rs
//! Reading and writing the block tree of a page.

mod diff;
mod tree;

pub use diff::plan_content_changes;
pub use tree::{BlockArena, PendingFetch, SkipReason};

use crate::api::parser::{parse_block, parse_list};
use crate::api::{Batch, Cursor, Paginator, Transport};
use crate::constants::{NOTION_API_PAGE_SIZE, NOTION_MAX_APPEND_BLOCKS};
use crate::error::AppError;
use crate::model::{Block, BlockDraft, BlockKind};
use crate::types::{BlockId, NotionId, ValidationError};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// One block-level change.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOperation {
    /// Append `blocks` under `parent` (the page itself when `None`), after
    /// the sibling `after` or at the end.
    Append {
        parent: Option<BlockId>,
        after: Option<BlockId>,
        blocks: Vec<BlockDraft>,
    },
    /// Replace the content of an existing block. The kind must match.
    UpdateContent { block_id: BlockId, draft: BlockDraft },
    Delete { block_id: BlockId },
}

impl BlockOperation {
    pub fn append(blocks: Vec<BlockDraft>) -> Self {
        Self::Append {
            parent: None,
            after: None,
            blocks,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Append { blocks, .. } => {
                if blocks.is_empty() {
                    return Err(ValidationError::EmptyField("blocks to append"));
                }
                if blocks.len() > NOTION_MAX_APPEND_BLOCKS {
                    return Err(ValidationError::TooManyBlocks {
                        count: blocks.len(),
                        max: NOTION_MAX_APPEND_BLOCKS,
                    });
                }
                blocks.iter().try_for_each(BlockDraft::validate)
            }
            Self::UpdateContent { draft, .. } => {
                draft.validate()?;
                if !draft.children.is_empty() {
                    return Err(ValidationError::InvalidField {
                        field: draft.kind.type_name().to_string(),
                        reason: "children cannot be set by a content update".to_string(),
                    });
                }
                Ok(())
            }
            Self::Delete { .. } => Ok(()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Append { blocks, after, .. } => match after {
                Some(anchor) => format!("append {} blocks after {}", blocks.len(), anchor),
                None => format!("append {} blocks", blocks.len()),
            },
            Self::UpdateContent { block_id, .. } => format!("update block {}", block_id),
            Self::Delete { block_id } => format!("delete block {}", block_id),
        }
    }
}

/// What a completed write did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub applied: usize,
    /// Ids of top-level blocks created by appends, in order.
    pub created: Vec<BlockId>,
}

/// Reads and writes the content blocks of one document.
#[derive(Clone)]
pub struct BlockTreeBuilder {
    transport: Transport,
    max_depth: Option<usize>,
}

impl BlockTreeBuilder {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            max_depth: None,
        }
    }

    /// Stop descending below `depth` levels (top-level blocks are level 1).
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Lazily lists the direct children of a page or block.
    pub fn children(&self, parent: &NotionId) -> Paginator<Block> {
        let transport = self.transport.clone();
        let parent = parent.to_hyphenated();
        Paginator::new(move |cursor: Option<Cursor>| {
            let transport = transport.clone();
            let path = children_path(&parent, cursor.as_ref());
            async move {
                let response = transport.send(Method::GET, &path, None).await?;
                parse_list(response, parse_block)
            }
        })
    }

    /// Fetches the whole block tree under `root`, depth first in pre-order.
    ///
    /// Each block with `has_children` gets exactly one children listing
    /// (more requests only when that listing spans several pages).
    pub async fn read(&self, root: &NotionId) -> Result<Vec<Block>, AppError> {
        let mut arena = BlockArena::new();
        let top_level = self.children(root).collect_all().await?;
        let roots = arena.push_roots(top_level);

        let mut pending: Vec<PendingFetch> = Vec::new();
        self.schedule(&arena, &roots, 1, &mut pending);
        let mut visited: HashSet<BlockId> = HashSet::new();

        while let Some(step) = pending.pop() {
            if !visited.insert(step.block_id.clone()) {
                log::warn!(
                    "Skipping children of {}: {}",
                    step.block_id,
                    SkipReason::AlreadyVisited(step.block_id.clone())
                );
                continue;
            }
            let children = self
                .children(&NotionId::from(&step.block_id))
                .collect_all()
                .await?;
            let slots = arena.push_children(step.node, children);
            self.schedule(&arena, &slots, step.depth + 1, &mut pending);
        }

        log::debug!("Read {} blocks under {}", arena.len(), root.as_str());
        Ok(arena.assemble())
    }

    /// Queues the blocks at `slots` that need their children listed, so the
    /// first of them is fetched next.
    fn schedule(
        &self,
        arena: &BlockArena,
        slots: &[usize],
        depth: usize,
        pending: &mut Vec<PendingFetch>,
    ) {
        for &slot in slots.iter().rev() {
            let Some(block) = arena.get(slot) else {
                continue;
            };
            if !block.has_children {
                continue;
            }
            let skip = match (&block.kind, self.max_depth) {
                (BlockKind::ChildPage | BlockKind::ChildDatabase, _) => {
                    Some(SkipReason::SeparateDocument(block.kind.clone()))
                }
                (_, Some(max)) if depth >= max => Some(SkipReason::DepthExhausted(max)),
                _ => None,
            };
            match skip {
                Some(reason) => log::debug!("Not descending into {}: {}", block.id, reason),
                None => pending.push(PendingFetch {
                    node: slot,
                    block_id: block.id.clone(),
                    depth,
                }),
            }
        }
    }

    /// Applies `operations` to the document `page` in order.
    ///
    /// Every operation is validated before the first request. A failure
    /// partway through is reported as [`AppError::PartialWrite`] with the
    /// number of operations already applied; nothing is rolled back.
    pub async fn write(
        &self,
        page: &NotionId,
        operations: Vec<BlockOperation>,
    ) -> Result<WriteReport, AppError> {
        for operation in &operations {
            operation.validate()?;
        }

        let total = operations.len();
        let mut report = WriteReport::default();
        for operation in operations {
            log::debug!("{} ({}/{})", operation.describe(), report.applied + 1, total);
            match self.apply(page, &operation).await {
                Ok(created) => {
                    report.created.extend(created);
                    report.applied += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Block write on {} stopped after {} of {} operations: {}",
                        page.as_str(),
                        report.applied,
                        total,
                        e
                    );
                    return Err(AppError::PartialWrite {
                        applied: report.applied,
                        total,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn apply(
        &self,
        page: &NotionId,
        operation: &BlockOperation,
    ) -> Result<Vec<BlockId>, AppError> {
        match operation {
            BlockOperation::Append {
                parent,
                after,
                blocks,
            } => {
                let parent = parent
                    .as_ref()
                    .map(|id| id.to_dashed())
                    .unwrap_or_else(|| page.to_hyphenated());
                let mut body = Map::new();
                body.insert(
                    "children".to_string(),
                    Value::Array(blocks.iter().map(BlockDraft::to_wire).collect()),
                );
                if let Some(anchor) = after {
                    body.insert("after".to_string(), json!(anchor.to_dashed()));
                }
                let response = self
                    .transport
                    .send(
                        Method::PATCH,
                        &format!("blocks/{}/children", parent),
                        Some(Value::Object(body)),
                    )
                    .await?;
                let created: Batch<Block> = parse_list(response, parse_block)?;
                Ok(created.items.into_iter().map(|block| block.id).collect())
            }
            BlockOperation::UpdateContent { block_id, draft } => {
                let mut body = Map::new();
                body.insert(draft.kind.type_name().to_string(), draft.content_to_wire());
                self.transport
                    .send(
                        Method::PATCH,
                        &format!("blocks/{}", block_id.to_dashed()),
                        Some(Value::Object(body)),
                    )
                    .await?;
                Ok(Vec::new())
            }
            BlockOperation::Delete { block_id } => {
                self.transport
                    .send(
                        Method::DELETE,
                        &format!("blocks/{}", block_id.to_dashed()),
                        None,
                    )
                    .await?;
                Ok(Vec::new())
            }
        }
    }
}

fn children_path(parent: &str, cursor: Option<&Cursor>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("page_size", &NOTION_API_PAGE_SIZE.to_string());
    if let Some(cursor) = cursor {
        query.append_pair("start_cursor", cursor.token());
    }
    format!("blocks/{}/children?{}", parent, query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_path_encodes_the_cursor() {
        assert_eq!(
            children_path("abc", None),
            "blocks/abc/children?page_size=100"
        );
        let cursor = Cursor::new("a+b/c=".to_string());
        assert_eq!(
            children_path("abc", Some(&cursor)),
            "blocks/abc/children?page_size=100&start_cursor=a%2Bb%2Fc%3D"
        );
    }

    #[test]
    fn append_limits_are_validated() {
        assert_eq!(
            BlockOperation::append(Vec::new()).validate(),
            Err(ValidationError::EmptyField("blocks to append"))
        );
        let many = vec![BlockDraft::paragraph("x"); NOTION_MAX_APPEND_BLOCKS + 1];
        assert!(matches!(
            BlockOperation::append(many).validate(),
            Err(ValidationError::TooManyBlocks { count: 101, max: 100 })
        ));
    }

    #[test]
    fn content_updates_cannot_carry_children() {
        let op = BlockOperation::UpdateContent {
            block_id: BlockId::new_v4(),
            draft: BlockDraft::new(BlockKind::Toggle, "more")
                .with_children(vec![BlockDraft::paragraph("hidden")]),
        };
        assert!(matches!(
            op.validate(),
            Err(ValidationError::InvalidField { .. })
        ));
    }
}
