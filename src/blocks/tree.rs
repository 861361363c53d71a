// src/blocks/tree.rs
//! Work items and arena for reading a block tree without recursion.
//!
//! Fetched blocks are appended to a flat arena. A node's children always
//! land after it, so the nested tree can be assembled with a single
//! reverse sweep once every pending fetch is done.

use crate::model::{Block, BlockKind};
use crate::types::BlockId;
use std::fmt;

/// A block whose children still have to be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    /// Arena slot of the parent block.
    pub node: usize,
    pub block_id: BlockId,
    /// Depth of the parent block; top-level blocks are at depth 1.
    pub depth: usize,
}

/// Why a block's children were not fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyVisited(BlockId),
    DepthExhausted(usize),
    /// Child pages and databases are separate documents.
    SeparateDocument(BlockKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyVisited(id) => write!(f, "block {} already visited", id),
            SkipReason::DepthExhausted(depth) => {
                write!(f, "maximum depth {} reached", depth)
            }
            SkipReason::SeparateDocument(kind) => write!(f, "{} is a separate document", kind),
        }
    }
}

/// Flat storage for a tree under construction.
#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the top-level blocks and returns their arena slots, in order.
    pub fn push_roots(&mut self, blocks: Vec<Block>) -> Vec<usize> {
        let slots = self.push_all(blocks);
        self.roots.extend(slots.iter().copied());
        slots
    }

    /// Adds `blocks` as the children of `parent` and returns their slots.
    pub fn push_children(&mut self, parent: usize, blocks: Vec<Block>) -> Vec<usize> {
        let slots = self.push_all(blocks);
        if let Some(children) = self.children.get_mut(parent) {
            children.extend(slots.iter().copied());
        }
        slots
    }

    fn push_all(&mut self, blocks: Vec<Block>) -> Vec<usize> {
        let start = self.blocks.len();
        for block in blocks {
            self.blocks.push(block);
            self.children.push(Vec::new());
        }
        (start..self.blocks.len()).collect()
    }

    pub fn get(&self, slot: usize) -> Option<&Block> {
        self.blocks.get(slot)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Nests every block under its parent and returns the top-level blocks.
    pub fn assemble(self) -> Vec<Block> {
        let mut slots: Vec<Option<Block>> = self.blocks.into_iter().map(Some).collect();
        for index in (0..slots.len()).rev() {
            let children: Vec<Block> = self.children[index]
                .iter()
                .filter_map(|&child| slots[child].take())
                .collect();
            if let Some(block) = slots[index].as_mut() {
                block.children = children;
            }
        }
        self.roots
            .iter()
            .filter_map(|&root| slots[root].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn block(text: &str) -> Block {
        Block {
            id: BlockId::new_v4(),
            kind: BlockKind::Paragraph,
            rich_text: crate::types::RichTextItem::spans_from_str(text),
            has_children: false,
            archived: false,
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn assembles_nested_tree_in_order() {
        let mut arena = BlockArena::new();
        let roots = arena.push_roots(vec![block("a"), block("b")]);
        let a_children = arena.push_children(roots[0], vec![block("a1"), block("a2")]);
        arena.push_children(a_children[1], vec![block("a2x")]);
        arena.push_children(roots[1], vec![block("b1")]);
        assert_eq!(arena.len(), 6);

        let tree = arena.assemble();
        let texts: Vec<String> = tree.iter().map(Block::plain_text).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(tree[0].children[1].plain_text(), "a2");
        assert_eq!(tree[0].children[1].children[0].plain_text(), "a2x");
        assert_eq!(tree[1].children[0].plain_text(), "b1");
        assert_eq!(tree[0].subtree_len(), 4);
    }
}
