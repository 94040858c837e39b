//! Static phrase tree.
//!
//! The tree is a flat array of fixed-width node records produced once by
//! [`TreeBuilder`] and read-only afterwards:
//!
//! - record 0 is the root; its `key` holds the record count
//! - an internal node has a phone `key` and a child range `begin..end`
//! - a leaf has `key == 0`, `begin` = phrase offset in the text blob and
//!   `end` = frequency
//!
//! Children of a node are contiguous and sorted by key, so leaves come first
//! and are pre-sorted by descending frequency. Phrase text lives in a
//! separate NUL-terminated blob.
//!
//! On disk the pair is `index.bin` (bincode node array) and `phrase.bin`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{Phone, NO_PHONE};
use crate::error::{Result, TaigiError};
use crate::phrase::{Phrase, PhraseKind};

pub const INDEX_FILE: &str = "index.bin";
pub const PHRASE_FILE: &str = "phrase.bin";

/// Index of a node in the flat array.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub key: Phone,
    pub begin: u32,
    pub end: u32,
    pub kind: PhraseKind,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.key == NO_PHONE
    }
}

#[derive(Debug, Clone)]
pub struct PhraseTree {
    nodes: Vec<TreeNode>,
    blob: Vec<u8>,
}

impl PhraseTree {
    /// Load `index.bin` and `phrase.bin` from a dictionary directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let reader = BufReader::new(File::open(dir.join(INDEX_FILE))?);
        let nodes: Vec<TreeNode> = bincode::deserialize_from(reader)?;
        let blob = std::fs::read(dir.join(PHRASE_FILE))?;
        debug!(nodes = nodes.len(), blob = blob.len(), "loaded phrase tree");
        Self::from_parts(nodes, blob)
    }

    /// Build a tree from raw parts, checking that every range is in bounds.
    pub fn from_parts(nodes: Vec<TreeNode>, blob: Vec<u8>) -> Result<Self> {
        let root = nodes
            .first()
            .ok_or_else(|| TaigiError::InvalidDictionary("empty node array".into()))?;
        if root.key as usize != nodes.len() {
            return Err(TaigiError::InvalidDictionary(format!(
                "root records {} nodes, found {}",
                root.key,
                nodes.len()
            )));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.begin as usize >= blob.len() {
                    return Err(TaigiError::InvalidDictionary(format!(
                        "leaf {i} points past the phrase blob"
                    )));
                }
            } else if node.begin > node.end || node.end as usize > nodes.len() {
                return Err(TaigiError::InvalidDictionary(format!(
                    "node {i} has child range {}..{}",
                    node.begin, node.end
                )));
            }
        }
        Ok(Self { nodes, blob })
    }

    /// Write the pair into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let writer = BufWriter::new(File::create(dir.join(INDEX_FILE))?);
        bincode::serialize_into(writer, &self.nodes)?;
        std::fs::write(dir.join(PHRASE_FILE), &self.blob)?;
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn children(&self, id: NodeId) -> &[TreeNode] {
        let node = &self.nodes[id];
        &self.nodes[node.begin as usize..node.end as usize]
    }

    /// Find the node for `seq[from..to]`. Returns `None` on the first missing
    /// phone, or when the node carries no phrase.
    pub fn find_phrase(&self, seq: &[Phone], from: usize, to: usize) -> Option<NodeId> {
        if from >= to || to > seq.len() {
            return None;
        }
        let mut id: NodeId = 0;
        for &phone in &seq[from..to] {
            if phone == NO_PHONE {
                return None;
            }
            let begin = self.nodes[id].begin as usize;
            let children = self.children(id);
            let pos = children.partition_point(|c| c.key < phone);
            match children.get(pos) {
                Some(c) if c.key == phone => id = begin + pos,
                _ => return None,
            }
        }
        match self.children(id).first() {
            Some(first) if first.is_leaf() => Some(id),
            _ => None,
        }
    }

    /// True when `phone` has at least one single-syllable phrase.
    pub fn has_single(&self, phone: Phone) -> bool {
        self.find_phrase(&[phone], 0, 1).is_some()
    }

    fn leaf_phrase(&self, leaf: &TreeNode) -> Phrase {
        let start = leaf.begin as usize;
        let end = self.blob[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.blob.len(), |p| start + p);
        let text = String::from_utf8_lossy(&self.blob[start..end]).into_owned();
        Phrase::new(text, leaf.end, leaf.kind)
    }

    /// Highest-frequency phrase under `node`.
    pub fn first_phrase(&self, node: NodeId) -> Option<Phrase> {
        self.phrases(node).next()
    }

    /// All phrases under `node` in descending frequency.
    pub fn phrases(&self, node: NodeId) -> Phrases<'_> {
        let n = &self.nodes[node];
        Phrases {
            tree: self,
            next: n.begin as usize,
            end: n.end as usize,
        }
    }
}

/// Cursor over the leaves of one node.
pub struct Phrases<'a> {
    tree: &'a PhraseTree,
    next: usize,
    end: usize,
}

impl Phrases<'_> {
    pub fn next_phrase(&mut self) -> Option<Phrase> {
        if self.next >= self.end {
            return None;
        }
        let leaf = &self.tree.nodes[self.next];
        if !leaf.is_leaf() {
            self.next = self.end;
            return None;
        }
        self.next += 1;
        Some(self.tree.leaf_phrase(leaf))
    }
}

impl Iterator for Phrases<'_> {
    type Item = Phrase;

    fn next(&mut self) -> Option<Phrase> {
        self.next_phrase()
    }
}

// ========== Builder ==========

#[derive(Debug, Default)]
struct BuildNode {
    key: Phone,
    children: Vec<usize>,
    leaves: Vec<Phrase>,
}

/// Arena-based builder that linearizes the tree breadth-first.
#[derive(Debug)]
pub struct TreeBuilder {
    arena: Vec<BuildNode>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            arena: vec![BuildNode::default()],
        }
    }

    /// Add a phrase. Duplicate text under the same phones keeps the higher
    /// frequency.
    pub fn insert(&mut self, phones: &[Phone], phrase: Phrase) -> Result<()> {
        if phones.is_empty() || phones.contains(&NO_PHONE) {
            return Err(TaigiError::MalformedSyllable(phrase.text));
        }
        let mut id = 0;
        for &phone in phones {
            let existing = self.arena[id]
                .children
                .iter()
                .copied()
                .find(|&c| self.arena[c].key == phone);
            id = match existing {
                Some(c) => c,
                None => {
                    self.arena.push(BuildNode {
                        key: phone,
                        ..Default::default()
                    });
                    let new_id = self.arena.len() - 1;
                    self.arena[id].children.push(new_id);
                    new_id
                }
            };
        }
        let leaves = &mut self.arena[id].leaves;
        match leaves.iter_mut().find(|p| p.text == phrase.text) {
            Some(p) => p.freq = p.freq.max(phrase.freq),
            None => leaves.push(phrase),
        }
        Ok(())
    }

    pub fn build(mut self) -> PhraseTree {
        let mut blob: Vec<u8> = Vec::new();
        let mut offsets: AHashMap<String, u32> = AHashMap::new();
        let mut nodes = vec![TreeNode {
            key: NO_PHONE,
            begin: 0,
            end: 0,
            kind: PhraseKind::Word,
        }];
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((0, 0));

        while let Some((arena_id, out_id)) = queue.pop_front() {
            let mut leaves = std::mem::take(&mut self.arena[arena_id].leaves);
            leaves.sort_by(|a, b| b.freq.cmp(&a.freq).then_with(|| a.text.cmp(&b.text)));
            let mut children = std::mem::take(&mut self.arena[arena_id].children);
            children.sort_by_key(|&c| self.arena[c].key);

            let begin = nodes.len() as u32;
            for leaf in leaves {
                let pos = *offsets.entry(leaf.text.clone()).or_insert_with(|| {
                    let pos = blob.len() as u32;
                    blob.extend_from_slice(leaf.text.as_bytes());
                    blob.push(0);
                    pos
                });
                nodes.push(TreeNode {
                    key: NO_PHONE,
                    begin: pos,
                    end: leaf.freq,
                    kind: leaf.kind,
                });
            }
            for child in children {
                nodes.push(TreeNode {
                    key: self.arena[child].key,
                    begin: 0,
                    end: 0,
                    kind: PhraseKind::Word,
                });
                queue.push_back((child, nodes.len() - 1));
            }
            nodes[out_id].begin = begin;
            nodes[out_id].end = nodes.len() as u32;
        }
        nodes[0].key = nodes.len() as Phone;
        debug!(nodes = nodes.len(), blob = blob.len(), "built phrase tree");
        PhraseTree { nodes, blob }
    }
}
