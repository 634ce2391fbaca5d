#![forbid(unsafe_code)]

//! Lazily populated cache of listings, one node per visited path level.
//!
//! Nodes live in an arena owned by [`NavigationTree`]; parents are referenced
//! by [`NodeId`], so ownership only ever flows from a node to its children.

use std::collections::HashMap;

use crate::error::TreeError;
use crate::model::{Entry, EntryKind, ListingKind};
use crate::store::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct Node {
    key: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    entries: Vec<Entry>,
    remembered_cursor: usize,
}

impl Node {
    fn new(key: String, parent: Option<NodeId>, entries: Vec<Entry>) -> Self {
        // land on the first real item rather than the parent marker
        let remembered_cursor = match entries.first() {
            Some(first) if first.kind == EntryKind::ParentDirectory && entries.len() > 1 => 1,
            _ => 0,
        };
        Self { key, parent, children: HashMap::new(), entries, remembered_cursor }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn remembered_cursor(&self) -> usize {
        self.remembered_cursor
    }

    pub fn child(&self, key: &str) -> Option<NodeId> {
        self.children.get(key).copied()
    }
}

#[derive(Debug)]
pub struct NavigationTree {
    nodes: Vec<Node>,
}

/// What to ask the store for when (re)populating a node.
enum Query<'a> {
    Buckets,
    Children { bucket: &'a str, prefix: &'a str },
}

impl NavigationTree {
    const ROOT: NodeId = NodeId(0);

    /// Builds the tree with the root populated from the bucket list.
    pub fn new(store: &dyn ObjectStore) -> Result<Self, TreeError> {
        let entries = fetch(store, Query::Buckets)?;
        tracing::info!(buckets = entries.len(), "listed buckets");
        Ok(Self { nodes: vec![Node::new(String::new(), None, entries)] })
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.node(id).parent.is_none()
    }

    pub fn is_bucket_root(&self, id: NodeId) -> bool {
        self.node(id).parent.is_some_and(|parent| self.is_root(parent))
    }

    pub fn listing_kind(&self, id: NodeId) -> ListingKind {
        if self.is_root(id) {
            ListingKind::Buckets
        } else if self.is_bucket_root(id) {
            ListingKind::BucketRoot
        } else {
            ListingKind::Objects
        }
    }

    /// Bucket a node belongs to, `None` for the root.
    pub fn bucket_of(&self, id: NodeId) -> Option<&str> {
        let mut current = id;
        loop {
            let node = self.node(current);
            let parent = node.parent?;
            if self.is_root(parent) {
                return Some(&node.key);
            }
            current = parent;
        }
    }

    /// Returns the cached child `key` of `id`, listing it from the store on
    /// first descent. The child is only inserted once the listing succeeded.
    pub fn descend_into(
        &mut self,
        store: &dyn ObjectStore,
        id: NodeId,
        key: &str,
    ) -> Result<NodeId, TreeError> {
        if let Some(child) = self.node(id).child(key) {
            tracing::debug!(key, "descend (cached)");
            return Ok(child);
        }
        let query = if self.is_root(id) {
            Query::Children { bucket: key, prefix: "" }
        } else {
            let bucket = self
                .bucket_of(id)
                .ok_or(TreeError::InvalidOperation("node has no bucket"))?;
            Query::Children { bucket, prefix: key }
        };
        let entries = fetch(store, query)?;
        let child = NodeId(self.nodes.len());
        self.nodes.push(Node::new(key.to_string(), Some(id), entries));
        self.nodes[id.0].children.insert(key.to_string(), child);
        tracing::debug!(parent = %self.node(id).key, key, "descend (loaded)");
        Ok(child)
    }

    pub fn ascend(&self, id: NodeId) -> Result<NodeId, TreeError> {
        self.node(id)
            .parent
            .ok_or(TreeError::InvalidOperation("cannot ascend from the root"))
    }

    /// Replaces the entries of `id` with a fresh listing. Children that were
    /// already descended into stay cached.
    pub fn reload(&mut self, store: &dyn ObjectStore, id: NodeId) -> Result<(), TreeError> {
        let entries = {
            let query = if self.is_root(id) {
                Query::Buckets
            } else if self.is_bucket_root(id) {
                Query::Children { bucket: &self.node(id).key, prefix: "" }
            } else {
                let bucket = self
                    .bucket_of(id)
                    .ok_or(TreeError::InvalidOperation("node has no bucket"))?;
                Query::Children { bucket, prefix: &self.node(id).key }
            };
            fetch(store, query)?
        };
        tracing::info!(key = %self.node(id).key, entries = entries.len(), "reloaded");
        self.nodes[id.0].entries = entries;
        Ok(())
    }

    pub fn remember_cursor(&mut self, id: NodeId, row: usize) {
        self.nodes[id.0].remembered_cursor = row;
    }
}

fn fetch(store: &dyn ObjectStore, query: Query<'_>) -> Result<Vec<Entry>, TreeError> {
    match query {
        Query::Buckets => Ok(store.list_roots()?),
        Query::Children { bucket, prefix } => {
            let listed = store.list_children(bucket, prefix)?;
            let mut entries = Vec::with_capacity(listed.len() + 1);
            entries.push(Entry::parent_marker());
            entries.extend(
                listed
                    .into_iter()
                    .filter(|entry| entry.kind != EntryKind::ParentDirectory),
            );
            Ok(entries)
        }
    }
}
