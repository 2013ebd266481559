//! Ledger key-value store.
//!
//! State is a tree of typed values addressable by path. The election's
//! global keys live under `global/`, each participant's keys under
//! `local/<address>/`.

use crate::{Error, Hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A path is a list of string segments.
pub type Path = Vec<String>;

/// A stored ledger value: either an integer or a byte string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            Value::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Uint(_) => None,
        }
    }
}

/// A node in the state tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A leaf value.
    Value(Value),
    /// A subtree.
    Tree(BTreeMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Tree(BTreeMap::new())
    }
}

/// The state tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    root: BTreeMap<String, Node>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value at a path.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.root;

        for segment in parents {
            match current.get(*segment) {
                Some(Node::Tree(subtree)) => current = subtree,
                _ => return None,
            }
        }

        match current.get(*last) {
            Some(Node::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Get an integer at a path, failing if the key is absent or holds bytes.
    pub fn get_uint(&self, path: &[&str]) -> Result<u64, Error> {
        self.get(path)
            .and_then(Value::as_uint)
            .ok_or_else(|| Error::CorruptState(path.join("/")))
    }

    /// Get a byte string at a path, failing if the key is absent or holds an integer.
    pub fn get_bytes(&self, path: &[&str]) -> Result<&[u8], Error> {
        self.get(path)
            .and_then(Value::as_bytes)
            .ok_or_else(|| Error::CorruptState(path.join("/")))
    }

    /// Set a value at a path. Creates intermediate trees as needed.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(Node::default);
            if let Node::Value(_) = entry {
                *entry = Node::default();
            }
            current = match entry {
                Node::Tree(subtree) => subtree,
                Node::Value(_) => unreachable!("replaced with a tree above"),
            };
        }

        current.insert(last.to_string(), Node::Value(value));
    }

    /// Set a value at a path (owned path version).
    pub fn set_path(&mut self, path: &Path, value: Value) {
        let refs: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
        self.set(&refs, value);
    }

    /// Delete the value or subtree at a path. Returns true if something was
    /// deleted. Parent trees left empty are pruned.
    pub fn delete(&mut self, path: &[&str]) -> bool {
        if path.is_empty() {
            return false;
        }
        Self::delete_in(&mut self.root, path)
    }

    fn delete_in(current: &mut BTreeMap<String, Node>, path: &[&str]) -> bool {
        let segment = path[0];

        if path.len() == 1 {
            return current.remove(segment).is_some();
        }

        let (deleted, now_empty) = match current.get_mut(segment) {
            Some(Node::Tree(subtree)) => {
                let deleted = Self::delete_in(subtree, &path[1..]);
                (deleted, subtree.is_empty())
            }
            _ => (false, false),
        };

        if deleted && now_empty {
            current.remove(segment);
        }
        deleted
    }

    /// Delete a value at a path (owned path version).
    pub fn delete_path(&mut self, path: &Path) -> bool {
        let refs: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
        self.delete(&refs)
    }

    /// Enumerate all paths with values under a prefix.
    pub fn enumerate(&self, prefix: &[&str]) -> Vec<Path> {
        let mut results = Vec::new();
        let mut current = &self.root;

        for (i, segment) in prefix.iter().enumerate() {
            match current.get(*segment) {
                Some(Node::Tree(subtree)) => current = subtree,
                Some(Node::Value(_)) if i == prefix.len() - 1 => {
                    results.push(prefix.iter().map(|s| s.to_string()).collect());
                    return results;
                }
                _ => return results,
            }
        }

        let prefix_path: Path = prefix.iter().map(|s| s.to_string()).collect();
        Self::enumerate_recursive(current, prefix_path, &mut results);
        results
    }

    fn enumerate_recursive(node: &BTreeMap<String, Node>, current_path: Path, results: &mut Vec<Path>) {
        for (key, value) in node {
            let mut path = current_path.clone();
            path.push(key.clone());

            match value {
                Node::Value(_) => results.push(path),
                Node::Tree(subtree) => Self::enumerate_recursive(subtree, path, results),
            }
        }
    }

    /// Names of the direct children under a prefix.
    pub fn children(&self, prefix: &[&str]) -> Vec<String> {
        let mut current = &self.root;
        for segment in prefix {
            match current.get(*segment) {
                Some(Node::Tree(subtree)) => current = subtree,
                _ => return Vec::new(),
            }
        }
        current.keys().cloned().collect()
    }

    /// Enumerate all paths (prefix = root).
    pub fn enumerate_all(&self) -> Vec<Path> {
        self.enumerate(&[])
    }

    /// Compute the content hash of the entire state.
    pub fn hash(&self) -> Result<Hash, Error> {
        Hash::of_value(&self.root)
    }

    /// Check if the state is empty.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Get the number of values in the state.
    pub fn len(&self) -> usize {
        self.enumerate_all().len()
    }
}
