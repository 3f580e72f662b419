//! Tree object payload grammar: a newline-joined sequence of
//! `"<mode> <kind> <hash>\t<name>"` entries, one per directory.

use std::cmp::Ordering;

use crate::{errors::PitError, hash::ObjectHash, internal::object::ObjectType};

pub const MODE_BLOB: &str = "100644";
pub const MODE_TREE: &str = "040000";

/// A single child of a tree: either a blob (file) or a subtree (directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: &'static str,
    pub kind: ObjectType,
    pub hash: ObjectHash,
    pub name: String,
}

impl TreeEntry {
    pub fn blob(name: String, hash: ObjectHash) -> Self {
        TreeEntry {
            mode: MODE_BLOB,
            kind: ObjectType::Blob,
            hash,
            name,
        }
    }

    pub fn tree(name: String, hash: ObjectHash) -> Self {
        TreeEntry {
            mode: MODE_TREE,
            kind: ObjectType::Tree,
            hash,
            name,
        }
    }

    fn encode_line(&self) -> String {
        format!("{} {} {}\t{}", self.mode, self.kind, self.hash, self.name)
    }
}

/// A parsed tree payload: its entries, already validated (no duplicate
/// names, recognized modes/kinds).
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Builds a canonical tree from unordered entries: sorts by name and
    /// rejects duplicates so encoding is independent of insertion order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self, PitError> {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(PitError::InvalidTreeItem(format!(
                    "duplicate entry name `{}`",
                    pair[0].name
                )));
            }
        }
        Ok(Tree { entries })
    }

    pub fn encode(&self) -> Result<Vec<u8>, PitError> {
        if self.entries.is_empty() {
            return Err(PitError::EmptyTreeItems("tree has zero entries".into()));
        }
        let lines: Vec<String> = self.entries.iter().map(TreeEntry::encode_line).collect();
        Ok(lines.join("\n").into_bytes())
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PitError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| PitError::InvalidTreeObject(e.to_string()))?;
        let mut entries = Vec::new();
        for line in text.split('\n').filter(|l| !l.is_empty()) {
            entries.push(parse_entry_line(line)?);
        }
        if entries.is_empty() {
            return Err(PitError::EmptyTreeItems("tree payload is empty".into()));
        }
        Ok(Tree { entries })
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

fn parse_entry_line(line: &str) -> Result<TreeEntry, PitError> {
    let (meta, name) = line
        .split_once('\t')
        .ok_or_else(|| PitError::InvalidTreeItem(line.to_string()))?;
    let mut fields = meta.splitn(3, ' ');
    let mode = fields
        .next()
        .ok_or_else(|| PitError::InvalidTreeItem(line.to_string()))?;
    let kind_str = fields
        .next()
        .ok_or_else(|| PitError::InvalidTreeItem(line.to_string()))?;
    let hash_str = fields
        .next()
        .ok_or_else(|| PitError::InvalidTreeItem(line.to_string()))?;

    let kind: ObjectType = kind_str
        .parse()
        .map_err(|_| PitError::InvalidTreeItem(line.to_string()))?;
    let mode = match (mode, kind) {
        (MODE_BLOB, ObjectType::Blob) => MODE_BLOB,
        (MODE_TREE, ObjectType::Tree) => MODE_TREE,
        _ => return Err(PitError::InvalidTreeItem(line.to_string())),
    };
    let hash: ObjectHash = hash_str
        .parse()
        .map_err(|_| PitError::InvalidTreeItem(line.to_string()))?;

    Ok(TreeEntry {
        mode,
        kind,
        hash,
        name: name.to_string(),
    })
}

/// Orders entries the way a directory listing would: lexicographic by name.
pub fn cmp_entry_names(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}
