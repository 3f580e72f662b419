//! Commit object payload grammar: a header block (`tree`, `parent*`,
//! `author`, `committer`), a blank line, then a free-form message.

use std::fmt;

use crate::errors::PitError;
use crate::hash::ObjectHash;

/// An author/committer line: `"<name> <<email>> <unix-ts> <tz>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub timestamp: i64,
    pub tz: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: i64, tz: impl Into<String>) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
            timestamp,
            tz: tz.into(),
        }
    }

    /// Parses `"<name> <<email>> <unix-ts> <tz>"`, splitting on the *last*
    /// `<`/`>` pair so names containing spaces survive.
    fn parse(s: &str) -> Result<Self, PitError> {
        let open = s
            .rfind('<')
            .ok_or_else(|| PitError::InvalidIdentity(s.to_string()))?;
        let close = s
            .rfind('>')
            .ok_or_else(|| PitError::InvalidIdentity(s.to_string()))?;
        if close < open {
            return Err(PitError::InvalidIdentity(s.to_string()));
        }
        let name = s[..open].trim().to_string();
        let email = s[open + 1..close].to_string();
        let rest = s[close + 1..].trim();
        let mut parts = rest.split_whitespace();
        let timestamp: i64 = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| PitError::InvalidIdentity(s.to_string()))?;
        let tz = parts
            .next()
            .ok_or_else(|| PitError::InvalidIdentity(s.to_string()))?
            .to_string();
        Ok(Identity {
            name,
            email,
            timestamp,
            tz,
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, self.timestamp, self.tz
        )
    }
}

/// A commit object: a tree, zero-or-more parents, author/committer, and a
/// free-form message. The first parent (if any) is privileged for history
/// traversal and "original base" semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectHash,
    pub parents: Vec<ObjectHash>,
    pub author: Identity,
    pub committer: Identity,
    pub message: String,
}

impl Commit {
    pub fn new(
        tree: ObjectHash,
        parents: Vec<ObjectHash>,
        author: Identity,
        committer: Identity,
        message: impl Into<String>,
    ) -> Self {
        Commit {
            tree,
            parents,
            author,
            committer,
            message: message.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The first parent, privileged for history traversal.
    pub fn first_parent(&self) -> Option<ObjectHash> {
        self.parents.first().copied()
    }

    /// First line of the message, or the whole message if it has no newline.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {parent}\n"));
        }
        out.push_str(&format!("author {}\n", self.author));
        out.push_str(&format!("committer {}\n", self.committer));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PitError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| PitError::InvalidCommitObject(e.to_string()))?;
        let (header, message) = text
            .split_once("\n\n")
            .ok_or_else(|| PitError::InvalidCommitObject("missing header/message separator".into()))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(
                    rest.parse::<ObjectHash>()
                        .map_err(|_| PitError::InvalidCommitObject(format!("bad tree hash: {rest}")))?,
                );
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(
                    rest.parse::<ObjectHash>()
                        .map_err(|_| PitError::InvalidCommitObject(format!("bad parent hash: {rest}")))?,
                );
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Identity::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Identity::parse(rest)?);
            }
        }

        Ok(Commit {
            tree: tree.ok_or_else(|| PitError::InvalidCommitObject("missing tree".into()))?,
            parents,
            author: author.ok_or_else(|| PitError::InvalidCommitObject("missing author".into()))?,
            committer: committer
                .ok_or_else(|| PitError::InvalidCommitObject("missing committer".into()))?,
            message: message.to_string(),
        })
    }
}
