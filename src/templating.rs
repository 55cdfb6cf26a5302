use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

pub fn templates_dir() -> Result<PathBuf> {
    Ok(Config::dir()?.join("templates"))
}

/// Reads `<name>.tmpl` from the templates dir.
pub fn load_template(name: &str) -> Result<String> {
    load_from(&templates_dir()?, name)
}

fn load_from(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(format!("{}.tmpl", name));
    std::fs::read_to_string(&path).with_context(|| format!("reading template {}", path.display()))
}

pub fn list_templates() -> Result<Vec<String>> {
    list_in(&templates_dir()?)
}

fn list_in(dir: &Path) -> Result<Vec<String>> {
    let mut out = vec![];
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let p = entry?.path();
            if p.extension().and_then(|s| s.to_str()) == Some("tmpl")
                && let Some(stem) = p.file_stem().and_then(|s| s.to_str())
            {
                out.push(stem.to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}
