// ABOUTME: Output-tree layout, name sanitization, and collision-safe commits
// ABOUTME: Substitutes {{IMG:n}} tokens with relative paths or placeholder markers

use crate::media::ResolvedMedia;
use crate::model::{MediaStatus, Page};
use crate::{Error, Result};
use filetime::FileTime;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

pub const IMAGE_UNAVAILABLE: &str = "<!-- image unavailable -->";

const MAX_NAME_CHARS: usize = 64;

/// Make a display name safe for use as a file or directory name.
/// Deterministic: the same raw title always maps to the same name.
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if name.chars().count() > MAX_NAME_CHARS {
        name = name.chars().take(MAX_NAME_CHARS).collect();
    }

    let name = name.trim().trim_end_matches('.').trim();
    if name.is_empty() {
        "Untitled".into()
    } else {
        name.to_string()
    }
}

/// Single authority for name collisions within one directory. First use of
/// a name keeps it; later uses get `-2`, `-3`, ... deterministically. Every
/// issued name is tracked, so a generated suffix can never collide with a
/// literal title like `Notes-2` that was already handed out.
#[derive(Default)]
pub struct NameAllocator {
    counters: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        NameAllocator::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let count = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *count += 1;
            let candidate = if *count == 1 {
                base.to_string()
            } else {
                format!("{}-{}", base, count)
            };
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

pub struct ExportWriter {
    root: PathBuf,
    written: HashSet<PathBuf>,
}

impl ExportWriter {
    pub fn new(root: PathBuf) -> Self {
        ExportWriter {
            root,
            written: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Commit one page: write its Markdown with all `{{IMG:n}}` tokens
    /// substituted, plus any fetched images under a sibling `images/`
    /// directory. `stem` must come from the section's `NameAllocator`.
    pub fn commit_page(
        &mut self,
        section_dir: &Path,
        stem: &str,
        page: &Page,
        markdown: &str,
        media: &[ResolvedMedia],
    ) -> Result<PathBuf> {
        let md_path = section_dir.join(format!("{}.md", stem));
        self.claim(&md_path)?;

        let mut text = assemble_document(page, markdown);
        let mut image_files: Vec<(PathBuf, &[u8])> = Vec::new();

        for (n, resolved) in media.iter().enumerate() {
            let token = resolved.reference.token();
            match (&resolved.reference.status, &resolved.data) {
                (MediaStatus::Fetched, Some(data)) => {
                    let filename = format!("{}-{}.{}", stem, n + 1, data.extension);
                    text = text.replace(&token, &format!("images/{}", filename));
                    image_files.push((section_dir.join("images").join(filename), &data.bytes));
                }
                _ => {
                    // The whole image tag becomes a visible marker
                    let tag = resolved.reference.tag();
                    if text.contains(&tag) {
                        text = text.replace(&tag, IMAGE_UNAVAILABLE);
                    } else {
                        text = text.replace(&token, IMAGE_UNAVAILABLE);
                    }
                }
            }
        }

        fs::create_dir_all(section_dir)?;
        for (path, bytes) in image_files {
            self.claim(&path)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
        }

        fs::write(&md_path, text.as_bytes())?;

        if let Some(modified) = page.last_modified {
            let mtime = FileTime::from_system_time(SystemTime::from(modified));
            filetime::set_file_mtime(&md_path, mtime)?;
        }

        debug!(path = %md_path.display(), "wrote page");
        Ok(md_path)
    }

    /// Invariant check behind the allocator: a path may be written at most
    /// once per run.
    fn claim(&mut self, path: &Path) -> Result<()> {
        if !self.written.insert(path.to_path_buf()) {
            return Err(Error::WriteConflict {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Title heading, an italic timestamp line when the remote provides one,
/// a rule, then the converted body. Nothing run-dependent goes in, so
/// re-running an unchanged export is byte-identical.
fn assemble_document(page: &Page, markdown: &str) -> String {
    let mut text = format!("# {}\n\n", page.name());

    let mut meta_parts = Vec::new();
    if let Some(created) = page.created {
        meta_parts.push(format!("Created: {}", created.format("%Y-%m-%d")));
    }
    if let Some(modified) = page.last_modified {
        meta_parts.push(format!("Modified: {}", modified.format("%Y-%m-%d")));
    }
    if !meta_parts.is_empty() {
        text.push_str(&format!("_{}_\n\n", meta_parts.join(" · ")));
    }

    text.push_str("---\n\n");
    text.push_str(markdown);
    if !markdown.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod sanitize_tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_name("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_trims_whitespace_and_trailing_dots() {
        assert_eq!(sanitize_name("  Notes from camp... "), "Notes from camp");
    }

    #[test]
    fn test_sanitize_empty_falls_back_to_untitled() {
        assert_eq!(sanitize_name(""), "Untitled");
        assert_eq!(sanitize_name("   "), "Untitled");
        assert_eq!(sanitize_name("..."), "Untitled");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long: String = "日".repeat(200);
        let out = sanitize_name(&long);
        assert_eq!(out.chars().count(), 64);
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        assert_eq!(sanitize_name("Plan: 2025"), sanitize_name("Plan: 2025"));
    }
}
