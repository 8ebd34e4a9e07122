// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Project initialization command for creating new sites.

use console::style;
use include_dir::{include_dir, Dir, DirEntry};
use std::fs;
use std::path::{Path, PathBuf};

static SITE_TEMPLATE: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates/site");

/// Initializes a new site in `name` (or the current directory).
pub async fn run(name: Option<String>) -> anyhow::Result<()> {
    let is_current_dir = matches!(name.as_deref(), Some(".") | None);
    let (project_dir, project_name) = resolve_project_path(name)?;

    if project_dir.exists() {
        tracing::info!("Initializing site in existing directory: {}", project_name);
    } else {
        fs::create_dir_all(&project_dir)?;
        tracing::info!("Created project directory: {}", project_name);
    }

    let written = scaffold(&project_dir, &project_name)?;
    print_success(&project_name, written, is_current_dir);

    Ok(())
}

/// Writes the starter site into `target`.
///
/// Files that already exist are left alone. Returns how many files were
/// written.
pub fn scaffold(target: &Path, project_name: &str) -> anyhow::Result<usize> {
    let mut written = 0;
    for entry in SITE_TEMPLATE.entries() {
        extract_entry(entry, target, project_name, &mut written)?;
    }
    Ok(written)
}

fn resolve_project_path(name: Option<String>) -> anyhow::Result<(PathBuf, String)> {
    match name.as_deref() {
        Some(".") | None => {
            let current_dir = std::env::current_dir()?;
            let dir_name = current_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "my-luasite".to_string());
            Ok((current_dir, dir_name))
        }
        Some(name) => {
            let project_path = Path::new(name).to_path_buf();
            let dir_name = project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            Ok((project_path, dir_name))
        }
    }
}

fn extract_entry(
    entry: &DirEntry,
    target: &Path,
    project_name: &str,
    written: &mut usize,
) -> anyhow::Result<()> {
    match entry {
        DirEntry::Dir(dir) => {
            fs::create_dir_all(target.join(dir.path()))?;
            for child in dir.entries() {
                extract_entry(child, target, project_name, written)?;
            }
        }
        DirEntry::File(file) => {
            let file_path = file.path();
            let file_name = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {:?}", file_path))?;

            let target_name: &str = match file_name {
                "gitignore" => ".gitignore",
                name if name.ends_with(".tmpl") => &name[..name.len() - 5],
                name => name,
            };

            let target_path = match file_path.parent() {
                Some(parent) => target.join(parent).join(target_name),
                None => target.join(target_name),
            };

            if target_path.exists() {
                tracing::info!("Keeping existing {}", target_path.display());
                return Ok(());
            }

            if let Some(parent) = target_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = file
                .contents_utf8()
                .ok_or_else(|| anyhow::anyhow!("Non-UTF8 file: {:?}", file_path))?;

            let content = if file_name.ends_with(".tmpl") {
                content.replace("{{project_name}}", project_name)
            } else {
                content.to_string()
            };

            fs::write(&target_path, content)?;
            *written += 1;
        }
    }
    Ok(())
}

fn print_success(project_name: &str, written: usize, is_current_dir: bool) {
    println!(
        "{} {} ({} files)",
        style("Created site:").green().bold(),
        project_name,
        written
    );
    println!();
    println!("Next steps:");
    if !is_current_dir {
        println!("  cd {}", project_name);
    }
    println!("  luasite serve");
    println!();
    println!("Then visit {}", style("http://127.0.0.1:8080/").cyan());
}
