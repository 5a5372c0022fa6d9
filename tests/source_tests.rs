// SPDX-License-Identifier: GPL-3.0-only

//! Source layout checks

use std::fs;
use std::path::{Path, PathBuf};

const MAX_LINE_WIDTH: usize = 100;

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn test_lines_fit_rustfmt_width() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = vec![root.join("build.rs")];
    rust_sources(&root.join("src"), &mut files);
    rust_sources(&root.join("tests"), &mut files);

    let mut long_lines = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file).unwrap();
        for (number, line) in text.lines().enumerate() {
            if line.chars().count() > MAX_LINE_WIDTH {
                long_lines.push(format!("{}:{}", file.display(), number + 1));
            }
        }
    }
    assert!(long_lines.is_empty(), "lines over {} columns: {:?}", MAX_LINE_WIDTH, long_lines);
}
