//! Writing downloaded files: `.part` temp file, then atomic rename to a
//! name that does not clobber existing files.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `td2.pdf` → `td2.pdf.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// First of `name`, `stem (1).ext`, `stem (2).ext`, ... not present in `dir`.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Saves `bytes` under `dir` and returns the final path.
pub fn save_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let final_path = unique_destination(dir, name);
    let tmp = temp_path(&final_path);

    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("failed to create temp file: {}", tmp.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("writing {}", tmp.display()))?;
    file.sync_all().context("storage sync failed")?;
    drop(file);

    fs::rename(&tmp, &final_path).with_context(|| {
        format!("failed to rename {} to {}", tmp.display(), final_path.display())
    })?;
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("/tmp/td2.pdf"));
        assert_eq!(p.to_string_lossy(), "/tmp/td2.pdf.part");
    }

    #[test]
    fn save_writes_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_file(dir.path(), "td2.pdf", b"%PDF").unwrap();
        assert_eq!(path, dir.path().join("td2.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_file(dir.path(), "cours.pdf", b"one").unwrap();
        let second = save_file(dir.path(), "cours.pdf", b"two").unwrap();
        let third = save_file(dir.path(), "cours.pdf", b"three").unwrap();
        assert_eq!(second, dir.path().join("cours (1).pdf"));
        assert_eq!(third, dir.path().join("cours (2).pdf"));
        assert_eq!(fs::read(first).unwrap(), b"one");
    }

    #[test]
    fn names_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        save_file(dir.path(), "document", b"a").unwrap();
        assert_eq!(
            unique_destination(dir.path(), "document"),
            dir.path().join("document (1)")
        );
    }

    #[test]
    fn creates_missing_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        let path = save_file(&out, "x.txt", b"x").unwrap();
        assert!(path.starts_with(&out));
    }
}
