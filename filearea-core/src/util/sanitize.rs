use crate::error::{FileAreaError, Result};

/// Normalize a directory path to the stored form: leading and trailing `/`,
/// no empty, `.` or `..` segments.
pub fn normalize_dir_path(path: &str) -> Result<String> {
    let mut out = String::from("/");
    for seg in path.split('/') {
        if seg.is_empty() {
            continue;
        }
        check_segment(seg, path)?;
        out.push_str(seg);
        out.push('/');
    }
    Ok(out)
}

/// Filenames may be empty (directory entries) but never contain separators.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Ok(());
    }
    if name.contains('/') {
        return Err(FileAreaError::InvalidPath(format!(
            "filename contains '/': {name}"
        )));
    }
    check_segment(name, name)
}

fn check_segment(seg: &str, whole: &str) -> Result<()> {
    if seg == "." || seg == ".." {
        return Err(FileAreaError::InvalidPath(format!(
            "relative segment in {whole}"
        )));
    }
    if seg.chars().any(|c| c.is_control()) {
        return Err(FileAreaError::InvalidPath(format!(
            "control character in {whole:?}"
        )));
    }
    Ok(())
}

/// Split "/a/b/c.txt" into ("/a/b/", "c.txt"); a trailing slash yields an empty filename.
pub fn split_file_path(full: &str) -> Result<(String, String)> {
    match full.rfind('/') {
        Some(idx) => {
            let dir = normalize_dir_path(&full[..=idx])?;
            let name = full[idx + 1..].to_string();
            validate_filename(&name)?;
            Ok((dir, name))
        }
        None => {
            validate_filename(full)?;
            Ok(("/".to_string(), full.to_string()))
        }
    }
}

/// Every directory on the way to `path`, root first: "/a/b/" -> ["/", "/a/", "/a/b/"].
pub fn ancestor_dirs(path: &str) -> Vec<String> {
    let mut out = vec!["/".to_string()];
    let mut cur = String::from("/");
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        cur.push_str(seg);
        cur.push('/');
        out.push(cur.clone());
    }
    out
}
