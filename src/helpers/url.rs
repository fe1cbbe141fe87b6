//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// Characters escaped inside a single URL path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Directory-safe form of a category or tag label
///
/// Labels made only of dots (or nothing) become dashes so they can never
/// name the current or parent directory.
///
/// # Examples
/// ```ignore
/// label_segment("C/C++") // -> "C-C++"
/// label_segment("..") // -> "--"
/// ```
pub fn label_segment(label: &str) -> String {
    let segment: String = label
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    if segment.is_empty() {
        "-".to_string()
    } else if segment.chars().all(|c| c == '.') {
        segment.replace('.', "-")
    } else {
        segment
    }
}

/// Root-relative URL of a label page, e.g. `/tags/rust/`
pub fn label_url(dir: &str, label: &str) -> String {
    let segment = utf8_percent_encode(&label_segment(label), PATH_SEGMENT).to_string();
    format!("/{}/{}/", dir.trim_matches('/'), segment)
}

/// Root-relative URL for a site path, always with leading and trailing slash
///
/// # Examples
/// ```ignore
/// page_url("2024/03/05/hello") // -> "/2024/03/05/hello/"
/// page_url("") // -> "/"
/// ```
pub fn page_url(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", path)
    }
}

/// Location of the `index.html` serving a site path under `output_dir`
///
/// `.` and `..` segments are dropped, so the file stays inside `output_dir`.
pub fn index_file(output_dir: &Path, path: &str) -> PathBuf {
    let mut file = output_dir.to_path_buf();
    for segment in path
        .split(['/', '\\'])
        .filter(|s| !matches!(*s, "" | "." | ".."))
    {
        file.push(segment);
    }
    file.join("index.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_url() {
        assert_eq!(label_url("tags", "rust"), "/tags/rust/");
        assert_eq!(label_url("/categories/", "C/C++"), "/categories/C-C%2B%2B/");
        assert_eq!(label_url("tags", "笔记"), "/tags/%E7%AC%94%E8%AE%B0/");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("2024/03/05/hello"), "/2024/03/05/hello/");
        assert_eq!(page_url("/page/2/"), "/page/2/");
        assert_eq!(page_url(""), "/");
    }

    #[test]
    fn test_index_file() {
        let out = Path::new("/site/dist");
        assert_eq!(
            index_file(out, "/2024/03/05/hello"),
            PathBuf::from("/site/dist/2024/03/05/hello/index.html")
        );
        assert_eq!(index_file(out, ""), PathBuf::from("/site/dist/index.html"));
        assert_eq!(
            index_file(out, "tags/../../x"),
            PathBuf::from("/site/dist/tags/x/index.html")
        );
    }

    #[test]
    fn test_dot_labels_stay_in_place() {
        assert_eq!(label_segment(".."), "--");
        assert_eq!(label_segment(" . "), "-");
        assert_eq!(label_segment(""), "-");
        assert_eq!(label_segment("v1.0"), "v1.0");
        assert_eq!(label_url("tags", ".."), "/tags/--/");
    }
}
