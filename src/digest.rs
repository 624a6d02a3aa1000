//! Project digest compaction.
//!
//! Compresses a processed project into a labeled text document of at most
//! [`MAX_DIGEST_CHARS`] characters, used as prompt context for the jury.
//! Construct counts are regex tallies over the concatenated sources. They
//! are a language-oblivious heuristic, not a parser.
//!
//! Digests are cached per key for the lifetime of a [`DigestCache`]. The
//! default [`DigestKeyMode::Coarse`] key only looks at file and line totals,
//! so two projects with equal totals share a digest;
//! [`DigestKeyMode::Content`] keys on a SHA-256 of every path and body.

use anyhow::{bail, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::models::{ProcessedProject, ProjectDigest};

pub const MAX_DIGEST_CHARS: usize = 2000;
const FILE_LIST_LEN: usize = 10;
const UNKNOWN_ENTRY_POINT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKeyMode {
    Coarse,
    Content,
}

impl DigestKeyMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "coarse" => Ok(DigestKeyMode::Coarse),
            "content" => Ok(DigestKeyMode::Content),
            other => bail!("Unknown digest key mode: '{}'", other),
        }
    }
}

/// Heuristic construct tallies over all file contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructCounts {
    pub loops: usize,
    pub async_ops: usize,
    pub classes: usize,
    pub functions: usize,
}

struct ConstructPatterns {
    loops: Regex,
    async_ops: Regex,
    classes: Regex,
    functions: Regex,
}

fn patterns() -> &'static ConstructPatterns {
    static PATTERNS: OnceLock<ConstructPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ConstructPatterns {
        loops: Regex::new(r"(?-u:\b)(for|while|forEach|map)(?-u:\b)").expect("static regex"),
        async_ops: Regex::new(r"(?-u:\b)(async|await|Promise)(?-u:\b)").expect("static regex"),
        classes: Regex::new(r"(?-u:\b)class\s+(?-u:\w)+").expect("static regex"),
        functions: Regex::new(r"(?-u:\b)function\s+(?-u:\w)+").expect("static regex"),
    })
}

pub fn count_constructs(code: &str) -> ConstructCounts {
    let p = patterns();
    ConstructCounts {
        loops: p.loops.find_iter(code).count(),
        async_ops: p.async_ops.find_iter(code).count(),
        classes: p.classes.find_iter(code).count(),
        functions: p.functions.find_iter(code).count(),
    }
}

/// First path (in path order) containing `main` or `index`.
pub fn entry_point(project: &ProcessedProject) -> &str {
    project
        .files
        .iter()
        .map(|f| f.path.as_str())
        .find(|p| p.contains("main") || p.contains("index"))
        .unwrap_or(UNKNOWN_ENTRY_POINT)
}

/// 32-bit shift-and-add string hash over UTF-16 units, rendered in base 36.
///
/// Only a cache-consistency token; not collision resistant.
pub fn hash_string(s: &str) -> String {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = value.unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

pub fn cache_key(project: &ProcessedProject, mode: DigestKeyMode) -> String {
    match mode {
        DigestKeyMode::Coarse => format!(
            r#"{{"totalFiles":{},"totalLines":{}}}"#,
            project.summary.total_files, project.summary.total_lines
        ),
        DigestKeyMode::Content => {
            let mut hasher = Sha256::new();
            for file in &project.files {
                hasher.update(file.path.as_bytes());
                hasher.update([0u8]);
                hasher.update(file.content.as_bytes());
                hasher.update([0u8]);
            }
            hex::encode(hasher.finalize())
        }
    }
}

/// Render the digest text without caching.
pub fn render_digest(project: &ProcessedProject) -> String {
    let all_code = project
        .files
        .iter()
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let counts = count_constructs(&all_code);

    let file_names = project
        .files
        .iter()
        .take(FILE_LIST_LEN)
        .map(|f| f.path.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let extensions = project
        .summary
        .extension_histogram
        .iter()
        .map(|e| format!("{}: {}", e.extension, e.count))
        .collect::<Vec<_>>()
        .join(", ");

    let text = format!(
        "PROJECT OVERVIEW:\n\
         - Files: {}\n\
         - Total Lines: {}\n\
         - Entry Point: {}\n\
         \n\
         CODE CONSTRUCTS:\n\
         - Loops: {}\n\
         - Async Operations: {}\n\
         - Classes: {}\n\
         - Functions: {}\n\
         \n\
         FILE LIST (top 10):\n\
         {}\n\
         \n\
         EXTENSIONS:\n\
         {}",
        project.summary.total_files,
        project.summary.total_lines,
        entry_point(project),
        counts.loops,
        counts.async_ops,
        counts.classes,
        counts.functions,
        file_names,
        extensions,
    );

    text.trim().chars().take(MAX_DIGEST_CHARS).collect()
}

/// Process-lifetime digest cache.
pub struct DigestCache {
    mode: DigestKeyMode,
    entries: Mutex<HashMap<String, ProjectDigest>>,
}

impl DigestCache {
    pub fn new(mode: DigestKeyMode) -> Self {
        Self {
            mode,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached digest for this project's key, building it on a miss.
    pub fn digest(&self, project: &ProcessedProject) -> ProjectDigest {
        let key = cache_key(project, self.mode);

        if let Ok(entries) = self.entries.lock() {
            if let Some(hit) = entries.get(&key) {
                tracing::debug!(hash = %hit.hash, "digest cache hit");
                return hit.clone();
            }
        }

        let result = ProjectDigest {
            digest: render_digest(project),
            hash: hash_string(&key),
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::process_project;
    use crate::ingest::{count_lines, extension_of};
    use crate::models::ProjectFile;
    use chrono::Utc;

    fn project(files: &[(&str, &str)]) -> ProcessedProject {
        let mut files: Vec<ProjectFile> = files
            .iter()
            .map(|(path, content)| ProjectFile {
                name: path.rsplit('/').next().unwrap().to_string(),
                path: path.to_string(),
                content: content.to_string(),
                extension: extension_of(path),
                lines: count_lines(content),
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        process_project(files, Utc::now())
    }

    #[test]
    fn test_construct_counts() {
        let code = "async function load() {\n  for (const x of xs) { await x; }\n  xs.map(f).forEach(g);\n}\nclass Store {}\nformat(); information;";
        let counts = count_constructs(code);
        assert_eq!(counts.loops, 3);
        assert_eq!(counts.async_ops, 2);
        assert_eq!(counts.classes, 1);
        assert_eq!(counts.functions, 1);
    }

    #[test]
    fn test_word_classes_are_ascii() {
        // non-ASCII letters are not word characters
        let counts = count_constructs("forñ = 1;\nfunction ñame() {}\nclass Café {}");
        assert_eq!(counts.loops, 1);
        assert_eq!(counts.functions, 0);
        assert_eq!(counts.classes, 1);
    }

    #[test]
    fn test_entry_point_detection() {
        let p = project(&[("app/util.js", "x"), ("app/index.js", "y"), ("app/main.js", "z")]);
        assert_eq!(entry_point(&p), "app/index.js");
        let p = project(&[("lib.rs", "x")]);
        assert_eq!(entry_point(&p), "unknown");
    }

    #[test]
    fn test_digest_sections() {
        let p = project(&[("src/a.ts", "function f(){}\n"), ("src/b.ts", "")]);
        let text = render_digest(&p);
        assert!(text.starts_with("PROJECT OVERVIEW:\n- Files: 2\n- Total Lines: 2"));
        assert!(text.contains("- Entry Point: unknown"));
        assert!(text.contains("- Functions: 1"));
        assert!(text.contains("FILE LIST (top 10):\nsrc/a.ts, src/b.ts"));
        assert!(text.ends_with("EXTENSIONS:\nts: 2"));
    }

    #[test]
    fn test_file_list_limited_to_ten() {
        let owned: Vec<(String, String)> = (0..15)
            .map(|i| (format!("f{:02}.rs", i), "x".to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = owned.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let text = render_digest(&project(&refs));
        assert!(text.contains("f09.rs"));
        assert!(!text.contains("f10.rs"));
    }

    #[test]
    fn test_digest_bounded_for_huge_project() {
        let owned: Vec<(String, String)> = (0..10_000)
            .map(|i| {
                (
                    format!("very/deep/directory/structure/number_{:05}/file_with_long_name.ext{}", i, i % 40),
                    "for (;;) { await p; }\n".to_string(),
                )
            })
            .collect();
        let refs: Vec<(&str, &str)> = owned.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let text = render_digest(&project(&refs));
        assert!(text.chars().count() <= MAX_DIGEST_CHARS);
    }

    #[test]
    fn test_hash_string_matches_reference_values() {
        assert_eq!(hash_string(""), "0");
        assert_eq!(hash_string("a"), "2p");
        // 31 * 97 + 98 = 3105
        assert_eq!(hash_string("ab"), "2e9");
        assert_eq!(hash_string("hello world"), "to5x38");
        // wraps into the negative range
        assert_eq!(hash_string(r#"{"totalFiles":1,"totalLines":1}"#), "-spvmjw");
    }

    #[test]
    fn test_coarse_cache_collides_on_equal_totals() {
        let cache = DigestCache::new(DigestKeyMode::Coarse);
        let first = cache.digest(&project(&[("a.rs", "fn a() {}")]));
        let second = cache.digest(&project(&[("b.py", "def b(): pass")]));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(first.hash, hash_string(r#"{"totalFiles":1,"totalLines":1}"#));
    }

    #[test]
    fn test_content_cache_separates_projects() {
        let cache = DigestCache::new(DigestKeyMode::Content);
        let first = cache.digest(&project(&[("a.rs", "fn a() {}")]));
        let second = cache.digest(&project(&[("b.py", "def b(): pass")]));
        assert_ne!(first.digest, second.digest);
        assert_eq!(cache.len(), 2);
        let again = cache.digest(&project(&[("a.rs", "fn a() {}")]));
        assert_eq!(first, again);
        assert_eq!(cache.len(), 2);
    }
}
