use chrono::Utc;
use std::collections::HashMap;

use vibeflow::aggregate::process_project;
use vibeflow::digest::{DigestCache, DigestKeyMode, MAX_DIGEST_CHARS};
use vibeflow::ingest::{ingest_files, FileBody, FileHandle};
use vibeflow::progress::NoProgress;

const MIB: u64 = 1024 * 1024;

/// A handle whose picker-reported size is non-zero but whose bytes read back empty.
fn reported_but_empty(path: &str) -> FileHandle {
    FileHandle {
        name: path.rsplit('/').next().unwrap().to_string(),
        relative_path: Some(path.to_string()),
        size: 1,
        body: FileBody::Memory(Vec::new()),
    }
}

#[tokio::test]
async fn test_two_file_upload_end_to_end() {
    let handles = vec![
        FileHandle::in_memory("src/a.ts", "function f(){}\n"),
        reported_but_empty("src/b.ts"),
    ];
    let files = ingest_files(&handles, MIB, &NoProgress).await;
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].path, "src/b.ts");
    assert_eq!(files[1].lines, 0);

    let project = process_project(files, Utc::now());
    assert_eq!(project.summary.total_files, 2);
    assert_eq!(project.summary.total_lines, 2);
    assert_eq!(project.summary.extension_histogram.len(), 1);
    assert_eq!(project.summary.extension_histogram[0].extension, "ts");
    assert_eq!(project.summary.extension_histogram[0].count, 2);

    let graph = &project.graph_elements;
    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.data.id.as_str()).collect();
    assert_eq!(ids, vec!["root", "dir:src", "file:src/a.ts", "file:src/b.ts"]);
    let edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.data.source.as_str(), e.data.target.as_str()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("root", "dir:src"),
            ("dir:src", "file:src/a.ts"),
            ("dir:src", "file:src/b.ts"),
        ]
    );
}

#[tokio::test]
async fn test_hidden_and_zero_byte_never_ingested() {
    let handles = vec![
        FileHandle::in_memory("p/.env", "A=1"),
        FileHandle::in_memory("p/.config/settings.json", "{}"),
        FileHandle::in_memory("p/empty.rs", ""),
        FileHandle::in_memory("p/lib.rs", "pub fn x() {}"),
        FileHandle::in_memory("p/.gitignore", "target"),
    ];
    let files = ingest_files(&handles, MIB, &NoProgress).await;
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    // only the leaf name decides hidden-ness
    assert_eq!(paths, vec!["p/.config/settings.json", "p/lib.rs"]);
}

#[tokio::test]
async fn test_large_project_stays_bounded() {
    let handles: Vec<FileHandle> = (0..10_000)
        .map(|i| {
            FileHandle::in_memory(
                format!("repo/pkg{}/module_{:05}.rs", i % 50, i),
                "async fn run() {\n    for x in 0..10 { work(x).await; }\n}\n",
            )
        })
        .collect();
    let files = ingest_files(&handles, MIB, &NoProgress).await;
    let project = process_project(files, Utc::now());

    assert_eq!(project.summary.total_files, 10_000);
    assert_eq!(project.summary.total_lines, 40_000);

    let mut parents: HashMap<&str, usize> = HashMap::new();
    for edge in &project.graph_elements.edges {
        *parents.entry(edge.data.target.as_str()).or_default() += 1;
    }
    assert!(parents.values().all(|&n| n == 1));
    assert_eq!(parents.len(), project.graph_elements.nodes.len() - 1);

    let digest = DigestCache::new(DigestKeyMode::Coarse).digest(&project);
    assert!(digest.digest.chars().count() <= MAX_DIGEST_CHARS);
}
