use std::{
    collections::HashMap,
    io::{Cursor, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use pkghub_registry::{
    group_by_version, resolve_archive_bytes, ArchiveResolver, ErrorKind, Fetcher, IndexCache,
    IndexSource, Package, PackageManifest, RegistryError, Result, MAX_ENTRY_BYTES,
};
use serde_json::json;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

const INDEX_URL: &str = "https://hub.example.com/package_index.json";

/// Serves canned bodies, counting requests. URLs listed in `failures`
/// fail that many times before succeeding.
#[derive(Default)]
struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failures: HashMap<String, AtomicUsize>,
    calls: AtomicUsize,
    delay: Duration,
}

impl MockFetcher {
    fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    fn failing(mut self, url: &str, times: usize) -> Self {
        self.failures.insert(url.to_string(), AtomicUsize::new(times));
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);

        if let Some(remaining) = self.failures.get(url) {
            let failing = remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(RegistryError::HttpStatus {
                    url: url.to_string(),
                    status: 503,
                });
            }
        }

        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn entry(name: &str, version: &str) -> serde_json::Value {
    json!({
        "name": name,
        "author": "Someone",
        "description": format!("{name} description"),
        "title": name,
        "version": version,
        "archive_url": format!("https://hub.example.com/{name}-{version}.zip"),
        "archive_sha256_url": format!("https://hub.example.com/{name}-{version}.sha256.txt"),
        "tags": ["text"],
    })
}

fn index_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "last_update": 1_700_000_000,
        "packages": [
            entry("dummy-package", "0.1.0"),
            entry("lorem", "0.1.0"),
            entry("lorem", "0.2.0"),
            entry("emoji", "1.10.0"),
            entry("emoji", "1.9.0"),
            { "name": "broken", "version": "x.y.z" },
        ],
    }))
    .unwrap()
}

fn zip_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

const MANIFEST: &[u8] = b"\
name: lorem
title: Lorem
description: Lorem ipsum generator
version: 0.2.0
author: Someone
homepage: https://github.com/someone/lorem
tags: [text, placeholder]
";

fn source(fetcher: MockFetcher) -> (IndexSource, Arc<MockFetcher>) {
    let fetcher = Arc::new(fetcher);
    let source = IndexSource::new(INDEX_URL, fetcher.clone(), IndexCache::new());
    (source, fetcher)
}

#[tokio::test]
async fn test_index_is_validated_and_sentinel_removed() {
    let (source, _) = source(MockFetcher::default().with(INDEX_URL, index_body()));

    let index = source.get_packages_index().await.unwrap();
    let names: Vec<_> = index.packages.iter().map(|p| p.name.as_str()).collect();

    assert_eq!(names, ["lorem", "lorem", "emoji", "emoji"]);
    assert_eq!(index.last_update, 1_700_000_000);

    let grouped = group_by_version(index.packages.clone()).unwrap();
    assert_eq!(grouped.get("emoji").unwrap().latest().version, "1.10.0");
    assert_eq!(grouped.get("lorem").unwrap().versions(), ["0.2.0", "0.1.0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_fetch_once() {
    let (source, fetcher) = source(
        MockFetcher::default()
            .with(INDEX_URL, index_body())
            .delayed(Duration::from_millis(100)),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let source = source.clone();
            tokio::spawn(async move { source.get_packages_index().await })
        })
        .collect();

    let mut indexes = Vec::new();
    for handle in handles {
        indexes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(indexes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

    source.get_packages_index().await.unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_retried() {
    let (source, fetcher) = source(
        MockFetcher::default()
            .with(INDEX_URL, index_body())
            .failing(INDEX_URL, 1),
    );

    let err = source.get_packages_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(source.cache().get().is_none());

    let index = source.get_packages_index().await.unwrap();
    assert_eq!(index.packages.len(), 4);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalidate_refetches() {
    let (source, fetcher) = source(MockFetcher::default().with(INDEX_URL, index_body()));

    source.get_packages_index().await.unwrap();
    source.invalidate();
    source.get_packages_index().await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_index_is_format_error() {
    let (source, _) = source(MockFetcher::default().with(INDEX_URL, b"{ not json".to_vec()));

    let err = source.get_packages_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[tokio::test]
async fn test_wrong_document_shape_is_validation_error() {
    let body = serde_json::to_vec(&json!({ "last_update": "yesterday", "packages": [] })).unwrap();
    let (source, _) = source(MockFetcher::default().with(INDEX_URL, body));

    let err = source.get_packages_index().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

fn lorem() -> Package {
    Package::decode(entry("lorem", "0.2.0")).unwrap()
}

#[tokio::test]
async fn test_resolve_archive() {
    let package = lorem();
    let archive = zip_archive(&[
        ("lorem/", b""),
        ("_manifest.yml", MANIFEST),
        ("README.md", b"# Lorem\n![demo](images/demo.gif)"),
        ("package.yml", b"matches:\n  - trigger: ':lorem'\n"),
        ("LICENSE", b"MIT License"),
        ("extra.yml", b"matches: []\n"),
        ("images/demo.gif", &[0x47, 0x49, 0x46, 0xff, 0xfe]),
    ]);
    let fetcher = Arc::new(MockFetcher::default().with(&package.archive_url, archive));
    let resolver = ArchiveResolver::new(fetcher);

    let repo = resolver.resolve(&package).await.unwrap();

    assert_eq!(repo.package, package);
    assert_eq!(repo.manifest.tags.len(), 2);
    let yaml = repo.manifest.to_yaml().unwrap();
    assert_eq!(PackageManifest::parse(&package.id, &yaml).unwrap(), repo.manifest);
    assert_eq!(repo.license.as_deref(), Some("MIT License"));
    let files: Vec<_> = repo.package_yml.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(files, ["package.yml", "extra.yml"]);
    assert_eq!(
        repo.resolve_asset(repo.readme_images()[0]).unwrap(),
        "https://github.com/someone/lorem/raw/master/images/demo.gif"
    );
}

#[tokio::test]
async fn test_archive_without_readme() {
    let package = lorem();
    let archive = zip_archive(&[("_manifest.yml", MANIFEST), ("package.yml", b"matches: []")]);
    let resolver = ArchiveResolver::new(Arc::new(
        MockFetcher::default().with(&package.archive_url, archive),
    ));

    let err = resolver.resolve(&package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingEntry);
    assert_eq!(err.to_string(), "Missing README.md");
}

#[tokio::test]
async fn test_archive_with_corrupt_manifest() {
    let package = lorem();
    let archive = zip_archive(&[
        ("_manifest.yml", b"name: [unclosed"),
        ("README.md", b"# Lorem"),
        ("package.yml", b"matches: []"),
    ]);
    let resolver = ArchiveResolver::new(Arc::new(
        MockFetcher::default().with(&package.archive_url, archive),
    ));

    let err = resolver.resolve(&package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[tokio::test]
async fn test_archive_that_is_not_a_zip() {
    let package = lorem();
    let resolver = ArchiveResolver::new(Arc::new(
        MockFetcher::default().with(&package.archive_url, b"<html>".to_vec()),
    ));

    let err = resolver.resolve(&package).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArchive { .. }));
}

#[tokio::test]
async fn test_unreachable_archive() {
    let resolver = ArchiveResolver::new(Arc::new(MockFetcher::default()));

    let err = resolver.resolve(&lorem()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

fn read_u16(bytes: &[u8], at: usize) -> usize {
    u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize
}

/// Rewrites the uncompressed size that the central directory declares for
/// `entry`, moving it into the zip64 extra field.
fn declare_uncompressed_size(archive: &mut [u8], entry: &str, size: u64) {
    let mut at = 0;
    while at + 46 <= archive.len() {
        if archive[at..at + 4] != [0x50, 0x4b, 0x01, 0x02] {
            at += 1;
            continue;
        }
        let name_len = read_u16(archive, at + 28);
        let extra_len = read_u16(archive, at + 30);
        let name_start = at + 46;
        if &archive[name_start..name_start + name_len] == entry.as_bytes() {
            let mut field = name_start + name_len;
            let end = field + extra_len;
            while field + 4 <= end {
                let id = read_u16(archive, field);
                let len = read_u16(archive, field + 2);
                if id == 0x0001 {
                    archive[at + 24..at + 28].copy_from_slice(&u32::MAX.to_le_bytes());
                    archive[field + 4..field + 12].copy_from_slice(&size.to_le_bytes());
                    return;
                }
                field += 4 + len;
            }
        }
        at += 46;
    }
    panic!("no zip64 size declared for {entry}");
}

#[test]
fn test_archive_with_huge_declared_size() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);
    writer.start_file("_manifest.yml", stored).unwrap();
    writer.write_all(MANIFEST).unwrap();
    writer.start_file("README.md", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"# Lorem").unwrap();
    writer.start_file("package.yml", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"matches: []").unwrap();
    let mut archive = writer.finish().unwrap().into_inner();
    declare_uncompressed_size(&mut archive, "_manifest.yml", 1 << 46);

    match resolve_archive_bytes(&lorem(), archive) {
        Ok(repo) => assert_eq!(repo.manifest.name, "lorem"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Format),
    }
}

#[test]
fn test_archive_with_oversized_entry() {
    let readme = vec![b'a'; MAX_ENTRY_BYTES as usize + 1];
    let archive = zip_archive(&[
        ("_manifest.yml", MANIFEST),
        ("README.md", &readme),
        ("package.yml", b"matches: []"),
    ]);

    let err = resolve_archive_bytes(&lorem(), archive).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::EntryTooLarge { ref name, limit } if name == "README.md" && limit == MAX_ENTRY_BYTES
    ));
    assert_eq!(err.kind(), ErrorKind::Format);
}
