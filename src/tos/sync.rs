//! One-directional tree sync between a local path and a bucket prefix
//!
//! Upload layout: a directory `…/model_dir` is stored under
//! `<prefix>model_dir/<relative path>`; a single file under `<prefix><name>`.
//! The resulting remote path is always the containing prefix, so download
//! reproduces the directory's contents (not the directory itself) under the
//! destination.
//!
//! Download walks the remote tree with an explicit stack of pending prefixes,
//! one listing page at a time, depth-first and strictly sequential.

use super::path::{RemotePath, key_for_relative_path, relative_key_path};
use super::{ListObjectsRequest, ObjectStore};
use crate::config::DATASET_LOCAL_METADATA_FILENAME;
use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum entries requested per listing page
pub const LIST_PAGE_SIZE: u32 = 1000;
/// Path delimiter used to roll keys up into directories
pub const DELIMITER: &str = "/";
/// Truncated pages in a row that may leave the marker unchanged without
/// yielding anything new
const MAX_STALLED_PAGES: usize = 16;

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub remote_path: RemotePath,
    pub objects: usize,
    pub bytes: u64,
}

/// Result of a download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub objects: usize,
    pub bytes: u64,
    /// Objects not written: shadowed by a local directory or outside the root
    pub skipped: usize,
    pub list_calls: usize,
}

fn progress_bar(len: Option<u64>, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    match len {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {pos} objects {msg}") {
                bar.set_style(style);
            }
            bar
        }
    }
}

/// Upload a file or directory tree under `key_prefix`
pub async fn upload_tree(
    store: &dyn ObjectStore,
    local_path: &Path,
    bucket: &str,
    key_prefix: &str,
    show_progress: bool,
) -> Result<UploadSummary> {
    let metadata = tokio::fs::metadata(local_path).await?;

    let mut prefix = key_prefix.to_string();
    if !prefix.is_empty() && !prefix.ends_with(DELIMITER) {
        prefix.push_str(DELIMITER);
    }

    let mut files: Vec<(PathBuf, String)> = Vec::new();
    if metadata.is_file() {
        let name = local_path
            .file_name()
            .ok_or_else(|| Error::invalid(format!("{:?} has no file name", local_path)))?;
        files.push((
            local_path.to_path_buf(),
            format!("{}{}", prefix, name.to_string_lossy()),
        ));
    } else if metadata.is_dir() {
        // `.` and `/` carry no name of their own
        if let Some(name) = local_path.file_name() {
            prefix = format!("{}{}{}", prefix, name.to_string_lossy(), DELIMITER);
        }

        for entry in WalkDir::new(local_path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let message = e.to_string();
                e.into_io_error()
                    .map(Error::Io)
                    .unwrap_or_else(|| Error::invalid(message))
            })?;
            // Symlinked files are uploaded with their target's contents
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file || entry.file_name() == DATASET_LOCAL_METADATA_FILENAME {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(local_path)
                .map_err(|e| Error::invalid(e.to_string()))?;
            files.push((
                entry.path().to_path_buf(),
                key_for_relative_path(&prefix, relative),
            ));
        }
    } else {
        return Err(Error::invalid(format!(
            "{:?} is neither a file nor a directory",
            local_path
        )));
    }

    tracing::info!(
        local_path = ?local_path,
        bucket = %bucket,
        prefix = %prefix,
        files = files.len(),
        "Uploading to object storage"
    );

    let bar = progress_bar(Some(files.len() as u64), show_progress);
    let mut bytes = 0u64;
    for (path, key) in &files {
        bar.set_message(key.clone());
        let sent = store.upload_file(path, bucket, key).await?;
        crate::metrics::record_object_uploaded(sent);
        bytes += sent;
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok(UploadSummary {
        remote_path: RemotePath::new(bucket, &prefix),
        objects: files.len(),
        bytes,
    })
}

/// Download everything under `remote` into `local_root`
///
/// When a local directory already occupies an object's target path the object
/// is skipped: directories take precedence over files.
pub async fn download_tree(
    store: &dyn ObjectStore,
    remote: &RemotePath,
    local_root: &Path,
    show_progress: bool,
) -> Result<DownloadSummary> {
    let base = remote.list_prefix();
    tokio::fs::create_dir_all(local_root).await?;

    tracing::info!(
        remote_path = %remote,
        local_path = ?local_root,
        "Downloading from object storage"
    );

    let bar = progress_bar(None, show_progress);
    let mut summary = DownloadSummary::default();
    let mut visited: HashSet<String> = HashSet::from([base.clone()]);
    let mut pending = vec![base.clone()];

    while let Some(prefix) = pending.pop() {
        let mut marker = String::new();
        let mut stalled = 0usize;
        let mut children = Vec::new();

        loop {
            let request = ListObjectsRequest {
                bucket: remote.bucket.clone(),
                prefix: prefix.clone(),
                delimiter: DELIMITER.to_string(),
                marker: marker.clone(),
                max_keys: LIST_PAGE_SIZE,
            };
            let page = store.list_objects(&request).await?;
            crate::metrics::record_list_page();
            summary.list_calls += 1;
            let mut progressed = false;

            for child in &page.common_prefixes {
                if !visited.insert(child.prefix.clone()) {
                    continue;
                }
                progressed = true;
                match relative_key_path(&base, &child.prefix) {
                    Some(relative) => {
                        tokio::fs::create_dir_all(local_root.join(relative)).await?;
                        children.push(child.prefix.clone());
                    }
                    None => {
                        tracing::warn!(prefix = %child.prefix, "Skipping prefix outside download root");
                    }
                }
            }

            for object in &page.contents {
                fetch_object(store, &remote.bucket, &base, &object.key, local_root, &mut summary)
                    .await?;
                bar.set_position(summary.objects as u64);
            }

            if !page.is_truncated {
                break;
            }

            let next = page
                .next_marker
                .filter(|m| !m.is_empty())
                .or_else(|| page.contents.last().map(|o| o.key.clone()))
                .unwrap_or_else(|| marker.clone());

            if next == marker && !progressed {
                stalled += 1;
                if stalled >= MAX_STALLED_PAGES {
                    return Err(Error::rejected(
                        "ListStalled",
                        format!("listing of {} did not advance past '{}'", prefix, marker),
                    ));
                }
            } else {
                stalled = 0;
            }
            marker = next;
        }

        // Reverse so the first listed child is visited next
        pending.extend(children.into_iter().rev());
    }

    // The remote path may name a single object rather than a prefix
    if summary.list_calls == 1 && summary.objects == 0 && summary.skipped == 0 && !remote.key.is_empty()
    {
        download_single_object(store, remote, local_root, &mut summary).await?;
    }

    bar.finish_and_clear();

    tracing::info!(
        remote_path = %remote,
        objects = summary.objects,
        skipped = summary.skipped,
        bytes = summary.bytes,
        "Download complete"
    );

    Ok(summary)
}

async fn fetch_object(
    store: &dyn ObjectStore,
    bucket: &str,
    base: &str,
    key: &str,
    local_root: &Path,
    summary: &mut DownloadSummary,
) -> Result<()> {
    let Some(relative) = relative_key_path(base, key) else {
        tracing::warn!(key = %key, "Skipping object outside download root");
        summary.skipped += 1;
        return Ok(());
    };

    let dest = local_root.join(&relative);

    // Directory placeholder objects
    if key.ends_with(DELIMITER) || relative.as_os_str().is_empty() {
        tokio::fs::create_dir_all(&dest).await?;
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if tokio::fs::metadata(&dest)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        tracing::debug!(key = %key, path = ?dest, "Local directory shadows object, skipping");
        summary.skipped += 1;
        return Ok(());
    }

    let bytes = store.download_file(bucket, key, &dest).await?;
    crate::metrics::record_object_downloaded(bytes);
    summary.objects += 1;
    summary.bytes += bytes;
    Ok(())
}

async fn download_single_object(
    store: &dyn ObjectStore,
    remote: &RemotePath,
    local_root: &Path,
    summary: &mut DownloadSummary,
) -> Result<()> {
    let request = ListObjectsRequest {
        bucket: remote.bucket.clone(),
        prefix: remote.key.clone(),
        delimiter: DELIMITER.to_string(),
        marker: String::new(),
        max_keys: LIST_PAGE_SIZE,
    };
    let page = store.list_objects(&request).await?;
    summary.list_calls += 1;

    if !page.contents.iter().any(|o| o.key == remote.key) {
        tracing::warn!(remote_path = %remote, "Nothing found under remote path");
        return Ok(());
    }

    let name = remote
        .key
        .rsplit(DELIMITER)
        .next()
        .unwrap_or(remote.key.as_str());
    let dest = local_root.join(name);
    if tokio::fs::metadata(&dest).await.map(|m| m.is_dir()).unwrap_or(false) {
        summary.skipped += 1;
        return Ok(());
    }

    let bytes = store.download_file(&remote.bucket, &remote.key, &dest).await?;
    crate::metrics::record_object_downloaded(bytes);
    summary.objects += 1;
    summary.bytes += bytes;
    Ok(())
}
