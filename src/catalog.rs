//! Remote dataset catalog - search and fetch RAW dataset archives
//!
//! Talks to the Pennsieve discover API. Downloaded archives are unpacked
//! into the data directory, where the spreadsheets under `files/derivative`
//! can be read directly by `dataset`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One search hit, trimmed to the fields worth showing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: u64,
    pub version: u64,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    datasets: Vec<DatasetSummary>,
}

fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent("NeuronProjector/0.1")
        .timeout(std::time::Duration::from_secs(300))
        .build()?)
}

/// Search the catalog for datasets matching a keyword, most relevant first
pub async fn search_datasets(api_base: &str, query: &str, limit: usize) -> Result<Vec<DatasetSummary>> {
    let url = format!(
        "{}/discover/search/datasets?limit={}&offset=0&query={}&orderBy=relevance&orderDirection=desc",
        api_base.trim_end_matches('/'),
        limit,
        urlencoding::encode(query)
    );
    tracing::info!("Searching catalog for '{}' (limit {})", query, limit);
    tracing::debug!("Fetching from: {}", url);

    let response = client()?
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("Catalog search returned status {}", response.status());
    }

    let body = response.text().await?;
    let datasets = parse_search_response(&body)?;
    tracing::info!("Catalog returned {} datasets", datasets.len());
    Ok(datasets)
}

/// Decode a search response body
pub fn parse_search_response(body: &str) -> Result<Vec<DatasetSummary>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.datasets)
}

/// Folder name used for a downloaded dataset
pub fn dataset_dir_name(id: u64, version: u64) -> String {
    format!("Pennsieve-dataset-{}-version-{}", id, version)
}

/// Download a dataset version archive and unpack it into `output_dir`.
///
/// The body is streamed to a `.part` file that only becomes the real
/// archive once every chunk arrived; the archive is deleted after unpacking.
/// Returns the unpacked dataset folder.
pub async fn download_dataset(api_base: &str, id: u64, version: u64, output_dir: &Path) -> Result<PathBuf> {
    let url = format!(
        "{}/discover/datasets/{}/versions/{}/download?",
        api_base.trim_end_matches('/'),
        id,
        version
    );
    tracing::info!("Downloading dataset {} version {}", id, version);
    tracing::debug!("Fetching from: {}", url);

    let response = client()?.get(&url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("Dataset {} v{} download returned status {}", id, version, response.status());
    }

    tokio::fs::create_dir_all(output_dir).await?;
    let name = dataset_dir_name(id, version);
    let archive = output_dir.join(format!("{}.zip", name));
    let partial = output_dir.join(format!("{}.zip.part", name));

    let streamed = stream_to_file(response, &partial).await;
    let written = commit_partial(&partial, &archive, streamed).await?;
    tracing::info!("Saved {} bytes to {:?}", written, archive);

    let dest = output_dir.to_path_buf();
    let unpack_from = archive.clone();
    let entries = tokio::task::spawn_blocking(move || unpack_archive(&unpack_from, &dest)).await??;
    tracing::info!("Unpacked {} entries from {:?}", entries, archive);

    Ok(output_dir.join(name))
}

async fn stream_to_file(mut response: reqwest::Response, path: &Path) -> Result<usize> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}

/// Rename a finished `.part` file into place, or delete it when the
/// transfer failed so no truncated archive is left behind
async fn commit_partial(partial: &Path, target: &Path, streamed: Result<usize>) -> Result<usize> {
    match streamed {
        Ok(written) => {
            tokio::fs::rename(partial, target).await?;
            Ok(written)
        }
        Err(e) => {
            tracing::warn!("Download failed, removing {:?}", partial);
            tokio::fs::remove_file(partial).await.ok();
            Err(e)
        }
    }
}

/// Extract a zip archive into `dest` and remove the archive.
///
/// Returns the number of entries in the archive.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let entries = zip.len();
    zip.extract(dest)?;
    drop(zip);

    std::fs::remove_file(archive)?;
    tracing::debug!("Removed archive {:?}", archive);
    Ok(entries)
}

/// Indented listing of a directory, four spaces per level.
///
/// Directories at depth `max_level` and below are not listed.
pub fn folder_tree(root: &Path, max_level: usize) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    walk_tree(root, 0, max_level, &mut lines)?;
    Ok(lines)
}

fn walk_tree(dir: &Path, level: usize, max_level: usize, lines: &mut Vec<String>) -> Result<()> {
    if level >= max_level {
        return Ok(());
    }

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    lines.push(format!("{}{}/", " ".repeat(4 * level), name));

    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    let indent = " ".repeat(4 * (level + 1));
    let mut subdirs = Vec::new();
    for entry in entries {
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        } else {
            lines.push(format!("{}{}", indent, entry.file_name().to_string_lossy()));
        }
    }

    for sub in subdirs {
        walk_tree(&sub, level + 1, max_level, lines)?;
    }
    Ok(())
}
