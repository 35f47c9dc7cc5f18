//! Overlay data format for packed executables
//!
//! The overlay is appended to the end of a launcher executable and carries
//! the launcher configuration and the resource bundle.
//!
//! ## Format
//!
//! ```text
//! [Launcher Executable]
//! [Overlay Header]
//!   - Magic: "JPAK" (4 bytes)
//!   - Version: u32 LE (4 bytes)
//!   - Config Length: u64 LE (8 bytes)
//!   - Resources Length: u64 LE (8 bytes)
//! [Config Data] (JSON, zstd compressed)
//! [Resources Data] (tar archive, zstd compressed)
//! [Footer]
//!   - Overlay Start Offset: u64 LE (8 bytes)
//!   - Magic: "JPAK" (4 bytes)
//! ```
//!
//! Resources are stored in the tar archive as `<kind>/<name>`, where kind is
//! `runtime`, `payload` or `aux`.

use crate::bundle::{Resource, ResourceBundle, ResourceKind};
use crate::config::LauncherConfig;
use crate::{PackError, PackResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Magic bytes for overlay identification
pub const OVERLAY_MAGIC: &[u8; 4] = b"JPAK";

/// Current overlay format version
pub const OVERLAY_VERSION: u32 = 1;

/// Header size in bytes (magic: 4 + version: 4 + two lengths: 16)
const HEADER_SIZE: u64 = 24;

/// Footer size in bytes (offset: 8 + magic: 4)
const FOOTER_SIZE: u64 = 12;

/// Overlay contents: configuration plus resources
#[derive(Debug, Clone)]
pub struct OverlayData {
    /// Launcher configuration
    pub config: LauncherConfig,
    /// Content hash (BLAKE3, 16 hex chars) of all resources
    pub content_hash: String,
    /// Embedded resources
    pub bundle: ResourceBundle,
}

impl OverlayData {
    /// Create overlay data, computing the content hash
    pub fn new(config: LauncherConfig, bundle: ResourceBundle) -> Self {
        let content_hash = compute_content_hash(&bundle);
        Self {
            config,
            content_hash,
            bundle,
        }
    }
}

/// Hash all resource kinds, names and contents in bundle order
fn compute_content_hash(bundle: &ResourceBundle) -> String {
    let mut hasher = blake3::Hasher::new();
    for resource in bundle.resources() {
        hasher.update(resource.kind.tag().as_bytes());
        hasher.update(&[0]);
        hasher.update(resource.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(resource.content.len() as u64).to_le_bytes());
        hasher.update(&resource.content);
    }
    hasher.finalize().to_hex()[..16].to_string()
}

/// Metadata serialized as the overlay's config section
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OverlayMetadata {
    #[serde(flatten)]
    config: LauncherConfig,
    content_hash: String,
}

/// Writer for appending overlay data to executables
pub struct OverlayWriter;

impl OverlayWriter {
    /// Append overlay data to an executable without touching its existing bytes
    pub fn write(exe_path: &Path, data: &OverlayData) -> PackResult<()> {
        let file = File::options().append(true).open(exe_path)?;
        let mut writer = BufWriter::new(file);

        let overlay_start = writer.seek(SeekFrom::End(0))?;

        let metadata = OverlayMetadata {
            config: data.config.clone(),
            content_hash: data.content_hash.clone(),
        };
        let metadata_json = serde_json::to_vec(&metadata)?;
        let config_compressed = zstd::encode_all(&metadata_json[..], 3)
            .map_err(|e| PackError::Compression(e.to_string()))?;

        let resources_tar = Self::create_resources_archive(&data.bundle)?;
        let resources_compressed = zstd::encode_all(&resources_tar[..], 3)
            .map_err(|e| PackError::Compression(e.to_string()))?;

        // Header
        writer.write_all(OVERLAY_MAGIC)?;
        writer.write_all(&OVERLAY_VERSION.to_le_bytes())?;
        writer.write_all(&(config_compressed.len() as u64).to_le_bytes())?;
        writer.write_all(&(resources_compressed.len() as u64).to_le_bytes())?;

        writer.write_all(&config_compressed)?;
        writer.write_all(&resources_compressed)?;

        // Footer
        writer.write_all(&overlay_start.to_le_bytes())?;
        writer.write_all(OVERLAY_MAGIC)?;

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        file.sync_all()?;

        tracing::info!(
            "Overlay written: config={} bytes, resources={} bytes, hash={}, app={}",
            config_compressed.len(),
            resources_compressed.len(),
            data.content_hash,
            data.config.app_name
        );

        Ok(())
    }

    fn create_resources_archive(bundle: &ResourceBundle) -> PackResult<Vec<u8>> {
        let mut archive = tar::Builder::new(Vec::new());

        for resource in bundle.resources() {
            let path = format!("{}/{}", resource.kind.tag(), resource.name);
            let mut header = tar::Header::new_gnu();
            header.set_size(resource.content.len() as u64);
            header.set_mode(0o644);
            archive.append_data(&mut header, &path, &resource.content[..])?;
        }

        archive
            .into_inner()
            .map_err(|e| PackError::Bundle(e.to_string()))
    }
}

/// Reader for extracting overlay data from executables
pub struct OverlayReader;

impl OverlayReader {
    /// Check if a file has overlay data
    pub fn has_overlay(path: &Path) -> PackResult<bool> {
        Ok(Self::read_footer(path)?.is_some())
    }

    /// Read overlay data from a file
    pub fn read(path: &Path) -> PackResult<Option<OverlayData>> {
        let Some(overlay_start) = Self::read_footer(path)? else {
            return Ok(None);
        };

        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if overlay_start + HEADER_SIZE + FOOTER_SIZE > file_len {
            return Err(PackError::InvalidOverlay(
                "Truncated overlay header".to_string(),
            ));
        }
        let mut reader = BufReader::with_capacity(64 * 1024, file);
        reader.seek(SeekFrom::Start(overlay_start))?;

        let mut header_magic = [0u8; 4];
        let mut version_bytes = [0u8; 4];
        let mut config_len_bytes = [0u8; 8];
        let mut resources_len_bytes = [0u8; 8];

        reader.read_exact(&mut header_magic)?;
        reader.read_exact(&mut version_bytes)?;
        reader.read_exact(&mut config_len_bytes)?;
        reader.read_exact(&mut resources_len_bytes)?;

        if &header_magic != OVERLAY_MAGIC {
            return Err(PackError::InvalidOverlay(
                "Invalid header magic".to_string(),
            ));
        }

        let version = u32::from_le_bytes(version_bytes);
        if version != OVERLAY_VERSION {
            return Err(PackError::InvalidOverlay(format!(
                "Unsupported version: {} (expected {})",
                version, OVERLAY_VERSION
            )));
        }

        let config_len = u64::from_le_bytes(config_len_bytes);
        let resources_len = u64::from_le_bytes(resources_len_bytes);
        let expected_len = config_len
            .checked_add(resources_len)
            .and_then(|len| len.checked_add(overlay_start + HEADER_SIZE + FOOTER_SIZE));
        if expected_len != Some(file_len) {
            return Err(PackError::InvalidOverlay(format!(
                "Section lengths (config {}, resources {}) do not match file size {}",
                config_len, resources_len, file_len
            )));
        }
        let config_len = config_len as usize;
        let resources_len = resources_len as usize;

        let mut config_compressed = vec![0u8; config_len];
        reader.read_exact(&mut config_compressed)?;
        let config_json = zstd::decode_all(&config_compressed[..])
            .map_err(|e| PackError::Compression(e.to_string()))?;
        let metadata: OverlayMetadata = serde_json::from_slice(&config_json)?;

        tracing::debug!("Overlay content hash: {}", metadata.content_hash);

        let mut resources_compressed = vec![0u8; resources_len];
        reader.read_exact(&mut resources_compressed)?;
        let resources = Self::extract_resources_streaming(&resources_compressed)?;
        let bundle = ResourceBundle::new(resources)
            .map_err(|e| PackError::InvalidOverlay(e.to_string()))?;

        tracing::debug!(
            "Resources: {} bytes compressed -> {} resources",
            resources_len,
            bundle.len()
        );

        Ok(Some(OverlayData {
            config: metadata.config,
            content_hash: metadata.content_hash,
            bundle,
        }))
    }

    /// Size of the executable before the overlay was appended
    pub fn original_size(path: &Path) -> PackResult<Option<u64>> {
        Self::read_footer(path)
    }

    /// Overlay start offset from the footer, if the footer magic is present
    fn read_footer(path: &Path) -> PackResult<Option<u64>> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        if file_len < FOOTER_SIZE {
            return Ok(None);
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;

        let mut offset_bytes = [0u8; 8];
        let mut magic = [0u8; 4];
        reader.read_exact(&mut offset_bytes)?;
        reader.read_exact(&mut magic)?;

        if &magic != OVERLAY_MAGIC {
            return Ok(None);
        }

        let offset = u64::from_le_bytes(offset_bytes);
        if offset > file_len - FOOTER_SIZE {
            return Err(PackError::InvalidOverlay(format!(
                "Overlay offset {} beyond end of file",
                offset
            )));
        }
        Ok(Some(offset))
    }

    /// Decode the resources tar using a streaming zstd decoder
    fn extract_resources_streaming(compressed_data: &[u8]) -> PackResult<Vec<Resource>> {
        let decoder = zstd::stream::Decoder::new(compressed_data)
            .map_err(|e| PackError::Compression(e.to_string()))?;

        let mut archive = tar::Archive::new(decoder);
        let mut resources = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.to_string_lossy().replace('\\', "/");

            let (tag, name) = path.split_once('/').ok_or_else(|| {
                PackError::InvalidOverlay(format!("Untagged resource: {}", path))
            })?;
            let kind = ResourceKind::from_tag(tag).ok_or_else(|| {
                PackError::InvalidOverlay(format!("Unknown resource kind: {}", tag))
            })?;

            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            resources.push(Resource {
                kind,
                name: name.to_string(),
                content,
            });
        }

        Ok(resources)
    }
}
