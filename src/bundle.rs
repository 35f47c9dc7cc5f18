//! Embedded resources carried by a packed launcher

use crate::{PackError, PackResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Role of a resource inside the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Zip archive holding the runtime distribution
    RuntimeArchive,
    /// Application file the runtime is invoked against
    Payload,
    /// Extra file copied next to the payload
    Auxiliary,
}

impl ResourceKind {
    /// Directory prefix used when the resource is stored in an overlay
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RuntimeArchive => "runtime",
            Self::Payload => "payload",
            Self::Auxiliary => "aux",
        }
    }

    /// Inverse of [`ResourceKind::tag`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "runtime" => Some(Self::RuntimeArchive),
            "payload" => Some(Self::Payload),
            "aux" => Some(Self::Auxiliary),
            _ => None,
        }
    }
}

/// A single embedded blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Role of the resource
    pub kind: ResourceKind,
    /// Logical name (forward-slash separated, relative)
    pub name: String,
    /// Exact bytes embedded at pack time
    pub content: Vec<u8>,
}

/// Immutable set of resources: one runtime archive, one payload, any number of auxiliary files
#[derive(Debug, Clone)]
pub struct ResourceBundle {
    resources: Vec<Resource>,
    runtime: usize,
    payload: usize,
}

impl ResourceBundle {
    /// Validate and assemble a bundle from resources in order
    pub fn new(resources: Vec<Resource>) -> PackResult<Self> {
        let mut names = HashSet::new();
        let mut runtime = None;
        let mut payload = None;

        for (idx, resource) in resources.iter().enumerate() {
            if resource.name.is_empty() {
                return Err(PackError::Bundle("Resource name must not be empty".to_string()));
            }
            if !names.insert(resource.name.as_str()) {
                return Err(PackError::Bundle(format!(
                    "Duplicate resource name: {}",
                    resource.name
                )));
            }

            let slot = match resource.kind {
                ResourceKind::RuntimeArchive => &mut runtime,
                ResourceKind::Payload => &mut payload,
                ResourceKind::Auxiliary => continue,
            };
            if slot.replace(idx).is_some() {
                return Err(PackError::Bundle(format!(
                    "Bundle must contain exactly one {} resource",
                    resource.kind.tag()
                )));
            }
        }

        let runtime = runtime
            .ok_or_else(|| PackError::Bundle("Bundle has no runtime archive".to_string()))?;
        let payload =
            payload.ok_or_else(|| PackError::Bundle("Bundle has no payload".to_string()))?;

        Ok(Self {
            resources,
            runtime,
            payload,
        })
    }

    /// The runtime archive
    pub fn runtime_archive(&self) -> &Resource {
        &self.resources[self.runtime]
    }

    /// The payload
    pub fn payload(&self) -> &Resource {
        &self.resources[self.payload]
    }

    /// Auxiliary files in bundle order
    pub fn auxiliary(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Auxiliary)
    }

    /// Look up a resource by logical name
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// All resources in bundle order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// A valid bundle always holds at least a runtime and a payload
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Total embedded size in bytes
    pub fn total_size(&self) -> u64 {
        self.resources.iter().map(|r| r.content.len() as u64).sum()
    }

    /// Short BLAKE3 digest of the runtime archive bytes (16 hex chars)
    pub fn runtime_digest(&self) -> String {
        let hash = blake3::hash(&self.runtime_archive().content);
        hash.to_hex()[..16].to_string()
    }
}

/// Collects bundle resources from disk at pack time
pub struct BundleBuilder {
    runtime_archive: PathBuf,
    payload: PathBuf,
    payload_name: Option<String>,
    files: Vec<PathBuf>,
    exclude_patterns: Vec<String>,
}

impl BundleBuilder {
    /// Start a bundle from a runtime archive and a payload
    pub fn new(runtime_archive: impl AsRef<Path>, payload: impl AsRef<Path>) -> Self {
        Self {
            runtime_archive: runtime_archive.as_ref().to_path_buf(),
            payload: payload.as_ref().to_path_buf(),
            payload_name: None,
            files: Vec::new(),
            exclude_patterns: vec![
                ".git".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
        }
    }

    /// Store the payload under a different name
    pub fn payload_name(mut self, name: impl Into<String>) -> Self {
        self.payload_name = Some(name.into());
        self
    }

    /// Add auxiliary files, directories or glob patterns
    pub fn files<P: AsRef<Path>>(mut self, files: &[P]) -> Self {
        self.files
            .extend(files.iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Add names to exclude when walking directories
    pub fn exclude(mut self, patterns: &[&str]) -> Self {
        self.exclude_patterns
            .extend(patterns.iter().map(|s| s.to_string()));
        self
    }

    /// Read everything and build the bundle
    pub fn build(&self) -> PackResult<ResourceBundle> {
        let mut resources = Vec::new();

        let runtime_name = file_name(&self.runtime_archive)?;
        resources.push(Resource {
            kind: ResourceKind::RuntimeArchive,
            name: runtime_name,
            content: read_input(&self.runtime_archive)?,
        });

        let payload_name = match self.payload_name {
            Some(ref name) => name.clone(),
            None => file_name(&self.payload)?,
        };
        resources.push(Resource {
            kind: ResourceKind::Payload,
            name: payload_name,
            content: read_input(&self.payload)?,
        });

        for input in &self.files {
            for path in expand_input(input)? {
                self.collect(&path, &mut resources)?;
            }
        }

        let bundle = ResourceBundle::new(resources)?;

        tracing::info!(
            "Bundle created: {} resources, {} bytes total",
            bundle.len(),
            bundle.total_size()
        );

        Ok(bundle)
    }

    fn collect(&self, path: &Path, resources: &mut Vec<Resource>) -> PackResult<()> {
        if path.is_file() {
            tracing::debug!("Adding file: {}", path.display());
            resources.push(Resource {
                kind: ResourceKind::Auxiliary,
                name: file_name(path)?,
                content: read_input(path)?,
            });
            return Ok(());
        }

        if !path.is_dir() {
            return Err(PackError::Bundle(format!(
                "File not found: {}",
                path.display()
            )));
        }

        // Directory contents keep their path below the directory's own name
        let base = path.parent().unwrap_or(path);
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.should_exclude(e))
        {
            let entry = entry.map_err(|e| PackError::Bundle(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(base)
                .map_err(|e| PackError::Bundle(e.to_string()))?;
            let name = relative.to_string_lossy().replace('\\', "/");

            tracing::debug!("Adding file: {}", name);
            resources.push(Resource {
                kind: ResourceKind::Auxiliary,
                name,
                content: fs::read(entry.path())?,
            });
        }

        Ok(())
    }

    fn should_exclude(&self, entry: &walkdir::DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.exclude_patterns.iter().any(|p| name == p.as_str())
    }
}

/// Expand glob patterns; plain paths pass through untouched
fn expand_input(input: &Path) -> PackResult<Vec<PathBuf>> {
    let pattern = input.to_string_lossy();
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut matches = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| PackError::Config(e.to_string()))? {
        matches.push(entry.map_err(|e| PackError::Bundle(e.to_string()))?);
    }
    if matches.is_empty() {
        return Err(PackError::Bundle(format!("Pattern matched no files: {}", pattern)));
    }
    Ok(matches)
}

fn read_input(path: &Path) -> PackResult<Vec<u8>> {
    if !path.is_file() {
        return Err(PackError::Bundle(format!(
            "File not found: {}",
            path.display()
        )));
    }
    Ok(fs::read(path)?)
}

fn file_name(path: &Path) -> PackResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PackError::Bundle(format!("Invalid file path: {}", path.display())))
}
