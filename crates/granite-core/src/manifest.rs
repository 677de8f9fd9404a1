//! Upstream wire contracts.
//!
//! Typed `serde` models for the JSON documents the mirrors serve. Only the
//! fields the installer actually reads are modeled; unknown fields are
//! ignored by default serde behavior.

use serde::Deserialize;
use std::collections::HashMap;

/// `version_manifest.json` top level.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionManifestEntry>,
}

impl VersionManifest {
    /// Locate the manifest entry for the requested version id.
    pub fn find(&self, version_id: &str) -> Option<&VersionManifestEntry> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifestEntry {
    pub id: String,
    pub url: String,
}

/// `versions/<v>/<v>.json`: per-version metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    pub downloads: VersionDownloads,
    #[serde(rename = "assetIndex")]
    pub asset_index: AssetIndexRef,
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: ClientDownload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientDownload {
    pub url: String,
    pub sha1: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub sha1: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    pub downloads: LibraryDownloads,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibraryArtifact>,
    pub classifiers: Option<HashMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryArtifact {
    pub path: String,
    pub url: String,
    pub sha1: String,
}

/// `assets/indexes/<id>.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_manifest() {
        let json = r#"{"versions":[{"id":"1.20.4","url":"https://example.com/a.json"}]}"#;
        let manifest: VersionManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.find("1.20.4").unwrap().url, "https://example.com/a.json");
        assert!(manifest.find("missing").is_none());
    }

    #[test]
    fn parses_version_metadata_with_classifiers() {
        let json = r#"{
            "downloads": {"client": {"url": "https://x/c.jar", "sha1": "abc", "size": 10}},
            "assetIndex": {"id": "17", "url": "https://x/17.json", "sha1": "def"},
            "libraries": [{
                "name": "org.lwjgl:lwjgl:3.3.1",
                "downloads": {
                    "artifact": null,
                    "classifiers": {"natives-linux": {"path": "p", "url": "https://x/p", "sha1": "ghi"}}
                }
            }]
        }"#;
        let metadata: VersionMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.downloads.client.sha1, "abc");
        assert_eq!(metadata.asset_index.id, "17");
        let classifiers = metadata.libraries[0].downloads.classifiers.as_ref().unwrap();
        assert_eq!(classifiers["natives-linux"].sha1, "ghi");
    }

    #[test]
    fn parses_asset_index() {
        let json = r#"{"objects": {"icons/icon.png": {"hash": "aaaa", "size": 5}}}"#;
        let index: AssetIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.objects["icons/icon.png"].hash, "aaaa");
    }
}
