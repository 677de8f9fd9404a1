//! On-disk layout under `working_path` / `temp_path`, matching the layout
//! an unmodified Minecraft launcher expects.

use std::path::{Path, PathBuf};

pub fn version_json_path(working_path: &Path, version: &str) -> PathBuf {
    working_path.join("versions").join(version).join(format!("{version}.json"))
}

pub fn version_jar_path(working_path: &Path, version: &str) -> PathBuf {
    working_path.join("versions").join(version).join(format!("{version}.jar"))
}

pub fn asset_index_path(working_path: &Path, asset_index_id: &str) -> PathBuf {
    working_path.join("assets").join("indexes").join(format!("{asset_index_id}.json"))
}

pub fn asset_object_path(working_path: &Path, hash: &str) -> PathBuf {
    working_path.join("assets").join("objects").join(&hash[..2]).join(hash)
}

pub fn asset_virtual_legacy_path(working_path: &Path, object_name: &str) -> PathBuf {
    working_path.join("assets").join("virtual").join("legacy").join(object_name)
}

pub fn asset_virtual_pre16_path(working_path: &Path, object_name: &str) -> PathBuf {
    working_path.join("assets").join("virtual").join("pre-1.6").join(object_name)
}

pub fn library_path(working_path: &Path, artifact_path: &str) -> PathBuf {
    working_path.join("libraries").join(artifact_path)
}

pub fn chunk_temp_dir(temp_path: &Path, hash: &str) -> PathBuf {
    temp_path.join("downloads").join(&hash[..2]).join(hash)
}

pub fn chunk_file_path(temp_dir: &Path, index: usize) -> PathBuf {
    temp_dir.join(format!("{index}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_object_path_splits_hash_prefix() {
        let path = asset_object_path(Path::new("/root"), "abcdef1234");
        assert_eq!(path, PathBuf::from("/root/assets/objects/ab/abcdef1234"));
    }

    #[test]
    fn chunk_paths_nest_under_downloads() {
        let temp_dir = chunk_temp_dir(Path::new("/tmp"), "abcdef1234");
        assert_eq!(temp_dir, PathBuf::from("/tmp/downloads/ab/abcdef1234"));
        assert_eq!(chunk_file_path(&temp_dir, 3), PathBuf::from("/tmp/downloads/ab/abcdef1234/3.tmp"));
    }
}
