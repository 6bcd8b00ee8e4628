//! Artifact path scheme (spec §4.3): local and remote paths mirror each
//! other, derived mechanically from `(workflow_id, stage_name, file-type,
//! filename)`.

use std::path::{Path, PathBuf};

/// Canonical output-file-type directories. Unknown extensions pass through
/// literally rather than falling into one of these.
const KNOWN_TYPE_DIRS: &[(&str, &[&str])] = &[
    ("audio", &["wav", "mp3", "flac", "aac", "ogg", "m4a"]),
    ("video", &["mp4", "mkv", "avi", "mov", "webm"]),
    ("images", &["png", "jpg", "jpeg", "gif", "bmp", "webp"]),
    ("subtitles", &["srt", "vtt", "ass", "ssa"]),
    ("data", &["json", "yaml", "yml", "txt", "csv"]),
    ("archives", &["zip", "tar", "gz", "tgz"]),
];

/// Map a filename's extension to its canonical `<type_dir>`. Returns the
/// extension itself, lowercased, when it isn't one of the known types —
/// "unknown types pass through literally" (spec §4.3).
pub fn type_dir_for_filename(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    for (type_dir, extensions) in KNOWN_TYPE_DIRS {
        if extensions.contains(&ext.as_str()) {
            return type_dir.to_string();
        }
    }
    ext
}

/// `<root>/<workflow_id>/nodes/<stage_name>/<type_dir>/<filename>`
pub fn build_node_output_path(root: &str, workflow_id: &str, stage_name: &str, filename: &str) -> PathBuf {
    let type_dir = type_dir_for_filename(filename);
    Path::new(root)
        .join(workflow_id)
        .join("nodes")
        .join(stage_name)
        .join(type_dir)
        .join(filename)
}

/// Same as [`build_node_output_path`] but with a caller-declared type dir
/// (spec §4.3 rule 2, custom path fields).
pub fn build_node_output_path_with_type(
    root: &str,
    workflow_id: &str,
    stage_name: &str,
    type_dir: &str,
    filename: &str,
) -> PathBuf {
    Path::new(root)
        .join(workflow_id)
        .join("nodes")
        .join(stage_name)
        .join(type_dir)
        .join(filename)
}

/// `<root>/<workflow_id>/temp/<stage_name>/<filename>`
pub fn build_temp_path(root: &str, workflow_id: &str, stage_name: &str, filename: &str) -> PathBuf {
    Path::new(root).join(workflow_id).join("temp").join(stage_name).join(filename)
}

/// `<workflow_id>/nodes/<stage_name>/<type_dir>/<filename>`
pub fn build_object_store_key(workflow_id: &str, stage_name: &str, filename: &str) -> String {
    let type_dir = type_dir_for_filename(filename);
    format!("{workflow_id}/nodes/{stage_name}/{type_dir}/{filename}")
}

pub fn build_object_store_key_with_type(
    workflow_id: &str,
    stage_name: &str,
    type_dir: &str,
    filename: &str,
) -> String {
    format!("{workflow_id}/nodes/{stage_name}/{type_dir}/{filename}")
}

/// `<workflow_id>/temp/<stage_name>/<filename>`
pub fn build_temp_object_store_key(workflow_id: &str, stage_name: &str, filename: &str) -> String {
    format!("{workflow_id}/temp/{stage_name}/{filename}")
}

/// Mirror a local artifact path to its object-store key by stripping the
/// configured storage root, since the two layouts are identical past that
/// point (spec §4.3's "local and remote mirror each other").
pub fn convert_local_to_object_store_key(root: &str, local_path: &str) -> Option<String> {
    let root = Path::new(root);
    let local = Path::new(local_path);
    local
        .strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"))
}
