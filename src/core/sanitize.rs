use std::path::Path;

use crate::core::model::ProjectModel;

fn strip_storage_root(file_name: &str, storage_root: &Path) -> String {
    match Path::new(file_name).strip_prefix(storage_root) {
        Ok(rel) if !storage_root.as_os_str().is_empty() => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => file_name.to_string(),
    }
}

/// Rewrites every file name from `<storage_root>/<id>/...` to `<id>/...`.
/// Names outside the storage root are left as they are.
pub fn sanitize(mut project: ProjectModel, storage_root: &Path) -> ProjectModel {
    for file in &mut project.files {
        file.file_name = strip_storage_root(&file.file_name, storage_root);
    }
    project
}
