use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::fs::FileSystem;
use crate::index::ProjectIndex;
use crate::parser::{ParseEvent, ParseOutput};
use crate::text::Document;
use std::path::{Path, PathBuf};

/// Look for every `*image` file on disk. Tries the image directory found
/// earlier, then the scene's own directory, then its parent unless the scene
/// directory is the workspace root.
pub async fn check_images(
    document: &Document,
    output: &ParseOutput,
    index: &ProjectIndex,
    fs: &dyn FileSystem,
    workspace_root: Option<&Path>,
) -> Vec<ScriptDiagnostic> {
    let images: Vec<(&str, _)> = output
        .events
        .iter()
        .filter_map(|event| match event {
            ParseEvent::ImageReference { filename, span } => Some((filename.as_str(), *span)),
            _ => None,
        })
        .collect();
    if images.is_empty() {
        return Vec::new();
    }

    let Ok(path) = document.uri().to_file_path() else {
        log::debug!("{} isn't a file; skipping image checks", document.key());
        return Vec::new();
    };
    let Some(scene_dir) = path.parent() else {
        return Vec::new();
    };

    let mut diagnostics = Vec::new();
    for (filename, span) in images {
        if !image_exists(filename, scene_dir, index, fs, workspace_root).await {
            diagnostics.push(ScriptDiagnostic::with_message(
                DiagnosticCode::ImageNotFound,
                span,
                format!("Couldn't find the image '{}'", filename),
            ));
        }
    }
    diagnostics
}

async fn image_exists(
    filename: &str,
    scene_dir: &Path,
    index: &ProjectIndex,
    fs: &dyn FileSystem,
    workspace_root: Option<&Path>,
) -> bool {
    let mut candidates: Vec<PathBuf> = index.image_directory().into_iter().collect();
    candidates.push(scene_dir.to_path_buf());
    if workspace_root != Some(scene_dir) {
        candidates.extend(scene_dir.parent().map(Path::to_path_buf));
    }

    for directory in candidates {
        if fs.file_exists(&directory.join(filename)).await {
            index.set_image_directory(directory);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::super::test_support::document;
    use super::*;
    use crate::fs::memory::MemoryFileSystem;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    async fn missing(fs: &MemoryFileSystem, index: &ProjectIndex, root: &str) -> Vec<String> {
        let doc = document("intro.txt", "*image cover.png\n*image map.jpg\n");
        let output = parse(doc.text(), false);
        check_images(&doc, &output, index, fs, Some(Path::new(root)))
            .await
            .iter()
            .map(|diagnostic| doc.text()[diagnostic.span.start..diagnostic.span.end].to_string())
            .collect()
    }

    #[tokio::test]
    async fn finds_images_next_to_the_scene() {
        let fs = MemoryFileSystem::with_files(&[("/game/scenes/cover.png", ""), ("/game/scenes/map.jpg", "")]);
        let index = ProjectIndex::new();
        assert_eq!(missing(&fs, &index, "/game").await, Vec::<String>::new());
        assert_eq!(index.image_directory(), Some(PathBuf::from("/game/scenes")));
    }

    #[tokio::test]
    async fn looks_one_level_up_unless_at_the_root() {
        let fs = MemoryFileSystem::with_files(&[("/game/cover.png", "")]);

        let index = ProjectIndex::new();
        assert_eq!(missing(&fs, &index, "/game").await, vec!["map.jpg".to_string()]);
        assert_eq!(index.image_directory(), Some(PathBuf::from("/game")));

        let index = ProjectIndex::new();
        assert_eq!(
            missing(&fs, &index, "/game/scenes").await,
            vec!["cover.png".to_string(), "map.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn remembered_directory_is_tried_first() {
        let fs = MemoryFileSystem::with_files(&[("/art/cover.png", ""), ("/art/map.jpg", "")]);
        let index = ProjectIndex::new();
        index.set_image_directory(PathBuf::from("/art"));
        assert_eq!(missing(&fs, &index, "/game").await, Vec::<String>::new());
    }
}
