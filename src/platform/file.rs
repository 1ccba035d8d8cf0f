//! File backed collaborators.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Export, Exporter, Renderer, TemplateParams};
use crate::error::{Error, Result};
use crate::resource::ResourceFilter;

/// FileExporter serves a previously exported document instead of asking the platform.
///
/// An empty file means no resources were found. The filter is applied when the
/// document is turned into a list, so the file may hold more than was asked for.
#[derive(Debug, Clone)]
pub struct FileExporter {
    path: PathBuf,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileExporter { path: path.into() }
    }
}

impl Exporter for FileExporter {
    fn export(&self, _filter: &ResourceFilter, namespace: &str) -> Result<Export> {
        let document = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        debug!(path = %self.path.display(), namespace, "read export from file");
        if document.iter().all(u8::is_ascii_whitespace) {
            return Ok(Export::NoResourcesFound);
        }
        Ok(Export::Document(document))
    }
}

/// RenderedFiles treats every template file as already processed and returns its content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderedFiles;

impl Renderer for RenderedFiles {
    fn render(&self, file: &Path, _params: &TemplateParams) -> Result<Vec<u8>> {
        fs::read(file).map_err(|e| Error::io(file, e))
    }
}

/// Replaces every directory in `paths` with the YAML files it contains, sorted by name.
pub fn expand_template_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            let file = entry.path();
            if file.is_file() && is_yaml(&file) {
                found.push(file);
            }
        }
        found.sort();
        debug!(dir = %path.display(), count = found.len(), "found template files");
        files.extend(found);
    }
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.yml");
        let filter = ResourceFilter::default();

        fs::write(&path, "").unwrap();
        assert_eq!(
            FileExporter::new(&path).export(&filter, "demo").unwrap(),
            Export::NoResourcesFound
        );

        fs::write(&path, "kind: List\nitems: []\n").unwrap();
        assert_eq!(
            FileExporter::new(&path).export(&filter, "demo").unwrap(),
            Export::Document(b"kind: List\nitems: []\n".to_vec())
        );

        let missing = FileExporter::new(dir.path().join("missing.yml"));
        assert!(matches!(missing.export(&filter, "demo"), Err(Error::Io { .. })));
    }

    #[test]
    fn test_rendered_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.yml");
        fs::write(&path, "kind: ConfigMap\n").unwrap();

        let rendered = RenderedFiles.render(&path, &TemplateParams::default()).unwrap();
        assert_eq!(rendered, b"kind: ConfigMap\n".to_vec());
    }

    #[test]
    fn test_expand_template_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yml", "a.yaml", "notes.txt", "c.env"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested.yml")).unwrap();
        let extra = PathBuf::from("extra.yml");

        let files = expand_template_files(&[dir.path().to_path_buf(), extra.clone()]).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.yaml"), dir.path().join("b.yml"), extra]
        );
    }
}
