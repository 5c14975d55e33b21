//! Docker build context assembled from artifacts and generated files

use super::ContainerError;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Content(Vec<u8>),
}

/// Named files sent to the daemon as the build context tarball
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    entries: Vec<(String, Source)>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file from disk under `name`
    pub fn with_file(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.entries
            .push((name.into(), Source::File(path.as_ref().to_path_buf())));
        self
    }

    /// Adds generated content under `name`
    pub fn with_content(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.into(), Source::Content(content.into())));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Fails on the first file entry that does not exist
    pub fn check_artifacts(&self) -> Result<(), ContainerError> {
        for (_, source) in &self.entries {
            if let Source::File(path) = source {
                if !path.is_file() {
                    return Err(ContainerError::MissingArtifact { path: path.clone() });
                }
            }
        }
        Ok(())
    }

    /// Serialises all entries into an uncompressed tar archive
    pub fn to_tar(&self) -> Result<Vec<u8>, ContainerError> {
        self.check_artifacts()?;

        let mut builder = Builder::new(Vec::new());
        for (name, source) in &self.entries {
            match source {
                Source::File(path) => builder
                    .append_path_with_name(path, name)
                    .map_err(|source| ContainerError::Io {
                        path: path.clone(),
                        source,
                    })?,
                Source::Content(content) => {
                    let mut header = Header::new_gnu();
                    header.set_size(content.len() as u64);
                    header.set_mode(0o644);
                    builder
                        .append_data(&mut header, name, content.as_slice())
                        .map_err(|source| ContainerError::Io {
                            path: PathBuf::from(name),
                            source,
                        })?;
                }
            }
        }

        builder.into_inner().map_err(|source| ContainerError::Io {
            path: PathBuf::from("<build context>"),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn entries(tarball: &[u8]) -> Vec<(String, String)> {
        let mut archive = tar::Archive::new(tarball);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().to_string();
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                (name, content)
            })
            .collect()
    }

    #[test]
    fn test_to_tar_contains_every_entry() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app.jar");
        let agent = dir.path().join("agent.jar");
        let config = dir.path().join("config.yml");
        fs::write(&app, "app").unwrap();
        fs::write(&agent, "agent").unwrap();
        fs::write(&config, "rules: []").unwrap();

        let context = BuildContext::new()
            .with_file("jmx_example_application.jar", &app)
            .with_file("jmx_prometheus_javaagent-1.0.jar", &agent)
            .with_file("config.yml", &config)
            .with_content("Dockerfile", "FROM openjdk:8-jre\n");

        let tarball = context.to_tar().unwrap();
        assert_eq!(
            entries(&tarball),
            vec![
                ("jmx_example_application.jar".to_string(), "app".to_string()),
                ("jmx_prometheus_javaagent-1.0.jar".to_string(), "agent".to_string()),
                ("config.yml".to_string(), "rules: []".to_string()),
                ("Dockerfile".to_string(), "FROM openjdk:8-jre\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_artifact() {
        let context = BuildContext::new()
            .with_content("Dockerfile", "FROM scratch\n")
            .with_file("app.jar", "/nonexistent/app.jar");

        let err = context.to_tar().unwrap_err();
        assert!(matches!(err, ContainerError::MissingArtifact { .. }));
        assert!(err.to_string().contains("/nonexistent/app.jar"));
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let context = BuildContext::new()
            .with_content("b", "")
            .with_content("a", "");
        assert_eq!(context.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
