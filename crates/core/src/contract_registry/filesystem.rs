use super::{ContractRegistry, Entries};
use crate::error::RegistryError;
use crate::metadata::{Chain, ContractBinding};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const EXTENSION: &str = "json";

/// Registry persisting one pretty printed JSON document per binding.
///
/// Documents are named `<identifier>.json`; the base directory is created on
/// the first [`persist`](ContractRegistry::persist).
#[derive(Debug)]
pub struct FileSystemContractRegistry<C: Chain> {
    base_path: PathBuf,
    entries: Entries<C>,
}

impl<C: Chain> FileSystemContractRegistry<C> {
    /// Creates an empty registry rooted at `base_path`.
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
            entries: Entries::new(),
        }
    }

    /// Creates a registry rooted at `base_path` and loads its documents.
    pub fn open<P: Into<PathBuf>>(base_path: P) -> Result<Self, RegistryError> {
        let mut registry = Self::new(base_path);
        registry.load()?;
        Ok(registry)
    }

    /// Directory holding the documents.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn document_path(&self, identifier: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", identifier, EXTENSION))
    }

    fn ensure_directory(&self) -> Result<(), RegistryError> {
        if self.base_path.exists() {
            if !self.base_path.is_dir() {
                return Err(RegistryError::NotADirectory {
                    path: self.base_path.display().to_string(),
                });
            }
            return Ok(());
        }
        fs::create_dir_all(&self.base_path).map_err(|source| io_error(&self.base_path, source))
    }
}

impl<C: Chain> ContractRegistry<C> for FileSystemContractRegistry<C> {
    fn entries(&self) -> &Entries<C> {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut Entries<C> {
        &mut self.entries
    }

    fn persist(&self) -> Result<(), RegistryError> {
        self.ensure_directory()?;
        for (identifier, binding) in &self.entries {
            let path = self.document_path(identifier);
            let document = serde_json::to_string_pretty(binding.as_ref()).map_err(|source| {
                RegistryError::Serialization {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            fs::write(&path, document).map_err(|source| io_error(&path, source))?;
            debug!("Persisted contract binding '{}' to {}", identifier, path.display());
        }
        info!("Persisted {} contract bindings to {}", self.entries.len(), self.base_path.display());
        Ok(())
    }

    fn load(&mut self) -> Result<(), RegistryError> {
        self.entries.clear();
        if !self.base_path.exists() {
            return Ok(());
        }
        if !self.base_path.is_dir() {
            return Err(RegistryError::NotADirectory {
                path: self.base_path.display().to_string(),
            });
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.base_path).map_err(|source| io_error(&self.base_path, source))? {
            let path = entry.map_err(|source| io_error(&self.base_path, source))?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let document = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            let binding: ContractBinding<C> =
                serde_json::from_str(&document).map_err(|source| RegistryError::Serialization {
                    path: path.display().to_string(),
                    source,
                })?;
            self.add_or_update(Arc::new(binding))?;
        }
        info!("Loaded {} contract bindings from {}", self.entries.len(), self.base_path.display());
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::{greeter, Positional, PositionalSchema};
    use crate::builder::ContractBindingBuilder;
    use tempfile::TempDir;

    fn binding(identifier: &str) -> Arc<ContractBinding<Positional>> {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        builder.event("onGreeting", &[crate::types::NativeType::Long]).unwrap();
        builder.identifier(identifier);
        builder.build(&PositionalSchema, ()).unwrap()
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("contracts");

        let mut registry = FileSystemContractRegistry::<Positional>::new(&base);
        registry.add(binding("greeter")).unwrap();
        registry.persist().unwrap();
        assert!(base.join("greeter.json").is_file());

        let loaded = FileSystemContractRegistry::<Positional>::open(&base).unwrap();
        let original = registry.get("greeter").unwrap();
        let restored = loaded.get("greeter").unwrap();
        assert_eq!(
            serde_json::to_value(original.as_ref()).unwrap(),
            serde_json::to_value(restored.as_ref()).unwrap()
        );
        assert_eq!(restored.methods().keys().collect::<Vec<_>>(), original.methods().keys().collect::<Vec<_>>());
        assert!(restored.event("onGreeting").is_some());
    }

    #[test]
    fn test_load_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = FileSystemContractRegistry::<Positional>::open(dir.path().join("absent")).unwrap();
        assert!(registry.bindings().is_empty());
    }

    #[test]
    fn test_file_in_place_of_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("contracts");
        fs::write(&file, "not a directory").unwrap();

        let mut registry = FileSystemContractRegistry::<Positional>::new(&file);
        registry.add(binding("greeter")).unwrap();
        assert!(matches!(registry.persist(), Err(RegistryError::NotADirectory { .. })));
        assert!(matches!(registry.load(), Err(RegistryError::NotADirectory { .. })));
    }

    #[test]
    fn test_document_with_empty_identifier_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut document = serde_json::to_value(binding("greeter").as_ref()).unwrap();
        document["identifier"] = serde_json::Value::String(String::new());
        fs::write(dir.path().join("broken.json"), document.to_string()).unwrap();

        let err = FileSystemContractRegistry::<Positional>::open(dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyIdentifier));
    }
}
