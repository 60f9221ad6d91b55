//! Loading deposit definition files into a catalog of ready generators.
//!
//! A definition file is a JSON array of deposit variants. Problems are
//! contained per file and per variant: they are logged, kept in
//! [`DepositCatalog::failures`], and the rest still loads.

use std::path::Path;
use std::sync::Arc;

use crate::error::DepositError;
use crate::generator::DepositGenerator;
use crate::registry::DepositGeneratorRegistry;
use crate::variant::DepositVariant;

/// A loaded variant and its initialised generator.
#[derive(Clone)]
pub struct DepositEntry {
    pub variant: Arc<DepositVariant>,
    pub generator: Arc<dyn DepositGenerator>,
}

/// Every deposit the world generates, in load order.
#[derive(Default)]
pub struct DepositCatalog {
    entries: Vec<DepositEntry>,
    failures: Vec<DepositError>,
}

impl DepositCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file in `dir`, in file name order.
    ///
    /// # Errors
    ///
    /// Returns [`DepositError::Io`] only if the directory itself cannot be
    /// listed. Per-file problems end up in [`failures`](Self::failures).
    pub fn load_dir(dir: &Path, registry: &DepositGeneratorRegistry) -> Result<Self, DepositError> {
        let io_err = |source| DepositError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut catalog = Self::new();
        for path in &files {
            catalog.load_file(path, registry);
        }
        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            deposits = catalog.len(),
            failures = catalog.failures.len(),
            "loaded deposit definitions"
        );
        Ok(catalog)
    }

    /// Loads one definition file. Returns the number of deposits added.
    pub fn load_file(&mut self, path: &Path, registry: &DepositGeneratorRegistry) -> usize {
        let file = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

        match std::fs::read_to_string(path) {
            Ok(json) => self.load_str(&file, &json, registry),
            Err(source) => {
                self.fail(DepositError::Io {
                    path: path.to_path_buf(),
                    source,
                });
                0
            }
        }
    }

    /// Loads definitions from `json`, attributing them to `file`. Returns the
    /// number of deposits added.
    pub fn load_str(&mut self, file: &str, json: &str, registry: &DepositGeneratorRegistry) -> usize {
        let variants: Vec<DepositVariant> = match serde_json::from_str(json) {
            Ok(variants) => variants,
            Err(source) => {
                self.fail(DepositError::Json {
                    file: file.to_string(),
                    source,
                });
                return 0;
            }
        };

        let mut added = 0;
        for mut variant in variants {
            variant.stamp_file(file);
            let tag = variant.generator.clone();
            let attributes = variant.attributes.clone();
            let variant = Arc::new(variant);

            match registry.create(&tag, Arc::clone(&variant), &attributes) {
                Ok(Some(generator)) => {
                    tracing::debug!(file, code = %variant.code, generator = %tag, "loaded deposit");
                    self.entries.push(DepositEntry {
                        variant,
                        generator: Arc::from(generator),
                    });
                    added += 1;
                }
                Ok(None) => {
                    let err = DepositError::UnknownGenerator {
                        file: file.to_string(),
                        tag,
                    };
                    tracing::warn!("{err}, skipping {}", variant.code);
                    self.failures.push(err);
                }
                Err(err) => self.fail(err),
            }
        }
        added
    }

    fn fail(&mut self, err: DepositError) {
        tracing::error!("{err}");
        self.failures.push(err);
    }

    pub fn entries(&self) -> &[DepositEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&DepositEntry> {
        self.entries.iter().find(|entry| entry.variant.code == code)
    }

    /// Problems met while loading, in the order they occurred.
    pub fn failures(&self) -> &[DepositError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest horizontal reach of any deposit, in blocks.
    pub fn max_reach(&self) -> f32 {
        self.entries
            .iter()
            .map(|entry| entry.generator.max_radius())
            .fold(0.0, f32::max)
    }

    /// Codes of every ore-map gated variant, children included.
    pub fn ore_map_codes(&self) -> Vec<String> {
        fn collect(variant: &DepositVariant, codes: &mut Vec<String>) {
            if variant.with_ore_map && !codes.contains(&variant.code) {
                codes.push(variant.code.clone());
            }
            for child in &variant.child_deposits {
                collect(child, codes);
            }
        }

        let mut codes = Vec::new();
        for entry in &self.entries {
            collect(&entry.variant, &mut codes);
        }
        codes
    }
}
