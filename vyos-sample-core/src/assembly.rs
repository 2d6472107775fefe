//! Assembly - The directory of templates handed to the provisioning engine

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::template::{SynthError, SynthesizedStack};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// `manifest.json`: which template belongs to which account and region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub stacks: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub account: String,
    pub region: String,
    pub template: String,
}

/// Synthesized stacks of one app
#[derive(Debug, Clone, Default)]
pub struct CloudAssembly {
    stacks: Vec<SynthesizedStack>,
}

impl CloudAssembly {
    pub fn new(stacks: Vec<SynthesizedStack>) -> Self {
        Self { stacks }
    }

    pub fn stacks(&self) -> &[SynthesizedStack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&SynthesizedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            stacks: self
                .stacks
                .iter()
                .map(|s| {
                    (
                        s.name.clone(),
                        ManifestEntry {
                            account: s.env.account.clone(),
                            region: s.env.region.clone(),
                            template: s.template_file_name(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// The manifest to write into `dir`: this assembly's stacks plus the entries
    /// of an earlier manifest there whose template file is still present
    pub fn merged_manifest(&self, dir: &Path) -> Result<Manifest, SynthError> {
        let mut manifest = self.manifest();
        let Some(existing) = read_if_present(&dir.join(MANIFEST_FILE))? else {
            return Ok(manifest);
        };
        let existing: Manifest = serde_json::from_str(&existing)?;

        for (name, entry) in existing.stacks {
            if manifest.stacks.contains_key(&name) {
                continue;
            }
            if dir.join(&entry.template).is_file() {
                debug!("keeping manifest entry for {}", name);
                manifest.stacks.insert(name, entry);
            } else {
                debug!("dropping manifest entry for {}: template is gone", name);
            }
        }
        Ok(manifest)
    }

    /// Every file of the assembly as (relative file name, contents), manifest last
    pub fn rendered_files(&self, dir: &Path) -> Result<Vec<(String, String)>, SynthError> {
        let mut files = Vec::with_capacity(self.stacks.len() + 1);
        for stack in &self.stacks {
            files.push((stack.template_file_name(), stack.to_json_pretty()?));
        }
        let mut manifest = serde_json::to_string_pretty(&self.merged_manifest(dir)?)?;
        manifest.push('\n');
        files.push((MANIFEST_FILE.to_string(), manifest));
        Ok(files)
    }

    /// Write the assembly into `dir`, creating it if needed. Returns the written paths.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, SynthError> {
        fs::create_dir_all(dir).map_err(|source| SynthError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut written = Vec::new();
        for (name, contents) in self.rendered_files(dir)? {
            let path = dir.join(&name);
            fs::write(&path, contents).map_err(|source| SynthError::Io {
                path: path.display().to_string(),
                source,
            })?;
            debug!("wrote {}", path.display());
            written.push(path);
        }

        info!(
            "cloud assembly with {} stack(s) written to {}",
            self.stacks.len(),
            dir.display()
        );
        Ok(written)
    }

    /// Files under `dir` whose contents differ from the assembly (missing files included)
    pub fn stale_files(&self, dir: &Path) -> Result<Vec<String>, SynthError> {
        let mut stale = Vec::new();
        for (name, contents) in self.rendered_files(dir)? {
            let on_disk = read_if_present(&dir.join(&name))?;
            if on_disk.as_deref() != Some(contents.as_str()) {
                stale.push(name);
            }
        }
        Ok(stale)
    }
}

/// `None` when the file does not exist; any other failure is an error
fn read_if_present(path: &Path) -> Result<Option<String>, SynthError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SynthError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Environment;
    use serde_json::json;

    fn assembly() -> CloudAssembly {
        CloudAssembly::new(vec![
            SynthesizedStack {
                name: "Dev-A".to_string(),
                env: Environment::new("123456789012", "ap-northeast-1"),
                template: json!({ "AWSTemplateFormatVersion": "2010-09-09", "Resources": {} }),
            },
            SynthesizedStack {
                name: "Dev-B".to_string(),
                env: Environment::new("123456789012", "ap-northeast-3"),
                template: json!({ "AWSTemplateFormatVersion": "2010-09-09", "Resources": {} }),
            },
        ])
    }

    #[test]
    fn manifest_lists_every_stack() {
        let manifest = assembly().manifest();
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.stacks.len(), 2);
        assert_eq!(manifest.stacks["Dev-B"].region, "ap-northeast-3");
        assert_eq!(manifest.stacks["Dev-A"].template, "Dev-A.template.json");
    }

    #[test]
    fn write_creates_templates_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cdk.out");

        let written = assembly().write(&out).unwrap();

        assert_eq!(written.len(), 3);
        assert!(out.join("Dev-A.template.json").exists());
        let manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest, assembly().manifest());
    }

    #[test]
    fn stale_files_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let a = assembly();

        assert_eq!(a.stale_files(dir.path()).unwrap().len(), 3);

        a.write(dir.path()).unwrap();
        assert!(a.stale_files(dir.path()).unwrap().is_empty());

        fs::write(dir.path().join("Dev-B.template.json"), "{}\n").unwrap();
        assert_eq!(
            a.stale_files(dir.path()).unwrap(),
            vec!["Dev-B.template.json".to_string()]
        );
    }

    fn other_environment() -> CloudAssembly {
        CloudAssembly::new(vec![SynthesizedStack {
            name: "Prod-A".to_string(),
            env: Environment::new("123456789012", "ap-northeast-1"),
            template: json!({ "AWSTemplateFormatVersion": "2010-09-09", "Resources": {} }),
        }])
    }

    #[test]
    fn manifest_keeps_stacks_written_earlier() {
        let dir = tempfile::tempdir().unwrap();
        assembly().write(dir.path()).unwrap();
        other_environment().write(dir.path()).unwrap();

        let manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
                .unwrap();
        let names: Vec<&str> = manifest.stacks.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Dev-A", "Dev-B", "Prod-A"]);
        assert!(assembly().stale_files(dir.path()).unwrap().is_empty());
        assert!(other_environment().stale_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn manifest_drops_entries_without_a_template() {
        let dir = tempfile::tempdir().unwrap();
        assembly().write(dir.path()).unwrap();
        fs::remove_file(dir.path().join("Dev-B.template.json")).unwrap();

        let manifest = other_environment().merged_manifest(dir.path()).unwrap();
        assert!(manifest.stacks.contains_key("Dev-A"));
        assert!(!manifest.stacks.contains_key("Dev-B"));
    }

    #[test]
    fn unreadable_file_is_an_error_not_stale() {
        let dir = tempfile::tempdir().unwrap();
        let a = assembly();
        a.write(dir.path()).unwrap();

        let template = dir.path().join("Dev-A.template.json");
        fs::remove_file(&template).unwrap();
        fs::create_dir(&template).unwrap();

        assert!(matches!(
            a.stale_files(dir.path()),
            Err(SynthError::Io { .. })
        ));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();
        assert!(matches!(
            assembly().merged_manifest(dir.path()),
            Err(SynthError::Serialization(_))
        ));
    }
}
