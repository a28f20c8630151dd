use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A YOLO-style dataset descriptor (`dataset.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_train")]
    pub train: Splits,
    #[serde(default)]
    pub val: Option<Splits>,
    #[serde(default)]
    pub test: Option<Splits>,
    #[serde(default)]
    pub nc: Option<usize>,
    #[serde(default)]
    pub names: ClassNames,
}

/// `names:` may be written as a list or as an `id: name` mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<u32, String>),
}

/// A split is one directory or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Splits {
    One(String),
    Many(Vec<String>),
}

impl Splits {
    pub fn dirs(&self) -> Vec<&str> {
        match self {
            Splits::One(d) => vec![d.as_str()],
            Splits::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        ClassNames::List(Vec::new())
    }
}

fn default_train() -> Splits {
    Splits::One("images".into())
}

impl DatasetDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset descriptor: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing YAML: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn class_names(&self) -> Vec<String> {
        match &self.names {
            ClassNames::List(v) => v.clone(),
            ClassNames::Map(m) => m.values().cloned().collect(),
        }
    }

    /// `nc` and `names` disagree.
    pub fn class_count_mismatch(&self) -> Option<(usize, usize)> {
        let names = self.class_names().len();
        match self.nc {
            Some(nc) if nc != names => Some((nc, names)),
            _ => None,
        }
    }

    /// Training image directories, resolved against the descriptor's location.
    pub fn train_dirs(&self, descriptor_path: &Path) -> Vec<PathBuf> {
        let base = descriptor_path.parent().unwrap_or_else(|| Path::new("."));
        let root = match self.path.as_deref() {
            Some(p) if !p.is_empty() => base.join(p),
            _ => base.to_path_buf(),
        };
        self.train.dirs().into_iter().map(|d| root.join(d)).collect()
    }
}
