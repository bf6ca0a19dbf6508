use serde::{Deserialize, Serialize};

/// An installable package and the names of the packages it depends on.
///
/// Dependency order is preserved exactly as received. Duplicates and
/// self-references are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    name: String,
    #[serde(default)]
    deps: Vec<String>,
}

impl Package {
    /// A package with no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
        }
    }

    pub fn with_deps<I, S>(name: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Whether `name` appears in this package's dependency list
    #[inline]
    pub fn depends_on(&self, name: &str) -> bool {
        self.deps.iter().any(|d| d == name)
    }
}
