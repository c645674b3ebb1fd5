/// Matches exactly one path by strict equality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPath {
    path: String,
}

impl FixedPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn matches(&self, path: &str) -> bool {
        self.path == path
    }

    pub fn derive(&self, _other_path: &str) -> Vec<String> {
        vec![self.path.clone()]
    }
}
