/// Matches an explicit set of input paths.
///
/// Every configured path is a candidate for any output, which lets a single
/// filter aggregate several inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMatcher {
    paths: Vec<String>,
}

impl ListMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn derive(&self, _other_path: &str) -> Vec<String> {
        self.paths.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ListMatcher {
        ListMatcher::new(["dir/file1.in", "dir/file2.in", "dir/file3.in"])
    }

    #[test]
    fn test_matches_members_only() {
        let matcher = matcher();
        assert!(!matcher.matches("file1.in"));
        assert!(!matcher.matches("dir/file1.out"));
        assert!(!matcher.matches("dir/file4.in"));
        assert!(!matcher.matches("dir/dir/file1.in"));
        assert!(matcher.matches("dir/file1.in"));
        assert!(matcher.matches("dir/file2.in"));
        assert!(matcher.matches("dir/file3.in"));
    }

    #[test]
    fn test_derive_ignores_output_path() {
        let matcher = matcher();
        let expected = vec!["dir/file1.in", "dir/file2.in", "dir/file3.in"];
        assert_eq!(matcher.derive("dir/file1.out"), expected);
        assert_eq!(matcher.derive("anything"), expected);
    }
}
