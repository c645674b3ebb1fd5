/// Matches paths by file extension suffix.
///
/// Configured with any number of input extensions and at most one output
/// extension, all without the leading dot. Matching is a plain suffix check,
/// so `main.plugin.foo` matches the extension `foo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionMatcher {
    input_exts: Vec<String>,
    output_ext: Option<String>,
}

impl ExtensionMatcher {
    pub fn new<I, S>(input_exts: I, output_ext: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_exts: input_exts
                .into_iter()
                .map(Into::into)
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            output_ext: output_ext
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty()),
        }
    }

    pub fn input_exts(&self) -> &[String] {
        &self.input_exts
    }

    pub fn output_ext(&self) -> Option<&str> {
        self.output_ext.as_deref()
    }

    pub fn matches_input(&self, path: &str) -> bool {
        self.input_exts.iter().any(|ext| has_extension(path, ext))
    }

    pub fn matches_output(&self, path: &str) -> bool {
        self.output_ext.as_deref().is_some_and(|ext| has_extension(path, ext))
    }

    /// Candidate inputs for `output_path`: for every input extension, the
    /// extension appended and the final extension replaced, in that order.
    pub fn derive_input_paths(&self, output_path: &str) -> Vec<String> {
        let mut paths: Vec<String> = Vec::with_capacity(self.input_exts.len() * 2);
        for ext in &self.input_exts {
            for candidate in [format!("{output_path}.{ext}"), replace_extension(output_path, ext)] {
                if !paths.contains(&candidate) {
                    paths.push(candidate);
                }
            }
        }
        paths
    }

    /// The output path for `input_path`: the input extension is replaced by
    /// the output extension, dropping an output extension that directly
    /// precedes it (`main.css.scss` becomes `main.css`).
    pub fn derive_output_path(&self, input_path: &str) -> Option<String> {
        let output_ext = self.output_ext.as_deref()?;
        let stem = match extension_start(input_path) {
            Some(dot) => &input_path[..dot],
            None => input_path,
        };
        let stem = stem.strip_suffix(&format!(".{output_ext}")).unwrap_or(stem);
        Some(format!("{stem}.{output_ext}"))
    }
}

fn has_extension(path: &str, ext: &str) -> bool {
    path.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.'))
}

/// Byte offset of the dot starting the final extension of the file name
fn extension_start(path: &str) -> Option<usize> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    path[name_start..].rfind('.').map(|i| name_start + i)
}

fn replace_extension(path: &str, ext: &str) -> String {
    match extension_start(path) {
        Some(dot) => format!("{}.{ext}", &path[..dot]),
        None => format!("{path}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ExtensionMatcher {
        ExtensionMatcher::new(["foo", "baz"], Some("bar"))
    }

    #[test]
    fn test_matches_input_by_ext() {
        let matcher = matcher();
        assert!(matcher.matches_input("main.foo"));
        assert!(matcher.matches_input("main.baz"));
        assert!(matcher.matches_input("main.plugin.foo"));
        assert!(!matcher.matches_input("main.css"));
        assert!(!matcher.matches_input("mainfoo"));
    }

    #[test]
    fn test_no_input_exts_matches_nothing() {
        let matcher = ExtensionMatcher::new(Vec::<String>::new(), Some("bar"));
        assert!(!matcher.matches_input("main.foo"));
        assert!(!matcher.matches_input("main.baz"));
        assert!(matcher.derive_input_paths("main.bar").is_empty());
    }

    #[test]
    fn test_leading_dots_are_ignored() {
        let matcher = ExtensionMatcher::new([".foo"], Some(".bar"));
        assert_eq!(matcher.input_exts(), ["foo"]);
        assert_eq!(matcher.output_ext(), Some("bar"));
    }

    #[test]
    fn test_matches_output_by_ext() {
        let matcher = matcher();
        assert!(matcher.matches_output("main.bar"));
        assert!(matcher.matches_output("main.plugin.bar"));
        assert!(!matcher.matches_output("main.foo"));
    }

    #[test]
    fn test_no_output_ext_matches_nothing() {
        let matcher = ExtensionMatcher::new(["foo"], None);
        assert!(!matcher.matches_output("main.bar"));
        assert_eq!(matcher.derive_output_path("main.foo"), None);
    }

    #[test]
    fn test_derive_input_paths() {
        let matcher = matcher();
        assert_eq!(
            matcher.derive_input_paths("dir/main.bar"),
            vec!["dir/main.bar.foo", "dir/main.foo", "dir/main.bar.baz", "dir/main.baz"]
        );
        assert_eq!(
            matcher.derive_input_paths("dir/main.plugin.bar"),
            vec![
                "dir/main.plugin.bar.foo",
                "dir/main.plugin.foo",
                "dir/main.plugin.bar.baz",
                "dir/main.plugin.baz",
            ]
        );
    }

    #[test]
    fn test_derive_input_paths_only_replaces_file_extension() {
        let matcher = ExtensionMatcher::new(["foo"], Some("bar"));
        assert_eq!(matcher.derive_input_paths("dir.v2/main"), vec!["dir.v2/main.foo"]);
    }

    #[test]
    fn test_derive_output_path() {
        let matcher = matcher();
        assert_eq!(matcher.derive_output_path("dir/main.foo").as_deref(), Some("dir/main.bar"));
        assert_eq!(matcher.derive_output_path("dir/main.bar.foo").as_deref(), Some("dir/main.bar"));
        assert_eq!(
            matcher.derive_output_path("dir/main.plugin.foo").as_deref(),
            Some("dir/main.plugin.bar")
        );
    }

    #[test]
    fn test_output_path_round_trips_through_candidates() {
        let matcher = matcher();
        for input in ["a/x.foo", "a/x.bar.foo", "a/x.y.baz", "x.v2.foo"] {
            let output = matcher.derive_output_path(input).unwrap();
            assert!(matcher.matches_output(&output), "{output} should match");
            assert!(
                matcher.derive_input_paths(&output).iter().any(|p| p == input),
                "{input} should be a candidate for {output}"
            );
        }
    }
}
