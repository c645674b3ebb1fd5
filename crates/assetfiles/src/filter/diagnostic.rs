use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Where a tool reported an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// Diagnostic output of an external tool.
///
/// `message` is the tool's text, trimmed but otherwise untouched. The
/// location is extracted on a best-effort basis and is purely informative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDiagnostic {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl ToolDiagnostic {
    pub fn parse(output: &str) -> Self {
        let message = output.trim().to_string();
        let location = find_location(&message);
        Self { message, location }
    }
}

impl fmt::Display for ToolDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Location formats of the supported tools (compiled once, cached)
fn location_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            // Ruby Sass: `... on line 5 of /path/app.scss`
            r"on line (?P<line>\d+) of (?P<file>[^\s,:]+)",
            // Dart Sass: `  /path/app.scss 5:7  root stylesheet`
            r"(?m)^\s*(?P<file>\S+\.(?:scss|sass|css)) (?P<line>\d+):\d+",
            // CoffeeScript: `/path/app.coffee:5:14: error: ...`
            r"(?m)^(?P<file>[^\s:][^:\n]*):(?P<line>\d+):\d+: error",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn find_location(message: &str) -> Option<SourceLocation> {
    location_regexes().iter().find_map(|regex| {
        let caps = regex.captures(message)?;
        let line = caps.name("line")?.as_str().parse().ok()?;
        let file = caps.name("file")?.as_str().to_string();
        Some(SourceLocation { file, line })
    })
}
