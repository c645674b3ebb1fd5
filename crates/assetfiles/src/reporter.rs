use serde::Serialize;

/// What the collect pass did with one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "reason")]
pub enum CollectAction {
    Processed,
    Copied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A dependency such as a Sass partial
    Partial,
    /// An earlier root already produced the target
    AlreadyCollected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectEntry {
    /// Finder-relative source path
    pub source: String,
    /// Storage name written, or that would have been written
    pub target: String,
    /// Filter that processed the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(flatten)]
    pub action: CollectAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectReport {
    pub entries: Vec<CollectEntry>,
    pub processed: usize,
    pub copied: usize,
    pub skipped: usize,
    pub dry_run: bool,
}

impl CollectReport {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Default::default() }
    }

    pub fn push(&mut self, entry: CollectEntry) {
        match entry.action {
            CollectAction::Processed => self.processed += 1,
            CollectAction::Copied => self.copied += 1,
            CollectAction::Skipped(_) => self.skipped += 1,
        }
        self.entries.push(entry);
    }

    /// Entries that were, or would have been, written
    pub fn written(&self) -> impl Iterator<Item = &CollectEntry> {
        self.entries.iter().filter(|e| !matches!(e.action, CollectAction::Skipped(_)))
    }
}

pub fn report_text(report: &CollectReport) {
    for entry in &report.entries {
        match (&entry.action, &entry.filter) {
            (CollectAction::Processed, Some(filter)) => {
                println!("  processed {} -> {} ({filter})", entry.source, entry.target)
            }
            (CollectAction::Processed, None) => {
                println!("  processed {} -> {}", entry.source, entry.target)
            }
            (CollectAction::Copied, _) => println!("  copied    {}", entry.target),
            (CollectAction::Skipped(SkipReason::Partial), _) => {
                println!("  skipped   {} (partial)", entry.source)
            }
            (CollectAction::Skipped(SkipReason::AlreadyCollected), _) => {
                println!("  skipped   {} (already collected)", entry.source)
            }
        }
    }

    let verb = if report.dry_run { "would be written" } else { "written" };
    println!(
        "\n{} processed, {} copied, {} skipped; {} files {verb}",
        report.processed,
        report.copied,
        report.skipped,
        report.processed + report.copied
    );
}

pub fn report_json(report: &CollectReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
