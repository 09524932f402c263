//! Plain text report for the terminal.

use std::io::{self, Write};

use super::format_size;
use crate::duplicates::ScanResult;
use crate::selection::Selection;

/// Human-readable listing of totals and groups.
pub struct TextReport<'a> {
    result: &'a ScanResult,
    selection: Option<&'a Selection>,
}

impl<'a> TextReport<'a> {
    /// Report on `result`.
    #[must_use]
    pub fn new(result: &'a ScanResult) -> Self {
        Self {
            result,
            selection: None,
        }
    }

    /// Mark selected members in the listing.
    #[must_use]
    pub fn with_selection(mut self, selection: &'a Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let result = self.result;
        writeln!(
            writer,
            "Scanned {} file(s), {} total, {} unique",
            result.total_files,
            format_size(result.total_size),
            result.unique_count
        )?;

        if !result.has_duplicates() {
            writeln!(writer, "No duplicates found.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "Found {} duplicate group(s), {} duplicate file(s), {} wasted",
            result.group_count(),
            result.duplicate_file_count(),
            format_size(result.wasted_space)
        )?;

        for (index, group) in result.groups.iter().enumerate() {
            writeln!(writer)?;
            writeln!(
                writer,
                "Group {} [{}] {} file(s), {} total, {} wasted",
                index + 1,
                short_hash(group.fingerprint.as_str()),
                group.len(),
                format_size(group.total_size()),
                format_size(group.wasted_size)
            )?;
            for (position, item) in group.members.iter().enumerate() {
                let marker = if self.selection.is_some_and(|s| s.contains(item.id)) {
                    "[x]"
                } else if position == 0 {
                    "[*]"
                } else {
                    "[ ]"
                };
                writeln!(
                    writer,
                    "  {} {} ({})",
                    marker,
                    item.relative_path,
                    format_size(item.size)
                )?;
            }
        }
        Ok(())
    }

    /// Render the report as a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::build_scan_result;
    use crate::scanner::{Fingerprint, Item, ItemId};
    use chrono::Utc;

    fn item(id: u64, fp: &str) -> Item {
        Item {
            id: ItemId(id),
            name: format!("f{id}"),
            relative_path: format!("dir/f{id}"),
            size: 10,
            content_type: None,
            modified: Utc::now(),
            fingerprint: Fingerprint::new(fp),
        }
    }

    #[test]
    fn test_no_duplicates() {
        let text = TextReport::new(&ScanResult::default()).render();
        assert!(text.contains("Scanned 0 file(s)"));
        assert!(text.contains("No duplicates found."));
    }

    #[test]
    fn test_groups_and_markers() {
        let result = build_scan_result(vec![item(0, "h"), item(1, "h"), item(2, "h")]);
        let selection: Selection = [ItemId(2)].into_iter().collect();
        let text = TextReport::new(&result).with_selection(&selection).render();

        assert!(text.contains("Found 1 duplicate group(s), 2 duplicate file(s)"));
        assert!(text.contains("Group 1 [h] 3 file(s)"));
        assert!(text.contains(&format!("{} total", format_size(30))));
        assert!(text.contains("[*] dir/f0"));
        assert!(text.contains("[ ] dir/f1"));
        assert!(text.contains("[x] dir/f2"));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("abc"), "abc");
        assert_eq!(short_hash(&"f".repeat(64)).len(), 16);
    }
}
