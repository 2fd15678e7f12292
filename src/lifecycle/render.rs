use crate::core::StateCode;
use uuid::Uuid;

/// Which records a snapshot emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotMode {
    /// Only records with pending updates; rendering acknowledges them
    News,
    /// Every record, without touching update state
    All,
}

impl SnapshotMode {
    pub fn from_only_updated(only_updated: bool) -> Self {
        if only_updated {
            SnapshotMode::News
        } else {
            SnapshotMode::All
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapshotMode::News => "News",
            SnapshotMode::All => "All",
        }
    }
}

/// Writes framed snapshot blocks
pub(crate) struct SnapshotWriter<'a> {
    header: &'a str,
    mode: SnapshotMode,
    type_column_width: usize,
    line_ending: &'a str,
    out: String,
}

impl<'a> SnapshotWriter<'a> {
    pub(crate) fn begin(
        header: &'a str,
        mode: SnapshotMode,
        type_column_width: usize,
        line_ending: &'a str,
    ) -> Self {
        let mut writer = Self {
            header,
            mode,
            type_column_width,
            line_ending,
            out: String::new(),
        };
        writer.frame("Begin");
        writer
    }

    pub(crate) fn record(&mut self, code: StateCode, type_name: &str, id: Uuid, category: &str) {
        let line = format!(
            "{} {} {:<width$} {} {}",
            self.header,
            code,
            type_name,
            id,
            category,
            width = self.type_column_width
        );
        self.out.push_str(line.trim_end());
        self.out.push_str(self.line_ending);
    }

    pub(crate) fn finish(mut self) -> String {
        self.frame("End");
        self.out
    }

    fn frame(&mut self, edge: &str) {
        let line = format!("{} {} {} ==========", self.header, self.mode.label(), edge);
        self.out.push_str(&line);
        self.out.push_str(self.line_ending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LifecycleFlags;

    #[test]
    fn test_empty_block_has_only_frame() {
        let text = SnapshotWriter::begin("H:", SnapshotMode::News, 20, "\n").finish();
        assert_eq!(text, "H: News Begin ==========\nH: News End ==========\n");
    }

    #[test]
    fn test_record_line_columns() {
        let id = Uuid::nil();
        let mut writer = SnapshotWriter::begin("H:", SnapshotMode::All, 8, "\n");
        writer.record(
            StateCode::new(LifecycleFlags::CONSTRUCTED, true),
            "Model",
            id,
            "app::models",
        );
        let text = writer.finish();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            format!("H: C----A Model    {} app::models", id)
        );
        assert_eq!(lines[2], "H: All End ==========");
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(SnapshotMode::from_only_updated(true), SnapshotMode::News);
        assert_eq!(SnapshotMode::from_only_updated(false).label(), "All");
    }
}
