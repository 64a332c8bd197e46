use crate::models::transcript::TranscriptMessage;

/// Derives the text window eligible for keyword scanning from the
/// transcript. An entry never sees turns older than its effective depth.
#[derive(Debug, Clone, Copy)]
pub struct ScanWindowBuilder<'a> {
    transcript: &'a [TranscriptMessage],
    global_depth: usize,
}

impl<'a> ScanWindowBuilder<'a> {
    #[must_use]
    pub fn new(transcript: &'a [TranscriptMessage], global_depth: usize) -> Self {
        Self {
            transcript,
            global_depth,
        }
    }

    /// Number of most-recent messages an entry with the given override sees.
    /// Per-entry values strictly override the global default.
    #[must_use]
    pub fn effective_depth(&self, entry_override: Option<usize>) -> usize {
        entry_override.unwrap_or(self.global_depth)
    }

    /// The last N messages' text joined with newlines, most-recent last.
    /// Depth 0 yields an empty window.
    #[must_use]
    pub fn window(&self, entry_override: Option<usize>) -> String {
        let depth = self.effective_depth(entry_override);
        if depth == 0 || self.transcript.is_empty() {
            return String::new();
        }
        let start = self.transcript.len().saturating_sub(depth);
        let mut window = String::new();
        for (i, message) in self.transcript[start..].iter().enumerate() {
            if i > 0 {
                window.push('\n');
            }
            window.push_str(&message.content);
        }
        window
    }
}
