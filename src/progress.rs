//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};

/// Row progress for one chunked pass over a ledger column.
///
/// Log lines remain the record of what happened; the bar is only a
/// convenience when a terminal is attached.
#[derive(Debug)]
pub struct ChunkProgress {
    rows_pb: Option<ProgressBar>,
}

impl ChunkProgress {
    /// Create a bar over `total_rows` data rows
    pub fn new(total_rows: u64, message: &str, show_progress: bool) -> Self {
        let rows_pb = if show_progress && total_rows > 0 {
            Some(create_progress_bar(total_rows, message))
        } else {
            None
        };
        Self { rows_pb }
    }

    pub fn is_visible(&self) -> bool {
        self.rows_pb.is_some()
    }

    /// Record that `rows` more rows were processed
    pub fn advance(&self, rows: u64) {
        if let Some(pb) = &self.rows_pb {
            pb.inc(rows);
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.rows_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ChunkProgress {
    fn drop(&mut self) {
        // An aborted pass leaves no half-drawn bar behind
        if let Some(pb) = self.rows_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} rows {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
