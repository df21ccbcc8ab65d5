use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

/// Number of `\n` bytes, the way `wc -l` counts. A final line without a
/// terminator is not counted.
pub fn count_newlines(data: &[u8]) -> u64 {
    data.iter().filter(|b| **b == b'\n').count() as u64
}

/// Streams the file through a buffered reader and counts its newlines.
pub async fn count_file_lines(path: &Path) -> std::io::Result<u64> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut lines = 0;
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(lines);
        }
        lines += count_newlines(chunk);
        let consumed = chunk.len();
        reader.consume(consumed);
    }
}
