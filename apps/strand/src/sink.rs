//! Committed files written as JSON lines

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use strand_downloader::StreamFileSink;
use strand_errors::Error;
use strand_types::StreamFile;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Writes one [`StreamFileSummary`](strand_types::StreamFileSummary) per
/// committed file
pub struct JsonLinesSink {
    label: PathBuf,
    writer: Mutex<Writer>,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self {
            label: PathBuf::from("<stdout>"),
            writer: Mutex::new(Box::new(tokio::io::stdout())),
        }
    }

    /// Append to `path`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn append(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Ok(Self {
            label: path.to_path_buf(),
            writer: Mutex::new(Box::new(file)),
        })
    }
}

#[async_trait]
impl StreamFileSink for JsonLinesSink {
    async fn commit(&self, file: &StreamFile) -> Result<(), Error> {
        let mut line = serde_json::to_vec(&file.summary())?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.label))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::io_with_path(&e, &self.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_reader::CompositeReader;
    use strand_testkit::chain;

    #[tokio::test]
    async fn test_appends_one_line_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("committed.jsonl");
        let reader = CompositeReader::default();
        let files = chain(6, 2);

        let sink = JsonLinesSink::append(&path).await.unwrap();
        for fixture in &files {
            let file = reader.parse(&fixture.data(0)).unwrap();
            sink.commit(&file).await.unwrap();
        }
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["filename"], files[1].filename.as_str());
        assert_eq!(lines[1]["index"], 1);
    }
}
