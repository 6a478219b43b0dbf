//! Tab-separated output
//!
//! Timeline corpora are written as one file per entity under an output
//! directory, one line per item: `id\tauthor\ttimestamp\ttext`.
//! Graph edges go to a single file, one line per edge: `source\ttarget`.

use super::traits::{EdgeSink, OutputError, OutputResult, RecordSink, TimelineSink};
use crate::api::{Edge, Entity, FeedItem};
use crate::state::EntityReport;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout used in corpus files, e.g. `Tue May 03 12:00:00 UTC 2011`
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";

/// Formats an item timestamp for a corpus line
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Replaces tabs and line breaks so a field cannot split a record
pub fn sanitize_field(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Maps an entity name onto a safe file name
fn file_name_for(entity: &Entity) -> String {
    let stem: String = entity
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.tsv", stem)
}

/// Writes one TSV file per entity
pub struct TsvCorpusWriter {
    dir: PathBuf,
    current: Option<(Entity, BufWriter<File>)>,
}

impl TsvCorpusWriter {
    /// Creates the output directory if needed
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory receiving one `<entity>.tsv` per entity
    pub fn create(dir: impl AsRef<Path>) -> OutputResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, current: None })
    }

    /// Path of the file holding `entity`'s items
    pub fn path_for(&self, entity: &Entity) -> PathBuf {
        self.dir.join(file_name_for(entity))
    }

    fn writer_for(&mut self, entity: &Entity) -> OutputResult<&mut BufWriter<File>> {
        let reopen = !matches!(&self.current, Some((open, _)) if open == entity);
        if reopen {
            if let Some((_, mut previous)) = self.current.take() {
                previous.flush()?;
            }
            let file = File::create(self.path_for(entity))?;
            let (_, writer) = self
                .current
                .insert((entity.clone(), BufWriter::new(file)));
            return Ok(writer);
        }
        self.current
            .as_mut()
            .map(|(_, writer)| writer)
            .ok_or_else(|| OutputError::Write(format!("no open file for {}", entity)))
    }
}

impl RecordSink for TsvCorpusWriter {
    fn begin_entity(&mut self, entity: &Entity) -> OutputResult<()> {
        self.writer_for(entity)?;
        Ok(())
    }

    fn finish_entity(&mut self, _report: &EntityReport) -> OutputResult<()> {
        if let Some((_, mut writer)) = self.current.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        if let Some((_, writer)) = self.current.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl TimelineSink for TsvCorpusWriter {
    fn write_item(&mut self, entity: &Entity, item: &FeedItem) -> OutputResult<()> {
        let writer = self.writer_for(entity)?;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            item.id,
            sanitize_field(&item.author),
            format_timestamp(&item.created_at),
            sanitize_field(&item.text)
        )?;
        Ok(())
    }
}

/// Writes every edge of a run to one TSV stream
pub struct TsvEdgeWriter<W: Write> {
    out: W,
    edges: u64,
}

impl TsvEdgeWriter<BufWriter<File>> {
    /// Creates (or truncates) the edge file at `path`
    pub fn create(path: impl AsRef<Path>) -> OutputResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TsvEdgeWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, edges: 0 }
    }

    /// Number of edges written so far
    pub fn edges_written(&self) -> u64 {
        self.edges
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for TsvEdgeWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> EdgeSink for TsvEdgeWriter<W> {
    fn write_edge(&mut self, edge: &Edge) -> OutputResult<()> {
        writeln!(
            self.out,
            "{}\t{}",
            sanitize_field(&edge.source),
            sanitize_field(&edge.target)
        )?;
        self.edges += 1;
        Ok(())
    }
}
