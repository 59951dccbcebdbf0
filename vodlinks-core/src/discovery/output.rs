use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use super::model::OutputRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `youtube-dl` invocation per record.
    #[default]
    BashCommands,
    /// Entries of a bash associative array mapping manifest URL to file name.
    BashArray,
}

impl OutputFormat {
    pub fn header(&self) -> Option<&'static str> {
        match self {
            OutputFormat::BashCommands => None,
            OutputFormat::BashArray => Some("declare -A pairs=(\n"),
        }
    }

    pub fn footer(&self) -> Option<&'static str> {
        match self {
            OutputFormat::BashCommands => None,
            OutputFormat::BashArray => Some(")\n"),
        }
    }

    pub fn render(&self, record: &OutputRecord) -> String {
        let file_name = record.file_name();
        match self {
            OutputFormat::BashCommands => format!(
                "youtube-dl -f best \"{}\" --hls-prefer-native -o \"{}\"\n",
                record.manifest_url, file_name
            ),
            OutputFormat::BashArray => {
                format!("\t[\"{}\"]=\"{}\"\n", record.manifest_url, file_name)
            }
        }
    }
}

/// Receives records as soon as they are discovered.
pub trait RecordSink {
    fn begin(&mut self) -> io::Result<()>;
    fn emit(&mut self, record: &OutputRecord) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    format: OutputFormat,
    emitted: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_flushed(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()
    }
}

impl WriterSink<Box<dyn Write>> {
    /// Appends to `path` when given, otherwise writes to stdout.
    pub fn open(path: Option<&Path>, format: OutputFormat) -> io::Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
            None => Box::new(io::stdout()),
        };
        Ok(Self::new(writer, format))
    }
}

impl<W: Write> RecordSink for WriterSink<W> {
    fn begin(&mut self) -> io::Result<()> {
        match self.format.header() {
            Some(header) => self.write_flushed(header),
            None => Ok(()),
        }
    }

    fn emit(&mut self, record: &OutputRecord) -> io::Result<()> {
        let line = self.format.render(record);
        self.write_flushed(&line)?;
        self.emitted += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        match self.format.footer() {
            Some(footer) => self.write_flushed(footer),
            None => Ok(()),
        }
    }
}
