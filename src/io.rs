//! Reader/Writer traits and format dispatch
//!
//! Graph and settings files are read as YAML or JSON, chosen by extension.
//! Frames are written as JSON or YAML, chosen by format id.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Settings;
use crate::layout::Frame;
use crate::model::{GraphSpec, ModelError};

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A rendering/writing error occurred
    #[error("write error: {0}")]
    Write(String),

    /// The graph parsed but is not valid
    #[error("invalid graph: {0}")]
    Model(#[from] ModelError),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// A reader parses one input format
pub trait Reader {
    /// Parse a graph description
    fn read_graph(&self, input: &Path) -> IoResult<GraphSpec>;

    /// Parse a settings file
    fn read_settings(&self, input: &Path) -> IoResult<Settings>;

    /// File extensions this reader can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer serializes frames to one output format
pub trait Writer {
    /// Render the frame to a string
    fn render(&self, frame: &Frame) -> IoResult<String>;

    /// Write the frame to the output path
    fn write(&self, frame: &Frame, output: &Path) -> IoResult<()> {
        let content = self.render(frame)?;
        fs::write(output, content)?;
        Ok(())
    }

    /// Identifier for this output format (e.g., "json", "yaml")
    fn format_id(&self) -> &str;
}

/// Reads YAML graph and settings files
#[derive(Debug, Default)]
pub struct YamlReader;

impl YamlReader {
    pub fn new() -> Self {
        Self
    }

    fn parse<T: DeserializeOwned>(input: &Path) -> IoResult<T> {
        let content = fs::read_to_string(input)?;
        serde_yaml::from_str(&content).map_err(|e| IoError::Parse(e.to_string()))
    }
}

impl Reader for YamlReader {
    fn read_graph(&self, input: &Path) -> IoResult<GraphSpec> {
        Self::parse(input)
    }

    fn read_settings(&self, input: &Path) -> IoResult<Settings> {
        Self::parse(input)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Reads JSON graph and settings files
#[derive(Debug, Default)]
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }

    fn parse<T: DeserializeOwned>(input: &Path) -> IoResult<T> {
        let content = fs::read_to_string(input)?;
        serde_json::from_str(&content).map_err(|e| IoError::Parse(e.to_string()))
    }
}

impl Reader for JsonReader {
    fn read_graph(&self, input: &Path) -> IoResult<GraphSpec> {
        Self::parse(input)
    }

    fn read_settings(&self, input: &Path) -> IoResult<Settings> {
        Self::parse(input)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Writes frames as pretty-printed JSON
#[derive(Debug, Default)]
pub struct JsonWriter;

impl Writer for JsonWriter {
    fn render(&self, frame: &Frame) -> IoResult<String> {
        let mut out =
            serde_json::to_string_pretty(frame).map_err(|e| IoError::Write(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }

    fn format_id(&self) -> &str {
        "json"
    }
}

/// Writes frames as YAML
#[derive(Debug, Default)]
pub struct YamlWriter;

impl Writer for YamlWriter {
    fn render(&self, frame: &Frame) -> IoResult<String> {
        serde_yaml::to_string(frame).map_err(|e| IoError::Write(e.to_string()))
    }

    fn format_id(&self) -> &str {
        "yaml"
    }
}

/// Registry of available readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn Reader>>,
    writers: Vec<Box<dyn Writer>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Create a registry with the YAML and JSON readers and writers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(YamlReader::new()));
        registry.register_reader(Box::new(JsonReader::new()));
        registry.register_writer(Box::new(JsonWriter));
        registry.register_writer(Box::new(YamlWriter));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn Reader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    /// Find a reader for the given file extension
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn Reader> {
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> IoResult<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
            .ok_or_else(|| IoError::UnsupportedFormat(format_id.to_string()))
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Find a reader for the given path based on its extension
    pub fn reader_for_path(&self, path: &Path) -> IoResult<&dyn Reader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.reader_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Read a graph file, dispatching on its extension
    pub fn read_graph(&self, path: &Path) -> IoResult<GraphSpec> {
        self.reader_for_path(path)?.read_graph(path)
    }

    /// Read a settings file, dispatching on its extension
    pub fn read_settings(&self, path: &Path) -> IoResult<Settings> {
        self.reader_for_path(path)?.read_settings(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::model::{Category, ModelConfig};

    const SMALL_GRAPH: &str = r#"
skills:
  - name: Rust
    category: backend
    radius: 40
  - name: Git
    category: tools
links:
  - source: Git
    target: Rust
    strength: 0.3
"#;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reader_supports_extension_case_insensitive() {
        let reader = YamlReader::new();
        assert!(reader.supports_extension("yaml"));
        assert!(reader.supports_extension("YML"));
        assert!(!reader.supports_extension("json"));
        assert!(JsonReader::new().supports_extension("JSON"));
    }

    #[test]
    fn registry_reader_for_path_extracts_extension() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.reader_for_path(Path::new("graph.yml")).is_ok());
        assert!(matches!(
            registry.reader_for_path(Path::new("graph.toml")),
            Err(IoError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            registry.reader_for_path(Path::new("graph")),
            Err(IoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn registry_finds_writer_by_format() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.writer_for_format("json").is_ok());
        assert!(registry.writer_for_format("YAML").is_ok()); // case insensitive
        assert!(matches!(
            registry.writer_for_format("svg"),
            Err(IoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn reads_yaml_graph() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "graph.yaml", SMALL_GRAPH);

        let spec = FormatRegistry::with_defaults().read_graph(&path).unwrap();
        assert_eq!(spec.skills.len(), 2);
        assert_eq!(spec.skills[0].category, Category::Backend);
        assert_eq!(spec.skills[0].radius, Some(40.0));
        assert_eq!(spec.links[0].strength, 0.3);

        let model = spec.resolve(&ModelConfig::default()).unwrap();
        assert!(model.are_linked("Rust", "Git"));
    }

    #[test]
    fn reads_json_graph_without_links() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "graph.json",
            r#"{"skills": [{"name": "Figma", "category": "tools"}]}"#,
        );

        let spec = FormatRegistry::with_defaults().read_graph(&path).unwrap();
        assert_eq!(spec.skills.len(), 1);
        assert!(spec.links.is_empty());
    }

    #[test]
    fn malformed_graph_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "graph.yaml", "skills:\n  - name: Rust\n    category: firmware\n");

        let err = FormatRegistry::with_defaults().read_graph(&path).unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FormatRegistry::with_defaults()
            .read_graph(Path::new("/nonexistent/graph.yaml"))
            .unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }

    #[test]
    fn reads_settings_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "settings.yaml", "viewport:\n  width: 1024\n  height: 768\n");

        let settings = FormatRegistry::with_defaults().read_settings(&path).unwrap();
        assert_eq!(settings.viewport.width, 1024.0);
        assert_eq!(settings.viewport.height, 768.0);
    }

    #[test]
    fn json_writer_writes_frame() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.json");
        let frame = Frame::default();

        JsonWriter.write(&frame, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"nodes\": [],\n  \"links\": []\n}\n");
    }

    #[test]
    fn io_error_display() {
        let err = IoError::UnsupportedFormat("xyz".to_string());
        assert_eq!(err.to_string(), "unsupported format: xyz");

        let err = IoError::from(ModelError::SelfLink("Git".to_string()));
        assert!(err.to_string().starts_with("invalid graph: "));
    }
}
