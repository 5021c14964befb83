/// Report Output Formats
///
/// Formats the CLI can export an audit report in.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    /// Parse format from string (CLI input).
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Infer format from an output path's extension.
    pub fn from_path(path: &Path) -> Option<OutputFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("txt"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("dot"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out/report.json")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_path(Path::new("report.txt")), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_path(Path::new("report")), None);
    }

    #[test]
    fn test_default_format() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
