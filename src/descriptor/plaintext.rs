//! Plain-text coordinate list reader.
//!
//! ```text
//! # comments and blank lines are ignored
//! repo central https://repo.example.org/maven2
//! org.example:demo:1.0
//! org.example:demo:zip:dist:1.0
//! ```

use std::path::Path;

use super::{DescriptorError, DescriptorReader, ParsedDescriptor};
use crate::coordinate::ArtifactCoordinate;

const REPOSITORY_KEYWORD: &str = "repo";

/// Markup extensions this reader would misparse line by line.
const MARKUP_EXTENSIONS: &[&str] = &["pom", "xml"];

/// Reads coordinate lists; accepts any location that is not markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl DescriptorReader for PlainTextReader {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn accepts(&self, location: &Path) -> bool {
        location
            .extension()
            .and_then(|ext| ext.to_str())
            .is_none_or(|ext| {
                !MARKUP_EXTENSIONS
                    .iter()
                    .any(|markup| ext.eq_ignore_ascii_case(markup))
            })
    }

    fn read(&self, location: &Path, contents: &str) -> Result<ParsedDescriptor, DescriptorError> {
        let mut parsed = ParsedDescriptor::new(location);

        for (line_index, raw_line) in contents.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let mut words = line.split_whitespace();
            if words.next() == Some(REPOSITORY_KEYWORD) {
                let (Some(id), Some(url), None) = (words.next(), words.next(), words.next())
                else {
                    return Err(DescriptorError::parse(
                        location,
                        format!(
                            "line {}: expected `{REPOSITORY_KEYWORD} <id> <url>`",
                            line_index + 1
                        ),
                    ));
                };
                parsed.declare_repository(id, url);
                continue;
            }

            parsed.push_dependency(ArtifactCoordinate::parse(line));
        }

        Ok(parsed)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn read(contents: &str) -> Result<ParsedDescriptor, DescriptorError> {
        PlainTextReader.read(Path::new("deps.txt"), contents)
    }

    #[test]
    fn test_accepts_text_but_not_markup() {
        assert!(PlainTextReader.accepts(Path::new("deps.txt")));
        assert!(PlainTextReader.accepts(Path::new("deps")));
        assert!(!PlainTextReader.accepts(Path::new("project/pom.xml")));
        assert!(!PlainTextReader.accepts(Path::new("demo-1.0.POM")));
    }

    #[test]
    fn test_reads_coordinates_and_repositories() {
        let parsed = read(
            "# header\n\
             repo central http://central/maven2\n\
             \n\
             org.x:a:1.0   # trailing comment\n\
             org.x:b:war:2.0\n",
        )
        .unwrap();

        assert_eq!(parsed.repositories.len(), 1);
        assert_eq!(parsed.repositories[0].id(), "central");
        assert_eq!(parsed.repositories[0].base_uri(), "http://central/maven2/");
        let paths: Vec<String> = parsed
            .dependencies
            .iter()
            .map(ArtifactCoordinate::relative_path)
            .collect();
        assert_eq!(
            paths,
            vec!["org/x/a/1.0/a-1.0.jar", "org/x/b/2.0/b-2.0.war"]
        );
    }

    #[test]
    fn test_bad_coordinate_recorded_not_fatal() {
        let parsed = read("org.x:a\norg.x:b:1\n").unwrap();
        assert_eq!(parsed.invalid.len(), 1);
        assert_eq!(parsed.dependencies.len(), 1);
    }

    #[test]
    fn test_incomplete_repo_line_is_parse_error() {
        let err = read("repo only-id\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "got: {err}");
    }

    #[test]
    fn test_empty_input_yields_empty_descriptor() {
        let parsed = read("\n# nothing\n").unwrap();
        assert!(parsed.dependencies.is_empty());
        assert!(parsed.repositories.is_empty());
    }
}
