use serde::Serialize;

/// Outcome of a check run. Flagged terms never block a merge, so a failing
/// scan concludes `neutral` rather than `failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Neutral,
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conclusion::Success => write!(f, "SUCCESS"),
            Conclusion::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Warning,
}

/// A single-line check run annotation, serialized in GitHub's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub annotation_level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

impl Annotation {
    pub fn warning(path: &str, line: usize, title: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            start_line: line,
            end_line: line,
            annotation_level: AnnotationLevel::Warning,
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

/// Everything reported for one pull request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRunResult {
    pub name: String,
    pub head_branch: String,
    pub head_sha: String,
    pub conclusion: Conclusion,
    pub title: String,
    /// Details text shown below the summary
    pub text: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusion_wire_format() {
        assert_eq!(serde_json::to_string(&Conclusion::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&Conclusion::Neutral).unwrap(), "\"neutral\"");
        assert_eq!(Conclusion::Neutral.to_string(), "NEUTRAL");
    }

    #[test]
    fn test_warning_annotation_spans_one_line() {
        let annotation = Annotation::warning("a.rs", 9, "Flagged term", "Found: master");
        assert_eq!(annotation.start_line, annotation.end_line);
        let json = serde_json::to_value(&annotation).unwrap();
        assert_eq!(json["annotation_level"], "warning");
        assert_eq!(json["end_line"], 9);
    }
}
