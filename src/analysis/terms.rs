use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid term pattern: {0}")]
    Compile(#[from] regex::Error),

    #[error("Term {term:?} matches empty text")]
    MatchesEmpty { term: String },
}

/// Finds flagged terms in a line of text.
///
/// Terms are regex fragments joined into a single alternation, so a term
/// list of `["master", "slave"]` compiles to `master|slave`. A term that can
/// match empty text is rejected: the leftmost alternative wins, so it would
/// shadow every term after it.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    pattern: Regex,
}

impl TermMatcher {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, PatternError> {
        for term in terms.iter().map(AsRef::as_ref) {
            if Regex::new(term)?.is_match("") {
                return Err(PatternError::MatchesEmpty {
                    term: term.to_string(),
                });
            }
        }
        let alternation = terms
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            pattern: Regex::new(&alternation)?,
        })
    }

    /// All distinct matched texts in `line`, in order of first occurrence.
    pub fn find_unique(&self, line: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for m in self.pattern.find_iter(line) {
            let text = m.as_str();
            if text.is_empty() || found.iter().any(|f| f == text) {
                continue;
            }
            found.push(text.to_string());
        }
        found
    }
}
