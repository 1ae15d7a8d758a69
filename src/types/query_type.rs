use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the backend should scope a query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    /// Answer from the whole book.
    GlobalQa,

    /// Answer about the passage the user selected.
    SelectionQa,
}

impl QueryType {
    /// Classifies a query by whether a selection accompanies it.
    pub fn for_selection(selection: Option<&str>) -> Self {
        match selection {
            Some(_) => QueryType::SelectionQa,
            None => QueryType::GlobalQa,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::GlobalQa => write!(f, "GLOBAL_QA"),
            QueryType::SelectionQa => write!(f, "SELECTION_QA"),
        }
    }
}

/// Error returned when parsing an invalid query type string.
#[derive(Debug)]
pub struct QueryTypeParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for QueryTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown query type: {}", self.invalid_value)
    }
}

impl std::error::Error for QueryTypeParseError {}

impl FromStr for QueryType {
    type Err = QueryTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GLOBAL_QA" => Ok(QueryType::GlobalQa),
            "SELECTION_QA" => Ok(QueryType::SelectionQa),
            _ => Err(QueryTypeParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}
