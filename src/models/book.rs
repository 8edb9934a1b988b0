use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// A book in the catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year_published: i32,
    pub summary: Option<String>,
}

/// Lower-cases the keys of a JSON object so `Title` and `title` name the same field
fn normalize_keys(fields: Map<String, Value>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect(),
    )
}

/// Payload for creating a book; the store assigns the id
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year_published: i32,
    /// Generated by the summary provider when absent or blank
    #[serde(default)]
    pub summary: Option<String>,
}

impl NewBook {
    /// Builds a new book from a JSON object, matching field names case-insensitively
    pub fn from_json(fields: Map<String, Value>) -> AppResult<Self> {
        serde_json::from_value(normalize_keys(fields))
            .map_err(|e| AppError::InvalidInput(format!("Invalid book: {}", e)))
    }

    /// Rejects blank required fields
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("genre", &self.genre),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidInput(format!("{} cannot be empty", field)));
            }
        }
        Ok(())
    }

    /// True when the caller did not supply a usable summary
    pub fn needs_summary(&self) -> bool {
        self.summary
            .as_deref()
            .map_or(true, |summary| summary.trim().is_empty())
    }

    /// Prompt handed to the text-generation model
    pub fn summary_prompt(&self) -> String {
        format!(
            "The book {} by {} is a {} published in {}.",
            self.title, self.author, self.genre, self.year_published
        )
    }
}

/// Partial update of a book. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub year_published: Option<i32>,
    pub summary: Option<String>,
}

impl BookPatch {
    /// Builds a patch from a JSON object, matching field names case-insensitively.
    ///
    /// Unknown field names are rejected instead of being written blindly.
    pub fn from_json(fields: Map<String, Value>) -> AppResult<Self> {
        let patch: BookPatch = serde_json::from_value(normalize_keys(fields))
            .map_err(|e| AppError::InvalidInput(format!("Invalid book update: {}", e)))?;

        if patch.is_empty() {
            return Err(AppError::InvalidInput(
                "Book update must contain at least one field".to_string(),
            ));
        }

        for (field, value) in [
            ("title", &patch.title),
            ("author", &patch.author),
            ("genre", &patch.genre),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::InvalidInput(format!("{} cannot be empty", field)));
            }
        }

        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self == &BookPatch::default()
    }

    /// Applies the patch in place
    pub fn apply(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(genre) = &self.genre {
            book.genre = genre.clone();
        }
        if let Some(year) = self.year_published {
            book.year_published = year;
        }
        if let Some(summary) = &self.summary {
            book.summary = Some(summary.clone());
        }
    }
}
