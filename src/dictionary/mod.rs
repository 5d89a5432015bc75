//! Word definitions from a public dictionary API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::validate_term;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_SYNONYMS: usize = 2;

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meaning {
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<Definition>,
    #[serde(default)]
    synonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    #[serde(default)]
    definition: String,
    #[serde(default)]
    synonyms: Vec<String>,
}

/// One formatted line per part of speech.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionEntry {
    pub part_of_speech: String,
    pub text: String,
}

/// Result of a lookup, ready to drop into a word's meaning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    pub term: String,
    pub meanings: Vec<DefinitionEntry>,
    pub meaning: String,
}

#[derive(Clone)]
pub struct DictionaryClient {
    client: reqwest::Client,
    base_url: String,
}

impl DictionaryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Look up `term` and format its definitions.
    pub async fn lookup(&self, term: &str) -> Result<Lookup, AppError> {
        validate_term(term)?;
        let term = term.trim().to_lowercase();
        let url = format!("{}/{}", self.base_url, urlencoding::encode(&term));

        tracing::debug!(%term, "Looking up word definition");
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(
                    "Word not found in dictionary".to_string(),
                ))
            }
            status if !status.is_success() => {
                tracing::warn!(%term, %status, "Dictionary lookup failed");
                return Err(AppError::Network(
                    "Failed to fetch word definition".to_string(),
                ));
            }
            _ => {}
        }

        let entries: Vec<Entry> = response.json().await?;
        let first = entries.into_iter().next().ok_or_else(|| {
            AppError::NotFound("No definition found for this word".to_string())
        })?;

        let meanings = format_meanings(&first.meanings);
        if meanings.is_empty() {
            return Err(AppError::NotFound(
                "No definition available for this word".to_string(),
            ));
        }

        Ok(Lookup {
            term,
            meaning: join_meanings(&meanings),
            meanings,
        })
    }
}

/// Format each meaning's first definition.
///
/// A later meaning with an already-seen part of speech replaces the earlier
/// text but keeps its position.
fn format_meanings(meanings: &[Meaning]) -> Vec<DefinitionEntry> {
    let mut entries: Vec<DefinitionEntry> = Vec::new();

    for meaning in meanings {
        let Some(definition) = meaning.definitions.first() else {
            continue;
        };
        if definition.definition.trim().is_empty() {
            continue;
        }

        let text = format_definition(meaning, definition);
        match entries
            .iter_mut()
            .find(|e| e.part_of_speech == meaning.part_of_speech)
        {
            Some(entry) => entry.text = text,
            None => entries.push(DefinitionEntry {
                part_of_speech: meaning.part_of_speech.clone(),
                text,
            }),
        }
    }

    entries
}

fn format_definition(meaning: &Meaning, definition: &Definition) -> String {
    let mut synonyms: Vec<&str> = Vec::with_capacity(MAX_SYNONYMS);
    for synonym in meaning.synonyms.iter().chain(&definition.synonyms) {
        if synonyms.len() == MAX_SYNONYMS {
            break;
        }
        if !synonyms.contains(&synonym.as_str()) {
            synonyms.push(synonym);
        }
    }

    let mut text = format!("({})", meaning.part_of_speech);
    if !synonyms.is_empty() {
        text.push_str(&format!(" ({})", synonyms.join(", ")));
    }
    text.push(' ');
    text.push_str(&definition.definition);
    text
}

fn join_meanings(entries: &[DefinitionEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Vec<Meaning> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_synonyms_deduplicated_and_capped() {
        let meanings = parse(json!([{
            "partOfSpeech": "adjective",
            "synonyms": ["vague", "unclear"],
            "definitions": [{
                "definition": "open to more than one interpretation",
                "synonyms": ["vague", "equivocal"]
            }]
        }]));

        let entries = format_meanings(&meanings);
        assert_eq!(
            entries[0].text,
            "(adjective) (vague, unclear) open to more than one interpretation"
        );
    }

    #[test]
    fn test_no_synonyms_omits_group() {
        let meanings = parse(json!([{
            "partOfSpeech": "noun",
            "definitions": [{"definition": "a greeting"}, {"definition": "ignored"}]
        }]));
        assert_eq!(format_meanings(&meanings)[0].text, "(noun) a greeting");
    }

    #[test]
    fn test_same_part_of_speech_collapses() {
        let meanings = parse(json!([
            {"partOfSpeech": "verb", "definitions": [{"definition": "first verb"}]},
            {"partOfSpeech": "noun", "definitions": [{"definition": "a noun"}]},
            {"partOfSpeech": "verb", "definitions": [{"definition": "second verb"}]},
            {"partOfSpeech": "adverb", "definitions": []}
        ]));

        let entries = format_meanings(&meanings);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].part_of_speech, "verb");
        assert_eq!(entries[0].text, "(verb) second verb");
        assert_eq!(
            join_meanings(&entries),
            "(verb) second verb\n\n(noun) a noun"
        );
    }

    async fn mock_dictionary() -> String {
        let app = Router::new().route(
            "/{term}",
            get(|Path(term): Path<String>| async move {
                match term.as_str() {
                    "hello" => (
                        StatusCode::OK,
                        Json(json!([{
                            "word": "hello",
                            "meanings": [{
                                "partOfSpeech": "interjection",
                                "definitions": [{"definition": "used as a greeting"}]
                            }]
                        }])),
                    ),
                    "broken" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
                    "empty" => (StatusCode::OK, Json(json!([]))),
                    _ => (StatusCode::NOT_FOUND, Json(json!({"title": "No Definitions Found"}))),
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_lookup_against_mock_api() {
        let client = DictionaryClient::new(mock_dictionary().await);

        let found = client.lookup("  Hello ").await.unwrap();
        assert_eq!(found.term, "hello");
        assert_eq!(found.meaning, "(interjection) used as a greeting");

        let err = client.lookup("qwzx").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Word not found in dictionary"));

        let err = client.lookup("broken").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));

        let err = client.lookup("empty").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = client.lookup("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
