use crate::libshiken::shitsumon::Question;
use log::{debug, info, warn};
use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://quizapi.io/api/v1/questions";

const CATEGORY: &str = "code";
const DIFFICULTY: &str = "Easy";
const LIMIT: u32 = 10;
const TAGS: &str = "JavaScript";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch questions: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to fetch questions: server answered {0}")]
    Status(StatusCode),
    #[error("Failed to read questions: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Failed to open question file: {0}")]
    File(#[from] io::Error),
}

/// Anything that can hand over a fresh question list. Called from the
/// background fetch thread, hence `Send + Sync`.
pub trait QuestionSource: Send + Sync {
    fn fetch_questions(&self) -> Result<Vec<Question>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

pub struct QuizApiClient {
    client: reqwest::blocking::Client,
    config: ApiConfig,
}

impl QuizApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        if config.api_key.is_none() {
            warn!("[API] No API key configured, the request will most likely be refused");
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("shiken/{}", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(5);
        if let Some(key) = &self.config.api_key {
            query.push(("apiKey", key.clone()));
        }
        query.push(("category", CATEGORY.to_string()));
        query.push(("difficulty", DIFFICULTY.to_string()));
        query.push(("limit", LIMIT.to_string()));
        query.push(("tags", TAGS.to_string()));
        query
    }
}

impl QuestionSource for QuizApiClient {
    fn fetch_questions(&self) -> Result<Vec<Question>, FetchError> {
        let now = Instant::now();
        info!("[API] Requesting questions from {}", self.config.endpoint);
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            warn!("[API] Request failed with {}", status);
            return Err(FetchError::Status(status));
        }

        let body = response.text()?;
        let questions: Vec<Question> = serde_json::from_str(&body)?;
        debug!(
            "[API] Got {} questions in {} ms.",
            questions.len(),
            now.elapsed().as_millis()
        );
        Ok(questions)
    }
}

/// Questions read from a local JSON file in the quizapi.io format.
pub struct QuestionFile {
    pub path: PathBuf,
}

impl QuestionSource for QuestionFile {
    fn fetch_questions(&self) -> Result<Vec<Question>, FetchError> {
        info!("[API] Reading questions from {:?}", self.path);
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn query_carries_fixed_parameters() {
        let client = QuizApiClient::new(ApiConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: Some("secret".to_string()),
        })
        .unwrap();
        assert_eq!(
            client.query(),
            vec![
                ("apiKey", "secret".to_string()),
                ("category", "code".to_string()),
                ("difficulty", "Easy".to_string()),
                ("limit", "10".to_string()),
                ("tags", "JavaScript".to_string()),
            ]
        );
    }

    #[test]
    fn refused_connection_is_a_request_error() {
        let client = QuizApiClient::new(ApiConfig {
            endpoint: "http://127.0.0.1:9/api/v1/questions".to_string(),
            api_key: None,
        })
        .unwrap();
        let err = client.fetch_questions().unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(err.to_string().starts_with("Failed to fetch questions"));
    }

    #[test]
    fn question_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 1, "question": "2 + 2?", "answers": {{"answer_a": "4", "answer_b": "5"}},
                "correct_answers": {{"answer_a_correct": "true", "answer_b_correct": "false"}}}}]"#
        )
        .unwrap();

        let source = QuestionFile {
            path: file.path().to_path_buf(),
        };
        let questions = source.fetch_questions().unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "1");
    }

    #[test]
    fn malformed_question_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"error": "Unauthorized"}}"#).unwrap();
        let source = QuestionFile {
            path: file.path().to_path_buf(),
        };
        assert!(matches!(
            source.fetch_questions(),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn missing_question_file_is_reported() {
        let source = QuestionFile {
            path: PathBuf::from("/definitely/not/here.json"),
        };
        assert!(matches!(source.fetch_questions(), Err(FetchError::File(_))));
    }
}
