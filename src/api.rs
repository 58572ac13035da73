//! Cliente del backend de lecciones y quizzes.
//!
//! El backend se trata como una caja negra con contratos estrechos; toda
//! forma laxa se normaliza aquí, en la frontera. Cuando no hay red el flujo
//! cambia al servicio offline embebido, así que ningún fallo de este módulo
//! llega al aprendiz como pantalla de error.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::data;
use crate::model::{AnswerRecord, Lesson, LessonSection, QuizQuestion};
use crate::quiz::normalize::normalize_questions;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/api";
const REQUEST_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("fallo de red: {0}")]
    Network(#[from] reqwest::Error),
    #[error("el backend devolvió HTTP {status} en {url}")]
    Http { status: u16, url: String },
    #[error("respuesta ilegible del backend: {0}")]
    BadPayload(String),
    #[error("modo offline: no hay backend al que enviar")]
    Offline,
}

/// Resultado del envío de un quiz tal como lo devuelve el backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionOutcome {
    /// Fracción 0–1, no porcentaje.
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub results: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedAnswer<'a> {
    question_id: &'a str,
    answer: &'a crate::model::Answer,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload {
    score: u32,
    time_spent_seconds: u64,
}

/// Colaborador externo del flujo. Dos implementaciones: HTTP real y banco
/// offline embebido.
pub trait LessonService {
    fn fetch_lesson(&self, slug: &str) -> Result<Lesson, ApiError>;
    fn fetch_questions(&self, slug: &str) -> Result<Vec<QuizQuestion>, ApiError>;
    fn submit_quiz(&self, slug: &str, answers: &[AnswerRecord]) -> Result<SubmissionOutcome, ApiError>;
    fn post_completion(&self, slug: &str, score: u32, time_spent_secs: u64) -> Result<(), ApiError>;
}

pub struct HttpLessonService {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpLessonService {
    /// Endpoint desde `STAT_PATH_API`, con el valor por defecto de
    /// desarrollo si la variable no está o viene vacía.
    pub fn from_env() -> Self {
        let base = std::env::var("STAT_PATH_API")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self::with_base(&base)
    }

    pub fn with_base(base: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("cliente HTTP sin timeout configurable: {err}");
                reqwest::blocking::Client::new()
            });
        Self { base: trim_base(base), client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base)
    }

    fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(ApiError::Http { status: response.status().as_u16(), url: url.to_string() });
        }
        response
            .json::<Value>()
            .map_err(|err| ApiError::BadPayload(err.to_string()))
    }
}

fn trim_base(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed == "/" {
        return trimmed.to_string();
    }
    trimmed.trim_end_matches('/').to_string()
}

impl LessonService for HttpLessonService {
    fn fetch_lesson(&self, slug: &str) -> Result<Lesson, ApiError> {
        let url = self.url(&format!("lesson/{slug}"));
        let payload = self.get_json(&url)?;
        Ok(normalize_lesson(slug, &payload))
    }

    fn fetch_questions(&self, slug: &str) -> Result<Vec<QuizQuestion>, ApiError> {
        let url = self.url(&format!("quiz-questions/{slug}"));
        let payload = self.get_json(&url)?;
        Ok(normalize_questions(&payload))
    }

    fn submit_quiz(&self, slug: &str, answers: &[AnswerRecord]) -> Result<SubmissionOutcome, ApiError> {
        let url = self.url(&format!("quiz-submission/{slug}"));
        let body: Vec<SubmittedAnswer> = answers
            .iter()
            .map(|a| SubmittedAnswer { question_id: &a.question_id, answer: &a.user_answer })
            .collect();

        let response = self.client.post(&url).json(&body).send()?;
        if !response.status().is_success() {
            return Err(ApiError::Http { status: response.status().as_u16(), url });
        }
        response
            .json::<SubmissionOutcome>()
            .map_err(|err| ApiError::BadPayload(err.to_string()))
    }

    fn post_completion(&self, slug: &str, score: u32, time_spent_secs: u64) -> Result<(), ApiError> {
        let url = self.url(&format!("lesson-completion/{slug}"));
        let payload = CompletionPayload { score, time_spent_seconds: time_spent_secs };
        let response = self.client.post(&url).json(&payload).send()?;
        if !response.status().is_success() {
            return Err(ApiError::Http { status: response.status().as_u16(), url });
        }
        Ok(())
    }
}

/// Convierte el registro laxo del backend en una `Lesson` tipada. La
/// ausencia o malformación de `content_json.sections` deja las secciones
/// vacías, que es lo que dispara el fallback del pipeline; nunca un error.
fn normalize_lesson(slug: &str, payload: &Value) -> Lesson {
    let title = payload
        .get("title")
        .or_else(|| payload.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| humanize_slug(slug));

    let number = payload
        .get("number")
        .or_else(|| payload.get("order"))
        .or_else(|| payload.get("position"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    // content_json puede venir como objeto o doblemente codificado en cadena
    let content = payload
        .get("content_json")
        .or_else(|| payload.get("content"))
        .cloned()
        .map(|v| match v {
            Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
            other => other,
        })
        .unwrap_or(Value::Null);

    let sections = content
        .get("sections")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| LessonSection {
                    kind: item
                        .get("type")
                        .or_else(|| item.get("kind"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    title: item
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    content: item
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let markdown = content
        .get("markdown")
        .or_else(|| payload.get("markdown"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Lesson { slug: slug.to_string(), title, number, sections, markdown }
}

fn humanize_slug(slug: &str) -> String {
    let spaced = slug.rsplit('/').next().unwrap_or(slug).replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

/// Servicio de respaldo: sirve el banco embebido y no envía nada.
pub struct OfflineLessonService;

impl LessonService for OfflineLessonService {
    fn fetch_lesson(&self, slug: &str) -> Result<Lesson, ApiError> {
        Ok(data::offline_lesson(slug).unwrap_or_else(|| Lesson {
            slug: slug.to_string(),
            title: humanize_slug(slug),
            number: 0,
            sections: vec![],
            markdown: None,
        }))
    }

    fn fetch_questions(&self, slug: &str) -> Result<Vec<QuizQuestion>, ApiError> {
        Ok(data::offline_questions(slug))
    }

    fn submit_quiz(&self, _slug: &str, _answers: &[AnswerRecord]) -> Result<SubmissionOutcome, ApiError> {
        Err(ApiError::Offline)
    }

    fn post_completion(&self, _slug: &str, _score: u32, _time_spent_secs: u64) -> Result<(), ApiError> {
        Err(ApiError::Offline)
    }
}
