//! Banco offline embebido: lecciones y preguntas canónicas que sustituyen
//! al backend cuando no hay red. Igual que el resto de datos embebidos, se
//! parsea una sola vez desde YAML.

use std::collections::HashMap;

use log::error;
use once_cell::sync::Lazy;

use crate::model::{Lesson, LessonSummary, QuizQuestion};

static LESSONS: Lazy<Vec<Lesson>> = Lazy::new(|| {
    let raw = include_str!("data/offline_lessons.yaml");
    match serde_yaml::from_str(raw) {
        Ok(lessons) => lessons,
        Err(err) => {
            error!("lecciones offline ilegibles: {err}");
            Vec::new()
        }
    }
});

static QUESTIONS: Lazy<HashMap<String, Vec<QuizQuestion>>> = Lazy::new(|| {
    let raw = include_str!("data/offline_questions.yaml");
    match serde_yaml::from_str(raw) {
        Ok(bank) => bank,
        Err(err) => {
            error!("banco de preguntas offline ilegible: {err}");
            HashMap::new()
        }
    }
});

pub fn offline_lessons() -> &'static [Lesson] {
    &LESSONS
}

pub fn offline_lesson(slug: &str) -> Option<Lesson> {
    LESSONS.iter().find(|l| l.slug == slug).cloned()
}

pub fn offline_questions(slug: &str) -> Vec<QuizQuestion> {
    QUESTIONS.get(slug).cloned().unwrap_or_default()
}

/// Catálogo offline ordenado por el número declarado de cada lección.
pub fn offline_catalog() -> Vec<LessonSummary> {
    let mut catalog: Vec<LessonSummary> = LESSONS.iter().map(Lesson::summary).collect();
    catalog.sort_by_key(|l| l.number);
    catalog
}
