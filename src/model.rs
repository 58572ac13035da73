use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tipo de diapositiva generada por el pipeline de contenido.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    Intro,
    Concept,
    Example,
    Practice,
    Tip,
    Formula,
    Completion,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Slide {
    pub id: String,
    pub kind: SlideKind,
    pub title: String,
    pub content: String, // marcado ya saneado
    #[serde(default)]
    pub visual: Option<String>,
    #[serde(default)]
    pub highlight: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    Tf,
    Fill,
    Match,
}

/// Respuesta de un aprendiz (o la canónica). El formato depende del tipo
/// de pregunta, por eso es untagged: `2`, `true`, `"media"` o una lista
/// de parejas.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Boolean(bool),
    Text(String),
    Pairs(Vec<(String, String)>),
}

impl Answer {
    pub fn as_choice(&self) -> Option<usize> {
        match self {
            Answer::Choice(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[(String, String)]> {
        match self {
            Answer::Pairs(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizQuestion {
    pub id: String,
    pub kind: QuestionKind,
    pub stem: String, // Enunciado
    #[serde(default)]
    pub choices: Vec<String>,
    pub correct: Answer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

/// Una entrada del registro de respuestas de un intento.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnswerRecord {
    pub question_id: String,
    pub user_answer: Answer,
    pub correct_answer: Answer,
    pub is_correct: bool,
}

/// Resultado inmutable de un intento de quiz. `total_questions` cuenta solo
/// las preguntas intentadas cuando el intento termina por falta de corazones.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizResult {
    pub score: u32, // 0–100
    pub total_questions: usize,
    pub correct_answers: usize,
    pub time_spent_secs: u64,
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub hearts_left: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub out_of_hearts: bool,
}

/// Etapa actual del visor de lecciones.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Lesson,
    Summary,
    Quiz,
    Result,
}

impl Default for FlowStep {
    fn default() -> Self {
        FlowStep::Lesson
    }
}

/// Progreso persistido por lección. Invariante: `quiz_attempted == true`
/// implica que `score` y `passed` están presentes.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LessonProgress {
    #[serde(default)]
    pub viewed_lesson: bool,
    #[serde(default)]
    pub viewed_summary: bool,
    #[serde(default)]
    pub quiz_attempted: bool,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub last_step: FlowStep,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Sección cruda de contenido tal como la entrega el backend.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LessonSection {
    #[serde(default)]
    pub kind: String, // etiqueta declarada, puede venir vacía o inventada
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Lección completa: entrada de catálogo más su contenido.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub slug: String,
    pub title: String,
    pub number: usize, // orden declarado (1,2,3…), gobierna el soft lock
    #[serde(default)]
    pub sections: Vec<LessonSection>,
    #[serde(default)]
    pub markdown: Option<String>,
}

/// Entrada ligera de catálogo para calcular bloqueos sin cargar contenido.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LessonSummary {
    pub slug: String,
    pub title: String,
    pub number: usize,
}

impl Lesson {
    pub fn summary(&self) -> LessonSummary {
        LessonSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            number: self.number,
        }
    }
}
