//! Corrección de respuestas por tipo de pregunta.

use crate::model::{Answer, QuestionKind, QuizQuestion};

/// Normalización para respuestas de texto: sin mayúsculas, sin espacios en
/// los extremos y con el espaciado interior colapsado.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// ¿La pregunta tiene con qué responderse? Una mcq sin al menos dos
/// opciones no se puede plantear y debe saltarse, no abortar el quiz.
pub fn has_usable_choices(question: &QuizQuestion) -> bool {
    match question.kind {
        QuestionKind::Mcq => question.choices.len() >= 2,
        QuestionKind::Match => question
            .correct
            .as_pairs()
            .map(|p| !p.is_empty())
            .unwrap_or(false),
        QuestionKind::Tf | QuestionKind::Fill => true,
    }
}

pub fn check_answer(question: &QuizQuestion, answer: &Answer) -> bool {
    match question.kind {
        QuestionKind::Mcq => check_mcq(question, answer),
        QuestionKind::Tf => check_tf(question, answer),
        QuestionKind::Fill => check_fill(question, answer),
        QuestionKind::Match => check_match(question, answer),
    }
}

/// Igualdad estructural de índices de opción.
fn check_mcq(question: &QuizQuestion, answer: &Answer) -> bool {
    match (question.correct.as_choice(), answer.as_choice()) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    }
}

fn check_tf(question: &QuizQuestion, answer: &Answer) -> bool {
    match (question.correct.as_bool(), answer.as_bool()) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    }
}

/// Texto: comparación sin mayúsculas ni espacios sobrantes.
fn check_fill(question: &QuizQuestion, answer: &Answer) -> bool {
    match (question.correct.as_text(), answer.as_text()) {
        (Some(expected), Some(given)) => normalize_text(expected) == normalize_text(given),
        _ => false,
    }
}

/// Emparejamiento: igualdad pareja a pareja contra el mapeo canónico, sin
/// importar el orden en que se enviaron.
fn check_match(question: &QuizQuestion, answer: &Answer) -> bool {
    let (expected, given) = match (question.correct.as_pairs(), answer.as_pairs()) {
        (Some(e), Some(g)) => (e, g),
        _ => return false,
    };
    if expected.len() != given.len() {
        return false;
    }

    expected.iter().all(|(left, right)| {
        given
            .iter()
            .any(|(l, r)| normalize_text(l) == normalize_text(left) && normalize_text(r) == normalize_text(right))
    })
}
