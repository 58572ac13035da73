//! Normalización en la frontera: el backend entrega preguntas en una forma
//! laxa y con nombres de campo variables (`options`/`choices`,
//! `correct_answer`/`correctAnswer`…). Aquí todo se convierte al esquema
//! tipado; lo que no se pueda rescatar se descarta con aviso en vez de
//! romper el quiz.

use log::warn;
use serde_json::Value;

use crate::model::{Answer, QuestionKind, QuizQuestion};

pub fn normalize_questions(raw: &Value) -> Vec<QuizQuestion> {
    let items = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => raw
            .get("questions")
            .or_else(|| raw.get("items"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| match normalize_question(item, idx) {
            Some(q) => Some(q),
            None => {
                warn!("pregunta #{} descartada por forma irrecuperable", idx + 1);
                None
            }
        })
        .collect()
}

fn normalize_question(item: &Value, idx: usize) -> Option<QuizQuestion> {
    let stem = str_field(item, &["stem", "question", "prompt", "text"])?;
    if stem.trim().is_empty() {
        return None;
    }

    let mut choices = choices_from(item);
    let kind = kind_from(item, !choices.is_empty());

    if kind == QuestionKind::Mcq {
        // Garantía del contrato: toda mcq sale con al menos dos opciones
        while choices.len() < 2 {
            let letter = (b'A' + choices.len() as u8) as char;
            choices.push(format!("Opción {letter}"));
        }
    }

    let correct = correct_from(item, kind, &choices)?;

    if kind == QuestionKind::Mcq {
        let index = correct.as_choice()?;
        if index >= choices.len() {
            return None; // índice imposible, mejor descartar que adivinar
        }
    }

    Some(QuizQuestion {
        id: id_from(item, idx),
        kind,
        stem: stem.trim().to_string(),
        choices,
        correct,
        explanation: str_field(item, &["explanation", "rationale", "feedback"])
            .unwrap_or_default(),
        hint: str_field(item, &["hint", "clue"]),
        difficulty: difficulty_from(item),
    })
}

fn str_field(item: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        item.get(name).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

fn id_from(item: &Value, idx: usize) -> String {
    str_field(item, &["id", "question_id", "uuid"]).unwrap_or_else(|| format!("q{}", idx + 1))
}

fn kind_from(item: &Value, has_choices: bool) -> QuestionKind {
    let label = str_field(item, &["type", "question_type", "kind"])
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .replace('-', "_");

    match label.as_str() {
        "mcq" | "multiple_choice" | "choice" | "single_choice" => QuestionKind::Mcq,
        "tf" | "true_false" | "truefalse" | "boolean" => QuestionKind::Tf,
        "fill" | "fill_blank" | "fill_in_blank" | "text" | "short_answer" => QuestionKind::Fill,
        "match" | "matching" | "pairs" => QuestionKind::Match,
        _ if has_choices => QuestionKind::Mcq,
        _ => QuestionKind::Fill,
    }
}

fn choices_from(item: &Value) -> Vec<String> {
    let raw = ["choices", "options", "answers"]
        .iter()
        .find_map(|name| item.get(name).and_then(Value::as_array));

    let raw = match raw {
        Some(arr) => arr,
        None => return Vec::new(),
    };

    raw.iter()
        .filter_map(|choice| match choice {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(_) => choice
                .get("text")
                .or_else(|| choice.get("label"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn correct_from(item: &Value, kind: QuestionKind, choices: &[String]) -> Option<Answer> {
    let raw = ["correct_answer", "correctAnswer", "answer", "correct", "solution"]
        .iter()
        .find_map(|name| item.get(name))?;

    match kind {
        QuestionKind::Mcq => match raw {
            Value::Number(n) => n.as_u64().map(|i| Answer::Choice(i as usize)),
            Value::String(s) => {
                if let Ok(i) = s.trim().parse::<usize>() {
                    return Some(Answer::Choice(i));
                }
                // la respuesta viene como texto de la opción
                let target = s.trim().to_lowercase();
                choices
                    .iter()
                    .position(|c| c.to_lowercase() == target)
                    .map(Answer::Choice)
            }
            _ => None,
        },
        QuestionKind::Tf => match raw {
            Value::Bool(b) => Some(Answer::Boolean(*b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "verdadero" | "v" | "t" => Some(Answer::Boolean(true)),
                "false" | "falso" | "f" => Some(Answer::Boolean(false)),
                _ => None,
            },
            Value::Number(n) => n.as_u64().map(|i| Answer::Boolean(i != 0)),
            _ => None,
        },
        QuestionKind::Fill => match raw {
            Value::String(s) => Some(Answer::Text(s.clone())),
            Value::Number(n) => Some(Answer::Text(n.to_string())),
            _ => None,
        },
        QuestionKind::Match => pairs_from(raw).map(Answer::Pairs),
    }
}

fn pairs_from(raw: &Value) -> Option<Vec<(String, String)>> {
    match raw {
        // mapa {izquierda: derecha}
        Value::Object(map) => {
            let pairs: Vec<(String, String)> = map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
            (!pairs.is_empty()).then_some(pairs)
        }
        // lista de [izquierda, derecha] o de {left, right}
        Value::Array(items) => {
            let pairs: Vec<(String, String)> = items
                .iter()
                .filter_map(|entry| match entry {
                    Value::Array(pair) if pair.len() == 2 => {
                        Some((pair[0].as_str()?.to_string(), pair[1].as_str()?.to_string()))
                    }
                    Value::Object(_) => {
                        let left = entry.get("left").and_then(Value::as_str)?;
                        let right = entry.get("right").and_then(Value::as_str)?;
                        Some((left.to_string(), right.to_string()))
                    }
                    _ => None,
                })
                .collect();
            (!pairs.is_empty()).then_some(pairs)
        }
        _ => None,
    }
}

fn difficulty_from(item: &Value) -> Option<u8> {
    match item.get("difficulty") {
        Some(Value::Number(n)) => n.as_u64().map(|d| d.min(5) as u8),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "easy" | "fácil" | "facil" => Some(1),
            "medium" | "media" => Some(2),
            "hard" | "difícil" | "dificil" => Some(3),
            other => other.parse::<u8>().ok(),
        },
        _ => None,
    }
}
