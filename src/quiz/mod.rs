//! Motor de quiz: corrige respuestas, lleva el presupuesto de corazones y
//! las rachas, y produce el `QuizResult` final del intento.

pub mod check;
pub mod normalize;

use std::time::Instant;

use log::warn;

use crate::model::{Answer, AnswerRecord, QuizQuestion, QuizResult};

#[derive(Debug, Clone, Copy)]
pub struct QuizConfig {
    pub hearts: u32,
    pub allow_retry: bool,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self { hearts: 5, allow_retry: true }
    }
}

/// Máquina de estados por pregunta: sin responder → respondida → avanzada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unanswered,
    Answered { correct: bool },
    Advanced,
}

/// Lo que devuelve cada envío de respuesta.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub hearts_left: u32,
    pub finished: bool,
    pub explanation: Option<String>,
}

pub struct QuizEngine {
    questions: Vec<QuizQuestion>,
    config: QuizConfig,
    current: usize,
    hearts: u32,
    correct_count: usize,
    streak: u32,
    best_streak: u32,
    answers: Vec<AnswerRecord>,
    states: Vec<QuestionState>,
    started: Instant,
    finished: bool,
}

impl QuizEngine {
    /// Las preguntas sin opciones utilizables se saltan al construir: el
    /// quiz continúa con las demás en vez de fallar.
    pub fn new(questions: Vec<QuizQuestion>, config: QuizConfig) -> Self {
        let questions: Vec<QuizQuestion> = questions
            .into_iter()
            .filter(|q| {
                let usable = check::has_usable_choices(q);
                if !usable {
                    warn!("pregunta {} saltada: sin opciones utilizables", q.id);
                }
                usable
            })
            .collect();

        let states = vec![QuestionState::Unanswered; questions.len()];
        Self {
            hearts: config.hearts,
            finished: questions.is_empty(),
            current: 0,
            correct_count: 0,
            streak: 0,
            best_streak: 0,
            answers: Vec::new(),
            started: Instant::now(),
            questions,
            config,
            states,
        }
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn is_complete(&self) -> bool {
        self.finished
    }

    pub fn out_of_hearts(&self) -> bool {
        self.hearts == 0
    }

    pub fn allow_retry(&self) -> bool {
        self.config.allow_retry
    }

    /// Corrige y registra la respuesta a la pregunta actual. Devuelve `None`
    /// si el intento ya terminó o la pregunta actual ya estaba respondida.
    pub fn submit_answer(&mut self, answer: Answer) -> Option<SubmitOutcome> {
        if self.finished {
            return None;
        }
        if !matches!(self.states.get(self.current), Some(QuestionState::Unanswered)) {
            return None;
        }

        let question = self.questions.get(self.current)?.clone();
        let correct = check::check_answer(&question, &answer);

        self.answers.push(AnswerRecord {
            question_id: question.id.clone(),
            user_answer: answer,
            correct_answer: question.correct.clone(),
            is_correct: correct,
        });
        self.states[self.current] = QuestionState::Answered { correct };

        if correct {
            self.correct_count += 1;
            self.streak += 1;
            if self.streak > self.best_streak {
                self.best_streak = self.streak;
            }
        } else {
            // exactamente un corazón por fallo, con suelo en cero
            self.hearts = self.hearts.saturating_sub(1);
            self.streak = 0;
        }

        if self.hearts == 0 || self.answers.len() == self.questions.len() {
            self.finished = true;
        }

        Some(SubmitOutcome {
            correct,
            hearts_left: self.hearts,
            finished: self.finished,
            explanation: (!correct && !question.explanation.is_empty())
                .then(|| question.explanation.clone()),
        })
    }

    /// Pasa de respondida a avanzada y coloca el cursor en la siguiente.
    pub fn advance(&mut self) -> bool {
        match self.states.get(self.current) {
            Some(QuestionState::Answered { .. }) => {
                self.states[self.current] = QuestionState::Advanced;
                if !self.finished && self.current + 1 < self.questions.len() {
                    self.current += 1;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Resultado del intento, disponible solo cuando terminó: bien por
    /// responder la última pregunta, bien por agotar los corazones. En el
    /// segundo caso solo cuentan las preguntas intentadas.
    pub fn evaluate_completion(&self) -> Option<QuizResult> {
        if !self.finished {
            return None;
        }

        let total = self.answers.len();
        let score = if total == 0 {
            0
        } else {
            (100.0 * self.correct_count as f64 / total as f64).round() as u32
        };

        Some(QuizResult {
            score,
            total_questions: total,
            correct_answers: self.correct_count,
            time_spent_secs: self.started.elapsed().as_secs(),
            answers: self.answers.clone(),
            hearts_left: self.hearts,
            best_streak: self.best_streak,
            out_of_hearts: self.hearts == 0,
        })
    }

    /// Reinicio completo para el reintento: corazones, contadores, registro
    /// de respuestas y cursor vuelven al estado inicial.
    pub fn reset(&mut self) {
        self.hearts = self.config.hearts;
        self.current = 0;
        self.correct_count = 0;
        self.streak = 0;
        self.best_streak = 0;
        self.answers.clear();
        self.states = vec![QuestionState::Unanswered; self.questions.len()];
        self.started = Instant::now();
        self.finished = self.questions.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn tf_questions(n: usize) -> Vec<QuizQuestion> {
        (0..n)
            .map(|i| QuizQuestion {
                id: format!("q{}", i + 1),
                kind: QuestionKind::Tf,
                stem: format!("afirmación {}", i + 1),
                choices: vec![],
                correct: Answer::Boolean(true),
                explanation: "porque sí".into(),
                hint: None,
                difficulty: None,
            })
            .collect()
    }

    fn run_sequence(engine: &mut QuizEngine, answers: &[bool]) {
        for &value in answers {
            if engine.is_complete() {
                break;
            }
            engine.submit_answer(Answer::Boolean(value));
            engine.advance();
        }
    }

    #[test]
    fn escenario_a_todo_correcto() {
        let mut engine = QuizEngine::new(tf_questions(5), QuizConfig::default());
        run_sequence(&mut engine, &[true; 5]);

        let result = engine.evaluate_completion().expect("intento terminado");
        assert_eq!(result.score, 100);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.correct_answers, 5);
        assert_eq!(result.hearts_left, 5, "sin fallos no se pierden corazones");
        assert_eq!(result.best_streak, 5);
        assert!(!result.out_of_hearts);
    }

    #[test]
    fn escenario_b_tres_de_cinco() {
        let mut engine = QuizEngine::new(tf_questions(5), QuizConfig::default());
        run_sequence(&mut engine, &[true, false, true, false, true]);

        let result = engine.evaluate_completion().expect("intento terminado");
        assert_eq!(result.score, 60);
        assert_eq!(result.hearts_left, 3);
        assert_eq!(result.correct_answers, 3);
        assert!(!result.out_of_hearts);
    }

    #[test]
    fn escenario_c_corazones_agotados() {
        let config = QuizConfig { hearts: 2, allow_retry: true };
        let mut engine = QuizEngine::new(tf_questions(5), config);
        run_sequence(&mut engine, &[false, false]);

        assert!(engine.is_complete());
        assert!(engine.out_of_hearts());

        let result = engine.evaluate_completion().expect("terminal por corazones");
        assert_eq!(result.total_questions, 2, "solo cuentan las intentadas");
        assert_eq!(result.hearts_left, 0);
        assert_eq!(result.score, 0);
        assert!(result.out_of_hearts);

        // el reintento devuelve todo al estado inicial
        engine.reset();
        assert!(!engine.is_complete());
        assert_eq!(engine.hearts(), 2);
        assert_eq!(engine.current_index(), 0);
        assert!(engine.answers().is_empty());
    }

    #[test]
    fn los_corazones_nunca_son_negativos() {
        let config = QuizConfig { hearts: 2, allow_retry: true };
        let mut engine = QuizEngine::new(tf_questions(10), config);
        run_sequence(&mut engine, &[false; 10]);
        assert_eq!(engine.hearts(), 0);
    }

    #[test]
    fn puntuacion_reproducible_bajo_repeticion() {
        let sequence = [true, false, true, true, false];
        let mut scores = Vec::new();
        for _ in 0..3 {
            let mut engine = QuizEngine::new(tf_questions(5), QuizConfig::default());
            run_sequence(&mut engine, &sequence);
            scores.push(engine.evaluate_completion().expect("terminado").score);
        }
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(scores[0], 60);
    }

    #[test]
    fn aciertos_mas_fallos_igual_total() {
        let mut engine = QuizEngine::new(tf_questions(5), QuizConfig::default());
        run_sequence(&mut engine, &[true, false, false, true, true]);
        let result = engine.evaluate_completion().expect("terminado");
        let incorrect = result.answers.iter().filter(|a| !a.is_correct).count();
        assert_eq!(result.correct_answers + incorrect, result.total_questions);
    }

    #[test]
    fn racha_se_corta_con_el_fallo() {
        let mut engine = QuizEngine::new(tf_questions(5), QuizConfig::default());
        engine.submit_answer(Answer::Boolean(true));
        engine.advance();
        engine.submit_answer(Answer::Boolean(true));
        engine.advance();
        assert_eq!(engine.streak(), 2);
        engine.submit_answer(Answer::Boolean(false));
        engine.advance();
        assert_eq!(engine.streak(), 0);
        assert_eq!(engine.best_streak(), 2, "el máximo histórico se conserva");
    }

    #[test]
    fn doble_envio_a_la_misma_pregunta_se_ignora() {
        let mut engine = QuizEngine::new(tf_questions(3), QuizConfig::default());
        assert!(engine.submit_answer(Answer::Boolean(true)).is_some());
        assert!(engine.submit_answer(Answer::Boolean(false)).is_none());
        assert_eq!(engine.answers().len(), 1);
        assert_eq!(engine.hearts(), 5);
    }

    #[test]
    fn pregunta_sin_opciones_se_salta_al_construir() {
        let mut questions = tf_questions(2);
        questions.push(QuizQuestion {
            id: "rota".into(),
            kind: QuestionKind::Mcq,
            stem: "sin opciones".into(),
            choices: vec![],
            correct: Answer::Choice(0),
            explanation: String::new(),
            hint: None,
            difficulty: None,
        });
        let engine = QuizEngine::new(questions, QuizConfig::default());
        assert_eq!(engine.question_count(), 2);
    }

    #[test]
    fn sin_preguntas_el_intento_nace_terminado() {
        let engine = QuizEngine::new(vec![], QuizConfig::default());
        assert!(engine.is_complete());
        let result = engine.evaluate_completion().expect("resultado vacío");
        assert_eq!(result.score, 0);
        assert_eq!(result.total_questions, 0);
    }

    #[test]
    fn fallo_devuelve_explicacion() {
        let mut engine = QuizEngine::new(tf_questions(1), QuizConfig::default());
        let outcome = engine.submit_answer(Answer::Boolean(false)).expect("envío");
        assert!(!outcome.correct);
        assert_eq!(outcome.explanation.as_deref(), Some("porque sí"));
    }
}
