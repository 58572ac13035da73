//! Controlador del flujo de aprendizaje: lección → resumen → quiz →
//! resultado. Máquina de estados pura, sin ninguna dependencia de interfaz;
//! la shell (consola, web…) solo pinta lo que este módulo expone.

use log::{info, warn};

use crate::api::{ApiError, LessonService, SubmissionOutcome as BackendOutcome};
use crate::data;
use crate::model::{Answer, FlowStep, Lesson, LessonSummary, QuizResult, Slide, SlideKind};
use crate::progress::{ProgressPatch, ProgressTracker};
use crate::quiz::{QuizConfig, QuizEngine, SubmitOutcome};
use crate::score::{self, PerformanceTier};
use crate::slides;

#[derive(Debug, Clone, Copy)]
pub struct FlowConfig {
    pub hearts: u32,
    /// Umbral de aprobado en porcentaje. Única fuente de verdad: se aplica
    /// en el momento del envío y el veredicto queda persistido.
    pub pass_threshold_pct: u32,
    pub base_xp_per_correct: u32,
    pub allow_retry: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            hearts: 5,
            pass_threshold_pct: 60,
            base_xp_per_correct: 10,
            allow_retry: true,
        }
    }
}

pub struct FlowController {
    service: Box<dyn LessonService>,
    tracker: ProgressTracker,
    config: FlowConfig,
    catalog: Vec<LessonSummary>,
    lesson: Option<Lesson>,
    slides: Vec<Slide>,
    slide_index: usize,
    engine: Option<QuizEngine>,
    step: FlowStep,
    result: Option<QuizResult>,
    pending_submission: bool,
    notice: Option<String>,
    loading: bool,
}

impl FlowController {
    pub fn new(service: Box<dyn LessonService>, tracker: ProgressTracker, config: FlowConfig) -> Self {
        Self {
            service,
            tracker,
            config,
            catalog: data::offline_catalog(),
            lesson: None,
            slides: Vec::new(),
            slide_index: 0,
            engine: None,
            step: FlowStep::Lesson,
            result: None,
            pending_submission: false,
            notice: None,
            loading: false,
        }
    }

    /// Catálogo con el orden declarado de lecciones; gobierna el soft lock
    /// y el avance a la siguiente lección.
    pub fn set_catalog(&mut self, catalog: Vec<LessonSummary>) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &[LessonSummary] {
        &self.catalog
    }

    // -- apertura de lección ------------------------------------------------

    /// Abre una lección. El estado inicial es siempre `Lesson`, aunque el
    /// progreso guardado tenga banderas anteriores: repetir el recorrido es
    /// una decisión de producto, no un descuido.
    pub fn open_lesson(&mut self, slug: &str) {
        self.loading = true;
        self.notice = None;

        let lesson = match self.service.fetch_lesson(slug) {
            Ok(lesson) => lesson,
            Err(err) => {
                warn!("sin backend para {slug}: {err}; se usa la lección offline");
                self.notice = Some(
                    "⚠ Sin conexión con el backend. Se muestra la versión offline de la lección."
                        .to_string(),
                );
                data::offline_lesson(slug).unwrap_or(Lesson {
                    slug: slug.to_string(),
                    title: slug.replace(['-', '_'], " "),
                    number: 0,
                    sections: vec![],
                    markdown: None,
                })
            }
        };

        self.slides = slides::generate_slides(&lesson);
        self.lesson = Some(lesson);
        self.slide_index = 0;
        self.engine = None;
        self.result = None;
        self.pending_submission = false;
        self.step = FlowStep::Lesson;
        self.tracker.set(
            slug,
            ProgressPatch { last_step: Some(FlowStep::Lesson), ..Default::default() },
        );
        self.loading = false;
    }

    pub fn lesson(&self) -> Option<&Lesson> {
        self.lesson.as_ref()
    }

    fn slug(&self) -> Option<String> {
        self.lesson.as_ref().map(|l| l.slug.clone())
    }

    // -- diapositivas -------------------------------------------------------

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.slide_index)
    }

    pub fn slide_index(&self) -> usize {
        self.slide_index
    }

    pub fn advance_slide(&mut self) -> bool {
        if self.slide_index + 1 < self.slides.len() {
            self.slide_index += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_slide(&mut self) -> bool {
        if self.slide_index > 0 {
            self.slide_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn on_last_slide(&self) -> bool {
        self.slide_index + 1 >= self.slides.len()
    }

    /// Señal de mazo completado: persiste `viewed_lesson` y pasa al resumen.
    pub fn finish_slides(&mut self) -> bool {
        if self.step != FlowStep::Lesson {
            return false;
        }
        let slug = match self.slug() {
            Some(s) => s,
            None => return false,
        };
        self.tracker.mark_lesson_viewed(&slug);
        self.step = FlowStep::Summary;
        true
    }

    /// Puntos del resumen: título y destacado de cada diapositiva de
    /// contenido.
    pub fn summary_points(&self) -> Vec<String> {
        self.slides
            .iter()
            .filter(|s| s.kind != SlideKind::Completion)
            .map(|s| match &s.highlight {
                Some(h) => format!("{}: {}", s.title, h),
                None => s.title.clone(),
            })
            .collect()
    }

    // -- quiz ---------------------------------------------------------------

    /// Acción explícita "hacer el quiz" desde el resumen.
    pub fn start_quiz(&mut self) -> bool {
        if self.step != FlowStep::Summary {
            return false;
        }
        let slug = match self.slug() {
            Some(s) => s,
            None => return false,
        };

        self.tracker.mark_summary_viewed(&slug);
        let progress = self.tracker.get(&slug);
        if !ProgressTracker::can_advance_to_step(FlowStep::Quiz, &progress) {
            return false;
        }

        self.loading = true;
        let questions = match self.service.fetch_questions(&slug) {
            Ok(questions) if !questions.is_empty() => questions,
            outcome => {
                if let Err(err) = outcome {
                    warn!("preguntas del backend no disponibles para {slug}: {err}");
                }
                let fallback = data::offline_questions(&slug);
                if !fallback.is_empty() {
                    self.notice = Some(
                        "⚠ Quiz del backend no disponible. Se usa el quiz offline.".to_string(),
                    );
                }
                fallback
            }
        };
        self.loading = false;

        if questions.is_empty() {
            self.notice =
                Some("⚠ Esta lección aún no tiene quiz. Inténtalo más tarde.".to_string());
            return false;
        }

        self.engine = Some(QuizEngine::new(
            questions,
            QuizConfig { hearts: self.config.hearts, allow_retry: self.config.allow_retry },
        ));
        self.step = FlowStep::Quiz;
        true
    }

    pub fn engine(&self) -> Option<&QuizEngine> {
        self.engine.as_ref()
    }

    /// Responde la pregunta actual. Si el envío cierra el intento (última
    /// pregunta o corazones a cero), el flujo pasa solo a `Result`.
    pub fn answer_current(&mut self, answer: Answer) -> Option<SubmitOutcome> {
        if self.step != FlowStep::Quiz {
            return None;
        }
        let outcome = self.engine.as_mut()?.submit_answer(answer)?;
        if outcome.finished {
            self.finalize_quiz();
        }
        Some(outcome)
    }

    pub fn advance_question(&mut self) -> bool {
        self.engine.as_mut().map(QuizEngine::advance).unwrap_or(false)
    }

    /// Cierre del intento: se envía el resultado al backend antes de
    /// mostrarlo; si el envío falla se muestra el resultado local y queda
    /// marcado para reintento. El registro de progreso se actualiza siempre.
    fn finalize_quiz(&mut self) {
        let (slug, result) = match (self.slug(), self.engine.as_ref().and_then(QuizEngine::evaluate_completion)) {
            (Some(slug), Some(result)) => (slug, result),
            _ => return,
        };

        self.loading = true;
        match self.service.submit_quiz(&slug, &result.answers) {
            Ok(BackendOutcome { score, passed, .. }) => {
                info!("envío aceptado para {slug}: score={score:.2} passed={passed}");
                self.pending_submission = false;
            }
            Err(ApiError::Offline) => {
                self.pending_submission = true;
            }
            Err(err) => {
                warn!("envío de quiz fallido para {slug}: {err}; se conserva el resultado local");
                self.notice = Some(
                    "⚠ No se pudo enviar el resultado. Se guardó localmente y se reintentará."
                        .to_string(),
                );
                self.pending_submission = true;
            }
        }

        self.tracker
            .mark_quiz_attempted(&slug, &result, self.config.pass_threshold_pct);

        if let Err(err) = self
            .service
            .post_completion(&slug, result.score, result.time_spent_secs)
        {
            info!("aviso de compleción no entregado para {slug}: {err}");
        }

        self.result = Some(result);
        self.step = FlowStep::Result;
        self.loading = false;
    }

    // -- resultado ----------------------------------------------------------

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn tier(&self) -> Option<&'static PerformanceTier> {
        self.result.as_ref().map(|r| score::classify(r.score))
    }

    pub fn xp_award(&self) -> Option<u32> {
        self.result
            .as_ref()
            .map(|r| score::xp_award(self.config.base_xp_per_correct, r))
    }

    pub fn pending_submission(&self) -> bool {
        self.pending_submission
    }

    /// Reintento completo: corazones, contadores y registro vuelven a la
    /// pregunta 1.
    pub fn retry_quiz(&mut self) -> bool {
        if self.step != FlowStep::Result || !self.config.allow_retry {
            return false;
        }
        match self.engine.as_mut() {
            Some(engine) => {
                engine.reset();
                self.result = None;
                self.pending_submission = false;
                self.step = FlowStep::Quiz;
                true
            }
            None => false,
        }
    }

    // -- navegación entre lecciones ----------------------------------------

    fn next_in_catalog(&self, slug: &str) -> Option<LessonSummary> {
        let mut ordered: Vec<&LessonSummary> = self.catalog.iter().collect();
        ordered.sort_by_key(|l| l.number);
        let pos = ordered.iter().position(|l| l.slug == slug)?;
        ordered.get(pos + 1).map(|l| (*l).clone())
    }

    /// Desde el resultado solo se avanza si la lección actual ya dio su
    /// crédito (quiz intentado) y existe una siguiente en el catálogo.
    pub fn can_advance_to_next_lesson(&self) -> bool {
        let slug = match self.slug() {
            Some(s) => s,
            None => return false,
        };
        ProgressTracker::can_complete_lesson(&self.tracker.get(&slug))
            && self.next_in_catalog(&slug).is_some()
    }

    pub fn avanzar_a_siguiente_leccion(&mut self) -> bool {
        if !self.can_advance_to_next_lesson() {
            return false;
        }
        let next = match self.slug().and_then(|s| self.next_in_catalog(&s)) {
            Some(n) => n,
            None => return false,
        };
        self.open_lesson(&next.slug);
        true
    }

    pub fn is_lesson_locked(&self, slug: &str) -> bool {
        self.tracker.is_lesson_locked(slug, &self.catalog)
    }

    /// Reinicio explícito del progreso de una sola lección.
    pub fn reiniciar_leccion(&mut self, slug: &str) {
        self.tracker.reset_lesson(slug);
    }

    /// Cerrar el visor: se descarta el estado en curso. No hay peticiones
    /// en vuelo que cancelar con el cliente bloqueante.
    pub fn close(&mut self) {
        self.lesson = None;
        self.slides.clear();
        self.slide_index = 0;
        self.engine = None;
        self.result = None;
        self.pending_submission = false;
        self.step = FlowStep::Lesson;
    }

    // -- lectura de estado --------------------------------------------------

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn progress_for(&self, slug: &str) -> crate::model::LessonProgress {
        self.tracker.get(slug)
    }

    /// Porcentaje fijo por etapa, solo para pintar una barra de avance.
    pub fn step_progress(step: FlowStep) -> u8 {
        match step {
            FlowStep::Lesson => 25,
            FlowStep::Summary => 50,
            FlowStep::Quiz => 75,
            FlowStep::Result => 100,
        }
    }
}
