//! Progreso persistido por lección y reglas de avance.
//!
//! El almacenamiento es una superficie clave-valor inyectada: en memoria
//! para tests y un fichero JSON para el uso normal. La persistencia es de
//! mejor esfuerzo: un registro corrupto o ausente se lee como progreso
//! vacío y nunca bloquea la navegación.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::warn;
use thiserror::Error;

use crate::model::{FlowStep, LessonProgress, LessonSummary, QuizResult};

/// Prefijo fijo de clave: permite enumerar y vaciar todos los registros de
/// una sesión de golpe.
pub const STORE_PREFIX: &str = "lesson_progress:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("error de E/S del almacén: {0}")]
    Io(#[from] std::io::Error),
    #[error("registro de progreso ilegible: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Superficie clave-valor mínima sobre la que trabaja el tracker.
pub trait ProgressBackend {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Vec<String>;
}

/// Backend en memoria, el doble de pruebas.
#[derive(Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressBackend for MemoryBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Backend sobre un único fichero JSON (mapa clave → registro serializado).
pub struct FileBackend {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileBackend {
    /// Abre (o crea) el almacén en la ruta por defecto de datos de usuario.
    pub fn open_default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self::open(base.join("stat_path").join("progress.json"))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!("almacén corrupto en {}: {err}; se parte de cero", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl ProgressBackend for FileBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        self.flush()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Parche de actualización: solo los campos presentes se aplican sobre el
/// registro existente (merge, nunca reemplazo).
#[derive(Debug, Default, Clone)]
pub struct ProgressPatch {
    pub viewed_lesson: Option<bool>,
    pub viewed_summary: Option<bool>,
    pub quiz_attempted: Option<bool>,
    pub score: Option<u32>,
    pub passed: Option<bool>,
    pub last_step: Option<FlowStep>,
}

/// API de progreso por lección sobre un backend inyectado.
pub struct ProgressTracker {
    backend: Box<dyn ProgressBackend>,
}

impl ProgressTracker {
    pub fn new(backend: Box<dyn ProgressBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    fn key(slug: &str) -> String {
        format!("{STORE_PREFIX}{slug}")
    }

    /// Lee el progreso de una lección. Un registro ausente o corrupto se
    /// convierte en el progreso por defecto, nunca en un error.
    pub fn get(&self, slug: &str) -> LessonProgress {
        match self.backend.read(&Self::key(slug)) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(progress) => progress,
                Err(err) => {
                    warn!("progreso corrupto para {slug}: {err}; se usa el vacío");
                    LessonProgress::default()
                }
            },
            None => LessonProgress::default(),
        }
    }

    /// Aplica un parche y devuelve el registro resultante.
    pub fn set(&mut self, slug: &str, patch: ProgressPatch) -> LessonProgress {
        let mut progress = self.get(slug);

        if let Some(v) = patch.viewed_lesson {
            progress.viewed_lesson = v;
        }
        if let Some(v) = patch.viewed_summary {
            progress.viewed_summary = v;
        }
        if let Some(v) = patch.quiz_attempted {
            progress.quiz_attempted = v;
        }
        if let Some(v) = patch.score {
            progress.score = Some(v);
        }
        if let Some(v) = patch.passed {
            progress.passed = Some(v);
        }
        if let Some(v) = patch.last_step {
            progress.last_step = v;
        }

        self.persist(slug, &progress);
        progress
    }

    pub fn mark_lesson_viewed(&mut self, slug: &str) -> LessonProgress {
        self.set(
            slug,
            ProgressPatch {
                viewed_lesson: Some(true),
                last_step: Some(FlowStep::Summary),
                ..Default::default()
            },
        )
    }

    pub fn mark_summary_viewed(&mut self, slug: &str) -> LessonProgress {
        self.set(
            slug,
            ProgressPatch {
                viewed_summary: Some(true),
                last_step: Some(FlowStep::Quiz),
                ..Default::default()
            },
        )
    }

    /// Registra un intento de quiz. El veredicto de aprobado se decide aquí,
    /// en el momento del envío, con el umbral recibido; nunca se rederiva
    /// después a partir de la puntuación cruda.
    pub fn mark_quiz_attempted(
        &mut self,
        slug: &str,
        result: &QuizResult,
        pass_threshold_pct: u32,
    ) -> LessonProgress {
        let passed = result.score >= pass_threshold_pct;
        let mut progress = self.set(
            slug,
            ProgressPatch {
                quiz_attempted: Some(true),
                score: Some(result.score),
                passed: Some(passed),
                last_step: Some(FlowStep::Result),
                ..Default::default()
            },
        );

        if passed && progress.completed_at.is_none() {
            progress.completed_at = Some(Utc::now());
            self.persist(slug, &progress);
        }
        progress
    }

    /// Guardas de avance monótonas: un paso solo es alcanzable si todas las
    /// banderas de los pasos estrictamente anteriores están a true.
    pub fn can_advance_to_step(step: FlowStep, progress: &LessonProgress) -> bool {
        match step {
            FlowStep::Lesson => true,
            FlowStep::Summary => progress.viewed_lesson,
            FlowStep::Quiz => progress.viewed_lesson && progress.viewed_summary,
            FlowStep::Result => {
                progress.viewed_lesson && progress.viewed_summary && progress.quiz_attempted
            }
        }
    }

    /// El crédito de progresión (XP, desbloqueo de la siguiente) solo pide
    /// haber intentado el quiz; aprobar no es requisito.
    pub fn can_complete_lesson(progress: &LessonProgress) -> bool {
        progress.quiz_attempted
    }

    /// Soft lock: el contenido siempre es visible; una lección distinta de
    /// la primera queda bloqueada *para crédito* si la inmediatamente
    /// anterior en el orden declarado aún no completó su quiz.
    pub fn is_lesson_locked(&self, slug: &str, catalog: &[LessonSummary]) -> bool {
        let mut ordered: Vec<&LessonSummary> = catalog.iter().collect();
        ordered.sort_by_key(|l| l.number);

        let pos = match ordered.iter().position(|l| l.slug == slug) {
            Some(p) => p,
            None => return false, // fuera de catálogo: sin cadena que aplicar
        };
        if pos == 0 {
            return false;
        }

        let previous = ordered[pos - 1];
        !Self::can_complete_lesson(&self.get(&previous.slug))
    }

    /// Reinicio explícito de una sola lección.
    pub fn reset_lesson(&mut self, slug: &str) {
        if let Err(err) = self.backend.remove(&Self::key(slug)) {
            warn!("no se pudo reiniciar el progreso de {slug}: {err}");
        }
    }

    /// Vaciado total del espacio de claves propio.
    pub fn clear_all(&mut self) {
        for key in self.tracked_keys() {
            if let Err(err) = self.backend.remove(&key) {
                warn!("no se pudo borrar {key}: {err}");
            }
        }
    }

    /// Slugs con registro persistido.
    pub fn tracked_slugs(&self) -> Vec<String> {
        self.tracked_keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(STORE_PREFIX).map(str::to_string))
            .collect()
    }

    fn tracked_keys(&self) -> Vec<String> {
        self.backend
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(STORE_PREFIX))
            .collect()
    }

    fn persist(&mut self, slug: &str, progress: &LessonProgress) {
        match serde_json::to_string(progress) {
            Ok(raw) => {
                if let Err(err) = self.backend.write(&Self::key(slug), &raw) {
                    warn!("no se pudo guardar el progreso de {slug}: {err}");
                }
            }
            Err(err) => warn!("progreso de {slug} no serializable: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerRecord;

    fn result_with_score(score: u32) -> QuizResult {
        QuizResult {
            score,
            total_questions: 5,
            correct_answers: (score as usize) / 20,
            time_spent_secs: 40,
            answers: Vec::<AnswerRecord>::new(),
            hearts_left: 3,
            best_streak: 2,
            out_of_hearts: false,
        }
    }

    fn catalog() -> Vec<LessonSummary> {
        vec![
            LessonSummary { slug: "l1".into(), title: "Uno".into(), number: 1 },
            LessonSummary { slug: "l2".into(), title: "Dos".into(), number: 2 },
            LessonSummary { slug: "l3".into(), title: "Tres".into(), number: 3 },
        ]
    }

    #[test]
    fn lectura_sin_registro_da_progreso_vacio() {
        let tracker = ProgressTracker::in_memory();
        let p = tracker.get("l1");
        assert!(!p.viewed_lesson && !p.viewed_summary && !p.quiz_attempted);
        assert!(p.score.is_none() && p.passed.is_none());
    }

    #[test]
    fn registro_corrupto_no_bloquea() {
        let mut backend = MemoryBackend::new();
        backend
            .write("lesson_progress:l1", "{esto no es json")
            .unwrap();
        let tracker = ProgressTracker::new(Box::new(backend));
        let p = tracker.get("l1");
        assert!(!p.viewed_lesson);
    }

    #[test]
    fn set_es_merge_no_reemplazo() {
        let mut tracker = ProgressTracker::in_memory();
        tracker.mark_lesson_viewed("l1");
        tracker.set(
            "l1",
            ProgressPatch { viewed_summary: Some(true), ..Default::default() },
        );
        let p = tracker.get("l1");
        assert!(p.viewed_lesson, "el merge no debe pisar banderas previas");
        assert!(p.viewed_summary);
    }

    #[test]
    fn quiz_attempted_implica_score_y_passed() {
        let mut tracker = ProgressTracker::in_memory();
        let p = tracker.mark_quiz_attempted("l1", &result_with_score(80), 60);
        assert!(p.quiz_attempted);
        assert_eq!(p.score, Some(80));
        assert_eq!(p.passed, Some(true));
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn suspenso_no_marca_completed_at() {
        let mut tracker = ProgressTracker::in_memory();
        let p = tracker.mark_quiz_attempted("l1", &result_with_score(40), 60);
        assert_eq!(p.passed, Some(false));
        assert!(p.completed_at.is_none());
        // pero el intento cuenta como crédito de progresión
        assert!(ProgressTracker::can_complete_lesson(&p));
    }

    #[test]
    fn guardas_monotonas() {
        let empty = LessonProgress::default();
        assert!(ProgressTracker::can_advance_to_step(FlowStep::Lesson, &empty));
        assert!(!ProgressTracker::can_advance_to_step(FlowStep::Summary, &empty));
        assert!(!ProgressTracker::can_advance_to_step(FlowStep::Quiz, &empty));
        assert!(!ProgressTracker::can_advance_to_step(FlowStep::Result, &empty));

        // manipular una bandera posterior no abre pasos anteriores
        let tricked = LessonProgress { quiz_attempted: true, ..Default::default() };
        assert!(!ProgressTracker::can_advance_to_step(FlowStep::Quiz, &tricked));
        assert!(!ProgressTracker::can_advance_to_step(FlowStep::Result, &tricked));

        let full = LessonProgress {
            viewed_lesson: true,
            viewed_summary: true,
            quiz_attempted: true,
            ..Default::default()
        };
        assert!(ProgressTracker::can_advance_to_step(FlowStep::Result, &full));
    }

    #[test]
    fn soft_lock_sigue_el_orden_declarado() {
        let mut tracker = ProgressTracker::in_memory();
        let catalog = catalog();

        assert!(!tracker.is_lesson_locked("l1", &catalog), "la primera nunca se bloquea");
        assert!(tracker.is_lesson_locked("l2", &catalog));
        assert!(tracker.is_lesson_locked("l3", &catalog));

        tracker.mark_quiz_attempted("l1", &result_with_score(40), 60);
        assert!(!tracker.is_lesson_locked("l2", &catalog), "basta intentar el quiz, no aprobarlo");
        assert!(tracker.is_lesson_locked("l3", &catalog));
    }

    #[test]
    fn fuera_de_catalogo_no_se_bloquea() {
        let tracker = ProgressTracker::in_memory();
        assert!(!tracker.is_lesson_locked("desconocida", &catalog()));
    }

    #[test]
    fn reset_de_una_leccion_no_toca_las_demas() {
        let mut tracker = ProgressTracker::in_memory();
        tracker.mark_lesson_viewed("l1");
        tracker.mark_lesson_viewed("l2");
        tracker.reset_lesson("l1");
        assert!(!tracker.get("l1").viewed_lesson);
        assert!(tracker.get("l2").viewed_lesson);
    }

    #[test]
    fn clear_all_vacia_el_espacio_de_claves() {
        let mut tracker = ProgressTracker::in_memory();
        tracker.mark_lesson_viewed("l1");
        tracker.mark_lesson_viewed("l2");
        assert_eq!(tracker.tracked_slugs().len(), 2);
        tracker.clear_all();
        assert!(tracker.tracked_slugs().is_empty());
    }

    #[test]
    fn file_backend_sobrevive_reapertura() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");

        {
            let backend = FileBackend::open(&path);
            let mut tracker = ProgressTracker::new(Box::new(backend));
            tracker.mark_lesson_viewed("l1");
            tracker.mark_quiz_attempted("l1", &result_with_score(100), 60);
        }

        let tracker = ProgressTracker::new(Box::new(FileBackend::open(&path)));
        let p = tracker.get("l1");
        assert!(p.viewed_lesson);
        assert_eq!(p.score, Some(100));
    }

    #[test]
    fn file_backend_con_fichero_corrupto_parte_de_cero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "no es json").expect("write");

        let tracker = ProgressTracker::new(Box::new(FileBackend::open(&path)));
        assert!(!tracker.get("l1").viewed_lesson);
    }
}
