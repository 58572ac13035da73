//! Pipeline de contenido: convierte una lección cruda (secciones del
//! backend o markdown libre) en una secuencia ordenada de diapositivas
//! tipadas y saneadas. Nunca falla: cualquier entrada, incluida una lección
//! vacía o malformada, produce al menos una diapositiva de introducción.

pub mod math;
pub mod registry;
pub mod sanitize;

use log::debug;

use crate::model::{Lesson, LessonSection, Slide, SlideKind};

/// Umbral de legibilidad: una sección más larga se parte por párrafos.
const MAX_SLIDE_CHARS: usize = 900;

pub fn generate_slides(lesson: &Lesson) -> Vec<Slide> {
    generate_from_parts(
        &lesson.slug,
        &lesson.title,
        &lesson.sections,
        lesson.markdown.as_deref(),
    )
}

/// Punto de entrada del pipeline.
///
/// 1) mazo curado del registro, si existe, tal cual;
/// 2) secciones del backend, o markdown libre troceado por encabezados;
/// 3) fallback: una sola intro con el título de la lección;
/// 4) siempre se añade exactamente una diapositiva terminal de cierre.
pub fn generate_from_parts(
    lesson_id: &str,
    fallback_title: &str,
    sections: &[LessonSection],
    markdown: Option<&str>,
) -> Vec<Slide> {
    if let Some(deck) = registry::deck_for(lesson_id) {
        debug!("lección {lesson_id}: mazo curado de {} diapositivas", deck.len());
        return deck;
    }

    let sections = if sections.is_empty() {
        markdown.map(sections_from_markdown).unwrap_or_default()
    } else {
        sections.to_vec()
    };

    let mut slides = Vec::new();

    for section in &sections {
        let title = if section.title.trim().is_empty() {
            fallback_title.to_string()
        } else {
            section.title.trim().to_string()
        };

        for chunk in split_long(&section.content) {
            if chunk.trim().is_empty() {
                continue;
            }
            let kind = classify(slides.len(), &section.kind, &title, &chunk);
            slides.push(build_slide(lesson_id, slides.len(), kind, &title, &chunk));
        }
    }

    if slides.is_empty() {
        slides.push(fallback_intro(lesson_id, fallback_title));
    }

    slides.push(completion_slide(lesson_id, fallback_title, slides.len()));
    slides
}

/// Trocea markdown libre en secciones por líneas de encabezado (`#`…`######`).
/// El preámbulo anterior al primer encabezado forma su propia sección.
fn sections_from_markdown(markdown: &str) -> Vec<LessonSection> {
    let mut sections = Vec::new();
    let mut title = String::new();
    let mut body = String::new();

    let flush = |title: &mut String, body: &mut String, out: &mut Vec<LessonSection>| {
        if !body.trim().is_empty() {
            out.push(LessonSection {
                kind: String::new(),
                title: std::mem::take(title),
                content: std::mem::take(body),
            });
        } else {
            title.clear();
            body.clear();
        }
    };

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) && trimmed.chars().nth(hashes) == Some(' ') {
            flush(&mut title, &mut body, &mut sections);
            title = trimmed[hashes + 1..].trim().to_string();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&mut title, &mut body, &mut sections);

    sections
}

/// Parte una sección larga por párrafos de forma que ningún trozo supere el
/// umbral. Un párrafo que por sí solo lo supere se parte por frases; si aun
/// así no cabe, se deja entero antes que perder contenido.
fn split_long(content: &str) -> Vec<String> {
    let content = content.trim();
    if content.chars().count() <= MAX_SLIDE_CHARS {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let pieces = if paragraph.chars().count() > MAX_SLIDE_CHARS {
            split_sentences(paragraph)
        } else {
            vec![paragraph.to_string()]
        };

        for piece in pieces {
            let projected = current.chars().count() + piece.chars().count() + 2;
            if !current.is_empty() && projected > MAX_SLIDE_CHARS {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(content.to_string());
    }
    chunks
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in paragraph.split_inclusive(". ") {
        if !current.is_empty()
            && current.chars().count() + sentence.chars().count() > MAX_SLIDE_CHARS
        {
            pieces.push(std::mem::take(&mut current));
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Clasificación por heurísticas ordenadas; gana la primera regla que
/// encaja y los empates caen en `Concept`.
fn classify(index: usize, declared: &str, title: &str, content: &str) -> SlideKind {
    if index == 0 {
        return SlideKind::Intro;
    }

    if let Some(kind) = parse_declared_kind(declared) {
        return kind;
    }

    let haystack = format!("{} {}", title.to_lowercase(), content.to_lowercase());

    const EXAMPLE: &[&str] = &["ejemplo", "example", "e.g.", "p. ej", "por ejemplo"];
    const TIP: &[&str] = &[
        "takeaway", "remember", "tip", "recuerda", "consejo", "idea clave", "ojo:",
    ];
    const PRACTICE: &[&str] = &[
        "practice", "práctica", "practica", "ejercicio", "try it", "inténtalo", "tu turno",
    ];

    if EXAMPLE.iter().any(|kw| haystack.contains(kw)) {
        SlideKind::Example
    } else if TIP.iter().any(|kw| haystack.contains(kw)) {
        SlideKind::Tip
    } else if PRACTICE.iter().any(|kw| haystack.contains(kw)) {
        SlideKind::Practice
    } else if math::is_math_heavy(content) {
        SlideKind::Formula
    } else {
        SlideKind::Concept
    }
}

/// Etiqueta declarada por el backend, si corresponde a un tipo conocido.
/// Las etiquetas inventadas se ignoran y deciden las heurísticas.
fn parse_declared_kind(declared: &str) -> Option<SlideKind> {
    match declared.trim().to_lowercase().as_str() {
        "intro" | "introduction" => Some(SlideKind::Intro),
        "concept" => Some(SlideKind::Concept),
        "example" => Some(SlideKind::Example),
        "practice" | "exercise" => Some(SlideKind::Practice),
        "tip" | "takeaway" => Some(SlideKind::Tip),
        "formula" | "math" => Some(SlideKind::Formula),
        _ => None,
    }
}

fn build_slide(lesson_id: &str, index: usize, kind: SlideKind, title: &str, raw: &str) -> Slide {
    // Las matemáticas salen antes del saneado y vuelven ya envueltas
    let (text, segments) = math::extract(raw);
    let mut content = math::restore(&sanitize::render_markup(&text), &segments);

    if content.trim().is_empty() {
        // Fragmento imposible: degrada a texto plano en vez de abortar
        content = sanitize::escape_text(raw.trim());
    }
    if content.trim().is_empty() {
        content = sanitize::escape_text(title);
    }

    Slide {
        id: format!("{lesson_id}-s{index}"),
        kind,
        title: title.to_string(),
        content,
        visual: None,
        highlight: sanitize::extract_highlight(raw),
    }
}

fn fallback_intro(lesson_id: &str, title: &str) -> Slide {
    Slide {
        id: format!("{lesson_id}-s0"),
        kind: SlideKind::Intro,
        title: title.to_string(),
        content: format!(
            "<p>Bienvenido a <strong>{}</strong>. El contenido detallado no está disponible ahora mismo, pero puedes seguir con el resumen y el quiz.</p>",
            sanitize::escape_text(title)
        ),
        visual: None,
        highlight: None,
    }
}

fn completion_slide(lesson_id: &str, title: &str, index: usize) -> Slide {
    Slide {
        id: format!("{lesson_id}-s{index}"),
        kind: SlideKind::Completion,
        title: "¡Lección completada!".to_string(),
        content: format!(
            "<p>Has terminado <strong>{}</strong>. 🎉 Repasa el resumen y demuestra lo aprendido en el quiz.</p>",
            sanitize::escape_text(title)
        ),
        visual: None,
        highlight: None,
    }
}
