//! Registro de mazos de diapositivas escritos a mano.
//!
//! Algunas lecciones llevan un mazo curado que sustituye por completo a la
//! generación automática. La búsqueda admite la clave exacta, una
//! coincidencia por sufijo de ruta y el slug pelado.

use std::collections::HashMap;

use log::error;
use once_cell::sync::Lazy;

use crate::model::Slide;

static DECKS: Lazy<HashMap<String, Vec<Slide>>> = Lazy::new(|| {
    let raw = include_str!("../data/slide_decks.yaml");
    match serde_yaml::from_str(raw) {
        Ok(decks) => decks,
        Err(err) => {
            error!("mazos embebidos ilegibles, registro vacío: {err}");
            HashMap::new()
        }
    }
});

/// Devuelve el mazo curado para un identificador de lección, si existe.
pub fn deck_for(lesson_id: &str) -> Option<Vec<Slide>> {
    // 1) clave exacta
    if let Some(deck) = DECKS.get(lesson_id) {
        return Some(deck.clone());
    }

    // 2) sufijo de ruta: "stats/m1/mean-median" encaja con "m1/mean-median"
    for (key, deck) in DECKS.iter() {
        if lesson_id.ends_with(&format!("/{key}")) || key.ends_with(&format!("/{lesson_id}")) {
            return Some(deck.clone());
        }
    }

    // 3) slug pelado (último segmento de la ruta)
    let slug = lesson_id.rsplit('/').next().unwrap_or(lesson_id);
    if slug != lesson_id {
        if let Some(deck) = DECKS.get(slug) {
            return Some(deck.clone());
        }
    }
    for (key, deck) in DECKS.iter() {
        if key.rsplit('/').next().unwrap_or(key) == slug {
            return Some(deck.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SlideKind;

    #[test]
    fn clave_exacta() {
        let deck = deck_for("mean-median-mode").expect("mazo curado presente");
        assert!(!deck.is_empty());
        assert_eq!(deck[0].kind, SlideKind::Intro);
        assert_eq!(deck.last().map(|s| s.kind), Some(SlideKind::Completion));
    }

    #[test]
    fn sufijo_de_ruta() {
        assert!(deck_for("stats/basics/mean-median-mode").is_some());
    }

    #[test]
    fn slug_pelado() {
        assert!(deck_for("cualquier/ruta/mean-median-mode").is_some());
    }

    #[test]
    fn desconocido_devuelve_none() {
        assert!(deck_for("no-existe").is_none());
    }
}
