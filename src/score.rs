//! Clasificación del rendimiento de un intento de quiz en bandas fijas.

use crate::model::QuizResult;

/// Banda de rendimiento derivada de la precisión (0–100). Misma precisión,
/// misma banda: la clasificación es una función pura.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceTier {
    pub name: &'static str,
    pub message: &'static str,
    pub tips: &'static [&'static str],
    pub multiplier: f64,
}

pub const PERFECT: PerformanceTier = PerformanceTier {
    name: "PERFECT",
    message: "🏆 ¡Puntuación perfecta! Dominas esta lección.",
    tips: &[
        "Pasa a la siguiente lección para seguir sumando XP.",
        "Explica el concepto a otra persona: es la mejor prueba de dominio.",
    ],
    multiplier: 2.0,
};

pub const EXCELLENT: PerformanceTier = PerformanceTier {
    name: "EXCELLENT",
    message: "🌟 ¡Excelente! Casi perfecto.",
    tips: &[
        "Revisa la explicación de la pregunta fallada antes de avanzar.",
        "Un repaso rápido del resumen fija los detalles que se escapan.",
    ],
    multiplier: 1.5,
};

pub const GREAT: PerformanceTier = PerformanceTier {
    name: "GREAT",
    message: "💪 ¡Muy bien! Tienes una base sólida.",
    tips: &[
        "Vuelve a las diapositivas de fórmulas: ahí suelen estar los fallos.",
        "Apunta los términos que dudaste y búscalos en el glosario.",
    ],
    multiplier: 1.2,
};

pub const GOOD: PerformanceTier = PerformanceTier {
    name: "GOOD",
    message: "👍 Buen trabajo, aprobado con margen.",
    tips: &[
        "Reintenta el quiz para subir tu multiplicador de XP.",
        "Relee los ejemplos: conectan la teoría con los cálculos.",
    ],
    multiplier: 1.0,
};

pub const KEEP_TRYING: PerformanceTier = PerformanceTier {
    name: "KEEP TRYING",
    message: "🔄 Vas por buen camino, pero aún se escapan conceptos.",
    tips: &[
        "Repasa la lección completa antes de reintentar.",
        "Usa las pistas: no restan puntos y orientan el razonamiento.",
        "Hazte un esquema propio de cada sección.",
    ],
    multiplier: 0.7,
};

pub const GETTING_THERE: PerformanceTier = PerformanceTier {
    name: "GETTING THERE",
    message: "🌱 Ya distingues las ideas principales. Falta asentarlas.",
    tips: &[
        "Vuelve a la lección y detente en cada diapositiva de concepto.",
        "Prueba a resolver los ejemplos en papel antes de mirar la solución.",
        "Reintenta el quiz mañana: el repaso espaciado funciona.",
    ],
    multiplier: 0.5,
};

pub const PRACTICE_MORE: PerformanceTier = PerformanceTier {
    name: "PRACTICE MORE",
    message: "📚 Esta lección todavía se resiste. ¡No pasa nada!",
    tips: &[
        "Repite la lección desde el principio sin prisa.",
        "Lee primero el resumen y después cada sección.",
        "Apóyate en las pistas de cada pregunta en el siguiente intento.",
    ],
    multiplier: 0.3,
};

/// Todas las bandas, de mejor a peor. Son disjuntas y cubren 0–100.
pub const TIERS: [PerformanceTier; 7] = [
    PERFECT,
    EXCELLENT,
    GREAT,
    GOOD,
    KEEP_TRYING,
    GETTING_THERE,
    PRACTICE_MORE,
];

/// Clasifica una precisión 0–100 en su banda. Valores fuera de rango se
/// recortan a 100.
pub fn classify(accuracy: u32) -> &'static PerformanceTier {
    let accuracy = accuracy.min(100);
    if accuracy == 100 {
        &PERFECT
    } else if accuracy >= 90 {
        &EXCELLENT
    } else if accuracy >= 80 {
        &GREAT
    } else if accuracy >= 70 {
        &GOOD
    } else if accuracy >= 60 {
        &KEEP_TRYING
    } else if accuracy >= 50 {
        &GETTING_THERE
    } else {
        &PRACTICE_MORE
    }
}

/// XP otorgado por un resultado: base por acierto, escalado por la banda.
pub fn xp_award(base_xp_per_correct: u32, result: &QuizResult) -> u32 {
    let tier = classify(result.score);
    let raw = f64::from(base_xp_per_correct) * result.correct_answers as f64 * tier.multiplier;
    raw.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuizResult;

    fn result_with(score: u32, correct: usize) -> QuizResult {
        QuizResult {
            score,
            total_questions: 5,
            correct_answers: correct,
            time_spent_secs: 30,
            answers: vec![],
            hearts_left: 5,
            best_streak: 0,
            out_of_hearts: false,
        }
    }

    #[test]
    fn perfect_solo_con_cien_exacto() {
        assert_eq!(classify(100).name, "PERFECT");
        assert_eq!(classify(100).multiplier, 2.0);
        assert_eq!(classify(99).name, "EXCELLENT");
    }

    #[test]
    fn banda_mas_baja_en_45() {
        let tier = classify(45);
        assert_eq!(tier.name, "PRACTICE MORE");
        assert_eq!(tier.multiplier, 0.3);
    }

    #[test]
    fn sesenta_cae_en_keep_trying() {
        assert_eq!(classify(60).name, "KEEP TRYING");
        assert_eq!(classify(69).name, "KEEP TRYING");
        assert_eq!(classify(70).name, "GOOD");
    }

    #[test]
    fn limites_de_banda() {
        assert_eq!(classify(90).name, "EXCELLENT");
        assert_eq!(classify(89).name, "GREAT");
        assert_eq!(classify(80).name, "GREAT");
        assert_eq!(classify(79).name, "GOOD");
        assert_eq!(classify(59).name, "GETTING THERE");
        assert_eq!(classify(50).name, "GETTING THERE");
        assert_eq!(classify(49).name, "PRACTICE MORE");
        assert_eq!(classify(0).name, "PRACTICE MORE");
    }

    #[test]
    fn clasificacion_es_determinista() {
        for acc in 0..=100 {
            assert_eq!(classify(acc).name, classify(acc).name);
        }
    }

    #[test]
    fn fuera_de_rango_se_recorta() {
        assert_eq!(classify(250).name, "PERFECT");
    }

    #[test]
    fn xp_usa_base_por_acierto_y_multiplicador() {
        // 10 XP base * 5 aciertos * 2.0 = 100
        assert_eq!(xp_award(10, &result_with(100, 5)), 100);
        // 10 * 3 * 0.7 = 21
        assert_eq!(xp_award(10, &result_with(60, 3)), 21);
        // 10 * 2 * 0.3 = 6
        assert_eq!(xp_award(10, &result_with(40, 2)), 6);
    }

    #[test]
    fn toda_banda_tiene_mensaje_y_consejos() {
        for tier in TIERS {
            assert!(!tier.message.is_empty());
            assert!(!tier.tips.is_empty());
        }
    }
}
