//! Detección de matemáticas embebidas (`$…$`, `$$…$$`, `\(...\)`, `\[...\]`).
//!
//! Los fragmentos TeX se extraen antes de sanear el resto del texto y se
//! reinsertan envueltos en marcadores para el renderizador. Nunca se evalúa
//! ni ejecuta nada de lo que venga dentro de los delimitadores.

use once_cell::sync::Lazy;
use regex::Regex;

use super::sanitize::escape_text;

// Centinela de uso privado: no puede aparecer en texto normal y el
// saneador lo deja pasar intacto.
const MARK: char = '\u{e000}';

static BLOCK_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$|\\\[(.+?)\\\]").expect("regex BLOCK_MATH"));

static INLINE_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^$\n]+?)\$|\\\((.+?)\\\)").expect("regex INLINE_MATH"));

static TEX_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(frac|sqrt|sum|prod|int|bar|hat|sigma|mu|pi|alpha|beta|lambda|cdot|times|le|ge|ne|approx|overline)\b")
        .expect("regex TEX_COMMAND")
});

#[derive(Debug, Clone)]
pub struct MathSegment {
    pub block: bool,
    pub tex: String,
}

/// Sustituye cada fragmento matemático por un centinela y devuelve el texto
/// junto con los fragmentos extraídos, en orden.
pub fn extract(raw: &str) -> (String, Vec<MathSegment>) {
    let mut segments = Vec::new();

    let step1 = BLOCK_MATH.replace_all(raw, |caps: &regex::Captures| {
        let tex = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        segments.push(MathSegment { block: true, tex });
        format!("{MARK}{}{MARK}", segments.len() - 1)
    });

    let step2 = INLINE_MATH.replace_all(&step1, |caps: &regex::Captures| {
        let tex = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        segments.push(MathSegment { block: false, tex });
        format!("{MARK}{}{MARK}", segments.len() - 1)
    });

    (step2.into_owned(), segments)
}

/// Reinserta los fragmentos extraídos, ya envueltos en sus marcadores y con
/// el TeX escapado.
pub fn restore(text: &str, segments: &[MathSegment]) -> String {
    let mut out = text.to_string();
    for (i, seg) in segments.iter().enumerate() {
        let sentinel = format!("{MARK}{i}{MARK}");
        let wrapped = if seg.block {
            format!("<div data-math=\"block\">{}</div>", escape_text(&seg.tex))
        } else {
            format!("<span data-math=\"inline\">{}</span>", escape_text(&seg.tex))
        };
        out = out.replace(&sentinel, &wrapped);
    }
    out
}

/// Heurística de "sección cargada de matemáticas" para clasificar fórmulas.
pub fn is_math_heavy(raw: &str) -> bool {
    let (_, segments) = extract(raw);
    if segments.iter().any(|s| s.block) {
        return true;
    }
    let symbol_hits = raw
        .chars()
        .filter(|c| matches!(c, 'σ' | 'μ' | 'Σ' | '√' | '≈' | '≤' | '≥' | '±' | '∑' | 'π'))
        .count();
    segments.len() + symbol_hits + TEX_COMMAND.find_iter(raw).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrae_y_restaura_inline() {
        let (text, segs) = extract("La media es $\\bar{x} = 5$ aquí.");
        assert_eq!(segs.len(), 1);
        assert!(!text.contains('$'));
        let out = restore(&text, &segs);
        assert!(out.contains("<span data-math=\"inline\">"));
        assert!(out.contains("\\bar{x} = 5"));
    }

    #[test]
    fn bloques_van_en_div() {
        let (text, segs) = extract("$$\\sum_{i=1}^n x_i$$");
        let out = restore(&text, &segs);
        assert!(out.contains("<div data-math=\"block\">"));
    }

    #[test]
    fn tex_con_html_queda_escapado() {
        let (text, segs) = extract("$a < b$");
        let out = restore(&text, &segs);
        assert!(out.contains("a &lt; b"));
        assert!(!out.contains("a < b"));
    }

    #[test]
    fn delimitadores_latex_alternativos() {
        let (_, segs) = extract("inline \\(x^2\\) y bloque \\[e = mc^2\\]");
        assert_eq!(segs.len(), 2);
        assert!(segs.iter().any(|s| s.block));
        assert!(segs.iter().any(|s| !s.block));
    }

    #[test]
    fn densidad_matematica() {
        assert!(is_math_heavy("$$\\frac{a}{b}$$"));
        assert!(is_math_heavy("la varianza σ² y la media μ"));
        assert!(!is_math_heavy("texto plano sin nada especial"));
        assert!(!is_math_heavy("un solo $x$ no basta"));
    }

    #[test]
    fn sin_matematicas_no_toca_el_texto() {
        let raw = "párrafo normal, sin delimitadores";
        let (text, segs) = extract(raw);
        assert!(segs.is_empty());
        assert_eq!(text, raw);
    }
}
