//! Saneado de contenido y conversión de markdown ligero a marcado seguro.
//!
//! Invariante de seguridad: la salida nunca contiene `<script`, `<style` ni
//! atributos de evento. Solo sobreviven etiquetas de la lista blanca, en
//! forma canónica y sin atributos.

use once_cell::sync::Lazy;
use regex::Regex;

const ALLOWED_TAGS: &[&str] = &[
    "strong", "em", "b", "i", "u", "code", "pre", "p", "br", "ul", "ol", "li", "h1", "h2", "h3",
    "h4", "blockquote", "sub", "sup", "span",
];

// Una etiqueta en la posición actual: `<tag ...>`, `</tag>` o `<tag/>`.
static TAG_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^<(/?)([a-z][a-z0-9]*)(\s[^<>]*?)?/?>").expect("regex TAG_AT"));

static SCRIPT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</script[^>]*>").expect("regex SCRIPT_CLOSE"));
static STYLE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</style[^>]*>").expect("regex STYLE_CLOSE"));

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("regex INLINE_CODE"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("regex BOLD"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("regex ITALIC"));

static FIRST_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\*\*([^*\n]+)\*\*|<(?:strong|b)\b[^>]*>(.+?)</(?:strong|b)\s*>")
        .expect("regex FIRST_BOLD")
});

pub fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Recorre el fragmento carácter a carácter. Las etiquetas permitidas se
/// reescriben en forma canónica (minúsculas, sin atributos); `script` y
/// `style` se descartan junto con su contenido; todo lo demás se escapa.
pub fn sanitize_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let rest = &raw[i..];
        let ch = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };

        match ch {
            '<' => {
                if let Some(caps) = TAG_AT.captures(rest) {
                    let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("<");
                    let closing = caps.get(1).map(|m| !m.as_str().is_empty()).unwrap_or(false);
                    let name = caps
                        .get(2)
                        .map(|m| m.as_str().to_lowercase())
                        .unwrap_or_default();

                    if name == "script" || name == "style" {
                        i += skip_dropped_element(rest, &name, closing, whole.len());
                    } else if ALLOWED_TAGS.contains(&name.as_str()) {
                        if closing {
                            out.push_str(&format!("</{name}>"));
                        } else {
                            out.push_str(&format!("<{name}>"));
                        }
                        i += whole.len();
                    } else {
                        // Etiqueta desconocida: se escapa y su texto interior queda
                        out.push_str("&lt;");
                        i += 1;
                    }
                } else {
                    out.push_str("&lt;");
                    i += 1;
                }
            }
            '>' => {
                out.push_str("&gt;");
                i += 1;
            }
            '&' => {
                out.push_str("&amp;");
                i += 1;
            }
            _ => {
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    out
}

/// Bytes a saltar para un `<script>`/`<style>`: la etiqueta y, si es de
/// apertura, todo hasta su cierre incluido.
fn skip_dropped_element(rest: &str, name: &str, closing: bool, tag_len: usize) -> usize {
    if closing {
        return tag_len;
    }
    let close = if name == "script" { &SCRIPT_CLOSE } else { &STYLE_CLOSE };
    match close.find(&rest[tag_len..]) {
        Some(m) => tag_len + m.end(),
        // Sin cierre: se descarta el resto del fragmento
        None => rest.len(),
    }
}

/// Markdown ligero sobre texto ya saneado: negrita, cursiva y código inline.
pub fn markdown_inline(text: &str) -> String {
    let step1 = INLINE_CODE.replace_all(text, "<code>$1</code>");
    let step2 = BOLD.replace_all(&step1, "<strong>$1</strong>");
    ITALIC.replace_all(&step2, "<em>$1</em>").into_owned()
}

pub fn render_markup(raw: &str) -> String {
    markdown_inline(&sanitize_html(raw))
}

/// Primera cláusula en negrita del texto crudo, recortada para usarla como
/// destacado de la diapositiva.
pub fn extract_highlight(raw: &str) -> Option<String> {
    let caps = FIRST_BOLD.captures(raw)?;
    let clause = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim())?;
    if clause.is_empty() {
        return None;
    }
    let mut highlight: String = clause.chars().take(140).collect();
    if clause.chars().count() > 140 {
        highlight.push('…');
    }
    Some(highlight)
}
