use super::error::CompressError;

/// Shrinks a document of a given media type without changing its meaning.
pub trait Minifier: Send + Sync {
    /// Minify `src`, which has media type `media_type` (parameters allowed).
    ///
    /// # Errors
    ///
    /// [`CompressError::UnsupportedMediaType`] when there is no routine for
    /// the type, [`CompressError::Minify`] when the input is rejected.
    fn minify(&self, media_type: &str, src: &[u8]) -> Result<Vec<u8>, CompressError>;
}

/// Minifier covering HTML, CSS, JavaScript, JSON, XML and SVG.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMinifier;

/// Media type without parameters, lowercased: `Text/HTML; charset=utf-8` → `text/html`.
#[must_use]
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl Minifier for DefaultMinifier {
    fn minify(&self, media_type: &str, src: &[u8]) -> Result<Vec<u8>, CompressError> {
        let essence = essence(media_type);
        match essence.as_str() {
            "text/html" => {
                let cfg = minify_html::Cfg {
                    minify_css: true,
                    minify_js: true,
                    ..minify_html::Cfg::default()
                };
                Ok(minify_html::minify(src, &cfg))
            }
            "text/css" => {
                let text = utf8(&essence, src)?;
                minifier::css::minify(text)
                    .map(|m| m.to_string().into_bytes())
                    .map_err(|message| CompressError::Minify {
                        media_type: essence.clone(),
                        message: message.to_string(),
                    })
            }
            "application/javascript" | "text/javascript" => {
                let text = utf8(&essence, src)?;
                Ok(minifier::js::minify(text).to_string().into_bytes())
            }
            "application/json" | "application/ld+json" => {
                let text = utf8(&essence, src)?;
                Ok(minifier::json::minify(text).to_string().into_bytes())
            }
            "text/xml" | "application/xml" | "image/svg+xml" => {
                let text = utf8(&essence, src)?;
                Ok(minify_markup(text).into_bytes())
            }
            _ => Err(CompressError::UnsupportedMediaType {
                media_type: essence,
            }),
        }
    }
}

fn utf8<'a>(media_type: &str, src: &'a [u8]) -> Result<&'a str, CompressError> {
    std::str::from_utf8(src).map_err(|err| CompressError::Minify {
        media_type: media_type.to_string(),
        message: err.to_string(),
    })
}

/// Drop whitespace-only runs between tags and around the document.
///
/// Text nodes that contain anything besides whitespace are kept verbatim.
fn minify_markup(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut pending = String::new();
    let mut in_tag = false;
    for c in src.trim().chars() {
        match c {
            '<' => {
                let whitespace_only = pending.chars().all(char::is_whitespace);
                if !whitespace_only || !out.ends_with('>') {
                    out.push_str(&pending);
                }
                pending.clear();
                in_tag = true;
                out.push(c);
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(c);
            }
            _ if in_tag => out.push(c),
            _ => pending.push(c),
        }
    }
    out.push_str(&pending);
    out
}
