//! # Reescrita de Texto em Fragmentos HTML
//!
//! O conteúdo dos artigos chega como HTML. Para inserir links sem corromper a
//! estrutura, percorremos o fragmento separando tags de trechos de texto e só
//! entregamos ao callback o texto que está fora de elementos excluídos
//! (links existentes, título, código).
//!
//! Não é um parser HTML completo: basta para fragmentos bem formados gerados
//! a partir de Markdown. Tags, atributos e comentários são copiados sem
//! alteração.

use serde::Serialize;

/// Elementos que nunca abrem escopo (não têm tag de fechamento).
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Quais elementos têm o texto interno protegido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupPolicy {
    /// Nomes de tag (minúsculos).
    pub excluded_tags: Vec<String>,
    /// Classes CSS; qualquer elemento com uma delas é protegido.
    pub excluded_classes: Vec<String>,
}

impl Default for MarkupPolicy {
    fn default() -> Self {
        Self {
            excluded_tags: ["a", "h1", "code", "pre", "script", "style"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_classes: ["wiki-link", "article-title", "toc-item"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MarkupPolicy {
    fn excludes(&self, name: &str, tag: &str) -> bool {
        if self.excluded_tags.iter().any(|t| t == name) {
            return true;
        }
        class_list(tag)
            .iter()
            .any(|class| self.excluded_classes.iter().any(|c| c == class))
    }
}

/// Elemento aberto na pilha durante a varredura.
struct OpenElement {
    name: String,
    excluded: bool,
}

/// Aplica `f` a cada trecho de texto fora de elementos excluídos.
///
/// Com `f` identidade, a saída é igual à entrada.
pub fn rewrite_text_runs<F>(html: &str, policy: &MarkupPolicy, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(html.len());
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut excluded_depth = 0usize;
    let mut cursor = 0;

    while cursor < html.len() {
        let rest = &html[cursor..];
        let Some(lt) = rest.find('<') else {
            emit_text(&mut out, rest, excluded_depth, &mut f);
            break;
        };

        if lt > 0 {
            emit_text(&mut out, &rest[..lt], excluded_depth, &mut f);
        }

        let markup = &rest[lt..];

        if markup.starts_with("<!--") {
            let len = markup.find("-->").map(|i| i + 3).unwrap_or(markup.len());
            out.push_str(&markup[..len]);
            cursor += lt + len;
            continue;
        }

        let Some(len) = tag_len(markup) else {
            // '<' solto sem '>' até o fim: trata como texto
            emit_text(&mut out, markup, excluded_depth, &mut f);
            break;
        };
        let tag = &markup[..len];
        out.push_str(tag);
        cursor += lt + len;

        if let Some(name) = closing_name(tag) {
            if let Some(pos) = stack.iter().rposition(|e| e.name == name) {
                for element in stack.drain(pos..) {
                    if element.excluded {
                        excluded_depth -= 1;
                    }
                }
            }
            continue;
        }

        let Some(name) = opening_name(tag) else {
            continue;
        };
        if tag.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str()) {
            continue;
        }
        let excluded = policy.excludes(&name, tag);
        if excluded {
            excluded_depth += 1;
        }
        stack.push(OpenElement { name, excluded });
    }

    out
}

fn emit_text<F>(out: &mut String, text: &str, excluded_depth: usize, f: &mut F)
where
    F: FnMut(&str) -> String,
{
    if excluded_depth > 0 {
        out.push_str(text);
    } else {
        out.push_str(&f(text));
    }
}

/// Tamanho da tag começando em `markup` (inclui `>`), respeitando aspas.
fn tag_len(markup: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in markup.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn element_name(s: &str) -> Option<String> {
    let name: String = s
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

fn closing_name(tag: &str) -> Option<String> {
    tag.strip_prefix("</").and_then(element_name)
}

fn opening_name(tag: &str) -> Option<String> {
    tag.strip_prefix('<').and_then(element_name)
}

/// Valor de um atributo da tag (aspas opcionais).
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    // ASCII lowercase preserva os offsets em bytes
    let lower = tag.to_ascii_lowercase();
    let mut search = 0;
    while let Some(found) = lower[search..].find(name) {
        let at = search + found;
        search = at + name.len();
        if !lower[..at].ends_with(|c: char| c.is_ascii_whitespace()) {
            continue;
        }
        let Some(value) = tag[search..].trim_start().strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        return Some(match value.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let inner = &value[1..];
                &inner[..inner.find(q).unwrap_or(inner.len())]
            }
            _ => {
                let end = value
                    .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                    .unwrap_or(value.len());
                &value[..end]
            }
        });
    }
    None
}

/// Classes declaradas no atributo `class` da tag.
fn class_list(tag: &str) -> Vec<&str> {
    attribute(tag, "class")
        .map(|body| body.split_ascii_whitespace().collect())
        .unwrap_or_default()
}

/// Texto de um trecho HTML com as entidades decodificadas.
///
/// Guarda, para cada byte do texto decodificado, o offset do caractere
/// correspondente na fonte, de modo que trechos encontrados no texto possam
/// ser aplicados ao HTML original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    offsets: Vec<usize>,
}

impl DecodedText {
    /// Offset na fonte do byte `index` do texto decodificado.
    ///
    /// `index == text.len()` mapeia para o fim da fonte.
    pub fn source_offset(&self, index: usize) -> usize {
        self.offsets[index.min(self.offsets.len() - 1)]
    }
}

/// Maior referência aceita, incluindo `&` e `;` (ex: `&#x1F600;`).
const MAX_ENTITY_LEN: usize = 12;

/// Decodifica referências de caractere (`&amp;`, `&#39;`, `&#x2019;`...).
///
/// Referências desconhecidas ou malformadas ficam como estão.
pub fn decode_entities(source: &str) -> DecodedText {
    let mut text = String::with_capacity(source.len());
    let mut offsets = Vec::with_capacity(source.len() + 1);
    let mut cursor = 0;

    while cursor < source.len() {
        let rest = &source[cursor..];
        if rest.starts_with('&') {
            let reference = rest
                .char_indices()
                .skip(1)
                .take_while(|(i, c)| *i < MAX_ENTITY_LEN && (c.is_ascii_alphanumeric() || *c == '#' || *c == ';'))
                .find(|(_, c)| *c == ';')
                .and_then(|(semi, _)| decode_reference(&rest[1..semi]).map(|c| (c, semi + 1)));
            if let Some((decoded, len)) = reference {
                text.push(decoded);
                offsets.extend(std::iter::repeat(cursor).take(decoded.len_utf8()));
                cursor += len;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        text.push(c);
        offsets.extend(std::iter::repeat(cursor).take(c.len_utf8()));
        cursor += c.len_utf8();
    }
    offsets.push(source.len());
    DecodedText { text, offsets }
}

fn decode_reference(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            return char::from_u32(code);
        }
    };
    Some(c)
}

/// Texto visível de um fragmento: sem tags, entidades decodificadas e
/// espaços colapsados.
fn text_content(fragment: &str) -> String {
    let mut plain = String::with_capacity(fragment.len());
    let mut cursor = 0;
    while let Some(lt) = fragment[cursor..].find('<') {
        plain.push_str(&fragment[cursor..cursor + lt]);
        match tag_len(&fragment[cursor + lt..]) {
            Some(len) => cursor += lt + len,
            None => {
                cursor += lt;
                break;
            }
        }
    }
    plain.push_str(&fragment[cursor..]);
    decode_entities(&plain)
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Seções que entram no sumário do artigo.
pub const MIN_TOC_HEADINGS: usize = 3;

/// Uma seção (`<h2>`) do artigo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
}

/// Sumário de um artigo com as âncoras já inseridas no HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOfContents {
    /// O corpo com `id="heading-<n>"` em cada `<h2>` que não tinha id.
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Monta o sumário a partir dos `<h2>` do corpo.
///
/// Só existe com [`MIN_TOC_HEADINGS`] seções ou mais; `<h3>` e abaixo não
/// entram. Headings sem id recebem `heading-<posição>`.
pub fn table_of_contents(html: &str) -> Option<TableOfContents> {
    let mut out = String::with_capacity(html.len() + 64);
    let mut headings = Vec::new();
    let mut cursor = 0;

    while let Some(lt) = html[cursor..].find('<') {
        let start = cursor + lt;
        let markup = &html[start..];
        let len = if markup.starts_with("<!--") {
            markup.find("-->").map(|i| i + 3).unwrap_or(markup.len())
        } else {
            match tag_len(markup) {
                Some(len) => len,
                None => break,
            }
        };
        let tag = &markup[..len];
        out.push_str(&html[cursor..start]);
        cursor = start + len;

        if opening_name(tag).as_deref() != Some("h2") {
            out.push_str(tag);
            continue;
        }

        let index = headings.len();
        let id = match attribute(tag, "id") {
            Some(id) => {
                out.push_str(tag);
                id.to_string()
            }
            None => {
                let id = format!("heading-{}", index);
                out.push_str(&tag[..3]);
                out.push_str(&format!(" id=\"{}\"", id));
                out.push_str(&tag[3..]);
                id
            }
        };
        let body = &html[cursor..];
        let close = body.to_ascii_lowercase().find("</h2").unwrap_or(body.len());
        headings.push(Heading {
            id,
            text: text_content(&body[..close]),
        });
    }
    out.push_str(&html[cursor..]);

    if headings.len() < MIN_TOC_HEADINGS {
        return None;
    }
    Some(TableOfContents { html: out, headings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shout(html: &str) -> String {
        rewrite_text_runs(html, &MarkupPolicy::default(), |t| t.to_uppercase())
    }

    #[test]
    fn test_identity_round_trip() {
        let html = r#"<p>Kael <em>met</em> <a href="x">Mira</a><br>again<!-- note --></p>"#;
        let out = rewrite_text_runs(html, &MarkupPolicy::default(), |t| t.to_string());
        assert_eq!(out, html);
    }

    #[test]
    fn test_text_outside_exclusions_rewritten() {
        assert_eq!(
            shout("<p>kael <strong>mira</strong></p>"),
            "<p>KAEL <strong>MIRA</strong></p>"
        );
    }

    #[test]
    fn test_excluded_tags_untouched() {
        assert_eq!(
            shout(r#"<h1>kael</h1><p>x <a href="/k">kael</a> <code>kael</code> y</p>"#),
            r#"<h1>kael</h1><p>X <a href="/k">kael</a> <code>kael</code> Y</p>"#
        );
    }

    #[test]
    fn test_excluded_class_untouched() {
        assert_eq!(
            shout(r#"<p><span class="meta wiki-link">kael</span> sol <div class='toc-item'><b>x</b></div></p>"#),
            r#"<p><span class="meta wiki-link">kael</span> SOL <div class='toc-item'><b>x</b></div></p>"#
        );
    }

    #[test]
    fn test_void_and_self_closing_do_not_open_scope() {
        assert_eq!(
            shout(r##"<a href="#"><img src="a.png">kael</a> after<br/>end"##),
            r##"<a href="#"><img src="a.png">kael</a> AFTER<br/>END"##
        );
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        assert_eq!(
            shout(r#"<span title="a > b">kael</span>"#),
            r#"<span title="a > b">KAEL</span>"#
        );
    }

    #[test]
    fn test_unclosed_bracket_is_text() {
        assert_eq!(shout("kael < mira"), "KAEL < MIRA");
    }

    #[test]
    fn test_class_list_parsing() {
        assert_eq!(class_list(r#"<span class="a b">"#), vec!["a", "b"]);
        assert_eq!(class_list(r#"<span data-class="x" class='y'>"#), vec!["y"]);
        assert_eq!(class_list("<span class=z>"), vec!["z"]);
        assert!(class_list("<span>").is_empty());
    }

    #[test]
    fn test_attribute_lookup() {
        assert_eq!(attribute(r#"<h2 id="lore" class="x">"#, "id"), Some("lore"));
        assert_eq!(attribute(r#"<h2 data-id="x">"#, "id"), None);
    }

    #[test]
    fn test_decode_entities_maps_offsets() {
        let source = "Vor&#39;Kael &amp; Kael&rsquo;s";
        let decoded = decode_entities(source);
        assert_eq!(decoded.text, "Vor'Kael & Kael\u{2019}s");

        let kael = decoded.text.find("Kael").unwrap();
        assert_eq!(&source[decoded.source_offset(kael)..], "Kael &amp; Kael&rsquo;s");
        assert_eq!(decoded.source_offset(decoded.text.len()), source.len());
        let possessive_end = decoded.text.len();
        let possessive_start = decoded.text.rfind("Kael").unwrap();
        assert_eq!(
            &source[decoded.source_offset(possessive_start)..decoded.source_offset(possessive_end)],
            "Kael&rsquo;s"
        );
    }

    #[test]
    fn test_unknown_entities_kept() {
        assert_eq!(decode_entities("a &bogus; b & c &#xZZ;").text, "a &bogus; b & c &#xZZ;");
        assert_eq!(decode_entities("&#x2014;&#8212;").text, "\u{2014}\u{2014}");
    }

    #[test]
    fn test_table_of_contents_needs_three_sections() {
        assert!(table_of_contents("<h2>A</h2><h2>B</h2><h3>C</h3>").is_none());
    }

    #[test]
    fn test_table_of_contents_assigns_ids() {
        let html = r#"<p>intro</p><h2>Origins</h2><h2 id="wards">The <em>Wards</em></h2><H2 class="x">Salt &amp; Ash</H2>"#;
        let toc = table_of_contents(html).unwrap();
        let entries: Vec<(&str, &str)> = toc
            .headings
            .iter()
            .map(|h| (h.id.as_str(), h.text.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![("heading-0", "Origins"), ("wards", "The Wards"), ("heading-2", "Salt & Ash")]
        );
        assert_eq!(
            toc.html,
            r#"<p>intro</p><h2 id="heading-0">Origins</h2><h2 id="wards">The <em>Wards</em></h2><H2 id="heading-2" class="x">Salt &amp; Ash</H2>"#
        );
    }
}
