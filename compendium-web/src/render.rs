//! Montagem do HTML devolvido ao navegador.
//!
//! Todo texto que vem do usuário ou do dataset passa pelo escape dos
//! templates askama; só o HTML já existente dos artigos entra sem escape.

use askama::Template;
use compendium_core::annotate::{splice, Annotator, Segment};
use compendium_core::markup::{decode_entities, rewrite_text_runs, Heading, MarkupPolicy};
use compendium_core::search::highlight_ranges;
use compendium_core::MatchSpan;

pub struct LinkedPart<'a> {
    pub text: &'a str,
    pub is_link: bool,
    pub target: &'a str,
    pub id: &'a str,
    pub category: &'a str,
}

impl<'a> LinkedPart<'a> {
    fn from_segment(segment: Segment<'a>) -> Self {
        match segment {
            Segment::Text(text) => Self {
                text,
                is_link: false,
                target: "",
                id: "",
                category: "",
            },
            Segment::Link(span) => {
                let entity = span.entity.canonical();
                Self {
                    text: span.matched_text.as_str(),
                    is_link: true,
                    target: entity.title.as_str(),
                    id: entity.id.as_str(),
                    category: entity.category.as_str(),
                }
            }
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"{%- for part in parts -%}
{%- if part.is_link -%}
<span class="wiki-link" data-target="{{ part.target }}" data-id="{{ part.id }}" data-category="{{ part.category }}">
{%- if raw %}{{ part.text|safe }}{% else %}{{ part.text }}{% endif -%}
</span>
{%- else -%}
{%- if raw %}{{ part.text|safe }}{% else %}{{ part.text }}{% endif -%}
{%- endif -%}
{%- endfor -%}"#,
    ext = "html"
)]
struct LinkedTextTemplate<'a> {
    parts: Vec<LinkedPart<'a>>,
    /// O texto já é HTML (corpo de artigo) e não deve ser escapado.
    raw: bool,
}

pub struct MarkedPart<'a> {
    pub text: &'a str,
    pub marked: bool,
}

#[derive(Template)]
#[template(
    source = r#"{%- for part in parts -%}
{%- if part.marked -%}<mark>{{ part.text }}</mark>{%- else -%}{{ part.text }}{%- endif -%}
{%- endfor -%}"#,
    ext = "html"
)]
struct HighlightTemplate<'a> {
    parts: Vec<MarkedPart<'a>>,
}

fn render_links(text: &str, spans: &[MatchSpan], raw: bool) -> askama::Result<String> {
    let parts = splice(text, spans)
        .into_iter()
        .map(LinkedPart::from_segment)
        .collect();
    let template = LinkedTextTemplate { parts, raw };
    template.render()
}

/// Texto puro com os trechos já anotados virados em links; o resto é escapado.
pub fn link_plain_text(text: &str, spans: &[MatchSpan]) -> askama::Result<String> {
    render_links(text, spans, false)
}

/// Um trecho de texto de artigo ainda com entidades HTML.
///
/// O matcher vê o texto decodificado; os trechos voltam para offsets da fonte.
fn link_html_run(run: &str, annotator: &Annotator, exclude_title: &str) -> askama::Result<String> {
    let decoded = decode_entities(run);
    let annotation = annotator.annotate(&decoded.text, exclude_title);
    if annotation.is_empty() {
        return Ok(run.to_string());
    }
    let spans: Vec<MatchSpan> = annotation
        .spans
        .into_iter()
        .map(|span| {
            let start = decoded.source_offset(span.start);
            let end = decoded.source_offset(span.end);
            MatchSpan {
                start,
                end,
                matched_text: run[start..end].to_string(),
                entity: span.entity,
            }
        })
        .collect();
    render_links(run, &spans, true)
}

/// Corpo HTML de um artigo com links inseridos só fora de elementos protegidos.
pub fn link_article_html(
    html: &str,
    annotator: &Annotator,
    policy: &MarkupPolicy,
    exclude_title: &str,
) -> askama::Result<String> {
    let mut failure = None;
    let out = rewrite_text_runs(html, policy, |run| {
        link_html_run(run, annotator, exclude_title).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            run.to_string()
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

#[derive(Template)]
#[template(
    source = r##"<div class="article-toc"><div class="toc-header"><i data-lucide="list"></i><span>Contents</span></div><nav class="toc-nav">
{%- for heading in headings -%}
<a href="#{{ heading.id }}" class="toc-item toc-h2" data-target="{{ heading.id }}">{{ heading.text }}</a>
{%- endfor -%}
</nav></div>"##,
    ext = "html"
)]
struct TocTemplate<'a> {
    headings: &'a [Heading],
}

/// Bloco de sumário com uma âncora `toc-item` por seção.
pub fn table_of_contents(headings: &[Heading]) -> askama::Result<String> {
    TocTemplate { headings }.render()
}

/// Escapa `text` envolvendo cada ocorrência de `query` em `<mark>`.
pub fn highlight(text: &str, query: &str) -> askama::Result<String> {
    let mut parts = Vec::new();
    let mut cursor = 0;
    for range in highlight_ranges(text, query) {
        if range.start > cursor {
            parts.push(MarkedPart {
                text: &text[cursor..range.start],
                marked: false,
            });
        }
        parts.push(MarkedPart {
            text: &text[range.clone()],
            marked: true,
        });
        cursor = range.end;
    }
    if cursor < text.len() {
        parts.push(MarkedPart {
            text: &text[cursor..],
            marked: false,
        });
    }
    HighlightTemplate { parts }.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use compendium_core::{AliasPolicy, EntityRecord};

    fn annotator() -> Annotator {
        Annotator::from_records(
            vec![
                EntityRecord::new("Kael", "kael", "NPCs"),
                EntityRecord::new("Vor'Kael", "vor-kael", "Lore"),
                EntityRecord::new("Emberfall", "emberfall", "Locations"),
                EntityRecord::new("Salt & Ash", "salt-ash", "Lore"),
            ],
            &AliasPolicy::default(),
        )
    }

    fn article(body: &str) -> String {
        link_article_html(body, &annotator(), &MarkupPolicy::default(), "").unwrap()
    }

    #[test]
    fn test_plain_text_is_escaped_and_linked() {
        let text = "Kael <3 Emberfall";
        let spans = annotator().annotate(text, "").spans;
        let html = link_plain_text(text, &spans).unwrap();
        assert!(html.starts_with(
            "<span class=\"wiki-link\" data-target=\"Kael\" data-id=\"kael\" data-category=\"NPCs\">Kael</span>"
        ));
        assert!(html.ends_with("data-category=\"Locations\">Emberfall</span>"));
        assert!(!html.contains("<3"));
    }

    #[test]
    fn test_article_matches_decoded_apostrophes() {
        let html = article("<p>The road to Vor&#39;Kael is long.</p>");
        assert!(html.contains("data-id=\"vor-kael\" data-category=\"Lore\">Vor&#39;Kael</span>"));
        assert!(!html.contains("data-id=\"kael\""));
    }

    #[test]
    fn test_article_possessive_keeps_source_entity() {
        let html = article("<p>Kael&#39;s sword.</p>");
        assert!(html.contains("data-id=\"kael\" data-category=\"NPCs\">Kael&#39;s</span> sword."));
    }

    #[test]
    fn test_article_title_with_ampersand() {
        let html = article("<p>Salt &amp; Ash trade here&hellip;</p>");
        assert!(html.contains("data-target=\"Salt &"));
        assert!(html.contains(">Salt &amp; Ash</span> trade here&hellip;</p>"));
    }

    #[test]
    fn test_table_of_contents_block() {
        let headings = vec![
            Heading { id: "heading-0".to_string(), text: "Origins".to_string() },
            Heading { id: "wards".to_string(), text: "Wards <old>".to_string() },
        ];
        let html = table_of_contents(&headings).unwrap();
        assert!(html.contains(r##"<a href="#heading-0" class="toc-item toc-h2" data-target="heading-0">Origins</a>"##));
        assert!(!html.contains("<old>"));
        assert!(html.ends_with("</nav></div>"));
    }

    #[test]
    fn test_article_html_skips_protected_elements() {
        let body = "<h1>Kael</h1><p>Kael met <a href=\"/x\">Emberfall</a>.</p>";
        let html = link_article_html(body, &annotator(), &MarkupPolicy::default(), "").unwrap();
        assert!(html.starts_with("<h1>Kael</h1><p><span class=\"wiki-link\""));
        assert!(html.contains("<a href=\"/x\">Emberfall</a>"));
        assert_eq!(html.matches("wiki-link").count(), 1);
    }

    #[test]
    fn test_article_never_links_itself() {
        let html = link_article_html("<p>Kael waits.</p>", &annotator(), &MarkupPolicy::default(), "Kael")
            .unwrap();
        assert_eq!(html, "<p>Kael waits.</p>");
    }

    #[test]
    fn test_highlight_marks_all_occurrences() {
        let html = highlight("Sol & sol", "SOL").unwrap();
        assert!(html.starts_with("<mark>Sol</mark> &"));
        assert!(html.ends_with(" <mark>sol</mark>"));
        assert!(!html.contains(" & "));
        assert_eq!(highlight("abc", "zz").unwrap(), "abc");
    }
}
