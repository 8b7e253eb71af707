//! Estado compartilhado, rotas e handlers do servidor.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use askama::Template;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use compendium_core::{
    bookmarks::{BookmarkStore, Toggle},
    demo::{demo_compendium, demo_texts},
    markup::{table_of_contents, MarkupPolicy},
    reputation::RelationshipSheet,
    search::{preview, resolve_target, search},
    AliasPolicy, Annotator, Compendium, LinkPipeline, MatchSpan, PipelineEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::Config;
use crate::render;

/// Dataset e pipeline trocados juntos em um recarregamento.
pub struct Content {
    pub compendium: Compendium,
    pub pipeline: LinkPipeline,
}

impl Content {
    pub fn new(compendium: Compendium, policy: &AliasPolicy, min_text_len: usize) -> Self {
        let annotator = Annotator::from_records(compendium.entity_records(), policy)
            .with_min_text_len(min_text_len);
        Self {
            compendium,
            pipeline: LinkPipeline::new(annotator),
        }
    }
}

/// Estado compartilhado da aplicação
pub struct AppState {
    /// Cada requisição lê um snapshot; o recarregamento troca tudo de uma vez.
    content: RwLock<Content>,
    bookmarks: Mutex<BookmarkStore>,
    relationships: RelationshipSheet,
    markup: MarkupPolicy,
    data_path: Option<PathBuf>,
    alias_policy: AliasPolicy,
    min_text_len: usize,
    search_limit: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let compendium = match &config.data {
            Some(path) => Compendium::load(path)?,
            None => {
                info!("Nenhum dataset informado, usando o compêndio de demonstração");
                demo_compendium()?
            }
        };
        let relationships = match &config.relationships {
            Some(path) => RelationshipSheet::load_or_default(path),
            None => RelationshipSheet::default(),
        };
        let policy = AliasPolicy::for_categories(config.alias_categories.iter().cloned());

        Ok(Self {
            content: RwLock::new(Content::new(compendium, &policy, config.min_text_len)),
            bookmarks: Mutex::new(BookmarkStore::open(&config.bookmarks)?),
            relationships,
            markup: MarkupPolicy::default(),
            data_path: config.data.clone(),
            alias_policy: policy,
            min_text_len: config.min_text_len,
            search_limit: config.search_limit,
        })
    }

    fn content(&self) -> RwLockReadGuard<'_, Content> {
        self.content.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn bookmarks(&self) -> MutexGuard<'_, BookmarkStore> {
        self.bookmarks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Relê o dataset do disco e reconstrói o dicionário.
    fn reload(&self) -> anyhow::Result<(usize, usize)> {
        let compendium = match &self.data_path {
            Some(path) => Compendium::load(path)?,
            None => demo_compendium()?,
        };
        let fresh = Content::new(compendium, &self.alias_policy, self.min_text_len);
        let counts = (
            fresh.compendium.article_count(),
            fresh.pipeline.annotator.dictionary().len(),
        );
        // o lock de escrita só cobre a troca
        let previous = {
            let mut content = self.content.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *content, fresh)
        };
        drop(previous);
        Ok(counts)
    }
}

pub fn router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/data.json", get(data_handler))
        .route("/articles/:category/:id", get(article_handler))
        .route("/annotate", post(annotate_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/search", get(search_handler))
        .route("/resolve", get(resolve_handler))
        .route("/bookmarks", get(bookmarks_handler))
        .route("/bookmarks/toggle", post(toggle_bookmark_handler))
        .route("/reputation/:character", get(reputation_handler))
        .route("/reload", post(reload_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn render_failed(err: askama::Error) -> Response {
    warn!(error = %err, "Falha ao montar HTML");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Falha ao montar HTML")
}

struct CategoryRow {
    name: String,
    icon: String,
    count: usize,
}

struct DemoText {
    domain: &'static str,
    text: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    categories: Vec<CategoryRow>,
    article_count: usize,
    entity_count: usize,
    demo_texts: Vec<DemoText>,
}

/// Retorna a página principal HTML
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let content = state.content();
    let page = IndexTemplate {
        categories: content
            .compendium
            .categories()
            .map(|(name, category)| CategoryRow {
                name: name.to_string(),
                icon: category.info.icon.clone().unwrap_or_default(),
                count: category.all_articles().count(),
            })
            .collect(),
        article_count: content.compendium.article_count(),
        entity_count: content.pipeline.annotator.dictionary().len(),
        demo_texts: demo_texts()
            .into_iter()
            .map(|(domain, text)| DemoText { domain, text })
            .collect(),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => render_failed(err),
    }
}

/// Dataset completo, na ordem original das categorias.
async fn data_handler(State(state): State<Arc<AppState>>) -> Response {
    let content = state.content();
    Json(&content.compendium).into_response()
}

#[derive(Serialize)]
struct MetaTag<'a> {
    icon: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct ArticleRef<'a> {
    id: &'a str,
    title: &'a str,
}

/// Artigo com o corpo já auto-linkado (o próprio título nunca vira link).
async fn article_handler(
    State(state): State<Arc<AppState>>,
    Path((category, id)): Path<(String, String)>,
) -> Response {
    let content = state.content();
    let Some(article) = content.compendium.find(&category, &id) else {
        return error_response(StatusCode::NOT_FOUND, "Artigo não encontrado");
    };
    // o sumário entra antes do auto-link; suas âncoras são protegidas
    let (body, toc) = match table_of_contents(&article.content) {
        Some(toc) => match render::table_of_contents(&toc.headings) {
            Ok(block) => (format!("{}{}", block, toc.html), toc.headings),
            Err(err) => return render_failed(err),
        },
        None => (article.content.clone(), Vec::new()),
    };
    let html = match render::link_article_html(
        &body,
        &content.pipeline.annotator,
        &state.markup,
        &article.title,
    ) {
        Ok(html) => html,
        Err(err) => return render_failed(err),
    };
    let meta: Vec<MetaTag> = article
        .meta_tags()
        .into_iter()
        .map(|(icon, text)| MetaTag { icon, text })
        .collect();
    let bookmarked = state.bookmarks().is_bookmarked(&category, &article.id);
    let neighbors = content
        .compendium
        .category(&category)
        .and_then(|c| c.neighbors(&article.id));
    let (prev, next) = match neighbors {
        Some((prev, next)) => (
            Some(ArticleRef { id: &prev.id, title: &prev.title }),
            Some(ArticleRef { id: &next.id, title: &next.title }),
        ),
        None => (None, None),
    };

    Json(json!({
        "category": category,
        "id": article.id,
        "title": article.title,
        "meta": meta,
        "html": html,
        "toc": toc,
        "prev": prev,
        "next": next,
        "bookmarked": bookmarked,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct AnnotateRequest {
    text: String,
    #[serde(default)]
    exclude_title: String,
}

#[derive(Serialize)]
struct AnnotateResponse {
    spans: Vec<MatchSpan>,
    html: String,
}

/// Anotação via HTTP POST (sem streaming)
async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Texto vazio");
    }

    let content = state.content();
    let annotation = content.pipeline.annotator.annotate(&req.text, &req.exclude_title);
    let html = match render::link_plain_text(&req.text, &annotation.spans) {
        Ok(html) => html,
        Err(err) => return render_failed(err),
    };
    Json(AnnotateResponse {
        spans: annotation.spans,
        html,
    })
    .into_response()
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(domain, text)| json!({ "domain": domain, "text": text }))
        .collect();
    Json(texts)
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    text: String,
    #[serde(default)]
    exclude_title: String,
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe texto, executa o pipeline e envia os eventos passo a passo
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {text, exclude_title}; senão o texto puro
                let (text, exclude_title) = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => (req.text, req.exclude_title),
                    Err(_) => (text.to_string(), String::new()),
                };
                if text.trim().is_empty() {
                    continue;
                }

                info!(chars = text.len(), exclude = %exclude_title, "Analisando via WebSocket");

                // O pipeline é síncrono: roda fora do runtime
                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let worker_state = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    worker_state
                        .content()
                        .pipeline
                        .analyze_streaming(&text, &exclude_title, tx);
                });
                if let Err(err) = handle.await {
                    warn!(error = %err, "Pipeline interrompido");
                    continue;
                }
                let events: Vec<PipelineEvent> = rx.try_iter().collect();

                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                        // pausa para a animação passo a passo
                        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let content = state.content();
    let mut results = Vec::new();
    for hit in search(&content.compendium, &query.q, state.search_limit) {
        let title_html = match render::highlight(&hit.article.title, &query.q) {
            Ok(html) => html,
            Err(err) => return render_failed(err),
        };
        let preview_html = match render::highlight(&preview(&hit.article.raw, &query.q), &query.q) {
            Ok(html) => html,
            Err(err) => return render_failed(err),
        };
        results.push(json!({
            "category": hit.category,
            "id": hit.article.id,
            "title": hit.article.title,
            "title_html": title_html,
            "preview_html": preview_html,
            "score": hit.score,
        }));
    }
    Json(results).into_response()
}

#[derive(Deserialize)]
struct ResolveQuery {
    target: String,
}

/// Resolve o alvo de um link sem id para um artigo.
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Response {
    let content = state.content();
    match resolve_target(&content.compendium, &query.target) {
        Some((category, article)) => {
            Json(json!({ "category": category, "id": article.id, "title": article.title }))
                .into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("\"{}\" não está no compêndio. Talvez seja conhecimento oculto.", query.target),
        ),
    }
}

async fn bookmarks_handler(State(state): State<Arc<AppState>>) -> Response {
    let store = state.bookmarks();
    Json(store.list()).into_response()
}

#[derive(Deserialize)]
struct ToggleRequest {
    category: String,
    id: String,
}

async fn toggle_bookmark_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ToggleRequest>,
) -> Response {
    let content = state.content();
    let Some(article) = content.compendium.find(&req.category, &req.id) else {
        return error_response(StatusCode::NOT_FOUND, "Artigo não encontrado");
    };
    let mut store = state.bookmarks();
    match store.toggle(&req.category, article) {
        Ok(status) => {
            info!(category = %req.category, id = %req.id, ?status, "Favorito alterado");
            Json(json!({
                "status": status,
                "bookmarked": status == Toggle::Added,
                "bookmarks": store.list(),
            }))
            .into_response()
        }
        Err(err) => {
            warn!(error = %err, path = %store.path().display(), "Falha ao gravar favoritos");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Falha ao gravar favoritos")
        }
    }
}

#[derive(Deserialize)]
struct RosterQuery {
    #[serde(default = "all")]
    filter: String,
}

fn all() -> String {
    "all".to_string()
}

/// Cartões de relação de um personagem, já com faixa e progresso.
async fn reputation_handler(
    State(state): State<Arc<AppState>>,
    Path(character): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Response {
    let Some(roster) = state.relationships.roster(&character, &query.filter) else {
        return error_response(StatusCode::NOT_FOUND, "Personagem desconhecido");
    };
    let cards: Vec<serde_json::Value> = roster
        .into_iter()
        .map(|r| {
            json!({
                "name": r.name,
                "initial": r.name.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default(),
                "type": r.kind,
                "category": r.category,
                "reputation": r.reputation,
                "tier": r.tier(),
                "progress": r.progress(),
                "permanentEnemy": r.permanent_enemy,
                "romanceAvailable": r.romance_available,
                "likes": r.likes,
                "dislikes": r.dislikes,
                "history": r.recent_history(),
                "unlocks": r.unlock_view(),
                "description": r.description,
                "portrait": r.portrait,
            })
        })
        .collect();
    Json(json!({ "character": character, "filter": query.filter, "relationships": cards }))
        .into_response()
}

/// Relê o dataset e reconstrói o dicionário de auto-link.
async fn reload_handler(State(state): State<Arc<AppState>>) -> Response {
    let worker_state = Arc::clone(&state);
    match tokio::task::spawn_blocking(move || worker_state.reload()).await {
        Ok(Ok((articles, entries))) => {
            info!(articles, entries, "Compêndio recarregado");
            Json(json!({ "articles": articles, "entries": entries })).into_response()
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Falha ao recarregar o compêndio");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}
