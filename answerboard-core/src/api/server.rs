//! HTTP сервер для Answerboard API.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::ranking::SortMode;
use crate::store::Store;
use crate::vote::{submit_vote, VoteOutcome};
use crate::{FeedStats, RankedView, ViewSelection};

/// Состояние API сервера.
#[derive(Clone)]
pub struct ApiState {
    /// Хранилище записей (для приёма голосов)
    store: Arc<Store>,
    /// Текущий выбор отображения, общий с лентой
    view: Arc<RwLock<ViewSelection>>,
    /// Последний опубликованный список ответов
    ranked: Arc<RwLock<RankedView>>,
    /// Статистика работы ленты (опционально, если лента не запущена)
    stats: Option<Arc<RwLock<FeedStats>>>,
}

impl ApiState {
    /// Создаёт новое состояние API сервера.
    pub fn new(
        store: Arc<Store>,
        view: Arc<RwLock<ViewSelection>>,
        ranked: Arc<RwLock<RankedView>>,
    ) -> Self {
        Self {
            store,
            view,
            ranked,
            stats: None,
        }
    }

    /// Добавляет статистику ленты к состоянию.
    pub fn with_stats(mut self, stats: Arc<RwLock<FeedStats>>) -> Self {
        self.stats = Some(stats);
        self
    }
}

/// Обработчик для endpoint `/health`.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "answerboard-api"
    }))
}

/// Создаёт роутер для API.
fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/answers", get(answers_handler))
        .route("/api/view", put(view_handler))
        .route("/api/votes", post(vote_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(state)
}

/// Обработчик для endpoint `/api/answers`.
///
/// Возвращает последний опубликованный лентой список ответов.
async fn answers_handler(State(state): State<ApiState>) -> Json<Value> {
    let ranked = state.ranked.read().await;
    Json(json!({
        "status": "ok",
        "view": *ranked,
        "count": ranked.answers.len()
    }))
}

#[derive(Debug, Deserialize)]
struct ViewRequest {
    question_id: Option<String>,
    sort_by: Option<String>,
}

/// Обработчик для endpoint `/api/view`.
///
/// Меняет текущий вопрос и/или режим сортировки. Неизвестный режим —
/// ошибка 400 с сообщением, никогда не подменяется дефолтом. Изменение
/// попадает в опубликованный список на следующем тике ленты.
async fn view_handler(
    State(state): State<ApiState>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let sort_by = match request.sort_by {
        Some(ref raw) => Some(SortMode::from_str(raw).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
        })?),
        None => None,
    };

    if let Some(ref question_id) = request.question_id {
        if question_id.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "message": "question_id must not be empty"
                })),
            ));
        }
    }

    let mut view = state.view.write().await;
    if let Some(question_id) = request.question_id {
        view.question_id = question_id;
    }
    if let Some(sort_by) = sort_by {
        view.sort_by = sort_by;
    }

    Ok(Json(json!({
        "status": "ok",
        "view": *view,
        "message": "view change takes effect on the next refresh"
    })))
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    user_id: Option<String>,
    answer_id: String,
    is_positive: bool,
}

/// Обработчик для endpoint `/api/votes`.
///
/// Принимает голос за или против ответа. Неаутентифицированные попытки —
/// no-op с честным статусом `ignored` в ответе.
async fn vote_handler(
    State(state): State<ApiState>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let outcome = submit_vote(
        &state.store,
        request.user_id.as_deref(),
        &request.answer_id,
        request.is_positive,
    )
    .map_err(|e| {
        error!("Failed to submit vote: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": "failed to record vote"
            })),
        )
    })?;

    let body = match outcome {
        VoteOutcome::Accepted { vote_id } => json!({
            "status": "ok",
            "outcome": "accepted",
            "vote_id": vote_id
        }),
        VoteOutcome::IgnoredUnauthenticated => json!({
            "status": "ok",
            "outcome": "ignored",
            "reason": "unauthenticated"
        }),
        VoteOutcome::IgnoredUnknownUser => json!({
            "status": "ok",
            "outcome": "ignored",
            "reason": "unknown-user"
        }),
    };
    Ok(Json(body))
}

/// Обработчик для endpoint `/api/stats`.
///
/// Возвращает статистику работы ленты (если лента запущена).
async fn stats_handler(State(state): State<ApiState>) -> Json<Value> {
    match &state.stats {
        Some(stats_arc) => {
            let stats = stats_arc.read().await;
            Json(json!({
                "status": "ok",
                "feed_stats": *stats
            }))
        }
        None => Json(json!({
            "status": "ok",
            "feed_stats": null,
            "message": "Feed stats not available (feed may not be running)"
        })),
    }
}

/// HTTP API сервер для Answerboard.
///
/// Сервер запускается в отдельной задаче и может быть остановлен через
/// handle.
///
/// # Примеры использования
///
/// ```no_run
/// use answerboard_core::api::{ApiServer, ApiState};
/// use answerboard_core::store::Store;
/// use answerboard_core::{RankedView, ViewSelection};
/// use answerboard_core::ranking::SortMode;
/// use std::net::SocketAddr;
/// use std::sync::Arc;
/// use tokio::sync::RwLock;
///
/// # async fn example() -> anyhow::Result<()> {
/// let view = ViewSelection {
///     question_id: "q-1".to_string(),
///     sort_by: SortMode::Time,
/// };
/// let state = ApiState::new(
///     Arc::new(Store::new()),
///     Arc::new(RwLock::new(view.clone())),
///     Arc::new(RwLock::new(RankedView::empty(&view))),
/// );
/// let addr: SocketAddr = "127.0.0.1:8080".parse()?;
/// let handle = ApiServer::new(addr, state).start().await?;
///
/// // Сервер работает в фоне
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiServer {
    /// Адрес для прослушивания
    addr: std::net::SocketAddr,
    /// Состояние API
    state: ApiState,
}

impl ApiServer {
    /// Создаёт новый API сервер.
    pub fn new(addr: std::net::SocketAddr, state: ApiState) -> Self {
        Self { addr, state }
    }

    /// Запускает API сервер в фоновой задаче.
    ///
    /// Возвращает handle для управления сервером (адрес, остановка).
    ///
    /// # Ошибки
    ///
    /// Возвращает ошибку, если не удалось запустить сервер (например,
    /// адрес уже занят).
    pub async fn start(self) -> Result<ApiServerHandle> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", self.addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read API server local address")?;

        info!("API server listening on http://{}", local_addr);

        let router = create_router(self.state);
        let server = axum::serve(listener, router);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = ApiServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
        };

        // Запускаем сервер в отдельной задаче
        tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });

            if let Err(e) = graceful.await {
                error!("API server error: {}", e);
            } else {
                info!("API server stopped");
            }
        });

        Ok(handle)
    }
}

/// Handle для управления API сервером.
pub struct ApiServerHandle {
    local_addr: std::net::SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl ApiServerHandle {
    /// Фактический адрес сервера (полезно при запуске на порту 0).
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Останавливает API сервер.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).map_err(|_| {
                anyhow::anyhow!("Failed to send shutdown signal to API server (receiver dropped)")
            })?;
        }
        Ok(())
    }
}
