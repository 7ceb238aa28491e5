//! Answerboard — ранжирование ответов на вопрос по голосам пользователей.
//!
//! Ядро — чистый движок ранжирования (`ranking`): агрегация голосов,
//! аннотация ответов рейтингом и стабильная сортировка по выбранному
//! режиму. Вокруг ядра — коллаборторы: in-memory хранилище записей
//! (`store`), приём голосов (`vote`), HTTP API (`api`) и лента
//! (`run_feed`) — периодическая задача, которая на каждом тике снимает
//! снимок хранилища, вызывает движок и публикует свежий список
//! (последний результат выигрывает).

pub mod api;
pub mod config;
pub mod error;
pub mod ranking;
pub mod store;
pub mod vote;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::api::{ApiServer, ApiServerHandle, ApiState};
use crate::config::{Config, ViewConfig};
use crate::ranking::{rank_answers, RankedAnswer, SortMode};
use crate::store::{AnswerId, Store};

/// Текущий выбор отображения: вопрос и режим сортировки.
///
/// Лента читает выбор на каждом тике; API может менять его между тиками.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSelection {
    pub question_id: String,
    pub sort_by: SortMode,
}

impl ViewSelection {
    /// Начальный выбор из конфигурации.
    pub fn from_config(view: &ViewConfig) -> Self {
        Self {
            question_id: view.question_id.clone(),
            sort_by: view.sort_by,
        }
    }
}

/// Опубликованный результат одного тика ленты.
#[derive(Debug, Clone, Serialize)]
pub struct RankedView {
    pub question_id: String,
    pub sort_by: SortMode,
    pub refreshed_at: DateTime<Utc>,
    pub answers: Vec<RankedAnswer>,
}

impl RankedView {
    /// Пустой список до первого тика ленты.
    pub fn empty(view: &ViewSelection) -> Self {
        Self {
            question_id: view.question_id.clone(),
            sort_by: view.sort_by,
            refreshed_at: Utc::now(),
            answers: Vec::new(),
        }
    }
}

/// Статистика работы ленты.
///
/// Собирает количество тиков, время выполнения и объём опубликованных
/// ответов. Логируется периодически (каждые 10 тиков) и один раз при
/// остановке.
///
/// # Примеры использования
///
/// ```no_run
/// use answerboard_core::FeedStats;
///
/// let mut stats = FeedStats::new();
/// stats.record_successful_tick(12, 20);
/// assert_eq!(stats.average_tick_duration_ms(), 12.0);
/// stats.log_stats();
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct FeedStats {
    /// Общее количество тиков (успешных и с ошибками)
    total_ticks: u64,
    /// Количество успешных тиков
    successful_ticks: u64,
    /// Количество тиков с ошибками (ошибки снятия снимка)
    error_ticks: u64,
    /// Суммарное время выполнения всех успешных тиков (в миллисекундах)
    total_duration_ms: u128,
    /// Максимальное время выполнения одного тика (в миллисекундах)
    max_tick_duration_ms: u128,
    /// Суммарное количество опубликованных ответов за все тики
    total_answers_published: u64,
}

impl FeedStats {
    /// Создаёт новую статистику с нулевыми значениями.
    pub fn new() -> Self {
        Self {
            total_ticks: 0,
            successful_ticks: 0,
            error_ticks: 0,
            total_duration_ms: 0,
            max_tick_duration_ms: 0,
            total_answers_published: 0,
        }
    }

    /// Обновляет статистику после успешного тика.
    pub fn record_successful_tick(&mut self, duration_ms: u128, answers_published: u64) {
        self.total_ticks += 1;
        self.successful_ticks += 1;
        self.total_duration_ms += duration_ms;
        self.max_tick_duration_ms = self.max_tick_duration_ms.max(duration_ms);
        self.total_answers_published += answers_published;
    }

    /// Обновляет статистику после тика с ошибкой.
    pub fn record_error_tick(&mut self) {
        self.total_ticks += 1;
        self.error_ticks += 1;
    }

    /// Среднее время успешного тика (в миллисекундах), 0.0 без успешных тиков.
    pub fn average_tick_duration_ms(&self) -> f64 {
        if self.successful_ticks > 0 {
            self.total_duration_ms as f64 / self.successful_ticks as f64
        } else {
            0.0
        }
    }

    /// Общее количество тиков.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Количество успешных тиков.
    pub fn successful_ticks(&self) -> u64 {
        self.successful_ticks
    }

    /// Количество тиков с ошибками.
    pub fn error_ticks(&self) -> u64 {
        self.error_ticks
    }

    /// Логирует статистику работы ленты.
    pub fn log_stats(&self) {
        info!(
            "Feed stats: {} total ticks ({} successful, {} errors), \
             avg tick: {:.2}ms, max tick: {}ms, answers published: {}",
            self.total_ticks,
            self.successful_ticks,
            self.error_ticks,
            self.average_tick_duration_ms(),
            self.max_tick_duration_ms,
            self.total_answers_published
        );
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Один тик ленты в чистом виде: снять снимок и построить список.
///
/// Снимок берётся по контракту ленты: ответы текущего вопроса и только
/// голоса за эти ответы. Поверх снимка вызывается чистый движок
/// `rank_answers`; если список длиннее `max_answers`, он усекается с
/// предупреждением в логе.
pub fn refresh_view(store: &Store, view: &ViewSelection, max_answers: usize) -> Result<RankedView> {
    let answers = store.answers_for_question(&view.question_id)?;
    let answer_ids: HashSet<AnswerId> = answers.iter().map(|a| a.answer_id.clone()).collect();
    let votes = store.votes_for_answers(&answer_ids)?;

    let mut ranked = rank_answers(&answers, &votes, view.sort_by);
    if ranked.len() > max_answers {
        warn!(
            "Ranked list for question {} has {} answers, truncating to {}",
            view.question_id,
            ranked.len(),
            max_answers
        );
        ranked.truncate(max_answers);
    }

    Ok(RankedView {
        question_id: view.question_id.clone(),
        sort_by: view.sort_by,
        refreshed_at: Utc::now(),
        answers: ranked,
    })
}

/// Главный цикл ленты: снимок хранилища, ранжирование, публикация.
///
/// Лента работает до тех пор, пока не будет получен сигнал завершения
/// через `shutdown_rx`. Для корректного завершения отправьте `true` через
/// соответствующий `watch::Sender`.
///
/// # Примеры использования
///
/// ```no_run
/// use answerboard_core::{config::Config, run_feed};
/// use tokio::sync::watch;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load("configs/answerboard.yml")?;
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
///
/// let feed_handle = tokio::spawn(async move { run_feed(config, shutdown_rx).await });
///
/// // Позже отправляем сигнал завершения
/// shutdown_tx.send(true)?;
/// feed_handle.await??;
/// # Ok(())
/// # }
/// ```
pub async fn run_feed(config: Config, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    info!(
        "Initializing answerboard feed for question {} (sort = {})",
        config.view.question_id,
        config.view.sort_by.as_str()
    );

    // Инициализация хранилища
    let store = match config.paths.seed_path {
        Some(ref seed_path) => {
            info!("Loading seed data from: {}", seed_path);
            let seed = Store::load_seed(seed_path).with_context(|| {
                format!(
                    "Failed to load seed data from {seed_path}. \
                    Ensure the file exists and contains valid JSON seed data."
                )
            })?;
            let store = Store::from_seed(seed);
            info!(
                "Seeded store with {} answers, {} votes, {} users",
                store.answer_count()?,
                store.vote_count()?,
                store.user_count()?
            );
            store
        }
        None => {
            debug!("seed_path not configured, starting with an empty store");
            Store::new()
        }
    };
    let store = Arc::new(store);

    let view_arc = Arc::new(RwLock::new(ViewSelection::from_config(&config.view)));
    let ranked_arc = {
        let initial = RankedView::empty(&ViewSelection::from_config(&config.view));
        Arc::new(RwLock::new(initial))
    };
    let stats_arc = Arc::new(RwLock::new(FeedStats::new()));

    // Запуск API сервера (если указан адрес)
    let mut api_server_handle: Option<ApiServerHandle> = None;
    if let Some(ref api_addr_str) = config.paths.api_listen_addr {
        match api_addr_str.parse::<std::net::SocketAddr>() {
            Ok(addr) => {
                info!("Starting API server on {}", addr);
                let state = ApiState::new(
                    Arc::clone(&store),
                    Arc::clone(&view_arc),
                    Arc::clone(&ranked_arc),
                )
                .with_stats(Arc::clone(&stats_arc));
                match ApiServer::new(addr, state).start().await {
                    Ok(handle) => {
                        api_server_handle = Some(handle);
                        info!("API server started successfully on {}", addr);
                    }
                    Err(e) => {
                        warn!("Failed to start API server: {}. Continuing without API.", e);
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Invalid API listen address '{}': {}. API server will not start.",
                    api_addr_str, e
                );
            }
        }
    } else {
        debug!("API server disabled (api_listen_addr not configured)");
    }

    info!("Answerboard feed started, entering main loop");

    let mut tick = 0u64;
    let mut stats = FeedStats::new();
    const STATS_LOG_INTERVAL: u64 = 10; // Логируем статистику каждые 10 тиков
    loop {
        // Проверяем сигнал завершения перед началом тика
        if *shutdown_rx.borrow_and_update() {
            info!("Shutdown signal received, exiting main loop");
            break;
        }

        let tick_start = Instant::now();
        tick += 1;

        debug!("Starting tick {}", tick);

        let view = view_arc.read().await.clone();
        match refresh_view(&store, &view, config.max_answers) {
            Ok(ranked_view) => {
                let published = ranked_view.answers.len() as u64;
                *ranked_arc.write().await = ranked_view;
                stats.record_successful_tick(tick_start.elapsed().as_millis(), published);
            }
            Err(e) => {
                error!("Failed to refresh ranked view: {}", e);
                stats.record_error_tick();
            }
        }

        // Обновляем данные для API сервера
        *stats_arc.write().await = stats.clone();

        // Логируем статистику периодически
        if tick % STATS_LOG_INTERVAL == 0 {
            stats.log_stats();
        }

        let elapsed = tick_start.elapsed();
        let sleep_duration = if elapsed.as_millis() < config.polling_interval_ms as u128 {
            Duration::from_millis(config.polling_interval_ms) - elapsed
        } else {
            warn!(
                "Tick {} took {}ms, longer than polling interval {}ms",
                tick,
                elapsed.as_millis(),
                config.polling_interval_ms
            );
            Duration::from_millis(0)
        };

        // Разбиваем sleep на маленькие интервалы для проверки shutdown
        let chunk_duration = Duration::from_millis(50);
        let mut remaining = sleep_duration;
        while remaining > Duration::from_millis(0) {
            if *shutdown_rx.borrow_and_update() {
                break;
            }
            let sleep_chunk = remaining.min(chunk_duration);
            tokio::time::sleep(sleep_chunk).await;
            remaining = remaining.saturating_sub(sleep_chunk);
        }
    }

    info!("Answerboard feed stopped after {} ticks", tick);

    // Логируем финальную статистику
    stats.log_stats();

    // Останавливаем API сервер перед завершением
    if let Some(handle) = api_server_handle {
        info!("Stopping API server");
        if let Err(e) = handle.shutdown().await {
            warn!("Failed to stop API server gracefully: {}", e);
        } else {
            info!("API server stopped successfully");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AnswerRecord, SeedData, VoteRecord};
    use chrono::TimeZone;

    fn seeded_store() -> Store {
        let answers = vec![
            AnswerRecord {
                answer_id: "a-1".to_string(),
                question_id: "q-1".to_string(),
                author_id: "u-1".to_string(),
                body: "first".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
            },
            AnswerRecord {
                answer_id: "a-2".to_string(),
                question_id: "q-1".to_string(),
                author_id: "u-2".to_string(),
                body: "second".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 11, 0, 0).unwrap(),
            },
            AnswerRecord {
                answer_id: "a-3".to_string(),
                question_id: "q-other".to_string(),
                author_id: "u-1".to_string(),
                body: "other question".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
            },
        ];
        let votes = vec![
            VoteRecord {
                vote_id: "v-1".to_string(),
                answer_id: Some("a-2".to_string()),
                is_positive: Some(true),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
                created_by_id: Some("u-1".to_string()),
            },
            VoteRecord {
                vote_id: "v-2".to_string(),
                answer_id: Some("a-3".to_string()),
                is_positive: Some(true),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
                created_by_id: Some("u-1".to_string()),
            },
        ];
        Store::from_seed(SeedData {
            answers,
            votes,
            users: vec![],
        })
    }

    #[test]
    fn refresh_view_ranks_only_the_selected_question() {
        let store = seeded_store();
        let view = ViewSelection {
            question_id: "q-1".to_string(),
            sort_by: SortMode::Best,
        };

        let ranked_view = refresh_view(&store, &view, 100).expect("refresh");

        assert_eq!(ranked_view.question_id, "q-1");
        assert_eq!(ranked_view.sort_by, SortMode::Best);
        assert_eq!(ranked_view.answers.len(), 2);
        assert_eq!(ranked_view.answers[0].answer.answer_id, "a-2");
        assert_eq!(ranked_view.answers[0].vote_rate, 1);
        assert_eq!(ranked_view.answers[1].vote_rate, 0);
    }

    #[test]
    fn refresh_view_truncates_to_max_answers() {
        let store = seeded_store();
        let view = ViewSelection {
            question_id: "q-1".to_string(),
            sort_by: SortMode::Best,
        };

        let ranked_view = refresh_view(&store, &view, 1).expect("refresh");

        assert_eq!(ranked_view.answers.len(), 1);
        assert_eq!(ranked_view.answers[0].answer.answer_id, "a-2");
    }

    #[test]
    fn refresh_view_on_unknown_question_is_empty() {
        let store = seeded_store();
        let view = ViewSelection {
            question_id: "q-none".to_string(),
            sort_by: SortMode::Time,
        };

        let ranked_view = refresh_view(&store, &view, 100).expect("refresh");
        assert!(ranked_view.answers.is_empty());
    }

    #[test]
    fn feed_stats_track_ticks_and_averages() {
        let mut stats = FeedStats::new();
        assert_eq!(stats.average_tick_duration_ms(), 0.0);

        stats.record_successful_tick(100, 5);
        stats.record_successful_tick(200, 7);
        stats.record_error_tick();

        assert_eq!(stats.total_ticks(), 3);
        assert_eq!(stats.successful_ticks(), 2);
        assert_eq!(stats.error_ticks(), 1);
        assert_eq!(stats.average_tick_duration_ms(), 150.0);
    }
}
