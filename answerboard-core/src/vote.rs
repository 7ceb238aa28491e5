//! Приём голоса пользователя.
//!
//! Единственный побочный эффект системы: добавление записи голоса в
//! хранилище. Движок ранжирования этот модуль не вызывает — новый голос
//! попадает в опубликованный список на следующем тике ленты.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{Store, VoteRecord};

/// Итог приёма голоса.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Голос записан в хранилище.
    Accepted { vote_id: String },
    /// Пользователь не указан; голос проигнорирован.
    IgnoredUnauthenticated,
    /// Указанный пользователь неизвестен хранилищу; голос проигнорирован.
    IgnoredUnknownUser,
}

/// Принять голос за или против ответа.
///
/// Неаутентифицированные попытки (без `user_id` или с неизвестным
/// `user_id`) — no-op: запись не создаётся, итог сообщает причину.
/// Существование ответа не проверяется: голос за неизвестный ответ
/// сохраняется, но лента отфильтрует его при снятии снимка.
pub fn submit_vote(
    store: &Store,
    user_id: Option<&str>,
    answer_id: &str,
    is_positive: bool,
) -> Result<VoteOutcome> {
    let user_id = match user_id {
        Some(id) => id,
        None => {
            debug!("Ignoring unauthenticated vote for answer {}", answer_id);
            return Ok(VoteOutcome::IgnoredUnauthenticated);
        }
    };

    if !store.user_exists(user_id)? {
        warn!(
            "Ignoring vote for answer {} from unknown user {}",
            answer_id, user_id
        );
        return Ok(VoteOutcome::IgnoredUnknownUser);
    }

    let vote = VoteRecord {
        vote_id: Uuid::new_v4().to_string(),
        answer_id: Some(answer_id.to_string()),
        is_positive: Some(is_positive),
        created_at: Utc::now(),
        created_by_id: Some(user_id.to_string()),
    };
    let vote_id = vote.vote_id.clone();
    store.insert_vote(vote)?;

    debug!(
        "Recorded vote {} for answer {} (is_positive = {})",
        vote_id, answer_id, is_positive
    );
    Ok(VoteOutcome::Accepted { vote_id })
}
