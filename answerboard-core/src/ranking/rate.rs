//! Агрегация голосов и аннотация ответов рейтингом.
//!
//! Первая чистая стадия движка: свернуть коллекцию голосов в рейтинг
//! по каждому ответу и слить рейтинги с записями ответов. Обе функции
//! не трогают входные коллекции и строят новые записи.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{AnswerId, AnswerRecord, VoteRecord};

/// Ответ, аннотированный вычисленным рейтингом голосов.
///
/// Производная запись: никогда не сохраняется, пересчитывается на каждом
/// обновлении. Все поля исходного ответа копируются без изменений.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAnswer {
    #[serde(flatten)]
    pub answer: AnswerRecord,
    pub vote_rate: i64,
}

/// Результат агрегации голосов.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteAggregation {
    /// answer_id → чистый рейтинг (голоса «за» минус голоса «против»).
    /// Присутствуют только ответы, встретившиеся в коллекции голосов.
    pub rates: HashMap<AnswerId, i64>,
    /// Количество учтённых голосов.
    pub counted: usize,
    /// Голоса без `answer_id`, пропущенные при агрегации.
    pub skipped_missing_answer: usize,
}

/// Свернуть коллекцию голосов в рейтинг по каждому ответу.
///
/// Голос с `is_positive = Some(true)` даёт +1, любой другой (включая
/// `None`) даёт −1: недоозначенный голос считается голосом «против».
/// Голос без `answer_id` не относится ни к какому ответу и пропускается
/// целиком.
/// Результат не зависит от порядка голосов; пустой вход даёт пустую мапу.
pub fn aggregate_vote_rates(votes: &[VoteRecord]) -> VoteAggregation {
    let mut aggregation = VoteAggregation::default();

    for vote in votes {
        let answer_id = match &vote.answer_id {
            Some(id) => id,
            None => {
                aggregation.skipped_missing_answer += 1;
                continue;
            }
        };

        let delta = if vote.is_positive == Some(true) { 1 } else { -1 };
        *aggregation.rates.entry(answer_id.clone()).or_insert(0) += delta;
        aggregation.counted += 1;
    }

    if aggregation.skipped_missing_answer > 0 {
        debug!(
            "Skipped {} votes without answer_id during aggregation",
            aggregation.skipped_missing_answer
        );
    }

    aggregation
}

/// Слить рейтинги с записями ответов.
///
/// Возвращает по одной записи на каждый входной ответ в исходном порядке.
/// Ответ, отсутствующий в мапе рейтингов, получает `vote_rate = 0`.
pub fn annotate_answers(
    answers: &[AnswerRecord],
    rates: &HashMap<AnswerId, i64>,
) -> Vec<RankedAnswer> {
    answers
        .iter()
        .map(|answer| RankedAnswer {
            answer: answer.clone(),
            vote_rate: rates.get(&answer.answer_id).copied().unwrap_or(0),
        })
        .collect()
}
