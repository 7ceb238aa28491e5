//! Режимы сортировки и выбор компаратора.
//!
//! Режим сортировки — исчерпывающий enum: каждому варианту соответствует
//! явный компаратор, и неопределённого компаратора не существует.
//! Строковые ключи (конфиг, API) проходят через `FromStr`, и неизвестный
//! ключ — это ошибка `InvalidSortMode`, а не молчаливый дефолт.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RankingError;
use crate::ranking::rate::RankedAnswer;

/// Режим сортировки ранжированных ответов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// По времени создания, новые первыми.
    Time,
    /// По рейтингу, лучшие первыми.
    Best,
    /// По рейтингу, худшие первыми.
    Worst,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Time
    }
}

impl SortMode {
    /// Строковое представление режима для логирования и API.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Time => "time",
            SortMode::Best => "best",
            SortMode::Worst => "worst",
        }
    }
}

impl FromStr for SortMode {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(SortMode::Time),
            "best" => Ok(SortMode::Best),
            "worst" => Ok(SortMode::Worst),
            other => Err(RankingError::InvalidSortMode(other.to_string())),
        }
    }
}

/// Компаратор для заданного режима сортировки.
pub fn comparator(sort_by: SortMode) -> fn(&RankedAnswer, &RankedAnswer) -> Ordering {
    match sort_by {
        SortMode::Time => |a, b| b.answer.created_at.cmp(&a.answer.created_at),
        SortMode::Best => |a, b| b.vote_rate.cmp(&a.vote_rate),
        SortMode::Worst => |a, b| a.vote_rate.cmp(&b.vote_rate),
    }
}

/// Отсортировать ранжированные ответы по заданному режиму.
///
/// Сортировка стабильная: ответы с равным ключом сохраняют взаимный
/// порядок входа.
pub fn sort_ranked(ranked: &mut [RankedAnswer], sort_by: SortMode) {
    ranked.sort_by(comparator(sort_by));
}
