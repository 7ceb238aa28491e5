//! Типы ошибок ранжирования.
//!
//! Ошибки вычисления чистые и детерминированные: повторный вызов с теми же
//! входными данными даёт ту же ошибку, поэтому retry не имеет смысла.

use thiserror::Error;

/// Ошибка ранжирования, возвращаемая вызывающей стороне синхронно.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    /// Неизвестный режим сортировки.
    ///
    /// Возникает на границе, где режим приходит строкой (конфиг, API).
    /// Никогда не подменяется дефолтной сортировкой.
    #[error("unknown sort mode `{0}`, expected one of: time, best, worst")]
    InvalidSortMode(String),
}
