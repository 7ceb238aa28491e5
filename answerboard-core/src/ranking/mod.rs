//! Движок ранжирования ответов.
//!
//! Две чистые стадии поверх снимка данных: агрегация голосов в рейтинг
//! по каждому ответу (`rate`) и упорядочивание аннотированных ответов
//! по выбранному режиму (`sort`). Движок синхронный, без состояния и
//! побочных эффектов: на каждом обновлении он вызывается заново с полным
//! снимком и возвращает новую последовательность.

pub mod rate;
pub mod sort;

pub use rate::{aggregate_vote_rates, annotate_answers, RankedAnswer, VoteAggregation};
pub use sort::{comparator, sort_ranked, SortMode};

use crate::store::{AnswerRecord, VoteRecord};

/// Построить ранжированный список ответов.
///
/// Композиция стадий: агрегировать голоса, слить рейтинги с ответами,
/// отсортировать по режиму. Входные коллекции не изменяются; результат —
/// новая последовательность, по одной записи на каждый входной ответ.
/// Вычисление детерминировано и идемпотентно: повторный вызов с теми же
/// входами даёт идентичный результат.
pub fn rank_answers(
    answers: &[AnswerRecord],
    votes: &[VoteRecord],
    sort_by: SortMode,
) -> Vec<RankedAnswer> {
    let aggregation = aggregate_vote_rates(votes);
    let mut ranked = annotate_answers(answers, &aggregation.rates);
    sort_ranked(&mut ranked, sort_by);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::prelude::*;

    fn answer(answer_id: &str, created_at_hour: u32) -> AnswerRecord {
        AnswerRecord {
            answer_id: answer_id.to_string(),
            question_id: "q-1".to_string(),
            author_id: "u-1".to_string(),
            body: format!("answer {answer_id}"),
            created_at: Utc
                .with_ymd_and_hms(2026, 8, 1, created_at_hour, 0, 0)
                .unwrap(),
        }
    }

    fn vote(answer_id: &str, is_positive: bool) -> VoteRecord {
        VoteRecord {
            vote_id: format!("v-{answer_id}"),
            answer_id: Some(answer_id.to_string()),
            is_positive: Some(is_positive),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
            created_by_id: Some("u-1".to_string()),
        }
    }

    fn ids(ranked: &[RankedAnswer]) -> Vec<&str> {
        ranked.iter().map(|r| r.answer.answer_id.as_str()).collect()
    }

    #[test]
    fn two_answers_with_mixed_votes_rank_as_expected() {
        let answers = vec![answer("a-1", 1), answer("a-2", 2)];
        let votes = vec![vote("a-1", true), vote("a-1", true), vote("a-2", false)];

        let best = rank_answers(&answers, &votes, SortMode::Best);
        assert_eq!(ids(&best), vec!["a-1", "a-2"]);
        assert_eq!(best[0].vote_rate, 2);
        assert_eq!(best[1].vote_rate, -1);

        let worst = rank_answers(&answers, &votes, SortMode::Worst);
        assert_eq!(ids(&worst), vec!["a-2", "a-1"]);

        let time = rank_answers(&answers, &votes, SortMode::Time);
        assert_eq!(ids(&time), vec!["a-2", "a-1"]);
    }

    #[test]
    fn answers_without_votes_rate_zero() {
        let answers = vec![answer("a-1", 1), answer("a-2", 2)];
        let votes = vec![vote("a-1", true)];

        let ranked = rank_answers(&answers, &votes, SortMode::Best);

        assert_eq!(ranked[0].vote_rate, 1);
        assert_eq!(ranked[1].vote_rate, 0);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let answers = vec![answer("a-1", 1), answer("a-2", 2)];
        let votes = vec![vote("a-2", true)];
        let answers_before = answers.clone();
        let votes_before = votes.clone();

        let _ = rank_answers(&answers, &votes, SortMode::Best);

        assert_eq!(answers, answers_before);
        assert_eq!(votes, votes_before);
    }

    #[test]
    fn best_is_non_increasing_and_worst_non_decreasing_on_random_input() {
        let mut rng = StdRng::seed_from_u64(42);
        let answers: Vec<AnswerRecord> = (0..50)
            .map(|i| answer(&format!("a-{i}"), rng.gen_range(0..24)))
            .collect();
        let votes: Vec<VoteRecord> = (0..500)
            .map(|_| vote(&format!("a-{}", rng.gen_range(0..60)), rng.gen_bool(0.5)))
            .collect();

        let best = rank_answers(&answers, &votes, SortMode::Best);
        assert!(best.windows(2).all(|w| w[0].vote_rate >= w[1].vote_rate));

        let worst = rank_answers(&answers, &votes, SortMode::Worst);
        assert!(worst.windows(2).all(|w| w[0].vote_rate <= w[1].vote_rate));

        let time = rank_answers(&answers, &votes, SortMode::Time);
        assert!(time
            .windows(2)
            .all(|w| w[0].answer.created_at >= w[1].answer.created_at));
    }

    #[test]
    fn ranking_is_idempotent_on_random_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let answers: Vec<AnswerRecord> = (0..30)
            .map(|i| answer(&format!("a-{i}"), rng.gen_range(0..24)))
            .collect();
        let votes: Vec<VoteRecord> = (0..200)
            .map(|_| vote(&format!("a-{}", rng.gen_range(0..30)), rng.gen_bool(0.5)))
            .collect();

        for sort_by in [SortMode::Time, SortMode::Best, SortMode::Worst] {
            let first = rank_answers(&answers, &votes, sort_by);
            let second = rank_answers(&answers, &votes, sort_by);
            assert_eq!(first, second, "sort mode {}", sort_by.as_str());
        }
    }
}
