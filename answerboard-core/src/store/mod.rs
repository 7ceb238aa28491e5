//! Хранилище ответов, голосов и пользователей.
//!
//! Хранилище in-memory: записи живут только в памяти процесса и
//! загружаются при старте из seed-файла (JSON). Лента и API разделяют
//! один экземпляр через `Arc<Store>`; внутри — `RwLock`, так что
//! каждый тик ленты работает с согласованным снимком данных.

use std::collections::HashSet;
use std::fs;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Идентификатор ответа.
pub type AnswerId = String;

/// Идентификатор пользователя.
pub type UserId = String;

/// Ответ на вопрос. Неизменяем после появления в хранилище.
///
/// Поля `author_id` и `body` непрозрачны для ранжирования: движок копирует
/// их в результат, не интерпретируя.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer_id: AnswerId,
    pub question_id: String,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Голос за или против ответа. Неизменяем после создания.
///
/// `answer_id` и `is_positive` опциональны: записи внешнего хранилища
/// приходят слабо типизированными, и голос может оказаться без ссылки
/// на ответ или без пригодного флага. Политику обработки таких записей
/// определяет агрегация (`crate::ranking::rate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub vote_id: String,
    #[serde(default)]
    pub answer_id: Option<AnswerId>,
    #[serde(default)]
    pub is_positive: Option<bool>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by_id: Option<UserId>,
}

/// Пользователь. Используется только для проверки аутентификации голоса.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub display_name: String,
}

/// Начальные данные хранилища, загружаемые из JSON-файла.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Default)]
struct StoreInner {
    answers: Vec<AnswerRecord>,
    votes: Vec<VoteRecord>,
    users: Vec<UserRecord>,
}

/// In-memory хранилище записей.
///
/// Все методы возвращают копии записей: вызывающая сторона получает
/// снимок, который остаётся валидным на время одного вычисления,
/// независимо от последующих вставок.
#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    /// Создать пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }

    /// Создать хранилище из начальных данных.
    pub fn from_seed(seed: SeedData) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                answers: seed.answers,
                votes: seed.votes,
                users: seed.users,
            }),
        }
    }

    /// Загрузить начальные данные из JSON-файла.
    pub fn load_seed(path: &str) -> Result<SeedData> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read seed data from {path}"))?;
        let seed: SeedData = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse JSON seed data at {path}"))?;
        Ok(seed)
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("answer store lock poisoned"))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("answer store lock poisoned"))
    }

    /// Ответы на заданный вопрос.
    pub fn answers_for_question(&self, question_id: &str) -> Result<Vec<AnswerRecord>> {
        let inner = self.read_inner()?;
        Ok(inner
            .answers
            .iter()
            .filter(|answer| answer.question_id == question_id)
            .cloned()
            .collect())
    }

    /// Голоса, относящиеся к заданному множеству ответов.
    ///
    /// Голоса без `answer_id` и голоса за ответы вне множества не попадают
    /// в результат: лента отдаёт движку только голоса текущего вопроса.
    pub fn votes_for_answers(&self, answer_ids: &HashSet<AnswerId>) -> Result<Vec<VoteRecord>> {
        let inner = self.read_inner()?;
        Ok(inner
            .votes
            .iter()
            .filter(|vote| {
                vote.answer_id
                    .as_ref()
                    .map(|id| answer_ids.contains(id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    /// Добавить ответ.
    pub fn insert_answer(&self, answer: AnswerRecord) -> Result<()> {
        self.write_inner()?.answers.push(answer);
        Ok(())
    }

    /// Добавить голос.
    pub fn insert_vote(&self, vote: VoteRecord) -> Result<()> {
        self.write_inner()?.votes.push(vote);
        Ok(())
    }

    /// Добавить пользователя.
    pub fn insert_user(&self, user: UserRecord) -> Result<()> {
        self.write_inner()?.users.push(user);
        Ok(())
    }

    /// Проверить, существует ли пользователь.
    pub fn user_exists(&self, user_id: &str) -> Result<bool> {
        let inner = self.read_inner()?;
        Ok(inner.users.iter().any(|user| user.user_id == user_id))
    }

    /// Количество ответов в хранилище.
    pub fn answer_count(&self) -> Result<usize> {
        Ok(self.read_inner()?.answers.len())
    }

    /// Количество голосов в хранилище.
    pub fn vote_count(&self) -> Result<usize> {
        Ok(self.read_inner()?.votes.len())
    }

    /// Количество пользователей в хранилище.
    pub fn user_count(&self) -> Result<usize> {
        Ok(self.read_inner()?.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn answer(answer_id: &str, question_id: &str) -> AnswerRecord {
        AnswerRecord {
            answer_id: answer_id.to_string(),
            question_id: question_id.to_string(),
            author_id: "u-1".to_string(),
            body: format!("answer {answer_id}"),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
        }
    }

    fn vote(vote_id: &str, answer_id: Option<&str>, is_positive: Option<bool>) -> VoteRecord {
        VoteRecord {
            vote_id: vote_id.to_string(),
            answer_id: answer_id.map(str::to_string),
            is_positive,
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 11, 0, 0).unwrap(),
            created_by_id: Some("u-1".to_string()),
        }
    }

    #[test]
    fn filters_answers_by_question() {
        let store = Store::from_seed(SeedData {
            answers: vec![
                answer("a-1", "q-1"),
                answer("a-2", "q-2"),
                answer("a-3", "q-1"),
            ],
            votes: vec![],
            users: vec![],
        });

        let answers = store.answers_for_question("q-1").expect("answers");
        let ids: Vec<&str> = answers.iter().map(|a| a.answer_id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-3"]);
    }

    #[test]
    fn filters_votes_to_the_given_answer_set() {
        let store = Store::from_seed(SeedData {
            answers: vec![],
            votes: vec![
                vote("v-1", Some("a-1"), Some(true)),
                vote("v-2", Some("a-9"), Some(true)),
                vote("v-3", None, Some(false)),
                vote("v-4", Some("a-2"), None),
            ],
            users: vec![],
        });

        let ids: HashSet<AnswerId> = ["a-1", "a-2"].iter().map(|s| s.to_string()).collect();
        let votes = store.votes_for_answers(&ids).expect("votes");
        let vote_ids: Vec<&str> = votes.iter().map(|v| v.vote_id.as_str()).collect();
        assert_eq!(vote_ids, vec!["v-1", "v-4"]);
    }

    #[test]
    fn insert_and_count() {
        let store = Store::new();
        assert_eq!(store.answer_count().unwrap(), 0);

        store.insert_answer(answer("a-1", "q-1")).expect("insert");
        store
            .insert_vote(vote("v-1", Some("a-1"), Some(true)))
            .expect("insert");
        store
            .insert_user(UserRecord {
                user_id: "u-1".to_string(),
                display_name: "Ann".to_string(),
            })
            .expect("insert");

        assert_eq!(store.answer_count().unwrap(), 1);
        assert_eq!(store.vote_count().unwrap(), 1);
        assert_eq!(store.user_count().unwrap(), 1);
        assert!(store.user_exists("u-1").unwrap());
        assert!(!store.user_exists("u-2").unwrap());
    }

    #[test]
    fn loads_seed_with_missing_optional_vote_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(
            br#"{
                "answers": [
                    {
                        "answer_id": "a-1",
                        "question_id": "q-1",
                        "author_id": "u-1",
                        "body": "first",
                        "created_at": "2026-08-01T10:00:00Z"
                    }
                ],
                "votes": [
                    {
                        "vote_id": "v-1",
                        "created_at": "2026-08-01T11:00:00Z"
                    }
                ]
            }"#,
        )
        .expect("write seed");

        let seed = Store::load_seed(file.path().to_str().unwrap()).expect("seed loads");
        assert_eq!(seed.answers.len(), 1);
        assert_eq!(seed.votes.len(), 1);
        assert!(seed.users.is_empty());
        assert_eq!(seed.votes[0].answer_id, None);
        assert_eq!(seed.votes[0].is_positive, None);
        assert_eq!(seed.votes[0].created_by_id, None);
    }

    #[test]
    fn seed_load_errors_include_path_when_file_is_missing() {
        let missing_path = "/non/existent/seed.json";
        let err = Store::load_seed(missing_path).unwrap_err();
        let message = err.to_string();

        assert!(message.contains(missing_path), "message was: {message}");
        assert!(
            message.contains("failed to read seed data"),
            "unexpected message: {message}"
        );
    }
}
