//! HTTP API для просмотра ранжированных ответов и приёма голосов.
//!
//! Модуль предоставляет REST API поверх состояния ленты: опубликованный
//! список ответов, смена текущего вопроса и режима сортировки, приём
//! голосов и статистика работы ленты.

mod server;

pub use server::{ApiServer, ApiServerHandle, ApiState};
