//! Relational-store adapter backed by PostgreSQL.
//!
//! A record is split across `users`, `tweets` and `sentiment_analysis`.
//! One batch is one transaction of three array-parameter statements.

use std::collections::HashSet;
use std::error::Error as _;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

use crate::conf::PostgresConfig;
use crate::core::BackendError;
use crate::dataset::Record;

use super::{BackendKind, BatchWrite, Connector, QueryClass, QueryParams, RecordError, Session};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `users.username` and `users.flag` are `VARCHAR(50)`.
const MAX_VARCHAR_LEN: usize = 50;

const DROP_SCHEMA: &str = "
    DROP TABLE IF EXISTS sentiment_analysis, tweets, users CASCADE;
";

const CREATE_SCHEMA: &str = "
    CREATE TABLE users (
        user_id SERIAL PRIMARY KEY,
        username VARCHAR(50) NOT NULL,
        flag VARCHAR(50),
        UNIQUE(username)
    );

    CREATE TABLE tweets (
        tweet_id BIGINT PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id),
        date TIMESTAMP NOT NULL,
        original_text TEXT NOT NULL,
        cleaned_text TEXT,
        original_sentiment VARCHAR(20)
    );

    CREATE TABLE sentiment_analysis (
        sentiment_id SERIAL PRIMARY KEY,
        tweet_id BIGINT REFERENCES tweets(tweet_id),
        target INTEGER NOT NULL,
        textblob_sentiment VARCHAR(20),
        vader_sentiment VARCHAR(20),
        textblob_polarity FLOAT,
        vader_compound FLOAT,
        comparison_textblob BOOLEAN,
        comparison_vader BOOLEAN
    );

    CREATE INDEX idx_tweet_date ON tweets(date);
    CREATE INDEX idx_tweet_user ON tweets(user_id);
    CREATE INDEX idx_tweet_cleaned_text ON tweets USING gin(to_tsvector('english', cleaned_text));
    CREATE INDEX idx_sentiment_tweet ON sentiment_analysis(tweet_id);
    CREATE INDEX idx_sentiment_target ON sentiment_analysis(target);
";

const INSERT_USERS: &str = "
    INSERT INTO users (username, flag)
    SELECT * FROM UNNEST($1::text[], $2::text[])
    ON CONFLICT (username) DO NOTHING
";

const INSERT_TWEETS: &str = "
    INSERT INTO tweets (tweet_id, user_id, date, original_text, cleaned_text, original_sentiment)
    SELECT t.tweet_id, u.user_id, t.date, t.original_text, t.cleaned_text, t.original_sentiment
    FROM UNNEST($1::bigint[], $2::text[], $3::timestamp[], $4::text[], $5::text[], $6::text[])
        AS t(tweet_id, username, date, original_text, cleaned_text, original_sentiment)
    LEFT JOIN users u ON u.username = t.username
    ON CONFLICT (tweet_id) DO NOTHING
    RETURNING tweet_id
";

const INSERT_SENTIMENT: &str = "
    INSERT INTO sentiment_analysis (tweet_id, target, textblob_sentiment, vader_sentiment,
        textblob_polarity, vader_compound, comparison_textblob, comparison_vader)
    SELECT * FROM UNNEST($1::bigint[], $2::int[], $3::text[], $4::text[],
        $5::float8[], $6::float8[], $7::bool[], $8::bool[])
";

const SELECT_SIMPLE: &str = "
    SELECT * FROM tweets t
    JOIN sentiment_analysis s ON t.tweet_id = s.tweet_id
    WHERE s.target = $1
    LIMIT $2
";

const SELECT_TEXT_SEARCH: &str = "
    SELECT * FROM tweets
    WHERE to_tsvector('english', cleaned_text) @@ plainto_tsquery('english', $1)
    LIMIT $2
";

const SELECT_AGGREGATION: &str = "
    SELECT target, COUNT(*), AVG(vader_compound)
    FROM sentiment_analysis
    GROUP BY target
";

const SELECT_JOIN: &str = "
    SELECT t.*, u.*, s.*
    FROM tweets t
    JOIN users u ON t.user_id = u.user_id
    JOIN sentiment_analysis s ON t.tweet_id = s.tweet_id
    LIMIT $1
";

pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    type Session = PostgresSession;

    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn target(&self) -> String {
        self.config.target()
    }

    async fn connect(&self) -> Result<PostgresSession, BackendError> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.user)
            .password(&self.config.password)
            .dbname(&self.config.dbname)
            .connect_timeout(self.config.connect_timeout)
            .application_name(env!("CARGO_PKG_NAME"));

        let (client, connection) = pg.connect(NoTls).await.map_err(classify)?;
        let driver = tokio::spawn(connection);

        client.simple_query("SELECT 1").await.map_err(classify)?;
        Ok(PostgresSession { client, driver })
    }
}

pub struct PostgresSession {
    client: Client,
    driver: JoinHandle<Result<(), tokio_postgres::Error>>,
}

/// A record that passed client-side validation, with its parsed date.
struct Accepted<'a> {
    index: usize,
    record: &'a Record,
    date: NaiveDateTime,
}

/// Reject records whose values cannot be stored. These become per-record
/// errors instead of failing the whole statement.
fn validate(records: &[Record]) -> (Vec<Accepted<'_>>, Vec<RecordError>) {
    let mut accepted = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match check(record) {
            Ok(date) => accepted.push(Accepted { index, record, date }),
            Err(reason) => errors.push(RecordError {
                index,
                tweet_id: record.tweet_id,
                reason,
            }),
        }
    }
    (accepted, errors)
}

fn check(record: &Record) -> Result<NaiveDateTime, String> {
    let text_fields = [
        ("username", &record.username),
        ("flag", &record.flag),
        ("text", &record.text),
        ("cleaned_text", &record.cleaned_text),
        ("date", &record.date),
    ];
    // PostgreSQL text cannot hold NUL (SQLSTATE 22021).
    if let Some((name, _)) = text_fields.iter().find(|(_, value)| value.contains('\0')) {
        return Err(format!("{name} contains a NUL byte"));
    }
    if record.username.chars().count() > MAX_VARCHAR_LEN {
        return Err(format!("username longer than {MAX_VARCHAR_LEN} characters"));
    }
    if record.flag.chars().count() > MAX_VARCHAR_LEN {
        return Err(format!("flag longer than {MAX_VARCHAR_LEN} characters"));
    }
    NaiveDateTime::parse_from_str(record.date.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}': {}", record.date, e))
}

#[async_trait]
impl Session for PostgresSession {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn reset(&mut self) -> Result<(), BackendError> {
        self.client.batch_execute(DROP_SCHEMA).await.map_err(classify)?;
        self.client.batch_execute(CREATE_SCHEMA).await.map_err(classify)
    }

    async fn insert_batch(&mut self, records: &[Record]) -> Result<BatchWrite, BackendError> {
        let (accepted, mut errors) = validate(records);
        if accepted.is_empty() {
            return Ok(BatchWrite { inserted: 0, errors });
        }

        let tx = self.client.transaction().await.map_err(classify)?;

        let mut seen_users = HashSet::new();
        let (usernames, flags): (Vec<&str>, Vec<&str>) = accepted
            .iter()
            .filter(|a| seen_users.insert(a.record.username.as_str()))
            .map(|a| (a.record.username.as_str(), a.record.flag.as_str()))
            .unzip();
        tx.execute(INSERT_USERS, &[&usernames, &flags])
            .await
            .map_err(classify)?;

        let ids: Vec<i64> = accepted.iter().map(|a| a.record.tweet_id).collect();
        let users: Vec<&str> = accepted.iter().map(|a| a.record.username.as_str()).collect();
        let dates: Vec<NaiveDateTime> = accepted.iter().map(|a| a.date).collect();
        let texts: Vec<&str> = accepted.iter().map(|a| a.record.text.as_str()).collect();
        let cleaned: Vec<&str> = accepted.iter().map(|a| a.record.cleaned_text.as_str()).collect();
        let originals: Vec<Option<&str>> = accepted
            .iter()
            .map(|a| a.record.original_sentiment.map(|s| s.as_str()))
            .collect();
        let rows = tx
            .query(INSERT_TWEETS, &[&ids, &users, &dates, &texts, &cleaned, &originals])
            .await
            .map_err(classify)?;
        let mut stored = HashSet::with_capacity(rows.len());
        for row in &rows {
            stored.insert(row.try_get::<_, i64>(0).map_err(classify)?);
        }

        // The first occurrence of a returned id owns the row; later ones
        // in the same batch, and ids not returned at all, were duplicates.
        let mut inserted = Vec::with_capacity(stored.len());
        for a in &accepted {
            if stored.remove(&a.record.tweet_id) {
                inserted.push(a);
            } else {
                errors.push(RecordError {
                    index: a.index,
                    tweet_id: a.record.tweet_id,
                    reason: "duplicate key value violates unique constraint \"tweets_pkey\"".into(),
                });
            }
        }

        if !inserted.is_empty() {
            let ids: Vec<i64> = inserted.iter().map(|a| a.record.tweet_id).collect();
            let targets: Vec<i32> = inserted.iter().map(|a| a.record.target).collect();
            let textblob: Vec<&str> = inserted
                .iter()
                .map(|a| a.record.textblob_sentiment.as_str())
                .collect();
            let vader: Vec<&str> = inserted.iter().map(|a| a.record.vader_sentiment.as_str()).collect();
            let polarity: Vec<f64> = inserted.iter().map(|a| a.record.textblob_polarity).collect();
            let compound: Vec<f64> = inserted.iter().map(|a| a.record.vader_compound).collect();
            let cmp_textblob: Vec<bool> = inserted.iter().map(|a| a.record.comparison_textblob).collect();
            let cmp_vader: Vec<bool> = inserted.iter().map(|a| a.record.comparison_vader).collect();
            tx.execute(
                INSERT_SENTIMENT,
                &[
                    &ids,
                    &targets,
                    &textblob,
                    &vader,
                    &polarity,
                    &compound,
                    &cmp_textblob,
                    &cmp_vader,
                ],
            )
            .await
            .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;

        errors.sort_by_key(|e| e.index);
        Ok(BatchWrite {
            inserted: inserted.len(),
            errors,
        })
    }

    async fn finalize(&mut self) -> Result<(), BackendError> {
        self.client.batch_execute("ANALYZE").await.map_err(classify)
    }

    async fn execute(&mut self, class: QueryClass, params: &QueryParams) -> Result<u64, BackendError> {
        let rows = match class {
            QueryClass::Simple => {
                self.client
                    .query(SELECT_SIMPLE, &[&params.target, &params.limit])
                    .await
            }
            QueryClass::TextSearch => {
                self.client
                    .query(SELECT_TEXT_SEARCH, &[&params.search_term, &params.limit])
                    .await
            }
            QueryClass::Aggregation => self.client.query(SELECT_AGGREGATION, &[]).await,
            QueryClass::Join => self.client.query(SELECT_JOIN, &[&params.limit]).await,
        }
        .map_err(classify)?;
        Ok(rows.len() as u64)
    }

    async fn count(&mut self) -> Result<u64, BackendError> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) FROM tweets", &[])
            .await
            .map_err(classify)?;
        let count: i64 = row.try_get(0).map_err(classify)?;
        Ok(count.max(0) as u64)
    }

    async fn close(self) -> Result<(), BackendError> {
        drop(self.client);
        // The driver resolves once the client is gone; an error here means
        // the connection broke before it could shut down cleanly.
        self.driver
            .await
            .map_err(|e| BackendError::Other(format!("connection task failed: {e}")))?
            .map_err(classify)
    }
}

fn classify(err: tokio_postgres::Error) -> BackendError {
    let message = err.to_string();
    if let Some(code) = err.code() {
        if *code == SqlState::INVALID_PASSWORD
            || *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION
        {
            return BackendError::Auth(message);
        }
        return BackendError::Query(message);
    }
    if err.is_closed() {
        return BackendError::Network(format!("connection closed: {message}"));
    }
    match err.source().and_then(|s| s.downcast_ref::<std::io::Error>()) {
        Some(io) if io.kind() == std::io::ErrorKind::TimedOut => BackendError::Timeout(message),
        Some(_) => BackendError::Network(message),
        None if message.contains("timeout") => BackendError::Timeout(message),
        None => BackendError::Other(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Sentiment;

    fn record(tweet_id: i64, date: &str, username: &str) -> Record {
        Record {
            tweet_id,
            target: 4,
            date: date.to_string(),
            username: username.to_string(),
            flag: "NO_QUERY".to_string(),
            text: "text".to_string(),
            cleaned_text: "text".to_string(),
            original_sentiment: Some(Sentiment::Positive),
            textblob_sentiment: Sentiment::Neutral,
            vader_sentiment: Sentiment::Neutral,
            textblob_polarity: 0.0,
            vader_compound: 0.0,
            comparison_textblob: false,
            comparison_vader: false,
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let records = vec![
            record(1, "2009-04-06 22:19:45", "alice"),
            record(2, "Mon Apr 06 22:19:45 PDT 2009", "bob"),
            record(3, "2009-04-06 22:19:49", &"x".repeat(51)),
        ];
        let (accepted, errors) = validate(&records);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].index, 0);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].tweet_id, 2);
        assert!(errors[0].reason.starts_with("invalid date"));
        assert_eq!(errors[1].tweet_id, 3);
        assert_eq!(errors[1].index, 2);
    }

    #[test]
    fn test_validate_rejects_nul_and_long_flag() {
        let mut nul_text = record(1, "2009-04-06 22:19:45", "alice");
        nul_text.text = "bad\0text".to_string();
        let mut nul_cleaned = record(2, "2009-04-06 22:19:45", "bob");
        nul_cleaned.cleaned_text = "\0".to_string();
        let mut long_flag = record(3, "2009-04-06 22:19:45", "carol");
        long_flag.flag = "F".repeat(51);
        let mut nul_flag = record(4, "2009-04-06 22:19:45", "dave");
        nul_flag.flag = "NO\0QUERY".to_string();
        let ok = record(5, "2009-04-06 22:19:45", "erin");

        let records = vec![nul_text, nul_cleaned, long_flag, nul_flag, ok];
        let (accepted, errors) = validate(&records);

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].record.tweet_id, 5);
        let rejected: Vec<i64> = errors.iter().map(|e| e.tweet_id).collect();
        assert_eq!(rejected, vec![1, 2, 3, 4]);
        assert_eq!(errors[0].reason, "text contains a NUL byte");
        assert_eq!(errors[1].reason, "cleaned_text contains a NUL byte");
        assert_eq!(errors[2].reason, "flag longer than 50 characters");
        assert_eq!(errors[3].reason, "flag contains a NUL byte");
    }
}
