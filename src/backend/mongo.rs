//! Document-store adapter backed by MongoDB.
//!
//! Each record becomes one nested document in a single collection; writes
//! use unordered `insert_many` so a duplicate `tweet_id` only rejects that
//! document.

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::conf::MongoConfig;
use crate::core::BackendError;
use crate::dataset::{Record, Sentiment};

use super::{BackendKind, BatchWrite, Connector, QueryClass, QueryParams, RecordError, Session};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDoc {
    pub username: String,
    pub flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentDoc {
    pub original_text: String,
    pub cleaned_text: String,
    pub original_sentiment: Option<Sentiment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentDoc {
    pub target: i32,
    pub textblob_sentiment: Sentiment,
    pub vader_sentiment: Sentiment,
    pub textblob_polarity: f64,
    pub vader_compound: f64,
}

/// Stored shape of one tweet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TweetDocument {
    pub tweet_id: i64,
    pub date: String,
    pub user: UserDoc,
    pub content: ContentDoc,
    pub sentiment_analysis: SentimentDoc,
}

impl From<&Record> for TweetDocument {
    fn from(record: &Record) -> Self {
        Self {
            tweet_id: record.tweet_id,
            date: record.date.clone(),
            user: UserDoc {
                username: record.username.clone(),
                flag: record.flag.clone(),
            },
            content: ContentDoc {
                original_text: record.text.clone(),
                cleaned_text: record.cleaned_text.clone(),
                original_sentiment: record.original_sentiment,
            },
            sentiment_analysis: SentimentDoc {
                target: record.target,
                textblob_sentiment: record.textblob_sentiment,
                vader_sentiment: record.vader_sentiment,
                textblob_polarity: record.textblob_polarity,
                vader_compound: record.vader_compound,
            },
        }
    }
}

pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    pub fn new(config: MongoConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Session = MongoSession;

    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn target(&self) -> String {
        redact_uri(&self.config.uri)
    }

    async fn connect(&self) -> Result<MongoSession, BackendError> {
        let mut options = ClientOptions::parse(&self.config.uri).await.map_err(classify)?;
        options.server_selection_timeout = Some(self.config.server_selection_timeout);
        options.connect_timeout = Some(self.config.server_selection_timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options).map_err(classify)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(classify)?;

        let collection = client
            .database(&self.config.database)
            .collection::<TweetDocument>(&self.config.collection);

        Ok(MongoSession {
            client,
            database: self.config.database.clone(),
            collection,
        })
    }
}

pub struct MongoSession {
    client: Client,
    database: String,
    collection: Collection<TweetDocument>,
}

impl MongoSession {
    fn raw(&self) -> Collection<Document> {
        self.collection.clone_with_type::<Document>()
    }
}

#[async_trait]
impl Session for MongoSession {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    async fn reset(&mut self) -> Result<(), BackendError> {
        self.client
            .database(&self.database)
            .drop()
            .await
            .map_err(classify)?;

        // Duplicate ids must be rejected per document while loading, so the
        // unique key exists before the first batch.
        let unique_id = IndexModel::builder()
            .keys(doc! { "tweet_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(unique_id).await.map_err(classify)?;
        Ok(())
    }

    async fn insert_batch(&mut self, records: &[Record]) -> Result<BatchWrite, BackendError> {
        if records.is_empty() {
            return Ok(BatchWrite::default());
        }
        let docs: Vec<TweetDocument> = records.iter().map(TweetDocument::from).collect();

        match self.collection.insert_many(docs).ordered(false).await {
            Ok(result) => Ok(BatchWrite {
                inserted: result.inserted_ids.len(),
                errors: Vec::new(),
            }),
            Err(err) => partial_write(records, err),
        }
    }

    async fn finalize(&mut self) -> Result<(), BackendError> {
        let models: Vec<IndexModel> = secondary_indexes()
            .into_iter()
            .map(|keys| IndexModel::builder().keys(keys).build())
            .collect();
        self.collection.create_indexes(models).await.map_err(classify)?;
        Ok(())
    }

    async fn execute(&mut self, class: QueryClass, params: &QueryParams) -> Result<u64, BackendError> {
        let raw = self.raw();
        let mut cursor = match class {
            QueryClass::Simple => raw
                .find(doc! { "sentiment_analysis.target": params.target })
                .limit(params.limit)
                .await
                .map_err(classify)?,
            QueryClass::TextSearch => raw
                .find(doc! { "$text": { "$search": params.search_term.as_str() } })
                .limit(params.limit)
                .await
                .map_err(classify)?,
            QueryClass::Aggregation => raw
                .aggregate([doc! {
                    "$group": {
                        "_id": "$sentiment_analysis.target",
                        "count": { "$sum": 1 },
                        "avg_vader_compound": { "$avg": "$sentiment_analysis.vader_compound" },
                    }
                }])
                .await
                .map_err(classify)?,
            QueryClass::Join => raw
                .aggregate([
                    doc! {
                        "$lookup": {
                            "from": "users",
                            "localField": "user.username",
                            "foreignField": "username",
                            "as": "user_details",
                        }
                    },
                    doc! { "$limit": params.limit },
                ])
                .await
                .map_err(classify)?,
        };

        let mut rows = 0u64;
        while let Some(doc) = cursor.next().await {
            doc.map_err(classify)?;
            rows += 1;
        }
        Ok(rows)
    }

    async fn count(&mut self) -> Result<u64, BackendError> {
        self.collection
            .count_documents(doc! {})
            .await
            .map_err(classify)
    }

    async fn close(self) -> Result<(), BackendError> {
        self.client.shutdown().await;
        Ok(())
    }
}

/// Indexes built after loading. The unique `tweet_id` index is created by
/// `reset` instead.
fn secondary_indexes() -> Vec<Document> {
    vec![
        doc! { "date": 1 },
        doc! { "user.username": 1 },
        doc! { "sentiment_analysis.target": 1 },
        doc! { "content.cleaned_text": "text" },
    ]
}

/// Turn an unordered `insert_many` failure into per-record errors. Only
/// write errors are recoverable; anything else fails the batch.
fn partial_write(records: &[Record], err: MongoError) -> Result<BatchWrite, BackendError> {
    let write_errors = match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure.write_errors.clone(),
        _ => None,
    };
    let Some(write_errors) = write_errors else {
        return Err(classify(err));
    };

    let errors: Vec<RecordError> = write_errors
        .into_iter()
        .map(|e| RecordError {
            index: e.index,
            tweet_id: records.get(e.index).map(|r| r.tweet_id).unwrap_or_default(),
            reason: format!("E{}: {}", e.code, e.message),
        })
        .collect();

    // Inserted ids of a failed insert_many are not exposed by the driver;
    // unordered writes store every document without a write error.
    Ok(BatchWrite {
        inserted: records.len().saturating_sub(errors.len()),
        errors,
    })
}

fn classify(err: MongoError) -> BackendError {
    let message = err.to_string();
    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => BackendError::Auth(message),
        ErrorKind::ServerSelection { .. } => BackendError::Timeout(message),
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            BackendError::Timeout(message)
        }
        ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
            BackendError::Network(message)
        }
        ErrorKind::InvalidArgument { .. } => BackendError::Other(message),
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) => BackendError::Rejected(message),
        ErrorKind::Command(_) => BackendError::Query(message),
        _ => BackendError::Other(message),
    }
}

/// Strip userinfo from a connection string before it reaches the logs.
fn redact_uri(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &uri[..scheme_end], &uri[at + 1..])
        }
        _ => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            tweet_id: 99,
            target: 0,
            date: "2009-04-06 22:19:45".to_string(),
            username: "bob".to_string(),
            flag: "NO_QUERY".to_string(),
            text: "worst day ever".to_string(),
            cleaned_text: "worst day ever".to_string(),
            original_sentiment: Some(Sentiment::Negative),
            textblob_sentiment: Sentiment::Negative,
            vader_sentiment: Sentiment::Negative,
            textblob_polarity: -1.0,
            vader_compound: -0.6249,
            comparison_textblob: true,
            comparison_vader: true,
        }
    }

    #[test]
    fn test_document_shape() {
        let doc = mongodb::bson::to_document(&TweetDocument::from(&record())).unwrap();
        assert_eq!(doc.get_i64("tweet_id").unwrap(), 99);
        let user = doc.get_document("user").unwrap();
        assert_eq!(user.get_str("username").unwrap(), "bob");
        let sentiment = doc.get_document("sentiment_analysis").unwrap();
        assert_eq!(sentiment.get_i32("target").unwrap(), 0);
        assert_eq!(sentiment.get_str("vader_sentiment").unwrap(), "negative");
        let content = doc.get_document("content").unwrap();
        assert_eq!(content.get_str("original_sentiment").unwrap(), "negative");
    }

    #[test]
    fn test_secondary_indexes_skip_unique_key() {
        let indexes = secondary_indexes();
        assert_eq!(indexes.len(), 4);
        assert!(indexes.iter().all(|keys| !keys.contains_key("tweet_id")));
    }

    #[test]
    fn test_redact_uri() {
        assert_eq!(
            redact_uri("mongodb://admin:secret@db:27017/"),
            "mongodb://***@db:27017/"
        );
        assert_eq!(redact_uri("mongodb://localhost:27017/"), "mongodb://localhost:27017/");
    }
}
