//! Adapter tests against real servers. They need a Docker daemon, so they
//! are ignored by default: `cargo test --test containers -- --ignored`.

use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::postgres::Postgres;

use sentibench::backend::{
    Connector, MongoConnector, PostgresConnector, QueryClass, QueryParams, Session,
};
use sentibench::conf::{MongoConfig, PostgresConfig};
use sentibench::core::RunContext;
use sentibench::loader::BulkLoader;
use sentibench::testutil::generate_records;

async fn exercise<S: Session>(session: &mut S) {
    let ctx = RunContext::with_id("containers");
    let records = generate_records(120);
    let loader = BulkLoader::new(50, &ctx).unwrap();

    session.reset().await.unwrap();
    let mut first_load = records.clone();
    first_load.insert(60, records[3].clone());
    let outcome = loader.load(session, first_load).await.unwrap();
    assert_eq!(outcome.submitted, 121);
    assert_eq!(outcome.inserted, 120);
    assert_eq!(outcome.failed, 1);
    session.finalize().await.unwrap();
    assert_eq!(session.count().await.unwrap(), 120);

    let outcome = loader.load(session, records[..10].to_vec()).await.unwrap();
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.failed, 10);
    assert_eq!(session.count().await.unwrap(), 120);

    let params = QueryParams {
        search_term: "tweet".into(),
        ..QueryParams::default()
    };
    for class in QueryClass::ALL {
        let rows = session.execute(class, &params).await.unwrap();
        assert!(rows <= params.limit as u64, "{class:?} returned {rows} rows");
    }
    assert!(session.execute(QueryClass::Simple, &params).await.unwrap() > 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_mongo_adapter() {
    let container = Mongo::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();

    let connector = MongoConnector::new(MongoConfig {
        uri: format!("mongodb://{host}:{port}/"),
        ..MongoConfig::default()
    });
    let mut session = connector.connect().await.unwrap();
    exercise(&mut session).await;
    session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_postgres_adapter() {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let connector = PostgresConnector::new(PostgresConfig {
        host: host.to_string(),
        port,
        dbname: "postgres".into(),
        ..PostgresConfig::default()
    });
    let mut session = connector.connect().await.unwrap();
    exercise(&mut session).await;
    session.close().await.unwrap();
}
