//! End-to-end pipeline tests using `#[sqlx::test]` plus wiremock stand-ins
//! for the feed, embeddings and generation services.
//!
//! Each test gets a fresh, fully-migrated Postgres database; no real
//! network traffic is made.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsflow_core::{AppConfig, Environment};
use newsflow_db::{
    get_cluster, get_summary, is_locked, list_agent_operations, list_enabled_sources,
    try_acquire_lock, upsert_source, PIPELINE_LOCK_NAME,
};
use newsflow_pipeline::{run_pipeline, RunOutcome};

const FEED_BODY: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>Floods displace thousands in the south</title>
    <link>https://news.example/floods</link>
    <guid>floods-1</guid>
    <description>Heavy rain continued overnight across three districts.</description>
    <enclosure url="https://img.example/floods.jpg" type="image/jpeg"/>
  </item>
  <item>
    <title>National side names squad for home series</title>
    <link>https://news.example/cricket</link>
    <guid>cricket-1</guid>
    <description>Two debutants join the cricket squad for the series.</description>
  </item>
</channel></rss>"#;

const GOOD_SUMMARY: &str = "Officials confirmed the situation developed further on Monday \
    after days of uncertainty. Response teams were deployed to the affected areas overnight. \
    Residents were asked to follow official guidance until conditions improve. A further \
    statement is expected tomorrow.";

fn test_config(ai_server: &MockServer) -> AppConfig {
    AppConfig {
        database_url: String::new(),
        env: Environment::Test,
        log_level: "debug".into(),
        sources_path: PathBuf::from("config/sources.yaml"),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        fetch_concurrency: 4,
        fetch_timeout_secs: 5,
        fetch_max_retries: 0,
        fetch_backoff_base_ms: 1,
        embeddings_url: ai_server.uri(),
        similarity_threshold: 0.82,
        cluster_lookback_hours: 48,
        generation_url: ai_server.uri(),
        generation_api_key: None,
        // Fallback-only: deterministic single-call paths, no agent contracts.
        agents_enabled: false,
        agent_rollout_percent: 0,
        model_summary: "test-model".into(),
        model_translation: "test-model".into(),
        model_seo: "test-model".into(),
        model_image: "test-model".into(),
        model_category: "test-model".into(),
        timeout_summary_secs: 5,
        timeout_translation_secs: 5,
        timeout_seo_secs: 5,
        timeout_image_secs: 5,
        timeout_category_secs: 5,
        lock_ttl_minutes: 10,
        enrich_concurrency: 2,
        pipeline_cron: "0 */15 * * * *".into(),
    }
}

async fn mount_ai_mocks(ai_server: &MockServer, embeddings: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings))
        .mount(ai_server)
        .await;

    // The translation fallback asks for JSON output; everything else gets
    // prose.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "system",
                "content": "Translate news text to Sinhala and Tamil. JSON output only."
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content":
                "{\"title_si\": \"සිරස්තලය\", \"title_ta\": \"தலைப்பு\", \
                 \"text_si\": \"සාරාංශය\", \"text_ta\": \"சுருக்கம்\"}"
            }}]
        })))
        .mount(ai_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": GOOD_SUMMARY}}]
        })))
        .mount(ai_server)
        .await;
}

async fn seed_feed_source(pool: &sqlx::PgPool, feed_server: &MockServer) {
    upsert_source(
        pool,
        "mock-feed",
        "Mock Feed",
        &format!("{}/feed.xml", feed_server.uri()),
        "en",
        true,
        100,
    )
    .await
    .expect("source upsert should succeed");

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(feed_server)
        .await;
}

// ---------------------------------------------------------------------------
// End-to-end run
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn full_run_ingests_clusters_and_enriches(pool: sqlx::PgPool) {
    let feed_server = MockServer::start().await;
    let ai_server = MockServer::start().await;
    seed_feed_source(&pool, &feed_server).await;
    // Two feed items → two embedding inputs, orthogonal vectors → two
    // clusters.
    mount_ai_mocks(&ai_server, json!([[1.0, 0.0], [0.0, 1.0]])).await;

    let config = test_config(&ai_server);
    let outcome = run_pipeline(&pool, &config, "test")
        .await
        .expect("run should succeed");

    let RunOutcome::Completed {
        run_id,
        articles_ingested,
        clusters_touched,
    } = outcome
    else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(articles_ingested, 2);
    assert_eq!(clusters_touched, 2, "orthogonal embeddings, two clusters");

    let run = newsflow_db::get_pipeline_run(&pool, run_id)
        .await
        .expect("run row should exist");
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.articles_ingested, 2);

    // Every cluster got the full enrichment sequence.
    let sources = list_enabled_sources(&pool).await.expect("sources");
    assert_eq!(sources.len(), 1);
    for cluster_id in cluster_ids(&pool).await {
        let cluster = get_cluster(&pool, cluster_id).await.expect("cluster");
        assert_eq!(cluster.status, "published");
        assert!(cluster.seo_title.is_some(), "seo should be set");
        assert!(cluster.category.is_some(), "category should be set");

        let summary = get_summary(&pool, cluster_id)
            .await
            .expect("query should succeed")
            .expect("summary row should exist");
        assert_eq!(summary.text_en.as_deref(), Some(GOOD_SUMMARY));
        assert_eq!(summary.text_si.as_deref(), Some("සාරාංශය"));

        let ops = list_agent_operations(&pool, cluster_id)
            .await
            .expect("operations should be readable");
        assert!(!ops.is_empty(), "every orchestration must be audited");
        assert!(ops.iter().all(|op| op.path == "fallback"));
    }

    // The lock was released on the way out.
    assert!(!is_locked(&pool, PIPELINE_LOCK_NAME)
        .await
        .expect("lock check"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_run_ingests_nothing_new(pool: sqlx::PgPool) {
    let feed_server = MockServer::start().await;
    let ai_server = MockServer::start().await;
    seed_feed_source(&pool, &feed_server).await;
    mount_ai_mocks(&ai_server, json!([[1.0, 0.0], [0.0, 1.0]])).await;

    let config = test_config(&ai_server);
    run_pipeline(&pool, &config, "test")
        .await
        .expect("first run should succeed");
    let outcome = run_pipeline(&pool, &config, "test")
        .await
        .expect("second run should succeed");

    let RunOutcome::Completed {
        articles_ingested, ..
    } = outcome
    else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(articles_ingested, 0, "re-fetching a feed is a no-op");
}

#[sqlx::test(migrations = "../../migrations")]
async fn same_event_across_sources_converges_on_one_cluster(pool: sqlx::PgPool) {
    let feed_server = MockServer::start().await;
    let ai_server = MockServer::start().await;

    let single_item_feed = |title: &str, link: &str, guid: &str| {
        format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><title>{title}</title><link>{link}</link><guid>{guid}</guid></item>
</channel></rss>"#
        )
    };
    let feeds = [
        ("wire-a", "en", "Cabinet approves new fuel pricing formula"),
        ("wire-b", "en", "Fuel pricing formula gets cabinet approval"),
        ("wire-c", "si", "ඉන්ධන මිල සූත්‍රයට කැබිනට් අනුමැතිය"),
    ];
    for (slug, language, title) in feeds {
        upsert_source(
            &pool,
            slug,
            slug,
            &format!("{}/{slug}.xml", feed_server.uri()),
            language,
            true,
            100,
        )
        .await
        .expect("source upsert should succeed");
        Mock::given(method("GET"))
            .and(path(format!("/{slug}.xml")))
            .respond_with(ResponseTemplate::new(200).set_body_string(single_item_feed(
                title,
                &format!("https://news.example/{slug}/fuel"),
                &format!("{slug}-fuel-1"),
            )))
            .mount(&feed_server)
            .await;
    }

    // Identical vectors: every article is the same event.
    mount_ai_mocks(&ai_server, json!([[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]])).await;

    let config = test_config(&ai_server);
    let outcome = run_pipeline(&pool, &config, "test")
        .await
        .expect("run should succeed");

    let RunOutcome::Completed {
        articles_ingested,
        clusters_touched,
        ..
    } = outcome
    else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(articles_ingested, 3);
    assert_eq!(clusters_touched, 1, "one event, one cluster");

    let ids = cluster_ids(&pool).await;
    assert_eq!(ids.len(), 1);
    let cluster = get_cluster(&pool, ids[0]).await.expect("cluster");
    assert_eq!(cluster.article_count, 3);
    assert_eq!(cluster.source_count, 3);
    assert!(cluster.title_en.is_some());
    assert!(cluster.title_si.is_some(), "si headline slot filled");

    let summary = get_summary(&pool, ids[0])
        .await
        .expect("query should succeed")
        .expect("summary row should exist");
    assert!(summary.text_en.as_deref().is_some_and(|t| !t.is_empty()));

    // One audit row per capability attempted.
    let ops = list_agent_operations(&pool, ids[0])
        .await
        .expect("operations should be readable");
    for capability in ["summary", "translation", "seo", "image", "category"] {
        assert!(
            ops.iter().any(|op| op.capability == capability),
            "missing audit row for {capability}"
        );
    }
}

// ---------------------------------------------------------------------------
// Lock contention
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn held_lock_skips_the_run_without_a_run_row(pool: sqlx::PgPool) {
    let feed_server = MockServer::start().await;
    let ai_server = MockServer::start().await;
    let config = test_config(&ai_server);

    assert!(
        try_acquire_lock(&pool, PIPELINE_LOCK_NAME, Duration::from_secs(600))
            .await
            .expect("acquire should succeed")
    );

    let outcome = run_pipeline(&pool, &config, "test")
        .await
        .expect("skip is not an error");
    assert!(matches!(outcome, RunOutcome::Skipped));

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_runs")
        .fetch_one(&pool)
        .await
        .expect("count should succeed");
    assert_eq!(runs, 0, "a skipped run leaves no run row");

    // The skipped invocation must not have released the other holder's
    // lease.
    assert!(is_locked(&pool, PIPELINE_LOCK_NAME)
        .await
        .expect("lock check"));
}

async fn cluster_ids(pool: &sqlx::PgPool) -> Vec<i64> {
    sqlx::query_scalar("SELECT id FROM clusters ORDER BY id")
        .fetch_all(pool)
        .await
        .expect("cluster ids should be readable")
}
