//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitewalk::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use sitewalk::crawler::{FetchError, HttpFetcher};
use sitewalk::output::{CrawlReport, PageFailure};
use sitewalk::{crawl, Crawler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `seed`
fn create_test_config(seed: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_url: Some(seed.to_string()),
            workers: 4,
            fetch_timeout_secs: 5,
            max_retries: 3,
            retry_delay_ms: 1,
            queue_capacity: None,
            poll_interval_ms: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: Some("https://example.com/contact".to_string()),
        },
        output: OutputConfig::default(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("valid URL")
}

async fn run_crawl(config: &Config) -> CrawlReport {
    tokio::time::timeout(
        Duration::from_secs(20),
        crawl(config, &CancellationToken::new()),
    )
    .await
    .expect("crawl should finish")
    .expect("crawl should start")
}

/// Crawler fetching over HTTP with a sub-second timeout
fn crawler_with_timeout(config: &Config, timeout: Duration) -> Crawler {
    let fetcher = HttpFetcher::new(&config.user_agent, timeout).expect("client builds");
    Crawler::new(config.crawler.clone(), Arc::new(fetcher))
}

#[tokio::test]
async fn test_end_to_end_same_host_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/abc">ABC</a>
                <a href="https://other.example/x">Elsewhere</a>
                <a href="/abc#frag">ABC again</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // the fragment link must not cause a second fetch
    Mock::given(method("GET"))
        .and(path("/abc"))
        .respond_with(html("<html><body><p>No links here</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = run_crawl(&create_test_config(&base_url)).await;

    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.results.len(), 2);

    let root = report
        .result_for(&url(&format!("{}/", base_url)))
        .expect("root page result");
    let abc = url(&format!("{}/abc", base_url));
    assert!(root.links.contains(&abc));
    assert!(root.links.iter().all(|l| l.host_str() == abc.host_str()));
    assert!(!root.links.iter().any(|l| l.as_str().contains("other.example")));

    let abc_result = report.result_for(&abc).expect("abc page result");
    assert!(abc_result.links.is_empty());
}

#[tokio::test]
async fn test_not_found_pages_are_results() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let link_a = format!("{}/abc", base_url);
    let link_b = format!("{}/bca", base_url);
    let link_e = "/bca/abce/indiana/jones";

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"
            <a href="{}"/>
            <!DOCTYPE html>
            <html>
                <div>
                    <div><a href="{}"/></div>
                </div>
                <body>
                    <a href="https://community.monzo.com/cab"/>
                </body>
                <a href="{}"/>
            </html>
            "#,
            link_a, link_b, link_e
        )))
        .mount(&mock_server)
        .await;

    // every other path falls through to wiremock's empty 404
    let report = run_crawl(&create_test_config(&base_url)).await;

    assert!(report.errors.is_empty());
    assert_eq!(report.results.len(), 4);

    let seed = url(&format!("{}/", base_url));
    for result in &report.results {
        if result.target_url == seed {
            assert!(result.links.contains(&url(&link_a)));
            assert!(result.links.contains(&url(&link_b)));
            assert!(result.links.contains(&seed.join(link_e).unwrap()));
            assert_eq!(result.links.len(), 3);
        } else {
            assert!(result.links.is_empty());
        }
    }
}

#[tokio::test]
async fn test_error_status_pages_still_yield_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(r#"<html><body><a href="/found">Try this</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/found"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string(r#"<html><body><a href="/deeper">Deeper</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    let report = run_crawl(&create_test_config(&base_url)).await;

    assert!(report.errors.is_empty());
    assert_eq!(report.results.len(), 3);

    let root = report.result_for(&url(&format!("{}/", base_url))).unwrap();
    assert_eq!(root.links, vec![url(&format!("{}/found", base_url))]);

    let found = report.result_for(&url(&format!("{}/found", base_url))).unwrap();
    assert_eq!(found.links, vec![url(&format!("{}/deeper", base_url))]);
}

#[tokio::test]
async fn test_two_page_chain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(r#"<a href="{}/abc"/>"#, base_url)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/abc"))
        .respond_with(html(&format!(r#"<a href="{}/cba"/>"#, base_url)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cba"))
        .respond_with(html(""))
        .mount(&mock_server)
        .await;

    let report = run_crawl(&create_test_config(&base_url)).await;

    assert!(report.errors.is_empty());
    assert_eq!(report.results.len(), 3);

    let abc = url(&format!("{}/abc", base_url));
    let cba = url(&format!("{}/cba", base_url));
    assert_eq!(
        report.result_for(&url(&format!("{}/", base_url))).unwrap().links,
        vec![abc.clone()]
    );
    assert_eq!(report.result_for(&abc).unwrap().links, vec![cba.clone()]);
    assert!(report.result_for(&cba).unwrap().links.is_empty());
}

#[tokio::test]
async fn test_timeout_retried_then_reported() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<a href=\"/never\">x</a>").set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let crawler = crawler_with_timeout(&config, Duration::from_millis(50));

    let report = crawler
        .crawl_from(&url(&base_url), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.errors.len(), 1);

    let error = &report.errors[0];
    assert_eq!(error.target_url, url(&format!("{}/", base_url)));
    assert!(matches!(
        error.cause,
        PageFailure::Fetch(FetchError::Timeout(_))
    ));
    assert!(error.to_string().starts_with("failed to extract links from"));
}

#[tokio::test]
async fn test_connection_refused_reported() {
    // Reserve a port, then free it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = create_test_config(&format!("http://127.0.0.1:{}/", port));
    config.crawler.max_retries = 2;

    let report = run_crawl(&config).await;

    assert!(report.results.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].cause.kind() != sitewalk::output::FailureKind::WorkerPanic);
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html("<p>hello</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = run_crawl(&create_test_config(&mock_server.uri())).await;

    assert_eq!(report.results.len(), 1);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_query_variants_visited_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/list?page=1">1</a><a href="/list?page=2">2</a><a href="/list">all</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(html(r#"<a href="/?from=list">home</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = run_crawl(&create_test_config(&base_url)).await;

    assert_eq!(report.results.len(), 2);
    let root = report.result_for(&url(&format!("{}/", base_url))).unwrap();
    assert_eq!(root.links.len(), 3);
}

#[tokio::test]
async fn test_cancellation_stops_slow_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/slow">slow</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("late").set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let crawler = Crawler::from_config(&config).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(3),
        crawler.crawl_from(&url(&base_url), &cancel),
    )
    .await
    .expect("cancelled crawl should return promptly")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.results.len(), 1);
    assert!(report.errors.is_empty());
}
