//! Integration tests for the crawler
//!
//! These tests use wiremock to serve index and detail pages and exercise
//! fetching, pagination, listing parses and whole runs end-to-end.

use async_trait::async_trait;
use estate_crawler::config::parse_config;
use estate_crawler::crawler::{
    AdmissionGate, Coordinator, CrawlReport, Crawler, DebugSink, FetchError, FetchOutcome,
    Fetcher, NullDebugSink, ParseOutcome, RetryPolicy,
};
use estate_crawler::output::read_listings_json;
use estate_crawler::resolver::{DynamicResolver, NullResolver};
use estate_crawler::storage::{RunStatus, SqliteStorage, Storage};
use estate_crawler::{ListingState, Listing, PhotoUrls, PropertyType};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESALE_PAGE: &str = r#"
    <html><body>
      <div class="adBreadBlock"><div><div>
        <a>Home</a><a>Properties Beirut</a>
      </div></div></div>
      <h1>Sea view flat</h1>
      <div class="mainInfoProp"><h3 class="orangeTit">250,000 USD</h3></div>
      <div class="blockProp"><p>Bright.<br>Quiet street.</p></div>
      <div class="adDetails"><div>
        <span>85 m²</span><span>3 Rooms</span>
      </div></div>
      <div class="adFeatures"><div>
        <span>Elevator</span><span>Parking</span>
        <div><p>Type</p></div>
        <div><p>Age</p><p>5-10 years old</p></div>
      </div></div>
      <img src="/none.png" alt="No Photo">
      <input type="hidden" id="locDataUrlHidden" value="/Map/GetLocation">
      <input type="hidden" id="locationType" value="2">
      <input type="hidden" id="locationId" value="771">
    </body></html>
"#;

const NEW_DEVELOPMENT_PAGE: &str = r#"
    <html><body>
      <div class="adBreadBlock"><div><div>
        <a>Home</a><a>New homes</a><a>New homes Jounieh</a>
      </div></div></div>
      <h1 class="SpremiumH2">Marina Heights</h1>
      <h2 class="SpremiumH2 orangeText">From 210,000 USD</h2>
      <p class="changeDescrip">Sea-facing towers.<br>Delivery 2027.</p>
      <p class="immoBadge">Gym</p>
      <p class="immoBadge">Pool</p>
      <div class="noPhoto"></div>
      <a id="callBtn">Call</a>
      <input type="hidden" id="locDataUrlHidden" value="/Map/GetLocation">
      <input type="hidden" id="locationType" value="3">
      <input type="hidden" id="locationId" value="88">
    </body></html>
"#;

const PHONE_FRAGMENT: &str = "<p>+961 1 234 567</p><p>+961 3 765 432</p>";

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

fn fetcher_with(max_attempts: u32, sink: Arc<dyn DebugSink>) -> Fetcher {
    Fetcher::new(reqwest::Client::new(), fast_retry(max_attempts), "sd", sink)
}

fn crawler_with(capacity: usize, resolver: Arc<dyn DynamicResolver>) -> Crawler {
    Crawler::new(
        fetcher_with(3, Arc::new(NullDebugSink)),
        AdmissionGate::new(capacity),
        resolver,
    )
}

fn stub(server: &MockServer, id: i64) -> Listing {
    Listing::stub(
        id,
        PropertyType::Apartment,
        format!("{}/en/{}/flat/", server.uri(), id),
        None,
    )
}

/// Debug sink that keeps every record in memory
#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(u16, String)>>,
}

impl DebugSink for RecordingSink {
    fn record(&self, status: u16, url: &str) {
        self.records.lock().unwrap().push((status, url.to_string()));
    }
}

/// Resolver answering every request with fixed data and recording the
/// order of its calls
#[derive(Default)]
struct ScriptedResolver {
    calls: Mutex<Vec<&'static str>>,
    lookups: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl DynamicResolver for ScriptedResolver {
    async fn unmask_phone_numbers(&self, _url: &str, html: &str) -> anyhow::Result<Option<String>> {
        assert!(html.contains("</h1>"));
        self.calls.lock().unwrap().push("phones");
        Ok(Some(PHONE_FRAGMENT.to_string()))
    }

    async fn lookup_location(
        &self,
        request_url: &str,
        location_type: &str,
        location_id: &str,
    ) -> anyhow::Result<Option<[f64; 2]>> {
        self.calls.lock().unwrap().push("lookup");
        self.lookups.lock().unwrap().push((
            request_url.to_string(),
            location_type.to_string(),
            location_id.to_string(),
        ));
        Ok(Some([33.89, 35.5]))
    }
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_removed(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/en/sd/listing"))
        .mount(server)
        .await;
    mount_page(server, "/en/sd/listing", "<html>This listing was removed</html>").await;
}

#[tokio::test]
async fn test_fetch_not_found_is_absent() {
    let server = MockServer::start().await;
    let sink = Arc::new(RecordingSink::default());

    Mock::given(method("GET"))
        .and(path("/en/1/flat/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_with(5, sink.clone());
    let outcome = fetcher
        .fetch(&format!("{}/en/1/flat/", server.uri()))
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Absent));
    assert!(sink.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en/2/flat/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/en/2/flat/", "<html>ok</html>").await;

    let fetcher = fetcher_with(5, Arc::new(NullDebugSink));
    let outcome = fetcher
        .fetch(&format!("{}/en/2/flat/", server.uri()))
        .await
        .unwrap();

    match outcome {
        FetchOutcome::Document(page) => {
            assert_eq!(page.html, "<html>ok</html>");
            assert!(page.url.ends_with("/en/2/flat/"));
        }
        other => panic!("expected a document, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_gives_up_on_persistent_server_errors() {
    let server = MockServer::start().await;
    let sink = Arc::new(RecordingSink::default());

    Mock::given(method("GET"))
        .and(path("/en/3/flat/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/en/3/flat/", server.uri());
    let outcome = fetcher_with(3, sink.clone()).fetch(&url).await.unwrap();

    assert!(matches!(outcome, FetchOutcome::Absent));
    assert_eq!(*sink.records.lock().unwrap(), vec![(503, url)]);
}

#[tokio::test]
async fn test_fetch_unexpected_status_is_not_retried() {
    let server = MockServer::start().await;
    let sink = Arc::new(RecordingSink::default());

    Mock::given(method("GET"))
        .and(path("/en/4/flat/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher_with(5, sink.clone())
        .fetch(&format!("{}/en/4/flat/", server.uri()))
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Absent));
    assert_eq!(sink.records.lock().unwrap()[0].0, 403);
}

#[tokio::test]
async fn test_fetch_detects_removal_redirect() {
    let server = MockServer::start().await;
    mount_removed(&server, "/en/5/flat/").await;

    let outcome = fetcher_with(3, Arc::new(NullDebugSink))
        .fetch(&format!("{}/en/5/flat/", server.uri()))
        .await
        .unwrap();

    match outcome {
        FetchOutcome::Removed { resolved_url } => {
            assert!(resolved_url.ends_with("/en/sd/listing"));
        }
        other => panic!("expected a removal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_transport_failure_is_exhausted() {
    // Nothing listens on port 1
    let err = fetcher_with(2, Arc::new(NullDebugSink))
        .fetch("http://127.0.0.1:1/en/6/flat/")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn test_count_pages() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/en/apartments",
        r#"<p class="fSize11 centered">1 - 25 of 240</p>"#,
    )
    .await;

    let crawler = crawler_with(4, Arc::new(NullResolver));
    let pages = crawler
        .count_pages(&format!("{}/en/apartments", server.uri()))
        .await;

    assert_eq!(pages, 240);
    assert_eq!(crawler.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_index_without_summary_fetches_no_pages() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/empty", "<html><p>No results</p></html>").await;

    Mock::given(method("GET"))
        .and(path_regex(":p:"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_with(4, Arc::new(NullResolver));
    let stubs = crawler
        .crawl_index(PropertyType::Land, &format!("{}/en/empty", server.uri()))
        .await;

    assert!(stubs.is_empty());
}

#[tokio::test]
async fn test_crawl_index_collects_every_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/en/list",
        r#"<p class="fSize11 centered">1 - 2 of 2</p>"#,
    )
    .await;
    mount_page(
        &server,
        "/en/list:p:1",
        &format!(
            r#"<ul>
                 <li class="listingBox w100" linkref="{base}/en/101/flat/">
                   <span class="listingDetails iconPadR">Today</span>
                 </li>
                 <li class="listingBox w100" linkref="{base}/en/102/flat/"></li>
               </ul>"#
        ),
    )
    .await;
    mount_page(
        &server,
        "/en/list:p:2",
        &format!(
            r#"<ul>
                 <li class="promotionListing listingBox w100" linkref="{base}/en/201/villa/"></li>
                 <li class="promotionListing listingBox w100" linkref="{base}/en/villa/"></li>
               </ul>"#
        ),
    )
    .await;

    let crawler = crawler_with(4, Arc::new(NullResolver));
    let mut stubs = crawler
        .crawl_index(PropertyType::Villa, &format!("{}/en/list", base))
        .await;
    stubs.sort_by_key(|s| s.id);

    let ids: Vec<i64> = stubs.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![101, 102, 201]);
    assert!(stubs.iter().all(|s| s.property_type == PropertyType::Villa));
    assert!(stubs.iter().all(|s| s.relevant.is_none()));
    assert_eq!(stubs[0].publish_date.as_deref(), Some("Today"));
    assert_eq!(stubs[2].publish_date, None);
    // One tick per page; the summary fetch is not counted
    assert_eq!(crawler.progress().position(), 2);
}

#[tokio::test]
async fn test_parse_resale_listing() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/11/flat/", RESALE_PAGE).await;

    let resolver = Arc::new(ScriptedResolver::default());
    let crawler = crawler_with(4, resolver.clone());

    let outcome = crawler.parse_resale_listing(stub(&server, 11), false).await;

    let ParseOutcome::Parsed {
        listing,
        settled_from,
        failed_steps,
    } = outcome
    else {
        panic!("listing was not parsed");
    };

    assert_eq!(settled_from, ListingState::Extracting);
    assert!(failed_steps.is_empty(), "failed: {:?}", failed_steps);
    assert_eq!(listing.relevant, Some(true));
    assert!(!listing.is_new);
    assert_eq!(listing.title.as_deref(), Some("Sea view flat"));
    assert_eq!(listing.price, Some(250_000.0));
    assert_eq!(listing.rent_price, None);
    assert_eq!(listing.currency.as_deref(), Some("USD"));
    assert_eq!(listing.region.as_deref(), Some("Beirut"));
    assert_eq!(listing.area, Some(85));
    assert_eq!(listing.rooms_number, Some(3));
    assert!(listing.elevator);
    assert_eq!(listing.photos_urls, PhotoUrls::NoPhotos);
    assert_eq!(listing.location, Some([33.89, 35.5]));
    assert_eq!(
        listing.phone_numbers,
        Some(vec!["+961 1 234 567".to_string(), "+961 3 765 432".to_string()])
    );

    let lookups = resolver.lookups.lock().unwrap();
    assert_eq!(
        *lookups,
        vec![(
            format!("{}/Map/GetLocation", server.uri()),
            "2".to_string(),
            "771".to_string()
        )]
    );
    assert_eq!(*resolver.calls.lock().unwrap(), vec!["lookup", "phones"]);
    assert_eq!(crawler.gate().in_flight(), 0);
    assert_eq!(crawler.progress().position(), 1);
}

#[tokio::test]
async fn test_parse_new_development_listing() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/16/flat/", NEW_DEVELOPMENT_PAGE).await;

    let resolver = Arc::new(ScriptedResolver::default());
    let crawler = crawler_with(4, resolver.clone());

    let outcome = crawler.parse_new_development_listing(stub(&server, 16)).await;

    let ParseOutcome::Parsed {
        listing,
        settled_from,
        failed_steps,
    } = outcome
    else {
        panic!("listing was not parsed");
    };

    assert_eq!(settled_from, ListingState::Extracting);
    assert!(failed_steps.is_empty(), "failed: {:?}", failed_steps);
    assert_eq!(listing.relevant, Some(true));
    assert!(listing.is_new);
    assert_eq!(listing.title.as_deref(), Some("Marina Heights"));
    assert_eq!(listing.from_price, Some(210_000.0));
    assert_eq!(listing.price, None);
    assert_eq!(listing.currency.as_deref(), Some("usd"));
    assert_eq!(listing.region.as_deref(), Some("Jounieh"));
    assert_eq!(listing.district, None);
    assert_eq!(listing.tags, vec!["Gym".to_string(), "Pool".to_string()]);
    assert_eq!(listing.photos_urls, PhotoUrls::NoPhotos);
    assert_eq!(listing.location, Some([33.89, 35.5]));
    assert_eq!(
        listing.phone_numbers,
        Some(vec!["+961 1 234 567".to_string(), "+961 3 765 432".to_string()])
    );

    // Phone numbers are revealed before the location lookup
    assert_eq!(*resolver.calls.lock().unwrap(), vec!["phones", "lookup"]);
    assert_eq!(
        resolver.lookups.lock().unwrap()[0],
        (
            format!("{}/Map/GetLocation", server.uri()),
            "3".to_string(),
            "88".to_string()
        )
    );
    assert_eq!(crawler.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_parse_is_repeatable() {
    let server = MockServer::start().await;
    mount_page(&server, "/en/12/flat/", RESALE_PAGE).await;

    let crawler = crawler_with(2, Arc::new(ScriptedResolver::default()));
    let first = crawler
        .parse_listing_of_kind(estate_crawler::ListingKind::Rent, stub(&server, 12))
        .await
        .into_listing();
    let second = crawler
        .parse_listing_of_kind(estate_crawler::ListingKind::Rent, stub(&server, 12))
        .await
        .into_listing();

    assert_eq!(first.rent_price, Some(250_000.0));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_removed_listing_only_settles_relevance() {
    let server = MockServer::start().await;
    mount_removed(&server, "/en/13/flat/").await;

    let crawler = crawler_with(2, Arc::new(ScriptedResolver::default()));
    let outcome = crawler
        .parse_new_development_listing(stub(&server, 13))
        .await;

    let ParseOutcome::Parsed {
        listing,
        settled_from,
        failed_steps,
    } = outcome
    else {
        panic!("listing was not parsed");
    };

    assert_eq!(settled_from, ListingState::Removed);
    assert!(failed_steps.is_empty());
    assert_eq!(listing.relevant, Some(false));
    assert!(!listing.is_new);
    assert_eq!(listing.title, None);
    assert_eq!(listing.phone_numbers, None);
    assert_eq!(listing.photos_urls, PhotoUrls::NotAttempted);
}

#[tokio::test]
async fn test_absent_listing_is_not_relevant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/14/flat/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let crawler = crawler_with(2, Arc::new(NullResolver));
    let outcome = crawler.parse_resale_listing(stub(&server, 14), false).await;

    assert!(outcome.is_processed());
    assert_eq!(outcome.listing().relevant, Some(false));
}

#[tokio::test]
async fn test_unreachable_listing_fails_without_settling() {
    let crawler = Crawler::new(
        fetcher_with(1, Arc::new(NullDebugSink)),
        AdmissionGate::new(2),
        Arc::new(NullResolver),
    );
    let stub = Listing::stub(15, PropertyType::Shop, "http://127.0.0.1:1/en/15/shop/", None);

    let outcome = crawler.parse_resale_listing(stub, false).await;

    assert!(!outcome.is_processed());
    assert_eq!(outcome.listing().relevant, None);
    assert_eq!(crawler.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_parses_respect_gate_capacity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/en/\d+/flat/$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RESALE_PAGE)
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let crawler = crawler_with(2, Arc::new(NullResolver));
    let parses = (20..26).map(|id| crawler.parse_resale_listing(stub(&server, id), false));
    let outcomes = futures::future::join_all(parses).await;

    assert!(outcomes.iter().all(ParseOutcome::is_processed));
    assert_eq!(crawler.gate().peak_in_flight(), 2);
    assert_eq!(crawler.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_pagination_respects_gate_capacity() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/en/list",
        r#"<p class="fSize11 centered">1 - 10 of 10</p>"#,
    )
    .await;
    for page in 1..=10 {
        Mock::given(method("GET"))
            .and(path(format!("/en/list:p:{}", page)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(
                        r#"<ul><li class="listingBox w100" linkref="{base}/en/{id}/flat/"></li></ul>"#,
                        id = 300 + page
                    ))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let crawler = crawler_with(2, Arc::new(NullResolver));
    let mut stubs = crawler
        .crawl_index(PropertyType::Apartment, &format!("{}/en/list", base))
        .await;
    stubs.sort_by_key(|s| s.id);

    let ids: Vec<i64> = stubs.iter().map(|s| s.id).collect();
    assert_eq!(ids, (301..=310).collect::<Vec<i64>>());
    assert_eq!(crawler.gate().peak_in_flight(), 2);
    assert_eq!(crawler.gate().in_flight(), 0);
    assert_eq!(crawler.progress().position(), 10);
}

#[tokio::test]
async fn test_closed_gate_admits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_with(2, Arc::new(NullResolver));
    crawler.gate().close();

    let pages = crawler
        .count_pages(&format!("{}/en/apartments", server.uri()))
        .await;
    let outcome = crawler.parse_resale_listing(stub(&server, 30), false).await;

    assert_eq!(pages, 0);
    assert!(!outcome.is_processed());
}

fn run_config(server: &MockServer, temp: &TempDir) -> estate_crawler::Config {
    let toml = format!(
        r#"
[crawler]
max-concurrent-requests = 4
max-attempts = 2
backoff-base-ms = 1
backoff-max-ms = 5

[headers]
"User-Agent" = "Mozilla/5.0 (Linux; Android 10)"

[output]
database-path = "{db}"
json-path = "{json}"
debug-dir = "{debug}"

[browser]
enabled = false

[[index]]
property-type = "apartment"
kind = "resale"
url = "{base}/en/apartments"
"#,
        db = temp.path().join("listings.db").display(),
        json = temp.path().join("out").join("listings.json").display(),
        debug = temp.path().join("debug").display(),
        base = server.uri(),
    );
    parse_config(&toml).unwrap()
}

#[tokio::test]
async fn test_full_run() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let base = server.uri();

    mount_page(
        &server,
        "/en/apartments",
        r#"<p class="fSize11 centered">1 - 2 of 1</p>"#,
    )
    .await;
    mount_page(
        &server,
        "/en/apartments:p:1",
        &format!(
            r#"<ul>
                 <li class="listingBox w100" linkref="{base}/en/201/flat/"></li>
                 <li class="listingBox w100" linkref="{base}/en/202/flat/"></li>
               </ul>"#
        ),
    )
    .await;
    mount_page(&server, "/en/201/flat/", RESALE_PAGE).await;
    mount_removed(&server, "/en/202/flat/").await;

    let config = run_config(&server, &temp);
    let json_path = temp.path().join("out").join("listings.json");

    let mut coordinator = Coordinator::new(
        config,
        "test-hash",
        Arc::new(NullResolver),
        Arc::new(NullDebugSink),
        SqliteStorage::new_in_memory().unwrap(),
    )
    .unwrap();

    let report = coordinator.run().await.unwrap();

    assert_eq!(
        report,
        CrawlReport {
            run_id: report.run_id,
            indexes: 1,
            stubs: 2,
            parsed: 2,
            removed: 1,
            failed: 0,
            failed_steps: 0,
            peak_in_flight: report.peak_in_flight,
            interrupted: false,
        }
    );
    assert!(report.peak_in_flight >= 1 && report.peak_in_flight <= 4);

    let storage = coordinator.into_storage();
    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.listings_saved, Some(2));

    let alive = storage.get_listing(201).unwrap().unwrap();
    assert_eq!(alive.relevant, Some(true));
    assert_eq!(alive.title.as_deref(), Some("Sea view flat"));
    // No browser: the lookup resolves to nothing
    assert_eq!(alive.location, None);
    assert_eq!(alive.phone_numbers, None);
    assert_eq!(alive.photos_urls, PhotoUrls::NoPhotos);

    let gone = storage.get_listing(202).unwrap().unwrap();
    assert_eq!(gone.relevant, Some(false));
    assert_eq!(storage.count_by_relevance(Some(false)).unwrap(), 1);

    let mut exported = read_listings_json(&json_path).unwrap();
    exported.sort_by_key(|l| l.id);
    assert_eq!(exported, vec![alive, gone]);
}

#[tokio::test]
async fn test_interrupted_run_skips_indexes() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(
        run_config(&server, &temp),
        "test-hash",
        Arc::new(NullResolver),
        Arc::new(NullDebugSink),
        SqliteStorage::new_in_memory().unwrap(),
    )
    .unwrap();
    coordinator.gate().close();

    let report = coordinator.run().await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.indexes, 0);
    let storage = coordinator.storage();
    assert_eq!(storage.count_listings().unwrap(), 0);
    assert_eq!(
        storage.get_run(report.run_id).unwrap().status,
        RunStatus::Interrupted
    );
}
