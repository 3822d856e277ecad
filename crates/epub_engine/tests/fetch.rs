use std::time::Duration;

use epub_core::{DropReason, ImageMime, ImageOutcome, ImageSource};
use epub_engine::{resolve_images, FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

#[tokio::test]
async fn fetcher_returns_bytes_and_bare_mime_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"\xff\xd8\xff\xe0jpeg".to_vec(),
            "image/jpeg; charset=binary",
        ))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/a.jpg", server.uri());

    let resource = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(resource.mime_type, "image/jpeg");
    assert_eq!(
        resource.content_type.as_deref(),
        Some("image/jpeg; charset=binary")
    );
    assert_eq!(resource.bytes, b"\xff\xd8\xff\xe0jpeg");
    assert_eq!(resource.metadata.original_url, url);
    assert_eq!(resource.metadata.final_url, url);
    assert_eq!(resource.metadata.redirect_count, 0);
}

#[tokio::test]
async fn fetcher_sniffs_generic_content_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(PNG_MAGIC.to_vec(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let resource = fetcher
        .fetch(&format!("{}/blob", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(resource.mime_type, "image/png");
}

#[tokio::test]
async fn fetcher_follows_redirects_and_counts_them() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_MAGIC.to_vec(), "image/png"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let resource = fetcher
        .fetch(&format!("{}/old", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(resource.metadata.final_url, format!("{}/new", server.uri()));
    assert_eq!(resource.metadata.redirect_count, 1);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_rejects_invalid_urls() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw(PNG_MAGIC.to_vec(), "image/png"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn image_resolution_isolates_failures_and_keeps_order() {
    let server = MockServer::start().await;
    for (route, status, mime) in [
        ("/img/0.png", 200, "image/png"),
        ("/img/1.png", 500, "image/png"),
        ("/img/2.gif", 200, "image/gif"),
        ("/img/3.png", 200, "image/png"),
        ("/img/4.png", 200, "image/png"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_raw(PNG_MAGIC.to_vec(), mime))
            .mount(&server)
            .await;
    }

    let sources = vec![
        ImageSource {
            index: 0,
            src: Some(format!("{}/img/0.png", server.uri())),
        },
        ImageSource {
            index: 1,
            src: Some("1.png".to_string()),
        },
        ImageSource {
            index: 2,
            src: Some("/img/2.gif".to_string()),
        },
        ImageSource { index: 3, src: None },
        ImageSource {
            index: 4,
            src: Some("./4.png".to_string()),
        },
    ];
    let page = format!("{}/img/article.html", server.uri());
    let fetcher = ReqwestFetcher::new(FetchSettings::default());

    let outcomes = resolve_images(&fetcher, sources, Some(page.as_str()), 2).await;

    let summary: Vec<Option<(String, ImageMime)>> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            ImageOutcome::Resolved(asset) => Some((asset.local_filename, asset.mime)),
            ImageOutcome::Dropped(_) => None,
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            Some(("image_0.png".to_string(), ImageMime::Png)),
            None,
            None,
            None,
            Some(("image_4.png".to_string(), ImageMime::Png)),
        ]
    );
}

#[tokio::test]
async fn inline_data_images_are_decoded_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sources = vec![
        ImageSource {
            index: 0,
            src: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
        },
        ImageSource {
            index: 1,
            src: Some("data:image/jpeg;base64,/9j/4A==".to_string()),
        },
        ImageSource {
            index: 2,
            src: Some("data:image/gif;base64,R0lGODlh".to_string()),
        },
        ImageSource {
            index: 3,
            src: Some("data:image/png;base64,not base64!".to_string()),
        },
    ];
    let page = format!("{}/post.html", server.uri());
    let fetcher = ReqwestFetcher::new(FetchSettings::default());

    let outcomes = resolve_images(&fetcher, sources, Some(page.as_str()), 4).await;

    match &outcomes[0] {
        ImageOutcome::Resolved(asset) => {
            assert_eq!(asset.local_filename, "image_0.png");
            assert_eq!(asset.bytes, PNG_MAGIC[..8].to_vec());
        }
        other => panic!("expected png, got {other:?}"),
    }
    match &outcomes[1] {
        ImageOutcome::Resolved(asset) => {
            assert_eq!(asset.mime, ImageMime::Jpeg);
            assert_eq!(asset.bytes, vec![0xff, 0xd8, 0xff, 0xe0]);
        }
        other => panic!("expected jpeg, got {other:?}"),
    }
    assert!(matches!(
        &outcomes[2],
        ImageOutcome::Dropped(DropReason::Unsupported(mime)) if mime == "image/gif"
    ));
    assert!(matches!(&outcomes[3], ImageOutcome::Dropped(DropReason::Fetch(_))));
}
