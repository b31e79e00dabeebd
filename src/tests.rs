#[cfg(test)]
mod service_tests {
    use crate::{Config, RenderError, RenderRequest, RenderService};
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn url_request() -> RenderRequest {
        RenderRequest {
            url: Some("https://example.com".to_string()),
            ..Default::default()
        }
    }

    /// Throwaway rendering peer: counts hits and answers every capture
    /// endpoint with a one-segment result.
    async fn spawn_peer(status: axum::http::StatusCode) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));

        async fn handler(
            State((hits, status)): State<(Arc<AtomicUsize>, axum::http::StatusCode)>,
            Json(_request): Json<RenderRequest>,
        ) -> (axum::http::StatusCode, Json<Vec<String>>) {
            hits.fetch_add(1, Ordering::SeqCst);
            (status, Json(vec!["c2VnbWVudA==".to_string()]))
        }

        let router = Router::new()
            .route("/page/", post(handler))
            .route("/element_screenshot/", post(handler))
            .with_state((hits.clone(), status));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test peer");
        let addr = listener.local_addr().expect("peer addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        (format!("http://{addr}"), hits)
    }

    #[tokio::test]
    async fn no_browser_and_no_peer_is_unavailable() {
        let service = RenderService::new(Config::default(), None).expect("service");

        let result = service.page_screenshot(url_request()).await;
        assert!(matches!(result, Err(RenderError::BrowserUnavailable)));

        let result = service.legacy_screenshot(url_request()).await;
        assert!(matches!(result, Err(RenderError::BrowserUnavailable)));
    }

    #[tokio::test]
    async fn caller_errors_never_reach_any_tier() {
        let (peer, hits) = spawn_peer(axum::http::StatusCode::OK).await;
        let config = Config {
            remote_url: Some(peer),
            ..Default::default()
        };
        let service = RenderService::new(config, None).expect("service");

        // Neither content nor url
        let result = service.page_screenshot(RenderRequest::default()).await;
        assert!(matches!(result, Err(RenderError::MissingParameter(_))));

        // Both content and url
        let both = RenderRequest {
            content: Some("<p>hi</p>".to_string()),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let result = service.page_screenshot(both).await;
        assert!(matches!(result, Err(RenderError::InvalidRequest(_))));

        // Element capture without a selector
        let result = service.element_screenshot(url_request()).await;
        assert!(matches!(result, Err(RenderError::MissingParameter("element"))));

        // Source fetch without a URL
        let result = service.source(RenderRequest::default()).await;
        assert!(matches!(result, Err(RenderError::MissingParameter("url"))));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn direct_fetch_returns_body_or_fails_on_error_status() {
        use axum::routing::get;

        let router = Router::new()
            .route("/ok", get(|| async { "raw body" }))
            .route(
                "/missing",
                get(|| async { (axum::http::StatusCode::NOT_FOUND, "gone") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("server addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let service = RenderService::new(Config::default(), None).expect("service");

        let body = service
            .fetch_direct(&format!("http://{addr}/ok"))
            .await
            .expect("fetch");
        assert_eq!(body, "raw body");

        let result = service.fetch_direct(&format!("http://{addr}/missing")).await;
        assert!(matches!(result, Err(RenderError::PageError(_))));
    }

    #[tokio::test]
    async fn unavailable_browser_falls_back_to_peer_once() {
        let (peer, hits) = spawn_peer(axum::http::StatusCode::OK).await;
        let config = Config {
            remote_url: Some(peer),
            ..Default::default()
        };
        let service = RenderService::new(config, None).expect("service");

        let result = service.page_screenshot(url_request()).await.expect("remote");
        assert_eq!(result.segments, vec!["c2VnbWVudA==".to_string()]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn peer_failure_is_terminal() {
        let (peer, hits) = spawn_peer(axum::http::StatusCode::INTERNAL_SERVER_ERROR).await;
        let config = Config {
            remote_url: Some(peer),
            ..Default::default()
        };
        let service = RenderService::new(config, None).expect("service");

        let result = service.page_screenshot(url_request()).await;
        assert!(matches!(result, Err(RenderError::RemoteFallbackFailed(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remote_only_dispatches_straight_to_peer() {
        let (peer, hits) = spawn_peer(axum::http::StatusCode::OK).await;
        let config = Config {
            remote_url: Some(peer),
            remote_only: true,
            ..Default::default()
        };
        let service = RenderService::new(config, None).expect("service");

        let result = service.page_screenshot(url_request()).await.expect("remote");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_round_trips_between_peers() {
        let request = RenderRequest {
            content: Some("<p>hi</p>".to_string()),
            element: Some("main".into()),
            mw: true,
            ..Default::default()
        };

        let wire = serde_json::to_string(&request).unwrap();
        let parsed: RenderRequest = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed.content, request.content);
        assert_eq!(parsed.element, request.element);
        assert!(parsed.mw);
        assert_eq!(parsed.width, request.width);
    }
}
