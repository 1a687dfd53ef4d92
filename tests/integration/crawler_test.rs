// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::mount_html;
use a11yscan::crawler::robots::{AllowAllChecker, RobotsChecker};
use a11yscan::crawler::Crawler;
use a11yscan::domain::models::crawl::{CrawlRequest, ScanType};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler() -> Crawler {
    Crawler::new(reqwest::Client::new(), Arc::new(AllowAllChecker), 4)
}

fn urls(targets: &[a11yscan::domain::models::crawl::CrawlTarget]) -> Vec<&str> {
    targets.iter().map(|t| t.url.as_str()).collect()
}

#[tokio::test]
async fn test_bfs_discovers_linked_pages_once() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/a">A</a>
            <a href="/b">B</a>
            <a href="/a#section">A again</a>
        </body></html>"#,
    )
    .await;
    mount_html(&server, "/a", r#"<a href="/">home</a><a href="/b">B</a>"#).await;
    mount_html(&server, "/b", r#"<a href="/c">C</a>"#).await;
    mount_html(&server, "/c", "<p>leaf</p>").await;

    let request = CrawlRequest {
        max_depth: 3,
        ..CrawlRequest::new(server.uri())
    };
    let targets = crawler().discover(&request).await.unwrap();

    let found = urls(&targets);
    assert_eq!(found.len(), 4, "each page exactly once: {:?}", found);
    assert!(found.iter().any(|u| u.ends_with("/c")));

    // 深度随发现层级递增
    let c = targets.iter().find(|t| t.url.ends_with("/c")).unwrap();
    assert_eq!(c.depth, 2);
}

#[tokio::test]
async fn test_max_depth_bounds_traversal() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<a href="/a">A</a>"#).await;
    mount_html(&server, "/a", r#"<a href="/b">B</a>"#).await;
    mount_html(&server, "/b", "<p>too deep</p>").await;

    let request = CrawlRequest {
        max_depth: 1,
        ..CrawlRequest::new(server.uri())
    };
    let targets = crawler().discover(&request).await.unwrap();

    assert_eq!(targets.len(), 2);
    assert!(!urls(&targets).iter().any(|u| u.ends_with("/b")));
}

#[tokio::test]
async fn test_single_page_scan_skips_crawling() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<a href="/a">A</a>"#).await;

    let request = CrawlRequest {
        scan_type: ScanType::SinglePage,
        ..CrawlRequest::new(server.uri())
    };
    let targets = crawler().discover(&request).await.unwrap();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].depth, 0);
}

#[tokio::test]
async fn test_sitemap_preferred_over_traversal() {
    let server = MockServer::start().await;
    let sitemap = format!(
        r#"<?xml version="1.0"?>
<urlset>
  <loc>{0}/alpha</loc>
  <loc>{0}/beta</loc>
  <loc>https://other-domain.example/x</loc>
</urlset>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(&server)
        .await;
    // 根页面链接到sitemap没有的页面：sitemap存在时不应被发现
    mount_html(&server, "/", r#"<a href="/gamma">G</a>"#).await;

    let request = CrawlRequest::new(server.uri());
    let targets = crawler().discover(&request).await.unwrap();

    let found = urls(&targets);
    assert_eq!(found.len(), 2, "{:?}", found);
    assert!(found.iter().all(|u| u.ends_with("/alpha") || u.ends_with("/beta")));
}

#[tokio::test]
async fn test_exclude_beats_include() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<a href="/blog/post">post</a><a href="/blog/private">private</a>"#,
    )
    .await;
    mount_html(&server, "/blog/post", "<p>ok</p>").await;
    mount_html(&server, "/blog/private", "<p>no</p>").await;

    let request = CrawlRequest {
        include_patterns: vec!["/blog/".into()],
        exclude_patterns: vec!["private".into()],
        ..CrawlRequest::new(server.uri())
    };
    let targets = crawler().discover(&request).await.unwrap();

    let found = urls(&targets);
    assert!(found.iter().any(|u| u.ends_with("/blog/post")));
    assert!(!found.iter().any(|u| u.contains("private")));
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/", r#"<a href="/admin/panel">admin</a><a href="/pub">pub</a>"#).await;
    mount_html(&server, "/pub", "<p>ok</p>").await;

    let client = reqwest::Client::new();
    let crawler = Crawler::new(client.clone(), Arc::new(RobotsChecker::new(client)), 4);
    let targets = crawler.discover(&CrawlRequest::new(server.uri())).await.unwrap();

    let found = urls(&targets);
    assert!(found.iter().any(|u| u.ends_with("/pub")));
    assert!(!found.iter().any(|u| u.contains("/admin")));
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<a href="/open">open</a>"#).await;
    mount_html(&server, "/open", "<p>ok</p>").await;

    let client = reqwest::Client::new();
    let crawler = Crawler::new(client.clone(), Arc::new(RobotsChecker::new(client)), 4);
    let targets = crawler.discover(&CrawlRequest::new(server.uri())).await.unwrap();

    assert_eq!(targets.len(), 2);
}

#[tokio::test]
async fn test_invalid_start_url_is_fatal() {
    let err = crawler()
        .discover(&CrawlRequest::new("not a url"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        a11yscan::utils::errors::CrawlerError::InvalidStartUrl(_)
    ));
}
