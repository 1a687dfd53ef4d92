// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{mount_html, mount_slow_html, spawn_app, wait_for_scan};
use a11yscan::domain::models::finding::Impact;
use a11yscan::domain::models::scan::{ScanConfig, ScanStatus};
use a11yscan::domain::repositories::scan_repository::ScanRepository;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 两页都缺少lang声明，其中一页还缺少图片替代文本
async fn mount_small_site(server: &MockServer) {
    mount_html(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/about">About us</a>
            <a href="/contact">Contact page</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        server,
        "/about",
        r#"<html><head><title>About</title></head><body>
            <img src="team.jpg">
            <a href="/">Back home</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        server,
        "/contact",
        r#"<html><head><title>Contact</title></head><body>
            <p>Mail us.</p>
        </body></html>"#,
    )
    .await;
}

#[tokio::test]
async fn test_full_scan_pipeline_completes_with_score() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let app = spawn_app(3, 4).await;
    let scan = app
        .orchestrator
        .submit(Uuid::new_v4(), &server.uri(), ScanConfig::default())
        .await
        .unwrap();

    let finished = wait_for_scan(&app.repository, scan.id, Duration::from_secs(15)).await;
    app.pool.stop().await;

    assert_eq!(finished.status, ScanStatus::Completed, "{:?}", finished.error);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());

    // 全部三页都被扫描，无失败页
    let pages = app.repository.pages_for(scan.id);
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.error.is_none()));

    // 同一规则跨页面合并为一个问题，实例保留各自页面
    let issues = app.repository.issues_for(scan.id);
    let lang_issue = issues
        .iter()
        .find(|i| i.rule_id == "html-has-lang")
        .expect("missing lang issue");
    assert_eq!(lang_issue.instances.len(), 3);
    assert!(issues.iter().any(|i| i.rule_id == "image-alt"));

    // 存在Critical问题时直接判为不合规
    let score = finished.score.expect("score must be present");
    assert!(score.overall < 100.0);
    assert_eq!(score.tier.to_string(), "non-compliant");

    let summary = finished.summary.expect("summary must be present");
    assert_eq!(summary.total_issues, issues.len());
    assert_eq!(*summary.by_impact.get(&Impact::Critical).unwrap(), 1);

    // 进度最终达到100%
    assert_eq!(finished.progress.pages_scanned, 3);
    assert_eq!(finished.progress.percent_complete, 100.0);
}

#[tokio::test]
async fn test_broken_page_is_tolerated() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html lang="en"><head><title>T</title></head><body>
            <a href="/broken">broken</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = spawn_app(3, 4).await;
    let scan = app
        .orchestrator
        .submit(Uuid::new_v4(), &server.uri(), ScanConfig::default())
        .await
        .unwrap();

    let finished = wait_for_scan(&app.repository, scan.id, Duration::from_secs(15)).await;
    app.pool.stop().await;

    // 单页失败不影响整体完成
    assert_eq!(finished.status, ScanStatus::Completed, "{:?}", finished.error);

    let pages = app.repository.pages_for(scan.id);
    assert_eq!(pages.len(), 2);
    let broken = pages.iter().find(|p| p.url.ends_with("/broken")).unwrap();
    assert!(broken.error.is_some());
    assert_eq!(broken.finding_count, 0);

    // 干净的首页不产生问题，失败页贡献零缺陷
    assert!(app.repository.issues_for(scan.id).is_empty());
    let score = finished.score.unwrap();
    assert_eq!(score.overall, 100.0);
}

#[tokio::test]
async fn test_invalid_start_url_fails_scan() {
    let app = spawn_app(2, 2).await;
    let scan = app
        .orchestrator
        .submit(Uuid::new_v4(), "not a url", ScanConfig::default())
        .await
        .unwrap();

    let finished = wait_for_scan(&app.repository, scan.id, Duration::from_secs(10)).await;
    app.pool.stop().await;

    assert_eq!(finished.status, ScanStatus::Failed);
    assert!(finished.error.unwrap().contains("Invalid start URL"));
}

#[tokio::test]
async fn test_cancel_during_scanning_stops_early() {
    let server = MockServer::start().await;
    let mut links = String::new();
    for i in 0..8 {
        links.push_str(&format!(r#"<a href="/page{}">p{}</a>"#, i, i));
    }
    mount_html(
        &server,
        "/",
        &format!(
            r#"<html lang="en"><head><title>T</title></head><body>{}</body></html>"#,
            links
        ),
    )
    .await;
    for i in 0..8 {
        mount_slow_html(
            &server,
            &format!("/page{}", i),
            r#"<html lang="en"><head><title>P</title></head><body><p>x</p></body></html>"#,
            Duration::from_millis(500),
        )
        .await;
    }

    let app = spawn_app(3, 2).await;
    let scan = app
        .orchestrator
        .submit(Uuid::new_v4(), &server.uri(), ScanConfig::default())
        .await
        .unwrap();

    // 等扫描进入Scanning后请求取消
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let current = app.repository.get_scan_by_id(scan.id).await.unwrap();
        if current.status == ScanStatus::Scanning {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "scan never reached Scanning: {}",
            current.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    app.orchestrator.cancel(scan.id).await.unwrap();

    let finished = wait_for_scan(&app.repository, scan.id, Duration::from_secs(15)).await;
    app.pool.stop().await;

    assert_eq!(finished.status, ScanStatus::Cancelled);
    // 取消时已完成的页面被保留，未扫描的页面被放弃
    let pages = app.repository.pages_for(scan.id);
    assert!(pages.len() < 9);
    // 尚未被认领的单页任务在取消时被撤回，不留在队列里
    assert_eq!(app.queue.pending_len(), 0);
}
