// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analyzers::traits::{Analyzer, Page};
use crate::domain::models::finding::{FindingInstance, Impact, Principle, RawFinding, WcagLevel};
use crate::utils::errors::AnalyzerError;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// 分析器名称
const NAME: &str = "heuristic";

/// HTML片段截断长度
const SNIPPET_MAX: usize = 200;

/// 静态HTML启发式分析器
///
/// 内置的参考实现：对获取到的HTML做一组不依赖浏览器的
/// 基础检查。规则集刻意保持小而保守，可被任何实现了
/// `Analyzer`特质的外部分析器替换或补充。
pub struct HeuristicAnalyzer;

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn analyze(&self, page: &Page) -> Result<Vec<RawFinding>, AnalyzerError> {
        if page.status_code >= 400 {
            return Err(AnalyzerError::PageUnavailable(format!(
                "{} returned status {}",
                page.url, page.status_code
            )));
        }

        // HTML解析与遍历是纯CPU操作，在一个同步块内完成
        let document = Html::parse_document(&page.html);
        let page_url = page.url.to_string();
        let mut findings = Vec::new();

        check_images_have_alt(&document, &page_url, &mut findings);
        check_html_has_lang(&document, &page_url, &mut findings);
        check_document_title(&document, &page_url, &mut findings);
        check_links_have_names(&document, &page_url, &mut findings);
        check_buttons_have_names(&document, &page_url, &mut findings);
        check_form_fields_have_labels(&document, &page_url, &mut findings);

        Ok(findings)
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn snippet(el: &ElementRef) -> String {
    let html = el.html();
    if html.len() > SNIPPET_MAX {
        let mut end = SNIPPET_MAX;
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &html[..end])
    } else {
        html
    }
}

fn css_path(el: &ElementRef) -> String {
    let v = el.value();
    match v.attr("id") {
        Some(id) => format!("{}#{}", v.name(), id),
        None => v.name().to_string(),
    }
}

fn instance(page_url: &str, el: &ElementRef) -> FindingInstance {
    FindingInstance {
        page_url: page_url.to_string(),
        selector: css_path(el),
        snippet: snippet(el),
    }
}

fn push_finding(
    findings: &mut Vec<RawFinding>,
    rule_id: &str,
    description: &str,
    impact: Impact,
    criteria: &[&str],
    level: WcagLevel,
    principle: Principle,
    help: &str,
    instances: Vec<FindingInstance>,
) {
    if instances.is_empty() {
        return;
    }
    findings.push(RawFinding {
        rule_id: rule_id.to_string(),
        description: description.to_string(),
        impact,
        wcag_criteria: criteria.iter().map(|s| s.to_string()).collect(),
        wcag_level: level,
        principle,
        detected_by: NAME.to_string(),
        help: Some(help.to_string()),
        instances,
    });
}

/// 1.1.1: 图片必须有替代文本
fn check_images_have_alt(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let instances: Vec<_> = document
        .select(&selector("img:not([alt])"))
        .filter(|el| el.value().attr("role") != Some("presentation"))
        .map(|el| instance(page_url, &el))
        .collect();

    push_finding(
        findings,
        "image-alt",
        "Images must have alternate text",
        Impact::Critical,
        &["1.1.1"],
        WcagLevel::A,
        Principle::Perceivable,
        "Add an alt attribute describing the image, or alt=\"\" for decorative images",
        instances,
    );
}

/// 3.1.1: html元素必须声明lang
fn check_html_has_lang(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let instances: Vec<_> = document
        .select(&selector("html"))
        .filter(|el| {
            el.value()
                .attr("lang")
                .map(|lang| lang.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|_| FindingInstance {
            page_url: page_url.to_string(),
            // 完整文档片段过大，只记录标签本身
            selector: "html".to_string(),
            snippet: "<html>".to_string(),
        })
        .collect();

    push_finding(
        findings,
        "html-has-lang",
        "The html element must have a lang attribute",
        Impact::Serious,
        &["3.1.1"],
        WcagLevel::A,
        Principle::Understandable,
        "Declare the page language, e.g. <html lang=\"en\">",
        instances,
    );
}

/// 2.4.2: 页面必须有标题
fn check_document_title(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let has_title = document
        .select(&selector("head title"))
        .any(|el| !el.text().collect::<String>().trim().is_empty());
    if has_title {
        return;
    }

    push_finding(
        findings,
        "document-title",
        "Documents must have a title element to aid in navigation",
        Impact::Serious,
        &["2.4.2"],
        WcagLevel::A,
        Principle::Operable,
        "Add a descriptive <title> element inside <head>",
        vec![FindingInstance {
            page_url: page_url.to_string(),
            selector: "head".to_string(),
            snippet: "<head>".to_string(),
        }],
    );
}

fn has_accessible_name(el: &ElementRef) -> bool {
    let v = el.value();
    if v.attr("aria-label")
        .is_some_and(|label| !label.trim().is_empty())
        || v.attr("aria-labelledby").is_some()
        || v.attr("title").is_some_and(|t| !t.trim().is_empty())
    {
        return true;
    }
    if !el.text().collect::<String>().trim().is_empty() {
        return true;
    }
    // 带替代文本的图片也提供可访问名称
    el.select(&selector("img[alt]"))
        .any(|img| img.value().attr("alt").is_some_and(|a| !a.trim().is_empty()))
}

/// 2.4.4: 链接必须有可辨识的名称
fn check_links_have_names(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let instances: Vec<_> = document
        .select(&selector("a[href]"))
        .filter(|el| !has_accessible_name(el))
        .map(|el| instance(page_url, &el))
        .collect();

    push_finding(
        findings,
        "link-name",
        "Links must have discernible text",
        Impact::Serious,
        &["2.4.4", "4.1.2"],
        WcagLevel::A,
        Principle::Operable,
        "Provide link text or an aria-label",
        instances,
    );
}

/// 4.1.2: 按钮必须有可辨识的名称
fn check_buttons_have_names(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let instances: Vec<_> = document
        .select(&selector("button"))
        .filter(|el| !has_accessible_name(el))
        .map(|el| instance(page_url, &el))
        .collect();

    push_finding(
        findings,
        "button-name",
        "Buttons must have discernible text",
        Impact::Critical,
        &["4.1.2"],
        WcagLevel::A,
        Principle::Robust,
        "Provide button text or an aria-label",
        instances,
    );
}

/// 1.3.1/3.3.2: 表单控件必须有标签
fn check_form_fields_have_labels(document: &Html, page_url: &str, findings: &mut Vec<RawFinding>) {
    let labelled_ids: HashSet<String> = document
        .select(&selector("label[for]"))
        .filter_map(|el| el.value().attr("for").map(|s| s.to_string()))
        .collect();

    let instances: Vec<_> = document
        .select(&selector("input, select, textarea"))
        .filter(|el| {
            let v = el.value();
            let input_type = v.attr("type").unwrap_or("text");
            if matches!(input_type, "hidden" | "submit" | "button" | "reset" | "image") {
                return false;
            }
            let has_label_for = v
                .attr("id")
                .is_some_and(|id| labelled_ids.contains(id));
            let has_aria = v
                .attr("aria-label")
                .is_some_and(|label| !label.trim().is_empty())
                || v.attr("aria-labelledby").is_some()
                || v.attr("title").is_some_and(|t| !t.trim().is_empty());
            !has_label_for && !has_aria
        })
        .map(|el| instance(page_url, &el))
        .collect();

    push_finding(
        findings,
        "form-field-label",
        "Form fields must have labels",
        Impact::Critical,
        &["1.3.1", "3.3.2"],
        WcagLevel::A,
        Principle::Understandable,
        "Associate a <label for=...> with the field or add an aria-label",
        instances,
    );
}
