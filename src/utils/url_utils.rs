// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将URL规范化为集合判重使用的标准形式
///
/// 规范化规则：scheme与host转为小写（`Url::parse`已保证）、
/// 去除fragment、省略协议默认端口、根路径以外的尾部斜杠去除、
/// 空路径补为`/`。规范化是幂等的：`canonicalize(canonicalize(u)) == canonicalize(u)`。
///
/// # 参数
///
/// * `raw` - 原始URL字符串
///
/// # 返回值
///
/// * `Ok(String)` - 规范化后的URL
/// * `Err(ParseError)` - URL无法解析
pub fn canonicalize(raw: &str) -> Result<String, ParseError> {
    let mut url = Url::parse(raw.trim())?;
    url.set_fragment(None);

    // Drop explicit default ports (http:80, https:443)
    if url.port() == url.scheme_default_port() {
        let _ = url.set_port(None);
    }

    let path = url.path().to_string();
    if path.is_empty() {
        url.set_path("/");
    } else if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

/// 判断两个URL是否属于同一域名（host完全一致，忽略大小写）
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
        _ => false,
    }
}

trait SchemeDefaultPort {
    fn scheme_default_port(&self) -> Option<u16>;
}

impl SchemeDefaultPort for Url {
    fn scheme_default_port(&self) -> Option<u16> {
        match self.scheme() {
            "http" | "ws" => Some(80),
            "https" | "wss" => Some(443),
            _ => None,
        }
    }
}
