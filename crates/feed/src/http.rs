use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use tracker_core::common::{SecurityCode, iso_date};
use tracker_core::config::FeedConfig;
use tracker_core::market::entity::{FetchWindow, PriceHistory, RawBar};
use tracker_core::market::error::MarketError;
use tracker_core::market::port::PriceSource;

/// 日线数据接口路径
const STOCK_DATA_PATH: &str = "/api/stock-data";

/// # Summary
/// 基于 HTTP 的日线行情提供者。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 每次调用只发起一次请求，不做重试；超时仅在配置时生效。
#[derive(Clone)]
pub struct HttpPriceSource {
    // 内部使用的 HTTP 客户端
    client: Client,
    // 完整的接口地址
    endpoint: String,
}

impl HttpPriceSource {
    /// # Summary
    /// 创建一个新的 HttpPriceSource 实例。
    ///
    /// # Logic
    /// 1. 安装 rustls 默认加密后端 (已安装时跳过)。
    /// 2. 按需设置请求超时，未配置时沿用客户端默认行为。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `base_url`: 行情服务根地址，例如 `http://localhost:5000`。
    /// * `timeout`: 可选的请求超时。
    ///
    /// # Returns
    /// 返回初始化后的 HttpPriceSource，客户端构建失败时返回 `MarketError::Remote`。
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, MarketError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MarketError::Remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), STOCK_DATA_PATH),
        })
    }

    /// 根据配置创建实例。
    pub fn from_config(config: &FeedConfig) -> Result<Self, MarketError> {
        Self::new(&config.base_url, config.timeout_secs.map(Duration::from_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// # Summary
/// 行情服务响应中的业务状态。
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum SourceStatus {
    Success,
    Error,
}

/// # Summary
/// 行情服务响应顶层结构。
///
/// # Invariants
/// - `data` 内的 K 线按交易日升序排列。
#[derive(Deserialize, Debug)]
struct SourceResponse {
    status: SourceStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<RawBar>>,
}

/// # Summary
/// 解析格式正确 (HTTP 2xx) 的响应体。
///
/// # Logic
/// 1. JSON 解析失败返回 `Decode`。
/// 2. `status == "error"` 返回 `Upstream`，携带服务端消息。
/// 3. 成功但没有 K 线返回 `EmptyResult`。
///
/// # Arguments
/// * `body`: 响应体文本。
///
/// # Returns
/// 成功返回至少包含一根 K 线的序列。
pub fn interpret_body(body: &str) -> Result<PriceHistory, MarketError> {
    let response: SourceResponse =
        serde_json::from_str(body).map_err(|e| MarketError::Decode(e.to_string()))?;

    if response.status == SourceStatus::Error {
        return Err(MarketError::Upstream(
            response
                .message
                .unwrap_or_else(|| "source reported failure".to_string()),
        ));
    }

    match response.data {
        Some(bars) if !bars.is_empty() => Ok(bars),
        _ => Err(MarketError::EmptyResult),
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    /// # Summary
    /// 抓取日线历史数据。
    ///
    /// # Logic
    /// 1. 以 `ts_code`、`start_date`、`end_date` (ISO 日期) 构建查询参数。
    /// 2. 发起 GET 请求；连接失败或非 2xx 状态码返回 `Remote`，并附带响应文本。
    /// 3. 交由 `interpret_body` 解析响应体。
    ///
    /// # Arguments
    /// * `code`: 带后缀的证券代码。
    /// * `window`: 查询窗口。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_daily(
        &self,
        code: &SecurityCode,
        window: FetchWindow,
    ) -> Result<PriceHistory, MarketError> {
        info!(
            "Fetching {} daily bars {} .. {}",
            code, window.start, window.end
        );

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ts_code", code.to_string()),
                ("start_date", iso_date(window.start)),
                ("end_date", iso_date(window.end)),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Remote(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::Remote(e.to_string()))?;

        if !status.is_success() {
            return Err(MarketError::Remote(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let bars = interpret_body(&body)?;
        debug!("Received {} bars for {}", bars.len(), code);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::market::entity::PriceField;

    #[test]
    fn test_interpret_success() {
        let body = r#"{"status":"success","data":[
            {"trade_date":"20250304","open":10.1,"high":10.9,"low":10.0,"close":10.5,"vol":1200.0},
            {"trade_date":"20250305","open":"10.5","high":"11.0","low":"10.2","close":"10.8"}
        ]}"#;
        let bars = interpret_body(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].trade_date, "20250304");
        assert_eq!(bars[1].close, PriceField::Text("10.8".into()));
    }

    #[test]
    fn test_interpret_keeps_bars_with_bad_prices() {
        let body = r#"{"status":"success","data":[
            {"trade_date":"20250304","open":true,"low":10.0,"close":10.5}
        ]}"#;
        let bars = interpret_body(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].high, PriceField::Missing);
        assert_eq!(bars[0].open.value(), None);
    }

    #[test]
    fn test_interpret_upstream_error() {
        let err = interpret_body(r#"{"status":"error","message":"token expired"}"#).unwrap_err();
        assert!(matches!(err, MarketError::Upstream(msg) if msg == "token expired"));

        let err = interpret_body(r#"{"status":"error"}"#).unwrap_err();
        assert!(matches!(err, MarketError::Upstream(_)));
    }

    #[test]
    fn test_interpret_empty_result() {
        assert!(matches!(
            interpret_body(r#"{"status":"success","data":[]}"#),
            Err(MarketError::EmptyResult)
        ));
        assert!(matches!(
            interpret_body(r#"{"status":"success"}"#),
            Err(MarketError::EmptyResult)
        ));
    }

    #[test]
    fn test_interpret_decode_error() {
        assert!(matches!(interpret_body("<html>"), Err(MarketError::Decode(_))));
        assert!(matches!(
            interpret_body(r#"{"status":"pending","data":[]}"#),
            Err(MarketError::Decode(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let source = HttpPriceSource::new("http://localhost:5000/", None).unwrap();
        assert_eq!(source.endpoint(), "http://localhost:5000/api/stock-data");
    }
}
