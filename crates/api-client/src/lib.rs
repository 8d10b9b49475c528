// In crates/api-client/src/lib.rs

use app_config::types::BinanceSettings;
use chrono::Utc;
use core_types::{CandleSeries, Kline, PositionInfo, Symbol};
use hmac::{Hmac, Mac};
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::debug;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Upper bound of the `limit` parameter on `/fapi/v1/klines`.
pub const MAX_KLINES_PER_REQUEST: u16 = 1500;

pub mod error;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

impl ApiClient {
    /// Constructs a new ApiClient from BinanceSettings.
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        Ok(ApiClient {
            http_client: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generates the hex HMAC-SHA256 signature of a query string.
    fn sign(&self, query_string: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| Error::SigningFailed(e.to_string()))?;
        mac.update(query_string.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Appends `timestamp` and `signature` to the parameters.
    fn create_signed_query(&self, params: &mut String) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();
        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("timestamp={}", timestamp));
        let signature = self.sign(params)?;
        params.push_str(&format!("&signature={}", signature));
        Ok(())
    }

    /// Sends a request and decodes the body, turning non-2xx statuses and Binance
    /// `{code, msg}` error objects into typed errors.
    async fn send<T: DeserializeOwned>(&self, endpoint: &'static str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Some((code, msg)) = binance_error(&text) {
                return Err(Error::ApiError { code, msg });
            }
            return Err(Error::HttpStatus {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        if let Some((code, msg)) = binance_error_value(&value) {
            return Err(Error::ApiError { code, msg });
        }
        debug!(endpoint, bytes = text.len(), "Response received");
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches the futures account balance and asset information.
    ///
    /// This corresponds to the `GET /fapi/v2/account` endpoint.
    pub async fn get_account_state(&self) -> Result<AccountState> {
        let mut params = String::new();
        self.create_signed_query(&mut params)?;
        let url = format!("{}/fapi/v2/account?{}", self.base_url, params);
        let request = self.http_client.get(&url).header("X-MBX-APIKEY", &self.api_key);
        self.send("/fapi/v2/account", request).await
    }

    /// Fetches the most recent `limit` klines, oldest first.
    ///
    /// This corresponds to the `GET /fapi/v1/klines` endpoint.
    pub async fn get_historical_klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: u16,
    ) -> Result<Vec<Kline>> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol.0, interval, limit
        );
        let raw: Vec<RawKline> = self.send("/fapi/v1/klines", self.http_client.get(&url)).await?;
        raw.into_iter()
            .enumerate()
            .map(|(index, raw)| parse_raw_kline(raw, index))
            .collect()
    }

    /// Fetches klines and validates them into a series. Any bad bar fails the whole fetch.
    pub async fn fetch_candles(&self, symbol: &Symbol, interval: &str, limit: u16) -> Result<CandleSeries> {
        let klines = self.get_historical_klines(symbol, interval, limit).await?;
        Ok(CandleSeries::new(klines)?)
    }

    /// Fetches every kline opening in `[start_time, end_time]`, paging through the
    /// 1500-bar limit of the klines endpoint.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<CandleSeries> {
        let mut klines: Vec<Kline> = Vec::new();
        let mut cursor = start_time;
        loop {
            let url = format!(
                "{}/fapi/v1/klines?symbol={}&interval={}&startTime={}&endTime={}&limit={}",
                self.base_url, symbol.0, interval, cursor, end_time, MAX_KLINES_PER_REQUEST
            );
            let raw: Vec<RawKline> = self.send("/fapi/v1/klines", self.http_client.get(&url)).await?;
            let page_len = raw.len();
            let offset = klines.len();
            for (i, row) in raw.into_iter().enumerate() {
                klines.push(parse_raw_kline(row, offset + i)?);
            }
            let Some(last_open) = klines.last().map(|k| k.open_time) else {
                break;
            };
            debug!(symbol = %symbol, page_len, total = klines.len(), "Fetched kline page");
            if page_len < usize::from(MAX_KLINES_PER_REQUEST) || last_open >= end_time {
                break;
            }
            cursor = last_open + 1;
        }
        Ok(CandleSeries::new(klines)?)
    }

    /// Open positions keyed by symbol. Flat rows are dropped.
    ///
    /// This corresponds to the `GET /fapi/v2/positionRisk` endpoint.
    pub async fn get_positions(&self) -> Result<HashMap<Symbol, PositionInfo>> {
        let mut params = String::new();
        self.create_signed_query(&mut params)?;
        let url = format!("{}/fapi/v2/positionRisk?{}", self.base_url, params);
        let request = self.http_client.get(&url).header("X-MBX-APIKEY", &self.api_key);
        let rows: Vec<RawPositionRisk> = self.send("/fapi/v2/positionRisk", request).await?;
        Ok(positions_from_rows(rows))
    }

    /// Mid price `(bid + ask) / 2` for every listed symbol.
    ///
    /// This corresponds to the `GET /fapi/v1/ticker/bookTicker` endpoint.
    pub async fn get_mid_prices(&self) -> Result<HashMap<Symbol, Decimal>> {
        let url = format!("{}/fapi/v1/ticker/bookTicker", self.base_url);
        let rows: Vec<RawBookTicker> = self
            .send("/fapi/v1/ticker/bookTicker", self.http_client.get(&url))
            .await?;
        Ok(mid_prices_from_rows(rows))
    }

    /// Quantity decimals per symbol.
    ///
    /// This corresponds to the `GET /fapi/v1/exchangeInfo` endpoint.
    pub async fn get_size_decimals(&self) -> Result<HashMap<Symbol, u32>> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let info: RawExchangeInfo = self
            .send("/fapi/v1/exchangeInfo", self.http_client.get(&url))
            .await?;
        Ok(info
            .symbols
            .into_iter()
            .map(|s| (Symbol(s.symbol), s.quantity_precision))
            .collect())
    }

    /// Places a market BUY for `quantity` (already rounded to the symbol's size decimals).
    /// Corresponds to `POST /fapi/v1/order`.
    pub async fn place_market_buy(&self, symbol: &Symbol, quantity: Decimal) -> Result<NewOrderResponse> {
        let mut params = format!(
            "symbol={}&side=BUY&type=MARKET&quantity={}&newOrderRespType=RESULT",
            symbol.0,
            quantity.normalize()
        );
        self.create_signed_query(&mut params)?;

        let url = format!("{}/fapi/v1/order", self.base_url);
        let request = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(params);
        self.send("/fapi/v1/order", request).await
    }
}

fn binance_error(text: &str) -> Option<(i64, String)> {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| binance_error_value(&v))
}

/// Binance reports failures as `{"code": -1121, "msg": "..."}`; success bodies have no code
/// (or, on some endpoints, code 200).
fn binance_error_value(value: &Value) -> Option<(i64, String)> {
    let code = value.get("code")?.as_i64()?;
    if code == 0 || code == 200 {
        return None;
    }
    let msg = value
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    Some((code, msg))
}

fn parse_raw_kline(raw: RawKline, index: usize) -> Result<Kline> {
    let field = |name: &str, value: &str| -> Result<Decimal> {
        value.parse().map_err(|_| Error::MalformedResponse {
            endpoint: "/fapi/v1/klines",
            reason: format!("kline {index}: {name} {value:?} is not a decimal"),
        })
    };
    Ok(Kline {
        open_time: raw.0,
        open: field("open", &raw.1)?,
        high: field("high", &raw.2)?,
        low: field("low", &raw.3)?,
        close: field("close", &raw.4)?,
        volume: field("volume", &raw.5)?,
        close_time: raw.6,
    })
}

fn positions_from_rows(rows: Vec<RawPositionRisk>) -> HashMap<Symbol, PositionInfo> {
    rows.into_iter()
        .filter(|row| !row.position_amt.is_zero())
        .map(|row| {
            let symbol = Symbol(row.symbol);
            let info = PositionInfo {
                symbol: symbol.clone(),
                signed_size: row.position_amt,
                entry_price: (!row.entry_price.is_zero()).then_some(row.entry_price),
            };
            (symbol, info)
        })
        .collect()
}

fn mid_prices_from_rows(rows: Vec<RawBookTicker>) -> HashMap<Symbol, Decimal> {
    rows.into_iter()
        .filter(|row| row.bid_price > Decimal::ZERO && row.ask_price > Decimal::ZERO)
        .map(|row| (Symbol(row.symbol), (row.bid_price + row.ask_price) / Decimal::TWO))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(close: &str) -> RawKline {
        RawKline(
            1_700_000_000_000,
            "100.0".into(),
            "101.0".into(),
            "99.5".into(),
            close.into(),
            "12.3".into(),
            1_700_000_059_999,
            "0".into(),
            10,
            "0".into(),
            "0".into(),
            "0".into(),
        )
    }

    #[test]
    fn parses_kline_strings_as_decimals() {
        let kline = parse_raw_kline(raw("100.5"), 0).unwrap();
        assert_eq!(kline.low, dec!(99.5));
        assert_eq!(kline.close, dec!(100.5));
        assert_eq!(kline.volume, dec!(12.3));
    }

    #[test]
    fn malformed_price_is_an_error_not_zero() {
        let err = parse_raw_kline(raw("n/a"), 3).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn raw_kline_deserializes_from_binance_array() {
        let body = r#"[[1700000000000,"1.0","1.2","0.9","1.1","100",1700000059999,"110",5,"50","55","0"]]"#;
        let rows: Vec<RawKline> = serde_json::from_str(body).unwrap();
        let kline = parse_raw_kline(rows.into_iter().next().unwrap(), 0).unwrap();
        assert_eq!(kline.high, dec!(1.2));
    }

    #[test]
    fn detects_binance_error_objects() {
        let value: Value = serde_json::from_str(r#"{"code":-1121,"msg":"Invalid symbol."}"#).unwrap();
        assert_eq!(binance_error_value(&value), Some((-1121, "Invalid symbol.".to_string())));
        let ok: Value = serde_json::from_str(r#"{"symbol":"BTCUSDT"}"#).unwrap();
        assert_eq!(binance_error_value(&ok), None);
    }

    #[test]
    fn keeps_only_open_positions() {
        let rows = vec![
            RawPositionRisk {
                symbol: "BTCUSDT".into(),
                position_amt: dec!(0.002),
                entry_price: dec!(60000),
                mark_price: dec!(61000),
            },
            RawPositionRisk {
                symbol: "ETHUSDT".into(),
                position_amt: dec!(0),
                entry_price: dec!(0),
                mark_price: dec!(3000),
            },
        ];
        let positions = positions_from_rows(rows);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[&Symbol::from("BTCUSDT")].entry_price, Some(dec!(60000)));
    }

    #[test]
    fn mid_price_is_average_of_book() {
        let prices = mid_prices_from_rows(vec![RawBookTicker {
            symbol: "BTCUSDT".into(),
            bid_price: dec!(100),
            ask_price: dec!(101),
        }]);
        assert_eq!(prices[&Symbol::from("BTCUSDT")], dec!(100.5));
    }

    #[test]
    fn signature_is_hex_sha256() {
        let client = ApiClient {
            http_client: reqwest::Client::new(),
            api_key: "key".into(),
            secret_key: "secret".into(),
            base_url: "http://localhost".into(),
        };
        let signature = client.sign("symbol=BTCUSDT").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
