use super::types::*;
use crate::config::ExchangeConfig;
use crate::errors::ExchangeError;
use crate::logger::{self, LogTag};
use crate::ohlcv::Candle;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const API_KEY_ENV: &str = "BINANCE_API_KEY";
const API_SECRET_ENV: &str = "BINANCE_SECRET_KEY";

/// Backoff between retry attempts, scaled by attempt number
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Binance USDT-M futures REST client
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    recv_window_ms: u64,
    max_retries: u32,
}

impl BinanceClient {
    /// Build an authenticated client with credentials from the environment
    ///
    /// Requires BINANCE_API_KEY and BINANCE_SECRET_KEY (loaded from .env at
    /// startup).
    pub fn from_env(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| ExchangeError::Credentials(API_KEY_ENV))?;
        let api_secret = std::env::var(API_SECRET_ENV)
            .map_err(|_| ExchangeError::Credentials(API_SECRET_ENV))?;

        let mut client = Self::public(config)?;
        client.api_key = Some(api_key);
        client.api_secret = Some(api_secret);
        Ok(client)
    }

    /// Build an unauthenticated client (market-data endpoints only)
    pub fn public(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: None,
            api_secret: None,
            recv_window_ms: config.recv_window_ms,
            max_retries: config.max_retries.max(1),
        })
    }

    // =========================================================================
    // MARKET DATA (unsigned)
    // =========================================================================

    /// Fetch daily (or other interval) klines for a symbol
    ///
    /// The last candle returned is the still-forming one; callers drop it via
    /// `ohlcv::completed`. Closes are validated: a NaN or non-positive close
    /// is rejected rather than silently fed to the strategy.
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let rows: Vec<Vec<serde_json::Value>> = self
            .with_retries(|| async {
                let response = self.http.get(&url).send().await?;
                Self::decode_json(response).await
            })
            .await?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            candles.push(candle_from_kline_row(row)?);
        }

        if candles.iter().any(|c| !c.close.is_finite() || c.close <= 0.0) {
            return Err(ExchangeError::Parse(format!(
                "{} klines contain invalid close prices",
                symbol
            )));
        }

        logger::debug(
            LogTag::Exchange,
            &format!("{} klines fetched: {} candles", symbol, candles.len()),
        );
        Ok(candles)
    }

    /// Current ticker price for a symbol
    pub async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let url = format!("{}/fapi/v1/ticker/price?symbol={}", self.base_url, symbol);

        let ticker: TickerPriceResponse = self
            .with_retries(|| async {
                let response = self.http.get(&url).send().await?;
                Self::decode_json(response).await
            })
            .await?;

        let price = parse_f64(&ticker.price, "ticker price")?;
        if price <= 0.0 {
            return Err(ExchangeError::Parse(format!(
                "{} ticker returned non-positive price {}",
                symbol, price
            )));
        }
        Ok(price)
    }

    /// Lot-size rules for a symbol, for order quantity rounding
    pub async fn get_lot_rules(&self, symbol: &str) -> Result<LotRules, ExchangeError> {
        let url = format!("{}/fapi/v1/exchangeInfo?symbol={}", self.base_url, symbol);

        let info: ExchangeInfoResponse = self
            .with_retries(|| async {
                let response = self.http.get(&url).send().await?;
                Self::decode_json(response).await
            })
            .await?;

        let symbol_info = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| {
                ExchangeError::Parse(format!("exchangeInfo has no entry for {}", symbol))
            })?;

        for filter in &symbol_info.filters {
            if let SymbolFilter::LotSize { min_qty, step_size } = filter {
                return Ok(LotRules {
                    min_qty: parse_f64(min_qty, "minQty")?,
                    step_size: parse_f64(step_size, "stepSize")?,
                });
            }
        }

        Err(ExchangeError::Parse(format!(
            "{} has no LOT_SIZE filter",
            symbol
        )))
    }

    // =========================================================================
    // ACCOUNT AND ORDERS (signed)
    // =========================================================================

    /// Total wallet balance of the futures account (USDT)
    pub async fn get_total_wallet_balance(&self) -> Result<f64, ExchangeError> {
        let account: AccountResponse = self.signed_get("/fapi/v2/account", &[]).await?;
        parse_f64(&account.total_wallet_balance, "totalWalletBalance")
    }

    /// Current position risk entries for a symbol (one per position side in
    /// hedge mode)
    pub async fn get_position_risk(
        &self,
        symbol: &str,
    ) -> Result<Vec<PositionRisk>, ExchangeError> {
        self.signed_get("/fapi/v2/positionRisk", &[("symbol", symbol)])
            .await
    }

    /// Enable hedge mode (dual-side positions)
    ///
    /// Binance answers -4059 when hedge mode is already on; that is treated
    /// as success.
    pub async fn set_hedge_mode(&self) -> Result<(), ExchangeError> {
        let result: Result<serde_json::Value, ExchangeError> = self
            .signed_post("/fapi/v1/positionSide/dual", &[("dualSidePosition", "true")])
            .await;

        match result {
            Ok(_) => {
                logger::info(LogTag::Exchange, "Hedge mode enabled");
                Ok(())
            }
            Err(e) if e.is_position_side_noop() => {
                logger::debug(LogTag::Exchange, "Hedge mode already enabled");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Set leverage for a symbol
    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError> {
        let leverage_str = leverage.to_string();
        let _: serde_json::Value = self
            .signed_post(
                "/fapi/v1/leverage",
                &[("symbol", symbol), ("leverage", &leverage_str)],
            )
            .await?;
        Ok(())
    }

    /// Place a market order on the given position side (hedge mode)
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        position_side: PositionSide,
        quantity: f64,
    ) -> Result<OrderFill, ExchangeError> {
        // Fixed precision then trimmed, so float dust never reaches the API
        let quantity_str = format!("{:.8}", quantity)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
        let response: OrderResponse = self
            .signed_post(
                "/fapi/v1/order",
                &[
                    ("symbol", symbol),
                    ("side", side.as_str()),
                    ("positionSide", position_side.as_str()),
                    ("type", "MARKET"),
                    ("quantity", &quantity_str),
                    ("newOrderRespType", "RESULT"),
                ],
            )
            .await?;

        let amount = parse_f64(&response.executed_qty, "executedQty")?;
        let avg_price = parse_f64(&response.avg_price, "avgPrice")?;
        let cost = parse_f64(&response.cum_quote, "cumQuote")?;

        logger::debug(
            LogTag::Exchange,
            &format!(
                "{} {} {} filled: qty={} avg=${} status={}",
                symbol,
                side.as_str(),
                position_side.as_str(),
                amount,
                avg_price,
                response.status
            ),
        );

        Ok(OrderFill {
            symbol: response.symbol,
            amount,
            avg_price,
            cost,
        })
    }

    // =========================================================================
    // REQUEST PLUMBING
    // =========================================================================

    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        self.with_retries(|| async {
            let (url, api_key) = self.build_signed_request(path, params)?;
            let response = self
                .http
                .get(&url)
                .header("X-MBX-APIKEY", api_key)
                .send()
                .await?;
            Self::decode_json(response).await
        })
        .await
    }

    async fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        // Order placement is NOT retried blindly: a timeout after the order
        // reached the matching engine would double-fill on retry.
        let (url, api_key) = self.build_signed_request(path, params)?;
        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?;
        Self::decode_json(response).await
    }

    /// Build a signed URL: query + timestamp + recvWindow + HMAC signature
    fn build_signed_request(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<(String, String), ExchangeError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(ExchangeError::Credentials(API_KEY_ENV))?;
        let api_secret = self
            .api_secret
            .as_deref()
            .ok_or(ExchangeError::Credentials(API_SECRET_ENV))?;

        let mut query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "timestamp={}&recvWindow={}",
            Utc::now().timestamp_millis(),
            self.recv_window_ms
        ));

        let signature = sign_payload(api_secret, &query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);
        Ok((url, api_key))
    }

    /// Decode a response, surfacing Binance error bodies as ApiError
    async fn decode_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&body) {
                return Err(ExchangeError::Api {
                    code: err.code,
                    msg: err.msg,
                });
            }
            return Err(ExchangeError::Parse(format!(
                "HTTP {} with body: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Parse(format!("failed to decode response: {}", e)))
    }

    /// Run a request closure with retries and escalating backoff
    ///
    /// API rejections (signed request errors, bad symbols) fail immediately;
    /// only transport/parse failures retry.
    async fn with_retries<T, F, Fut>(&self, request: F) -> Result<T, ExchangeError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ExchangeError>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match request().await {
                Ok(value) => return Ok(value),
                Err(e @ ExchangeError::Api { .. }) | Err(e @ ExchangeError::Credentials(_)) => {
                    return Err(e);
                }
                Err(e) => {
                    last_error = e.to_string();
                    logger::warning(
                        LogTag::Exchange,
                        &format!(
                            "Request failed (attempt {}/{}): {}",
                            attempt, self.max_retries, last_error
                        ),
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(
                            RETRY_BASE_DELAY_MS * attempt as u64,
                        ))
                        .await;
                    }
                }
            }
        }

        Err(ExchangeError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }
}

/// HMAC-SHA256 signature over the query string, hex encoded
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex_encode(mac.finalize().into_bytes())
}

/// Encode bytes as a lowercase hex string
fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_payload("secret", "symbol=BTCUSDT&timestamp=1700000000000");
        let b = sign_payload("secret", "symbol=BTCUSDT&timestamp=1700000000000");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_differs_with_secret() {
        let a = sign_payload("secret_a", "payload");
        let b = sign_payload("secret_b", "payload");
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_hmac_vector() {
        // Example from the Binance API documentation
        let sig = sign_payload(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559",
        );
        assert_eq!(
            sig,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }
}
