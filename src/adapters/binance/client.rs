use std::time::Duration;

use chrono::Utc;
use error_stack::{report, ResultExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::{
    adapters::config::{binance_config::BinanceConfig, portfolio_config::PortfolioConfig},
    domain::exchange::{EarnPosition, EarnProductType, PriceMap, SpotBalance},
    ports::exchange_client::{ExchangeClient, ExchangeError},
};

use super::{
    models::{
        AccountInformation, ApiErrorBody, FlexiblePositionRow, LockedPositionRow, ServerTime,
        SimpleEarnPage, TickerPrice,
    },
    price_resolver::PriceResolver,
    signing,
};

const ACCOUNT_PATH: &str = "/api/v3/account";
const FLEXIBLE_POSITION_PATH: &str = "/sapi/v1/simple-earn/flexible/position";
const LOCKED_POSITION_PATH: &str = "/sapi/v1/simple-earn/locked/position";
const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";
const SERVER_TIME_PATH: &str = "/api/v3/time";

const EARN_PAGE_SIZE: usize = 100;
const MAX_EARN_PAGES: usize = 50;

/// Maps a failed response to an error kind from its HTTP status and Binance error code.
pub fn classify_status(status: StatusCode, api_code: Option<i64>) -> ExchangeError {
    match (status.as_u16(), api_code) {
        (429 | 418, _) | (_, Some(-1003)) => ExchangeError::RateLimit,
        (401 | 403, _) | (_, Some(-2014 | -2015 | -1022 | -2008)) => {
            ExchangeError::Authentication
        }
        (500..=599, _) => ExchangeError::Network,
        _ => ExchangeError::InvalidResponse,
    }
}

#[derive(Debug)]
pub struct BinanceClient {
    config: BinanceConfig,
    quote_asset: String,
    bridge_asset: String,
    http: reqwest::Client,
}

impl BinanceClient {
    pub fn new(
        config: BinanceConfig,
        portfolio: &PortfolioConfig,
    ) -> error_stack::Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .change_context(ExchangeError::Network)
            .attach_printable("Failed to build HTTP client")?;

        Ok(Self {
            config,
            quote_asset: portfolio.quote_asset.to_uppercase(),
            bridge_asset: portfolio.bridge_asset.to_uppercase(),
            http,
        })
    }

    fn url(&self, path: &str, query: &str) -> String {
        let base_url = self.config.base_url.trim_end_matches('/');
        if query.is_empty() {
            format!("{base_url}{path}")
        } else {
            format!("{base_url}{path}?{query}")
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> error_stack::Result<String, ExchangeError> {
        let response = request
            .send()
            .await
            .change_context(ExchangeError::Network)
            .attach_printable_lazy(|| format!("Request to {path} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .change_context(ExchangeError::Network)
            .attach_printable_lazy(|| format!("Failed to read response body of {path}"))?;

        if status.is_success() {
            return Ok(body);
        }

        let api_error = serde_json::from_str::<ApiErrorBody>(&body).ok();
        let kind = classify_status(status, api_error.as_ref().map(|error| error.code));
        let mut report = report!(kind).attach_printable(format!("{path} returned {status}"));
        if let Some(api_error) = api_error {
            report = report.attach_printable(format!(
                "Binance error {}: {}",
                api_error.code, api_error.msg
            ));
        }
        Err(report)
    }

    fn decode<T: DeserializeOwned>(
        body: &str,
        path: &str,
    ) -> error_stack::Result<T, ExchangeError> {
        serde_json::from_str(body)
            .change_context(ExchangeError::InvalidResponse)
            .attach_printable_lazy(|| format!("Unexpected response body from {path}"))
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> error_stack::Result<T, ExchangeError> {
        let body = self.send(self.http.get(self.url(path, "")), path).await?;
        Self::decode(&body, path)
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> error_stack::Result<T, ExchangeError> {
        let query = signing::signed_query(
            params,
            &self.config.secret_key,
            self.config.recv_window,
            Utc::now().timestamp_millis(),
        )
        .change_context(ExchangeError::Authentication)?;

        let request = self
            .http
            .get(self.url(path, &query))
            .header("X-MBX-APIKEY", &*self.config.api_key);

        let body = self.send(request, path).await?;
        Self::decode(&body, path)
    }

    /// Walks an earn endpoint page by page until a short page or the reported total.
    async fn earn_rows<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> error_stack::Result<Vec<T>, ExchangeError> {
        let mut rows = Vec::new();

        for current in 1..=MAX_EARN_PAGES {
            let page: SimpleEarnPage<T> = self
                .signed_get(
                    path,
                    &[
                        ("current", current.to_string()),
                        ("size", EARN_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            let received = page.rows.len();
            rows.extend(page.rows);

            let reached_total = page.total > 0 && rows.len() as u64 >= page.total;
            if received < EARN_PAGE_SIZE || reached_total {
                return Ok(rows);
            }
        }

        tracing::warn!("Binance: ⚠️ Stopped paging {path} after {MAX_EARN_PAGES} pages");
        Ok(rows)
    }

    async fn flexible_positions(&self) -> error_stack::Result<Vec<EarnPosition>, ExchangeError> {
        let rows = self
            .earn_rows::<FlexiblePositionRow>(FLEXIBLE_POSITION_PATH)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| EarnPosition {
                symbol: row.asset.to_uppercase(),
                principal: row.total_amount,
                product_type: EarnProductType::Flexible,
                estimated_apr: row.latest_annual_percentage_rate * 100.0,
                accrued_rewards: row.cumulative_total_rewards,
            })
            .collect())
    }

    async fn locked_positions(&self) -> error_stack::Result<Vec<EarnPosition>, ExchangeError> {
        let rows = self
            .earn_rows::<LockedPositionRow>(LOCKED_POSITION_PATH)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| EarnPosition {
                symbol: row.asset.to_uppercase(),
                principal: row.amount,
                product_type: EarnProductType::Locked,
                estimated_apr: row.apy * 100.0,
                accrued_rewards: row.reward_amt,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ExchangeClient for BinanceClient {
    fn exchange_name(&self) -> &str {
        "Binance"
    }

    #[instrument(skip(self), name = "BinanceClient::get_balances")]
    async fn get_balances(&self) -> error_stack::Result<Vec<SpotBalance>, ExchangeError> {
        tracing::trace!("Binance: ☁️  Fetching spot balances");
        let account: AccountInformation = self
            .signed_get(ACCOUNT_PATH, &[("omitZeroBalances", "true".to_string())])
            .await?;

        let balances = account
            .balances
            .into_iter()
            .map(|balance| SpotBalance::new(balance.asset, balance.free, balance.locked))
            .filter(|balance| balance.total() > 0.0)
            .collect::<Vec<_>>();

        tracing::info!("Binance: ✅ {} spot balances", balances.len());
        Ok(balances)
    }

    #[instrument(skip(self), name = "BinanceClient::get_earn_positions")]
    async fn get_earn_positions(&self) -> error_stack::Result<Vec<EarnPosition>, ExchangeError> {
        tracing::trace!("Binance: ☁️  Fetching Simple Earn positions");
        let (flexible, locked) =
            futures::try_join!(self.flexible_positions(), self.locked_positions())?;

        let positions = flexible
            .into_iter()
            .chain(locked)
            .filter(|position| position.principal > 0.0)
            .collect::<Vec<_>>();

        tracing::info!("Binance: ✅ {} earn positions", positions.len());
        Ok(positions)
    }

    #[instrument(skip(self), name = "BinanceClient::get_prices")]
    async fn get_prices(&self, symbols: &[String]) -> error_stack::Result<PriceMap, ExchangeError> {
        tracing::trace!("Prices: ☁️  Fetching tickers from Binance");
        let tickers: Vec<TickerPrice> = self.public_get(TICKER_PRICE_PATH).await?;

        let resolver = PriceResolver::new(
            self.quote_asset.as_str(),
            self.bridge_asset.as_str(),
            tickers
                .into_iter()
                .map(|ticker| (ticker.symbol, ticker.price)),
        );
        let prices = resolver.resolve_all(symbols);

        tracing::info!(
            "Prices: ✅ {} of {} symbols priced in {}",
            prices.len(),
            symbols.len(),
            self.quote_asset
        );
        Ok(prices)
    }

    #[instrument(skip(self), name = "BinanceClient::ping")]
    async fn ping(&self) -> error_stack::Result<(), ExchangeError> {
        let time: ServerTime = self.public_get(SERVER_TIME_PATH).await?;
        let drift = Utc::now().timestamp_millis() - time.server_time;
        tracing::trace!("Binance: 🕒 Server time drift {drift} ms");
        Ok(())
    }
}
