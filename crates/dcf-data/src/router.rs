//! Read-through acquisition router.
//!
//! [`DataRouter`] answers every request from the cache store when it can and
//! otherwise downloads from the provider registered for the data kind, writing
//! non-empty results through to the store.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{debug, info, instrument, warn};

use dcf_data_core::{
    CacheKey, CacheStore, CacheableRecord, CompanyInfo, DataError, DataKind, FundamentalDataProvider,
    HolderBundle, HolderKind, PeriodType, PriceDataProvider, PriceSeries, Record,
    ReferenceDataProvider, RelationalTable, Result, StatementBundle, StatementKind, StatementTable,
    SubKind, Symbol,
};
use dcf_data_store::{Codec, DateColumnedCsv, JsonDocument, RelationalCsv, TimeIndexedCsv};

use crate::config::{
    DEFAULT_RISK_FREE_SYMBOL, DataConfig, default_price_start, default_risk_free_start,
};

/// Default values applied when a request leaves them out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defaults {
    /// Whether lookups consult the cache when not told otherwise.
    pub use_cache: bool,
    /// First day of price history requests.
    pub price_start: NaiveDate,
    /// Identifier of the risk-free rate series.
    pub risk_free_symbol: Symbol,
    /// First day of risk-free rate requests.
    pub risk_free_start: NaiveDate,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            use_cache: true,
            price_start: default_price_start(),
            risk_free_symbol: Symbol::new(DEFAULT_RISK_FREE_SYMBOL),
            risk_free_start: default_risk_free_start(),
        }
    }
}

impl From<&DataConfig> for Defaults {
    fn from(config: &DataConfig) -> Self {
        Self {
            use_cache: config.use_cache,
            price_start: config.price_start,
            risk_free_symbol: config.risk_free_symbol.clone(),
            risk_free_start: config.risk_free_start,
        }
    }
}

/// Options of a [`DataRouter::fetch`] request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Consult the cache first. `false` forces a download that replaces the
    /// stored entry.
    pub use_cache: bool,
    /// Bundle components to resolve; `None` means all of them.
    pub sub_kinds: Option<Vec<SubKind>>,
    /// First day of a price history request.
    pub start: Option<NaiveDate>,
    /// Last day of a price history request; `None` means "latest".
    pub end: Option<NaiveDate>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            sub_kinds: None,
            start: None,
            end: None,
        }
    }
}

impl FetchOptions {
    /// Default options: use the cache, all sub-kinds, default date range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bypass the cache and replace the stored entry.
    #[must_use]
    pub const fn refresh(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Set whether the cache is consulted.
    #[must_use]
    pub const fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Restrict a bundle request to the given sub-kinds.
    #[must_use]
    pub fn with_sub_kinds(mut self, sub_kinds: impl IntoIterator<Item = SubKind>) -> Self {
        self.sub_kinds = Some(sub_kinds.into_iter().collect());
        self
    }

    /// Set the first day of a price history request.
    #[must_use]
    pub const fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the last day of a price history request.
    #[must_use]
    pub const fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }
}

/// Read-through cache in front of the remote providers.
///
/// One provider can be registered per data category. Requests are resolved
/// one (symbol, kind, sub-kind) entry at a time:
///
/// 1. with `use_cache`, a stored entry is decoded and returned;
/// 2. otherwise the provider is called; its errors propagate unchanged;
/// 3. non-empty results are encoded and written to the store. A failed write
///    is logged and the result is still returned. Empty results are never
///    stored, so they are requested again next time.
///
/// # Example
///
/// ```rust,ignore
/// use dcf_data::{DataConfig, DataRouter, Symbol};
///
/// let config = DataConfig::default().with_env_overrides()?;
/// let router = DataRouter::from_config(&config)?.with_yahoo();
///
/// let prices = router.price_history(&Symbol::new("AAPL"), None, None, true).await?;
/// let rf = router.treasury_yield(None, None, None, true).await?;
/// let annual = router.annual_statements(&Symbol::new("AAPL"), true).await?;
/// ```
pub struct DataRouter {
    price_provider: Option<Arc<dyn PriceDataProvider>>,
    fundamental_provider: Option<Arc<dyn FundamentalDataProvider>>,
    reference_provider: Option<Arc<dyn ReferenceDataProvider>>,
    store: Arc<dyn CacheStore>,
    defaults: Defaults,
}

impl std::fmt::Debug for DataRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRouter")
            .field(
                "price_provider",
                &self.price_provider.as_ref().map(|p| p.name()),
            )
            .field(
                "fundamental_provider",
                &self.fundamental_provider.as_ref().map(|p| p.name()),
            )
            .field(
                "reference_provider",
                &self.reference_provider.as_ref().map(|p| p.name()),
            )
            .field("store", &self.store)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl DataRouter {
    /// Create a router over a store, with no providers and default settings.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            price_provider: None,
            fundamental_provider: None,
            reference_provider: None,
            store,
            defaults: Defaults::default(),
        }
    }

    /// Create a router from a configuration.
    ///
    /// Opens the configured store and applies the configured defaults.
    /// Providers are registered separately.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened.
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        Ok(Self::new(config.open_store()?).with_defaults(Defaults::from(config)))
    }

    /// Replace the request defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The request defaults.
    #[must_use]
    pub const fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Fetch options carrying the configured cache default.
    #[must_use]
    pub fn default_options(&self) -> FetchOptions {
        FetchOptions::new().with_use_cache(self.defaults.use_cache)
    }

    /// Register the price history provider, replacing any previous one.
    pub fn register_price(&mut self, provider: Arc<dyn PriceDataProvider>) {
        debug!(provider = provider.name(), "Registering price provider");
        self.price_provider = Some(provider);
    }

    /// Register the financial statements provider, replacing any previous one.
    pub fn register_fundamental(&mut self, provider: Arc<dyn FundamentalDataProvider>) {
        debug!(
            provider = provider.name(),
            "Registering fundamental provider"
        );
        self.fundamental_provider = Some(provider);
    }

    /// Register the company info and holders provider, replacing any previous one.
    pub fn register_reference(&mut self, provider: Arc<dyn ReferenceDataProvider>) {
        debug!(provider = provider.name(), "Registering reference provider");
        self.reference_provider = Some(provider);
    }

    /// Use the given Yahoo Finance provider for every data kind.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo_provider(mut self, provider: dcf_data_yahoo::YahooProvider) -> Self {
        let provider = Arc::new(provider);
        self.register_price(provider.clone());
        self.register_fundamental(provider.clone());
        self.register_reference(provider);
        self
    }

    /// Use a default Yahoo Finance provider for every data kind.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo(self) -> Self {
        self.with_yahoo_provider(dcf_data_yahoo::YahooProvider::new())
    }

    // ------------------------------------------------------------------------
    // Uniform entry point
    // ------------------------------------------------------------------------

    /// Fetch one record for a symbol and data kind.
    ///
    /// Bundle kinds resolve each requested sub-kind independently and
    /// aggregate them in their canonical order.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] if a requested sub-kind does not
    /// belong to `kind`; otherwise any provider, store or decode error.
    #[instrument(skip(self, options), fields(symbol = %symbol, kind = %kind))]
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        kind: DataKind,
        options: &FetchOptions,
    ) -> Result<Record> {
        if let Some(requested) = &options.sub_kinds {
            if let Some(invalid) = requested.iter().find(|s| !kind.sub_kinds().contains(s)) {
                return Err(DataError::InvalidParameter(format!(
                    "{invalid} is not a component of {kind}"
                )));
            }
        }
        let wanted = |sub: SubKind| {
            options
                .sub_kinds
                .as_ref()
                .is_none_or(|requested| requested.contains(&sub))
        };

        let record = match kind {
            DataKind::PriceSeries => Record::PriceSeries(
                self.price_history(symbol, options.start, options.end, options.use_cache)
                    .await?,
            ),
            DataKind::AnnualStatements | DataKind::QuarterlyStatements => {
                let period = kind.period().unwrap_or_default();
                let kinds: Vec<StatementKind> = StatementKind::ALL
                    .into_iter()
                    .filter(|k| wanted(SubKind::Statement(*k)))
                    .collect();
                Record::Statements(
                    self.statements(symbol, period, &kinds, options.use_cache)
                        .await?,
                )
            }
            DataKind::CompanyInfo => {
                Record::CompanyInfo(self.company_info(symbol, options.use_cache).await?)
            }
            DataKind::HoldersAndRecommendations => {
                let kinds: Vec<HolderKind> = HolderKind::ALL
                    .into_iter()
                    .filter(|k| wanted(SubKind::Holder(*k)))
                    .collect();
                Record::Holders(self.holders(symbol, &kinds, options.use_cache).await?)
            }
        };
        Ok(record)
    }

    // ------------------------------------------------------------------------
    // Typed operations
    // ------------------------------------------------------------------------

    /// Daily price history for a symbol.
    ///
    /// `start` defaults to [`Defaults::price_start`]. The cached series is
    /// keyed by symbol only: once stored it is returned for any range until a
    /// refresh (`use_cache = false`) replaces it.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn price_history(
        &self,
        symbol: &Symbol,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        use_cache: bool,
    ) -> Result<PriceSeries> {
        let start = start.unwrap_or(self.defaults.price_start);
        let key = CacheKey::price_series(symbol);
        self.resolve::<TimeIndexedCsv, _>(
            &key,
            use_cache,
            self.download_price_history(symbol, start, end),
        )
        .await
    }

    /// Risk-free rate series as a `Date`/`Close` frame.
    ///
    /// A price history request for `symbol` (default [`Defaults::risk_free_symbol`],
    /// start default [`Defaults::risk_free_start`]) reduced to its close column;
    /// it shares its cache entry with [`price_history`](Self::price_history).
    /// An unknown symbol yields an empty frame.
    #[instrument(skip(self))]
    pub async fn treasury_yield(
        &self,
        symbol: Option<&Symbol>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        use_cache: bool,
    ) -> Result<DataFrame> {
        let symbol = symbol.unwrap_or(&self.defaults.risk_free_symbol);
        let start = start.unwrap_or(self.defaults.risk_free_start);
        let series = self
            .price_history(symbol, Some(start), end, use_cache)
            .await?;
        if series.is_empty() {
            return Ok(DataFrame::empty());
        }
        series.close()
    }

    /// Income statement, balance sheet and cash flow, annual.
    pub async fn annual_statements(
        &self,
        symbol: &Symbol,
        use_cache: bool,
    ) -> Result<StatementBundle> {
        self.statements(symbol, PeriodType::Annual, &StatementKind::ALL, use_cache)
            .await
    }

    /// Income statement, balance sheet and cash flow, quarterly.
    pub async fn quarterly_statements(
        &self,
        symbol: &Symbol,
        use_cache: bool,
    ) -> Result<StatementBundle> {
        self.statements(symbol, PeriodType::Quarterly, &StatementKind::ALL, use_cache)
            .await
    }

    /// A subset of the statements of one period type.
    ///
    /// Each statement is cached on its own; a bundle can mix cached and freshly
    /// downloaded statements.
    #[instrument(skip(self), fields(symbol = %symbol, period = %period))]
    pub async fn statements(
        &self,
        symbol: &Symbol,
        period: PeriodType,
        kinds: &[StatementKind],
        use_cache: bool,
    ) -> Result<StatementBundle> {
        let mut bundle = StatementBundle::new(period);
        for kind in StatementKind::ALL.into_iter().filter(|k| kinds.contains(k)) {
            let key = CacheKey::statement(symbol, period, kind);
            let table = self
                .resolve::<DateColumnedCsv, _>(
                    &key,
                    use_cache,
                    self.download_statement(symbol, period, kind),
                )
                .await?;
            bundle.insert(kind, table);
        }
        Ok(bundle)
    }

    /// Flat company metadata (beta, market cap, sector, ...).
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn company_info(&self, symbol: &Symbol, use_cache: bool) -> Result<CompanyInfo> {
        let key = CacheKey::company_info(symbol);
        self.resolve::<JsonDocument, _>(&key, use_cache, self.download_company_info(symbol))
            .await
    }

    /// Institutional holders, major holders and recommendations.
    pub async fn holders_and_recommendations(
        &self,
        symbol: &Symbol,
        use_cache: bool,
    ) -> Result<HolderBundle> {
        self.holders(symbol, &HolderKind::ALL, use_cache).await
    }

    /// A subset of the holders/recommendations tables.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn holders(
        &self,
        symbol: &Symbol,
        kinds: &[HolderKind],
        use_cache: bool,
    ) -> Result<HolderBundle> {
        let mut bundle = HolderBundle::new();
        for kind in HolderKind::ALL.into_iter().filter(|k| kinds.contains(k)) {
            let key = CacheKey::holder(symbol, kind);
            let table = self
                .resolve::<RelationalCsv, _>(&key, use_cache, self.download_holders(symbol, kind))
                .await?;
            bundle.insert(kind, table);
        }
        Ok(bundle)
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve one cache entry.
    ///
    /// `download` is only awaited on a miss (or when `use_cache` is false).
    async fn resolve<C, F>(&self, key: &CacheKey, use_cache: bool, download: F) -> Result<C::Record>
    where
        C: Codec,
        C::Record: CacheableRecord,
        F: Future<Output = Result<C::Record>>,
    {
        let location = self.store.describe(key);

        if use_cache && self.store.exists(key) {
            info!(key = %key, "Loading {} from cache...", location);
            let bytes = self.store.read(key)?;
            return C::decode(&bytes);
        }

        info!(key = %key, "Downloading {}...", key);
        let record = download.await?;

        if !record.has_content() {
            debug!(key = %key, "Empty result, not caching");
            return Ok(record);
        }

        match C::encode(&record).and_then(|bytes| self.store.write(key, &bytes)) {
            Ok(()) => info!(key = %key, "Saved {} to {}", key, location),
            Err(e) => warn!(key = %key, error = %e, "Failed to cache {}", key),
        }
        Ok(record)
    }

    async fn download_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries> {
        let provider = self
            .price_provider
            .as_ref()
            .ok_or_else(|| not_configured(DataKind::PriceSeries))?;
        let frame = provider.fetch_price_history(symbol, start, end).await?;
        PriceSeries::normalize(frame)
    }

    async fn download_statement(
        &self,
        symbol: &Symbol,
        period: PeriodType,
        kind: StatementKind,
    ) -> Result<StatementTable> {
        let provider = self.fundamental_provider.as_ref().ok_or_else(|| {
            not_configured(match period {
                PeriodType::Annual => DataKind::AnnualStatements,
                PeriodType::Quarterly => DataKind::QuarterlyStatements,
            })
        })?;
        let frame = provider.fetch_statement(symbol, period, kind).await?;
        Ok(StatementTable::from_frame(frame))
    }

    async fn download_company_info(&self, symbol: &Symbol) -> Result<CompanyInfo> {
        let provider = self
            .reference_provider
            .as_ref()
            .ok_or_else(|| not_configured(DataKind::CompanyInfo))?;
        Ok(CompanyInfo::new(provider.fetch_company_info(symbol).await?))
    }

    async fn download_holders(&self, symbol: &Symbol, kind: HolderKind) -> Result<RelationalTable> {
        let provider = self
            .reference_provider
            .as_ref()
            .ok_or_else(|| not_configured(DataKind::HoldersAndRecommendations))?;
        Ok(RelationalTable::new(
            provider.fetch_holders(symbol, kind).await?,
        ))
    }
}

fn not_configured(kind: DataKind) -> DataError {
    DataError::ProviderNotConfigured(format!("No provider registered for {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dcf_data_core::record::LINE_ITEM_COLUMN;
    use dcf_data_core::types::date_column;
    use dcf_data_core::{DataProvider, Encoding};
    use dcf_data_store::{FileStore, InMemoryStore};
    use polars::prelude::*;
    use serde_json::{Map, Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn price_frame(close: &[f64]) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..close.len())
            .map(|i| ymd(2023, 1, 2) + chrono::Days::new(i as u64))
            .collect();
        DataFrame::new(vec![
            date_column("Date", &dates).unwrap(),
            Column::new("Open".into(), close.to_vec()),
            Column::new("High".into(), close.iter().map(|c| c + 1.0).collect::<Vec<_>>()),
            Column::new("Low".into(), close.iter().map(|c| c - 1.0).collect::<Vec<_>>()),
            Column::new("Close".into(), close.to_vec()),
            Column::new("Adj Close".into(), close.to_vec()),
            Column::new("Volume".into(), vec![1_000_i64; close.len()]),
        ])
        .unwrap()
    }

    fn statement_frame(item: &str, value: f64) -> DataFrame {
        DataFrame::new(vec![
            Column::new(LINE_ITEM_COLUMN.into(), vec![item]),
            Column::new("2023-12-31".into(), vec![value]),
            Column::new("2022-12-31".into(), vec![value * 0.9]),
        ])
        .unwrap()
    }

    fn info_map(beta: f64) -> Map<String, Value> {
        match json!({"beta": beta, "marketCap": 5_000_000_000_i64, "sector": "Industrials"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn recommendations_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("period".into(), vec!["0m", "-1m"]),
            Column::new("buy".into(), vec![21_i64, 24]),
        ])
        .unwrap()
    }

    /// Stub provider serving fixed data for a few symbols and counting calls.
    ///
    /// Unknown symbols yield empty results; `FAIL` yields a network error.
    #[derive(Debug, Default)]
    struct StubProvider {
        prices: HashMap<String, DataFrame>,
        statements: HashMap<(String, PeriodType, StatementKind), DataFrame>,
        info: HashMap<String, Map<String, Value>>,
        holders: HashMap<(String, HolderKind), DataFrame>,
        calls: AtomicUsize,
        price_requests: Mutex<Vec<(Symbol, NaiveDate, Option<NaiveDate>)>>,
    }

    impl StubProvider {
        fn acme() -> Self {
            let mut stub = Self::default();
            stub.prices.insert("ACME".into(), price_frame(&[100.0, 101.5]));
            stub.prices.insert("^TNX".into(), price_frame(&[3.9, 4.1, 4.0]));
            for period in [PeriodType::Annual, PeriodType::Quarterly] {
                stub.statements.insert(
                    ("ACME".into(), period, StatementKind::IncomeStatement),
                    statement_frame("NetIncome", 97.0),
                );
                stub.statements.insert(
                    ("ACME".into(), period, StatementKind::BalanceSheet),
                    statement_frame("TotalDebt", 110.0),
                );
                stub.statements.insert(
                    ("ACME".into(), period, StatementKind::CashFlow),
                    statement_frame("FreeCashFlow", 99.5),
                );
            }
            stub.info.insert("ACME".into(), info_map(1.2));
            stub.holders.insert(
                ("ACME".into(), HolderKind::Recommendations),
                recommendations_frame(),
            );
            stub
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record_call(&self, symbol: &Symbol) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol.as_str() == "FAIL" {
                return Err(DataError::Network("connection reset".to_string()));
            }
            Ok(())
        }
    }

    impl DataProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn description(&self) -> &str {
            "Stub provider for router tests"
        }
    }

    #[async_trait]
    impl PriceDataProvider for StubProvider {
        async fn fetch_price_history(
            &self,
            symbol: &Symbol,
            start: NaiveDate,
            end: Option<NaiveDate>,
        ) -> Result<DataFrame> {
            self.record_call(symbol)?;
            self.price_requests
                .lock()
                .unwrap()
                .push((symbol.clone(), start, end));
            Ok(self
                .prices
                .get(symbol.as_str())
                .cloned()
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl FundamentalDataProvider for StubProvider {
        async fn fetch_statement(
            &self,
            symbol: &Symbol,
            period: PeriodType,
            kind: StatementKind,
        ) -> Result<DataFrame> {
            self.record_call(symbol)?;
            Ok(self
                .statements
                .get(&(symbol.to_string(), period, kind))
                .cloned()
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl ReferenceDataProvider for StubProvider {
        async fn fetch_company_info(&self, symbol: &Symbol) -> Result<Map<String, Value>> {
            self.record_call(symbol)?;
            Ok(self.info.get(symbol.as_str()).cloned().unwrap_or_default())
        }

        async fn fetch_holders(&self, symbol: &Symbol, kind: HolderKind) -> Result<DataFrame> {
            self.record_call(symbol)?;
            Ok(self
                .holders
                .get(&(symbol.to_string(), kind))
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Store that never hits and fails every write.
    #[derive(Debug)]
    struct ReadOnlyStore;

    impl CacheStore for ReadOnlyStore {
        fn exists(&self, _key: &CacheKey) -> bool {
            false
        }

        fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
            Err(DataError::Cache(format!("{key} is not stored")))
        }

        fn write(&self, _key: &CacheKey, _bytes: &[u8]) -> Result<()> {
            Err(DataError::Cache("read-only file system".to_string()))
        }
    }

    fn router_with(store: Arc<dyn CacheStore>, stub: &Arc<StubProvider>) -> DataRouter {
        let mut router = DataRouter::new(store);
        router.register_price(stub.clone());
        router.register_fundamental(stub.clone());
        router.register_reference(stub.clone());
        router
    }

    fn file_names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_acme_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);
        let acme = Symbol::new("ACME");

        let prices = router.price_history(&acme, None, None, true).await.unwrap();
        assert_eq!(
            prices.dates().unwrap(),
            [Some(ymd(2023, 1, 2)), Some(ymd(2023, 1, 3))]
        );
        let annual = router.annual_statements(&acme, true).await.unwrap();
        assert_eq!(annual.len(), 3);
        let info = router.company_info(&acme, true).await.unwrap();
        assert_eq!(info.get_f64("beta"), Some(1.2));
        assert_eq!(stub.calls(), 5);

        assert_eq!(
            file_names(dir.path()),
            [
                "ACME.csv",
                "ACME_balance_sheet.csv",
                "ACME_cashflow.csv",
                "ACME_income_stmt.csv",
                "ACME_info.json",
            ]
        );

        let json = std::fs::read_to_string(dir.path().join("ACME_info.json")).unwrap();
        assert!(json.starts_with("{\n    \"beta\": 1.2"));

        // Warm cache: identical results, no remote calls
        let again = router.price_history(&acme, None, None, true).await.unwrap();
        assert_eq!(again, prices);
        assert_eq!(
            again.frame().column("Date").unwrap().dtype(),
            &DataType::Date
        );
        let annual_again = router.annual_statements(&acme, true).await.unwrap();
        assert_eq!(annual_again, annual);
        assert!(annual_again.income_statement().unwrap().periods().is_dates());
        assert_eq!(router.company_info(&acme, true).await.unwrap(), info);
        assert_eq!(stub.calls(), 5);
    }

    #[tokio::test]
    async fn test_price_history_defaults_start() {
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(Arc::new(InMemoryStore::new()), &stub);

        router
            .price_history(&Symbol::new("ACME"), None, None, true)
            .await
            .unwrap();

        let requests = stub.price_requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            [(Symbol::new("ACME"), ymd(2023, 1, 1), None)]
        );
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);
        let zzzz = Symbol::new("ZZZZ");

        let prices = router.price_history(&zzzz, None, None, true).await.unwrap();
        assert!(prices.is_empty());
        let info = router.company_info(&zzzz, true).await.unwrap();
        assert!(info.is_empty());
        let holders = router
            .holders_and_recommendations(&zzzz, true)
            .await
            .unwrap();
        assert_eq!(holders.len(), 3);
        assert!(holders.is_empty());
        assert_eq!(stub.calls(), 5);
        assert!(file_names(dir.path()).is_empty());

        // Empty results are requested again
        router.price_history(&zzzz, None, None, true).await.unwrap();
        assert_eq!(stub.calls(), 6);
        assert!(file_names(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_partial_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);
        let acme = Symbol::new("ACME");

        let holders = router
            .holders_and_recommendations(&acme, true)
            .await
            .unwrap();
        let kinds: Vec<HolderKind> = holders.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, HolderKind::ALL);
        assert!(holders.get(HolderKind::InstitutionalHolders).unwrap().is_empty());
        assert!(holders.get(HolderKind::MajorHolders).unwrap().is_empty());
        assert_eq!(holders.get(HolderKind::Recommendations).unwrap().len(), 2);
        assert_eq!(file_names(dir.path()), ["ACME_recommendations.csv"]);
        assert_eq!(stub.calls(), 3);

        // Only the two empty tables are requested again
        let again = router
            .holders_and_recommendations(&acme, true)
            .await
            .unwrap();
        assert_eq!(again, holders);
        assert_eq!(stub.calls(), 5);
    }

    #[tokio::test]
    async fn test_zzzz_statements_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);

        let annual = router
            .annual_statements(&Symbol::new("ZZZZ"), true)
            .await
            .unwrap();
        assert_eq!(annual.len(), 3);
        assert!(annual.is_empty());
        assert!(annual.iter().all(|(_, table)| table.is_empty()));
        assert_eq!(stub.calls(), 3);
        assert!(file_names(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_partial_statement_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let acme = Symbol::new("ACME");
        let cached = StatementTable::from_frame(statement_frame("TotalDebt", 5.0));
        store
            .write(
                &CacheKey::statement(&acme, PeriodType::Annual, StatementKind::BalanceSheet),
                &DateColumnedCsv::encode(&cached).unwrap(),
            )
            .unwrap();

        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);

        let annual = router.annual_statements(&acme, true).await.unwrap();
        assert_eq!(stub.calls(), 2);
        assert_eq!(annual.len(), 3);
        assert_eq!(annual.balance_sheet().unwrap().value("TotalDebt", 0), Some(5.0));
        assert_eq!(
            annual.income_statement().unwrap().value("NetIncome", 0),
            Some(97.0)
        );
        assert_eq!(
            file_names(dir.path()),
            [
                "ACME_balance_sheet.csv",
                "ACME_cashflow.csv",
                "ACME_income_stmt.csv",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_holder_column_matches_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let mut stub = StubProvider::acme();
        stub.holders.insert(
            ("ACME".into(), HolderKind::InstitutionalHolders),
            DataFrame::new(vec![
                Column::new("Holder".into(), vec!["Vanguard Group Inc", "Blackrock Inc."]),
                Column::new("pctHeld".into(), vec![0.0875, 0.069]),
                Column::new("Shares".into(), vec![1_303_688_506_i64, 1_028_938_638]),
                Column::new("pctChange".into(), vec![None::<f64>, None]),
            ])
            .unwrap(),
        );
        let stub = Arc::new(stub);
        let router = router_with(store, &stub);
        let acme = Symbol::new("ACME");

        let cold = router
            .holders_and_recommendations(&acme, true)
            .await
            .unwrap();
        let warm = router
            .holders_and_recommendations(&acme, true)
            .await
            .unwrap();

        let institutional = warm.get(HolderKind::InstitutionalHolders).unwrap();
        assert_eq!(
            institutional.frame().column("pctChange").unwrap().dtype(),
            &DataType::Float64
        );
        assert_eq!(warm, cold);
        // Only major holders is empty and requested again
        assert_eq!(stub.calls(), 4);
    }

    #[tokio::test]
    async fn test_quarterly_statements_use_their_own_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);
        let acme = Symbol::new("ACME");

        router.annual_statements(&acme, true).await.unwrap();
        let quarterly = router.quarterly_statements(&acme, true).await.unwrap();
        assert_eq!(quarterly.period(), PeriodType::Quarterly);
        assert_eq!(stub.calls(), 6);
        assert!(dir.path().join("ACME_quarterly_cashflow.csv").is_file());
        assert!(dir.path().join("ACME_cashflow.csv").is_file());
    }

    #[tokio::test]
    async fn test_refresh_replaces_entry() {
        let store = Arc::new(InMemoryStore::new());
        let acme = Symbol::new("ACME");
        let key = CacheKey::company_info(&acme);
        store
            .write(&key, &JsonDocument::encode(&CompanyInfo::new(info_map(0.8))).unwrap())
            .unwrap();

        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store.clone(), &stub);

        let cached = router.company_info(&acme, true).await.unwrap();
        assert_eq!(cached.get_f64("beta"), Some(0.8));
        assert_eq!(stub.calls(), 0);

        let fresh = router.company_info(&acme, false).await.unwrap();
        assert_eq!(fresh.get_f64("beta"), Some(1.2));
        assert_eq!(stub.calls(), 1);

        let stored = JsonDocument::decode(&store.read(&key).unwrap()).unwrap();
        assert_eq!(stored, fresh);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let store = Arc::new(InMemoryStore::new());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store.clone(), &stub);

        let result = router.price_history(&Symbol::new("FAIL"), None, None, true).await;
        assert!(matches!(result, Err(DataError::Network(_))));

        let result = router.annual_statements(&Symbol::new("FAIL"), true).await;
        assert!(matches!(result, Err(DataError::Network(_))));
        // The bundle stops at the first failing component
        assert_eq!(stub.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_data() {
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(Arc::new(ReadOnlyStore), &stub);
        let acme = Symbol::new("ACME");

        let prices = router.price_history(&acme, None, None, true).await.unwrap();
        assert_eq!(prices.len(), 2);
        let info = router.company_info(&acme, true).await.unwrap();
        assert_eq!(info.get_str("sector"), Some("Industrials"));

        // Nothing was stored, so the next call downloads again
        router.price_history(&acme, None, None, true).await.unwrap();
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_decode_error() {
        let store = Arc::new(InMemoryStore::new());
        let acme = Symbol::new("ACME");
        store
            .write(&CacheKey::company_info(&acme), b"[\"not\", \"an object\"]")
            .unwrap();

        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);

        let result = router.company_info(&acme, true).await;
        assert!(matches!(result, Err(DataError::Parse(_))));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_two_level_headers_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let mut stub = StubProvider::default();
        let frame = DataFrame::new(vec![
            Column::new("Close|ACME".into(), vec![100.0]),
            Column::new("Volume|ACME".into(), vec![10_i64]),
            date_column("Date", &[ymd(2023, 1, 3)]).unwrap(),
        ])
        .unwrap();
        stub.prices.insert("ACME".into(), frame);
        let stub = Arc::new(stub);
        let router = router_with(store, &stub);

        router
            .price_history(&Symbol::new("ACME"), None, None, true)
            .await
            .unwrap();

        let csv = std::fs::read_to_string(dir.path().join("ACME.csv")).unwrap();
        assert_eq!(csv.lines().next(), Some("Date,Close,Volume"));
    }

    #[tokio::test]
    async fn test_treasury_yield() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(store, &stub);

        let rf = router.treasury_yield(None, None, None, true).await.unwrap();
        let names: Vec<&str> = rf
            .get_column_names()
            .into_iter()
            .map(PlSmallStr::as_str)
            .collect();
        assert_eq!(names, ["Date", "Close"]);
        assert_eq!(rf.height(), 3);
        assert_eq!(
            stub.price_requests.lock().unwrap().as_slice(),
            [(Symbol::new("^TNX"), ymd(2019, 1, 1), None)]
        );
        assert!(dir.path().join("^TNX.csv").is_file());

        // Same entry as the plain price history of the same symbol
        let series = router
            .price_history(&Symbol::new("^TNX"), None, None, true)
            .await
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(stub.calls(), 1);

        let empty = router
            .treasury_yield(Some(&Symbol::new("ZZZZ")), None, None, true)
            .await
            .unwrap();
        assert_eq!(empty.height(), 0);
    }

    #[tokio::test]
    async fn test_missing_provider_only_matters_on_miss() {
        let store = Arc::new(InMemoryStore::new());
        let acme = Symbol::new("ACME");
        store
            .write(
                &CacheKey::company_info(&acme),
                &JsonDocument::encode(&CompanyInfo::new(info_map(1.0))).unwrap(),
            )
            .unwrap();
        let router = DataRouter::new(store);

        let info = router.company_info(&acme, true).await.unwrap();
        assert_eq!(info.get_f64("beta"), Some(1.0));

        let result = router.price_history(&acme, None, None, true).await;
        assert!(matches!(result, Err(DataError::ProviderNotConfigured(_))));
        let result = router.company_info(&acme, false).await;
        assert!(matches!(result, Err(DataError::ProviderNotConfigured(_))));
    }

    #[tokio::test]
    async fn test_fetch() {
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(Arc::new(InMemoryStore::new()), &stub);
        let acme = Symbol::new("ACME");

        let record = router
            .fetch(&acme, DataKind::PriceSeries, &FetchOptions::new())
            .await
            .unwrap();
        assert_eq!(record.kind(), DataKind::PriceSeries);
        assert_eq!(record.into_price_series().unwrap().len(), 2);

        let options = FetchOptions::new().with_sub_kinds([
            SubKind::Statement(StatementKind::CashFlow),
            SubKind::Statement(StatementKind::IncomeStatement),
        ]);
        let bundle = router
            .fetch(&acme, DataKind::QuarterlyStatements, &options)
            .await
            .unwrap()
            .into_statements()
            .unwrap();
        let kinds: Vec<StatementKind> = bundle.iter().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            [StatementKind::IncomeStatement, StatementKind::CashFlow]
        );
        assert!(bundle.balance_sheet().is_none());

        let record = router
            .fetch(&acme, DataKind::CompanyInfo, &router.default_options())
            .await
            .unwrap();
        assert_eq!(record.kind(), DataKind::CompanyInfo);
        assert_eq!(stub.calls(), 4);
    }

    #[tokio::test]
    async fn test_fetch_rejects_foreign_sub_kinds() {
        let stub = Arc::new(StubProvider::acme());
        let router = router_with(Arc::new(InMemoryStore::new()), &stub);
        let acme = Symbol::new("ACME");

        let options =
            FetchOptions::new().with_sub_kinds([SubKind::Holder(HolderKind::MajorHolders)]);
        let result = router
            .fetch(&acme, DataKind::AnnualStatements, &options)
            .await;
        assert!(matches!(result, Err(DataError::InvalidParameter(_))));

        let result = router.fetch(&acme, DataKind::PriceSeries, &options).await;
        assert!(matches!(result, Err(DataError::InvalidParameter(_))));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataConfig {
            cache_dir: dir.path().to_path_buf(),
            use_cache: false,
            risk_free_symbol: Symbol::new("^IRX"),
            ..Default::default()
        };
        let mut router = DataRouter::from_config(&config).unwrap();
        assert!(!router.defaults().use_cache);
        assert!(!router.default_options().use_cache);

        let stub = Arc::new(StubProvider::acme());
        router.register_price(stub.clone());
        let rf = router.treasury_yield(None, None, None, true).await.unwrap();
        assert_eq!(rf.height(), 0);
        assert_eq!(
            stub.price_requests.lock().unwrap()[0].0,
            Symbol::new("^IRX")
        );
        assert_eq!(
            CacheKey::price_series(&Symbol::new("^IRX")).encoding(),
            Encoding::DelimitedText
        );
    }
}
