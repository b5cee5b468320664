// =============================================================================
// Market Data Providers
// =============================================================================
//
// Everything that performs I/O to obtain market data lives here, strictly
// upstream of the analytics engines: the CoinGecko REST client for live data
// and the CSV loader for pre-recorded snapshot files.

pub mod coingecko;
pub mod csv_snapshots;
