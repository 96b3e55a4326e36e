#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for bookswap proximity search.
//!
//! ```text
//! bookswap nearby --data fixtures/milan.json --lat 45.4642 --lng 9.19 --radius-km 10
//! bookswap nearby --data fixtures/milan.json --collection books --lat 45.4642 --lng 9.19 --radius-km 5
//! bookswap geohash --lat 45.4642 --lng 9.19 [--precision 10]
//! bookswap bounds --lat 45.4642 --lng 9.19 --radius-km 10
//! bookswap indexes --collection locations --type library --hub-only
//! ```
//!
//! Set `RUST_LOG=debug` to see range fan-out and candidate counts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookswap_proximity::{MemoryRecordStore, ProximitySearchEngine, SearchConfig};
use bookswap_proximity_models::{Collection, Coordinates, SearchFilters, SearchQuery, SearchResult};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookswap", about = "Find swap locations and books near a point")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a JSON fixture for records near a point
    Nearby {
        /// Fixture file: `{ "locations": [...], "books": [...] }`
        #[arg(long)]
        data: PathBuf,
        /// Collection to search (locations, books)
        #[arg(long, default_value = "locations")]
        collection: Collection,
        /// Center latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Center longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Search radius in kilometers (clamped to the configured maximum)
        #[arg(long)]
        radius_km: f64,
        /// Only records of this type (e.g. library, cafe)
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Only hubs (milestone level 1 or higher)
        #[arg(long)]
        hub_only: bool,
        /// Search config TOML (defaults to the built-in limits)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the geohash of a point
    Geohash {
        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Number of characters
        #[arg(long, default_value_t = bookswap_geo::GEOHASH_PRECISION)]
        precision: usize,
    },
    /// Print the geohash ranges covering a circle
    Bounds {
        /// Center latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Center longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Radius in kilometers
        #[arg(long)]
        radius_km: f64,
    },
    /// Print the composite indexes a store needs for a search
    Indexes {
        /// Collection to search (locations, books)
        #[arg(long, default_value = "locations")]
        collection: Collection,
        /// Type filter the search will use
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Whether the search will use the hub filter
        #[arg(long)]
        hub_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Nearby {
            data,
            collection,
            lat,
            lng,
            radius_km,
            record_type,
            hub_only,
            config,
        } => {
            let config = SearchConfig::load(config.as_deref())?;
            let store = load_store(&data)?;
            let query = SearchQuery {
                center: Coordinates { lat, lng },
                radius_km,
                filters: SearchFilters {
                    record_type,
                    hub_only,
                    extra: Vec::new(),
                },
            };

            let results = nearby(store, collection, config, &query).await?;
            log::info!(
                "{} {collection} within {} km",
                results.len(),
                query.radius_km
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Geohash {
            lat,
            lng,
            precision,
        } => {
            println!("{}", geohash_output(lat, lng, precision)?);
        }
        Commands::Bounds {
            lat,
            lng,
            radius_km,
        } => {
            println!("{}", bounds_output(lat, lng, radius_km)?);
        }
        Commands::Indexes {
            collection,
            record_type,
            hub_only,
        } => {
            let engine = ProximitySearchEngine::new(
                Arc::new(MemoryRecordStore::new()),
                collection,
                SearchConfig::default(),
            );
            let filters = SearchFilters {
                record_type,
                hub_only,
                extra: Vec::new(),
            };
            for index in engine.required_indexes(&filters) {
                println!("{index}");
            }
        }
    }

    Ok(())
}

fn geohash_output(
    lat: f64,
    lng: f64,
    precision: usize,
) -> Result<String, bookswap_geo::GeohashError> {
    bookswap_geo::encode(lat, lng, precision)
}

fn bounds_output(lat: f64, lng: f64, radius_km: f64) -> Result<String, Box<dyn std::error::Error>> {
    let ranges = bookswap_geo::query_bounds(lat, lng, radius_km * 1000.0)?;
    Ok(serde_json::to_string_pretty(&ranges)?)
}

fn load_store(path: &Path) -> Result<MemoryRecordStore, Box<dyn std::error::Error>> {
    log::info!("Loading fixture {}", path.display());
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(MemoryRecordStore::from_json(&json)?)
}

async fn nearby(
    store: MemoryRecordStore,
    collection: Collection,
    config: SearchConfig,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>, bookswap_proximity::ProximityError> {
    let engine = ProximitySearchEngine::new(Arc::new(store), collection, config);
    engine.search(query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const MILAN_FIXTURE: &str = include_str!("../fixtures/milan.json");

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.record.id()).collect()
    }

    fn milan_query(radius_km: f64, filters: SearchFilters) -> SearchQuery {
        SearchQuery::new(Coordinates::new(45.4642, 9.19).unwrap(), radius_km).with_filters(filters)
    }

    #[test]
    fn cli_parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "bookswap", "geohash", "--lat", "-33.8688", "--lng", "-151.2093",
        ])
        .unwrap();
        match cli.command {
            Commands::Geohash {
                lat,
                lng,
                precision,
            } => {
                assert!((lat + 33.8688).abs() < 1e-12);
                assert!((lng + 151.2093).abs() < 1e-12);
                assert_eq!(precision, bookswap_geo::GEOHASH_PRECISION);
            }
            _ => panic!("expected geohash command"),
        }
    }

    #[test]
    fn cli_parses_collection_and_filters() {
        let cli = Cli::try_parse_from([
            "bookswap",
            "nearby",
            "--data",
            "fixtures/milan.json",
            "--collection",
            "books",
            "--lat",
            "45.4642",
            "--lng",
            "9.19",
            "--radius-km",
            "5",
            "--type",
            "library",
            "--hub-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Nearby {
                collection,
                record_type,
                hub_only,
                config,
                ..
            } => {
                assert_eq!(collection, Collection::Books);
                assert_eq!(record_type.as_deref(), Some("library"));
                assert!(hub_only);
                assert!(config.is_none());
            }
            _ => panic!("expected nearby command"),
        }
    }

    #[test]
    fn geohash_command_prints_encoded_hash() {
        let cli = Cli::try_parse_from([
            "bookswap", "geohash", "--lat", "45.4642", "--lng", "9.19",
        ])
        .unwrap();
        let Commands::Geohash {
            lat,
            lng,
            precision,
        } = cli.command
        else {
            panic!("expected geohash command");
        };
        assert_eq!(geohash_output(lat, lng, precision).unwrap(), "u0nd9hebnt");

        let cli = Cli::try_parse_from([
            "bookswap", "geohash", "--lat", "45.4642", "--lng", "9.19", "--precision", "4",
        ])
        .unwrap();
        let Commands::Geohash {
            lat,
            lng,
            precision,
        } = cli.command
        else {
            panic!("expected geohash command");
        };
        assert_eq!(geohash_output(lat, lng, precision).unwrap(), "u0nd");
        assert!(geohash_output(lat, lng, 0).is_err());
    }

    #[test]
    fn bounds_command_prints_range_list() {
        let cli = Cli::try_parse_from([
            "bookswap",
            "bounds",
            "--lat",
            "45.4642",
            "--lng",
            "9.19",
            "--radius-km",
            "0.00001",
        ])
        .unwrap();
        let Commands::Bounds {
            lat,
            lng,
            radius_km,
        } = cli.command
        else {
            panic!("expected bounds command");
        };
        let printed: serde_json::Value =
            serde_json::from_str(&bounds_output(lat, lng, radius_km).unwrap()).unwrap();
        assert_eq!(
            printed,
            serde_json::json!([{ "low": "u0nd9hebnt", "high": "u0nd9hebnu" }])
        );

        let printed: Vec<bookswap_geo::GeohashRange> =
            serde_json::from_str(&bounds_output(45.4642, 9.19, 10.0).unwrap()).unwrap();
        assert_eq!(printed, bookswap_geo::query_bounds(45.4642, 9.19, 10_000.0).unwrap());
        assert!(printed.iter().any(|range| range.contains("u0nd9hebnt")));

        assert!(bounds_output(45.4642, 9.19, 0.0).is_err());
    }

    #[tokio::test]
    async fn fixture_locations_near_duomo() {
        let store = MemoryRecordStore::from_json(MILAN_FIXTURE).unwrap();
        let results = nearby(
            store,
            Collection::Locations,
            SearchConfig::default(),
            &milan_query(10.0, SearchFilters::default()),
        )
        .await
        .unwrap();

        assert_eq!(
            ids(&results),
            vec!["loc-duomo", "loc-brera", "loc-navigli", "loc-isola"]
        );
    }

    #[tokio::test]
    async fn fixture_hubs_within_clamped_radius() {
        let store = MemoryRecordStore::from_json(MILAN_FIXTURE).unwrap();
        let results = nearby(
            store,
            Collection::Locations,
            SearchConfig::default(),
            &milan_query(
                200.0,
                SearchFilters {
                    hub_only: true,
                    ..SearchFilters::default()
                },
            ),
        )
        .await
        .unwrap();

        assert_eq!(
            ids(&results),
            vec!["loc-duomo", "loc-navigli", "loc-monza", "loc-bergamo"]
        );
    }

    #[tokio::test]
    async fn fixture_available_books() {
        let store = MemoryRecordStore::from_json(MILAN_FIXTURE).unwrap();
        let results = nearby(
            store,
            Collection::Books,
            SearchConfig::default(),
            &milan_query(5.0, SearchFilters::default()),
        )
        .await
        .unwrap();

        assert_eq!(ids(&results), vec!["book-1", "book-2"]);
    }
}
