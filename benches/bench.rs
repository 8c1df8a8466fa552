//! Criterion benchmarks for the dynamic query builder.
//!
//! Covers property resolution through the entity cache and assembly of
//! complete search requests.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use dynamic_query::prelude::*;
use std::hint::black_box;
use std::sync::Arc;

struct Listing;

impl Listing {
    const TITLE: Property<Listing, String> = Property::new("title");
    const CITY: Property<Listing, String> = Property::new("city");
    const PRICE: Property<Listing, f64> = Property::new("price");
    const ROOMS: Property<Listing, i64> = Property::new("rooms");
    const RATING: Property<Listing, f64> = Property::new("rating");
}

impl Entity for Listing {
    fn schema() -> Result<EntitySchema> {
        EntitySchema::builder("listings")
            .field("title")
            .field_as("city", "city.keyword")
            .field("price")
            .field("rooms")
            .field_as("rating", "avg_rating")
            .build()
    }
}

fn build_listing_query(cache: &Arc<EntityCache>, city: &str) -> Result<SearchRequest> {
    let request = DynamicQuery::<Listing>::query(Arc::clone(cache))?
        .and(Listing::CITY, FilterOperator::Equal, city)?
        .and(Listing::PRICE, FilterOperator::LessThanEqual, 2500.0)?
        .or(Listing::ROOMS, FilterOperator::GreaterThan, 2)?
        .weight_function_when(Listing::TITLE, FilterOperator::Contains, "garden", 1.5)?
        .field_value_factor_function(Listing::RATING, 1.2)?
        .boost_mode(BoostMode::Sum)
        .max_boost(10.0)?
        .order_by_score(SortOrder::Desc)
        .order_by(Listing::PRICE, SortOrder::Asc)?
        .select(&[Listing::TITLE.erase(), Listing::PRICE.erase()])?
        .build_request();
    Ok(request)
}

/// Benchmark property resolution.
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let cache = EntityCache::new();
    cache.entity_info::<Listing>().unwrap();

    group.bench_function("resolve_cached_property", |b| {
        b.iter(|| black_box(cache.column_name(black_box(Listing::CITY))))
    });

    group.bench_function("load_schema_cold", |b| {
        b.iter(|| {
            let cold = EntityCache::new();
            black_box(cold.entity_info::<Listing>())
        })
    });

    group.finish();
}

/// Benchmark request assembly and rendering.
fn bench_request_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_building");

    let cache = Arc::new(EntityCache::new());
    let cities = ["berlin", "lisbon", "osaka", "toronto"];

    group.bench_function("build_request", |b| {
        b.iter(|| black_box(build_listing_query(&cache, black_box("berlin"))))
    });

    let request = build_listing_query(&cache, "berlin").unwrap();
    group.bench_function("render_body", |b| b.iter(|| black_box(request.to_body())));

    group.throughput(Throughput::Elements(cities.len() as u64));
    group.bench_function("build_and_render_batch", |b| {
        b.iter(|| {
            for city in cities.iter() {
                let body = build_listing_query(&cache, city).map(|request| request.to_body());
                let _ = black_box(body);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_request_building);
criterion_main!(benches);
