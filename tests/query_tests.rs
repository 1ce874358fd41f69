// tests/query_tests.rs
use geo::{BoundingRect, Coord, Intersects, Rect};
use ndvi_pipeline::index::{read_index, write_index, IndexRecord};
use ndvi_pipeline::io::reader::GeoInfo;
use ndvi_pipeline::query::geometry::{parse_wkt_polygon, raster_extent, PixelMapper};
use std::fs;
use std::path::PathBuf;

/// A UTM-like north-up geotransform: 30 m pixels, origin at (300000, 4600000)
const GT: [f64; 6] = [300000.0, 30.0, 0.0, 4600000.0, 0.0, -30.0];

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ndvi_pipeline_{}_{}", std::process::id(), name))
}

/// Pixel centers map back to the pixel they came from
#[test]
fn test_pixel_mapper_round_trip() {
    let mapper = PixelMapper::new(GT, 100, 80).unwrap();

    for (row, col) in [(0usize, 0usize), (79, 99), (40, 12), (7, 63)] {
        let (x, y) = mapper.pixel_center(row, col);
        assert_eq!(mapper.world_to_pixel(x, y), Some((row, col)));
    }
}

/// Coordinates outside the raster resolve to no pixel, never an error
#[test]
fn test_pixel_mapper_out_of_bounds() {
    let mapper = PixelMapper::new(GT, 100, 80).unwrap();

    // west and north of the origin
    assert_eq!(mapper.world_to_pixel(299999.0, 4599999.0), None);
    assert_eq!(mapper.world_to_pixel(300001.0, 4600001.0), None);
    // one pixel past the south-east corner
    assert_eq!(mapper.world_to_pixel(300000.0 + 101.0 * 30.0, 4600000.0 - 81.0 * 30.0), None);
    // exactly on the exclusive edge
    assert_eq!(mapper.world_to_pixel(300000.0 + 100.0 * 30.0, 4600000.0), None);
}

/// A non-invertible geotransform is rejected at construction
#[test]
fn test_pixel_mapper_degenerate_geotransform() {
    assert!(PixelMapper::new([0.0; 6], 10, 10).is_err());
}

/// Raster extent spans the geotransformed corners with a negative row step
#[test]
fn test_raster_extent() {
    let geo = GeoInfo {
        projection: String::new(),
        geo_transform: GT,
        width: 100,
        height: 80,
    };
    let extent = raster_extent(&geo);

    assert_eq!(extent.min().x, 300000.0);
    assert_eq!(extent.max().x, 300000.0 + 100.0 * 30.0);
    assert_eq!(extent.max().y, 4600000.0);
    assert_eq!(extent.min().y, 4600000.0 - 80.0 * 30.0);
}

/// WKT polygons parse; other geometry kinds and garbage are rejected
#[test]
fn test_parse_wkt_polygon() {
    let polygon =
        parse_wkt_polygon("POLYGON ((-113.9 32.8, -116.8 35.7, -110.8 45.9, -113.9 32.8))")
            .unwrap();
    let bbox = polygon.bounding_rect().unwrap();
    assert!((bbox.min().x - (-116.8)).abs() < 1e-9);
    assert!((bbox.max().y - 45.9).abs() < 1e-9);

    assert!(parse_wkt_polygon("POINT (1 2)").is_err());
    assert!(parse_wkt_polygon("definitely not wkt").is_err());
}

/// The index round-trips file names and bounding rectangles through CSV
#[test]
fn test_index_round_trip() {
    let path = temp_path("index_round_trip.csv");

    let first = Rect::new(Coord { x: -116.8, y: 32.8 }, Coord { x: -110.8, y: 45.9 });
    let second = Rect::new(Coord { x: 2.0, y: 48.0 }, Coord { x: 3.0, y: 49.0 });
    let records = vec![
        IndexRecord::new("scene_a".to_string(), &first),
        IndexRecord::new("scene_b".to_string(), &second),
    ];

    write_index(&path, &records).unwrap();
    let rects = read_index(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(rects.len(), 2);
    let restored = rects["scene_a"];
    assert!((restored.min().x - first.min().x).abs() < 1e-9);
    assert!((restored.max().y - first.max().y).abs() < 1e-9);
    assert!(rects.contains_key("scene_b"));
}

/// The bounding-rectangle pre-filter excludes disjoint rasters and admits
/// touching or overlapping ones; a raster absent from the index is always
/// checked, so the filter cannot produce false negatives
#[test]
fn test_mbr_prefilter_soundness() {
    let query = parse_wkt_polygon("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();
    let query_bbox = query.bounding_rect().unwrap();

    let disjoint = Rect::new(Coord { x: 20.0, y: 20.0 }, Coord { x: 30.0, y: 30.0 });
    let overlapping = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 15.0, y: 15.0 });
    let touching = Rect::new(Coord { x: 10.0, y: 0.0 }, Coord { x: 20.0, y: 10.0 });
    let containing = Rect::new(Coord { x: -5.0, y: -5.0 }, Coord { x: 15.0, y: 15.0 });

    assert!(!disjoint.intersects(&query_bbox));
    assert!(overlapping.intersects(&query_bbox));
    // boundary contact must be admitted, pruning it would be a false negative
    assert!(touching.intersects(&query_bbox));
    assert!(containing.intersects(&query_bbox));

    // An index without the raster's record prunes nothing.
    let index: std::collections::HashMap<String, Rect<f64>> = std::collections::HashMap::new();
    assert!(index.get("unindexed_scene").is_none());
}
