// src/query/geometry.rs
use anyhow::{anyhow, bail, Result};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use geo::{Coord, Geometry, LineString, Polygon, Rect};
use std::str::FromStr;
use wkt::Wkt;

use crate::io::reader::GeoInfo;

/// Parses a WKT polygon in EPSG:4326. Multi-part geometries are not
/// supported; a point query has its own entry path.
pub fn parse_wkt_polygon(wkt_string: &str) -> Result<Polygon<f64>> {
    let wkt = Wkt::<f64>::from_str(wkt_string.trim())
        .map_err(|e| anyhow!("invalid WKT geometry: {e}"))?;
    let geometry = Geometry::try_from(wkt)
        .map_err(|e| anyhow!("unsupported WKT geometry: {e}"))?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(polygon),
        other => bail!("expected a POLYGON, got {}", kind_of(&other)),
    }
}

fn kind_of(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) | Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "RECT",
        Geometry::Triangle(_) => "TRIANGLE",
    }
}

/// WGS84 with traditional (lon, lat) axis order.
pub fn wgs84() -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_epsg(4326)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Spatial reference of a raster from its projection WKT. None when the
/// raster carries no projection, in which case coordinates are taken as-is.
pub fn raster_srs(projection: &str) -> Result<Option<SpatialRef>> {
    if projection.trim().is_empty() {
        return Ok(None);
    }
    let mut srs = SpatialRef::from_wkt(projection)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(Some(srs))
}

/// Transforms a single (x, y) between two spatial references.
pub fn transform_point(src: &SpatialRef, dst: &SpatialRef, x: f64, y: f64) -> Result<(f64, f64)> {
    let transform = CoordTransform::new(src, dst)?;
    let mut xs = [x];
    let mut ys = [y];
    let mut zs = [0.0];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok((xs[0], ys[0]))
}

/// Reprojects a polygon's exterior and interior rings between two spatial
/// references.
pub fn reproject_polygon(
    polygon: &Polygon<f64>,
    src: &SpatialRef,
    dst: &SpatialRef,
) -> Result<Polygon<f64>> {
    let transform = CoordTransform::new(src, dst)?;
    let exterior = reproject_ring(polygon.exterior(), &transform)?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| reproject_ring(ring, &transform))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn reproject_ring(ring: &LineString<f64>, transform: &CoordTransform) -> Result<LineString<f64>> {
    let mut xs: Vec<f64> = ring.coords().map(|c| c.x).collect();
    let mut ys: Vec<f64> = ring.coords().map(|c| c.y).collect();
    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok(LineString::new(
        xs.into_iter()
            .zip(ys)
            .map(|(x, y)| Coord { x, y })
            .collect(),
    ))
}

/// Reprojects an axis-aligned rectangle by sampling points along its edges
/// and taking the bounding rectangle of the result. Densification keeps the
/// rectangle a superset of the true reprojected footprint, so an
/// intersection pre-filter built on it can admit false positives but never
/// produce false negatives.
pub fn reproject_rect(
    rect: &Rect<f64>,
    src: &SpatialRef,
    dst: &SpatialRef,
    samples_per_edge: usize,
) -> Result<Rect<f64>> {
    let transform = CoordTransform::new(src, dst)?;
    let steps = samples_per_edge.max(1);

    let min = rect.min();
    let max = rect.max();
    let mut xs = Vec::with_capacity(4 * (steps + 1));
    let mut ys = Vec::with_capacity(4 * (steps + 1));
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = min.x + t * (max.x - min.x);
        let y = min.y + t * (max.y - min.y);
        // bottom, top, left, right edges
        xs.extend([x, x, min.x, max.x]);
        ys.extend([min.y, max.y, y, y]);
    }
    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
        bail!("rectangle reprojection produced non-finite coordinates");
    }

    Ok(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// The axis-aligned extent of a raster in its own CRS, from the
/// geotransformed corners.
pub fn raster_extent(geo: &GeoInfo) -> Rect<f64> {
    let gt = geo.geo_transform;
    let w = geo.width as f64;
    let h = geo.height as f64;
    let corners = [
        (0.0, 0.0),
        (w, 0.0),
        (0.0, h),
        (w, h),
    ];

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (c, r) in corners {
        let x = gt[0] + c * gt[1] + r * gt[2];
        let y = gt[3] + c * gt[4] + r * gt[5];
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    )
}

/// Maps world coordinates to pixel indices and back by inverting the
/// geotransform.
pub struct PixelMapper {
    gt: [f64; 6],
    det: f64,
    width: usize,
    height: usize,
}

impl PixelMapper {
    pub fn new(gt: [f64; 6], width: usize, height: usize) -> Result<Self> {
        let det = gt[1] * gt[5] - gt[2] * gt[4];
        if det == 0.0 {
            bail!("degenerate geotransform, cannot invert");
        }
        Ok(Self {
            gt,
            det,
            width,
            height,
        })
    }

    /// Fractional pixel (row, col) of a world coordinate, unclamped.
    pub fn world_to_pixel_f(&self, x: f64, y: f64) -> (f64, f64) {
        let gt = &self.gt;
        let dx = x - gt[0];
        let dy = y - gt[3];
        let col = (gt[5] * dx - gt[2] * dy) / self.det;
        let row = (gt[1] * dy - gt[4] * dx) / self.det;
        (row, col)
    }

    /// Pixel (row, col) containing the world coordinate, or None when it
    /// falls outside [0, height) x [0, width).
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (row, col) = self.world_to_pixel_f(x, y);
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// World coordinate of a pixel's center.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.gt;
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (
            gt[0] + c * gt[1] + r * gt[2],
            gt[3] + c * gt[4] + r * gt[5],
        )
    }
}
