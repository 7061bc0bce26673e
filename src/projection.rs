use geo::{Coord, LineString, MultiPolygon};
use std::f64::consts::FRAC_PI_4;
use std::fmt::Write;

/// Latitude where spherical Mercator reaches a square world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Spherical Mercator in screen space: x grows east, y grows south.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    pub scale: f64,
    pub translate: [f64; 2],
}

impl Mercator {
    /// Centred on a `width` x `height` canvas.
    pub fn centered(scale: f64, width: u32, height: u32) -> Self {
        Self {
            scale,
            translate: [width as f64 / 2.0, height as f64 / 2.0],
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lambda = lon.to_radians();
        let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = self.scale * lambda + self.translate[0];
        let y = -self.scale * (FRAC_PI_4 + phi / 2.0).tan().ln() + self.translate[1];
        (x, y)
    }

    /// SVG path data for a multipolygon: one closed subpath per ring.
    pub fn path_data(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in geometry {
            self.push_ring(&mut d, polygon.exterior());
            for hole in polygon.interiors() {
                self.push_ring(&mut d, hole);
            }
        }
        d
    }

    fn push_ring(&self, d: &mut String, ring: &LineString<f64>) {
        // A closed triangle needs four coordinates.
        if ring.0.len() < 4 {
            return;
        }
        for (i, Coord { x, y }) in ring.coords().enumerate() {
            let (px, py) = self.project(*x, *y);
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.2},{:.2}", cmd, px, py);
        }
        d.push('Z');
    }
}
