//! Structure depiction: SVG drawing rasterized to a fixed-size PNG.

use std::fmt::Write;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use thiserror::Error;
use tracing::debug;

use crate::element::Element;
use crate::layout::{compute_coords, Point};
use crate::mol::{Atom, BondOrder, Molecule};
use crate::rings::RingInfo;

const PADDING: f64 = 24.0;
const MAX_BOND_PX: f64 = 42.0;
const STROKE: f64 = 1.6;
const BOND_COLOR: &str = "#222222";
const FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

#[derive(Debug, Error)]
pub enum DepictError {
    #[error("molecule has no atoms")]
    EmptyMolecule,

    #[error("failed to parse generated SVG: {0}")]
    Svg(String),

    #[error("failed to allocate {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    #[error("failed to encode PNG output: {0}")]
    Encode(String),
}

/// A rendered structure image.
#[derive(Debug, Clone)]
pub struct Depiction {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
    pub svg: String,
}

/// Renders molecules into square images of a fixed edge length.
#[derive(Clone)]
pub struct Depicter {
    size: u32,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for Depicter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Depicter")
            .field("size", &self.size)
            .field("fonts", &self.fontdb.len())
            .finish()
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn charge_text(charge: i8) -> String {
    match charge {
        0 => String::new(),
        1 => "+".to_string(),
        -1 => "\u{2212}".to_string(),
        q if q > 0 => format!("{}+", q),
        q => format!("{}\u{2212}", -q),
    }
}

/// Whether an atom gets a text label. Carbon is implicit unless it carries
/// something worth showing or stands alone.
fn needs_label(atom: &Atom, degree: usize) -> bool {
    atom.element != Element::C || atom.charge != 0 || atom.isotope.is_some() || degree == 0
}

impl Depicter {
    /// Creates a depicter and loads system fonts once for atom labels.
    pub fn new(size: u32) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!(fonts = db.len(), "loaded fonts for depiction");
        Self { size, fontdb: Arc::new(db) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Draw `mol` and rasterize it.
    pub fn depict(&self, mol: &Molecule) -> Result<Depiction, DepictError> {
        let svg = self.render_svg(mol)?;
        let png = self.rasterize(&svg)?;
        Ok(Depiction { width: self.size, height: self.size, png, svg })
    }

    /// Build the SVG document for `mol` on a `size` x `size` canvas.
    pub fn render_svg(&self, mol: &Molecule) -> Result<String, DepictError> {
        if mol.atom_count() == 0 {
            return Err(DepictError::EmptyMolecule);
        }
        let size = self.size as f64;
        let coords = compute_coords(mol);
        let rings = RingInfo::perceive(mol);

        let min_x = coords.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = coords.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = coords.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = coords.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let extent = (max_x - min_x).max(max_y - min_y).max(1e-6);
        let scale = ((size - 2.0 * PADDING) / extent).min(MAX_BOND_PX);
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;

        // SVG y grows downward.
        let to_px = |p: &Point| Point::new(size / 2.0 + (p.x - cx) * scale, size / 2.0 - (p.y - cy) * scale);
        let px: Vec<Point> = coords.iter().map(to_px).collect();

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#,
            s = self.size
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

        let offset = scale * 0.16;
        for (a, b, bond) in mol.bonds() {
            let (p, q) = (px[a.index()], px[b.index()]);
            let ring_center = ring_center_for(&rings, &px, a, b);
            match bond.order {
                BondOrder::Single => line(&mut svg, p, q, None),
                BondOrder::Double => match ring_center {
                    Some(c) => {
                        line(&mut svg, p, q, None);
                        inner_line(&mut svg, p, q, c, offset, None);
                    }
                    None => {
                        let (p1, q1) = shift(p, q, offset / 2.0);
                        let (p2, q2) = shift(p, q, -offset / 2.0);
                        line(&mut svg, p1, q1, None);
                        line(&mut svg, p2, q2, None);
                    }
                },
                BondOrder::Triple => {
                    line(&mut svg, p, q, None);
                    let (p1, q1) = shift(p, q, offset);
                    let (p2, q2) = shift(p, q, -offset);
                    line(&mut svg, p1, q1, None);
                    line(&mut svg, p2, q2, None);
                }
                BondOrder::Quadruple => {
                    for k in [-1.5, -0.5, 0.5, 1.5] {
                        let (p1, q1) = shift(p, q, offset * k * 0.8);
                        line(&mut svg, p1, q1, None);
                    }
                }
                BondOrder::Aromatic => {
                    line(&mut svg, p, q, None);
                    match ring_center {
                        Some(c) => inner_line(&mut svg, p, q, c, offset, Some("4 3")),
                        None => {
                            let (p1, q1) = shift(p, q, offset);
                            line(&mut svg, p1, q1, Some("4 3"));
                        }
                    }
                }
            }
        }

        let font_size = (scale * 0.42).clamp(9.0, 18.0);
        for (idx, atom) in mol.atoms() {
            if !needs_label(atom, mol.degree(idx)) {
                continue;
            }
            let p = px[idx.index()];
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="white"/>"#,
                p.x,
                p.y,
                font_size * 0.7
            );
            label(&mut svg, atom, p, font_size);
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }

    fn rasterize(&self, svg: &str) -> Result<Vec<u8>, DepictError> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|err| DepictError::Svg(err.to_string()))?;

        let mut pixmap = Pixmap::new(self.size, self.size).ok_or(DepictError::Surface {
            width: self.size,
            height: self.size,
        })?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|err| DepictError::Encode(err.to_string()))
    }
}

/// Centroid (in pixels) of the smallest ring containing both atoms.
fn ring_center_for(rings: &RingInfo, px: &[Point], a: NodeIndex, b: NodeIndex) -> Option<Point> {
    rings
        .rings()
        .iter()
        .find(|r| r.contains(&a) && r.contains(&b))
        .map(|r| {
            let n = r.len() as f64;
            Point::new(
                r.iter().map(|i| px[i.index()].x).sum::<f64>() / n,
                r.iter().map(|i| px[i.index()].y).sum::<f64>() / n,
            )
        })
}

/// Parallel copy of segment p-q moved `d` pixels along its left normal.
fn shift(p: Point, q: Point, d: f64) -> (Point, Point) {
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let len = (dx * dx + dy * dy).sqrt().max(1e-9);
    let (nx, ny) = (-dy / len * d, dx / len * d);
    (Point::new(p.x + nx, p.y + ny), Point::new(q.x + nx, q.y + ny))
}

/// Second line of a ring bond, drawn inside the ring and shortened at both ends.
fn inner_line(svg: &mut String, p: Point, q: Point, center: Point, d: f64, dash: Option<&str>) {
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let mid = Point::new((p.x + q.x) / 2.0, (p.y + q.y) / 2.0);
    // Pick the normal pointing at the ring center.
    let toward = (center.x - mid.x) * -dy + (center.y - mid.y) * dx;
    let (p1, q1) = shift(p, q, if toward >= 0.0 { d } else { -d });
    let trim = 0.15;
    let a = Point::new(p1.x + dx * trim, p1.y + dy * trim);
    let b = Point::new(q1.x - dx * trim, q1.y - dy * trim);
    line(svg, a, b, dash);
}

fn line(svg: &mut String, p: Point, q: Point, dash: Option<&str>) {
    let dash = dash
        .map(|d| format!(r#" stroke-dasharray="{}""#, d))
        .unwrap_or_default();
    let _ = writeln!(
        svg,
        r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}" stroke-linecap="round"{}/>"#,
        p.x, p.y, q.x, q.y, BOND_COLOR, STROKE, dash
    );
}

fn label(svg: &mut String, atom: &Atom, p: Point, font_size: f64) {
    let small = font_size * 0.7;
    let mut text = String::new();
    if let Some(iso) = atom.isotope {
        let _ = write!(text, r#"<tspan font-size="{:.1}" dy="-{:.1}">{}</tspan><tspan dy="{:.1}">"#, small, small * 0.5, iso, small * 0.5);
    } else {
        text.push_str("<tspan>");
    }
    text.push_str(&escape(atom.element.symbol()));
    text.push_str("</tspan>");

    let h = atom.total_h();
    if h > 0 && atom.element != Element::WILDCARD {
        text.push('H');
        if h > 1 {
            let _ = write!(text, r#"<tspan font-size="{:.1}" dy="{:.1}">{}</tspan><tspan dy="-{:.1}"></tspan>"#, small, small * 0.4, h, small * 0.4);
        }
    }
    let charge = charge_text(atom.charge);
    if !charge.is_empty() {
        let _ = write!(text, r#"<tspan font-size="{:.1}" dy="-{:.1}">{}</tspan>"#, small, small * 0.6, charge);
    }

    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" dy="0.35em" text-anchor="middle" font-family="{}" font-size="{:.1}" fill="{}">{}</text>"#,
        p.x,
        p.y,
        FONT_FAMILY,
        font_size,
        atom.element.color(),
        text
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn test_depicts_fixed_size_png() {
        let depicter = Depicter::new(300);
        let mol = parse_smiles("CC(=O)Oc1ccccc1C(=O)O").unwrap();
        let d = depicter.depict(&mol).unwrap();
        assert_eq!((d.width, d.height), (300, 300));
        assert!(d.png.starts_with(PNG_MAGIC));
        // IHDR width and height
        assert_eq!(&d.png[16..20], &300u32.to_be_bytes());
        assert_eq!(&d.png[20..24], &300u32.to_be_bytes());
    }

    #[test]
    fn test_svg_labels_heteroatoms_only() {
        let depicter = Depicter::new(200);
        let mol = parse_smiles("CCO").unwrap();
        let svg = depicter.render_svg(&mol).unwrap();
        assert_eq!(svg.matches("<text").count(), 1);
        assert!(svg.contains(">O</tspan>H"));
        assert_eq!(svg.matches("<line").count(), 2);
    }

    #[test]
    fn test_svg_draws_multiple_bonds() {
        let depicter = Depicter::new(200);
        let svg = depicter.render_svg(&parse_smiles("C=C").unwrap()).unwrap();
        assert_eq!(svg.matches("<line").count(), 2);
        let svg = depicter.render_svg(&parse_smiles("C#N").unwrap()).unwrap();
        assert_eq!(svg.matches("<line").count(), 3);
        let svg = depicter.render_svg(&parse_smiles("c1ccccc1").unwrap()).unwrap();
        assert_eq!(svg.matches("stroke-dasharray").count(), 6);
    }

    #[test]
    fn test_lone_carbon_and_charges_are_labelled() {
        let depicter = Depicter::new(200);
        let svg = depicter.render_svg(&parse_smiles("C").unwrap()).unwrap();
        assert!(svg.contains(">C</tspan>H"));
        let svg = depicter.render_svg(&parse_smiles("[NH4+]").unwrap()).unwrap();
        assert!(svg.contains(">+</tspan>"));
    }

    #[test]
    fn test_atoms_stay_on_canvas() {
        let depicter = Depicter::new(300);
        let mol = parse_smiles("CCCCCCCCCCCCCCCCCCCC").unwrap();
        let svg = depicter.render_svg(&mol).unwrap();
        for cap in svg.split("x1=\"").skip(1) {
            let x: f64 = cap.split('"').next().unwrap().parse().unwrap();
            assert!((0.0..=300.0).contains(&x));
        }
    }

    #[test]
    fn test_charge_text() {
        assert_eq!(charge_text(0), "");
        assert_eq!(charge_text(1), "+");
        assert_eq!(charge_text(2), "2+");
        assert_eq!(charge_text(-3), "3\u{2212}");
    }
}
