//! 2-D coordinate generation.
//!
//! Each connected fragment is embedded independently: ideal pair distances
//! come from topological distance along a 120° zig-zag, ring members are
//! pinned to regular-polygon chords, classical MDS supplies a starting
//! embedding and localized stress majorization refines it. Fragments are
//! then placed left to right.

use std::collections::VecDeque;
use std::f64::consts::PI;

use petgraph::graph::NodeIndex;

use crate::mol::Molecule;
use crate::rings::RingInfo;

const STRESS_ITERATIONS: usize = 300;
const STRESS_TOLERANCE: f64 = 1e-5;
const FRAGMENT_GAP: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Distance between the ends of a zig-zag chain of `k` unit bonds at 120°.
fn zigzag_distance(k: usize) -> f64 {
    let along = k as f64 * (PI / 6.0).cos();
    let across = if k % 2 == 1 { 0.5 } else { 0.0 };
    (along * along + across * across).sqrt()
}

/// Chord between two vertices `steps` apart on a regular `size`-gon of unit edge.
fn ring_chord(steps: usize, size: usize) -> f64 {
    (PI * steps as f64 / size as f64).sin() / (PI / size as f64).sin()
}

fn fragments(mol: &Molecule) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let mut seen = vec![false; n];
    let mut out = Vec::new();
    for start in mol.graph().node_indices() {
        if seen[start.index()] {
            continue;
        }
        seen[start.index()] = true;
        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in mol.neighbors(node) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }
        members.sort();
        out.push(members);
    }
    out
}

/// Ideal distance matrix for one fragment, indexed by position in `members`.
fn ideal_distances(mol: &Molecule, rings: &RingInfo, members: &[NodeIndex]) -> Vec<Vec<f64>> {
    let n = members.len();
    let mut local = vec![usize::MAX; mol.atom_count()];
    for (i, m) in members.iter().enumerate() {
        local[m.index()] = i;
    }

    let mut d = vec![vec![0.0; n]; n];
    for (i, &src) in members.iter().enumerate() {
        let mut hops = vec![usize::MAX; n];
        hops[i] = 0;
        let mut queue = VecDeque::from([src]);
        while let Some(node) = queue.pop_front() {
            let h = hops[local[node.index()]];
            for next in mol.neighbors(node) {
                let j = local[next.index()];
                if hops[j] == usize::MAX {
                    hops[j] = h + 1;
                    queue.push_back(next);
                }
            }
        }
        for j in 0..n {
            d[i][j] = zigzag_distance(hops[j]);
        }
    }

    // Largest rings first so the smallest ring wins for fused atoms.
    for ring in rings.rings().iter().rev() {
        if !ring.iter().all(|a| local[a.index()] != usize::MAX) {
            continue;
        }
        let size = ring.len();
        for p in 0..size {
            for q in (p + 1)..size {
                let steps = (q - p).min(size - (q - p));
                let (i, j) = (local[ring[p].index()], local[ring[q].index()]);
                let chord = ring_chord(steps, size);
                d[i][j] = chord;
                d[j][i] = chord;
            }
        }
    }
    d
}

/// Leading eigenvector of symmetric `m` by power iteration, orthogonal to `against`.
fn power_iteration(m: &[Vec<f64>], against: Option<&[f64]>) -> (Vec<f64>, f64) {
    let n = m.len();
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64 * 0.7).sin()).collect();
    let mut eigenvalue = 0.0;
    for _ in 0..200 {
        if let Some(u) = against {
            let dot: f64 = v.iter().zip(u).map(|(a, b)| a * b).sum();
            for (vi, ui) in v.iter_mut().zip(u) {
                *vi -= dot * ui;
            }
        }
        let mut next = vec![0.0; n];
        for i in 0..n {
            next[i] = (0..n).map(|j| m[i][j] * v[j]).sum();
        }
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return (vec![0.0; n], 0.0);
        }
        // Rayleigh quotient keeps the sign the norm would lose.
        eigenvalue = next.iter().zip(&v).map(|(a, b)| a * b).sum::<f64>()
            / v.iter().map(|x| x * x).sum::<f64>();
        for x in &mut next {
            *x /= norm;
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < 1e-10 {
            break;
        }
    }
    (v, eigenvalue)
}

/// Classical multidimensional scaling into two dimensions.
fn classical_mds(d: &[Vec<f64>]) -> Vec<Point> {
    let n = d.len();
    let sq: Vec<Vec<f64>> = d.iter().map(|row| row.iter().map(|x| x * x).collect()).collect();
    let row_means: Vec<f64> = sq.iter().map(|r| r.iter().sum::<f64>() / n as f64).collect();
    let total_mean = row_means.iter().sum::<f64>() / n as f64;

    let mut b = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            b[i][j] = -0.5 * (sq[i][j] - row_means[i] - row_means[j] + total_mean);
        }
    }

    let (v1, l1) = power_iteration(&b, None);
    let (v2, l2) = power_iteration(&b, Some(&v1));
    let (s1, s2) = (l1.max(0.0).sqrt(), l2.max(0.0).sqrt());

    // A small deterministic jitter keeps stress majorization from staying
    // trapped in a line when the second eigenvalue vanishes.
    let mut points: Vec<Point> = (0..n)
        .map(|i| {
            let t = i as f64 * 1.3;
            Point::new(v1[i] * s1 + 0.01 * t.cos(), v2[i] * s2 + 0.01 * t.sin())
        })
        .collect();

    // Degenerate spectrum: start on a circle instead.
    if s1 + s2 < 1e-6 {
        let radius = n as f64 / (2.0 * PI);
        points = (0..n)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / n as f64;
                Point::new(radius * a.cos(), radius * a.sin())
            })
            .collect();
    }
    points
}

/// Localized stress majorization (Gansner, Koren, North).
fn stress_majorization(d: &[Vec<f64>], mut points: Vec<Point>) -> Vec<Point> {
    let n = d.len();
    for _ in 0..STRESS_ITERATIONS {
        let mut moved = 0.0;
        for i in 0..n {
            let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dij = d[i][j];
                let w = 1.0 / (dij * dij);
                let dx = points[i].x - points[j].x;
                let dy = points[i].y - points[j].y;
                let dist = (dx * dx + dy * dy).sqrt().max(1e-9);
                sx += w * (points[j].x + dij * dx / dist);
                sy += w * (points[j].y + dij * dy / dist);
                sw += w;
            }
            let next = Point::new(sx / sw, sy / sw);
            moved += next.distance(&points[i]);
            points[i] = next;
        }
        if moved / (n as f64) < STRESS_TOLERANCE {
            break;
        }
    }
    points
}

/// Center on the origin and rotate the principal axis onto x.
fn normalize_orientation(points: &mut [Point]) {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points.iter_mut() {
        p.x -= cx;
        p.y -= cy;
        sxx += p.x * p.x;
        syy += p.y * p.y;
        sxy += p.x * p.y;
    }
    let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (sin, cos) = (-angle).sin_cos();
    for p in points.iter_mut() {
        let (x, y) = (p.x, p.y);
        p.x = x * cos - y * sin;
        p.y = x * sin + y * cos;
    }
}

fn layout_fragment(mol: &Molecule, rings: &RingInfo, members: &[NodeIndex]) -> Vec<Point> {
    match members.len() {
        0 => Vec::new(),
        1 => vec![Point::default()],
        2 => vec![Point::new(-0.5, 0.0), Point::new(0.5, 0.0)],
        _ => {
            let d = ideal_distances(mol, rings, members);
            let start = classical_mds(&d);
            let mut points = stress_majorization(&d, start);
            normalize_orientation(&mut points);
            points
        }
    }
}

/// Compute 2-D coordinates (unit bond length) for every atom, indexed by node index.
pub fn compute_coords(mol: &Molecule) -> Vec<Point> {
    let rings = RingInfo::perceive(mol);
    let mut coords = vec![Point::default(); mol.atom_count()];
    let mut cursor = 0.0;

    for members in fragments(mol) {
        let points = layout_fragment(mol, &rings, &members);
        let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let offset = cursor - min_x;
        for (atom, p) in members.iter().zip(&points) {
            coords[atom.index()] = Point::new(p.x + offset, p.y);
        }
        cursor += (max_x - min_x) + FRAGMENT_GAP;
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn coords(smiles: &str) -> (Molecule, Vec<Point>) {
        let mol = parse_smiles(smiles).unwrap();
        let pts = compute_coords(&mol);
        (mol, pts)
    }

    #[test]
    fn test_zigzag_and_chord_geometry() {
        assert!((zigzag_distance(1) - 1.0).abs() < 1e-9);
        assert!((zigzag_distance(2) - 3f64.sqrt()).abs() < 1e-9);
        assert!((ring_chord(1, 6) - 1.0).abs() < 1e-9);
        assert!((ring_chord(3, 6) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bond_lengths_close_to_unit() {
        let (mol, pts) = coords("CC(=O)Oc1ccccc1C(=O)O");
        for (a, b, _) in mol.bonds() {
            let len = pts[a.index()].distance(&pts[b.index()]);
            assert!((0.7..1.3).contains(&len), "bond {:?}-{:?} has length {}", a, b, len);
        }
    }

    #[test]
    fn test_atoms_do_not_collide() {
        let (_, pts) = coords("CC(=O)Oc1ccccc1C(=O)O");
        for i in 0..pts.len() {
            for j in (i + 1)..pts.len() {
                assert!(pts[i].distance(&pts[j]) > 0.5, "atoms {} and {} overlap", i, j);
            }
        }
    }

    #[test]
    fn test_benzene_is_regular() {
        let (_, pts) = coords("c1ccccc1");
        let cx = pts.iter().map(|p| p.x).sum::<f64>() / 6.0;
        let cy = pts.iter().map(|p| p.y).sum::<f64>() / 6.0;
        let center = Point::new(cx, cy);
        for p in &pts {
            assert!((p.distance(&center) - 1.0).abs() < 0.05);
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let (_, a) = coords("CN1C=NC2=C1C(=O)N(C(=O)N2C)C");
        let (_, b) = coords("CN1C=NC2=C1C(=O)N(C(=O)N2C)C");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fragments_are_side_by_side() {
        let (_, pts) = coords("CCO.[Na+]");
        let ethanol_max = pts[..3].iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        assert!(pts[3].x >= ethanol_max + FRAGMENT_GAP - 1e-9);
    }

    #[test]
    fn test_single_atom() {
        let (_, pts) = coords("C");
        assert_eq!(pts, vec![Point::default()]);
    }
}
