//! Representative color extraction.
//!
//! Edge sampling takes the per-channel median of border pixels so a stray
//! highlight in a corner does not tint the background. Dominant sampling
//! clusters a downscaled copy of the image with k-means and returns the
//! most populated centroid.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, Rgba};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, ensure_non_empty};

/// Working size for dominant color extraction.
pub const DOMINANT_WORKING_SIZE: u32 = 50;

/// Number of clusters used by the k-means strategy.
pub const CLUSTER_COUNT: usize = 5;

/// Independent k-means restarts; the most compact result wins.
const CLUSTER_ATTEMPTS: usize = 10;

/// Assign/recompute iterations per attempt.
const CLUSTER_MAX_ITERATIONS: usize = 200;

/// Stop once no centroid moves further than this (in channel units).
const CLUSTER_EPSILON: f32 = 0.1;

const CLUSTER_SEED: u64 = 0x7468_756d_626e_6169;

/// A sampled color. Keeps the channel layout of the image it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl Color {
    pub fn channels(&self) -> &[u8] {
        match self {
            Self::Rgb(c) => c,
            Self::Rgba(c) => c,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba(_))
    }

    pub fn to_rgb(self) -> Rgb<u8> {
        match self {
            Self::Rgb(c) => Rgb(c),
            Self::Rgba([r, g, b, _]) => Rgb([r, g, b]),
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        match self {
            Self::Rgb([r, g, b]) => Rgba([r, g, b, 255]),
            Self::Rgba(c) => Rgba(c),
        }
    }

    /// Build a color in the layout given by `has_alpha`, reading channel
    /// `i` from `channel(i)`.
    fn from_fn(has_alpha: bool, mut channel: impl FnMut(usize) -> u8) -> Self {
        if has_alpha {
            Self::Rgba([channel(0), channel(1), channel(2), channel(3)])
        } else {
            Self::Rgb([channel(0), channel(1), channel(2)])
        }
    }
}

/// Which border of the image to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSide {
    Top,
    Bottom,
    Left,
    Right,
    All,
}

/// How `sample_dominant` picks its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DominantStrategy {
    /// k-means over the downscaled image; largest cluster wins.
    #[default]
    Cluster,
    /// Per-channel median of the downscaled image. Cheaper, fully deterministic.
    Median,
}

fn channel_count(img: &DynamicImage) -> usize {
    if img.color().has_alpha() { 4 } else { 3 }
}

fn pixel_at(img: &DynamicImage, x: u32, y: u32, channels: usize) -> Vec<u8> {
    use image::GenericImageView;
    let p = img.get_pixel(x, y).0;
    p[..channels].to_vec()
}

fn edge_pixels(img: &DynamicImage, side: EdgeSide) -> Vec<Vec<u8>> {
    let (w, h) = (img.width(), img.height());
    let n = channel_count(img);
    let row = |y: u32| (0..w).map(move |x| (x, y));
    let col = |x: u32| (0..h).map(move |y| (x, y));

    let coords: Vec<(u32, u32)> = match side {
        EdgeSide::Top => row(0).collect(),
        EdgeSide::Bottom => row(h - 1).collect(),
        EdgeSide::Left => col(0).collect(),
        EdgeSide::Right => col(w - 1).collect(),
        EdgeSide::All => row(0)
            .chain(row(h - 1))
            .chain(col(0))
            .chain(col(w - 1))
            .collect(),
    };

    coords
        .into_iter()
        .map(|(x, y)| pixel_at(img, x, y, n))
        .collect()
}

/// Median of a channel, averaging the two middle values for even counts
/// and rounding down.
fn median(values: &mut [u8]) -> u8 {
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        ((u16::from(values[mid - 1]) + u16::from(values[mid])) / 2) as u8
    }
}

fn channel_medians(pixels: &[Vec<u8>], channels: usize) -> Color {
    let mut column = Vec::with_capacity(pixels.len());
    Color::from_fn(channels == 4, |c| {
        column.clear();
        column.extend(pixels.iter().map(|p| p[c]));
        median(&mut column)
    })
}

/// Sample the median color of one edge (or all four edges) of an image.
pub fn sample_edge(img: &DynamicImage, side: EdgeSide) -> Result<Color> {
    ensure_non_empty(img)?;
    let pixels = edge_pixels(img, side);
    let color = channel_medians(&pixels, channel_count(img));
    debug!(?side, samples = pixels.len(), ?color, "Sampled edge color");
    Ok(color)
}

/// Sample the most prevalent color using the default clustering strategy.
pub fn sample_dominant(img: &DynamicImage) -> Result<Color> {
    sample_dominant_with(img, DominantStrategy::Cluster)
}

/// Sample the most prevalent color with an explicit strategy.
pub fn sample_dominant_with(img: &DynamicImage, strategy: DominantStrategy) -> Result<Color> {
    ensure_non_empty(img)?;
    let channels = channel_count(img);
    let small = img.resize_exact(
        DOMINANT_WORKING_SIZE,
        DOMINANT_WORKING_SIZE,
        FilterType::Triangle,
    );

    let pixels: Vec<Vec<u8>> = (0..small.height())
        .flat_map(|y| (0..small.width()).map(move |x| (x, y)))
        .map(|(x, y)| pixel_at(&small, x, y, channels))
        .collect();

    let color = match strategy {
        DominantStrategy::Median => channel_medians(&pixels, channels),
        DominantStrategy::Cluster => {
            let points: Vec<Vec<f32>> = pixels
                .iter()
                .map(|p| p.iter().map(|&v| f32::from(v)).collect())
                .collect();
            let mut rng = StdRng::seed_from_u64(CLUSTER_SEED);
            let clusters = kmeans(&points, CLUSTER_COUNT, &mut rng);
            let largest = clusters
                .iter()
                .max_by_key(|c| c.count)
                .map(|c| c.centroid.clone())
                .unwrap_or_else(|| vec![0.0; channels]);
            // Centroids have one coordinate per channel.
            Color::from_fn(channels == 4, |c| largest[c].round().clamp(0.0, 255.0) as u8)
        }
    };

    debug!(?strategy, ?color, "Sampled dominant color");
    Ok(color)
}

/// One k-means cluster: its centroid and how many points it owns.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub centroid: Vec<f32>,
    pub count: usize,
}

fn distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best = 0;
    let mut best_d = f32::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance_squared(point, c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    (best, best_d)
}

/// Random first centroid, then repeatedly the point farthest from every
/// centroid chosen so far.
fn seed_centroids<R: Rng + ?Sized>(points: &[Vec<f32>], k: usize, rng: &mut R) -> Vec<Vec<f32>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];
    while centroids.len() < k {
        let (idx, _) = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, nearest(p, &centroids).1))
            .fold((0, f32::MIN), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        centroids.push(points[idx].clone());
    }
    centroids
}

/// Cluster `points` into at most `k` groups.
///
/// Runs several seeded attempts and keeps the one with the lowest
/// total squared distance. Empty clusters keep their previous centroid.
pub fn kmeans<R: Rng + ?Sized>(points: &[Vec<f32>], k: usize, rng: &mut R) -> Vec<Cluster> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(points.len());
    let dims = points[0].len();

    let mut best: Option<(f32, Vec<Cluster>)> = None;

    for _ in 0..CLUSTER_ATTEMPTS {
        let mut centroids = seed_centroids(points, k, rng);
        let mut assignment = vec![0usize; points.len()];

        for _ in 0..CLUSTER_MAX_ITERATIONS {
            for (slot, p) in assignment.iter_mut().zip(points) {
                *slot = nearest(p, &centroids).0;
            }

            let mut sums = vec![vec![0.0f32; dims]; k];
            let mut counts = vec![0usize; k];
            for (&ci, p) in assignment.iter().zip(points) {
                counts[ci] += 1;
                for (s, v) in sums[ci].iter_mut().zip(p) {
                    *s += v;
                }
            }

            let mut max_shift = 0.0f32;
            for ci in 0..k {
                if counts[ci] == 0 {
                    continue;
                }
                let next: Vec<f32> = sums[ci].iter().map(|s| s / counts[ci] as f32).collect();
                max_shift = max_shift.max(distance_squared(&next, &centroids[ci]).sqrt());
                centroids[ci] = next;
            }

            if max_shift < CLUSTER_EPSILON {
                break;
            }
        }

        let mut counts = vec![0usize; k];
        let mut compactness = 0.0f32;
        for p in points {
            let (ci, d) = nearest(p, &centroids);
            counts[ci] += 1;
            compactness += d;
        }

        if best.as_ref().is_none_or(|(c, _)| compactness < *c) {
            let clusters = centroids
                .into_iter()
                .zip(counts)
                .map(|(centroid, count)| Cluster { centroid, count })
                .collect();
            best = Some((compactness, clusters));
        }
    }

    best.map(|(_, clusters)| clusters).unwrap_or_default()
}
