//! Spatial clustering of skin pixels
//!
//! Two sampled pixels belong to the same cluster when they are closer than
//! the cluster distance, transitively. Points are bucketed into a grid of
//! `distance`-sized cells so each expansion only inspects the 3x3 block of
//! neighbouring cells instead of every point.

use std::collections::{HashMap, VecDeque};

/// A sampled pixel coordinate
pub type Point = (u32, u32);

/// Connected group of skin pixels from one detection cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelCluster {
    pub members: Vec<Point>,
}

impl PixelCluster {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Estimated pixel area when each member stands for a `stride x stride` block
    pub fn extrapolated_area(&self, stride: u32) -> u64 {
        self.members.len() as u64 * stride as u64 * stride as u64
    }
}

fn cell_of(p: Point, cell: f64) -> (i64, i64) {
    ((p.0 as f64 / cell).floor() as i64, (p.1 as f64 / cell).floor() as i64)
}

/// Group points into clusters, dropping clusters with fewer than `min_members`.
pub fn cluster_points(points: &[Point], distance: f32, min_members: usize) -> Vec<PixelCluster> {
    if points.is_empty() || !(distance > 0.0) {
        return Vec::new();
    }

    let cell = distance as f64;
    let limit_sq = cell * cell;

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (idx, &p) in points.iter().enumerate() {
        grid.entry(cell_of(p, cell)).or_default().push(idx);
    }

    let mut visited = vec![false; points.len()];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..points.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut members = Vec::new();

        while let Some(idx) = queue.pop_front() {
            let p = points[idx];
            members.push(p);
            let (cx, cy) = cell_of(p, cell);

            for gx in cx - 1..=cx + 1 {
                for gy in cy - 1..=cy + 1 {
                    let Some(bucket) = grid.get(&(gx, gy)) else {
                        continue;
                    };
                    for &other in bucket {
                        if visited[other] {
                            continue;
                        }
                        let q = points[other];
                        let dx = p.0 as f64 - q.0 as f64;
                        let dy = p.1 as f64 - q.1 as f64;
                        if dx * dx + dy * dy < limit_sq {
                            visited[other] = true;
                            queue.push_back(other);
                        }
                    }
                }
            }
        }

        if members.len() >= min_members {
            clusters.push(PixelCluster { members });
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(x0: u32, y0: u32, side: u32, step: u32) -> Vec<Point> {
        let mut pts = Vec::new();
        for y in (y0..y0 + side).step_by(step as usize) {
            for x in (x0..x0 + side).step_by(step as usize) {
                pts.push((x, y));
            }
        }
        pts
    }

    #[test]
    fn test_single_group() {
        let pts = block(0, 0, 40, 4);
        let clusters = cluster_points(&pts, 50.0, 10);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count(), 100);
    }

    #[test]
    fn test_far_groups_stay_separate() {
        // Nearest members are 112 - 36 = 76 units apart
        let mut pts = block(0, 0, 40, 4);
        pts.extend(block(112, 0, 40, 4));
        let clusters = cluster_points(&pts, 50.0, 10);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_transitive_chain_merges() {
        // Each point is 30 apart from the next; ends are 300 apart
        let pts: Vec<Point> = (0..11).map(|i| (i * 30, 0)).collect();
        let clusters = cluster_points(&pts, 50.0, 1);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count(), 11);
    }

    #[test]
    fn test_exact_threshold_does_not_join() {
        let clusters = cluster_points(&[(0, 0), (50, 0)], 50.0, 1);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_small_clusters_discarded() {
        let pts = block(0, 0, 12, 4); // 9 members
        assert!(cluster_points(&pts, 50.0, 10).is_empty());
        assert_eq!(cluster_points(&pts, 50.0, 9).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_points(&[], 50.0, 1).is_empty());
    }

    #[test]
    fn test_extrapolated_area() {
        let cluster = PixelCluster {
            members: vec![(0, 0), (4, 0), (0, 4), (4, 4)],
        };
        assert_eq!(cluster.member_count(), 4);
        assert_eq!(cluster.extrapolated_area(4), 64);
    }
}
