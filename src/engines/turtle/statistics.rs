use super::math::Vector3;
use serde::{Deserialize, Serialize};

/// Shape measures gathered during one turtle draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeStatistics {
    /// Forward steps taken on the trunk (branch depth 0).
    pub trunk_weight: f64,
    /// Forward steps of the longest closed branch.
    pub max_branch_weight: f64,
    /// Sum of the depths of vertices below the ground plane.
    pub underground_weight: f64,
    /// Share of leaves, bulbs and flowers sitting at a branch end.
    pub end_details_ratio: f64,
    /// Share of details that are fruits at a branch end.
    pub fruits_ratio: f64,
    /// Mean radius decrease from one branch depth to the next, in [-1, 1].
    pub branch_size_ratio: f64,
}

/// Running per-depth accumulators, folded into [`ShapeStatistics`] at the end of a draw.
#[derive(Debug, Clone)]
pub(crate) struct StatisticsCollector {
    depth: usize,
    branch_lengths: Vec<f64>,
    branch_sizes: Vec<f64>,
    max_branch_weight: f64,
    plain_details: usize,
    plain_at_end: usize,
    fruits_at_end: usize,
    details: usize,
}

impl StatisticsCollector {
    pub(crate) fn new(radius: f64) -> Self {
        Self {
            depth: 0,
            branch_lengths: vec![0.0],
            branch_sizes: vec![radius],
            max_branch_weight: 0.0,
            plain_details: 0,
            plain_at_end: 0,
            fruits_at_end: 0,
            details: 0,
        }
    }

    pub(crate) fn forward(&mut self, radius: f64) {
        self.branch_lengths[self.depth] += 1.0;
        self.branch_sizes[self.depth] += radius;
    }

    pub(crate) fn open_branch(&mut self, radius: f64) {
        self.depth += 1;
        if self.branch_lengths.len() <= self.depth {
            self.branch_lengths.push(0.0);
            self.branch_sizes.push(radius);
        } else {
            self.branch_lengths[self.depth] = 0.0;
            self.branch_sizes[self.depth] = radius;
        }
    }

    pub(crate) fn close_branch(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.max_branch_weight = self.max_branch_weight.max(self.branch_lengths[self.depth]);
        self.depth -= 1;
    }

    /// A leaf, bulb or flower.
    pub(crate) fn detail(&mut self, at_end: bool) {
        self.details += 1;
        self.plain_details += 1;
        if at_end {
            self.plain_at_end += 1;
        }
    }

    pub(crate) fn fruit(&mut self, at_end: bool) {
        self.details += 1;
        if at_end {
            self.fruits_at_end += 1;
        }
    }

    pub(crate) fn finish(self, vertices: &[Vector3]) -> ShapeStatistics {
        let underground_weight = vertices.iter().filter(|v| v.z < 0.0).map(|v| -v.z).sum();

        let end_details_ratio = if self.plain_details > 0 {
            self.plain_at_end as f64 / self.plain_details as f64
        } else {
            0.0
        };
        let fruits_ratio = if self.details > 0 {
            self.fruits_at_end as f64 / self.details as f64
        } else {
            0.0
        };

        let sizes: Vec<f64> = self
            .branch_sizes
            .iter()
            .zip(self.branch_lengths.iter())
            .map(|(size, length)| size / length.max(1.0))
            .collect();
        let deltas: Vec<f64> = sizes.windows(2).map(|w| w[0] - w[1]).collect();
        let branch_size_ratio = if deltas.is_empty() {
            0.0
        } else {
            (deltas.iter().sum::<f64>() / deltas.len() as f64).clamp(-1.0, 1.0)
        };

        ShapeStatistics {
            trunk_weight: self.branch_lengths[0],
            max_branch_weight: self.max_branch_weight,
            underground_weight,
            end_details_ratio,
            fruits_ratio,
            branch_size_ratio,
        }
    }
}

/// Bounding box of a vertex set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub min: Vector3,
    pub max: Vector3,
}

impl Extents {
    /// `None` for an empty vertex set.
    pub fn from_vertices(vertices: &[Vector3]) -> Option<Self> {
        let first = *vertices.first()?;
        let mut extents = Extents {
            min: first,
            max: first,
        };
        for v in &vertices[1..] {
            extents.min.x = extents.min.x.min(v.x);
            extents.min.y = extents.min.y.min(v.y);
            extents.min.z = extents.min.z.min(v.z);
            extents.max.x = extents.max.x.max(v.x);
            extents.max.y = extents.max.y.max(v.y);
            extents.max.z = extents.max.z.max(v.z);
        }
        Some(extents)
    }

    pub fn height(&self) -> f64 {
        self.max.z
    }

    pub fn spans(&self) -> Spans {
        Spans {
            x_pos: self.max.x,
            x_neg: -self.min.x,
            y_pos: self.max.y,
            y_neg: -self.min.y,
        }
    }
}

/// Reach of a shape from the vertical axis in each horizontal direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spans {
    pub x_pos: f64,
    pub x_neg: f64,
    pub y_pos: f64,
    pub y_neg: f64,
}

impl Spans {
    /// 1 when both sides reach equally far, lower the more they differ,
    /// 0 when one side does not reach out at all.
    pub fn balance(positive: f64, negative: f64) -> f64 {
        if positive.abs() < 0.001 || negative.abs() < 0.001 {
            0.0
        } else if positive == negative {
            1.0
        } else {
            1.0 / (positive - negative).abs().max(1.0)
        }
    }

    /// Balance from the ratio of the two sides.
    pub fn ratio_balance(positive: f64, negative: f64) -> f64 {
        if positive == 0.0 || negative == 0.0 {
            0.0
        } else if positive == negative {
            1.0
        } else {
            (1.0 / (positive / negative - 1.0)).abs().min(1.0)
        }
    }

    pub fn balance_x(&self) -> f64 {
        Self::balance(self.x_pos, self.x_neg)
    }

    pub fn balance_y(&self) -> f64 {
        Self::balance(self.y_pos, self.y_neg)
    }

    /// Summed distance of the four reaches from `target`.
    pub fn distance_from(&self, target: f64) -> f64 {
        (target - self.x_pos).abs()
            + (target - self.x_neg).abs()
            + (target - self.y_pos).abs()
            + (target - self.y_neg).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_of_empty_set() {
        assert!(Extents::from_vertices(&[]).is_none());
    }

    #[test]
    fn test_spans_and_balance() {
        let vertices = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, -1.0, 3.0),
            Vector3::new(-2.0, 1.5, 4.0),
        ];
        let extents = Extents::from_vertices(&vertices).unwrap();
        assert_eq!(extents.height(), 4.0);
        let spans = extents.spans();
        assert_eq!(spans.balance_x(), 1.0);
        assert_eq!(spans.y_neg, 1.0);
        // a gap below one unit saturates at full balance
        assert_eq!(spans.balance_y(), 1.0);
        assert_eq!(Spans::balance(3.0, 1.0), 0.5);
        assert_eq!(Spans::balance(0.0, 1.0), 0.0);
        assert_eq!(Spans::ratio_balance(3.0, 1.0), 0.5);
    }

    #[test]
    fn test_branch_size_ratio_for_tapering_branches() {
        let mut collector = StatisticsCollector::new(1.0);
        collector.forward(1.0);
        collector.open_branch(0.5);
        collector.forward(0.5);
        collector.close_branch();
        // unbalanced close is ignored
        collector.close_branch();
        let stats = collector.finish(&[]);
        assert_eq!(stats.trunk_weight, 1.0);
        assert_eq!(stats.max_branch_weight, 1.0);
        assert_eq!(stats.branch_size_ratio, 1.0);
    }
}
