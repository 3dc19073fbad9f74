use eframe::egui::Vec2;

use super::quadtree::QuadNode;
use crate::util::golden_direction;

// Softens the 1/d falloff for bodies that nearly overlap.
const MIN_DISTANCE_SQ: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
}

pub(super) fn relax_springs(positions: &mut [Vec2], springs: &[Spring], degree: &[f32], alpha: f32) {
    for spring in springs {
        if spring.source == spring.target {
            continue;
        }

        let delta = positions[spring.target] - positions[spring.source];
        let length_sq = delta.length_sq();
        if length_sq <= f32::EPSILON {
            continue;
        }

        let length = length_sq.sqrt();
        let scale = alpha * spring.strength * (length - spring.distance) / length;
        let correction = delta * scale;

        let source_weight = degree[spring.source];
        let target_weight = degree[spring.target];
        let share = if source_weight + target_weight > 0.0 {
            source_weight / (source_weight + target_weight)
        } else {
            0.5
        };

        positions[spring.target] -= correction * share;
        positions[spring.source] += correction * (1.0 - share);
    }
}

pub(super) fn apply_gravity(positions: &mut [Vec2], center: Vec2, strength: f32) {
    if strength <= 0.0 {
        return;
    }

    for position in positions {
        *position += (center - *position) * strength;
    }
}

pub(super) fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    theta: f32,
    kick: &mut Vec2,
) {
    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            *kick += pairwise_kick(point, positions[other], charges[other], index, other);
        }
        return;
    }

    let delta = node.center - point;
    let distance_sq = delta.length_sq();
    let can_approximate = !node.bounds.contains(point)
        && distance_sq > f32::EPSILON
        && node.bounds.side_length() / distance_sq.sqrt() < theta;

    if can_approximate {
        *kick += delta * (node.charge / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion(child, index, positions, charges, theta, kick);
    }
}

fn pairwise_kick(point: Vec2, other_point: Vec2, other_charge: f32, index: usize, other: usize) -> Vec2 {
    let mut delta = other_point - point;
    let mut distance_sq = delta.length_sq();
    if distance_sq <= f32::EPSILON {
        delta = golden_direction(index.min(other), index.max(other));
        if index > other {
            delta = -delta;
        }
        distance_sq = 1.0;
    }

    delta * (other_charge / distance_sq.max(MIN_DISTANCE_SQ))
}
