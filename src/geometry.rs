//! Pure geometry queries used by hit-testing and the physics engine.
//!
//! Everything in this module is stateless: plain functions over points and
//! shapes, shared by the interaction layer and the force integrator.

use crate::types::{Dimensions, Shape};
use eframe::egui;

/// Maps a normalized slider value in `0..=100` linearly into `out_min..=out_max`.
pub fn map_range(value: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value / 100.0) * (out_max - out_min)
}

/// Calculates the distance from a point to a line segment.
///
/// Uses vector projection to find the closest point on the segment; degenerate
/// (zero-length) segments fall back to point distance.
pub fn distance_to_segment(point: egui::Pos2, start: egui::Pos2, end: egui::Pos2) -> f32 {
    let line_vec = end - start;
    let point_vec = point - start;
    let line_len_sq = line_vec.length_sq();

    if line_len_sq < 0.0001 {
        return point_vec.length();
    }

    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    let projection = start + line_vec * t;
    (point - projection).length()
}

/// Tests whether a canvas point falls inside a node shape centered at `center`.
pub fn point_in_shape(point: egui::Pos2, center: egui::Pos2, shape: Shape, dims: &Dimensions) -> bool {
    match shape {
        Shape::Circle => (point - center).length() <= dims.circle_radius,
        Shape::Rectangle => {
            let half_w = dims.rect_width / 2.0;
            let half_h = dims.rect_height / 2.0;
            (point.x - center.x).abs() <= half_w && (point.y - center.y).abs() <= half_h
        }
    }
}

/// Axis-aligned bounding box of a node shape centered at `center`.
///
/// Circles use their diameter on both axes; the box is what marquee selection
/// tests against.
pub fn shape_bounds(center: egui::Pos2, shape: Shape, dims: &Dimensions) -> egui::Rect {
    let size = match shape {
        Shape::Circle => egui::vec2(dims.circle_radius * 2.0, dims.circle_radius * 2.0),
        Shape::Rectangle => egui::vec2(dims.rect_width, dims.rect_height),
    };
    egui::Rect::from_center_size(center, size)
}

/// Canvas position of a node's resize-handle affordance (bottom-right corner).
pub fn resize_handle_pos(center: egui::Pos2, shape: Shape, dims: &Dimensions) -> egui::Pos2 {
    match shape {
        // 0.707 ~ cos(45 deg): the handle sits on the circle's rim.
        Shape::Circle => center + egui::vec2(dims.circle_radius, dims.circle_radius) * 0.707,
        Shape::Rectangle => {
            center + egui::vec2(dims.rect_width / 2.0 - 2.0, dims.rect_height / 2.0 - 2.0)
        }
    }
}
