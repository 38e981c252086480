//! DB postprocessing for text detection.
//!
//! Turns the detector's probability map into text boxes: binarize, label
//! connected components, score, expand, and map back to image pixels.

use ndarray::{Array2, ArrayView2};

/// Boxes whose top edges differ by less than this many pixels share a line
const SAME_LINE_TOLERANCE: f32 = 10.0;

/// A detected text box in image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    /// Top-left, top-right, bottom-right, bottom-left
    pub polygon: [[f32; 2]; 4],
    /// Mean probability inside the component
    pub score: f32,
}

/// Parameters of the DB box extraction
#[derive(Debug, Clone)]
pub struct DbParams {
    pub threshold: f32,
    pub box_threshold: f32,
    pub unclip_ratio: f32,
    pub max_candidates: usize,
    /// Components with a shorter side (in map pixels) are dropped
    pub min_size: f32,
}

impl Default for DbParams {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            max_candidates: 1000,
            min_size: 3.0,
        }
    }
}

/// Geometry mapping from the probability map back to the source image
#[derive(Debug, Clone, Copy)]
pub struct MapGeometry {
    pub ratio_w: f32,
    pub ratio_h: f32,
    pub image_width: u32,
    pub image_height: u32,
}

/// Connected region of the binarized map
#[derive(Debug)]
struct Component {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
    prob_sum: f32,
    pixels: usize,
}

/// Extract boxes from a `[H, W]` probability map, in reading order.
pub fn extract_boxes(
    prob_map: ArrayView2<f32>,
    params: &DbParams,
    geometry: MapGeometry,
) -> Vec<DetectedBox> {
    let binary = prob_map.mapv(|p| p > params.threshold);

    let mut boxes: Vec<DetectedBox> = connected_components(&binary, prob_map)
        .into_iter()
        .take(params.max_candidates)
        .filter_map(|component| component_to_box(&component, params, geometry))
        .collect();

    sort_reading_order(&mut boxes);
    boxes
}

fn component_to_box(
    component: &Component,
    params: &DbParams,
    geometry: MapGeometry,
) -> Option<DetectedBox> {
    let width = (component.max_x - component.min_x + 1) as f32;
    let height = (component.max_y - component.min_y + 1) as f32;
    if width.min(height) < params.min_size {
        return None;
    }

    let score = component.prob_sum / component.pixels as f32;
    if score < params.box_threshold {
        return None;
    }

    let rect = [
        component.min_x as f32,
        component.min_y as f32,
        component.max_x as f32 + 1.0,
        component.max_y as f32 + 1.0,
    ];
    let [x1, y1, x2, y2] = unclip(rect, params.unclip_ratio);
    if (x2 - x1).min(y2 - y1) < params.min_size + 2.0 {
        return None;
    }

    let max_x = geometry.image_width as f32;
    let max_y = geometry.image_height as f32;
    let x1 = (x1 / geometry.ratio_w).clamp(0.0, max_x);
    let x2 = (x2 / geometry.ratio_w).clamp(0.0, max_x);
    let y1 = (y1 / geometry.ratio_h).clamp(0.0, max_y);
    let y2 = (y2 / geometry.ratio_h).clamp(0.0, max_y);

    Some(DetectedBox {
        polygon: [[x1, y1], [x2, y1], [x2, y2], [x1, y2]],
        score,
    })
}

/// 4-connected component labeling by iterative flood fill
fn connected_components(binary: &Array2<bool>, prob_map: ArrayView2<f32>) -> Vec<Component> {
    let (height, width) = binary.dim();
    let mut visited = Array2::<bool>::default((height, width));
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !binary[[y, x]] || visited[[y, x]] {
                continue;
            }

            let mut component = Component {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                prob_sum: 0.0,
                pixels: 0,
            };
            visited[[y, x]] = true;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                component.min_x = component.min_x.min(cx);
                component.max_x = component.max_x.max(cx);
                component.min_y = component.min_y.min(cy);
                component.max_y = component.max_y.max(cy);
                component.prob_sum += prob_map[[cy, cx]];
                component.pixels += 1;

                let neighbors = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < width && ny < height && binary[[ny, nx]] && !visited[[ny, nx]] {
                        visited[[ny, nx]] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            components.push(component);
        }
    }

    components
}

/// Grow a rectangle by `area * ratio / perimeter` on every side
fn unclip(rect: [f32; 4], ratio: f32) -> [f32; 4] {
    let [x1, y1, x2, y2] = rect;
    let (width, height) = (x2 - x1, y2 - y1);
    let perimeter = 2.0 * (width + height);
    if perimeter <= 0.0 {
        return rect;
    }
    let distance = width * height * ratio / perimeter;
    [x1 - distance, y1 - distance, x2 + distance, y2 + distance]
}

/// Top-to-bottom, then left-to-right for boxes on the same line
pub fn sort_reading_order(boxes: &mut [DetectedBox]) {
    boxes.sort_by(|a, b| {
        let (ax, ay) = (a.polygon[0][0], a.polygon[0][1]);
        let (bx, by) = (b.polygon[0][0], b.polygon[0][1]);
        ay.total_cmp(&by).then(ax.total_cmp(&bx))
    });

    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let (current, next) = (&boxes[j], &boxes[j + 1]);
            let same_line =
                (next.polygon[0][1] - current.polygon[0][1]).abs() < SAME_LINE_TOLERANCE;
            if same_line && next.polygon[0][0] < current.polygon[0][0] {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}

/// Axis-aligned integer box of a polygon, clamped to the image.
///
/// Returns `None` when nothing of the box remains inside the image.
pub fn polygon_to_bbox(
    polygon: &[[f32; 2]; 4],
    image_width: u32,
    image_height: u32,
) -> Option<[u32; 4]> {
    if image_width == 0 || image_height == 0 {
        return None;
    }

    let min_x = polygon.iter().map(|p| p[0]).fold(f32::MAX, f32::min);
    let max_x = polygon.iter().map(|p| p[0]).fold(f32::MIN, f32::max);
    let min_y = polygon.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
    let max_y = polygon.iter().map(|p| p[1]).fold(f32::MIN, f32::max);
    if min_x >= image_width as f32 || min_y >= image_height as f32 {
        return None;
    }

    let x1 = (min_x.floor().max(0.0) as u32).min(image_width - 1);
    let y1 = (min_y.floor().max(0.0) as u32).min(image_height - 1);
    let x2 = (max_x.ceil().max(0.0) as u32).min(image_width);
    let y2 = (max_y.ceil().max(0.0) as u32).min(image_height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some([x1, y1, x2, y2])
}
