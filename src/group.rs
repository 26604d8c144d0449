//! Clustering of raw window hits into final detections.

use crate::types::{Detection, Rect};

/// Fraction of the smaller rectangle's size that corners may differ by and
/// still count as the same object.
const SIMILARITY_EPS: f32 = 0.1;

/// Margin, relative to the outer rectangle, within which a smaller group is
/// considered nested.
const CONTAINMENT_MARGIN: f32 = 0.2;

fn similar(a: &Rect, b: &Rect) -> bool {
    let delta = SIMILARITY_EPS * (a.width.min(b.width) + a.height.min(b.height));
    (a.x - b.x).abs() <= delta
        && (a.y - b.y).abs() <= delta
        && (a.right() - b.right()).abs() <= delta
        && (a.bottom() - b.bottom()).abs() <= delta
}

/// Assign every rectangle a class label.
///
/// Each rectangle joins the class of the first earlier rectangle it is
/// similar to, so the result depends on input order.
fn partition(rects: &[Rect]) -> (Vec<usize>, usize) {
    let mut labels = Vec::with_capacity(rects.len());
    let mut num_classes = 0;

    for (i, rect) in rects.iter().enumerate() {
        let label = match rects[..i].iter().position(|earlier| similar(rect, earlier)) {
            Some(j) => labels[j],
            None => {
                num_classes += 1;
                num_classes - 1
            }
        };
        labels.push(label);
    }

    (labels, num_classes)
}

/// Group near-duplicate rectangles into detections.
///
/// Classes with at least `min_neighbors` members are replaced by their mean
/// rectangle. Smaller classes are not dropped: they are emitted with the
/// plain sum of their members' coordinates, which for a single member is the
/// member itself. Finally any group lying inside another group expanded by
/// 20% on each side is removed.
///
/// Detections are returned in order of class creation, each carrying its
/// member count.
pub fn group_rectangles(rects: &[Rect], min_neighbors: u32) -> Vec<Detection> {
    let (labels, num_classes) = partition(rects);

    let mut groups = vec![Detection::new(Rect::new(0.0, 0.0, 0.0, 0.0), 0); num_classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        groups[label].rect += *rect;
        groups[label].neighbors += 1;
    }
    for group in groups.iter_mut() {
        if group.neighbors >= min_neighbors {
            group.rect = group.rect / group.neighbors as f32;
        }
    }

    let survivors: Vec<Detection> = groups
        .iter()
        .enumerate()
        .filter(|(i, group)| {
            !groups.iter().enumerate().any(|(j, outer)| {
                *i != j
                    && group.rect.is_inside_expanded(
                        &outer.rect,
                        outer.rect.width * CONTAINMENT_MARGIN,
                        outer.rect.height * CONTAINMENT_MARGIN,
                    )
            })
        })
        .map(|(_, group)| *group)
        .collect();

    log::debug!(
        "grouped {} rectangles into {} classes, {} after containment filter",
        rects.len(),
        num_classes,
        survivors.len()
    );
    survivors
}
