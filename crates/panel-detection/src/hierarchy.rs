//! Hierarchy construction and identifier assignment
//!
//! The flat containment strategy: nest an already deduplicated list of
//! panels by geometric containment. Runs as two separate passes: a pure
//! search that maps every panel to its nearest enclosing panel, then a
//! materialization pass that builds the tree from that mapping. Nothing is
//! mutated while it is being searched.

use canvas_common::Panel;
use tracing::debug;
use uuid::Uuid;

/// Nest a flat list of panels by containment.
///
/// Panels are ordered by ascending area; each one attaches to the smallest
/// panel that fully encloses it, and panels with no enclosing match become
/// top-level roots. Children end up ordered smallest first.
#[must_use]
pub fn build_containment_tree(mut flat: Vec<Panel>) -> Vec<Panel> {
    if flat.is_empty() {
        return flat;
    }

    flat.sort_by_key(|p| u64::from(p.width) * u64::from(p.height));

    // Pass 1: nearest enclosing panel per index. Sorting guarantees a
    // parent always sits later in the list than its children.
    let parents: Vec<Option<usize>> = flat
        .iter()
        .enumerate()
        .map(|(i, panel)| {
            flat.iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, enclosing)| enclosing.contains(panel))
                .map(|(j, _)| j)
        })
        .collect();

    // Pass 2: materialize. Children drain before their parent is visited
    // because parent indexes are strictly larger.
    let mut slots: Vec<Option<Panel>> = flat.into_iter().map(Some).collect();
    let mut roots = Vec::new();
    for i in 0..slots.len() {
        let Some(panel) = slots[i].take() else {
            continue;
        };
        match parents[i] {
            Some(j) => {
                if let Some(parent) = slots[j].as_mut() {
                    parent.children.push(panel);
                }
            }
            None => roots.push(panel),
        }
    }

    debug!("Containment pass produced {} top-level panels", roots.len());
    roots
}

/// Stamp every node of a finished tree with a fresh unique identifier.
///
/// A single pre-order pass; geometry, ordering, and nesting are untouched.
pub fn assign_ids(panels: &mut [Panel]) {
    for panel in panels {
        panel.id = Uuid::new_v4().to_string();
        assign_ids(&mut panel.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn panel(x: u32, y: u32, width: u32, height: u32) -> Panel {
        Panel {
            id: String::new(),
            title: "Box".to_string(),
            x,
            y,
            width,
            height,
            border_width: 0,
            border_color: None,
            background_color: None,
            children: Vec::new(),
        }
    }

    fn assert_containment(parent: &Panel) {
        for child in &parent.children {
            assert!(parent.contains(child));
            assert_containment(child);
        }
    }

    #[test]
    fn test_nested_panels_attach_to_nearest_enclosure() {
        let roots = build_containment_tree(vec![
            panel(0, 0, 100, 100),
            panel(10, 10, 50, 50),
            panel(15, 15, 10, 10),
            panel(200, 0, 40, 40),
        ]);

        assert_eq!(roots.len(), 2);
        let big = roots.iter().find(|p| p.width == 100).unwrap();
        assert_eq!(big.children.len(), 1);
        assert_eq!(big.children[0].width, 50);
        assert_eq!(big.children[0].children.len(), 1);
        assert_eq!(big.children[0].children[0].width, 10);

        for root in &roots {
            assert_containment(root);
        }
    }

    #[test]
    fn test_overlapping_non_contained_panels_stay_roots() {
        let roots = build_containment_tree(vec![panel(0, 0, 60, 60), panel(30, 30, 60, 60)]);
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|p| p.children.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        assert!(build_containment_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_assign_ids_is_unique_across_tree() {
        let mut roots = build_containment_tree(vec![
            panel(0, 0, 100, 100),
            panel(10, 10, 50, 50),
            panel(15, 15, 10, 10),
            panel(200, 0, 40, 40),
            panel(205, 5, 10, 10),
        ]);
        assign_ids(&mut roots);

        fn collect(panels: &[Panel], out: &mut Vec<String>) {
            for p in panels {
                out.push(p.id.clone());
                collect(&p.children, out);
            }
        }

        let mut ids = Vec::new();
        collect(&roots, &mut ids);
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| !id.is_empty()));

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_assign_ids_leaves_geometry_alone() {
        let mut roots = vec![panel(3, 4, 20, 10)];
        assign_ids(&mut roots);
        assert_eq!((roots[0].x, roots[0].y), (3, 4));
        assert_eq!((roots[0].width, roots[0].height), (20, 10));
    }
}
