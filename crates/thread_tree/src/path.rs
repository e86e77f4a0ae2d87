//! Decision-vector repair and path resolution
//!
//! The decision vector is advisory: tree mutations can shrink the valid
//! index range at any depth, so it is always re-derived against the live
//! tree before use. Stale indices wrap into range via modulo instead of
//! being rejected, which makes derivation a fixed point of itself.

use crate::tree::ThreadTree;

/// One node on the resolved path, with flags telling whether the node has
/// an alternate sibling before/after it at its branch point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub id: String,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Walk from `root`, choosing `previous[depth] % child_count` (missing
/// slots count as 0) at every node that has children, down to a leaf.
/// The output is always valid for the current tree, and running the
/// function on its own output returns it unchanged.
pub fn derive_default_decisions(tree: &ThreadTree, root: &str, previous: &[usize]) -> Vec<usize> {
    let mut decisions = Vec::new();
    if !tree.has_node(root) {
        return decisions;
    }

    let mut current = root.to_string();
    let mut depth = 0;
    loop {
        let children = tree.get_children(&current);
        if children.is_empty() {
            break;
        }
        let decision = previous.get(depth).copied().unwrap_or(0) % children.len();
        decisions.push(decision);
        current = children[decision].clone();
        depth += 1;
    }
    decisions
}

/// Resolve the displayed linear path. The decision vector is repaired
/// first, so any input vector yields a valid root-to-leaf sequence. The
/// root and single-child nodes carry both sibling flags false.
pub fn resolve_path(tree: &ThreadTree, root: &str, decisions: &[usize]) -> Vec<PathEntry> {
    let mut path = Vec::new();
    if !tree.has_node(root) {
        return path;
    }

    let decisions = derive_default_decisions(tree, root, decisions);
    path.push(PathEntry {
        id: root.to_string(),
        has_previous: false,
        has_next: false,
    });

    let mut current = root.to_string();
    for &decision in &decisions {
        let children = tree.get_children(&current);
        if children.is_empty() {
            break;
        }
        let chosen = children[decision].clone();
        path.push(PathEntry {
            id: chosen.clone(),
            has_previous: decision > 0,
            has_next: decision < children.len() - 1,
        });
        current = chosen;
    }
    path
}

/// Adjust the decision vector so `id` lies on the resolved path: every
/// ancestor level is pointed at the child leading to `id`, then the
/// vector is re-derived. Unknown ids just re-derive.
pub fn focus_decisions(tree: &ThreadTree, root: &str, id: &str, previous: &[usize]) -> Vec<usize> {
    if !tree.has_node(id) {
        return derive_default_decisions(tree, root, previous);
    }

    let mut decisions = previous.to_vec();
    let mut current = id.to_string();
    loop {
        let depth = tree.get_node_depth(&current);
        let order = tree.get_node_sibling_order(&current);
        if depth <= 0 || order < 0 {
            break;
        }
        let slot = (depth - 1) as usize;
        if decisions.len() <= slot {
            decisions.resize(slot + 1, 0);
        }
        decisions[slot] = order as usize;
        match tree.get_parent_id(&current) {
            Some(parent) => current = parent.to_string(),
            None => break,
        }
    }
    derive_default_decisions(tree, root, &decisions)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// r -> a -> {b, c}: two regenerated variants under one turn.
    fn sample_tree() -> ThreadTree {
        let mut tree = ThreadTree::new();
        tree.add_node("r", None, &[]);
        tree.add_node("a", Some("r"), &[]);
        tree.add_node("b", Some("a"), &[]);
        tree.add_node("c", Some("a"), &[]);
        tree
    }

    fn path_ids(path: &[PathEntry]) -> Vec<&str> {
        path.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn derivation_defaults_to_first_children() {
        let tree = sample_tree();
        assert_eq!(derive_default_decisions(&tree, "r", &[]), vec![0, 0]);
    }

    #[test]
    fn derivation_wraps_stale_indices() {
        let tree = sample_tree();
        // Slot 1 out of range for two children: 5 % 2 == 1.
        assert_eq!(derive_default_decisions(&tree, "r", &[0, 5]), vec![0, 1]);
    }

    #[test]
    fn derivation_is_a_fixed_point() {
        let tree = sample_tree();
        for seed in [vec![], vec![3, 7], vec![0, 1, 9], vec![1]] {
            let once = derive_default_decisions(&tree, "r", &seed);
            let twice = derive_default_decisions(&tree, "r", &once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn derivation_on_unknown_root_is_empty() {
        let tree = sample_tree();
        assert!(derive_default_decisions(&tree, "missing", &[0, 1]).is_empty());
    }

    #[test]
    fn resolve_follows_decisions_and_sets_sibling_flags() {
        let tree = sample_tree();
        let path = resolve_path(&tree, "r", &[0, 1]);
        assert_eq!(path_ids(&path), vec!["r", "a", "c"]);

        // r and a sit at single-choice levels.
        assert!(!path[0].has_previous && !path[0].has_next);
        assert!(!path[1].has_previous && !path[1].has_next);
        // c is the second of two variants.
        assert!(path[2].has_previous);
        assert!(!path[2].has_next);

        let path = resolve_path(&tree, "r", &[0, 0]);
        assert_eq!(path_ids(&path), vec!["r", "a", "b"]);
        assert!(!path[2].has_previous);
        assert!(path[2].has_next);
    }

    #[test]
    fn resolve_length_matches_leaf_depth_and_links_are_parent_child() {
        let tree = sample_tree();
        let path = resolve_path(&tree, "r", &[]);
        let leaf = &path[path.len() - 1].id;
        assert_eq!(path.len() as isize, tree.get_node_depth(leaf) + 1);
        for pair in path.windows(2) {
            assert_eq!(tree.get_parent_id(&pair[1].id), Some(pair[0].id.as_str()));
        }
    }

    #[test]
    fn deleting_a_branch_re_derives_within_range() {
        let mut tree = sample_tree();
        let decisions = derive_default_decisions(&tree, "r", &[0, 1]);
        assert_eq!(decisions, vec![0, 1]);

        tree.remove_node("c").unwrap();
        let repaired = derive_default_decisions(&tree, "r", &decisions);
        assert_eq!(repaired, vec![0, 0]);
        let path = resolve_path(&tree, "r", &repaired);
        assert_eq!(path_ids(&path), vec!["r", "a", "b"]);
        assert!(!path[2].has_previous && !path[2].has_next);
    }

    #[test]
    fn variant_navigation_scenario() {
        // With decisions [0, 1] the path is r, a, c; switching slot 1 to 0
        // shows b; deleting b clamps back to c with no alternates left.
        let mut tree = sample_tree();
        assert_eq!(path_ids(&resolve_path(&tree, "r", &[0, 1])), vec!["r", "a", "c"]);
        assert_eq!(path_ids(&resolve_path(&tree, "r", &[0, 0])), vec!["r", "a", "b"]);

        tree.remove_node("b").unwrap();
        let repaired = derive_default_decisions(&tree, "r", &[0, 1]);
        assert_eq!(repaired, vec![0, 0]);
        let path = resolve_path(&tree, "r", &repaired);
        assert_eq!(path_ids(&path), vec!["r", "a", "c"]);
        assert!(!path[2].has_previous && !path[2].has_next);
    }

    #[test]
    fn focus_puts_the_node_on_the_path() {
        let tree = sample_tree();
        let decisions = focus_decisions(&tree, "r", "c", &[0, 0]);
        let path = resolve_path(&tree, "r", &decisions);
        assert!(path.iter().any(|e| e.id == "c"));
    }

    #[test]
    fn focus_adjusts_every_ancestor_level() {
        // r -> {a, x}; x -> y. Focusing y must flip the root-level slot too.
        let mut tree = ThreadTree::new();
        tree.add_node("r", None, &[]);
        tree.add_node("a", Some("r"), &[]);
        tree.add_node("x", Some("r"), &[]);
        tree.add_node("y", Some("x"), &[]);

        let decisions = focus_decisions(&tree, "r", "y", &[0]);
        let path = resolve_path(&tree, "r", &decisions);
        assert_eq!(path_ids(&path), vec!["r", "x", "y"]);
    }

    #[test]
    fn focus_on_unknown_id_just_re_derives() {
        let tree = sample_tree();
        let decisions = focus_decisions(&tree, "r", "missing", &[0, 7]);
        assert_eq!(decisions, vec![0, 1]);
    }
}
