use crate::model::{FilterComponent, FilterRequest, LogicMode};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

///
/// FilterGroup
///
/// Composite node of the filter tree: an ordered sequence of components
/// combined under the group's logic mode.
///
/// Normalization invariant, enforced on every mutation: a run of two or more
/// consecutive leaves collapses into an implicit AND sub-group, so a group's
/// direct children are single leaves or nested groups. This keeps compilation
/// a uniform per-mode fold. Normalizing twice produces the same shape.
///
/// Groups own their children, so a group can never contain itself; nesting
/// depth is bounded by the compiler, not the model.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FilterGroup {
    #[serde(default, alias = "logicMode")]
    pub logic: LogicMode,
    #[serde(default)]
    pub components: Vec<FilterComponent>,
}

impl FilterGroup {
    #[must_use]
    pub const fn new(logic: LogicMode) -> Self {
        Self {
            logic,
            components: Vec::new(),
        }
    }

    pub fn from_requests(requests: impl IntoIterator<Item = FilterRequest>) -> Self {
        let mut group = Self::default();
        group.add_requests(requests);
        group
    }

    pub fn add_component(&mut self, component: impl Into<FilterComponent>) {
        self.components.push(component.into());
        self.normalize();
    }

    pub fn add_request(&mut self, request: FilterRequest) {
        self.add_component(FilterComponent::Leaf(request));
    }

    pub fn add_requests(&mut self, requests: impl IntoIterator<Item = FilterRequest>) {
        self.components
            .extend(requests.into_iter().map(FilterComponent::Leaf));
        self.normalize();
    }

    /// Builder-style component append.
    #[must_use]
    pub fn with(mut self, component: impl Into<FilterComponent>) -> Self {
        self.add_component(component);
        self
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Collapse every run of two or more consecutive leaves into an implicit
    /// AND sub-group. Leaves keep their own logic modes inside the sub-group.
    pub fn normalize(&mut self) {
        if !self
            .components
            .windows(2)
            .any(|pair| pair[0].is_leaf() && pair[1].is_leaf())
        {
            return;
        }

        let mut normalized = Vec::with_capacity(self.components.len());
        let mut run: Vec<FilterComponent> = Vec::new();

        for component in self.components.drain(..) {
            if component.is_leaf() {
                run.push(component);
            } else {
                flush_run(&mut normalized, &mut run);
                normalized.push(component);
            }
        }
        flush_run(&mut normalized, &mut run);

        self.components = normalized;
    }

    /// Total number of leaf conditions in the tree.
    #[must_use]
    pub fn count_components(&self) -> usize {
        self.components
            .iter()
            .map(|component| match component {
                FilterComponent::Leaf(_) => 1,
                FilterComponent::Group(group) => group.count_components(),
            })
            .sum()
    }

    /// Per-mode tally of every component's connective, recursively.
    #[must_use]
    pub fn count_logic_operations(&self) -> [usize; LogicMode::ALL.len()] {
        let mut counts = [0; LogicMode::ALL.len()];
        self.collect_logic_counts(&mut counts);
        counts
    }

    fn collect_logic_counts(&self, counts: &mut [usize; LogicMode::ALL.len()]) {
        for component in &self.components {
            counts[component.logic().index()] += 1;
            if let FilterComponent::Group(group) = component {
                group.collect_logic_counts(counts);
            }
        }
    }

    /// Maximum nesting depth; an empty group has depth 1.
    #[must_use]
    pub fn compute_depth(&self) -> usize {
        1 + self
            .components
            .iter()
            .filter_map(FilterComponent::as_group)
            .map(Self::compute_depth)
            .max()
            .unwrap_or(0)
    }

    /// Iterate the tree's leaves in document order.
    pub fn leaves(&self) -> impl Iterator<Item = &FilterRequest> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out.into_iter()
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FilterRequest>) {
        for component in &self.components {
            match component {
                FilterComponent::Leaf(leaf) => out.push(leaf),
                FilterComponent::Group(group) => group.collect_leaves(out),
            }
        }
    }

    // --- Debug renderings ---

    /// Indented nesting view, one condition per line.
    #[must_use]
    pub fn to_simple_string(&self) -> String {
        let mut out = String::from(
            "LOGIC OPERATORS:\n  &&  : all conditions must hold\n  ||  : at least one must hold\n\n",
        );
        self.render_simple(&mut out, 0, true);
        out
    }

    fn render_simple(&self, out: &mut String, level: usize, top: bool) {
        let indent = "  ".repeat(level);
        if !top {
            let _ = writeln!(out, "{indent}{{ * Level {level}");
        }

        for component in &self.components {
            match component {
                FilterComponent::Leaf(leaf) => {
                    let _ = writeln!(out, "{indent}{} ({leaf})", leaf.logic.connective());
                }
                FilterComponent::Group(group) => {
                    let _ = writeln!(out, "{indent}{} Group", group.logic.connective());
                    group.render_simple(out, level + 1, false);
                }
            }
        }

        if !top {
            let _ = writeln!(out, "{indent}}}");
        }
    }

    /// Symbolic view: each leaf gets a letter, followed by a legend and an
    /// infix expression, headed by component/depth totals.
    #[must_use]
    pub fn to_symbolic_expression(&self) -> String {
        if self.components.is_empty() {
            return "Filter Logic Structure Overview\nTotal Logic Components: 0\nMax Depth: 0\n\n\
                    Legend:\n(no components)\n\nLogic Expression:\n(empty)\n"
                .to_string();
        }

        let mut legend = String::from("Legend:\n");
        let mut index = 0usize;
        self.assign_symbols(&mut legend, &mut index);

        let mut next = 0usize;
        let expression = self.render_symbolic(&mut next);

        let counts = self.count_logic_operations();
        let mut tallies = String::new();
        for mode in LogicMode::ALL {
            let count = counts[mode.index()];
            if count > 0 {
                let _ = writeln!(tallies, "{mode}: {count}");
            }
        }

        format!(
            "Filter Logic Structure Overview\nTotal Logic Components: {}\n{}Max Depth: {}\n\n{}\nLogic Expression:\n{}\n",
            self.count_components(),
            tallies,
            self.compute_depth(),
            legend,
            expression
        )
    }

    fn assign_symbols(&self, legend: &mut String, index: &mut usize) {
        for component in &self.components {
            match component {
                FilterComponent::Leaf(leaf) => {
                    let _ = writeln!(legend, "{} = ({leaf})", symbol_for(*index));
                    *index += 1;
                }
                FilterComponent::Group(group) => group.assign_symbols(legend, index),
            }
        }
    }

    fn render_symbolic(&self, next: &mut usize) -> String {
        let mut out = String::new();

        for (i, component) in self.components.iter().enumerate() {
            let part = match component {
                FilterComponent::Leaf(_) => {
                    let symbol = symbol_for(*next);
                    *next += 1;
                    symbol
                }
                FilterComponent::Group(group) => {
                    let nested = group.render_symbolic(next);
                    if group.components.len() > 1 {
                        format!("({nested})")
                    } else {
                        nested
                    }
                }
            };

            if i == 0 {
                out.push_str(&part);
            } else {
                let _ = write!(out, " {} {part}", component.logic().connective());
            }
        }

        out
    }
}

fn flush_run(normalized: &mut Vec<FilterComponent>, run: &mut Vec<FilterComponent>) {
    match run.len() {
        0 => {}
        1 => normalized.extend(run.drain(..)),
        _ => {
            let sub = FilterGroup {
                logic: LogicMode::And,
                components: std::mem::take(run),
            };
            normalized.push(FilterComponent::Group(sub));
        }
    }
}

/// A, B, ..., Z, A1, B1, ...
fn symbol_for(index: usize) -> String {
    let letter = char::from(b'A' + u8::try_from(index % 26).unwrap_or(0));
    let cycle = index / 26;
    if cycle == 0 {
        letter.to_string()
    } else {
        format!("{letter}{cycle}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use proptest::prelude::*;

    fn leaf(field: &str, n: i64) -> FilterRequest {
        FilterRequest::eq(field, n)
    }

    #[test]
    fn consecutive_leaves_collapse_into_and_subgroup() {
        let mut group = FilterGroup::new(LogicMode::Or);
        group.components = vec![
            leaf("a", 1).into(),
            leaf("b", 2).into(),
            FilterGroup::new(LogicMode::And).into(),
            leaf("c", 3).into(),
        ];
        group.normalize();

        assert_eq!(group.components.len(), 3);
        let sub = group.components[0].as_group().unwrap();
        assert_eq!(sub.logic, LogicMode::And);
        assert_eq!(sub.components.len(), 2);
        // A trailing run of one stays a leaf.
        assert!(group.components[2].is_leaf());
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut group = FilterGroup::default();
        group.components = vec![leaf("a", 1).into(), leaf("b", 2).into(), leaf("c", 3).into()];
        group.normalize();
        let once = group.clone();
        group.normalize();
        assert_eq!(group, once);
    }

    #[test]
    fn add_requests_normalizes_in_one_pass() {
        let group = FilterGroup::from_requests([leaf("a", 1), leaf("b", 2)]);
        assert_eq!(group.components.len(), 1);
        assert_eq!(group.count_components(), 2);
    }

    #[test]
    fn depth_and_counts() {
        let inner = FilterGroup::new(LogicMode::Or)
            .with(leaf("x", 1).with_logic(LogicMode::Or))
            .with(FilterGroup::new(LogicMode::And).with(leaf("y", 2)));
        let group = FilterGroup::default().with(leaf("a", 1)).with(inner);

        assert_eq!(group.count_components(), 3);
        assert_eq!(group.compute_depth(), 3);

        // The inner group's own connective and leaf x both tally as OR.
        let counts = group.count_logic_operations();
        assert_eq!(counts[LogicMode::Or.index()], 2);
        assert!(counts[LogicMode::And.index()] >= 3);
    }

    #[test]
    fn symbolic_expression_labels_leaves_in_order() {
        let group = FilterGroup::default()
            .with(leaf("age", 18))
            .with(
                FilterGroup::new(LogicMode::And)
                    .with(FilterRequest::eq("city", "NY"))
                    .with(FilterRequest::eq("city", "LA").with_logic(LogicMode::Or)),
            );
        let rendered = group.to_symbolic_expression();
        assert!(rendered.contains("A = (age == 18)"));
        assert!(rendered.contains("B = (city == NY)"));
        assert!(rendered.contains("A && (B || C)"));
    }

    #[test]
    fn empty_group_renders_placeholder() {
        let rendered = FilterGroup::default().to_symbolic_expression();
        assert!(rendered.contains("(no components)"));
        assert!(rendered.contains("(empty)"));
    }

    proptest! {
        /// Normalization never changes the set or order of leaves.
        #[test]
        fn normalize_preserves_leaf_sequence(values in proptest::collection::vec(0i64..100, 0..12)) {
            let mut group = FilterGroup::default();
            group.components = values
                .iter()
                .map(|v| FilterComponent::Leaf(leaf("f", *v)))
                .collect();

            let before: Vec<Value> = group.leaves().map(|l| l.value.clone()).collect();
            group.normalize();
            let after: Vec<Value> = group.leaves().map(|l| l.value.clone()).collect();
            prop_assert_eq!(before, after);
        }

        /// Idempotence over arbitrary leaf/group interleavings.
        #[test]
        fn normalize_idempotent_over_interleavings(shape in proptest::collection::vec(any::<bool>(), 0..10)) {
            let mut group = FilterGroup::default();
            group.components = shape
                .iter()
                .map(|is_leaf| {
                    if *is_leaf {
                        FilterComponent::Leaf(leaf("f", 1))
                    } else {
                        FilterComponent::Group(FilterGroup::default().with(leaf("g", 2)))
                    }
                })
                .collect();

            group.normalize();
            let once = group.clone();
            group.normalize();
            prop_assert_eq!(group, once);
        }
    }
}
