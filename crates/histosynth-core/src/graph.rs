use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pipeline stage, one per synthesized table.
///
/// The declaration order is the canonical tie-break used when several stages
/// are ready at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Customers,
    Locations,
    Employees,
    Orders,
    LineItems,
    Inventory,
    Reviews,
    WebStats,
    SkillReviews,
    TerminationReasons,
    LineItemReturns,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::Customers,
        Stage::Locations,
        Stage::Employees,
        Stage::Orders,
        Stage::LineItems,
        Stage::Inventory,
        Stage::Reviews,
        Stage::WebStats,
        Stage::SkillReviews,
        Stage::TerminationReasons,
        Stage::LineItemReturns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Customers => "customers",
            Stage::Locations => "locations",
            Stage::Employees => "employees",
            Stage::Orders => "orders",
            Stage::LineItems => "line_items",
            Stage::Inventory => "inventory",
            Stage::Reviews => "reviews",
            Stage::WebStats => "web_stats",
            Stage::SkillReviews => "skill_reviews",
            Stage::TerminationReasons => "termination_reasons",
            Stage::LineItemReturns => "line_item_returns",
        }
    }

    /// Upstream stages whose tables must be fully materialized first.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Locations => &[],
            Stage::Customers => &[Stage::Locations],
            Stage::Employees => &[Stage::Locations],
            Stage::Orders => &[Stage::Customers, Stage::Employees, Stage::Locations],
            Stage::LineItems => &[Stage::Orders],
            Stage::Inventory => &[Stage::Orders, Stage::LineItems, Stage::Locations],
            Stage::Reviews => &[Stage::Orders],
            Stage::WebStats => &[Stage::Orders],
            Stage::SkillReviews => &[Stage::Employees],
            Stage::TerminationReasons => &[Stage::Employees],
            Stage::LineItemReturns => &[Stage::LineItems],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of stage graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Report for stage dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageGraphReport {
    pub summary: StageGraphSummary,
    pub topo_order: Option<Vec<Stage>>,
    pub cycle: Option<Vec<Stage>>,
}

/// Build the dependency report for the built-in pipeline stages.
pub fn build_stage_graph_report() -> StageGraphReport {
    let dependencies = Stage::ALL
        .iter()
        .map(|stage| (*stage, stage.dependencies().to_vec()))
        .collect();
    build_graph_report(&dependencies)
}

/// Build a deterministic dependency report from an explicit dependency map.
pub fn build_graph_report(dependencies: &BTreeMap<Stage, Vec<Stage>>) -> StageGraphReport {
    let graph = build_adjacency(dependencies);
    let nodes = graph.len();
    let edges = graph.values().map(|targets| targets.len()).sum();
    let summary = StageGraphSummary { nodes, edges };

    match toposort(&graph) {
        Ok(order) => StageGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => StageGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}

/// Execution order of the pipeline stages.
pub fn stage_order() -> Result<Vec<Stage>> {
    let report = build_stage_graph_report();
    match report.topo_order {
        Some(order) => Ok(order),
        None => Err(Error::Configuration(format!(
            "stage dependencies contain a cycle: {:?}",
            report.cycle.unwrap_or_default()
        ))),
    }
}

fn build_adjacency(dependencies: &BTreeMap<Stage, Vec<Stage>>) -> BTreeMap<Stage, BTreeSet<Stage>> {
    let mut graph: BTreeMap<Stage, BTreeSet<Stage>> = BTreeMap::new();

    for (stage, upstream) in dependencies {
        graph.entry(*stage).or_default();
        for parent in upstream {
            graph.entry(*parent).or_default().insert(*stage);
        }
    }

    graph
}

fn toposort(graph: &BTreeMap<Stage, BTreeSet<Stage>>) -> std::result::Result<Vec<Stage>, Vec<Stage>> {
    let mut indegree: BTreeMap<Stage, usize> = graph.keys().map(|node| (*node, 0)).collect();

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(*target).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<Stage> = indegree
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*target);
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let cycle_nodes = indegree
            .into_iter()
            .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
            .collect();
        Err(cycle_nodes)
    }
}
