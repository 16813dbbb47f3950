//! Dependency Graph Resolution Tests
//!
//! Critical invariants tested:
//! - Topological validity: every node after all its dependencies
//! - Cycle detection raises an error naming the cycle, never a partial order
//! - Insertion-order tie-break keeps resolution deterministic
//! - Construction errors (duplicate, unknown) fail fast

use rust_decimal::Decimal;
use wallet_simulator_core::{DependencyGraph, GraphError, Node, NodeKind, TaxBracket};

fn fixed(id: &str) -> Node {
    Node::new(
        id,
        NodeKind::FixedExpense {
            amount: Decimal::from(100),
            payment_day: 1,
            description: format!("{} payment", id),
        },
    )
}

/// The full example wiring: income → tax → credit → bankruptcy
fn comprehensive_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    graph
        .add_node(Node::new(
            "salary",
            NodeKind::Salary {
                annual_salary: Decimal::from(75_000),
                payment_day: 1,
            },
        ))
        .unwrap();
    graph
        .add_node(Node::new(
            "freelance",
            NodeKind::VariableIncome {
                mean: Decimal::from(1_500),
                std_dev: Decimal::from(500),
                probability: Decimal::new(15, 2),
            },
        ))
        .unwrap();
    graph.add_node(fixed("rent")).unwrap();
    graph
        .add_node(Node::new("debt_payments", NodeKind::DebtPayment { payment_day: 15 }))
        .unwrap();
    graph
        .add_node(
            Node::new(
                "taxes",
                NodeKind::IncomeTax {
                    brackets: TaxBracket::default_progressive(),
                    payment_month: 12,
                    payment_day: 31,
                },
            )
            .with_dependencies(vec!["salary".to_string(), "freelance".to_string()]),
        )
        .unwrap();
    graph
        .add_node(
            Node::new(
                "credit_score",
                NodeKind::CreditScore {
                    alpha: Decimal::new(1, 1),
                },
            )
            .with_dependencies(vec!["taxes".to_string(), "debt_payments".to_string()]),
        )
        .unwrap();
    graph
        .add_node(
            Node::new(
                "bankruptcy",
                NodeKind::BankruptcyCheck {
                    threshold: Decimal::from(-50_000),
                },
            )
            .with_dependencies(vec!["credit_score".to_string()]),
        )
        .unwrap();

    graph
}

#[test]
fn test_every_node_after_its_dependencies() {
    let mut graph = comprehensive_graph();
    let order = graph.resolve_order().unwrap();

    assert_eq!(order.len(), 7);

    let position = |id: &str| order.iter().position(|n| n == id).unwrap();
    assert!(position("salary") < position("taxes"));
    assert!(position("freelance") < position("taxes"));
    assert!(position("taxes") < position("credit_score"));
    assert!(position("debt_payments") < position("credit_score"));
    assert!(position("credit_score") < position("bankruptcy"));
}

#[test]
fn test_unconstrained_nodes_keep_insertion_order() {
    let mut graph = comprehensive_graph();
    let order = graph.resolve_order().unwrap();

    // salary, freelance, rent, debt_payments share no ordering constraints:
    // they must appear in the order they were added.
    let free: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|id| matches!(*id, "salary" | "freelance" | "rent" | "debt_payments"))
        .collect();
    assert_eq!(free, vec!["salary", "freelance", "rent", "debt_payments"]);
}

#[test]
fn test_resolution_is_stable_across_calls() {
    let mut graph = comprehensive_graph();
    let first = graph.resolve_order().unwrap();
    let second = graph.resolve_order().unwrap();
    assert_eq!(first, second);

    // An identical construction sequence resolves identically.
    let mut rebuilt = comprehensive_graph();
    assert_eq!(rebuilt.resolve_order().unwrap(), first);
}

#[test]
fn test_duplicate_node_fails_fast() {
    let mut graph = DependencyGraph::new();
    graph.add_node(fixed("rent")).unwrap();
    assert_eq!(
        graph.add_node(fixed("rent")).unwrap_err(),
        GraphError::DuplicateNode("rent".to_string())
    );
}

#[test]
fn test_edge_to_unknown_node_fails_fast() {
    let mut graph = DependencyGraph::new();
    graph.add_node(fixed("rent")).unwrap();
    assert_eq!(
        graph.add_edge("ghost", "rent").unwrap_err(),
        GraphError::UnknownNode("ghost".to_string())
    );
}

#[test]
fn test_missing_declared_dependency_caught_at_resolution() {
    let mut graph = DependencyGraph::new();
    graph
        .add_node(fixed("tax").with_dependencies(vec!["income".to_string()]))
        .unwrap();

    assert_eq!(
        graph.resolve_order().unwrap_err(),
        GraphError::UnknownNode("income".to_string())
    );

    // Adding the missing node afterwards repairs resolution.
    graph.add_node(fixed("income")).unwrap();
    let order = graph.resolve_order().unwrap();
    assert_eq!(order, vec!["income", "tax"]);
}

#[test]
fn test_two_node_cycle_raises_named_cycle() {
    let mut graph = DependencyGraph::new();
    graph.add_node(fixed("a")).unwrap();
    graph.add_node(fixed("b")).unwrap();
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", "a").unwrap();

    match graph.resolve_order().unwrap_err() {
        GraphError::Cycle(cycle) => {
            assert_eq!(cycle.len(), 2);
            assert!(cycle.contains(&"a".to_string()) && cycle.contains(&"b".to_string()));
        }
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn test_longer_cycle_detected_inside_larger_graph() {
    let mut graph = DependencyGraph::new();
    for id in ["a", "b", "c", "d", "e"] {
        graph.add_node(fixed(id)).unwrap();
    }
    // a → b → c → a cycle; d and e dangle off it.
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", "c").unwrap();
    graph.add_edge("c", "a").unwrap();
    graph.add_edge("c", "d").unwrap();
    graph.add_edge("d", "e").unwrap();

    match graph.resolve_order().unwrap_err() {
        GraphError::Cycle(cycle) => {
            assert_eq!(cycle.len(), 3);
            for id in ["a", "b", "c"] {
                assert!(cycle.contains(&id.to_string()), "cycle missing {}", id);
            }
            // Downstream nodes are not part of the reported cycle.
            assert!(!cycle.contains(&"d".to_string()));
            assert!(!cycle.contains(&"e".to_string()));
        }
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn test_breaking_a_cycle_restores_resolution() {
    let mut graph = DependencyGraph::new();
    graph.add_node(fixed("a")).unwrap();
    graph.add_node(fixed("b")).unwrap();
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", "a").unwrap();

    assert!(matches!(graph.resolve_order(), Err(GraphError::Cycle(_))));

    assert!(graph.remove_edge("b", "a"));
    assert_eq!(graph.resolve_order().unwrap(), vec!["a", "b"]);
}
