use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::types::*;

/// Evaluation order for one graph structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    pub order: Vec<NodeId>,
    /// Set when some nodes could not be ordered; they are left out of `order`.
    pub has_cycle: bool,
}

/// Kahn's algorithm seeded in declaration order. Nodes inside or downstream
/// of a cycle never reach in-degree zero and are excluded.
pub fn topo_order(spec: &GraphSpec) -> Topology {
    let position: HashMap<&str, usize> = spec
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut indeg = vec![0usize; spec.nodes.len()];
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); spec.nodes.len()];

    for wire in &spec.wires {
        let (Some(&from), Some(&to)) = (
            position.get(wire.from.node.as_str()),
            position.get(wire.to.node.as_str()),
        ) else {
            continue;
        };
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut q: VecDeque<usize> = indeg
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(spec.nodes.len());
    while let Some(u) = q.pop_front() {
        order.push(spec.nodes[u].id.clone());
        for &v in &adj[u] {
            indeg[v] -= 1;
            if indeg[v] == 0 {
                q.push_back(v);
            }
        }
    }

    let has_cycle = order.len() < spec.nodes.len();
    Topology { order, has_cycle }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeSpec {
        NodeSpec::new(id, NodeIdentity::named("Number"))
    }

    fn wire(from: &str, to: &str) -> Wire {
        Wire::new(PinRef::new(from, "out"), PinRef::new(to, "in"))
    }

    fn index_of(order: &[NodeId], id: &str) -> usize {
        order.iter().position(|n| n == id).expect("node ordered")
    }

    #[test]
    fn simple_topo() {
        let g = GraphSpec {
            nodes: vec![node("b"), node("a")],
            wires: vec![wire("a", "b")],
        };
        let topo = topo_order(&g);
        assert_eq!(topo.order, vec!["a".to_string(), "b".to_string()]);
        assert!(!topo.has_cycle);
    }

    #[test]
    fn order_respects_every_wire() {
        let g = GraphSpec {
            nodes: vec![node("d"), node("c"), node("b"), node("a"), node("e")],
            wires: vec![
                wire("a", "b"),
                wire("a", "c"),
                wire("b", "d"),
                wire("c", "d"),
                wire("e", "c"),
            ],
        };
        let topo = topo_order(&g);
        assert_eq!(topo.order.len(), 5);
        for w in &g.wires {
            assert!(index_of(&topo.order, &w.from.node) < index_of(&topo.order, &w.to.node));
        }
    }

    #[test]
    fn ties_follow_declaration_order() {
        let g = GraphSpec {
            nodes: vec![node("z"), node("y"), node("x")],
            wires: vec![],
        };
        assert_eq!(topo_order(&g).order, vec!["z", "y", "x"]);
    }

    #[test]
    fn cycle_excludes_members_and_downstream() {
        let g = GraphSpec {
            nodes: vec![node("free"), node("a"), node("b"), node("after"), node("tail")],
            wires: vec![
                wire("a", "b"),
                wire("b", "a"),
                wire("b", "after"),
                wire("free", "tail"),
            ],
        };
        let topo = topo_order(&g);
        assert!(topo.has_cycle);
        assert_eq!(topo.order, vec!["free", "tail"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = GraphSpec {
            nodes: vec![node("a")],
            wires: vec![wire("a", "a")],
        };
        let topo = topo_order(&g);
        assert!(topo.has_cycle);
        assert!(topo.order.is_empty());
    }
}
