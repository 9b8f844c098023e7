//! Transition logic of the execution state machine.
//!
//! The machine has one state per executable node plus the `Start` and `End`
//! sentinels. Entry and exit nodes of the graph map onto the sentinels and
//! never run a processor.
//!
//! ```text
//! Start → classifier → enricher ─┬→ specialist ─┐
//!                                ├→ specialist ─┼→ validator → formatter → End
//!                                └→ specialist ─┘      │
//!              ↑                                       │ confidence < threshold
//!              └───────────────────────────────────────┘
//! ```
//!
//! [`WorkflowRoles::resolve`] checks the graph once, up front, so a
//! malformed workflow is rejected before any request runs.

use crate::error::{ExecutionError, Result};
use crate::routing::{GateDecision, IntentRouter, QualityGate};
use crate::state::ExecutionState;
use flowlens_core::{NodeId, NodeKind, WorkflowGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The nodes playing each role in an executable workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRoles {
    /// Entry node, mapped to `Start`
    pub entry: NodeId,
    /// Intent classifier
    pub classifier: NodeId,
    /// Context enricher
    pub enricher: NodeId,
    /// Specialists the router may choose from
    pub specialists: Vec<NodeId>,
    /// Response validator
    pub validator: NodeId,
    /// Response formatter
    pub formatter: NodeId,
    /// Exit node, mapped to `End`
    pub exit: NodeId,
    /// Whether the graph has a validator → classifier edge
    pub retry_enabled: bool,
}

impl WorkflowRoles {
    /// Finds every role in the graph and checks the unconditional edges.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Graph`] if there is not exactly one entry and exit
    /// - [`ExecutionError::MalformedWorkflow`] if a role is missing or
    ///   duplicated, or a required edge is absent
    pub fn resolve(graph: &WorkflowGraph) -> Result<Self> {
        let entry = graph.entry()?.clone();
        let exit = graph.exit()?.clone();
        let classifier = single_of_kind(graph, NodeKind::Classifier)?;
        let enricher = single_of_kind(graph, NodeKind::Enricher)?;
        let validator = single_of_kind(graph, NodeKind::Validator)?;
        let formatter = single_of_kind(graph, NodeKind::Formatter)?;

        let specialists: Vec<NodeId> = graph
            .nodes_of_kind(NodeKind::Specialist)
            .into_iter()
            .cloned()
            .collect();
        if specialists.is_empty() {
            return Err(ExecutionError::MalformedWorkflow(
                "workflow has no specialist nodes".to_string(),
            ));
        }

        require_edge(graph, &entry, &classifier)?;
        require_edge(graph, &classifier, &enricher)?;
        for specialist in &specialists {
            require_edge(graph, specialist, &validator)?;
        }
        require_edge(graph, &validator, &formatter)?;
        require_edge(graph, &formatter, &exit)?;

        let retry_enabled = graph.has_edge(&validator, &classifier);
        debug!(
            classifier = %classifier,
            specialists = specialists.len(),
            retry_enabled,
            "Resolved workflow roles"
        );

        Ok(Self {
            entry,
            classifier,
            enricher,
            specialists,
            validator,
            formatter,
            exit,
            retry_enabled,
        })
    }
}

fn single_of_kind(graph: &WorkflowGraph, kind: NodeKind) -> Result<NodeId> {
    match graph.nodes_of_kind(kind).as_slice() {
        [node] => Ok((*node).clone()),
        [] => Err(ExecutionError::MalformedWorkflow(format!(
            "workflow has no {} node",
            kind.as_str()
        ))),
        nodes => Err(ExecutionError::MalformedWorkflow(format!(
            "workflow has {} {} nodes, expected one",
            nodes.len(),
            kind.as_str()
        ))),
    }
}

fn require_edge(graph: &WorkflowGraph, source: &NodeId, target: &NodeId) -> Result<()> {
    if graph.has_edge(source, target) {
        Ok(())
    } else {
        Err(ExecutionError::MalformedWorkflow(format!(
            "missing edge {} -> {}",
            source, target
        )))
    }
}

/// Position of an execution in the state machine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Before the first node
    Start,
    /// About to run the node
    Node(NodeId),
    /// Finished
    End,
}

/// Transition function over [`Stage`]s.
#[derive(Clone, Debug)]
pub struct StateMachine {
    roles: WorkflowRoles,
    gate: QualityGate,
    max_retries: u32,
}

impl StateMachine {
    /// Creates a machine for resolved roles.
    pub fn new(roles: WorkflowRoles, gate: QualityGate, max_retries: u32) -> Self {
        Self {
            roles,
            gate,
            max_retries,
        }
    }

    /// The resolved roles.
    pub fn roles(&self) -> &WorkflowRoles {
        &self.roles
    }

    /// Retries allowed before the execution fails.
    ///
    /// Zero when the graph has no retry edge, whatever the configuration.
    pub fn effective_max_retries(&self) -> u32 {
        if self.roles.retry_enabled {
            self.max_retries
        } else {
            0
        }
    }

    /// Computes the stage after `current`.
    ///
    /// Taking the retry transition increments the state's retry count.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Routing`] if the router has no valid specialist
    /// - [`ExecutionError::RetryLimitExceeded`] if the validator rejects the
    ///   response after the retry bound is used up
    pub fn next(
        &self,
        current: &Stage,
        state: &mut ExecutionState,
        graph: &WorkflowGraph,
        router: &dyn IntentRouter,
    ) -> Result<Stage> {
        let node = match current {
            Stage::Start => return Ok(Stage::Node(self.roles.classifier.clone())),
            Stage::End => return Ok(Stage::End),
            Stage::Node(node) => node,
        };

        let roles = &self.roles;
        if *node == roles.classifier {
            Ok(Stage::Node(roles.enricher.clone()))
        } else if *node == roles.enricher {
            self.route(state, graph, router).map(Stage::Node)
        } else if roles.specialists.contains(node) {
            Ok(Stage::Node(roles.validator.clone()))
        } else if *node == roles.validator {
            self.after_validation(state)
        } else if *node == roles.formatter {
            Ok(Stage::End)
        } else {
            Err(ExecutionError::MalformedWorkflow(format!(
                "node '{}' has no transition",
                node
            )))
        }
    }

    fn route(
        &self,
        state: &ExecutionState,
        graph: &WorkflowGraph,
        router: &dyn IntentRouter,
    ) -> Result<NodeId> {
        let target = router.route(state).ok_or_else(|| {
            ExecutionError::Routing(format!("no specialist for intent {:?}", state.intent))
        })?;

        let kind = match graph.node_attr(&target) {
            Ok(attrs) => attrs.kind,
            Err(_) => {
                return Err(ExecutionError::Routing(format!(
                    "routed to unknown node '{}'",
                    target
                )))
            }
        };
        if kind != NodeKind::Specialist {
            return Err(ExecutionError::Routing(format!(
                "routed to '{}', which is a {} node",
                target,
                kind.as_str()
            )));
        }
        if !graph.has_edge(&self.roles.enricher, &target) {
            return Err(ExecutionError::Routing(format!(
                "no edge {} -> {}",
                self.roles.enricher, target
            )));
        }

        debug!(intent = ?state.intent, target = %target, "Routed request");
        Ok(target)
    }

    fn after_validation(&self, state: &mut ExecutionState) -> Result<Stage> {
        match self.gate.decide(state) {
            GateDecision::Accept => Ok(Stage::Node(self.roles.formatter.clone())),
            GateDecision::Retry => {
                if state.retry_count() >= self.effective_max_retries() {
                    return Err(ExecutionError::RetryLimitExceeded {
                        retries: state.retry_count(),
                        path: state.path_taken().to_vec(),
                    });
                }
                state.record_retry();
                warn!(
                    confidence = state.confidence,
                    threshold = self.gate.threshold(),
                    retry = state.retry_count(),
                    "Low confidence, retrying from classifier"
                );
                Ok(Stage::Node(self.roles.classifier.clone()))
            }
        }
    }
}
