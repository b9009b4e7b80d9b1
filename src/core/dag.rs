//! Task DAG (Directed Acyclic Graph) for dependency management.
//!
//! This module provides the TaskDAG structure that represents task dependencies
//! as a directed graph and layers it into phases of mutually independent tasks.

use crate::core::task::{DependencyEdge, Task, TaskId};
use crate::error::{Error, Result};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The task dependency graph.
///
/// Nodes are tasks, and an edge `a -> b` means `b` requires `a`. Cycles are
/// accepted while building and reported by [`TaskDAG::phases`], so a cyclic
/// graph never yields a partial layering.
pub struct TaskDAG {
    /// The underlying directed graph.
    graph: DiGraph<Task, ()>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskDAG {
    /// Create a new empty TaskDAG.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Build a DAG from a task list and its dependency edges.
    ///
    /// Edges declared more than once for the same task are merged.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Two tasks share an id
    /// - An edge names a task or prerequisite that is not in `tasks`
    pub fn build(tasks: Vec<Task>, edges: &[DependencyEdge]) -> Result<Self> {
        let mut dag = Self::new();
        for task in tasks {
            dag.add_task(task)?;
        }
        for edge in edges {
            if !dag.contains_task(&edge.task_id) {
                return Err(Error::Validation(format!(
                    "Dependency declared for unknown task {}",
                    edge.task_id
                )));
            }
            for required in &edge.required_task_ids {
                dag.add_dependency(required, &edge.task_id)?;
            }
        }
        Ok(dag)
    }

    /// Add a task to the DAG.
    ///
    /// # Errors
    /// Returns `DuplicateTask` if a task with the same id is already present.
    pub fn add_task(&mut self, task: Task) -> Result<NodeIndex> {
        if self.task_index.contains_key(&task.id) {
            return Err(Error::DuplicateTask(task.id));
        }

        let id = task.id.clone();
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        Ok(index)
    }

    /// Declare that `dependent` may not start before `prerequisite`.
    ///
    /// # Errors
    /// Returns `UnknownPrerequisite` if `prerequisite` is not in the DAG and a
    /// validation error if `dependent` is not.
    pub fn add_dependency(&mut self, prerequisite: &TaskId, dependent: &TaskId) -> Result<()> {
        let to_index = *self
            .task_index
            .get(dependent)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in DAG", dependent)))?;

        let from_index =
            *self
                .task_index
                .get(prerequisite)
                .ok_or_else(|| Error::UnknownPrerequisite {
                    task: dependent.clone(),
                    prerequisite: prerequisite.clone(),
                })?;

        self.graph.update_edge(from_index, to_index, ());
        Ok(())
    }

    /// Get a reference to a task by its ID.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get the number of tasks in the DAG.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependencies (edges) in the DAG.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the DAG is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check if the DAG contains a task.
    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_index.contains_key(id)
    }

    /// Ids of the tasks that the given task directly requires.
    pub fn prerequisites(&self, id: &TaskId) -> BTreeSet<TaskId> {
        self.task_index
            .get(id)
            .into_iter()
            .flat_map(|&index| self.graph.neighbors_directed(index, Direction::Incoming))
            .filter_map(|neighbor| self.graph.node_weight(neighbor))
            .map(|task| task.id.clone())
            .collect()
    }

    // ========== Scheduling Operations ==========

    /// Get all tasks ready to execute, in insertion order.
    ///
    /// A task is ready if it is not in `placed` and every one of its
    /// prerequisites is.
    pub fn ready_tasks<'a>(&'a self, placed: &HashSet<TaskId>) -> Vec<&'a Task> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let task = self.graph.node_weight(index)?;
                if placed.contains(&task.id) {
                    return None;
                }

                let deps_satisfied = self
                    .graph
                    .neighbors_directed(index, Direction::Incoming)
                    .all(|dep_index| {
                        self.graph
                            .node_weight(dep_index)
                            .map(|dep| placed.contains(&dep.id))
                            .unwrap_or(false)
                    });

                deps_satisfied.then_some(task)
            })
            .collect()
    }

    /// Layer the DAG into phases.
    ///
    /// Phase `n` holds every task whose prerequisites all sit in phases
    /// `0..n`. Tasks keep their insertion order within a phase.
    ///
    /// # Errors
    /// Returns `CircularDependency` naming the tasks that sit on a cycle as
    /// soon as a round places no task while some remain unplaced.
    pub fn phases(&self) -> Result<Vec<Vec<&Task>>> {
        let mut placed: HashSet<TaskId> = HashSet::new();
        let mut phases = Vec::new();

        while placed.len() < self.task_count() {
            let phase = self.ready_tasks(&placed);
            if phase.is_empty() {
                return Err(Error::CircularDependency {
                    tasks: self.cycle_members(),
                });
            }
            placed.extend(phase.iter().map(|task| task.id.clone()));
            phases.push(phase);
        }

        Ok(phases)
    }

    /// Ids of every task that lies on a dependency cycle, sorted.
    pub fn cycle_members(&self) -> Vec<TaskId> {
        let mut members: Vec<TaskId> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self
                        .graph
                        .find_edge(component[0], component[0])
                        .is_some()
            })
            .flatten()
            .filter_map(|index| self.graph.node_weight(index))
            .map(|task| task.id.clone())
            .collect();
        members.sort();
        members
    }
}

impl Default for TaskDAG {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskDAG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDAG")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
