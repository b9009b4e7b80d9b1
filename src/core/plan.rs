//! Execution plans derived from a task DAG.

use crate::core::dag::TaskDAG;
use crate::core::task::{DependencyEdge, Task, TaskId};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deterministic identifier of a plan: its sorted task ids joined by `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn for_tasks(tasks: &[Task]) -> Self {
        let mut ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        Self(ids.join("-"))
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One layer of mutually independent tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub index: usize,
    pub tasks: Vec<Task>,
    /// One record per task in this phase, listing its prerequisites.
    pub dependencies: Vec<DependencyEdge>,
}

/// Ordered phases plus reporting metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: PlanId,
    pub phases: Vec<Phase>,
    pub total_tasks: usize,
    /// Upper bound used for reporting only.
    pub estimated_duration: Duration,
}

impl ExecutionPlan {
    /// Build a plan from tasks and dependency edges.
    ///
    /// `estimate` gives the expected duration of a single task; a phase is
    /// estimated at its slowest task and the plan at the sum of its phases.
    ///
    /// # Errors
    /// Propagates DAG validation errors and `CircularDependency`.
    pub fn build<F>(tasks: Vec<Task>, edges: &[DependencyEdge], estimate: F) -> Result<Self>
    where
        F: Fn(&Task) -> Duration,
    {
        let id = PlanId::for_tasks(&tasks);
        let total_tasks = tasks.len();
        let dag = TaskDAG::build(tasks, edges)?;

        let phases: Vec<Phase> = dag
            .phases()?
            .into_iter()
            .enumerate()
            .map(|(index, layer)| Phase {
                index,
                dependencies: layer
                    .iter()
                    .map(|task| DependencyEdge {
                        task_id: task.id.clone(),
                        required_task_ids: dag.prerequisites(&task.id),
                    })
                    .collect(),
                tasks: layer.into_iter().cloned().collect(),
            })
            .collect();

        let estimated_duration = phases
            .iter()
            .map(|phase| {
                phase
                    .tasks
                    .iter()
                    .map(&estimate)
                    .max()
                    .unwrap_or_default()
            })
            .sum();

        Ok(Self {
            id,
            phases,
            total_tasks,
            estimated_duration,
        })
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tasks == 0
    }

    /// Dependency record for the given task, if it is part of this plan.
    pub fn dependencies_of(&self, id: &TaskId) -> Option<&DependencyEdge> {
        self.phases
            .iter()
            .flat_map(|phase| phase.dependencies.iter())
            .find(|dep| &dep.task_id == id)
    }

    /// All tasks in phase order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|phase| phase.tasks.iter())
    }
}
