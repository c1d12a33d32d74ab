//! Goal and task management.
//!
//! Goals form a hierarchy via parent links; tasks belong to goals and may
//! depend on other tasks. Dependency resolution is a depth-first
//! topological sort that reports cycles instead of looping. Progress over
//! a goal is derived from its tasks on every call, never cached.

use std::collections::HashMap;
use std::sync::Mutex;

use switchboard_core::{
    Goal, GoalError, GoalId, ProgressInfo, SwitchboardResult, Task, TaskId, WorkStatus,
};

#[derive(Debug, Default)]
struct GoalState {
    goals: HashMap<GoalId, Goal>,
    tasks: HashMap<TaskId, Task>,
}

/// In-memory goal and task manager.
#[derive(Debug, Default)]
pub struct GoalManager {
    state: Mutex<GoalState>,
}

impl GoalManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // goals
    // ------------------------------------------------------------------

    /// Store a new goal after validating it.
    pub fn create_goal(&self, goal: Goal) -> SwitchboardResult<Goal> {
        Self::validate_goal(&goal)?;
        let mut state = self.lock()?;
        if let Some(parent_id) = goal.parent_goal_id {
            if !state.goals.contains_key(&parent_id) {
                return Err(GoalError::ParentGoalNotFound { goal_id: parent_id }.into());
            }
        }
        state.goals.insert(goal.goal_id, goal.clone());
        tracing::debug!(goal_id = %goal.goal_id, title = %goal.title, "goal created");
        Ok(goal)
    }

    /// Replace an existing goal after validating the replacement.
    pub fn update_goal(&self, goal: Goal) -> SwitchboardResult<Goal> {
        Self::validate_goal(&goal)?;
        let mut state = self.lock()?;
        if !state.goals.contains_key(&goal.goal_id) {
            return Err(GoalError::GoalNotFound {
                goal_id: goal.goal_id,
            }
            .into());
        }
        if let Some(parent_id) = goal.parent_goal_id {
            if parent_id == goal.goal_id || !state.goals.contains_key(&parent_id) {
                return Err(GoalError::ParentGoalNotFound { goal_id: parent_id }.into());
            }
        }
        state.goals.insert(goal.goal_id, goal.clone());
        Ok(goal)
    }

    /// Cloned goal, if it exists.
    pub fn get_goal(&self, goal_id: GoalId) -> SwitchboardResult<Option<Goal>> {
        let state = self.lock()?;
        Ok(state.goals.get(&goal_id).cloned())
    }

    /// Delete a goal and every task under it. Returns the number of
    /// removed tasks.
    pub fn delete_goal(&self, goal_id: GoalId) -> SwitchboardResult<usize> {
        let mut state = self.lock()?;
        if state.goals.remove(&goal_id).is_none() {
            return Err(GoalError::GoalNotFound { goal_id }.into());
        }
        let before = state.tasks.len();
        state.tasks.retain(|_, task| task.goal_id != goal_id);
        let removed = before - state.tasks.len();
        tracing::debug!(%goal_id, removed_tasks = removed, "goal deleted");
        Ok(removed)
    }

    /// Goals not yet in a terminal status.
    pub fn active_goals(&self) -> SwitchboardResult<Vec<Goal>> {
        let state = self.lock()?;
        Ok(state
            .goals
            .values()
            .filter(|g| !g.status.is_terminal())
            .cloned()
            .collect())
    }

    /// Direct children of a goal.
    pub fn child_goals(&self, parent_id: GoalId) -> SwitchboardResult<Vec<Goal>> {
        let state = self.lock()?;
        Ok(state
            .goals
            .values()
            .filter(|g| g.parent_goal_id == Some(parent_id))
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // tasks
    // ------------------------------------------------------------------

    /// Store a new task after validating it against existing state.
    pub fn create_task(&self, task: Task) -> SwitchboardResult<Task> {
        Self::validate_task(&task)?;
        let mut state = self.lock()?;
        if !state.goals.contains_key(&task.goal_id) {
            return Err(GoalError::GoalNotFound {
                goal_id: task.goal_id,
            }
            .into());
        }
        for dep in &task.dependencies {
            if !state.tasks.contains_key(dep) {
                return Err(GoalError::DependencyNotFound { task_id: *dep }.into());
            }
        }
        state.tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    /// Cloned task, if it exists.
    pub fn get_task(&self, task_id: TaskId) -> SwitchboardResult<Option<Task>> {
        let state = self.lock()?;
        Ok(state.tasks.get(&task_id).cloned())
    }

    /// Replace an existing task after validating the replacement.
    pub fn update_task(&self, task: Task) -> SwitchboardResult<Task> {
        Self::validate_task(&task)?;
        let mut state = self.lock()?;
        if !state.tasks.contains_key(&task.task_id) {
            return Err(GoalError::TaskNotFound {
                task_id: task.task_id,
            }
            .into());
        }
        for dep in &task.dependencies {
            if !state.tasks.contains_key(dep) {
                return Err(GoalError::DependencyNotFound { task_id: *dep }.into());
            }
        }
        state.tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    /// Hand a task to an agent, returning the updated task.
    pub fn assign_task(&self, task_id: TaskId, agent_id: &str) -> SwitchboardResult<Task> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(GoalError::TaskNotFound { task_id })?;
        task.assigned_agent = Some(agent_id.to_string());
        Ok(task.clone())
    }

    /// Tasks under a goal.
    pub fn goal_tasks(&self, goal_id: GoalId) -> SwitchboardResult<Vec<Task>> {
        let state = self.lock()?;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.goal_id == goal_id)
            .cloned()
            .collect())
    }

    /// Tasks assigned to an agent.
    pub fn agent_tasks(&self, agent_id: &str) -> SwitchboardResult<Vec<Task>> {
        let state = self.lock()?;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.assigned_agent.as_deref() == Some(agent_id))
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // dependency resolution
    // ------------------------------------------------------------------

    /// Execution order for a task and its transitive dependencies.
    ///
    /// Depth-first post-order: every dependency appears before its
    /// dependents and the requested task comes last. A dependency cycle
    /// is reported with the tasks on the offending path.
    pub fn resolve_dependencies(&self, task_id: TaskId) -> SwitchboardResult<Vec<TaskId>> {
        let state = self.lock()?;
        if !state.tasks.contains_key(&task_id) {
            return Err(GoalError::TaskNotFound { task_id }.into());
        }

        let mut order = Vec::new();
        let mut colors: HashMap<TaskId, Color> = HashMap::new();
        // explicit stack of (task, next dependency index), so arbitrarily
        // deep chains cannot overflow the call stack
        let mut stack: Vec<(TaskId, usize)> = vec![(task_id, 0)];
        colors.insert(task_id, Color::Grey);

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let next_dep = state
                .tasks
                .get(&current)
                .and_then(|t| t.dependencies.get(frame.1).copied());

            match next_dep {
                Some(dep) => {
                    frame.1 += 1;
                    match colors.get(&dep) {
                        Some(Color::Black) => {}
                        Some(Color::Grey) => {
                            let mut cycle: Vec<TaskId> =
                                stack.iter().map(|(id, _)| *id).collect();
                            cycle.push(dep);
                            return Err(GoalError::CircularDependency { task_ids: cycle }.into());
                        }
                        None => {
                            colors.insert(dep, Color::Grey);
                            stack.push((dep, 0));
                        }
                    }
                }
                None => {
                    stack.pop();
                    colors.insert(current, Color::Black);
                    order.push(current);
                }
            }
        }
        Ok(order)
    }

    // ------------------------------------------------------------------
    // progress
    // ------------------------------------------------------------------

    /// Derived progress over a goal's tasks.
    pub fn progress(&self, goal_id: GoalId) -> SwitchboardResult<ProgressInfo> {
        let state = self.lock()?;
        if !state.goals.contains_key(&goal_id) {
            return Err(GoalError::GoalNotFound { goal_id }.into());
        }

        let mut info = ProgressInfo {
            goal_id,
            total_tasks: 0,
            completed_tasks: 0,
            in_progress_tasks: 0,
            blocked_tasks: 0,
            percent_complete: 0.0,
            completed_task_ids: Vec::new(),
            blocked_task_ids: Vec::new(),
        };

        for task in state.tasks.values().filter(|t| t.goal_id == goal_id) {
            info.total_tasks += 1;
            match task.status {
                WorkStatus::Completed => {
                    info.completed_tasks += 1;
                    info.completed_task_ids.push(task.task_id);
                }
                WorkStatus::InProgress => info.in_progress_tasks += 1,
                WorkStatus::Blocked => {
                    info.blocked_tasks += 1;
                    info.blocked_task_ids.push(task.task_id);
                }
                _ => {}
            }
        }

        if info.total_tasks > 0 {
            let raw = info.completed_tasks as f64 / info.total_tasks as f64 * 100.0;
            info.percent_complete = (raw * 100.0).round() / 100.0;
        }
        Ok(info)
    }

    /// Advance a goal's status from a percentage.
    ///
    /// Zero leaves the goal as it is. Anything in (0, 100) moves it to
    /// in-progress, stamping `started_at` on the first transition only.
    /// Exactly 100 completes it.
    pub fn update_progress(&self, goal_id: GoalId, percent: f64) -> SwitchboardResult<Goal> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(GoalError::InvalidProgress { value: percent }.into());
        }
        let mut state = self.lock()?;
        let goal = state
            .goals
            .get_mut(&goal_id)
            .ok_or(GoalError::GoalNotFound { goal_id })?;

        if percent >= 100.0 {
            goal.complete();
        } else if percent > 0.0 {
            goal.start();
        }
        Ok(goal.clone())
    }

    /// Break a goal into one pending task per title, returned in order.
    ///
    /// A pending goal moves to planned.
    pub fn decompose_goal(
        &self,
        goal_id: GoalId,
        titles: &[String],
    ) -> SwitchboardResult<Vec<Task>> {
        for title in titles {
            if title.trim().is_empty() {
                return Err(GoalError::EmptyTitle { entity: "task" }.into());
            }
        }
        let mut state = self.lock()?;
        let goal = state
            .goals
            .get_mut(&goal_id)
            .ok_or(GoalError::GoalNotFound { goal_id })?;
        if goal.status == WorkStatus::Pending {
            goal.status = WorkStatus::Planned;
        }

        let mut created = Vec::with_capacity(titles.len());
        for title in titles {
            let task = Task::new(goal_id, title.clone(), String::new());
            state.tasks.insert(task.task_id, task.clone());
            created.push(task);
        }
        Ok(created)
    }

    // ------------------------------------------------------------------
    // validation
    // ------------------------------------------------------------------

    fn validate_goal(goal: &Goal) -> Result<(), GoalError> {
        if goal.title.trim().is_empty() {
            return Err(GoalError::EmptyTitle { entity: "goal" });
        }
        if goal.priority > 100 {
            return Err(GoalError::InvalidPriority {
                value: goal.priority,
            });
        }
        Ok(())
    }

    fn validate_task(task: &Task) -> Result<(), GoalError> {
        if task.title.trim().is_empty() {
            return Err(GoalError::EmptyTitle { entity: "task" });
        }
        for effort in [task.estimated_effort, task.actual_effort].into_iter().flatten() {
            if effort < 0.0 || !effort.is_finite() {
                return Err(GoalError::NegativeEffort { value: effort });
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, GoalState>, GoalError> {
        self.state.lock().map_err(|_| GoalError::LockPoisoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// For a linear dependency chain the resolved order is exactly
        /// the chain, front to back.
        #[test]
        fn linear_chain_resolves_in_order(len in 1usize..15) {
            let manager = GoalManager::new();
            let goal = manager.create_goal(Goal::new("g", "")).unwrap();

            let mut ids = Vec::new();
            for i in 0..len {
                let mut task = Task::new(goal.goal_id, format!("t{i}"), String::new());
                if let Some(prev) = ids.last() {
                    task = task.with_dependency(*prev);
                }
                ids.push(manager.create_task(task).unwrap().task_id);
            }

            let last = *ids.last().unwrap();
            let order = manager.resolve_dependencies(last).unwrap();
            prop_assert_eq!(order, ids);
        }

        /// Percent complete always lands in [0, 100] and matches the
        /// completed/total ratio to two decimals.
        #[test]
        fn percent_matches_ratio(total in 1usize..20, completed_count in 0usize..20) {
            let completed_count = completed_count.min(total);
            let manager = GoalManager::new();
            let goal = manager.create_goal(Goal::new("g", "")).unwrap();

            for i in 0..total {
                let task = manager
                    .create_task(Task::new(goal.goal_id, format!("t{i}"), String::new()))
                    .unwrap();
                if i < completed_count {
                    let mut done = task;
                    done.complete();
                    manager.update_task(done).unwrap();
                }
            }

            let info = manager.progress(goal.goal_id).unwrap();
            let expected = (completed_count as f64 / total as f64 * 10000.0).round() / 100.0;
            prop_assert!((0.0..=100.0).contains(&info.percent_complete));
            prop_assert_eq!(info.percent_complete, expected);
        }
    }
}
