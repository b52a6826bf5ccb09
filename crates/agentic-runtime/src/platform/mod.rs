//! The Platform façade (spec.md §2 C9, §9's expanded design notes):
//! registry of agents/tool-groups; factory of [`AgentProcess`]es; the
//! invocation-helper contract (spec.md §6).
//!
//! Grounded on `mofa-runtime::agent::AgentRegistry`'s
//! `Arc<RwLock<HashMap<_, _>>>`-keyed-registry shape (spec.md §5: "read-mostly
//! shared registries... writes happen at startup... must be safe for
//! concurrent readers"), narrowed from that registry's factory/capability-index
//! machinery down to what this runtime's façade actually needs: name-keyed
//! lookup of immutable [`Agent`] and tool-group values.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agentic_kernel::model::Agent;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::llm::ToolCallbacks;
use crate::process::{AgentProcess, EventBus, ProcessOptions, ProcessRegistry, ProcessStatus};
use crate::DEFAULT_BINDING;

/// A named bundle of tool callbacks an action may request by role name
/// (spec.md §3: `Action::toolGroups`; §5: "the platform-level... tool-group
/// resolver [is] read-mostly").
pub trait ToolGroup: Send + Sync {
    fn name(&self) -> &str;
    fn callbacks(&self) -> ToolCallbacks;
}

/// Errors raised by the platform façade (spec.md §9's supplemental design
/// notes: "Ambiguity (zero or >1 matching agents) is a `PlatformError`, not a
/// panic").
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    #[error("no registered agent has a goal satisfied by type '{0}'")]
    NoAgentProducesType(String),

    #[error("more than one registered agent has a goal satisfied by type '{type_name}': {agents:?}")]
    AmbiguousAgentsProduceType { type_name: String, agents: Vec<String> },

    #[error("process {0:?} did not reach COMPLETED")]
    ProcessDidNotComplete(ProcessStatus),

    #[error("process completed but produced no object of type '{0}' on its blackboard")]
    NoResultProduced(String),

    #[error("no agent registered under the name '{0}'")]
    UnknownAgent(String),
}

/// Registry of agents/tools and factory of processes (spec.md §2 C9).
/// Read-mostly: registration happens once at startup in the common case,
/// but every method takes `&self` and is safe to call from many concurrently
/// running processes, since both maps are `Arc<RwLock<_>>`-backed (spec.md
/// §5).
///
/// The number of processes that may be `run()`ning at once is bounded by an
/// `Arc<Semaphore>` (spec.md §5: "parallel worker pool"), mirroring
/// `mofa-runtime::builder::AgentBuilder::max_concurrent_tasks`'s
/// default-10-with-`with_*`-override shape rather than an unbounded
/// `tokio::spawn` per process.
#[derive(Clone)]
pub struct Platform {
    agents: Arc<RwLock<HashMap<String, Agent>>>,
    tool_groups: Arc<RwLock<HashMap<String, Arc<dyn ToolGroup>>>>,
    registry: ProcessRegistry,
    events: EventBus,
    concurrency: Arc<Semaphore>,
}

/// Default bound on processes `run()`ning at once, mirroring
/// `mofa-runtime::builder::AgentBuilder`'s `max_concurrent_tasks` default.
const DEFAULT_MAX_CONCURRENT_PROCESSES: usize = 10;

impl Platform {
    pub fn new() -> Self {
        Self::with_max_concurrent_processes(DEFAULT_MAX_CONCURRENT_PROCESSES)
    }

    /// Bounds the number of processes this platform will run concurrently
    /// (spec.md §5's "parallel worker pool"). Callers that drive many
    /// processes through [`Platform::invoke`] or `Autonomy`'s entry points
    /// share this single bound.
    pub fn with_max_concurrent_processes(max: usize) -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
            tool_groups: Arc::new(RwLock::new(HashMap::new())),
            registry: ProcessRegistry::new(),
            events: EventBus::new(),
            concurrency: Arc::new(Semaphore::new(max)),
        }
    }

    /// Acquires one slot of the bounded worker pool, released when the
    /// returned permit is dropped. Callers that `run()` a process directly
    /// (rather than through [`Platform::invoke`]) should hold this permit for
    /// the duration of the run, the same pattern `Autonomy`'s entry points
    /// use.
    pub async fn acquire_slot(&self) -> OwnedSemaphorePermit {
        self.concurrency
            .clone()
            .acquire_owned()
            .await
            .expect("platform concurrency semaphore is never closed")
    }

    /// Registers `agent`, replacing any prior registration under the same
    /// name (spec.md §6: `platform.register(agent)`).
    pub fn register(&self, agent: Agent) {
        self.agents
            .write()
            .expect("platform agent registry lock poisoned")
            .insert(agent.name.clone(), agent);
    }

    /// All registered agents (spec.md §6: `platform.agents()`).
    pub fn agents(&self) -> Vec<Agent> {
        self.agents
            .read()
            .expect("platform agent registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn agent(&self, name: &str) -> Option<Agent> {
        self.agents
            .read()
            .expect("platform agent registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Registers a tool group, replacing any prior registration under the
    /// same name (spec.md §6: `platform.register(toolGroup)`).
    pub fn register_tool_group(&self, group: Arc<dyn ToolGroup>) {
        self.tool_groups
            .write()
            .expect("platform tool-group registry lock poisoned")
            .insert(group.name().to_string(), group);
    }

    pub fn tool_group(&self, name: &str) -> Option<Arc<dyn ToolGroup>> {
        self.tool_groups
            .read()
            .expect("platform tool-group registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn process_registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Factory of processes (spec.md §6: `platform.createProcess(agent,
    /// options, initialBindings)`; bindings are attached to `options` via
    /// `ProcessOptions::with_initial_binding` before this is called).
    pub fn create_process(&self, agent: Agent, mut options: ProcessOptions) -> AgentProcess {
        if options.available_tool_groups.is_none() {
            let registered = self
                .tool_groups
                .read()
                .expect("platform tool-group registry lock poisoned")
                .keys()
                .cloned()
                .collect();
            options = options.with_available_tool_groups(registered);
        }
        AgentProcess::new(agent, options, self.registry.clone(), self.events.clone())
    }

    /// Creates a process for the agent registered under `name`.
    pub fn create_process_for(
        &self,
        name: &str,
        options: ProcessOptions,
    ) -> Result<AgentProcess, PlatformError> {
        let agent = self
            .agent(name)
            .ok_or_else(|| PlatformError::UnknownAgent(name.to_string()))?;
        Ok(self.create_process(agent, options))
    }

    /// The invocation-helper contract (spec.md §6): locate the unique
    /// registered agent whose goal's `satisfiedBy` is (the type name of) `T`,
    /// run it with `options` already seeded, and return the last blackboard
    /// object of type `T`.
    pub async fn invoke<T>(&self, options: ProcessOptions) -> Result<T, PlatformError>
    where
        T: Any + Send + Sync + Clone + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let agents = self.agents();
        let mut matching: Vec<Agent> = agents
            .into_iter()
            .filter(|agent| {
                agent
                    .goals()
                    .iter()
                    .any(|g| g.satisfied_by.as_deref() == Some(type_name))
            })
            .collect();

        if matching.is_empty() {
            return Err(PlatformError::NoAgentProducesType(type_name.to_string()));
        }
        if matching.len() > 1 {
            return Err(PlatformError::AmbiguousAgentsProduceType {
                type_name: type_name.to_string(),
                agents: matching.iter().map(|a| a.name.clone()).collect(),
            });
        }

        let agent = matching.remove(0);
        let _permit = self.acquire_slot().await;
        let mut process = self.create_process(agent, options);
        let status = process.run().await;
        if status != ProcessStatus::Completed {
            return Err(PlatformError::ProcessDidNotComplete(status));
        }

        process
            .blackboard()
            .last_of_type::<T>()
            .cloned()
            .ok_or_else(|| PlatformError::NoResultProduced(type_name.to_string()))
    }

    /// Convenience over [`Platform::invoke`] for the common case of one
    /// positional input bound under the default binding name (spec.md §6:
    /// "positional → default binding").
    pub async fn invoke_with_input<T, I>(&self, input: I) -> Result<T, PlatformError>
    where
        T: Any + Send + Sync + Clone + 'static,
        I: Any + Send + Sync + 'static,
    {
        let options = ProcessOptions::new().with_initial_binding(DEFAULT_BINDING, input);
        self.invoke::<T>(options).await
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_kernel::model::{
        ActionBuilder, ActionContext, ActionExecutionError, ActionExecutor, ActionOutcome, Goal,
    };
    use async_trait::async_trait;

    #[derive(Debug, Clone)]
    struct Report(String);

    struct WriteReport;
    #[async_trait]
    impl ActionExecutor for WriteReport {
        async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionExecutionError> {
            ctx.blackboard.append(Report("done".to_string()));
            Ok(ActionOutcome::Appended {
                type_name: "Report",
            })
        }
    }

    fn reporting_agent(name: &str) -> Agent {
        reporting_agent_with_tool_group(name, None)
    }

    fn reporting_agent_with_tool_group(name: &str, tool_group: Option<&str>) -> Agent {
        let mut builder = ActionBuilder::new("write", "write").output_type(std::any::type_name::<Report>());
        if let Some(group) = tool_group {
            builder = builder.tool_group(group);
        }
        let action = builder.build(Arc::new(WriteReport)).unwrap();
        let goal = Goal::new("done", "done").satisfied_by_type(std::any::type_name::<Report>());
        // The goal's `satisfied_by_type` is only honored by the planner's
        // internal search; the process loop's own per-iteration world check
        // needs the matching condition registered explicitly, or it never
        // observes the goal as met once the action has run.
        let report_present: Arc<dyn agentic_kernel::world::Condition> =
            Arc::new(agentic_kernel::world::ObjectOfTypePresent::<Report>::new());
        Agent::new(name, vec![action], vec![report_present], vec![goal])
    }

    #[test]
    fn register_replaces_prior_registration_by_name() {
        let platform = Platform::new();
        platform.register(reporting_agent("a"));
        assert_eq!(platform.agents().len(), 1);
        platform.register(reporting_agent("a"));
        assert_eq!(platform.agents().len(), 1, "same name replaces, does not duplicate");
    }

    #[tokio::test]
    async fn invoke_finds_the_unique_producing_agent_and_returns_its_output() {
        let platform = Platform::new();
        platform.register(reporting_agent("reporter"));

        let report: Report = platform
            .invoke_with_input(crate::autonomy::UserInput("go".to_string()))
            .await
            .unwrap();
        assert_eq!(report.0, "done");
    }

    #[tokio::test]
    async fn invoke_errs_when_no_agent_produces_the_type() {
        let platform = Platform::new();
        let err = platform
            .invoke_with_input::<Report, _>(crate::autonomy::UserInput("go".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::NoAgentProducesType(_)));
    }

    #[tokio::test]
    async fn invoke_errs_when_more_than_one_agent_produces_the_type() {
        let platform = Platform::new();
        platform.register(reporting_agent("one"));
        platform.register(reporting_agent("two"));

        let err = platform
            .invoke_with_input::<Report, _>(crate::autonomy::UserInput("go".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::AmbiguousAgentsProduceType { .. }));
    }

    #[tokio::test]
    async fn acquire_slot_bounds_concurrent_holders() {
        let platform = Platform::with_max_concurrent_processes(1);
        let first = platform.acquire_slot().await;
        assert!(
            platform.concurrency.clone().try_acquire_owned().is_err(),
            "second slot must be unavailable while the first permit is held"
        );
        drop(first);
        assert!(platform.concurrency.clone().try_acquire_owned().is_ok());
    }

    #[tokio::test]
    async fn create_process_excludes_actions_whose_tool_group_is_not_registered() {
        let platform = Platform::new();
        platform.register(reporting_agent_with_tool_group("reporter", Some("search")));

        let err = platform
            .invoke_with_input::<Report, _>(crate::autonomy::UserInput("go".to_string()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, PlatformError::ProcessDidNotComplete(ProcessStatus::Stuck)),
            "the only action needs a tool group the platform never registered: {err:?}"
        );
    }

    #[tokio::test]
    async fn create_process_admits_actions_once_their_tool_group_is_registered() {
        struct Search;
        impl ToolGroup for Search {
            fn name(&self) -> &str {
                "search"
            }
            fn callbacks(&self) -> ToolCallbacks {
                Default::default()
            }
        }

        let platform = Platform::new();
        platform.register_tool_group(Arc::new(Search));
        platform.register(reporting_agent_with_tool_group("reporter", Some("search")));

        let report: Report = platform
            .invoke_with_input(crate::autonomy::UserInput("go".to_string()))
            .await
            .unwrap();
        assert_eq!(report.0, "done");
    }

    #[test]
    fn tool_group_round_trips() {
        struct Empty;
        impl ToolGroup for Empty {
            fn name(&self) -> &str {
                "search"
            }
            fn callbacks(&self) -> ToolCallbacks {
                Default::default()
            }
        }

        let platform = Platform::new();
        assert!(platform.tool_group("search").is_none());
        platform.register_tool_group(Arc::new(Empty));
        assert!(platform.tool_group("search").is_some());
    }
}
