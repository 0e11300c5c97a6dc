use crate::task_book::TaskBook;
use crate::task_queue::AgentQueue;
use crate::types::{AgentDescriptor, AgentSummary, TaskId, TaskRecord};
use conductor_core::{AgentCapability, ConductorError, ConductorResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// A registered agent: descriptor, its queue, and the capability that runs it.
pub struct AgentEntry {
    pub descriptor: AgentDescriptor,
    pub queue: Arc<AgentQueue>,
    pub capability: Arc<dyn AgentCapability>,
}

/// Descriptor fields that `search` can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Description,
    Tags,
    Capabilities,
}

impl SearchField {
    /// Fields searched when the caller names none.
    pub const DEFAULT: [SearchField; 4] = [
        SearchField::Name,
        SearchField::Description,
        SearchField::Tags,
        SearchField::Capabilities,
    ];

    pub fn parse(field: &str) -> ConductorResult<Self> {
        match field.trim().to_lowercase().as_str() {
            "name" => Ok(SearchField::Name),
            "description" => Ok(SearchField::Description),
            "tags" => Ok(SearchField::Tags),
            "capabilities" => Ok(SearchField::Capabilities),
            _ => Err(ConductorError::InvalidField(field.to_string())),
        }
    }

    fn matches(self, desc: &AgentDescriptor, needle: &str) -> bool {
        let hit = |s: &String| s.to_lowercase().contains(needle);
        match self {
            SearchField::Name => hit(&desc.name),
            SearchField::Description => hit(&desc.description),
            SearchField::Tags => desc.tags.iter().any(hit),
            SearchField::Capabilities => desc.capabilities.iter().any(hit),
        }
    }
}

/// Outcome of one entry of a batch registration.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub name: String,
    pub result: ConductorResult<()>,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<Arc<AgentEntry>>,
    by_name: HashMap<String, Arc<AgentEntry>>,
}

/// Owns every registered agent and its queue, keyed by name.
///
/// Built at startup, populated by `register`, and read-only in steady state.
/// Reads take a shared lock; registration takes the exclusive lock for the
/// insert only.
pub struct AgentRegistry {
    inner: RwLock<RegistryInner>,
    book: Arc<TaskBook>,
    reserved: HashSet<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::with_task_book(Arc::new(TaskBook::new()))
    }

    pub fn with_task_book(book: Arc<TaskBook>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            book,
            reserved: HashSet::new(),
        }
    }

    /// Names no agent may take (e.g. management tool names sharing the
    /// tool namespace).
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Register one agent and create its empty queue.
    pub fn register(
        &self,
        descriptor: AgentDescriptor,
        capability: Arc<dyn AgentCapability>,
    ) -> ConductorResult<()> {
        descriptor.validate()?;
        if self.reserved.contains(&descriptor.name) {
            return Err(ConductorError::DuplicateAgent(descriptor.name));
        }

        let mut inner = self.inner.write();
        if inner.by_name.contains_key(&descriptor.name) {
            warn!(agent = %descriptor.name, "Rejected duplicate agent registration");
            return Err(ConductorError::DuplicateAgent(descriptor.name));
        }

        let queue = Arc::new(AgentQueue::new(&descriptor, self.book.clone()));
        let name = descriptor.name.clone();
        let entry = Arc::new(AgentEntry {
            descriptor,
            queue,
            capability,
        });
        inner.order.push(entry.clone());
        inner.by_name.insert(name.clone(), entry);
        info!(
            agent = %name,
            total = inner.order.len(),
            "Registered agent"
        );
        Ok(())
    }

    /// Register several agents; each entry succeeds or fails on its own.
    pub fn register_batch(
        &self,
        agents: Vec<(AgentDescriptor, Arc<dyn AgentCapability>)>,
    ) -> Vec<RegistrationOutcome> {
        agents
            .into_iter()
            .map(|(descriptor, capability)| {
                let name = descriptor.name.clone();
                let result = self.register(descriptor, capability);
                RegistrationOutcome { name, result }
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> ConductorResult<AgentDescriptor> {
        self.entry(name).map(|e| e.descriptor.clone())
    }

    pub fn entry(&self, name: &str) -> ConductorResult<Arc<AgentEntry>> {
        self.inner
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ConductorError::UnknownAgent(name.to_string()))
    }

    pub fn queue(&self, name: &str) -> ConductorResult<Arc<AgentQueue>> {
        self.entry(name).map(|e| e.queue.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> Vec<Arc<AgentEntry>> {
        self.inner.read().order.clone()
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> Vec<AgentDescriptor> {
        self.inner
            .read()
            .order
            .iter()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .order
            .iter()
            .map(|e| e.descriptor.name.clone())
            .collect()
    }

    /// Metadata-only view used for capability-based client selection.
    pub fn discover(&self) -> Vec<AgentSummary> {
        self.inner
            .read()
            .order
            .iter()
            .map(|e| e.descriptor.summary())
            .collect()
    }

    /// Case-insensitive substring search over the given fields.
    ///
    /// Results are ranked by how many fields matched, ties in registration
    /// order. An empty query matches every agent.
    pub fn search(
        &self,
        query: &str,
        fields: Option<&[String]>,
    ) -> ConductorResult<Vec<AgentDescriptor>> {
        let fields: Vec<SearchField> = match fields {
            Some(names) if !names.is_empty() => names
                .iter()
                .map(|f| SearchField::parse(f))
                .collect::<ConductorResult<_>>()?,
            _ => SearchField::DEFAULT.to_vec(),
        };
        let needle = query.trim().to_lowercase();

        let inner = self.inner.read();
        let mut scored: Vec<(usize, usize, &AgentDescriptor)> = inner
            .order
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let desc = &entry.descriptor;
                let score = fields.iter().filter(|f| f.matches(desc, &needle)).count();
                (score > 0).then_some((score, idx, desc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored.into_iter().map(|(_, _, d)| d.clone()).collect())
    }

    pub fn task_book(&self) -> &Arc<TaskBook> {
        &self.book
    }

    /// Status snapshot of any task submitted through this registry.
    pub fn task(&self, id: TaskId) -> ConductorResult<TaskRecord> {
        self.book.get(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
