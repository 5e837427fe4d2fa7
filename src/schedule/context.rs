// src/schedule/context.rs

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::ProjectSettings;
use crate::errors::{GogoError, Result};
use crate::fs::FileSystem;
use crate::gadget::{Gadget, JobSpec, LaunchGate};
use crate::grid::JobOutcome;
use crate::staleness::StalenessChecker;
use crate::types::Phase;
use crate::vars::Vars;

/// Index of a gadget in the registry, in registration order.
pub type GadgetId = usize;

#[derive(Debug)]
struct Slot {
    name: String,
    phase: Phase,
    /// Empty while the gadget is lent out to one of its own callbacks.
    gadget: Option<Box<dyn Gadget>>,
}

/// Everything one orchestration run shares: the filesystem, variables,
/// project settings, the staleness session and the gadget registry.
///
/// The registry is append-only. Each phase has a work queue; the scheduler
/// drains a phase's queue until it stays empty, so gadgets registered while
/// their own phase is being swept still run. Registering into a phase that
/// has already been swept is rejected with [`GogoError::PhaseClosed`].
#[derive(Debug)]
pub struct SchedulerContext {
    fs: Arc<dyn FileSystem>,
    vars: Vars,
    project: ProjectSettings,
    checker: StalenessChecker,

    registry: Vec<Slot>,
    by_name: HashMap<String, GadgetId>,
    queues: BTreeMap<Phase, VecDeque<GadgetId>>,

    /// `check_dependencies` answers, computed once per run.
    checked: HashMap<GadgetId, bool>,
    /// Gadgets whose job completed successfully.
    finished: HashSet<GadgetId>,

    current: Option<Phase>,
}

impl SchedulerContext {
    pub fn new(fs: Arc<dyn FileSystem>, vars: Vars, project: ProjectSettings) -> Self {
        Self {
            checker: StalenessChecker::new(Arc::clone(&fs)),
            fs,
            vars,
            project,
            registry: Vec::new(),
            by_name: HashMap::new(),
            queues: BTreeMap::new(),
            checked: HashMap::new(),
            finished: HashSet::new(),
            current: None,
        }
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn project(&self) -> &ProjectSettings {
        &self.project
    }

    pub fn checker(&mut self) -> &mut StalenessChecker {
        &mut self.checker
    }

    /// Expand `${NAME}` references in a path and resolve it against the
    /// project root.
    pub fn expand_path(&self, path: &Path) -> Result<PathBuf> {
        let expanded = self.vars.expand(&path.to_string_lossy())?;
        Ok(self.project.resolve(expanded))
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Register a gadget and queue it for its phase.
    pub fn add_gadget(&mut self, gadget: Box<dyn Gadget>) -> Result<GadgetId> {
        let name = gadget.name().to_string();
        let phase = gadget.phase();

        if self.by_name.contains_key(&name) {
            return Err(GogoError::ConfigError(format!(
                "a gadget named '{name}' is already registered"
            )));
        }
        if let Some(current) = self.current {
            if phase < current {
                return Err(GogoError::PhaseClosed {
                    gadget: name,
                    phase,
                    current,
                });
            }
        }

        let id = self.registry.len();
        debug!(gadget = %name, phase = %phase, id, "registering gadget");
        self.registry.push(Slot {
            name: name.clone(),
            phase,
            gadget: Some(gadget),
        });
        self.by_name.insert(name, id);
        self.queues.entry(phase).or_default().push_back(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<GadgetId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: GadgetId) -> &str {
        self.registry.get(id).map_or("<unknown>", |s| s.name.as_str())
    }

    pub fn phase_of(&self, id: GadgetId) -> Option<Phase> {
        self.registry.get(id).map(|s| s.phase)
    }

    /// `(name, phase)` of every registered gadget, in registration order.
    pub fn gadgets(&self) -> impl Iterator<Item = (&str, Phase)> + '_ {
        self.registry.iter().map(|s| (s.name.as_str(), s.phase))
    }

    /// The job of a gadget, unless it is currently lent out.
    pub fn job(&self, id: GadgetId) -> Option<&JobSpec> {
        self.registry
            .get(id)
            .and_then(|s| s.gadget.as_deref())
            .map(|g| g.job())
    }

    /// Turds of every registered gadget that is not currently lent out.
    pub fn turds(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.registry
            .iter()
            .filter_map(|s| {
                let gadget = s.gadget.as_deref()?;
                Some((s.name.clone(), gadget.job().turds.clone()))
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Phases and queues
    // ---------------------------------------------------------------------

    pub fn current_phase(&self) -> Option<Phase> {
        self.current
    }

    /// Start sweeping `phase`. Phases only move forward.
    pub fn begin_phase(&mut self, phase: Phase) -> Result<()> {
        if let Some(current) = self.current {
            if phase < current {
                return Err(GogoError::Internal(format!(
                    "cannot go back from phase {current} to {phase}"
                )));
            }
        }
        self.current = Some(phase);
        Ok(())
    }

    /// Take everything queued for `phase`, in registration order.
    pub fn take_queue(&mut self, phase: Phase) -> Vec<GadgetId> {
        self.queues
            .get_mut(&phase)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn has_queued(&self, phase: Phase) -> bool {
        self.queues.get(&phase).is_some_and(|q| !q.is_empty())
    }

    // ---------------------------------------------------------------------
    // Lifecycle calls
    // ---------------------------------------------------------------------

    /// Lend a gadget out to `f` together with the context. The gadget is put
    /// back even if `f` fails.
    fn with_gadget<R>(
        &mut self,
        id: GadgetId,
        f: impl FnOnce(&mut dyn Gadget, &mut Self) -> Result<R>,
    ) -> Result<R> {
        let slot = self
            .registry
            .get_mut(id)
            .ok_or_else(|| GogoError::Internal(format!("no gadget with id {id}")))?;
        let mut gadget = slot.gadget.take().ok_or_else(|| {
            GogoError::Internal(format!("gadget '{}' is already in use", slot.name))
        })?;

        let result = f(gadget.as_mut(), self);
        self.registry[id].gadget = Some(gadget);
        result
    }

    /// Whether a gadget must run. Computed once per run.
    pub fn check(&mut self, id: GadgetId) -> Result<bool> {
        if let Some(answer) = self.checked.get(&id) {
            return Ok(*answer);
        }
        let answer = self.with_gadget(id, |g, ctx| g.check_dependencies(ctx))?;
        trace!(gadget = %self.name_of(id), must_run = answer, "dependency check");
        self.checked.insert(id, answer);
        Ok(answer)
    }

    pub fn check_by_name(&mut self, name: &str) -> Result<bool> {
        let id = self
            .find(name)
            .ok_or_else(|| GogoError::GadgetNotFound(name.to_string()))?;
        self.check(id)
    }

    pub fn prepare(&mut self, id: GadgetId) -> Result<()> {
        self.with_gadget(id, |g, ctx| g.prepare(ctx))
    }

    pub fn pre_launch(&mut self, id: GadgetId) -> Result<LaunchGate> {
        self.with_gadget(id, |g, ctx| g.pre_launch(ctx))
    }

    pub fn completed(&mut self, id: GadgetId, outcome: JobOutcome) -> Result<()> {
        self.with_gadget(id, |g, ctx| g.completed(outcome, ctx))?;
        self.finished.insert(id);
        Ok(())
    }

    /// Whether a gadget's job has completed successfully in this run.
    pub fn is_finished(&self, name: &str) -> bool {
        self.find(name).is_some_and(|id| self.finished.contains(&id))
    }

    // ---------------------------------------------------------------------
    // Done markers
    // ---------------------------------------------------------------------

    pub fn touch_marker(&mut self, path: &Path) -> Result<()> {
        self.fs.touch(path).map_err(|source| GogoError::MarkerIo {
            path: path.to_path_buf(),
            source,
        })?;
        self.checker.invalidate(path);
        debug!(marker = %path.display(), "done marker touched");
        Ok(())
    }

    /// Remove a done marker. Returns false if it was not there.
    pub fn remove_marker(&mut self, path: &Path) -> Result<bool> {
        let removed = self.fs.remove_file(path).map_err(|source| GogoError::MarkerIo {
            path: path.to_path_buf(),
            source,
        })?;
        self.checker.invalidate(path);
        Ok(removed)
    }
}
