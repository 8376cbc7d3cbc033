//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::{SeededRandom, SystemClock, SystemRandom},
    dice::FormulaDiceRoller,
    memory::MemoryStore,
    ports::{
        CharacterRepo, ClockPort, DependencyGraphRepo, DiceRollerPort, RandomPort, RulesetRepo,
        ScriptRepo,
    },
    settings::RuntimeSettings,
};
use crate::reactive::ExecutionTracker;
use crate::stores::DependencyGraphStore;
use crate::use_cases::{self, scripts::RuntimeStateLoader};

/// Main application state.
///
/// Holds the injected ports, the shared runtime stores and every use case.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub tracker: Arc<ExecutionTracker>,
    pub graphs: Arc<DependencyGraphStore>,
    pub settings: RuntimeSettings,
}

/// Container for all repository ports.
#[derive(Clone)]
pub struct Repositories {
    pub scripts: Arc<dyn ScriptRepo>,
    pub ruleset: Arc<dyn RulesetRepo>,
    pub characters: Arc<dyn CharacterRepo>,
    pub graphs: Arc<dyn DependencyGraphRepo>,
}

impl Repositories {
    /// Every port served by one in-memory store.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            scripts: store.clone(),
            ruleset: store.clone(),
            characters: store.clone(),
            graphs: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub scripts: use_cases::ScriptUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(repositories: Repositories, settings: RuntimeSettings) -> Self {
        let clock_port: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random_port: Arc<dyn RandomPort> = match settings.seed {
            Some(seed) => {
                tracing::info!(seed, "Using seeded random source");
                Arc::new(SeededRandom::new(seed))
            }
            None => Arc::new(SystemRandom::new()),
        };
        let dice_port: Arc<dyn DiceRollerPort> =
            Arc::new(FormulaDiceRoller::new(random_port.clone()));

        let loader = Arc::new(
            RuntimeStateLoader::new(
                repositories.scripts.clone(),
                repositories.ruleset.clone(),
                repositories.characters.clone(),
                random_port,
                dice_port,
            )
            .with_max_action_depth(settings.max_action_depth),
        );
        let tracker = Arc::new(ExecutionTracker::new(clock_port));
        let graphs = Arc::new(DependencyGraphStore::new());

        let scripts = use_cases::ScriptUseCases::wire(
            repositories.scripts.clone(),
            repositories.ruleset.clone(),
            repositories.graphs.clone(),
            loader,
            tracker.clone(),
            graphs.clone(),
            settings.limits(),
            settings.halt_on_script_error,
        );

        Self {
            repositories,
            use_cases: UseCases { scripts },
            tracker,
            graphs,
            settings,
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>, settings: RuntimeSettings) -> Self {
        Self::new(Repositories::in_memory(store), settings)
    }
}
