//! The simulation engine: sole owner of the simulation context.
//!
//! EXECUTION ORDER per tick (never reordered):
//!   1. Clock advance      (season / year rollover events)
//!   2. Production subsystem
//!   3. Regeneration subsystem
//!   4. Autosave           (every `autosave_interval` ticks)
//!
//! RULES:
//!   - Every mutation enters through a method on SimEngine; each one runs
//!     to completion before the next.
//!   - All randomness flows through the RngBank or an injected RandomSource.
//!   - Deferred work (the enemy's counter-attack) fires from
//!     `advance_millis`, never from inside another operation.
//!   - Player-facing outcomes are appended to the bounded EventLog.

use crate::{
    combat::{AttackOutcome, CombatResolver, ExploreOutcome},
    command::{CommandReply, PlayerCommand},
    config::SimConfig,
    error::{SimError, SimResult},
    event::{EventLog, LogEntry, SimEvent},
    market::PurchaseReceipt,
    production_subsystem::ProductionSubsystem,
    regeneration_subsystem::RegenerationSubsystem,
    rng::{RandomSource, RngBank, SubsystemSlot},
    scheduler::{DeferredAction, DeferredQueue},
    snapshot::SaveCoordinator,
    store::{KeyValueStore, MemoryStore},
    subsystem::SimSubsystem,
    types::{CostMap, Millis, Tick},
    view::SimView,
    world::SimWorld,
};

pub struct SimEngine {
    pub config:    SimConfig,
    pub world:     SimWorld,
    pub rng_bank:  RngBank,
    combat:        CombatResolver,
    combat_rng:    Box<dyn RandomSource>,
    deferred:      DeferredQueue<DeferredAction>,
    subsystems:    Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    saves:         SaveCoordinator,
    store:         Box<dyn KeyValueStore>,
    log:           EventLog,
    now_ms:        Millis,
    tick_accum_ms: Millis,
}

impl SimEngine {
    pub fn new(config: SimConfig, seed: u64, store: Box<dyn KeyValueStore>) -> Self {
        let rng_bank = RngBank::new(seed);
        Self {
            world:         SimWorld::from_config(&config),
            combat:        CombatResolver::new(&config),
            combat_rng:    Box::new(rng_bank.for_subsystem(SubsystemSlot::Combat)),
            deferred:      DeferredQueue::new(),
            subsystems:    Vec::new(),
            saves:         SaveCoordinator::new(config.save.save_key.clone()),
            store,
            log:           EventLog::new(config.log_capacity),
            now_ms:        0,
            tick_accum_ms: 0,
            rng_bank,
            config,
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: SimConfig, seed: u64, store: Box<dyn KeyValueStore>) -> Self {
        let mut engine = SimEngine::new(config, seed, store);

        // Execution order: production, then regeneration.
        let production = ProductionSubsystem::new(engine.config.calendar.season_modifiers);
        engine.register(SubsystemSlot::Production, Box::new(production));

        let regeneration = RegenerationSubsystem::new(
            engine.config.combat.regen_interval,
            engine.config.combat.regen_amount,
        );
        engine.register(SubsystemSlot::Regeneration, Box::new(regeneration));
        engine
    }

    /// Default catalog, in-memory store.
    pub fn build_test(seed: u64) -> Self {
        Self::build(SimConfig::default(), seed, Box::new(MemoryStore::new()))
    }

    /// Replace the combat roll source (tests script rolls this way).
    pub fn with_random_source(mut self, source: Box<dyn RandomSource>) -> Self {
        self.combat_rng = source;
        self
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    // ── Time ───────────────────────────────────────────────────

    /// Advance one tick. This is the core simulation step.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.world.clock.paused {
            return Err(SimError::ClockPaused);
        }

        let step = self.world.clock.advance();
        let tick = step.tick;
        let mut events = Vec::new();

        if step.season_changed {
            let season_index = self.world.clock.season_index;
            events.push(SimEvent::SeasonChanged {
                tick,
                season_index,
                season: self.season_name(season_index),
            });
        }
        if step.year_changed {
            log::info!("tick={tick} clock: year {} begins", self.world.clock.year);
            events.push(SimEvent::YearStarted { tick, year: self.world.clock.year });
        }

        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem_at_tick(*slot, tick);
            events.extend(subsystem.update(tick, &mut self.world, &mut rng)?);
        }

        events.push(SimEvent::TickCompleted { tick });

        if tick % self.config.save.autosave_interval == 0 {
            match self.saves.save(&self.world, self.store.as_mut()) {
                Ok(()) => events.push(SimEvent::GameSaved { tick, silent: true }),
                Err(err) => log::warn!("tick={tick} autosave failed: {err}"),
            }
        }

        self.log.record(tick, &events);
        Ok(events)
    }

    /// Run n ticks in a loop. Used for testing and fast-forward.
    /// Deferred tasks do not fire; use `advance_millis` for paced play.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        let was_paused = self.world.clock.paused;
        self.world.clock.resume();
        let result = (0..n).try_for_each(|_| self.tick().map(|_| ()));
        if was_paused {
            self.world.clock.pause();
        }
        result
    }

    /// Advance the pacing clock by `ms`. Ticks fire every
    /// `tick_rate_ms / speed` while unpaused; deferred tasks fire when due,
    /// paused or not.
    pub fn advance_millis(&mut self, ms: Millis) -> SimResult<Vec<SimEvent>> {
        let mut events = self.fire_due_tasks()?;
        let mut remaining = ms;

        while remaining > 0 {
            let until_tick = if self.world.clock.paused {
                Millis::MAX
            } else {
                self.tick_interval_ms().saturating_sub(self.tick_accum_ms).max(1)
            };
            let until_task = self
                .deferred
                .next_due()
                .map_or(Millis::MAX, |due| due.saturating_sub(self.now_ms).max(1));
            let step = remaining.min(until_tick).min(until_task);

            self.now_ms += step;
            remaining -= step;

            if !self.world.clock.paused {
                self.tick_accum_ms += step;
                if self.tick_accum_ms >= self.tick_interval_ms() {
                    self.tick_accum_ms = 0;
                    events.extend(self.tick()?);
                }
            }
            events.extend(self.fire_due_tasks()?);
        }
        Ok(events)
    }

    pub fn now_ms(&self) -> Millis {
        self.now_ms
    }

    fn tick_interval_ms(&self) -> Millis {
        (self.config.tick_rate_ms / Millis::from(self.world.clock.ticks_per_real_second())).max(1)
    }

    fn fire_due_tasks(&mut self) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        for action in self.deferred.drain_due(self.now_ms) {
            match action {
                DeferredAction::EnemyCounterAttack { encounter_id } => {
                    events.extend(self.combat.counter_attack(
                        encounter_id,
                        &mut self.world,
                        self.combat_rng.as_mut(),
                    )?);
                }
            }
        }
        self.record(&events);
        Ok(events)
    }

    // ── Economy ────────────────────────────────────────────────

    /// Manual gather: a fixed amount of the gather resource.
    pub fn click_gather(&mut self) -> SimResult<f64> {
        let resource = self.config.economy.gather_resource.clone();
        let applied = self
            .world
            .ledger
            .add(&resource, self.config.economy.gather_amount)
            .map_err(|err| self.refuse("gather", err))?;
        self.record(&[SimEvent::ResourceGathered { resource, amount: applied }]);
        Ok(applied)
    }

    /// Convert `refine_cost` of the input into `refine_yield` of the output.
    /// The input is spent even if the output is already at its cap.
    pub fn refine_wood(&mut self) -> SimResult<()> {
        let economy = self.config.economy.clone();
        let cost: CostMap = [(economy.refine_input.clone(), economy.refine_cost)].into_iter().collect();

        if let Err(err) = self.world.ledger.spend(&cost) {
            return Err(self.refuse("refining", err));
        }
        self.world
            .ledger
            .add(&economy.refine_output, economy.refine_yield)
            .map_err(|err| self.refuse("refining", err))?;

        self.record(&[SimEvent::ResourceRefined {
            spent:    cost,
            produced: economy.refine_output,
            amount:   economy.refine_yield,
        }]);
        Ok(())
    }

    /// Buy one unit of `building_id`. A refusal leaves state unchanged.
    pub fn purchase(&mut self, building_id: &str) -> SimResult<PurchaseReceipt> {
        let receipt = match self.world.market.purchase(building_id, &mut self.world.ledger) {
            Ok(receipt) => receipt,
            Err(err) => {
                let target = self
                    .world
                    .market
                    .get(building_id)
                    .map_or_else(|| building_id.to_string(), |b| b.def.name.clone());
                return Err(self.refuse(&target, err));
            }
        };

        log::info!(
            "tick={} market: bought {} (now {})",
            self.world.clock.current_tick,
            receipt.building_id,
            receipt.new_count
        );
        self.record(&[SimEvent::BuildingPurchased {
            building_id: receipt.building_id.clone(),
            name:        receipt.name.clone(),
            count:       receipt.new_count,
        }]);
        Ok(receipt)
    }

    pub fn price_of(&self, building_id: &str) -> SimResult<CostMap> {
        self.world.market.price_of(building_id)
    }

    // ── Combat ─────────────────────────────────────────────────

    pub fn explore(&mut self) -> SimResult<ExploreOutcome> {
        let (outcome, events) = self.combat.explore(&self.world, self.combat_rng.as_mut())?;
        self.record(&events);
        Ok(outcome)
    }

    /// Strike the current enemy. Ignored outside combat and while the
    /// enemy's previous reply is still pending.
    pub fn player_attack(&mut self) -> SimResult<AttackOutcome> {
        let (outcome, events) = self.combat.player_attack(
            &mut self.world,
            self.combat_rng.as_mut(),
            &mut self.deferred,
            self.now_ms,
        )?;
        self.record(&events);
        Ok(outcome)
    }

    /// Leave the current encounter. Returns false when already idle.
    pub fn flee(&mut self) -> bool {
        let events = self.combat.flee(&mut self.deferred);
        self.record(&events);
        !events.is_empty()
    }

    pub fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    // ── Persistence ────────────────────────────────────────────

    /// Manual save, announced in the log.
    pub fn save(&mut self) -> SimResult<()> {
        self.saves.save(&self.world, self.store.as_mut())?;
        self.record(&[SimEvent::GameSaved { tick: self.world.clock.current_tick, silent: false }]);
        Ok(())
    }

    /// Restore from the store. `Ok(false)` if nothing was saved.
    /// An unreadable save resets to defaults and returns `MalformedSnapshot`.
    pub fn load(&mut self) -> SimResult<bool> {
        self.combat.abandon(&mut self.deferred);
        match self.saves.load(self.store.as_ref(), self.defaults()) {
            Ok(Some(world)) => {
                self.install(world);
                log::info!("loaded save at tick {}", self.world.clock.current_tick);
                self.record(&[SimEvent::GameLoaded { tick: self.world.clock.current_tick }]);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err @ SimError::MalformedSnapshot { .. }) => Err(self.fall_back(err)),
            Err(err) => Err(err),
        }
    }

    /// Wipe the stored save and return to a fresh game.
    pub fn reset(&mut self) -> SimResult<()> {
        self.saves.clear(self.store.as_mut())?;
        self.combat.abandon(&mut self.deferred);
        let defaults = self.defaults();
        self.install(defaults);
        self.log.clear();
        self.record(&[SimEvent::GameReset]);
        log::info!("game reset");
        Ok(())
    }

    pub fn export_snapshot(&self) -> SimResult<String> {
        SaveCoordinator::export_code(&self.world)
    }

    /// Replace the game with an exported code and persist it. A code that
    /// cannot be read resets to defaults without touching the stored save.
    pub fn import_snapshot(&mut self, code: &str) -> SimResult<()> {
        self.combat.abandon(&mut self.deferred);
        let restored = SaveCoordinator::decode_code(code)
            .and_then(|json| SaveCoordinator::deserialize(&json, self.defaults()));

        match restored {
            Ok(world) => {
                self.install(world);
                self.saves.save(&self.world, self.store.as_mut())?;
                self.record(&[SimEvent::GameLoaded { tick: self.world.clock.current_tick }]);
                Ok(())
            }
            Err(err) => Err(self.fall_back(err)),
        }
    }

    pub fn apply_command(&mut self, command: PlayerCommand) -> SimResult<CommandReply> {
        log::debug!("tick={} command: {command:?}", self.world.clock.current_tick);
        match command {
            PlayerCommand::Pause => self.world.clock.pause(),
            PlayerCommand::Resume => self.world.clock.resume(),
            PlayerCommand::SetSpeed { speed } => self.world.clock.set_speed(speed),
            PlayerCommand::Gather => {
                self.click_gather()?;
            }
            PlayerCommand::RefineWood => self.refine_wood()?,
            PlayerCommand::Purchase { building_id } => {
                self.purchase(&building_id)?;
            }
            PlayerCommand::Explore => {
                self.explore()?;
            }
            PlayerCommand::Attack => {
                self.player_attack()?;
            }
            PlayerCommand::Flee => {
                self.flee();
            }
            PlayerCommand::Save => self.save()?,
            PlayerCommand::Load => {
                self.load()?;
            }
            PlayerCommand::Reset => self.reset()?,
            PlayerCommand::Export => {
                return Ok(CommandReply::ExportCode { code: self.export_snapshot()? });
            }
            PlayerCommand::Import { code } => self.import_snapshot(&code)?,
        }
        Ok(CommandReply::Done)
    }

    // ── Projections ────────────────────────────────────────────

    pub fn view(&self) -> SimView {
        SimView::capture(&self.config, &self.world, &self.combat, &self.log)
    }

    /// Newest first.
    pub fn recent_log(&self) -> Vec<LogEntry> {
        self.log.recent().cloned().collect()
    }

    pub fn current_tick(&self) -> Tick {
        self.world.clock.current_tick
    }

    // ── Internals ──────────────────────────────────────────────

    fn season_name(&self, season_index: usize) -> String {
        self.config
            .calendar
            .season_names
            .get(season_index)
            .cloned()
            .unwrap_or_default()
    }

    fn defaults(&self) -> SimWorld {
        SimWorld::from_config(&self.config)
    }

    /// Swap in a new world, keeping the run controls (pause, speed).
    fn install(&mut self, mut world: SimWorld) {
        world.clock.paused = self.world.clock.paused;
        world.clock.speed = self.world.clock.speed;
        self.world = world;
        self.tick_accum_ms = 0;
    }

    fn fall_back(&mut self, err: SimError) -> SimError {
        log::warn!("save rejected, falling back to defaults: {err}");
        let defaults = self.defaults();
        self.install(defaults);
        let reason = match &err {
            SimError::MalformedSnapshot { reason } => reason.clone(),
            other => other.to_string(),
        };
        self.record(&[SimEvent::SnapshotRejected { reason }]);
        err
    }

    /// Log a refused player action and hand the error back.
    fn refuse(&mut self, target: &str, err: SimError) -> SimError {
        let tick = self.world.clock.current_tick;
        log::warn!("tick={tick} {target} refused: {err}");
        let event = match &err {
            SimError::InsufficientResources { shortfalls } => Some(SimEvent::PurchaseRefused {
                target:     target.to_string(),
                shortfalls: shortfalls.clone(),
            }),
            SimError::UnknownIdentifier { kind, id } => Some(SimEvent::UnknownIdentifier {
                kind: kind.to_string(),
                id:   id.clone(),
            }),
            _ => None,
        };
        if let Some(event) = event {
            self.record(&[event]);
        }
        err
    }

    fn record(&mut self, events: &[SimEvent]) {
        self.log.record(self.world.clock.current_tick, events);
    }
}
