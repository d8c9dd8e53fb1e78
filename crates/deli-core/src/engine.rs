//! The shift engine: owns every pipeline component and runs the step
//! pipeline.
//!
//! # Step pipeline
//!
//! Each step runs, in order:
//! 1. **Pre-tick**: execute reactive-handler commands, then queued commands
//! 2. **Customers**: advance ship/avatar machines, collect patience expiries
//! 3. **Trays**: spawn-in timers, activation when the customer is at the window
//! 4. **Resolution**: expired orders become misses
//! 5. **Spawn**: the scheduler may create a new tray
//! 6. **Shift clock**: timed shifts start closing; a drained store closes
//! 7. **Post-tick**: deliver the event outbox, flush the save if dirty
//! 8. **Bookkeeping**: tick counter and state hash
//!
//! Player input (`pick_up`, `place`, `deliver`) applies immediately; the
//! events it emits go out with the next post-tick.

use slotmap::SlotMap;
use tracing::{debug, info, trace, warn};

use crate::catalog::Catalog;
use crate::command_queue::{Command, CommandQueue};
use crate::config::ShiftConfig;
use crate::customer::{Customer, CustomerState};
use crate::difficulty::DifficultyParams;
use crate::dock::DockAllocator;
use crate::error::ShiftError;
use crate::event::{Event, EventBus, EventKind, PassiveListener, ReactiveHandler};
use crate::fixed::{Cents, Fixed64, Ticks};
use crate::id::{CustomerId, IngredientId, Pickup, TrayId};
use crate::inventory::Inventory;
use crate::order::OrderGenerator;
use crate::persistence::{SaveDocument, SaveStore};
use crate::prep::PrepAllocator;
use crate::query::{CustomerSnapshot, DockSnapshot, TraySnapshot};
use crate::rng::SimRng;
use crate::scoring::{DeliveryReceipt, ScoreState, Termination};
use crate::sim::{AdvanceResult, SimState, SimulationStrategy, StateHash};
use crate::spawn::SpawnScheduler;
use crate::tray::{Tray, Verdict};

/// Where the shift is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShiftPhase {
    /// Store not opened yet.
    Idle,
    /// Customers arrive and orders spawn.
    Open,
    /// No new orders; waiting for the last customers to be served.
    Closing,
    /// Drained and paid out.
    Closed,
    /// Too many misses. Nothing advances until [`Shift::restart`].
    Terminated,
}

impl ShiftPhase {
    fn hash_tag(self) -> u32 {
        self as u32
    }
}

pub struct Shift {
    config: ShiftConfig,
    catalog: Catalog,
    inventory: Inventory,
    generator: OrderGenerator,
    docks: DockAllocator,
    prep: PrepAllocator,
    trays: SlotMap<TrayId, Tray>,
    customers: SlotMap<CustomerId, Customer>,
    spawner: SpawnScheduler,
    score: ScoreState,
    rng: SimRng,
    event_bus: EventBus,
    commands: CommandQueue,
    sim_state: SimState,
    phase: ShiftPhase,
    paused: bool,
    held: Option<Pickup>,
    /// Game seconds the store has been open this shift.
    elapsed: Fixed64,
    next_order_num: u32,
    save: SaveDocument,
    store: Box<dyn SaveStore>,
    save_dirty: bool,
    last_state_hash: u64,
}

impl std::fmt::Debug for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shift")
            .field("phase", &self.phase)
            .field("tick", &self.sim_state.tick)
            .field("elapsed", &self.elapsed)
            .field("trays", &self.trays.len())
            .field("customers", &self.customers.len())
            .field("score", &self.score)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl Shift {
    /// Build a shift and load its save. `fallback` is used when the store
    /// has nothing yet or cannot be read.
    pub fn new(
        config: ShiftConfig,
        catalog: Catalog,
        mut store: Box<dyn SaveStore>,
        fallback: SaveDocument,
    ) -> Self {
        let save = match store.load() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!("no save found, starting fresh");
                fallback
            }
            Err(err) => {
                warn!(%err, "save unreadable, starting from defaults");
                fallback
            }
        };
        let inventory = Inventory::from_named(&catalog, &save.inventory);

        Self {
            generator: OrderGenerator::new(config.orders.clone()),
            docks: DockAllocator::new(config.dock_capacity, config.dock_spacing),
            prep: PrepAllocator::new(config.prep_capacity),
            trays: SlotMap::with_key(),
            customers: SlotMap::with_key(),
            spawner: SpawnScheduler::new(config.ramp.clone()),
            score: ScoreState::with_high_score(save.stats.high_score),
            rng: SimRng::new(config.seed),
            event_bus: EventBus::new(config.event_history),
            commands: CommandQueue::with_max_history(config.command_history),
            sim_state: SimState::new(),
            phase: ShiftPhase::Idle,
            paused: false,
            held: None,
            elapsed: Fixed64::ZERO,
            next_order_num: 0,
            store,
            save_dirty: false,
            last_state_hash: 0,
            inventory,
            catalog,
            save,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the store. Only an idle or closed shift can open; returns false
    /// otherwise. Per-shift score, ramp and clock start over.
    pub fn open_store(&mut self) -> bool {
        if !matches!(self.phase, ShiftPhase::Idle | ShiftPhase::Closed) {
            return false;
        }
        self.score = ScoreState::with_high_score(self.save.stats.high_score);
        self.spawner.reset();
        self.elapsed = Fixed64::ZERO;
        self.next_order_num = 0;
        self.phase = ShiftPhase::Open;
        info!(location = %self.save.current_location, "store open");
        true
    }

    /// Stop taking new customers. Orders already in flight are still served.
    pub fn close_store(&mut self) -> bool {
        if self.phase != ShiftPhase::Open {
            return false;
        }
        self.phase = ShiftPhase::Closing;
        info!(in_flight = self.trays.len(), "store closing");
        true
    }

    /// Tear down every tray and customer and open a fresh shift. Keeps the
    /// wallet, stock and high score.
    pub fn restart(&mut self) {
        self.teardown();
        self.phase = ShiftPhase::Idle;
        self.open_store();
    }

    fn teardown(&mut self) {
        for (_, customer) in &mut self.customers {
            if let Some(slot) = customer.dock_slot.take() {
                self.docks.release(slot);
            }
        }
        for (_, tray) in &self.trays {
            self.prep.release(tray.prep_slot);
        }
        self.customers.clear();
        self.trays.clear();
        self.docks.clear();
        self.prep.clear();
        self.held = None;
        self.commands.clear_pending();
        // Subscribers still see what happened before the teardown.
        self.event_bus.deliver();
        self.event_bus.drain_commands();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn phase(&self) -> ShiftPhase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == ShiftPhase::Terminated
    }

    // -----------------------------------------------------------------------
    // Player input
    // -----------------------------------------------------------------------

    /// Pick up an ingredient or a treatment tool, replacing whatever was
    /// held. An unknown or out-of-stock ingredient is `Wrong`.
    pub fn pick_up(&mut self, item: Pickup) -> Verdict {
        if self.is_terminated() {
            return Verdict::Wrong;
        }
        let available = match item {
            Pickup::Ingredient(key) => self.inventory.has_stock(key),
            Pickup::Treatment(key) => self.catalog.treatment(key).is_some(),
        };
        if !available {
            self.held = None;
            self.event_bus.emit(Event::IngredientWrong {
                tray: None,
                item,
                tick: self.sim_state.tick,
            });
            return Verdict::Wrong;
        }
        self.held = Some(item);
        Verdict::Valid
    }

    pub fn held(&self) -> Option<Pickup> {
        self.held
    }

    /// Drop the held item onto `target`. The hand is empty afterwards
    /// whatever the outcome.
    pub fn place(&mut self, target: Option<TrayId>) -> Verdict {
        let held = self.held.take();
        let (Some(item), Some(tray_id)) = (held, target) else {
            return Verdict::Cancelled;
        };
        if self.is_terminated() {
            return Verdict::Cancelled;
        }
        let tick = self.sim_state.tick;
        let Some(tray) = self.trays.get_mut(tray_id) else {
            return Verdict::Cancelled;
        };

        let verdict = match item {
            Pickup::Ingredient(key) => {
                if !self.inventory.has_stock(key) {
                    return Verdict::Cancelled;
                }
                let verdict = tray.try_place(key);
                if verdict == Verdict::Valid {
                    self.inventory.consume(key);
                    self.save_dirty = true;
                    self.event_bus.emit(Event::IngredientPlaced {
                        tray: tray_id,
                        ingredient: key,
                        tick,
                    });
                }
                verdict
            }
            Pickup::Treatment(key) => {
                let verdict = tray.apply_treatment(key);
                if verdict == Verdict::Valid {
                    self.event_bus.emit(Event::TreatmentApplied {
                        tray: tray_id,
                        treatment: key,
                        tick,
                    });
                }
                verdict
            }
        };

        match verdict {
            Verdict::Valid if tray.is_completed() => {
                debug!(order = tray.order_num, "order completed");
                self.event_bus
                    .emit(Event::TrayCompleted { tray: tray_id, tick });
            }
            Verdict::Wrong => {
                self.score.on_wrong_placement(&self.config.scoring);
                self.event_bus.emit(Event::IngredientWrong {
                    tray: Some(tray_id),
                    item,
                    tick,
                });
            }
            Verdict::Valid | Verdict::Cancelled => {}
        }
        verdict
    }

    /// Hand a completed order to its customer.
    pub fn deliver(&mut self, tray_id: TrayId) -> Result<DeliveryReceipt, ShiftError> {
        if self.is_terminated() {
            return Err(ShiftError::Terminated);
        }
        let tray = self
            .trays
            .get_mut(tray_id)
            .ok_or(ShiftError::UnknownTray(tray_id))?;
        if !tray.mark_delivered() {
            return Err(ShiftError::TrayNotCompleted(tray_id));
        }
        let patience_fraction = self
            .customers
            .get(tray.customer)
            .map(Customer::patience_fraction)
            .unwrap_or(Fixed64::ZERO);

        let receipt = self.score.on_deliver(
            &self.config.scoring,
            tray_id,
            tray.order_num,
            tray.order.total_price,
            patience_fraction,
        );
        let spawned_at = tray.spawned_at;

        let stats = &mut self.save.stats;
        stats.orders_completed += 1;
        stats.best_combo = stats.best_combo.max(self.score.best_combo);
        stats.high_score = stats.high_score.max(self.score.high_score);
        self.save_dirty = true;

        self.event_bus.emit(Event::TrayDelivered {
            tray: tray_id,
            order_num: receipt.order_num,
            money: receipt.money,
            points: receipt.points,
            combo: receipt.combo,
            spawned_at,
            tick: self.sim_state.tick,
        });
        debug!(
            order = receipt.order_num,
            money = receipt.money,
            points = receipt.points,
            combo = receipt.combo,
            "order delivered"
        );

        self.finish_tray(tray_id);
        self.spawner.on_resolution();
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Shop
    // -----------------------------------------------------------------------

    /// Buy stock with wallet money and save right away.
    pub fn purchase(&mut self, ingredient: IngredientId, quantity: u32) -> Result<Cents, ShiftError> {
        if self.catalog.ingredient(ingredient).is_none() {
            return Err(ShiftError::UnknownIngredient(ingredient));
        }
        let needed = self.catalog.price(ingredient).saturating_mul(quantity as Cents);
        if needed > self.save.total_money {
            return Err(ShiftError::InsufficientFunds {
                needed,
                available: self.save.total_money,
            });
        }
        self.save.total_money -= needed;
        self.inventory.restock(ingredient, quantity);
        debug!(
            ingredient = self.catalog.ingredient_name(ingredient),
            quantity,
            cost = needed,
            "stock purchased"
        );
        self.flush_save();
        Ok(needed)
    }

    /// Add free stock.
    pub fn restock(&mut self, ingredient: IngredientId, quantity: u32) -> Result<(), ShiftError> {
        if self.catalog.ingredient(ingredient).is_none() {
            return Err(ShiftError::UnknownIngredient(ingredient));
        }
        self.inventory.restock(ingredient, quantity);
        self.save_dirty = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commands and events
    // -----------------------------------------------------------------------

    /// Queue a command for the next step.
    pub fn queue(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn command_history(&self) -> &[(u64, Command)] {
        self.commands.history()
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.event_bus.on_reactive(kind, handler);
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance by `dt` seconds according to the strategy. No-op while
    /// paused.
    pub fn advance(&mut self, dt: Fixed64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }
        let dt = dt.max(Fixed64::ZERO);

        match self.config.strategy {
            SimulationStrategy::Variable => self.step_internal(dt, &mut result),
            SimulationStrategy::Fixed { timestep } => {
                let step = timestep.max(Fixed64::DELTA);
                self.sim_state.accumulator += dt;
                while self.sim_state.accumulator >= step {
                    self.sim_state.accumulator -= step;
                    self.step_internal(step, &mut result);
                }
            }
        }
        result
    }

    /// Run exactly one step: one fixed timestep, or a zero-length step in
    /// variable mode.
    pub fn step(&mut self) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }
        let dt = match self.config.strategy {
            SimulationStrategy::Variable => Fixed64::ZERO,
            SimulationStrategy::Fixed { timestep } => timestep,
        };
        self.step_internal(dt, &mut result);
        result
    }

    fn step_internal(&mut self, dt: Fixed64, result: &mut AdvanceResult) {
        result.commands_run += self.phase_pre_tick();

        let serving = matches!(self.phase, ShiftPhase::Open | ShiftPhase::Closing);
        if self.phase == ShiftPhase::Open {
            self.elapsed += dt;
        }
        let params = self.config.difficulty.sample(self.elapsed);

        if serving {
            let expired = self.phase_customers(dt, &params);
            self.phase_trays(dt);
            self.phase_resolution(expired);
        }
        if self.phase == ShiftPhase::Open {
            self.phase_spawn(dt, &params);
        }
        self.phase_shift_clock();

        result.events_delivered += self.phase_post_tick();
        self.phase_bookkeeping();
        result.steps_run += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: Pre-tick
    // -----------------------------------------------------------------------

    fn phase_pre_tick(&mut self) -> usize {
        let mut commands = self.event_bus.drain_commands();
        commands.extend(self.commands.drain(self.sim_state.tick));
        let count = commands.len();
        for command in commands {
            if let Err(err) = self.execute(command.clone()) {
                debug!(%err, ?command, "command rejected");
            }
        }
        count
    }

    fn execute(&mut self, command: Command) -> Result<(), ShiftError> {
        match command {
            Command::Purchase {
                ingredient,
                quantity,
            } => self.purchase(ingredient, quantity).map(|_| ()),
            Command::Restock {
                ingredient,
                quantity,
            } => self.restock(ingredient, quantity),
            Command::OpenStore => {
                self.open_store();
                Ok(())
            }
            Command::CloseStore => {
                self.close_store();
                Ok(())
            }
            Command::Deliver { tray } => self.deliver(tray).map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Customers
    // -----------------------------------------------------------------------

    /// Returns the trays whose customers ran out of patience this step.
    fn phase_customers(&mut self, dt: Fixed64, params: &DifficultyParams) -> Vec<TrayId> {
        let tick = self.sim_state.tick;
        let mut expired = Vec::new();
        let mut gone = Vec::new();

        for (customer_id, customer) in &mut self.customers {
            let tray = customer.tray;
            let completed = tray
                .and_then(|id| self.trays.get(id))
                .is_some_and(Tray::is_completed);
            let outcome = customer.advance(dt, params.ambient_speed, &self.config.timings, completed);

            for t in outcome.transitions {
                self.event_bus.emit(Event::CustomerStateChanged {
                    customer: customer_id,
                    from: t.from,
                    to: t.to,
                    tick,
                });
            }
            if outcome.patience_expired
                && let Some(tray) = tray
            {
                expired.push(tray);
            }
            if customer.is_gone() {
                if let Some(slot) = customer.dock_slot.take() {
                    self.docks.release(slot);
                }
                gone.push(customer_id);
            }
        }

        for id in gone {
            self.customers.remove(id);
        }
        expired
    }

    // -----------------------------------------------------------------------
    // Phase 3: Trays
    // -----------------------------------------------------------------------

    fn phase_trays(&mut self, dt: Fixed64) {
        for (_, tray) in &mut self.trays {
            tray.advance_spawn(dt);
            let at_window = self
                .customers
                .get(tray.customer)
                .is_some_and(|c| c.state() == CustomerState::AtWindow);
            if at_window && tray.customer_arrived() {
                trace!(order = tray.order_num, "order active");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Resolution
    // -----------------------------------------------------------------------

    fn phase_resolution(&mut self, expired: Vec<TrayId>) {
        for tray_id in expired {
            if self.is_terminated() {
                break;
            }
            self.resolve_miss(tray_id);
        }
    }

    fn resolve_miss(&mut self, tray_id: TrayId) {
        let Some(tray) = self.trays.get_mut(tray_id) else {
            return;
        };
        if !tray.mark_missed() {
            return;
        }
        let tick = self.sim_state.tick;
        let order_num = tray.order_num;
        let spawned_at = tray.spawned_at;
        let termination = self.score.on_miss(&self.config.scoring, tick);
        self.save.stats.orders_missed += 1;
        self.save_dirty = true;

        self.event_bus.emit(Event::TrayMissed {
            tray: tray_id,
            order_num,
            missed_count: self.score.missed_count,
            spawned_at,
            tick,
        });
        debug!(order = order_num, missed = self.score.missed_count, "order missed");

        self.finish_tray(tray_id);
        self.spawner.on_resolution();

        if let Some(termination) = termination {
            self.terminate(termination);
        }
    }

    /// Remove a resolved tray, free both slots and send its customer home.
    fn finish_tray(&mut self, tray_id: TrayId) {
        let Some(mut tray) = self.trays.remove(tray_id) else {
            return;
        };
        tray.mark_done();
        self.prep.release(tray.prep_slot);

        match self.customers.get_mut(tray.customer) {
            Some(customer) => {
                customer.tray = None;
                if let Some(slot) = customer.dock_slot.take() {
                    self.docks.release(slot);
                }
                if let Some(t) = customer.depart(&self.config.timings) {
                    self.event_bus.emit(Event::CustomerStateChanged {
                        customer: tray.customer,
                        from: t.from,
                        to: t.to,
                        tick: self.sim_state.tick,
                    });
                }
            }
            None => {
                if self.docks.pool().occupant(tray.dock_slot) == Some(tray_id) {
                    self.docks.release(tray.dock_slot);
                }
            }
        }
    }

    fn terminate(&mut self, termination: Termination) {
        self.phase = ShiftPhase::Terminated;
        self.held = None;
        self.save.total_money = self.save.total_money.saturating_add(termination.kept);
        self.save.stats.total_earned = self.save.stats.total_earned.saturating_add(termination.kept);
        self.save_dirty = true;
        self.event_bus.emit(Event::ShiftTerminated {
            earned: termination.earned,
            penalty: termination.penalty,
            kept: termination.kept,
            tick: termination.tick,
        });
        info!(
            earned = termination.earned,
            penalty = termination.penalty,
            kept = termination.kept,
            "shift terminated"
        );
    }

    // -----------------------------------------------------------------------
    // Phase 5: Spawn
    // -----------------------------------------------------------------------

    fn phase_spawn(&mut self, dt: Fixed64, params: &DifficultyParams) {
        self.spawner.tick(dt);
        if !self.spawner.ready() {
            return;
        }
        if self.trays.len() as u32 >= self.config.max_active_orders {
            trace!(active = self.trays.len(), "spawn skipped: order limit");
            return;
        }
        let (Some(dock_slot), Some(prep_slot)) = (self.docks.first_free(), self.prep.first_free()) else {
            trace!("spawn skipped: no free slot");
            return;
        };
        let Some(order) = self
            .generator
            .generate(&self.catalog, &self.inventory, params, &mut self.rng)
        else {
            trace!("spawn skipped: not enough stock for an order");
            return;
        };

        self.next_order_num += 1;
        let order_num = self.next_order_num;
        let tick = self.sim_state.tick;
        let patience = self.config.patience.patience_for(self.elapsed);
        let spawn_secs = self.config.tray_spawn_secs;
        let timings = &self.config.timings;
        let customers = &mut self.customers;

        let mut customer_id = CustomerId::default();
        let tray_id = self.trays.insert_with_key(|tray_id| {
            customer_id = customers.insert(Customer::new(tray_id, dock_slot, patience, timings));
            Tray::new(order_num, order, dock_slot, prep_slot, customer_id, tick, spawn_secs)
        });
        let docked = self.docks.occupy(dock_slot, tray_id);
        let prepped = self.prep.occupy(prep_slot, tray_id);
        debug_assert!(docked && prepped, "free slots were taken mid-spawn");

        let interval = self.config.difficulty.jittered_interval(params, &mut self.rng);
        self.spawner.on_spawned(interval);

        self.event_bus.emit(Event::TraySpawned {
            tray: tray_id,
            customer: customer_id,
            order_num,
            dock_slot,
            prep_slot,
            tick,
        });
        debug!(order = order_num, dock = dock_slot.0, prep = prep_slot.0, "order spawned");
    }

    // -----------------------------------------------------------------------
    // Phase 6: Shift clock
    // -----------------------------------------------------------------------

    fn phase_shift_clock(&mut self) {
        let length = self.config.shift_length;
        if self.phase == ShiftPhase::Open && length > Fixed64::ZERO && self.elapsed >= length {
            self.close_store();
        }
        if self.phase == ShiftPhase::Closing && self.trays.is_empty() && self.customers.is_empty() {
            self.close_shift();
        }
    }

    fn close_shift(&mut self) {
        let earned = self.score.money;
        self.phase = ShiftPhase::Closed;
        self.save.total_money = self.save.total_money.saturating_add(earned);
        self.save.shifts_completed += 1;
        self.save.stats.total_earned = self.save.stats.total_earned.saturating_add(earned);
        self.save_dirty = true;
        self.event_bus.emit(Event::ShiftClosed {
            earned,
            orders_completed: self.score.orders_completed,
            tick: self.sim_state.tick,
        });
        info!(
            earned,
            orders = self.score.orders_completed,
            missed = self.score.missed_count,
            wallet = self.save.total_money,
            "shift closed"
        );
    }

    // -----------------------------------------------------------------------
    // Phase 7: Post-tick
    // -----------------------------------------------------------------------

    fn phase_post_tick(&mut self) -> usize {
        let delivered = self.event_bus.deliver();
        if self.save_dirty {
            self.flush_save();
        }
        delivered
    }

    /// Write the save document now. Failures are logged and the shift
    /// carries on.
    pub fn flush_save(&mut self) {
        self.save.inventory = self.inventory.to_named(&self.catalog);
        if let Err(err) = self.store.save(&self.save) {
            warn!(%err, "save failed");
        }
        self.save_dirty = false;
    }

    // -----------------------------------------------------------------------
    // Phase 8: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    fn compute_state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);
        h.write_u32(self.phase.hash_tag());
        h.write_fixed64(self.elapsed);
        h.write_u64(self.rng.state());
        h.write_fixed64(self.spawner.countdown());
        h.write_u32(self.spawner.spawned());

        let s = &self.score;
        h.write_u64(s.current_score);
        h.write_u64(s.money);
        h.write_u32(s.combo);
        h.write_u32(s.missed_count);
        h.write_u32(s.orders_completed);

        for id in self.catalog.ingredient_ids() {
            h.write_u32(self.inventory.count(id));
        }
        for (_, tray) in &self.trays {
            h.write_u32(tray.order_num);
            h.write_u32(tray.state() as u32);
            h.write_u32(tray.placed().len() as u32);
            h.write_u32(tray.applied_treatments().len() as u32);
        }
        for (_, customer) in &self.customers {
            h.write_u32(customer.state() as u32);
            h.write_fixed64(customer.patience());
        }
        h.write_u64(self.save.total_money);
        h.finish()
    }

    /// Hash computed at the end of the last step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn elapsed(&self) -> Fixed64 {
        self.elapsed
    }

    pub fn config(&self) -> &ShiftConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    /// Wallet balance in cents.
    pub fn wallet(&self) -> Cents {
        self.save.total_money
    }

    pub fn save_document(&self) -> &SaveDocument {
        &self.save
    }

    pub fn difficulty(&self) -> DifficultyParams {
        self.config.difficulty.sample(self.elapsed)
    }

    pub fn docks(&self) -> &DockAllocator {
        &self.docks
    }

    pub fn prep(&self) -> &PrepAllocator {
        &self.prep
    }

    pub fn spawner(&self) -> &SpawnScheduler {
        &self.spawner
    }

    pub fn tray(&self, id: TrayId) -> Option<&Tray> {
        self.trays.get(id)
    }

    pub fn tray_ids(&self) -> Vec<TrayId> {
        self.trays.keys().collect()
    }

    pub fn tray_count(&self) -> usize {
        self.trays.len()
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(id)
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn snapshot_tray(&self, id: TrayId) -> Option<TraySnapshot> {
        let tray = self.trays.get(id)?;
        Some(TraySnapshot {
            id,
            order_num: tray.order_num,
            state: tray.state(),
            ingredients: tray.order.ingredients.clone(),
            placed: tray.placed().to_vec(),
            treatments: tray.order.treatments.iter().copied().collect(),
            applied_treatments: tray.applied_treatments().iter().copied().collect(),
            total_price: tray.order.total_price,
            dock_slot: tray.dock_slot,
            prep_slot: tray.prep_slot,
            customer: tray.customer,
            spawned_at: tray.spawned_at,
        })
    }

    pub fn snapshot_trays(&self) -> Vec<TraySnapshot> {
        self.trays
            .keys()
            .filter_map(|id| self.snapshot_tray(id))
            .collect()
    }

    pub fn snapshot_customers(&self) -> Vec<CustomerSnapshot> {
        self.customers
            .iter()
            .map(|(id, c)| CustomerSnapshot {
                id,
                state: c.state(),
                tray: c.tray,
                patience: c.patience(),
                patience_max: c.patience_max(),
                patience_fraction: c.patience_fraction(),
                dock_slot: c.dock_slot,
            })
            .collect()
    }

    pub fn snapshot_docks(&self) -> Vec<DockSnapshot> {
        self.docks
            .slots()
            .into_iter()
            .map(|slot| DockSnapshot {
                id: slot.id,
                position: slot.position,
                occupied_by: slot.occupied_by,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::test_utils::*;
    use crate::tray::TrayState;

    #[test]
    fn idle_shift_does_not_spawn() {
        let mut shift = basic_shift();
        advance_secs(&mut shift, 10.0);
        assert_eq!(shift.phase(), ShiftPhase::Idle);
        assert_eq!(shift.tray_count(), 0);
        assert_eq!(shift.elapsed(), Fixed64::ZERO);
    }

    #[test]
    fn first_order_spawns_after_initial_delay() {
        let mut shift = open_shift();
        advance_secs(&mut shift, 1.75);
        assert_eq!(shift.tray_count(), 0);
        advance_secs(&mut shift, 0.25);
        assert_eq!(shift.tray_count(), 1);
        assert_eq!(shift.docks().occupied_count(), 1);
        assert_eq!(shift.prep().occupied_count(), 1);
    }

    #[test]
    fn order_limit_caps_in_flight_trays() {
        let mut shift = open_shift();
        advance_secs(&mut shift, 40.0);
        assert!(shift.tray_count() <= shift.config().max_active_orders as usize);
        assert!(shift.prep().occupied_count() <= shift.prep().capacity());
    }

    #[test]
    fn tray_activates_when_customer_reaches_window() {
        let mut shift = open_shift();
        let tray = spawn_first(&mut shift);
        assert_ne!(shift.tray(tray).unwrap().state(), TrayState::Active);
        walk_customer_in(&mut shift);
        assert_eq!(shift.tray(tray).unwrap().state(), TrayState::Active);
    }

    #[test]
    fn pick_up_out_of_stock_is_wrong_without_penalty() {
        let mut shift = open_shift();
        let swiss = shift.catalog().ingredient_id("cheese_swiss").unwrap();
        assert_eq!(shift.pick_up(Pickup::Ingredient(swiss)), Verdict::Wrong);
        assert_eq!(shift.held(), None);
        assert_eq!(shift.score().wrong_placements, 0);
    }

    #[test]
    fn place_without_target_cancels_and_drops_item() {
        let mut shift = open_shift();
        let bread = bread_white(shift.catalog());
        assert_eq!(shift.pick_up(Pickup::Ingredient(bread)), Verdict::Valid);
        assert_eq!(shift.place(None), Verdict::Cancelled);
        assert_eq!(shift.held(), None);
        assert_eq!(shift.place(None), Verdict::Cancelled);
    }

    #[test]
    fn valid_placement_consumes_one_unit() {
        let mut shift = open_shift();
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        let bread = bread_white(shift.catalog());
        let before = shift.inventory().count(bread);
        shift.pick_up(Pickup::Ingredient(bread));
        assert_eq!(shift.place(Some(tray)), Verdict::Valid);
        assert_eq!(shift.inventory().count(bread), before - 1);
    }

    #[test]
    fn stock_vanishing_after_pick_up_cancels() {
        let mut shift = shift_with_stock(&[("bread_white", 2), ("meat_ham", 1)]);
        shift.open_store();
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        let bread = bread_white(shift.catalog());
        let ham = meat_ham(shift.catalog());

        shift.pick_up(Pickup::Ingredient(bread));
        assert_eq!(shift.place(Some(tray)), Verdict::Valid);
        assert_eq!(shift.pick_up(Pickup::Ingredient(ham)), Verdict::Valid);
        assert!(shift.inventory.consume(ham));

        assert_eq!(shift.place(Some(tray)), Verdict::Cancelled);
        assert_eq!(shift.score().wrong_placements, 0);
        assert_eq!(shift.tray(tray).unwrap().placed().len(), 1);
    }

    #[test]
    fn deliver_rejects_unfinished_tray() {
        let mut shift = open_shift();
        let tray = spawn_first(&mut shift);
        assert_eq!(shift.deliver(tray), Err(ShiftError::TrayNotCompleted(tray)));
        assert!(shift.tray(tray).is_some());
    }

    #[test]
    fn delivery_frees_both_slots_and_sends_customer_home() {
        let mut shift = open_shift();
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        build_order(&mut shift, tray);

        let receipt = shift.deliver(tray).unwrap();
        assert_eq!(receipt.combo, 1);
        assert!(shift.tray(tray).is_none());
        assert_eq!(shift.docks().occupied_count(), 0);
        assert_eq!(shift.prep().occupied_count(), 0);
        assert_eq!(shift.deliver(tray), Err(ShiftError::UnknownTray(tray)));

        // The ship leaves and the customer disappears from the arena.
        advance_secs(&mut shift, 1.0);
        assert!(shift.snapshot_customers().iter().all(|c| c.tray.is_none()));
        let docks = shift.docks().pool();
        assert_eq!(docks.acquired_total(), docks.released_total());
    }

    #[test]
    fn pause_freezes_everything() {
        let mut shift = open_shift();
        shift.pause();
        let result = shift.advance(Fixed64::from_num(30));
        assert_eq!(result.steps_run, 0);
        assert_eq!(shift.tray_count(), 0);
        shift.resume();
        advance_secs(&mut shift, 2.0);
        assert_eq!(shift.tray_count(), 1);
    }

    #[test]
    fn closing_drains_then_pays_out() {
        let mut shift = open_shift();
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        build_order(&mut shift, tray);
        shift.close_store();
        let receipt = shift.deliver(tray).unwrap();

        advance_secs(&mut shift, 10.0);
        assert_eq!(shift.phase(), ShiftPhase::Closed);
        assert_eq!(shift.wallet(), receipt.money);
        assert_eq!(shift.save_document().shifts_completed, 1);
    }

    #[test]
    fn timed_shift_closes_itself() {
        let config = ShiftConfig {
            shift_length: Fixed64::from_num(1),
            ..test_config()
        };
        let store = MemoryStore::new();
        let mut shift = Shift::new(config, standard_catalog(), Box::new(store), stocked_save(&[]));
        shift.open_store();
        advance_secs(&mut shift, 1.5);
        assert_eq!(shift.phase(), ShiftPhase::Closed);
        assert!(shift.open_store());
        assert_eq!(shift.phase(), ShiftPhase::Open);
    }

    #[test]
    fn purchase_deducts_wallet_or_fails_cleanly() {
        let store = MemoryStore::with_document(SaveDocument {
            total_money: 500,
            ..stocked_save(&[])
        });
        let mut shift = Shift::new(test_config(), standard_catalog(), Box::new(store.clone()), SaveDocument::default());
        let ham = meat_ham(shift.catalog());

        assert_eq!(shift.purchase(ham, 2), Ok(300));
        assert_eq!(shift.wallet(), 200);
        assert_eq!(shift.inventory().count(ham), 2);
        assert_eq!(store.document().unwrap().total_money, 200);

        let err = shift.purchase(ham, 2).unwrap_err();
        assert_eq!(
            err,
            ShiftError::InsufficientFunds {
                needed: 300,
                available: 200
            }
        );
        assert_eq!(shift.inventory().count(ham), 2);
        assert_eq!(
            shift.purchase(IngredientId(999), 1),
            Err(ShiftError::UnknownIngredient(IngredientId(999)))
        );
    }

    #[test]
    fn queued_commands_run_on_next_step() {
        let mut shift = basic_shift();
        shift.queue(Command::OpenStore);
        assert_eq!(shift.phase(), ShiftPhase::Idle);
        let result = shift.step();
        assert_eq!(result.commands_run, 1);
        assert_eq!(shift.phase(), ShiftPhase::Open);
    }

    #[test]
    fn reactive_handler_can_auto_deliver() {
        let mut shift = open_shift();
        shift.on_reactive(
            EventKind::TrayCompleted,
            Box::new(|e| match e {
                Event::TrayCompleted { tray, .. } => vec![Command::Deliver { tray: *tray }],
                _ => vec![],
            }),
        );
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        build_order(&mut shift, tray);
        // Post-tick delivers the completion event, the next pre-tick delivers.
        shift.step();
        shift.step();
        assert!(shift.tray(tray).is_none());
        assert_eq!(shift.score().orders_completed, 1);
    }

    #[test]
    fn failed_save_does_not_stop_the_shift() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let mut shift = Shift::new(
            test_config(),
            standard_catalog(),
            Box::new(store.clone()),
            stocked_save(&[("bread_white", 10), ("meat_ham", 10)]),
        );
        shift.open_store();
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        build_order(&mut shift, tray);
        advance_secs(&mut shift, 1.0);
        assert_eq!(shift.phase(), ShiftPhase::Open);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn restart_clears_arena_and_keeps_wallet() {
        let mut shift = open_shift();
        advance_secs(&mut shift, 8.0);
        assert!(shift.tray_count() > 0);
        shift.restart();
        assert_eq!(shift.phase(), ShiftPhase::Open);
        assert_eq!(shift.tray_count(), 0);
        assert_eq!(shift.customer_count(), 0);
        assert_eq!(shift.docks().occupied_count(), 0);
        let docks = shift.docks().pool();
        assert_eq!(docks.acquired_total(), docks.released_total());
    }
}
