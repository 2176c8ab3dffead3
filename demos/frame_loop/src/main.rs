//! Frame Loop Example
//!
//! Demonstrates tickwork driving a small scene at 30 frames per second.
//! A hero walks while a slime follows it; a timer despawns the slime, a
//! worker thread reports back through the hand-off queue, and actions
//! schedule follow-up actions from inside their own steps.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tickwork_actions::{Action, ActionScheduler};
use tickwork_core::{SchedulerConfig, TargetId, TargetProbe, TargetRegistry};
use tickwork_timers::{Repeat, TimerScheduler};

const FRAME: f32 = 1.0 / 30.0;
const FRAMES: u32 = 90;
const WALK: i32 = 1;

/// Moves a shared position at a fixed speed for a fixed time
struct Walk {
    position: Rc<Cell<f32>>,
    speed: f32,
    remaining: f32,
    then: Option<Box<dyn Action>>,
    target: TargetId,
}

impl Action for Walk {
    fn start_with_target(&mut self, target: TargetId) {
        self.target = target;
    }

    fn step(&mut self, dt: f32, scheduler: &mut ActionScheduler) {
        let dt = dt.min(self.remaining);
        self.position.set(self.position.get() + self.speed * dt);
        self.remaining -= dt;

        if self.remaining <= 0.0 {
            if let Some(next) = self.then.take() {
                scheduler.add(next, self.target, false);
            }
        }
    }

    fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }

    fn stop(&mut self) {
        println!("  [{}] walk finished at x = {:.2}", self.target, self.position.get());
    }

    fn tag(&self) -> i32 {
        WALK
    }
}

/// Chases a leader until the leader stops running
struct Follow {
    leader: TargetId,
    done: bool,
    steps: u32,
}

impl Action for Follow {
    fn step(&mut self, _dt: f32, scheduler: &mut ActionScheduler) {
        self.steps += 1;
        self.done = !scheduler.target_probe().is_running(self.leader);
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn stop(&mut self) {
        println!("  follow stopped after {} steps", self.steps);
    }
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config() -> SchedulerConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("frame_loop.ron");
    match SchedulerConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "using default configuration");
            SchedulerConfig::default()
        }
    }
}

fn main() {
    init_tracing();
    println!("=== Tickwork Frame Loop Example ===\n");

    let config = load_config();
    println!("Config: {:?}\n", config);

    let registry = TargetRegistry::new();
    let mut actions = ActionScheduler::with_probe(registry.clone());
    let mut timers = TimerScheduler::from_config(&config, registry.clone());

    let hero = registry.spawn();
    let slime = registry.spawn();
    let hero_x = Rc::new(Cell::new(0.0));
    println!("Spawned hero ({}) and slime ({})\n", hero, slime);

    // Walk right, then walk back
    let back = Walk {
        position: Rc::clone(&hero_x),
        speed: -2.0,
        remaining: 0.5,
        then: None,
        target: hero,
    };
    actions.add(
        Box::new(Walk {
            position: Rc::clone(&hero_x),
            speed: 4.0,
            remaining: 1.0,
            then: Some(Box::new(back)),
            target: hero,
        }),
        hero,
        false,
    );
    actions.add(
        Box::new(Follow {
            leader: slime,
            done: false,
            steps: 0,
        }),
        hero,
        false,
    );

    let frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&frames);
    timers.schedule_update(move |_, _| counter.set(counter.get() + 1), hero, 0, false);

    timers
        .schedule(
            |_, dt| println!("  heartbeat ({:.2}s)", dt),
            hero,
            Duration::from_millis(500),
            Repeat::Times(3),
            Duration::ZERO,
            false,
            "heartbeat",
        )
        .unwrap_or_else(|err| tracing::error!(%err, "heartbeat not scheduled"));

    let despawner = registry.clone();
    timers
        .schedule_once(
            move |_, _| {
                println!("  slime despawned");
                despawner.despawn(slime);
            },
            hero,
            Duration::from_millis(1200),
            "despawn",
        )
        .unwrap_or_else(|err| tracing::error!(%err, "despawn not scheduled"));

    let remote = timers.remote();
    let worker = std::thread::spawn(move || {
        let level = "meadow".to_string();
        remote.post(move |timers| {
            println!("  level '{}' loaded on the scheduler thread", level);
            timers.set_time_scale(1.0);
        })
    });
    if let Ok(Err(err)) = worker.join() {
        tracing::error!(%err, "hand-off rejected");
    }

    println!("Running {} frames...\n", FRAMES);
    for frame in 0..FRAMES {
        actions.update(FRAME);
        let stats = timers.update(FRAME);
        if stats.handed_off > 0 {
            println!("  frame {}: ran {} handed-off function(s)", frame, stats.handed_off);
        }
    }

    println!("\n=== Final State ===");
    println!("Hero x: {:.2}", hero_x.get());
    println!("Hero update ran {} times", frames.get());
    println!("Walks still running: {}", actions.number_of_running_actions_by_tag(WALK, hero));
    println!("Actions on hero: {}", actions.number_of_running_actions_for_target(hero));
    println!("Heartbeat scheduled: {}", timers.is_scheduled("heartbeat", hero));
    println!("Slime alive: {}", registry.is_alive(slime));
}
