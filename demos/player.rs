//! Player Movement State Machine
//!
//! This example drives a player through Idle, Walk and Jump from a simulated
//! input script, the way a game loop would.
//!
//! Key concepts:
//! - Owner-aware states mutating the player on enter and exit
//! - Guards reading input straight from the owner
//! - Any-state transitions (jump from anywhere)
//! - History navigation and snapshots
//!
//! Run with: cargo run --example player

use tickfsm::builder::StateMachineBuilder;
use tickfsm::{Guard, LogCategory, Snapshot, State, StateId};

#[derive(Debug, Default)]
struct Player {
    walk_key: bool,
    jump_key: bool,
    speed: f32,
    airborne_frames: u32,
}

#[derive(Default)]
struct Idle;

impl State<Player> for Idle {
    fn id() -> StateId {
        StateId::new("idle")
    }
}

#[derive(Default)]
struct Walk;

impl State<Player> for Walk {
    fn id() -> StateId {
        StateId::new("walk")
    }

    fn on_enter(&mut self, player: &mut Player) {
        player.speed = 3.5;
    }

    fn on_exit(&mut self, player: &mut Player) {
        player.speed = 0.0;
    }
}

#[derive(Default)]
struct Jump;

impl State<Player> for Jump {
    fn id() -> StateId {
        StateId::new("jump")
    }

    fn on_enter(&mut self, player: &mut Player) {
        player.airborne_frames = 0;
    }

    fn on_update(&mut self, player: &mut Player) {
        player.airborne_frames += 1;
    }
}

fn main() {
    println!("=== Player Movement State Machine ===\n");

    let mut fsm = StateMachineBuilder::new()
        .owner(Player::default())
        .log_filter(LogCategory::STATE_ENTER | LogCategory::ERROR)
        .log_sink(|message, _| println!("  [fsm] {message}"))
        .state::<Walk>()
        .state::<Jump>()
        .root::<Idle>()
        .build()
        .unwrap();

    fsm.add_transition::<Idle, Walk, _>(Guard::new(|p: &Player| p.walk_key))
        .unwrap();
    fsm.add_transition::<Walk, Idle, _>(Guard::new(|p: &Player| !p.walk_key))
        .unwrap();
    fsm.add_transition::<Jump, Idle, _>(Guard::new(|p: &Player| p.airborne_frames >= 2))
        .unwrap();
    fsm.add_any_transition::<Jump, _>(Guard::new(|p: &Player| p.jump_key))
        .unwrap();

    fsm.on_state_changed(|change| {
        let from = change.from.as_ref().map_or("-", |id| id.as_str());
        println!("  {:?}: {} -> {}", change.kind, from, change.to);
    });

    // (walk, jump) per frame
    let script = [
        (false, false),
        (true, false),
        (true, false),
        (true, true),
        (false, false),
        (false, false),
        (false, false),
    ];

    for (frame, (walk_key, jump_key)) in script.into_iter().enumerate() {
        let player = fsm.owner_mut();
        player.walk_key = walk_key;
        player.jump_key = jump_key;

        fsm.update();
        fsm.fixed_update();

        println!(
            "frame {frame}: state={} speed={}",
            fsm.current_state_id().map_or("-", |id| id.as_str()),
            fsm.owner().speed
        );
    }

    println!("\nRoute so far: {:?}", fsm.full_state_route());

    let snapshot = fsm.snapshot();
    println!("\nSnapshot:\n{}", snapshot.to_json().unwrap());

    println!("\nGoing back:");
    while fsm.can_go_back() {
        fsm.go_to_previous_state();
    }

    println!("\nRestoring snapshot:");
    fsm.restore(&Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap())
        .unwrap();
    println!(
        "Restored to {} with {} history entries",
        fsm.current_state_id().map_or("-", |id| id.as_str()),
        fsm.history_len()
    );

    println!("\nResetting:");
    fsm.reset_to_root();

    println!("\n=== Example Complete ===");
}
